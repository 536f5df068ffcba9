use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fieldorder_core::{
    ClientId, DomainError, DomainResult, Entity, EquipmentId, LaborEntryId, OrderId, PartId,
};

use crate::numbering;
use crate::steps;

/// Service-order status lifecycle.
///
/// Transitions are monotonic: `Draft → Closed → Finalized`. `Closed` is a soft
/// checkpoint (the document stays editable); `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Draft,
    Closed,
    Finalized,
}

/// Company identity block (step 1).
///
/// Either copied from a selected client or entered manually; the core only
/// cares about the field values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub city: String,
    pub region: String,
    pub phone: String,
    pub email: String,
    pub contact_person: String,
}

/// Reference to a client catalog record, with the identity snapshot taken at
/// selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: ClientId,
    pub company: CompanyIdentity,
}

/// Reference to an equipment catalog record, with a read-time summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentRef {
    pub id: EquipmentId,
    pub kind: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

/// Service motivation and notable events (step 3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reason {
    pub motivation: String,
    pub notable_events: String,
}

/// Intervention type and description (step 4).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    pub kind: String,
    pub description: String,
}

/// Which party currently holds a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Possession {
    Client,
    Vendor,
}

/// Whether a part was removed from or installed into the equipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Removed,
    Installed,
}

/// Part record (step 5). Append/remove only while the order is editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub name: String,
    pub model_ref: String,
    pub serial_number: String,
    pub notes: String,
    /// Always >= 1; enforced at construction.
    pub quantity: u32,
    pub possession: Possession,
    pub movement: Movement,
}

impl Part {
    /// Build a part, clamping `quantity` to at least 1.
    pub fn new(
        name: impl Into<String>,
        model_ref: impl Into<String>,
        serial_number: impl Into<String>,
        notes: impl Into<String>,
        quantity: u32,
        possession: Possession,
        movement: Movement,
    ) -> Self {
        Self {
            id: PartId::new(),
            name: name.into(),
            model_ref: model_ref.into(),
            serial_number: serial_number.into(),
            notes: notes.into(),
            quantity: quantity.max(1),
            possession,
            movement,
        }
    }
}

impl Entity for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Labor entry (step 6). Grouped by `date` for display; insertion order kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaborEntry {
    pub id: LaborEntryId,
    pub date: NaiveDate,
    pub description: String,
    /// Positive; 0.5 increments are conventional but not enforced.
    pub hours: f64,
}

impl LaborEntry {
    pub fn new(date: NaiveDate, description: impl Into<String>, hours: f64) -> Self {
        Self {
            id: LaborEntryId::new(),
            date,
            description: description.into(),
            hours,
        }
    }
}

impl Entity for LaborEntry {
    type Id = LaborEntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Open pendencies, one free-text field per responsible party (step 7).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pendencies {
    pub vendor_side: String,
    pub client_side: String,
}

/// Equipment condition on arrival and on completion (step 8).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentState {
    pub initial: String,
    #[serde(rename = "final")]
    pub final_: String,
}

/// Closure block: location, engineer identity/credential, receiver (step 9).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Closure {
    pub city: String,
    pub region: String,
    pub engineer_name: String,
    pub engineer_credential: String,
    pub receiver_name: String,
}

impl Closure {
    /// Fill empty location/receiver fields from the company block.
    ///
    /// Mirrors the form prefill on the closure screen; callers opt in, the
    /// merge itself never does this silently.
    pub fn prefilled_from(&self, company: &CompanyIdentity) -> Closure {
        let pick = |own: &str, fallback: &str| {
            if own.trim().is_empty() {
                fallback.to_string()
            } else {
                own.to_string()
            }
        };
        Closure {
            city: pick(&self.city, &company.city),
            region: pick(&self.region, &company.region),
            engineer_name: self.engineer_name.clone(),
            engineer_credential: self.engineer_credential.clone(),
            receiver_name: pick(&self.receiver_name, &company.contact_person),
        }
    }
}

/// Reference to a normalized image stored with the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub filename: String,
    pub approx_bytes: usize,
}

/// Partial update submitted by one step screen.
///
/// Each `Some` section replaces the corresponding section of the document
/// wholesale (last write wins); `None` sections are left untouched. This is
/// the single mutation entry point for all nine steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub number: Option<String>,
    pub company: Option<CompanyIdentity>,
    pub client: Option<ClientRef>,
    pub equipment: Option<EquipmentRef>,
    pub reason: Option<Reason>,
    pub intervention: Option<Intervention>,
    pub parts: Option<Vec<Part>>,
    pub labor: Option<Vec<LaborEntry>>,
    pub pendencies: Option<Pendencies>,
    pub equipment_state: Option<EquipmentState>,
    pub closure: Option<Closure>,
    pub media: Option<Vec<MediaRef>>,
}

/// Aggregate root: ServiceOrder.
///
/// Tracks one field-service engagement through the nine-step intake form and
/// the closing/finalizing transitions. All mutation goes through
/// [`ServiceOrder::apply_patch`], [`ServiceOrder::close`] and
/// [`ServiceOrder::finalize`]; once finalized the document is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct ServiceOrder {
    id: OrderId,
    number: String,
    status: OrderStatus,
    current_step: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
    company: CompanyIdentity,
    client: Option<ClientRef>,
    equipment: Option<EquipmentRef>,
    reason: Reason,
    intervention: Intervention,
    parts: Vec<Part>,
    labor: Vec<LaborEntry>,
    pendencies: Pendencies,
    equipment_state: EquipmentState,
    closure: Closure,
    media: Vec<MediaRef>,
}

/// Raw persisted shape of an order, validated into [`ServiceOrder`] on read.
///
/// Documents come back from a store that enforces nothing; the invariants the
/// transitions maintain must hold before the document is trusted.
#[derive(Debug, Deserialize)]
struct OrderRecord {
    id: OrderId,
    number: String,
    status: OrderStatus,
    current_step: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    finalized_at: Option<DateTime<Utc>>,
    company: CompanyIdentity,
    client: Option<ClientRef>,
    equipment: Option<EquipmentRef>,
    reason: Reason,
    intervention: Intervention,
    parts: Vec<Part>,
    labor: Vec<LaborEntry>,
    pendencies: Pendencies,
    equipment_state: EquipmentState,
    closure: Closure,
    media: Vec<MediaRef>,
}

impl TryFrom<OrderRecord> for ServiceOrder {
    type Error = DomainError;

    fn try_from(record: OrderRecord) -> DomainResult<Self> {
        if !(1..=9).contains(&record.current_step) {
            return Err(DomainError::validation(format!(
                "current step {} is outside 1..=9",
                record.current_step
            )));
        }
        match (record.status, record.finalized_at) {
            (OrderStatus::Finalized, None) => {
                return Err(DomainError::validation(
                    "finalized order without a finalization timestamp",
                ));
            }
            (OrderStatus::Draft | OrderStatus::Closed, Some(_)) => {
                return Err(DomainError::validation(
                    "finalization timestamp on a non-finalized order",
                ));
            }
            _ => {}
        }
        Ok(Self {
            id: record.id,
            number: record.number,
            status: record.status,
            current_step: record.current_step,
            created_at: record.created_at,
            updated_at: record.updated_at,
            finalized_at: record.finalized_at,
            company: record.company,
            client: record.client,
            equipment: record.equipment,
            reason: record.reason,
            intervention: record.intervention,
            parts: record.parts,
            labor: record.labor,
            pendencies: record.pendencies,
            equipment_state: record.equipment_state,
            closure: record.closure,
            media: record.media,
        })
    }
}

impl ServiceOrder {
    /// Create an empty draft at step 1.
    pub fn new(id: OrderId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            number: String::new(),
            status: OrderStatus::Draft,
            current_step: 1,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            company: CompanyIdentity::default(),
            client: None,
            equipment: None,
            reason: Reason::default(),
            intervention: Intervention::default(),
            parts: Vec::new(),
            labor: Vec::new(),
            pendencies: Pendencies::default(),
            equipment_state: EquipmentState::default(),
            closure: Closure::default(),
            media: Vec::new(),
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn current_step(&self) -> u8 {
        self.current_step
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn finalized_at(&self) -> Option<DateTime<Utc>> {
        self.finalized_at
    }

    pub fn company(&self) -> &CompanyIdentity {
        &self.company
    }

    pub fn client(&self) -> Option<&ClientRef> {
        self.client.as_ref()
    }

    pub fn equipment(&self) -> Option<&EquipmentRef> {
        self.equipment.as_ref()
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    pub fn intervention(&self) -> &Intervention {
        &self.intervention
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn labor(&self) -> &[LaborEntry] {
        &self.labor
    }

    pub fn pendencies(&self) -> &Pendencies {
        &self.pendencies
    }

    pub fn equipment_state(&self) -> &EquipmentState {
        &self.equipment_state
    }

    pub fn closure(&self) -> &Closure {
        &self.closure
    }

    pub fn media(&self) -> &[MediaRef] {
        &self.media
    }

    /// Invariant helper: drafts and closed orders accept edits, finalized
    /// orders do not.
    pub fn is_editable(&self) -> bool {
        matches!(self.status, OrderStatus::Draft | OrderStatus::Closed)
    }

    /// Number of distinct labor dates (working days), for display summaries.
    pub fn labor_days(&self) -> usize {
        let mut dates: Vec<NaiveDate> = self.labor.iter().map(|entry| entry.date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates.len()
    }

    /// Apply a step patch to the document.
    ///
    /// Valid from `Draft` and `Closed`; never changes `status`. Each `Some`
    /// section of the patch replaces the stored section. `current_step`
    /// advances (capped at 9) only when `advance` is set. `updated_at` is
    /// refreshed and the order number recomputed from the merged identity.
    pub fn apply_patch(
        &mut self,
        patch: OrderPatch,
        advance: bool,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.is_editable() {
            return Err(DomainError::invariant(
                "finalized orders are read-only and cannot be edited",
            ));
        }

        if let Some(company) = patch.company {
            self.company = company;
        }
        if let Some(client) = patch.client {
            self.client = Some(client);
        }
        if let Some(equipment) = patch.equipment {
            self.equipment = Some(equipment);
        }
        if let Some(reason) = patch.reason {
            self.reason = reason;
        }
        if let Some(intervention) = patch.intervention {
            self.intervention = intervention;
        }
        if let Some(parts) = patch.parts {
            self.parts = parts;
        }
        if let Some(labor) = patch.labor {
            self.labor = labor;
        }
        if let Some(pendencies) = patch.pendencies {
            self.pendencies = pendencies;
        }
        if let Some(equipment_state) = patch.equipment_state {
            self.equipment_state = equipment_state;
        }
        if let Some(closure) = patch.closure {
            self.closure = closure;
        }
        if let Some(media) = patch.media {
            self.media = media;
        }

        if advance && self.current_step < 9 {
            self.current_step += 1;
        }

        // Recompute the human-readable number from the merged identity; an
        // explicit number in the patch (or an already-assigned one) is the
        // fallback when no identity qualifies.
        let provided = patch
            .number
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.number.clone());
        let provided = (!provided.trim().is_empty()).then_some(provided);
        self.number =
            numbering::generate_number(&self.company, self.client.as_ref(), provided.as_deref(), now);

        self.updated_at = now;
        Ok(())
    }

    /// Soft checkpoint: mark the order closed.
    ///
    /// Valid only from `Draft`. No validation, no side effects; the order
    /// stays editable through [`ServiceOrder::apply_patch`].
    pub fn close(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status != OrderStatus::Draft {
            return Err(DomainError::invariant("only draft orders can be closed"));
        }
        self.status = OrderStatus::Closed;
        self.updated_at = now;
        Ok(())
    }

    /// Terminal transition, guarded by steps 1–8 completeness.
    ///
    /// The guard re-runs on every call, including a second finalize attempt
    /// after edits to a closed order. On rejection the document is untouched
    /// and the error names the incomplete steps; this is a user-correctable
    /// validation failure, not a system error. Side effects (media pipeline,
    /// notification, persistence) are orchestrated by the service layer.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == OrderStatus::Finalized {
            return Err(DomainError::invariant("order is already finalized"));
        }

        let missing = steps::incomplete_steps(self);
        if !missing.is_empty() {
            let listed = missing
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DomainError::validation(format!(
                "cannot finalize: steps {listed} incomplete"
            )));
        }

        self.status = OrderStatus::Finalized;
        self.finalized_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for ServiceOrder {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    fn t(secs: i64) -> DateTime<Utc> {
        t0() + chrono::Duration::seconds(secs)
    }

    fn company() -> CompanyIdentity {
        CompanyIdentity {
            legal_name: "Acme Clinics Ltd".into(),
            trade_name: "Acme".into(),
            tax_id: "12.345.678/0001-90".into(),
            city: "Porto Alegre".into(),
            region: "RS".into(),
            phone: "+55 51 99999-0000".into(),
            email: "service@acme.example".into(),
            contact_person: "Maria Souza".into(),
        }
    }

    fn client_ref() -> ClientRef {
        ClientRef {
            id: ClientId::new(),
            company: company(),
        }
    }

    fn equipment_ref() -> EquipmentRef {
        EquipmentRef {
            id: EquipmentId::new(),
            kind: "MRI scanner".into(),
            manufacturer: "Siemens".into(),
            model: "Magnetom".into(),
            serial_number: "SN-0042".into(),
        }
    }

    /// Order with steps 1–8 fully populated (step 5 satisfied by parts).
    pub(crate) fn populated_order(now: DateTime<Utc>) -> ServiceOrder {
        let mut order = ServiceOrder::new(OrderId::new(), now);
        let patch = OrderPatch {
            company: Some(company()),
            client: Some(client_ref()),
            equipment: Some(equipment_ref()),
            reason: Some(Reason {
                motivation: "annual maintenance".into(),
                notable_events: "intermittent coil fault".into(),
            }),
            intervention: Some(Intervention {
                kind: "corrective".into(),
                description: "replaced gradient coil".into(),
            }),
            parts: Some(vec![Part::new(
                "Gradient coil",
                "GC-11",
                "SN-GC-9",
                "",
                1,
                Possession::Vendor,
                Movement::Installed,
            )]),
            labor: Some(vec![LaborEntry::new(
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                "on-site diagnostics",
                4.5,
            )]),
            pendencies: Some(Pendencies {
                vendor_side: "ship replacement cover".into(),
                client_side: "schedule calibration window".into(),
            }),
            equipment_state: Some(EquipmentState {
                initial: "inoperative".into(),
                final_: "operational".into(),
            }),
            closure: Some(Closure {
                city: "Porto Alegre".into(),
                region: "RS".into(),
                engineer_name: "Julio Cezar".into(),
                engineer_credential: "2000103820".into(),
                receiver_name: "Maria Souza".into(),
            }),
            ..OrderPatch::default()
        };
        order.apply_patch(patch, false, now).unwrap();
        order
    }

    #[test]
    fn new_order_is_an_empty_draft_at_step_one() {
        let order = ServiceOrder::new(OrderId::new(), t0());
        assert_eq!(order.status(), OrderStatus::Draft);
        assert_eq!(order.current_step(), 1);
        assert!(order.number().is_empty());
        assert!(order.finalized_at().is_none());
        assert!(order.parts().is_empty());
        assert!(order.labor().is_empty());
    }

    #[test]
    fn patch_merges_on_top_of_prior_document() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        order
            .apply_patch(
                OrderPatch {
                    reason: Some(Reason {
                        motivation: "preventive".into(),
                        notable_events: "none".into(),
                    }),
                    ..OrderPatch::default()
                },
                false,
                t(1),
            )
            .unwrap();

        // A second patch touching another section leaves the first intact.
        order
            .apply_patch(
                OrderPatch {
                    pendencies: Some(Pendencies {
                        vendor_side: "send report".into(),
                        client_side: String::new(),
                    }),
                    ..OrderPatch::default()
                },
                false,
                t(2),
            )
            .unwrap();

        assert_eq!(order.reason().motivation, "preventive");
        assert_eq!(order.pendencies().vendor_side, "send report");
    }

    #[test]
    fn save_refreshes_updated_at_and_keeps_step_unless_advancing() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        let before = order.updated_at();

        order
            .apply_patch(OrderPatch::default(), false, t(5))
            .unwrap();
        assert!(order.updated_at() > before);
        assert_eq!(order.current_step(), 1);

        order.apply_patch(OrderPatch::default(), true, t(6)).unwrap();
        assert_eq!(order.current_step(), 2);
    }

    #[test]
    fn current_step_caps_at_nine() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        for i in 0..20 {
            order.apply_patch(OrderPatch::default(), true, t(i)).unwrap();
        }
        assert_eq!(order.current_step(), 9);
    }

    #[test]
    fn number_is_recomputed_while_editable() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        order
            .apply_patch(
                OrderPatch {
                    company: Some(company()),
                    ..OrderPatch::default()
                },
                false,
                t0(),
            )
            .unwrap();
        assert_eq!(order.number(), "OS_Acme_Clinics_Ltd_12345678000190_05-03-2024");

        // Editing the company identity updates the number.
        let mut renamed = company();
        renamed.legal_name = "Acme Hospitals Ltd".into();
        order
            .apply_patch(
                OrderPatch {
                    company: Some(renamed),
                    ..OrderPatch::default()
                },
                false,
                t(10),
            )
            .unwrap();
        assert_eq!(order.number(), "OS_Acme_Hospitals_Ltd_12345678000190_05-03-2024");
    }

    #[test]
    fn close_is_only_valid_from_draft() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        order.close(t(1)).unwrap();
        assert_eq!(order.status(), OrderStatus::Closed);

        let err = order.close(t(2)).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn closed_orders_remain_editable_without_reverting_to_draft() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        order.close(t(1)).unwrap();

        order
            .apply_patch(
                OrderPatch {
                    company: Some(company()),
                    ..OrderPatch::default()
                },
                false,
                t(2),
            )
            .unwrap();
        assert_eq!(order.status(), OrderStatus::Closed);
        assert_eq!(order.company().legal_name, "Acme Clinics Ltd");
    }

    #[test]
    fn finalize_rejects_incomplete_orders_and_leaves_them_untouched() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        let snapshot = order.clone();

        let err = order.finalize(t(1)).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(order, snapshot);
        assert_eq!(order.status(), OrderStatus::Draft);
        assert!(order.finalized_at().is_none());
    }

    #[test]
    fn finalize_names_the_incomplete_steps() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        let err = order.finalize(t(1)).unwrap_err();
        match err {
            DomainError::Validation(msg) => {
                // Step 5 is optional until the user advances past it, but an
                // order stuck at step 1 reports it with the rest.
                assert!(msg.contains('1'));
                assert!(msg.contains('8'));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn finalize_succeeds_from_draft_when_steps_complete() {
        let mut order = populated_order(t0());
        order.finalize(t(1)).unwrap();
        assert_eq!(order.status(), OrderStatus::Finalized);
        assert_eq!(order.finalized_at(), Some(t(1)));
    }

    #[test]
    fn finalize_succeeds_from_closed_and_reruns_the_guard() {
        let mut order = populated_order(t0());
        order.close(t(1)).unwrap();

        // Break step 3 after closing; the guard must catch it.
        order
            .apply_patch(
                OrderPatch {
                    reason: Some(Reason::default()),
                    ..OrderPatch::default()
                },
                false,
                t(2),
            )
            .unwrap();
        assert!(order.finalize(t(3)).is_err());
        assert_eq!(order.status(), OrderStatus::Closed);

        // Repair it and finalize.
        order
            .apply_patch(
                OrderPatch {
                    reason: Some(Reason {
                        motivation: "repair".into(),
                        notable_events: "none".into(),
                    }),
                    ..OrderPatch::default()
                },
                false,
                t(4),
            )
            .unwrap();
        order.finalize(t(5)).unwrap();
        assert_eq!(order.status(), OrderStatus::Finalized);
    }

    #[test]
    fn finalized_orders_reject_every_further_transition() {
        let mut order = populated_order(t0());
        order.finalize(t(1)).unwrap();
        let frozen_number = order.number().to_string();
        let finalized_at = order.finalized_at();

        assert!(order.apply_patch(OrderPatch::default(), false, t(2)).is_err());
        assert!(order.close(t(3)).is_err());
        assert!(order.finalize(t(4)).is_err());

        assert_eq!(order.status(), OrderStatus::Finalized);
        assert_eq!(order.number(), frozen_number);
        assert_eq!(order.finalized_at(), finalized_at);
    }

    #[test]
    fn finalized_at_is_present_iff_finalized() {
        let mut order = populated_order(t0());
        assert!(order.finalized_at().is_none());
        order.close(t(1)).unwrap();
        assert!(order.finalized_at().is_none());
        order.finalize(t(2)).unwrap();
        assert!(order.finalized_at().is_some());
    }

    #[test]
    fn labor_days_counts_distinct_dates() {
        let mut order = ServiceOrder::new(OrderId::new(), t0());
        let d1 = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        order
            .apply_patch(
                OrderPatch {
                    labor: Some(vec![
                        LaborEntry::new(d1, "diagnostics", 4.0),
                        LaborEntry::new(d1, "disassembly", 2.0),
                        LaborEntry::new(d2, "reassembly", 6.0),
                    ]),
                    ..OrderPatch::default()
                },
                false,
                t(1),
            )
            .unwrap();
        assert_eq!(order.labor_days(), 2);
    }

    #[test]
    fn part_quantity_is_clamped_to_one() {
        let part = Part::new("fuse", "F-1", "", "", 0, Possession::Client, Movement::Removed);
        assert_eq!(part.quantity, 1);
    }

    #[test]
    fn closure_prefill_takes_company_location_and_contact() {
        let closure = Closure {
            engineer_name: "Julio Cezar".into(),
            engineer_credential: "2000103820".into(),
            ..Closure::default()
        };
        let filled = closure.prefilled_from(&company());
        assert_eq!(filled.city, "Porto Alegre");
        assert_eq!(filled.region, "RS");
        assert_eq!(filled.receiver_name, "Maria Souza");
        assert_eq!(filled.engineer_name, "Julio Cezar");
    }

    #[test]
    fn closure_prefill_never_overwrites_entered_values() {
        let closure = Closure {
            city: "Curitiba".into(),
            region: "PR".into(),
            receiver_name: "Joao Lima".into(),
            ..Closure::default()
        };
        let filled = closure.prefilled_from(&company());
        assert_eq!(filled.city, "Curitiba");
        assert_eq!(filled.region, "PR");
        assert_eq!(filled.receiver_name, "Joao Lima");
    }

    #[test]
    fn document_round_trips_through_serde() {
        let order = populated_order(t0());
        let json = serde_json::to_string(&order).unwrap();
        let back: ServiceOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }

    #[test]
    fn deserialization_rejects_finalized_without_a_timestamp() {
        let mut value = serde_json::to_value(populated_order(t0())).unwrap();
        value["status"] = "finalized".into();
        value["finalized_at"] = serde_json::Value::Null;
        let err = serde_json::from_value::<ServiceOrder>(value).unwrap_err();
        assert!(err.to_string().contains("finalization timestamp"), "{err}");
    }

    #[test]
    fn deserialization_rejects_a_timestamp_on_a_draft() {
        let mut order = populated_order(t0());
        order.finalize(t(1)).unwrap();
        let mut value = serde_json::to_value(order).unwrap();
        value["status"] = "draft".into();
        assert!(serde_json::from_value::<ServiceOrder>(value).is_err());
    }

    #[test]
    fn deserialization_rejects_out_of_range_steps() {
        for step in [0u8, 10] {
            let mut value = serde_json::to_value(populated_order(t0())).unwrap();
            value["current_step"] = step.into();
            assert!(serde_json::from_value::<ServiceOrder>(value).is_err(), "step {step}");
        }
    }
}
