//! Flat export payload sent to the collector on finalization.
//!
//! The payload is assembled fresh from the document rather than serializing
//! the aggregate directly, so the wire shape stays stable if the domain model
//! moves.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use fieldorder_media::NormalizedImage;
use fieldorder_orders::{OrderStatus, ServiceOrder};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBlock {
    pub id: String,
    pub number: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyBlock {
    pub legal_name: String,
    pub trade_name: String,
    pub tax_id: String,
    pub city: String,
    pub region: String,
    pub phone: String,
    pub email: String,
    pub contact_person: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentBlock {
    pub kind: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReasonBlock {
    pub motivation: String,
    pub notable_events: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterventionBlock {
    pub kind: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBlock {
    pub name: String,
    pub model_ref: String,
    pub serial_number: String,
    pub notes: String,
    pub quantity: u32,
    pub possession: String,
    pub movement: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaborBlock {
    pub date: NaiveDate,
    pub description: String,
    pub hours: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendenciesBlock {
    pub vendor_side: String,
    pub client_side: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentStateBlock {
    pub initial: String,
    #[serde(rename = "final")]
    pub final_: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosureBlock {
    pub city: String,
    pub region: String,
    pub engineer_name: String,
    pub engineer_credential: String,
    pub receiver_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub filename: String,
    /// Declared type of the canonical encoding.
    pub content_type: String,
    pub byte_size: usize,
    pub base64: String,
}

/// The full export payload: order fields plus normalized images.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub order: OrderBlock,
    pub company: CompanyBlock,
    pub equipment: Option<EquipmentBlock>,
    pub reason: ReasonBlock,
    pub intervention: InterventionBlock,
    pub parts: Vec<PartBlock>,
    pub labor: Vec<LaborBlock>,
    pub pendencies: PendenciesBlock,
    pub equipment_state: EquipmentStateBlock,
    pub closure: ClosureBlock,
    pub images: Vec<ImageBlock>,
}

impl ExportPayload {
    /// Flatten a (normally finalized) order and its normalized images.
    pub fn from_order(order: &ServiceOrder, images: &[NormalizedImage]) -> Self {
        let company = order.company();
        let reason = order.reason();
        let intervention = order.intervention();
        let pendencies = order.pendencies();
        let state = order.equipment_state();
        let closure = order.closure();

        Self {
            order: OrderBlock {
                id: order.id_typed().to_string(),
                number: order.number().to_string(),
                status: order.status(),
                created_at: order.created_at(),
                finalized_at: order.finalized_at(),
            },
            company: CompanyBlock {
                legal_name: company.legal_name.clone(),
                trade_name: company.trade_name.clone(),
                tax_id: company.tax_id.clone(),
                city: company.city.clone(),
                region: company.region.clone(),
                phone: company.phone.clone(),
                email: company.email.clone(),
                contact_person: company.contact_person.clone(),
            },
            equipment: order.equipment().map(|e| EquipmentBlock {
                kind: e.kind.clone(),
                manufacturer: e.manufacturer.clone(),
                model: e.model.clone(),
                serial_number: e.serial_number.clone(),
            }),
            reason: ReasonBlock {
                motivation: reason.motivation.clone(),
                notable_events: reason.notable_events.clone(),
            },
            intervention: InterventionBlock {
                kind: intervention.kind.clone(),
                description: intervention.description.clone(),
            },
            parts: order
                .parts()
                .iter()
                .map(|p| PartBlock {
                    name: p.name.clone(),
                    model_ref: p.model_ref.clone(),
                    serial_number: p.serial_number.clone(),
                    notes: p.notes.clone(),
                    quantity: p.quantity,
                    possession: match p.possession {
                        fieldorder_orders::Possession::Client => "client".to_string(),
                        fieldorder_orders::Possession::Vendor => "vendor".to_string(),
                    },
                    movement: match p.movement {
                        fieldorder_orders::Movement::Removed => "removed".to_string(),
                        fieldorder_orders::Movement::Installed => "installed".to_string(),
                    },
                })
                .collect(),
            labor: order
                .labor()
                .iter()
                .map(|entry| LaborBlock {
                    date: entry.date,
                    description: entry.description.clone(),
                    hours: entry.hours,
                })
                .collect(),
            pendencies: PendenciesBlock {
                vendor_side: pendencies.vendor_side.clone(),
                client_side: pendencies.client_side.clone(),
            },
            equipment_state: EquipmentStateBlock {
                initial: state.initial.clone(),
                final_: state.final_.clone(),
            },
            closure: ClosureBlock {
                city: closure.city.clone(),
                region: closure.region.clone(),
                engineer_name: closure.engineer_name.clone(),
                engineer_credential: closure.engineer_credential.clone(),
                receiver_name: closure.receiver_name.clone(),
            },
            images: images
                .iter()
                .map(|img| ImageBlock {
                    filename: img.filename.clone(),
                    content_type: "image/jpeg".to_string(),
                    byte_size: img.approx_bytes,
                    base64: img.encoded.clone(),
                })
                .collect(),
        }
    }
}
