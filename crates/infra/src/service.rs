//! Application service: save/close/finalize orchestration.
//!
//! The state machine and validator are pure; this layer adds the side
//! effects in the order the workflow requires: persist step saves, run the
//! media pipeline at finalization, commit the local transition, and only
//! then attempt the best-effort collector notification. A dispatch failure
//! never unwinds a committed transition.

use chrono::{DateTime, Utc};
use thiserror::Error;

use fieldorder_core::{DomainError, OrderId};
use fieldorder_dispatch::{ExportPayload, OrderNotifier};
use fieldorder_media::{Normalizer, RejectedFile, UploadedFile};
use fieldorder_orders::{
    incomplete_steps, MediaRef, OrderPatch, OrderStatus, ServiceOrder,
};

use crate::repository::{OrderRepository, RepositoryError};

/// Application-level error for order operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("order not found")]
    NotFound,

    /// Finalization guard failure: the listed steps (1-8) are incomplete.
    /// User-correctable; the order is untouched.
    #[error("cannot finalize: steps {0:?} incomplete")]
    IncompleteSteps(Vec<u8>),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of a successful finalization.
///
/// `dispatched == false` means the order finalized locally but the collector
/// notification failed; downstream delivery may need manual follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeReport {
    pub order: ServiceOrder,
    pub rejected_files: Vec<RejectedFile>,
    pub dispatched: bool,
}

/// Orchestrates the service-order workflow over a repository, the media
/// normalizer and an outbound notifier.
pub struct OrderService<R, N> {
    repository: R,
    notifier: N,
    normalizer: Normalizer,
}

impl<R, N> OrderService<R, N>
where
    R: OrderRepository,
    N: OrderNotifier,
{
    pub fn new(repository: R, notifier: N, normalizer: Normalizer) -> Self {
        Self {
            repository,
            notifier,
            normalizer,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Create and persist an empty draft at step 1.
    pub fn create_order(&self, now: DateTime<Utc>) -> Result<ServiceOrder, ServiceError> {
        let order = ServiceOrder::new(OrderId::new(), now);
        self.repository.create(order.clone())?;
        tracing::info!(order = %order.id_typed(), "created draft order");
        Ok(order)
    }

    pub fn get_order(&self, id: OrderId) -> Result<ServiceOrder, ServiceError> {
        self.repository.get(id)?.ok_or(ServiceError::NotFound)
    }

    /// Apply one step screen's patch and persist the merged document.
    ///
    /// Works on a copy: if the repository rejects the write, the stored
    /// document is unchanged and the caller can retry.
    pub fn save_step(
        &self,
        id: OrderId,
        patch: OrderPatch,
        advance: bool,
        now: DateTime<Utc>,
    ) -> Result<ServiceOrder, ServiceError> {
        let mut order = self.get_order(id)?;
        order.apply_patch(patch, advance, now)?;
        self.repository.update(order.clone())?;
        Ok(order)
    }

    /// Soft checkpoint: draft → closed, persisted. No validation.
    pub fn close_order(&self, id: OrderId, now: DateTime<Utc>) -> Result<ServiceOrder, ServiceError> {
        let mut order = self.get_order(id)?;
        order.close(now)?;
        self.repository.update(order.clone())?;
        tracing::info!(order = %order.id_typed(), number = %order.number(), "order closed");
        Ok(order)
    }

    /// The finalization pipeline.
    ///
    /// 1. Re-run the steps-1-8 guard (every call, regardless of a prior
    ///    close); reject with the incomplete steps and no mutation.
    /// 2. Apply the closure-screen patch, normalize the attached files
    ///    (per-file failures reported, batch never aborts), record media
    ///    references, and transition to finalized.
    /// 3. Persist the transition. A repository failure here aborts the
    ///    operation with the prior stored state intact.
    /// 4. Attempt the one-shot collector dispatch. Its outcome is reported
    ///    but the already-committed transition stands.
    pub async fn finalize_order(
        &self,
        id: OrderId,
        closure_patch: OrderPatch,
        files: &[UploadedFile],
        now: DateTime<Utc>,
    ) -> Result<FinalizeReport, ServiceError> {
        let mut order = self.get_order(id)?;

        let missing = incomplete_steps(&order);
        if !missing.is_empty() {
            return Err(ServiceError::IncompleteSteps(missing));
        }

        order.apply_patch(closure_patch, false, now)?;

        let batch = self.normalizer.normalize_batch(files);
        let media: Vec<MediaRef> = batch
            .normalized
            .iter()
            .map(|img| MediaRef {
                filename: img.filename.clone(),
                approx_bytes: img.approx_bytes,
            })
            .collect();
        order.apply_patch(
            OrderPatch {
                media: Some(media),
                ..OrderPatch::default()
            },
            false,
            now,
        )?;

        order.finalize(now)?;

        // Commit local state before any outbound call: local durability wins
        // over notification reliability.
        self.repository.update(order.clone())?;

        let payload = ExportPayload::from_order(&order, &batch.normalized);
        let dispatched = self.notifier.dispatch(&payload).await;
        if !dispatched {
            tracing::warn!(
                order = %order.id_typed(),
                number = %order.number(),
                "order finalized locally; collector notification failed"
            );
        }

        Ok(FinalizeReport {
            order,
            rejected_files: batch.rejected,
            dispatched,
        })
    }

    /// Drafts, newest first.
    pub fn list_drafts(&self) -> Result<Vec<ServiceOrder>, ServiceError> {
        Ok(self.repository.list(Some(OrderStatus::Draft))?)
    }

    /// Finalized orders, newest first.
    pub fn list_finalized(&self) -> Result<Vec<ServiceOrder>, ServiceError> {
        Ok(self.repository.list(Some(OrderStatus::Finalized))?)
    }
}
