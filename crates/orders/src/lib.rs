//! `fieldorder-orders` — the service-order document model and its lifecycle.
//!
//! Pure domain: the nine-step document, the per-step completeness rules, the
//! draft → closed → finalized state machine, and the order-number derivation.
//! Side effects (persistence, media processing, outbound notification) live in
//! other crates.

pub mod numbering;
pub mod order;
pub mod steps;

pub use numbering::generate_number;
pub use order::{
    ClientRef, Closure, CompanyIdentity, EquipmentRef, EquipmentState, Intervention, LaborEntry,
    MediaRef, Movement, OrderPatch, OrderStatus, Part, Pendencies, Possession, Reason,
    ServiceOrder,
};
pub use steps::{all_prior_steps_complete, incomplete_steps, is_step_complete, step_title};
