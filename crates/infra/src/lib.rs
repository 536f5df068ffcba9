//! `fieldorder-infra` — persistence seam and application orchestration.
//!
//! The domain crates are pure; this crate wires them to side effects: the
//! order repository (a document store), the media normalizer, and the
//! best-effort finalization notifier.

pub mod repository;
pub mod service;

pub use repository::{InMemoryOrderRepository, OrderRepository, RepositoryError};
pub use service::{FinalizeReport, OrderService, ServiceError};
