//! `fieldorder-dispatch` — best-effort finalization notification.
//!
//! Assembles the flat export payload of a finalized order (fields + normalized
//! images) and performs a single, non-retried HTTP POST to the external
//! collector. The outcome is a boolean: the local state transition never
//! depends on it.

pub mod config;
pub mod notifier;
pub mod payload;

pub use config::DispatchConfig;
pub use notifier::{HttpNotifier, OrderNotifier};
pub use payload::ExportPayload;
