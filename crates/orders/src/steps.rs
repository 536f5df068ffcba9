//! Per-step completeness rules.
//!
//! The nine step screens enforce required fields at submit time, but a user
//! can jump to any step through the step indicator, so completeness must be
//! re-derivable from document state alone. These functions are pure and total:
//! missing data is incomplete, never an error.

use crate::order::ServiceOrder;

/// Number of form steps.
pub const STEP_COUNT: u8 = 9;

fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Whether a single step's completeness condition holds.
///
/// Steps outside `1..=9` report incomplete rather than panicking.
pub fn is_step_complete(step: u8, order: &ServiceOrder) -> bool {
    match step {
        1 => {
            let c = order.company();
            filled(&c.legal_name)
                && filled(&c.trade_name)
                && filled(&c.tax_id)
                && filled(&c.city)
                && filled(&c.region)
                && filled(&c.phone)
                && filled(&c.email)
                && filled(&c.contact_person)
        }
        2 => order.client().is_some() && order.equipment().is_some(),
        3 => filled(&order.reason().motivation) && filled(&order.reason().notable_events),
        4 => filled(&order.intervention().kind) && filled(&order.intervention().description),
        // Parts are optional once the user has advanced past the step.
        5 => order.current_step() > 5 || !order.parts().is_empty(),
        6 => !order.labor().is_empty(),
        7 => filled(&order.pendencies().vendor_side) && filled(&order.pendencies().client_side),
        8 => filled(&order.equipment_state().initial) && filled(&order.equipment_state().final_),
        9 => {
            let c = order.closure();
            filled(&c.city)
                && filled(&c.region)
                && filled(&c.engineer_name)
                && filled(&c.engineer_credential)
                && filled(&c.receiver_name)
        }
        _ => false,
    }
}

/// The finalize guard: steps 1 through 8 all complete.
///
/// Step 9 is deliberately excluded; the closure screen validates its own
/// fields at the moment it triggers finalization.
pub fn all_prior_steps_complete(order: &ServiceOrder) -> bool {
    (1..=8).all(|step| is_step_complete(step, order))
}

/// Ascending list of incomplete steps in `1..=8`, for validation reporting.
pub fn incomplete_steps(order: &ServiceOrder) -> Vec<u8> {
    (1..=8)
        .filter(|&step| !is_step_complete(step, order))
        .collect()
}

/// Display title of a step, as shown by the step indicator.
pub fn step_title(step: u8) -> Option<&'static str> {
    match step {
        1 => Some("Company details"),
        2 => Some("Equipment"),
        3 => Some("Reason and events"),
        4 => Some("Intervention"),
        5 => Some("Parts"),
        6 => Some("Labor"),
        7 => Some("Pendencies"),
        8 => Some("Equipment condition"),
        9 => Some("Location and signatures"),
        _ => None,
    }
}
