//! Order-number derivation.
//!
//! The number is human-readable and collision-tolerant, not a primary key:
//! `OS_<name>_<taxid>_<date>` when an identity with both a name and a tax id
//! is available, otherwise a caller-supplied number, otherwise a timestamp
//! fallback. It is recomputed on every save while the order is editable and
//! frozen once finalized (the state machine rejects edits after that).

use chrono::{DateTime, Utc};

use crate::order::{ClientRef, CompanyIdentity};

const NAME_MAX_CHARS: usize = 30;

/// Derive the order number for the given identity and moment.
///
/// The company block wins when it carries both a legal name and a tax id;
/// otherwise the selected client's snapshot is tried under the same rule.
/// With no qualifying identity, `provided` (the current/caller-supplied
/// number) is kept, and failing that the result is `OS-<unix-millis>`.
pub fn generate_number(
    company: &CompanyIdentity,
    client: Option<&ClientRef>,
    provided: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    if let Some(number) = from_identity(&company.legal_name, &company.tax_id, now) {
        return number;
    }
    if let Some(client) = client {
        if let Some(number) =
            from_identity(&client.company.legal_name, &client.company.tax_id, now)
        {
            return number;
        }
    }
    match provided {
        Some(n) if !n.trim().is_empty() => n.to_string(),
        _ => format!("OS-{}", now.timestamp_millis()),
    }
}

fn from_identity(name: &str, tax_id: &str, now: DateTime<Utc>) -> Option<String> {
    if name.trim().is_empty() || tax_id.trim().is_empty() {
        return None;
    }
    let name: String = name
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(NAME_MAX_CHARS)
        .collect();
    let digits: String = tax_id.chars().filter(char::is_ascii_digit).collect();
    let date = now.format("%d-%m-%Y");
    Some(format!("OS_{name}_{digits}_{date}"))
}
