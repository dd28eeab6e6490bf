//! Effective read preference resolution.

use crate::preference::{ReadPreference, SessionState};

/// Resolve the preference a read operation is sent with.
///
/// First match wins: `explicit`, then the running transaction's own
/// preference, then `client_default`, then primary.
pub fn resolve_read_preference(
    explicit: Option<&ReadPreference>,
    client_default: Option<&ReadPreference>,
    session: Option<&dyn SessionState>,
) -> ReadPreference {
    if let Some(explicit) = explicit {
        return explicit.clone();
    }

    let from_transaction = session
        .filter(|s| s.is_in_transaction())
        .and_then(|s| s.transaction())
        .and_then(|t| t.read_preference());
    if let Some(preference) = from_transaction {
        return preference.clone();
    }

    client_default.cloned().unwrap_or_default()
}
