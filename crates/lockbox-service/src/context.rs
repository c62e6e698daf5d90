use serde::{Deserialize, Serialize};

/// Authorization facts about the caller, decided outside the core.
///
/// The orchestrator never looks up ownership itself. Callers resolve the
/// acting user against the property and booking first and pass the verdict
/// in with every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContext {
    pub user_id: Option<i64>,

    /// Acting user owns the property the lock belongs to.
    pub is_owner: bool,

    /// Acting user is the guest of the booking being addressed.
    pub is_booking_guest: bool,
}

impl AccessContext {
    pub fn owner(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            is_owner: true,
            is_booking_guest: false,
        }
    }

    pub fn guest(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            is_owner: false,
            is_booking_guest: true,
        }
    }

    /// Authenticated user with no relation to the lock.
    pub fn visitor(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// Platform-internal caller (booking hooks, housekeeping, CLI).
    pub fn system() -> Self {
        Self {
            user_id: None,
            is_owner: true,
            is_booking_guest: false,
        }
    }
}
