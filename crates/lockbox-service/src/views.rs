//! Caller-facing shapes: masked code views, command outcomes, and the
//! request types the orchestrator accepts.

use chrono::{DateTime, Utc};
use lockbox_core::constants::MASKED_CODE;
use lockbox_core::validity::CodeValidity;
use lockbox_core::{CodeStatus, CodeType, Credentials, DoorState, LockStatus, ProviderKind, ValidityWindow};
use lockbox_storage::models::AccessCode;
use serde::Serialize;

/// An access code as shown to a caller.
///
/// `code` holds the digits only when the caller may see them; otherwise it
/// is [`MASKED_CODE`]. Nothing else in the view is secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessCodeView {
    pub id: i64,
    pub smart_lock_id: i64,
    pub code: String,
    pub revealed: bool,
    pub code_type: CodeType,
    pub status: CodeStatus,
    pub valid_from: DateTime<Utc>,
    pub valid_until: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
    pub uses_count: i64,
    pub booking_id: Option<i64>,

    /// Lazily evaluated validity at the time the view was built.
    pub is_valid: bool,

    /// The provider refused to program the code; it waits for the owner.
    pub provider_rejected: bool,

    pub created_at: DateTime<Utc>,
}

impl AccessCodeView {
    fn build(code: &AccessCode, revealed: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: code.id,
            smart_lock_id: code.smart_lock_id,
            code: if revealed {
                code.code.clone()
            } else {
                MASKED_CODE.to_string()
            },
            revealed,
            code_type: code.code_type,
            status: code.status,
            valid_from: code.valid_from,
            valid_until: code.valid_until,
            max_uses: code.max_uses,
            uses_count: code.uses_count,
            booking_id: code.booking_id,
            is_valid: code.is_valid_at(now),
            provider_rejected: code.sync_rejected,
            created_at: code.created_at,
        }
    }

    pub fn revealed(code: &AccessCode, now: DateTime<Utc>) -> Self {
        Self::build(code, true, now)
    }

    pub fn masked(code: &AccessCode, now: DateTime<Utc>) -> Self {
        Self::build(code, false, now)
    }
}

/// Result of a remote lock or unlock command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub status: DoorState,
    pub message: String,
}

impl CommandOutcome {
    pub(crate) fn succeeded(status: DoorState, message: impl Into<String>) -> Self {
        Self {
            success: true,
            status,
            message: message.into(),
        }
    }

    pub(crate) fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: DoorState::Error,
            message: message.into(),
        }
    }
}

/// Everything needed to issue one access code.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueCodeRequest {
    pub smart_lock_id: i64,
    pub window: ValidityWindow,
    pub code_type: CodeType,

    /// `None` takes the code type's default budget.
    pub max_uses: Option<i64>,

    pub booking_id: Option<i64>,

    /// Guest the code is issued to.
    pub user_id: Option<i64>,

    pub notes: Option<String>,
}

impl IssueCodeRequest {
    pub fn new(smart_lock_id: i64, window: ValidityWindow, code_type: CodeType) -> Self {
        Self {
            smart_lock_id,
            window,
            code_type,
            max_uses: None,
            booking_id: None,
            user_id: None,
            notes: None,
        }
    }

    /// Temporary code for a confirmed booking.
    pub fn for_booking(
        smart_lock_id: i64,
        booking_id: i64,
        guest_user_id: i64,
        window: ValidityWindow,
    ) -> Self {
        Self {
            booking_id: Some(booking_id),
            user_id: Some(guest_user_id),
            ..Self::new(smart_lock_id, window, CodeType::Temporary)
        }
    }

    pub fn with_max_uses(mut self, max_uses: i64) -> Self {
        self.max_uses = Some(max_uses);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A lock to add to a property.
#[derive(Debug, Clone)]
pub struct LockRegistration {
    pub property_id: i64,
    pub provider: ProviderKind,
    pub provider_lock_id: String,
    pub name: String,
    pub location: Option<String>,
    pub credentials: Option<Credentials>,
    pub settings: serde_json::Value,
    pub auto_generate_codes: bool,
}

impl LockRegistration {
    pub fn new(
        property_id: i64,
        provider: ProviderKind,
        provider_lock_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            property_id,
            provider,
            provider_lock_id: provider_lock_id.into(),
            name: name.into(),
            location: None,
            credentials: None,
            settings: serde_json::Value::Object(serde_json::Map::new()),
            auto_generate_codes: true,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }
}

/// Owner edits to a lock. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct LockUpdate {
    pub name: Option<String>,

    /// `Some(None)` clears the location.
    pub location: Option<Option<String>>,

    /// `Some(None)` drops the credentials, turning the lock local-only.
    pub credentials: Option<Option<Credentials>>,

    pub settings: Option<serde_json::Value>,
    pub auto_generate_codes: Option<bool>,
    pub status: Option<LockStatus>,
}
