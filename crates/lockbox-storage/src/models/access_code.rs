use chrono::{DateTime, Utc};
use lockbox_core::validity::CodeValidity;
use lockbox_core::{CodeStatus, CodeType, CodeValue, ValidityWindow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An access code programmed (or to be programmed) into a smart lock.
///
/// The row carries the raw `code`. Callers outside the service must go
/// through a masking view; `Debug` never prints the digits.
///
/// Validity is evaluated lazily through [`CodeValidity`]:
///
/// ```
/// use lockbox_storage::models::AccessCode;
/// use lockbox_core::validity::CodeValidity;
/// use lockbox_core::{CodeStatus, CodeType, ValidityWindow};
/// use chrono::{Duration, Utc};
///
/// let now = Utc::now();
/// let window = ValidityWindow::new(now, Some(now + Duration::days(2))).unwrap();
/// let mut code = AccessCode::new(1, "482913", CodeType::Temporary, window);
/// assert!(!code.is_valid_at(now), "pending codes are not usable");
///
/// code.status = CodeStatus::Active;
/// assert!(code.is_valid_at(now + Duration::hours(1)));
/// assert!(!code.is_valid_at(now + Duration::days(3)));
/// ```
#[derive(Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccessCode {
    pub id: i64,
    pub smart_lock_id: i64,

    /// Raw digits.
    pub code: String,

    pub code_type: CodeType,
    pub status: CodeStatus,
    pub valid_from: DateTime<Utc>,

    /// `None` for codes with no end.
    pub valid_until: Option<DateTime<Utc>>,

    pub max_uses: Option<i64>,
    pub uses_count: i64,

    /// Id the provider assigned when the code was programmed.
    pub external_code_id: Option<String>,

    pub booking_id: Option<i64>,

    /// Guest the code was issued to.
    pub user_id: Option<i64>,

    pub notes: Option<String>,

    /// When the last provider push failed, if it did.
    pub sync_failed_at: Option<DateTime<Utc>>,

    /// The provider refused the code outright; it is not pushed again
    /// automatically.
    pub sync_rejected: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessCode {
    /// Unsaved pending code. The use budget defaults from the code type.
    pub fn new(
        smart_lock_id: i64,
        code: impl Into<String>,
        code_type: CodeType,
        window: ValidityWindow,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            smart_lock_id,
            code: code.into(),
            code_type,
            status: CodeStatus::Pending,
            valid_from: window.valid_from,
            valid_until: window.valid_until,
            max_uses: code_type.default_max_uses(),
            uses_count: 0,
            external_code_id: None,
            booking_id: None,
            user_id: None,
            notes: None,
            sync_failed_at: None,
            sync_rejected: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validated code value.
    ///
    /// # Errors
    /// Returns `lockbox_core::Error::InvalidCode` if the stored digits are malformed.
    pub fn code_value(&self) -> lockbox_core::Result<CodeValue> {
        CodeValue::new(&self.code)
    }

    /// Whether the code still holds its value in the lock's reserved set.
    pub fn is_reserved(&self) -> bool {
        self.status.reserves_code()
    }
}

impl CodeValidity for AccessCode {
    fn status(&self) -> CodeStatus {
        self.status
    }

    fn window(&self) -> ValidityWindow {
        ValidityWindow {
            valid_from: self.valid_from,
            valid_until: self.valid_until,
        }
    }

    fn max_uses(&self) -> Option<i64> {
        self.max_uses
    }

    fn uses_count(&self) -> i64 {
        self.uses_count
    }
}

impl fmt::Debug for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessCode")
            .field("id", &self.id)
            .field("smart_lock_id", &self.smart_lock_id)
            .field("code", &"<hidden>")
            .field("code_type", &self.code_type)
            .field("status", &self.status)
            .field("valid_from", &self.valid_from)
            .field("valid_until", &self.valid_until)
            .field("max_uses", &self.max_uses)
            .field("uses_count", &self.uses_count)
            .field("external_code_id", &self.external_code_id)
            .field("booking_id", &self.booking_id)
            .field("user_id", &self.user_id)
            .field("sync_rejected", &self.sync_rejected)
            .finish_non_exhaustive()
    }
}

/// Optional filters for listing a lock's codes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeFilter {
    pub status: Option<CodeStatus>,
    pub code_type: Option<CodeType>,
}

impl CodeFilter {
    pub fn with_status(mut self, status: CodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_type(mut self, code_type: CodeType) -> Self {
        self.code_type = Some(code_type);
        self
    }
}
