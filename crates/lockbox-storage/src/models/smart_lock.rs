use chrono::{DateTime, Utc};
use lockbox_core::{Credentials, LockStatus, ProviderKind};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

/// A physical lock registered to a property.
///
/// `credentials` is skipped by serde and masked in `Debug`, so a `SmartLock`
/// can be returned to API callers or logged without leaking the provider
/// secret.
///
/// # Examples
///
/// ```
/// use lockbox_storage::models::SmartLock;
/// use lockbox_core::{Credentials, ProviderKind};
///
/// let lock = SmartLock::new(7, ProviderKind::Yale, "YL-001", "Front door")
///     .with_credentials(Credentials::new(r#"{"access_token": "t"}"#));
///
/// assert!(lock.has_credentials());
/// let json = serde_json::to_string(&lock).unwrap();
/// assert!(!json.contains("access_token"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SmartLock {
    pub id: i64,

    /// Owning property (external reference).
    pub property_id: i64,

    pub provider: ProviderKind,

    /// Lock identifier in the provider's API.
    pub provider_lock_id: String,

    pub name: String,

    /// Free-form placement label ("Back gate").
    pub location: Option<String>,

    pub status: LockStatus,

    /// 0-100, `None` until the first successful sync.
    pub battery_level: Option<i32>,

    #[serde(skip)]
    pub credentials: Option<Credentials>,

    /// Provider tuning, e.g. `{"base_url": "..."}` for generic bridges.
    pub settings: Json<serde_json::Value>,

    /// Whether confirmed bookings get a code automatically.
    pub auto_generate_codes: bool,

    pub last_synced_at: Option<DateTime<Utc>>,

    /// Last provider error seen for this lock.
    pub error_message: Option<String>,

    /// Set when the lock is soft-removed.
    pub removed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SmartLock {
    /// Unsaved lock with default settings.
    pub fn new(
        property_id: i64,
        provider: ProviderKind,
        provider_lock_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            property_id,
            provider,
            provider_lock_id: provider_lock_id.into(),
            name: name.into(),
            location: None,
            status: LockStatus::Active,
            battery_level: None,
            credentials: None,
            settings: Json(serde_json::Value::Object(serde_json::Map::new())),
            auto_generate_codes: true,
            last_synced_at: None,
            error_message: None,
            removed_at: None,
            created_at: now,
            updated_at: now,
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
        self.settings = Json(settings);
        self
    }

    /// Whether usable provider credentials are stored.
    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Local-only locks never talk to a provider when issuing codes.
    pub fn is_local_only(&self) -> bool {
        !self.has_credentials()
    }

    pub fn is_removed(&self) -> bool {
        self.removed_at.is_some()
    }
}

/// Result of a status sync, written back onto the lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockSyncUpdate {
    pub status: LockStatus,

    /// `None` keeps the previously stored level.
    pub battery_level: Option<i32>,

    /// Replaces the stored error; `None` clears it.
    pub error_message: Option<String>,

    pub synced_at: DateTime<Utc>,
}
