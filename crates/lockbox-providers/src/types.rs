//! Provider-facing views of locks and access codes.
//!
//! Adapters never see storage rows. The service flattens a smart lock and an
//! access code into these types before every call, which keeps the adapter
//! layer free of persistence concerns.

use chrono::{DateTime, Utc};
use lockbox_core::{CodeType, CodeValue, Credentials, ProviderKind, ValidityWindow};
use serde::{Deserialize, Serialize};

/// The physical device an operation is aimed at.
#[derive(Debug, Clone)]
pub struct LockTarget {
    /// Provider that manages the device.
    pub provider: ProviderKind,

    /// Provider-native lock identifier.
    pub device_id: String,

    /// Provider credentials, `None` for local-only locks.
    pub credentials: Option<Credentials>,

    /// Free-form provider tuning (for example a per-lock API base URL).
    pub settings: serde_json::Value,
}

impl LockTarget {
    /// Create a target with empty settings.
    pub fn new(
        provider: ProviderKind,
        device_id: impl Into<String>,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            provider,
            device_id: device_id.into(),
            credentials,
            settings: serde_json::Value::Null,
        }
    }

    /// Attach provider settings.
    pub fn with_settings(mut self, settings: serde_json::Value) -> Self {
        self.settings = settings;
        self
    }

    /// Whether any usable credentials are configured.
    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(|c| !c.is_empty())
    }

    /// String setting lookup.
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(|v| v.as_str())
    }
}

/// Access code as pushed to a provider.
#[derive(Debug, Clone)]
pub struct CodeSpec {
    /// Digits to program into the lock.
    pub code: CodeValue,

    /// Label shown in the vendor app.
    pub label: String,

    /// Code kind.
    pub code_type: CodeType,

    /// Validity window to program, where supported.
    pub window: ValidityWindow,

    /// Use budget, where supported.
    pub max_uses: Option<i64>,

    /// Id assigned by the provider on creation, if any.
    pub external_code_id: Option<String>,
}

impl CodeSpec {
    /// Window start as RFC 3339.
    pub fn starts_at(&self) -> String {
        self.window.valid_from.to_rfc3339()
    }

    /// Window end as RFC 3339, if bounded.
    pub fn ends_at(&self) -> Option<String> {
        self.window.valid_until.map(|t| t.to_rfc3339())
    }

    /// Provider id, or a configuration error naming the operation.
    pub fn require_external_id(&self, operation: &str) -> crate::Result<&str> {
        self.external_code_id.as_deref().ok_or_else(|| {
            crate::ProviderError::configuration(format!(
                "{operation} requires a provider code id"
            ))
        })
    }
}

/// Identifier a provider assigned to a created code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderCodeId(pub String);

impl ProviderCodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ProviderCodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Device state reported by a status sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSnapshot {
    /// Battery percentage, `None` if the provider does not report it.
    pub battery_level: Option<i32>,

    /// Whether the device is reachable through its bridge/cloud.
    pub online: bool,

    /// Bolt state, `None` if unknown.
    pub locked: Option<bool>,

    /// Provider-reported fault, if any.
    pub error_message: Option<String>,

    /// When the provider last heard from the device.
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl LockSnapshot {
    /// Snapshot of a reachable device with no fault.
    pub fn online(battery_level: Option<i32>) -> Self {
        Self {
            battery_level,
            online: true,
            locked: None,
            error_message: None,
            last_seen_at: None,
        }
    }

    /// Snapshot of an unreachable device.
    pub fn offline(reason: impl Into<String>) -> Self {
        Self {
            battery_level: None,
            online: false,
            locked: None,
            error_message: Some(reason.into()),
            last_seen_at: None,
        }
    }

    /// Set the bolt state.
    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    /// Set the last-seen timestamp.
    pub fn with_last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen_at = Some(at);
        self
    }
}
