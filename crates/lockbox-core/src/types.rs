use crate::{
    Result,
    constants::{MAX_BATTERY_LEVEL, MAX_CODE_LENGTH, MIN_CODE_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// Lock vendor integration backing a smart lock.
///
/// The set is closed: every variant has an adapter compiled into
/// `lockbox-providers`, and there is no runtime plugin loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ProviderKind {
    Mock,
    August,
    Yale,
    Schlage,
    Nuki,
    Generic,
}

impl ProviderKind {
    /// Every supported provider, in display order.
    pub const ALL: [ProviderKind; 6] = [
        ProviderKind::Mock,
        ProviderKind::August,
        ProviderKind::Yale,
        ProviderKind::Schlage,
        ProviderKind::Nuki,
        ProviderKind::Generic,
    ];

    /// Stable lowercase identifier used in storage and configuration.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::August => "august",
            ProviderKind::Yale => "yale",
            ProviderKind::Schlage => "schlage",
            ProviderKind::Nuki => "nuki",
            ProviderKind::Generic => "generic",
        }
    }

    /// Human-readable vendor name.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Mock => "Mock",
            ProviderKind::August => "August",
            ProviderKind::Yale => "Yale",
            ProviderKind::Schlage => "Schlage",
            ProviderKind::Nuki => "Nuki",
            ProviderKind::Generic => "Generic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    /// Parse a provider identifier.
    ///
    /// # Errors
    /// Returns `Error::UnknownProvider` for anything outside the supported set.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        ProviderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}

/// Operational status of a smart lock as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum LockStatus {
    Active,
    Inactive,
    Offline,
    Error,
}

impl LockStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LockStatus::Active => "active",
            LockStatus::Inactive => "inactive",
            LockStatus::Offline => "offline",
            LockStatus::Error => "error",
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of access code, which decides its default validity rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum CodeType {
    /// Bounded by a validity window (the usual booking code).
    Temporary,
    /// No end date.
    Permanent,
    /// Good for a single use.
    OneTime,
}

impl CodeType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CodeType::Temporary => "temporary",
            CodeType::Permanent => "permanent",
            CodeType::OneTime => "one_time",
        }
    }

    /// Use budget applied when the caller does not set one.
    #[must_use]
    pub fn default_max_uses(self) -> Option<i64> {
        match self {
            CodeType::OneTime => Some(1),
            CodeType::Temporary | CodeType::Permanent => None,
        }
    }
}

impl fmt::Display for CodeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temporary" => Ok(CodeType::Temporary),
            "permanent" => Ok(CodeType::Permanent),
            "one_time" | "one-time" => Ok(CodeType::OneTime),
            other => Err(Error::InvalidValue {
                field: "code_type".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of an access code.
///
/// See [`crate::lifecycle`] for the allowed transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum CodeStatus {
    Pending,
    Active,
    Expired,
    Revoked,
    Claimed,
}

impl CodeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CodeStatus::Pending => "pending",
            CodeStatus::Active => "active",
            CodeStatus::Expired => "expired",
            CodeStatus::Revoked => "revoked",
            CodeStatus::Claimed => "claimed",
        }
    }
}

impl fmt::Display for CodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(CodeStatus::Pending),
            "active" => Ok(CodeStatus::Active),
            "expired" => Ok(CodeStatus::Expired),
            "revoked" => Ok(CodeStatus::Revoked),
            "claimed" => Ok(CodeStatus::Claimed),
            other => Err(Error::InvalidValue {
                field: "status".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// Event recorded in the lock activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
pub enum ActivityEvent {
    CodeCreated,
    CodeUsed,
    CodeRevoked,
    Locked,
    Unlocked,
    SyncFailed,
    SyncOk,
    Error,
}

impl ActivityEvent {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityEvent::CodeCreated => "code_created",
            ActivityEvent::CodeUsed => "code_used",
            ActivityEvent::CodeRevoked => "code_revoked",
            ActivityEvent::Locked => "locked",
            ActivityEvent::Unlocked => "unlocked",
            ActivityEvent::SyncFailed => "sync_failed",
            ActivityEvent::SyncOk => "sync_ok",
            ActivityEvent::Error => "error",
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityEvent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let event = match s.trim().to_ascii_lowercase().as_str() {
            "code_created" => ActivityEvent::CodeCreated,
            "code_used" => ActivityEvent::CodeUsed,
            "code_revoked" => ActivityEvent::CodeRevoked,
            "locked" => ActivityEvent::Locked,
            "unlocked" => ActivityEvent::Unlocked,
            "sync_failed" => ActivityEvent::SyncFailed,
            "sync_ok" => ActivityEvent::SyncOk,
            "error" => ActivityEvent::Error,
            other => {
                return Err(Error::InvalidValue {
                    field: "event_type".to_string(),
                    value: other.to_string(),
                });
            }
        };
        Ok(event)
    }
}

/// Door state reported back to callers after a remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    Locked,
    Unlocked,
    /// The command failed; the physical door state is unknown.
    Error,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DoorState::Locked => write!(f, "locked"),
            DoorState::Unlocked => write!(f, "unlocked"),
            DoorState::Error => write!(f, "error"),
        }
    }
}

/// Opaque provider credentials.
///
/// The blob is usually a JSON object (`{"api_key": "..."}`) but adapters must
/// tolerate a bare token. It deliberately implements neither `Serialize` nor
/// a revealing `Debug`, so it cannot leak through API representations or logs.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Credentials(String);

impl Credentials {
    /// Wrap a credential blob.
    pub fn new(blob: impl Into<String>) -> Self {
        Credentials(blob.into())
    }

    /// Raw secret, for adapters only.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Whether the blob carries anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Look up a string field of a JSON-object blob.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(&self.0).ok()?;
        value.get(key)?.as_str().map(str::to_string)
    }

    /// Bearer token for the provider API.
    ///
    /// Looks for `access_token`, then `api_key`, then `token`; a blob that is
    /// not a JSON object is taken as the token itself.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        if serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&self.0).is_err() {
            return Some(self.0.trim().to_string());
        }
        ["access_token", "api_key", "token"]
            .iter()
            .find_map(|key| self.field(key))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// Numeric access code value.
///
/// # Security
/// Comparison is constant-time so code verification does not leak how many
/// leading digits matched.
#[derive(Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CodeValue(String);

impl CodeValue {
    /// Validate a code value.
    ///
    /// # Errors
    /// Returns `Error::InvalidCode` if the value is not all ASCII digits or its
    /// length is outside `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`.
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();
        let len = value.len();
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) {
            return Err(Error::InvalidCode(format!(
                "Code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} digits, got {len}"
            )));
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidCode("Code must contain only digits".to_string()));
        }
        Ok(CodeValue(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for CodeValue {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CodeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for CodeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CodeValue({} digits)", self.0.len())
    }
}

impl fmt::Display for CodeValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CodeValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CodeValue::new(s)
    }
}

impl TryFrom<String> for CodeValue {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CodeValue::new(&value)
    }
}

impl From<CodeValue> for String {
    fn from(value: CodeValue) -> String {
        value.0
    }
}

/// Validate a battery percentage reported by a provider.
///
/// # Errors
/// Returns `Error::InvalidValue` outside `0..=100`.
pub fn validate_battery_level(level: i32) -> Result<i32> {
    if !(0..=MAX_BATTERY_LEVEL).contains(&level) {
        return Err(Error::InvalidValue {
            field: "battery_level".to_string(),
            value: level.to_string(),
        });
    }
    Ok(level)
}
