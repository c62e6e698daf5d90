//! Caller-facing error taxonomy of the orchestrator.
//!
//! Provider failures only surface here from operations whose whole purpose is
//! a provider round trip (`test_lock_connection`). Everywhere else they are
//! logged, recorded in the activity log, and folded into the return value.

use lockbox_core::CodeStatus;
use lockbox_providers::ProviderError;
use lockbox_storage::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    /// Every generated candidate collided with a reserved code.
    #[error("No unique access code after {attempts} attempts")]
    CodeSpaceExhausted { attempts: u32 },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The caller lacks the role the operation requires.
    #[error("Not authorized to {action}")]
    Unauthorized { action: &'static str },

    /// The caller has the role but the resource is not available to them now.
    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Invalid validity window: {0}")]
    InvalidWindow(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// Other malformed input (code length, provider name, settings shape).
    #[error("Invalid input: {0}")]
    Invalid(lockbox_core::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden {
            reason: reason.into(),
        }
    }

    /// Transition error for a code found in `from`.
    pub fn invalid_transition(from: CodeStatus, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<lockbox_core::Error> for ServiceError {
    fn from(err: lockbox_core::Error) -> Self {
        match err {
            lockbox_core::Error::InvalidWindow(msg) => Self::InvalidWindow(msg),
            lockbox_core::Error::InvalidStateTransition { from, to } => {
                Self::InvalidTransition { from, to }
            }
            other => Self::Invalid(other),
        }
    }
}

impl From<ProviderError> for ServiceError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Unavailable { message } => Self::ProviderUnavailable(message),
            ProviderError::Rejected { message } => Self::ProviderRejected(message),
            ProviderError::Unsupported { operation } => {
                Self::ProviderRejected(format!("unsupported operation: {operation}"))
            }
            ProviderError::Configuration { message } => Self::Configuration(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_specific_variants() {
        let err: ServiceError = lockbox_core::Error::InvalidWindow("end before start".into()).into();
        assert!(matches!(err, ServiceError::InvalidWindow(_)));

        let err: ServiceError = lockbox_core::lifecycle::transition(
            CodeStatus::Revoked,
            CodeStatus::Active,
        )
        .unwrap_err()
        .into();
        assert!(matches!(err, ServiceError::InvalidTransition { .. }));

        let err: ServiceError = lockbox_core::Error::InvalidCodeLength(2).into();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn test_provider_errors_keep_their_family() {
        let err: ServiceError = ProviderError::timeout(5000).into();
        assert!(matches!(err, ServiceError::ProviderUnavailable(_)));

        let err: ServiceError = ProviderError::rejected("bad pin").into();
        assert_eq!(err.to_string(), "Provider rejected request: bad pin");
    }
}
