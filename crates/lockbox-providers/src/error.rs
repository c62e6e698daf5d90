//! Error types for lock provider operations.
//!
//! Provider failures split into two families that callers treat differently:
//! transient ones ([`ProviderError::Unavailable`]) are safe to retry later,
//! permanent ones ([`ProviderError::Rejected`]) must be surfaced to the
//! property owner and never retried automatically.

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur while talking to a lock provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Network failure, timeout, or 5xx from the provider.
    #[error("Provider unavailable: {message}")]
    Unavailable { message: String },

    /// Provider refused the request (bad credentials, unknown lock, invalid code).
    #[error("Provider rejected request: {message}")]
    Rejected { message: String },

    /// Operation is not supported by this provider.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Lock or adapter is misconfigured (missing credentials, bad base URL).
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ProviderError {
    /// Create a new unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new rejected error.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create the error reported when a call exceeds its deadline.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::unavailable(format!("no response within {duration_ms}ms"))
    }

    /// Whether retrying later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    /// Whether the provider refused the request itself. Repeating it
    /// unchanged fails the same way.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Unsupported { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            return Self::unavailable(err.to_string());
        }
        if err.is_builder() {
            return Self::configuration(err.to_string());
        }
        match err.status() {
            Some(status) if status.is_server_error() => Self::unavailable(err.to_string()),
            Some(status) if status.is_client_error() => Self::rejected(err.to_string()),
            _ => Self::unavailable(err.to_string()),
        }
    }
}
