use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("Unknown lock provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid access code length: {0}")]
    InvalidCodeLength(usize),

    // Validation errors
    #[error("Invalid validity window: {0}")]
    InvalidWindow(String),

    #[error("Invalid access code: {0}")]
    InvalidCode(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    // Lifecycle errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
