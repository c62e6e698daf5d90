//! Mock provider for local-only locks, development, and tests.
//!
//! The simulated devices are controlled through [`MockProviderHandle`], which
//! can inject failures, add latency, and inspect what was programmed.

pub mod provider;

pub use provider::{
    MOCK_INVALID_CREDENTIALS, MockFailure, MockOperation, MockProvider, MockProviderHandle,
};
