//! REST adapters for the supported vendor clouds.
//!
//! Each adapter is a thin translation of [`LockProvider`](crate::traits::LockProvider)
//! calls into the vendor's HTTP API. None of them keep state beyond the shared
//! HTTP client, so they are cheap to construct per call.

pub mod august;
pub mod generic;
pub mod nuki;
pub mod schlage;
pub mod yale;

pub use august::AugustProvider;
pub use generic::GenericProvider;
pub use nuki::NukiProvider;
pub use schlage::SchlageProvider;
pub use yale::YaleProvider;

use crate::error::{ProviderError, Result};
use crate::types::LockTarget;
use lockbox_core::Credentials;

/// API token from a credential blob.
pub(crate) fn token_from(credentials: &Credentials) -> Result<String> {
    credentials
        .token()
        .ok_or_else(|| ProviderError::configuration("credentials carry no API token"))
}

/// API token for the lock's configured credentials.
pub(crate) fn lock_token(lock: &LockTarget) -> Result<String> {
    match &lock.credentials {
        Some(credentials) => token_from(credentials),
        None => Err(ProviderError::configuration(format!(
            "no provider credentials configured for {}",
            lock.device_id
        ))),
    }
}
