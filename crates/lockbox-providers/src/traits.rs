//! Lock provider capability contract.
//!
//! Every vendor integration implements [`LockProvider`]. The trait uses native
//! `async fn` methods (Edition 2024 RPITIT), so it is not object-safe; dynamic
//! selection goes through the [`AnyLockProvider`](crate::adapters::AnyLockProvider)
//! enum instead of `Box<dyn LockProvider>`.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use lockbox_core::{Credentials, ProviderKind};

/// Lock provider abstraction.
///
/// # Failure contract
///
/// - Code management calls fail with [`ProviderError::Unavailable`] for
///   transient conditions and [`ProviderError::Rejected`] for permanent ones.
/// - [`remote_lock`](LockProvider::remote_lock) and
///   [`remote_unlock`](LockProvider::remote_unlock) report an offline device as
///   `Ok(false)`; they return `Err` only for transport or configuration faults.
///
/// Implementations never enforce deadlines themselves; the caller wraps each
/// call in a timeout.
///
/// # Examples
///
/// ```no_run
/// use lockbox_providers::traits::LockProvider;
/// use lockbox_providers::types::{CodeSpec, LockTarget};
/// use lockbox_providers::Result;
///
/// async fn push_code<P: LockProvider>(provider: &P, lock: &LockTarget, code: &CodeSpec) -> Result<String> {
///     let id = provider.create_access_code(lock, code).await?;
///     Ok(id.into_inner())
/// }
/// ```
///
/// [`ProviderError::Unavailable`]: crate::ProviderError::Unavailable
/// [`ProviderError::Rejected`]: crate::ProviderError::Rejected
pub trait LockProvider: Send + Sync {
    /// Provider this adapter speaks to.
    fn kind(&self) -> ProviderKind;

    /// Check that `credentials` are accepted by the provider.
    ///
    /// Returns `Ok(false)` when the provider answers but refuses the
    /// credentials.
    async fn test_connection(&self, credentials: &Credentials) -> Result<bool>;

    /// Program a new access code into the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unreachable or refuses the code.
    async fn create_access_code(&self, lock: &LockTarget, code: &CodeSpec)
    -> Result<ProviderCodeId>;

    /// Push changed window or budget for an existing code.
    ///
    /// Providers without native update support delete and re-create the code
    /// and return the new provider id; otherwise `Ok(None)`.
    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>>;

    /// Remove an access code from the lock.
    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()>;

    /// Engage the bolt. `Ok(false)` when the device could not be reached.
    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool>;

    /// Retract the bolt. `Ok(false)` when the device could not be reached.
    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool>;

    /// Fetch battery, connectivity and fault state.
    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot>;
}
