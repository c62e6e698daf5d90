//! Provider selection.
//!
//! Native `async fn` in traits is not object-safe, so the set of adapters is
//! closed over in [`AnyLockProvider`] and dispatched with a `match`. The
//! choice of adapter is a pure function of [`ProviderKind`]:
//!
//! ```
//! use lockbox_providers::adapters::ProviderRegistry;
//! use lockbox_providers::config::ProviderConfig;
//! use lockbox_providers::traits::LockProvider;
//! use lockbox_core::ProviderKind;
//!
//! let registry = ProviderRegistry::new(ProviderConfig::default()).unwrap();
//! for kind in ProviderKind::ALL {
//!     assert_eq!(registry.resolve(kind).kind(), kind);
//! }
//! ```

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::mock::{MockProvider, MockProviderHandle};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::{
    AugustProvider, GenericProvider, NukiProvider, SchlageProvider, YaleProvider,
};
use lockbox_core::{Credentials, ProviderKind};

/// Enum wrapper for adapter dispatch.
#[derive(Debug, Clone)]
pub enum AnyLockProvider {
    Mock(MockProvider),
    August(AugustProvider),
    Yale(YaleProvider),
    Schlage(SchlageProvider),
    Nuki(NukiProvider),
    Generic(GenericProvider),
}

impl LockProvider for AnyLockProvider {
    fn kind(&self) -> ProviderKind {
        match self {
            Self::Mock(p) => p.kind(),
            Self::August(p) => p.kind(),
            Self::Yale(p) => p.kind(),
            Self::Schlage(p) => p.kind(),
            Self::Nuki(p) => p.kind(),
            Self::Generic(p) => p.kind(),
        }
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        match self {
            Self::Mock(p) => p.test_connection(credentials).await,
            Self::August(p) => p.test_connection(credentials).await,
            Self::Yale(p) => p.test_connection(credentials).await,
            Self::Schlage(p) => p.test_connection(credentials).await,
            Self::Nuki(p) => p.test_connection(credentials).await,
            Self::Generic(p) => p.test_connection(credentials).await,
        }
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        match self {
            Self::Mock(p) => p.create_access_code(lock, code).await,
            Self::August(p) => p.create_access_code(lock, code).await,
            Self::Yale(p) => p.create_access_code(lock, code).await,
            Self::Schlage(p) => p.create_access_code(lock, code).await,
            Self::Nuki(p) => p.create_access_code(lock, code).await,
            Self::Generic(p) => p.create_access_code(lock, code).await,
        }
    }

    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>> {
        match self {
            Self::Mock(p) => p.update_access_code(lock, code).await,
            Self::August(p) => p.update_access_code(lock, code).await,
            Self::Yale(p) => p.update_access_code(lock, code).await,
            Self::Schlage(p) => p.update_access_code(lock, code).await,
            Self::Nuki(p) => p.update_access_code(lock, code).await,
            Self::Generic(p) => p.update_access_code(lock, code).await,
        }
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        match self {
            Self::Mock(p) => p.revoke_access_code(lock, code).await,
            Self::August(p) => p.revoke_access_code(lock, code).await,
            Self::Yale(p) => p.revoke_access_code(lock, code).await,
            Self::Schlage(p) => p.revoke_access_code(lock, code).await,
            Self::Nuki(p) => p.revoke_access_code(lock, code).await,
            Self::Generic(p) => p.revoke_access_code(lock, code).await,
        }
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        match self {
            Self::Mock(p) => p.remote_lock(lock).await,
            Self::August(p) => p.remote_lock(lock).await,
            Self::Yale(p) => p.remote_lock(lock).await,
            Self::Schlage(p) => p.remote_lock(lock).await,
            Self::Nuki(p) => p.remote_lock(lock).await,
            Self::Generic(p) => p.remote_lock(lock).await,
        }
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        match self {
            Self::Mock(p) => p.remote_unlock(lock).await,
            Self::August(p) => p.remote_unlock(lock).await,
            Self::Yale(p) => p.remote_unlock(lock).await,
            Self::Schlage(p) => p.remote_unlock(lock).await,
            Self::Nuki(p) => p.remote_unlock(lock).await,
            Self::Generic(p) => p.remote_unlock(lock).await,
        }
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        match self {
            Self::Mock(p) => p.sync_status(lock).await,
            Self::August(p) => p.sync_status(lock).await,
            Self::Yale(p) => p.sync_status(lock).await,
            Self::Schlage(p) => p.sync_status(lock).await,
            Self::Nuki(p) => p.sync_status(lock).await,
            Self::Generic(p) => p.sync_status(lock).await,
        }
    }
}

/// Builds adapters from configuration.
///
/// The registry owns the shared HTTP client and one mock instance, so every
/// mock lock in a process sees the same simulated devices.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    config: ProviderConfig,
    http: reqwest::Client,
    mock: MockProvider,
}

impl ProviderRegistry {
    /// # Errors
    /// Returns `ProviderError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let http = config.http_client()?;
        let (mock, _handle) = MockProvider::new();
        Ok(Self { config, http, mock })
    }

    /// Use an existing mock, typically one whose handle a test keeps.
    pub fn with_mock(mut self, mock: MockProvider) -> Self {
        self.mock = mock;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Handle to the shared mock provider.
    pub fn mock_handle(&self) -> MockProviderHandle {
        self.mock.handle()
    }

    /// The mock adapter.
    pub fn mock(&self) -> AnyLockProvider {
        AnyLockProvider::Mock(self.mock.clone())
    }

    /// Adapter for `kind`.
    pub fn resolve(&self, kind: ProviderKind) -> AnyLockProvider {
        let http = self.http.clone();
        match kind {
            ProviderKind::Mock => self.mock(),
            ProviderKind::August => AnyLockProvider::August(AugustProvider::new(
                http,
                self.config.august_api_base.clone(),
            )),
            ProviderKind::Yale => AnyLockProvider::Yale(YaleProvider::new(
                http,
                self.config.yale_api_base.clone(),
            )),
            ProviderKind::Schlage => AnyLockProvider::Schlage(SchlageProvider::new(
                http,
                self.config.schlage_api_base.clone(),
            )),
            ProviderKind::Nuki => AnyLockProvider::Nuki(NukiProvider::new(
                http,
                self.config.nuki_api_base.clone(),
            )),
            ProviderKind::Generic => AnyLockProvider::Generic(GenericProvider::new(
                http,
                self.config.generic_api_base.clone(),
            )),
        }
    }
}
