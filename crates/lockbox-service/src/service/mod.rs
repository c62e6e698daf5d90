//! The orchestrator.
//!
//! [`SmartLockService`] owns the repositories, the provider registry, and the
//! per-lock guards. Local state is authoritative: provider failures are
//! logged, written to the activity log, and never roll back a local
//! transition.
//!
//! Operations are grouped by concern:
//!
//! - `codes`: issuance, revocation, visibility, use recording
//! - `locks`: registry, remote commands, status sync
//! - `sweep`: expiry and pending-code resync

mod codes;
mod locks;
mod sweep;

pub use sweep::{ResyncReport, SweepReport};

use crate::config::ServiceConfig;
use crate::context::AccessContext;
use crate::error::{Result, ServiceError};
use crate::guards::LockGuards;
use lockbox_core::{ActivityEvent, CodeGenerator, RandomCodeGenerator};
use lockbox_providers::adapters::AnyLockProvider;
use lockbox_providers::types::{CodeSpec, LockTarget};
use lockbox_providers::{ProviderError, ProviderRegistry};
use lockbox_storage::Database;
use lockbox_storage::models::{AccessCode, LockActivity, SmartLock};
use lockbox_storage::repositories::{
    AccessCodeRepository, LockActivityRepository, SmartLockRepository,
    SqliteAccessCodeRepository, SqliteLockActivityRepository, SqliteSmartLockRepository,
};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

/// Smart-lock access control orchestrator.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct SmartLockService {
    locks: SqliteSmartLockRepository,
    codes: SqliteAccessCodeRepository,
    activity: SqliteLockActivityRepository,
    providers: ProviderRegistry,
    generator: Arc<dyn CodeGenerator>,
    config: ServiceConfig,
    guards: LockGuards,
}

impl SmartLockService {
    /// Build a service over `db` with random code generation.
    ///
    /// # Errors
    /// Returns an error if `config` does not validate.
    pub fn new(db: &Database, providers: ProviderRegistry, config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let pool = db.pool().clone();
        Ok(Self {
            locks: SqliteSmartLockRepository::new(pool.clone()),
            codes: SqliteAccessCodeRepository::new(pool.clone()),
            activity: SqliteLockActivityRepository::new(pool),
            providers,
            generator: Arc::new(RandomCodeGenerator::new()),
            config,
            guards: LockGuards::default(),
        })
    }

    /// Replace the code generator.
    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Run an adapter call under the configured deadline.
    async fn call<T>(
        &self,
        fut: impl Future<Output = lockbox_providers::Result<T>>,
    ) -> lockbox_providers::Result<T> {
        match tokio::time::timeout(self.config.provider_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::timeout(self.config.provider_timeout_ms())),
        }
    }

    fn adapter(&self, lock: &SmartLock) -> AnyLockProvider {
        self.providers.resolve(lock.provider)
    }

    /// The provider-facing view of a stored lock.
    fn target(lock: &SmartLock) -> LockTarget {
        LockTarget::new(
            lock.provider,
            lock.provider_lock_id.clone(),
            lock.credentials.clone(),
        )
        .with_settings(lock.settings.0.clone())
    }

    /// The provider-facing view of a stored code.
    fn spec(code: &AccessCode) -> Result<CodeSpec> {
        let label = match code.booking_id {
            Some(booking_id) => format!("Booking {booking_id}"),
            None => format!("Access code {}", code.id),
        };
        Ok(CodeSpec {
            code: code.code_value()?,
            label,
            code_type: code.code_type,
            window: lockbox_core::validity::CodeValidity::window(code),
            max_uses: code.max_uses,
            external_code_id: code.external_code_id.clone(),
        })
    }

    /// Whether the lock can be driven remotely. The mock never needs credentials.
    fn is_remote_capable(lock: &SmartLock) -> bool {
        lock.has_credentials() || lock.provider == lockbox_core::ProviderKind::Mock
    }

    async fn find_lock(&self, lock_id: i64) -> Result<SmartLock> {
        self.locks
            .find_by_id(lock_id)
            .await?
            .ok_or(ServiceError::not_found("SmartLock", lock_id))
    }

    /// A lock that has not been removed.
    async fn live_lock(&self, lock_id: i64) -> Result<SmartLock> {
        let lock = self.find_lock(lock_id).await?;
        if lock.is_removed() {
            return Err(ServiceError::not_found("SmartLock", lock_id));
        }
        Ok(lock)
    }

    async fn find_code(&self, code_id: i64) -> Result<AccessCode> {
        self.codes
            .find_by_id(code_id)
            .await?
            .ok_or(ServiceError::not_found("AccessCode", code_id))
    }

    async fn record(&self, activity: LockActivity) -> Result<()> {
        self.activity.append(&activity).await?;
        Ok(())
    }

    /// Log a swallowed provider failure and append a `sync_failed` entry.
    async fn record_provider_failure(
        &self,
        lock: &SmartLock,
        code_id: Option<i64>,
        ctx: &AccessContext,
        operation: &'static str,
        err: &ProviderError,
    ) -> Result<()> {
        warn!(
            lock_id = lock.id,
            code_id,
            provider = %lock.provider,
            operation,
            transient = err.is_transient(),
            "Provider call failed: {}",
            err
        );
        let mut activity = LockActivity::new(lock.id, ActivityEvent::SyncFailed)
            .with_user(ctx.user_id)
            .with_metadata(json!({
                "operation": operation,
                "error": err.to_string(),
                "transient": err.is_transient(),
            }));
        if let Some(code_id) = code_id {
            activity = activity.with_code(code_id);
        }
        self.record(activity).await
    }
}
