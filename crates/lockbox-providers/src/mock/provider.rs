//! In-memory lock provider for local-only mode and tests.
//!
//! The mock keeps a simulated device per `device_id`: programmed codes, bolt
//! state, battery and connectivity. It is fully deterministic and never fails
//! unless a failure is configured through its [`MockProviderHandle`].

use crate::error::{ProviderError, Result};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use chrono::Utc;
use lockbox_core::{Credentials, ProviderKind};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Battery level a simulated device starts with.
const INITIAL_BATTERY_LEVEL: i32 = 100;

/// Credential blob the mock refuses in `test_connection`.
pub const MOCK_INVALID_CREDENTIALS: &str = "invalid";

/// Operations whose outcome can be scripted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    TestConnection,
    CreateCode,
    UpdateCode,
    RevokeCode,
    Lock,
    Unlock,
    Sync,
}

/// Failure to inject for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Return `ProviderError::Unavailable`.
    Unavailable,
    /// Return `ProviderError::Rejected`.
    Rejected,
}

impl MockFailure {
    fn into_error(self, operation: MockOperation) -> ProviderError {
        match self {
            MockFailure::Unavailable => {
                ProviderError::unavailable(format!("simulated outage during {operation:?}"))
            }
            MockFailure::Rejected => {
                ProviderError::rejected(format!("simulated rejection during {operation:?}"))
            }
        }
    }
}

/// Simulated device state.
#[derive(Debug, Clone)]
struct MockDevice {
    codes: BTreeMap<String, String>,
    locked: bool,
    battery_level: i32,
    online: bool,
}

impl Default for MockDevice {
    fn default() -> Self {
        Self {
            codes: BTreeMap::new(),
            locked: true,
            battery_level: INITIAL_BATTERY_LEVEL,
            online: true,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    devices: HashMap<String, MockDevice>,
    failures: HashMap<MockOperation, MockFailure>,
    calls: HashMap<MockOperation, usize>,
    latency: Option<Duration>,
    next_code_id: u64,
}

type Shared = Arc<Mutex<MockState>>;

fn lock_state(state: &Shared) -> MutexGuard<'_, MockState> {
    // A panic while holding the lock only happens in a failing test; keep going
    // with whatever state was left.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock lock provider.
///
/// Cloning is cheap and every clone shares the same simulated devices.
///
/// # Examples
///
/// ```
/// use lockbox_providers::mock::{MockFailure, MockOperation, MockProvider};
/// use lockbox_providers::traits::LockProvider;
/// use lockbox_providers::types::LockTarget;
/// use lockbox_core::ProviderKind;
///
/// #[tokio::main]
/// async fn main() {
///     let (provider, handle) = MockProvider::new();
///     let lock = LockTarget::new(ProviderKind::Mock, "front-door", None);
///
///     assert!(provider.remote_unlock(&lock).await.unwrap());
///     assert_eq!(handle.is_locked("front-door"), Some(false));
///
///     handle.fail(MockOperation::Lock, MockFailure::Unavailable);
///     assert!(provider.remote_lock(&lock).await.is_err());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    state: Shared,
}

impl MockProvider {
    /// Create a mock provider and the handle that controls it.
    pub fn new() -> (Self, MockProviderHandle) {
        let state: Shared = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockProviderHandle { state },
        )
    }

    /// Handle controlling this provider.
    pub fn handle(&self) -> MockProviderHandle {
        MockProviderHandle {
            state: self.state.clone(),
        }
    }

    /// Record the call, apply latency, and surface any scripted failure.
    async fn enter(&self, operation: MockOperation) -> Result<()> {
        let latency = {
            let mut state = lock_state(&self.state);
            *state.calls.entry(operation).or_insert(0) += 1;
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let failure = lock_state(&self.state).failures.get(&operation).copied();
        match failure {
            Some(failure) => Err(failure.into_error(operation)),
            None => Ok(()),
        }
    }

    fn with_device<T>(&self, device_id: &str, f: impl FnOnce(&mut MockDevice) -> T) -> T {
        let mut state = lock_state(&self.state);
        let device = state.devices.entry(device_id.to_string()).or_default();
        f(device)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new().0
    }
}

impl LockProvider for MockProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mock
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        self.enter(MockOperation::TestConnection).await?;
        Ok(!credentials.is_empty() && credentials.expose_secret() != MOCK_INVALID_CREDENTIALS)
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        self.enter(MockOperation::CreateCode).await?;

        let id = {
            let mut state = lock_state(&self.state);
            state.next_code_id += 1;
            format!("mock-{}", state.next_code_id)
        };

        let duplicate = self.with_device(&lock.device_id, |device| {
            if device.codes.values().any(|v| v == code.code.as_str()) {
                return true;
            }
            device.codes.insert(id.clone(), code.code.to_string());
            false
        });

        if duplicate {
            return Err(ProviderError::rejected(format!(
                "code already programmed on {}",
                lock.device_id
            )));
        }

        Ok(ProviderCodeId::new(id))
    }

    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>> {
        self.enter(MockOperation::UpdateCode).await?;
        let id = code.require_external_id("update_access_code")?;

        let known = self.with_device(&lock.device_id, |device| {
            device
                .codes
                .get_mut(id)
                .map(|value| *value = code.code.to_string())
                .is_some()
        });

        if !known {
            return Err(ProviderError::rejected(format!("unknown code id {id}")));
        }
        Ok(None)
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        self.enter(MockOperation::RevokeCode).await?;

        // Removing an unknown id is a no-op, like most vendor APIs
        if let Some(id) = code.external_code_id.as_deref() {
            self.with_device(&lock.device_id, |device| device.codes.remove(id));
        }
        Ok(())
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        self.enter(MockOperation::Lock).await?;
        Ok(self.with_device(&lock.device_id, |device| {
            if device.online {
                device.locked = true;
            }
            device.online
        }))
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        self.enter(MockOperation::Unlock).await?;
        Ok(self.with_device(&lock.device_id, |device| {
            if device.online {
                device.locked = false;
            }
            device.online
        }))
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        self.enter(MockOperation::Sync).await?;
        Ok(self.with_device(&lock.device_id, |device| {
            if device.online {
                LockSnapshot::online(Some(device.battery_level))
                    .with_locked(device.locked)
                    .with_last_seen(Utc::now())
            } else {
                LockSnapshot::offline("device is not reachable")
            }
        }))
    }
}

/// Handle for scripting and inspecting a [`MockProvider`].
///
/// The handle can be cloned and shared across tasks.
#[derive(Debug, Clone)]
pub struct MockProviderHandle {
    state: Shared,
}

impl MockProviderHandle {
    /// Make every call to `operation` fail with `failure`.
    pub fn fail(&self, operation: MockOperation, failure: MockFailure) {
        lock_state(&self.state).failures.insert(operation, failure);
    }

    /// Stop failing `operation`.
    pub fn recover(&self, operation: MockOperation) {
        lock_state(&self.state).failures.remove(&operation);
    }

    /// Clear all scripted failures.
    pub fn recover_all(&self) {
        lock_state(&self.state).failures.clear();
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        lock_state(&self.state).latency = latency;
    }

    /// Simulate a device dropping off or rejoining its bridge.
    pub fn set_online(&self, device_id: &str, online: bool) {
        let mut state = lock_state(&self.state);
        state
            .devices
            .entry(device_id.to_string())
            .or_default()
            .online = online;
    }

    /// Set the battery level the device reports.
    pub fn set_battery(&self, device_id: &str, level: i32) {
        let mut state = lock_state(&self.state);
        state
            .devices
            .entry(device_id.to_string())
            .or_default()
            .battery_level = level;
    }

    /// Code values currently programmed on the device.
    pub fn programmed_codes(&self, device_id: &str) -> Vec<String> {
        lock_state(&self.state)
            .devices
            .get(device_id)
            .map(|device| device.codes.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Bolt state, `None` if the device was never touched.
    pub fn is_locked(&self, device_id: &str) -> Option<bool> {
        lock_state(&self.state)
            .devices
            .get(device_id)
            .map(|device| device.locked)
    }

    /// Number of calls made to `operation`, failed ones included.
    pub fn calls(&self, operation: MockOperation) -> usize {
        lock_state(&self.state)
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use lockbox_core::{CodeType, CodeValue, ValidityWindow};

    fn target() -> LockTarget {
        LockTarget::new(
            ProviderKind::Mock,
            "front-door",
            Some(Credentials::new("{}")),
        )
    }

    fn spec(code: &str) -> CodeSpec {
        let now = Utc::now();
        CodeSpec {
            code: CodeValue::new(code).unwrap(),
            label: "Guest".to_string(),
            code_type: CodeType::Temporary,
            window: ValidityWindow::new(now, Some(now + ChronoDuration::days(2))).unwrap(),
            max_uses: None,
            external_code_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_revoke_code() {
        let (provider, handle) = MockProvider::new();
        let lock = target();

        let id = provider
            .create_access_code(&lock, &spec("123456"))
            .await
            .unwrap();
        assert_eq!(handle.programmed_codes("front-door"), vec!["123456"]);

        let mut programmed = spec("123456");
        programmed.external_code_id = Some(id.into_inner());
        provider
            .revoke_access_code(&lock, &programmed)
            .await
            .unwrap();
        assert!(handle.programmed_codes("front-door").is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_deterministic() {
        let (provider, _handle) = MockProvider::new();
        let lock = target();
        let first = provider
            .create_access_code(&lock, &spec("111111"))
            .await
            .unwrap();
        let second = provider
            .create_access_code(&lock, &spec("222222"))
            .await
            .unwrap();
        assert_eq!(first.as_str(), "mock-1");
        assert_eq!(second.as_str(), "mock-2");
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let (provider, _handle) = MockProvider::new();
        let lock = target();
        provider
            .create_access_code(&lock, &spec("123456"))
            .await
            .unwrap();
        let err = provider
            .create_access_code(&lock, &spec("123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_update_requires_known_id() {
        let (provider, _handle) = MockProvider::new();
        let lock = target();

        let err = provider
            .update_access_code(&lock, &spec("123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration { .. }));

        let mut unknown = spec("123456");
        unknown.external_code_id = Some("mock-99".to_string());
        let err = provider
            .update_access_code(&lock, &unknown)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected { .. }));
    }

    #[tokio::test]
    async fn test_scripted_failure_and_recovery() {
        let (provider, handle) = MockProvider::new();
        let lock = target();

        handle.fail(MockOperation::CreateCode, MockFailure::Unavailable);
        let err = provider
            .create_access_code(&lock, &spec("123456"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(handle.calls(MockOperation::CreateCode), 1);

        handle.recover(MockOperation::CreateCode);
        assert!(
            provider
                .create_access_code(&lock, &spec("123456"))
                .await
                .is_ok()
        );
        assert_eq!(handle.calls(MockOperation::CreateCode), 2);
    }

    #[tokio::test]
    async fn test_offline_device_reports_false_not_error() {
        let (provider, handle) = MockProvider::new();
        let lock = target();
        handle.set_online("front-door", false);

        assert!(!provider.remote_unlock(&lock).await.unwrap());
        assert_eq!(handle.is_locked("front-door"), Some(true));

        let snapshot = provider.sync_status(&lock).await.unwrap();
        assert!(!snapshot.online);
        assert!(snapshot.error_message.is_some());
    }

    #[tokio::test]
    async fn test_sync_reports_battery_and_bolt() {
        let (provider, handle) = MockProvider::new();
        let lock = target();
        handle.set_battery("front-door", 42);
        provider.remote_unlock(&lock).await.unwrap();

        let snapshot = provider.sync_status(&lock).await.unwrap();
        assert!(snapshot.online);
        assert_eq!(snapshot.battery_level, Some(42));
        assert_eq!(snapshot.locked, Some(false));
        assert!(snapshot.last_seen_at.is_some());
    }

    #[tokio::test]
    async fn test_connection_rejects_invalid_credentials() {
        let (provider, _handle) = MockProvider::new();
        assert!(provider.test_connection(&Credentials::new("{}")).await.unwrap());
        assert!(
            !provider
                .test_connection(&Credentials::new(MOCK_INVALID_CREDENTIALS))
                .await
                .unwrap()
        );
        assert!(!provider.test_connection(&Credentials::new("")).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_applied() {
        let (provider, handle) = MockProvider::new();
        handle.set_latency(Some(Duration::from_secs(30)));

        let lock = target();
        let result =
            tokio::time::timeout(Duration::from_secs(1), provider.remote_lock(&lock)).await;
        assert!(result.is_err(), "call should still be sleeping");
    }
}
