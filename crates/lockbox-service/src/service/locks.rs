use super::SmartLockService;
use super::codes::require_owner;
use crate::context::AccessContext;
use crate::error::{Result, ServiceError};
use crate::views::{CommandOutcome, LockRegistration, LockUpdate};
use chrono::Utc;
use lockbox_core::constants::LOW_BATTERY_THRESHOLD;
use lockbox_core::{
    ActivityEvent, Credentials, DoorState, LockStatus, validate_battery_level,
};
use lockbox_providers::{LockProvider, LockSnapshot, ProviderError};
use lockbox_storage::models::{
    ActivityFilter, CodeFilter, LockActivity, LockSyncUpdate, Page, PageRequest, SmartLock,
};
use lockbox_storage::repositories::{
    AccessCodeRepository, LockActivityRepository, SmartLockRepository,
};
use serde_json::json;
use tracing::{debug, info, warn};

const NO_CREDENTIALS: &str = "no provider credentials configured";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DoorCommand {
    Lock,
    Unlock,
}

impl DoorCommand {
    fn name(self) -> &'static str {
        match self {
            DoorCommand::Lock => "remote_lock",
            DoorCommand::Unlock => "remote_unlock",
        }
    }

    fn event(self) -> ActivityEvent {
        match self {
            DoorCommand::Lock => ActivityEvent::Locked,
            DoorCommand::Unlock => ActivityEvent::Unlocked,
        }
    }

    fn door_state(self) -> DoorState {
        match self {
            DoorCommand::Lock => DoorState::Locked,
            DoorCommand::Unlock => DoorState::Unlocked,
        }
    }
}

fn invalid(field: &str, value: impl Into<String>) -> ServiceError {
    lockbox_core::Error::InvalidValue {
        field: field.to_string(),
        value: value.into(),
    }
    .into()
}

/// Settings must be a JSON object; `null` means none.
fn normalize_settings(settings: serde_json::Value) -> Result<serde_json::Value> {
    match settings {
        serde_json::Value::Null => Ok(serde_json::Value::Object(serde_json::Map::new())),
        serde_json::Value::Object(_) => Ok(settings),
        other => Err(invalid("settings", other.to_string())),
    }
}

fn require_participant(ctx: &AccessContext, action: &'static str) -> Result<()> {
    if ctx.is_owner || ctx.is_booking_guest {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized { action })
    }
}

impl SmartLockService {
    /// Add a lock to a property.
    ///
    /// When credentials are supplied they are checked against the provider.
    /// The outcome lands in the activity log and on the lock's status; a
    /// failed check never fails the registration.
    pub async fn register_lock(
        &self,
        registration: LockRegistration,
        ctx: &AccessContext,
    ) -> Result<SmartLock> {
        require_owner(ctx, "register locks")?;

        let device_id = registration.provider_lock_id.trim();
        if device_id.is_empty() {
            return Err(invalid("provider_lock_id", registration.provider_lock_id.clone()));
        }
        if registration.name.trim().is_empty() {
            return Err(invalid("name", registration.name.clone()));
        }

        let mut lock = SmartLock::new(
            registration.property_id,
            registration.provider,
            device_id,
            registration.name.trim(),
        )
        .with_settings(normalize_settings(registration.settings)?);
        lock.location = registration.location;
        lock.credentials = registration.credentials;
        lock.auto_generate_codes = registration.auto_generate_codes;

        let lock_id = match self.locks.create(&lock).await {
            Ok(id) => id,
            Err(err) if err.is_unique_violation() => {
                return Err(invalid(
                    "provider_lock_id",
                    format!("{device_id} is already registered with {}", lock.provider),
                ));
            }
            Err(err) => return Err(err.into()),
        };
        info!(lock_id, provider = %lock.provider, property_id = lock.property_id, "Registered lock");

        let lock = self.find_lock(lock_id).await?;
        if let Some(credentials) = lock.credentials.clone().filter(|c| !c.is_empty()) {
            let _guard = self.guards.acquire(lock.id).await;
            // Registration succeeds whatever the provider says.
            let _ = self.check_connection(&lock, &credentials, ctx).await?;
        }

        self.find_lock(lock_id).await
    }

    /// Verify a lock's stored credentials with its provider.
    ///
    /// Unlike registration this surfaces the provider failure to the caller.
    pub async fn test_lock_connection(&self, lock_id: i64, ctx: &AccessContext) -> Result<bool> {
        require_owner(ctx, "test lock connections")?;

        let lock = self.live_lock(lock_id).await?;
        let credentials = lock.credentials.clone().unwrap_or_else(|| Credentials::new(""));
        let _guard = self.guards.acquire(lock.id).await;
        self.check_connection(&lock, &credentials, ctx)
            .await?
            .map_err(ServiceError::from)
    }

    /// Run `test_connection` and record the outcome. The inner result is the
    /// provider's answer; the outer one carries storage failures.
    async fn check_connection(
        &self,
        lock: &SmartLock,
        credentials: &Credentials,
        ctx: &AccessContext,
    ) -> Result<std::result::Result<bool, ProviderError>> {
        let adapter = self.adapter(lock);
        let outcome = self.call(adapter.test_connection(credentials)).await;
        let now = Utc::now();

        match &outcome {
            Ok(true) => {
                self.locks
                    .record_sync(
                        lock.id,
                        &LockSyncUpdate {
                            status: LockStatus::Active,
                            battery_level: None,
                            error_message: None,
                            synced_at: now,
                        },
                    )
                    .await?;
                self.record(
                    LockActivity::new(lock.id, ActivityEvent::SyncOk)
                        .with_user(ctx.user_id)
                        .with_metadata(json!({ "operation": "test_connection" })),
                )
                .await?;
            }
            Ok(false) => {
                let message = "credentials rejected by provider";
                warn!(lock_id = lock.id, provider = %lock.provider, "{}", message);
                self.locks
                    .record_sync(
                        lock.id,
                        &LockSyncUpdate {
                            status: LockStatus::Error,
                            battery_level: None,
                            error_message: Some(message.to_string()),
                            synced_at: now,
                        },
                    )
                    .await?;
                self.record(
                    LockActivity::new(lock.id, ActivityEvent::SyncFailed)
                        .with_user(ctx.user_id)
                        .with_metadata(json!({
                            "operation": "test_connection",
                            "error": message,
                            "transient": false,
                        })),
                )
                .await?;
            }
            Err(err) => {
                self.locks
                    .record_sync(lock.id, &failed_sync(err, now))
                    .await?;
                self.record_provider_failure(lock, None, ctx, "test_connection", err)
                    .await?;
            }
        }

        Ok(outcome)
    }

    /// Apply owner edits to a lock.
    pub async fn update_lock(
        &self,
        lock_id: i64,
        update: LockUpdate,
        ctx: &AccessContext,
    ) -> Result<SmartLock> {
        require_owner(ctx, "update locks")?;

        let mut lock = self.live_lock(lock_id).await?;
        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(invalid("name", name));
            }
            lock.name = name.trim().to_string();
        }
        if let Some(location) = update.location {
            lock.location = location;
        }
        if let Some(credentials) = update.credentials {
            lock.credentials = credentials;
        }
        if let Some(settings) = update.settings {
            lock.settings.0 = normalize_settings(settings)?;
        }
        if let Some(auto_generate) = update.auto_generate_codes {
            lock.auto_generate_codes = auto_generate;
        }
        if let Some(status) = update.status {
            lock.status = status;
        }

        self.locks.update(&lock).await?;
        debug!(lock_id, "Updated lock");
        self.find_lock(lock_id).await
    }

    /// Soft-remove a lock after revoking its outstanding codes.
    ///
    /// Provider revocations are best effort, as with [`revoke_code`].
    /// Returns the number of codes revoked.
    ///
    /// [`revoke_code`]: SmartLockService::revoke_code
    pub async fn remove_lock(&self, lock_id: i64, ctx: &AccessContext) -> Result<usize> {
        require_owner(ctx, "remove locks")?;

        let lock = self.live_lock(lock_id).await?;
        let revoked = {
            let _guard = self.guards.acquire(lock.id).await;

            let mut revoked = 0;
            for code in self.codes.find_by_lock(lock.id, &CodeFilter::default()).await? {
                if code.is_reserved() {
                    self.revoke_guarded(&lock, code.id, ctx).await?;
                    revoked += 1;
                }
            }
            self.locks.mark_removed(lock.id, Utc::now()).await?;
            revoked
        };
        self.guards.forget(lock.id);

        info!(lock_id, revoked, "Removed lock");
        Ok(revoked)
    }

    /// A live lock, for the owner or a guest of one of its bookings.
    pub async fn get_lock(&self, lock_id: i64, ctx: &AccessContext) -> Result<SmartLock> {
        require_participant(ctx, "view locks")?;
        self.live_lock(lock_id).await
    }

    /// Live locks of a property.
    pub async fn locks_for_property(
        &self,
        property_id: i64,
        ctx: &AccessContext,
    ) -> Result<Vec<SmartLock>> {
        require_participant(ctx, "view locks")?;
        Ok(self.locks.find_by_property(property_id).await?)
    }

    /// Lock the door remotely.
    pub async fn remote_lock(&self, lock_id: i64, ctx: &AccessContext) -> Result<CommandOutcome> {
        self.remote_command(lock_id, DoorCommand::Lock, ctx).await
    }

    /// Unlock the door remotely.
    pub async fn remote_unlock(&self, lock_id: i64, ctx: &AccessContext) -> Result<CommandOutcome> {
        self.remote_command(lock_id, DoorCommand::Unlock, ctx).await
    }

    /// Adapter failures and offline devices become an unsuccessful outcome
    /// plus an `error` activity, never an `Err`.
    async fn remote_command(
        &self,
        lock_id: i64,
        command: DoorCommand,
        ctx: &AccessContext,
    ) -> Result<CommandOutcome> {
        require_participant(ctx, "operate locks")?;

        let lock = self.live_lock(lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;

        let result = if Self::is_remote_capable(&lock) {
            let adapter = self.adapter(&lock);
            let target = Self::target(&lock);
            let call = async {
                match command {
                    DoorCommand::Lock => adapter.remote_lock(&target).await,
                    DoorCommand::Unlock => adapter.remote_unlock(&target).await,
                }
            };
            self.call(call).await
        } else {
            Err(ProviderError::configuration(NO_CREDENTIALS))
        };

        let failure = match result {
            Ok(true) => {
                self.record(
                    LockActivity::new(lock.id, command.event())
                        .with_user(ctx.user_id)
                        .with_metadata(json!({ "source": "remote" })),
                )
                .await?;
                info!(lock_id, command = command.name(), "Remote command succeeded");
                return Ok(CommandOutcome::succeeded(
                    command.door_state(),
                    format!("Door {}", command.door_state()),
                ));
            }
            Ok(false) => json!({
                "command": command.name(),
                "error": "lock is offline",
                "transient": true,
            }),
            Err(err) => json!({
                "command": command.name(),
                "error": err.to_string(),
                "transient": err.is_transient(),
            }),
        };

        let message = failure["error"].as_str().unwrap_or("command failed").to_string();
        warn!(lock_id, command = command.name(), "Remote command failed: {}", message);
        self.record(
            LockActivity::new(lock.id, ActivityEvent::Error)
                .with_user(ctx.user_id)
                .with_metadata(failure),
        )
        .await?;

        Ok(CommandOutcome::failed(message))
    }

    /// Pull battery, connectivity and fault state from the provider.
    ///
    /// Writes the snapshot onto the lock and appends `sync_ok`; on failure
    /// records the error on the lock and appends `sync_failed`. Either way
    /// the refreshed lock is returned.
    pub async fn sync_lock_status(&self, lock_id: i64, ctx: &AccessContext) -> Result<SmartLock> {
        require_owner(ctx, "sync locks")?;

        let lock = self.live_lock(lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;
        let now = Utc::now();

        let result = if Self::is_remote_capable(&lock) {
            let adapter = self.adapter(&lock);
            let target = Self::target(&lock);
            self.call(adapter.sync_status(&target)).await
        } else {
            Err(ProviderError::configuration(NO_CREDENTIALS))
        };

        match result {
            Ok(snapshot) => {
                let update = snapshot_update(&lock, &snapshot, now);
                if let Some(level) = update.battery_level
                    && level <= LOW_BATTERY_THRESHOLD
                {
                    warn!(lock_id, battery_level = level, "Lock battery low");
                }
                self.locks.record_sync(lock.id, &update).await?;
                self.record(
                    LockActivity::new(lock.id, ActivityEvent::SyncOk)
                        .with_user(ctx.user_id)
                        .with_metadata(json!({
                            "online": snapshot.online,
                            "battery_level": update.battery_level,
                            "locked": snapshot.locked,
                            "last_seen_at": snapshot.last_seen_at,
                        })),
                )
                .await?;
                debug!(lock_id, online = snapshot.online, "Synced lock status");
            }
            Err(err) => {
                self.locks.record_sync(lock.id, &failed_sync(&err, now)).await?;
                self.record_provider_failure(&lock, None, ctx, "sync_status", &err)
                    .await?;
            }
        }

        self.find_lock(lock_id).await
    }

    /// Activity of a lock, newest first.
    pub async fn list_activity(
        &self,
        lock_id: i64,
        filter: ActivityFilter,
        page: PageRequest,
        ctx: &AccessContext,
    ) -> Result<Page<LockActivity>> {
        require_owner(ctx, "view lock activity")?;

        let lock = self.find_lock(lock_id).await?;
        Ok(self.activity.find_by_lock(lock.id, &filter, page).await?)
    }
}

/// Lock fields to write after a successful sync.
fn snapshot_update(
    lock: &SmartLock,
    snapshot: &LockSnapshot,
    now: chrono::DateTime<Utc>,
) -> LockSyncUpdate {
    let battery_level = snapshot.battery_level.and_then(|level| {
        validate_battery_level(level)
            .map_err(|err| warn!(lock_id = lock.id, "Ignoring battery reading: {}", err))
            .ok()
    });

    // An owner-deactivated lock stays inactive whatever the device reports.
    let status = match (lock.status, snapshot.online) {
        (LockStatus::Inactive, _) => LockStatus::Inactive,
        (_, true) => LockStatus::Active,
        (_, false) => LockStatus::Offline,
    };

    LockSyncUpdate {
        status,
        battery_level,
        error_message: snapshot.error_message.clone(),
        synced_at: now,
    }
}

/// Lock fields to write after a failed provider call.
fn failed_sync(err: &ProviderError, now: chrono::DateTime<Utc>) -> LockSyncUpdate {
    LockSyncUpdate {
        status: if err.is_transient() {
            LockStatus::Offline
        } else {
            LockStatus::Error
        },
        battery_level: None,
        error_message: Some(err.to_string()),
        synced_at: now,
    }
}
