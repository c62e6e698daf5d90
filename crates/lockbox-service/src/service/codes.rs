use super::SmartLockService;
use crate::context::AccessContext;
use crate::error::{Result, ServiceError};
use crate::views::{AccessCodeView, IssueCodeRequest};
use chrono::{DateTime, Utc};
use lockbox_core::lifecycle::{RevokeOutcome, revoke_outcome, transition};
use lockbox_core::validity::CodeValidity;
use lockbox_core::{ActivityEvent, CodeStatus, CodeType, CodeValue, ProviderKind, ValidityWindow};
use lockbox_providers::LockProvider;
use lockbox_storage::models::{AccessCode, CodeFilter, LockActivity, SmartLock};
use lockbox_storage::repositories::AccessCodeRepository;
use serde_json::json;
use tracing::{debug, info, warn};

pub(super) fn require_owner(ctx: &AccessContext, action: &'static str) -> Result<()> {
    if ctx.is_owner {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized { action })
    }
}

/// Whether a guest caller is the one the code was issued to.
fn issued_to_caller(code: &AccessCode, ctx: &AccessContext) -> bool {
    match (code.user_id, ctx.user_id) {
        (Some(owner), Some(caller)) => owner == caller,
        (Some(_), None) => false,
        (None, _) => true,
    }
}

/// What [`SmartLockService::push_pending`] did with a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PushOutcome {
    Activated,
    Failed,
    /// The code was no longer pending.
    Skipped,
}

fn validate_max_uses(max_uses: Option<i64>) -> Result<()> {
    match max_uses {
        Some(max) if max < 1 => Err(lockbox_core::Error::InvalidValue {
            field: "max_uses".to_string(),
            value: max.to_string(),
        }
        .into()),
        _ => Ok(()),
    }
}

impl SmartLockService {
    /// Issue a new access code on a lock.
    ///
    /// The code is persisted as `pending` first, then pushed to the provider
    /// under the lock's guard. Locks without credentials get an `active`
    /// code straight away. A provider failure leaves the code `pending`,
    /// appends one `sync_failed` entry, and still returns the code; the
    /// sweep retries it later unless the provider rejected it outright.
    ///
    /// # Errors
    /// - `Unauthorized` unless the caller owns the lock
    /// - `NotFound` for an unknown or removed lock
    /// - `CodeSpaceExhausted` when no unique value was found in the
    ///   configured number of attempts
    pub async fn issue_code(
        &self,
        request: IssueCodeRequest,
        ctx: &AccessContext,
    ) -> Result<AccessCode> {
        require_owner(ctx, "issue access codes")?;
        validate_max_uses(request.max_uses)?;

        let lock = self.live_lock(request.smart_lock_id).await?;
        let code_id = self.reserve_code(&lock, &request).await?;

        let _guard = self.guards.acquire(lock.id).await;
        self.push_pending(&lock, code_id, ctx, false).await?;

        self.find_code(code_id).await
    }

    /// Program a pending code onto its lock and activate it.
    ///
    /// Must run under the lock's guard. A code that left `pending` before
    /// or during the provider call is not activated; if the provider
    /// already programmed it, the provider copy is withdrawn again.
    pub(super) async fn push_pending(
        &self,
        lock: &SmartLock,
        code_id: i64,
        ctx: &AccessContext,
        resynced: bool,
    ) -> Result<PushOutcome> {
        let code = self.find_code(code_id).await?;
        if code.status != CodeStatus::Pending {
            debug!(
                lock_id = lock.id,
                code_id,
                status = %code.status,
                "Code no longer pending, not pushing"
            );
            return Ok(PushOutcome::Skipped);
        }

        if lock.is_local_only() {
            if !self.codes.activate(code.id, None, Utc::now()).await? {
                return Ok(PushOutcome::Skipped);
            }
            self.record(
                LockActivity::new(lock.id, ActivityEvent::CodeCreated)
                    .with_code(code.id)
                    .with_user(ctx.user_id)
                    .with_metadata(json!({
                        "local_only": true,
                        "code_type": code.code_type,
                        "resynced": resynced,
                    })),
            )
            .await?;
            info!(lock_id = lock.id, code_id, "Activated local-only access code");
            return Ok(PushOutcome::Activated);
        }

        let adapter = self.adapter(lock);
        let target = Self::target(lock);
        let mut spec = Self::spec(&code)?;
        let external_id = match self.call(adapter.create_access_code(&target, &spec)).await {
            Ok(external_id) => external_id,
            Err(err) => {
                self.codes
                    .record_sync_failure(code.id, err.is_rejection(), Utc::now())
                    .await?;
                self.record_provider_failure(lock, Some(code.id), ctx, "create_access_code", &err)
                    .await?;
                return Ok(PushOutcome::Failed);
            }
        };

        if !self
            .codes
            .activate(code.id, Some(external_id.as_str()), Utc::now())
            .await?
        {
            // Revoked or expired while the provider call was in flight.
            warn!(
                lock_id = lock.id,
                code_id,
                provider = %lock.provider,
                "Code left pending during provider create, withdrawing it"
            );
            spec.external_code_id = Some(external_id.as_str().to_string());
            if let Err(err) = self.call(adapter.revoke_access_code(&target, &spec)).await {
                self.codes
                    .set_external_id(code.id, Some(external_id.as_str()), Utc::now())
                    .await?;
                self.record_provider_failure(lock, Some(code.id), ctx, "revoke_access_code", &err)
                    .await?;
            }
            return Ok(PushOutcome::Skipped);
        }

        self.record(
            LockActivity::new(lock.id, ActivityEvent::CodeCreated)
                .with_code(code.id)
                .with_user(ctx.user_id)
                .with_metadata(json!({
                    "external_code_id": external_id.as_str(),
                    "code_type": code.code_type,
                    "resynced": resynced,
                })),
        )
        .await?;
        info!(
            lock_id = lock.id,
            code_id,
            provider = %lock.provider,
            resynced,
            "Programmed access code"
        );
        Ok(PushOutcome::Activated)
    }

    /// Find and insert a value no pending or active code of the lock holds.
    ///
    /// The lookup avoids most collisions; the partial unique index catches
    /// the rest, and either way the attempt is spent and nothing is left
    /// behind.
    async fn reserve_code(&self, lock: &SmartLock, request: &IssueCodeRequest) -> Result<i64> {
        let attempts = self.config.max_generation_attempts;

        for attempt in 1..=attempts {
            let candidate = self.generator.generate(self.config.code_length);
            let value = CodeValue::new(&candidate)?;

            // Nuki keypads refuse leading zeros.
            if lock.provider == ProviderKind::Nuki && value.as_str().starts_with('0') {
                debug!(lock_id = lock.id, attempt, "Skipping code with leading zero");
                continue;
            }

            if self
                .codes
                .find_reserved(lock.id, value.as_str())
                .await?
                .is_some()
            {
                debug!(lock_id = lock.id, attempt, "Generated code collides with a reserved code");
                continue;
            }

            let mut code = AccessCode::new(lock.id, value.as_str(), request.code_type, request.window);
            if request.max_uses.is_some() {
                code.max_uses = request.max_uses;
            }
            code.booking_id = request.booking_id;
            code.user_id = request.user_id;
            code.notes = request.notes.clone();

            match self.codes.create(&code).await {
                Ok(id) => return Ok(id),
                Err(err) if err.is_unique_violation() => {
                    debug!(lock_id = lock.id, attempt, "Code reserved concurrently, retrying");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(lock_id = lock.id, attempts, "Code space exhausted");
        Err(ServiceError::CodeSpaceExhausted { attempts })
    }

    /// Revoke a code.
    ///
    /// The provider is asked to remove the code first; whatever it answers,
    /// the code ends up `revoked` locally. Returns whether the provider side
    /// succeeded. Revoking a terminal code is a no-op that returns `true`.
    ///
    /// The owner may revoke any code; a booking guest only the booking code
    /// issued to them.
    pub async fn revoke_code(&self, code_id: i64, ctx: &AccessContext) -> Result<bool> {
        let code = self.find_code(code_id).await?;
        let guest_may_revoke =
            ctx.is_booking_guest && code.booking_id.is_some() && issued_to_caller(&code, ctx);
        if !ctx.is_owner && !guest_may_revoke {
            return Err(ServiceError::Unauthorized {
                action: "revoke this access code",
            });
        }

        if revoke_outcome(code.status) == RevokeOutcome::AlreadyTerminal {
            debug!(code_id, status = %code.status, "Revoke of terminal code ignored");
            return Ok(true);
        }

        let lock = self.find_lock(code.smart_lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;
        self.revoke_guarded(&lock, code_id, ctx).await
    }

    /// Revoke every pending or active code attached to a booking.
    ///
    /// Returns the number of codes revoked.
    pub async fn revoke_codes_for_booking(
        &self,
        booking_id: i64,
        ctx: &AccessContext,
    ) -> Result<usize> {
        require_owner(ctx, "revoke booking codes")?;

        let mut revoked = 0;
        for code in self.codes.find_by_booking(booking_id).await? {
            if !code.is_reserved() {
                continue;
            }
            let lock = self.find_lock(code.smart_lock_id).await?;
            let _guard = self.guards.acquire(lock.id).await;
            self.revoke_guarded(&lock, code.id, ctx).await?;
            revoked += 1;
        }

        info!(booking_id, revoked, "Revoked booking codes");
        Ok(revoked)
    }

    /// Revoke with the lock's guard already held.
    pub(super) async fn revoke_guarded(
        &self,
        lock: &SmartLock,
        code_id: i64,
        ctx: &AccessContext,
    ) -> Result<bool> {
        let code = self.find_code(code_id).await?;
        if code.status.is_terminal() {
            return Ok(true);
        }

        let mut metadata = json!({ "status_before": code.status });
        let provider_revoked = match code.external_code_id.as_deref() {
            None => true,
            Some(_) if Self::is_remote_capable(lock) => {
                let adapter = self.adapter(lock);
                let target = Self::target(lock);
                let spec = Self::spec(&code)?;
                match self.call(adapter.revoke_access_code(&target, &spec)).await {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(
                            lock_id = lock.id,
                            code_id,
                            provider = %lock.provider,
                            transient = err.is_transient(),
                            "Provider revoke failed, revoking locally: {}",
                            err
                        );
                        metadata["provider_error"] = json!(err.to_string());
                        false
                    }
                }
            }
            Some(_) => {
                metadata["provider_error"] = json!("no provider credentials configured");
                false
            }
        };
        metadata["provider_revoked"] = json!(provider_revoked);

        self.mark_revoked(code).await?;
        self.record(
            LockActivity::new(lock.id, ActivityEvent::CodeRevoked)
                .with_code(code_id)
                .with_user(ctx.user_id)
                .with_metadata(metadata),
        )
        .await?;

        info!(lock_id = lock.id, code_id, provider_revoked, "Revoked access code");
        Ok(provider_revoked)
    }

    /// Move a code to `revoked` from whatever non-terminal status it is in now.
    async fn mark_revoked(&self, mut code: AccessCode) -> Result<()> {
        // Statuses only move forward, so this settles within a few rounds.
        loop {
            if code.status.is_terminal() {
                return Ok(());
            }
            if self
                .codes
                .transition(code.id, code.status, CodeStatus::Revoked, Utc::now())
                .await?
            {
                return Ok(());
            }
            code = self.find_code(code.id).await?;
        }
    }

    /// Codes of a lock, newest first. Digits are masked unless the caller
    /// owns the lock.
    pub async fn list_codes(
        &self,
        lock_id: i64,
        filter: CodeFilter,
        ctx: &AccessContext,
    ) -> Result<Vec<AccessCodeView>> {
        let lock = self.find_lock(lock_id).await?;
        let now = Utc::now();
        let codes = self.codes.find_by_lock(lock.id, &filter).await?;

        Ok(codes
            .iter()
            .map(|code| {
                if ctx.is_owner {
                    AccessCodeView::revealed(code, now)
                } else {
                    AccessCodeView::masked(code, now)
                }
            })
            .collect())
    }

    /// The current code of a booking.
    ///
    /// The owner sees the digits. The booking's guest sees them only while
    /// the code is valid and gets `Forbidden` otherwise. Anyone else gets
    /// a masked view.
    pub async fn code_for_booking(
        &self,
        booking_id: i64,
        ctx: &AccessContext,
    ) -> Result<AccessCodeView> {
        let now = Utc::now();
        let codes = self.codes.find_by_booking(booking_id).await?;
        let code = current_booking_code(codes, now)
            .ok_or(ServiceError::not_found("Booking access code", booking_id))?;

        if ctx.is_owner {
            return Ok(AccessCodeView::revealed(&code, now));
        }

        if ctx.is_booking_guest {
            if !issued_to_caller(&code, ctx) {
                return Err(ServiceError::forbidden("code was issued to another guest"));
            }
            let validity = code.validity_at(now);
            if !validity.is_valid() {
                return Err(ServiceError::forbidden(validity.reason()));
            }
            return Ok(AccessCodeView::revealed(&code, now));
        }

        Ok(AccessCodeView::masked(&code, now))
    }

    /// Change the window (and optionally the use budget) of a pending or
    /// active code and push it to the provider.
    ///
    /// `max_uses` of `None` keeps the current budget. A provider failure is
    /// logged and recorded; the local change stands.
    pub async fn update_code_window(
        &self,
        code_id: i64,
        window: ValidityWindow,
        max_uses: Option<i64>,
        ctx: &AccessContext,
    ) -> Result<AccessCode> {
        require_owner(ctx, "update access codes")?;
        validate_max_uses(max_uses)?;

        let code = self.find_code(code_id).await?;
        let lock = self.find_lock(code.smart_lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;

        let code = self.find_code(code_id).await?;
        if !code.is_reserved() {
            return Err(ServiceError::invalid_transition(code.status, "updated"));
        }

        let max_uses = max_uses.or(code.max_uses);
        let updated = self
            .codes
            .update_window(code.id, window.valid_from, window.valid_until, max_uses, Utc::now())
            .await?;
        if !updated {
            let current = self.find_code(code_id).await?;
            return Err(ServiceError::invalid_transition(current.status, "updated"));
        }

        let code = self.find_code(code_id).await?;
        if code.external_code_id.is_some() && Self::is_remote_capable(&lock) {
            let adapter = self.adapter(&lock);
            let target = Self::target(&lock);
            let spec = Self::spec(&code)?;
            match self.call(adapter.update_access_code(&target, &spec)).await {
                Ok(Some(replacement)) => {
                    debug!(code_id, "Provider re-created code with a new id");
                    self.codes
                        .set_external_id(code.id, Some(replacement.as_str()), Utc::now())
                        .await?;
                }
                Ok(None) => {}
                Err(err) => {
                    self.record_provider_failure(
                        &lock,
                        Some(code.id),
                        ctx,
                        "update_access_code",
                        &err,
                    )
                    .await?;
                }
            }
        }

        info!(lock_id = lock.id, code_id, "Updated access code window");
        self.find_code(code_id).await
    }

    /// Count one use of a code at the door.
    ///
    /// # Errors
    /// `Forbidden` when the code is not valid right now (not active, outside
    /// its window, or out of uses).
    pub async fn record_code_use(&self, code_id: i64, ctx: &AccessContext) -> Result<AccessCode> {
        let code = self.find_code(code_id).await?;
        if !ctx.is_owner && !(ctx.is_booking_guest && issued_to_caller(&code, ctx)) {
            return Err(ServiceError::Unauthorized {
                action: "record code use",
            });
        }

        let lock = self.find_lock(code.smart_lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;

        let code = self.find_code(code_id).await?;
        let now = Utc::now();
        let validity = code.validity_at(now);
        if !validity.is_valid() {
            return Err(ServiceError::forbidden(validity.reason()));
        }
        if !self.codes.increment_uses(code.id, now).await? {
            return Err(ServiceError::forbidden("code is no longer usable"));
        }

        self.record(
            LockActivity::new(lock.id, ActivityEvent::CodeUsed)
                .with_code(code.id)
                .with_user(ctx.user_id)
                .with_metadata(json!({ "uses_count": code.uses_count + 1 })),
        )
        .await?;

        let used = self.find_code(code_id).await?;
        if used.max_uses.is_some_and(|max| used.uses_count >= max)
            && self
                .codes
                .transition(used.id, CodeStatus::Active, CodeStatus::Expired, now)
                .await?
        {
            info!(lock_id = lock.id, code_id, "Access code used up");
        }

        self.find_code(code_id).await
    }

    /// Consume an active one-time code.
    pub async fn claim_code(&self, code_id: i64, ctx: &AccessContext) -> Result<AccessCode> {
        let code = self.find_code(code_id).await?;
        if !ctx.is_owner && !(ctx.is_booking_guest && issued_to_caller(&code, ctx)) {
            return Err(ServiceError::Unauthorized {
                action: "claim this access code",
            });
        }
        if code.code_type != CodeType::OneTime {
            return Err(lockbox_core::Error::InvalidValue {
                field: "code_type".to_string(),
                value: code.code_type.to_string(),
            }
            .into());
        }

        let lock = self.find_lock(code.smart_lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;

        let code = self.find_code(code_id).await?;
        transition(code.status, CodeStatus::Claimed)?;
        let now = Utc::now();
        let validity = code.validity_at(now);
        if !validity.is_valid() {
            return Err(ServiceError::forbidden(validity.reason()));
        }

        if !self
            .codes
            .transition(code.id, CodeStatus::Active, CodeStatus::Claimed, now)
            .await?
        {
            let current = self.find_code(code_id).await?;
            return Err(ServiceError::invalid_transition(current.status, "claimed"));
        }

        self.record(
            LockActivity::new(lock.id, ActivityEvent::CodeUsed)
                .with_code(code.id)
                .with_user(ctx.user_id)
                .with_metadata(json!({ "claimed": true })),
        )
        .await?;

        info!(lock_id = lock.id, code_id, "Claimed one-time access code");
        self.find_code(code_id).await
    }

    /// Delete a code row permanently.
    ///
    /// A code still pending or active is revoked first. Activity entries
    /// keep their reference to the purged id.
    pub async fn purge_code(&self, code_id: i64, ctx: &AccessContext) -> Result<()> {
        require_owner(ctx, "purge access codes")?;

        let code = self.find_code(code_id).await?;
        let lock = self.find_lock(code.smart_lock_id).await?;
        let _guard = self.guards.acquire(lock.id).await;

        if self.find_code(code_id).await?.is_reserved() {
            self.revoke_guarded(&lock, code_id, ctx).await?;
        }
        self.codes.purge(code_id).await?;

        info!(lock_id = lock.id, code_id, "Purged access code");
        Ok(())
    }
}

/// Pick the code a booking is currently using: one valid now, else one
/// still reserved, else the newest.
fn current_booking_code(codes: Vec<AccessCode>, now: DateTime<Utc>) -> Option<AccessCode> {
    let index = codes
        .iter()
        .position(|code| code.is_valid_at(now))
        .or_else(|| codes.iter().position(AccessCode::is_reserved))
        .or(if codes.is_empty() { None } else { Some(0) })?;
    codes.into_iter().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code(id: i64, status: CodeStatus, window: ValidityWindow) -> AccessCode {
        let mut code = AccessCode::new(1, "123456", CodeType::Temporary, window);
        code.id = id;
        code.status = status;
        code
    }

    #[test]
    fn test_current_booking_code_prefers_valid_code() {
        let now = Utc::now();
        let live = ValidityWindow::new(now - Duration::hours(1), Some(now + Duration::hours(1)))
            .unwrap();
        let codes = vec![
            code(3, CodeStatus::Revoked, live),
            code(2, CodeStatus::Pending, live),
            code(1, CodeStatus::Active, live),
        ];
        assert_eq!(current_booking_code(codes, now).unwrap().id, 1);
    }

    #[test]
    fn test_current_booking_code_falls_back_to_newest() {
        let now = Utc::now();
        let past = ValidityWindow::new(now - Duration::days(2), Some(now - Duration::days(1)))
            .unwrap();
        let codes = vec![code(5, CodeStatus::Revoked, past), code(4, CodeStatus::Expired, past)];
        assert_eq!(current_booking_code(codes, now).unwrap().id, 5);
        assert!(current_booking_code(Vec::new(), now).is_none());
    }

    #[test]
    fn test_guest_ownership_check() {
        let now = Utc::now();
        let mut code = code(1, CodeStatus::Active, ValidityWindow::open_ended(now));
        code.user_id = Some(7);
        assert!(issued_to_caller(&code, &AccessContext::guest(7)));
        assert!(!issued_to_caller(&code, &AccessContext::guest(8)));

        code.user_id = None;
        assert!(issued_to_caller(&code, &AccessContext::guest(8)));
    }

    #[test]
    fn test_max_uses_must_be_positive() {
        assert!(validate_max_uses(None).is_ok());
        assert!(validate_max_uses(Some(3)).is_ok());
        assert!(matches!(validate_max_uses(Some(0)), Err(ServiceError::Invalid(_))));
    }
}
