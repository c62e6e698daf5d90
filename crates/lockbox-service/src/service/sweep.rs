use super::SmartLockService;
use super::codes::{PushOutcome, require_owner};
use crate::context::AccessContext;
use crate::error::Result;
use chrono::{DateTime, Utc};
use lockbox_core::validity::CodeValidity;
use lockbox_core::CodeStatus;
use lockbox_storage::repositories::AccessCodeRepository;
use serde::Serialize;
use tracing::{debug, info};

/// Outcome of one pending-code resync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResyncReport {
    pub attempted: usize,
    pub activated: usize,
    pub failed: usize,
}

/// Outcome of one housekeeping sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub resync: ResyncReport,
}

impl SmartLockService {
    /// Store `expired` for codes whose validity has lapsed.
    ///
    /// Active codes past their window or out of uses, and pending codes whose
    /// window closed before they ever reached the lock. Codes are walked in
    /// pages of the resync batch size. Validity checks never depend on this
    /// having run.
    pub async fn expire_stale_codes(
        &self,
        now: DateTime<Utc>,
        ctx: &AccessContext,
    ) -> Result<usize> {
        require_owner(ctx, "expire access codes")?;

        let batch = self.config.resync_batch_size;
        let mut expired = 0;
        for status in [CodeStatus::Active, CodeStatus::Pending] {
            let mut after_id = 0;
            loop {
                let page = self.codes.page_by_status(status, after_id, batch).await?;
                let Some(last) = page.last() else { break };
                after_id = last.id;
                let full = page.len() as u64 >= u64::from(batch);

                for code in page {
                    let lapsed = match status {
                        CodeStatus::Active => code.validity_at(now).is_lapsed(),
                        _ => code.window().has_ended(now),
                    };
                    if lapsed
                        && self
                            .codes
                            .transition(code.id, status, CodeStatus::Expired, now)
                            .await?
                    {
                        debug!(code_id = code.id, lock_id = code.smart_lock_id, "Expired access code");
                        expired += 1;
                    }
                }

                if !full {
                    break;
                }
            }
        }

        if expired > 0 {
            info!(expired, "Expired stale access codes");
        }
        Ok(expired)
    }

    /// Retry provider creation for codes stuck in `pending`.
    ///
    /// Only codes older than the configured minimum age are picked up, at
    /// most one batch per call. Codes the provider rejected stay parked
    /// until the owner changes them; codes that failed transiently go to
    /// the back of the line. Codes on locks that lost their credentials are
    /// activated locally.
    pub async fn resync_pending_codes(
        &self,
        now: DateTime<Utc>,
        ctx: &AccessContext,
    ) -> Result<ResyncReport> {
        require_owner(ctx, "resync access codes")?;

        let min_age =
            chrono::Duration::from_std(self.config.resync_min_age).unwrap_or(chrono::Duration::zero());
        let mut report = ResyncReport::default();

        let pending = self
            .codes
            .find_resync_candidates(now - min_age, self.config.resync_batch_size)
            .await?;

        for code in pending {
            if code.window().has_ended(now) {
                continue;
            }
            let lock = self.find_lock(code.smart_lock_id).await?;
            if lock.is_removed() {
                continue;
            }

            let _guard = self.guards.acquire(lock.id).await;
            match self.push_pending(&lock, code.id, ctx, true).await? {
                PushOutcome::Activated => {
                    report.attempted += 1;
                    report.activated += 1;
                }
                PushOutcome::Failed => {
                    report.attempted += 1;
                    report.failed += 1;
                }
                PushOutcome::Skipped => {}
            }
        }

        if report.attempted > 0 {
            info!(
                attempted = report.attempted,
                activated = report.activated,
                failed = report.failed,
                "Resynced pending access codes"
            );
        }
        Ok(report)
    }

    /// Expire lapsed codes, then resync pending ones.
    pub async fn sweep(&self, now: DateTime<Utc>, ctx: &AccessContext) -> Result<SweepReport> {
        let expired = self.expire_stale_codes(now, ctx).await?;
        let resync = self.resync_pending_codes(now, ctx).await?;
        Ok(SweepReport { expired, resync })
    }
}
