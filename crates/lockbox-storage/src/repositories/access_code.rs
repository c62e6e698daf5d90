#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{AccessCode, CodeFilter};
use chrono::{DateTime, Utc};
use lockbox_core::CodeStatus;
use sqlx::SqlitePool;

const SELECT_CODE: &str = r#"
    SELECT id, smart_lock_id, code, code_type, status, valid_from, valid_until,
           max_uses, uses_count, external_code_id, booking_id, user_id, notes,
           sync_failed_at, sync_rejected, created_at, updated_at
    FROM access_codes
"#;

/// Repository trait for AccessCode persistence.
///
/// Status changes are compare-and-set: they name the status the caller
/// observed and report whether the row was still in it, so concurrent
/// writers cannot skip a lifecycle step.
pub trait AccessCodeRepository: Send + Sync {
    /// Insert a code and return its id.
    ///
    /// Fails with a unique violation (see
    /// [`StorageError::is_unique_violation`]) when another pending or active
    /// code of the same lock already holds the value.
    async fn create(&self, code: &AccessCode) -> StorageResult<i64>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessCode>>;

    /// Pending or active code of `smart_lock_id` holding `code`, if any.
    async fn find_reserved(&self, smart_lock_id: i64, code: &str)
    -> StorageResult<Option<AccessCode>>;

    /// Codes of a lock, newest first.
    async fn find_by_lock(
        &self,
        smart_lock_id: i64,
        filter: &CodeFilter,
    ) -> StorageResult<Vec<AccessCode>>;

    /// Codes attached to a booking, newest first.
    async fn find_by_booking(&self, booking_id: i64) -> StorageResult<Vec<AccessCode>>;

    /// Codes in `status` across all locks, oldest first.
    async fn find_by_status(&self, status: CodeStatus, limit: u32)
    -> StorageResult<Vec<AccessCode>>;

    /// Codes in `status` with an id above `after_id`, in id order.
    ///
    /// Keyset paging for passes that walk a whole status set.
    async fn page_by_status(
        &self,
        status: CodeStatus,
        after_id: i64,
        limit: u32,
    ) -> StorageResult<Vec<AccessCode>>;

    /// Pending codes created at or before `created_before` that the provider
    /// has not rejected.
    ///
    /// Codes are ordered by their last failed push (or creation when never
    /// tried), so codes that keep failing rotate behind the rest.
    async fn find_resync_candidates(
        &self,
        created_before: DateTime<Utc>,
        limit: u32,
    ) -> StorageResult<Vec<AccessCode>>;

    /// Note a failed provider push. `rejected` parks the code until its
    /// window is changed.
    async fn record_sync_failure(
        &self,
        id: i64,
        rejected: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Move `id` from `from` to `to`. Returns `false` if it was no longer in `from`.
    async fn transition(
        &self,
        id: i64,
        from: CodeStatus,
        to: CodeStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Move a pending code to active, storing the provider id.
    async fn activate(
        &self,
        id: i64,
        external_code_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    async fn set_external_id(
        &self,
        id: i64,
        external_code_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<()>;

    /// Replace window and use budget of a pending or active code.
    ///
    /// Clears a provider rejection so the code is pushed again.
    async fn update_window(
        &self,
        id: i64,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
        max_uses: Option<i64>,
        at: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Count one use of an active code. Returns `false` if it was not active.
    async fn increment_uses(&self, id: i64, at: DateTime<Utc>) -> StorageResult<bool>;

    /// Delete the row permanently.
    async fn purge(&self, id: i64) -> StorageResult<()>;
}

/// SQLite implementation of AccessCodeRepository
pub struct SqliteAccessCodeRepository {
    pool: SqlitePool,
}

impl SqliteAccessCodeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AccessCodeRepository for SqliteAccessCodeRepository {
    async fn create(&self, code: &AccessCode) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO access_codes (
                smart_lock_id, code, code_type, status, valid_from, valid_until,
                max_uses, uses_count, external_code_id, booking_id, user_id, notes,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(code.smart_lock_id)
        .bind(&code.code)
        .bind(code.code_type)
        .bind(code.status)
        .bind(code.valid_from)
        .bind(code.valid_until)
        .bind(code.max_uses)
        .bind(code.uses_count)
        .bind(&code.external_code_id)
        .bind(code.booking_id)
        .bind(code.user_id)
        .bind(&code.notes)
        .bind(code.created_at)
        .bind(code.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<AccessCode>> {
        let code = sqlx::query_as::<_, AccessCode>(&format!("{SELECT_CODE} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(code)
    }

    async fn find_reserved(
        &self,
        smart_lock_id: i64,
        code: &str,
    ) -> StorageResult<Option<AccessCode>> {
        let found = sqlx::query_as::<_, AccessCode>(&format!(
            "{SELECT_CODE} WHERE smart_lock_id = ? AND code = ? AND status IN ('pending', 'active')"
        ))
        .bind(smart_lock_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    async fn find_by_lock(
        &self,
        smart_lock_id: i64,
        filter: &CodeFilter,
    ) -> StorageResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(&format!(
            r#"{SELECT_CODE}
            WHERE smart_lock_id = ?
              AND (? IS NULL OR status = ?)
              AND (? IS NULL OR code_type = ?)
            ORDER BY created_at DESC, id DESC"#
        ))
        .bind(smart_lock_id)
        .bind(filter.status)
        .bind(filter.status)
        .bind(filter.code_type)
        .bind(filter.code_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn find_by_booking(&self, booking_id: i64) -> StorageResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(&format!(
            "{SELECT_CODE} WHERE booking_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn find_by_status(
        &self,
        status: CodeStatus,
        limit: u32,
    ) -> StorageResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(&format!(
            "{SELECT_CODE} WHERE status = ? ORDER BY created_at, id LIMIT ?"
        ))
        .bind(status)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn page_by_status(
        &self,
        status: CodeStatus,
        after_id: i64,
        limit: u32,
    ) -> StorageResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(&format!(
            "{SELECT_CODE} WHERE status = ? AND id > ? ORDER BY id LIMIT ?"
        ))
        .bind(status)
        .bind(after_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn find_resync_candidates(
        &self,
        created_before: DateTime<Utc>,
        limit: u32,
    ) -> StorageResult<Vec<AccessCode>> {
        let codes = sqlx::query_as::<_, AccessCode>(&format!(
            r#"{SELECT_CODE}
            WHERE status = 'pending' AND sync_rejected = 0 AND created_at <= ?
            ORDER BY COALESCE(sync_failed_at, created_at), id
            LIMIT ?"#
        ))
        .bind(created_before)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(codes)
    }

    async fn record_sync_failure(
        &self,
        id: i64,
        rejected: bool,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET sync_failed_at = ?, sync_rejected = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(at)
        .bind(rejected)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AccessCode", id));
        }

        Ok(())
    }

    async fn transition(
        &self,
        id: i64,
        from: CodeStatus,
        to: CodeStatus,
        at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            "UPDATE access_codes SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(to)
        .bind(at)
        .bind(id)
        .bind(from)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn activate(
        &self,
        id: i64,
        external_code_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET status = 'active', external_code_id = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#,
        )
        .bind(external_code_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_external_id(
        &self,
        id: i64,
        external_code_id: Option<&str>,
        at: DateTime<Utc>,
    ) -> StorageResult<()> {
        let result = sqlx::query(
            "UPDATE access_codes SET external_code_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(external_code_id)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AccessCode", id));
        }

        Ok(())
    }

    async fn update_window(
        &self,
        id: i64,
        valid_from: DateTime<Utc>,
        valid_until: Option<DateTime<Utc>>,
        max_uses: Option<i64>,
        at: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET valid_from = ?, valid_until = ?, max_uses = ?, sync_rejected = 0, updated_at = ?
            WHERE id = ? AND status IN ('pending', 'active')
            "#,
        )
        .bind(valid_from)
        .bind(valid_until)
        .bind(max_uses)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_uses(&self, id: i64, at: DateTime<Utc>) -> StorageResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE access_codes
            SET uses_count = uses_count + 1, updated_at = ?
            WHERE id = ? AND status = 'active'
              AND (max_uses IS NULL OR uses_count < max_uses)
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn purge(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM access_codes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("AccessCode", id));
        }

        Ok(())
    }
}
