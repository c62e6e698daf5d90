#![allow(async_fn_in_trait)]

use crate::error::StorageResult;
use crate::models::{ActivityFilter, LockActivity, Page, PageRequest};
use sqlx::SqlitePool;

/// Repository trait for the append-only activity log.
pub trait LockActivityRepository: Send + Sync {
    /// Append an entry and return its id.
    async fn append(&self, activity: &LockActivity) -> StorageResult<i64>;

    /// Entries of a lock matching `filter`, newest first.
    ///
    /// Ordering is total: `occurred_at`, then insertion id.
    async fn find_by_lock(
        &self,
        smart_lock_id: i64,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> StorageResult<Page<LockActivity>>;

    /// Entries that reference an access code, oldest first.
    async fn find_by_code(&self, access_code_id: i64) -> StorageResult<Vec<LockActivity>>;
}

/// SQLite implementation of LockActivityRepository
pub struct SqliteLockActivityRepository {
    pool: SqlitePool,
}

impl SqliteLockActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl LockActivityRepository for SqliteLockActivityRepository {
    async fn append(&self, activity: &LockActivity) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO lock_activities (
                smart_lock_id, access_code_id, user_id, event_type, occurred_at, metadata
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(activity.smart_lock_id)
        .bind(activity.access_code_id)
        .bind(activity.user_id)
        .bind(activity.event_type)
        .bind(activity.occurred_at)
        .bind(&activity.metadata)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_lock(
        &self,
        smart_lock_id: i64,
        filter: &ActivityFilter,
        page: PageRequest,
    ) -> StorageResult<Page<LockActivity>> {
        const WHERE: &str = r#"
            WHERE smart_lock_id = ?
              AND (? IS NULL OR event_type = ?)
              AND (? IS NULL OR occurred_at >= ?)
              AND (? IS NULL OR occurred_at <= ?)
        "#;

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM lock_activities {WHERE}"))
                .bind(smart_lock_id)
                .bind(filter.event_type)
                .bind(filter.event_type)
                .bind(filter.from)
                .bind(filter.from)
                .bind(filter.until)
                .bind(filter.until)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as::<_, LockActivity>(&format!(
            r#"
            SELECT id, smart_lock_id, access_code_id, user_id, event_type, occurred_at, metadata
            FROM lock_activities
            {WHERE}
            ORDER BY occurred_at DESC, id DESC
            LIMIT ? OFFSET ?
            "#
        ))
        .bind(smart_lock_id)
        .bind(filter.event_type)
        .bind(filter.event_type)
        .bind(filter.from)
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.until)
        .bind(i64::from(page.limit))
        .bind(i64::from(page.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(Page {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        })
    }

    async fn find_by_code(&self, access_code_id: i64) -> StorageResult<Vec<LockActivity>> {
        let items = sqlx::query_as::<_, LockActivity>(
            r#"
            SELECT id, smart_lock_id, access_code_id, user_id, event_type, occurred_at, metadata
            FROM lock_activities
            WHERE access_code_id = ?
            ORDER BY occurred_at, id
            "#,
        )
        .bind(access_code_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
