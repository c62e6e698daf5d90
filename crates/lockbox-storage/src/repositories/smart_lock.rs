#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use crate::models::{LockSyncUpdate, SmartLock};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const SELECT_LOCK: &str = r#"
    SELECT id, property_id, provider, provider_lock_id, name, location,
           status, battery_level, credentials, settings, auto_generate_codes,
           last_synced_at, error_message, removed_at, created_at, updated_at
    FROM smart_locks
"#;

/// Repository trait for SmartLock persistence.
///
/// Removed locks stay in the table; only lookups by id return them.
pub trait SmartLockRepository: Send + Sync {
    /// Insert a lock and return its id.
    async fn create(&self, lock: &SmartLock) -> StorageResult<i64>;

    /// Find a lock by id, removed or not.
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<SmartLock>>;

    /// Live locks of a property.
    async fn find_by_property(&self, property_id: i64) -> StorageResult<Vec<SmartLock>>;

    /// Every live lock.
    async fn find_all(&self) -> StorageResult<Vec<SmartLock>>;

    /// Persist owner-editable fields (name, location, credentials, settings,
    /// auto-generate flag, status).
    async fn update(&self, lock: &SmartLock) -> StorageResult<()>;

    /// Write the outcome of a provider sync.
    async fn record_sync(&self, id: i64, update: &LockSyncUpdate) -> StorageResult<()>;

    /// Soft-remove a lock.
    async fn mark_removed(&self, id: i64, at: DateTime<Utc>) -> StorageResult<()>;
}

/// SQLite implementation of SmartLockRepository
pub struct SqliteSmartLockRepository {
    pool: SqlitePool,
}

impl SqliteSmartLockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SmartLockRepository for SqliteSmartLockRepository {
    async fn create(&self, lock: &SmartLock) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO smart_locks (
                property_id, provider, provider_lock_id, name, location,
                status, battery_level, credentials, settings, auto_generate_codes,
                last_synced_at, error_message, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(lock.property_id)
        .bind(lock.provider)
        .bind(&lock.provider_lock_id)
        .bind(&lock.name)
        .bind(&lock.location)
        .bind(lock.status)
        .bind(lock.battery_level)
        .bind(&lock.credentials)
        .bind(&lock.settings)
        .bind(lock.auto_generate_codes)
        .bind(lock.last_synced_at)
        .bind(&lock.error_message)
        .bind(lock.created_at)
        .bind(lock.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<SmartLock>> {
        let lock = sqlx::query_as::<_, SmartLock>(&format!("{SELECT_LOCK} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lock)
    }

    async fn find_by_property(&self, property_id: i64) -> StorageResult<Vec<SmartLock>> {
        let locks = sqlx::query_as::<_, SmartLock>(&format!(
            "{SELECT_LOCK} WHERE property_id = ? AND removed_at IS NULL ORDER BY id"
        ))
        .bind(property_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(locks)
    }

    async fn find_all(&self) -> StorageResult<Vec<SmartLock>> {
        let locks = sqlx::query_as::<_, SmartLock>(&format!(
            "{SELECT_LOCK} WHERE removed_at IS NULL ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(locks)
    }

    async fn update(&self, lock: &SmartLock) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE smart_locks
            SET name = ?, location = ?, status = ?, credentials = ?,
                settings = ?, auto_generate_codes = ?, updated_at = ?
            WHERE id = ? AND removed_at IS NULL
            "#,
        )
        .bind(&lock.name)
        .bind(&lock.location)
        .bind(lock.status)
        .bind(&lock.credentials)
        .bind(&lock.settings)
        .bind(lock.auto_generate_codes)
        .bind(Utc::now())
        .bind(lock.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("SmartLock", lock.id));
        }

        Ok(())
    }

    async fn record_sync(&self, id: i64, update: &LockSyncUpdate) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE smart_locks
            SET status = ?,
                battery_level = COALESCE(?, battery_level),
                error_message = ?,
                last_synced_at = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status)
        .bind(update.battery_level)
        .bind(&update.error_message)
        .bind(update.synced_at)
        .bind(update.synced_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("SmartLock", id));
        }

        Ok(())
    }

    async fn mark_removed(&self, id: i64, at: DateTime<Utc>) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE smart_locks
            SET removed_at = ?, status = 'inactive', updated_at = ?
            WHERE id = ? AND removed_at IS NULL
            "#,
        )
        .bind(at)
        .bind(at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("SmartLock", id));
        }

        Ok(())
    }
}
