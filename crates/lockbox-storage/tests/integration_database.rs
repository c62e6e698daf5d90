//! Integration tests for the database connection and schema guarantees.
//!
//! Run with: cargo test --package lockbox-storage --test integration_database

use chrono::{Duration, Utc};
use lockbox_core::ProviderKind;
use lockbox_storage::connection::{Database, DatabaseConfig};
use lockbox_storage::models::SmartLock;
use lockbox_storage::repositories::{SmartLockRepository, SqliteSmartLockRepository};
use std::sync::Arc;
use tokio::sync::Barrier;

async fn insert_lock(db: &Database) -> i64 {
    SqliteSmartLockRepository::new(db.pool().clone())
        .create(&SmartLock::new(1, ProviderKind::Mock, "mock-1", "Front door"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_file_database_creates_parent_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/lockbox.db");
    let db = Database::new(DatabaseConfig::new(path.to_string_lossy()).max_connections(2))
        .await
        .unwrap();

    assert!(path.exists());
    insert_lock(&db).await;
    db.close().await;
}

#[tokio::test]
async fn test_concurrent_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concurrent.db");
    let db = Database::new(DatabaseConfig::new(path.to_string_lossy()))
        .await
        .unwrap();

    const NUM_CONCURRENT_TASKS: usize = 8;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));

    let mut handles = vec![];
    for i in 0..NUM_CONCURRENT_TASKS {
        let db = db.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let row: (i64,) = sqlx::query_as("SELECT ?")
                .bind(i as i64)
                .fetch_one(db.pool())
                .await
                .unwrap();
            row.0
        }));
    }

    let results = futures::future::join_all(handles).await;
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), i as i64);
    }

    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();

    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let result: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table'
         AND name IN ('smart_locks', 'access_codes', 'lock_activities')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(result.0, 3);
    db.close().await;
}

#[tokio::test]
async fn test_activity_log_rejects_update_and_delete() {
    let db = Database::in_memory().await.unwrap();
    let lock_id = insert_lock(&db).await;

    sqlx::query(
        "INSERT INTO lock_activities (smart_lock_id, event_type, occurred_at) VALUES (?, 'locked', ?)",
    )
    .bind(lock_id)
    .bind(Utc::now())
    .execute(db.pool())
    .await
    .unwrap();

    let update = sqlx::query("UPDATE lock_activities SET event_type = 'unlocked'")
        .execute(db.pool())
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM lock_activities")
        .execute(db.pool())
        .await;
    assert!(delete.is_err());

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lock_activities")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn test_window_check_constraint() {
    let db = Database::in_memory().await.unwrap();
    let lock_id = insert_lock(&db).await;
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO access_codes (smart_lock_id, code, code_type, valid_from, valid_until, created_at, updated_at)
         VALUES (?, '123456', 'temporary', ?, ?, ?, ?)",
    )
    .bind(lock_id)
    .bind(now)
    .bind(now - Duration::hours(1))
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_unknown_provider_is_rejected_by_schema() {
    let db = Database::in_memory().await.unwrap();
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO smart_locks (property_id, provider, provider_lock_id, name, created_at, updated_at)
         VALUES (1, 'kwikset', 'k-1', 'Door', ?, ?)",
    )
    .bind(now)
    .bind(now)
    .execute(db.pool())
    .await;

    assert!(result.is_err());
}
