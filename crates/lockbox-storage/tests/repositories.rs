//! Repository behavior against an in-memory database.

use chrono::{Duration, Utc};
use lockbox_core::{
    ActivityEvent, CodeStatus, CodeType, Credentials, LockStatus, ProviderKind, ValidityWindow,
};
use lockbox_storage::Database;
use lockbox_storage::models::{
    AccessCode, ActivityFilter, CodeFilter, LockActivity, LockSyncUpdate, PageRequest, SmartLock,
};
use lockbox_storage::repositories::{
    AccessCodeRepository, LockActivityRepository, SmartLockRepository,
    SqliteAccessCodeRepository, SqliteLockActivityRepository, SqliteSmartLockRepository,
};
use rstest::rstest;
use serde_json::json;

struct Repos {
    locks: SqliteSmartLockRepository,
    codes: SqliteAccessCodeRepository,
    activity: SqliteLockActivityRepository,
}

async fn setup() -> (Database, Repos) {
    let db = Database::in_memory().await.unwrap();
    let repos = Repos {
        locks: SqliteSmartLockRepository::new(db.pool().clone()),
        codes: SqliteAccessCodeRepository::new(db.pool().clone()),
        activity: SqliteLockActivityRepository::new(db.pool().clone()),
    };
    (db, repos)
}

fn window() -> ValidityWindow {
    let now = Utc::now();
    ValidityWindow::new(now, Some(now + Duration::days(2))).unwrap()
}

async fn lock(repos: &Repos, device: &str) -> i64 {
    repos
        .locks
        .create(
            &SmartLock::new(10, ProviderKind::Yale, device, "Front door")
                .with_credentials(Credentials::new(r#"{"access_token":"t"}"#))
                .with_settings(json!({"region": "eu"})),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_lock_round_trip_keeps_credentials_and_settings() {
    let (_db, repos) = setup().await;
    let id = lock(&repos, "yl-1").await;

    let stored = repos.locks.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.provider, ProviderKind::Yale);
    assert_eq!(
        stored.credentials.as_ref().map(|c| c.expose_secret()),
        Some(r#"{"access_token":"t"}"#)
    );
    assert_eq!(stored.settings.0["region"], "eu");
    assert_eq!(stored.status, LockStatus::Active);
}

#[tokio::test]
async fn test_removed_locks_leave_property_listing() {
    let (_db, repos) = setup().await;
    let kept = lock(&repos, "yl-1").await;
    let removed = lock(&repos, "yl-2").await;

    repos.locks.mark_removed(removed, Utc::now()).await.unwrap();

    let live: Vec<i64> = repos
        .locks
        .find_by_property(10)
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(live, vec![kept]);

    let gone = repos.locks.find_by_id(removed).await.unwrap().unwrap();
    assert!(gone.is_removed());
    assert_eq!(gone.status, LockStatus::Inactive);

    // Removing twice is a not-found
    assert!(
        repos
            .locks
            .mark_removed(removed, Utc::now())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_device_can_be_registered_again_after_removal() {
    let (_db, repos) = setup().await;
    let first = lock(&repos, "yl-1").await;

    let duplicate = repos
        .locks
        .create(&SmartLock::new(10, ProviderKind::Yale, "yl-1", "Again"))
        .await
        .unwrap_err();
    assert!(duplicate.is_unique_violation());

    repos.locks.mark_removed(first, Utc::now()).await.unwrap();
    lock(&repos, "yl-1").await;
}

#[tokio::test]
async fn test_record_sync_keeps_battery_when_unknown() {
    let (_db, repos) = setup().await;
    let id = lock(&repos, "yl-1").await;
    let now = Utc::now();

    repos
        .locks
        .record_sync(
            id,
            &LockSyncUpdate {
                status: LockStatus::Active,
                battery_level: Some(55),
                error_message: None,
                synced_at: now,
            },
        )
        .await
        .unwrap();
    repos
        .locks
        .record_sync(
            id,
            &LockSyncUpdate {
                status: LockStatus::Offline,
                battery_level: None,
                error_message: Some("bridge offline".into()),
                synced_at: now,
            },
        )
        .await
        .unwrap();

    let stored = repos.locks.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.battery_level, Some(55));
    assert_eq!(stored.status, LockStatus::Offline);
    assert_eq!(stored.error_message.as_deref(), Some("bridge offline"));
    assert!(stored.last_synced_at.is_some());
}

#[tokio::test]
async fn test_reserved_code_is_unique_per_lock() {
    let (_db, repos) = setup().await;
    let lock_a = lock(&repos, "yl-1").await;
    let lock_b = lock(&repos, "yl-2").await;

    let first = AccessCode::new(lock_a, "123456", CodeType::Temporary, window());
    let first_id = repos.codes.create(&first).await.unwrap();

    let err = repos.codes.create(&first).await.unwrap_err();
    assert!(err.is_unique_violation());

    // Same value on another lock is fine
    repos
        .codes
        .create(&AccessCode::new(lock_b, "123456", CodeType::Temporary, window()))
        .await
        .unwrap();

    // Once revoked the value is free again
    assert!(
        repos
            .codes
            .transition(first_id, CodeStatus::Pending, CodeStatus::Revoked, Utc::now())
            .await
            .unwrap()
    );
    assert!(
        repos
            .codes
            .find_reserved(lock_a, "123456")
            .await
            .unwrap()
            .is_none()
    );
    repos.codes.create(&first).await.unwrap();
}

#[tokio::test]
async fn test_transition_is_compare_and_set() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let id = repos
        .codes
        .create(&AccessCode::new(lock_id, "555555", CodeType::Temporary, window()))
        .await
        .unwrap();

    assert!(repos.codes.activate(id, Some("ext-1"), Utc::now()).await.unwrap());
    // Already active
    assert!(!repos.codes.activate(id, Some("ext-2"), Utc::now()).await.unwrap());
    assert!(
        !repos
            .codes
            .transition(id, CodeStatus::Pending, CodeStatus::Revoked, Utc::now())
            .await
            .unwrap()
    );

    let stored = repos.codes.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, CodeStatus::Active);
    assert_eq!(stored.external_code_id.as_deref(), Some("ext-1"));
}

#[rstest]
#[case(CodeFilter::default(), 3)]
#[case(CodeFilter::default().with_status(CodeStatus::Active), 1)]
#[case(CodeFilter::default().with_type(CodeType::OneTime), 1)]
#[case(CodeFilter::default().with_status(CodeStatus::Pending).with_type(CodeType::Permanent), 1)]
#[case(CodeFilter::default().with_status(CodeStatus::Revoked), 0)]
#[tokio::test]
async fn test_find_by_lock_filters(#[case] filter: CodeFilter, #[case] expected: usize) {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;

    let temporary = repos
        .codes
        .create(&AccessCode::new(lock_id, "111111", CodeType::Temporary, window()))
        .await
        .unwrap();
    repos.codes.activate(temporary, None, Utc::now()).await.unwrap();
    repos
        .codes
        .create(&AccessCode::new(lock_id, "222222", CodeType::OneTime, window()))
        .await
        .unwrap();
    repos
        .codes
        .create(&AccessCode::new(
            lock_id,
            "333333",
            CodeType::Permanent,
            ValidityWindow::open_ended(Utc::now()),
        ))
        .await
        .unwrap();

    let found = repos.codes.find_by_lock(lock_id, &filter).await.unwrap();
    assert_eq!(found.len(), expected);
}

#[tokio::test]
async fn test_increment_uses_respects_budget() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let id = repos
        .codes
        .create(&AccessCode::new(lock_id, "777777", CodeType::OneTime, window()))
        .await
        .unwrap();

    // Pending codes cannot be used
    assert!(!repos.codes.increment_uses(id, Utc::now()).await.unwrap());

    repos.codes.activate(id, None, Utc::now()).await.unwrap();
    assert!(repos.codes.increment_uses(id, Utc::now()).await.unwrap());
    assert!(!repos.codes.increment_uses(id, Utc::now()).await.unwrap());

    let stored = repos.codes.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.uses_count, 1);
}

#[tokio::test]
async fn test_resync_candidates_skip_rejected_and_rotate_failures() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let mut ids = Vec::new();
    for value in ["111111", "222222", "333333"] {
        ids.push(
            repos
                .codes
                .create(&AccessCode::new(lock_id, value, CodeType::Temporary, window()))
                .await
                .unwrap(),
        );
    }
    let (failing, rejected, fresh) = (ids[0], ids[1], ids[2]);

    repos
        .codes
        .record_sync_failure(failing, false, Utc::now() + Duration::seconds(1))
        .await
        .unwrap();
    repos
        .codes
        .record_sync_failure(rejected, true, Utc::now())
        .await
        .unwrap();

    let candidates: Vec<i64> = repos
        .codes
        .find_resync_candidates(Utc::now(), 10)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(candidates, vec![fresh, failing]);

    // Nothing is old enough yet
    let none = repos
        .codes
        .find_resync_candidates(Utc::now() - Duration::hours(1), 10)
        .await
        .unwrap();
    assert!(none.is_empty());

    let stored = repos.codes.find_by_id(rejected).await.unwrap().unwrap();
    assert!(stored.sync_rejected);
    assert!(stored.sync_failed_at.is_some());

    // A new window puts the rejected code back in line
    let w = window();
    assert!(
        repos
            .codes
            .update_window(rejected, w.valid_from, w.valid_until, None, Utc::now())
            .await
            .unwrap()
    );
    let candidates = repos
        .codes
        .find_resync_candidates(Utc::now(), 10)
        .await
        .unwrap();
    assert!(candidates.iter().any(|c| c.id == rejected));
}

#[tokio::test]
async fn test_page_by_status_walks_in_id_order() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let mut ids = Vec::new();
    for value in ["111111", "222222", "333333", "444444", "555555"] {
        ids.push(
            repos
                .codes
                .create(&AccessCode::new(lock_id, value, CodeType::Temporary, window()))
                .await
                .unwrap(),
        );
    }

    let mut seen = Vec::new();
    let mut after = 0;
    loop {
        let page = repos
            .codes
            .page_by_status(CodeStatus::Pending, after, 2)
            .await
            .unwrap();
        let Some(last) = page.last() else { break };
        after = last.id;
        seen.extend(page.iter().map(|c| c.id));
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn test_purge_leaves_activity_behind() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let code_id = repos
        .codes
        .create(&AccessCode::new(lock_id, "888888", CodeType::Temporary, window()))
        .await
        .unwrap();
    repos
        .activity
        .append(&LockActivity::new(lock_id, ActivityEvent::CodeCreated).with_code(code_id))
        .await
        .unwrap();

    repos.codes.purge(code_id).await.unwrap();
    assert!(repos.codes.find_by_id(code_id).await.unwrap().is_none());
    assert!(repos.codes.purge(code_id).await.unwrap_err().is_not_found());

    let history = repos.activity.find_by_code(code_id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].event_type, ActivityEvent::CodeCreated);
}

#[tokio::test]
async fn test_activity_pagination_and_filters() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let base = Utc::now() - Duration::hours(10);

    for hour in 0..6 {
        let event = if hour % 2 == 0 {
            ActivityEvent::Locked
        } else {
            ActivityEvent::Unlocked
        };
        repos
            .activity
            .append(
                &LockActivity::new(lock_id, event)
                    .at(base + Duration::hours(hour))
                    .with_metadata(json!({ "seq": hour })),
            )
            .await
            .unwrap();
    }

    let first = repos
        .activity
        .find_by_lock(lock_id, &ActivityFilter::default(), PageRequest::new(0, 4))
        .await
        .unwrap();
    assert_eq!(first.total, 6);
    assert_eq!(first.items.len(), 4);
    assert!(first.has_more());
    // Newest first
    assert_eq!(first.items[0].metadata.0["seq"], 5);

    let second = repos
        .activity
        .find_by_lock(
            lock_id,
            &ActivityFilter::default(),
            PageRequest::new(0, 4).next(),
        )
        .await
        .unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(!second.has_more());

    let unlocked = repos
        .activity
        .find_by_lock(
            lock_id,
            &ActivityFilter {
                event_type: Some(ActivityEvent::Unlocked),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(unlocked.total, 3);

    let windowed = repos
        .activity
        .find_by_lock(
            lock_id,
            &ActivityFilter {
                event_type: None,
                from: Some(base + Duration::hours(2)),
                until: Some(base + Duration::hours(3)),
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(windowed.total, 2);
}

#[tokio::test]
async fn test_activity_ties_break_by_insertion() {
    let (_db, repos) = setup().await;
    let lock_id = lock(&repos, "yl-1").await;
    let at = Utc::now();

    let first = repos
        .activity
        .append(&LockActivity::new(lock_id, ActivityEvent::Unlocked).at(at))
        .await
        .unwrap();
    let second = repos
        .activity
        .append(&LockActivity::new(lock_id, ActivityEvent::Locked).at(at))
        .await
        .unwrap();

    let page = repos
        .activity
        .find_by_lock(lock_id, &ActivityFilter::default(), PageRequest::default())
        .await
        .unwrap();
    let ids: Vec<i64> = page.items.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![second, first]);
}
