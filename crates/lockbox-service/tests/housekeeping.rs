mod common;

use chrono::{Duration as TimeDelta, Utc};
use common::*;
use lockbox_core::{ActivityEvent, CodeStatus, CodeType, ValidityWindow};
use lockbox_providers::{MockFailure, MockOperation};
use lockbox_service::{AccessContext, Housekeeper, IssueCodeRequest, ResyncReport, ServiceConfig};
use lockbox_storage::models::CodeFilter;
use std::time::Duration;

fn eager_config() -> ServiceConfig {
    ServiceConfig::default().resync_min_age(Duration::ZERO)
}

#[tokio::test]
async fn test_expire_stale_codes() {
    let h = harness().await;
    let lock_id = local_lock(&h, "gate-1").await;
    let stale = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, past_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();
    let live = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();

    let ctx = AccessContext::system();
    assert_eq!(h.service.expire_stale_codes(Utc::now(), &ctx).await.unwrap(), 1);
    assert_eq!(h.service.expire_stale_codes(Utc::now(), &ctx).await.unwrap(), 0);

    let expired = h
        .service
        .list_codes(lock_id, CodeFilter::default().with_status(CodeStatus::Expired), &owner())
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);

    let active = h
        .service
        .list_codes(lock_id, CodeFilter::default().with_status(CodeStatus::Active), &owner())
        .await
        .unwrap();
    assert_eq!(active[0].id, live.id);
}

#[tokio::test]
async fn test_expire_pending_code_whose_window_closed() {
    let h = harness().await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Unavailable);

    let now = Utc::now();
    let short = ValidityWindow::new(now - TimeDelta::hours(2), Some(now + TimeDelta::hours(1))).unwrap();
    let code = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, short, CodeType::Temporary), &owner())
        .await
        .unwrap();
    assert_eq!(code.status, CodeStatus::Pending);

    let later = now + TimeDelta::hours(2);
    let expired = h
        .service
        .expire_stale_codes(later, &AccessContext::system())
        .await
        .unwrap();
    assert_eq!(expired, 1);
}

#[tokio::test]
async fn test_resync_activates_pending_codes() {
    let h = harness_with(eager_config(), None).await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Unavailable);
    let code = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();

    let ctx = AccessContext::system();
    let report = h.service.resync_pending_codes(Utc::now(), &ctx).await.unwrap();
    assert_eq!((report.attempted, report.activated, report.failed), (1, 0, 1));

    h.mock.recover_all();
    let report = h.service.resync_pending_codes(Utc::now(), &ctx).await.unwrap();
    assert_eq!((report.attempted, report.activated, report.failed), (1, 1, 0));
    assert_eq!(h.mock.programmed_codes("front-door"), vec![code.code.clone()]);

    let created = activity(&h, lock_id)
        .await
        .into_iter()
        .find(|a| a.event_type == ActivityEvent::CodeCreated)
        .unwrap();
    assert_eq!(created.access_code_id, Some(code.id));
    assert_eq!(created.metadata.0["resynced"], serde_json::json!(true));
}

#[tokio::test]
async fn test_resync_waits_for_minimum_age() {
    let h = harness().await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Unavailable);
    h.service
        .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();
    h.mock.recover_all();

    let report = h
        .service
        .resync_pending_codes(Utc::now(), &AccessContext::system())
        .await
        .unwrap();
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn test_sweep_requires_owner_context() {
    let h = harness().await;
    assert!(h.service.sweep(Utc::now(), &guest()).await.is_err());
}

#[tokio::test]
async fn test_housekeeper_resyncs_in_background() {
    let h = harness_with(eager_config(), None).await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Unavailable);
    let code = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();
    h.mock.recover_all();

    let handle = Housekeeper::new(h.service.clone())
        .with_interval(Duration::from_millis(20))
        .start();

    let mut activated = false;
    for _ in 0..100 {
        let codes = h
            .service
            .list_codes(lock_id, CodeFilter::default(), &owner())
            .await
            .unwrap();
        if codes.iter().any(|c| c.id == code.id && c.status == CodeStatus::Active) {
            activated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(activated, "pending code was never resynced");

    let sweeps = handle.shutdown().await;
    assert!(sweeps >= 1);
}

#[tokio::test]
async fn test_resync_leaves_rejected_codes_parked() {
    let h = harness_with(eager_config(), None).await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Rejected);
    let code = h
        .service
        .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
        .await
        .unwrap();
    assert_eq!(code.status, CodeStatus::Pending);
    assert!(code.sync_rejected);
    assert_eq!(h.mock.calls(MockOperation::CreateCode), 1);

    h.mock.recover_all();
    let report = h
        .service
        .resync_pending_codes(Utc::now(), &AccessContext::system())
        .await
        .unwrap();
    assert_eq!(report, ResyncReport::default());
    assert_eq!(h.mock.calls(MockOperation::CreateCode), 1);

    let listed = h
        .service
        .list_codes(lock_id, CodeFilter::default(), &owner())
        .await
        .unwrap();
    assert!(listed[0].provider_rejected);

    // Changing the window is the owner acting on the rejection
    h.service
        .update_code_window(code.id, current_window(), None, &owner())
        .await
        .unwrap();
    let report = h
        .service
        .resync_pending_codes(Utc::now(), &AccessContext::system())
        .await
        .unwrap();
    assert_eq!(report.activated, 1);
    assert_eq!(h.mock.programmed_codes("front-door"), vec![code.code.clone()]);
}

#[tokio::test]
async fn test_failing_codes_do_not_starve_newer_ones() {
    let h = harness_with(eager_config().resync_batch_size(2), None).await;
    let lock_id = connected_lock(&h, "front-door").await;
    h.mock.fail(MockOperation::CreateCode, MockFailure::Unavailable);

    let mut ids = Vec::new();
    for _ in 0..3 {
        let code = h
            .service
            .issue_code(IssueCodeRequest::new(lock_id, current_window(), CodeType::Temporary), &owner())
            .await
            .unwrap();
        ids.push(code.id);
    }

    let ctx = AccessContext::system();
    let first = h.service.resync_pending_codes(Utc::now(), &ctx).await.unwrap();
    assert_eq!((first.attempted, first.failed), (2, 2));

    // The code left out of the first batch comes first in the next one
    h.mock.recover_all();
    let second = h.service.resync_pending_codes(Utc::now(), &ctx).await.unwrap();
    assert_eq!(second.activated, 2);

    let third = h.service.resync_pending_codes(Utc::now(), &ctx).await.unwrap();
    assert_eq!(third.activated, 1);

    let active = h
        .service
        .list_codes(lock_id, CodeFilter::default().with_status(CodeStatus::Active), &owner())
        .await
        .unwrap();
    assert_eq!(active.len(), 3);
}

#[tokio::test]
async fn test_expire_walks_every_page() {
    let h = harness_with(ServiceConfig::default().resync_batch_size(2), None).await;
    let lock_id = local_lock(&h, "gate-1").await;
    for _ in 0..5 {
        h.service
            .issue_code(IssueCodeRequest::new(lock_id, past_window(), CodeType::Temporary), &owner())
            .await
            .unwrap();
    }

    let expired = h
        .service
        .expire_stale_codes(Utc::now(), &AccessContext::system())
        .await
        .unwrap();
    assert_eq!(expired, 5);
}
