//! HTTP-level tests for the vendor adapters against a local mock server.

use chrono::{Duration, Utc};
use lockbox_core::{CodeType, CodeValue, Credentials, ProviderKind, ValidityWindow};
use lockbox_providers::{
    CodeSpec, LockProvider, LockTarget, ProviderConfig, ProviderError, ProviderRegistry,
};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registry_for(kind: ProviderKind, server: &MockServer) -> ProviderRegistry {
    let config = ProviderConfig::default()
        .with_base_url(kind, server.uri())
        .with_http_timeout(std::time::Duration::from_secs(2));
    ProviderRegistry::new(config).unwrap()
}

fn target(kind: ProviderKind) -> LockTarget {
    LockTarget::new(
        kind,
        "lock-1",
        Some(Credentials::new(r#"{"api_key": "secret-key"}"#)),
    )
}

fn spec(external_id: Option<&str>) -> CodeSpec {
    let now = Utc::now();
    CodeSpec {
        code: CodeValue::new("482913").unwrap(),
        label: "Booking 42".to_string(),
        code_type: CodeType::Temporary,
        window: ValidityWindow::new(now, Some(now + Duration::days(3))).unwrap(),
        max_uses: None,
        external_code_id: external_id.map(str::to_string),
    }
}

#[tokio::test]
async fn test_yale_create_sends_bearer_and_returns_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/locks/lock-1/access-codes"))
        .and(header("authorization", "Bearer secret-key"))
        .and(body_partial_json(json!({"name": "Booking 42", "code": "482913"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "yale-77"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Yale, &server).resolve(ProviderKind::Yale);
    let id = provider
        .create_access_code(&target(ProviderKind::Yale), &spec(None))
        .await
        .unwrap();
    assert_eq!(id.as_str(), "yale-77");
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/locks/lock-1/access-codes"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Yale, &server).resolve(ProviderKind::Yale);
    let err = provider
        .create_access_code(&target(ProviderKind::Yale), &spec(None))
        .await
        .unwrap_err();
    assert!(err.is_transient(), "{err}");
}

#[tokio::test]
async fn test_client_error_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/devices/lock-1/accesscodes"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"error": "duplicate"})))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Schlage, &server).resolve(ProviderKind::Schlage);
    let err = provider
        .create_access_code(&target(ProviderKind::Schlage), &spec(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Rejected { .. }));
    assert!(err.to_string().contains("duplicate"));
}

#[tokio::test]
async fn test_revoke_treats_missing_code_as_done() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/locks/lock-1/pins/pin-9"))
        .and(header("x-august-access-token", "secret-key"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::August, &server).resolve(ProviderKind::August);
    provider
        .revoke_access_code(&target(ProviderKind::August), &spec(Some("pin-9")))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_revoke_without_external_id_is_configuration_error() {
    let server = MockServer::start().await;
    let provider = registry_for(ProviderKind::August, &server).resolve(ProviderKind::August);
    let err = provider
        .revoke_access_code(&target(ProviderKind::August), &spec(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Configuration { .. }));
}

#[tokio::test]
async fn test_remote_unlock_offline_device_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/smartlock/lock-1/action/unlock"))
        .respond_with(ResponseTemplate::new(423))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/smartlock/lock-1/action/lock"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Nuki, &server).resolve(ProviderKind::Nuki);
    let lock = target(ProviderKind::Nuki);
    assert!(!provider.remote_unlock(&lock).await.unwrap());
    assert!(provider.remote_lock(&lock).await.unwrap());
}

#[tokio::test]
async fn test_nuki_update_recreates_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/smartlock/lock-1/auth/old-id"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/smartlock/lock-1/auth"))
        .and(body_partial_json(json!({"code": 482913, "type": 13})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "new-id"})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Nuki, &server).resolve(ProviderKind::Nuki);
    let new_id = provider
        .update_access_code(&target(ProviderKind::Nuki), &spec(Some("old-id")))
        .await
        .unwrap();
    assert_eq!(new_id.map(|id| id.into_inner()), Some("new-id".to_string()));
}

#[tokio::test]
async fn test_nuki_sync_maps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/smartlock/lock-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "serverState": 0,
            "state": {"state": 1, "batteryCharge": 64, "batteryCritical": false}
        })))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Nuki, &server).resolve(ProviderKind::Nuki);
    let snapshot = provider
        .sync_status(&target(ProviderKind::Nuki))
        .await
        .unwrap();
    assert!(snapshot.online);
    assert_eq!(snapshot.battery_level, Some(64));
    assert_eq!(snapshot.locked, Some(true));
}

#[tokio::test]
async fn test_august_sync_offline_bridge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locks/lock-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "battery": 0.5,
            "Bridge": {"status": {"current": "offline"}}
        })))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::August, &server).resolve(ProviderKind::August);
    let snapshot = provider
        .sync_status(&target(ProviderKind::August))
        .await
        .unwrap();
    assert!(!snapshot.online);
    assert!(snapshot.error_message.is_some());
}

#[tokio::test]
async fn test_test_connection_reports_refused_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/devices"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let provider = registry_for(ProviderKind::Schlage, &server).resolve(ProviderKind::Schlage);
    let accepted = provider
        .test_connection(&Credentials::new("bad-token"))
        .await
        .unwrap();
    assert!(!accepted);
}

#[tokio::test]
async fn test_generic_base_url_from_lock_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locks/lock-1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "battery_level": 90,
            "online": true,
            "locked": false
        })))
        .mount(&server)
        .await;

    // No configured default: the URL must come from the lock itself
    let registry = ProviderRegistry::new(ProviderConfig::default()).unwrap();
    let lock = target(ProviderKind::Generic).with_settings(json!({"base_url": server.uri()}));
    let snapshot = registry
        .resolve(ProviderKind::Generic)
        .sync_status(&lock)
        .await
        .unwrap();
    assert_eq!(snapshot.battery_level, Some(90));
    assert_eq!(snapshot.locked, Some(false));
}

#[tokio::test]
async fn test_generic_without_base_url_is_configuration_error() {
    let registry = ProviderRegistry::new(ProviderConfig::default()).unwrap();
    let err = registry
        .resolve(ProviderKind::Generic)
        .remote_lock(&target(ProviderKind::Generic))
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Configuration { .. }));
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() {
    let config = ProviderConfig::default()
        .with_base_url(ProviderKind::Yale, "http://127.0.0.1:9")
        .with_http_timeout(std::time::Duration::from_millis(500));
    let provider = ProviderRegistry::new(config)
        .unwrap()
        .resolve(ProviderKind::Yale);
    let err = provider
        .remote_lock(&target(ProviderKind::Yale))
        .await
        .unwrap_err();
    assert!(err.is_transient(), "{err}");
}
