#![allow(dead_code)]

use chrono::{Duration, Utc};
use lockbox_core::{CodeGenerator, Credentials, ProviderKind, ValidityWindow};
use lockbox_providers::{MockProvider, MockProviderHandle, ProviderConfig, ProviderRegistry};
use lockbox_service::{AccessContext, LockRegistration, ServiceConfig, SmartLockService};
use lockbox_storage::Database;
use lockbox_storage::models::{ActivityFilter, LockActivity, PageRequest};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const OWNER: i64 = 1;
pub const GUEST: i64 = 42;

pub struct Harness {
    pub db: Database,
    pub service: Arc<SmartLockService>,
    pub mock: MockProviderHandle,
}

pub async fn harness() -> Harness {
    harness_with(ServiceConfig::default(), None).await
}

pub async fn harness_with(
    config: ServiceConfig,
    generator: Option<Arc<dyn CodeGenerator>>,
) -> Harness {
    let db = Database::in_memory().await.unwrap();
    let (mock, handle) = MockProvider::new();
    let providers = ProviderRegistry::new(ProviderConfig::default())
        .unwrap()
        .with_mock(mock);

    let mut service = SmartLockService::new(&db, providers, config).unwrap();
    if let Some(generator) = generator {
        service = service.with_generator(generator);
    }

    Harness {
        db,
        service: Arc::new(service),
        mock: handle,
    }
}

pub fn owner() -> AccessContext {
    AccessContext::owner(OWNER)
}

pub fn guest() -> AccessContext {
    AccessContext::guest(GUEST)
}

/// Window that started an hour ago and ends in two days.
pub fn current_window() -> ValidityWindow {
    let now = Utc::now();
    ValidityWindow::new(now - Duration::hours(1), Some(now + Duration::days(2))).unwrap()
}

/// Window that closed yesterday.
pub fn past_window() -> ValidityWindow {
    let now = Utc::now();
    ValidityWindow::new(now - Duration::days(3), Some(now - Duration::days(1))).unwrap()
}

/// Mock lock that talks to the mock provider.
pub async fn connected_lock(h: &Harness, device: &str) -> i64 {
    h.service
        .register_lock(
            LockRegistration::new(10, ProviderKind::Mock, device, "Front door")
                .with_credentials(Credentials::new(r#"{"token": "mock-token"}"#)),
            &owner(),
        )
        .await
        .unwrap()
        .id
}

/// Lock with no credentials; codes never leave the database.
pub async fn local_lock(h: &Harness, device: &str) -> i64 {
    h.service
        .register_lock(
            LockRegistration::new(10, ProviderKind::Yale, device, "Side gate"),
            &owner(),
        )
        .await
        .unwrap()
        .id
}

pub async fn activity(h: &Harness, lock_id: i64) -> Vec<LockActivity> {
    h.service
        .list_activity(lock_id, ActivityFilter::default(), PageRequest::new(0, 500), &owner())
        .await
        .unwrap()
        .items
}

/// Cycles through a fixed, tiny set of codes.
pub struct TinyCodeSpace {
    values: Vec<String>,
    next: AtomicUsize,
}

impl TinyCodeSpace {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| v.to_string()).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl CodeGenerator for TinyCodeSpace {
    fn generate(&self, _length: usize) -> String {
        let i = self.next.fetch_add(1, Ordering::Relaxed);
        self.values[i % self.values.len()].clone()
    }
}
