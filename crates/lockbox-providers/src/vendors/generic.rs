//! Adapter for self-hosted bridges exposing the Lockbox generic REST contract.
//!
//! The base URL comes from, in order: the lock's `base_url` setting, a
//! `base_url` field in its credentials, then the configured default.
//!
//! ```text
//! POST   /locks/{id}/codes           -> {"id": "..."}
//! PUT    /locks/{id}/codes/{code_id}
//! DELETE /locks/{id}/codes/{code_id}
//! POST   /locks/{id}/lock
//! POST   /locks/{id}/unlock
//! GET    /locks/{id}/status          -> LockSnapshot
//! GET    /health
//! ```

use crate::error::{ProviderError, Result};
use crate::rest::{ApiAuth, RestClient};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::token_from;
use lockbox_core::{Credentials, ProviderKind};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct GenericProvider {
    http: reqwest::Client,
    default_base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

impl GenericProvider {
    pub fn new(http: reqwest::Client, default_base_url: Option<String>) -> Self {
        Self {
            http,
            default_base_url,
        }
    }

    fn base_url(&self, setting: Option<&str>, credentials: &Credentials) -> Result<String> {
        setting
            .map(str::to_string)
            .or_else(|| credentials.field("base_url"))
            .or_else(|| self.default_base_url.clone())
            .ok_or_else(|| ProviderError::configuration("generic provider has no base_url"))
    }

    fn client_for(&self, lock: &LockTarget) -> Result<RestClient> {
        let credentials = lock.credentials.as_ref().ok_or_else(|| {
            ProviderError::configuration(format!(
                "no provider credentials configured for {}",
                lock.device_id
            ))
        })?;
        let base_url = self.base_url(lock.setting("base_url"), credentials)?;
        Ok(RestClient::new(
            self.http.clone(),
            base_url,
            ApiAuth::Bearer(token_from(credentials)?),
        ))
    }

    fn code_body(code: &CodeSpec) -> serde_json::Value {
        json!({
            "name": code.label,
            "code": code.code.as_str(),
            "code_type": code.code_type,
            "valid_from": code.starts_at(),
            "valid_until": code.ends_at(),
            "max_uses": code.max_uses,
        })
    }
}

impl LockProvider for GenericProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generic
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        let base_url = self.base_url(None, credentials)?;
        let client = RestClient::new(
            self.http.clone(),
            base_url,
            ApiAuth::Bearer(token_from(credentials)?),
        );
        client.probe(client.request(Method::GET, "/health")).await
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        let client = self.client_for(lock)?;
        let request = client
            .request(Method::POST, &format!("/locks/{}/codes", lock.device_id))
            .json(&Self::code_body(code));
        let created: Created = client.send_json(request).await?;
        Ok(ProviderCodeId::new(created.id))
    }

    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>> {
        let id = code.require_external_id("update_access_code")?;
        let client = self.client_for(lock)?;
        let request = client
            .request(
                Method::PUT,
                &format!("/locks/{}/codes/{id}", lock.device_id),
            )
            .json(&Self::code_body(code));
        client.send(request).await?;
        Ok(None)
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        let id = code.require_external_id("revoke_access_code")?;
        let client = self.client_for(lock)?;
        client
            .send_idempotent(client.request(
                Method::DELETE,
                &format!("/locks/{}/codes/{id}", lock.device_id),
            ))
            .await
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        let client = self.client_for(lock)?;
        client
            .send_command(client.request(Method::POST, &format!("/locks/{}/lock", lock.device_id)))
            .await
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        let client = self.client_for(lock)?;
        client
            .send_command(
                client.request(Method::POST, &format!("/locks/{}/unlock", lock.device_id)),
            )
            .await
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        let client = self.client_for(lock)?;
        client
            .send_json(client.request(Method::GET, &format!("/locks/{}/status", lock.device_id)))
            .await
    }
}
