//! Yale Access cloud adapter.

use crate::error::Result;
use crate::rest::{ApiAuth, RestClient};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::{lock_token, token_from};
use chrono::{DateTime, Utc};
use lockbox_core::{Credentials, ProviderKind};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct YaleProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct AccessCodeBody<'a> {
    name: &'a str,
    code: &'a str,
    starts_at: String,
    ends_at: Option<String>,
    max_uses: Option<i64>,
}

impl<'a> From<&'a CodeSpec> for AccessCodeBody<'a> {
    fn from(code: &'a CodeSpec) -> Self {
        Self {
            name: &code.label,
            code: code.code.as_str(),
            starts_at: code.starts_at(),
            ends_at: code.ends_at(),
            max_uses: code.max_uses,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    battery_level: Option<i32>,
    online: bool,
    state: Option<String>,
    last_seen: Option<DateTime<Utc>>,
    error: Option<String>,
}

impl YaleProvider {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn client(&self, token: String) -> RestClient {
        RestClient::new(self.http.clone(), &self.base_url, ApiAuth::Bearer(token))
    }

    fn client_for(&self, lock: &LockTarget) -> Result<RestClient> {
        Ok(self.client(lock_token(lock)?))
    }

    async fn command(&self, lock: &LockTarget, command: &str) -> Result<bool> {
        let client = self.client_for(lock)?;
        let request = client
            .request(Method::POST, &format!("/locks/{}/commands", lock.device_id))
            .json(&json!({ "command": command }));
        client.send_command(request).await
    }
}

impl LockProvider for YaleProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Yale
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        let client = self.client(token_from(credentials)?);
        client.probe(client.request(Method::GET, "/locks")).await
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        let client = self.client_for(lock)?;
        let request = client
            .request(
                Method::POST,
                &format!("/locks/{}/access-codes", lock.device_id),
            )
            .json(&AccessCodeBody::from(code));
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
                Method::PATCH,
                &format!("/locks/{}/access-codes/{id}", lock.device_id),
            )
            .json(&AccessCodeBody::from(code));
        client.send(request).await?;
        Ok(None)
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        let id = code.require_external_id("revoke_access_code")?;
        let client = self.client_for(lock)?;
        client
            .send_idempotent(client.request(
                Method::DELETE,
                &format!("/locks/{}/access-codes/{id}", lock.device_id),
            ))
            .await
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        self.command(lock, "lock").await
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        self.command(lock, "unlock").await
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        let client = self.client_for(lock)?;
        let body: StatusBody = client
            .send_json(client.request(Method::GET, &format!("/locks/{}/status", lock.device_id)))
            .await?;

        if !body.online {
            return Ok(LockSnapshot::offline(
                body.error
                    .unwrap_or_else(|| "lock is offline".to_string()),
            ));
        }

        Ok(LockSnapshot {
            battery_level: body.battery_level,
            online: true,
            locked: body.state.as_deref().and_then(|state| match state {
                "locked" => Some(true),
                "unlocked" => Some(false),
                _ => None,
            }),
            error_message: body.error,
            last_seen_at: body.last_seen,
        })
    }
}
