//! Schlage (Allegion) cloud adapter.
//!
//! Schlage models locks as devices with numeric attributes: `lockState` is
//! `1` for locked and `0` for unlocked.

use crate::error::Result;
use crate::rest::{ApiAuth, RestClient};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::{lock_token, token_from};
use lockbox_core::{Credentials, ProviderKind};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct SchlageProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessCodeBody<'a> {
    friendly_name: &'a str,
    access_code: &'a str,
    schedule: Schedule,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Schedule {
    start: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<String>,
    always: bool,
}

impl<'a> From<&'a CodeSpec> for AccessCodeBody<'a> {
    fn from(code: &'a CodeSpec) -> Self {
        Self {
            friendly_name: &code.label,
            access_code: code.code.as_str(),
            schedule: Schedule {
                start: code.starts_at(),
                end: code.ends_at(),
                always: code.window.valid_until.is_none(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Created {
    accesscode_id: String,
}

#[derive(Debug, Deserialize)]
struct Device {
    connected: bool,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Attributes {
    battery_level: Option<i32>,
    lock_state: Option<i32>,
    lock_state_error: Option<String>,
}

impl SchlageProvider {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn client(&self, token: String) -> RestClient {
        RestClient::new(
            self.http.clone(),
            &self.base_url,
            ApiAuth::Header(API_KEY_HEADER, token),
        )
    }

    fn client_for(&self, lock: &LockTarget) -> Result<RestClient> {
        Ok(self.client(lock_token(lock)?))
    }

    async fn set_lock_state(&self, lock: &LockTarget, state: i32) -> Result<bool> {
        let client = self.client_for(lock)?;
        let request = client
            .request(Method::PUT, &format!("/devices/{}", lock.device_id))
            .json(&json!({ "attributes": { "lockState": state } }));
        client.send_command(request).await
    }
}

impl LockProvider for SchlageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Schlage
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        let client = self.client(token_from(credentials)?);
        client.probe(client.request(Method::GET, "/devices")).await
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
                &format!("/devices/{}/accesscodes", lock.device_id),
            )
            .json(&AccessCodeBody::from(code));
        let created: Created = client.send_json(request).await?;
        Ok(ProviderCodeId::new(created.accesscode_id))
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
                &format!("/devices/{}/accesscodes/{id}", lock.device_id),
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
                &format!("/devices/{}/accesscodes/{id}", lock.device_id),
            ))
            .await
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        self.set_lock_state(lock, 1).await
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        self.set_lock_state(lock, 0).await
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        let client = self.client_for(lock)?;
        let device: Device = client
            .send_json(client.request(Method::GET, &format!("/devices/{}", lock.device_id)))
            .await?;

        if !device.connected {
            return Ok(LockSnapshot::offline("Schlage device is disconnected"));
        }

        let attributes = device.attributes;
        Ok(LockSnapshot {
            battery_level: attributes.battery_level,
            online: true,
            locked: attributes.lock_state.and_then(|state| match state {
                1 => Some(true),
                0 => Some(false),
                _ => None,
            }),
            error_message: attributes.lock_state_error,
            last_seen_at: None,
        })
    }
}
