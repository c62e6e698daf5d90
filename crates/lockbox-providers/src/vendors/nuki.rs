//! Nuki Web API adapter.
//!
//! Nuki keypad authorizations cannot be edited in place, so updates delete
//! the authorization and create a new one, returning the new id.

use crate::error::{ProviderError, Result};
use crate::rest::{ApiAuth, RestClient};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::{lock_token, token_from};
use lockbox_core::{Credentials, ProviderKind};
use reqwest::Method;
use serde::{Deserialize, Serialize};

/// `state.state` value for a locked bolt.
const STATE_LOCKED: i32 = 1;
/// `state.state` value for an unlocked bolt.
const STATE_UNLOCKED: i32 = 3;
/// `serverState` value for a device connected to the Nuki servers.
const SERVER_STATE_OK: i32 = 0;

/// Authorization type for keypad codes.
const AUTH_TYPE_KEYPAD: i32 = 13;

#[derive(Debug, Clone)]
pub struct NukiProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthBody<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    auth_type: i32,
    code: u64,
    allowed_from_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_until_date: Option<String>,
}

impl<'a> AuthBody<'a> {
    fn from_spec(code: &'a CodeSpec) -> Result<Self> {
        // Nuki takes the code as a number, so a leading zero cannot be programmed
        if code.code.as_str().starts_with('0') {
            return Err(ProviderError::rejected(
                "Nuki keypad codes cannot start with 0",
            ));
        }
        let digits = code
            .code
            .as_str()
            .parse::<u64>()
            .map_err(|e| ProviderError::rejected(format!("invalid keypad code: {e}")))?;
        Ok(Self {
            name: &code.label,
            auth_type: AUTH_TYPE_KEYPAD,
            code: digits,
            allowed_from_date: code.starts_at(),
            allowed_until_date: code.ends_at(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Smartlock {
    server_state: i32,
    state: Option<SmartlockState>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmartlockState {
    state: i32,
    battery_charge: Option<i32>,
    #[serde(default)]
    battery_critical: bool,
}

impl NukiProvider {
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

    async fn action(&self, lock: &LockTarget, action: &str) -> Result<bool> {
        let client = self.client_for(lock)?;
        client
            .send_command(client.request(
                Method::POST,
                &format!("/smartlock/{}/action/{action}", lock.device_id),
            ))
            .await
    }
}

impl LockProvider for NukiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Nuki
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        let client = self.client(token_from(credentials)?);
        client.probe(client.request(Method::GET, "/account")).await
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        let body = AuthBody::from_spec(code)?;
        let client = self.client_for(lock)?;
        let request = client
            .request(Method::POST, &format!("/smartlock/{}/auth", lock.device_id))
            .json(&body);
        let created: Created = client.send_json(request).await?;
        Ok(ProviderCodeId::new(created.id))
    }

    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>> {
        code.require_external_id("update_access_code")?;
        self.revoke_access_code(lock, code).await?;
        let id = self.create_access_code(lock, code).await?;
        Ok(Some(id))
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        let id = code.require_external_id("revoke_access_code")?;
        let client = self.client_for(lock)?;
        client
            .send_idempotent(client.request(
                Method::DELETE,
                &format!("/smartlock/{}/auth/{id}", lock.device_id),
            ))
            .await
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        self.action(lock, "lock").await
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        self.action(lock, "unlock").await
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        let client = self.client_for(lock)?;
        let smartlock: Smartlock = client
            .send_json(client.request(Method::GET, &format!("/smartlock/{}", lock.device_id)))
            .await?;

        if smartlock.server_state != SERVER_STATE_OK {
            return Ok(LockSnapshot::offline(format!(
                "Nuki server state {}",
                smartlock.server_state
            )));
        }

        let Some(state) = smartlock.state else {
            return Ok(LockSnapshot::online(None));
        };

        let mut snapshot = LockSnapshot::online(state.battery_charge);
        snapshot.locked = match state.state {
            STATE_LOCKED => Some(true),
            STATE_UNLOCKED => Some(false),
            _ => None,
        };
        if state.battery_critical {
            snapshot.error_message = Some("battery critical".to_string());
        }
        Ok(snapshot)
    }
}
