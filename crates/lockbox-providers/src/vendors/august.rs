//! August cloud adapter.

use crate::error::Result;
use crate::rest::{ApiAuth, RestClient};
use crate::traits::LockProvider;
use crate::types::{CodeSpec, LockSnapshot, LockTarget, ProviderCodeId};
use crate::vendors::{lock_token, token_from};
use chrono::{DateTime, Utc};
use lockbox_core::{Credentials, ProviderKind};
use reqwest::Method;
use serde::{Deserialize, Serialize};

const ACCESS_TOKEN_HEADER: &str = "x-august-access-token";

#[derive(Debug, Clone)]
pub struct AugustProvider {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinRequest<'a> {
    first_name: &'a str,
    pin: &'a str,
    access_type: &'static str,
    start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<String>,
}

impl<'a> PinRequest<'a> {
    fn from_spec(code: &'a CodeSpec) -> Self {
        Self {
            first_name: &code.label,
            pin: code.code.as_str(),
            access_type: if code.window.valid_until.is_some() {
                "temporary"
            } else {
                "always"
            },
            start_time: code.starts_at(),
            end_time: code.ends_at(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinResponse {
    pin_id: String,
}

#[derive(Debug, Deserialize)]
struct LockDetails {
    /// Fraction between 0 and 1.
    battery: Option<f64>,
    #[serde(rename = "LockStatus")]
    lock_status: Option<LockStatusBody>,
    #[serde(rename = "Bridge")]
    bridge: Option<BridgeBody>,
}

#[derive(Debug, Deserialize)]
struct LockStatusBody {
    status: String,
    #[serde(rename = "dateTime")]
    date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct BridgeBody {
    status: BridgeStatus,
}

#[derive(Debug, Deserialize)]
struct BridgeStatus {
    current: String,
}

impl AugustProvider {
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
            ApiAuth::Header(ACCESS_TOKEN_HEADER, token),
        )
    }

    fn client_for(&self, lock: &LockTarget) -> Result<RestClient> {
        Ok(self.client(lock_token(lock)?))
    }
}

impl LockProvider for AugustProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::August
    }

    async fn test_connection(&self, credentials: &Credentials) -> Result<bool> {
        let client = self.client(token_from(credentials)?);
        client.probe(client.request(Method::GET, "/users/me")).await
    }

    async fn create_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<ProviderCodeId> {
        let client = self.client_for(lock)?;
        let request = client
            .request(Method::POST, &format!("/locks/{}/pins", lock.device_id))
            .json(&PinRequest::from_spec(code));
        let response: PinResponse = client.send_json(request).await?;
        Ok(ProviderCodeId::new(response.pin_id))
    }

    async fn update_access_code(
        &self,
        lock: &LockTarget,
        code: &CodeSpec,
    ) -> Result<Option<ProviderCodeId>> {
        let pin_id = code.require_external_id("update_access_code")?;
        let client = self.client_for(lock)?;
        let request = client
            .request(
                Method::PUT,
                &format!("/locks/{}/pins/{pin_id}", lock.device_id),
            )
            .json(&PinRequest::from_spec(code));
        client.send(request).await?;
        Ok(None)
    }

    async fn revoke_access_code(&self, lock: &LockTarget, code: &CodeSpec) -> Result<()> {
        let pin_id = code.require_external_id("revoke_access_code")?;
        let client = self.client_for(lock)?;
        client
            .send_idempotent(client.request(
                Method::DELETE,
                &format!("/locks/{}/pins/{pin_id}", lock.device_id),
            ))
            .await
    }

    async fn remote_lock(&self, lock: &LockTarget) -> Result<bool> {
        let client = self.client_for(lock)?;
        client
            .send_command(client.request(
                Method::PUT,
                &format!("/remoteoperate/{}/lock", lock.device_id),
            ))
            .await
    }

    async fn remote_unlock(&self, lock: &LockTarget) -> Result<bool> {
        let client = self.client_for(lock)?;
        client
            .send_command(client.request(
                Method::PUT,
                &format!("/remoteoperate/{}/unlock", lock.device_id),
            ))
            .await
    }

    async fn sync_status(&self, lock: &LockTarget) -> Result<LockSnapshot> {
        let client = self.client_for(lock)?;
        let details: LockDetails = client
            .send_json(client.request(Method::GET, &format!("/locks/{}", lock.device_id)))
            .await?;

        let online = details
            .bridge
            .as_ref()
            .is_none_or(|bridge| bridge.status.current == "online");
        if !online {
            return Ok(LockSnapshot::offline("August bridge is offline"));
        }

        let battery = details
            .battery
            .map(|fraction| (fraction * 100.0).round().clamp(0.0, 100.0) as i32);
        let mut snapshot = LockSnapshot::online(battery);
        if let Some(status) = details.lock_status {
            snapshot.locked = match status.status.as_str() {
                "locked" => Some(true),
                "unlocked" => Some(false),
                _ => None,
            };
            snapshot.last_seen_at = status.date_time;
        }
        Ok(snapshot)
    }
}

