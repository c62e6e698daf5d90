//! Thin JSON-over-HTTP client shared by the vendor adapters.
//!
//! Status classification is the same for every vendor:
//!
//! | Status                  | Outcome                      |
//! |-------------------------|------------------------------|
//! | 2xx                     | success                      |
//! | 408, 429, 5xx           | `ProviderError::Unavailable` |
//! | other 4xx               | `ProviderError::Rejected`    |
//!
//! Remote lock/unlock additionally maps 409, 423 and 504 to "device offline"
//! (`Ok(false)`), which is how the vendor clouds report a bridge that did not
//! answer.

use crate::error::{ProviderError, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

/// Longest response excerpt carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// How a vendor expects the API token.
#[derive(Clone)]
pub enum ApiAuth {
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// Token in a vendor-specific header.
    Header(&'static str, String),
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuth::Bearer(_) => f.write_str("Bearer(***)"),
            ApiAuth::Header(name, _) => write!(f, "Header({name}, ***)"),
        }
    }
}

/// HTTP client bound to one vendor base URL and one credential.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    auth: ApiAuth,
}

impl RestClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, auth: ApiAuth) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Start an authenticated request to `path` (relative to the base URL).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        match &self.auth {
            ApiAuth::Bearer(token) => builder.bearer_auth(token),
            ApiAuth::Header(name, value) => builder.header(*name, value),
        }
    }

    /// Send and decode a JSON response body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = ensure_success(request.send().await?).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::rejected(format!("unexpected response body: {e}")))
    }

    /// Send and discard the response body.
    pub async fn send(&self, request: RequestBuilder) -> Result<()> {
        ensure_success(request.send().await?).await?;
        Ok(())
    }

    /// Send a delete-style request where 404 means the resource is already gone.
    pub async fn send_idempotent(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(url = %response.url(), "resource already absent");
            return Ok(());
        }
        ensure_success(response).await?;
        Ok(())
    }

    /// Send a remote command. `Ok(false)` when the device is unreachable.
    pub async fn send_command(&self, request: RequestBuilder) -> Result<bool> {
        let response = request.send().await?;
        if is_offline_status(response.status()) {
            tracing::debug!(status = %response.status(), "device did not answer command");
            return Ok(false);
        }
        ensure_success(response).await?;
        Ok(true)
    }

    /// Credential probe: 2xx is `true`, 401/403 is `false`.
    pub async fn probe(&self, request: RequestBuilder) -> Result<bool> {
        let response = request.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            _ => {
                ensure_success(response).await?;
                Ok(true)
            }
        }
    }
}

/// Statuses vendor clouds use for a lock that could not be reached.
pub fn is_offline_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::CONFLICT | StatusCode::LOCKED | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Map a non-success status to a provider error.
pub fn classify_status(status: StatusCode, body: &str) -> ProviderError {
    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    let message = if excerpt.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {excerpt}")
    };

    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        ProviderError::unavailable(message)
    } else {
        ProviderError::rejected(message)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}
