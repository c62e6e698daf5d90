//! Adapter configuration.
//!
//! Base URLs are overridable per vendor so tests and staging deployments can
//! point adapters at a local server.

use crate::error::{ProviderError, Result};
use lockbox_core::ProviderKind;
use std::time::Duration;

pub const DEFAULT_AUGUST_API_BASE: &str = "https://api-production.august.com";
pub const DEFAULT_YALE_API_BASE: &str = "https://api.yalehome.com/v1";
pub const DEFAULT_SCHLAGE_API_BASE: &str = "https://api.allegion.yonomi.cloud/v1";
pub const DEFAULT_NUKI_API_BASE: &str = "https://api.nuki.io";

/// Transport-level HTTP timeout. The service applies its own, usually
/// shorter, deadline on top of this.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Vendor endpoints and HTTP settings.
///
/// # Examples
///
/// ```
/// use lockbox_providers::config::ProviderConfig;
/// use lockbox_core::ProviderKind;
///
/// let config = ProviderConfig::default().with_base_url(ProviderKind::Nuki, "http://127.0.0.1:9000/");
/// assert_eq!(config.base_url(ProviderKind::Nuki), Some("http://127.0.0.1:9000"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub august_api_base: String,
    pub yale_api_base: String,
    pub schlage_api_base: String,
    pub nuki_api_base: String,

    /// Fallback for generic locks whose settings carry no `base_url`.
    pub generic_api_base: Option<String>,

    /// Timeout applied by the HTTP client to every request.
    pub http_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            august_api_base: DEFAULT_AUGUST_API_BASE.to_string(),
            yale_api_base: DEFAULT_YALE_API_BASE.to_string(),
            schlage_api_base: DEFAULT_SCHLAGE_API_BASE.to_string(),
            nuki_api_base: DEFAULT_NUKI_API_BASE.to_string(),
            generic_api_base: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Override the base URL of one vendor. Trailing slashes are dropped.
    ///
    /// Setting the mock provider's URL has no effect.
    pub fn with_base_url(mut self, kind: ProviderKind, url: impl Into<String>) -> Self {
        let url = url.into().trim_end_matches('/').to_string();
        match kind {
            ProviderKind::August => self.august_api_base = url,
            ProviderKind::Yale => self.yale_api_base = url,
            ProviderKind::Schlage => self.schlage_api_base = url,
            ProviderKind::Nuki => self.nuki_api_base = url,
            ProviderKind::Generic => self.generic_api_base = Some(url),
            ProviderKind::Mock => {}
        }
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Base URL configured for `kind`, `None` for the mock and for an
    /// unconfigured generic provider.
    pub fn base_url(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::August => Some(&self.august_api_base),
            ProviderKind::Yale => Some(&self.yale_api_base),
            ProviderKind::Schlage => Some(&self.schlage_api_base),
            ProviderKind::Nuki => Some(&self.nuki_api_base),
            ProviderKind::Generic => self.generic_api_base.as_deref(),
            ProviderKind::Mock => None,
        }
    }

    /// Build the shared HTTP client.
    ///
    /// # Errors
    /// Returns `ProviderError::Configuration` if the TLS backend fails to
    /// initialize.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("lockbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::configuration(format!("http client: {e}")))
    }
}
