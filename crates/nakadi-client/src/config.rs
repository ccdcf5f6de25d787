//! Client configuration
//!
//! A [`Client`] is configured once through [`ClientBuilder`] and never changes
//! afterwards. [`ClientConfig`] holds the serializable part so it can be read
//! from a TOML file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::TokenProvider;
use crate::client::Client;
use crate::error::{NakadiError, Result};
use crate::transport::{ReqwestTransport, Transport};

/// Broker URL used when none is configured
pub const DEFAULT_NAKADI_URL: &str = "http://localhost:8080";

/// Timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Serializable client settings
///
/// ```toml
/// base_url = "https://nakadi.example.com"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Broker base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for control-plane requests and for connecting streams
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_NAKADI_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Parse configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| NakadiError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NakadiError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Builder for [`Client`]
///
/// Every option is independent; unset options keep their defaults.
///
/// ```
/// use std::time::Duration;
/// use nakadi_client::{BoxError, Client};
///
/// let client = Client::builder()
///     .url("https://nakadi.example.com")
///     .timeout(Duration::from_secs(5))
///     .tokens(|| Ok::<_, BoxError>("secret".to_string()))
///     .build()
///     .unwrap();
///
/// assert_eq!(client.timeout(), Duration::from_secs(5));
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    url: Option<String>,
    timeout: Option<Duration>,
    token_provider: Option<Arc<dyn TokenProvider>>,
    transport: Option<Arc<dyn Transport>>,
    stream_transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from serialized settings
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new()
            .url(config.base_url.clone())
            .timeout(config.timeout())
    }

    /// Override the broker base URL
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Override the control-plane request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Authenticate every request with tokens from `provider`
    pub fn tokens(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token_provider = Some(Arc::new(provider));
        self
    }

    /// Use a shared token provider
    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Replace the control-plane transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the streaming transport
    pub fn stream_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.stream_transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client> {
        let base_url = Url::parse(self.url.as_deref().unwrap_or(DEFAULT_NAKADI_URL))?;
        if base_url.cannot_be_a_base() {
            return Err(NakadiError::Config(format!(
                "broker URL cannot be a base: {}",
                base_url
            )));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::control(timeout)?),
        };
        let stream_transport = match self.stream_transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::streaming(timeout)?),
        };

        Ok(Client::from_parts(
            base_url,
            timeout,
            transport,
            stream_transport,
            self.token_provider,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, DEFAULT_NAKADI_URL);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_config_from_toml() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://example.com/nakadi"
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://example.com/nakadi");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_rejects_bad_toml() {
        let err = ClientConfig::from_toml_str("timeout_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, NakadiError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nakadi.toml");
        std::fs::write(&path, "timeout_secs = 12\n").unwrap();

        let config = ClientConfig::load_from(&path).unwrap();
        assert_eq!(config.timeout_secs, 12);
        assert_eq!(config.base_url, DEFAULT_NAKADI_URL);
    }

    #[test]
    fn test_builder_from_config() {
        let config = ClientConfig {
            base_url: "https://example.com".into(),
            timeout_secs: 7,
        };
        let client = ClientBuilder::from_config(&config).build().unwrap();

        assert_eq!(client.base_url().as_str(), "https://example.com/");
        assert_eq!(client.timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_invalid_url() {
        let err = ClientBuilder::new().url("not a url").build().unwrap_err();
        assert!(matches!(err, NakadiError::InvalidUrl(_)));
    }

    #[test]
    fn test_url_must_be_a_base() {
        let err = ClientBuilder::new().url("mailto:ops@example.com").build().unwrap_err();
        assert!(matches!(err, NakadiError::Config(_)));
    }
}
