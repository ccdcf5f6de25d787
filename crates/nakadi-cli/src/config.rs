//! Configuration file handling for nakadi-cli

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nakadi_client::{BoxError, ClientBuilder, ClientConfig, DEFAULT_NAKADI_URL, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};

/// Configuration for the CLI tool
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default broker URL
    pub server: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
    /// File holding the bearer token
    pub token_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Get the default config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("nakadi");

        Ok(config_dir.join("config.toml"))
    }

    /// Merge CLI arguments over config file values
    pub fn merge_with_args(
        &self,
        server: Option<&str>,
        timeout_secs: Option<u64>,
        token: Option<&str>,
        token_file: Option<&Path>,
    ) -> MergedConfig {
        let token = match (token, token_file) {
            (Some(token), _) => TokenSource::Static(token.to_string()),
            (None, Some(path)) => TokenSource::File(path.to_path_buf()),
            (None, None) => self
                .token_file
                .clone()
                .map(TokenSource::File)
                .unwrap_or(TokenSource::None),
        };

        MergedConfig {
            client: ClientConfig {
                base_url: server
                    .map(String::from)
                    .or_else(|| self.server.clone())
                    .unwrap_or_else(|| DEFAULT_NAKADI_URL.to_string()),
                timeout_secs: timeout_secs
                    .or(self.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT.as_secs()),
            },
            token,
        }
    }
}

/// Where bearer tokens come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Unauthenticated
    None,
    /// Same token for every request
    Static(String),
    /// Re-read before every request
    File(PathBuf),
}

impl TokenSource {
    /// Install the matching token provider on a client builder
    pub fn apply(self, builder: ClientBuilder) -> ClientBuilder {
        match self {
            TokenSource::None => builder,
            TokenSource::Static(token) => builder.tokens(move || Ok::<_, BoxError>(token.clone())),
            TokenSource::File(path) => builder.tokens(move || read_token(&path)),
        }
    }
}

fn read_token(path: &Path) -> std::result::Result<String, BoxError> {
    let token = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read token file {}: {}", path.display(), e))?;
    Ok(token.trim().to_string())
}

/// Fully resolved configuration after merging CLI args
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub client: ClientConfig,
    pub token: TokenSource,
}
