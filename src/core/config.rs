//! Application configuration management
//!
//! Configuration is loaded from a TOML file and validated at startup so the
//! gateway fails fast if misconfigured.

use crate::conversion::Dialect;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 90;

/// Default server port
const DEFAULT_PORT: u16 = 8084;

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamTomlConfig {
    /// Wire dialect the upstream speaks: claude, chat, or responses
    pub dialect: String,
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub big_model: String,
    pub middle_model: String,
    pub small_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Optional API key clients must present
    #[serde(default)]
    pub api_key: Option<String>,
    pub upstream: UpstreamTomlConfig,
    pub models: ModelConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

/// Application configuration loaded from a TOML file
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional API key expected from clients; validation is skipped when
    /// unset
    pub client_api_key: Option<String>,

    /// Dialect the upstream provider speaks
    pub upstream_dialect: Dialect,

    /// Upstream API base URL, including any version prefix
    pub upstream_base_url: String,

    /// Upstream API key
    pub upstream_api_key: String,

    /// Server bind address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Logging level
    pub log_level: String,

    /// Upstream request timeout in seconds
    pub request_timeout: u64,

    /// Model served for opus requests
    pub big_model: String,

    /// Model served for sonnet requests
    pub middle_model: String,

    /// Model served for haiku requests
    pub small_model: String,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// upstream dialect is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path).context("Failed to read configuration file")?;

        let config: TomlConfig =
            toml::from_str(&raw).context("Failed to parse TOML configuration")?;

        let upstream_dialect = Dialect::parse(&config.upstream.dialect).context(
            "Invalid upstream dialect. Must be one of: claude, chat, responses",
        )?;

        let upstream_base_url = config.upstream.base_url.unwrap_or_else(|| {
            match upstream_dialect {
                Dialect::Claude => "https://api.anthropic.com/v1",
                Dialect::Chat | Dialect::Responses => "https://api.openai.com/v1",
            }
            .to_string()
        });

        Ok(Config {
            client_api_key: config.api_key,
            upstream_dialect,
            upstream_base_url,
            upstream_api_key: config.upstream.api_key,
            host: config.server.host,
            port: config.server.port,
            log_level: config.server.log_level,
            request_timeout: config.request.request_timeout,
            big_model: config.models.big_model,
            middle_model: config.models.middle_model,
            small_model: config.models.small_model,
        })
    }

    /// Load configuration from the path in `CONFIG_PATH`, defaulting to
    /// `config.toml` in the current directory.
    pub fn from_env() -> Result<Self> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        Self::from_file(config_path)
    }

    /// Basic upstream key sanity check, run at startup.
    pub fn validate_api_key(&self) -> bool {
        !self.upstream_api_key.trim().is_empty()
    }

    /// Validate a client's API key. Skipped (always true) when no client
    /// key is configured.
    pub fn validate_client_api_key(&self, client_api_key: &str) -> bool {
        match &self.client_api_key {
            Some(expected) => client_api_key == expected,
            None => true,
        }
    }
}
