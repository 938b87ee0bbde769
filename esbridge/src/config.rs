//! Configuration management
//!
//! Default config location: ./esbridge.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub passthrough: PassthroughConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Maximum request body size in bytes (default: 10MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7777".to_string()
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors: CorsConfig::default(),
            max_body_size: default_max_body_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

/// Search backend the `_msearch` route is translated to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_search_path")]
    pub search_path: String,
    /// Value of the `options` query parameter (named query options on the backend)
    #[serde(default = "default_search_options")]
    pub options: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8099".to_string()
}

fn default_search_path() -> String {
    "/v1/search".to_string()
}

fn default_search_options() -> String {
    "search-options".to_string()
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_password() -> String {
    "admin".to_string()
}

fn default_timeout() -> u64 {
    30000
}

fn default_connect_timeout() -> u64 {
    5000
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            search_path: default_search_path(),
            options: default_search_options(),
            username: default_username(),
            password: default_password(),
            timeout_ms: default_timeout(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Forwarding of every route other than `_msearch`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PassthroughConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_passthrough_url")]
    pub url: String,
}

fn default_passthrough_url() -> String {
    "http://localhost:8095".to_string()
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_passthrough_url(),
        }
    }
}

/// Index name clients search against; also stamped on every hit as `_index`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
}

fn default_index_name() -> String {
    "good-books-ds".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable Prometheus metrics at GET /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_level() -> String {
    "info,esbridge=debug".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from file path, or fall back to defaults when it does not exist
    pub fn load_or_default(config_path: &Path) -> Result<Self, ConfigError> {
        let config = if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_url("backend.url", &self.backend.url)?;
        if self.passthrough.enabled {
            check_url("passthrough.url", &self.passthrough.url)?;
        }
        if !self.backend.search_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "backend.search_path must start with '/': {}",
                self.backend.search_path
            )));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "backend.timeout_ms must be greater than 0".to_string(),
            ));
        }
        check_index_name(&self.index.name)?;
        Ok(())
    }
}

/// Characters Elasticsearch forbids in index names, plus route pattern syntax
const FORBIDDEN_INDEX_CHARS: &[char] = &[
    '\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':', '{', '}',
];

fn check_index_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.starts_with(['-', '_', '+'])
        && !name.contains(FORBIDDEN_INDEX_CHARS);
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "index.name is not a valid index name: {:?}",
            name
        )))
    }
}

fn check_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value)
        .map_err(|e| ConfigError::Invalid(format!("{} is not a valid URL ({}): {}", field, e, value)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}
