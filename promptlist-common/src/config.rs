//! Bootstrap configuration loading
//!
//! The TOML file is the lowest-priority explicit source: command-line flags
//! and environment variables override it, compiled defaults fill the gaps.
//! A missing file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration read from `config.toml`
///
/// Every field is optional so that a partial file is valid. Field-level
/// defaults live with the consumer (`promptlist-server` `ServiceConfig`).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP bind host
    pub host: Option<String>,
    /// HTTP port
    pub port: Option<u16>,
    /// Chat-completion API key
    pub openai_api_key: Option<String>,
    /// Chat-completion model name
    pub model: Option<String>,
    /// Chat-completion API base URL (no trailing slash)
    pub completion_base_url: Option<String>,
    /// Music catalog API base URL (no trailing slash)
    pub catalog_base_url: Option<String>,
    /// Upper bound on completion output tokens
    pub max_tokens: Option<u32>,
    /// Catalog market code used for searches
    pub market: Option<String>,
    /// Client-side pacing for catalog requests
    pub catalog_requests_per_second: Option<u32>,
    /// Concurrent per-track catalog searches
    pub search_concurrency: Option<usize>,
    /// Delay before each per-track search task after the first
    pub search_stagger_ms: Option<u64>,
    /// Base delay for catalog rate-limit backoff
    pub backoff_base_ms: Option<u64>,
    /// Cross-check generated tracks against the catalog when a token is supplied
    pub reconciliation_enabled: Option<bool>,
    /// Allowed CORS origins
    pub cors_origins: Option<Vec<String>>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Platform config location: `<config_dir>/promptlist/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("promptlist").join("config.toml"))
}

/// Load the TOML bootstrap file
///
/// Returns defaults (with a warning) when the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = parse_toml_config(&content).map_err(|e| {
        Error::Config(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse TOML text into a `TomlConfig`
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    Ok(toml::from_str(content)?)
}
