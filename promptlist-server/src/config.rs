//! Configuration resolution for promptlist-server
//!
//! Priority per field: command-line flag → environment variable → TOML →
//! compiled default. Flags and their environment variables are merged by
//! clap; the TOML layer and defaults are applied here. The result is built
//! once at startup and never mutated.

use clap::Parser;
use promptlist_common::config::{default_config_path, TomlConfig};
use promptlist_common::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::services::catalog_client::{DEFAULT_CATALOG_BASE_URL, DEFAULT_MARKET};
use crate::services::catalog_reconciler::ReconcilerSettings;
use crate::services::completion_client::{DEFAULT_COMPLETION_BASE_URL, DEFAULT_MODEL};
use crate::services::playlist_assembler::PipelineSettings;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_CATALOG_REQUESTS_PER_SECOND: u32 = 10;
pub const DEFAULT_SEARCH_CONCURRENCY: usize = 4;
pub const DEFAULT_SEARCH_STAGGER_MS: u64 = 50;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;
pub const DEFAULT_CORS_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:5175",
    "http://127.0.0.1:5175",
];

/// Environment variable holding the completion API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Command-line arguments for promptlist-server
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "promptlist-server")]
#[command(about = "Prompt-to-playlist generation service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PROMPTLIST_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "PROMPTLIST_HOST")]
    pub host: Option<String>,

    /// Path to config.toml
    #[arg(short, long, env = "PROMPTLIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Completion model name
    #[arg(short, long, env = "PROMPTLIST_MODEL")]
    pub model: Option<String>,
}

impl Args {
    /// Config file to load: `--config`, else the platform default
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }
}

/// Resolved service configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// `None` means every completion fails with an auth error and the demo
    /// playlist is served
    pub openai_api_key: Option<String>,
    pub model: String,
    pub completion_base_url: String,
    pub catalog_base_url: String,
    pub market: String,
    pub catalog_requests_per_second: u32,
    pub pipeline: PipelineSettings,
    pub cors_origins: Vec<String>,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge CLI/env arguments over the TOML file and defaults
    pub fn resolve(args: &Args, toml_config: &TomlConfig) -> Result<Self> {
        let search_concurrency = toml_config
            .search_concurrency
            .unwrap_or(DEFAULT_SEARCH_CONCURRENCY);
        if search_concurrency == 0 {
            return Err(Error::Config(
                "search_concurrency must be at least 1".to_string(),
            ));
        }

        let max_tokens = toml_config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        if max_tokens == 0 {
            return Err(Error::Config("max_tokens must be at least 1".to_string()));
        }

        let catalog_requests_per_second = toml_config
            .catalog_requests_per_second
            .unwrap_or(DEFAULT_CATALOG_REQUESTS_PER_SECOND);
        if catalog_requests_per_second == 0 {
            return Err(Error::Config(
                "catalog_requests_per_second must be at least 1".to_string(),
            ));
        }

        let pipeline = PipelineSettings {
            max_tokens,
            reconciliation_enabled: toml_config.reconciliation_enabled.unwrap_or(true),
            reconciler: ReconcilerSettings {
                concurrency: search_concurrency,
                stagger: Duration::from_millis(
                    toml_config.search_stagger_ms.unwrap_or(DEFAULT_SEARCH_STAGGER_MS),
                ),
                backoff_base: Duration::from_millis(
                    toml_config.backoff_base_ms.unwrap_or(DEFAULT_BACKOFF_BASE_MS),
                ),
                ..ReconcilerSettings::default()
            },
            ..PipelineSettings::default()
        };

        Ok(Self {
            host: args
                .host
                .clone()
                .or_else(|| toml_config.host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT),
            openai_api_key: resolve_api_key(toml_config),
            model: args
                .model
                .clone()
                .or_else(|| toml_config.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            completion_base_url: toml_config
                .completion_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string()),
            catalog_base_url: toml_config
                .catalog_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_CATALOG_BASE_URL.to_string()),
            market: toml_config
                .market
                .clone()
                .unwrap_or_else(|| DEFAULT_MARKET.to_string()),
            catalog_requests_per_second,
            pipeline,
            cors_origins: toml_config
                .cors_origins
                .clone()
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect()),
            log_level: toml_config.logging.level.clone(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tracing filter for the configured log level
    pub fn log_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_level)
            .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", self.log_level, e)))
    }
}

/// Resolve the completion API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(toml_config: &TomlConfig) -> Option<String> {
    let mut sources = Vec::new();

    let env_key = std::env::var(API_KEY_ENV).ok().filter(|k| is_valid_key(k));
    if env_key.is_some() {
        sources.push("environment");
    }

    let toml_key = toml_config
        .openai_api_key
        .clone()
        .filter(|k| is_valid_key(k));
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Completion API key found in multiple sources: {}. Using environment (highest priority).",
            sources.join(", ")
        );
    }

    if let Some(key) = env_key {
        info!("Completion API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("Completion API key loaded from TOML config");
        return Some(key);
    }

    warn!(
        "Completion API key not configured. Set {} or openai_api_key in config.toml; \
         every request will be served the demo playlist",
        API_KEY_ENV
    );
    None
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
