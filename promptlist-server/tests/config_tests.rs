//! Configuration resolution tests
//!
//! Tests that touch `OPENAI_API_KEY` run serially.

use promptlist_common::config::{load_toml_config, TomlConfig};
use promptlist_server::config::{resolve_api_key, Args, ServiceConfig, API_KEY_ENV};
use serial_test::serial;
use std::time::Duration;
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_env_key_wins_over_toml() {
    std::env::set_var(API_KEY_ENV, "sk-env");
    let toml_config = TomlConfig {
        openai_api_key: Some("sk-toml".to_string()),
        ..TomlConfig::default()
    };

    let key = resolve_api_key(&toml_config);
    std::env::remove_var(API_KEY_ENV);

    assert_eq!(key.as_deref(), Some("sk-env"));
}

#[test]
#[serial]
fn test_toml_key_used_without_env() {
    std::env::remove_var(API_KEY_ENV);
    let toml_config = TomlConfig {
        openai_api_key: Some("sk-toml".to_string()),
        ..TomlConfig::default()
    };

    assert_eq!(resolve_api_key(&toml_config).as_deref(), Some("sk-toml"));
}

#[test]
#[serial]
fn test_blank_keys_are_ignored() {
    std::env::set_var(API_KEY_ENV, "   ");
    let toml_config = TomlConfig {
        openai_api_key: Some(String::new()),
        ..TomlConfig::default()
    };

    let key = resolve_api_key(&toml_config);
    std::env::remove_var(API_KEY_ENV);

    assert!(key.is_none());
}

#[test]
#[serial]
fn test_resolve_from_toml_file() {
    std::env::remove_var(API_KEY_ENV);
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        host = "0.0.0.0"
        port = 8080
        openai_api_key = "sk-file"
        model = "gpt-4o-mini"
        catalog_base_url = "http://localhost:9000/v1"
        max_tokens = 1500
        market = "GB"
        search_concurrency = 2
        search_stagger_ms = 10
        backoff_base_ms = 250
        reconciliation_enabled = false
        cors_origins = ["https://playlists.example"]

        [logging]
        level = "debug"
        "#,
    );

    let toml_config = load_toml_config(&path).unwrap();
    let config = ServiceConfig::resolve(&Args::default(), &toml_config).unwrap();

    assert_eq!(config.bind_address(), "0.0.0.0:8080");
    assert_eq!(config.openai_api_key.as_deref(), Some("sk-file"));
    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.catalog_base_url, "http://localhost:9000/v1");
    assert_eq!(config.completion_base_url, "https://api.openai.com/v1");
    assert_eq!(config.market, "GB");
    assert_eq!(config.pipeline.max_tokens, 1500);
    assert!(!config.pipeline.reconciliation_enabled);
    assert_eq!(config.pipeline.reconciler.concurrency, 2);
    assert_eq!(config.pipeline.reconciler.stagger, Duration::from_millis(10));
    assert_eq!(config.pipeline.reconciler.backoff_base, Duration::from_millis(250));
    assert_eq!(config.cors_origins, vec!["https://playlists.example".to_string()]);
    assert_eq!(config.log_level, "debug");
}

#[test]
fn test_cli_port_overrides_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 8080\n");

    let args = Args {
        port: Some(9090),
        config: Some(path.clone()),
        ..Args::default()
    };
    let toml_config = load_toml_config(&args.config_path().unwrap()).unwrap();
    let config = ServiceConfig::resolve(&args, &toml_config).unwrap();

    assert_eq!(config.port, 9090);
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let toml_config = load_toml_config(&dir.path().join("absent.toml")).unwrap();
    let config = ServiceConfig::resolve(&Args::default(), &toml_config).unwrap();

    assert_eq!(config.port, 5050);
    assert_eq!(config.log_level, "info");
}

#[test]
fn test_zero_rate_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "catalog_requests_per_second = 0\n");

    let toml_config = load_toml_config(&path).unwrap();
    assert!(ServiceConfig::resolve(&Args::default(), &toml_config).is_err());
}
