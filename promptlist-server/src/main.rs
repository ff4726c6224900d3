//! promptlist-server - Prompt-to-Playlist Service
//!
//! Turns a natural-language prompt into a playlist using a chat-completion
//! model, filters out excluded artists, and optionally verifies tracks
//! against a music catalog with the caller's access token.

use anyhow::{Context, Result};
use clap::Parser;
use promptlist_common::config::{load_toml_config, TomlConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

use promptlist_server::config::{Args, ServiceConfig};
use promptlist_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins. Otherwise start at info and switch to the configured
    // level after the TOML file is read.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter_layer, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new("info")));
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = args.config_path();
    let toml_config = match &config_path {
        Some(path) => load_toml_config(path)?,
        None => TomlConfig::default(),
    };
    let config = ServiceConfig::resolve(&args, &toml_config)?;

    if !from_env {
        filter_handle
            .reload(config.log_filter()?)
            .context("Failed to apply configured log level")?;
    }

    info!(
        "Starting promptlist-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config directory on this platform, using defaults"),
    }
    info!(
        model = %config.model,
        reconciliation = config.pipeline.reconciliation_enabled,
        "Pipeline configured"
    );

    let bind_address = config.bind_address();
    let state = AppState::from_config(config).context("Failed to build upstream clients")?;
    let app = promptlist_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
