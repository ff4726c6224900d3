//! promptlist-server library interface
//!
//! Exposes the pipeline and router for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServiceConfig;
use crate::services::{OpenAiCompletionClient, PlaylistAssembler, SpotifyCatalogClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub assembler: Arc<PlaylistAssembler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Cause of the latest generation, when it fell back to the demo playlist
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(config: ServiceConfig, assembler: PlaylistAssembler) -> Self {
        Self {
            config: Arc::new(config),
            assembler: Arc::new(assembler),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Build the production clients described by `config`
    pub fn from_config(config: ServiceConfig) -> anyhow::Result<Self> {
        let completion = OpenAiCompletionClient::new(
            config.openai_api_key.clone().unwrap_or_default(),
            config.model.clone(),
            config.completion_base_url.clone(),
        )?;
        let catalog = SpotifyCatalogClient::new(
            config.catalog_base_url.clone(),
            config.market.clone(),
            config.catalog_requests_per_second,
        )?;

        let assembler = PlaylistAssembler::new(Arc::new(completion), Arc::new(catalog), config.pipeline);
        Ok(Self::new(config, assembler))
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }

    /// Forget the recorded degradation once a generation succeeds again
    pub async fn clear_error(&self) {
        let mut last_error = self.last_error.write().await;
        if let Some(previous) = last_error.take() {
            tracing::info!(previous = %previous, "Generation recovered");
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(api::generate_routes())
        .merge(api::export_routes())
        .merge(api::health_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
