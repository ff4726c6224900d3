//! GET /health
//!
//! Reports liveness plus the pipeline settings a caller needs to interpret
//! results: which model is answering, whether catalog checks run, and why
//! the last generation fell back to the demo playlist (if it did).

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

const MODULE_NAME: &str = "promptlist-server";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "ok" while the process answers; degradation shows in `last_error`
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    /// Short git hash baked in at build time
    pub build: &'static str,
    pub uptime_seconds: u64,
    pub model: String,
    pub reconciliation_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl HealthResponse {
    async fn from_state(state: &AppState) -> Self {
        let uptime_seconds = Utc::now()
            .signed_duration_since(state.startup_time)
            .num_seconds()
            .max(0) as u64;

        Self {
            status: "ok",
            module: MODULE_NAME,
            version: env!("CARGO_PKG_VERSION"),
            build: env!("GIT_HASH"),
            uptime_seconds,
            model: state.config.model.clone(),
            reconciliation_enabled: state.config.pipeline.reconciliation_enabled,
            last_error: state.last_error.read().await.clone(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from_state(&state).await)
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
