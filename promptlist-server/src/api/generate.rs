//! Playlist generation API handlers
//!
//! POST /api/generate-playlist, POST /api/refine-playlist

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use promptlist_common::api::{GeneratePlaylistRequest, Playlist, RefinePlaylistRequest};

use crate::{
    error::{ApiError, ApiResult},
    services::Generation,
    AppState,
};

const MISSING_PROMPT: &str = "Missing prompt";

/// POST /api/generate-playlist
///
/// Always answers with a playlist once a prompt is present; upstream
/// failures are absorbed by the demo playlist.
pub async fn generate_playlist(
    State(state): State<AppState>,
    payload: Result<Json<GeneratePlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<Playlist>> {
    let request = accept_body(payload)?;
    let prompt = require_prompt(request.prompt.as_deref())?;

    let generation = state
        .assembler
        .generate(prompt, request.token.as_deref())
        .await;

    Ok(Json(finish(&state, generation).await))
}

/// POST /api/refine-playlist
pub async fn refine_playlist(
    State(state): State<AppState>,
    payload: Result<Json<RefinePlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<Playlist>> {
    let request = accept_body(payload)?;
    let refinement = require_prompt(request.prompt.as_deref())?;

    let generation = state
        .assembler
        .refine(
            request.previous_prompt.as_deref(),
            refinement,
            request.token.as_deref(),
        )
        .await;

    Ok(Json(finish(&state, generation).await))
}

/// Unreadable bodies are reported as a missing prompt
fn accept_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected generation request body");
        ApiError::BadRequest(MISSING_PROMPT.to_string())
    })
}

fn require_prompt(prompt: Option<&str>) -> ApiResult<&str> {
    prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::BadRequest(MISSING_PROMPT.to_string()))
}

async fn finish(state: &AppState, generation: Generation) -> Playlist {
    match generation.degraded {
        Some(reason) => {
            state
                .record_error(format!("Demo playlist served: {}", reason))
                .await
        }
        None => state.clear_error().await,
    }
    generation.playlist
}

/// Build generation routes
pub fn generate_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate-playlist", post(generate_playlist))
        .route("/api/refine-playlist", post(refine_playlist))
}
