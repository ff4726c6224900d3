//! Catalog export API handler
//!
//! POST /api/export-playlist

use axum::{extract::rejection::JsonRejection, extract::State, routing::post, Json, Router};
use promptlist_common::api::{ExportPlaylistRequest, ExportPlaylistResponse};

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /api/export-playlist
///
/// Creates the playlist on the catalog under the token owner's account.
/// Unlike generation, catalog failures here are returned to the caller.
pub async fn export_playlist(
    State(state): State<AppState>,
    payload: Result<Json<ExportPlaylistRequest>, JsonRejection>,
) -> ApiResult<Json<ExportPlaylistResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected export request body");
        ApiError::BadRequest("Missing playlist".to_string())
    })?;

    let token = request
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("Missing catalog access token".to_string()))?;

    let exported = state
        .assembler
        .materialize(&request.playlist, token)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Playlist export failed");
            ApiError::from(e)
        })?;

    Ok(Json(ExportPlaylistResponse {
        playlist_id: exported.playlist_id,
        playlist_url: exported.url,
        tracks_added: exported.tracks_added,
    }))
}

/// Build export routes
pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export-playlist", post(export_playlist))
}
