//! Shared API request/response types
//!
//! Field names on the wire are camelCase. The catalog identifier and artwork
//! keep the names existing clients already read (`spotifyUri`,
//! `albumArtUrl`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ========================================
// Playlist Model
// ========================================

/// One track of a playlist
///
/// A track without `catalog_id` is unverified: its metadata is whatever the
/// completion model claimed. Once reconciled against the catalog, the
/// catalog's values replace the model's and `catalog_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: String,
    /// Release year, 0 when unknown
    #[serde(default)]
    pub year: i32,
    /// Duration in seconds, 0 when unknown
    #[serde(default)]
    pub duration: u32,
    /// Why the model picked this track
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Catalog URI (e.g. `spotify:track:...`)
    #[serde(rename = "spotifyUri", default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(rename = "albumArtUrl", default, skip_serializing_if = "Option::is_none")]
    pub artwork_url: Option<String>,
}

impl Track {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        year: i32,
        duration: u32,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            year,
            duration,
            explanation: None,
            catalog_id: None,
            artwork_url: None,
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = Some(explanation.into());
        self
    }

    /// True once the track has been matched against the catalog
    pub fn is_verified(&self) -> bool {
        self.catalog_id.is_some()
    }
}

/// A generated playlist
///
/// `id` is minted per request and means nothing after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// The user text that produced this playlist
    #[serde(default)]
    pub prompt: String,
    /// Relevance order as returned by the model
    pub tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        prompt: impl Into<String>,
        tracks: Vec<Track>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: description.into(),
            prompt: prompt.into(),
            tracks,
        }
    }

    pub fn verified_count(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_verified()).count()
    }
}

// ========================================
// Request / Response Bodies
// ========================================

/// POST /api/generate-playlist
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneratePlaylistRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    /// Catalog bearer token; enables reconciliation when present
    #[serde(default)]
    pub token: Option<String>,
}

/// POST /api/refine-playlist
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefinePlaylistRequest {
    /// The refinement instruction
    #[serde(default)]
    pub prompt: Option<String>,
    /// Prompt of the playlist being refined
    #[serde(default)]
    pub previous_prompt: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// POST /api/export-playlist
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportPlaylistRequest {
    pub playlist: Playlist,
    #[serde(default)]
    pub token: Option<String>,
}

/// POST /api/export-playlist response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPlaylistResponse {
    pub playlist_id: String,
    pub playlist_url: String,
    pub tracks_added: usize,
}

// ========================================
// Error Response Types
// ========================================

/// Error body returned by every failing endpoint
///
/// # Examples
///
/// ```
/// use promptlist_common::api::types::ErrorResponse;
///
/// let body = ErrorResponse::new("BAD_REQUEST", "Missing prompt");
/// let json = serde_json::to_value(&body).unwrap();
/// assert_eq!(json["error"], "Missing prompt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,
    /// Machine-readable code
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}
