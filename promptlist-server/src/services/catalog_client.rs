//! Music catalog API client
//!
//! Bearer-token access to a Spotify-compatible Web API: track search,
//! current user, playlist creation and track insertion. The token belongs to
//! the end user and is passed per call; the client itself holds no
//! credential.
//!
//! Requests are paced client-side with a `governor` quota. A 429 is reported
//! as `CatalogError::RateLimited`; retrying is the caller's decision.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::num::NonZeroU32;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CATALOG_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_MARKET: &str = "US";
const USER_AGENT: &str = concat!("promptlist/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog playlist name limit, in characters
pub const MAX_PLAYLIST_NAME_CHARS: usize = 100;
/// Catalog playlist description limit, in characters
pub const MAX_PLAYLIST_DESCRIPTION_CHARS: usize = 300;

/// Catalog client errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// 401: token missing, invalid or expired
    #[error("Catalog authentication failed")]
    Unauthorized,

    /// 429
    #[error("Catalog rate limit exceeded")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Catalog API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Track as returned by catalog search
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogTrack {
    pub id: String,
    pub name: String,
    /// e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<CatalogArtist>,
    pub album: CatalogAlbum,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogArtist {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogAlbum {
    pub name: String,
    /// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub images: Vec<CatalogImage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogImage {
    pub url: String,
}

/// Owner of the bearer token
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CatalogUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Playlist created on the catalog
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogPlaylist {
    pub id: String,
    /// Public web link; empty if the catalog did not return one
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: SearchPage,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Vec<CatalogTrack>,
}

#[derive(Debug, Deserialize)]
struct CreatedPlaylist {
    id: String,
    #[serde(default)]
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Catalog operations used by reconciliation and export
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Full-text track search
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError>;

    async fn current_user(&self, token: &str) -> Result<CatalogUser, CatalogError>;

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
        token: &str,
    ) -> Result<CatalogPlaylist, CatalogError>;

    /// Add one batch of track URIs (the catalog accepts at most 100)
    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
        token: &str,
    ) -> Result<(), CatalogError>;
}

/// Spotify Web API client
pub struct SpotifyCatalogClient {
    http_client: reqwest::Client,
    base_url: String,
    market: String,
    rate_limiter: DefaultDirectRateLimiter,
}

impl SpotifyCatalogClient {
    pub fn new(
        base_url: impl Into<String>,
        market: impl Into<String>,
        requests_per_second: u32,
    ) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            market: market.into(),
            rate_limiter: RateLimiter::direct(quota),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, CatalogError> {
        self.rate_limiter.until_ready().await;

        let response = request
            .send()
            .await
            .map_err(|e| CatalogError::Network(e.to_string()))?;

        check_status(response).await
    }
}

#[async_trait]
impl Catalog for SpotifyCatalogClient {
    async fn search_tracks(
        &self,
        query: &str,
        limit: u32,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        tracing::debug!(query = %query, limit, "Searching catalog");

        let limit = limit.to_string();
        let request = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("type", "track"),
                ("limit", limit.as_str()),
                ("market", self.market.as_str()),
            ]);

        let response = self.send(request).await?;
        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        Ok(page.tracks.items)
    }

    async fn current_user(&self, token: &str) -> Result<CatalogUser, CatalogError> {
        let request = self
            .http_client
            .get(format!("{}/me", self.base_url))
            .bearer_auth(token);

        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
        token: &str,
    ) -> Result<CatalogPlaylist, CatalogError> {
        let body = json!({
            "name": truncate_chars(name, MAX_PLAYLIST_NAME_CHARS),
            "description": truncate_chars(description, MAX_PLAYLIST_DESCRIPTION_CHARS),
            "public": public,
        });

        let request = self
            .http_client
            .post(format!("{}/users/{}/playlists", self.base_url, user_id))
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);

        let response = self.send(request).await?;
        let created: CreatedPlaylist = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        tracing::info!(playlist_id = %created.id, "Catalog playlist created");

        Ok(CatalogPlaylist {
            id: created.id,
            url: created.external_urls.spotify.unwrap_or_default(),
        })
    }

    async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
        token: &str,
    ) -> Result<(), CatalogError> {
        let request = self
            .http_client
            .post(format!("{}/playlists/{}/tracks", self.base_url, playlist_id))
            .bearer_auth(token)
            .json(&json!({ "uris": uris }));

        self.send(request).await?;
        Ok(())
    }
}

/// Map non-2xx responses to `CatalogError`
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::UNAUTHORIZED => Err(CatalogError::Unauthorized),
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after_secs = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            Err(CatalogError::RateLimited { retry_after_secs })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
