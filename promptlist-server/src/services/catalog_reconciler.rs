//! Catalog reconciler
//!
//! Cross-checks model-authored tracks against catalog search. A matched
//! track takes the catalog's metadata (the model's explanation is kept); an
//! unmatched one comes back untouched, without a catalog id.
//!
//! Search strategies, tried in order until one yields a candidate:
//! 1. `artist:"A" track:"T"`
//! 2. `A T`
//! 3. `"T"`
//! 4. `artist:"A"` with a wider limit, then a local title-token match
//!
//! A 429 is retried with exponential backoff (base, 2×base, ...) up to
//! `max_retries` times, then the track counts as unmatched.

use futures::stream::{self, StreamExt};
use promptlist_common::Track;
use std::sync::Arc;
use std::time::Duration;

use crate::services::catalog_client::{Catalog, CatalogError, CatalogTrack};

/// Above this unmatched fraction a batch is treated as a search problem,
/// not as hallucination
pub const UNMATCHED_API_ISSUE_FRACTION: f64 = 0.6;

const DEFAULT_LIMIT: u32 = 10;
const ARTIST_ONLY_LIMIT: u32 = 50;

/// One catalog search strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStrategy {
    ExactArtistTitle,
    ArtistTitle,
    TitleOnly,
    ArtistOnly,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 4] = [
        SearchStrategy::ExactArtistTitle,
        SearchStrategy::ArtistTitle,
        SearchStrategy::TitleOnly,
        SearchStrategy::ArtistOnly,
    ];

    pub fn limit(self) -> u32 {
        match self {
            SearchStrategy::ArtistOnly => ARTIST_ONLY_LIMIT,
            _ => DEFAULT_LIMIT,
        }
    }

    /// Search query for already-cleaned artist and title
    ///
    /// `None` when the strategy has nothing to search with.
    pub fn query(self, artist: &str, title: &str) -> Option<String> {
        match self {
            SearchStrategy::ExactArtistTitle if !artist.is_empty() && !title.is_empty() => {
                Some(format!("artist:\"{}\" track:\"{}\"", artist, title))
            }
            SearchStrategy::ArtistTitle if !artist.is_empty() || !title.is_empty() => {
                Some(format!("{} {}", artist, title).trim().to_string())
            }
            SearchStrategy::TitleOnly if !title.is_empty() => Some(format!("\"{}\"", title)),
            SearchStrategy::ArtistOnly if !artist.is_empty() => {
                Some(format!("artist:\"{}\"", artist))
            }
            _ => None,
        }
    }
}

/// Strip everything but alphanumerics, underscore and whitespace
pub fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Pick a candidate from an artist-only result set by title
fn match_by_title<'a>(title: &str, candidates: &'a [CatalogTrack]) -> Option<&'a CatalogTrack> {
    let title = title.to_lowercase();
    let tokens: Vec<&str> = title.split_whitespace().collect();

    candidates.iter().find(|candidate| {
        let name = candidate.name.to_lowercase();
        name.contains(&title) || tokens.iter().any(|token| name.contains(token))
    })
}

/// Overwrite a track's metadata with the catalog's
pub fn apply_match(track: Track, candidate: &CatalogTrack) -> Track {
    let year = candidate
        .album
        .release_date
        .get(..4)
        .and_then(|y| y.parse::<i32>().ok())
        .unwrap_or(track.year);

    Track {
        title: candidate.name.clone(),
        artist: candidate
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or(track.artist),
        album: candidate.album.name.clone(),
        year,
        duration: ((candidate.duration_ms + 500) / 1000) as u32,
        explanation: track.explanation,
        catalog_id: Some(candidate.uri.clone()),
        artwork_url: candidate
            .album
            .images
            .first()
            .map(|image| image.url.clone())
            .or(track.artwork_url),
    }
}

/// Per-track reconciliation result
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Catalog metadata applied
    Matched(Track),
    /// No strategy found the track; original returned as-is
    Unmatched(Track),
}

impl Reconciled {
    pub fn is_matched(&self) -> bool {
        matches!(self, Reconciled::Matched(_))
    }

    pub fn track(&self) -> &Track {
        match self {
            Reconciled::Matched(t) | Reconciled::Unmatched(t) => t,
        }
    }

    pub fn into_track(self) -> Track {
        match self {
            Reconciled::Matched(t) | Reconciled::Unmatched(t) => t,
        }
    }
}

/// True when more than 60% of a non-empty batch went unmatched
pub fn likely_api_issue(results: &[Reconciled]) -> bool {
    if results.is_empty() {
        return false;
    }
    let unmatched = results.iter().filter(|r| !r.is_matched()).count();
    unmatched as f64 / results.len() as f64 > UNMATCHED_API_ISSUE_FRACTION
}

/// Worker pool and retry tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcilerSettings {
    /// Tracks searched at once
    pub concurrency: usize,
    /// Delay between task starts
    pub stagger: Duration,
    /// First rate-limit backoff; doubles per retry
    pub backoff_base: Duration,
    pub max_retries: u32,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            stagger: Duration::from_millis(50),
            backoff_base: Duration::from_millis(1000),
            max_retries: 2,
        }
    }
}

/// Matches tracks against the catalog
pub struct CatalogReconciler {
    catalog: Arc<dyn Catalog>,
    settings: ReconcilerSettings,
}

impl CatalogReconciler {
    pub fn new(catalog: Arc<dyn Catalog>, settings: ReconcilerSettings) -> Self {
        Self { catalog, settings }
    }

    /// Reconcile a batch, output in input order
    ///
    /// Per-track failures are logged and reported as `Unmatched`; they never
    /// abort the batch.
    pub async fn reconcile(&self, tracks: Vec<Track>, token: &str) -> Vec<Reconciled> {
        let total = tracks.len();
        let concurrency = self.settings.concurrency.max(1);
        let stagger = self.settings.stagger;

        let results: Vec<Reconciled> = stream::iter(tracks.into_iter().enumerate())
            .map(|(index, track)| async move {
                // Spread the first wave; later tasks start as slots free up
                let delay = if index < concurrency {
                    stagger * index as u32
                } else {
                    stagger
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                match self.find_match(&track, token).await {
                    Ok(Some(candidate)) => {
                        tracing::debug!(
                            track = %track.title,
                            artist = %track.artist,
                            uri = %candidate.uri,
                            "Track matched in catalog"
                        );
                        Reconciled::Matched(apply_match(track, &candidate))
                    }
                    Ok(None) => {
                        tracing::debug!(
                            track = %track.title,
                            artist = %track.artist,
                            "Track not found in catalog"
                        );
                        Reconciled::Unmatched(track)
                    }
                    Err(e) => {
                        tracing::warn!(
                            track = %track.title,
                            artist = %track.artist,
                            error = %e,
                            "Catalog search failed, treating track as unmatched"
                        );
                        Reconciled::Unmatched(track)
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await;

        let matched = results.iter().filter(|r| r.is_matched()).count();
        tracing::info!(total, matched, unmatched = total - matched, "Catalog reconciliation complete");

        results
    }

    /// Run the strategies in order; first candidate wins
    pub async fn find_match(
        &self,
        track: &Track,
        token: &str,
    ) -> Result<Option<CatalogTrack>, CatalogError> {
        let artist = clean(&track.artist);
        let title = clean(&track.title);

        for strategy in SearchStrategy::ALL {
            let Some(query) = strategy.query(&artist, &title) else {
                continue;
            };

            let candidates = self
                .search_with_backoff(&query, strategy.limit(), token)
                .await?;

            let found = match strategy {
                SearchStrategy::ArtistOnly => match_by_title(&track.title, &candidates).cloned(),
                _ => candidates.into_iter().next(),
            };

            if let Some(candidate) = found {
                tracing::trace!(strategy = ?strategy, query = %query, "Search strategy matched");
                return Ok(Some(candidate));
            }
        }

        Ok(None)
    }

    /// One search, retried on 429 with exponential backoff
    pub async fn search_with_backoff(
        &self,
        query: &str,
        limit: u32,
        token: &str,
    ) -> Result<Vec<CatalogTrack>, CatalogError> {
        let mut attempt: u32 = 0;

        loop {
            match self.catalog.search_tracks(query, limit, token).await {
                Err(CatalogError::RateLimited { retry_after_secs })
                    if attempt < self.settings.max_retries =>
                {
                    let backoff = self.settings.backoff_base * 2u32.pow(attempt);
                    tracing::warn!(
                        query = %query,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        retry_after_secs = ?retry_after_secs,
                        "Catalog rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
