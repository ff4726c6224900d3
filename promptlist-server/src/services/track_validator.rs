//! Track validator
//!
//! Applies artist exclusions to a candidate track list. A track is removed
//! when its artist, folded the same way as excluded names (lower-cased,
//! apostrophes dropped, whitespace collapsed), contains any excluded name. The substring test
//! is deliberately broad so "Artist feat. X" variants are caught; the cost is
//! that an unrelated artist whose name contains an excluded one is removed
//! too.

use promptlist_common::Track;

use crate::services::exclusion_parser::fold_name;

/// Tracks split by the exclusion check, each side in input order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    pub kept: Vec<Track>,
    pub removed: Vec<Track>,
}

impl ValidationOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// True when the track's artist matches an exclusion
pub fn is_excluded(track: &Track, exclusions: &[String]) -> bool {
    let artist = fold_name(&track.artist);
    exclusions
        .iter()
        .any(|excluded| !excluded.is_empty() && artist.contains(excluded.as_str()))
}

/// Split `tracks` into kept and removed
///
/// With no exclusions the input comes back unchanged as `kept`.
pub fn validate(tracks: Vec<Track>, exclusions: &[String]) -> ValidationOutcome {
    if exclusions.is_empty() {
        return ValidationOutcome {
            kept: tracks,
            removed: Vec::new(),
        };
    }

    let (removed, kept): (Vec<Track>, Vec<Track>) = tracks
        .into_iter()
        .partition(|track| is_excluded(track, exclusions));

    for track in &removed {
        tracing::info!(
            artist = %track.artist,
            title = %track.title,
            "Removed track violating artist exclusion"
        );
    }

    ValidationOutcome { kept, removed }
}
