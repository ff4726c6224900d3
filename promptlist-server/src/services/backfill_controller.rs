//! Backfill controller
//!
//! When exclusion filtering leaves a playlist too short, ask the model once
//! more for replacement tracks. One follow-up at most per trigger; its
//! failure is logged and swallowed.
//!
//! Trigger rule:
//! `removed > 0 && kept < max(floor_count, original_count * keep_threshold)`

use promptlist_common::Track;
use std::sync::Arc;

use crate::models::DraftPlaylist;
use crate::services::completion_client::{CompletionError, CompletionProvider, SYSTEM_PROMPT};
use crate::services::track_validator;

/// Threshold pair deciding when a playlist is too short
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackfillProfile {
    /// Minimum acceptable track count
    pub floor_count: usize,
    /// Fraction of the original count that must survive
    pub keep_threshold: f64,
    /// Ask the model for tracks that exist on the catalog
    pub catalog_aware: bool,
}

impl BackfillProfile {
    /// Used when tracks are not reconciled against the catalog
    pub const CONSERVATIVE: Self = Self {
        floor_count: 6,
        keep_threshold: 0.6,
        catalog_aware: false,
    };

    /// Used when catalog reconciliation runs afterwards and will drop more
    pub const AGGRESSIVE: Self = Self {
        floor_count: 8,
        keep_threshold: 0.75,
        catalog_aware: true,
    };

    /// `max(floor_count, original_count * keep_threshold)`
    pub fn minimum_kept(&self, original_count: usize) -> f64 {
        (self.floor_count as f64).max(original_count as f64 * self.keep_threshold)
    }

    pub fn should_backfill(&self, removed_count: usize, kept_count: usize, original_count: usize) -> bool {
        removed_count > 0 && (kept_count as f64) < self.minimum_kept(original_count)
    }

    /// How many tracks to ask for: enough to reach `max(original, floor)`
    pub fn tracks_needed(&self, kept_count: usize, original_count: usize) -> usize {
        original_count
            .max(self.floor_count)
            .saturating_sub(kept_count)
            .max(1)
    }
}

/// Build the follow-up prompt for replacement tracks
pub fn build_backfill_prompt(
    original_prompt: &str,
    needed: usize,
    exclusions: &[String],
    existing: &[Track],
    catalog_aware: bool,
) -> String {
    let mut prompt = format!(
        "{}\n\nIMPORTANT: I need {} additional track{} for this playlist.",
        original_prompt.trim(),
        needed,
        if needed == 1 { "" } else { "s" }
    );

    if !exclusions.is_empty() {
        prompt.push_str(&format!(
            " Do NOT include any song released under the following artist name{}: {}. \
             Tracks by these artists, including collaborations credited to them, are not allowed.",
            if exclusions.len() == 1 { "" } else { "s" },
            exclusions.join(", ")
        ));
    }

    if catalog_aware {
        prompt.push_str(
            " Only suggest real, commercially released tracks that verifiably exist on Spotify, \
             with the exact title and primary artist as listed there.",
        );
    }

    if !existing.is_empty() {
        let listed: Vec<String> = existing
            .iter()
            .map(|t| format!("\"{}\" by {}", t.title, t.artist))
            .collect();
        prompt.push_str(&format!(
            " Do not repeat these tracks already in the playlist: {}.",
            listed.join("; ")
        ));
    }

    prompt
}

/// Issues replacement-track requests against the completion endpoint
pub struct BackfillController {
    completion: Arc<dyn CompletionProvider>,
    max_tokens: u32,
    profile: BackfillProfile,
}

impl BackfillController {
    pub fn new(completion: Arc<dyn CompletionProvider>, max_tokens: u32, profile: BackfillProfile) -> Self {
        Self {
            completion,
            max_tokens,
            profile,
        }
    }

    pub fn profile(&self) -> BackfillProfile {
        self.profile
    }

    /// Top up `kept` after exclusion filtering, if the profile says so
    ///
    /// Never fails: a failed follow-up returns `kept` as it was.
    pub async fn maybe_backfill(
        &self,
        mut kept: Vec<Track>,
        removed_count: usize,
        original_count: usize,
        original_prompt: &str,
        exclusions: &[String],
    ) -> Vec<Track> {
        if !self
            .profile
            .should_backfill(removed_count, kept.len(), original_count)
        {
            tracing::debug!(
                kept = kept.len(),
                removed = removed_count,
                original = original_count,
                "Backfill not needed"
            );
            return kept;
        }

        let needed = self.profile.tracks_needed(kept.len(), original_count);
        tracing::info!(
            kept = kept.len(),
            removed = removed_count,
            original = original_count,
            needed,
            "Requesting backfill tracks"
        );

        match self
            .request_replacements(original_prompt, needed, exclusions, &kept)
            .await
        {
            Ok(replacements) => {
                tracing::info!(added = replacements.len(), "Backfill tracks appended");
                kept.extend(replacements);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backfill request failed, continuing with kept tracks");
            }
        }

        kept
    }

    /// One follow-up completion; returns the replacement tracks that pass
    /// the exclusion check
    pub async fn request_replacements(
        &self,
        original_prompt: &str,
        needed: usize,
        exclusions: &[String],
        existing: &[Track],
    ) -> Result<Vec<Track>, CompletionError> {
        let prompt = build_backfill_prompt(
            original_prompt,
            needed,
            exclusions,
            existing,
            self.profile.catalog_aware,
        );

        let raw = self
            .completion
            .complete(SYSTEM_PROMPT, &prompt, self.max_tokens)
            .await?;
        let draft = DraftPlaylist::from_completion(&raw)?;

        let outcome = track_validator::validate(draft.tracks, exclusions);
        if outcome.removed_count() > 0 {
            tracing::info!(
                removed = outcome.removed_count(),
                "Backfill response still contained excluded artists"
            );
        }

        Ok(outcome.kept)
    }
}
