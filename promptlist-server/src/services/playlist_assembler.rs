//! Playlist assembler
//!
//! Runs one request through the pipeline:
//!
//! ```text
//! prompt ─► exclusions
//!        ─► completion ─► decode ─► validate ─► backfill
//!        ─► (token) reconcile ─► unmatched rule ─► Playlist
//! ```
//!
//! Only the initial completion can fail the pipeline, and even then the
//! caller gets the demo playlist instead of an error. Backfill and catalog
//! failures degrade silently.

use promptlist_common::{Playlist, Track};
use std::sync::Arc;
use std::time::Duration;

use crate::models::DraftPlaylist;
use crate::services::backfill_controller::{BackfillController, BackfillProfile};
use crate::services::catalog_client::{Catalog, CatalogError};
use crate::services::catalog_reconciler::{likely_api_issue, CatalogReconciler, Reconciled, ReconcilerSettings};
use crate::services::completion_client::{CompletionError, CompletionProvider, SYSTEM_PROMPT};
use crate::services::exclusion_parser::parse_exclusions;
use crate::services::{fallback, track_validator};

/// Most URIs the catalog accepts per add-tracks call
pub const ADD_TRACKS_BATCH_SIZE: usize = 100;

const CATALOG_TRACK_URI_PREFIX: &str = "spotify:track:";

/// Pipeline tuning, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub max_tokens: u32,
    /// When false, a catalog token is ignored during generation
    pub reconciliation_enabled: bool,
    pub reconciler: ReconcilerSettings,
    /// Pause between add-tracks batches on export
    pub export_batch_pause: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_tokens: 2000,
            reconciliation_enabled: true,
            reconciler: ReconcilerSettings::default(),
            export_batch_pause: Duration::from_millis(200),
        }
    }
}

/// Result of one generation request
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub playlist: Playlist,
    /// Why the demo playlist was served instead of a generated one
    pub degraded: Option<String>,
}

/// Playlist created on the catalog by `materialize`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedPlaylist {
    pub playlist_id: String,
    pub url: String,
    pub tracks_added: usize,
}

pub struct PlaylistAssembler {
    completion: Arc<dyn CompletionProvider>,
    catalog: Arc<dyn Catalog>,
    settings: PipelineSettings,
}

impl PlaylistAssembler {
    pub fn new(
        completion: Arc<dyn CompletionProvider>,
        catalog: Arc<dyn Catalog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            completion,
            catalog,
            settings,
        }
    }

    /// Generate a playlist for `prompt`
    ///
    /// With a catalog `token` (and reconciliation enabled) tracks are checked
    /// against the catalog. Never fails.
    pub async fn generate(&self, prompt: &str, token: Option<&str>) -> Generation {
        let prompt = prompt.trim();
        let exclusions = parse_exclusions(prompt);
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty() && self.settings.reconciliation_enabled);

        let profile = if token.is_some() {
            BackfillProfile::AGGRESSIVE
        } else {
            BackfillProfile::CONSERVATIVE
        };
        let backfill = BackfillController::new(self.completion.clone(), self.settings.max_tokens, profile);

        tracing::info!(
            exclusions = exclusions.len(),
            reconcile = token.is_some(),
            "Generating playlist"
        );

        let (draft, degraded) = match self.request_draft(prompt).await {
            Ok(draft) => (draft, None),
            Err(e) => {
                tracing::warn!(error = %e, "Initial completion failed, serving demo playlist");
                (fallback::demo_playlist(), Some(e.to_string()))
            }
        };
        let generated = degraded.is_none();

        let original_count = draft.tracks.len();
        let outcome = track_validator::validate(draft.tracks, &exclusions);
        let removed_count = outcome.removed_count();
        let mut tracks = outcome.kept;

        // Backfill needs the completion endpoint that just failed for the demo set
        if generated {
            tracks = backfill
                .maybe_backfill(tracks, removed_count, original_count, prompt, &exclusions)
                .await;
        }

        if let Some(token) = token {
            tracks = self
                .reconcile_tracks(tracks, token, prompt, &exclusions, generated.then_some(&backfill))
                .await;
        }

        let playlist = Playlist::new(draft.title, draft.description, prompt, tracks);
        tracing::info!(
            tracks = playlist.tracks.len(),
            verified = playlist.verified_count(),
            removed = removed_count,
            degraded = !generated,
            "Playlist assembled"
        );

        Generation { playlist, degraded }
    }

    /// Regenerate with a refinement applied on top of the previous prompt
    pub async fn refine(
        &self,
        previous_prompt: Option<&str>,
        refinement: &str,
        token: Option<&str>,
    ) -> Generation {
        let combined = combine_prompts(previous_prompt, refinement);
        tracing::debug!(prompt = %combined, "Refining playlist");
        self.generate(&combined, token).await
    }

    /// Create `playlist` on the catalog under the token owner's account
    ///
    /// Unverified tracks are reconciled first; only tracks with a catalog
    /// track URI are added.
    pub async fn materialize(
        &self,
        playlist: &Playlist,
        token: &str,
    ) -> Result<ExportedPlaylist, CatalogError> {
        let unverified: Vec<Track> = playlist
            .tracks
            .iter()
            .filter(|t| !t.is_verified())
            .cloned()
            .collect();

        let reconciled = if unverified.is_empty() {
            Vec::new()
        } else {
            CatalogReconciler::new(self.catalog.clone(), self.settings.reconciler)
                .reconcile(unverified, token)
                .await
        };
        let mut reconciled = reconciled.into_iter();

        let uris: Vec<String> = playlist
            .tracks
            .iter()
            .filter_map(|track| {
                if track.is_verified() {
                    track.catalog_id.clone()
                } else {
                    match reconciled.next() {
                        Some(Reconciled::Matched(matched)) => matched.catalog_id,
                        _ => None,
                    }
                }
            })
            .filter(|uri| uri.starts_with(CATALOG_TRACK_URI_PREFIX))
            .collect();

        let user = self.catalog.current_user(token).await?;
        let created = self
            .catalog
            .create_playlist(&user.id, &playlist.title, &playlist.description, false, token)
            .await?;

        if uris.is_empty() {
            tracing::warn!(
                playlist_id = %created.id,
                "No catalog tracks to add, playlist left empty"
            );
        }

        for (index, batch) in uris.chunks(ADD_TRACKS_BATCH_SIZE).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.settings.export_batch_pause).await;
            }
            self.catalog.add_tracks(&created.id, batch, token).await?;
            tracing::debug!(playlist_id = %created.id, batch = index, count = batch.len(), "Added tracks");
        }

        tracing::info!(
            playlist_id = %created.id,
            tracks_added = uris.len(),
            skipped = playlist.tracks.len() - uris.len(),
            "Playlist exported to catalog"
        );

        Ok(ExportedPlaylist {
            playlist_id: created.id,
            url: created.url,
            tracks_added: uris.len(),
        })
    }

    async fn request_draft(&self, prompt: &str) -> Result<DraftPlaylist, CompletionError> {
        let raw = self
            .completion
            .complete(SYSTEM_PROMPT, prompt, self.settings.max_tokens)
            .await?;
        DraftPlaylist::from_completion(&raw)
    }

    /// Reconcile, then apply the unmatched-fraction rule
    ///
    /// More than 60% unmatched: keep everything as it came back. Otherwise
    /// unmatched tracks are dropped and, when `backfill` is given and the
    /// matched set is short, replaced once with reconciled replacements.
    async fn reconcile_tracks(
        &self,
        tracks: Vec<Track>,
        token: &str,
        prompt: &str,
        exclusions: &[String],
        backfill: Option<&BackfillController>,
    ) -> Vec<Track> {
        let reconciler = CatalogReconciler::new(self.catalog.clone(), self.settings.reconciler);
        let results = reconciler.reconcile(tracks, token).await;
        let total = results.len();

        if likely_api_issue(&results) {
            let unmatched = results.iter().filter(|r| !r.is_matched()).count();
            tracing::warn!(
                total,
                unmatched,
                "Most tracks unmatched, assuming a catalog search problem and keeping all tracks"
            );
            return results.into_iter().map(Reconciled::into_track).collect();
        }

        let mut matched: Vec<Track> = Vec::with_capacity(total);
        let mut unmatched_count = 0;
        for result in results {
            match result {
                Reconciled::Matched(track) => matched.push(track),
                Reconciled::Unmatched(track) => {
                    unmatched_count += 1;
                    tracing::info!(
                        title = %track.title,
                        artist = %track.artist,
                        "Dropping track not found in catalog"
                    );
                }
            }
        }

        let Some(backfill) = backfill else {
            return matched;
        };

        let short = (matched.len() as f64) < backfill.profile().minimum_kept(total);
        if unmatched_count == 0 || matched.is_empty() || !short {
            return matched;
        }

        tracing::info!(
            matched = matched.len(),
            unmatched = unmatched_count,
            "Requesting replacements for unmatched tracks"
        );

        match backfill
            .request_replacements(prompt, unmatched_count, exclusions, &matched)
            .await
        {
            Ok(replacements) => {
                let confirmed: Vec<Track> = reconciler
                    .reconcile(replacements, token)
                    .await
                    .into_iter()
                    .filter_map(|r| match r {
                        Reconciled::Matched(track) => Some(track),
                        Reconciled::Unmatched(_) => None,
                    })
                    .collect();
                tracing::info!(added = confirmed.len(), "Confirmed replacement tracks appended");
                matched.extend(confirmed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Replacement request failed, keeping matched tracks");
            }
        }

        matched
    }
}

/// Prompt for a refinement run
pub fn combine_prompts(previous_prompt: Option<&str>, refinement: &str) -> String {
    match previous_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        Some(previous) => format!(
            "{}\n\nRefine that playlist with this change: {}",
            previous,
            refinement.trim()
        ),
        None => refinement.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fallback::FALLBACK_TITLE;
    use crate::services::testing::{catalog_track, FakeCatalog, ScriptedCompletion};
    use serde_json::json;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            max_tokens: 500,
            reconciliation_enabled: true,
            reconciler: ReconcilerSettings {
                concurrency: 4,
                stagger: Duration::ZERO,
                backoff_base: Duration::from_millis(1),
                max_retries: 2,
            },
            export_batch_pause: Duration::ZERO,
        }
    }

    fn completion_json(tracks: &[(&str, &str)]) -> String {
        let tracks: Vec<_> = tracks
            .iter()
            .map(|(title, artist)| {
                json!({
                    "title": title,
                    "artist": artist,
                    "album": "Album",
                    "year": 1984,
                    "duration": 240,
                    "explanation": "fits"
                })
            })
            .collect();
        json!({"title": "80s Pop", "description": "Upbeat", "tracks": tracks}).to_string()
    }

    /// Catalog that knows exactly the given titles
    fn catalog_with(titles: &'static [&'static str]) -> FakeCatalog {
        FakeCatalog::new(move |query, _| {
            Ok(titles
                .iter()
                .filter(|title| query.contains(**title))
                .map(|title| catalog_track(&title.to_lowercase().replace(' ', "-"), title, "Catalog Artist"))
                .take(1)
                .collect())
        })
    }

    #[tokio::test]
    async fn test_quincy_jones_scenario_triggers_backfill() {
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok(completion_json(&[
                ("Thriller", "Michael Jackson"),
                ("Ai No Corrida", "Quincy Jones"),
                ("Take On Me", "a-ha"),
                ("Girls Just Want to Have Fun", "Cyndi Lauper"),
                ("Wake Me Up Before You Go-Go", "Wham!"),
            ])),
            Ok(completion_json(&[
                ("Don't You (Forget About Me)", "Simple Minds"),
                ("Stuff Like That", "Quincy Jones"),
                ("Everybody Wants to Rule the World", "Tears for Fears"),
            ])),
        ]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(FakeCatalog::empty()), settings());

        let generation = assembler
            .generate("Upbeat 80s pop, no Quincy Jones", None)
            .await;

        // 1 of 5 removed; 4 < max(6, 3.0) so one backfill round runs
        assert_eq!(completion.calls(), 2);
        assert!(completion.prompts()[1].contains("2 additional tracks"));

        let tracks = &generation.playlist.tracks;
        assert_eq!(tracks.len(), 6);
        assert!(tracks.iter().all(|t| t.artist != "Quincy Jones"));
        assert_eq!(tracks[0].title, "Thriller");
        assert!(generation.degraded.is_none());
        assert_eq!(generation.playlist.prompt, "Upbeat 80s pop, no Quincy Jones");
    }

    #[tokio::test]
    async fn test_quincy_jones_scenario_with_failed_backfill() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(completion_json(&[
            ("Thriller", "Michael Jackson"),
            ("Ai No Corrida", "Quincy Jones"),
            ("Take On Me", "a-ha"),
            ("Girls Just Want to Have Fun", "Cyndi Lauper"),
            ("Wake Me Up Before You Go-Go", "Wham!"),
        ]))]));
        let assembler = PlaylistAssembler::new(completion, Arc::new(FakeCatalog::empty()), settings());

        let generation = assembler
            .generate("Upbeat 80s pop, no Quincy Jones", None)
            .await;

        assert_eq!(generation.playlist.tracks.len(), 4);
        assert!(generation.degraded.is_none());
    }

    #[tokio::test]
    async fn test_malformed_initial_output_serves_fallback() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(
            "Sorry, I can't do that.".to_string(),
        )]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(FakeCatalog::empty()), settings());

        let generation = assembler.generate("anything", None).await;

        assert_eq!(generation.playlist.title, FALLBACK_TITLE);
        assert_eq!(generation.playlist.tracks.len(), 7);
        assert!(generation.degraded.unwrap().contains("Malformed"));
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_still_honors_exclusions_without_backfill() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Err(CompletionError::Auth(
            "bad key".to_string(),
        ))]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(FakeCatalog::empty()), settings());

        let generation = assembler.generate("anything, no Radiohead, no Daft Punk", None).await;

        let artists: Vec<&str> = generation.playlist.tracks.iter().map(|t| t.artist.as_str()).collect();
        assert_eq!(generation.playlist.tracks.len(), 5);
        assert!(!artists.contains(&"Radiohead"));
        assert!(!artists.contains(&"Daft Punk"));
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_reconciliation_drops_hallucinations() {
        static KNOWN: &[&str] = &["Thriller", "Take On Me", "Africa", "Rosanna", "Jump"];
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(completion_json(&[
            ("Thriller", "Michael Jackson"),
            ("Take On Me", "a-ha"),
            ("Africa", "Toto"),
            ("Rosanna", "Toto"),
            ("Jump", "Van Halen"),
            ("Neon Hallway", "The Made Ups"),
        ]))]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(catalog_with(KNOWN)), settings());

        let generation = assembler.generate("80s", Some("token")).await;

        let tracks = &generation.playlist.tracks;
        assert_eq!(tracks.len(), 5);
        assert!(tracks.iter().all(|t| t.is_verified()));
        assert!(tracks.iter().all(|t| t.explanation.as_deref() == Some("fits")));
        // 5 matched is below max(8, 4.5); a replacement round was attempted
        assert_eq!(completion.calls(), 2);
    }

    #[tokio::test]
    async fn test_replacement_round_appends_only_matched_replacements() {
        static KNOWN: &[&str] = &["Thriller", "Jump", "Africa", "Beat It"];
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Ok(completion_json(&[
                ("Thriller", "Michael Jackson"),
                ("Neon Hallway", "Nobody"),
                ("Jump", "Van Halen"),
                ("Glass Arcade", "Nobody"),
                ("Africa", "Toto"),
            ])),
            Ok(completion_json(&[
                ("Beat It", "Michael Jackson"),
                ("Paper Skyline", "Nobody"),
            ])),
        ]));
        let catalog = Arc::new(catalog_with(KNOWN));
        let assembler = PlaylistAssembler::new(completion.clone(), catalog.clone(), settings());

        let generation = assembler.generate("80s", Some("token")).await;

        // 2 of 5 unmatched stays under the 60% rule; 3 matched < max(8, 3.75)
        assert_eq!(completion.calls(), 2);
        assert!(completion.prompts()[1].contains("2 additional tracks"));

        let titles: Vec<&str> = generation
            .playlist
            .tracks
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Thriller", "Jump", "Africa", "Beat It"]);
        assert!(generation.playlist.tracks.iter().all(|t| t.is_verified()));

        // The first round is not searched again
        let queries = catalog.queries();
        assert_eq!(queries.iter().filter(|q| q.contains("Thriller")).count(), 1);
        assert_eq!(queries.iter().filter(|q| q.contains("Beat It")).count(), 1);
    }

    #[tokio::test]
    async fn test_mostly_unmatched_keeps_all_tracks() {
        static KNOWN: &[&str] = &["Thriller", "Jump", "Africa"];
        let titles = [
            ("Thriller", "Michael Jackson"),
            ("Jump", "Van Halen"),
            ("Africa", "Toto"),
            ("Unknown 1", "X"),
            ("Unknown 2", "X"),
            ("Unknown 3", "X"),
            ("Unknown 4", "X"),
            ("Unknown 5", "X"),
            ("Unknown 6", "X"),
            ("Unknown 7", "X"),
        ];
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(completion_json(&titles))]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(catalog_with(KNOWN)), settings());

        let generation = assembler.generate("80s", Some("token")).await;

        let tracks = &generation.playlist.tracks;
        assert_eq!(tracks.len(), 10);
        assert_eq!(generation.playlist.verified_count(), 3);
        assert_eq!(tracks[3].title, "Unknown 1");
        assert!(tracks[3].catalog_id.is_none());
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_ignored_when_reconciliation_disabled() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(completion_json(&[(
            "Thriller",
            "Michael Jackson",
        )]))]));
        let catalog = Arc::new(FakeCatalog::empty());
        let mut disabled = settings();
        disabled.reconciliation_enabled = false;
        let assembler = PlaylistAssembler::new(completion, catalog.clone(), disabled);

        let generation = assembler.generate("80s", Some("token")).await;

        assert_eq!(generation.playlist.tracks.len(), 1);
        assert!(catalog.queries().is_empty());
    }

    #[tokio::test]
    async fn test_refine_combines_prompts() {
        let completion = Arc::new(ScriptedCompletion::new(vec![Ok(completion_json(&[
            ("Thriller", "Michael Jackson"),
            ("Beat It", "Michael Jackson"),
            ("Jump", "Van Halen"),
        ]))]));
        let assembler = PlaylistAssembler::new(completion.clone(), Arc::new(FakeCatalog::empty()), settings());

        let generation = assembler
            .refine(Some("80s rock"), "without Van Halen", None)
            .await;

        assert!(completion.prompts()[0].starts_with("80s rock"));
        assert!(generation.playlist.tracks.iter().all(|t| t.artist != "Van Halen"));
    }

    #[test]
    fn test_combine_prompts_without_previous() {
        assert_eq!(combine_prompts(None, " more jazz "), "more jazz");
        assert_eq!(combine_prompts(Some("  "), "more jazz"), "more jazz");
        assert!(combine_prompts(Some("chill"), "more jazz").contains("more jazz"));
    }

    #[tokio::test]
    async fn test_materialize_batches_and_filters_uris() {
        let catalog = Arc::new(FakeCatalog::empty());
        let assembler = PlaylistAssembler::new(
            Arc::new(ScriptedCompletion::new(vec![])),
            catalog.clone(),
            settings(),
        );

        let mut tracks: Vec<Track> = (0..205)
            .map(|i| {
                let mut t = Track::new(format!("Song {i}"), "Artist", "Album", 2000, 200);
                t.catalog_id = Some(format!("spotify:track:{i}"));
                t
            })
            .collect();
        let mut local = Track::new("Local", "Artist", "", 0, 0);
        local.catalog_id = Some("spotify:local:abc".to_string());
        tracks.push(local);
        tracks.push(Track::new("Never Found", "Nobody", "", 0, 0));

        let playlist = Playlist::new("x".repeat(150), "Desc", "prompt", tracks);
        let exported = assembler.materialize(&playlist, "token").await.unwrap();

        assert_eq!(exported.tracks_added, 205);
        assert_eq!(exported.playlist_id, "pl1");
        let batches: Vec<usize> = catalog.added_batches().iter().map(Vec::len).collect();
        assert_eq!(batches, vec![100, 100, 5]);
        // only the unverified track was searched
        assert_eq!(catalog.queries().len(), 4);
    }

    #[tokio::test]
    async fn test_materialize_surfaces_unauthorized() {
        let catalog = Arc::new(FakeCatalog::empty().fail_current_user(CatalogError::Unauthorized));
        let assembler = PlaylistAssembler::new(
            Arc::new(ScriptedCompletion::new(vec![])),
            catalog.clone(),
            settings(),
        );

        let playlist = Playlist::new("t", "d", "p", vec![]);
        let result = assembler.materialize(&playlist, "expired").await;

        assert!(matches!(result, Err(CatalogError::Unauthorized)));
        assert!(catalog.created().is_empty());
    }
}
