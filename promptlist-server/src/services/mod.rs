//! Playlist generation pipeline
//!
//! Completion → decode → exclusion filter → backfill → catalog
//! reconciliation → playlist. Each stage is its own module; the assembler
//! wires them together.

pub mod backfill_controller;
pub mod catalog_client;
pub mod catalog_reconciler;
pub mod completion_client;
pub mod exclusion_parser;
pub mod fallback;
pub mod playlist_assembler;
pub mod track_validator;

#[cfg(test)]
pub(crate) mod testing;

pub use backfill_controller::{BackfillController, BackfillProfile};
pub use catalog_client::{Catalog, CatalogError, CatalogTrack, SpotifyCatalogClient};
pub use catalog_reconciler::{CatalogReconciler, Reconciled, ReconcilerSettings};
pub use completion_client::{CompletionError, CompletionProvider, OpenAiCompletionClient};
pub use exclusion_parser::parse_exclusions;
pub use playlist_assembler::{ExportedPlaylist, Generation, PipelineSettings, PlaylistAssembler};
pub use track_validator::{validate, ValidationOutcome};
