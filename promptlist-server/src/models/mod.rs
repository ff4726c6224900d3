//! Data models internal to the generation pipeline
//!
//! Wire types (`Track`, `Playlist`) live in `promptlist-common`.

pub mod draft;

pub use draft::DraftPlaylist;
