//! API module for shared HTTP API types
//!
//! # Design Principle
//!
//! This module contains ONLY plain serde types with no HTTP framework
//! dependencies, so a client can depend on it without pulling in axum.

pub mod types;

pub use types::{
    ErrorResponse, ExportPlaylistRequest, ExportPlaylistResponse, GeneratePlaylistRequest,
    Playlist, RefinePlaylistRequest, Track,
};
