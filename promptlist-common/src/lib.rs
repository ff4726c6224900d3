//! # Promptlist Common Library
//!
//! Shared code for the promptlist service and its clients:
//! - Wire types (`Track`, `Playlist`, request/response bodies)
//! - Bootstrap TOML configuration loading
//! - Common error type

pub mod api;
pub mod config;
pub mod error;

pub use api::types::{Playlist, Track};
pub use error::{Error, Result};
