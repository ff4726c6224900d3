//! Errors raised while loading and resolving configuration
//!
//! Pipeline and HTTP failures have their own types in `promptlist-server`.

use thiserror::Error;

/// Common result type for promptlist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error shared by the promptlist crates
#[derive(Error, Debug)]
pub enum Error {
    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML file could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
