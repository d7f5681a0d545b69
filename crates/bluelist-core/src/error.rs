//! Error types for bluelist-core.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by configuration loading and by contract violations in the
/// synchronization engine.
#[derive(Debug, Error)]
pub enum Error {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// One or more config values failed validation.
    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    ConfigValidation(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The external registry referenced an object path the engine never saw
    /// added (or already removed).
    #[error("device {0} is not registered")]
    NotRegistered(String),

    /// A removal was scheduled for a row that is already exiting.
    #[error("removal of {0} is already pending")]
    AlreadyPending(String),

    /// A presentation command addressed a row or element the presenter does
    /// not have.
    #[error("unknown presentation target {target} on row {path}")]
    UnknownTarget { path: String, target: String },
}
