//! Error types for the search host.

use profile_search::SearchError;

/// Top-level error type for the search host.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file could not be parsed, serialized or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Profile fixture file is missing or malformed.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Stdin/stdout protocol failure.
    #[error("bridge error: {0}")]
    Bridge(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search engine construction failed.
    #[error("search error: {0}")]
    Search(#[from] SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
