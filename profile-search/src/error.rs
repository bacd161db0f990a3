//! Error types for the profile-search crate.
//!
//! Store-specific failures are mapped into this taxonomy by the collection
//! adapter before they reach the engine. Callers receive either a complete
//! page or exactly one of these errors, never a partial merge.

/// Errors that can occur during a federated profile search.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The store refused the read for the current credentials.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A backing collection does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store could not be reached in time (network, deadline, overload).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// The caller supplied a cursor that cannot be decoded or replayed.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Any store failure that does not fit the other kinds.
    #[error("unknown error: {0}")]
    Unknown(String),

    /// The caller cancelled the search before both collections answered.
    #[error("search cancelled: {0}")]
    Cancelled(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Stable, machine-readable identifier for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::InvalidCursor(_) => "invalid_cursor",
            Self::Unknown(_) => "unknown",
            Self::Cancelled(_) => "cancelled",
            Self::Config(_) => "config",
        }
    }

    /// Whether a caller may reasonably retry the same request.
    ///
    /// The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Convenience type alias for profile-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
