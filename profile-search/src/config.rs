//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls page-size limits, per-collection timeouts,
//! cursor handling, caching and the per-collection circuit breaker. It is
//! deserializable so hosts can embed it in their own TOML configuration.

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::SearchError;
use crate::types::Collection;

/// What to do when a caller replays a cursor that cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidCursorPolicy {
    /// Fail the search with [`SearchError::InvalidCursor`].
    #[default]
    Reject,
    /// Log a warning and paginate from the beginning.
    Restart,
}

/// Store-side names of the two backing collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub users: String,
    pub profiles: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            users: "users".into(),
            profiles: "profiles".into(),
        }
    }
}

impl CollectionNames {
    /// Store-side collection name for `collection`.
    pub fn name_for(&self, collection: Collection) -> &str {
        match collection {
            Collection::Users => &self.users,
            Collection::Profiles => &self.profiles,
        }
    }
}

/// Configuration for the federated search engine.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Hard upper bound on page size. Larger requests are clamped.
    pub page_size_cap: usize,
    /// Page size used by hosts when a request does not specify one.
    pub default_page_size: usize,
    /// Timeout applied to each collection query independently.
    pub adapter_timeout_ms: u64,
    pub invalid_cursor: InvalidCursorPolicy,
    /// How long identical requests are served from memory. 0 disables caching.
    pub cache_ttl_seconds: u64,
    pub cache_max_entries: u64,
    pub collections: CollectionNames,
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size_cap: 50,
            default_page_size: 20,
            adapter_timeout_ms: 8_000,
            invalid_cursor: InvalidCursorPolicy::Reject,
            cache_ttl_seconds: 0,
            cache_max_entries: 100,
            collections: CollectionNames::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `page_size_cap` must be greater than 0
    /// - `default_page_size` must lie in `[1, page_size_cap]`
    /// - `adapter_timeout_ms` must be greater than 0
    /// - collection names must be non-blank and distinct
    /// - `circuit_breaker.failure_threshold` must be greater than 0
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.page_size_cap == 0 {
            return Err(SearchError::Config(
                "page_size_cap must be greater than 0".into(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.page_size_cap {
            return Err(SearchError::Config(format!(
                "default_page_size must be between 1 and page_size_cap ({})",
                self.page_size_cap
            )));
        }
        if self.adapter_timeout_ms == 0 {
            return Err(SearchError::Config(
                "adapter_timeout_ms must be greater than 0".into(),
            ));
        }
        let users = self.collections.users.trim();
        let profiles = self.collections.profiles.trim();
        if users.is_empty() || profiles.is_empty() {
            return Err(SearchError::Config(
                "collection names must not be blank".into(),
            ));
        }
        if users == profiles {
            return Err(SearchError::Config(
                "users and profiles collections must be distinct".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(SearchError::Config(
                "circuit_breaker.failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Clamp a requested page size into `[1, page_size_cap]`.
    pub fn clamp_page_size(&self, requested: usize) -> usize {
        requested.clamp(1, self.page_size_cap.max(1))
    }
}
