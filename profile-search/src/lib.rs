//! # profile-search
//!
//! Federated, paginated profile search over two document collections.
//!
//! Profiles live in two collections (`users` and `profiles`) that may hold
//! copies of the same record. This crate presents them to callers as one
//! deduplicated result set ordered by most recent activity, paged with an
//! opaque cursor.
//!
//! ## Design
//!
//! - Both collections are queried concurrently for every page
//! - Store-evaluable filters (age range, gender, city, `isActive`) are
//!   pushed down; free text and required interests are applied in memory
//! - Copies of the same id are merged, preferring the `users` copy
//! - The cursor records a resume position per collection, so records cut
//!   off by truncation are returned on the next page instead of being lost
//! - Fail-fast: if either collection query fails the whole page fails
//! - Optional short-lived page cache and per-collection circuit breaker
//!
//! ## Security
//!
//! - Free-text queries are logged only at trace level
//! - Cursors are bound to the filters they were issued for

pub mod adapter;
pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod memory_store;
pub mod orchestrator;
pub mod store;
pub mod types;

use std::sync::Arc;

pub use adapter::{AdapterPage, CollectionQueryAdapter};
pub use config::{InvalidCursorPolicy, SearchConfig};
pub use error::{Result, SearchError};
pub use memory_store::InMemoryStore;
pub use orchestrator::search::FederatedSearchEngine;
pub use store::{DocumentStore, StoreError, StoreErrorCode};
pub use types::{Collection, ProfileRecord, SearchFilters, SearchPage};

/// Fetch one page of results from `store` with a one-off engine.
///
/// Prefer keeping a [`FederatedSearchEngine`] around when serving many
/// requests, so the page cache and circuit breaker persist between calls.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, otherwise the
/// same errors as [`FederatedSearchEngine::search`].
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # async fn example() -> profile_search::Result<()> {
/// use profile_search::{InMemoryStore, SearchConfig, SearchFilters};
///
/// let store = Arc::new(InMemoryStore::new());
/// let filters = SearchFilters {
///     free_text_query: Some("kabul".into()),
///     ..Default::default()
/// };
/// let page = profile_search::search(store, &filters, 20, None, &SearchConfig::default()).await?;
/// for profile in &page.items {
///     println!("{}: {}", profile.id, profile.display_name);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search<S: DocumentStore>(
    store: Arc<S>,
    filters: &SearchFilters,
    page_size: usize,
    cursor: Option<&str>,
    config: &SearchConfig,
) -> Result<SearchPage> {
    let engine = FederatedSearchEngine::new(store, config.clone())?;
    engine.search(filters, page_size, cursor).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_validates_config_zero_cap() {
        let config = SearchConfig {
            page_size_cap: 0,
            ..Default::default()
        };
        let result = search(Arc::new(InMemoryStore::new()), &SearchFilters::default(), 5, None, &config).await;
        assert!(matches!(result, Err(SearchError::Config(_))));
    }

    #[tokio::test]
    async fn search_over_empty_collections_ends_immediately() {
        let store = InMemoryStore::new()
            .with_collection("users", vec![])
            .with_collection("profiles", vec![]);
        let page = search(Arc::new(store), &SearchFilters::default(), 5, None, &SearchConfig::default())
            .await
            .expect("search");
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn missing_collection_is_not_found() {
        let store = InMemoryStore::new().with_collection("users", vec![]);
        let result = search(Arc::new(store), &SearchFilters::default(), 5, None, &SearchConfig::default()).await;
        assert!(matches!(result, Err(SearchError::NotFound(_))));
    }
}
