//! Short-lived page cache.
//!
//! Memoises complete [`SearchPage`] values keyed by the normalised filters,
//! the clamped page size and the incoming cursor, so identical requests
//! replayed within the TTL (pull-to-refresh, duplicate taps) do not hit the
//! store twice. Uses [`moka`] for async-friendly caching with TTL and
//! size-bounded eviction. Owned by one engine; there is no process-global
//! cache.

use std::time::Duration;

use moka::future::Cache;

use crate::orchestrator::cursor::filter_fingerprint;
use crate::types::{SearchFilters, SearchPage};

/// Composite cache key for one page request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    fingerprint: String,
    page_size: usize,
    cursor: Option<String>,
}

impl PageKey {
    /// Build a key from the request. `page_size` must already be clamped.
    pub fn new(filters: &SearchFilters, page_size: usize, cursor: Option<&str>) -> Self {
        Self {
            fingerprint: filter_fingerprint(filters),
            page_size,
            cursor: cursor.map(str::to_owned),
        }
    }
}

/// Bounded, TTL-based cache of search pages.
#[derive(Clone)]
pub struct PageCache {
    inner: Cache<PageKey, SearchPage>,
}

impl PageCache {
    /// Create a cache, or `None` when `ttl_seconds` is 0 (caching disabled).
    pub fn new(ttl_seconds: u64, max_entries: u64) -> Option<Self> {
        if ttl_seconds == 0 || max_entries == 0 {
            return None;
        }
        let inner = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Some(Self { inner })
    }

    pub async fn get(&self, key: &PageKey) -> Option<SearchPage> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: PageKey, page: SearchPage) {
        self.inner.insert(key, page).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}
