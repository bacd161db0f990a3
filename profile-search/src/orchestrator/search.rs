//! Federated search engine: concurrent two-collection fan-out, dedup,
//! ordering, post-merge filtering, truncation and cursor bookkeeping.
//!
//! Each call decodes the caller's cursor into per-collection positions,
//! queries both collections concurrently (each up to the requested page
//! size, each from its own position), merges and deduplicates the
//! results, sorts them by recency, applies the in-memory filters, and
//! truncates to the page size. The returned cursor advances each
//! collection only past the records this call actually consumed, so
//! records cut off by truncation are served by the next call instead of
//! being skipped.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::adapter::{AdapterPage, CollectionQueryAdapter};
use crate::cache::{PageCache, PageKey};
use crate::circuit_breaker::{counts_as_failure, CircuitBreaker, CircuitState};
use crate::config::{InvalidCursorPolicy, SearchConfig};
use crate::error::SearchError;
use crate::store::{DocumentStore, ResumeToken};
use crate::types::{Collection, ProfileRecord, SearchFilters, SearchPage};

use super::cursor::{filter_fingerprint, FederatedCursor, SourcePosition};
use super::dedup::deduplicate;
use super::filters::PostMergeFilter;
use super::ordering::by_recency;

/// Searches both backing collections as one paginated result set.
///
/// The engine keeps no per-session state: all continuation state travels
/// in the cursor returned with each page.
pub struct FederatedSearchEngine<S> {
    config: SearchConfig,
    users: CollectionQueryAdapter<S>,
    profiles: CollectionQueryAdapter<S>,
    breaker: Mutex<CircuitBreaker>,
    cache: Option<PageCache>,
}

impl<S: DocumentStore> FederatedSearchEngine<S> {
    /// Create an engine over `store`, which holds both collections.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(store: Arc<S>, config: SearchConfig) -> Result<Self, SearchError> {
        let users = CollectionQueryAdapter::new(Arc::clone(&store), Collection::Users, &config);
        let profiles = CollectionQueryAdapter::new(store, Collection::Profiles, &config);
        Self::with_adapters(users, profiles, config)
    }

    /// Create an engine from two pre-built adapters, e.g. when the
    /// collections live in different stores of the same type.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation or the
    /// adapters are not for [`Collection::Users`] and
    /// [`Collection::Profiles`] respectively.
    pub fn with_adapters(
        users: CollectionQueryAdapter<S>,
        profiles: CollectionQueryAdapter<S>,
        config: SearchConfig,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        if users.collection() != Collection::Users || profiles.collection() != Collection::Profiles
        {
            return Err(SearchError::Config(
                "adapters must be for the users and profiles collections".into(),
            ));
        }
        Ok(Self {
            breaker: Mutex::new(CircuitBreaker::new(config.circuit_breaker.clone())),
            cache: PageCache::new(config.cache_ttl_seconds, config.cache_max_entries),
            users,
            profiles,
            config,
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Circuit state of every collection that has been queried.
    pub fn circuit_health(&self) -> Vec<(Collection, CircuitState, u32)> {
        self.breaker().health_report()
    }

    /// Close every circuit and forget failure counts.
    pub fn reset_circuits(&self) {
        self.breaker().reset();
    }

    /// Drop every cached page, e.g. after the underlying data changed.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Fetch one page of results.
    ///
    /// `page_size` is clamped into `[1, page_size_cap]`. Pass the
    /// `next_cursor` of the previous page, with the same filters, to
    /// continue; pass `None` to start from the beginning.
    ///
    /// A page may carry a cursor even though later pages turn out empty;
    /// an empty page without a cursor is the definitive end of results.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either collection query. Partial
    /// results are never returned.
    pub async fn search(
        &self,
        filters: &SearchFilters,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<SearchPage, SearchError> {
        let page_size = self.config.clamp_page_size(page_size);
        let cursor = cursor.map(str::trim).filter(|c| !c.is_empty());
        let fingerprint = filter_fingerprint(filters);
        tracing::trace!(
            query = ?filters.free_text_query,
            page_size,
            resumed = cursor.is_some(),
            "federated search"
        );

        let (state, replayed) = self.resolve_cursor(cursor, &fingerprint)?;

        let key = self
            .cache
            .as_ref()
            .map(|_| PageKey::new(filters, page_size, replayed));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(page) = cache.get(key).await {
                tracing::trace!("page cache hit");
                return Ok(page);
            }
        }

        let page = match self.run(filters, page_size, &state).await {
            Err(SearchError::InvalidCursor(reason))
                if replayed.is_some() && self.config.invalid_cursor == InvalidCursorPolicy::Restart =>
            {
                tracing::warn!(%reason, "store rejected cursor; restarting pagination");
                self.run(filters, page_size, &FederatedCursor::start(fingerprint))
                    .await?
            }
            other => other?,
        };

        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.insert(key, page.clone()).await;
        }
        Ok(page)
    }

    /// Like [`search`](Self::search), but gives up as soon as `cancel`
    /// fires. Outstanding collection queries are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Cancelled`] if cancelled first, otherwise the
    /// same errors as [`search`](Self::search).
    pub async fn search_with_cancellation(
        &self,
        filters: &SearchFilters,
        page_size: usize,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SearchPage, SearchError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("search cancelled by caller");
                Err(SearchError::Cancelled("caller abandoned the search".into()))
            }
            result = self.search(filters, page_size, cursor) => result,
        }
    }

    /// Decode `cursor` and check it belongs to these filters, applying the
    /// configured policy on failure. Returns the state to resume from and
    /// the cursor actually replayed (`None` when starting fresh).
    fn resolve_cursor<'c>(
        &self,
        cursor: Option<&'c str>,
        fingerprint: &str,
    ) -> Result<(FederatedCursor, Option<&'c str>), SearchError> {
        let Some(encoded) = cursor else {
            return Ok((FederatedCursor::start(fingerprint), None));
        };

        let decoded = FederatedCursor::decode(encoded).and_then(|c| {
            if c.fingerprint() == fingerprint {
                Ok(c)
            } else {
                Err(SearchError::InvalidCursor(
                    "cursor was issued for different filters".into(),
                ))
            }
        });

        match (decoded, self.config.invalid_cursor) {
            (Ok(state), _) => Ok((state, Some(encoded))),
            (Err(err), InvalidCursorPolicy::Reject) => Err(err),
            (Err(err), InvalidCursorPolicy::Restart) => {
                tracing::warn!(error = %err, "invalid cursor; restarting pagination");
                Ok((FederatedCursor::start(fingerprint), None))
            }
        }
    }

    async fn run(
        &self,
        filters: &SearchFilters,
        page_size: usize,
        state: &FederatedCursor,
    ) -> Result<SearchPage, SearchError> {
        // Fail fast: the first error drops the other query.
        let (users, profiles) = futures::future::try_join(
            self.fetch(&self.users, filters, page_size, state),
            self.fetch(&self.profiles, filters, page_size, state),
        )
        .await?;

        let pages: Vec<AdapterPage> = users.into_iter().chain(profiles).collect();
        let (items, next) = assemble_page(pages, state, filters, page_size);
        let next_cursor = if next.is_exhausted() {
            None
        } else {
            Some(next.encode()?)
        };

        tracing::debug!(
            returned = items.len(),
            has_more = next_cursor.is_some(),
            "federated page assembled"
        );
        Ok(SearchPage { items, next_cursor })
    }

    /// Query one collection from its cursor position. Exhausted
    /// collections are not queried again.
    async fn fetch(
        &self,
        adapter: &CollectionQueryAdapter<S>,
        filters: &SearchFilters,
        page_size: usize,
        state: &FederatedCursor,
    ) -> Result<Option<AdapterPage>, SearchError> {
        let collection = adapter.collection();
        let resume_after = match state.position(collection) {
            SourcePosition::Exhausted => return Ok(None),
            SourcePosition::Start => None,
            SourcePosition::After(token) => Some(token),
        };

        let allowed = self.breaker().should_attempt(collection);
        if !allowed {
            return Err(SearchError::Unavailable(format!(
                "{collection}: circuit open after repeated failures"
            )));
        }

        let outcome = adapter.fetch_page(filters, page_size, resume_after).await;
        match &outcome {
            Ok(_) => self.breaker().record_success(collection),
            Err(err) if counts_as_failure(err) => self.breaker().record_failure(collection),
            Err(_) => {}
        }
        outcome.map(Some)
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One collection's fetched resume tokens in store order.
struct SourceProgress {
    collection: Collection,
    tokens: Vec<ResumeToken>,
    may_have_more: bool,
}

/// Merge the fetched pages into one page of at most `page_size` records
/// and compute the positions the next call resumes from.
///
/// Candidates are consumed in recency order until the page is full. A
/// collection that may hold more records bounds how far this call can
/// read: nothing that sorts after its last fetched record is consumed,
/// since unfetched records of that collection could sort ahead of it.
/// Consuming a candidate consumes every collection's copy of it. Each
/// collection then advances past the longest prefix of its fetched
/// documents that was consumed, and is exhausted once it returned a short
/// page that was consumed entirely.
pub fn assemble_page(
    pages: Vec<AdapterPage>,
    previous: &FederatedCursor,
    filters: &SearchFilters,
    page_size: usize,
) -> (Vec<ProfileRecord>, FederatedCursor) {
    let page_size = page_size.max(1);

    let horizon: Option<ProfileRecord> = pages
        .iter()
        .filter(|p| p.may_have_more())
        .filter_map(|p| p.documents.last())
        .map(|d| &d.record)
        .min_by(|a, b| by_recency(a, b))
        .cloned();

    let sources: Vec<SourceProgress> = pages
        .iter()
        .map(|p| SourceProgress {
            collection: p.collection,
            tokens: p.documents.iter().map(|d| d.resume_token.clone()).collect(),
            may_have_more: p.may_have_more(),
        })
        .collect();

    let mut candidates = deduplicate(pages);
    candidates.sort_by(|a, b| by_recency(&a.record, &b.record));

    let filter = PostMergeFilter::new(filters);
    let mut items = Vec::with_capacity(page_size);
    let mut consumed: HashSet<(Collection, &ResumeToken)> = HashSet::new();
    for candidate in &candidates {
        if items.len() == page_size {
            break;
        }
        if horizon
            .as_ref()
            .is_some_and(|h| by_recency(&candidate.record, h) == Ordering::Greater)
        {
            break;
        }
        consumed.extend(
            candidate
                .sources
                .iter()
                .map(|hit| (hit.collection, &hit.resume_token)),
        );
        if filter.matches(&candidate.record) {
            items.push(candidate.record.clone());
        }
    }

    let mut next = previous.clone();
    for source in &sources {
        let prefix = source
            .tokens
            .iter()
            .take_while(|token| consumed.contains(&(source.collection, *token)))
            .count();
        let position = if prefix == source.tokens.len() && !source.may_have_more {
            SourcePosition::Exhausted
        } else if let Some(token) = prefix.checked_sub(1).and_then(|i| source.tokens.get(i)) {
            SourcePosition::After(token.clone())
        } else {
            continue;
        };
        next.set_position(source.collection, position);
    }

    (items, next)
}
