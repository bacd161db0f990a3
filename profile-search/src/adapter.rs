//! Collection query adapter: one bounded query against one collection.
//!
//! Translates [`SearchFilters`], a page size and an optional resume token
//! into a single [`StoreQuery`]. Only the filters the store can evaluate
//! (age range, gender and city equality) are pushed down; free text and
//! required interests are left to the orchestrator. Every query also
//! requires `isActive == true` and orders by `lastActiveAt` descending.
//!
//! Store failures are mapped into [`SearchError`] here and never cross into
//! the engine raw. The adapter does not retry.

use std::sync::Arc;
use std::time::Duration;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::store::{
    Direction, DocumentStore, Field, OrderBy, Predicate, ResumeToken, StoreDocument, StoreError,
    StoreErrorCode, StoreQuery, Value,
};
use crate::types::{Collection, SearchFilters};

/// Records returned by one adapter call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterPage {
    pub collection: Collection,
    /// At most `page_size` documents in recency order.
    pub documents: Vec<StoreDocument>,
    /// Present iff exactly `page_size` documents were returned.
    pub resume_token: Option<ResumeToken>,
}

impl AdapterPage {
    /// Whether the collection may hold more matching records.
    pub fn may_have_more(&self) -> bool {
        self.resume_token.is_some()
    }
}

/// Issues bounded, filtered, sorted queries against one backing collection.
///
/// Stateless per call; one instance per collection.
#[derive(Debug)]
pub struct CollectionQueryAdapter<S> {
    store: Arc<S>,
    collection: Collection,
    store_name: String,
    page_size_cap: usize,
    timeout: Duration,
}

impl<S: DocumentStore> CollectionQueryAdapter<S> {
    pub fn new(store: Arc<S>, collection: Collection, config: &SearchConfig) -> Self {
        Self {
            store,
            collection,
            store_name: config.collections.name_for(collection).to_owned(),
            page_size_cap: config.page_size_cap.max(1),
            timeout: Duration::from_millis(config.adapter_timeout_ms),
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Build the store query for one page. `page_size` is clamped to
    /// `[1, page_size_cap]`.
    pub fn build_query(
        &self,
        filters: &SearchFilters,
        page_size: usize,
        resume_after: Option<&ResumeToken>,
    ) -> StoreQuery {
        StoreQuery {
            collection: self.store_name.clone(),
            predicates: pushdown_predicates(filters),
            order_by: OrderBy {
                field: Field::LastActiveAt,
                direction: Direction::Descending,
            },
            limit: page_size.clamp(1, self.page_size_cap),
            start_after: resume_after.cloned(),
        }
    }

    /// Fetch up to `page_size` matching records, resuming after
    /// `resume_after` when given.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Unavailable`] when the store times out or is
    /// unreachable, [`SearchError::InvalidCursor`] when the store rejects
    /// the supplied resume token, and the mapped kind for any other store
    /// failure.
    pub async fn fetch_page(
        &self,
        filters: &SearchFilters,
        page_size: usize,
        resume_after: Option<&ResumeToken>,
    ) -> Result<AdapterPage, SearchError> {
        let query = self.build_query(filters, page_size, resume_after);
        let limit = query.limit;
        tracing::trace!(
            collection = %self.collection,
            limit,
            resumed = resume_after.is_some(),
            predicates = query.predicates.len(),
            "collection query"
        );

        let outcome = tokio::time::timeout(self.timeout, self.store.query(query))
            .await
            .map_err(|_| {
                tracing::warn!(
                    collection = %self.collection,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "collection query timed out"
                );
                SearchError::Unavailable(format!(
                    "{}: deadline exceeded after {}ms",
                    self.collection,
                    self.timeout.as_millis()
                ))
            })?;

        let page = outcome.map_err(|err| {
            tracing::warn!(collection = %self.collection, error = %err, "collection query failed");
            map_store_error(self.collection, err, resume_after.is_some())
        })?;

        let mut documents = page.documents;
        documents.truncate(limit);
        let resume_token = if documents.len() == limit {
            documents.last().map(|d| d.resume_token.clone())
        } else {
            None
        };

        tracing::debug!(
            collection = %self.collection,
            count = documents.len(),
            has_more = resume_token.is_some(),
            store_hint = page.has_more_hint,
            "collection page fetched"
        );

        Ok(AdapterPage {
            collection: self.collection,
            documents,
            resume_token,
        })
    }
}

/// The subset of `filters` the store can evaluate, plus `isActive == true`.
pub fn pushdown_predicates(filters: &SearchFilters) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::Eq(Field::IsActive, Value::Bool(true))];
    if let Some(min) = filters.min_age {
        predicates.push(Predicate::Gte(Field::Age, Value::Int(i64::from(min))));
    }
    if let Some(max) = filters.max_age {
        predicates.push(Predicate::Lte(Field::Age, Value::Int(i64::from(max))));
    }
    if let Some(gender) = &filters.preferred_gender {
        predicates.push(Predicate::Eq(Field::Gender, Value::Text(gender.clone())));
    }
    if let Some(city) = &filters.city {
        predicates.push(Predicate::Eq(Field::City, Value::Text(city.clone())));
    }
    predicates
}

/// Map a store-native failure into the search error taxonomy.
///
/// An `InvalidArgument` raised while resuming can only come from the token
/// the caller replayed, so it is reported as an invalid cursor.
pub fn map_store_error(collection: Collection, err: StoreError, resumed: bool) -> SearchError {
    let message = format!("{collection}: {}", err.message);
    match err.code {
        StoreErrorCode::PermissionDenied | StoreErrorCode::Unauthenticated => {
            SearchError::PermissionDenied(message)
        }
        StoreErrorCode::NotFound => SearchError::NotFound(message),
        StoreErrorCode::DeadlineExceeded
        | StoreErrorCode::Unavailable
        | StoreErrorCode::ResourceExhausted
        | StoreErrorCode::Aborted => SearchError::Unavailable(message),
        StoreErrorCode::InvalidArgument if resumed => SearchError::InvalidCursor(message),
        StoreErrorCode::Cancelled
        | StoreErrorCode::InvalidArgument
        | StoreErrorCode::Internal
        | StoreErrorCode::Unknown => SearchError::Unknown(message),
    }
}
