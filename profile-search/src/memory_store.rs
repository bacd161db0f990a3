//! In-memory [`DocumentStore`] implementation.
//!
//! Holds named collections of [`ProfileRecord`] values and answers
//! [`StoreQuery`] values the way the remote store does: predicates are
//! evaluated per document, results are ordered by `lastActiveAt` descending
//! (missing last, ties by id), and `start_after` resumes strictly after the
//! document a token was issued for. Used by the search host and in tests.
//!
//! Failures and latency can be injected per collection to exercise the
//! engine's error paths.

use chrono::{DateTime, SecondsFormat, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::orchestrator::ordering::by_recency;
use crate::store::{
    Direction, DocumentStore, Field, ResumeToken, StoreDocument, StoreError, StoreErrorCode,
    StorePage, StoreQuery,
};
use crate::types::ProfileRecord;

/// Separates the timestamp from the id inside a resume token.
const TOKEN_SEPARATOR: char = '|';
/// Timestamp placeholder for records without `lastActiveAt`.
const NO_TIMESTAMP: &str = "-";

/// A process-local document store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<ProfileRecord>>>,
    failures: RwLock<HashMap<String, StoreErrorCode>>,
    latency: RwLock<HashMap<String, Duration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper that creates `name` with the given records.
    pub fn with_collection(
        self,
        name: impl Into<String>,
        records: impl IntoIterator<Item = ProfileRecord>,
    ) -> Self {
        let name = name.into();
        self.create_collection(&name);
        for record in records {
            self.upsert(&name, record);
        }
        self
    }

    /// Create an empty collection if it does not exist yet.
    pub fn create_collection(&self, name: &str) {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_owned())
            .or_default();
    }

    /// Insert `record`, replacing any record with the same id.
    pub fn upsert(&self, collection: &str, record: ProfileRecord) {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let records = collections.entry(collection.to_owned()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record by id. Returns whether it existed.
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let Some(records) = collections.get_mut(collection) else {
            return false;
        };
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    /// Number of records in `collection` (0 if it does not exist).
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Make every query against `collection` fail with `code`, or clear
    /// the injected failure with `None`.
    pub fn inject_failure(&self, collection: &str, code: Option<StoreErrorCode>) {
        let mut failures = self.failures.write().unwrap_or_else(PoisonError::into_inner);
        match code {
            Some(code) => {
                failures.insert(collection.to_owned(), code);
            }
            None => {
                failures.remove(collection);
            }
        }
    }

    /// Delay every query against `collection` by `delay`.
    pub fn inject_latency(&self, collection: &str, delay: Duration) {
        self.latency
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.to_owned(), delay);
    }

    fn injected_latency(&self, collection: &str) -> Option<Duration> {
        self.latency
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .copied()
    }

    fn injected_failure(&self, collection: &str) -> Option<StoreErrorCode> {
        self.failures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .copied()
    }

    fn run_query(&self, query: &StoreQuery) -> Result<StorePage, StoreError> {
        if query.order_by.field != Field::LastActiveAt
            || query.order_by.direction != Direction::Descending
        {
            return Err(StoreError::new(
                StoreErrorCode::InvalidArgument,
                format!(
                    "unsupported order by {} {:?}",
                    query.order_by.field.name(),
                    query.order_by.direction
                ),
            ));
        }

        let anchor = query.start_after.as_ref().map(decode_token).transpose()?;

        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let records = collections.get(&query.collection).ok_or_else(|| {
            StoreError::new(
                StoreErrorCode::NotFound,
                format!("collection '{}' does not exist", query.collection),
            )
        })?;

        let mut matching: Vec<&ProfileRecord> = records
            .iter()
            .filter(|r| query.predicates.iter().all(|p| p.matches(r)))
            .filter(|r| {
                anchor
                    .as_ref()
                    .is_none_or(|a| by_recency(r, a) == Ordering::Greater)
            })
            .collect();
        matching.sort_by(|a, b| by_recency(a, b));

        let has_more_hint = matching.len() > query.limit;
        let documents = matching
            .into_iter()
            .take(query.limit)
            .map(|record| StoreDocument {
                resume_token: encode_token(record),
                record: record.clone(),
            })
            .collect();

        Ok(StorePage {
            documents,
            has_more_hint,
        })
    }
}

impl DocumentStore for InMemoryStore {
    async fn query(&self, query: StoreQuery) -> Result<StorePage, StoreError> {
        if let Some(delay) = self.injected_latency(&query.collection) {
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = self.injected_failure(&query.collection) {
            return Err(StoreError::new(
                code,
                format!("injected failure on '{}'", query.collection),
            ));
        }
        self.run_query(&query)
    }
}

/// Token positioned right after `record` in recency order.
fn encode_token(record: &ProfileRecord) -> ResumeToken {
    let timestamp = record.last_active_at.map_or_else(
        || NO_TIMESTAMP.to_owned(),
        |t| t.to_rfc3339_opts(SecondsFormat::Nanos, true),
    );
    ResumeToken(format!("{timestamp}{TOKEN_SEPARATOR}{}", record.id))
}

/// Rebuild the sort key a token was issued for as a bare record.
fn decode_token(token: &ResumeToken) -> Result<ProfileRecord, StoreError> {
    let invalid = || {
        StoreError::new(
            StoreErrorCode::InvalidArgument,
            format!("malformed resume token '{token}'"),
        )
    };
    let (timestamp, id) = token.as_str().split_once(TOKEN_SEPARATOR).ok_or_else(invalid)?;
    if id.is_empty() {
        return Err(invalid());
    }
    let last_active_at = if timestamp == NO_TIMESTAMP {
        None
    } else {
        Some(
            DateTime::parse_from_rfc3339(timestamp)
                .map_err(|_| invalid())?
                .with_timezone(&Utc),
        )
    };
    let mut anchor = ProfileRecord::new(id, "");
    anchor.last_active_at = last_active_at;
    Ok(anchor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{OrderBy, Predicate, Value};
    use chrono::TimeZone;

    fn record(id: &str, age: u32, secs: Option<i64>) -> ProfileRecord {
        let mut r = ProfileRecord::new(id, format!("Name {id}"));
        r.age = Some(age);
        r.last_active_at = secs.and_then(|s| Utc.timestamp_opt(s, 0).single());
        r
    }

    fn query(limit: usize, start_after: Option<ResumeToken>) -> StoreQuery {
        StoreQuery {
            collection: "users".into(),
            predicates: vec![Predicate::Eq(Field::IsActive, Value::Bool(true))],
            order_by: OrderBy {
                field: Field::LastActiveAt,
                direction: Direction::Descending,
            },
            limit,
            start_after,
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new().with_collection(
            "users",
            vec![
                record("a", 30, Some(10)),
                record("b", 22, Some(30)),
                record("c", 41, None),
                record("d", 35, Some(20)),
            ],
        )
    }

    fn ids(page: &StorePage) -> Vec<&str> {
        page.documents.iter().map(|d| d.record.id.as_str()).collect()
    }

    #[tokio::test]
    async fn orders_by_recency_with_missing_last() {
        let page = store().query(query(10, None)).await.expect("query");
        assert_eq!(ids(&page), vec!["b", "d", "a", "c"]);
        assert!(!page.has_more_hint);
    }

    #[tokio::test]
    async fn limit_sets_has_more_hint() {
        let page = store().query(query(2, None)).await.expect("query");
        assert_eq!(ids(&page), vec!["b", "d"]);
        assert!(page.has_more_hint);
    }

    #[tokio::test]
    async fn start_after_resumes_strictly_after_document() {
        let store = store();
        let first = store.query(query(2, None)).await.expect("query");
        let token = first.documents[1].resume_token.clone();
        let second = store.query(query(2, Some(token))).await.expect("query");
        assert_eq!(ids(&second), vec!["a", "c"]);
        assert!(!second.has_more_hint);
    }

    #[tokio::test]
    async fn resume_after_record_without_timestamp() {
        let store = store().with_collection("users", vec![record("e", 50, None)]);
        let all = store.query(query(10, None)).await.expect("query");
        assert_eq!(ids(&all), vec!["b", "d", "a", "c", "e"]);
        let c_token = all.documents[3].resume_token.clone();
        let rest = store.query(query(10, Some(c_token))).await.expect("query");
        assert_eq!(ids(&rest), vec!["e"]);
    }

    #[tokio::test]
    async fn predicates_filter_documents() {
        let mut q = query(10, None);
        q.predicates.push(Predicate::Gte(Field::Age, Value::Int(30)));
        q.predicates.push(Predicate::Lte(Field::Age, Value::Int(40)));
        let page = store().query(q).await.expect("query");
        assert_eq!(ids(&page), vec!["d", "a"]);
    }

    #[tokio::test]
    async fn inactive_records_excluded_by_predicate() {
        let store = store();
        let mut inactive = record("z", 30, Some(99));
        inactive.is_active = false;
        store.upsert("users", inactive);
        let page = store.query(query(10, None)).await.expect("query");
        assert!(!ids(&page).contains(&"z"));
    }

    #[tokio::test]
    async fn unknown_collection_is_not_found() {
        let mut q = query(10, None);
        q.collection = "missing".into();
        let err = store().query(q).await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::NotFound);
    }

    #[tokio::test]
    async fn malformed_token_is_invalid_argument() {
        let err = store()
            .query(query(10, Some(ResumeToken("garbage".into()))))
            .await
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::InvalidArgument);

        let err = store()
            .query(query(10, Some(ResumeToken("yesterday|a".into()))))
            .await
            .unwrap_err();
        assert_eq!(err.code, StoreErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn unsupported_order_is_rejected() {
        let mut q = query(10, None);
        q.order_by.direction = Direction::Ascending;
        let err = store().query(q).await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::InvalidArgument);
    }

    #[tokio::test]
    async fn injected_failure_applies_until_cleared() {
        let store = store();
        store.inject_failure("users", Some(StoreErrorCode::Unavailable));
        let err = store.query(query(10, None)).await.unwrap_err();
        assert_eq!(err.code, StoreErrorCode::Unavailable);

        store.inject_failure("users", None);
        assert!(store.query(query(10, None)).await.is_ok());
    }

    #[test]
    fn upsert_replaces_by_id_and_remove_deletes() {
        let store = store();
        assert_eq!(store.len("users"), 4);
        store.upsert("users", record("a", 31, Some(11)));
        assert_eq!(store.len("users"), 4);
        assert!(store.remove("users", "a"));
        assert!(!store.remove("users", "a"));
        assert_eq!(store.len("users"), 3);
        assert!(store.is_empty("nothing"));
    }

    #[test]
    fn token_round_trips_sort_key() {
        let r = record("id|with|pipes", 20, Some(1_700_000_000));
        let anchor = decode_token(&encode_token(&r)).expect("decode");
        assert_eq!(anchor.id, "id|with|pipes");
        assert_eq!(anchor.last_active_at, r.last_active_at);

        let none = record("n", 20, None);
        let anchor = decode_token(&encode_token(&none)).expect("decode");
        assert!(anchor.last_active_at.is_none());
    }

    #[tokio::test]
    async fn writes_and_queries_recover_from_poisoned_lock() {
        let store = InMemoryStore::new().with_collection("users", [record("a", 30, Some(10))]);
        let poisoned = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = store.collections.write().expect("lock");
            panic!("writer panicked");
        }));
        assert!(poisoned.is_err());
        assert!(store.collections.is_poisoned());

        store.upsert("users", record("b", 30, Some(20)));
        assert_eq!(store.len("users"), 2);

        let page = store.query(query(10, None)).await.expect("query");
        let ids: Vec<&str> = page.documents.iter().map(|d| d.record.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
