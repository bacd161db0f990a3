//! Contract for the remote document store backing both collections.
//!
//! The store is an external collaborator. It supports equality and range
//! predicates, exactly one sort field per query, a result limit, and a
//! "resume after document" cursor. Every implementation of
//! [`DocumentStore`] must be `Send + Sync` so the two collection queries of
//! one search can run concurrently.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::future::Future;

use crate::types::ProfileRecord;

/// Queryable profile fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    IsActive,
    Age,
    Gender,
    City,
    LastActiveAt,
}

impl Field {
    /// Store-side field name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsActive => "isActive",
            Self::Age => "age",
            Self::Gender => "gender",
            Self::City => "city",
            Self::LastActiveAt => "lastActiveAt",
        }
    }

    /// The value of this field on `record`, or `None` if the record lacks it.
    pub fn value_of(&self, record: &ProfileRecord) -> Option<Value> {
        match self {
            Self::IsActive => Some(Value::Bool(record.is_active)),
            Self::Age => record.age.map(|a| Value::Int(i64::from(a))),
            Self::Gender => record.gender.clone().map(Value::Text),
            Self::City => record.city.clone().map(Value::Text),
            Self::LastActiveAt => record
                .last_active_at
                .map(|t| Value::Int(t.timestamp_millis())),
        }
    }
}

/// A predicate operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Value {
    /// Compare two values of the same type. Mixed types are incomparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// An equality or range condition on one field.
///
/// Records missing the field never match, mirroring how document stores
/// treat absent fields in filtered queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Field, Value),
    Gte(Field, Value),
    Lte(Field, Value),
}

impl Predicate {
    pub fn field(&self) -> Field {
        match self {
            Self::Eq(f, _) | Self::Gte(f, _) | Self::Lte(f, _) => *f,
        }
    }

    /// Evaluate this predicate against a record.
    pub fn matches(&self, record: &ProfileRecord) -> bool {
        let Some(actual) = self.field().value_of(record) else {
            return false;
        };
        match self {
            Self::Eq(_, expected) => actual.compare(expected) == Some(Ordering::Equal),
            Self::Gte(_, bound) => matches!(
                actual.compare(bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lte(_, bound) => matches!(
                actual.compare(bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// The single sort field of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: Field,
    pub direction: Direction,
}

/// Store-specific opaque position, meaningful only to the store that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(pub String);

impl ResumeToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One bounded, filtered, sorted query against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQuery {
    /// Store-side collection name.
    pub collection: String,
    pub predicates: Vec<Predicate>,
    pub order_by: OrderBy,
    pub limit: usize,
    /// Continue strictly after the document this token was issued for.
    pub start_after: Option<ResumeToken>,
}

/// A matching document together with the token that resumes right after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDocument {
    pub record: ProfileRecord,
    pub resume_token: ResumeToken,
}

/// Result of one store query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorePage {
    /// Documents in query order, at most `limit` of them.
    pub documents: Vec<StoreDocument>,
    /// The store's own hint that more documents may follow.
    pub has_more_hint: bool,
}

/// Store-native status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    PermissionDenied,
    Unauthenticated,
    NotFound,
    DeadlineExceeded,
    Unavailable,
    ResourceExhausted,
    Aborted,
    Cancelled,
    InvalidArgument,
    Internal,
    Unknown,
}

/// A raw store failure. Never crosses the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code:?}: {message}")]
pub struct StoreError {
    pub code: StoreErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: StoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A document store able to run [`StoreQuery`] values.
pub trait DocumentStore: Send + Sync {
    /// Run one query and return the matching documents in query order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] with the store's native status code.
    fn query(
        &self,
        query: StoreQuery,
    ) -> impl Future<Output = Result<StorePage, StoreError>> + Send;
}
