//! Post-merge filters evaluated in memory.
//!
//! Applied after deduplication and sorting, in this order:
//!
//! 1. Re-check of the predicates pushed to the store (`isActive`, age
//!    range, gender, city), so every returned record satisfies every
//!    active filter even when a store under-filters.
//! 2. Free text: the lowercased query must be a substring of the display
//!    name, the location, or any interest.
//! 3. Required interests: the record's lowercased interests must contain
//!    every required interest (exact token).

use std::collections::BTreeSet;

use crate::adapter::pushdown_predicates;
use crate::store::Predicate;
use crate::types::{ProfileRecord, SearchFilters};

/// The compiled, case-folded form of [`SearchFilters`].
#[derive(Debug, Clone)]
pub struct PostMergeFilter {
    pushed: Vec<Predicate>,
    query: Option<String>,
    interests: BTreeSet<String>,
}

impl PostMergeFilter {
    pub fn new(filters: &SearchFilters) -> Self {
        Self {
            pushed: pushdown_predicates(filters),
            query: filters.normalized_query(),
            interests: filters.normalized_interests(),
        }
    }

    /// Whether `record` passes every active filter.
    pub fn matches(&self, record: &ProfileRecord) -> bool {
        self.pushed.iter().all(|p| p.matches(record))
            && self
                .query
                .as_deref()
                .is_none_or(|q| matches_free_text(record, q))
            && (self.interests.is_empty() || has_all_interests(record, &self.interests))
    }
}

/// Substring match of an already lowercased `query` against display name,
/// location and each interest.
pub fn matches_free_text(record: &ProfileRecord, query: &str) -> bool {
    record.display_name.to_lowercase().contains(query)
        || record
            .location
            .as_deref()
            .is_some_and(|l| l.to_lowercase().contains(query))
        || record
            .interests
            .iter()
            .any(|i| i.to_lowercase().contains(query))
}

/// Whether the record's case-folded interests are a superset of `required`
/// (already lowercased).
pub fn has_all_interests(record: &ProfileRecord, required: &BTreeSet<String>) -> bool {
    let held: BTreeSet<String> = record
        .interests
        .iter()
        .map(|i| i.trim().to_lowercase())
        .collect();
    required.is_subset(&held)
}
