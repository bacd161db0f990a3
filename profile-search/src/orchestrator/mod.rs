//! Search orchestrator: concurrent collection queries, dedup, ordering,
//! post-merge filtering and cursor bookkeeping.
//!
//! This module fans each page request out to both collections
//! concurrently, merges the results into one recency-ordered page, and
//! encodes the position of each collection into an opaque cursor.

pub mod cursor;
pub mod dedup;
pub mod filters;
pub mod ordering;
pub mod search;
