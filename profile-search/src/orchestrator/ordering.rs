//! Result ordering by most recent activity.
//!
//! Records are ordered by `last_active_at` descending. Records without a
//! timestamp sort after every record that has one. Ties are broken by `id`
//! ascending so the order is total and repeatable.

use std::cmp::Ordering;

use crate::types::ProfileRecord;

/// Total order used for search results and for store-side pagination.
pub fn by_recency(a: &ProfileRecord, b: &ProfileRecord) -> Ordering {
    let recency = match (a.last_active_at, b.last_active_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    recency.then_with(|| a.id.cmp(&b.id))
}

/// Whether `records` is ordered by recency, with missing timestamps last.
pub fn is_recency_ordered(records: &[ProfileRecord]) -> bool {
    records.windows(2).all(|pair| {
        match (pair[0].last_active_at, pair[1].last_active_at) {
            (Some(a), Some(b)) => a >= b,
            (None, Some(_)) => false,
            _ => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(id: &str, secs: Option<i64>) -> ProfileRecord {
        let mut r = ProfileRecord::new(id, id);
        r.last_active_at = secs.and_then(|s| Utc.timestamp_opt(s, 0).single());
        r
    }

    #[test]
    fn newer_sorts_first() {
        let mut records = vec![at("a", Some(5)), at("b", Some(10)), at("c", Some(8))];
        records.sort_by(by_recency);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn missing_timestamp_sorts_last() {
        let mut records = vec![at("never", None), at("old", Some(1)), at("new", Some(100))];
        records.sort_by(by_recency);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "never"]);
    }

    #[test]
    fn ties_break_by_id() {
        let mut records = vec![at("z", Some(7)), at("a", Some(7)), at("m", None), at("b", None)];
        records.sort_by(by_recency);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "z", "b", "m"]);
    }

    #[test]
    fn ordered_check_detects_violations() {
        assert!(is_recency_ordered(&[at("a", Some(9)), at("b", Some(3)), at("c", None)]));
        assert!(!is_recency_ordered(&[at("a", Some(3)), at("b", Some(9))]));
        assert!(!is_recency_ordered(&[at("a", None), at("b", Some(1))]));
        assert!(is_recency_ordered(&[]));
    }
}
