//! Core types for profile records, search requests and result pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One user's searchable profile summary as stored in a backing collection.
///
/// The same logical person may exist in both collections under the same
/// `id`; that is an expected condition, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRecord {
    /// Opaque identifier, unique within one collection.
    pub id: String,
    /// Name shown in search results. May be empty.
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    /// Free-text location, e.g. `"Kabul, Afghanistan"`.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    /// Last activity time. Records without one sort after all others.
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
    /// Only active profiles are eligible for search.
    #[serde(default)]
    pub is_active: bool,
}

impl ProfileRecord {
    /// Create an active record with the given id and display name and no
    /// other attributes.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            age: None,
            gender: None,
            city: None,
            location: None,
            interests: BTreeSet::new(),
            last_active_at: None,
            is_active: true,
        }
    }
}

/// Caller-supplied search request.
///
/// Age bounds, gender and city are evaluated by the document store.
/// Free text and required interests are evaluated in memory after the
/// two collections have been merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// Case-insensitive substring matched against display name, location
    /// and each interest. Blank after trimming means "no free-text filter".
    pub free_text_query: Option<String>,
    /// Every entry must be present in the record's interests (exact token,
    /// case-insensitive).
    pub interests_required: BTreeSet<String>,
    /// Inclusive lower age bound.
    pub min_age: Option<u32>,
    /// Inclusive upper age bound.
    pub max_age: Option<u32>,
    pub preferred_gender: Option<String>,
    pub city: Option<String>,
}

impl SearchFilters {
    /// The trimmed, lowercased free-text query, or `None` if blank.
    pub fn normalized_query(&self) -> Option<String> {
        self.free_text_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Required interests trimmed and lowercased, with blanks removed.
    pub fn normalized_interests(&self) -> BTreeSet<String> {
        self.interests_required
            .iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect()
    }
}

/// One page of federated search results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    /// Deduplicated, filtered results ordered by most recent activity.
    pub items: Vec<ProfileRecord>,
    /// Opaque continuation token. Present iff more results may exist.
    pub next_cursor: Option<String>,
}

impl SearchPage {
    /// Whether the caller should request another page.
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// The two backing collections searched by the federated engine.
///
/// Variant order is the deduplication precedence: when both collections
/// return the same `id`, the copy from the earlier variant is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Primary user documents.
    Users,
    /// Extended profile documents maintained separately.
    Profiles,
}

impl Collection {
    /// Stable identifier used in logs and inside cursors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Profiles => "profiles",
        }
    }

    /// All collections in precedence order.
    pub fn all() -> &'static [Collection] {
        &[Self::Users, Self::Profiles]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
