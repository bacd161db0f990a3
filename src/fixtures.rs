//! Profile fixtures: seed data for the in-memory store.
//!
//! A fixture file is a JSON object with one array of camelCase
//! [`ProfileRecord`] values per collection:
//!
//! ```json
//! {
//!   "users":    [{"id": "p1", "displayName": "Maryam", "isActive": true}],
//!   "profiles": []
//! }
//! ```
//!
//! Either array may be omitted. The same id may appear in both.

use profile_search::config::CollectionNames;
use profile_search::{Collection, InMemoryStore, ProfileRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{AppError, Result};

/// Records to load into each collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSet {
    pub users: Vec<ProfileRecord>,
    pub profiles: Vec<ProfileRecord>,
}

impl FixtureSet {
    /// Parse fixtures from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Fixture`] on malformed JSON, a blank id, or an id
    /// repeated within one collection.
    pub fn from_json(json: &str) -> Result<Self> {
        let set: Self = serde_json::from_str(json)
            .map_err(|e| AppError::Fixture(format!("malformed fixture JSON: {e}")))?;
        set.check_ids(Collection::Users, &set.users)?;
        set.check_ids(Collection::Profiles, &set.profiles)?;
        Ok(set)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`FixtureSet::from_json`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Build a store holding both collections under their configured names.
    /// Collections are created even when empty.
    pub fn into_store(self, names: &CollectionNames) -> InMemoryStore {
        InMemoryStore::new()
            .with_collection(names.name_for(Collection::Users), self.users)
            .with_collection(names.name_for(Collection::Profiles), self.profiles)
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.profiles.is_empty()
    }

    fn check_ids(&self, collection: Collection, records: &[ProfileRecord]) -> Result<()> {
        let mut seen = HashSet::new();
        for record in records {
            if record.id.trim().is_empty() {
                return Err(AppError::Fixture(format!("{collection}: record with blank id")));
            }
            if !seen.insert(record.id.as_str()) {
                return Err(AppError::Fixture(format!(
                    "{collection}: duplicate id '{}'",
                    record.id
                )));
            }
        }
        Ok(())
    }
}
