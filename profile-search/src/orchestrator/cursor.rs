//! Self-describing federated cursor.
//!
//! One opaque string carries the pagination state of both collections:
//! the resume token of each collection that has been read from, and the
//! collections that are exhausted. A collection in neither set starts from
//! the beginning. The engine keeps no state between calls; everything
//! needed to continue lives in this value.
//!
//! Wire format: URL-safe unpadded base64 of
//! `{"v":1,"f":"<filter fingerprint>","t":{"users":"…"},"x":["profiles"]}`.
//! Callers must treat it as a black box; it is not stable across versions.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::SearchError;
use crate::store::ResumeToken;
use crate::types::{Collection, SearchFilters};

/// Current cursor format version.
const CURSOR_VERSION: u8 = 1;

/// Hex characters of the blake3 digest kept as the filter fingerprint.
const FINGERPRINT_LEN: usize = 16;

/// Where the next query against one collection starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePosition {
    /// Nothing read yet; query from the beginning.
    Start,
    /// Resume strictly after the document this token was issued for.
    After(ResumeToken),
    /// No further matching documents; do not query again.
    Exhausted,
}

/// Decoded continuation state for both collections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederatedCursor {
    fingerprint: String,
    positions: BTreeMap<Collection, SourcePosition>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorWire {
    v: u8,
    f: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    t: BTreeMap<Collection, ResumeToken>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    x: Vec<Collection>,
}

impl FederatedCursor {
    /// A cursor positioned at the start of both collections.
    pub fn start(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            positions: BTreeMap::new(),
        }
    }

    /// Fingerprint of the filters this cursor was issued for.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn position(&self, collection: Collection) -> &SourcePosition {
        self.positions
            .get(&collection)
            .unwrap_or(&SourcePosition::Start)
    }

    pub fn set_position(&mut self, collection: Collection, position: SourcePosition) {
        if position == SourcePosition::Start {
            self.positions.remove(&collection);
        } else {
            self.positions.insert(collection, position);
        }
    }

    /// Whether every collection is exhausted.
    pub fn is_exhausted(&self) -> bool {
        Collection::all()
            .iter()
            .all(|c| *self.position(*c) == SourcePosition::Exhausted)
    }

    /// Encode into the opaque string handed to callers.
    pub fn encode(&self) -> Result<String, SearchError> {
        let mut wire = CursorWire {
            v: CURSOR_VERSION,
            f: self.fingerprint.clone(),
            t: BTreeMap::new(),
            x: Vec::new(),
        };
        for (collection, position) in &self.positions {
            match position {
                SourcePosition::Start => {}
                SourcePosition::After(token) => {
                    wire.t.insert(*collection, token.clone());
                }
                SourcePosition::Exhausted => wire.x.push(*collection),
            }
        }
        let json = serde_json::to_vec(&wire)
            .map_err(|e| SearchError::Unknown(format!("failed to encode cursor: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode a caller-supplied cursor.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidCursor`] if the value is not valid
    /// base64, not a cursor payload, from an unknown version, or lists a
    /// collection as both resumable and exhausted.
    pub fn decode(encoded: &str) -> Result<Self, SearchError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| SearchError::InvalidCursor(format!("not base64: {e}")))?;
        let wire: CursorWire = serde_json::from_slice(&bytes)
            .map_err(|e| SearchError::InvalidCursor(format!("malformed payload: {e}")))?;
        if wire.v != CURSOR_VERSION {
            return Err(SearchError::InvalidCursor(format!(
                "unsupported cursor version {}",
                wire.v
            )));
        }

        let mut cursor = Self::start(wire.f);
        for (collection, token) in wire.t {
            cursor.set_position(collection, SourcePosition::After(token));
        }
        for collection in wire.x {
            if cursor.positions.contains_key(&collection) {
                return Err(SearchError::InvalidCursor(format!(
                    "{collection} is both resumable and exhausted"
                )));
            }
            cursor.set_position(collection, SourcePosition::Exhausted);
        }
        Ok(cursor)
    }
}

/// Stable digest of the normalised filters.
///
/// Filters that differ only in case or surrounding whitespace of the free
/// text or interests share a fingerprint.
pub fn filter_fingerprint(filters: &SearchFilters) -> String {
    let mut hasher = blake3::Hasher::new();
    feed(&mut hasher, "q", filters.normalized_query().as_deref());
    for interest in filters.normalized_interests() {
        feed(&mut hasher, "i", Some(&interest));
    }
    feed(&mut hasher, "min", filters.min_age.map(|a| a.to_string()).as_deref());
    feed(&mut hasher, "max", filters.max_age.map(|a| a.to_string()).as_deref());
    feed(&mut hasher, "g", filters.preferred_gender.as_deref());
    feed(&mut hasher, "c", filters.city.as_deref());
    let hex = hasher.finalize().to_hex();
    hex.as_str()[..FINGERPRINT_LEN].to_owned()
}

fn feed(hasher: &mut blake3::Hasher, tag: &str, value: Option<&str>) {
    hasher.update(tag.as_bytes());
    match value {
        Some(v) => {
            hasher.update(&(v.len() as u64).to_le_bytes());
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(&[0xff]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> ResumeToken {
        ResumeToken(s.into())
    }

    #[test]
    fn fresh_cursor_starts_both_collections() {
        let cursor = FederatedCursor::start("f");
        assert_eq!(*cursor.position(Collection::Users), SourcePosition::Start);
        assert_eq!(*cursor.position(Collection::Profiles), SourcePosition::Start);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn encode_decode_preserves_positions() {
        let mut cursor = FederatedCursor::start("abc123");
        cursor.set_position(Collection::Users, SourcePosition::After(token("2024|u1")));
        cursor.set_position(Collection::Profiles, SourcePosition::Exhausted);

        let encoded = cursor.encode().expect("encode");
        let decoded = FederatedCursor::decode(&encoded).expect("decode");
        assert_eq!(decoded, cursor);
        assert_eq!(decoded.fingerprint(), "abc123");
    }

    #[test]
    fn encoded_cursor_is_url_safe() {
        let mut cursor = FederatedCursor::start("f");
        cursor.set_position(Collection::Users, SourcePosition::After(token("?&/+= é")));
        let encoded = cursor.encode().expect("encode");
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn setting_start_clears_position() {
        let mut cursor = FederatedCursor::start("f");
        cursor.set_position(Collection::Users, SourcePosition::Exhausted);
        cursor.set_position(Collection::Users, SourcePosition::Start);
        assert_eq!(*cursor.position(Collection::Users), SourcePosition::Start);
    }

    #[test]
    fn exhausted_only_when_both_are() {
        let mut cursor = FederatedCursor::start("f");
        cursor.set_position(Collection::Users, SourcePosition::Exhausted);
        assert!(!cursor.is_exhausted());
        cursor.set_position(Collection::Profiles, SourcePosition::Exhausted);
        assert!(cursor.is_exhausted());
    }

    #[test]
    fn garbage_is_invalid_cursor() {
        let err = FederatedCursor::decode("%%%not-base64%%%").unwrap_err();
        assert!(matches!(err, SearchError::InvalidCursor(_)));

        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        let err = FederatedCursor::decode(&not_json).unwrap_err();
        assert!(matches!(err, SearchError::InvalidCursor(_)));
    }

    #[test]
    fn unknown_version_is_invalid_cursor() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"v":9,"f":"x"}"#);
        let err = FederatedCursor::decode(&payload).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn unknown_collection_is_invalid_cursor() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"v":1,"f":"x","t":{"matches":"t"}}"#);
        assert!(FederatedCursor::decode(&payload).is_err());
    }

    #[test]
    fn contradictory_positions_are_invalid_cursor() {
        let payload =
            URL_SAFE_NO_PAD.encode(br#"{"v":1,"f":"x","t":{"users":"t"},"x":["users"]}"#);
        let err = FederatedCursor::decode(&payload).unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn fingerprint_ignores_case_and_whitespace() {
        let a = SearchFilters {
            free_text_query: Some("  Kabul ".into()),
            interests_required: ["Music".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let b = SearchFilters {
            free_text_query: Some("kabul".into()),
            interests_required: ["music".to_string()].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(filter_fingerprint(&a), filter_fingerprint(&b));
        assert_eq!(filter_fingerprint(&a).len(), FINGERPRINT_LEN);
    }

    #[test]
    fn fingerprint_distinguishes_filters() {
        let a = SearchFilters {
            min_age: Some(20),
            ..Default::default()
        };
        let b = SearchFilters {
            max_age: Some(20),
            ..Default::default()
        };
        assert_ne!(filter_fingerprint(&a), filter_fingerprint(&b));
        assert_ne!(
            filter_fingerprint(&a),
            filter_fingerprint(&SearchFilters::default())
        );
    }
}
