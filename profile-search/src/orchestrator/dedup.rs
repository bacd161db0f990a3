//! Result deduplication by profile id.
//!
//! The same logical profile may be stored in both collections under the
//! same id. Deduplication keeps exactly one copy per id: the copy from the
//! collection with the higher precedence ([`Collection::Users`] before
//! [`Collection::Profiles`]). Every collection that returned the id is
//! recorded on the surviving candidate, with its resume token, so that
//! consuming the candidate consumes every copy of it.

use std::collections::HashMap;

use crate::adapter::AdapterPage;
use crate::store::ResumeToken;
use crate::types::{Collection, ProfileRecord};

/// One collection's copy of a candidate and the token that resumes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHit {
    pub collection: Collection,
    pub resume_token: ResumeToken,
}

/// A record after deduplication, with every collection that returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The kept copy, taken from the highest-precedence collection.
    pub record: ProfileRecord,
    /// All collections that returned this id, in precedence order.
    pub sources: Vec<SourceHit>,
}

/// Concatenate `pages` in precedence order and keep one candidate per id.
///
/// The output preserves first-seen order; callers sort afterwards.
pub fn deduplicate(mut pages: Vec<AdapterPage>) -> Vec<Candidate> {
    pages.sort_by_key(|p| p.collection);

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut candidates: Vec<Candidate> = Vec::new();

    for page in pages {
        let collection = page.collection;
        for document in page.documents {
            let hit = SourceHit {
                collection,
                resume_token: document.resume_token,
            };
            match index.get(&document.record.id) {
                Some(&at) => candidates[at].sources.push(hit),
                None => {
                    index.insert(document.record.id.clone(), candidates.len());
                    candidates.push(Candidate {
                        record: document.record,
                        sources: vec![hit],
                    });
                }
            }
        }
    }

    candidates
}
