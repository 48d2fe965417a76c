//! Item Index collaborator interface and the in-memory implementation.
//!
//! The Item Index is the persistent store of item text, attributes, and
//! embeddings. The engine consumes it through the narrow [`ItemIndex`]
//! trait: structured filtering, candidate-restricted vector similarity, a
//! count, and a fingerprint for drift detection.
//!
//! For corpora of this size (tens to low thousands of items) the in-memory
//! backend is the production implementation as well as the test double: a
//! linear cosine scan over the candidate set is faster than any index
//! maintenance would buy back.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::errors::BraqError;
use crate::filter::FilterPredicate;
use crate::item::{Item, ItemId};

// ============================================================================
// CorpusFingerprint
// ============================================================================

/// Identity of a corpus state, used to detect drift between the item index
/// and derived artifacts (the lexical model, the snapshot).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusFingerprint {
    /// Number of items in the index.
    pub item_count: usize,
    /// Order-independent hash of item ids, text, and attributes.
    pub content_hash: u64,
}

// ============================================================================
// ItemIndex Trait
// ============================================================================

/// Trait for the Item Index collaborator.
pub trait ItemIndex: Send + Sync {
    /// Return items matching the predicate, in index order.
    ///
    /// `limit` of `None` returns the complete filtered set — the aggregate
    /// engine depends on this being exhaustive.
    fn get_by_filter(
        &self,
        predicate: &FilterPredicate,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, BraqError>;

    /// Vector similarity over a candidate id set.
    ///
    /// Returns up to `top_n` (item id, similarity) pairs sorted by
    /// similarity descending, id ascending as the tie-break. Only ids in
    /// `candidate_ids` are considered.
    fn vector_query(
        &self,
        embedding: &[f32],
        candidate_ids: &[ItemId],
        top_n: usize,
    ) -> Result<Vec<(ItemId, f32)>, BraqError>;

    /// Total number of items in the index.
    fn count(&self) -> Result<usize, BraqError>;

    /// Current corpus fingerprint, for drift detection.
    fn fingerprint(&self) -> Result<CorpusFingerprint, BraqError>;
}

// ============================================================================
// InMemoryItemIndex
// ============================================================================

/// In-memory item index.
///
/// Items keep insertion order (the index order contract); embeddings are
/// optional per item — items without one simply never appear in vector
/// results.
#[derive(Debug, Default)]
pub struct InMemoryItemIndex {
    items: Vec<Item>,
    embeddings: HashMap<ItemId, Vec<f32>>,
}

impl InMemoryItemIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from items without embeddings (lexical-only corpus).
    pub fn from_items(items: Vec<Item>) -> Self {
        Self {
            items,
            embeddings: HashMap::new(),
        }
    }

    /// Insert an item with an optional embedding.
    pub fn insert(&mut self, item: Item, embedding: Option<Vec<f32>>) {
        if let Some(embedding) = embedding {
            self.embeddings.insert(item.id.clone(), embedding);
        }
        self.items.push(item);
    }

    /// Whether any item carries an embedding.
    pub fn has_embeddings(&self) -> bool {
        !self.embeddings.is_empty()
    }
}

impl ItemIndex for InMemoryItemIndex {
    fn get_by_filter(
        &self,
        predicate: &FilterPredicate,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, BraqError> {
        let iter = self.items.iter().filter(|item| predicate.matches(item));
        let items: Vec<Item> = match limit {
            Some(limit) => iter.take(limit).cloned().collect(),
            None => iter.cloned().collect(),
        };
        Ok(items)
    }

    fn vector_query(
        &self,
        embedding: &[f32],
        candidate_ids: &[ItemId],
        top_n: usize,
    ) -> Result<Vec<(ItemId, f32)>, BraqError> {
        let mut scored: Vec<(ItemId, f32)> = candidate_ids
            .iter()
            .filter_map(|id| {
                self.embeddings
                    .get(id)
                    .map(|vec| (id.clone(), cosine_similarity(embedding, vec)))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(top_n);

        Ok(scored)
    }

    fn count(&self) -> Result<usize, BraqError> {
        Ok(self.items.len())
    }

    fn fingerprint(&self) -> Result<CorpusFingerprint, BraqError> {
        // XOR of per-item hashes keeps the fingerprint order-independent;
        // DefaultHasher uses fixed keys so the value is stable across runs.
        let mut combined: u64 = 0;
        for item in &self.items {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            item.id.as_str().hash(&mut hasher);
            item.content.hash(&mut hasher);
            serde_json::to_string(&item.attributes)?.hash(&mut hasher);
            combined ^= hasher.finish();
        }

        Ok(CorpusFingerprint {
            item_count: self.items.len(),
            content_hash: combined,
        })
    }
}
