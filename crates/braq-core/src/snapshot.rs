//! Corpus snapshot: the immutable unit the engine reads from.
//!
//! A [`CorpusSnapshot`] bundles the full item set with the lexical model
//! built from exactly that set, stamped with the item index fingerprint it
//! was built from. Snapshots are immutable; readers across conversations
//! share one `Arc<CorpusSnapshot>` without locking.
//!
//! [`SnapshotStore`] owns the single swap point: `refresh` compares the
//! live index fingerprint against the current snapshot and, on drift,
//! builds a complete replacement before atomically swapping the `Arc`.
//! Readers see either the old snapshot fully or the new one fully — never
//! a partially rebuilt lexical model paired with a newer item set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::errors::BraqError;
use crate::filter::FilterPredicate;
use crate::index::{CorpusFingerprint, ItemIndex};
use crate::item::{Item, ItemId};
use crate::lexical::{load_lexical_index, save_lexical_index, LexicalConfig, LexicalIndex};

// ============================================================================
// CorpusSnapshot
// ============================================================================

/// Immutable view of the corpus: items plus the lexical model built from
/// them.
pub struct CorpusSnapshot {
    items: Vec<Item>,
    by_id: HashMap<ItemId, usize>,
    lexical: LexicalIndex,
    fingerprint: CorpusFingerprint,
    built_at: DateTime<Utc>,
}

impl CorpusSnapshot {
    /// Build a snapshot from the item index.
    ///
    /// When `cache_dir` is set, a cached lexical index matching the current
    /// fingerprint is reused; otherwise the model is rebuilt and the cache
    /// refreshed (cache write failures are logged, not fatal).
    pub fn build(
        index: &dyn ItemIndex,
        lexical_config: &LexicalConfig,
        cache_dir: Option<&Path>,
    ) -> Result<Self, BraqError> {
        let fingerprint = index.fingerprint()?;
        let items = index.get_by_filter(&FilterPredicate::empty(), None)?;

        let by_id: HashMap<ItemId, usize> = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();

        let lexical = Self::build_lexical(&items, &fingerprint, lexical_config, cache_dir)?;

        tracing::info!(
            items = items.len(),
            vocabulary = lexical.vocabulary_size(),
            "Built corpus snapshot"
        );

        Ok(Self {
            items,
            by_id,
            lexical,
            fingerprint,
            built_at: Utc::now(),
        })
    }

    fn build_lexical(
        items: &[Item],
        fingerprint: &CorpusFingerprint,
        config: &LexicalConfig,
        cache_dir: Option<&Path>,
    ) -> Result<LexicalIndex, BraqError> {
        if let Some(dir) = cache_dir {
            if let Some(cached) = load_lexical_index(dir, fingerprint)? {
                tracing::debug!("Reusing cached lexical index from {}", dir.display());
                return Ok(cached);
            }
        }

        let mut lexical = LexicalIndex::new(config.clone());
        lexical.build_from_iter(items.iter().map(|item| (&item.id, item.content.as_str())));

        if let Some(dir) = cache_dir {
            if let Err(e) = save_lexical_index(&lexical, fingerprint, dir) {
                tracing::warn!("Failed to cache lexical index at {}: {}", dir.display(), e);
            }
        }

        Ok(lexical)
    }

    /// All items, in index order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Look up an item by id.
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// All item ids, in index order.
    pub fn all_ids(&self) -> Vec<ItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Items matching a predicate, in index order. Always the complete set.
    pub fn filtered(&self, predicate: &FilterPredicate) -> Vec<&Item> {
        self.items
            .iter()
            .filter(|item| predicate.matches(item))
            .collect()
    }

    /// The lexical model built from this snapshot's items.
    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    /// Fingerprint of the item index state this snapshot was built from.
    pub fn fingerprint(&self) -> &CorpusFingerprint {
        &self.fingerprint
    }

    /// When the snapshot was built.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the corpus is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// SnapshotStore
// ============================================================================

/// Holds the current snapshot and performs atomic rebuild-and-swap.
pub struct SnapshotStore {
    current: RwLock<Arc<CorpusSnapshot>>,
    lexical_config: LexicalConfig,
    cache_dir: Option<PathBuf>,
}

impl SnapshotStore {
    /// Build the initial snapshot from the item index.
    pub fn build(
        index: &dyn ItemIndex,
        lexical_config: LexicalConfig,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self, BraqError> {
        let snapshot = CorpusSnapshot::build(index, &lexical_config, cache_dir.as_deref())?;
        Ok(Self {
            current: RwLock::new(Arc::new(snapshot)),
            lexical_config,
            cache_dir,
        })
    }

    /// Get the current snapshot. Cheap; the returned `Arc` stays valid even
    /// if the store swaps underneath it.
    pub fn current(&self) -> Arc<CorpusSnapshot> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rebuild the snapshot if the index fingerprint has drifted.
    ///
    /// The replacement is built completely before the swap, so concurrent
    /// readers are never exposed to partial state. Returns whether a
    /// rebuild happened.
    pub fn refresh(&self, index: &dyn ItemIndex) -> Result<bool, BraqError> {
        let live = index.fingerprint()?;
        if live == *self.current().fingerprint() {
            return Ok(false);
        }

        tracing::info!(
            old = ?self.current().fingerprint(),
            new = ?live,
            "Corpus drift detected; rebuilding snapshot"
        );

        let rebuilt = CorpusSnapshot::build(index, &self.lexical_config, self.cache_dir.as_deref())?;
        let mut guard = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(rebuilt);

        Ok(true)
    }
}
