//! Lexical (BM25) retrieval over work-item text.
//!
//! The lexical model is the sparse half of hybrid retrieval: it is built
//! in memory from exactly the items in the current corpus snapshot and is
//! rebuilt whenever the snapshot is rebuilt, so its vocabulary never drifts
//! from the item index.
//!
//! ## Key Components
//!
//! - [`tokenizer`]: Unicode-aware tokenization with Porter stemmer
//! - [`index`]: inverted index with candidate-restricted scoring
//! - [`scorer`]: Okapi BM25 scoring (k1=1.2, b=0.75)
//! - [`storage`]: bincode persistence keyed to a corpus fingerprint
//!
//! ## Usage
//!
//! ```ignore
//! use braq_core::lexical::{LexicalConfig, LexicalIndex};
//!
//! // Build during snapshot construction
//! let mut index = LexicalIndex::new(LexicalConfig::default());
//! for item in items {
//!     index.add_document(item.id.clone(), &item.content);
//! }
//!
//! // Score during retrieval, restricted to the filtered candidate set
//! let hits = index.search_within("login timeout bug", &candidate_ids, 20);
//! ```

mod index;
mod scorer;
mod storage;
mod tokenizer;

pub use index::{DocumentStats, LexicalIndex, LexicalIndexStats};
pub use scorer::{bm25_term_score, idf, Bm25Params};
pub use storage::{load_lexical_index, save_lexical_index, LexicalIndexMeta, LEXICAL_INDEX_FILENAME};
pub use tokenizer::{Tokenizer, TokenizerConfig};

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration
// ============================================================================

/// Lexical model configuration.
///
/// Controls tokenization and BM25 scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalConfig {
    /// BM25 k1 parameter - term frequency saturation.
    /// Default: 1.2
    #[serde(default = "default_k1")]
    pub k1: f32,

    /// BM25 b parameter - document length normalization.
    /// Default: 0.75
    #[serde(default = "default_b")]
    pub b: f32,

    /// Whether to apply Porter stemming to tokens.
    /// Default: true
    #[serde(default = "default_stemming")]
    pub stemming: bool,

    /// Whether to remove stop words during tokenization.
    /// Default: true
    #[serde(default = "default_remove_stopwords")]
    pub remove_stopwords: bool,

    /// Minimum token length to include.
    /// Default: 2
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,
}

fn default_k1() -> f32 {
    1.2
}

fn default_b() -> f32 {
    0.75
}

fn default_stemming() -> bool {
    true
}

fn default_remove_stopwords() -> bool {
    true
}

fn default_min_token_length() -> usize {
    2
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            stemming: default_stemming(),
            remove_stopwords: default_remove_stopwords(),
            min_token_length: default_min_token_length(),
        }
    }
}

// ============================================================================
// Search results
// ============================================================================

/// Result from a lexical search.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    /// Item id of the matched document.
    pub item_id: crate::item::ItemId,
    /// Raw BM25 score.
    pub score: f32,
    /// Rank in the lexical result list (1-indexed).
    pub rank: usize,
}
