//! Inverted index for BM25 scoring over item text.
//!
//! Stores term → postings with term frequencies, pre-computed document
//! lengths, and corpus statistics. Supports both unrestricted search and
//! search restricted to a candidate set, which is how filtered retrieval
//! scores only the items a filter predicate admits.

use std::collections::{HashMap, HashSet};

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use super::scorer::{bm25_term_score, idf, Bm25Params};
use super::tokenizer::{Tokenizer, TokenizerConfig};
use super::{LexicalConfig, LexicalHit};
use crate::item::ItemId;

/// Statistics for a single document in the index.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct DocumentStats {
    /// Number of tokens in the document.
    pub length: usize,
    /// Item id the document belongs to.
    pub item_id: String,
}

/// Posting entry: document index and term frequency.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
struct Posting {
    /// Index into the documents array.
    doc_idx: usize,
    /// Term frequency in this document.
    term_freq: usize,
}

/// BM25 inverted index over item text.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct LexicalIndex {
    /// BM25 parameters.
    params: Bm25Params,
    /// Tokenizer configuration (reused for query tokenization).
    tokenizer_config: TokenizerConfig,
    /// Term → (document frequency, postings).
    inverted_index: HashMap<String, (usize, Vec<Posting>)>,
    /// Document statistics indexed by internal doc_idx.
    documents: Vec<DocumentStats>,
    /// Average document length.
    avg_doc_len: f32,
    /// Total number of tokens in the corpus.
    total_tokens: usize,
}

impl LexicalIndex {
    /// Create a new empty index.
    pub fn new(config: LexicalConfig) -> Self {
        let tokenizer_config = TokenizerConfig {
            stemming: config.stemming,
            remove_stopwords: config.remove_stopwords,
            min_token_length: config.min_token_length,
        };

        Self {
            params: Bm25Params {
                k1: config.k1,
                b: config.b,
            },
            tokenizer_config,
            inverted_index: HashMap::new(),
            documents: Vec::new(),
            avg_doc_len: 0.0,
            total_tokens: 0,
        }
    }

    /// Add an item's text to the index.
    pub fn add_document(&mut self, item_id: &ItemId, text: &str) {
        let tokenizer = Tokenizer::new(self.tokenizer_config.clone());
        let tokens = tokenizer.tokenize(text);
        let doc_len = tokens.len();

        let mut term_freqs: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }

        let doc_idx = self.documents.len();
        self.documents.push(DocumentStats {
            length: doc_len,
            item_id: item_id.as_str().to_string(),
        });

        for (term, tf) in term_freqs {
            let entry = self.inverted_index.entry(term).or_insert((0, Vec::new()));
            entry.0 += 1;
            entry.1.push(Posting {
                doc_idx,
                term_freq: tf,
            });
        }

        self.total_tokens += doc_len;
        self.avg_doc_len = self.total_tokens as f32 / self.documents.len() as f32;
    }

    /// Build the index from (item_id, text) pairs.
    pub fn build_from_iter<'a, I>(&mut self, documents: I)
    where
        I: Iterator<Item = (&'a ItemId, &'a str)>,
    {
        for (item_id, text) in documents {
            self.add_document(item_id, text);
        }
    }

    /// Search the whole index for documents matching the query.
    ///
    /// Results are sorted by BM25 score descending, item id ascending as a
    /// deterministic tie-break.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<LexicalHit> {
        self.search_impl(query, None, top_k)
    }

    /// Search restricted to a candidate set of item ids.
    ///
    /// Only documents whose item id is in `candidates` are scored; the
    /// candidate set bounds the search space, it does not merely post-filter
    /// results.
    pub fn search_within(
        &self,
        query: &str,
        candidates: &HashSet<ItemId>,
        top_k: usize,
    ) -> Vec<LexicalHit> {
        self.search_impl(query, Some(candidates), top_k)
    }

    fn search_impl(
        &self,
        query: &str,
        candidates: Option<&HashSet<ItemId>>,
        top_k: usize,
    ) -> Vec<LexicalHit> {
        if self.documents.is_empty() {
            return Vec::new();
        }

        let tokenizer = Tokenizer::new(self.tokenizer_config.clone());
        let query_tokens = tokenizer.tokenize(query);

        if query_tokens.is_empty() {
            return Vec::new();
        }

        // Query terms with their IDF values; terms absent from the
        // vocabulary contribute nothing and are dropped up front.
        let num_docs = self.documents.len();
        let query_terms: Vec<(&str, f32)> = query_tokens
            .iter()
            .filter_map(|term| {
                self.inverted_index
                    .get(term)
                    .map(|(df, _)| (term.as_str(), idf(num_docs, *df)))
            })
            .collect();

        if query_terms.is_empty() {
            return Vec::new();
        }

        let allowed: Option<HashSet<&str>> =
            candidates.map(|set| set.iter().map(|id| id.as_str()).collect());

        // Score candidate documents that contain at least one query term
        let mut scores: HashMap<usize, f32> = HashMap::new();

        for (term, idf_val) in &query_terms {
            if let Some((_, postings)) = self.inverted_index.get(*term) {
                for posting in postings {
                    let doc_stats = &self.documents[posting.doc_idx];

                    if let Some(ref allowed) = allowed {
                        if !allowed.contains(doc_stats.item_id.as_str()) {
                            continue;
                        }
                    }

                    let term_score = bm25_term_score(
                        posting.term_freq,
                        doc_stats.length,
                        self.avg_doc_len,
                        *idf_val,
                        &self.params,
                    );
                    *scores.entry(posting.doc_idx).or_insert(0.0) += term_score;
                }
            }
        }

        let mut scored_docs: Vec<(usize, f32)> = scores.into_iter().collect();
        scored_docs.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| self.documents[a.0].item_id.cmp(&self.documents[b.0].item_id))
        });

        scored_docs
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(rank, (doc_idx, score))| LexicalHit {
                item_id: ItemId::new(self.documents[doc_idx].item_id.clone()),
                score,
                rank: rank + 1, // 1-indexed
            })
            .collect()
    }

    /// Get the number of documents in the index.
    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    /// Get the number of unique terms in the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.inverted_index.len()
    }

    /// Get the average document length.
    pub fn avg_doc_length(&self) -> f32 {
        self.avg_doc_len
    }

    /// Get document frequency for a term.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.inverted_index
            .get(term)
            .map(|(df, _)| *df)
            .unwrap_or(0)
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Get index statistics for logging.
    pub fn stats(&self) -> LexicalIndexStats {
        LexicalIndexStats {
            num_documents: self.documents.len(),
            vocabulary_size: self.inverted_index.len(),
            total_tokens: self.total_tokens,
            avg_doc_length: self.avg_doc_len,
        }
    }
}

/// Statistics about the lexical index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LexicalIndexStats {
    /// Number of documents indexed.
    pub num_documents: usize,
    /// Number of unique terms in vocabulary.
    pub vocabulary_size: usize,
    /// Total tokens across all documents.
    pub total_tokens: usize,
    /// Average document length.
    pub avg_doc_length: f32,
}
