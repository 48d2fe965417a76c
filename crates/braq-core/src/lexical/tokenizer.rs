//! Unicode-aware tokenizer with stemming for the lexical model.
//!
//! Preprocessing for BM25 indexing of work-item text:
//! - Unicode word segmentation
//! - Case folding (lowercasing)
//! - Porter stemming (English)
//! - Stop word removal
//! - Minimum token length filtering

use bincode::{Decode, Encode};
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Tokenizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct TokenizerConfig {
    /// Apply Porter stemming to tokens.
    pub stemming: bool,
    /// Remove common stop words.
    pub remove_stopwords: bool,
    /// Minimum token length to include.
    pub min_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            stemming: true,
            remove_stopwords: true,
            min_token_length: 2,
        }
    }
}

/// Unicode-aware tokenizer with optional stemming.
pub struct Tokenizer {
    config: TokenizerConfig,
    stemmer: Option<Stemmer>,
    stopwords: HashSet<&'static str>,
}

impl Tokenizer {
    /// Create a new tokenizer with the given configuration.
    pub fn new(config: TokenizerConfig) -> Self {
        let stemmer = if config.stemming {
            Some(Stemmer::create(Algorithm::English))
        } else {
            None
        };

        Self {
            config,
            stemmer,
            stopwords: Self::default_stopwords(),
        }
    }

    /// Tokenize text into a vector of processed tokens.
    ///
    /// Processing steps:
    /// 1. Unicode word segmentation
    /// 2. Lowercase normalization
    /// 3. Keep tokens containing at least one alphabetic character
    ///    (task ids like "T42" survive, bare numbers do not)
    /// 4. Minimum length filtering
    /// 5. Stop word removal (if enabled)
    /// 6. Porter stemming (if enabled)
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .filter_map(|word| self.process_token(word))
            .collect()
    }

    /// Process a single token through the pipeline.
    fn process_token(&self, word: &str) -> Option<String> {
        let lower = word.to_lowercase();

        if !lower.chars().any(|c| c.is_alphabetic()) {
            return None;
        }

        if lower.len() < self.config.min_token_length {
            return None;
        }

        if self.config.remove_stopwords && self.stopwords.contains(lower.as_str()) {
            return None;
        }

        let token = if let Some(ref stemmer) = self.stemmer {
            stemmer.stem(&lower).to_string()
        } else {
            lower
        };

        // Some stems fall below the length floor
        if token.len() < self.config.min_token_length {
            return None;
        }

        Some(token)
    }

    /// Default English stop words for backlog search.
    ///
    /// Curated for task text: common function words are dropped, but words
    /// that carry meaning in backlog queries ("blocked", "done", "open")
    /// are deliberately absent from this list so they keep scoring.
    fn default_stopwords() -> HashSet<&'static str> {
        [
            // Articles
            "a", "an", "the", // Prepositions
            "in", "on", "at", "to", "of", "with", "by", "from", "as", "into", "through", "during",
            "before", "after", "above", "below", "between", "under", "over", "out", "up", "down",
            "off", // Conjunctions
            "and", "or", "but", "nor", "so", "yet", // Pronouns
            "i", "you", "he", "she", "it", "we", "they", "me", "him", "her", "us", "them", "my",
            "your", "his", "its", "our", "their", "this", "that", "these", "those", "which", "who",
            "whom", "whose", "what", "where", "when", "how", "why",
            // Common verbs
            "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "having",
            "does", "did", "doing", "will", "would", "could", "should", "may", "might", "must",
            "shall", "can", "need", "dare", "ought", // Other common words
            "not", "no", "yes", "all", "any", "both", "each", "few", "more", "most", "other",
            "some", "such", "than", "too", "very", "just", "also", "only", "own", "same", "then",
            "there", "here", "now", "always", "never", "ever", // Question/relative
            "about", "whether",
        ]
        .into_iter()
        .collect()
    }

    /// Get the number of stop words.
    #[cfg(test)]
    pub fn stopword_count(&self) -> usize {
        self.stopwords.len()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(TokenizerConfig::default())
    }
}
