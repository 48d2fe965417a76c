//! Okapi BM25 scoring.
//!
//! ```text
//! score(D, Q) = Σ IDF(q_i) * (f(q_i, D) * (k1 + 1)) / (f(q_i, D) + k1 * (1 - b + b * |D| / avgdl))
//! ```
//!
//! Where:
//! - f(q_i, D) = frequency of query term q_i in document D
//! - |D| = document length (in tokens)
//! - avgdl = average document length in the corpus
//! - k1 = term frequency saturation parameter (default: 1.2)
//! - b = document length normalization parameter (default: 0.75)
//! - IDF = smoothed inverse document frequency

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Encode, Decode)]
pub struct Bm25Params {
    /// Term frequency saturation parameter. Default: 1.2
    pub k1: f32,

    /// Document length normalization parameter. Default: 0.75
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75 }
    }
}

/// Calculate the smoothed IDF for a term.
///
/// ```text
/// IDF(t) = ln((N - df(t) + 0.5) / (df(t) + 0.5) + 1)
/// ```
///
/// Always positive, finite for df in [0, N].
#[inline]
pub fn idf(num_docs: usize, doc_freq: usize) -> f32 {
    let n = num_docs as f32;
    let df = doc_freq as f32;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// BM25 score contribution of a single term to a document.
#[inline]
pub fn bm25_term_score(
    term_freq: usize,
    doc_len: usize,
    avg_doc_len: f32,
    idf_value: f32,
    params: &Bm25Params,
) -> f32 {
    let tf = term_freq as f32;
    let dl = doc_len as f32;
    let k1 = params.k1;
    let b = params.b;

    let numerator = tf * (k1 + 1.0);
    let denominator = tf + k1 * (1.0 - b + b * dl / avg_doc_len);

    idf_value * numerator / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idf_common_term() {
        // Term appears in most documents -> low IDF
        let idf_val = idf(1000, 900);
        assert!(idf_val < 0.5);
        assert!(idf_val > 0.0);
    }

    #[test]
    fn test_idf_rare_term() {
        let idf_val = idf(1000, 10);
        assert!(idf_val > 3.0);
    }

    #[test]
    fn test_idf_edge_cases() {
        // No documents contain the term
        let idf_zero = idf(1000, 0);
        assert!(idf_zero > 0.0);
        assert!(idf_zero.is_finite());

        // Every document contains the term; smoothing keeps it positive
        let idf_all = idf(1000, 1000);
        assert!(idf_all > 0.0);
    }

    #[test]
    fn test_length_normalization() {
        let params = Bm25Params::default();
        let idf_val = idf(100, 10);

        let score_short = bm25_term_score(3, 50, 100.0, idf_val, &params);
        let score_long = bm25_term_score(3, 200, 100.0, idf_val, &params);

        // A term in a shorter document is more significant
        assert!(score_short > score_long);
    }

    #[test]
    fn test_tf_saturation() {
        let params = Bm25Params::default();
        let idf_val = idf(100, 10);

        let score_1 = bm25_term_score(1, 100, 100.0, idf_val, &params);
        let score_5 = bm25_term_score(5, 100, 100.0, idf_val, &params);
        let score_50 = bm25_term_score(50, 100, 100.0, idf_val, &params);

        assert!(score_5 > score_1);
        assert!(score_50 > score_5);
        // The marginal gain shrinks (saturation)
        assert!((score_50 - score_5) / 45.0 < (score_5 - score_1) / 4.0);
    }

    #[test]
    fn test_no_length_normalization_when_b_zero() {
        let idf_val = idf(100, 10);
        let default_params = Bm25Params::default();
        let flat_params = Bm25Params { k1: 1.2, b: 0.0 };

        let score_default = bm25_term_score(3, 200, 100.0, idf_val, &default_params);
        let score_flat = bm25_term_score(3, 200, 100.0, idf_val, &flat_params);

        // Without normalization the long document is not penalized
        assert!(score_flat > score_default);
    }
}
