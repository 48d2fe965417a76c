//! Rerank collaborator abstraction.
//!
//! The reranker scores (query, item-text) pairs with a pairwise relevance
//! model and is applied only to the top fused slice. When the collaborator
//! is unavailable the pipeline keeps the fused ordering — an explicit,
//! logged degradation rather than a failure.

use crate::errors::BraqError;

/// Trait for the external rerank collaborator.
pub trait RerankBackend: Send + Sync {
    /// Score a batch of documents against a query.
    ///
    /// Returns one relevance score per document, in input order.
    fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, BraqError>;

    /// Rerank documents and return (input index, score) pairs sorted by
    /// score descending, input index ascending as the tie-break.
    fn rerank(&self, query: &str, documents: &[String]) -> Result<Vec<(usize, f32)>, BraqError> {
        let scores = self.score(query, documents)?;
        let mut indexed: Vec<_> = scores.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Ok(indexed)
    }
}
