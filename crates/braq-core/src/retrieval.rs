//! Fusion & rerank retrieval pipeline.
//!
//! Turns a (residual query, filter predicate) pair into an ordered list of
//! ranked candidates with explanatory scores:
//!
//! 1. Bound the search space with the filtered candidate id set from the
//!    Item Index — before any scoring, so excluded items cannot re-enter
//!    via semantic top-K truncation.
//! 2. Score the candidates semantically (embedding + vector query) and
//!    lexically (BM25 over the same set); keep the top slice of each.
//! 3. Min-max normalize each list independently over the candidate pool,
//!    then fuse: `fused = semantic_weight * sem + lexical_weight * lex`.
//!    An item present in only one list scores 0 for the missing component —
//!    it is not excluded.
//! 4. Rerank the top fused slice with the pairwise relevance collaborator;
//!    fused order is the fallback when the collaborator is unavailable.
//! 5. Return the top `top_k` items with their score breakdown.
//!
//! Every stage is deterministic for fixed inputs: all sorts tie-break on
//! item id, so retrieval is idempotent against an unchanged snapshot.

use std::collections::{HashMap, HashSet};

use crate::config::RetrievalConfig;
use crate::embedding::{EmbeddingBackend, QueryEmbeddingCache};
use crate::errors::{BraqError, Degradation};
use crate::filter::FilterPredicate;
use crate::index::ItemIndex;
use crate::item::{Item, ItemId};
use crate::reranker::RerankBackend;
use crate::snapshot::CorpusSnapshot;

// ============================================================================
// RankedCandidate
// ============================================================================

/// One retrieved item with its explanatory scores.
///
/// Normalized component scores are `None` when the item did not appear in
/// that component's top list (it contributed 0 to fusion).
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    /// The retrieved item.
    pub item: Item,
    /// Normalized semantic score in [0, 1].
    pub semantic_score: Option<f32>,
    /// Normalized lexical score in [0, 1].
    pub lexical_score: Option<f32>,
    /// Weighted fusion of the normalized components.
    pub fused_score: f32,
    /// Reranker relevance score, when reranking ran.
    pub rerank_score: Option<f32>,
}

/// Result of one retrieval call.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
    /// Ranked candidates, best first. Empty when the filter admits nothing.
    pub candidates: Vec<RankedCandidate>,
    /// Fallback transitions taken during this call.
    pub degradations: Vec<Degradation>,
    /// Size of the filtered candidate pool the scores were computed over.
    pub candidate_pool: usize,
}

impl RetrievalOutcome {
    fn empty() -> Self {
        Self::default()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the retrieval pipeline.
///
/// `query` is the residual query text (filter phrases already stripped);
/// an empty residual makes this a filter-only listing that skips scoring
/// and preserves Item Index order.
///
/// # Errors
///
/// Only infrastructure failures (item index I/O) are errors. Collaborator
/// failures degrade: embedding loss falls back to lexical-only ranking,
/// rerank loss falls back to fused ordering, both recorded in
/// [`RetrievalOutcome::degradations`].
#[allow(clippy::too_many_arguments)]
pub fn run_retrieval(
    snapshot: &CorpusSnapshot,
    index: &dyn ItemIndex,
    embedder: Option<&dyn EmbeddingBackend>,
    cache: &mut QueryEmbeddingCache,
    reranker: Option<&dyn RerankBackend>,
    config: &RetrievalConfig,
    query: &str,
    predicate: &FilterPredicate,
    top_k: usize,
) -> Result<RetrievalOutcome, BraqError> {
    let start = std::time::Instant::now();

    // 1. Candidate set, bounded by the filter before any scoring
    let candidates = index.get_by_filter(predicate, None)?;
    if candidates.is_empty() {
        tracing::debug!(predicate = ?predicate, "Filter admitted no candidates");
        return Ok(RetrievalOutcome::empty());
    }
    let candidate_pool = candidates.len();
    let candidate_ids: Vec<ItemId> = candidates.iter().map(|item| item.id.clone()).collect();
    let candidate_id_set: HashSet<ItemId> = candidate_ids.iter().cloned().collect();
    let mut items_by_id: HashMap<ItemId, Item> = candidates
        .into_iter()
        .map(|item| (item.id.clone(), item))
        .collect();

    // Filter-only query: nothing to score, keep Item Index order
    let query = query.trim();
    if query.is_empty() {
        let candidates = candidate_ids
            .into_iter()
            .take(top_k)
            .filter_map(|id| items_by_id.remove(&id))
            .map(|item| RankedCandidate {
                item,
                semantic_score: None,
                lexical_score: None,
                fused_score: 0.0,
                rerank_score: None,
            })
            .collect();
        return Ok(RetrievalOutcome {
            candidates,
            degradations: Vec::new(),
            candidate_pool,
        });
    }

    let mut degradations = Vec::new();

    // 2. Semantic scores over the candidate set
    let semantic_hits = match semantic_scores(
        embedder,
        cache,
        index,
        query,
        &candidate_ids,
        config.semantic_top_k,
    ) {
        Ok(hits) => hits,
        Err(e) => {
            tracing::warn!(error = %e, "Embedding unavailable; falling back to lexical-only ranking");
            degradations.push(Degradation::LexicalOnly);
            Vec::new()
        }
    };

    // 3. Lexical scores over the same candidate set
    let lexical_hits: Vec<(ItemId, f32)> = snapshot
        .lexical()
        .search_within(query, &candidate_id_set, config.lexical_top_k)
        .into_iter()
        .map(|hit| (hit.item_id, hit.score))
        .collect();

    if semantic_hits.is_empty() && lexical_hits.is_empty() {
        tracing::debug!("Neither scorer produced candidates for query");
        return Ok(RetrievalOutcome {
            candidates: Vec::new(),
            degradations,
            candidate_pool,
        });
    }

    // 4. Normalize each list independently, then fuse
    let semantic_norm = min_max_normalize(&semantic_hits);
    let lexical_norm = min_max_normalize(&lexical_hits);

    let mut fused_ids: Vec<ItemId> = semantic_norm
        .keys()
        .chain(lexical_norm.keys())
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    fused_ids.sort();

    let mut fused: Vec<RankedCandidate> = fused_ids
        .into_iter()
        .filter_map(|id| {
            let semantic = semantic_norm.get(&id).copied();
            let lexical = lexical_norm.get(&id).copied();
            let fused_score = config.semantic_weight * semantic.unwrap_or(0.0)
                + config.lexical_weight * lexical.unwrap_or(0.0);
            items_by_id.get(&id).map(|item| RankedCandidate {
                item: item.clone(),
                semantic_score: semantic,
                lexical_score: lexical,
                fused_score,
                rerank_score: None,
            })
        })
        .collect();

    fused.sort_by(|a, b| {
        b.fused_score
            .partial_cmp(&a.fused_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.item.id.cmp(&b.item.id))
    });
    fused.truncate(config.rerank_slice);

    // 5. Rerank the fused slice; fused order is the fallback
    match reranker {
        Some(reranker) => {
            if let Err(e) = apply_rerank(&mut fused, reranker, query) {
                tracing::warn!(error = %e, "Reranker unavailable; keeping fused order");
                degradations.push(Degradation::FusedOrder);
            }
        }
        None => {
            tracing::debug!("No reranker configured; keeping fused order");
        }
    }

    fused.truncate(top_k);

    tracing::debug!(
        pool = candidate_pool,
        returned = fused.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Retrieval complete"
    );

    Ok(RetrievalOutcome {
        candidates: fused,
        degradations,
        candidate_pool,
    })
}

/// Embed the query (through the cache) and run the vector query.
fn semantic_scores(
    embedder: Option<&dyn EmbeddingBackend>,
    cache: &mut QueryEmbeddingCache,
    index: &dyn ItemIndex,
    query: &str,
    candidate_ids: &[ItemId],
    top_k: usize,
) -> Result<Vec<(ItemId, f32)>, BraqError> {
    let embedder = match embedder {
        Some(embedder) => embedder,
        None => {
            return Err(BraqError::CollaboratorUnavailable {
                collaborator: "embedding".to_string(),
                reason: "no embedding backend configured".to_string(),
            })
        }
    };

    let embedding = match cache.get(query) {
        Some(hit) => hit,
        None => {
            let embedding = embedder.embed(query)?;
            cache.insert(query, embedding.clone());
            embedding
        }
    };

    index.vector_query(&embedding, candidate_ids, top_k)
}

/// Reorder candidates by reranker score, fused score then id as tie-breaks.
fn apply_rerank(
    candidates: &mut [RankedCandidate],
    reranker: &dyn RerankBackend,
    query: &str,
) -> Result<(), BraqError> {
    if candidates.is_empty() {
        return Ok(());
    }

    let documents: Vec<String> = candidates
        .iter()
        .map(|c| c.item.content.clone())
        .collect();
    let scores = reranker.score(query, &documents)?;

    if scores.len() != candidates.len() {
        return Err(BraqError::CollaboratorUnavailable {
            collaborator: "rerank".to_string(),
            reason: format!(
                "score count mismatch: {} scores for {} documents",
                scores.len(),
                candidates.len()
            ),
        });
    }

    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.rerank_score = Some(score);
    }

    candidates.sort_by(|a, b| {
        let a_score = a.rerank_score.unwrap_or(f32::MIN);
        let b_score = b.rerank_score.unwrap_or(f32::MIN);
        b_score
            .partial_cmp(&a_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.fused_score
                    .partial_cmp(&a.fused_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.item.id.cmp(&b.item.id))
    });

    Ok(())
}

/// Min-max normalize a score list to [0, 1] over its own pool.
///
/// A degenerate pool (all scores equal, including a single entry) maps to
/// 1.0 when the shared score is positive — each member is
/// indistinguishably the best in its list — and to 0.0 when the shared
/// score carries no signal at all.
fn min_max_normalize(hits: &[(ItemId, f32)]) -> HashMap<ItemId, f32> {
    if hits.is_empty() {
        return HashMap::new();
    }

    let min = hits.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = hits
        .iter()
        .map(|(_, s)| *s)
        .fold(f32::NEG_INFINITY, f32::max);

    hits.iter()
        .map(|(id, score)| {
            let normalized = if max > min {
                (score - min) / (max - min)
            } else if max > 0.0 {
                1.0
            } else {
                0.0
            };
            (id.clone(), normalized)
        })
        .collect()
}
