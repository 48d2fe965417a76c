//! The answer engine – orchestrator for all braq query handling.
//!
//! [`AnswerEngine`] is the single entry point the presentation layer calls:
//! `answer(query, conversation_id) -> Answer`. Internally it is decomposable
//! into the same building blocks programmatic callers use directly:
//! [`AnswerEngine::retrieve`], [`AnswerEngine::count`],
//! [`AnswerEngine::group_by`], and [`AnswerEngine::metrics`].
//!
//! ## Flow
//!
//! 1. Refresh the corpus snapshot if the item index drifted
//! 2. Resolve the query against the conversation context (anaphora)
//! 3. Route to an intent (rules first, model classifier as fallback)
//! 4. Answer on the exact path (aggregates over the full set) or the
//!    retrieval path (fusion + rerank + synthesis)
//! 5. Record the turn in the conversation context
//!
//! Expected states — empty corpus, empty filter result, ambiguous intent —
//! produce deterministic textual answers, never surfaced errors. Every
//! fallback taken is named in [`Answer::degradations`] and logged.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::aggregate::{self, GroupAttribute, GroupedCounts, IterationMetrics};
use crate::config::EngineConfig;
use crate::context::{ConversationContext, ConversationId, Resolution};
use crate::embedding::{EmbeddingBackend, QueryEmbeddingCache};
use crate::errors::{BraqError, Degradation};
use crate::filter::{ExtractedFilters, FilterExtractor, FilterPredicate};
use crate::index::ItemIndex;
use crate::item::ItemId;
use crate::llm::LanguageModel;
use crate::report;
use crate::reranker::RerankBackend;
use crate::retrieval::{run_retrieval, RetrievalOutcome};
use crate::router::{CountPlan, QueryIntent, QueryRouter};
use crate::snapshot::SnapshotStore;

/// Deterministic answer when the corpus has no items at all.
pub const NO_DATA_ANSWER: &str =
    "There is no indexed data yet. Run the ingestion pipeline and try again.";

/// Deterministic answer when retrieval finds nothing relevant.
pub const NO_RESULTS_ANSWER: &str =
    "I could not find any items relevant to that question in the backlog.";

/// User-facing message when synthesis fails; retrieved context is withheld
/// because unsynthesized excerpts are not a direct answer.
pub const DEGRADED_SYNTHESIS_ANSWER: &str =
    "I found relevant items but could not generate an answer right now. Please try again.";

// ============================================================================
// Answer
// ============================================================================

/// The result of answering one query.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Natural-language answer text.
    pub text: String,
    /// The intent the query routed to.
    pub intent: QueryIntent,
    /// Named fallback transitions taken while answering.
    pub degradations: Vec<Degradation>,
    /// Items the answer is grounded on, best first.
    pub sources: Vec<ItemId>,
}

impl Answer {
    fn new(text: impl Into<String>, intent: QueryIntent) -> Self {
        Self {
            text: text.into(),
            intent,
            degradations: Vec::new(),
            sources: Vec::new(),
        }
    }

    /// Whether any fallback path was taken.
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

// ============================================================================
// AnswerEngine
// ============================================================================

/// Orchestrates filter extraction, routing, retrieval, aggregation, and
/// conversational context over one shared corpus snapshot.
pub struct AnswerEngine {
    config: EngineConfig,
    index: Box<dyn ItemIndex>,
    embedder: Option<Box<dyn EmbeddingBackend>>,
    reranker: Option<Box<dyn RerankBackend>>,
    language_model: Option<Box<dyn LanguageModel>>,
    snapshots: SnapshotStore,
    extractor: FilterExtractor,
    router: QueryRouter,
    embedding_cache: Mutex<QueryEmbeddingCache>,
    conversations: Mutex<HashMap<ConversationId, ConversationContext>>,
}

impl AnswerEngine {
    /// Build an engine over an item index with no collaborators attached.
    ///
    /// Builds the initial snapshot eagerly so the first query pays no
    /// rebuild cost. Collaborators are attached with the `with_*` methods.
    pub fn new(config: EngineConfig, index: Box<dyn ItemIndex>) -> Result<Self, BraqError> {
        let snapshots = SnapshotStore::build(
            index.as_ref(),
            config.lexical.clone(),
            config.lexical_cache_dir.clone(),
        )?;
        let extractor = FilterExtractor::new(&config);
        let router = QueryRouter::new(&config.router);
        let embedding_cache = Mutex::new(QueryEmbeddingCache::new(
            config.retrieval.embedding_cache_capacity,
        ));

        Ok(Self {
            config,
            index,
            embedder: None,
            reranker: None,
            language_model: None,
            snapshots,
            extractor,
            router,
            embedding_cache,
            conversations: Mutex::new(HashMap::new()),
        })
    }

    /// Attach the embedding collaborator.
    pub fn with_embedder(mut self, embedder: Box<dyn EmbeddingBackend>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Attach the rerank collaborator.
    pub fn with_reranker(mut self, reranker: Box<dyn RerankBackend>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    /// Attach the language-model collaborator.
    pub fn with_language_model(mut self, model: Box<dyn LanguageModel>) -> Self {
        self.language_model = Some(model);
        self
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Entry point
    // -------------------------------------------------------------------------

    /// Answer a natural-language query within a conversation.
    pub fn answer(
        &self,
        query: &str,
        conversation_id: &ConversationId,
    ) -> Result<Answer, BraqError> {
        let start = std::time::Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Err(BraqError::InvalidArgument(
                "Query cannot be empty".to_string(),
            ));
        }

        // Pick up corpus changes before answering; readers keep whichever
        // snapshot they already hold.
        self.snapshots.refresh(self.index.as_ref())?;
        let snapshot = self.snapshots.current();

        if snapshot.is_empty() {
            tracing::warn!("Query against empty corpus");
            return Ok(Answer::new(NO_DATA_ANSWER, QueryIntent::Retrieve));
        }

        // Anaphora resolution against this conversation's context
        let resolution = {
            let conversations = self
                .conversations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            conversations
                .get(conversation_id)
                .map(|context| context.resolve(query))
                .unwrap_or(Resolution::PassThrough)
        };

        let mut answer = match resolution {
            Resolution::DetailLookup(item_id) => {
                tracing::debug!(item = %item_id, "Follow-up resolved; bypassing retrieval");
                self.answer_detail(&snapshot, query, &item_id)
            }
            Resolution::PassThrough => {
                let routed = self.router.route(query, self.language_model.as_deref());
                let mut answer = match routed.intent {
                    QueryIntent::Retrieve => self.answer_retrieve(&snapshot, query)?,
                    QueryIntent::CountOrCheck => self.answer_count(&snapshot, query),
                    // A classified Detail without a resolved item reference
                    // has nothing to look up; retrieval covers it.
                    QueryIntent::Detail => self.answer_retrieve(&snapshot, query)?,
                    QueryIntent::Compare => self.answer_compare(&snapshot, query),
                    QueryIntent::Report => self.answer_report(&snapshot, query),
                };
                if let Some(degradation) = routed.degradation {
                    answer.degradations.push(degradation);
                }
                answer
            }
        };
        answer.degradations.dedup();

        // Record the turn; the top source becomes the new anaphora target
        {
            let mut conversations = self
                .conversations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let context = conversations
                .entry(conversation_id.clone())
                .or_insert_with(|| ConversationContext::new(self.config.context.window_size));
            context.update(query, answer.sources.first().cloned());
        }

        tracing::info!(
            intent = ?answer.intent,
            degradations = ?answer.degradations,
            sources = answer.sources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered query"
        );

        Ok(answer)
    }

    // -------------------------------------------------------------------------
    // Programmatic surface
    // -------------------------------------------------------------------------

    /// Run the retrieval pipeline directly.
    pub fn retrieve(
        &self,
        query: &str,
        predicate: &FilterPredicate,
        top_k: usize,
    ) -> Result<RetrievalOutcome, BraqError> {
        let snapshot = self.snapshots.current();
        let mut cache = self
            .embedding_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        run_retrieval(
            &snapshot,
            self.index.as_ref(),
            self.embedder.as_deref(),
            &mut cache,
            self.reranker.as_deref(),
            &self.config.retrieval,
            query,
            predicate,
            top_k,
        )
    }

    /// Count items under a predicate, over the complete set.
    pub fn count(&self, predicate: &FilterPredicate) -> usize {
        aggregate::count(&self.snapshots.current(), predicate)
    }

    /// Group the filtered item set by an attribute.
    pub fn group_by(&self, attribute: GroupAttribute, predicate: &FilterPredicate) -> GroupedCounts {
        aggregate::group_by(&self.snapshots.current(), attribute, predicate)
    }

    /// Compute metrics for one iteration.
    pub fn metrics(&self, iteration: &str) -> IterationMetrics {
        aggregate::metrics(&self.snapshots.current(), iteration)
    }

    // -------------------------------------------------------------------------
    // Intent handlers
    // -------------------------------------------------------------------------

    fn answer_retrieve(
        &self,
        snapshot: &crate::snapshot::CorpusSnapshot,
        query: &str,
    ) -> Result<Answer, BraqError> {
        let ExtractedFilters { predicate, residual } = self.extractor.extract(query);

        let outcome = {
            let mut cache = self
                .embedding_cache
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            run_retrieval(
                snapshot,
                self.index.as_ref(),
                self.embedder.as_deref(),
                &mut cache,
                self.reranker.as_deref(),
                &self.config.retrieval,
                &residual,
                &predicate,
                self.config.retrieval.final_k,
            )?
        };

        if outcome.candidates.is_empty() {
            // A valid predicate matching nothing is a normal outcome
            let text = if predicate.is_empty() {
                NO_RESULTS_ANSWER.to_string()
            } else {
                format!("No {} were found.", predicate.describe())
            };
            let mut answer = Answer::new(text, QueryIntent::Retrieve);
            answer.degradations = outcome.degradations;
            return Ok(answer);
        }

        let context_block = report::retrieval_block(&outcome.candidates);
        let sources: Vec<ItemId> = outcome
            .candidates
            .iter()
            .map(|c| c.item.id.clone())
            .collect();

        let mut answer = match self.language_model.as_deref() {
            Some(model) => match model.synthesize_answer(query, &context_block) {
                Ok(text) => Answer::new(text, QueryIntent::Retrieve),
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis unavailable; returning degraded message");
                    let mut answer = Answer::new(DEGRADED_SYNTHESIS_ANSWER, QueryIntent::Retrieve);
                    answer.degradations.push(Degradation::Unsynthesized);
                    answer
                }
            },
            None => Answer::new(
                format!(
                    "Found {} relevant items:\n\n{}",
                    outcome.candidates.len(),
                    context_block
                ),
                QueryIntent::Retrieve,
            ),
        };

        answer.sources = sources;
        let mut degradations = outcome.degradations;
        degradations.append(&mut answer.degradations);
        answer.degradations = degradations;
        Ok(answer)
    }

    fn answer_count(&self, snapshot: &crate::snapshot::CorpusSnapshot, query: &str) -> Answer {
        match self.router.plan_count(query) {
            CountPlan::Manual { existence } => {
                let ExtractedFilters { predicate, .. } = self.extractor.extract(query);
                let total = aggregate::count(snapshot, &predicate);
                let described = predicate.describe();

                let text = if existence {
                    match total {
                        0 => format!("No, there are no {}.", described),
                        1 => format!("Yes, there is 1 {}.", singular(&described)),
                        n => format!("Yes, there are {} {}.", n, described),
                    }
                } else {
                    match total {
                        0 => format!("There are no {}.", described),
                        1 => format!("There is 1 {}.", singular(&described)),
                        n => format!("There are {} {}.", n, described),
                    }
                };

                tracing::debug!(total, predicate = ?predicate, "Manual count path");
                Answer::new(text, QueryIntent::CountOrCheck)
            }
            CountPlan::Delegate { attribute } => {
                // Exact per-group numbers first, model only for phrasing
                let grouped = aggregate::group_by(snapshot, attribute, &FilterPredicate::empty());
                let summary = grouped.to_summary_block();
                tracing::debug!(attribute = %attribute, groups = grouped.distinct(), "Delegated count path");

                match self.language_model.as_deref() {
                    Some(model) => match model.synthesize_answer(query, &summary) {
                        Ok(text) => Answer::new(text, QueryIntent::CountOrCheck),
                        Err(e) => {
                            tracing::warn!(error = %e, "Synthesis unavailable; returning summary table");
                            let mut answer = Answer::new(
                                format!(
                                    "There are {} distinct {} values.\n\n{}",
                                    grouped.distinct(),
                                    attribute,
                                    summary
                                ),
                                QueryIntent::CountOrCheck,
                            );
                            answer.degradations.push(Degradation::Unsynthesized);
                            answer
                        }
                    },
                    None => Answer::new(
                        format!(
                            "There are {} distinct {} values.\n\n{}",
                            grouped.distinct(),
                            attribute,
                            summary
                        ),
                        QueryIntent::CountOrCheck,
                    ),
                }
            }
        }
    }

    fn answer_detail(
        &self,
        snapshot: &crate::snapshot::CorpusSnapshot,
        query: &str,
        item_id: &ItemId,
    ) -> Answer {
        let item = match snapshot.get(item_id) {
            Some(item) => item,
            None => {
                // The referenced item left the corpus in a rebuild
                return Answer::new(
                    format!("Item {} is no longer in the corpus.", item_id),
                    QueryIntent::Detail,
                );
            }
        };

        let context_block = report::detail_block(item);
        let mut answer = match self.language_model.as_deref() {
            Some(model) => match model.synthesize_answer(query, &context_block) {
                Ok(text) => Answer::new(text, QueryIntent::Detail),
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis unavailable; returning detail block");
                    let mut answer = Answer::new(context_block.clone(), QueryIntent::Detail);
                    answer.degradations.push(Degradation::Unsynthesized);
                    answer
                }
            },
            None => Answer::new(context_block.clone(), QueryIntent::Detail),
        };

        answer.sources = vec![item_id.clone()];
        answer
    }

    fn answer_compare(&self, snapshot: &crate::snapshot::CorpusSnapshot, query: &str) -> Answer {
        let names: Vec<String> = self
            .router
            .iteration_mentions(query)
            .into_iter()
            .map(|n| self.config.iteration_name(n))
            .collect();

        let comparison = aggregate::compare(snapshot, &names);
        let block = report::comparison_block(&comparison);

        match self.language_model.as_deref() {
            Some(model) => match model.synthesize_answer(query, &block) {
                Ok(text) => Answer::new(text, QueryIntent::Compare),
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis unavailable; returning comparison table");
                    let mut answer = Answer::new(block, QueryIntent::Compare);
                    answer.degradations.push(Degradation::Unsynthesized);
                    answer
                }
            },
            None => Answer::new(block, QueryIntent::Compare),
        }
    }

    fn answer_report(&self, snapshot: &crate::snapshot::CorpusSnapshot, query: &str) -> Answer {
        let ExtractedFilters { predicate, .. } = self.extractor.extract(query);
        let iteration = predicate
            .iteration
            .or_else(|| self.config.corpus.current_iteration.clone());

        let iteration = match iteration {
            Some(iteration) => iteration,
            None => {
                return Answer::new(
                    "Specify an iteration for the report (for example: \"report for sprint 2\").",
                    QueryIntent::Report,
                )
            }
        };

        let metrics = aggregate::metrics(snapshot, &iteration);
        if metrics.total == 0 {
            return Answer::new(
                format!("No items were found in {}.", iteration),
                QueryIntent::Report,
            );
        }
        let block = report::metrics_block(&metrics);

        match self.language_model.as_deref() {
            Some(model) => match model.synthesize_answer(query, &block) {
                Ok(text) => Answer::new(text, QueryIntent::Report),
                Err(e) => {
                    tracing::warn!(error = %e, "Synthesis unavailable; returning metrics block");
                    let mut answer = Answer::new(block, QueryIntent::Report);
                    answer.degradations.push(Degradation::Unsynthesized);
                    answer
                }
            },
            None => Answer::new(block, QueryIntent::Report),
        }
    }
}

/// Strip the plural "s" from the noun in a described set for 1-counts
/// ("completed items in Sprint 3" -> "completed item in Sprint 3").
fn singular(described: &str) -> String {
    described.replacen("items", "item", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular() {
        assert_eq!(singular("items"), "item");
        assert_eq!(
            singular("completed items in Sprint 3"),
            "completed item in Sprint 3"
        );
    }
}
