//! # braq-core
//!
//! **Backlog Retrieval & Answer Kernel** – core engine library.
//!
//! braq answers natural-language questions about a backlog of work items
//! (tasks organized into time-boxed iterations) by retrieving relevant
//! items from an indexed corpus and either computing an exact answer
//! in-process or handing enriched context to a language model for
//! phrasing. This crate is the retrieval and query-routing engine; the
//! ingestion pipeline, chat UI, and hosted model calls are external
//! collaborators consumed through narrow traits.
//!
//! ## Main Types
//!
//! - [`AnswerEngine`] – the single entry point (`answer`, `retrieve`, `count`, …)
//! - [`CorpusSnapshot`] / [`SnapshotStore`] – immutable corpus view with atomic swap
//! - [`FilterExtractor`] / [`FilterPredicate`] – metadata filters from free text
//! - [`QueryRouter`] – intent routing and the manual-vs-delegate count policy
//! - [`BraqError`] – domain-specific error type
//!
//! ## Modules
//!
//! - [`aggregate`] – deterministic counting/grouping over the full item set
//! - [`context`] – per-conversation follow-up resolution
//! - [`lexical`] – BM25 lexical model built per corpus snapshot
//! - [`retrieval`] – fusion & rerank pipeline
//! - [`engine`] – the orchestrator
//!
//! ## Example
//!
//! ```ignore
//! use braq_core::{AnswerEngine, ConversationId, EngineConfig, InMemoryItemIndex};
//!
//! let engine = AnswerEngine::new(EngineConfig::load_default()?, Box::new(index))?
//!     .with_embedder(embedder)
//!     .with_reranker(reranker)
//!     .with_language_model(model);
//!
//! let conversation = ConversationId::generate();
//! let answer = engine.answer("how many completed tasks in sprint 3", &conversation)?;
//! println!("{}", answer.text);
//! ```

// Modules
pub mod aggregate;
pub mod config;
pub mod context;
pub mod embedding;
pub mod engine;
pub mod errors;
pub mod filter;
pub mod index;
pub mod item;
pub mod lexical;
pub mod llm;
pub mod report;
pub mod reranker;
pub mod retrieval;
pub mod router;
pub mod snapshot;

// Re-exports for convenience
pub use aggregate::{compare, count, group_by, metrics, GroupAttribute, GroupedCounts, IterationMetrics};
pub use config::{
    ContextConfig, CorpusConfig, EngineConfig, RetrievalConfig, RouterConfig, BRAQ_HOME_DIR,
    CONFIG_FILENAME,
};
pub use context::{
    ConversationContext, ConversationId, Resolution, Turn, DEFAULT_WINDOW_SIZE,
};
pub use embedding::{cosine_similarity, EmbeddingBackend, QueryEmbeddingCache};
pub use engine::{
    Answer, AnswerEngine, DEGRADED_SYNTHESIS_ANSWER, NO_DATA_ANSWER, NO_RESULTS_ANSWER,
};
pub use errors::{BraqError, Degradation};
pub use filter::{ExtractedFilters, FilterExtractor, FilterPredicate};
pub use index::{CorpusFingerprint, InMemoryItemIndex, ItemIndex};
pub use item::{Item, ItemAttributes, ItemId, PriorityCategory, StatusCategory};
pub use lexical::{
    load_lexical_index, save_lexical_index, LexicalConfig, LexicalHit, LexicalIndex,
    LexicalIndexMeta, Tokenizer as LexicalTokenizer,
};
pub use llm::{IntentClassification, IntentLabel, LanguageModel};
pub use report::{comparison_block, detail_block, metrics_block, retrieval_block};
pub use reranker::RerankBackend;
pub use retrieval::{run_retrieval, RankedCandidate, RetrievalOutcome};
pub use router::{CountPlan, QueryIntent, QueryRouter, RoutedIntent};
pub use snapshot::{CorpusSnapshot, SnapshotStore};
