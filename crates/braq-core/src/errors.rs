//! Error types for braq-core.

use std::path::PathBuf;

use thiserror::Error;

/// Domain-specific errors for braq operations.
///
/// Expected states (an empty filter result, an intent the router is unsure
/// about) are *not* errors: they are modeled as normal outcomes with
/// deterministic textual responses. Only genuinely failed operations land
/// here.
#[derive(Error, Debug)]
pub enum BraqError {
    /// No items are indexed; every query gets the deterministic "no data" answer.
    #[error("Corpus is empty: no items indexed. Run the ingestion pipeline first.")]
    EmptyCorpus,

    /// A collaborator call (embedding, rerank, language model, item index)
    /// failed or timed out after its bounded retries.
    #[error("Collaborator `{collaborator}` unavailable: {reason}")]
    CollaboratorUnavailable {
        /// Which collaborator failed (`embedding`, `rerank`, `language-model`, `item-index`).
        collaborator: String,
        /// Description of the failure.
        reason: String,
    },

    /// An item id was referenced (detail lookup) but is not in the snapshot.
    #[error("Item `{0}` not found in the current corpus snapshot.")]
    ItemNotFound(String),

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// Configuration file exists but cannot be read or parsed.
    #[error("Config invalid at `{path}`: {message}")]
    InvalidConfigFile {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// Invalid argument provided to an engine entry point.
    #[error("{0}")]
    InvalidArgument(String),

    /// Lexical index store I/O error.
    #[error("Lexical store I/O error at `{path}`: {message}")]
    LexicalStoreIo {
        /// Path to the store file.
        path: PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// Lexical index store parse/serialization error.
    #[error("Lexical store parse error at `{path}`: {message}")]
    LexicalStoreParse {
        /// Path to the store file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Corpus snapshot could not be built from the item index.
    #[error("Snapshot build failed: {0}")]
    SnapshotBuildFailed(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wrapped generic error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Named fallback transitions taken while answering a query.
///
/// Every degraded path is recorded here and logged, so a partial answer is
/// always distinguishable from a complete one even though the user-facing
/// text stays natural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Degradation {
    /// Embedding collaborator unavailable; ranking fell back to lexical-only.
    LexicalOnly,
    /// Rerank collaborator unavailable; ordering fell back to fused scores.
    FusedOrder,
    /// Intent classifier unavailable or under-confident; rule-based default
    /// intent was used.
    RuleBasedIntent,
    /// Synthesis collaborator unavailable; a deterministic rendering was
    /// returned instead of a synthesized answer.
    Unsynthesized,
}

impl std::fmt::Display for Degradation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LexicalOnly => "lexical_only",
            Self::FusedOrder => "fused_order",
            Self::RuleBasedIntent => "rule_based_intent",
            Self::Unsynthesized => "unsynthesized",
        };
        write!(f, "{}", s)
    }
}
