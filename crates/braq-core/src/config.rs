//! Engine configuration: retrieval weights, routing thresholds, and the
//! corpus facts (current iteration, assignee roster) the filter extractor
//! resolves against.
//!
//! Loaded from `~/.braq/config.yaml` (or an explicit path), falling back to
//! defaults when the file is absent. Validation returns hard errors for
//! values that would break the pipeline and warnings for questionable ones.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::BraqError;
use crate::lexical::LexicalConfig;

/// Config filename under the braq home directory.
pub const CONFIG_FILENAME: &str = "config.yaml";

/// Directory name under the user's home directory.
pub const BRAQ_HOME_DIR: &str = ".braq";

// ============================================================================
// RetrievalConfig
// ============================================================================

/// Fusion and rerank parameters for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalConfig {
    /// Weight for the normalized semantic score in fusion.
    /// Default: 0.7
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight for the normalized lexical score in fusion.
    /// Default: 0.3
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f32,

    /// Number of semantic candidates kept before fusion.
    /// Default: 20
    #[serde(default = "default_stage_top_k")]
    pub semantic_top_k: usize,

    /// Number of lexical candidates kept before fusion.
    /// Default: 20
    #[serde(default = "default_stage_top_k")]
    pub lexical_top_k: usize,

    /// Size of the fused slice handed to the reranker.
    /// Default: 20
    #[serde(default = "default_stage_top_k")]
    pub rerank_slice: usize,

    /// Number of items returned to the caller.
    /// Default: 6
    #[serde(default = "default_final_k")]
    pub final_k: usize,

    /// Capacity of the query-embedding LRU cache.
    /// Default: 128
    #[serde(default = "default_embedding_cache_capacity")]
    pub embedding_cache_capacity: usize,
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_lexical_weight() -> f32 {
    0.3
}

fn default_stage_top_k() -> usize {
    20
}

fn default_final_k() -> usize {
    6
}

fn default_embedding_cache_capacity() -> usize {
    128
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            lexical_weight: default_lexical_weight(),
            semantic_top_k: default_stage_top_k(),
            lexical_top_k: default_stage_top_k(),
            rerank_slice: default_stage_top_k(),
            final_k: default_final_k(),
            embedding_cache_capacity: default_embedding_cache_capacity(),
        }
    }
}

impl RetrievalConfig {
    /// Validate retrieval parameters.
    ///
    /// # Errors
    /// - Negative weights
    /// - `final_k` of 0
    /// - A stage top-k of 0
    ///
    /// # Warnings
    /// - Weights not summing to 1.0 (still valid; fusion is a plain
    ///   weighted sum, not a convex combination requirement)
    pub fn validate(&self) -> Result<Vec<String>, BraqError> {
        let mut warnings = Vec::new();

        if self.semantic_weight < 0.0 {
            return Err(BraqError::InvalidConfiguration {
                message: "retrieval.semanticWeight cannot be negative".to_string(),
                hint: "Set semanticWeight to 0.0 or higher (recommended: 0.7)".to_string(),
            });
        }
        if self.lexical_weight < 0.0 {
            return Err(BraqError::InvalidConfiguration {
                message: "retrieval.lexicalWeight cannot be negative".to_string(),
                hint: "Set lexicalWeight to 0.0 or higher (recommended: 0.3)".to_string(),
            });
        }
        if self.final_k == 0 {
            return Err(BraqError::InvalidConfiguration {
                message: "retrieval.finalK cannot be 0".to_string(),
                hint: "Set finalK to at least 1 (recommended: 6)".to_string(),
            });
        }
        if self.semantic_top_k == 0 || self.lexical_top_k == 0 || self.rerank_slice == 0 {
            return Err(BraqError::InvalidConfiguration {
                message: "retrieval stage top-k values cannot be 0".to_string(),
                hint: "Set semanticTopK, lexicalTopK and rerankSlice to at least 1 (recommended: 20)"
                    .to_string(),
            });
        }

        let weight_sum = self.semantic_weight + self.lexical_weight;
        if (weight_sum - 1.0).abs() > 0.01 {
            warnings.push(format!(
                "retrieval weights sum to {} (semanticWeight={}, lexicalWeight={}); \
                 weights summing to 1.0 are recommended",
                weight_sum, self.semantic_weight, self.lexical_weight
            ));
        }

        if self.final_k > self.rerank_slice {
            warnings.push(format!(
                "retrieval.finalK={} exceeds rerankSlice={}; results beyond the slice keep fused order",
                self.final_k, self.rerank_slice
            ));
        }

        Ok(warnings)
    }
}

// ============================================================================
// RouterConfig
// ============================================================================

/// Intent routing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterConfig {
    /// Minimum confidence at which a model-classified intent is accepted.
    /// Below this the router defaults to retrieval.
    /// Default: 0.6
    #[serde(default = "default_intent_confidence_threshold")]
    pub intent_confidence_threshold: f32,
}

fn default_intent_confidence_threshold() -> f32 {
    0.6
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            intent_confidence_threshold: default_intent_confidence_threshold(),
        }
    }
}

impl RouterConfig {
    /// Validate router parameters.
    pub fn validate(&self) -> Result<Vec<String>, BraqError> {
        if !(0.0..=1.0).contains(&self.intent_confidence_threshold) {
            return Err(BraqError::InvalidConfiguration {
                message: format!(
                    "router.intentConfidenceThreshold={} is out of range",
                    self.intent_confidence_threshold
                ),
                hint: "Set intentConfidenceThreshold between 0.0 and 1.0 (recommended: 0.6)"
                    .to_string(),
            });
        }
        Ok(Vec::new())
    }
}

// ============================================================================
// ContextConfig
// ============================================================================

/// Conversational context parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextConfig {
    /// Maximum number of remembered turns per conversation.
    /// Default: 5
    #[serde(default = "default_context_window")]
    pub window_size: usize,
}

fn default_context_window() -> usize {
    5
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_size: default_context_window(),
        }
    }
}

// ============================================================================
// CorpusConfig
// ============================================================================

/// Corpus facts the filter extractor resolves free-text references against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusConfig {
    /// Name of the currently active iteration, e.g. "Sprint 3".
    /// Relative references ("current sprint", "last sprint") resolve
    /// against this; when unset those rules do not fire.
    #[serde(default)]
    pub current_iteration: Option<String>,

    /// Known assignee names. Only names on this roster are ever extracted
    /// as assignee filters.
    #[serde(default)]
    pub roster: Vec<String>,

    /// Template used to render iteration names from a number, e.g.
    /// "Sprint {n}". Used when resolving "sprint 3" to the stored
    /// iteration name.
    #[serde(default = "default_iteration_template")]
    pub iteration_template: String,
}

fn default_iteration_template() -> String {
    "Sprint {n}".to_string()
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            current_iteration: None,
            roster: Vec::new(),
            iteration_template: default_iteration_template(),
        }
    }
}

// ============================================================================
// EngineConfig
// ============================================================================

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Fusion and rerank parameters.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Intent routing parameters.
    #[serde(default)]
    pub router: RouterConfig,

    /// Conversational context parameters.
    #[serde(default)]
    pub context: ContextConfig,

    /// Corpus facts (current iteration, roster).
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Lexical model (BM25) parameters.
    #[serde(default)]
    pub lexical: LexicalConfig,

    /// Optional directory for the lexical-index disk cache.
    /// When unset the lexical model is rebuilt in memory on every start.
    #[serde(default)]
    pub lexical_cache_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Load the configuration from the default location (`~/.braq/config.yaml`).
    ///
    /// If the file does not exist, returns a default configuration so the
    /// engine works out of the box.
    ///
    /// # Errors
    ///
    /// Returns [`BraqError::InvalidConfigFile`] if the file exists but cannot
    /// be parsed, or a validation error for invalid values.
    pub fn load_default() -> Result<Self, BraqError> {
        match Self::default_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("Could not determine home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    /// Load the configuration from a specific path.
    ///
    /// If the file does not exist, returns a default configuration.
    pub fn from_path(path: &Path) -> Result<Self, BraqError> {
        if !path.exists() {
            tracing::debug!("Config not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| BraqError::InvalidConfigFile {
            path: path.to_path_buf(),
            message: format!("Failed to read: {}", e),
        })?;

        let config: Self =
            serde_yaml::from_str(&content).map_err(|e| BraqError::InvalidConfigFile {
                path: path.to_path_buf(),
                message: format!("Failed to parse: {}", e),
            })?;

        let warnings = config.validate()?;
        for warning in warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(config)
    }

    /// Get the default braq config directory (`~/.braq`).
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(BRAQ_HOME_DIR))
    }

    /// Get the default config file path (`~/.braq/config.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        Self::default_dir().map(|d| d.join(CONFIG_FILENAME))
    }

    /// Validate all sections, collecting warnings.
    pub fn validate(&self) -> Result<Vec<String>, BraqError> {
        let mut warnings = self.retrieval.validate()?;
        warnings.extend(self.router.validate()?);

        if self.context.window_size == 0 {
            return Err(BraqError::InvalidConfiguration {
                message: "context.windowSize cannot be 0".to_string(),
                hint: "Set windowSize to at least 1 (recommended: 5)".to_string(),
            });
        }

        if !self.corpus.iteration_template.contains("{n}") {
            warnings.push(format!(
                "corpus.iterationTemplate `{}` has no {{n}} placeholder; numeric sprint references will not resolve",
                self.corpus.iteration_template
            ));
        }

        Ok(warnings)
    }

    /// Render an iteration name from a number using the configured template.
    pub fn iteration_name(&self, n: u32) -> String {
        self.corpus
            .iteration_template
            .replace("{n}", &n.to_string())
    }
}
