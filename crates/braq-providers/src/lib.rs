//! # braq-providers
//!
//! HTTP clients for braq's external collaborators: embedding, rerank, and
//! the language model. Each client implements the corresponding trait from
//! `braq-core` over a provider-agnostic HTTP API (OpenAI-style embeddings
//! and chat endpoints, Cohere/Jina-style rerank endpoints).
//!
//! The engine is synchronous, so these clients use `reqwest::blocking`
//! with a per-request timeout and bounded fixed-backoff retries. A call
//! that exhausts its retries surfaces as
//! [`BraqError::CollaboratorUnavailable`]; the engine degrades from there.

pub mod embedding;
pub mod llm;
pub mod rerank;

pub use embedding::HttpEmbeddingClient;
pub use llm::HttpLanguageModel;
pub use rerank::HttpRerankClient;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use braq_core::BraqError;

// ============================================================================
// ProviderConfig
// ============================================================================

/// Connection settings for one collaborator endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Base URL of the provider, e.g. `https://api.openai.com`.
    pub base_url: String,

    /// Endpoint path, e.g. `/v1/embeddings`.
    pub path: String,

    /// Model identifier sent in the request body.
    pub model: String,

    /// Bearer token. Empty disables the Authorization header.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in milliseconds.
    /// Default: 10000
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum attempts per call (first try included).
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds.
    /// Default: 250
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    250
}

impl ProviderConfig {
    /// Full request URL.
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }

    /// Build a blocking client with this config's timeout.
    pub(crate) fn client(&self) -> Result<reqwest::blocking::Client, BraqError> {
        reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .build()
            .map_err(|e| BraqError::CollaboratorUnavailable {
                collaborator: "http".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })
    }
}

// ============================================================================
// Request plumbing
// ============================================================================

/// POST a JSON body, retrying transient failures with a fixed backoff.
///
/// Attempts are bounded by `config.max_attempts`; 4xx responses other than
/// 429 are not retried (the request itself is wrong, a retry cannot fix it).
pub(crate) fn post_json_with_retry(
    collaborator: &str,
    config: &ProviderConfig,
    body: &serde_json::Value,
) -> Result<serde_json::Value, BraqError> {
    let client = config.client()?;
    let url = config.url();
    let mut last_error = String::new();

    for attempt in 1..=config.max_attempts.max(1) {
        if attempt > 1 {
            std::thread::sleep(Duration::from_millis(config.retry_delay_ms));
            tracing::debug!(collaborator, attempt, "Retrying provider call");
        }

        let mut request = client.post(&url).json(body);
        if !config.api_key.is_empty() {
            request = request.bearer_auth(&config.api_key);
        }

        match request.send() {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response.json::<serde_json::Value>().map_err(|e| {
                        BraqError::CollaboratorUnavailable {
                            collaborator: collaborator.to_string(),
                            reason: format!("invalid JSON response: {}", e),
                        }
                    });
                }

                last_error = format!("HTTP {}", status);
                let retriable = status.is_server_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
                if !retriable {
                    break;
                }
            }
            Err(e) => {
                last_error = e.to_string();
            }
        }
    }

    Err(BraqError::CollaboratorUnavailable {
        collaborator: collaborator.to_string(),
        reason: format!(
            "{} after {} attempt(s)",
            last_error,
            config.max_attempts.max(1)
        ),
    })
}
