//! HTTP embedding client (OpenAI-style `/v1/embeddings` contract).

use braq_core::{BraqError, EmbeddingBackend};

use crate::{post_json_with_retry, ProviderConfig};

/// Embedding collaborator over an OpenAI-style embeddings endpoint.
///
/// Request: `{ "model": ..., "input": [text] }`
/// Response: `{ "data": [ { "embedding": [f32, ...] } ] }`
pub struct HttpEmbeddingClient {
    config: ProviderConfig,
    dimension: usize,
}

impl HttpEmbeddingClient {
    /// Create a client. `dimension` must match what the model produces;
    /// it is also what the client validates responses against.
    pub fn new(config: ProviderConfig, dimension: usize) -> Self {
        Self { config, dimension }
    }
}

impl EmbeddingBackend for HttpEmbeddingClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>, BraqError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "input": [text],
        });

        let json = post_json_with_retry("embedding", &self.config, &body)?;
        let embedding = parse_embedding_response(&json)?;

        if embedding.len() != self.dimension {
            return Err(BraqError::CollaboratorUnavailable {
                collaborator: "embedding".to_string(),
                reason: format!(
                    "dimension mismatch: expected {}, got {}",
                    self.dimension,
                    embedding.len()
                ),
            });
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Extract the first embedding vector from a response body.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<f32>, BraqError> {
    let invalid = |reason: &str| BraqError::CollaboratorUnavailable {
        collaborator: "embedding".to_string(),
        reason: reason.to_string(),
    };

    let first = json
        .get("data")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| invalid("response missing data array"))?;

    let values = first
        .get("embedding")
        .and_then(|v| v.as_array())
        .ok_or_else(|| invalid("response missing embedding array"))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| invalid("embedding contains non-numeric value"))
        })
        .collect()
}
