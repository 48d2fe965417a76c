//! HTTP rerank client (Cohere/Jina-style rerank contract).

use braq_core::{BraqError, RerankBackend};

use crate::{post_json_with_retry, ProviderConfig};

/// Rerank collaborator over a rerank endpoint.
///
/// Request: `{ "model": ..., "query": ..., "documents": [...] }`
/// Response: `{ "results": [ { "index": n, "relevance_score": f } ] }`
/// (some providers use `data` and `score`; both spellings are accepted).
pub struct HttpRerankClient {
    config: ProviderConfig,
}

impl HttpRerankClient {
    /// Create a client.
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }
}

impl RerankBackend for HttpRerankClient {
    fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, BraqError> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.config.model,
            "query": query,
            "documents": documents,
        });

        let json = post_json_with_retry("rerank", &self.config, &body)?;
        parse_rerank_response(&json, documents.len())
    }
}

/// Align returned scores to input order by the `index` field.
fn parse_rerank_response(
    json: &serde_json::Value,
    doc_count: usize,
) -> Result<Vec<f32>, BraqError> {
    let invalid = |reason: String| BraqError::CollaboratorUnavailable {
        collaborator: "rerank".to_string(),
        reason,
    };

    let mut scores = vec![0.0f32; doc_count];
    let results = json
        .get("results")
        .or_else(|| json.get("data"))
        .and_then(|v| v.as_array())
        .ok_or_else(|| invalid("response missing results array".to_string()))?;

    for item in results {
        let index = item
            .get("index")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| invalid("result missing index".to_string()))? as usize;
        let score = item
            .get("relevance_score")
            .or_else(|| item.get("score"))
            .and_then(|v| v.as_f64())
            .ok_or_else(|| invalid("result missing score".to_string()))? as f32;
        if index < scores.len() {
            scores[index] = score;
        }
    }

    Ok(scores)
}
