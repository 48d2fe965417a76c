//! HTTP language-model client (OpenAI-style chat-completions contract).
//!
//! Implements both collaborator calls the engine makes:
//! - intent classification, constrained to a JSON reply
//! - answer synthesis from an engine-assembled context block

use braq_core::{BraqError, IntentClassification, IntentLabel, LanguageModel};

use crate::{post_json_with_retry, ProviderConfig};

/// System instructions for answer synthesis.
const SYNTHESIS_SYSTEM: &str = "You are a concise assistant for agile backlog questions. \
    Use only the information in the provided context. If something is not in the context, \
    say so explicitly instead of guessing. Answer in a single clear paragraph.";

/// Classification prompt template. `{query}` is substituted.
const CLASSIFY_PROMPT: &str = "You are an intent classifier for a task-management assistant.\n\
    \n\
    Classify the question into exactly ONE of these categories:\n\
    - RETRIEVE: general question answered by searching task text\n\
    - COUNT_OR_CHECK: asks for a quantity or whether something exists\n\
    - DETAIL: asks about one specific task\n\
    - COMPARE: asks to compare sprints or groups\n\
    - REPORT: asks for a report or summary\n\
    \n\
    Question: {query}\n\
    \n\
    Reply with ONLY valid JSON: {\"intent\": \"<category>\", \"confidence\": <0.0-1.0>}";

/// Language-model collaborator over a chat-completions endpoint.
pub struct HttpLanguageModel {
    config: ProviderConfig,
    /// Cap on synthesized answer length, in model tokens.
    max_tokens: u32,
}

impl HttpLanguageModel {
    /// Create a client with the default answer length cap.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            max_tokens: 400,
        }
    }

    /// Override the answer length cap.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Result<String, BraqError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "max_tokens": max_tokens,
            "temperature": 0.0,
        });

        let json = post_json_with_retry("language-model", &self.config, &body)?;
        parse_chat_response(&json)
    }
}

impl LanguageModel for HttpLanguageModel {
    fn classify_intent(&self, query: &str) -> Result<IntentClassification, BraqError> {
        let prompt = CLASSIFY_PROMPT.replace("{query}", query);
        let content = self.chat(
            "You are an expert intent classifier. Reply with valid JSON only.",
            &prompt,
            120,
        )?;
        parse_classification(&content)
    }

    fn synthesize_answer(&self, query: &str, context_block: &str) -> Result<String, BraqError> {
        let user = format!(
            "Context:\n{}\n\nQuestion: {}\n\nAnswer using only the context above.",
            context_block, query
        );
        self.chat(SYNTHESIS_SYSTEM, &user, self.max_tokens)
    }
}

/// Extract the assistant message text from a chat-completions response.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, BraqError> {
    json.get("choices")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BraqError::CollaboratorUnavailable {
            collaborator: "language-model".to_string(),
            reason: "response missing message content".to_string(),
        })
}

/// Parse the classifier's JSON reply into a classification.
///
/// Tolerates surrounding prose by extracting the first `{...}` span;
/// unknown intent strings parse to [`IntentLabel::Unknown`].
fn parse_classification(content: &str) -> Result<IntentClassification, BraqError> {
    let invalid = |reason: String| BraqError::CollaboratorUnavailable {
        collaborator: "language-model".to_string(),
        reason,
    };

    let start = content.find('{');
    let end = content.rfind('}');
    let span = match (start, end) {
        (Some(start), Some(end)) if end > start => &content[start..=end],
        _ => return Err(invalid(format!("classifier reply is not JSON: {}", content))),
    };

    let json: serde_json::Value = serde_json::from_str(span)
        .map_err(|e| invalid(format!("classifier reply parse error: {}", e)))?;

    let label: IntentLabel = json
        .get("intent")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid("classifier reply missing intent".to_string()))?
        .parse()
        .unwrap_or(IntentLabel::Unknown);

    let confidence = json
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0) as f32;

    Ok(IntentClassification { label, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_response() {
        let json = serde_json::json!({
            "choices": [ { "message": { "content": "  The sprint is on track.  " } } ]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "The sprint is on track.");
    }

    #[test]
    fn test_parse_chat_response_empty_is_error() {
        let json = serde_json::json!({
            "choices": [ { "message": { "content": "" } } ]
        });
        assert!(parse_chat_response(&json).is_err());
    }

    #[test]
    fn test_parse_classification() {
        let parsed =
            parse_classification(r#"{"intent": "COUNT_OR_CHECK", "confidence": 0.85}"#).unwrap();
        assert_eq!(parsed.label, IntentLabel::CountOrCheck);
        assert!((parsed.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_parse_classification_with_surrounding_prose() {
        let parsed =
            parse_classification("Sure! Here it is: {\"intent\": \"REPORT\", \"confidence\": 0.7}")
                .unwrap();
        assert_eq!(parsed.label, IntentLabel::Report);
    }

    #[test]
    fn test_parse_classification_unknown_label() {
        let parsed =
            parse_classification(r#"{"intent": "SOMETHING_ELSE", "confidence": 0.9}"#).unwrap();
        assert_eq!(parsed.label, IntentLabel::Unknown);
    }

    #[test]
    fn test_parse_classification_clamps_confidence() {
        let parsed =
            parse_classification(r#"{"intent": "RETRIEVE", "confidence": 1.8}"#).unwrap();
        assert_eq!(parsed.confidence, 1.0);
    }

    #[test]
    fn test_parse_classification_rejects_non_json() {
        assert!(parse_classification("no json here").is_err());
    }
}
