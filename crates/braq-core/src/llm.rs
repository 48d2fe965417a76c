//! Language-model collaborator abstraction.
//!
//! The engine uses the model for exactly two things:
//! - classifying query intent when no routing rule fires confidently
//! - phrasing answers from context the engine has already assembled
//!   (retrieved excerpts or a deterministic aggregate summary — never a raw
//!   corpus dump)
//!
//! Both calls are optional: classification falls back to the rule-based
//! default intent and synthesis falls back to a deterministic rendering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::BraqError;

// ============================================================================
// IntentLabel
// ============================================================================

/// Intent labels the classifier may return.
///
/// Mirrors [`crate::router::QueryIntent`] but is a separate type: this is
/// the wire vocabulary of the collaborator, and unknown labels must parse
/// into `Unknown` rather than fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentLabel {
    /// Free retrieval + synthesis.
    Retrieve,
    /// Count or existence check.
    CountOrCheck,
    /// Detail lookup for a specific item.
    Detail,
    /// Comparison across named groups.
    Compare,
    /// Iteration report/summary request.
    Report,
    /// Anything the classifier could not map.
    #[serde(other)]
    Unknown,
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retrieve => "RETRIEVE",
            Self::CountOrCheck => "COUNT_OR_CHECK",
            Self::Detail => "DETAIL",
            Self::Compare => "COMPARE",
            Self::Report => "REPORT",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for IntentLabel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "RETRIEVE" | "GENERAL_QUERY" | "LIST_TASKS" => Self::Retrieve,
            "COUNT_OR_CHECK" | "COUNT_TASKS" | "CHECK_EXISTENCE" => Self::CountOrCheck,
            "DETAIL" | "TASK_INFO" => Self::Detail,
            "COMPARE" => Self::Compare,
            "REPORT" | "SPRINT_REPORT" => Self::Report,
            _ => Self::Unknown,
        })
    }
}

/// Classification result: label plus the model's confidence in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentClassification {
    /// The classified intent.
    pub label: IntentLabel,
    /// Model confidence, 0.0 to 1.0.
    pub confidence: f32,
}

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// Trait for the external language-model collaborator.
pub trait LanguageModel: Send + Sync {
    /// Classify the intent of a query.
    fn classify_intent(&self, query: &str) -> Result<IntentClassification, BraqError>;

    /// Synthesize a natural-language answer from a query and a context
    /// block the engine assembled (item excerpts or an aggregate summary).
    fn synthesize_answer(&self, query: &str, context_block: &str) -> Result<String, BraqError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_canonical() {
        assert_eq!("RETRIEVE".parse::<IntentLabel>().unwrap(), IntentLabel::Retrieve);
        assert_eq!("count_or_check".parse::<IntentLabel>().unwrap(), IntentLabel::CountOrCheck);
        assert_eq!("REPORT".parse::<IntentLabel>().unwrap(), IntentLabel::Report);
    }

    #[test]
    fn test_label_parse_legacy_aliases() {
        // Labels the hosted classifier is known to emit
        assert_eq!("COUNT_TASKS".parse::<IntentLabel>().unwrap(), IntentLabel::CountOrCheck);
        assert_eq!("TASK_INFO".parse::<IntentLabel>().unwrap(), IntentLabel::Detail);
        assert_eq!("SPRINT_REPORT".parse::<IntentLabel>().unwrap(), IntentLabel::Report);
        assert_eq!("GENERAL_QUERY".parse::<IntentLabel>().unwrap(), IntentLabel::Retrieve);
    }

    #[test]
    fn test_label_parse_unknown() {
        assert_eq!("SOMETHING_NEW".parse::<IntentLabel>().unwrap(), IntentLabel::Unknown);
    }

    #[test]
    fn test_classification_serde() {
        let json = r#"{"label": "COUNT_OR_CHECK", "confidence": 0.92}"#;
        let parsed: IntentClassification = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.label, IntentLabel::CountOrCheck);
        assert!((parsed.confidence - 0.92).abs() < 1e-6);
    }
}
