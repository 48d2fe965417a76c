//! Query intent routing.
//!
//! Classifies a query into one of a small set of intents and, for aggregate
//! questions, decides between the deterministic manual path and delegation
//! to the language model.
//!
//! Classification is a prioritized rule table evaluated in fixed order —
//! explicit lexical cues for compare/report/count requests — falling through
//! to the model-based classifier only when no rule fires. The model's label
//! is accepted only above a confidence threshold; anything less defaults to
//! retrieval. This keeps the policy testable independent of the fallback
//! collaborator.
//!
//! ## Manual vs. delegated aggregates
//!
//! Frequent, well-defined aggregate questions (item counts under a filter,
//! existence checks) must answer in bounded time without model latency, so
//! they take the manual path. Rare distinct-value questions ("how many
//! sprints are there") are delegated: the engine computes an exact
//! per-group summary and hands only that table to the model for phrasing,
//! so the numbers can never be hallucinated.

use regex::Regex;

use crate::aggregate::GroupAttribute;
use crate::config::RouterConfig;
use crate::errors::Degradation;
use crate::llm::{IntentLabel, LanguageModel};

// ============================================================================
// QueryIntent
// ============================================================================

/// The intents a query can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Hybrid retrieval plus synthesis.
    Retrieve,
    /// Count or existence check over the filtered item set.
    CountOrCheck,
    /// Detail lookup for one specific item.
    Detail,
    /// Comparison across named iterations.
    Compare,
    /// Iteration report/summary.
    Report,
}

impl From<IntentLabel> for QueryIntent {
    fn from(label: IntentLabel) -> Self {
        match label {
            IntentLabel::Retrieve | IntentLabel::Unknown => Self::Retrieve,
            IntentLabel::CountOrCheck => Self::CountOrCheck,
            IntentLabel::Detail => Self::Detail,
            IntentLabel::Compare => Self::Compare,
            IntentLabel::Report => Self::Report,
        }
    }
}

/// Routing result: the chosen intent plus any fallback taken choosing it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedIntent {
    /// The intent the query routes to.
    pub intent: QueryIntent,
    /// Set when the classifier was unavailable or under-confident and the
    /// rule-based default was used instead.
    pub degradation: Option<Degradation>,
}

// ============================================================================
// CountPlan
// ============================================================================

/// How a `CountOrCheck` query will be answered.
#[derive(Debug, Clone, PartialEq)]
pub enum CountPlan {
    /// Deterministic in-process count of items under the extracted filter.
    /// `existence` marks yes/no questions answered from the same count.
    Manual {
        /// Whether the question asks for existence rather than a number.
        existence: bool,
    },
    /// The manual path does not cover this aggregation; delegate with a
    /// per-group summary over the given attribute.
    Delegate {
        /// Attribute whose distinct values the question asks about.
        attribute: GroupAttribute,
    },
}

// ============================================================================
// QueryRouter
// ============================================================================

/// Rule-based intent router with a model-classifier fallback.
pub struct QueryRouter {
    compare: Regex,
    report: Regex,
    count: Regex,
    existence: Regex,
    distinct_iterations: Regex,
    distinct_assignees: Regex,
    distinct_labels: Regex,
    iteration_mention: Regex,
    confidence_threshold: f32,
}

impl QueryRouter {
    /// Build the router from configuration.
    pub fn new(config: &RouterConfig) -> Self {
        Self {
            compare: Regex::new(r"(?i)\b(?:compare|versus|vs\.?)\b").expect("compare regex"),
            report: Regex::new(r"(?i)\b(?:report|summar(?:y|ize|ise)|overview)\b")
                .expect("report regex"),
            count: Regex::new(r"(?i)\b(?:how\s+many|count\s+of|number\s+of|total\s+of)\b")
                .expect("count regex"),
            existence: Regex::new(r"(?i)\b(?:are|is)\s+there\b|\bany\s+(?:\w+\s+)?(?:tasks|items)\b")
                .expect("existence regex"),
            distinct_iterations: Regex::new(r"(?i)\b(?:sprints|iterations)\b")
                .expect("distinct iterations regex"),
            distinct_assignees: Regex::new(r"(?i)\b(?:people|persons|assignees|members)\b")
                .expect("distinct assignees regex"),
            distinct_labels: Regex::new(r"(?i)\b(?:labels|tags)\b").expect("distinct labels regex"),
            iteration_mention: Regex::new(r"(?i)\b(?:sprint|iteration)\s+(\d+)\b")
                .expect("iteration mention regex"),
            confidence_threshold: config.intent_confidence_threshold,
        }
    }

    /// Route a query to an intent.
    ///
    /// Rules fire in fixed order; when none fires, the model classifier is
    /// consulted and its label accepted only at or above the confidence
    /// threshold. Every fallback to the default intent is recorded.
    pub fn route(&self, query: &str, classifier: Option<&dyn LanguageModel>) -> RoutedIntent {
        if self.compare.is_match(query) && self.iteration_mentions(query).len() >= 2 {
            return RoutedIntent {
                intent: QueryIntent::Compare,
                degradation: None,
            };
        }

        if self.report.is_match(query) {
            return RoutedIntent {
                intent: QueryIntent::Report,
                degradation: None,
            };
        }

        if self.count.is_match(query) || self.existence.is_match(query) {
            return RoutedIntent {
                intent: QueryIntent::CountOrCheck,
                degradation: None,
            };
        }

        // No rule fired; fall through to the model classifier
        match classifier {
            Some(model) => match model.classify_intent(query) {
                Ok(classification) if classification.confidence >= self.confidence_threshold => {
                    tracing::debug!(
                        label = %classification.label,
                        confidence = classification.confidence,
                        "Model-classified intent accepted"
                    );
                    RoutedIntent {
                        intent: classification.label.into(),
                        degradation: None,
                    }
                }
                Ok(classification) => {
                    tracing::warn!(
                        label = %classification.label,
                        confidence = classification.confidence,
                        threshold = self.confidence_threshold,
                        "Intent classification under-confident; defaulting to retrieve"
                    );
                    RoutedIntent {
                        intent: QueryIntent::Retrieve,
                        degradation: Some(Degradation::RuleBasedIntent),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Intent classifier unavailable; defaulting to retrieve");
                    RoutedIntent {
                        intent: QueryIntent::Retrieve,
                        degradation: Some(Degradation::RuleBasedIntent),
                    }
                }
            },
            None => RoutedIntent {
                intent: QueryIntent::Retrieve,
                degradation: None,
            },
        }
    }

    /// Decide the manual-vs-delegate plan for a `CountOrCheck` query.
    ///
    /// Item counts (possibly under compound filters) take the manual path.
    /// Distinct-value counts over a non-item attribute are not covered by
    /// the manual path and return a delegation plan instead.
    pub fn plan_count(&self, query: &str) -> CountPlan {
        // "how many sprints ..." asks for distinct values of the iteration
        // attribute, not for item counts; same for people and labels.
        if self.count.is_match(query) {
            if self.distinct_iterations.is_match(query) {
                return CountPlan::Delegate {
                    attribute: GroupAttribute::Iteration,
                };
            }
            if self.distinct_assignees.is_match(query) {
                return CountPlan::Delegate {
                    attribute: GroupAttribute::Assignee,
                };
            }
            if self.distinct_labels.is_match(query) {
                return CountPlan::Delegate {
                    attribute: GroupAttribute::Label,
                };
            }
        }

        let existence = !self.count.is_match(query) && self.existence.is_match(query);
        CountPlan::Manual { existence }
    }

    /// Iteration numbers mentioned in the query, in order of appearance,
    /// deduplicated. Used to collect comparison groups in caller order.
    pub fn iteration_mentions(&self, query: &str) -> Vec<u32> {
        let mut seen = Vec::new();
        for caps in self.iteration_mention.captures_iter(query) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                if !seen.contains(&n) {
                    seen.push(n);
                }
            }
        }
        seen
    }
}
