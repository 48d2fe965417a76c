//! Metadata-filter extraction from free-text queries.
//!
//! [`FilterPredicate`] is a conjunction of exact-match/boolean constraints
//! over item attributes. [`FilterExtractor`] parses a query for structured
//! constraints and returns the predicate plus a residual query string with
//! the recognized filter phrases stripped for embedding.
//!
//! Extraction is deliberately conservative: every rule requires a clear
//! lexical trigger (anchored pattern, word boundary, roster membership). A
//! missed filter degrades to semantic-only ranking; a wrong filter silently
//! empties the result set, which is the worse failure.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::item::{Item, PriorityCategory, StatusCategory};

// ============================================================================
// FilterPredicate
// ============================================================================

/// A conjunction of attribute constraints derived from a query.
///
/// Adding a constraint can only shrink the matched set (monotonic
/// narrowing): every field is ANDed in [`FilterPredicate::matches`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicate {
    /// Iteration name constraint (case-insensitive equality).
    #[serde(default)]
    pub iteration: Option<String>,

    /// Status category constraint.
    #[serde(default)]
    pub status: Option<StatusCategory>,

    /// Priority category constraint.
    #[serde(default)]
    pub priority: Option<PriorityCategory>,

    /// Assignee membership constraint (case-insensitive).
    #[serde(default)]
    pub assignee: Option<String>,

    /// Label membership constraint (case-insensitive).
    #[serde(default)]
    pub label: Option<String>,

    /// Blocked-flag constraint.
    #[serde(default)]
    pub is_blocked: Option<bool>,

    /// Open-comments-flag constraint.
    #[serde(default)]
    pub has_open_comments: Option<bool>,

    /// Has-subitems-flag constraint.
    #[serde(default)]
    pub has_subitems: Option<bool>,
}

impl FilterPredicate {
    /// Predicate with no constraints (matches everything).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the predicate has no constraints.
    pub fn is_empty(&self) -> bool {
        self.iteration.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.label.is_none()
            && self.is_blocked.is_none()
            && self.has_open_comments.is_none()
            && self.has_subitems.is_none()
    }

    /// Evaluate the predicate against an item. All set constraints must hold.
    pub fn matches(&self, item: &Item) -> bool {
        let attrs = &item.attributes;

        if let Some(ref iteration) = self.iteration {
            match &attrs.iteration {
                Some(it) if it.eq_ignore_ascii_case(iteration) => {}
                _ => return false,
            }
        }
        if let Some(status) = self.status {
            if attrs.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if attrs.priority != priority {
                return false;
            }
        }
        if let Some(ref assignee) = self.assignee {
            if !attrs
                .assignees
                .iter()
                .any(|a| a.eq_ignore_ascii_case(assignee))
            {
                return false;
            }
        }
        if let Some(ref label) = self.label {
            if !attrs.labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
                return false;
            }
        }
        if let Some(blocked) = self.is_blocked {
            if attrs.is_blocked != blocked {
                return false;
            }
        }
        if let Some(comments) = self.has_open_comments {
            if attrs.has_open_comments != comments {
                return false;
            }
        }
        if let Some(subitems) = self.has_subitems {
            if attrs.has_subitems != subitems {
                return false;
            }
        }

        true
    }

    /// Human-readable description of the constrained set, used for
    /// deterministic count phrasing ("There are 3 blocked items in Sprint 2").
    pub fn describe(&self) -> String {
        let mut qualifiers: Vec<String> = Vec::new();
        if self.is_blocked == Some(true) {
            qualifiers.push("blocked".to_string());
        }
        if let Some(priority) = self.priority {
            qualifiers.push(format!("{}-priority", priority));
        }
        if let Some(status) = self.status {
            let word = match status {
                StatusCategory::Done => "completed".to_string(),
                StatusCategory::InProgress => "in-progress".to_string(),
                StatusCategory::Todo => "pending".to_string(),
                other => other.to_string(),
            };
            qualifiers.push(word);
        }

        let mut out = if qualifiers.is_empty() {
            "items".to_string()
        } else {
            format!("{} items", qualifiers.join(" "))
        };

        if let Some(ref iteration) = self.iteration {
            out.push_str(&format!(" in {}", iteration));
        }
        if let Some(ref assignee) = self.assignee {
            out.push_str(&format!(" assigned to {}", assignee));
        }
        if let Some(ref label) = self.label {
            out.push_str(&format!(" labeled {}", label));
        }
        if self.has_open_comments == Some(true) {
            out.push_str(" with open comments");
        }
        if self.has_subitems == Some(true) {
            out.push_str(" with subitems");
        }

        out
    }
}

// ============================================================================
// ExtractedFilters
// ============================================================================

/// Output of filter extraction: the predicate and the residual query text
/// with recognized filter phrases stripped.
#[derive(Debug, Clone)]
pub struct ExtractedFilters {
    /// Constraints recognized in the query (possibly empty).
    pub predicate: FilterPredicate,
    /// The query with filter phrases removed, for embedding/lexical scoring.
    pub residual: String,
}

// ============================================================================
// FilterExtractor
// ============================================================================

/// Parses free-text queries into filter predicates.
///
/// Rules are evaluated in a fixed order; each is a prioritized declarative
/// (pattern → constraint) entry. Ambiguous or unmatched phrases are left in
/// the residual for semantic search to handle.
pub struct FilterExtractor {
    iteration_numeric: Regex,
    iteration_current: Regex,
    iteration_previous: Regex,
    status_rules: Vec<(Regex, StatusCategory)>,
    priority_rules: Vec<(Regex, PriorityCategory)>,
    blocked: Regex,
    open_comments: Regex,
    subitems: Regex,
    roster_rules: Vec<(Regex, String)>,
    current_iteration: Option<String>,
    iteration_template: String,
}

impl FilterExtractor {
    /// Build the extractor from engine configuration (roster, current
    /// iteration, iteration naming template).
    pub fn new(config: &EngineConfig) -> Self {
        let status_rules = StatusCategory::all()
            .iter()
            .map(|status| (synonym_regex(status.synonyms()), *status))
            .collect();

        let priority_rules = PriorityCategory::all()
            .iter()
            .map(|priority| (synonym_regex(priority.synonyms()), *priority))
            .collect();

        let roster_rules = config
            .corpus
            .roster
            .iter()
            .map(|name| {
                let pattern = format!(r"(?i)\b{}\b", regex::escape(name));
                (Regex::new(&pattern).expect("roster name regex"), name.clone())
            })
            .collect();

        Self {
            iteration_numeric: Regex::new(r"(?i)\b(?:sprint|iteration)\s+(\d+)\b")
                .expect("iteration regex"),
            iteration_current: Regex::new(r"(?i)\b(?:current|this|active)\s+(?:sprint|iteration)\b")
                .expect("current iteration regex"),
            iteration_previous: Regex::new(r"(?i)\b(?:last|previous)\s+(?:sprint|iteration)\b")
                .expect("previous iteration regex"),
            blocked: Regex::new(r"(?i)\b(?:blocked|impeded)\b").expect("blocked regex"),
            open_comments: Regex::new(r"(?i)\b(?:with\s+(?:open\s+)?comments|open\s+comments|unresolved\s+comments)\b")
                .expect("comments regex"),
            subitems: Regex::new(r"(?i)\b(?:with\s+(?:open\s+)?(?:subitems|subtasks)|open\s+(?:subitems|subtasks))\b")
                .expect("subitems regex"),
            status_rules,
            priority_rules,
            roster_rules,
            current_iteration: config.corpus.current_iteration.clone(),
            iteration_template: config.corpus.iteration_template.clone(),
        }
    }

    /// Extract a filter predicate from a query.
    ///
    /// Returns the predicate and the residual text with matched filter
    /// phrases stripped. Rules fire in fixed order; a rule without a clear
    /// trigger never fires.
    pub fn extract(&self, query: &str) -> ExtractedFilters {
        let mut predicate = FilterPredicate::empty();
        let mut residual = query.to_string();

        // 1. Explicit numeric iteration reference ("sprint 3")
        if let Some(caps) = self.iteration_numeric.captures(&residual) {
            if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                predicate.iteration = Some(self.iteration_template.replace("{n}", &n.to_string()));
                residual = self.iteration_numeric.replace(&residual, " ").into_owned();
            }
        }

        // 2. Relative iteration references, resolved against the configured
        //    current iteration; without one the rules do not fire.
        if predicate.iteration.is_none() {
            if self.iteration_current.is_match(&residual) {
                if let Some(ref current) = self.current_iteration {
                    predicate.iteration = Some(current.clone());
                    residual = self.iteration_current.replace(&residual, " ").into_owned();
                }
            } else if self.iteration_previous.is_match(&residual) {
                if let Some(previous) = self.previous_iteration_name() {
                    predicate.iteration = Some(previous);
                    residual = self.iteration_previous.replace(&residual, " ").into_owned();
                }
            }
        }

        // 3. Boolean flags. These run before the status table so that
        //    "open comments"/"open subtasks" are consumed before the Todo
        //    synonym "open" could see them.
        if self.blocked.is_match(&residual) {
            predicate.is_blocked = Some(true);
            residual = self.blocked.replace_all(&residual, " ").into_owned();
        }
        if self.open_comments.is_match(&residual) {
            predicate.has_open_comments = Some(true);
            residual = self.open_comments.replace_all(&residual, " ").into_owned();
        }
        if self.subitems.is_match(&residual) {
            predicate.has_subitems = Some(true);
            residual = self.subitems.replace_all(&residual, " ").into_owned();
        }

        // 4. Status phrases
        for (regex, status) in &self.status_rules {
            if regex.is_match(&residual) {
                predicate.status = Some(*status);
                residual = regex.replace_all(&residual, " ").into_owned();
                break;
            }
        }

        // 5. Priority phrases
        for (regex, priority) in &self.priority_rules {
            if regex.is_match(&residual) {
                predicate.priority = Some(*priority);
                residual = regex.replace_all(&residual, " ").into_owned();
                break;
            }
        }

        // 6. Assignee names, gated on the configured roster
        for (regex, name) in &self.roster_rules {
            if regex.is_match(&residual) {
                predicate.assignee = Some(name.clone());
                residual = regex.replace_all(&residual, " ").into_owned();
                break;
            }
        }

        let residual = collapse_whitespace(&residual);

        if !predicate.is_empty() {
            tracing::debug!(
                predicate = ?predicate,
                residual = %residual,
                "Extracted filters from query"
            );
        }

        ExtractedFilters { predicate, residual }
    }

    /// Resolve "last/previous sprint" numerically against the current
    /// iteration name. Returns `None` unless the current iteration ends in a
    /// number greater than 1.
    fn previous_iteration_name(&self) -> Option<String> {
        let current = self.current_iteration.as_deref()?;
        let digits: String = current
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let n: u32 = digits.parse().ok()?;
        if n <= 1 {
            return None;
        }
        Some(self.iteration_template.replace("{n}", &(n - 1).to_string()))
    }
}

/// Build a word-boundary alternation regex from synonym phrases, longest
/// first so multi-word triggers win over their prefixes.
fn synonym_regex(synonyms: &[&str]) -> Regex {
    let mut sorted: Vec<&str> = synonyms.to_vec();
    sorted.sort_by_key(|s| std::cmp::Reverse(s.len()));
    let alternation = sorted
        .iter()
        .map(|s| regex::escape(s).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).expect("synonym regex")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorpusConfig;
    use crate::item::ItemAttributes;

    fn extractor_with(roster: &[&str], current: Option<&str>) -> FilterExtractor {
        let config = EngineConfig {
            corpus: CorpusConfig {
                current_iteration: current.map(|s| s.to_string()),
                roster: roster.iter().map(|s| s.to_string()).collect(),
                iteration_template: "Sprint {n}".to_string(),
            },
            ..Default::default()
        };
        FilterExtractor::new(&config)
    }

    fn extractor() -> FilterExtractor {
        extractor_with(&["Jorge", "Ana"], Some("Sprint 3"))
    }

    #[test]
    fn test_empty_predicate_matches_everything() {
        let predicate = FilterPredicate::empty();
        assert!(predicate.is_empty());
        let item = Item::new("T1", "anything");
        assert!(predicate.matches(&item));
    }

    #[test]
    fn test_numeric_sprint_reference() {
        let result = extractor().extract("tasks in sprint 3 about payments");
        assert_eq!(result.predicate.iteration.as_deref(), Some("Sprint 3"));
        assert!(!result.residual.to_lowercase().contains("sprint"));
        assert!(result.residual.contains("payments"));
    }

    #[test]
    fn test_current_sprint_resolution() {
        let result = extractor().extract("what is blocked in the current sprint");
        assert_eq!(result.predicate.iteration.as_deref(), Some("Sprint 3"));
        assert_eq!(result.predicate.is_blocked, Some(true));
    }

    #[test]
    fn test_current_sprint_without_config_does_not_fire() {
        let extractor = extractor_with(&[], None);
        let result = extractor.extract("tasks in the current sprint");
        assert!(result.predicate.iteration.is_none());
        // The unresolved phrase stays in the residual for semantic search
        assert!(result.residual.to_lowercase().contains("current sprint"));
    }

    #[test]
    fn test_previous_sprint_resolution() {
        let result = extractor().extract("completed tasks from the last sprint");
        assert_eq!(result.predicate.iteration.as_deref(), Some("Sprint 2"));
        assert_eq!(result.predicate.status, Some(StatusCategory::Done));
    }

    #[test]
    fn test_previous_sprint_at_one_does_not_fire() {
        let extractor = extractor_with(&[], Some("Sprint 1"));
        let result = extractor.extract("tasks from the previous sprint");
        assert!(result.predicate.iteration.is_none());
    }

    #[test]
    fn test_status_synonyms() {
        for (phrase, expected) in [
            ("completed tasks", StatusCategory::Done),
            ("closed tasks", StatusCategory::Done),
            ("tasks in progress", StatusCategory::InProgress),
            ("pending tasks", StatusCategory::Todo),
            ("tasks in qa", StatusCategory::Qa),
            ("cancelled tasks", StatusCategory::Cancelled),
        ] {
            let result = extractor().extract(phrase);
            assert_eq!(result.predicate.status, Some(expected), "phrase: {}", phrase);
        }
    }

    #[test]
    fn test_priority_extraction() {
        let result = extractor().extract("urgent tasks in sprint 2");
        assert_eq!(result.predicate.priority, Some(PriorityCategory::Urgent));
        assert_eq!(result.predicate.iteration.as_deref(), Some("Sprint 2"));
    }

    #[test]
    fn test_boolean_flags() {
        let result = extractor().extract("blocked tasks with open comments");
        assert_eq!(result.predicate.is_blocked, Some(true));
        assert_eq!(result.predicate.has_open_comments, Some(true));

        let result = extractor().extract("tasks with open subtasks");
        assert_eq!(result.predicate.has_subitems, Some(true));
    }

    #[test]
    fn test_assignee_roster_gating() {
        let result = extractor().extract("tasks assigned to Jorge");
        assert_eq!(result.predicate.assignee.as_deref(), Some("Jorge"));

        // Names off the roster are never extracted
        let result = extractor().extract("tasks assigned to Marcus");
        assert!(result.predicate.assignee.is_none());
    }

    #[test]
    fn test_compound_filter() {
        let result = extractor().extract("how many completed tasks does Ana have in sprint 2");
        assert_eq!(result.predicate.iteration.as_deref(), Some("Sprint 2"));
        assert_eq!(result.predicate.status, Some(StatusCategory::Done));
        assert_eq!(result.predicate.assignee.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_no_trigger_no_filter() {
        let result = extractor().extract("what are the main risks for the release");
        assert!(result.predicate.is_empty());
        assert_eq!(result.residual, "what are the main risks for the release");
    }

    #[test]
    fn test_monotonic_narrowing() {
        let items: Vec<Item> = (0..20)
            .map(|i| {
                let attrs = ItemAttributes {
                    iteration: Some(format!("Sprint {}", i % 3 + 1)),
                    status: if i % 2 == 0 {
                        StatusCategory::Done
                    } else {
                        StatusCategory::InProgress
                    },
                    ..Default::default()
                };
                Item::with_attributes(format!("T{}", i), "content", attrs)
            })
            .collect();

        let loose = FilterPredicate {
            iteration: Some("Sprint 1".to_string()),
            ..Default::default()
        };
        let tight = FilterPredicate {
            status: Some(StatusCategory::Done),
            ..loose.clone()
        };

        let loose_count = items.iter().filter(|i| loose.matches(i)).count();
        let tight_count = items.iter().filter(|i| tight.matches(i)).count();
        assert!(tight_count <= loose_count);
    }

    #[test]
    fn test_matches_case_insensitive() {
        let attrs = ItemAttributes {
            iteration: Some("Sprint 3".to_string()),
            assignees: vec!["Jorge".to_string()],
            ..Default::default()
        };
        let item = Item::with_attributes("T1", "content", attrs);

        let predicate = FilterPredicate {
            iteration: Some("sprint 3".to_string()),
            assignee: Some("jorge".to_string()),
            ..Default::default()
        };
        assert!(predicate.matches(&item));
    }

    #[test]
    fn test_describe() {
        let predicate = FilterPredicate {
            iteration: Some("Sprint 3".to_string()),
            status: Some(StatusCategory::Done),
            assignee: Some("Ana".to_string()),
            ..Default::default()
        };
        assert_eq!(predicate.describe(), "completed items in Sprint 3 assigned to Ana");

        assert_eq!(FilterPredicate::empty().describe(), "items");
    }
}
