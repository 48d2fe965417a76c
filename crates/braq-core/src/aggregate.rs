//! Deterministic counting, grouping, and iteration metrics.
//!
//! Everything here operates on the **complete** filtered item set of a
//! snapshot, never a retrieval top-K slice — that is the correctness
//! property separating aggregate answers from retrieval answers. Outputs
//! are deterministic: group orderings are count-descending with
//! name-ascending tie-breaks, and comparisons preserve caller order.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::filter::FilterPredicate;
use crate::item::StatusCategory;
use crate::snapshot::CorpusSnapshot;

// ============================================================================
// GroupAttribute
// ============================================================================

/// Item attributes a grouping can key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupAttribute {
    /// Group by iteration name.
    Iteration,
    /// Group by status category.
    Status,
    /// Group by priority category.
    Priority,
    /// Group by assignee (an item counts once per assignee).
    Assignee,
    /// Group by label (an item counts once per label).
    Label,
}

impl fmt::Display for GroupAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Iteration => "iteration",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Assignee => "assignee",
            Self::Label => "label",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for GroupAttribute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "iteration" | "sprint" => Ok(Self::Iteration),
            "status" => Ok(Self::Status),
            "priority" => Ok(Self::Priority),
            "assignee" | "person" => Ok(Self::Assignee),
            "label" | "tag" => Ok(Self::Label),
            other => Err(format!("Unknown group attribute: {}", other)),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

/// Ordered value → count mapping produced by a grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedCounts {
    /// Attribute the grouping keyed on.
    pub attribute: GroupAttribute,
    /// (value, count) pairs, count-descending, value-ascending tie-break.
    pub groups: Vec<(String, usize)>,
}

impl GroupedCounts {
    /// Number of distinct values.
    pub fn distinct(&self) -> usize {
        self.groups.len()
    }

    /// Render as a compact summary table for delegation context.
    pub fn to_summary_block(&self) -> String {
        if self.groups.is_empty() {
            return format!("No values found for attribute `{}`.", self.attribute);
        }
        let mut out = format!("Counts per {}:\n", self.attribute);
        for (value, count) in &self.groups {
            out.push_str(&format!("- {}: {}\n", value, count));
        }
        out.push_str(&format!("Distinct values: {}", self.groups.len()));
        out
    }
}

/// Metrics for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationMetrics {
    /// Iteration name.
    pub iteration: String,
    /// Total items in the iteration.
    pub total: usize,
    /// Item count per status category, status-ascending.
    pub by_status: Vec<(StatusCategory, usize)>,
    /// `done / total`, 0.0 when the iteration is empty.
    pub completion_ratio: f64,
    /// Items flagged as blocked.
    pub blocked_count: usize,
    /// Items with urgent or high priority.
    pub high_priority_count: usize,
}

// ============================================================================
// Operations
// ============================================================================

/// Count items matching a predicate, over the complete set.
pub fn count(snapshot: &CorpusSnapshot, predicate: &FilterPredicate) -> usize {
    snapshot.filtered(predicate).len()
}

/// Group the filtered item set by an attribute.
///
/// For multi-valued attributes (assignee, label) an item counts once per
/// value. Items without a value for the attribute are skipped.
pub fn group_by(
    snapshot: &CorpusSnapshot,
    attribute: GroupAttribute,
    predicate: &FilterPredicate,
) -> GroupedCounts {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for item in snapshot.filtered(predicate) {
        match attribute {
            GroupAttribute::Iteration => {
                if let Some(ref iteration) = item.attributes.iteration {
                    *counts.entry(iteration.clone()).or_insert(0) += 1;
                }
            }
            GroupAttribute::Status => {
                *counts.entry(item.attributes.status.to_string()).or_insert(0) += 1;
            }
            GroupAttribute::Priority => {
                *counts
                    .entry(item.attributes.priority.to_string())
                    .or_insert(0) += 1;
            }
            GroupAttribute::Assignee => {
                for assignee in &item.attributes.assignees {
                    *counts.entry(assignee.clone()).or_insert(0) += 1;
                }
            }
            GroupAttribute::Label => {
                for label in &item.attributes.labels {
                    *counts.entry(label.clone()).or_insert(0) += 1;
                }
            }
        }
    }

    // BTreeMap gives name-ascending; stable sort by count keeps that as the
    // tie-break.
    let mut groups: Vec<(String, usize)> = counts.into_iter().collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    GroupedCounts { attribute, groups }
}

/// Compute metrics for one iteration over its complete item set.
///
/// `completion_ratio` is defined as 0 for an empty iteration.
pub fn metrics(snapshot: &CorpusSnapshot, iteration: &str) -> IterationMetrics {
    let predicate = FilterPredicate {
        iteration: Some(iteration.to_string()),
        ..Default::default()
    };
    let items = snapshot.filtered(&predicate);

    let total = items.len();
    let mut by_status: BTreeMap<StatusCategory, usize> = BTreeMap::new();
    let mut blocked_count = 0;
    let mut high_priority_count = 0;

    for item in &items {
        *by_status.entry(item.attributes.status).or_insert(0) += 1;
        if item.attributes.is_blocked {
            blocked_count += 1;
        }
        if item.attributes.priority.is_high() {
            high_priority_count += 1;
        }
    }

    let done_count = by_status.get(&StatusCategory::Done).copied().unwrap_or(0);
    let completion_ratio = if total == 0 {
        0.0
    } else {
        done_count as f64 / total as f64
    };

    IterationMetrics {
        iteration: iteration.to_string(),
        total,
        by_status: by_status.into_iter().collect(),
        completion_ratio,
        blocked_count,
        high_priority_count,
    }
}

/// Compare several named iterations: one metrics computation per group,
/// merged in caller order.
pub fn compare(snapshot: &CorpusSnapshot, iterations: &[String]) -> Vec<IterationMetrics> {
    iterations
        .iter()
        .map(|iteration| metrics(snapshot, iteration))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InMemoryItemIndex;
    use crate::item::{Item, ItemAttributes, PriorityCategory};
    use crate::lexical::LexicalConfig;

    fn build_snapshot() -> CorpusSnapshot {
        let mut index = InMemoryItemIndex::new();
        let rows: Vec<(&str, &str, StatusCategory, PriorityCategory, bool, &[&str])> = vec![
            ("T1", "Sprint 1", StatusCategory::Done, PriorityCategory::Normal, false, &["Ana"]),
            ("T2", "Sprint 1", StatusCategory::Done, PriorityCategory::High, false, &["Jorge"]),
            ("T3", "Sprint 1", StatusCategory::InProgress, PriorityCategory::Urgent, true, &["Jorge"]),
            ("T4", "Sprint 1", StatusCategory::Todo, PriorityCategory::Low, false, &[]),
            ("T5", "Sprint 2", StatusCategory::Done, PriorityCategory::Normal, false, &["Ana"]),
            ("T6", "Sprint 2", StatusCategory::Todo, PriorityCategory::Normal, true, &["Ana", "Jorge"]),
        ];
        for (id, iteration, status, priority, blocked, assignees) in rows {
            let attrs = ItemAttributes {
                iteration: Some(iteration.to_string()),
                status,
                priority,
                is_blocked: blocked,
                assignees: assignees.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            };
            index.insert(Item::with_attributes(id, "content", attrs), None);
        }
        CorpusSnapshot::build(&index, &LexicalConfig::default(), None).unwrap()
    }

    #[test]
    fn test_count_full_set() {
        let snapshot = build_snapshot();
        assert_eq!(count(&snapshot, &FilterPredicate::empty()), 6);

        let predicate = FilterPredicate {
            iteration: Some("Sprint 1".to_string()),
            status: Some(StatusCategory::Done),
            ..Default::default()
        };
        assert_eq!(count(&snapshot, &predicate), 2);
    }

    #[test]
    fn test_count_equals_filtered_length() {
        // The aggregate count must always equal the full filtered set size
        let snapshot = build_snapshot();
        let predicate = FilterPredicate {
            is_blocked: Some(true),
            ..Default::default()
        };
        assert_eq!(
            count(&snapshot, &predicate),
            snapshot.filtered(&predicate).len()
        );
    }

    #[test]
    fn test_monotonic_narrowing() {
        let snapshot = build_snapshot();
        let loose = FilterPredicate {
            iteration: Some("Sprint 1".to_string()),
            ..Default::default()
        };
        let tight = FilterPredicate {
            status: Some(StatusCategory::Done),
            ..loose.clone()
        };
        assert!(count(&snapshot, &tight) <= count(&snapshot, &loose));
    }

    #[test]
    fn test_group_by_iteration() {
        let snapshot = build_snapshot();
        let grouped = group_by(&snapshot, GroupAttribute::Iteration, &FilterPredicate::empty());

        assert_eq!(grouped.distinct(), 2);
        assert_eq!(grouped.groups[0], ("Sprint 1".to_string(), 4));
        assert_eq!(grouped.groups[1], ("Sprint 2".to_string(), 2));
    }

    #[test]
    fn test_group_by_assignee_multi_valued() {
        let snapshot = build_snapshot();
        let grouped = group_by(&snapshot, GroupAttribute::Assignee, &FilterPredicate::empty());

        // T6 counts for both Ana and Jorge
        let ana = grouped.groups.iter().find(|(v, _)| v == "Ana").unwrap();
        let jorge = grouped.groups.iter().find(|(v, _)| v == "Jorge").unwrap();
        assert_eq!(ana.1, 3);
        assert_eq!(jorge.1, 3);
    }

    #[test]
    fn test_group_by_deterministic_tie_break() {
        let snapshot = build_snapshot();
        let grouped = group_by(&snapshot, GroupAttribute::Assignee, &FilterPredicate::empty());
        // Equal counts: name-ascending
        assert_eq!(grouped.groups[0].0, "Ana");
        assert_eq!(grouped.groups[1].0, "Jorge");
    }

    #[test]
    fn test_group_by_respects_predicate() {
        let snapshot = build_snapshot();
        let predicate = FilterPredicate {
            iteration: Some("Sprint 2".to_string()),
            ..Default::default()
        };
        let grouped = group_by(&snapshot, GroupAttribute::Status, &predicate);
        let total: usize = grouped.groups.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_metrics() {
        let snapshot = build_snapshot();
        let m = metrics(&snapshot, "Sprint 1");

        assert_eq!(m.total, 4);
        assert!((m.completion_ratio - 0.5).abs() < 1e-9);
        assert_eq!(m.blocked_count, 1);
        assert_eq!(m.high_priority_count, 2);
        let done = m
            .by_status
            .iter()
            .find(|(s, _)| *s == StatusCategory::Done)
            .unwrap();
        assert_eq!(done.1, 2);
    }

    #[test]
    fn test_metrics_empty_iteration_no_division_by_zero() {
        let snapshot = build_snapshot();
        let m = metrics(&snapshot, "Sprint 99");

        assert_eq!(m.total, 0);
        assert_eq!(m.completion_ratio, 0.0);
        assert_eq!(m.blocked_count, 0);
        assert!(m.by_status.is_empty());
    }

    #[test]
    fn test_completion_ratio_in_unit_interval() {
        let snapshot = build_snapshot();
        for iteration in ["Sprint 1", "Sprint 2", "Sprint 99"] {
            let m = metrics(&snapshot, iteration);
            assert!((0.0..=1.0).contains(&m.completion_ratio));
        }
    }

    #[test]
    fn test_compare_preserves_caller_order() {
        let snapshot = build_snapshot();
        let comparison = compare(
            &snapshot,
            &["Sprint 2".to_string(), "Sprint 1".to_string()],
        );

        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison[0].iteration, "Sprint 2");
        assert_eq!(comparison[1].iteration, "Sprint 1");
    }

    #[test]
    fn test_summary_block() {
        let snapshot = build_snapshot();
        let grouped = group_by(&snapshot, GroupAttribute::Iteration, &FilterPredicate::empty());
        let block = grouped.to_summary_block();

        assert!(block.contains("Sprint 1: 4"));
        assert!(block.contains("Sprint 2: 2"));
        assert!(block.contains("Distinct values: 2"));
    }
}
