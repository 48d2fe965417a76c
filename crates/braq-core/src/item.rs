//! Work item model: identifiers, attributes, and canonical categories.
//!
//! Items are immutable snapshots produced by the ingestion collaborator;
//! this engine only reads them. The canonical status/priority categories and
//! their synonym lists live here so the filter extractor and the aggregate
//! engine agree on vocabulary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ============================================================================
// ItemId
// ============================================================================

/// Identifier for a work item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new item id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ============================================================================
// StatusCategory
// ============================================================================

/// Canonical status categories for work items.
///
/// Raw tracker statuses are normalized to one of these during ingestion;
/// the filter extractor maps free-text status phrases onto the same set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    /// Not started.
    Todo,
    /// Actively being worked on.
    InProgress,
    /// Awaiting review.
    Review,
    /// In QA/testing.
    Qa,
    /// Completed.
    Done,
    /// Abandoned.
    Cancelled,
    /// Could not be normalized.
    #[default]
    Unknown,
}

impl StatusCategory {
    /// Synonym phrases that map to each canonical status.
    ///
    /// Used by the filter extractor; each entry must be a clear lexical
    /// trigger, never a fuzzy match.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Todo => &["to do", "todo", "open", "pending", "not started", "backlog"],
            Self::InProgress => &["in progress", "ongoing", "started", "doing", "active", "working on"],
            Self::Review => &["in review", "under review", "review"],
            Self::Qa => &["in qa", "qa", "testing", "in testing"],
            Self::Done => &["done", "completed", "complete", "finished", "closed", "resolved"],
            Self::Cancelled => &["cancelled", "canceled", "abandoned", "dropped"],
            Self::Unknown => &[],
        }
    }

    /// All categories the extractor recognizes, in match-priority order.
    ///
    /// Multi-word synonyms ("in progress") are checked before their
    /// single-word prefixes would be, because the extractor matches the
    /// longest trigger first.
    pub fn all() -> &'static [StatusCategory] {
        &[
            Self::InProgress,
            Self::Review,
            Self::Qa,
            Self::Done,
            Self::Cancelled,
            Self::Todo,
        ]
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Qa => "qa",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for StatusCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todo" | "to_do" => Ok(Self::Todo),
            "in_progress" | "in progress" => Ok(Self::InProgress),
            "review" => Ok(Self::Review),
            "qa" => Ok(Self::Qa),
            "done" => Ok(Self::Done),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("Unknown status category: {}", other)),
        }
    }
}

// ============================================================================
// PriorityCategory
// ============================================================================

/// Canonical priority categories for work items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityCategory {
    /// Highest priority.
    Urgent,
    /// Above normal.
    High,
    /// Default priority.
    Normal,
    /// Below normal.
    Low,
    /// Could not be normalized.
    #[default]
    Unknown,
}

impl PriorityCategory {
    /// Synonym phrases that map to each canonical priority.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Urgent => &["urgent", "critical"],
            Self::High => &["high priority", "high-priority"],
            Self::Normal => &["normal priority", "medium priority"],
            Self::Low => &["low priority", "low-priority"],
            Self::Unknown => &[],
        }
    }

    /// All categories the extractor recognizes, in match-priority order.
    pub fn all() -> &'static [PriorityCategory] {
        &[Self::Urgent, Self::High, Self::Normal, Self::Low]
    }

    /// Whether this counts toward the high-priority metric.
    pub fn is_high(self) -> bool {
        matches!(self, Self::Urgent | Self::High)
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PriorityCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "urgent" | "critical" => Ok(Self::Urgent),
            "high" => Ok(Self::High),
            "normal" | "medium" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("Unknown priority category: {}", other)),
        }
    }
}

// ============================================================================
// ItemAttributes
// ============================================================================

/// Structured attributes of a work item.
///
/// All fields are derived during ingestion; booleans are precomputed flags
/// so filter evaluation is a plain field comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemAttributes {
    /// Iteration (sprint) name, e.g. "Sprint 3". None when unscheduled.
    #[serde(default)]
    pub iteration: Option<String>,

    /// Canonical status category.
    #[serde(default)]
    pub status: StatusCategory,

    /// Canonical priority category.
    #[serde(default)]
    pub priority: PriorityCategory,

    /// Assignee names.
    #[serde(default)]
    pub assignees: Vec<String>,

    /// Label/tag names.
    #[serde(default)]
    pub labels: Vec<String>,

    /// Whether the item is flagged as blocked.
    #[serde(default)]
    pub is_blocked: bool,

    /// Whether the item has unresolved comments.
    #[serde(default)]
    pub has_open_comments: bool,

    /// Whether the item has subitems.
    #[serde(default)]
    pub has_subitems: bool,

    /// Total number of subitems.
    #[serde(default)]
    pub subitems_total: u32,

    /// Number of completed subitems.
    #[serde(default)]
    pub subitems_done: u32,
}

// ============================================================================
// Item
// ============================================================================

/// One work unit in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,

    /// Free-text content used for embedding and lexical scoring
    /// (title plus naturalized description).
    pub content: String,

    /// Structured attributes.
    #[serde(default)]
    pub attributes: ItemAttributes,
}

impl Item {
    /// Create an item with default attributes.
    pub fn new(id: impl Into<ItemId>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            attributes: ItemAttributes::default(),
        }
    }

    /// Create an item with the given attributes.
    pub fn with_attributes(
        id: impl Into<ItemId>,
        content: impl Into<String>,
        attributes: ItemAttributes,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in StatusCategory::all() {
            let parsed: StatusCategory = status.to_string().parse().unwrap();
            assert_eq!(parsed, *status);
        }
    }

    #[test]
    fn test_priority_round_trip() {
        for priority in PriorityCategory::all() {
            let parsed: PriorityCategory = priority.to_string().parse().unwrap();
            assert_eq!(parsed, *priority);
        }
    }

    #[test]
    fn test_priority_is_high() {
        assert!(PriorityCategory::Urgent.is_high());
        assert!(PriorityCategory::High.is_high());
        assert!(!PriorityCategory::Normal.is_high());
        assert!(!PriorityCategory::Low.is_high());
        assert!(!PriorityCategory::Unknown.is_high());
    }

    #[test]
    fn test_status_synonyms_nonempty() {
        for status in StatusCategory::all() {
            assert!(!status.synonyms().is_empty());
        }
        assert!(StatusCategory::Unknown.synonyms().is_empty());
    }

    #[test]
    fn test_item_serde_defaults() {
        let json = r#"{"id": "T1", "content": "Fix the login flow"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "T1");
        assert_eq!(item.attributes.status, StatusCategory::Unknown);
        assert!(!item.attributes.is_blocked);
    }
}
