//! Short-term conversational memory for follow-up resolution.
//!
//! Each conversation owns one [`ConversationContext`]: a FIFO window of the
//! last few (question, resolved item) turns plus the identity of the item
//! most recently discussed. A follow-up containing a recognized anaphoric
//! cue ("give me more detail", "that task") rewrites to an explicit detail
//! lookup for that item, bypassing retrieval entirely.
//!
//! Contexts are never shared across conversations and die with them.

use std::collections::VecDeque;
use std::fmt;

use uuid::Uuid;

use crate::item::ItemId;

/// Default turn window size.
pub const DEFAULT_WINDOW_SIZE: usize = 5;

/// Anaphoric cue phrases that trigger follow-up resolution.
///
/// Fixed list, matched case-insensitively as substrings; a cue only
/// resolves when a prior item reference exists.
const ANAPHORIC_CUES: &[&str] = &[
    "more detail",
    "more details",
    "more info",
    "more information",
    "tell me more",
    "expand on that",
    "that task",
    "that item",
    "this task",
    "this item",
    "its subitems",
    "its subtasks",
    "its comments",
    "who is assigned to it",
    "what about it",
];

// ============================================================================
// ConversationId
// ============================================================================

/// Identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Generate a fresh conversation id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// ConversationContext
// ============================================================================

/// One remembered turn.
#[derive(Debug, Clone)]
pub struct Turn {
    /// The question as asked.
    pub question: String,
    /// The item the answer resolved to, if any.
    pub item_id: Option<ItemId>,
}

/// Result of resolving a query against the context.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No cue detected (or no prior item); the query passes through
    /// unchanged and routes as a fresh query.
    PassThrough,
    /// An anaphoric cue resolved to the last discussed item; route as a
    /// detail lookup, bypassing retrieval.
    DetailLookup(ItemId),
}

/// Per-conversation mutable state: bounded turn window and last item.
#[derive(Debug)]
pub struct ConversationContext {
    turns: VecDeque<Turn>,
    window_size: usize,
    last_item_id: Option<ItemId>,
}

impl ConversationContext {
    /// Create an empty context with the given window size.
    pub fn new(window_size: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            window_size: window_size.max(1),
            last_item_id: None,
        }
    }

    /// Resolve a query against this context.
    ///
    /// Detects anaphoric cues via the fixed phrase list; a cue plus a known
    /// last item yields [`Resolution::DetailLookup`]. Everything else
    /// passes through unchanged.
    pub fn resolve(&self, query: &str) -> Resolution {
        let lower = query.to_lowercase();
        let has_cue = ANAPHORIC_CUES.iter().any(|cue| lower.contains(cue));

        match (&self.last_item_id, has_cue) {
            (Some(item_id), true) => {
                tracing::debug!(item = %item_id, "Anaphoric cue resolved to last item");
                Resolution::DetailLookup(item_id.clone())
            }
            _ => Resolution::PassThrough,
        }
    }

    /// Record a completed turn, evicting the oldest once the window
    /// exceeds its size (FIFO).
    pub fn update(&mut self, question: impl Into<String>, resolved_item: Option<ItemId>) {
        if let Some(ref item_id) = resolved_item {
            self.last_item_id = Some(item_id.clone());
        }

        self.turns.push_back(Turn {
            question: question.into(),
            item_id: resolved_item,
        });
        while self.turns.len() > self.window_size {
            self.turns.pop_front();
        }
    }

    /// The most recently discussed item, if any.
    pub fn last_item_id(&self) -> Option<&ItemId> {
        self.last_item_id.as_ref()
    }

    /// The remembered turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    /// Number of remembered turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}
