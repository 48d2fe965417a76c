//! Shared fixtures for engine integration tests: a small backlog corpus
//! and scripted collaborator doubles.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use braq_core::{
    BraqError, EmbeddingBackend, IntentClassification, IntentLabel, InMemoryItemIndex, Item,
    ItemAttributes, LanguageModel, PriorityCategory, RerankBackend, StatusCategory,
};

/// Embedding stub projecting known topic words onto fixed axes.
pub struct StubEmbedder;

impl StubEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let axes = ["login", "payment", "deploy", "mobile", "report"];
        axes.iter()
            .map(|axis| if lower.contains(axis) { 1.0 } else { 0.0 })
            .collect()
    }
}

impl EmbeddingBackend for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, BraqError> {
        Ok(Self::vector(text))
    }

    fn dimension(&self) -> usize {
        5
    }
}

/// Reranker double scoring by plain word overlap.
pub struct OverlapReranker;

impl RerankBackend for OverlapReranker {
    fn score(&self, query: &str, documents: &[String]) -> Result<Vec<f32>, BraqError> {
        let query_lower = query.to_lowercase();
        let query_words: std::collections::HashSet<&str> = query_lower.split_whitespace().collect();
        Ok(documents
            .iter()
            .map(|doc| {
                let doc_lower = doc.to_lowercase();
                let doc_words: std::collections::HashSet<&str> =
                    doc_lower.split_whitespace().collect();
                query_words.iter().filter(|w| doc_words.contains(*w)).count() as f32
            })
            .collect())
    }
}

/// Scripted language model recording its calls.
///
/// Synthesis echoes the distinct-value count when the context block is a
/// delegation summary, so tests can assert grounded numbers end to end.
#[derive(Default)]
pub struct ScriptedModel {
    pub classify_calls: AtomicUsize,
    pub synthesize_calls: AtomicUsize,
    pub last_context: Mutex<Option<String>>,
    pub fail_synthesis: bool,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_synthesis() -> Self {
        Self {
            fail_synthesis: true,
            ..Self::default()
        }
    }

    pub fn synthesize_count(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }

    pub fn classify_count(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for ScriptedModel {
    fn classify_intent(&self, query: &str) -> Result<IntentClassification, BraqError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let lower = query.to_lowercase();
        let (label, confidence) = if lower.contains("status of") {
            (IntentLabel::Detail, 0.9)
        } else {
            (IntentLabel::Retrieve, 0.4)
        };
        Ok(IntentClassification { label, confidence })
    }

    fn synthesize_answer(&self, _query: &str, context_block: &str) -> Result<String, BraqError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_synthesis {
            return Err(BraqError::CollaboratorUnavailable {
                collaborator: "language-model".to_string(),
                reason: "synthesis timeout".to_string(),
            });
        }

        *self.last_context.lock().unwrap() = Some(context_block.to_string());

        // Delegation summaries end with "Distinct values: N"
        if let Some(rest) = context_block.split("Distinct values: ").nth(1) {
            let n: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            return Ok(format!("There are {} of them.", n));
        }

        Ok(format!(
            "Synthesized answer grounded on: {}",
            context_block.lines().next().unwrap_or("")
        ))
    }
}

/// Handle to a [`ScriptedModel`] that can outlive the engine owning it,
/// so tests can assert call counts after answering.
#[derive(Clone)]
pub struct SharedModel(pub Arc<ScriptedModel>);

impl SharedModel {
    pub fn new() -> Self {
        Self(Arc::new(ScriptedModel::new()))
    }
}

impl LanguageModel for SharedModel {
    fn classify_intent(&self, query: &str) -> Result<IntentClassification, BraqError> {
        self.0.classify_intent(query)
    }

    fn synthesize_answer(&self, query: &str, context_block: &str) -> Result<String, BraqError> {
        self.0.synthesize_answer(query, context_block)
    }
}

/// Build the test backlog: 15 items across three sprints.
///
/// Sprint 3 holds 8 items with exactly one `done`, so manual-count answers
/// are checkable by eye; T301 is the login item used for follow-up
/// resolution.
pub fn backlog_index() -> InMemoryItemIndex {
    let mut index = InMemoryItemIndex::new();

    let rows: Vec<(&str, &str, &str, StatusCategory, PriorityCategory, bool, Vec<&str>)> = vec![
        // Sprint 1 (3 items, all done)
        ("T101", "Set up the project repository", "Sprint 1", StatusCategory::Done, PriorityCategory::Normal, false, vec!["Ana"]),
        ("T102", "Initial login screen", "Sprint 1", StatusCategory::Done, PriorityCategory::Normal, false, vec!["Jorge"]),
        ("T103", "Continuous deploy pipeline", "Sprint 1", StatusCategory::Done, PriorityCategory::High, false, vec!["Ana"]),
        // Sprint 2 (4 items)
        ("T201", "Payment provider evaluation", "Sprint 2", StatusCategory::Done, PriorityCategory::High, false, vec!["Jorge"]),
        ("T202", "Payment gateway integration", "Sprint 2", StatusCategory::InProgress, PriorityCategory::Urgent, true, vec!["Jorge"]),
        ("T203", "Mobile layout fixes", "Sprint 2", StatusCategory::Done, PriorityCategory::Low, false, vec!["Ana"]),
        ("T204", "Deploy monitoring dashboards", "Sprint 2", StatusCategory::InProgress, PriorityCategory::Normal, false, vec![]),
        // Sprint 3 (8 items, exactly one done)
        ("T301", "Fix the login timeout on the auth service", "Sprint 3", StatusCategory::Done, PriorityCategory::Urgent, false, vec!["Jorge"]),
        ("T302", "Login page styling broken on mobile", "Sprint 3", StatusCategory::InProgress, PriorityCategory::High, false, vec!["Ana"]),
        ("T303", "Payment reconciliation report", "Sprint 3", StatusCategory::InProgress, PriorityCategory::Normal, false, vec!["Jorge"]),
        ("T304", "Deploy canary environment", "Sprint 3", StatusCategory::Todo, PriorityCategory::Normal, true, vec!["Ana"]),
        ("T305", "Refresh tokens for the login flow", "Sprint 3", StatusCategory::Todo, PriorityCategory::High, false, vec!["Jorge"]),
        ("T306", "Mobile push notifications", "Sprint 3", StatusCategory::Todo, PriorityCategory::Low, false, vec![]),
        ("T307", "Payment retry queue", "Sprint 3", StatusCategory::InProgress, PriorityCategory::Urgent, true, vec!["Jorge"]),
        ("T308", "Quarterly usage report export", "Sprint 3", StatusCategory::Todo, PriorityCategory::Normal, false, vec!["Ana"]),
    ];

    for (id, content, iteration, status, priority, blocked, assignees) in rows {
        let attrs = ItemAttributes {
            iteration: Some(iteration.to_string()),
            status,
            priority,
            is_blocked: blocked,
            assignees: assignees.into_iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        let embedding = StubEmbedder::vector(content);
        index.insert(Item::with_attributes(id, content, attrs), Some(embedding));
    }

    index
}
