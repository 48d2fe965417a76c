//! End-to-end scenarios for the answer engine against a fixed backlog,
//! with scripted collaborator doubles.

mod common;

use braq_core::{
    AnswerEngine, ConversationId, CorpusConfig, Degradation, EngineConfig, FilterPredicate,
    GroupAttribute, InMemoryItemIndex, QueryIntent, StatusCategory, NO_DATA_ANSWER,
    DEGRADED_SYNTHESIS_ANSWER,
};
use common::{backlog_index, OverlapReranker, ScriptedModel, SharedModel, StubEmbedder};

fn test_config() -> EngineConfig {
    EngineConfig {
        corpus: CorpusConfig {
            current_iteration: Some("Sprint 3".to_string()),
            roster: vec!["Jorge".to_string(), "Ana".to_string()],
            iteration_template: "Sprint {n}".to_string(),
        },
        ..Default::default()
    }
}

fn engine_with_model(model: ScriptedModel) -> AnswerEngine {
    AnswerEngine::new(test_config(), Box::new(backlog_index()))
        .unwrap()
        .with_embedder(Box::new(StubEmbedder))
        .with_reranker(Box::new(OverlapReranker))
        .with_language_model(Box::new(model))
}

fn engine_without_model() -> AnswerEngine {
    AnswerEngine::new(test_config(), Box::new(backlog_index()))
        .unwrap()
        .with_embedder(Box::new(StubEmbedder))
        .with_reranker(Box::new(OverlapReranker))
}

#[test]
fn manual_count_path_answers_exactly() {
    // Sprint 3 has 8 items, exactly 1 done. The manual path must answer
    // "1" deterministically, without any synthesis call.
    let model = SharedModel::new();
    let engine = AnswerEngine::new(test_config(), Box::new(backlog_index()))
        .unwrap()
        .with_language_model(Box::new(model.clone()));
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("how many completed tasks in sprint 3", &conversation)
        .unwrap();

    assert_eq!(answer.intent, QueryIntent::CountOrCheck);
    assert_eq!(answer.text, "There is 1 completed item in Sprint 3.");
    assert!(!answer.is_degraded());
    // The manual path pays no model latency at all
    assert_eq!(model.0.synthesize_count(), 0);
    assert_eq!(model.0.classify_count(), 0);
}

#[test]
fn manual_count_compound_filter() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    // Jorge has T303 (in progress) and T307 (in progress) in Sprint 3
    let answer = engine
        .answer(
            "how many tasks in progress does Jorge have in sprint 3",
            &conversation,
        )
        .unwrap();

    assert_eq!(answer.intent, QueryIntent::CountOrCheck);
    assert!(
        answer.text.contains("2"),
        "expected 2 in: {}",
        answer.text
    );
}

#[test]
fn existence_check_yes_no() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("are there any blocked tasks in sprint 3?", &conversation)
        .unwrap();
    assert_eq!(answer.intent, QueryIntent::CountOrCheck);
    assert!(answer.text.starts_with("Yes"), "got: {}", answer.text);

    let answer = engine
        .answer("are there any blocked tasks in sprint 1?", &conversation)
        .unwrap();
    assert!(answer.text.starts_with("No"), "got: {}", answer.text);
}

#[test]
fn distinct_iteration_count_delegates_with_grounded_summary() {
    // Three distinct sprints exist. The manual path does not cover
    // distinct-value counts; the router must delegate with an exact
    // per-group summary, and the phrased answer must carry the number 3.
    let model = SharedModel::new();
    let engine = AnswerEngine::new(test_config(), Box::new(backlog_index()))
        .unwrap()
        .with_language_model(Box::new(model.clone()));
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("how many sprints are there?", &conversation)
        .unwrap();

    assert_eq!(answer.intent, QueryIntent::CountOrCheck);
    assert!(answer.text.contains('3'), "got: {}", answer.text);
    // One phrasing call, fed the summary table rather than item text
    assert_eq!(model.0.synthesize_count(), 1);
    let context = model.0.last_context.lock().unwrap().clone().unwrap();
    assert!(context.contains("Distinct values: 3"));
    assert!(!context.contains("auth service"));
}

#[test]
fn delegation_context_is_summary_not_raw_items() {
    let engine = AnswerEngine::new(test_config(), Box::new(backlog_index()))
        .unwrap()
        .with_language_model(Box::new(ScriptedModel::new()));
    let conversation = ConversationId::generate();

    let _ = engine
        .answer("how many sprints are there?", &conversation)
        .unwrap();

    // Reach into the grouped summary directly to confirm its shape
    let grouped = engine.group_by(GroupAttribute::Iteration, &FilterPredicate::empty());
    assert_eq!(grouped.distinct(), 3);
    let block = grouped.to_summary_block();
    assert!(block.contains("Sprint 3: 8"));
    assert!(!block.contains("auth service"), "summary must not carry item text");
}

#[test]
fn nonexistent_iteration_yields_no_match_text() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("how many tasks in sprint 42", &conversation)
        .unwrap();
    assert_eq!(answer.text, "There are no items in Sprint 42.");

    let answer = engine
        .answer("show login work in sprint 42", &conversation)
        .unwrap();
    assert_eq!(answer.intent, QueryIntent::Retrieve);
    assert!(answer.text.starts_with("No items in Sprint 42"), "got: {}", answer.text);
}

#[test]
fn followup_resolves_to_last_item_bypassing_retrieval() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    // First turn retrieves; the top source becomes the anaphora target
    let first = engine
        .answer("login timeout problems", &conversation)
        .unwrap();
    assert_eq!(first.intent, QueryIntent::Retrieve);
    let top = first.sources.first().cloned().expect("retrieval produced sources");

    let followup = engine.answer("give me more detail", &conversation).unwrap();
    assert_eq!(followup.intent, QueryIntent::Detail);
    assert_eq!(followup.sources, vec![top.clone()]);
    // Detail block contains the full attribute rendering of that item
    assert!(followup.text.contains(&format!("Item {}", top)));
}

#[test]
fn followup_without_prior_turn_routes_fresh() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine.answer("give me more detail", &conversation).unwrap();
    // No prior item: the cue passes through and routes as a fresh query
    assert_ne!(answer.intent, QueryIntent::Detail);
}

#[test]
fn empty_corpus_answers_no_data() {
    let engine = AnswerEngine::new(test_config(), Box::new(InMemoryItemIndex::new())).unwrap();
    let conversation = ConversationId::generate();

    let answer = engine.answer("how many tasks are there", &conversation).unwrap();
    assert_eq!(answer.text, NO_DATA_ANSWER);
}

#[test]
fn synthesis_failure_degrades_without_leaking_context() {
    let engine = engine_with_model(ScriptedModel::failing_synthesis());
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("tell me about the login timeout work", &conversation)
        .unwrap();

    assert_eq!(answer.text, DEGRADED_SYNTHESIS_ANSWER);
    assert!(answer.degradations.contains(&Degradation::Unsynthesized));
    // Raw excerpts must not be surfaced as if they were an answer
    assert!(!answer.text.contains("auth service"));
}

#[test]
fn report_uses_current_iteration_when_unnamed() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("summarize the current sprint", &conversation)
        .unwrap();

    assert_eq!(answer.intent, QueryIntent::Report);
    assert!(answer.text.contains("Sprint 3"));
    assert!(answer.text.contains("- total items: 8"));
}

#[test]
fn compare_merges_metrics_in_caller_order() {
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("compare sprint 2 and sprint 1", &conversation)
        .unwrap();

    assert_eq!(answer.intent, QueryIntent::Compare);
    let pos_2 = answer.text.find("Sprint 2").unwrap();
    let pos_1 = answer.text.find("Sprint 1").unwrap();
    assert!(pos_2 < pos_1, "requested order must be preserved");
}

#[test]
fn count_over_full_set_not_topk() {
    // 8 items in Sprint 3 exceeds the default final_k of 6; the count must
    // still see all 8.
    let engine = engine_without_model();
    let conversation = ConversationId::generate();

    let answer = engine
        .answer("how many tasks in sprint 3", &conversation)
        .unwrap();
    assert!(answer.text.contains("8"), "got: {}", answer.text);
}

#[test]
fn engine_count_matches_get_by_filter() {
    use braq_core::ItemIndex;

    let engine = engine_without_model();
    let index = backlog_index();
    let predicate = FilterPredicate {
        iteration: Some("Sprint 3".to_string()),
        status: Some(StatusCategory::Todo),
        ..Default::default()
    };

    assert_eq!(
        engine.count(&predicate),
        index.get_by_filter(&predicate, None).unwrap().len()
    );
}

#[test]
fn retrieval_is_idempotent_at_engine_level() {
    let engine = engine_without_model();

    let first = engine
        .retrieve("payment work", &FilterPredicate::empty(), 6)
        .unwrap();
    let second = engine
        .retrieve("payment work", &FilterPredicate::empty(), 6)
        .unwrap();

    let ids_first: Vec<String> = first
        .candidates
        .iter()
        .map(|c| c.item.id.to_string())
        .collect();
    let ids_second: Vec<String> = second
        .candidates
        .iter()
        .map(|c| c.item.id.to_string())
        .collect();
    assert_eq!(ids_first, ids_second);
}

#[test]
fn metrics_via_engine() {
    let engine = engine_without_model();
    let metrics = engine.metrics("Sprint 3");

    assert_eq!(metrics.total, 8);
    assert!((metrics.completion_ratio - 0.125).abs() < 1e-9);
    assert_eq!(metrics.blocked_count, 2);
}
