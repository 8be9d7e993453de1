//! End-to-end pipeline scenarios driven by the scripted stub provider.
//!
//! Each test scripts the exact provider replies the pipeline will consume,
//! in call order: classify, plan, then per task select / execute / replan,
//! and finally synthesize.

use docsight::providers::{StubProvider, StubReply};
use docsight::{
    Agent, AgentConfig, Document, ErrorKind, ImageSource, InMemoryStorage, Page, QueryOutcome,
    TaskStatus,
};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn document(id: &str, name: &str, summary: &str, pages: u32) -> Document {
    Document::new(id, name).with_summary(summary).with_pages(
        (1..=pages)
            .map(|n| Page::new(n, ImageSource::bytes(vec![n as u8], "image/jpeg")))
            .collect(),
    )
}

fn agent_with(
    script: Vec<StubReply>,
    documents: Vec<Document>,
    config: AgentConfig,
) -> (Agent, Arc<StubProvider>) {
    let stub = Arc::new(StubProvider::new(script));
    let storage = Arc::new(InMemoryStorage::new(documents));
    let agent = Agent::new(stub.clone(), storage, config);
    (agent, stub)
}

fn classify_needs_documents() -> StubReply {
    StubReply::text(r#"{"needs_documents": true, "reasoning": "asks about stored documents"}"#)
}

fn keep_plan() -> StubReply {
    StubReply::text(r#"{"action": "keep"}"#)
}

// ============================================================================
// SCENARIO 1: DIRECT ANSWER
// ============================================================================

#[tokio::test]
async fn direct_answer_short_circuits_pipeline() {
    let (agent, stub) = agent_with(
        vec![StubReply::text(
            r#"{"needs_documents": false, "reasoning": "capability question", "direct_answer": "I analyze documents."}"#,
        )],
        vec![document("d1", "Q3", "Q3 financials", 4)],
        AgentConfig::default(),
    );

    let result = agent
        .process_query("Hello, what can you do?", &[])
        .await
        .unwrap();

    assert_eq!(result.answer, "I analyze documents.");
    assert_eq!(result.outcome, QueryOutcome::DirectAnswer);
    assert!(result.tasks.is_empty());
    assert!(result.pages.is_empty());
    assert_eq!(result.iterations, 0);
    // Exactly one provider call: no planner, selector, executor, or
    // synthesizer ran.
    assert_eq!(stub.call_count(), 1);
}

// ============================================================================
// SCENARIO 2: SINGLE-TASK FLOW
// ============================================================================

#[tokio::test]
async fn single_task_flow_selects_executes_synthesizes() -> anyhow::Result<()> {
    init_tracing();
    let (agent, stub) = agent_with(
        vec![
            classify_needs_documents(),
            StubReply::text(
                r#"[{"name": "find-revenue", "description": "Locate Q3 revenue figures", "document_id": "d1"}]"#,
            ),
            StubReply::text(r#"{"selected_pages": [2, 3], "reasoning": "revenue tables"}"#),
            StubReply::text("Revenue: $10M (page 2)."),
            keep_plan(),
            StubReply::text("Q3 revenue was $10M (page 2)."),
        ],
        vec![document("d1", "Q3", "Q3 financials", 4)],
        AgentConfig::default(),
    );

    let result = agent.process_query("What were Q3 revenues?", &[]).await?;

    assert!(result.answer.contains("$10M"));
    assert_eq!(result.outcome, QueryOutcome::Answered);
    assert_eq!(result.iterations, 1);

    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].status, TaskStatus::Completed);
    assert_eq!(result.tasks[0].document_id, "d1");

    let selected: Vec<u32> = result.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(selected, vec![2, 3]);

    // Page provenance: every selected page belongs to the assigned document
    assert_eq!(result.task_results.len(), 1);
    assert_eq!(result.task_results[0].document_id, "d1");

    // The executor saw the two selected images, not all four
    let calls = stub.calls();
    let execute_call = &calls[3];
    assert!(execute_call.multimodal);
    assert_eq!(execute_call.image_count, 2);
    Ok(())
}

// ============================================================================
// SCENARIO 3: ADAPTIVE REMOVAL
// ============================================================================

#[tokio::test]
async fn sufficient_verdict_drops_pending_tasks() {
    let (agent, _stub) = agent_with(
        vec![
            classify_needs_documents(),
            StubReply::text(
                r#"[
                    {"name": "t1", "description": "first look", "document_id": "d1"},
                    {"name": "t2", "description": "second look", "document_id": "d2"},
                    {"name": "t3", "description": "third look", "document_id": "d1"}
                ]"#,
            ),
            StubReply::text(r#"{"selected_pages": [1], "reasoning": "r"}"#),
            StubReply::text("Everything needed was on page 1."),
            StubReply::text(r#"{"action": "sufficient"}"#),
            StubReply::text("The answer, from one task."),
        ],
        vec![
            document("d1", "Q3", "Q3 financials", 2),
            document("d2", "Handbook", "policies", 2),
        ],
        AgentConfig::default(),
    );

    let result = agent.process_query("What does the report say?", &[]).await.unwrap();

    assert_eq!(result.iterations, 1);
    assert_eq!(result.task_results.len(), 1);
    // Pending tasks t2 and t3 were dropped; only the completed task remains
    assert_eq!(result.tasks.len(), 1);
    assert_eq!(result.tasks[0].name, "t1");
    assert_eq!(result.tasks[0].status, TaskStatus::Completed);
    assert_eq!(result.answer, "The answer, from one task.");
}

// ============================================================================
// SCENARIO 4: SELECTION FALLBACK
// ============================================================================

#[tokio::test]
async fn malformed_selection_falls_back_to_leading_pages() {
    let (agent, _stub) = agent_with(
        vec![
            classify_needs_documents(),
            StubReply::text(r#"[{"name": "t1", "description": "look", "document_id": "d1"}]"#),
            StubReply::text("hmm, pages two and three I think?"), // not JSON
            StubReply::text("Analysis from the fallback pages."),
            keep_plan(),
            StubReply::text("Answer."),
        ],
        vec![document("d1", "Q3", "Q3 financials", 3)],
        AgentConfig::default(),
    );

    let result = agent.process_query("q", &[]).await.unwrap();

    // Deterministic fallback: first min(3, max_pages_per_task) pages
    let selected: Vec<u32> = result.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(selected, vec![1, 2, 3]);
    assert_eq!(result.tasks[0].status, TaskStatus::Completed);
}

// ============================================================================
// SCENARIO 5: RETRY EXHAUSTION
// ============================================================================

#[tokio::test(start_paused = true)]
async fn retry_exhaustion_fails_task_but_not_query() {
    // retry_attempts = 3 means up to 4 calls on the wire; all four are
    // rate-limited, so task t1 fails and t2 proceeds.
    let (agent, _stub) = agent_with(
        vec![
            classify_needs_documents(),
            StubReply::text(
                r#"[
                    {"name": "t1", "description": "first", "document_id": "d1"},
                    {"name": "t2", "description": "second", "document_id": "d2"}
                ]"#,
            ),
            // t1 selection: rate limited through the whole retry budget
            StubReply::RateLimited,
            StubReply::RateLimited,
            StubReply::RateLimited,
            StubReply::RateLimited,
            keep_plan(),
            // t2 runs normally
            StubReply::text(r#"{"selected_pages": [1], "reasoning": "r"}"#),
            StubReply::text("Found the policy on page 1."),
            keep_plan(),
            StubReply::text("Partial answer: one document could not be analyzed."),
        ],
        vec![
            document("d1", "Q3", "Q3 financials", 2),
            document("d2", "Handbook", "policies", 2),
        ],
        AgentConfig::default(),
    );

    let result = agent.process_query("q", &[]).await.unwrap();

    assert_eq!(result.outcome, QueryOutcome::Answered);
    assert_eq!(result.iterations, 2);

    assert_eq!(result.tasks[0].status, TaskStatus::Failed);
    assert_eq!(result.tasks[0].failure, Some(ErrorKind::RateLimited));
    assert_eq!(result.tasks[1].status, TaskStatus::Completed);

    assert_eq!(result.task_results.len(), 1);
    assert!(result.answer.contains("Partial answer"));
}

// ============================================================================
// SCENARIO 6: ITERATION CAP
// ============================================================================

#[tokio::test]
async fn iteration_cap_terminates_with_partial_plan() {
    let config = AgentConfig::builder()
        .max_agent_iterations(2)
        .build()
        .unwrap();

    let (agent, _stub) = agent_with(
        vec![
            classify_needs_documents(),
            StubReply::text(
                r#"[
                    {"name": "t1", "description": "a", "document_id": "d1"},
                    {"name": "t2", "description": "b", "document_id": "d1"},
                    {"name": "t3", "description": "c", "document_id": "d1"},
                    {"name": "t4", "description": "d", "document_id": "d1"}
                ]"#,
            ),
            StubReply::text(r#"{"selected_pages": [1], "reasoning": "r"}"#),
            StubReply::text("analysis one"),
            keep_plan(),
            StubReply::text(r#"{"selected_pages": [2], "reasoning": "r"}"#),
            StubReply::text("analysis two"),
            // No replan after the second task: the iteration budget is spent
            StubReply::text("Synthesis over the two completed analyses."),
        ],
        vec![document("d1", "Q3", "Q3 financials", 4)],
        config,
    );

    let result = agent.process_query("q", &[]).await.unwrap();

    assert_eq!(result.iterations, 2);
    assert_eq!(result.outcome, QueryOutcome::Answered);

    let completed = result
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Completed)
        .count();
    let pending = result
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();
    assert_eq!(completed, 2);
    assert_eq!(pending, 2);
    assert_eq!(result.task_results.len(), 2);
    assert!(result.answer.contains("Synthesis"));
}
