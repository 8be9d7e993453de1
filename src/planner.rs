//! Task planning: initial plan creation and adaptive revision.
//!
//! The planner is stateless. [`TaskPlanner::create_initial_plan`] turns a
//! query plus the document catalog into 1..=cap pending tasks;
//! [`TaskPlanner::update_plan`] is a pure `(plan, new result) → plan'`
//! transformation the agent applies between task executions. Neither
//! function calls back into the agent.
//!
//! Model output is validated hard: unknown document ids are dropped, a task
//! spanning several documents triggers one corrective re-request, the plan
//! is truncated to its cap, and pending tasks are the only thing an update
//! may touch. A reply that doesn't parse leaves the plan exactly as it was.

use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::jsonx;
use crate::prompts::{PLAN_UPDATE_PROMPT, PLANNING_PROMPT, PLANNING_RETRY_NOTE};
use crate::providers::{Provider, ProviderMessage};
use crate::types::{AgentTask, DocumentInfo, TaskPlan, TaskResult, TaskStatus};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates and revises task plans.
pub struct TaskPlanner {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

impl TaskPlanner {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    // ========================================================================
    // INITIAL PLAN
    // ========================================================================

    /// Build the initial plan for a query over the document catalog.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the catalog is empty (nothing to plan over);
    /// provider errors bubble up unchanged. Unusable model output is not an
    /// error: the fallback plan assigns one generic task per document.
    pub async fn create_initial_plan(
        &self,
        query: &str,
        catalog: &[DocumentInfo],
    ) -> Result<TaskPlan> {
        if catalog.is_empty() {
            return Err(Error::config("cannot plan: no documents in storage"));
        }

        let request = self.planning_request(query, catalog, false);
        let raw = self.call_text(&request).await?;
        let (mut tasks, had_violation) = parse_planned_tasks(&raw, catalog);

        // One corrective round-trip when the model bound a task to several
        // documents; afterwards we keep whatever validates.
        if had_violation {
            debug!("initial plan bound multiple documents to one task, re-requesting");
            let retry_request = self.planning_request(query, catalog, true);
            let raw = self.call_text(&retry_request).await?;
            let (retry_tasks, _) = parse_planned_tasks(&raw, catalog);
            if !retry_tasks.is_empty() {
                tasks = retry_tasks;
            }
        }

        if tasks.is_empty() {
            warn!("initial plan unusable, falling back to one task per document");
            tasks = fallback_tasks(query, catalog);
        }

        tasks.truncate(self.config.max_tasks_per_plan);
        Ok(TaskPlan::new(tasks))
    }

    fn planning_request(
        &self,
        query: &str,
        catalog: &[DocumentInfo],
        retry: bool,
    ) -> Vec<ProviderMessage> {
        let mut system = PLANNING_PROMPT.to_string();
        if retry {
            system.push_str("\n\n");
            system.push_str(PLANNING_RETRY_NOTE);
        }

        let mut user = String::from("Available documents:\n");
        for doc in catalog {
            match &doc.summary {
                Some(summary) => {
                    user.push_str(&format!("- id: {} | name: {} | {}\n", doc.id, doc.name, summary))
                }
                None => user.push_str(&format!("- id: {} | name: {}\n", doc.id, doc.name)),
            }
        }
        user.push_str("\nQuery: ");
        user.push_str(query);

        vec![ProviderMessage::system(system), ProviderMessage::user(user)]
    }

    // ========================================================================
    // PLAN UPDATE
    // ========================================================================

    /// Revise the plan after a task finished.
    ///
    /// Applies the model's suggested edits to pending tasks only: drop all
    /// of them when the results are `sufficient`, otherwise removals first,
    /// then description rewrites, then at most one appended task (bounded
    /// by the plan cap, the remaining iteration budget, and the catalog).
    /// Unparseable output leaves the plan untouched.
    pub async fn update_plan(
        &self,
        plan: &mut TaskPlan,
        just_completed: &AgentTask,
        completed_results: &[TaskResult],
        catalog: &[DocumentInfo],
    ) -> Result<()> {
        if plan.pending_count() == 0 && plan.tasks.len() >= self.config.max_tasks_per_plan {
            // Nothing to edit and no room to add
            return Ok(());
        }

        let request = self.update_request(plan, just_completed, completed_results);
        let raw = self.call_text(&request).await?;

        let Some(edits) = parse_plan_edits(&raw) else {
            debug!("plan update reply unparseable, keeping plan unchanged");
            return Ok(());
        };

        self.apply_edits(plan, edits, catalog);
        Ok(())
    }

    fn update_request(
        &self,
        plan: &TaskPlan,
        just_completed: &AgentTask,
        completed_results: &[TaskResult],
    ) -> Vec<ProviderMessage> {
        let mut user = String::new();

        user.push_str(&format!(
            "Task just finished: {} — {}\n",
            just_completed.name, just_completed.description
        ));
        if let Some(result) = &just_completed.result {
            user.push_str(&format!("Its analysis:\n{}\n\n", result));
        }

        if completed_results.len() > 1 {
            user.push_str("Earlier completed tasks:\n");
            for result in &completed_results[..completed_results.len() - 1] {
                user.push_str(&format!("- {}: {}\n", result.task_name, result.analysis));
            }
            user.push('\n');
        }

        user.push_str("Remaining pending tasks:\n");
        let mut any_pending = false;
        for task in &plan.tasks {
            if task.status == TaskStatus::Pending {
                any_pending = true;
                user.push_str(&format!(
                    "- {} (document {}): {}\n",
                    task.name, task.document_id, task.description
                ));
            }
        }
        if !any_pending {
            user.push_str("(none)\n");
        }

        vec![
            ProviderMessage::system(PLAN_UPDATE_PROMPT),
            ProviderMessage::user(user),
        ]
    }

    fn apply_edits(&self, plan: &mut TaskPlan, edits: Vec<PlanEdit>, catalog: &[DocumentInfo]) {
        if edits.iter().any(|e| matches!(e, PlanEdit::Sufficient)) {
            debug!("planner reports results sufficient, dropping pending tasks");
            plan.drop_pending();
            return;
        }

        // Removals before additions; earlier-listed edits win conflicts.
        let mut edited: HashSet<String> = HashSet::new();
        for edit in &edits {
            if let PlanEdit::Remove { task } = edit {
                if edited.contains(task) {
                    continue;
                }
                let target = plan.tasks.iter().position(|t| {
                    t.status == TaskStatus::Pending && t.name == *task
                });
                if let Some(index) = target {
                    plan.tasks.remove(index);
                    edited.insert(task.clone());
                }
            }
        }

        for edit in &edits {
            if let PlanEdit::Modify { task, description } = edit {
                if edited.contains(task) {
                    continue;
                }
                let target = plan
                    .tasks
                    .iter_mut()
                    .find(|t| t.status == TaskStatus::Pending && t.name == *task);
                if let Some(pending) = target {
                    pending.description = description.clone();
                    edited.insert(task.clone());
                }
            }
        }

        // At most one addition, and only when both the plan cap and the
        // iteration budget leave room to actually run it.
        let budget_left = (self.config.max_agent_iterations as usize)
            .saturating_sub(plan.iterations as usize)
            > plan.pending_count();
        if plan.tasks.len() < self.config.max_tasks_per_plan && budget_left {
            for edit in &edits {
                if let PlanEdit::Add {
                    name,
                    description,
                    document_id,
                } = edit
                {
                    if !catalog.iter().any(|d| d.id == *document_id) {
                        debug!(document_id = %document_id, "dropping added task with unknown document");
                        continue;
                    }
                    plan.tasks.push(AgentTask::new(
                        name.clone(),
                        description.clone(),
                        document_id.clone(),
                    ));
                    break;
                }
            }
        }
    }

    async fn call_text(&self, messages: &[ProviderMessage]) -> Result<String> {
        self.provider
            .process_text(
                messages,
                self.config.max_tokens_text,
                self.config.temperatures.planning,
            )
            .await
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse the planning reply into validated tasks.
///
/// Returns the valid single-document tasks plus whether any task violated
/// the one-document rule (a re-request trigger, not a drop-silently case).
fn parse_planned_tasks(raw: &str, catalog: &[DocumentInfo]) -> (Vec<AgentTask>, bool) {
    let Ok(items) = jsonx::parse_array::<Vec<Value>>(raw) else {
        return (Vec::new(), false);
    };

    let known: HashSet<&str> = catalog.iter().map(|d| d.id.as_str()).collect();
    let mut tasks = Vec::new();
    let mut violation = false;

    for (index, item) in items.iter().enumerate() {
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("task-{}", index + 1));
        let description = item
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        match single_document_id(item.get("document_id"), &known) {
            DocRef::One(id) => tasks.push(AgentTask::new(name, description, id)),
            DocRef::Several => violation = true,
            DocRef::Unknown => {
                debug!(task = %name, "dropping planned task with unknown document id");
            }
        }
    }

    (tasks, violation)
}

enum DocRef {
    One(String),
    Several,
    Unknown,
}

/// Resolve a planned task's `document_id` field to exactly one known id.
///
/// A JSON array, or a string naming more than one catalog id (comma or
/// whitespace separated), counts as a one-document-rule violation.
fn single_document_id(value: Option<&Value>, known: &HashSet<&str>) -> DocRef {
    match value {
        Some(Value::String(s)) => {
            let ids: Vec<&str> = s
                .split(|c: char| c == ',' || c.is_whitespace())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .collect();
            match ids.as_slice() {
                [] => DocRef::Unknown,
                [only] if known.contains(only) => DocRef::One((*only).to_string()),
                [_] => DocRef::Unknown,
                several if several.iter().filter(|id| known.contains(*id)).count() > 1 => {
                    DocRef::Several
                }
                _ => DocRef::Unknown,
            }
        }
        Some(Value::Array(items)) if items.len() > 1 => DocRef::Several,
        Some(Value::Array(items)) => match items.first().and_then(Value::as_str) {
            Some(id) if known.contains(id) => DocRef::One(id.to_string()),
            _ => DocRef::Unknown,
        },
        _ => DocRef::Unknown,
    }
}

fn fallback_tasks(query: &str, catalog: &[DocumentInfo]) -> Vec<AgentTask> {
    catalog
        .iter()
        .enumerate()
        .map(|(index, doc)| {
            AgentTask::new(
                format!("analyze-{}", index + 1),
                format!("Find information relevant to \"{}\" in {}", query, doc.name),
                doc.id.clone(),
            )
        })
        .collect()
}

/// One suggested edit from the plan-update reply.
#[derive(Debug, Clone, PartialEq)]
enum PlanEdit {
    Keep,
    Sufficient,
    Modify { task: String, description: String },
    Remove { task: String },
    Add {
        name: String,
        description: String,
        document_id: String,
    },
}

/// Parse the plan-update reply: one edit object, or an array of them.
/// Returns `None` when nothing parseable was found.
fn parse_plan_edits(raw: &str) -> Option<Vec<PlanEdit>> {
    let values: Vec<Value> = if let Ok(list) = jsonx::parse_array::<Vec<Value>>(raw) {
        list
    } else if let Ok(single) = jsonx::parse_object::<Value>(raw) {
        vec![single]
    } else {
        return None;
    };

    let edits: Vec<PlanEdit> = values.iter().filter_map(parse_one_edit).collect();
    if edits.is_empty() { None } else { Some(edits) }
}

fn parse_one_edit(value: &Value) -> Option<PlanEdit> {
    let action = value.get("action")?.as_str()?;
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    match action {
        "keep" => Some(PlanEdit::Keep),
        "sufficient" => Some(PlanEdit::Sufficient),
        "modify" => Some(PlanEdit::Modify {
            task: field("task").or_else(|| field("name"))?,
            description: field("description")?,
        }),
        "remove" => Some(PlanEdit::Remove {
            task: field("task").or_else(|| field("name"))?,
        }),
        "add" => Some(PlanEdit::Add {
            name: field("name")?,
            description: field("description").unwrap_or_default(),
            document_id: field("document_id")?,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{StubProvider, StubReply};

    fn catalog() -> Vec<DocumentInfo> {
        vec![
            DocumentInfo::new("d1", "Q3 Report").with_summary("Q3 financials"),
            DocumentInfo::new("d2", "Handbook").with_summary("HR policies"),
        ]
    }

    fn planner(stub: StubProvider) -> TaskPlanner {
        TaskPlanner::new(Arc::new(stub), AgentConfig::default())
    }

    fn completed_task(name: &str, doc: &str) -> AgentTask {
        let mut task = AgentTask::new(name, "desc", doc);
        task.advance(TaskStatus::InProgress);
        task.advance(TaskStatus::Completed);
        task.result = Some("analysis".to_string());
        task
    }

    // ------------------------------------------------------------------ plan

    #[tokio::test]
    async fn test_initial_plan_happy_path() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"name": "find-revenue", "description": "Locate Q3 revenue figures", "document_id": "d1"},
                {"name": "check-policy", "description": "Find the travel policy", "document_id": "d2"}
            ]"#,
        )]);

        let plan = planner(stub)
            .create_initial_plan("Q3 revenue and travel policy?", &catalog())
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 2);
        assert!(plan.tasks.iter().all(|t| t.status == TaskStatus::Pending));
        assert_eq!(plan.tasks[0].document_id, "d1");
        assert_eq!(plan.tasks[1].document_id, "d2");
        assert_eq!(plan.iterations, 0);
    }

    #[tokio::test]
    async fn test_initial_plan_drops_unknown_document() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"name": "a", "description": "x", "document_id": "d1"},
                {"name": "b", "description": "y", "document_id": "ghost"}
            ]"#,
        )]);

        let plan = planner(stub)
            .create_initial_plan("q", &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].document_id, "d1");
    }

    #[tokio::test]
    async fn test_initial_plan_truncates_to_cap() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"name": "t1", "description": "x", "document_id": "d1"},
                {"name": "t2", "description": "x", "document_id": "d2"},
                {"name": "t3", "description": "x", "document_id": "d1"},
                {"name": "t4", "description": "x", "document_id": "d2"},
                {"name": "t5", "description": "x", "document_id": "d1"}
            ]"#,
        )]);

        let plan = planner(stub)
            .create_initial_plan("q", &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 4); // max_tasks_per_plan default
        assert_eq!(plan.tasks[3].name, "t4"); // order preserved
    }

    #[tokio::test]
    async fn test_initial_plan_rerequests_on_multi_document_task() {
        let stub = Arc::new(StubProvider::new(vec![
            StubReply::text(r#"[{"name": "both", "description": "x", "document_id": "d1, d2"}]"#),
            StubReply::text(
                r#"[
                    {"name": "first", "description": "x", "document_id": "d1"},
                    {"name": "second", "description": "x", "document_id": "d2"}
                ]"#,
            ),
        ]));
        let p = TaskPlanner::new(stub.clone(), AgentConfig::default());

        let plan = p.create_initial_plan("q", &catalog()).await.unwrap();

        assert_eq!(stub.call_count(), 2);
        assert_eq!(plan.tasks.len(), 2);
        // The corrective round-trip carried the retry note
        assert!(stub.calls()[1].text.contains("exactly one"));
    }

    #[tokio::test]
    async fn test_initial_plan_parse_failure_falls_back_per_document() {
        let stub = StubProvider::new(vec![StubReply::text("I would start with the Q3 report.")]);

        let plan = planner(stub)
            .create_initial_plan("What were Q3 revenues?", &catalog())
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 2); // one per catalog document
        assert_eq!(plan.tasks[0].document_id, "d1");
        assert_eq!(plan.tasks[1].document_id, "d2");
        assert!(plan.tasks[0].description.contains("Q3 revenues"));
    }

    #[tokio::test]
    async fn test_initial_plan_empty_catalog_is_config_error() {
        let stub = StubProvider::empty();
        let err = planner(stub)
            .create_initial_plan("q", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_initial_plan_single_task_accepted() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[{"name": "only", "description": "x", "document_id": "d2"}]"#,
        )]);

        let plan = planner(stub)
            .create_initial_plan("q", &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 1);
    }

    // ---------------------------------------------------------------- update

    fn plan_with_pending(names: &[&str]) -> TaskPlan {
        TaskPlan::new(
            names
                .iter()
                .map(|name| AgentTask::new(*name, format!("about {}", name), "d1"))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_update_sufficient_drops_pending() {
        let stub = StubProvider::new(vec![StubReply::text(r#"{"action": "sufficient"}"#)]);
        let mut plan = plan_with_pending(&["t2", "t3"]);
        plan.tasks.insert(0, completed_task("t1", "d1"));
        plan.iterations = 1;

        planner(stub)
            .update_plan(&mut plan, &completed_task("t1", "d1"), &[], &catalog())
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].name, "t1");
        assert_eq!(plan.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_update_keep_leaves_plan_unchanged() {
        let stub = StubProvider::new(vec![StubReply::text(r#"{"action": "keep"}"#)]);
        let mut plan = plan_with_pending(&["t1", "t2"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 2);
    }

    #[tokio::test]
    async fn test_update_modify_rewrites_pending_description() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"action": "modify", "task": "t2", "description": "focus on the cash-flow table"}"#,
        )]);
        let mut plan = plan_with_pending(&["t1", "t2"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks[1].description, "focus on the cash-flow table");
        assert_eq!(plan.tasks[0].description, "about t1");
    }

    #[tokio::test]
    async fn test_update_never_touches_completed_tasks() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"action": "modify", "task": "done", "description": "rewrite history"},
                {"action": "remove", "task": "done"}
            ]"#,
        )]);
        let mut plan = TaskPlan::new(vec![AgentTask::new("pending", "desc", "d1")]);
        plan.tasks.insert(0, completed_task("done", "d1"));

        planner(stub)
            .update_plan(&mut plan, &completed_task("done", "d1"), &[], &catalog())
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].name, "done");
        assert_eq!(plan.tasks[0].description, "desc");
        assert_eq!(plan.tasks[0].status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn test_update_add_appends_one_task() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"action": "add", "name": "extra-1", "description": "x", "document_id": "d2"},
                {"action": "add", "name": "extra-2", "description": "y", "document_id": "d1"}
            ]"#,
        )]);
        let mut plan = plan_with_pending(&["t1"]);
        plan.iterations = 1;

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();

        // Only the first add applies
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[1].name, "extra-1");
        assert_eq!(plan.tasks[1].status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_update_add_respects_plan_cap() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"action": "add", "name": "extra", "description": "x", "document_id": "d1"}"#,
        )]);
        let mut plan = plan_with_pending(&["t1", "t2", "t3", "t4"]); // at cap

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 4);
    }

    #[tokio::test]
    async fn test_update_add_respects_iteration_budget() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"action": "add", "name": "extra", "description": "x", "document_id": "d1"}"#,
        )]);
        // 4 iterations used of 5, one task already pending: no budget for more
        let mut plan = plan_with_pending(&["t1"]);
        plan.iterations = 4;

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_add_unknown_document_dropped() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"{"action": "add", "name": "extra", "description": "x", "document_id": "ghost"}"#,
        )]);
        let mut plan = plan_with_pending(&["t1"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_update_removal_wins_over_conflicting_modify() {
        // remove is applied first even though modify is listed first
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"action": "modify", "task": "t1", "description": "new words"},
                {"action": "remove", "task": "t1"}
            ]"#,
        )]);
        let mut plan = plan_with_pending(&["t1", "t2"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();

        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].name, "t2");
    }

    #[tokio::test]
    async fn test_update_earlier_edit_wins_for_same_task() {
        let stub = StubProvider::new(vec![StubReply::text(
            r#"[
                {"action": "modify", "task": "t1", "description": "first edit"},
                {"action": "modify", "task": "t1", "description": "second edit"}
            ]"#,
        )]);
        let mut plan = plan_with_pending(&["t1"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks[0].description, "first edit");
    }

    #[tokio::test]
    async fn test_update_parse_failure_leaves_plan_unchanged() {
        let stub = StubProvider::new(vec![StubReply::text("the plan looks great to me!")]);
        let mut plan = plan_with_pending(&["t1", "t2"]);

        planner(stub)
            .update_plan(&mut plan, &completed_task("t0", "d1"), &[], &catalog())
            .await
            .unwrap();
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].description, "about t1");
    }

    // --------------------------------------------------------------- parsing

    #[test]
    fn test_single_document_id_variants() {
        let known: HashSet<&str> = ["d1", "d2"].into();

        assert!(matches!(
            single_document_id(Some(&Value::String("d1".into())), &known),
            DocRef::One(id) if id == "d1"
        ));
        assert!(matches!(
            single_document_id(Some(&Value::String("d1, d2".into())), &known),
            DocRef::Several
        ));
        assert!(matches!(
            single_document_id(Some(&serde_json::json!(["d1", "d2"])), &known),
            DocRef::Several
        ));
        assert!(matches!(
            single_document_id(Some(&serde_json::json!(["d1"])), &known),
            DocRef::One(_)
        ));
        assert!(matches!(
            single_document_id(Some(&Value::String("ghost".into())), &known),
            DocRef::Unknown
        ));
        assert!(matches!(single_document_id(None, &known), DocRef::Unknown));
    }

    #[test]
    fn test_parse_plan_edits_single_object_and_array() {
        let single = parse_plan_edits(r#"{"action": "keep"}"#).unwrap();
        assert_eq!(single, vec![PlanEdit::Keep]);

        let several = parse_plan_edits(
            r#"[{"action": "remove", "task": "a"}, {"action": "sufficient"}]"#,
        )
        .unwrap();
        assert_eq!(several.len(), 2);

        assert!(parse_plan_edits("no json").is_none());
        assert!(parse_plan_edits(r#"{"action": "explode"}"#).is_none());
    }
}
