//! The agent orchestrator: top-level control flow for one query.
//!
//! ```text
//! Context → Reformulate → Classify → (direct answer |
//!     Plan → loop{ Select → Execute → Replan } → Synthesize)
//! ```
//!
//! Tasks run strictly sequentially: the planner can only adapt the
//! remaining plan if each task's result exists before the next task is
//! chosen. Independent queries may run concurrently over the same provider
//! and storage, which are shared behind `Arc`s; per-query state (the plan,
//! the results) lives on this function's stack.
//!
//! Failure policy: per-task errors mark that task failed and the loop
//! continues. Auth failures and cancellation abort the whole query,
//! returning a [`QueryResult`] whose answer is a machine-readable failure
//! string (`[error:auth] …`, `[error:canceled] …`) and whose task list
//! reflects the state at abort.

use crate::classify::QueryClassifier;
use crate::config::AgentConfig;
use crate::context::{ContextProcessor, ProcessedContext};
use crate::error::{Error, Result};
use crate::execute::TaskExecutor;
use crate::planner::TaskPlanner;
use crate::providers::{Provider, RetryingProvider, create_provider};
use crate::reformulate::QueryReformulator;
use crate::retry::RetryPolicy;
use crate::select::PageSelector;
use crate::storage::Storage;
use crate::synthesize::ResponseSynthesizer;
use crate::types::{
    AgentTask, ConversationMessage, Page, QueryOutcome, QueryResult, TaskPlan, TaskResult,
    TaskStatus,
};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

// ============================================================================
// CANCELLATION
// ============================================================================

/// Cancellation signal for an in-flight query.
///
/// Clone the token, hand one clone to [`Agent::process_query_with_token`],
/// and call [`cancel`](CancelToken::cancel) from anywhere else. The agent
/// checks the token before every provider call and races in-flight calls
/// against it, so network operations abort promptly and no new calls are
/// issued after cancellation.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    canceled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether cancellation has been signaled.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can gate a new query.
    fn reset(&self) {
        self.inner.canceled.store(false, Ordering::SeqCst);
    }

    /// Resolves once cancellation is signaled.
    pub async fn canceled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        loop {
            if self.is_canceled() {
                return;
            }
            // Register the waiter before the second flag check: a cancel()
            // landing between check and registration would otherwise be a
            // lost wakeup.
            notified.as_mut().enable();
            if self.is_canceled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// The document QA agent.
///
/// # Example
///
/// ```rust,no_run
/// use docsight::{Agent, AgentConfig, Document, ImageSource, InMemoryStorage, Page};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let storage = Arc::new(InMemoryStorage::new(vec![
///         Document::new("q3", "Q3 Report")
///             .with_summary("Q3 financial results")
///             .with_pages(vec![Page::new(1, ImageSource::path("q3-p1.jpg"))]),
///     ]));
///
///     let agent = Agent::from_env(storage, AgentConfig::default())?;
///     let result = agent.process_query("What were Q3 revenues?", &[]).await?;
///     println!("{}", result.answer);
///     Ok(())
/// }
/// ```
pub struct Agent {
    storage: Arc<dyn Storage>,
    config: AgentConfig,
    context: ContextProcessor,
    reformulator: QueryReformulator,
    classifier: QueryClassifier,
    planner: TaskPlanner,
    selector: PageSelector,
    executor: TaskExecutor,
    synthesizer: ResponseSynthesizer,
    cancel: CancelToken,
}

impl Agent {
    /// Build an agent over an explicit provider.
    ///
    /// The provider is wrapped with the retry policy from `config`
    /// (`retry_attempts` bounded backoff on transient failures), so pass
    /// the bare provider.
    pub fn new(
        provider: Arc<dyn Provider>,
        storage: Arc<dyn Storage>,
        config: AgentConfig,
    ) -> Self {
        let policy = RetryPolicy::new(config.retry_attempts);
        let provider: Arc<dyn Provider> = Arc::new(RetryingProvider::new(provider, policy));

        Self {
            storage,
            context: ContextProcessor::new(provider.clone(), config.clone()),
            reformulator: QueryReformulator::new(provider.clone(), config.clone()),
            classifier: QueryClassifier::new(provider.clone(), config.clone()),
            planner: TaskPlanner::new(provider.clone(), config.clone()),
            selector: PageSelector::new(provider.clone(), config.clone()),
            executor: TaskExecutor::new(provider.clone(), config.clone()),
            synthesizer: ResponseSynthesizer::new(provider, config.clone()),
            config,
            cancel: CancelToken::new(),
        }
    }

    /// Build an agent for the configured vendor, reading the API key from
    /// the vendor's environment variable.
    pub fn from_env(storage: Arc<dyn Storage>, config: AgentConfig) -> Result<Self> {
        let provider = create_provider(
            config.provider,
            None,
            config.text_model.clone(),
            config.vision_model.clone(),
            config.request_timeout(),
        )?;
        Ok(Self::new(provider, storage, config))
    }

    /// The agent's default cancellation token: cancel it to abort the
    /// query currently running through [`process_query`](Self::process_query).
    ///
    /// The default token is reset at the start of every `process_query`
    /// call, so canceling one query never affects the next.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Process a query with the agent's default cancellation token.
    ///
    /// Per-query state is isolated: the default token is reset for each
    /// new query before the pipeline starts. Callers running several
    /// queries concurrently over one agent should give each its own token
    /// via [`process_query_with_token`](Self::process_query_with_token),
    /// since the default token is shared.
    pub async fn process_query(
        &self,
        query: &str,
        history: &[ConversationMessage],
    ) -> Result<QueryResult> {
        // Reset the default token for the new query
        self.cancel.reset();
        self.process_query_with_token(query, history, self.cancel.clone())
            .await
    }

    /// Process a query, racing every provider call against `cancel`.
    ///
    /// # Errors
    ///
    /// Setup problems (empty query, storage failures, empty catalog) are
    /// `Err`. Pipeline-fatal conditions reached mid-flight — bad
    /// credentials, cancellation — return `Ok` with a failure-string
    /// answer and the task state at abort, per the propagation policy.
    pub async fn process_query_with_token(
        &self,
        query: &str,
        history: &[ConversationMessage],
        cancel: CancelToken,
    ) -> Result<QueryResult> {
        if query.trim().is_empty() {
            return Err(Error::invalid_input("query must not be empty"));
        }

        let started = Instant::now();
        info!(query, "processing query");

        // ---- Context → Reformulate → Classify --------------------------------
        let prelude = self.prelude(query, history, &cancel).await;
        let (rquery, classification) = match prelude {
            Ok(parts) => parts,
            Err(err) if err.is_fatal_to_query() => {
                return Ok(abort_result(query, &err, Vec::new(), Vec::new(), 0, started));
            }
            Err(err) => return Err(err),
        };

        if !classification.needs_documents {
            debug!(reasoning = %classification.reasoning, "answering directly without documents");
            return Ok(QueryResult {
                query: query.to_string(),
                answer: classification.direct_reply().to_string(),
                pages: Vec::new(),
                task_results: Vec::new(),
                tasks: Vec::new(),
                iterations: 0,
                elapsed: started.elapsed(),
                outcome: QueryOutcome::DirectAnswer,
            });
        }

        // ---- Plan ------------------------------------------------------------
        let catalog = self.storage.list_documents().await?;
        let mut plan = match guard(&cancel, self.planner.create_initial_plan(&rquery, &catalog))
            .await
        {
            Ok(plan) => plan,
            Err(err) if err.is_fatal_to_query() => {
                return Ok(abort_result(query, &err, Vec::new(), Vec::new(), 0, started));
            }
            Err(err) => return Err(err),
        };
        info!(tasks = plan.tasks.len(), "initial plan created");

        // ---- Execute / replan loop -------------------------------------------
        let mut results: Vec<TaskResult> = Vec::new();
        while plan.iterations < self.config.max_agent_iterations {
            let Some(index) = plan.next_pending() else {
                break;
            };
            plan.tasks[index].advance(TaskStatus::InProgress);
            debug!(task = %plan.tasks[index].name, iteration = plan.iterations + 1, "executing task");

            match self.run_task(&rquery, &plan.tasks[index], &cancel).await {
                Ok(result) => {
                    plan.tasks[index].result = Some(result.analysis.clone());
                    plan.tasks[index].advance(TaskStatus::Completed);
                    results.push(result);
                }
                Err(err) if err.is_fatal_to_query() => {
                    plan.tasks[index].failure = Some(err.kind());
                    plan.tasks[index].advance(TaskStatus::Failed);
                    plan.iterations += 1;
                    return Ok(abort_result(
                        query,
                        &err,
                        plan.tasks,
                        results,
                        plan.iterations,
                        started,
                    ));
                }
                Err(err) => {
                    warn!(task = %plan.tasks[index].name, error = %err, "task failed");
                    plan.tasks[index].failure = Some(err.kind());
                    plan.tasks[index].advance(TaskStatus::Failed);
                }
            }
            plan.iterations += 1;

            if let Err(err) = self.replan(&mut plan, index, &results, &catalog, &cancel).await {
                if err.is_fatal_to_query() {
                    return Ok(abort_result(
                        query,
                        &err,
                        plan.tasks,
                        results,
                        plan.iterations,
                        started,
                    ));
                }
                // A failed replanning round leaves the plan as it was.
                debug!(error = %err, "plan update failed, continuing with current plan");
            }
        }

        // ---- Synthesize ------------------------------------------------------
        let failed: Vec<&AgentTask> = plan.failed().collect();
        let answer = match guard(
            &cancel,
            self.synthesizer.synthesize(query, &rquery, &results, &failed),
        )
        .await
        {
            Ok(answer) => answer,
            Err(err) if err.is_fatal_to_query() => {
                let iterations = plan.iterations;
                return Ok(abort_result(query, &err, plan.tasks, results, iterations, started));
            }
            Err(err) => return Err(err),
        };

        info!(
            iterations = plan.iterations,
            completed = results.len(),
            "query answered"
        );
        Ok(QueryResult {
            query: query.to_string(),
            answer,
            pages: union_pages(&results),
            task_results: results,
            tasks: plan.tasks,
            iterations: plan.iterations,
            elapsed: started.elapsed(),
            outcome: QueryOutcome::Answered,
        })
    }

    /// Context processing, reformulation, and classification.
    async fn prelude(
        &self,
        query: &str,
        history: &[ConversationMessage],
        cancel: &CancelToken,
    ) -> Result<(String, crate::classify::Classification)> {
        let context: ProcessedContext = guard(cancel, self.context.process(history)).await?;

        let rquery = if context.is_empty() {
            query.to_string()
        } else {
            guard(cancel, self.reformulator.reformulate(query, &context)).await?
        };

        let classification = guard(cancel, self.classifier.classify(&rquery)).await?;
        Ok((rquery, classification))
    }

    /// One task cycle: resolve the document, select pages, analyze them.
    async fn run_task(
        &self,
        query: &str,
        task: &AgentTask,
        cancel: &CancelToken,
    ) -> Result<TaskResult> {
        let document = guard(cancel, self.storage.get_document(&task.document_id)).await?;
        let pages = guard(cancel, self.selector.select_pages(task, &document)).await?;
        guard(cancel, self.executor.execute(query, task, pages)).await
    }

    async fn replan(
        &self,
        plan: &mut TaskPlan,
        just_finished: usize,
        results: &[TaskResult],
        catalog: &[crate::types::DocumentInfo],
        cancel: &CancelToken,
    ) -> Result<()> {
        if plan.next_pending().is_none() && plan.tasks.len() >= self.config.max_tasks_per_plan {
            return Ok(());
        }
        if plan.iterations >= self.config.max_agent_iterations {
            return Ok(());
        }
        let just = plan.tasks[just_finished].clone();
        guard(
            cancel,
            self.planner.update_plan(plan, &just, results, catalog),
        )
        .await
    }
}

/// Race a pipeline step against cancellation.
async fn guard<T, F>(cancel: &CancelToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_canceled() {
        return Err(Error::Canceled);
    }
    tokio::select! {
        biased;
        _ = cancel.canceled() => Err(Error::Canceled),
        result = fut => result,
    }
}

/// Union of selected pages across completed tasks, first occurrence wins.
fn union_pages(results: &[TaskResult]) -> Vec<Page> {
    let mut seen = std::collections::HashSet::new();
    let mut pages = Vec::new();
    for result in results {
        for page in &result.pages {
            if seen.insert((result.document_id.clone(), page.page_number)) {
                pages.push(page.clone());
            }
        }
    }
    pages
}

fn abort_result(
    query: &str,
    err: &Error,
    tasks: Vec<AgentTask>,
    results: Vec<TaskResult>,
    iterations: u32,
    started: Instant,
) -> QueryResult {
    let outcome = match err {
        Error::Canceled => QueryOutcome::Canceled,
        _ => QueryOutcome::Failed,
    };
    warn!(error = %err, "query aborted");
    QueryResult {
        query: query.to_string(),
        answer: format!("[error:{}] {}", err.kind(), err),
        pages: union_pages(&results),
        task_results: results,
        tasks,
        iterations,
        elapsed: started.elapsed(),
        outcome,
    }
}
