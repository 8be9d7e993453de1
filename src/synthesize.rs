//! Final answer synthesis.
//!
//! Synthesis combines the completed task analyses into one answer with a
//! single text call. When nothing completed there is nothing to synthesize
//! from, and asking a model anyway invites invented content; the failure
//! message is built locally from the failed tasks' recorded error kinds
//! instead.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::prompts::SYNTHESIS_PROMPT;
use crate::providers::{Provider, ProviderMessage};
use crate::types::{AgentTask, TaskResult};
use std::sync::Arc;

/// Produces the final answer from completed task results.
pub struct ResponseSynthesizer {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

impl ResponseSynthesizer {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Synthesize the answer.
    ///
    /// `original_query` is what the user typed, `query` the reformulated
    /// version the tasks actually ran against; both are shown to the model
    /// when they differ. `failed` feeds the no-results failure message.
    pub async fn synthesize(
        &self,
        original_query: &str,
        query: &str,
        results: &[TaskResult],
        failed: &[&AgentTask],
    ) -> Result<String> {
        if results.is_empty() {
            return Ok(failure_message(failed));
        }

        let request = vec![
            ProviderMessage::system(SYNTHESIS_PROMPT),
            ProviderMessage::user(render_request(original_query, query, results, failed)),
        ];
        let answer = self
            .provider
            .process_text(
                &request,
                self.config.max_tokens_analysis,
                self.config.temperatures.synthesis,
            )
            .await?;
        Ok(answer.trim().to_string())
    }
}

fn render_request(
    original_query: &str,
    query: &str,
    results: &[TaskResult],
    failed: &[&AgentTask],
) -> String {
    let mut out = format!("User query: {}\n", original_query);
    if query != original_query {
        out.push_str(&format!("Interpreted as: {}\n", query));
    }
    out.push_str("\nCompleted task analyses:\n");
    for result in results {
        out.push_str(&format!(
            "\n## {} (document {})\n{}\n",
            result.task_name, result.document_id, result.analysis
        ));
    }
    if !failed.is_empty() {
        out.push_str("\nTasks that could not be completed:\n");
        for task in failed {
            let reason = task
                .failure
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            out.push_str(&format!("- {} ({})\n", task.name, reason));
        }
    }
    out
}

/// Explain an empty result set from the failed tasks' recorded reasons.
fn failure_message(failed: &[&AgentTask]) -> String {
    if failed.is_empty() {
        return "No document analysis could be completed for this query.".to_string();
    }
    let mut out =
        String::from("No document analysis could be completed for this query. Failed tasks:\n");
    for task in failed {
        let reason = task
            .failure
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        out.push_str(&format!("- {}: {}\n", task.name, reason));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::providers::{StubProvider, StubReply};
    use crate::types::TaskStatus;

    fn result(name: &str, analysis: &str) -> TaskResult {
        TaskResult {
            task_name: name.to_string(),
            document_id: "d1".to_string(),
            pages: Vec::new(),
            analysis: analysis.to_string(),
        }
    }

    fn failed_task(name: &str, kind: ErrorKind) -> AgentTask {
        let mut task = AgentTask::new(name, "desc", "d1");
        task.advance(TaskStatus::InProgress);
        task.advance(TaskStatus::Failed);
        task.failure = Some(kind);
        task
    }

    #[tokio::test]
    async fn test_synthesis_over_completed_results() {
        let stub = Arc::new(StubProvider::new(vec![StubReply::text(
            "Q3 revenue was $10M (page 2).",
        )]));
        let synth = ResponseSynthesizer::new(stub.clone(), AgentConfig::default());
        let results = [result("find-revenue", "Revenue: $10M (page 2)")];

        let answer = synth
            .synthesize("What were Q3 revenues?", "What were Q3 revenues?", &results, &[])
            .await
            .unwrap();

        assert_eq!(answer, "Q3 revenue was $10M (page 2).");
        let calls = stub.calls();
        assert!(!calls[0].multimodal);
        assert!(calls[0].text.contains("find-revenue"));
        assert!(calls[0].text.contains("Revenue: $10M (page 2)"));
        assert!((calls[0].temperature - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_reformulated_query_shown_when_different() {
        let stub = Arc::new(StubProvider::new(vec![StubReply::text("answer")]));
        let synth = ResponseSynthesizer::new(stub.clone(), AgentConfig::default());

        synth
            .synthesize(
                "What about Q4?",
                "What were Q4 revenue projections?",
                &[result("t", "a")],
                &[],
            )
            .await
            .unwrap();
        assert!(
            stub.calls()[0]
                .text
                .contains("Interpreted as: What were Q4 revenue projections?")
        );
    }

    #[tokio::test]
    async fn test_zero_completed_builds_local_failure_message() {
        let stub = Arc::new(StubProvider::empty());
        let synth = ResponseSynthesizer::new(stub.clone(), AgentConfig::default());
        let t1 = failed_task("find-revenue", ErrorKind::RateLimited);
        let t2 = failed_task("check-policy", ErrorKind::DocumentNotFound);

        let answer = synth
            .synthesize("q", "q", &[], &[&t1, &t2])
            .await
            .unwrap();

        assert!(answer.contains("find-revenue: rate_limited"));
        assert!(answer.contains("check-policy: document_not_found"));
        assert_eq!(stub.call_count(), 0); // no provider call, nothing fabricated
    }

    #[tokio::test]
    async fn test_partial_failure_mentioned_in_request() {
        let stub = Arc::new(StubProvider::new(vec![StubReply::text("partial answer")]));
        let synth = ResponseSynthesizer::new(stub.clone(), AgentConfig::default());
        let failed = failed_task("broken", ErrorKind::Transient);

        synth
            .synthesize("q", "q", &[result("good", "found it")], &[&failed])
            .await
            .unwrap();

        let text = &stub.calls()[0].text;
        assert!(text.contains("could not be completed"));
        assert!(text.contains("broken (transient)"));
    }
}
