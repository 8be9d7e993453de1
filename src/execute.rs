//! Task execution: turning selected pages into an analysis.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::prompts::ANALYSIS_PROMPT;
use crate::providers::{Part, Provider, ProviderMessage};
use crate::types::{AgentTask, Page, TaskResult};
use std::sync::Arc;

/// Runs one task's analysis over its selected pages.
pub struct TaskExecutor {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

impl TaskExecutor {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Analyze the selected pages against the task and (reformulated)
    /// query. Provider errors propagate to the agent, which marks the task
    /// failed with the error kind.
    pub async fn execute(
        &self,
        query: &str,
        task: &AgentTask,
        pages: Vec<Page>,
    ) -> Result<TaskResult> {
        let request = self.analysis_request(query, task, &pages);
        let analysis = self
            .provider
            .process_multimodal(
                &request,
                self.config.max_tokens_analysis,
                self.config.temperatures.analysis,
            )
            .await?;

        Ok(TaskResult {
            task_name: task.name.clone(),
            document_id: task.document_id.clone(),
            pages,
            analysis: analysis.trim().to_string(),
        })
    }

    fn analysis_request(&self, query: &str, task: &AgentTask, pages: &[Page]) -> Vec<ProviderMessage> {
        let mut parts = Vec::with_capacity(pages.len() * 2 + 1);
        parts.push(Part::text(format!(
            "User query: {}\n\nTask: {}\n\nSelected pages follow.",
            query, task.description
        )));

        for page in pages {
            parts.push(Part::text(format!("[Page {}]", page.page_number)));
            if let Some(summary) = &page.summary {
                parts.push(Part::text(format!("Summary: {}", summary)));
            }
            parts.push(Part::image(page.image.clone()));
        }

        vec![
            ProviderMessage::system(ANALYSIS_PROMPT),
            ProviderMessage::user_parts(parts),
        ]
    }
}
