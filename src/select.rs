//! Vision-first page selection.
//!
//! Instead of a text-embedding index, the same multimodal model that will
//! analyze the pages also chooses them: every page image of the task's
//! document goes into one selection request, each preceded by a `[Page k]`
//! marker (and its stored summary when configured). The model answers with
//! 1-based page numbers; validation drops out-of-range indices, dedupes,
//! and truncates to the per-task cap. An unusable reply falls back to the
//! first pages deterministically — selection must always produce something
//! for the executor to read.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::jsonx;
use crate::prompts::SELECTION_PROMPT;
use crate::providers::{Part, Provider, ProviderMessage};
use crate::types::{AgentTask, Document, Page};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Picks the relevant pages of one document for one task.
pub struct PageSelector {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

#[derive(Debug, Deserialize)]
struct SelectionReply {
    #[serde(default)]
    selected_pages: Vec<i64>,
    #[serde(default)]
    #[allow(dead_code)]
    reasoning: String,
}

impl PageSelector {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Select pages of `document` for `task`.
    ///
    /// The returned pages always belong to `document`, are deduplicated in
    /// selection order, and number at most
    /// `min(max_pages_per_task, document.pages.len())`. Provider errors
    /// propagate; parse problems do not (deterministic fallback instead).
    pub async fn select_pages(&self, task: &AgentTask, document: &Document) -> Result<Vec<Page>> {
        if document.pages.is_empty() {
            return Ok(Vec::new());
        }

        let request = self.selection_request(task, document);
        let raw = self
            .provider
            .process_multimodal(
                &request,
                self.config.max_tokens_text,
                self.config.temperatures.selection,
            )
            .await?;

        let numbers = match jsonx::parse_object::<SelectionReply>(&raw) {
            Ok(reply) => reply.selected_pages,
            Err(err) => {
                debug!(task = %task.name, error = %err, "selection reply unparseable");
                Vec::new()
            }
        };

        let validated = validate_page_numbers(
            &numbers,
            document.pages.len() as u32,
            self.config.max_pages_per_task,
        );

        let selected: Vec<Page> = if validated.is_empty() {
            // Deterministic fallback: lead pages up to the cap.
            debug!(task = %task.name, "selection empty, falling back to leading pages");
            document
                .pages
                .iter()
                .take(self.config.max_pages_per_task)
                .cloned()
                .collect()
        } else {
            validated
                .into_iter()
                .filter_map(|n| document.pages.iter().find(|p| p.page_number == n))
                .cloned()
                .collect()
        };

        Ok(selected)
    }

    fn selection_request(&self, task: &AgentTask, document: &Document) -> Vec<ProviderMessage> {
        let mut parts = Vec::with_capacity(document.pages.len() * 2 + 1);
        parts.push(Part::text(format!(
            "Task: {}\n\nDocument \"{}\" has {} pages, shown below.",
            task.description,
            document.name,
            document.pages.len()
        )));

        for page in &document.pages {
            parts.push(Part::text(format!("[Page {}]", page.page_number)));
            if self.config.include_page_summaries_in_selection {
                if let Some(summary) = &page.summary {
                    parts.push(Part::text(format!("Summary: {}", summary)));
                }
            }
            parts.push(Part::image(page.image.clone()));
        }

        vec![
            ProviderMessage::system(SELECTION_PROMPT),
            ProviderMessage::user_parts(parts),
        ]
    }
}

/// Validate raw model-reported page numbers: keep indices inside
/// `1..=page_count`, drop duplicates preserving first occurrence, truncate
/// to `max_pages`.
fn validate_page_numbers(numbers: &[i64], page_count: u32, max_pages: usize) -> Vec<u32> {
    let mut seen = std::collections::HashSet::new();
    numbers
        .iter()
        .filter_map(|&n| u32::try_from(n).ok())
        .filter(|&n| n >= 1 && n <= page_count)
        .filter(|&n| seen.insert(n))
        .take(max_pages)
        .collect()
}
