//! Query reformulation.
//!
//! Follow-up queries lean on earlier turns ("what about Q4?", "and the
//! second one?"). The reformulator rewrites such queries into standalone
//! form using the processed conversation context, so every later stage can
//! work from the query alone. It is skipped entirely when no context
//! exists, and any parse trouble falls back to the original query.

use crate::config::AgentConfig;
use crate::context::ProcessedContext;
use crate::error::Result;
use crate::jsonx;
use crate::prompts::REFORMULATION_PROMPT;
use crate::providers::{Provider, ProviderMessage};
use crate::types::ConversationRole;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Rewrites elliptical queries into self-contained ones.
pub struct QueryReformulator {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

#[derive(Debug, Deserialize)]
struct ReformulationReply {
    reformulated: String,
    changed: bool,
}

impl QueryReformulator {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Reformulate `query` against the processed context.
    ///
    /// Returns the original query when the context is empty, when the model
    /// says nothing changed, or when its reply doesn't parse. The returned
    /// string is always non-empty as long as the input is.
    pub async fn reformulate(&self, query: &str, context: &ProcessedContext) -> Result<String> {
        if context.is_empty() {
            return Ok(query.to_string());
        }

        let request = vec![
            ProviderMessage::system(REFORMULATION_PROMPT),
            ProviderMessage::user(render_request(query, context)),
        ];
        let raw = self
            .provider
            .process_text(
                &request,
                self.config.max_tokens_text,
                self.config.temperatures.reformulation,
            )
            .await?;

        match jsonx::parse_object::<ReformulationReply>(&raw) {
            Ok(reply) if reply.changed && !reply.reformulated.trim().is_empty() => {
                debug!(original = query, reformulated = %reply.reformulated, "query reformulated");
                Ok(reply.reformulated.trim().to_string())
            }
            Ok(_) => Ok(query.to_string()),
            Err(err) => {
                debug!(error = %err, "reformulation reply unparseable, keeping original query");
                Ok(query.to_string())
            }
        }
    }
}

fn render_request(query: &str, context: &ProcessedContext) -> String {
    let mut out = String::new();
    if let Some(summary) = &context.summary {
        out.push_str("Conversation summary:\n");
        out.push_str(summary);
        out.push_str("\n\n");
    }
    if !context.tail.is_empty() {
        out.push_str("Recent turns:\n");
        for msg in &context.tail {
            let who = match msg.role {
                ConversationRole::User => "User",
                ConversationRole::Assistant => "Assistant",
            };
            out.push_str(&format!("{}: {}\n", who, msg.content));
        }
        out.push('\n');
    }
    out.push_str("Latest query: ");
    out.push_str(query);
    out
}
