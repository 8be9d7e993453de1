//! Conversation-context processing.
//!
//! Long chat histories don't fit usefully in every prompt, so the context
//! processor compresses them: the most recent turns stay verbatim, a slice
//! of older turns is summarized into a short factual context string, and
//! anything older still is dropped. Short histories pass through untouched
//! with no model call at all.
//!
//! A *turn* is one user message plus the assistant messages that follow it.

use crate::config::AgentConfig;
use crate::error::Result;
use crate::prompts::CONTEXT_SUMMARY_PROMPT;
use crate::providers::{Provider, ProviderMessage};
use crate::types::{ConversationMessage, ConversationRole};
use std::sync::Arc;
use tracing::debug;

/// Compresses conversation histories ahead of query reformulation.
pub struct ContextProcessor {
    provider: Arc<dyn Provider>,
    config: AgentConfig,
}

/// Output of context processing: an optional summary of older turns plus
/// the verbatim tail of the history.
#[derive(Debug, Clone)]
pub struct ProcessedContext {
    /// Compact factual summary of the summarized slice, when one was made.
    pub summary: Option<String>,

    /// Recent messages kept verbatim.
    pub tail: Vec<ConversationMessage>,
}

impl ProcessedContext {
    /// Whether any conversation context exists at all.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.tail.is_empty()
    }
}

impl ContextProcessor {
    pub fn new(provider: Arc<dyn Provider>, config: AgentConfig) -> Self {
        Self { provider, config }
    }

    /// Process a history per the configured turn thresholds.
    ///
    /// Histories of at most `max_conversation_turns` user-turns return
    /// unchanged with no provider call. Longer histories keep the last
    /// `turns_to_keep_full` turns verbatim and summarize the
    /// `turns_to_summarize` turns before them; the summary call runs at the
    /// summary temperature. A failed summary call degrades to tail-only
    /// context rather than failing the query.
    pub async fn process(&self, history: &[ConversationMessage]) -> Result<ProcessedContext> {
        let turns = split_turns(history);
        let user_turns = turns.iter().filter(|t| t.has_user).count();

        if user_turns <= self.config.max_conversation_turns {
            return Ok(ProcessedContext {
                summary: None,
                tail: history.to_vec(),
            });
        }

        let keep = self.config.turns_to_keep_full.min(turns.len());
        let tail_start = turns.len() - keep;
        let summarize_start = tail_start.saturating_sub(self.config.turns_to_summarize);

        let tail: Vec<ConversationMessage> = turns[tail_start..]
            .iter()
            .flat_map(|t| t.messages.iter().cloned())
            .collect();
        let older: Vec<&ConversationMessage> = turns[summarize_start..tail_start]
            .iter()
            .flat_map(|t| t.messages.iter())
            .collect();

        if older.is_empty() {
            return Ok(ProcessedContext {
                summary: None,
                tail,
            });
        }

        match self.summarize(&older).await {
            Ok(summary) => Ok(ProcessedContext {
                summary: Some(summary),
                tail,
            }),
            Err(err) if err.is_fatal_to_query() => Err(err),
            Err(err) => {
                // Compression is an optimization; a failed summary call
                // must not take the whole query down with it.
                debug!(error = %err, "context summary failed, keeping tail only");
                Ok(ProcessedContext {
                    summary: None,
                    tail,
                })
            }
        }
    }

    async fn summarize(&self, messages: &[&ConversationMessage]) -> Result<String> {
        let transcript = render_transcript(messages);
        let request = vec![
            ProviderMessage::system(CONTEXT_SUMMARY_PROMPT),
            ProviderMessage::user(transcript),
        ];
        let summary = self
            .provider
            .process_text(
                &request,
                self.config.max_tokens_text,
                self.config.temperatures.summary,
            )
            .await?;
        Ok(summary.trim().to_string())
    }
}

struct Turn {
    messages: Vec<ConversationMessage>,
    has_user: bool,
}

/// Group a flat history into turns. A new turn opens at each user message;
/// assistant messages before any user message form their own leading turn.
fn split_turns(history: &[ConversationMessage]) -> Vec<Turn> {
    let mut turns: Vec<Turn> = Vec::new();
    for msg in history {
        let open_new = match msg.role {
            ConversationRole::User => true,
            ConversationRole::Assistant => turns.is_empty(),
        };
        if open_new {
            turns.push(Turn {
                messages: Vec::new(),
                has_user: msg.role == ConversationRole::User,
            });
        }
        if let Some(turn) = turns.last_mut() {
            turn.messages.push(msg.clone());
        }
    }
    turns
}

fn render_transcript(messages: &[&ConversationMessage]) -> String {
    messages
        .iter()
        .map(|m| {
            let who = match m.role {
                ConversationRole::User => "User",
                ConversationRole::Assistant => "Assistant",
            };
            format!("{}: {}", who, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
