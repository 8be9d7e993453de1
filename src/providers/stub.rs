//! Scripted provider for tests.
//!
//! [`StubProvider`] replays a queue of canned replies and records every
//! request it sees, so pipeline tests can assert both what the agent asked
//! and how it handled each scripted outcome — including provider failures,
//! which real vendors produce at the worst times and unit tests should
//! produce on demand.

use super::{Part, Provider, ProviderMessage};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// Return this completion text.
    Text(String),
    /// Fail with `Error::RateLimited` (retryable).
    RateLimited,
    /// Fail with `Error::Transient` (retryable).
    Transient,
    /// Fail with `Error::Auth` (fatal to the query).
    Auth,
    /// Fail with `Error::BadRequest` (fatal to the call).
    BadRequest,
    /// Fail with `Error::Timeout` (retryable).
    Timeout,
}

impl StubReply {
    pub fn text(text: impl Into<String>) -> Self {
        StubReply::Text(text.into())
    }

    fn into_result(self) -> Result<String> {
        match self {
            StubReply::Text(text) => Ok(text),
            StubReply::RateLimited => Err(Error::rate_limited("stub: 429")),
            StubReply::Transient => Err(Error::transient("stub: 502")),
            StubReply::Auth => Err(Error::auth("stub: invalid key")),
            StubReply::BadRequest => Err(Error::bad_request("stub: rejected payload")),
            StubReply::Timeout => Err(Error::Timeout),
        }
    }
}

/// What the stub saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Whether `process_multimodal` (vs `process_text`) was invoked.
    pub multimodal: bool,

    /// All text parts of all messages, joined with newlines.
    pub text: String,

    /// Number of image parts across all messages.
    pub image_count: usize,

    /// The temperature the agent asked for.
    pub temperature: f32,
}

/// A provider that replays scripted replies and records requests.
///
/// # Example
///
/// ```
/// use docsight::providers::{Provider, ProviderMessage, StubProvider, StubReply};
///
/// # tokio_test::block_on(async {
/// let stub = StubProvider::new(vec![
///     StubReply::text(r#"{"needs_documents": false, "reasoning": "greeting", "direct_answer": "Hi!"}"#),
/// ]);
///
/// let reply = stub
///     .process_text(&[ProviderMessage::user("Hello")], 256, 0.1)
///     .await
///     .unwrap();
/// assert!(reply.contains("direct_answer"));
/// assert_eq!(stub.call_count(), 1);
/// # });
/// ```
pub struct StubProvider {
    replies: Mutex<VecDeque<StubReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubProvider {
    /// Create a stub with a reply script, consumed front to back.
    pub fn new(replies: Vec<StubReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a stub with no script; every call fails.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append a reply to the script.
    pub fn push(&self, reply: StubReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Snapshot of every recorded call so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls the stub has served (including scripted failures).
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn serve(
        &self,
        messages: &[ProviderMessage],
        multimodal: bool,
        temperature: f32,
    ) -> Result<String> {
        let text = messages
            .iter()
            .map(|m| m.joined_text())
            .collect::<Vec<_>>()
            .join("\n");
        let image_count = messages
            .iter()
            .flat_map(|m| m.parts.iter())
            .filter(|p| matches!(p, Part::Image(_)))
            .count();

        self.calls.lock().unwrap().push(RecordedCall {
            multimodal,
            text,
            image_count,
            temperature,
        });

        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply.into_result(),
            // Non-retryable so an under-scripted test fails loudly instead
            // of spinning through the retry budget.
            None => Err(Error::bad_request("stub: reply script exhausted")),
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        _max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.serve(messages, false, temperature)
    }

    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        _max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.serve(messages, true, temperature)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn default_text_model(&self) -> &str {
        "stub-text"
    }

    fn default_vision_model(&self) -> &str {
        "stub-vision"
    }
}
