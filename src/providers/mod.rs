//! MLLM provider implementations.
//!
//! The [`Provider`] trait hides wire-level differences between vendors
//! behind two operations: a text-only call and a multimodal call. Messages
//! are heterogeneous sequences of [`Part`]s; each provider pattern-matches
//! on the variant when serializing to its vendor format:
//!
//! | Vendor | System message | Image encoding |
//! |---|---|---|
//! | OpenAI | `role=system` in message list | `image_url` with base64 data URL |
//! | Anthropic | top-level `system` field | `image` block with base64 `source` |
//! | OpenRouter | OpenAI-compatible | OpenAI-compatible |
//!
//! Providers are stateless across calls (they hold only an authenticated
//! HTTP client) and safe to share behind an `Arc` between concurrent
//! queries.

pub mod anthropic;
pub mod openai;
pub mod openrouter;
pub mod stub;

use crate::config::ProviderKind;
use crate::error::{Error, Result};
use crate::types::ImageSource;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use std::sync::Arc;
use std::time::Duration;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use openrouter::OpenRouterProvider;
pub use stub::{RecordedCall, StubProvider, StubReply};

// ============================================================================
// MESSAGE MODEL
// ============================================================================

/// Role of a provider message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// The lowercase wire name shared by OpenAI-style APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// One piece of message content: text or a page image handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Plain text.
    Text(String),
    /// An image handle the provider resolves at serialization time.
    Image(ImageSource),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text(text.into())
    }

    pub fn image(source: ImageSource) -> Self {
        Part::Image(source)
    }
}

/// A message in provider-neutral form.
///
/// # Example
///
/// ```
/// use docsight::providers::{ProviderMessage, Part};
/// use docsight::ImageSource;
///
/// let system = ProviderMessage::system("You select document pages.");
/// let user = ProviderMessage::user_parts(vec![
///     Part::text("[Page 1]"),
///     Part::image(ImageSource::path("p1.jpg")),
/// ]);
/// assert_eq!(user.parts.len(), 2);
/// assert!(system.is_text_only());
/// assert!(!user.is_text_only());
/// ```
#[derive(Debug, Clone)]
pub struct ProviderMessage {
    pub role: MessageRole,
    pub parts: Vec<Part>,
}

impl ProviderMessage {
    /// Text-only system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            parts: vec![Part::text(text)],
        }
    }

    /// Text-only user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            parts: vec![Part::text(text)],
        }
    }

    /// Text-only assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            parts: vec![Part::text(text)],
        }
    }

    /// User message with mixed text/image parts.
    pub fn user_parts(parts: Vec<Part>) -> Self {
        Self {
            role: MessageRole::User,
            parts,
        }
    }

    /// Whether every part is text.
    pub fn is_text_only(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Text(_)))
    }

    /// Concatenation of all text parts, used by vendors whose text-only
    /// wire format is a plain string.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// Uniform contract over text and multimodal MLLM calls.
///
/// Implementations must be stateless across calls and safe to share between
/// tasks; the agent issues calls strictly sequentially within one query but
/// independent queries may run in parallel over the same provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a text-only request and return the completion text.
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Send a multimodal (text + page images) request and return the
    /// completion text.
    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String>;

    /// Provider name (for logging and error messages).
    fn name(&self) -> &str;

    /// Default model for text-only calls.
    fn default_text_model(&self) -> &str;

    /// Default model for multimodal calls.
    fn default_vision_model(&self) -> &str;
}

/// Create a provider instance for the configured vendor.
///
/// The API key comes from `api_key` or, when `None`, from the vendor's
/// environment variable ([`ProviderKind::api_key_env`]).
///
/// # Errors
///
/// `Error::Auth` when no key can be found, `Error::Config` for an invalid
/// HTTP client configuration.
pub fn create_provider(
    kind: ProviderKind,
    api_key: Option<String>,
    text_model: Option<String>,
    vision_model: Option<String>,
    timeout: Duration,
) -> Result<Arc<dyn Provider>> {
    let key = match api_key {
        Some(k) if !k.trim().is_empty() => k,
        _ => std::env::var(kind.api_key_env()).map_err(|_| {
            Error::auth(format!(
                "no API key for {}: set {} or pass one explicitly",
                kind,
                kind.api_key_env()
            ))
        })?,
    };

    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(key, text_model, vision_model, timeout)?),
        ProviderKind::Anthropic => {
            Arc::new(AnthropicProvider::new(key, text_model, vision_model, timeout)?)
        }
        ProviderKind::OpenRouter => {
            Arc::new(OpenRouterProvider::new(key, text_model, vision_model, timeout)?)
        }
    };
    Ok(provider)
}

// ============================================================================
// RETRY DECORATOR
// ============================================================================

/// Wraps any provider with the bounded-backoff retry policy.
///
/// Rate limits, transient failures, and timeouts are retried per the
/// [`RetryPolicy`](crate::retry::RetryPolicy); other errors pass straight
/// through. All attempts of one call count as the same logical pipeline
/// iteration, which is why retrying lives here rather than in the agent
/// loop.
pub struct RetryingProvider {
    inner: Arc<dyn Provider>,
    policy: crate::retry::RetryPolicy,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn Provider>, policy: crate::retry::RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl Provider for RetryingProvider {
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        crate::retry::call_with_retry(&self.policy, || {
            self.inner.process_text(messages, max_tokens, temperature)
        })
        .await
    }

    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        crate::retry::call_with_retry(&self.policy, || {
            self.inner.process_multimodal(messages, max_tokens, temperature)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_text_model(&self) -> &str {
        self.inner.default_text_model()
    }

    fn default_vision_model(&self) -> &str {
        self.inner.default_vision_model()
    }
}

// ============================================================================
// SHARED PLUMBING
// ============================================================================

/// Build the HTTP client every concrete provider holds.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))
}

/// Resolve an image handle to `(base64_data, media_type)`.
///
/// File handles are read from disk, URL handles fetched over the shared
/// client, byte handles encoded directly. Unreadable handles are a
/// [`Error::BadRequest`]: retrying will not make the image appear.
pub(crate) async fn resolve_image(
    image: &ImageSource,
    client: &reqwest::Client,
) -> Result<(String, String)> {
    let media_type = image.media_type().to_string();
    let bytes = match image {
        ImageSource::Path { path } => tokio::fs::read(path).await.map_err(|e| {
            Error::bad_request(format!("cannot read page image {}: {}", path.display(), e))
        })?,
        ImageSource::Url { url } => {
            let response = client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(Error::bad_request(format!(
                    "cannot fetch page image {}: HTTP {}",
                    url,
                    response.status()
                )));
            }
            response.bytes().await?.to_vec()
        }
        ImageSource::Bytes { data, .. } => data.clone(),
    };
    Ok((BASE64.encode(bytes), media_type))
}

/// Map an unsuccessful HTTP response to the structural error kinds.
pub(crate) fn error_for_status(provider: &str, status: reqwest::StatusCode, body: &str) -> Error {
    let detail = format!("{} returned {}: {}", provider, status, truncate(body, 200));
    match status.as_u16() {
        401 | 403 => Error::auth(detail),
        408 => Error::Timeout,
        429 => Error::rate_limited(detail),
        400..=499 => Error::bad_request(detail),
        _ => Error::transient(detail),
    }
}

/// Map a transport-level reqwest failure, folding vendor timeouts into the
/// structural `Timeout` kind.
pub(crate) fn error_for_transport(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(err)
    }
}

/// Pull the completion text out of a parsed JSON response via a path of
/// keys/indices, with a uniform error when the shape is off.
pub(crate) fn text_at<'a>(
    value: &'a serde_json::Value,
    path: &[&str],
    provider: &str,
) -> Result<&'a str> {
    let mut cursor = value;
    for key in path {
        cursor = match key.parse::<usize>() {
            Ok(index) => cursor.get(index),
            Err(_) => cursor.get(key),
        }
        .ok_or_else(|| {
            Error::transient(format!("{} response missing field '{}'", provider, key))
        })?;
    }
    cursor
        .as_str()
        .ok_or_else(|| Error::transient(format!("{} response text field is not a string", provider)))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
