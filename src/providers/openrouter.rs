//! OpenRouter provider: OpenAI-compatible wire format behind a different
//! gateway and model namespace.

use super::{Provider, ProviderMessage, openai::OpenAiProvider};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

const BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_TEXT_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_VISION_MODEL: &str = "openai/gpt-4o";

/// Provider for OpenRouter's OpenAI-compatible gateway.
///
/// Delegates serialization and response parsing to the OpenAI
/// implementation; only the endpoint, model namespace, and reported name
/// differ.
pub struct OpenRouterProvider {
    inner: OpenAiProvider,
}

impl OpenRouterProvider {
    /// Create a provider with optional model overrides (OpenRouter model
    /// ids are namespaced, e.g. `anthropic/claude-3.5-sonnet`).
    pub fn new(
        api_key: String,
        text_model: Option<String>,
        vision_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let inner = OpenAiProvider::new(api_key, None, None, timeout)?
            .with_base_url(BASE_URL)
            .with_name_models(
                text_model,
                vision_model,
                DEFAULT_TEXT_MODEL,
                DEFAULT_VISION_MODEL,
            );
        Ok(Self { inner })
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.inner
            .complete(
                self.inner.text_model(),
                messages,
                max_tokens,
                temperature,
                self.name(),
            )
            .await
    }

    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.inner
            .complete(
                self.inner.vision_model(),
                messages,
                max_tokens,
                temperature,
                self.name(),
            )
            .await
    }

    fn name(&self) -> &str {
        "openrouter"
    }

    fn default_text_model(&self) -> &str {
        DEFAULT_TEXT_MODEL
    }

    fn default_vision_model(&self) -> &str {
        DEFAULT_VISION_MODEL
    }
}
