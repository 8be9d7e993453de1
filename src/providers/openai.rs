//! OpenAI chat-completions provider.

use super::{
    Part, Provider, ProviderMessage, build_http_client, error_for_status, error_for_transport,
    resolve_image, text_at,
};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Provider for the OpenAI chat-completions API.
///
/// System messages stay in the message list; images travel as `image_url`
/// parts carrying a `data:<media-type>;base64,…` URL.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    vision_model: String,
}

impl OpenAiProvider {
    /// Create a provider with optional model overrides.
    pub fn new(
        api_key: String,
        text_model: Option<String>,
        vision_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            text_model: text_model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            vision_model: vision_model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        })
    }

    /// Point the provider at a different OpenAI-compatible endpoint.
    /// OpenRouter builds on this.
    pub(crate) fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn with_name_models(
        mut self,
        text_model: Option<String>,
        vision_model: Option<String>,
        fallback_text: &str,
        fallback_vision: &str,
    ) -> Self {
        self.text_model = text_model.unwrap_or_else(|| fallback_text.to_string());
        self.vision_model = vision_model.unwrap_or_else(|| fallback_vision.to_string());
        self
    }

    pub(crate) fn text_model(&self) -> &str {
        &self.text_model
    }

    pub(crate) fn vision_model(&self) -> &str {
        &self.vision_model
    }

    /// Serialize messages into OpenAI wire shape, resolving image handles.
    pub(crate) async fn build_messages(&self, messages: &[ProviderMessage]) -> Result<Vec<Value>> {
        let mut wire = Vec::with_capacity(messages.len());
        for msg in messages {
            let content = if msg.is_text_only() {
                // Text-only content is a plain string on the wire
                Value::String(msg.joined_text())
            } else {
                let mut parts = Vec::with_capacity(msg.parts.len());
                for part in &msg.parts {
                    match part {
                        Part::Text(text) => parts.push(json!({"type": "text", "text": text})),
                        Part::Image(image) => {
                            let (data, media_type) = resolve_image(image, &self.client).await?;
                            parts.push(json!({
                                "type": "image_url",
                                "image_url": {
                                    "url": format!("data:{};base64,{}", media_type, data)
                                }
                            }));
                        }
                    }
                }
                Value::Array(parts)
            };
            wire.push(json!({"role": msg.role.as_str(), "content": content}));
        }
        Ok(wire)
    }

    pub(crate) async fn complete(
        &self,
        model: &str,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
        provider_name: &str,
    ) -> Result<String> {
        let wire_messages = self.build_messages(messages).await?;
        let body = json!({
            "model": model,
            "messages": wire_messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(error_for_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(provider_name, status, &body));
        }

        let data: Value = response.json().await.map_err(error_for_transport)?;
        text_at(&data, &["choices", "0", "message", "content"], provider_name)
            .map(str::to_string)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.complete(&self.text_model, messages, max_tokens, temperature, self.name())
            .await
    }

    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.complete(
            &self.vision_model,
            messages,
            max_tokens,
            temperature,
            self.name(),
        )
        .await
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_text_model(&self) -> &str {
        DEFAULT_TEXT_MODEL
    }

    fn default_vision_model(&self) -> &str {
        DEFAULT_VISION_MODEL
    }
}
