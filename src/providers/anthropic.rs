//! Anthropic messages-API provider.

use super::{
    MessageRole, Part, Provider, ProviderMessage, build_http_client, error_for_status,
    error_for_transport, resolve_image, text_at,
};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

const BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_TEXT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_VISION_MODEL: &str = "claude-3-5-sonnet-latest";

/// Provider for the Anthropic messages API.
///
/// Unlike the OpenAI shape, system text travels in a top-level `system`
/// field rather than the message list, and images are `image` blocks with a
/// base64 `source`.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    text_model: String,
    vision_model: String,
}

impl AnthropicProvider {
    /// Create a provider with optional model overrides.
    pub fn new(
        api_key: String,
        text_model: Option<String>,
        vision_model: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            api_key,
            text_model: text_model.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            vision_model: vision_model.unwrap_or_else(|| DEFAULT_VISION_MODEL.to_string()),
        })
    }

    /// Split messages into the top-level system string and the wire
    /// message list, resolving image handles.
    async fn build_payload(&self, messages: &[ProviderMessage]) -> Result<(String, Vec<Value>)> {
        let mut system_lines = Vec::new();
        let mut wire = Vec::new();

        for msg in messages {
            if msg.role == MessageRole::System {
                system_lines.push(msg.joined_text());
                continue;
            }

            let mut blocks = Vec::with_capacity(msg.parts.len());
            for part in &msg.parts {
                match part {
                    Part::Text(text) => blocks.push(json!({"type": "text", "text": text})),
                    Part::Image(image) => {
                        let (data, media_type) = resolve_image(image, &self.client).await?;
                        blocks.push(json!({
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": media_type,
                                "data": data,
                            }
                        }));
                    }
                }
            }
            wire.push(json!({"role": msg.role.as_str(), "content": blocks}));
        }

        Ok((system_lines.join("\n\n"), wire))
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let (system, wire_messages) = self.build_payload(messages).await?;
        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "messages": wire_messages,
        });
        if !system.is_empty() {
            body["system"] = Value::String(system);
        }

        let response = self
            .client
            .post(format!("{}/messages", BASE_URL))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(error_for_transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(self.name(), status, &body));
        }

        let data: Value = response.json().await.map_err(error_for_transport)?;
        text_at(&data, &["content", "0", "text"], self.name()).map(str::to_string)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn process_text(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.complete(&self.text_model, messages, max_tokens, temperature)
            .await
    }

    async fn process_multimodal(
        &self,
        messages: &[ProviderMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        self.complete(&self.vision_model, messages, max_tokens, temperature)
            .await
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_text_model(&self) -> &str {
        DEFAULT_TEXT_MODEL
    }

    fn default_vision_model(&self) -> &str {
        DEFAULT_VISION_MODEL
    }
}
