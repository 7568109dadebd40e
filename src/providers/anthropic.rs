//! Anthropic Messages API.

use super::{send_json, ChatModel, Message, ProviderError, ProviderKind, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

pub struct AnthropicModel {
    client: Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a Message>,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicModel {
    pub fn new(
        api_key: &str,
        model: &str,
        temperature: f32,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base = base_url.unwrap_or(ANTHROPIC_BASE_URL).trim_end_matches('/');
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            url: format!("{base}/messages"),
            api_key: api_key.to_string(),
            model: model.to_string(),
            temperature,
        })
    }
}

/// System turns move to the top-level `system` field; the rest stay in order
fn split_system(messages: &[Message]) -> (Option<String>, Vec<&Message>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages.iter().filter(|m| m.role != Role::System).collect();
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, turns)
}

#[async_trait]
impl ChatModel for AnthropicModel {
    async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let (system, turns) = split_system(messages);
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: self.temperature,
            system,
            messages: turns,
        };
        let request = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        tracing::debug!(provider = "anthropic", model = %self.model, messages = messages.len(), "invoking model");
        let response: MessagesResponse = send_json(request).await?;
        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "no text content in message".to_string(),
            ));
        }
        Ok(text)
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model(&self) -> &str {
        &self.model
    }
}
