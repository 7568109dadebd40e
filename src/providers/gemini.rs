//! Google Gemini through rstructor.
//!
//! rstructor takes a single prompt, so the message transcript is flattened into one.

use super::{ChatModel, Message, ProviderError, ProviderKind, Role};
use async_trait::async_trait;
use rstructor::{GeminiClient, GeminiModel, LLMClient};

pub struct GeminiChat {
    client: GeminiClient,
    model: String,
}

impl GeminiChat {
    pub fn new(api_key: &str, model: &str, temperature: f32) -> Result<Self, ProviderError> {
        let client = GeminiClient::new(api_key)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?
            .model(parse_gemini_model(model))
            .temperature(temperature);
        Ok(Self {
            client,
            model: model.to_string(),
        })
    }
}

/// Parse a model string into a GeminiModel
fn parse_gemini_model(model: &str) -> GeminiModel {
    match model {
        "gemini-2.0-flash" => GeminiModel::Gemini20Flash,
        "gemini-2.5-flash" => GeminiModel::Gemini25Flash,
        "gemini-2.5-pro" => GeminiModel::Gemini25Pro,
        _ => GeminiModel::Gemini20Flash, // Default
    }
}

/// Render a transcript as a single prompt: system text first, then the dialogue
fn flatten(messages: &[Message]) -> String {
    let mut system = Vec::new();
    let mut dialogue = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system.push(message.content.as_str()),
            Role::User => dialogue.push(format!("Human: {}", message.content)),
            Role::Assistant => dialogue.push(format!("AI: {}", message.content)),
        }
    }

    let mut prompt = system.join("\n\n");
    if !dialogue.is_empty() {
        if !prompt.is_empty() {
            prompt.push_str("\n\n---\n\n");
        }
        prompt.push_str(&dialogue.join("\n"));
    }
    if messages.last().is_some_and(|m| m.role == Role::User) && messages.len() > 1 {
        prompt.push_str("\nAI:");
    }
    prompt
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let prompt = flatten(messages);
        tracing::debug!(provider = "google", model = %self.model, chars = prompt.len(), "invoking model");
        let result = self
            .client
            .generate_with_metadata(&prompt)
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(result.text)
    }

    fn provider(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn model(&self) -> &str {
        &self.model
    }
}
