//! OpenAI and Azure OpenAI chat completions.
//!
//! Both speak the same wire format; they differ only in URL layout and auth header.

use super::{send_json, ChatModel, Message, ProviderError, ProviderKind};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-02-15-preview";

enum Auth {
    Bearer(String),
    ApiKeyHeader(String),
}

pub struct OpenAiModel {
    client: Client,
    kind: ProviderKind,
    url: String,
    auth: Auth,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiModel {
    /// Model served by the OpenAI API, or an OpenAI-compatible gateway at `base_url`
    pub fn new(
        api_key: &str,
        model: &str,
        temperature: f32,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let base = base_url.unwrap_or(OPENAI_BASE_URL).trim_end_matches('/');
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            kind: ProviderKind::OpenAi,
            url: format!("{base}/chat/completions"),
            auth: Auth::Bearer(api_key.to_string()),
            model: model.to_string(),
            temperature,
        })
    }

    /// Deployment hosted on an Azure OpenAI resource
    pub fn azure(
        api_key: &str,
        endpoint: &str,
        api_version: &str,
        deployment: &str,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let endpoint = endpoint.trim_end_matches('/');
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            kind: ProviderKind::AzureOpenAi,
            url: format!(
                "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={api_version}"
            ),
            auth: Auth::ApiKeyHeader(api_key.to_string()),
            model: deployment.to_string(),
            temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiModel {
    async fn invoke(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };
        let request = self.client.post(&self.url).json(&body);
        let request = match &self.auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::ApiKeyHeader(key) => request.header("api-key", key),
        };

        tracing::debug!(provider = %self.kind, model = %self.model, messages = messages.len(), "invoking model");
        let response: ChatCompletionResponse = send_json(request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in completion".to_string()))
    }

    fn provider(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }
}
