//! HTTP client for the summarizer API, used by the terminal front end.

use crate::server::types::{
    ChatRequest, ChatResponse, HealthResponse, ProvidersResponse, SummarizeRequest,
    SummarizeResponse,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);
const PROVIDERS_TIMEOUT: Duration = Duration::from_secs(10);
const SUMMARIZE_TIMEOUT: Duration = Duration::from_secs(300);
const CHAT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("API call failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API returned {status}: {detail}")]
    Api { status: u16, detail: String },
}

pub struct ApiClient {
    base_url: String,
    http: Client,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::builder().build()?,
        })
    }

    /// Whether the API answers its health check
    pub async fn health(&self) -> bool {
        match self.get::<HealthResponse>("/health", HEALTH_TIMEOUT).await {
            Ok(health) => health.status == "healthy",
            Err(_) => false,
        }
    }

    pub async fn providers(&self) -> Result<ProvidersResponse, ClientError> {
        self.get("/providers", PROVIDERS_TIMEOUT).await
    }

    pub async fn summarize(
        &self,
        url: &str,
        provider: Option<String>,
        model: Option<String>,
    ) -> Result<SummarizeResponse, ClientError> {
        let request = SummarizeRequest {
            url: url.to_string(),
            provider,
            model,
        };
        self.post("/summarize", &request, SUMMARIZE_TIMEOUT).await
    }

    pub async fn chat(&self, session_id: &str, question: &str) -> Result<ChatResponse, ClientError> {
        let request = ChatRequest {
            session_id: session_id.to_string(),
            question: question.to_string(),
        };
        self.post("/chat", &request, CHAT_TIMEOUT).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, timeout: Duration) -> Result<T, ClientError> {
        let request = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .timeout(timeout);
        Self::send(request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T, ClientError> {
        let request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .timeout(timeout);
        Self::send(request).await
    }

    async fn send<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let detail = body
                .get("detail")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown error")
                .to_string();
            return Err(ClientError::Api {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }
}
