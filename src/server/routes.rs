//! HTTP route handlers for the summarizer API.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::error::ApiError;
use super::state::AppState;
use super::types::{
    ChatRequest, ChatResponse, HealthResponse, ProviderInfo, ProvidersResponse, SummarizeRequest,
    SummarizeResponse,
};
use crate::providers::{self, ProviderError};
use crate::session::SessionError;
use crate::{agent, scraper};

pub const SERVICE_NAME: &str = "webpage-summarizer-api";

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/providers", get(list_providers))
        .route("/summarize", post(summarize_page))
        .route("/chat", post(chat_with_summary))
        .route("/conversation", post(ask_question))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Webpage Summarizer API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/summarize": "POST - Summarize a webpage",
            "/providers": "GET - List available providers",
            "/chat": "POST - Chat about a summarized webpage",
            "/conversation": "POST - Ask follow-up questions",
            "/health": "GET - Health check"
        }
    }))
}

/// Health check endpoint.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
    })
}

/// List providers that are enabled and have credentials right now.
async fn list_providers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProvidersResponse>, ApiError> {
    let config = state.config.load()?;
    let available_providers: std::collections::BTreeMap<_, _> =
        providers::available_providers(&config, &state.credentials)
            .into_iter()
            .map(|(kind, descriptor)| {
                (
                    kind,
                    ProviderInfo {
                        models: descriptor.models,
                        default_model: descriptor.default_model,
                    },
                )
            })
            .collect();

    Ok(Json(ProvidersResponse {
        total_providers: available_providers.len(),
        available_providers,
    }))
}

fn provider_error(err: ProviderError) -> ApiError {
    ApiError::ProviderUnavailable(err.to_string())
}

/// Fetch, extract and summarize a page, then open a chat session on the result.
async fn summarize_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let url = scraper::validate_url(&request.url)?;
    let config = state.config.load()?;

    let available = providers::available_providers(&config, &state.credentials);
    let (provider, model_name) = providers::select(
        &available,
        request.provider.as_deref(),
        request.model.as_deref(),
    )
    .map_err(provider_error)?;

    let content = scraper::fetch_and_clean_content(&state.http, &url, &config.scraping).await?;

    let model = providers::create(provider.as_str(), &model_name, &config, &state.credentials)
        .map_err(provider_error)?;
    let prompts = config.prompts()?;
    let result = agent::summarize(&content, &model, &prompts)
        .await
        .map_err(|e| ApiError::ModelInvocation(e.to_string()))?;

    let session_id = state.sessions.create(result.clone(), url.as_str(), model);

    Ok(Json(SummarizeResponse {
        summary: result.summary,
        main_topic: result.topic,
        session_id,
    }))
}

/// Chat with a previously summarized page.
async fn chat_with_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    match state
        .sessions
        .append(&request.session_id, &request.question)
        .await
    {
        Ok(answer) => Ok(Json(ChatResponse {
            answer,
            session_id: request.session_id,
        })),
        Err(SessionError::NotFound(_)) => Err(ApiError::SessionNotFound(
            "Chat session not found. Please summarize a webpage first.".to_string(),
        )),
        Err(SessionError::Model(e)) => Err(ApiError::ModelInvocation(format!(
            "Error processing chat: {e}"
        ))),
    }
}

/// Ask a follow-up question in an existing conversation.
async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let answer = state
        .sessions
        .append(&request.session_id, &request.question)
        .await
        .map_err(|e| match e {
            SessionError::NotFound(_) => {
                ApiError::SessionNotFound("Conversation session not found".to_string())
            }
            SessionError::Model(e) => ApiError::ModelInvocation(e.to_string()),
        })?;

    Ok(Json(ChatResponse {
        answer,
        session_id: request.session_id,
    }))
}
