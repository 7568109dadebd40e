//! Client-facing API errors.

use crate::config::ConfigError;
use crate::scraper::ScraperError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Errors returned by route handlers, rendered as `{"detail": "..."}`
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    SessionNotFound(String),
    #[error("{0}")]
    ProviderUnavailable(String),
    #[error("{0}")]
    ModelInvocation(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ProviderUnavailable(_)
            | ApiError::ModelInvocation(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ScraperError> for ApiError {
    fn from(err: ScraperError) -> Self {
        if matches!(err, ScraperError::InvalidUrl) {
            ApiError::InvalidInput(err.to_string())
        } else {
            ApiError::Unprocessable(err.to_string())
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        } else {
            tracing::warn!(%status, error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraper_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(ScraperError::InvalidUrl).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ScraperError::NoReadableContent).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ScraperError::Timeout).to_string(),
            "Page took too long to load"
        );
    }
}
