use axum::{
    response::{IntoResponse, Response},
    Json,
    http::StatusCode,
};
use serde::Serialize;

use crate::api::response;

/// Failures surfaced by the fetch pipeline and the HTTP layer.
///
/// `Clone` because one settled upstream result is handed to every caller
/// that joined the same in-flight request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    #[error("Upstream returned HTTP {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("Upstream rate limit exceeded")]
    RateLimited,

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response shape: {0}")]
    Schema(String),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid secret")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Transport { .. } | AppError::Schema(_) | AppError::GraphQl(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimited => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Bare body for rejected callers, outside the `{data, meta}` envelope.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AppError::Unauthorized = self {
            let body = Json(MessageResponse {
                message: self.to_string(),
            });
            return (status, body).into_response();
        }
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        response::error::<()>(status, self.to_string()).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout
        } else if err.is_decode() {
            AppError::Schema(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<std::env::VarError> for AppError {
    fn from(err: std::env::VarError) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
