use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced at the HTTP boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Store error: {0}")]
    StoreError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
        }

        let (status, error_message, details) = match self {
            AppError::BadRequest(err) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            AppError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.to_string(), None),
            AppError::BadGateway(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Bad Gateway: {}", msg),
                None,
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(err.to_string()),
            ),
            AppError::StoreError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store error".to_string(),
                Some(err.to_string()),
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details,
        });

        (status, body).into_response()
    }
}

/// Errors produced while handling a tool invocation or OAuth flow.
///
/// All variants except `Store` are recoverable: tool handlers render them as
/// a chat message back to the user, never as a failed HTTP call.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Please connect your Splitwise account first in the app settings.")]
    AuthenticationRequired,

    #[error("Invalid callback parameters: {0}")]
    InvalidCallback(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Resolution(String),

    #[error("Splitwise request failed: {0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(#[source] anyhow::Error),
}

impl ServiceError {
    /// Message shown to the end user in a chat response.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Store(_) => "Something went wrong, please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::AuthenticationRequired => {
                AppError::Unauthorized(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::InvalidCallback(_) => {
                AppError::BadRequest(anyhow::anyhow!(err.to_string()))
            }
            ServiceError::Validation(msg) | ServiceError::Resolution(msg) => {
                AppError::BadRequest(anyhow::anyhow!(msg))
            }
            ServiceError::Upstream(msg) => AppError::BadGateway(msg),
            ServiceError::Store(e) => AppError::StoreError(e),
        }
    }
}
