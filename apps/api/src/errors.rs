use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::github::GitHubError;
use crate::portfolio::TemplateError;
use crate::publish::PublishError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "GitHub authentication required".to_string(),
            ),
            AppError::Template(TemplateError::Unknown(name)) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Invalid template selected: {name}"),
            ),
            AppError::Template(e) => {
                tracing::error!("Template error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "TEMPLATE_ERROR",
                    "Failed to build portfolio template".to_string(),
                )
            }
            AppError::GitHub(GitHubError::Unauthorized { .. }) => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "GitHub rejected the credentials".to_string(),
            ),
            AppError::GitHub(e) => {
                tracing::error!(status = ?e.status(), "GitHub error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "REMOTE_SERVICE_ERROR",
                    "GitHub request failed".to_string(),
                )
            }
            AppError::Publish(e) => publish_parts(e),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

/// Short, user-facing messages only; raw GitHub bodies go to the log.
fn publish_parts(e: &PublishError) -> (StatusCode, &'static str, String) {
    match e {
        PublishError::InvalidInput(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
        }
        PublishError::Authorization { step, .. } => {
            tracing::warn!("Publish rejected by GitHub during {step}: {e}");
            (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "GitHub rejected the credentials; reconnect your GitHub account".to_string(),
            )
        }
        PublishError::RemoteService { step, .. } => {
            tracing::error!("Publish failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                "REMOTE_SERVICE_ERROR",
                format!("GitHub request failed during {step}; the deploy can be retried"),
            )
        }
        PublishError::ActivationTimeout { repository_url, .. } => {
            tracing::warn!("Publish incomplete: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "ACTIVATION_TIMEOUT",
                format!(
                    "Content was pushed to {repository_url} but GitHub Pages is not active yet; retry the deploy"
                ),
            )
        }
        PublishError::Cancelled { step } => {
            tracing::info!("Publish stopped before {step}: caller went away");
            (
                StatusCode::REQUEST_TIMEOUT,
                "CANCELLED",
                format!("Deploy was cancelled before {step}; the site was kept for a retry"),
            )
        }
        PublishError::Bundle { .. } => {
            tracing::error!("Publish failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Failed to read the generated site".to_string(),
            )
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
