use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::ValidationError;
use serde::Serialize;

use crate::publisher::PublishError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`,
    /// `PUBLISH_FAILED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "name must not be blank")]
    pub message: String,
}

/// Every failure answers 500; `code` tells callers which kind it was.
#[derive(Debug)]
pub enum AppError {
    /// The message was rejected before publishing. The text names the field.
    Validation(String),
    /// The broker could not take the message. The text is safe to show.
    PublishFailed(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::PublishFailed(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    code: "PUBLISH_FAILED",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PublishError> for AppError {
    fn from(err: PublishError) -> Self {
        match err {
            PublishError::Transport(e) => {
                tracing::error!(error = %e, "Publish failed");
                AppError::PublishFailed("Failed to send message to the broker".into())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}
