use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::store::StorageError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. Always `STORAGE_ERROR`.
    #[schema(example = "STORAGE_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Failed to read messages from storage")]
    pub message: String,
}

#[derive(Debug)]
pub enum AppError {
    Storage(StorageError),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Storage(err) => {
                tracing::error!(operation = err.operation, detail = %err.detail, "Storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "STORAGE_ERROR",
                        message: format!("Storage failed during {}", err.operation),
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

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}
