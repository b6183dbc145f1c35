use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::AppError;

/// Message body extractor. A body that is not a JSON message is reported
/// as `VALIDATION_ERROR`, like a message that fails validation.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(message)) => Ok(AppJson(message)),
            Err(rejection) => {
                info!(status = %rejection.status(), "Unreadable message body");
                Err(AppError::Validation(format!(
                    "Message body could not be read: {}",
                    rejection.body_text()
                )))
            }
        }
    }
}
