use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::message::MessageResponse;
use crate::state::AppState;

/// List stored messages.
#[utoipa::path(
    get,
    path = "/messages",
    tag = "Messages",
    operation_id = "listMessages",
    summary = "List stored messages",
    description = "Returns every message the primary consumer has persisted, ordered by id.",
    responses(
        (status = 200, description = "All stored messages", body = Vec<MessageResponse>),
        (status = 500, description = "Storage unavailable (STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_messages(
    State(state): State<AppState>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = state.messages.find_all().await?;
    info!(count = messages.len(), "Listed messages");

    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
