use axum::{Json, extract::State};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::models::dead_letter::DeadLetterResponse;
use crate::state::AppState;

/// List recorded dead letters.
#[utoipa::path(
    get,
    path = "/dead-letters",
    tag = "Dead Letters",
    operation_id = "listDeadLetters",
    summary = "List dead letters",
    description = "Returns every message the dead-letter consumer has recorded, oldest first.",
    responses(
        (status = 200, description = "All dead letters", body = Vec<DeadLetterResponse>),
        (status = 500, description = "Storage unavailable (STORAGE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_dead_letters(
    State(state): State<AppState>,
) -> Result<Json<Vec<DeadLetterResponse>>, AppError> {
    let records = state.dead_letters.find_all().await?;
    info!(count = records.len(), "Listed dead letters");

    Ok(Json(records.into_iter().map(Into::into).collect()))
}
