use axum::{Json, extract::State};
use common::{Message, MessageRequest};
use tracing::{info, instrument};

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::publish::PublishResponse;
use crate::state::AppState;

/// Publish a message to the main exchange.
#[utoipa::path(
    post,
    path = "/publish",
    tag = "Messages",
    operation_id = "publishMessage",
    summary = "Publish a message",
    description = "Validates the message, stamps the send time and hands it to the broker. \
                   Success means the broker took the message, not that it was stored.",
    request_body = MessageRequest,
    responses(
        (status = 200, description = "Message handed to the broker", body = PublishResponse),
        (status = 500, description = "Invalid message (VALIDATION_ERROR) or broker unavailable (PUBLISH_FAILED)", body = ErrorBody),
    ),
)]
#[instrument(skip_all)]
pub async fn publish_message(
    State(state): State<AppState>,
    AppJson(payload): AppJson<MessageRequest>,
) -> Result<Json<PublishResponse>, AppError> {
    let message = Message::try_from(payload).inspect_err(|e| {
        info!(error = %e, "Rejected invalid message");
    })?;

    let receipt = state.publisher.publish(message).await?;
    info!(
        id = receipt.message.id(),
        correlation_id = %receipt.correlation_id,
        "Publish request accepted"
    );

    Ok(Json(receipt.into()))
}
