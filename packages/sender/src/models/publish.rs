use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::publisher::PublishReceipt;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PublishResponse {
    #[schema(example = "Message published")]
    pub message: String,
    pub id: i64,
    /// Correlation id of this publish attempt; search the logs for it to
    /// find the broker confirm.
    pub correlation_id: Uuid,
    /// Server-assigned send time.
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<PublishReceipt> for PublishResponse {
    fn from(receipt: PublishReceipt) -> Self {
        Self {
            message: "Message published".into(),
            id: receipt.message.id(),
            correlation_id: receipt.correlation_id,
            timestamp: receipt.message.timestamp(),
        }
    }
}
