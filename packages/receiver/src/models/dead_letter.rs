use chrono::{DateTime, Utc};
use common::DeadLetterRecord;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeadLetterResponse {
    pub id: i32,
    /// The original message as JSON text.
    #[schema(example = r#"{"id":1,"name":"widget","price":9.99,"timestamp":"2025-01-02T03:04:05Z"}"#)]
    pub message_content: String,
    #[schema(example = "failed in primary queue")]
    pub error_reason: String,
    /// When the dead letter was recorded.
    pub timestamp: DateTime<Utc>,
}

impl From<DeadLetterRecord> for DeadLetterResponse {
    fn from(record: DeadLetterRecord) -> Self {
        Self {
            id: record.id,
            message_content: record.message_content,
            error_reason: record.error_reason,
            timestamp: record.timestamp,
        }
    }
}
