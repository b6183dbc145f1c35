use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason stored for every message that reaches the dead-letter queue.
///
/// The broker does not tell the dead-letter consumer why the primary consumer
/// rejected a message, so all records share this value.
pub const PRIMARY_QUEUE_FAILURE_REASON: &str = "failed in primary queue";

/// A message that could not be processed by the primary consumer.
///
/// Records are independent of the `messages` table; the only link back to the
/// original message is the serialized content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// Assigned by the store on insert.
    pub id: i32,
    /// Original message as text.
    pub message_content: String,
    pub error_reason: String,
    /// When the dead-letter consumer handled the message, not when it first failed.
    pub timestamp: DateTime<Utc>,
}
