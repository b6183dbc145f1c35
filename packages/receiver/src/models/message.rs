use chrono::{DateTime, Utc};
use common::Message;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "widget")]
    pub name: String,
    #[schema(example = 9.99)]
    pub price: f64,
    /// Send time assigned by the sender.
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id(),
            name: message.name().to_string(),
            price: message.price(),
            timestamp: message.timestamp(),
        }
    }
}
