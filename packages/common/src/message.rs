use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mq::WireMessage;

/// Reasons a message is rejected before any broker or storage interaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("id is required")]
    MissingId,

    #[error("name must not be blank")]
    BlankName,

    #[error("price is required")]
    MissingPrice,

    #[error("price must be a positive number, got {0}")]
    NonPositivePrice(f64),
}

/// Message as supplied by a caller or read off the wire, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MessageRequest {
    /// Externally assigned identifier.
    #[schema(example = 1)]
    pub id: Option<i64>,
    #[schema(example = "widget")]
    pub name: Option<String>,
    /// Must be strictly positive.
    #[schema(example = 9.99)]
    pub price: Option<f64>,
    /// Accepted for compatibility; the sender always overwrites it.
    pub timestamp: Option<DateTime<Utc>>,
}

/// A validated domain message.
///
/// The only ways to obtain one are [`Message::new`] and conversion from a
/// [`MessageRequest`] (deserialization goes through the latter), so every
/// value in circulation satisfies the field rules. Identifier uniqueness is
/// not checked here; that is a storage concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MessageRequest")]
pub struct Message {
    id: i64,
    name: String,
    price: f64,
    timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(id: i64, name: impl Into<String>, price: f64) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::BlankName);
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(ValidationError::NonPositivePrice(price));
        }

        Ok(Self {
            id,
            name,
            price,
            timestamp: None,
        })
    }

    /// Replace the timestamp, discarding whatever was there before.
    pub fn with_timestamp(mut self, timestamp: impl Into<Option<DateTime<Utc>>>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

impl TryFrom<MessageRequest> for Message {
    type Error = ValidationError;

    fn try_from(req: MessageRequest) -> Result<Self, Self::Error> {
        let id = req.id.ok_or(ValidationError::MissingId)?;
        let name = req.name.ok_or(ValidationError::BlankName)?;
        let price = req.price.ok_or(ValidationError::MissingPrice)?;
        Ok(Message::new(id, name, price)?.with_timestamp(req.timestamp))
    }
}

impl WireMessage for Message {
    fn message_type() -> &'static str {
        "message"
    }

    fn message_id(&self) -> String {
        self.id.to_string()
    }
}

/// Lets a consumer read a payload without validating it, so field errors
/// surface as [`ValidationError`] instead of a decode failure.
impl WireMessage for MessageRequest {
    fn message_type() -> &'static str {
        Message::message_type()
    }

    fn message_id(&self) -> String {
        self.id.map(|id| id.to_string()).unwrap_or_default()
    }
}
