use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::HashMap, fmt::Debug};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

/// Core trait for all payloads carried by the broker
pub trait WireMessage: Serialize + DeserializeOwned + Debug + Send + Sync + Clone {
    fn message_type() -> &'static str
    where
        Self: Sized;

    fn message_id(&self) -> String;
}

/// Broker-side bookkeeping attached to an envelope.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    pub published_at: Option<DateTime<Utc>>,
    /// True once the broker has handed this message out and taken it back.
    #[serde(default)]
    pub redelivered: bool,
    /// Present when the message reached its queue through dead-lettering.
    #[serde(default)]
    pub death: Option<DeathRecord>,
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,
}

/// Where and why a message was dead-lettered, in the spirit of RabbitMQ's `x-death`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    /// Queue the message was rejected from.
    pub queue: String,
    /// Dead-letter exchange and routing key the message was republished with.
    pub exchange: String,
    pub routing_key: String,
    pub reason: String,
    pub time: DateTime<Utc>,
    pub count: u32,
}

/// Message envelope for transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub message_type: String,
    pub message_id: String,
    /// Identifies one publish attempt, used to match broker confirms.
    pub correlation_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: MessageMetadata,
    pub payload: serde_json::Value,
    /// Routing key the message was last published with
    pub routing_key: Option<String>,
}

impl MessageEnvelope {
    /// Create envelope from typed message
    pub fn from_message<M: WireMessage>(
        message: &M,
        correlation_id: Option<Uuid>,
    ) -> Result<Self, EnvelopeError> {
        let message_type = M::message_type().to_string();
        let message_id = message.message_id();

        debug!(
            message_type = %message_type,
            message_id = %message_id,
            correlation_id = ?correlation_id,
            "Creating message envelope"
        );

        Ok(Self {
            message_type,
            message_id,
            correlation_id,
            metadata: MessageMetadata::default(),
            payload: serde_json::to_value(message)?,
            routing_key: None,
        })
    }

    /// Deserialize the payload into a typed message
    pub fn decode<M: WireMessage>(&self) -> Result<M, EnvelopeError> {
        if self.message_type != M::message_type() {
            error!(
                expected = M::message_type(),
                actual = %self.message_type,
                message_id = %self.message_id,
                "Message type mismatch"
            );
            return Err(EnvelopeError::TypeMismatch {
                expected: M::message_type().to_string(),
                actual: self.message_type.clone(),
            });
        }

        serde_json::from_value(self.payload.clone()).map_err(|e| {
            error!(error = %e, message_id = %self.message_id, "Deserialization failed");
            EnvelopeError::Serialization(e)
        })
    }

    /// Payload rendered as compact JSON text.
    pub fn content(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(&self.payload)?)
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Message type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
}
