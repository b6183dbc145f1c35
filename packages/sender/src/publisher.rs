use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{Message, MqAppConfig, mq::EnvelopeError, mq::MessageEnvelope};
use mq::{Broker, Confirm, MqError};
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to encode message: {0}")]
    Encode(#[from] EnvelopeError),

    /// The broker could not be reached or refused the write outright.
    #[error("Broker unavailable: {0}")]
    Transport(#[from] MqError),
}

/// Receives publisher confirms after `publish` has already returned.
#[async_trait]
pub trait ConfirmListener: Send + Sync + 'static {
    async fn on_confirm(&self, correlation_id: Uuid, message_id: i64, confirm: Confirm);
}

pub struct LoggingConfirmListener;

#[async_trait]
impl ConfirmListener for LoggingConfirmListener {
    async fn on_confirm(&self, correlation_id: Uuid, message_id: i64, confirm: Confirm) {
        match confirm {
            Confirm::Ack => {
                info!(%correlation_id, message_id, "Broker confirmed message");
            }
            Confirm::Nack { cause } => {
                error!(
                    %correlation_id,
                    message_id,
                    cause = %cause,
                    "Broker did not accept message into the exchange"
                );
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishReceipt {
    /// Identifies this publish attempt in logs and confirms.
    pub correlation_id: Uuid,
    /// The message as sent, with its server-assigned timestamp.
    pub message: Message,
}

#[derive(Clone)]
pub struct Publisher {
    broker: Arc<dyn Broker>,
    exchange: String,
    routing_key: String,
    listener: Arc<dyn ConfirmListener>,
}

impl Publisher {
    pub fn new(broker: Arc<dyn Broker>, config: &MqAppConfig) -> Self {
        Self {
            broker,
            exchange: config.exchange.clone(),
            routing_key: config.routing_key.clone(),
            listener: Arc::new(LoggingConfirmListener),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn ConfirmListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Stamp, tag and send `message` to the main exchange.
    ///
    /// Returns once the broker has taken the message. The confirm is handled
    /// on a separate task; a negative confirm is logged, not returned. No
    /// retry is attempted.
    #[instrument(skip(self, message), fields(message_id = message.id()))]
    pub async fn publish(&self, message: Message) -> Result<PublishReceipt, PublishError> {
        let message = message.with_timestamp(Utc::now());
        let correlation_id = Uuid::new_v4();

        let mut envelope = MessageEnvelope::from_message(&message, Some(correlation_id))?;
        envelope.metadata.published_at = message.timestamp();

        info!(
            %correlation_id,
            exchange = %self.exchange,
            routing_key = %self.routing_key,
            "Publishing message"
        );

        let pending = self
            .broker
            .publish(&self.exchange, &self.routing_key, envelope)
            .await
            .inspect_err(|e| {
                error!(%correlation_id, error = %e, "Failed to publish message");
            })?;

        let listener = self.listener.clone();
        let message_id = message.id();
        tokio::spawn(async move {
            let confirm = pending.wait().await;
            listener.on_confirm(correlation_id, message_id, confirm).await;
        });

        info!(%correlation_id, "Message handed to broker");
        Ok(PublishReceipt {
            correlation_id,
            message,
        })
    }
}
