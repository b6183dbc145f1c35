use std::sync::Arc;

use async_trait::async_trait;
use common::{Message, MessageRequest};
use mq::{Delivery, DeliveryHandler, Disposition};
use tracing::{error, info, warn};

use crate::store::{MessageGateway, SaveError};

const DEAD_LETTER: Disposition = Disposition::Reject { requeue: false };

/// Persists messages from the main queue.
///
/// Acks only after the row is written. Every failure is rejected without
/// requeue so the broker moves the message to the dead-letter queue.
pub struct PrimaryConsumer {
    gateway: Arc<dyn MessageGateway>,
}

impl PrimaryConsumer {
    pub fn new(gateway: Arc<dyn MessageGateway>) -> Self {
        Self { gateway }
    }

    async fn persist(&self, request: MessageRequest) -> Result<Message, SaveError> {
        let message = Message::try_from(request)?;
        self.gateway.save(&message).await?;
        Ok(message)
    }
}

#[async_trait]
impl DeliveryHandler for PrimaryConsumer {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        let request: MessageRequest = match delivery.envelope.decode() {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Undecodable message, sending to dead-letter queue");
                return DEAD_LETTER;
            }
        };

        match self.persist(request).await {
            Ok(message) => {
                info!(id = message.id(), "Message persisted");
                Disposition::Ack
            }
            Err(SaveError::Invalid(e)) => {
                warn!(error = %e, "Invalid message, sending to dead-letter queue");
                DEAD_LETTER
            }
            Err(SaveError::Duplicate(id)) => {
                warn!(id, "Duplicate message id, sending to dead-letter queue");
                DEAD_LETTER
            }
            Err(SaveError::Storage(e)) => {
                error!(error = %e, "Failed to persist message, sending to dead-letter queue");
                DEAD_LETTER
            }
        }
    }

    fn on_panic(&self) -> Disposition {
        DEAD_LETTER
    }
}
