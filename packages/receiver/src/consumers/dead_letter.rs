use std::sync::Arc;

use async_trait::async_trait;
use common::PRIMARY_QUEUE_FAILURE_REASON;
use mq::{Delivery, DeliveryHandler, Disposition};
use tracing::{error, info, warn};

use crate::store::{DeadLetterRecorder, RecordError};

/// Records messages arriving on the dead-letter queue.
///
/// A storage failure is rejected without requeue so a broken store cannot
/// cause a redelivery loop; the message is lost. Any other failure is
/// requeued.
pub struct DeadLetterConsumer {
    recorder: Arc<dyn DeadLetterRecorder>,
}

impl DeadLetterConsumer {
    pub fn new(recorder: Arc<dyn DeadLetterRecorder>) -> Self {
        Self { recorder }
    }

    async fn record(&self, delivery: &Delivery) -> Result<i32, RecordError> {
        let content = delivery
            .envelope
            .content()
            .map_err(|e| RecordError::Unexpected(e.to_string()))?;

        let record = self
            .recorder
            .record(&content, PRIMARY_QUEUE_FAILURE_REASON)
            .await?;
        Ok(record.id)
    }
}

#[async_trait]
impl DeliveryHandler for DeadLetterConsumer {
    async fn handle(&self, delivery: &Delivery) -> Disposition {
        if let Some(death) = &delivery.envelope.metadata.death {
            info!(
                source_queue = %death.queue,
                death_reason = %death.reason,
                death_count = death.count,
                died_at = %death.time,
                "Dead-lettered message received"
            );
        }

        match self.record(delivery).await {
            Ok(id) => {
                info!(record_id = id, "Dead letter stored");
                Disposition::Ack
            }
            Err(RecordError::Storage(e)) => {
                error!(error = %e, "Failed to store dead letter, dropping it");
                Disposition::Reject { requeue: false }
            }
            Err(RecordError::Unexpected(e)) => {
                warn!(error = %e, "Unexpected dead letter failure, requeueing");
                Disposition::Reject { requeue: true }
            }
        }
    }

    fn on_panic(&self) -> Disposition {
        Disposition::Reject { requeue: true }
    }
}
