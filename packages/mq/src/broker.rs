use async_trait::async_trait;
use chrono::Utc;
use common::mq::{DeathRecord, MessageEnvelope};
use tokio::sync::oneshot;

use crate::{
    config::{DeadLetterTarget, Topology},
    error::MqError,
};

const DEATH_REASON_REJECTED: &str = "rejected";

/// Identifies one delivery for settlement. Unique per broker instance.
pub type DeliveryTag = u64;

/// Broker-side outcome of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirm {
    /// Accepted into the exchange. Says nothing about consumption.
    Ack,
    Nack { cause: String },
}

/// Publisher confirm that resolves after `publish` has returned.
#[derive(Debug)]
pub struct PendingConfirm {
    rx: oneshot::Receiver<Confirm>,
}

impl PendingConfirm {
    /// A pending confirm plus the sender the broker resolves it with.
    pub fn channel() -> (oneshot::Sender<Confirm>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    pub fn resolved(confirm: Confirm) -> Self {
        let (tx, pending) = Self::channel();
        // The receiver is alive; this cannot fail.
        let _ = tx.send(confirm);
        pending
    }

    pub async fn wait(self) -> Confirm {
        self.rx.await.unwrap_or_else(|_| Confirm::Nack {
            cause: "confirm channel closed".into(),
        })
    }
}

/// A message handed to a consumer and not yet settled.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub queue: String,
    pub envelope: MessageEnvelope,
}

impl Delivery {
    pub fn redelivered(&self) -> bool {
        self.envelope.metadata.redelivered
    }
}

/// Lifecycle of a single delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    Received,
    Acknowledged,
    Rejected { requeue: bool },
}

impl DeliveryState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, DeliveryState::Received)
    }
}

/// Stamp the death record a rejected envelope carries into its dead-letter queue.
pub(crate) fn mark_dead_lettered(
    envelope: &mut MessageEnvelope,
    queue: &str,
    target: &DeadLetterTarget,
) {
    let count = match &envelope.metadata.death {
        Some(death) if death.queue == queue => death.count + 1,
        _ => 1,
    };
    envelope.metadata.redelivered = false;
    envelope.metadata.death = Some(DeathRecord {
        queue: queue.to_string(),
        exchange: target.exchange.clone(),
        routing_key: target.routing_key.clone(),
        reason: DEATH_REASON_REJECTED.to_string(),
        time: Utc::now(),
        count,
    });
}

/// Publish-with-confirm, consume-with-manual-ack and dead-letter routing.
///
/// Settlement is per delivery; acking one tag never touches another.
#[async_trait]
pub trait Broker: Send + Sync + 'static {
    /// Declare exchanges, queues and bindings. Safe to call repeatedly.
    async fn declare(&self, topology: &Topology) -> Result<(), MqError>;

    /// Returns `Err` only when the message could not be handed to the broker.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        envelope: MessageEnvelope,
    ) -> Result<PendingConfirm, MqError>;

    /// Wait for the next delivery on `queue`.
    async fn next_delivery(&self, queue: &str) -> Result<Delivery, MqError>;

    async fn ack(&self, tag: DeliveryTag) -> Result<(), MqError>;

    /// Without requeue the message goes to the queue's dead-letter target, if any.
    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), MqError>;
}
