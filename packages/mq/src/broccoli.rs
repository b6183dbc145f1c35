use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use broccoli_queue::{brokers::broker::BrokerMessage, queue::BroccoliQueue};
use common::mq::MessageEnvelope;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    broker::{Broker, Confirm, Delivery, DeliveryTag, PendingConfirm, mark_dead_lettered},
    config::Topology,
    error::MqError,
};

pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

struct InFlight {
    queue: String,
    message: BrokerMessage<MessageEnvelope>,
}

/// Redis-backed broker.
///
/// Every queue is a broccoli topic. Redis has no exchanges, so routing and
/// dead-lettering are resolved here from the declared topology. Rejections
/// publish the replacement copy first and acknowledge the original second,
/// so a crash in between duplicates rather than loses the message.
pub struct BroccoliBroker {
    queue: BroccoliQueue,
    topology: RwLock<Topology>,
    in_flight: DashMap<DeliveryTag, InFlight>,
    next_tag: AtomicU64,
}

impl BroccoliBroker {
    pub async fn connect(config: &MqConfig) -> Result<Self, MqError> {
        let queue = BroccoliQueue::builder(&config.url)
            .pool_connections(config.pool_size)
            .build()
            .await?;

        Ok(Self {
            queue,
            topology: RwLock::new(Topology::new()),
            in_flight: DashMap::new(),
            next_tag: AtomicU64::new(1),
        })
    }

    async fn push(&self, queue: &str, envelope: &MessageEnvelope) -> Result<(), MqError> {
        self.queue.publish(queue, None, envelope, None).await?;
        Ok(())
    }

    async fn route_and_push(
        &self,
        exchange: &str,
        routing_key: &str,
        mut envelope: MessageEnvelope,
    ) -> Result<usize, MqError> {
        let targets = self.topology.read().await.route(exchange, routing_key)?;
        envelope.routing_key = Some(routing_key.to_string());
        for queue in &targets {
            self.push(queue, &envelope).await?;
        }
        Ok(targets.len())
    }

    fn take(&self, tag: DeliveryTag) -> Result<InFlight, MqError> {
        self.in_flight
            .remove(&tag)
            .map(|(_, entry)| entry)
            .ok_or_else(|| MqError::AckFailed(format!("unknown delivery tag {tag}")))
    }

    /// Remove the original from the processing list. On failure the delivery
    /// is put back so it can be settled again.
    async fn acknowledge(&self, tag: DeliveryTag, entry: InFlight) -> Result<(), MqError> {
        match self
            .queue
            .acknowledge(&entry.queue, entry.message.clone())
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                self.in_flight.insert(tag, entry);
                Err(MqError::AckFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Broker for BroccoliBroker {
    async fn declare(&self, topology: &Topology) -> Result<(), MqError> {
        topology.validate()?;
        self.topology.write().await.merge(topology)?;

        for queue in topology.queues() {
            info!(
                queue = %queue.name,
                durable = queue.durable,
                arguments = ?queue.arguments(),
                "Queue declared"
            );
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        envelope: MessageEnvelope,
    ) -> Result<PendingConfirm, MqError> {
        let message_id = envelope.message_id.clone();
        match self.route_and_push(exchange, routing_key, envelope).await {
            Ok(0) => {
                warn!(
                    exchange,
                    routing_key,
                    message_id = %message_id,
                    "Message is unroutable and was dropped"
                );
                Ok(PendingConfirm::resolved(Confirm::Ack))
            }
            Ok(_) => Ok(PendingConfirm::resolved(Confirm::Ack)),
            Err(MqError::ExchangeNotFound(exchange)) => {
                Ok(PendingConfirm::resolved(Confirm::Nack {
                    cause: format!("exchange '{exchange}' is not declared"),
                }))
            }
            Err(e) => Err(e),
        }
    }

    async fn next_delivery(&self, queue: &str) -> Result<Delivery, MqError> {
        if self.topology.read().await.find_queue(queue).is_none() {
            return Err(MqError::QueueNotFound(queue.to_string()));
        }

        let message = self
            .queue
            .consume::<MessageEnvelope>(queue, None)
            .await?;

        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        let delivery = Delivery {
            tag,
            queue: queue.to_string(),
            envelope: message.payload.clone(),
        };
        self.in_flight.insert(
            tag,
            InFlight {
                queue: queue.to_string(),
                message,
            },
        );

        debug!(queue, tag, message_id = %delivery.envelope.message_id, "Delivery received");
        Ok(delivery)
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), MqError> {
        let entry = self.take(tag)?;
        self.acknowledge(tag, entry).await
    }

    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), MqError> {
        let entry = self.take(tag)?;
        let mut envelope = entry.message.payload.clone();

        let republished = if requeue {
            envelope.metadata.redelivered = true;
            self.push(&entry.queue, &envelope).await
        } else {
            let target = self
                .topology
                .read()
                .await
                .find_queue(&entry.queue)
                .and_then(|q| q.dead_letter.clone());

            match target {
                Some(target) => {
                    mark_dead_lettered(&mut envelope, &entry.queue, &target);
                    self.route_and_push(&target.exchange, &target.routing_key, envelope)
                        .await
                        .map(|_| ())
                }
                None => {
                    debug!(queue = %entry.queue, tag, "Rejected message discarded");
                    Ok(())
                }
            }
        };

        if let Err(e) = republished {
            self.in_flight.insert(tag, entry);
            return Err(MqError::AckFailed(e.to_string()));
        }

        self.acknowledge(tag, entry).await
    }
}
