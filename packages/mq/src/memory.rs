use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use common::mq::MessageEnvelope;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::{
    broker::{
        Broker, Confirm, Delivery, DeliveryState, DeliveryTag, PendingConfirm, mark_dead_lettered,
    },
    config::Topology,
    error::MqError,
};

/// What happened to one delivery, as seen by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub tag: DeliveryTag,
    pub queue: String,
    pub message_id: String,
    pub state: DeliveryState,
}

#[derive(Default)]
struct State {
    topology: Topology,
    queues: HashMap<String, VecDeque<MessageEnvelope>>,
    in_flight: HashMap<DeliveryTag, Delivery>,
    ledger: BTreeMap<DeliveryTag, DeliveryRecord>,
    next_tag: DeliveryTag,
}

impl State {
    fn enqueue(&mut self, exchange: &str, routing_key: &str, envelope: MessageEnvelope) -> usize {
        let targets = match self.topology.route(exchange, routing_key) {
            Ok(targets) => targets,
            Err(e) => {
                warn!(exchange, routing_key, error = %e, "Dropping message with no route");
                return 0;
            }
        };

        for queue in &targets {
            let mut copy = envelope.clone();
            copy.routing_key = Some(routing_key.to_string());
            self.queues.entry(queue.clone()).or_default().push_back(copy);
        }
        targets.len()
    }

    fn settle(&mut self, tag: DeliveryTag, state: DeliveryState) -> Result<Delivery, MqError> {
        let delivery = self
            .in_flight
            .remove(&tag)
            .ok_or_else(|| MqError::AckFailed(format!("unknown delivery tag {tag}")))?;
        if let Some(record) = self.ledger.get_mut(&tag) {
            record.state = state;
        }
        Ok(delivery)
    }

    fn dead_letter(&mut self, delivery: Delivery) {
        let target = self
            .topology
            .find_queue(&delivery.queue)
            .and_then(|q| q.dead_letter.clone());

        let Some(target) = target else {
            debug!(queue = %delivery.queue, tag = delivery.tag, "Rejected message discarded");
            return;
        };

        let mut envelope = delivery.envelope;
        mark_dead_lettered(&mut envelope, &delivery.queue, &target);

        let routed = self.enqueue(&target.exchange, &target.routing_key, envelope);
        debug!(
            queue = %delivery.queue,
            tag = delivery.tag,
            dead_letter_exchange = %target.exchange,
            routed,
            "Message dead-lettered"
        );
    }
}

/// Process-local broker with RabbitMQ-style semantics.
///
/// Every delivery is written to a ledger so tests can check which terminal
/// state it reached. The `set_*` switches simulate transport faults.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
    notify: Notify,
    unavailable: AtomicBool,
    nack_publishes: AtomicBool,
    fail_settlements: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the connection were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Resolve publishes with a negative confirm and drop the message.
    pub fn set_nack_publishes(&self, nack: bool) {
        self.nack_publishes.store(nack, Ordering::SeqCst);
    }

    /// Make ack and nack fail, leaving deliveries in flight.
    pub fn set_fail_settlements(&self, fail: bool) {
        self.fail_settlements.store(fail, Ordering::SeqCst);
    }

    pub async fn ledger(&self) -> Vec<DeliveryRecord> {
        self.state.lock().await.ledger.values().cloned().collect()
    }

    pub async fn state_of(&self, tag: DeliveryTag) -> Option<DeliveryState> {
        self.state.lock().await.ledger.get(&tag).map(|r| r.state)
    }

    /// Messages waiting in `queue`, excluding deliveries in flight.
    pub async fn queue_depth(&self, queue: &str) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(queue)
            .map_or(0, VecDeque::len)
    }

    pub async fn peek(&self, queue: &str) -> Vec<MessageEnvelope> {
        self.state
            .lock()
            .await
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn in_flight(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Simulate channel loss: every unsettled delivery goes back to the head
    /// of its queue, marked redelivered. Returns how many were recovered.
    pub async fn recover(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut tags: Vec<_> = state.in_flight.keys().copied().collect();
        tags.sort_unstable_by(|a, b| b.cmp(a));

        let count = tags.len();
        for tag in tags {
            if let Some(mut delivery) = state.in_flight.remove(&tag) {
                delivery.envelope.metadata.redelivered = true;
                state
                    .queues
                    .entry(delivery.queue)
                    .or_default()
                    .push_front(delivery.envelope);
            }
        }
        drop(state);

        if count > 0 {
            self.notify.notify_waiters();
        }
        count
    }

    fn check_available(&self) -> Result<(), MqError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MqError::Connection("broker connection unavailable".into()));
        }
        Ok(())
    }

    fn check_settlement(&self, tag: DeliveryTag) -> Result<(), MqError> {
        self.check_available()
            .map_err(|e| MqError::AckFailed(e.to_string()))?;
        if self.fail_settlements.load(Ordering::SeqCst) {
            return Err(MqError::AckFailed(format!(
                "channel closed while settling delivery {tag}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn declare(&self, topology: &Topology) -> Result<(), MqError> {
        self.check_available()?;
        topology.validate()?;

        let mut state = self.state.lock().await;
        state.topology.merge(topology)?;
        for queue in topology.queues() {
            state.queues.entry(queue.name.clone()).or_default();
        }
        Ok(())
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        envelope: MessageEnvelope,
    ) -> Result<PendingConfirm, MqError> {
        self.check_available()?;

        if self.nack_publishes.load(Ordering::SeqCst) {
            return Ok(PendingConfirm::resolved(Confirm::Nack {
                cause: "broker refused the message".into(),
            }));
        }

        let mut state = self.state.lock().await;
        let targets = match state.topology.route(exchange, routing_key) {
            Ok(targets) => targets,
            Err(e) => {
                return Ok(PendingConfirm::resolved(Confirm::Nack {
                    cause: e.to_string(),
                }));
            }
        };

        if targets.is_empty() {
            warn!(
                exchange,
                routing_key,
                message_id = %envelope.message_id,
                "Message is unroutable and was dropped"
            );
            return Ok(PendingConfirm::resolved(Confirm::Ack));
        }

        state.enqueue(exchange, routing_key, envelope);
        drop(state);
        self.notify.notify_waiters();

        Ok(PendingConfirm::resolved(Confirm::Ack))
    }

    async fn next_delivery(&self, queue: &str) -> Result<Delivery, MqError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.check_available()?;
            {
                let mut state = self.state.lock().await;
                let envelope = state
                    .queues
                    .get_mut(queue)
                    .ok_or_else(|| MqError::QueueNotFound(queue.to_string()))?
                    .pop_front();

                if let Some(envelope) = envelope {
                    state.next_tag += 1;
                    let tag = state.next_tag;
                    let delivery = Delivery {
                        tag,
                        queue: queue.to_string(),
                        envelope,
                    };
                    state.ledger.insert(
                        tag,
                        DeliveryRecord {
                            tag,
                            queue: queue.to_string(),
                            message_id: delivery.envelope.message_id.clone(),
                            state: DeliveryState::Received,
                        },
                    );
                    state.in_flight.insert(tag, delivery.clone());
                    return Ok(delivery);
                }
            }

            notified.await;
        }
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), MqError> {
        self.check_settlement(tag)?;
        self.state
            .lock()
            .await
            .settle(tag, DeliveryState::Acknowledged)?;
        Ok(())
    }

    async fn nack(&self, tag: DeliveryTag, requeue: bool) -> Result<(), MqError> {
        self.check_settlement(tag)?;

        let mut state = self.state.lock().await;
        let mut delivery = state.settle(tag, DeliveryState::Rejected { requeue })?;

        if requeue {
            delivery.envelope.metadata.redelivered = true;
            state
                .queues
                .entry(delivery.queue)
                .or_default()
                .push_front(delivery.envelope);
        } else {
            state.dead_letter(delivery);
        }
        drop(state);

        self.notify.notify_waiters();
        Ok(())
    }
}
