use std::collections::BTreeMap;

use common::MqAppConfig;

use crate::error::MqError;

pub const DEAD_LETTER_EXCHANGE_ARG: &str = "x-dead-letter-exchange";
pub const DEAD_LETTER_ROUTING_KEY_ARG: &str = "x-dead-letter-routing-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Routes to queues whose binding key equals the routing key.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: ExchangeKind,
    pub durable: bool,
}

impl ExchangeSpec {
    pub fn direct(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ExchangeKind::Direct,
            durable: true,
        }
    }
}

/// Where a queue sends the messages it rejects without requeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterTarget {
    pub exchange: String,
    pub routing_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub dead_letter: Option<DeadLetterTarget>,
}

impl QueueSpec {
    pub fn durable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            durable: true,
            dead_letter: None,
        }
    }

    pub fn with_dead_letter(
        mut self,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        self.dead_letter = Some(DeadLetterTarget {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        });
        self
    }

    /// Declaration arguments in the form RabbitMQ expects them.
    pub fn arguments(&self) -> BTreeMap<&'static str, String> {
        let mut args = BTreeMap::new();
        if let Some(target) = &self.dead_letter {
            args.insert(DEAD_LETTER_EXCHANGE_ARG, target.exchange.clone());
            args.insert(DEAD_LETTER_ROUTING_KEY_ARG, target.routing_key.clone());
        }
        args
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSpec {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
}

/// Exchanges, queues and bindings a broker must provide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    exchanges: Vec<ExchangeSpec>,
    queues: Vec<QueueSpec>,
    bindings: Vec<BindingSpec>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exchange(mut self, exchange: ExchangeSpec) -> Self {
        self.exchanges.push(exchange);
        self
    }

    pub fn queue(mut self, queue: QueueSpec) -> Self {
        self.queues.push(queue);
        self
    }

    pub fn bind(
        mut self,
        queue: impl Into<String>,
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        self.bindings.push(BindingSpec {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        });
        self
    }

    pub fn exchanges(&self) -> &[ExchangeSpec] {
        &self.exchanges
    }

    pub fn queues(&self) -> &[QueueSpec] {
        &self.queues
    }

    pub fn bindings(&self) -> &[BindingSpec] {
        &self.bindings
    }

    pub fn find_queue(&self, name: &str) -> Option<&QueueSpec> {
        self.queues.iter().find(|q| q.name == name)
    }

    fn find_exchange(&self, name: &str) -> Option<&ExchangeSpec> {
        self.exchanges.iter().find(|e| e.name == name)
    }

    /// Check that every binding and dead-letter target refers to declared resources.
    pub fn validate(&self) -> Result<(), MqError> {
        for binding in &self.bindings {
            if self.find_exchange(&binding.exchange).is_none() {
                return Err(MqError::ExchangeNotFound(binding.exchange.clone()));
            }
            if self.find_queue(&binding.queue).is_none() {
                return Err(MqError::QueueNotFound(binding.queue.clone()));
            }
        }
        for target in self.queues.iter().filter_map(|q| q.dead_letter.as_ref()) {
            if self.find_exchange(&target.exchange).is_none() {
                return Err(MqError::ExchangeNotFound(target.exchange.clone()));
            }
        }
        Ok(())
    }

    /// Add everything from `other`. Redeclaring an identical resource is a
    /// no-op; redeclaring one with different settings is a conflict.
    pub fn merge(&mut self, other: &Topology) -> Result<(), MqError> {
        for exchange in &other.exchanges {
            match self.find_exchange(&exchange.name) {
                Some(existing) if existing != exchange => {
                    return Err(MqError::TopologyConflict(format!(
                        "exchange '{}' already declared with different settings",
                        exchange.name
                    )));
                }
                Some(_) => {}
                None => self.exchanges.push(exchange.clone()),
            }
        }
        for queue in &other.queues {
            match self.find_queue(&queue.name) {
                Some(existing) if existing != queue => {
                    return Err(MqError::TopologyConflict(format!(
                        "queue '{}' already declared with different arguments",
                        queue.name
                    )));
                }
                Some(_) => {}
                None => self.queues.push(queue.clone()),
            }
        }
        for binding in &other.bindings {
            if !self.bindings.contains(binding) {
                self.bindings.push(binding.clone());
            }
        }
        self.validate()
    }

    /// Queues a message published to `exchange` with `routing_key` lands in.
    ///
    /// An empty result means the message is unroutable.
    pub fn route(&self, exchange: &str, routing_key: &str) -> Result<Vec<String>, MqError> {
        let spec = self
            .find_exchange(exchange)
            .ok_or_else(|| MqError::ExchangeNotFound(exchange.to_string()))?;

        match spec.kind {
            ExchangeKind::Direct => Ok(self
                .bindings
                .iter()
                .filter(|b| b.exchange == exchange && b.routing_key == routing_key)
                .map(|b| b.queue.clone())
                .collect()),
        }
    }
}

impl From<&MqAppConfig> for Topology {
    /// Main exchange/queue pair whose rejects flow to a dead-letter pair.
    fn from(config: &MqAppConfig) -> Self {
        Topology::new()
            .exchange(ExchangeSpec::direct(&config.exchange))
            .exchange(ExchangeSpec::direct(&config.dlx_exchange))
            .queue(
                QueueSpec::durable(&config.queue)
                    .with_dead_letter(&config.dlx_exchange, &config.dlx_routing_key),
            )
            .queue(QueueSpec::durable(&config.dlx_queue))
            .bind(&config.queue, &config.exchange, &config.routing_key)
            .bind(&config.dlx_queue, &config.dlx_exchange, &config.dlx_routing_key)
    }
}
