pub mod broccoli;
pub mod broker;
pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;

pub use broccoli::{BroccoliBroker, MqConfig};
pub use broker::{Broker, Confirm, Delivery, DeliveryState, DeliveryTag, PendingConfirm};
pub use config::{BindingSpec, DeadLetterTarget, ExchangeKind, ExchangeSpec, QueueSpec, Topology};
pub use consumer::{ConsumerOptions, DeliveryHandler, Disposition, process_delivery, run_consumer};
pub use error::MqError;
pub use memory::{DeliveryRecord, InMemoryBroker};
