pub mod config;
pub mod dead_letter;
pub mod message;
pub mod mq;

pub use config::{CorsConfig, MqAppConfig, ServerConfig};
pub use dead_letter::{DeadLetterRecord, PRIMARY_QUEUE_FAILURE_REASON};
pub use message::{Message, MessageRequest, ValidationError};
pub use mq::{DeathRecord, MessageEnvelope, MessageMetadata, WireMessage};
