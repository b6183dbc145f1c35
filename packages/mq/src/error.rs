use common::mq::EnvelopeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MqError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("Exchange not found: {0}")]
    ExchangeNotFound(String),

    /// Declaring a resource that already exists with different settings.
    #[error("Topology conflict: {0}")]
    TopologyConflict(String),

    /// Acking or nacking a delivery failed; the delivery stays with the broker.
    #[error("Acknowledgment failed: {0}")]
    AckFailed(String),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("{0}")]
    Internal(String),
}

impl From<broccoli_queue::error::BroccoliError> for MqError {
    fn from(e: broccoli_queue::error::BroccoliError) -> Self {
        MqError::Connection(e.to_string())
    }
}
