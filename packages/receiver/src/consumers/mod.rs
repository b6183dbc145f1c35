pub mod dead_letter;
pub mod primary;

pub use dead_letter::DeadLetterConsumer;
pub use primary::PrimaryConsumer;

use std::sync::Arc;

use common::MqAppConfig;
use mq::{Broker, ConsumerOptions, run_consumer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::store::{DeadLetterRecorder, MessageGateway};

/// Start the primary and dead-letter consumers. Both stop when `shutdown`
/// is cancelled.
pub fn spawn_consumers(
    broker: Arc<dyn Broker>,
    gateway: Arc<dyn MessageGateway>,
    recorder: Arc<dyn DeadLetterRecorder>,
    mq: &MqAppConfig,
    shutdown: CancellationToken,
) -> Vec<JoinHandle<()>> {
    let primary = tokio::spawn(run_consumer(
        broker.clone(),
        Arc::new(PrimaryConsumer::new(gateway)),
        ConsumerOptions::new(&mq.queue, mq.prefetch),
        shutdown.clone(),
    ));

    let dead_letter = tokio::spawn(run_consumer(
        broker,
        Arc::new(DeadLetterConsumer::new(recorder)),
        ConsumerOptions::new(&mq.dlx_queue, mq.prefetch),
        shutdown,
    ));

    vec![primary, dead_letter]
}
