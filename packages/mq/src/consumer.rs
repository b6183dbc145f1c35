use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use rand::Rng;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

use crate::{
    broker::{Broker, Delivery, DeliveryState},
    error::MqError,
};

/// How a handler wants its delivery settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Reject { requeue: bool },
}

impl From<Disposition> for DeliveryState {
    fn from(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Ack => DeliveryState::Acknowledged,
            Disposition::Reject { requeue } => DeliveryState::Rejected { requeue },
        }
    }
}

#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    async fn handle(&self, delivery: &Delivery) -> Disposition;

    /// Applied when `handle` panics.
    fn on_panic(&self) -> Disposition;
}

#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    pub queue: String,
    /// Upper bound on unsettled deliveries.
    pub prefetch: usize,
    pub reconnect_base: Duration,
    pub reconnect_max: Duration,
}

impl ConsumerOptions {
    pub fn new(queue: impl Into<String>, prefetch: usize) -> Self {
        Self {
            queue: queue.into(),
            prefetch,
            reconnect_base: Duration::from_millis(200),
            reconnect_max: Duration::from_secs(10),
        }
    }
}

/// Exponential backoff with up to 25% jitter, capped at `max`.
pub fn reconnect_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
    let jitter = if delay_ms > 0 {
        rand::rng().random_range(0..=delay_ms / 4)
    } else {
        0
    };

    Duration::from_millis(delay_ms.saturating_add(jitter)).min(max)
}

/// Run the handler on one delivery and settle it.
///
/// The handler runs on its own task so a panic is contained and turned into
/// `on_panic()`. A failed ack or nack is logged and returned; the delivery
/// then stays unsettled with the broker.
pub async fn process_delivery(
    broker: &dyn Broker,
    handler: Arc<dyn DeliveryHandler>,
    delivery: Delivery,
) -> Result<DeliveryState, MqError> {
    let tag = delivery.tag;

    let disposition = {
        let task_handler = handler.clone();
        let delivery = delivery.clone();
        let task = async move { task_handler.handle(&delivery).await };
        match tokio::spawn(task.in_current_span()).await {
            Ok(disposition) => disposition,
            Err(e) => {
                error!(tag, error = %e, "Delivery handler panicked");
                handler.on_panic()
            }
        }
    };

    let settled = match disposition {
        Disposition::Ack => broker.ack(tag).await,
        Disposition::Reject { requeue } => broker.nack(tag, requeue).await,
    };

    match settled {
        Ok(()) => {
            info!(tag, outcome = ?disposition, "Delivery settled");
            Ok(disposition.into())
        }
        Err(e) => {
            error!(
                tag,
                outcome = ?disposition,
                error = %e,
                "Transport failed to settle delivery; leaving it with the broker"
            );
            Err(e)
        }
    }
}

/// Consume `options.queue` until `shutdown` fires.
///
/// At most `options.prefetch` deliveries are processed at once, each on its
/// own task. On shutdown no new deliveries are taken and in-flight ones are
/// allowed to finish.
pub async fn run_consumer(
    broker: Arc<dyn Broker>,
    handler: Arc<dyn DeliveryHandler>,
    options: ConsumerOptions,
    shutdown: CancellationToken,
) {
    let permits = Arc::new(Semaphore::new(options.prefetch.max(1)));
    let mut tasks = JoinSet::new();
    let mut failures: u32 = 0;

    info!(queue = %options.queue, prefetch = options.prefetch, "Consumer started");

    loop {
        let permit = tokio::select! {
            _ = shutdown.cancelled() => break,
            permit = permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let received = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = broker.next_delivery(&options.queue) => received,
        };

        let delivery = match received {
            Ok(delivery) => {
                failures = 0;
                delivery
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                let delay =
                    reconnect_delay(failures, options.reconnect_base, options.reconnect_max);
                warn!(
                    queue = %options.queue,
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Failed to receive delivery, retrying"
                );
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => continue,
                }
            }
        };

        let span = info_span!(
            "delivery",
            queue = %delivery.queue,
            tag = delivery.tag,
            message_id = %delivery.envelope.message_id,
            correlation_id = ?delivery.envelope.correlation_id,
        );
        let broker = broker.clone();
        let handler = handler.clone();
        tasks.spawn(
            async move {
                let _permit = permit;
                let _ = process_delivery(broker.as_ref(), handler, delivery).await;
            }
            .instrument(span),
        );

        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                error!(queue = %options.queue, error = %e, "Delivery task failed");
            }
        }
    }

    info!(
        queue = %options.queue,
        in_flight = tasks.len(),
        "Consumer stopping, waiting for in-flight deliveries"
    );
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(queue = %options.queue, error = %e, "Delivery task failed");
        }
    }
    info!(queue = %options.queue, "Consumer stopped");
}
