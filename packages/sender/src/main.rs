use std::sync::Arc;

use anyhow::Context;
use mq::{BroccoliBroker, Broker, MqConfig, Topology};
use sender::{config::AppConfig, publisher::Publisher, state::AppState};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let broker: Arc<dyn Broker> = Arc::new(
        BroccoliBroker::connect(&MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to connect to broker")?,
    );
    broker
        .declare(&Topology::from(&config.mq))
        .await
        .context("Failed to declare broker topology")?;

    info!(
        exchange = %config.mq.exchange,
        routing_key = %config.mq.routing_key,
        "MQ connected"
    );

    let addr = config.server.address();
    let state = AppState {
        publisher: Publisher::new(broker, &config.mq),
        config,
    };
    let app = sender::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Sender listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .context("Server error")?;

    Ok(())
}
