use std::sync::Arc;

use anyhow::Context;
use mq::{BroccoliBroker, Broker, MqConfig, Topology};
use receiver::{
    config::AppConfig,
    consumers::spawn_consumers,
    database::init_db,
    state::AppState,
    store::{DeadLetterRepository, MessageRepository},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    info!("Database ready");

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
        queue = %config.mq.queue,
        dlx_queue = %config.mq.dlx_queue,
        prefetch = config.mq.prefetch,
        "MQ connected"
    );

    let messages = Arc::new(MessageRepository::new(db.clone()));
    let dead_letters = Arc::new(DeadLetterRepository::new(db));

    let shutdown = CancellationToken::new();
    let consumers = spawn_consumers(
        broker,
        messages.clone(),
        dead_letters.clone(),
        &config.mq,
        shutdown.clone(),
    );

    let addr = config.server.address();
    let state = AppState {
        messages,
        dead_letters,
        config,
    };
    let app = receiver::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Receiver listening on http://{}", addr);

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    shutdown.cancel();
    for handle in consumers {
        if let Err(e) = handle.await {
            error!(error = %e, "Consumer task failed");
        }
    }
    info!("Receiver stopped");

    Ok(())
}
