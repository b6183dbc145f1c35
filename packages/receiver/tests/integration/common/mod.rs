use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use ::common::Message;
use ::common::config::{CorsConfig, MqAppConfig, ServerConfig};
use async_trait::async_trait;
use mq::{Broker, InMemoryBroker, Topology};
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use receiver::config::{AppConfig, DatabaseConfig};
use receiver::consumers::spawn_consumers;
use receiver::database::init_db;
use receiver::state::AppState;
use receiver::store::{
    DeadLetterRepository, MessageGateway, MessageRepository, SaveError, StorageError,
};
use sender::publisher::Publisher;

pub mod routes {
    pub const MESSAGES: &str = "/api/v1/messages";
    pub const DEAD_LETTERS: &str = "/api/v1/dead-letters";
}

/// Message repository whose database can be switched off.
pub struct SwitchableGateway {
    inner: MessageRepository,
    down: AtomicBool,
}

impl SwitchableGateway {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self, operation: &'static str) -> Result<(), StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError {
                operation,
                detail: "connection refused (os error 111) at 10.0.0.5:5432".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessageGateway for SwitchableGateway {
    async fn exists_by_id(&self, id: i64) -> Result<bool, StorageError> {
        self.check("exists_by_id")?;
        self.inner.exists_by_id(id).await
    }

    async fn save(&self, message: &Message) -> Result<(), SaveError> {
        self.check("save")?;
        self.inner.save(message).await
    }

    async fn find_all(&self) -> Result<Vec<Message>, StorageError> {
        self.check("find_all")?;
        self.inner.find_all().await
    }
}

/// Sender publisher, receiver consumers and receiver HTTP API sharing one
/// in-memory broker and one SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub broker: Arc<InMemoryBroker>,
    pub publisher: Publisher,
    pub gateway: Arc<SwitchableGateway>,
    pub dead_letters: Arc<DeadLetterRepository>,
    pub mq: MqAppConfig,
    shutdown: CancellationToken,
    consumers: Vec<JoinHandle<()>>,
}

pub struct TestResponse {
    pub status: u16,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let mq = MqAppConfig::default();
        let broker = Arc::new(InMemoryBroker::new());
        broker
            .declare(&Topology::from(&mq))
            .await
            .expect("Failed to declare topology");

        let database = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        };
        let db = init_db(&database)
            .await
            .expect("Failed to initialize test database");

        let gateway = Arc::new(SwitchableGateway {
            inner: MessageRepository::new(db.clone()),
            down: AtomicBool::new(false),
        });
        let dead_letters = Arc::new(DeadLetterRepository::new(db));

        let shutdown = CancellationToken::new();
        let consumers = spawn_consumers(
            broker.clone(),
            gateway.clone(),
            dead_letters.clone(),
            &mq,
            shutdown.clone(),
        );

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            database,
            mq: mq.clone(),
        };
        let state = AppState {
            messages: gateway.clone(),
            dead_letters: dead_letters.clone(),
            config,
        };
        let app = receiver::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            publisher: Publisher::new(broker.clone(), &mq),
            broker,
            gateway,
            dead_letters,
            mq,
            shutdown,
            consumers,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(format!("http://{}{}", self.addr, path))
            .send()
            .await
            .expect("Failed to send GET request");

        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        TestResponse { status, body }
    }

    /// Stop the consumers and wait for them to drain.
    pub async fn stop(self) {
        self.shutdown.cancel();
        for handle in self.consumers {
            handle.await.unwrap();
        }
    }
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
