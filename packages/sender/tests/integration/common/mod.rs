use std::net::SocketAddr;
use std::sync::Arc;

use ::common::config::{CorsConfig, MqAppConfig, ServerConfig};
use mq::{Broker, InMemoryBroker, Topology};
use reqwest::Client;
use serde_json::Value;

use sender::config::AppConfig;
use sender::publisher::Publisher;
use sender::state::AppState;

pub mod routes {
    pub const PUBLISH: &str = "/api/v1/publish";
}

/// A running sender backed by an in-memory broker.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub broker: Arc<InMemoryBroker>,
    pub mq: MqAppConfig,
}

/// Parsed HTTP response for test assertions.
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

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            mq: mq.clone(),
        };
        let state = AppState {
            publisher: Publisher::new(broker.clone(), &mq),
            config,
        };
        let app = sender::build_router(state);

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
            broker,
            mq,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_raw(&self, path: &str, body: &'static str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, body }
    }
}
