use serde::Deserialize;

/// App-level MQ configuration shared by the sender and the receiver.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Maximum unsettled deliveries per consumer. Default: 10.
    #[serde(default = "default_mq_prefetch")]
    pub prefetch: usize,
    /// Direct exchange the sender publishes to. Default: "messages.exchange".
    #[serde(default = "default_mq_exchange")]
    pub exchange: String,
    /// Queue bound to `exchange`, consumed by the primary consumer. Default: "messages.queue".
    #[serde(default = "default_mq_queue")]
    pub queue: String,
    /// Default: "messages.routing.key".
    #[serde(default = "default_mq_routing_key")]
    pub routing_key: String,
    /// Exchange rejected messages are dead-lettered to. Default: "messages.dlx.exchange".
    #[serde(default = "default_mq_dlx_exchange")]
    pub dlx_exchange: String,
    /// Queue consumed by the dead-letter consumer. Default: "messages.dlx.queue".
    #[serde(default = "default_mq_dlx_queue")]
    pub dlx_queue: String,
    /// Default: "messages.dlx.routing.key".
    #[serde(default = "default_mq_dlx_routing_key")]
    pub dlx_routing_key: String,
}

fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_prefetch() -> usize {
    10
}
fn default_mq_exchange() -> String {
    "messages.exchange".into()
}
fn default_mq_queue() -> String {
    "messages.queue".into()
}
fn default_mq_routing_key() -> String {
    "messages.routing.key".into()
}
fn default_mq_dlx_exchange() -> String {
    "messages.dlx.exchange".into()
}
fn default_mq_dlx_queue() -> String {
    "messages.dlx.queue".into()
}
fn default_mq_dlx_routing_key() -> String {
    "messages.dlx.routing.key".into()
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            prefetch: default_mq_prefetch(),
            exchange: default_mq_exchange(),
            queue: default_mq_queue(),
            routing_key: default_mq_routing_key(),
            dlx_exchange: default_mq_dlx_exchange(),
            dlx_queue: default_mq_dlx_queue(),
            dlx_routing_key: default_mq_dlx_routing_key(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    /// Allowed origins. Empty allows any origin.
    #[serde(default)]
    pub allow_origins: Vec<String>,
    /// Preflight cache lifetime in seconds. Default: 3600.
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origins: Vec::new(),
            max_age: default_cors_max_age(),
        }
    }
}

/// HTTP listener settings shared by both services.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
