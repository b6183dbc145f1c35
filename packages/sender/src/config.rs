use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{CorsConfig, MqAppConfig, ServerConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("COURIER_CONFIG").unwrap_or_else(|_| "config/sender".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("mq.url", "redis://localhost:6379")?
            .set_default("mq.pool_size", 5_i64)?
            .add_source(File::with_name(&config_path).required(false))
            // e.g. COURIER__MQ__URL, COURIER__SERVER__PORT
            .add_source(Environment::with_prefix("COURIER").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
