use crate::{config::AppConfig, publisher::Publisher};

#[derive(Clone)]
pub struct AppState {
    pub publisher: Publisher,
    pub config: AppConfig,
}
