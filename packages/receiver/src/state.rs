use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{DeadLetterRecorder, MessageGateway};

#[derive(Clone)]
pub struct AppState {
    pub messages: Arc<dyn MessageGateway>,
    pub dead_letters: Arc<dyn DeadLetterRecorder>,
    pub config: AppConfig,
}
