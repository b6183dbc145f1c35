use sea_orm::DatabaseConnection;

use crate::config::DatabaseConfig;
use crate::database::init_db;

/// A fresh in-memory SQLite database with the schema applied.
pub async fn sqlite() -> DatabaseConnection {
    init_db(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .expect("Failed to initialize in-memory database")
}
