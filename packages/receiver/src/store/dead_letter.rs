use async_trait::async_trait;
use chrono::Utc;
use common::DeadLetterRecord;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::{info, instrument};

use super::error::{RecordError, StorageError};
use crate::entity::dead_letter_message;

#[async_trait]
pub trait DeadLetterRecorder: Send + Sync + 'static {
    /// Store `content` with `reason`, stamped with the current time.
    async fn record(&self, content: &str, reason: &str) -> Result<DeadLetterRecord, RecordError>;

    async fn find_all(&self) -> Result<Vec<DeadLetterRecord>, StorageError>;
}

#[derive(Clone)]
pub struct DeadLetterRepository {
    db: DatabaseConnection,
}

impl DeadLetterRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl From<dead_letter_message::Model> for DeadLetterRecord {
    fn from(row: dead_letter_message::Model) -> Self {
        Self {
            id: row.id,
            message_content: row.message_content,
            error_reason: row.error_reason,
            timestamp: row.timestamp,
        }
    }
}

#[async_trait]
impl DeadLetterRecorder for DeadLetterRepository {
    #[instrument(skip(self, content))]
    async fn record(&self, content: &str, reason: &str) -> Result<DeadLetterRecord, RecordError> {
        let row = dead_letter_message::ActiveModel {
            message_content: Set(content.to_string()),
            error_reason: Set(reason.to_string()),
            timestamp: Set(Utc::now()),
            ..Default::default()
        };

        let inserted = row
            .insert(&self.db)
            .await
            .map_err(|e| StorageError::new("record", e))?;

        info!(id = inserted.id, "Dead letter recorded");
        Ok(inserted.into())
    }

    async fn find_all(&self) -> Result<Vec<DeadLetterRecord>, StorageError> {
        let rows = dead_letter_message::Entity::find()
            .order_by_asc(dead_letter_message::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| StorageError::new("find_all", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
