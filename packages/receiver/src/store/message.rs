use async_trait::async_trait;
use common::Message;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set, SqlErr,
};
use tracing::{debug, info, instrument, warn};

use super::error::{SaveError, StorageError};
use crate::entity::message;

/// Insert-if-absent and full-scan access to stored messages.
#[async_trait]
pub trait MessageGateway: Send + Sync + 'static {
    async fn exists_by_id(&self, id: i64) -> Result<bool, StorageError>;

    /// Insert `message`. Never overwrites an existing row.
    async fn save(&self, message: &Message) -> Result<(), SaveError>;

    async fn find_all(&self) -> Result<Vec<Message>, StorageError>;
}

#[derive(Clone)]
pub struct MessageRepository {
    db: DatabaseConnection,
}

impl MessageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl TryFrom<message::Model> for Message {
    type Error = StorageError;

    fn try_from(row: message::Model) -> Result<Self, Self::Error> {
        Message::new(row.id, row.name, row.price)
            .map(|m| m.with_timestamp(row.timestamp))
            .map_err(|e| StorageError {
                operation: "find_all",
                detail: format!("row {} is not a valid message: {e}", row.id),
            })
    }
}

#[async_trait]
impl MessageGateway for MessageRepository {
    async fn exists_by_id(&self, id: i64) -> Result<bool, StorageError> {
        let count = message::Entity::find_by_id(id)
            .count(&self.db)
            .await
            .map_err(|e| StorageError::new("exists_by_id", e))?;
        Ok(count > 0)
    }

    /// The existence check gives a clean `Duplicate` in the common case; the
    /// primary key catches the concurrent case and maps to the same error.
    #[instrument(skip(self, message), fields(id = message.id()))]
    async fn save(&self, message: &Message) -> Result<(), SaveError> {
        if self.exists_by_id(message.id()).await? {
            warn!("Message already exists");
            return Err(SaveError::Duplicate(message.id()));
        }

        let row = message::ActiveModel {
            id: Set(message.id()),
            name: Set(message.name().to_string()),
            price: Set(message.price()),
            timestamp: Set(message.timestamp()),
        };

        match row.insert(&self.db).await {
            Ok(_) => {
                info!("Message saved");
                Ok(())
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                warn!("Message inserted concurrently");
                Err(SaveError::Duplicate(message.id()))
            }
            Err(e) => Err(StorageError::new("save", e).into()),
        }
    }

    async fn find_all(&self) -> Result<Vec<Message>, StorageError> {
        let rows = message::Entity::find()
            .order_by_asc(message::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| StorageError::new("find_all", e))?;

        debug!(count = rows.len(), "Loaded messages");
        rows.into_iter().map(Message::try_from).collect()
    }
}
