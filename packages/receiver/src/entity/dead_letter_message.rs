use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A message the primary consumer gave up on.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "dead_letter_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Original payload as JSON text.
    #[sea_orm(column_type = "Text")]
    pub message_content: String,

    #[sea_orm(column_type = "Text")]
    pub error_reason: String,

    /// When the record was written.
    pub timestamp: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
