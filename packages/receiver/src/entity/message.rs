use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A successfully consumed message.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    /// Assigned by the producer. The primary key is the uniqueness guard.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    pub name: String,

    pub price: f64,

    pub timestamp: Option<DateTimeUtc>,
}

impl ActiveModelBehavior for ActiveModel {}
