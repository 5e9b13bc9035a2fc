//! Append-only record of outbound send attempts
//!
//! A log, not a queue: rows are never updated or retried in place.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_delivery_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub message_id: Uuid,
    pub event_type: String,
    pub recipient: String,
    /// Outcome of this attempt: success, failed or retrying
    pub status: String,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw_request: Option<Json>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw_response: Option<Json>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::email_messages::Entity",
        from = "Column::MessageId",
        to = "super::email_messages::Column::Id"
    )]
    Message,
}

impl Related<super::email_messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Message.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
