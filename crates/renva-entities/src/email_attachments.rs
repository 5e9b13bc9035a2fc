//! Attachment metadata entity
//!
//! Metadata only; the raw bytes live in the mail provider's object store at
//! `storage_path`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub message_id: Uuid,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub storage_path: String,
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
