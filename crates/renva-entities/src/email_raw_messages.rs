//! Untouched provider payloads, kept for audit/replay

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_raw_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider_message_id: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub raw_content: Json,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
