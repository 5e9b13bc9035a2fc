//! Dedup registry for the poll-based workflow path
//!
//! The webhook path deliberately does not consult this table; polling
//! re-fetches a time window on every run and must not reprocess messages.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "processed_emails")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub provider_message_id: String,
    pub agent_id: Option<Uuid>,
    pub processed_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
