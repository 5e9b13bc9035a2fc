//! Batch-path automation rules

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_workflows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub agent_id: Uuid,
    pub name: String,
    pub active: bool,
    /// Case-insensitive substrings matched against the subject
    #[sea_orm(column_type = "JsonBinary")]
    pub subject_filters: Json,
    /// Case-insensitive substrings matched against the body
    #[sea_orm(column_type = "JsonBinary")]
    pub body_filters: Json,
    pub send_application_link: bool,
    pub custom_message: Option<String>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::workflow_logs::Entity")]
    Logs,
}

impl Related<super::workflow_logs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Logs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
