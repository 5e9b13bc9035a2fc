//! Append-only execution records for the batch workflow path

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "workflow_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub workflow_id: Uuid,
    pub status: String,
    pub email_subject: Option<String>,
    pub email_from: Option<String>,
    pub action_taken: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::email_workflows::Entity",
        from = "Column::WorkflowId",
        to = "super::email_workflows::Column::Id"
    )]
    Workflow,
}

impl Related<super::email_workflows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workflow.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
