//! Inbound alias → owner binding
//!
//! Exactly one of `team_id` / `user_id` is set (check constraint in the
//! migration). Rows are provisioned out of band and never mutated by the
//! pipeline; `is_primary` marks the alias used as the From address for
//! outbound sends.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "email_addresses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email_address: String,
    pub team_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub is_primary: bool,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
