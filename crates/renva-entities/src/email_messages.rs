//! Email message entity, inbound and outbound
//!
//! Inbound rows arrive as `received`. AI-drafted replies are created as
//! `queued` with `ai_generated = true` and move through
//! `queued → sent | failed | retrying → sent | failed`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use renva_core::DBDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_messages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub thread_id: Uuid,
    /// Provider-side message id (Postmark MessageID for inbound, the send
    /// API's id once an outbound message is dispatched)
    pub provider_message_id: Option<String>,
    pub from_address: String,
    pub from_name: Option<String>,
    pub to_address: String,
    pub subject: String,
    #[sea_orm(column_type = "Text")]
    pub body: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub body_html: Option<String>,
    pub status: String,
    pub is_read: bool,
    pub has_attachments: bool,
    pub is_contact_form: bool,
    pub received_at: Option<DBDateTime>,
    pub sent_at: Option<DBDateTime>,
    pub lead_email: Option<String>,
    pub lead_name: Option<String>,
    pub lead_phone: Option<String>,
    pub ai_generated: bool,
    pub ai_confidence: Option<f64>,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub ai_validation: Option<Json>,
    pub created_at: DBDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::email_threads::Entity",
        from = "Column::ThreadId",
        to = "super::email_threads::Column::Id"
    )]
    Thread,
    #[sea_orm(has_many = "super::email_attachments::Entity")]
    Attachments,
}

impl Related<super::email_threads::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Thread.def()
    }
}

impl Related<super::email_attachments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Message lifecycle states persisted in `status`
pub mod status {
    pub const RECEIVED: &str = "received";
    pub const QUEUED: &str = "queued";
    pub const SENT: &str = "sent";
    pub const FAILED: &str = "failed";
    pub const RETRYING: &str = "retrying";
}
