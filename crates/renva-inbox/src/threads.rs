//! Thread resolution and message persistence
//!
//! Maps the cleaned recipient address to an owner, enforces the quota, and
//! persists thread, message, attachments and raw payload. The four inserts
//! are separate retry-wrapped calls with no shared transaction; when a
//! later step fails after the thread row exists, the thread is marked
//! `partial` before the error propagates so the gap is visible.
//!
//! This path performs no dedup on the provider message id: redelivery of
//! the same payload creates a second thread. The poll-based workflow path
//! behaves differently (see `workflows`).

use std::sync::Arc;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use renva_core::retry_operation;
use renva_entities::email_messages::status;
use renva_entities::{
    email_addresses, email_attachments, email_messages, email_raw_messages, email_threads,
};

use crate::errors::InboxError;
use crate::extract::LeadInfo;
use crate::postmark::PostmarkInboundEmail;
use crate::text::{extract_email_address, sanitize_email_body};
use crate::usage::{ThreadOwner, UsageService};

const DEFAULT_SUBJECT: &str = "(No Subject)";

/// Resolves ownership and persists one inbound message end-to-end
pub struct ThreadResolver {
    db: Arc<DatabaseConnection>,
    usage: Arc<UsageService>,
}

impl ThreadResolver {
    pub fn new(db: Arc<DatabaseConnection>, usage: Arc<UsageService>) -> Self {
        Self { db, usage }
    }

    /// Resolve the recipient, enforce the quota, and persist the message.
    ///
    /// Returns the created thread. An unmapped recipient is a configuration
    /// error and aborts without creating any rows.
    pub async fn process(
        &self,
        payload: &PostmarkInboundEmail,
        lead: &LeadInfo,
    ) -> Result<email_threads::Model, InboxError> {
        let clean_to = extract_email_address(&payload.to);
        let owner = self.resolve_owner(&clean_to).await?;

        let quota = self.usage.check(&owner).await?;
        if quota.limit_reached {
            warn!("Conversation limit reached for {}", owner);
            // Notify first, then abort; the message is not silently dropped
            self.usage.notify_limit_reached(&owner).await?;
            return Err(InboxError::QuotaExceeded(owner.to_string()));
        }

        let thread = self.create_thread(payload, lead, &owner).await?;

        if let Err(err) = self.store_message(&thread, payload, lead).await {
            self.mark_thread_partial(thread.id).await;
            return Err(err);
        }

        if let Err(err) = self.usage.record_conversation(&owner).await {
            // The conversation exists; usage accounting must not undo that
            warn!("Failed to record conversation for {}: {}", owner, err);
        }

        info!(
            "Stored inbound message {} on new thread {} for {}",
            payload.message_id, thread.id, owner
        );
        Ok(thread)
    }

    /// Look up the alias owner. The lookup itself is retried as a transient
    /// operation; a missing row is fatal and not retried.
    async fn resolve_owner(&self, clean_to: &str) -> Result<ThreadOwner, InboxError> {
        let db = self.db.clone();
        let address = retry_operation(
            || {
                let db = db.clone();
                let clean_to = clean_to.to_string();
                async move {
                    email_addresses::Entity::find()
                        .filter(email_addresses::Column::EmailAddress.eq(clean_to))
                        .one(db.as_ref())
                        .await
                }
            },
            "find email address",
        )
        .await?;

        let address = address.ok_or_else(|| InboxError::AddressNotMapped(clean_to.to_string()))?;

        match (address.user_id, address.team_id) {
            (Some(user_id), None) => Ok(ThreadOwner::User(user_id)),
            (None, Some(team_id)) => Ok(ThreadOwner::Team(team_id)),
            _ => Err(InboxError::AddressUnowned(address.email_address)),
        }
    }

    /// Always creates a new thread per inbound message; there is no search
    /// for an existing thread with the same subject/participants.
    async fn create_thread(
        &self,
        payload: &PostmarkInboundEmail,
        lead: &LeadInfo,
        owner: &ThreadOwner,
    ) -> Result<email_threads::Model, InboxError> {
        let subject = if payload.subject.trim().is_empty() {
            DEFAULT_SUBJECT.to_string()
        } else {
            payload.subject.clone()
        };

        let db = self.db.clone();
        let thread_id = Uuid::new_v4();
        let received_at = payload.received_at();
        let lead = lead.clone();
        let owner = *owner;

        let thread = retry_operation(
            || {
                let db = db.clone();
                let subject = subject.clone();
                let lead = lead.clone();
                async move {
                    email_threads::ActiveModel {
                        id: Set(thread_id),
                        subject: Set(subject),
                        last_message_at: Set(received_at),
                        status: Set(status::RECEIVED.to_string()),
                        priority: Set("normal".to_string()),
                        needs_follow_up: Set(false),
                        lead_email: Set(lead.email),
                        lead_name: Set(lead.name),
                        lead_phone: Set(lead.phone),
                        team_id: Set(owner.team_id()),
                        user_id: Set(owner.user_id()),
                        ..Default::default()
                    }
                    .insert(db.as_ref())
                    .await
                }
            },
            "create email thread",
        )
        .await?;

        Ok(thread)
    }

    /// Persist the message row, attachment metadata, and the raw payload.
    /// Three further inserts, each individually retried.
    async fn store_message(
        &self,
        thread: &email_threads::Model,
        payload: &PostmarkInboundEmail,
        lead: &LeadInfo,
    ) -> Result<(), InboxError> {
        let db = self.db.clone();
        let message_id = Uuid::new_v4();
        let received_at = payload.received_at();

        let message = email_messages::ActiveModel {
            id: Set(message_id),
            thread_id: Set(thread.id),
            provider_message_id: Set(Some(payload.message_id.clone())),
            from_address: Set(payload.from.clone()),
            from_name: Set(payload.from_name.clone()),
            to_address: Set(payload.to.clone()),
            subject: Set(thread.subject.clone()),
            body: Set(sanitize_email_body(payload.text_body())),
            body_html: Set(payload.html_body.clone()),
            status: Set(status::RECEIVED.to_string()),
            is_read: Set(false),
            has_attachments: Set(!payload.attachments.is_empty()),
            is_contact_form: Set(lead.email.is_some()),
            received_at: Set(Some(received_at)),
            sent_at: Set(None),
            lead_email: Set(lead.email.clone()),
            lead_name: Set(lead.name.clone()),
            lead_phone: Set(lead.phone.clone()),
            ai_generated: Set(false),
            ai_confidence: Set(None),
            ai_validation: Set(None),
            created_at: Set(Utc::now()),
        };

        retry_operation(
            || {
                let db = db.clone();
                let message = message.clone();
                async move { message.insert(db.as_ref()).await }
            },
            "store email message",
        )
        .await?;

        for attachment in &payload.attachments {
            let row = email_attachments::ActiveModel {
                message_id: Set(message_id),
                file_name: Set(attachment.name.clone()),
                file_type: Set(attachment.content_type.clone()),
                file_size: Set(attachment.content_length),
                storage_path: Set(format!(
                    "attachments/{}/{}",
                    payload.message_id, attachment.name
                )),
                created_at: Set(Utc::now()),
                ..Default::default()
            };

            retry_operation(
                || {
                    let db = db.clone();
                    let row = row.clone();
                    async move { row.insert(db.as_ref()).await }
                },
                "store email attachment",
            )
            .await?;
        }

        let raw_content = serde_json::to_value(payload)
            .map_err(|e| InboxError::InvalidPayload(e.to_string()))?;
        let raw = email_raw_messages::ActiveModel {
            provider_message_id: Set(payload.message_id.clone()),
            raw_content: Set(raw_content),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        retry_operation(
            || {
                let db = db.clone();
                let raw = raw.clone();
                async move { raw.insert(db.as_ref()).await }
            },
            "store raw message",
        )
        .await?;

        Ok(())
    }

    /// Best-effort compensation marker; persistence already failed, so a
    /// failure here is only logged.
    async fn mark_thread_partial(&self, thread_id: Uuid) {
        let update = email_threads::Entity::update_many()
            .col_expr(email_threads::Column::Status, Expr::value("partial"))
            .filter(email_threads::Column::Id.eq(thread_id))
            .exec(self.db.as_ref())
            .await;

        if let Err(e) = update {
            error!("Failed to mark thread {} as partial: {}", thread_id, e);
        }
    }
}
