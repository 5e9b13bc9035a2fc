//! Message dispatch with delivery logging
//!
//! Loads a queued message, resolves the sender address from the owning
//! thread, hands the mail to the configured provider, and records the
//! outcome in the append-only delivery log. `dispatch` performs a single
//! attempt; `resend` drives the bounded `retrying → sent | failed`
//! transitions for manual resends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use renva_entities::email_messages::status;
use renva_entities::{email_addresses, email_delivery_logs, email_messages, email_threads};

use crate::errors::MailError;
use crate::providers::{MailProvider, OutboundEmail};

/// Attempts made by `resend` before marking the message failed
const MAX_SEND_ATTEMPTS: u32 = 3;

/// Delay between resend attempts; doubles per attempt
const SEND_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Result of a successful dispatch
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub message_id: Uuid,
    pub provider_message_id: String,
}

/// Service for dispatching persisted messages through the mail provider
pub struct OutboundMailService {
    db: Arc<DatabaseConnection>,
    provider: Arc<dyn MailProvider>,
    system_from_address: String,
}

impl OutboundMailService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        provider: Arc<dyn MailProvider>,
        system_from_address: String,
    ) -> Self {
        Self {
            db,
            provider,
            system_from_address,
        }
    }

    /// Send a one-off email that has no message row behind it.
    ///
    /// Used for operational notifications (quota exhaustion); nothing is
    /// persisted, the caller only learns whether the provider accepted it.
    pub async fn send_notification(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        let email = OutboundEmail {
            from: self.system_from_address.clone(),
            to: to.to_string(),
            reply_to: None,
            subject: subject.to_string(),
            text_body: body.to_string(),
            html_body: None,
            tag: Some("notification".to_string()),
            metadata: None,
        };

        self.provider.send(&email).await?;
        info!("Sent notification email to {}", to);
        Ok(())
    }

    /// Dispatch a queued message: single attempt, delivery-logged.
    ///
    /// On success the message is marked `sent`; on failure the message row
    /// is left untouched (resendable) and the error is surfaced.
    pub async fn dispatch(&self, message_id: Uuid) -> Result<SendOutcome, MailError> {
        let (message, thread) = self.load_message(message_id).await?;
        let email = self.build_outbound(&message, &thread).await?;

        match self.provider.send(&email).await {
            Ok(response) => {
                self.mark_sent(message, &response.message_id).await?;
                self.log_delivery(message_id, &email, "success", json!({ "provider_message_id": &response.message_id }))
                    .await;
                info!(
                    "Dispatched message {} to {} (provider id {})",
                    message_id, email.to, response.message_id
                );
                Ok(SendOutcome {
                    message_id,
                    provider_message_id: response.message_id,
                })
            }
            Err(err) => {
                warn!("Dispatch of message {} failed: {}", message_id, err);
                self.log_delivery(message_id, &email, "failed", json!({ "error": err.to_string() }))
                    .await;
                Err(err)
            }
        }
    }

    /// Manual resend with bounded retry.
    ///
    /// Marks the message `retrying` between attempts and `failed` (terminal)
    /// when all attempts are exhausted.
    pub async fn resend(&self, message_id: Uuid) -> Result<SendOutcome, MailError> {
        let (message, thread) = self.load_message(message_id).await?;
        let email = self.build_outbound(&message, &thread).await?;

        let mut attempt = 1;
        loop {
            match self.provider.send(&email).await {
                Ok(response) => {
                    let (message, _) = self.load_message(message_id).await?;
                    self.mark_sent(message, &response.message_id).await?;
                    self.log_delivery(message_id, &email, "success", json!({ "provider_message_id": &response.message_id }))
                        .await;
                    return Ok(SendOutcome {
                        message_id,
                        provider_message_id: response.message_id,
                    });
                }
                Err(err) if attempt < MAX_SEND_ATTEMPTS => {
                    warn!(
                        "Resend attempt {}/{} for message {} failed: {}",
                        attempt, MAX_SEND_ATTEMPTS, message_id, err
                    );
                    self.mark_status(message_id, status::RETRYING).await;
                    self.log_delivery(message_id, &email, "retrying", json!({ "error": err.to_string(), "attempt": attempt }))
                        .await;
                    tokio::time::sleep(SEND_RETRY_DELAY * 2u32.pow(attempt - 1)).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(
                        "Resend of message {} failed after {} attempts: {}",
                        message_id, MAX_SEND_ATTEMPTS, err
                    );
                    self.mark_status(message_id, status::FAILED).await;
                    self.log_delivery(message_id, &email, "failed", json!({ "error": err.to_string(), "attempt": attempt }))
                        .await;
                    return Err(err);
                }
            }
        }
    }

    async fn load_message(
        &self,
        message_id: Uuid,
    ) -> Result<(email_messages::Model, email_threads::Model), MailError> {
        let message = email_messages::Entity::find_by_id(message_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(MailError::MessageNotFound(message_id))?;

        let thread = email_threads::Entity::find_by_id(message.thread_id)
            .one(self.db.as_ref())
            .await?
            .ok_or(MailError::ThreadNotFound(message_id))?;

        Ok((message, thread))
    }

    async fn build_outbound(
        &self,
        message: &email_messages::Model,
        thread: &email_threads::Model,
    ) -> Result<OutboundEmail, MailError> {
        let from = self.resolve_sender(thread).await?;

        let mut metadata = HashMap::new();
        metadata.insert("message_id".to_string(), message.id.to_string());
        metadata.insert("thread_id".to_string(), thread.id.to_string());

        Ok(OutboundEmail {
            from: from.clone(),
            to: message.to_address.clone(),
            reply_to: Some(from),
            subject: message.subject.clone(),
            text_body: message.body.clone(),
            html_body: message.body_html.clone(),
            tag: None,
            metadata: Some(metadata),
        })
    }

    /// The From address is the owner's primary inbound alias; when none is
    /// provisioned, fall back to the configured system address.
    async fn resolve_sender(&self, thread: &email_threads::Model) -> Result<String, MailError> {
        let query = email_addresses::Entity::find()
            .filter(email_addresses::Column::IsPrimary.eq(true));

        let query = if let Some(team_id) = thread.team_id {
            query.filter(email_addresses::Column::TeamId.eq(team_id))
        } else if let Some(user_id) = thread.user_id {
            query.filter(email_addresses::Column::UserId.eq(user_id))
        } else {
            return Err(MailError::Validation(
                "thread has neither team_id nor user_id".to_string(),
            ));
        };

        match query.one(self.db.as_ref()).await? {
            Some(address) => Ok(address.email_address),
            None => {
                debug!(
                    "No primary alias for thread {}, using system address",
                    thread.id
                );
                Ok(self.system_from_address.clone())
            }
        }
    }

    async fn mark_sent(
        &self,
        message: email_messages::Model,
        provider_message_id: &str,
    ) -> Result<(), MailError> {
        let mut active: email_messages::ActiveModel = message.into();
        active.provider_message_id = Set(Some(provider_message_id.to_string()));
        active.status = Set(status::SENT.to_string());
        active.sent_at = Set(Some(Utc::now()));
        active.update(self.db.as_ref()).await?;
        Ok(())
    }

    async fn mark_status(&self, message_id: Uuid, new_status: &str) {
        let update = email_messages::Entity::update_many()
            .col_expr(
                email_messages::Column::Status,
                sea_orm::sea_query::Expr::value(new_status),
            )
            .filter(email_messages::Column::Id.eq(message_id))
            .exec(self.db.as_ref())
            .await;

        if let Err(e) = update {
            error!("Failed to mark message {} as {}: {}", message_id, new_status, e);
        }
    }

    /// Append a delivery-log row. Log failures are logged and swallowed so
    /// a bookkeeping error never masks the send outcome.
    async fn log_delivery(
        &self,
        message_id: Uuid,
        email: &OutboundEmail,
        log_status: &str,
        raw_response: serde_json::Value,
    ) {
        let raw_request = serde_json::to_value(email).ok();

        let log = email_delivery_logs::ActiveModel {
            message_id: Set(message_id),
            event_type: Set("send".to_string()),
            recipient: Set(email.to.clone()),
            status: Set(log_status.to_string()),
            raw_request: Set(raw_request),
            raw_response: Set(Some(raw_response)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Err(e) = log.insert(self.db.as_ref()).await {
            error!("Failed to write delivery log for {}: {}", message_id, e);
        }
    }
}
