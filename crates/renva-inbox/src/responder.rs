//! Best-effort AI reply generation and dispatch
//!
//! Everything here is non-fatal for the webhook: the inbound message is
//! already persisted, so any failure is logged and reported as an explicit
//! [`ReplyOutcome`] instead of propagating.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use renva_ai::{AiClient, AiError, DraftRequest, PropertySummary, WorkflowActions};
use renva_core::retry_operation;
use renva_email::OutboundMailService;
use renva_entities::email_messages::status;
use renva_entities::{email_messages, email_threads, properties, teams, users};

use crate::errors::InboxError;
use crate::extract::LeadInfo;
use crate::postmark::PostmarkInboundEmail;
use crate::text::{extract_email_address, sanitize_email_body};
use crate::usage::ThreadOwner;

/// Listings forwarded as grounding context are capped
const MAX_CONTEXT_PROPERTIES: u64 = 50;

const DEFAULT_AGENT_NAME: &str = "Renva Agent";

/// Explicit outcome of the reply step, recorded per inbound message
#[derive(Debug, Clone)]
pub enum ReplyOutcome {
    /// Draft persisted and dispatched
    Sent { message_id: Uuid },
    /// Something failed; if a draft was persisted it stays queued for resend
    Failed {
        message_id: Option<Uuid>,
        reason: String,
    },
    /// The completion service had nothing to say
    Skipped { reason: String },
}

/// Drafts, persists, and dispatches AI replies
pub struct AiResponder {
    db: Arc<DatabaseConnection>,
    ai: Arc<dyn AiClient>,
    mail: Arc<OutboundMailService>,
}

impl AiResponder {
    pub fn new(
        db: Arc<DatabaseConnection>,
        ai: Arc<dyn AiClient>,
        mail: Arc<OutboundMailService>,
    ) -> Self {
        Self { db, ai, mail }
    }

    /// Generate and send a reply for a freshly-persisted inbound message.
    /// Never fails the caller.
    pub async fn respond(
        &self,
        payload: &PostmarkInboundEmail,
        lead: &LeadInfo,
        thread: &email_threads::Model,
    ) -> ReplyOutcome {
        match self.try_respond(payload, lead, thread).await {
            Ok(outcome) => outcome,
            Err(InboxError::Ai(AiError::EmptyReply)) => ReplyOutcome::Skipped {
                reason: "completion service returned no reply".to_string(),
            },
            Err(err) => {
                error!("AI processing failed for thread {}: {}", thread.id, err);
                ReplyOutcome::Failed {
                    message_id: None,
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn try_respond(
        &self,
        payload: &PostmarkInboundEmail,
        lead: &LeadInfo,
        thread: &email_threads::Model,
    ) -> Result<ReplyOutcome, InboxError> {
        let owner = match (thread.user_id, thread.team_id) {
            (Some(user_id), _) => ThreadOwner::User(user_id),
            (_, Some(team_id)) => ThreadOwner::Team(team_id),
            _ => {
                return Ok(ReplyOutcome::Skipped {
                    reason: "thread has no owner".to_string(),
                })
            }
        };

        let (agent_name, agent_contact) = self.agent_identity(&owner).await;
        let agent_properties = self.owner_properties(&owner).await?;

        let request = DraftRequest {
            agent_id: owner
                .team_id()
                .or(owner.user_id())
                .map(|id| id.to_string())
                .unwrap_or_default(),
            workflow_id: "default".to_string(),
            email_content: payload.text_body().to_string(),
            email_subject: thread.subject.clone(),
            email_from: payload.from.clone(),
            email_date: payload.received_at().to_rfc3339(),
            agent_properties,
            workflow_actions: WorkflowActions {
                agent_name,
                agent_contact,
            },
        };

        let draft = self.ai.draft_reply(&request).await?;

        // Reply to the extracted lead address when present, else the sender
        let reply_to = lead.email.clone().unwrap_or_else(|| payload.from.clone());
        let subject = draft
            .reply
            .subject
            .clone()
            .unwrap_or_else(|| format!("Re: {}", thread.subject));

        let confidence = draft.validation.as_ref().and_then(|v| v.confidence);
        let validation_json = draft
            .validation
            .as_ref()
            .and_then(|v| serde_json::to_value(&v.extra).ok());

        let message_id = Uuid::new_v4();
        let message = email_messages::ActiveModel {
            id: Set(message_id),
            thread_id: Set(thread.id),
            provider_message_id: Set(None),
            from_address: Set(extract_email_address(&payload.to)),
            from_name: Set(None),
            to_address: Set(reply_to),
            subject: Set(subject),
            body: Set(sanitize_email_body(&draft.reply.body)),
            body_html: Set(None),
            status: Set(status::QUEUED.to_string()),
            is_read: Set(false),
            has_attachments: Set(false),
            is_contact_form: Set(false),
            received_at: Set(None),
            sent_at: Set(None),
            lead_email: Set(None),
            lead_name: Set(None),
            lead_phone: Set(None),
            ai_generated: Set(true),
            ai_confidence: Set(confidence),
            ai_validation: Set(validation_json),
            created_at: Set(Utc::now()),
        };

        let db = self.db.clone();
        retry_operation(
            || {
                let db = db.clone();
                let message = message.clone();
                async move { message.insert(db.as_ref()).await }
            },
            "store AI response message",
        )
        .await?;

        // Dispatch failure leaves the draft queued for manual resend
        match self.mail.dispatch(message_id).await {
            Ok(outcome) => {
                info!(
                    "AI reply {} dispatched for thread {} (provider id {})",
                    message_id, thread.id, outcome.provider_message_id
                );
                Ok(ReplyOutcome::Sent { message_id })
            }
            Err(err) => {
                warn!(
                    "AI reply {} persisted but dispatch failed: {}",
                    message_id, err
                );
                Ok(ReplyOutcome::Failed {
                    message_id: Some(message_id),
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Human-readable identity for signing drafts; best effort with defaults
    async fn agent_identity(&self, owner: &ThreadOwner) -> (String, String) {
        match owner {
            ThreadOwner::Team(team_id) => {
                match teams::Entity::find_by_id(*team_id)
                    .one(self.db.as_ref())
                    .await
                {
                    Ok(Some(team)) => {
                        let name = if team.name.trim().is_empty() {
                            DEFAULT_AGENT_NAME.to_string()
                        } else {
                            team.name
                        };
                        (name, team.contact_email.unwrap_or_default())
                    }
                    Ok(None) => (DEFAULT_AGENT_NAME.to_string(), String::new()),
                    Err(e) => {
                        warn!("Failed to fetch team details: {}", e);
                        (DEFAULT_AGENT_NAME.to_string(), String::new())
                    }
                }
            }
            ThreadOwner::User(user_id) => {
                match users::Entity::find_by_id(*user_id)
                    .one(self.db.as_ref())
                    .await
                {
                    Ok(Some(user)) => {
                        let contact: Vec<String> = [
                            user.phone.clone(),
                            Some(user.email.clone()),
                            user.company_name.clone(),
                        ]
                        .into_iter()
                        .flatten()
                        .collect();
                        (user.display_name(), contact.join(" | "))
                    }
                    Ok(None) => (DEFAULT_AGENT_NAME.to_string(), String::new()),
                    Err(e) => {
                        warn!("Failed to fetch agent details: {}", e);
                        (DEFAULT_AGENT_NAME.to_string(), String::new())
                    }
                }
            }
        }
    }

    /// Active listings scoped to the owner, minimal fields only
    async fn owner_properties(
        &self,
        owner: &ThreadOwner,
    ) -> Result<Vec<PropertySummary>, InboxError> {
        let query = properties::Entity::find();

        let query = match owner {
            ThreadOwner::Team(team_id) => {
                query.filter(properties::Column::ActiveTeamId.eq(*team_id))
            }
            ThreadOwner::User(user_id) => query.filter(properties::Column::AgentId.eq(*user_id)),
        };

        let rows = query
            .limit(MAX_CONTEXT_PROPERTIES)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|p| PropertySummary {
                id: p.id,
                web_reference: p.web_reference,
                address: p.address,
                status: p.status,
                application_link: p.application_link,
                agent_id: p.agent_id,
            })
            .collect())
    }
}
