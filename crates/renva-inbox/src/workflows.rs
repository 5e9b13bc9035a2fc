//! Poll-based workflow processing
//!
//! The retry-prone counterpart of the webhook path: re-fetches a time
//! window of mailbox messages on every run, so it deduplicates on the
//! provider message id via `processed_emails`. Matching messages get a
//! drafted reply (AI under a hard deadline, template fallback) sent
//! directly through the mail provider, and every execution is recorded in
//! `workflow_logs`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use renva_ai::{AiClient, DraftRequest, PropertySummary, WorkflowActions};
use renva_email::{MailProvider, OutboundEmail};
use renva_entities::{
    email_addresses, email_workflows, processed_emails, properties, users, workflow_logs,
};

use crate::connector::{FetchedMessage, MailboxConnector};
use crate::errors::InboxError;

/// Hard deadline for the completion call on this path
const AI_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// How far back each run looks
const FETCH_WINDOW_HOURS: i64 = 24;

/// Counts reported back to the caller
#[derive(Debug, Clone, Copy, Default, serde::Serialize, utoipa::ToSchema)]
pub struct BatchSummary {
    pub processed: usize,
    pub errors: usize,
}

impl BatchSummary {
    fn absorb(&mut self, other: BatchSummary) {
        self.processed += other.processed;
        self.errors += other.errors;
    }
}

/// Processes agents' mailboxes against their configured workflows
pub struct WorkflowProcessor {
    db: Arc<DatabaseConnection>,
    ai: Arc<dyn AiClient>,
    provider: Arc<dyn MailProvider>,
    connector: Arc<dyn MailboxConnector>,
}

impl WorkflowProcessor {
    pub fn new(
        db: Arc<DatabaseConnection>,
        ai: Arc<dyn AiClient>,
        provider: Arc<dyn MailProvider>,
        connector: Arc<dyn MailboxConnector>,
    ) -> Self {
        Self {
            db,
            ai,
            provider,
            connector,
        }
    }

    /// Process every agent that has at least one active workflow
    pub async fn process_all_agents(&self) -> Result<BatchSummary, InboxError> {
        let workflows = email_workflows::Entity::find()
            .filter(email_workflows::Column::Active.eq(true))
            .all(self.db.as_ref())
            .await?;

        let agent_ids: BTreeSet<Uuid> = workflows.iter().map(|w| w.agent_id).collect();
        info!("Found {} agents with active workflows", agent_ids.len());

        let mut summary = BatchSummary::default();
        for agent_id in agent_ids {
            match self.process_agent_inbox(agent_id).await {
                Ok(agent_summary) => summary.absorb(agent_summary),
                Err(e) => {
                    error!("Error processing agent {}: {}", agent_id, e);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Process one agent's mailbox against their active workflows
    pub async fn process_agent_inbox(&self, agent_id: Uuid) -> Result<BatchSummary, InboxError> {
        debug!("Processing inbox for agent {}", agent_id);

        let agent = match users::Entity::find_by_id(agent_id)
            .one(self.db.as_ref())
            .await?
        {
            Some(agent) => agent,
            None => {
                error!("Agent {} not found", agent_id);
                return Ok(BatchSummary {
                    processed: 0,
                    errors: 1,
                });
            }
        };

        // Workflows and listings are independent lookups
        let (workflows, agent_properties) = tokio::try_join!(
            email_workflows::Entity::find()
                .filter(email_workflows::Column::AgentId.eq(agent_id))
                .filter(email_workflows::Column::Active.eq(true))
                .all(self.db.as_ref()),
            properties::Entity::find()
                .filter(properties::Column::AgentId.eq(agent_id))
                .all(self.db.as_ref()),
        )?;

        if workflows.is_empty() {
            debug!("No active workflows found for agent {}", agent_id);
            return Ok(BatchSummary::default());
        }

        let since = Utc::now() - chrono::Duration::hours(FETCH_WINDOW_HOURS);
        let messages = self.connector.list_new_messages(agent_id, since).await?;
        info!(
            "Found {} new messages for agent {}",
            messages.len(),
            agent_id
        );

        // Fetched messages are independent of each other
        let results = join_all(messages.iter().map(|message| {
            self.process_message(&agent, &workflows, &agent_properties, message)
        }))
        .await;

        let mut summary = BatchSummary::default();
        for result in results {
            match result {
                Ok(true) => summary.processed += 1,
                Ok(false) => {}
                Err(reason) => {
                    warn!("Message processing failed: {}", reason);
                    summary.errors += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Handle one fetched message. Ok(true) = reply sent, Ok(false) = no
    /// matching workflow or already processed.
    async fn process_message(
        &self,
        agent: &users::Model,
        workflows: &[email_workflows::Model],
        agent_properties: &[properties::Model],
        message: &FetchedMessage,
    ) -> Result<bool, String> {
        if self
            .already_processed(&message.id)
            .await
            .map_err(|e| e.to_string())?
        {
            debug!("Skipping already-processed message {}", message.id);
            return Ok(false);
        }

        let Some(workflow) = workflows.iter().find(|w| workflow_matches(w, message)) else {
            return Ok(false);
        };

        debug!("Message {} matches workflow {}", message.id, workflow.id);

        let agent_name = agent.display_name();
        let body = self
            .draft_reply_body(agent, workflow, agent_properties, message, &agent_name)
            .await;

        let from = self
            .agent_sender_address(agent)
            .await
            .map_err(|e| e.to_string())?;

        let email = OutboundEmail {
            from,
            to: message.from.clone(),
            reply_to: None,
            subject: format!("Re: {}", message.subject),
            text_body: body,
            html_body: None,
            tag: Some("workflow".to_string()),
            metadata: None,
        };

        match self.provider.send(&email).await {
            Ok(_) => {
                self.record_log(
                    workflow.id,
                    message,
                    "success",
                    Some("Sent automated reply"),
                    None,
                )
                .await;
                self.mark_processed(&message.id, agent.id).await;
                info!("Sent workflow reply to {}", message.from);
                Ok(true)
            }
            Err(e) => {
                self.record_log(workflow.id, message, "error", None, Some(&e.to_string()))
                    .await;
                Err(format!("failed to send reply to {}: {}", message.from, e))
            }
        }
    }

    /// Draft via the completion service under a deadline; fall back to the
    /// workflow's template when the service is slow or unavailable.
    async fn draft_reply_body(
        &self,
        agent: &users::Model,
        workflow: &email_workflows::Model,
        agent_properties: &[properties::Model],
        message: &FetchedMessage,
        agent_name: &str,
    ) -> String {
        let request = DraftRequest {
            agent_id: agent.id.to_string(),
            workflow_id: workflow.id.to_string(),
            email_content: message.body.clone(),
            email_subject: message.subject.clone(),
            email_from: message.from.clone(),
            email_date: message.timestamp.to_rfc3339(),
            agent_properties: agent_properties
                .iter()
                .map(|p| PropertySummary {
                    id: p.id,
                    web_reference: p.web_reference.clone(),
                    address: p.address.clone(),
                    status: p.status.clone(),
                    application_link: p.application_link.clone(),
                    agent_id: p.agent_id,
                })
                .collect(),
            workflow_actions: WorkflowActions {
                agent_name: agent_name.to_string(),
                agent_contact: agent.email.clone(),
            },
        };

        match tokio::time::timeout(AI_CALL_TIMEOUT, self.ai.draft_reply(&request)).await {
            Ok(Ok(draft)) => draft.reply.body,
            Ok(Err(e)) => {
                warn!("Completion service failed, using template reply: {}", e);
                template_reply(workflow, agent_properties, agent_name)
            }
            Err(_) => {
                warn!("Completion service timed out, using template reply");
                template_reply(workflow, agent_properties, agent_name)
            }
        }
    }

    /// The agent's primary alias, falling back to their account address
    async fn agent_sender_address(&self, agent: &users::Model) -> Result<String, InboxError> {
        let alias = email_addresses::Entity::find()
            .filter(email_addresses::Column::UserId.eq(agent.id))
            .filter(email_addresses::Column::IsPrimary.eq(true))
            .one(self.db.as_ref())
            .await?;

        Ok(alias
            .map(|a| a.email_address)
            .unwrap_or_else(|| agent.email.clone()))
    }

    async fn already_processed(&self, provider_message_id: &str) -> Result<bool, InboxError> {
        let existing = processed_emails::Entity::find()
            .filter(processed_emails::Column::ProviderMessageId.eq(provider_message_id))
            .one(self.db.as_ref())
            .await?;
        Ok(existing.is_some())
    }

    /// Register the message id so later runs skip it; best effort
    async fn mark_processed(&self, provider_message_id: &str, agent_id: Uuid) {
        let row = processed_emails::ActiveModel {
            provider_message_id: Set(provider_message_id.to_string()),
            agent_id: Set(Some(agent_id)),
            processed_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Err(e) = row.insert(self.db.as_ref()).await {
            error!(
                "Failed to mark message {} as processed: {}",
                provider_message_id, e
            );
        }
    }

    /// Append a workflow execution record; best effort
    async fn record_log(
        &self,
        workflow_id: Uuid,
        message: &FetchedMessage,
        log_status: &str,
        action_taken: Option<&str>,
        error_message: Option<&str>,
    ) {
        let log = workflow_logs::ActiveModel {
            workflow_id: Set(workflow_id),
            status: Set(log_status.to_string()),
            email_subject: Set(Some(message.subject.clone())),
            email_from: Set(Some(message.from.clone())),
            action_taken: Set(action_taken.map(String::from)),
            error_message: Set(error_message.map(String::from)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Err(e) = log.insert(self.db.as_ref()).await {
            error!("Error logging workflow execution: {}", e);
        }
    }
}

/// Substring filter match over subject and body, case-insensitive.
/// A workflow with no filters matches nothing.
pub fn workflow_matches(workflow: &email_workflows::Model, message: &FetchedMessage) -> bool {
    let subject = message.subject.to_lowercase();
    let body = message.body.to_lowercase();

    let subject_filters = filter_list(&workflow.subject_filters);
    let body_filters = filter_list(&workflow.body_filters);

    let subject_match = subject_filters.iter().any(|f| subject.contains(f));
    let body_match = body_filters.iter().any(|f| body.contains(f));

    subject_match || body_match
}

fn filter_list(value: &serde_json::Value) -> Vec<String> {
    serde_json::from_value::<Vec<String>>(value.clone())
        .unwrap_or_default()
        .into_iter()
        .map(|f| f.to_lowercase())
        .collect()
}

/// Template fallback reply built from the workflow's configured actions
fn template_reply(
    workflow: &email_workflows::Model,
    agent_properties: &[properties::Model],
    agent_name: &str,
) -> String {
    if let Some(custom) = workflow
        .custom_message
        .as_ref()
        .filter(|m| !m.trim().is_empty())
    {
        return format!("{}\n\nBest regards,\n{}", custom.trim(), agent_name);
    }

    let listing_lines: Vec<String> = agent_properties
        .iter()
        .take(3)
        .map(|p| {
            format!(
                "- {} ({} bed, {} bath, R{})",
                p.address,
                p.bedrooms.unwrap_or_default(),
                p.bathrooms.unwrap_or_default(),
                p.monthly_rent.unwrap_or_default()
            )
        })
        .collect();

    let mut reply = String::from(
        "Thank you for your interest in our properties.\n\n\
         Based on your inquiry, the following properties might suit you:\n\n",
    );
    reply.push_str(&listing_lines.join("\n"));

    if workflow.send_application_link {
        if let Some(link) = agent_properties
            .first()
            .and_then(|p| p.application_link.as_deref())
        {
            reply.push_str(&format!(
                "\n\nTo apply for any of these properties, please use this link:\n{}",
                link
            ));
        }
    }

    reply.push_str("\n\nPlease let me know if you have any questions or would like to schedule a viewing.");
    reply.push_str(&format!("\n\nBest regards,\n{}", agent_name));
    reply
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn workflow(subject_filters: serde_json::Value, body_filters: serde_json::Value) -> email_workflows::Model {
        email_workflows::Model {
            id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            name: "inquiries".to_string(),
            active: true,
            subject_filters,
            body_filters,
            send_application_link: true,
            custom_message: None,
            created_at: Utc::now(),
        }
    }

    fn message(subject: &str, body: &str) -> FetchedMessage {
        FetchedMessage {
            id: "m1".to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            from: "jane@x.com".to_string(),
            from_name: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_workflow_matches_subject_filter_case_insensitive() {
        let workflow = workflow(json!(["inquiry"]), json!([]));
        assert!(workflow_matches(
            &workflow,
            &message("Property INQUIRY for Apartment", "")
        ));
        assert!(!workflow_matches(&workflow, &message("Invoice", "")));
    }

    #[test]
    fn test_workflow_matches_body_filter() {
        let workflow = workflow(json!([]), json!(["available"]));
        assert!(workflow_matches(
            &workflow,
            &message("Hello", "is the house still AVAILABLE?")
        ));
    }

    #[test]
    fn test_workflow_without_filters_matches_nothing() {
        let workflow = workflow(json!([]), json!([]));
        assert!(!workflow_matches(&workflow, &message("anything", "at all")));
    }

    #[test]
    fn test_template_reply_uses_custom_message() {
        let mut wf = workflow(json!(["inquiry"]), json!([]));
        wf.custom_message = Some("We received your inquiry.".to_string());

        let reply = template_reply(&wf, &[], "Sam Agent");
        assert!(reply.starts_with("We received your inquiry."));
        assert!(reply.ends_with("Best regards,\nSam Agent"));
    }

    #[test]
    fn test_template_reply_lists_properties_and_link() {
        let wf = workflow(json!(["inquiry"]), json!([]));
        let listing = properties::Model {
            id: Uuid::new_v4(),
            agent_id: Some(wf.agent_id),
            active_team_id: None,
            web_reference: "WR-1".to_string(),
            address: "12 Oak Ave".to_string(),
            suburb: None,
            property_type: None,
            bedrooms: Some(2),
            bathrooms: Some(1),
            monthly_rent: Some(9500),
            status: "active".to_string(),
            application_link: Some("https://apply.example.com/wr-1".to_string()),
            created_at: Utc::now(),
        };

        let reply = template_reply(&wf, &[listing], "Sam Agent");
        assert!(reply.contains("12 Oak Ave (2 bed, 1 bath, R9500)"));
        assert!(reply.contains("https://apply.example.com/wr-1"));
    }
}
