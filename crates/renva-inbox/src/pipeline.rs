//! Pipeline orchestration: extract → resolve → respond
//!
//! Strictly sequential per inbound message. Resolution failures abort the
//! request; the reply step is best effort and only reported.

use std::sync::Arc;

use tracing::{info, warn};

use renva_entities::email_threads;

use crate::errors::InboxError;
use crate::extract::{extract_lead_info, LeadInfo};
use crate::postmark::PostmarkInboundEmail;
use crate::responder::{AiResponder, ReplyOutcome};
use crate::threads::ThreadResolver;

/// Everything the pipeline produced for one inbound message
#[derive(Debug)]
pub struct ProcessedEmail {
    pub thread: email_threads::Model,
    pub lead: LeadInfo,
    pub reply: ReplyOutcome,
}

/// The synchronous inbound pipeline
pub struct InboxPipeline {
    resolver: Arc<ThreadResolver>,
    responder: Arc<AiResponder>,
}

impl InboxPipeline {
    pub fn new(resolver: Arc<ThreadResolver>, responder: Arc<AiResponder>) -> Self {
        Self {
            resolver,
            responder,
        }
    }

    /// Process one inbound email end-to-end
    pub async fn process(
        &self,
        payload: PostmarkInboundEmail,
    ) -> Result<ProcessedEmail, InboxError> {
        payload.validate()?;

        let lead = extract_lead_info(payload.text_body());

        let thread = self.resolver.process(&payload, &lead).await?;

        let reply = self.responder.respond(&payload, &lead, &thread).await;
        match &reply {
            ReplyOutcome::Sent { message_id } => {
                info!("Inbound {} answered with draft {}", payload.message_id, message_id)
            }
            ReplyOutcome::Failed { reason, .. } => {
                warn!("Inbound {} reply failed: {}", payload.message_id, reason)
            }
            ReplyOutcome::Skipped { reason } => {
                info!("Inbound {} reply skipped: {}", payload.message_id, reason)
            }
        }

        Ok(ProcessedEmail {
            thread,
            lead,
            reply,
        })
    }
}
