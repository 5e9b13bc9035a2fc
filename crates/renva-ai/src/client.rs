//! Completion-service client types and HTTP implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::errors::AiError;

/// Minimal listing fields forwarded as grounding context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub id: Uuid,
    pub web_reference: String,
    pub address: String,
    pub status: String,
    pub application_link: Option<String>,
    pub agent_id: Option<Uuid>,
}

/// Agent identity forwarded so drafts can be signed off
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowActions {
    pub agent_name: String,
    pub agent_contact: String,
}

/// Request payload for the `/process-email` endpoint
#[derive(Debug, Clone, Serialize)]
pub struct DraftRequest {
    pub agent_id: String,
    pub workflow_id: String,
    pub email_content: String,
    pub email_subject: String,
    pub email_from: String,
    pub email_date: String,
    pub agent_properties: Vec<PropertySummary>,
    pub workflow_actions: WorkflowActions,
}

/// The drafted reply
#[derive(Debug, Clone, Deserialize)]
pub struct DraftReply {
    pub subject: Option<String>,
    pub body: String,
}

/// Self-reported validation metadata
#[derive(Debug, Clone, Deserialize)]
pub struct DraftValidation {
    pub confidence: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Successful draft outcome handed back to callers
#[derive(Debug, Clone)]
pub struct AiDraft {
    pub reply: DraftReply,
    pub validation: Option<DraftValidation>,
}

#[derive(Debug, Deserialize)]
struct DraftEnvelope {
    success: bool,
    response: Option<DraftReply>,
    validation: Option<DraftValidation>,
}

/// Client trait for the external completion service
#[async_trait]
pub trait AiClient: Send + Sync {
    /// Draft a reply for an inbound email
    async fn draft_reply(&self, request: &DraftRequest) -> Result<AiDraft, AiError>;
}

/// HTTP implementation against the completion service's REST API
pub struct HttpAiClient {
    client: Client,
    base_url: String,
}

impl HttpAiClient {
    /// Create a new client.
    ///
    /// No request timeout is set here; the batch path wraps calls in its own
    /// deadline, the webhook path relies on the platform request timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AiClient for HttpAiClient {
    async fn draft_reply(&self, request: &DraftRequest) -> Result<AiDraft, AiError> {
        debug!(
            "Requesting draft for agent {} ({} properties)",
            request.agent_id,
            request.agent_properties.len()
        );

        let response = self
            .client
            .post(format!("{}/process-email", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Completion service error: {}", error_text);

            // Surface the service's own detail field when the body is JSON
            let detail = serde_json::from_str::<serde_json::Value>(&error_text)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from));

            return Err(AiError::Service(detail.unwrap_or(error_text)));
        }

        let envelope: DraftEnvelope = response.json().await?;

        if !envelope.success {
            return Err(AiError::Service(
                "completion service reported success=false".to_string(),
            ));
        }

        let reply = envelope.response.ok_or(AiError::EmptyReply)?;

        Ok(AiDraft {
            reply,
            validation: envelope.validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_expected_shape() {
        let request = DraftRequest {
            agent_id: "a1".to_string(),
            workflow_id: "default".to_string(),
            email_content: "Hi".to_string(),
            email_subject: "Inquiry".to_string(),
            email_from: "jane@x.com".to_string(),
            email_date: "2025-06-01T10:00:00Z".to_string(),
            agent_properties: vec![],
            workflow_actions: WorkflowActions {
                agent_name: "Sam Agent".to_string(),
                agent_contact: "sam@agency.example.com".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["workflow_id"], "default");
        assert_eq!(json["workflow_actions"]["agent_name"], "Sam Agent");
        assert!(json["agent_properties"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_envelope_parses_validation_extras() {
        let envelope: DraftEnvelope = serde_json::from_str(
            r#"{
                "success": true,
                "response": { "subject": "Re: Inquiry", "body": "Thanks!" },
                "validation": { "confidence": 0.92, "passed_checks": ["tone"] }
            }"#,
        )
        .unwrap();

        assert!(envelope.success);
        let validation = envelope.validation.unwrap();
        assert_eq!(validation.confidence, Some(0.92));
        assert_eq!(validation.extra["passed_checks"][0], "tone");
    }

    #[test]
    fn test_envelope_tolerates_missing_response() {
        let envelope: DraftEnvelope = serde_json::from_str(r#"{ "success": false }"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.response.is_none());
    }
}
