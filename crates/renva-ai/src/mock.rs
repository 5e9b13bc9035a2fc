//! Mock completion-service client for tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::{AiClient, AiDraft, DraftReply, DraftRequest, DraftValidation};
use crate::errors::AiError;

/// Mock client returning a canned draft
#[derive(Clone, Default)]
pub struct MockAiClient {
    pub call_count: Arc<AtomicUsize>,
    /// Every request handed to `draft_reply`, in order
    pub requests: Arc<Mutex<Vec<DraftRequest>>>,
    pub should_fail: bool,
    pub reply_subject: Option<String>,
    pub reply_body: String,
    pub confidence: Option<f64>,
}

impl MockAiClient {
    pub fn new() -> Self {
        Self {
            reply_body: "Thank you for your inquiry.".to_string(),
            ..Default::default()
        }
    }

    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn with_reply(mut self, subject: Option<&str>, body: &str) -> Self {
        self.reply_subject = subject.map(String::from);
        self.reply_body = body.to_string();
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn captured_requests(&self) -> Vec<DraftRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AiClient for MockAiClient {
    async fn draft_reply(&self, request: &DraftRequest) -> Result<AiDraft, AiError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail {
            return Err(AiError::Service("Mock completion failure".to_string()));
        }

        self.requests.lock().unwrap().push(request.clone());

        Ok(AiDraft {
            reply: DraftReply {
                subject: self.reply_subject.clone(),
                body: self.reply_body.clone(),
            },
            validation: self.confidence.map(|confidence| DraftValidation {
                confidence: Some(confidence),
                extra: serde_json::Value::Null,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WorkflowActions;

    fn test_request() -> DraftRequest {
        DraftRequest {
            agent_id: "a1".to_string(),
            workflow_id: "default".to_string(),
            email_content: "Hi".to_string(),
            email_subject: "Inquiry".to_string(),
            email_from: "jane@x.com".to_string(),
            email_date: "2025-06-01T10:00:00Z".to_string(),
            agent_properties: vec![],
            workflow_actions: WorkflowActions {
                agent_name: "Sam".to_string(),
                agent_contact: "".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_mock_returns_canned_draft() {
        let client = MockAiClient::new()
            .with_reply(Some("Re: Inquiry"), "Hello!")
            .with_confidence(0.8);

        let draft = client.draft_reply(&test_request()).await.unwrap();

        assert_eq!(draft.reply.subject.as_deref(), Some("Re: Inquiry"));
        assert_eq!(draft.reply.body, "Hello!");
        assert_eq!(draft.validation.unwrap().confidence, Some(0.8));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let client = MockAiClient::new().with_failure();
        assert!(client.draft_reply(&test_request()).await.is_err());
        assert!(client.captured_requests().is_empty());
    }
}
