//! Mock mail provider for tests and tokenless deployments

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::traits::{MailProvider, MailProviderType, OutboundEmail, ProviderSendResponse};
use crate::errors::MailError;

/// Mock mail provider that captures outbound mail in memory
#[derive(Debug, Clone, Default)]
pub struct MockMailProvider {
    /// Counter for tracking calls
    pub send_count: Arc<AtomicUsize>,
    /// Every email handed to `send`, in order
    pub sent: Arc<Mutex<Vec<OutboundEmail>>>,
    /// Configurable failure
    pub should_fail_send: bool,
}

impl MockMailProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_send_failure(mut self) -> Self {
        self.should_fail_send = true;
        self
    }

    pub fn send_call_count(&self) -> usize {
        self.send_count.load(Ordering::SeqCst)
    }

    pub fn sent_emails(&self) -> Vec<OutboundEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailProvider for MockMailProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<ProviderSendResponse, MailError> {
        self.send_count.fetch_add(1, Ordering::SeqCst);

        if self.should_fail_send {
            return Err(MailError::Provider("Mock send failure".to_string()));
        }

        self.sent.lock().unwrap().push(email.clone());

        Ok(ProviderSendResponse {
            message_id: format!("mock-message-{}", uuid::Uuid::new_v4()),
        })
    }

    fn provider_type(&self) -> MailProviderType {
        MailProviderType::Mock
    }
}
