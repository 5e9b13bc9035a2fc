//! Mail provider trait definitions

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::MailError;

/// Supported outbound mail provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailProviderType {
    /// Postmark transactional API
    Postmark,
    /// In-memory capture, used in tests and tokenless deployments
    Mock,
}

impl std::fmt::Display for MailProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailProviderType::Postmark => write!(f, "postmark"),
            MailProviderType::Mock => write!(f, "mock"),
        }
    }
}

/// A fully-resolved outbound email, ready to hand to a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Sender email address
    pub from: String,
    /// Recipient email address
    pub to: String,
    /// Reply-to address
    pub reply_to: Option<String>,
    /// Email subject
    pub subject: String,
    /// Plain text body content
    pub text_body: String,
    /// HTML body content
    pub html_body: Option<String>,
    /// Provider-side tag for stream analytics
    pub tag: Option<String>,
    /// Opaque metadata echoed back by provider webhooks
    pub metadata: Option<HashMap<String, String>>,
}

/// Response from a successful provider send
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSendResponse {
    /// Provider's message ID
    pub message_id: String,
}

/// Mail provider trait for abstracting transactional mail services
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Send an email
    async fn send(&self, email: &OutboundEmail) -> Result<ProviderSendResponse, MailError>;

    /// Get the provider type
    fn provider_type(&self) -> MailProviderType;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_type_display() {
        assert_eq!(MailProviderType::Postmark.to_string(), "postmark");
        assert_eq!(MailProviderType::Mock.to_string(), "mock");
    }
}
