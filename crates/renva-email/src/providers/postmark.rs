//! Postmark transactional email provider implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::traits::{MailProvider, MailProviderType, OutboundEmail, ProviderSendResponse};
use crate::errors::MailError;

/// Postmark provider implementation
pub struct PostmarkProvider {
    client: Client,
    server_token: String,
    base_url: String,
}

impl PostmarkProvider {
    const BASE_URL: &'static str = "https://api.postmarkapp.com";

    /// Create a new Postmark provider with the given server token
    pub fn new(server_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            server_token: server_token.into(),
            base_url: Self::BASE_URL.to_string(),
        }
    }

    /// Override the API base URL (used by tests against a local stub)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// Postmark API request/response types
#[derive(Debug, Serialize)]
struct PostmarkSendRequest<'a> {
    #[serde(rename = "From")]
    from: &'a str,
    #[serde(rename = "To")]
    to: &'a str,
    #[serde(rename = "ReplyTo", skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "TextBody")]
    text_body: &'a str,
    #[serde(rename = "HtmlBody", skip_serializing_if = "Option::is_none")]
    html_body: Option<&'a str>,
    #[serde(rename = "Tag", skip_serializing_if = "Option::is_none")]
    tag: Option<&'a str>,
    #[serde(rename = "Metadata", skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a std::collections::HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct PostmarkSendResponse {
    #[serde(rename = "MessageID")]
    message_id: String,
}

#[async_trait]
impl MailProvider for PostmarkProvider {
    async fn send(&self, email: &OutboundEmail) -> Result<ProviderSendResponse, MailError> {
        debug!("Sending email to {} via Postmark", email.to);

        let request = PostmarkSendRequest {
            from: &email.from,
            to: &email.to,
            reply_to: email.reply_to.as_deref(),
            subject: &email.subject,
            text_body: &email.text_body,
            html_body: email.html_body.as_deref(),
            tag: email.tag.as_deref(),
            metadata: email.metadata.as_ref(),
        };

        let response = self
            .client
            .post(format!("{}/email", self.base_url))
            .header("Accept", "application/json")
            .header("X-Postmark-Server-Token", &self.server_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| MailError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Postmark API error: {}", error_text);
            return Err(MailError::Provider(format!(
                "Postmark API error: {}",
                error_text
            )));
        }

        let result: PostmarkSendResponse = response
            .json()
            .await
            .map_err(|e| MailError::Provider(e.to_string()))?;

        Ok(ProviderSendResponse {
            message_id: result.message_id,
        })
    }

    fn provider_type(&self) -> MailProviderType {
        MailProviderType::Postmark
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_request_serializes_postmark_field_names() {
        let request = PostmarkSendRequest {
            from: "desk@agency.example.com",
            to: "jane@x.com",
            reply_to: Some("desk@agency.example.com"),
            subject: "Re: Inquiry",
            text_body: "Thanks for reaching out.",
            html_body: None,
            tag: None,
            metadata: None,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["From"], "desk@agency.example.com");
        assert_eq!(json["To"], "jane@x.com");
        assert_eq!(json["Subject"], "Re: Inquiry");
        assert_eq!(json["TextBody"], "Thanks for reaching out.");
        // Optional fields are omitted entirely when unset
        assert!(json.get("HtmlBody").is_none());
        assert!(json.get("Tag").is_none());
    }

    #[test]
    fn test_provider_type() {
        let provider = PostmarkProvider::new("token");
        assert_eq!(provider.provider_type(), MailProviderType::Postmark);
    }
}
