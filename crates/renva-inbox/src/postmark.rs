//! Postmark inbound webhook payload types
//!
//! See: https://postmarkapp.com/developer/webhooks/inbound-webhook

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::InboxError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmarkInboundEmail {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "FromName", default)]
    pub from_name: Option<String>,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Subject")]
    pub subject: String,
    #[serde(rename = "TextBody", default)]
    pub text_body: Option<String>,
    #[serde(rename = "HtmlBody", default)]
    pub html_body: Option<String>,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Attachments", default)]
    pub attachments: Vec<PostmarkAttachment>,
    #[serde(rename = "Headers", default)]
    pub headers: Vec<PostmarkHeader>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmarkAttachment {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "ContentType")]
    pub content_type: String,
    #[serde(rename = "ContentLength")]
    pub content_length: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostmarkHeader {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl PostmarkInboundEmail {
    /// Check the structurally-required fields beyond what serde enforces
    pub fn validate(&self) -> Result<(), InboxError> {
        for (field, value) in [
            ("From", &self.from),
            ("To", &self.to),
            ("Date", &self.date),
        ] {
            if value.trim().is_empty() {
                return Err(InboxError::InvalidPayload(format!(
                    "missing required field '{}'",
                    field
                )));
            }
        }
        Ok(())
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Parse the provider's Date field; falls back to now for unparseable
    /// values so a malformed date never loses a message.
    pub fn received_at(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.date)
            .map(|d| d.with_timezone(&Utc))
            .or_else(|_| DateTime::parse_from_rfc2822(&self.date).map(|d| d.with_timezone(&Utc)))
            .unwrap_or_else(|_| Utc::now())
    }

    pub fn text_body(&self) -> &str {
        self.text_body.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "From": "jane@x.com",
        "FromName": "Jane Doe",
        "To": "Desk <desk@agency.n.example.com>",
        "Subject": "Inquiry",
        "TextBody": "Hi, I'm interested. Email: jane@x.com Phone: 082 555 1234",
        "HtmlBody": null,
        "MessageID": "pm-001",
        "Date": "2025-06-01T10:00:00Z",
        "Attachments": [],
        "Headers": [{ "Name": "X-Spam-Score", "Value": "0.1" }]
    }"#;

    #[test]
    fn test_parses_postmark_schema() {
        let payload: PostmarkInboundEmail = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(payload.from, "jane@x.com");
        assert_eq!(payload.to, "Desk <desk@agency.n.example.com>");
        assert_eq!(payload.message_id, "pm-001");
        assert!(payload.attachments.is_empty());
        assert_eq!(payload.header("x-spam-score"), Some("0.1"));
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_missing_required_key_is_a_parse_error() {
        let result = serde_json::from_str::<PostmarkInboundEmail>(r#"{ "From": "a@b.c" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_required_field_fails_validation() {
        let mut payload: PostmarkInboundEmail = serde_json::from_str(SAMPLE).unwrap();
        payload.to = "  ".to_string();
        let err = payload.validate().unwrap_err();
        assert!(err.to_string().contains("'To'"));
    }

    #[test]
    fn test_received_at_parses_both_date_formats() {
        let mut payload: PostmarkInboundEmail = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(
            payload.received_at().to_rfc3339(),
            "2025-06-01T10:00:00+00:00"
        );

        payload.date = "Sun, 01 Jun 2025 10:00:00 +0000".to_string();
        assert_eq!(
            payload.received_at().to_rfc3339(),
            "2025-06-01T10:00:00+00:00"
        );
    }
}
