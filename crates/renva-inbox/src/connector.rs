//! Mailbox connector seam for the poll-based workflow path
//!
//! A connector lists recent messages from an agent's connected mailbox
//! (Gmail-style polling adaptors live behind this trait). The mock
//! implementation backs tests and deployments without a connected provider.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use renva_core::DBDateTime;

use crate::errors::InboxError;

/// One message pulled from a connected mailbox
#[derive(Debug, Clone)]
pub struct FetchedMessage {
    /// Provider-side message id, used for dedup
    pub id: String,
    pub subject: String,
    pub body: String,
    pub from: String,
    pub from_name: Option<String>,
    pub timestamp: DBDateTime,
}

/// Read-side of an external mailbox
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// List messages newer than `since` for the agent's connected mailbox
    async fn list_new_messages(
        &self,
        agent_id: Uuid,
        since: DBDateTime,
    ) -> Result<Vec<FetchedMessage>, InboxError>;
}

/// In-memory connector used by tests and tokenless deployments
#[derive(Clone, Default)]
pub struct MockMailboxConnector {
    messages: Arc<Mutex<Vec<FetchedMessage>>>,
}

impl MockMailboxConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_message(&self, message: FetchedMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[async_trait]
impl MailboxConnector for MockMailboxConnector {
    async fn list_new_messages(
        &self,
        _agent_id: Uuid,
        since: DBDateTime,
    ) -> Result<Vec<FetchedMessage>, InboxError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.timestamp >= since)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_mock_connector_filters_by_timestamp() {
        let connector = MockMailboxConnector::new();
        connector.push_message(FetchedMessage {
            id: "old".to_string(),
            subject: "Old".to_string(),
            body: String::new(),
            from: "a@b.c".to_string(),
            from_name: None,
            timestamp: Utc::now() - Duration::days(3),
        });
        connector.push_message(FetchedMessage {
            id: "new".to_string(),
            subject: "New".to_string(),
            body: String::new(),
            from: "a@b.c".to_string(),
            from_name: None,
            timestamp: Utc::now(),
        });

        let since = Utc::now() - Duration::hours(24);
        let messages = connector
            .list_new_messages(Uuid::new_v4(), since)
            .await
            .unwrap();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "new");
    }
}
