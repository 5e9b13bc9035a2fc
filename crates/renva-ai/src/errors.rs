//! Error types for the completion-service client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiError {
    #[error("Completion service request failed: {0}")]
    Http(String),

    #[error("Completion service error: {0}")]
    Service(String),

    #[error("Completion service returned an empty reply")]
    EmptyReply,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        AiError::Http(err.to_string())
    }
}
