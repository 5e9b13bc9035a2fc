//! Error types for the outbound mail service

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Message not found: {0}")]
    MessageNotFound(uuid::Uuid),

    #[error("Thread not found for message: {0}")]
    ThreadNotFound(uuid::Uuid),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for MailError {
    fn from(err: serde_json::Error) -> Self {
        MailError::Serialization(err.to_string())
    }
}
