//! Error taxonomy for the inbound pipeline
//!
//! Validation and configuration errors are terminal for the request; AI and
//! send errors never escape the responder (see `ReplyOutcome`).

use renva_core::RetryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("No inbox alias is mapped for recipient {0}")]
    AddressNotMapped(String),

    #[error("Inbox alias {0} has no owner")]
    AddressUnowned(String),

    #[error("Conversation limit reached for {0}")]
    QuotaExceeded(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Persistence(#[from] RetryError<sea_orm::DbErr>),

    #[error("AI completion failed: {0}")]
    Ai(#[from] renva_ai::AiError),

    #[error("Outbound send failed: {0}")]
    Send(#[from] renva_email::MailError),
}
