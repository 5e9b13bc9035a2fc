//! Outbound transactional mail for Renva
//!
//! This crate provides email sending through the Postmark transactional
//! API, message dispatch with delivery logging, and manual resend with
//! bounded retry. A mock provider captures mail when no server token is
//! configured.

pub mod errors;
pub mod handlers;
pub mod plugin;
pub mod providers;
pub mod service;

// Re-export main types
pub use errors::MailError;
pub use handlers::{EmailApiDoc, EmailState};
pub use plugin::EmailPlugin;
pub use providers::{
    MailProvider, MailProviderType, MockMailProvider, OutboundEmail, PostmarkProvider,
    ProviderSendResponse,
};
pub use service::{OutboundMailService, SendOutcome};
