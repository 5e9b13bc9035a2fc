//! Client for the external reply-drafting completion service
//!
//! The completion service receives the inbound email plus the agent's
//! listings and identity, and returns a drafted reply with a self-reported
//! confidence. Non-success envelopes are hard failures; the caller decides
//! how fatal that is.

mod client;
mod errors;
mod mock;

pub use client::{
    AiClient, AiDraft, DraftReply, DraftRequest, DraftValidation, HttpAiClient, PropertySummary,
    WorkflowActions,
};
pub use errors::AiError;
pub use mock::MockAiClient;
