//! Inbound-email processing pipeline
//!
//! Four stages, run synchronously per webhook invocation:
//! 1. ingress - shared-secret validation and payload parsing
//! 2. lead extraction - ordered regex cascade over the body text
//! 3. thread resolution - alias lookup, quota enforcement, persistence
//! 4. AI response - draft a reply, persist it, dispatch it (best effort)
//!
//! A second, poll-based workflow path processes batches of fetched messages
//! with dedup on the provider message id.

pub mod connector;
pub mod errors;
pub mod extract;
pub mod handlers;
pub mod pipeline;
pub mod plugin;
pub mod postmark;
pub mod responder;
pub mod text;
pub mod threads;
pub mod usage;
pub mod workflows;

pub use connector::{FetchedMessage, MailboxConnector, MockMailboxConnector};
pub use errors::InboxError;
pub use extract::{extract_lead_info, LeadInfo};
pub use handlers::{configure_routes, InboxApiDoc, InboxState};
pub use pipeline::{InboxPipeline, ProcessedEmail};
pub use plugin::InboxPlugin;
pub use postmark::{PostmarkAttachment, PostmarkHeader, PostmarkInboundEmail};
pub use responder::{AiResponder, ReplyOutcome};
pub use threads::ThreadResolver;
pub use usage::{QuotaStatus, ThreadOwner, UsageService};
pub use workflows::{BatchSummary, WorkflowProcessor};
