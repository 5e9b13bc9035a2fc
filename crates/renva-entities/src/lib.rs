//! Entity definitions for every table the inbox service persists

pub mod email_addresses;
pub mod email_attachments;
pub mod email_delivery_logs;
pub mod email_messages;
pub mod email_raw_messages;
pub mod email_threads;
pub mod email_workflows;
pub mod processed_emails;
pub mod properties;
pub mod subscriptions;
pub mod team_members;
pub mod teams;
pub mod users;
pub mod workflow_logs;
