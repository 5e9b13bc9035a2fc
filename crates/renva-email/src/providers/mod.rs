//! Outbound mail provider implementations

mod mock;
mod postmark;
mod traits;

pub use mock::MockMailProvider;
pub use postmark::PostmarkProvider;
pub use traits::{MailProvider, MailProviderType, OutboundEmail, ProviderSendResponse};
