//! Core utilities and types shared across all Renva crates

pub mod error;
pub mod plugin;
pub mod problemdetails;
pub mod retry;
pub mod types;

// Re-export commonly used types
pub use error::{ServiceError, ServiceResult};
pub use retry::{retry_operation, retry_operation_with, RetryError, MAX_RETRIES};
pub use types::DBDateTime;

// Re-export external dependencies
pub use anyhow;
pub use chrono;
pub use serde;
pub use serde_json;
pub use thiserror;
pub use tokio;
pub use tracing;
