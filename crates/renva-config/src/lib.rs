mod service;

pub use service::{ServerConfig, WEBHOOK_SECRET_FILE};
