mod reset_usage;
mod serve;

pub use reset_usage::ResetUsageCommand;
pub use serve::ServeCommand;
