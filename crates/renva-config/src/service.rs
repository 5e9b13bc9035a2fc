use std::fs;
use std::path::PathBuf;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Well-known file inside data_dir holding the inbound-webhook shared secret
pub const WEBHOOK_SECRET_FILE: &str = "webhook_secret";

/// Immutable server configuration, constructed once at startup and passed
/// into the plugin registry. Nothing reads the environment after this point.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    // Required fields
    pub address: String,
    pub database_url: String,

    // Inbound webhook authentication
    pub webhook_secret: String,

    // External collaborators
    pub ai_base_url: String,
    pub postmark_server_token: Option<String>,

    /// Fallback From address when an owner has no primary alias
    pub system_from_address: String,

    // Generated/derived fields
    pub data_dir: PathBuf,
}

impl ServerConfig {
    /// Create a new configuration with minimal parameters.
    ///
    /// The webhook secret is taken from the argument when given, otherwise
    /// loaded from (or generated into) `<data_dir>/webhook_secret` so that
    /// restarts keep the same inbound URL valid.
    pub fn new(
        address: String,
        database_url: String,
        webhook_secret: Option<String>,
        ai_base_url: String,
        postmark_server_token: Option<String>,
        system_from_address: String,
        data_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::home_dir()
                .expect("Could not find home directory")
                .join(".renva")
        });

        fs::create_dir_all(&data_dir)?;

        let webhook_secret = match webhook_secret {
            Some(secret) => secret,
            None => {
                let secret_path = data_dir.join(WEBHOOK_SECRET_FILE);
                if secret_path.exists() {
                    fs::read_to_string(&secret_path)?.trim().to_string()
                } else {
                    let secret = Self::generate_secret();
                    fs::write(&secret_path, &secret)?;
                    info!("Generated webhook secret at {}", secret_path.display());
                    secret
                }
            }
        };

        Ok(ServerConfig {
            address,
            database_url,
            webhook_secret,
            ai_base_url,
            postmark_server_token,
            system_from_address,
            data_dir,
        })
    }

    /// Generate a 32-byte secret in hex format
    fn generate_secret() -> String {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 32] = rng.gen();
        hex::encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &std::path::Path, secret: Option<String>) -> ServerConfig {
        ServerConfig::new(
            "127.0.0.1:3000".to_string(),
            "sqlite::memory:".to_string(),
            secret,
            "http://localhost:8100/api/v1".to_string(),
            None,
            "noreply@renva.app".to_string(),
            Some(dir.to_path_buf()),
        )
        .unwrap()
    }

    #[test]
    fn test_explicit_secret_wins() {
        let dir = std::env::temp_dir().join(format!("renva-config-{}", std::process::id()));
        let config = test_config(&dir, Some("s3cret".to_string()));
        assert_eq!(config.webhook_secret, "s3cret");
        // Nothing written when the secret is provided explicitly
        assert!(!dir.join(WEBHOOK_SECRET_FILE).exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_generated_secret_is_stable_across_restarts() {
        let dir = std::env::temp_dir().join(format!("renva-config-gen-{}", std::process::id()));
        let first = test_config(&dir, None);
        let second = test_config(&dir, None);
        assert_eq!(first.webhook_secret, second.webhook_secret);
        assert_eq!(first.webhook_secret.len(), 64);
        let _ = fs::remove_dir_all(&dir);
    }
}
