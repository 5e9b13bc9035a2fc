use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use renva_core::plugin::PluginManager;
use renva_email::EmailPlugin;
use renva_inbox::InboxPlugin;
use tracing::{debug, info};

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:3000", env = "RENVA_ADDRESS")]
    pub address: String,

    /// Database connection URL
    #[arg(long, env = "RENVA_DATABASE_URL")]
    pub database_url: String,

    /// Shared secret for the inbound webhook; generated into the data dir
    /// when not provided
    #[arg(long, env = "RENVA_WEBHOOK_SECRET")]
    pub webhook_secret: Option<String>,

    /// Base URL of the reply-drafting completion service
    #[arg(
        long,
        default_value = "http://127.0.0.1:8100/api/v1",
        env = "RENVA_AI_BASE_URL"
    )]
    pub ai_base_url: String,

    /// Postmark server token; outbound mail is captured in memory when unset
    #[arg(long, env = "RENVA_POSTMARK_TOKEN")]
    pub postmark_token: Option<String>,

    /// Fallback From address for notifications and unowned aliases
    #[arg(
        long,
        default_value = "noreply@renva.app",
        env = "RENVA_SYSTEM_FROM_ADDRESS"
    )]
    pub system_from_address: String,

    /// Data directory for storing configuration and runtime files
    #[arg(long, env = "RENVA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = Arc::new(renva_config::ServerConfig::new(
            self.address.clone(),
            self.database_url.clone(),
            self.webhook_secret,
            self.ai_base_url,
            self.postmark_token,
            self.system_from_address,
            self.data_dir,
        )?);

        debug!("Initializing database connection...");
        let db = renva_database::establish_connection(&config.database_url).await?;

        let mut manager = PluginManager::new();
        manager.service_context().register_service(db);
        manager.service_context().register_service(config.clone());

        // Order matters: the inbox plugin depends on the email services
        manager.register_plugin(Box::new(EmailPlugin::new()));
        manager.register_plugin(Box::new(InboxPlugin::new()));
        manager.initialize_plugins().await?;

        let app = manager
            .build_application()?
            .layer(tower_http::trace::TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(&config.address).await?;
        info!("Renva inbox server listening on {}", listener.local_addr()?);
        axum::serve(listener, app).await?;

        Ok(())
    }
}
