//! Email plugin for Renva

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use renva_core::plugin::{
    PluginContext, PluginError, PluginRoutes, RenvaPlugin, ServiceRegistrationContext,
};
use tracing::{debug, warn};
use utoipa::openapi::OpenApi;
use utoipa::OpenApi as OpenApiTrait;

use crate::handlers::{self, EmailApiDoc, EmailState};
use crate::providers::{MailProvider, MockMailProvider, PostmarkProvider};
use crate::service::OutboundMailService;

/// Email plugin providing the outbound mail service
///
/// Registers a Postmark-backed provider when a server token is configured,
/// otherwise a capturing mock so local deployments still work end-to-end.
pub struct EmailPlugin;

impl EmailPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmailPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RenvaPlugin for EmailPlugin {
    fn name(&self) -> &'static str {
        "email"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>> {
        Box::pin(async move {
            let db = context.require_service::<sea_orm::DatabaseConnection>();
            let config = context.require_service::<renva_config::ServerConfig>();

            let provider: Arc<dyn MailProvider> = match &config.postmark_server_token {
                Some(token) => Arc::new(PostmarkProvider::new(token.clone())),
                None => {
                    warn!("No Postmark server token configured, outbound mail will be captured in memory");
                    Arc::new(MockMailProvider::new())
                }
            };
            context.register_service(provider.clone());

            let mail_service = Arc::new(OutboundMailService::new(
                db.clone(),
                provider,
                config.system_from_address.clone(),
            ));
            context.register_service(mail_service.clone());

            let email_state = Arc::new(EmailState { mail_service });
            context.register_service(email_state);

            debug!("Email plugin services registered successfully");
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let email_state = context.require_service::<EmailState>();
        let email_routes = handlers::configure_routes().with_state(email_state);

        Some(PluginRoutes {
            router: email_routes,
        })
    }

    fn openapi_schema(&self) -> Option<OpenApi> {
        Some(<EmailApiDoc as OpenApiTrait>::openapi())
    }
}
