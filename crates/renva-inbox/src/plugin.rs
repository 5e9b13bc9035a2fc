//! Inbox plugin wiring the pipeline services together

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use renva_core::plugin::{
    PluginContext, PluginError, PluginRoutes, RenvaPlugin, ServiceRegistrationContext,
};
use tracing::{debug, warn};
use utoipa::openapi::OpenApi;
use utoipa::OpenApi as OpenApiTrait;

use renva_ai::{AiClient, HttpAiClient};
use renva_email::{MailProvider, OutboundMailService};

use crate::connector::{MailboxConnector, MockMailboxConnector};
use crate::handlers::{configure_routes, InboxApiDoc, InboxState};
use crate::pipeline::InboxPipeline;
use crate::responder::AiResponder;
use crate::threads::ThreadResolver;
use crate::usage::UsageService;
use crate::workflows::WorkflowProcessor;

/// Inbox plugin providing the webhook ingress and workflow processor
pub struct InboxPlugin;

impl InboxPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Default for InboxPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl RenvaPlugin for InboxPlugin {
    fn name(&self) -> &'static str {
        "inbox"
    }

    fn register_services<'a>(
        &'a self,
        context: &'a ServiceRegistrationContext,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + 'a>> {
        Box::pin(async move {
            let db = context.require_service::<sea_orm::DatabaseConnection>();
            let config = context.require_service::<renva_config::ServerConfig>();
            let mail_service = context.require_service::<OutboundMailService>();
            let provider = context.require_service::<dyn MailProvider>();

            // An AI client may already be registered (tests); otherwise go HTTP
            let ai_client = match context.get_service::<dyn AiClient>() {
                Some(client) => client,
                None => {
                    let client: Arc<dyn AiClient> =
                        Arc::new(HttpAiClient::new(config.ai_base_url.clone()));
                    context.register_service(client.clone());
                    client
                }
            };

            // Same for the mailbox connector; no Gmail adaptor configured
            // means the poll path sees an empty mailbox
            let connector = match context.get_service::<dyn MailboxConnector>() {
                Some(connector) => connector,
                None => {
                    warn!("No mailbox connector configured, workflow polling will see no messages");
                    let connector: Arc<dyn MailboxConnector> = Arc::new(MockMailboxConnector::new());
                    context.register_service(connector.clone());
                    connector
                }
            };

            let usage = Arc::new(UsageService::new(db.clone(), mail_service.clone()));
            context.register_service(usage.clone());

            let resolver = Arc::new(ThreadResolver::new(db.clone(), usage));
            context.register_service(resolver.clone());

            let responder = Arc::new(AiResponder::new(
                db.clone(),
                ai_client.clone(),
                mail_service.clone(),
            ));
            context.register_service(responder.clone());

            let pipeline = Arc::new(InboxPipeline::new(resolver, responder));
            context.register_service(pipeline.clone());

            let workflows = Arc::new(WorkflowProcessor::new(
                db.clone(),
                ai_client,
                provider,
                connector,
            ));
            context.register_service(workflows.clone());

            let state = Arc::new(InboxState {
                pipeline,
                workflows,
                webhook_secret: config.webhook_secret.clone(),
            });
            context.register_service(state);

            debug!("Inbox plugin services registered successfully");
            Ok(())
        })
    }

    fn configure_routes(&self, context: &PluginContext) -> Option<PluginRoutes> {
        let state = context.require_service::<InboxState>();
        let routes = configure_routes().with_state(state);
        Some(PluginRoutes { router: routes })
    }

    fn openapi_schema(&self) -> Option<OpenApi> {
        Some(<InboxApiDoc as OpenApiTrait>::openapi())
    }
}
