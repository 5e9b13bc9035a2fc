//! HTTP surface for the inbound pipeline
//!
//! The webhook endpoint speaks the provider's contract: shared-secret auth
//! via the `auth` query parameter, plain JSON envelopes, and only
//! ingestion-level status codes. AI/send sub-step failures never surface
//! here, so the provider does not retry delivery because of a downstream
//! outage.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::errors::InboxError;
use crate::pipeline::InboxPipeline;
use crate::postmark::PostmarkInboundEmail;
use crate::workflows::{BatchSummary, WorkflowProcessor};

/// Application state for inbox handlers
pub struct InboxState {
    pub pipeline: Arc<InboxPipeline>,
    pub workflows: Arc<WorkflowProcessor>,
    pub webhook_secret: String,
}

/// Success envelope returned to the provider
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAccepted {
    pub success: bool,
    pub message: String,
    pub thread_id: Uuid,
}

/// Error envelope returned to the provider
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookRejection {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AuthQuery {
    /// Shared-secret token configured for the webhook
    pub auth: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RunWorkflowsRequest {
    /// Process a single agent instead of all agents with active workflows
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RunWorkflowsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub summary: BatchSummary,
}

/// Configure inbox routes
pub fn configure_routes() -> Router<Arc<InboxState>> {
    Router::new()
        .route("/inbound/postmark", post(postmark_inbound))
        .route("/inbound/workflows/run", post(run_workflows))
}

/// Receive an inbound email from Postmark
#[utoipa::path(
    tag = "Inbox",
    post,
    path = "/inbound/postmark",
    params(AuthQuery),
    request_body = String,
    responses(
        (status = 200, description = "Email ingested", body = WebhookAccepted),
        (status = 400, description = "Malformed payload", body = WebhookRejection),
        (status = 401, description = "Bad or missing shared secret", body = WebhookRejection),
        (status = 500, description = "Ingestion failed", body = WebhookRejection)
    )
)]
pub async fn postmark_inbound(
    State(state): State<Arc<InboxState>>,
    Query(query): Query<AuthQuery>,
    body: String,
) -> Response {
    if query.auth.as_deref() != Some(state.webhook_secret.as_str()) {
        return reject(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Invalid or missing authentication token",
        );
    }

    let payload: PostmarkInboundEmail = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(e) => {
            return reject(
                StatusCode::BAD_REQUEST,
                "Invalid payload",
                &format!("Body is not a valid inbound email payload: {}", e),
            );
        }
    };

    match state.pipeline.process(payload).await {
        Ok(processed) => (
            StatusCode::OK,
            Json(WebhookAccepted {
                success: true,
                message: "Email processed successfully".to_string(),
                thread_id: processed.thread.id,
            }),
        )
            .into_response(),
        Err(err) => {
            error!("Error processing webhook: {}", err);
            let status = match &err {
                InboxError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            reject(status, "Internal server error", &err.to_string())
        }
    }
}

/// Run the poll-based workflow processor
#[utoipa::path(
    tag = "Inbox",
    post,
    path = "/inbound/workflows/run",
    request_body = RunWorkflowsRequest,
    responses(
        (status = 200, description = "Batch summary", body = RunWorkflowsResponse),
        (status = 500, description = "Batch run failed")
    )
)]
pub async fn run_workflows(
    State(state): State<Arc<InboxState>>,
    Json(request): Json<RunWorkflowsRequest>,
) -> Result<impl IntoResponse, renva_core::problemdetails::Problem> {
    let summary = match request.agent_id {
        Some(agent_id) => state.workflows.process_agent_inbox(agent_id).await,
        None => state.workflows.process_all_agents().await,
    }
    .map_err(|e| {
        error!("Workflow batch run failed: {}", e);
        renva_core::problemdetails::internal_server_error().with_detail(e.to_string())
    })?;

    Ok((
        StatusCode::OK,
        Json(RunWorkflowsResponse {
            success: true,
            summary,
        }),
    ))
}

fn reject(status: StatusCode, error: &str, message: &str) -> Response {
    (
        status,
        Json(WebhookRejection {
            error: error.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// OpenAPI documentation for inbox endpoints
#[derive(OpenApi)]
#[openapi(
    paths(postmark_inbound, run_workflows),
    components(schemas(
        WebhookAccepted,
        WebhookRejection,
        RunWorkflowsRequest,
        RunWorkflowsResponse,
        BatchSummary
    )),
    tags((name = "Inbox", description = "Inbound email processing"))
)]
pub struct InboxApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::util::ServiceExt;

    use renva_ai::{AiClient, MockAiClient};
    use renva_email::{MailProvider, MockMailProvider, OutboundMailService};

    use crate::connector::{MailboxConnector, MockMailboxConnector};
    use crate::responder::AiResponder;
    use crate::threads::ThreadResolver;
    use crate::usage::UsageService;

    /// State over a mock database; enough for requests rejected before any
    /// query runs
    fn test_state() -> Arc<InboxState> {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let provider: Arc<dyn MailProvider> = Arc::new(MockMailProvider::new());
        let mail = Arc::new(OutboundMailService::new(
            db.clone(),
            provider.clone(),
            "noreply@renva.test".to_string(),
        ));
        let usage = Arc::new(UsageService::new(db.clone(), mail.clone()));
        let resolver = Arc::new(ThreadResolver::new(db.clone(), usage));
        let ai: Arc<dyn AiClient> = Arc::new(MockAiClient::new());
        let responder = Arc::new(AiResponder::new(db.clone(), ai.clone(), mail));
        let pipeline = Arc::new(InboxPipeline::new(resolver, responder));
        let connector: Arc<dyn MailboxConnector> = Arc::new(MockMailboxConnector::new());
        let workflows = Arc::new(WorkflowProcessor::new(db, ai, provider, connector));

        Arc::new(InboxState {
            pipeline,
            workflows,
            webhook_secret: "s3cret".to_string(),
        })
    }

    fn app() -> Router {
        configure_routes().with_state(test_state())
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_rejects_missing_secret() {
        let response = app()
            .oneshot(
                Request::post("/inbound/postmark")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_webhook_rejects_wrong_secret() {
        let response = app()
            .oneshot(
                Request::post("/inbound/postmark?auth=nope")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_webhook_rejects_malformed_payload() {
        let response = app()
            .oneshot(
                Request::post("/inbound/postmark?auth=s3cret")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid payload");
    }

    #[tokio::test]
    async fn test_webhook_rejects_payload_missing_required_keys() {
        // Valid JSON, but not a valid inbound email payload
        let response = app()
            .oneshot(
                Request::post("/inbound/postmark?auth=s3cret")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "From": "jane@x.com" }"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
