//! Email management handlers

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use renva_core::problemdetails::{internal_server_error, not_found, Problem};

use crate::errors::MailError;
use crate::service::OutboundMailService;

/// Application state for email handlers
pub struct EmailState {
    pub mail_service: Arc<OutboundMailService>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResendResponse {
    pub success: bool,
    pub message_id: Uuid,
    pub provider_message_id: String,
}

/// Configure email routes
pub fn configure_routes() -> Router<Arc<EmailState>> {
    Router::new().route("/emails/{id}/resend", post(resend_email))
}

/// Resend a queued or failed draft with bounded retry
#[utoipa::path(
    tag = "Emails",
    post,
    path = "/emails/{id}/resend",
    params(("id" = Uuid, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message dispatched", body = ResendResponse),
        (status = 404, description = "Message not found"),
        (status = 500, description = "All send attempts failed")
    )
)]
pub async fn resend_email(
    State(state): State<Arc<EmailState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, Problem> {
    let outcome = state.mail_service.resend(id).await.map_err(|e| {
        error!("Failed to resend message {}: {}", id, e);
        match &e {
            MailError::MessageNotFound(_) => not_found().with_detail(e.to_string()),
            _ => internal_server_error().with_detail(e.to_string()),
        }
    })?;

    Ok((
        StatusCode::OK,
        Json(ResendResponse {
            success: true,
            message_id: outcome.message_id,
            provider_message_id: outcome.provider_message_id,
        }),
    ))
}

/// OpenAPI documentation for email endpoints
#[derive(OpenApi)]
#[openapi(
    paths(resend_email),
    components(schemas(ResendResponse)),
    tags((name = "Emails", description = "Outbound mail management"))
)]
pub struct EmailApiDoc;
