//! Webhook ingestion handler.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::WebhookAck;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `POST /webhooks` — Ingest one external callback.
///
/// Accepts the two body shapes produced by the upstream jobs: a single
/// JSON object, or a single-element array wrapping the object. Assistant
/// replies are persisted before fan-out; status callbacks fan out only.
///
/// # Errors
///
/// Returns [`RelayError`] on malformed or incomplete payloads, unknown
/// conversations, or persistence failure. The external job owns its own
/// retry policy; nothing is queued or retried here.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks",
    tag = "Webhooks",
    summary = "Ingest an external job callback",
    description = "Normalizes the callback body into a canonical event, persists assistant replies to the conversation log, and fans the event out to all open push streams.",
    responses(
        (status = 200, description = "Callback ingested", body = WebhookAck),
        (status = 400, description = "Malformed or incomplete payload", body = ErrorResponse),
        (status = 404, description = "Referenced conversation or message not found", body = ErrorResponse),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn ingest_webhook(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, RelayError> {
    let event = state.relay_service.ingest_webhook(&body).await?;
    tracing::info!(kind = %event.kind(), "webhook ingested");
    Ok((StatusCode::OK, Json(WebhookAck { ok: true })))
}

/// Webhook routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/webhooks", post(ingest_webhook))
}
