//! Unread-count handler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use super::resolve_account;
use crate::api::dto::UnreadCountResponse;
use crate::app_state::AppState;
use crate::error::{ErrorResponse, RelayError};

/// `GET /inbox/unread` — Current unread count for the caller's account.
///
/// # Errors
///
/// Returns [`RelayError::Unauthorized`] if the caller's identity cannot
/// be resolved, or [`RelayError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/inbox/unread",
    tag = "Inbox",
    summary = "Count unread assistant messages",
    description = "Counts assistant messages not yet marked read across all of the caller's conversations. Reflects state as of the last committed reply.",
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 401, description = "Identity could not be resolved", body = ErrorResponse),
        (status = 500, description = "Persistence failure", body = ErrorResponse),
    )
)]
pub async fn unread_count(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, RelayError> {
    let account_id = resolve_account(&headers)?;
    let count = state.relay_service.unread_count(account_id).await?;
    Ok(Json(UnreadCountResponse {
        success: true,
        unread_count: count,
    }))
}

/// Inbox routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/inbox/unread", get(unread_count))
}
