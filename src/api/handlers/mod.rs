//! REST endpoint handlers organized by resource.

pub mod inbox;
pub mod messages;
pub mod system;
pub mod webhook;

use axum::Router;
use axum::http::HeaderMap;

use crate::app_state::AppState;
use crate::domain::AccountId;
use crate::error::RelayError;

/// Header carrying the caller's account id, injected by the upstream
/// auth proxy. Identity mechanics themselves live outside this service.
pub const ACCOUNT_HEADER: &str = "x-account-id";

/// Resolves the caller's account from the forwarded identity header.
///
/// # Errors
///
/// Returns [`RelayError::Unauthorized`] if the header is absent or does
/// not parse as an account id.
pub fn resolve_account(headers: &HeaderMap) -> Result<AccountId, RelayError> {
    headers
        .get(ACCOUNT_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .ok_or(RelayError::Unauthorized)
}

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(webhook::routes())
        .merge(inbox::routes())
        .merge(messages::routes())
}
