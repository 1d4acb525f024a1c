//! Message log handlers: mark-read and conversation history.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::dto::{MarkReadResponse, MessageDto, MessageListResponse};
use crate::app_state::AppState;
use crate::domain::{ConversationId, MessageId};
use crate::error::{ErrorResponse, RelayError};

/// `POST /messages/{id}/read` — Mark one message read.
///
/// Idempotent: marking an already-read message succeeds and changes
/// nothing.
///
/// # Errors
///
/// Returns [`RelayError::MessageNotFound`] if the message does not
/// exist, or [`RelayError::Persistence`] on storage failure.
#[utoipa::path(
    post,
    path = "/api/v1/messages/{id}/read",
    tag = "Messages",
    summary = "Mark a message read",
    params(
        ("id" = Uuid, Path, description = "Message ID"),
    ),
    responses(
        (status = 200, description = "Message is read", body = MarkReadResponse),
        (status = 404, description = "Message not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, RelayError> {
    state.relay_service.mark_read(MessageId::from_uuid(id)).await?;
    Ok(Json(MarkReadResponse { success: true }))
}

/// `GET /conversations/{id}/messages` — One conversation's message log.
///
/// # Errors
///
/// Returns [`RelayError::ConversationNotFound`] if the conversation does
/// not exist, or [`RelayError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    tag = "Messages",
    summary = "List a conversation's messages",
    params(
        ("id" = Uuid, Path, description = "Conversation ID"),
    ),
    responses(
        (status = 200, description = "Messages in creation order", body = MessageListResponse),
        (status = 404, description = "Conversation not found", body = ErrorResponse),
    )
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, RelayError> {
    let messages = state
        .relay_service
        .list_messages(ConversationId::from_uuid(id))
        .await?;
    Ok(Json(MessageListResponse {
        data: messages.into_iter().map(MessageDto::from).collect(),
    }))
}

/// Message routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/messages/{id}/read", post(mark_read))
        .route("/conversations/{id}/messages", get(list_messages))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::api;
    use crate::domain::{AccountId, EventBus};
    use crate::persistence::{ConversationStore, MemoryStore};
    use crate::service::RelayService;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_state() -> (AppState, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let service = RelayService::new(
            Arc::clone(&store) as Arc<dyn ConversationStore>,
            EventBus::new(),
        );
        let state = AppState {
            relay_service: Arc::new(service),
            heartbeat_interval: Duration::from_secs(25),
        };
        (state, store)
    }

    #[tokio::test]
    async fn mark_read_twice_returns_200_both_times() {
        let (state, store) = make_state();
        let Ok(conversation) = store.create_conversation(AccountId::new()).await else {
            panic!("conversation creation failed");
        };
        let Ok(reply) = store
            .append_assistant_reply(conversation.id, "hi", json!({}), None)
            .await
        else {
            panic!("append failed");
        };

        let app = api::build_router().with_state(state);
        for _ in 0..2 {
            let Ok(request) = Request::builder()
                .method("POST")
                .uri(format!("/api/v1/messages/{}/read", reply.id))
                .body(Body::empty())
            else {
                panic!("request build failed");
            };
            let Ok(response) = app.clone().oneshot(request).await else {
                panic!("request failed");
            };
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn mark_read_unknown_message_returns_404() {
        let (state, _store) = make_state();
        let app = api::build_router().with_state(state);
        let Ok(request) = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/messages/{}/read", uuid::Uuid::new_v4()))
            .body(Body::empty())
        else {
            panic!("request build failed");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_log_lists_messages_in_order() {
        let (state, store) = make_state();
        let Ok(conversation) = store.create_conversation(AccountId::new()).await else {
            panic!("conversation creation failed");
        };
        let Ok(human) = store.append_human_message(conversation.id, "q").await else {
            panic!("append failed");
        };
        let Ok(_reply) = store
            .append_assistant_reply(conversation.id, "a", json!({}), Some(human.id))
            .await
        else {
            panic!("append failed");
        };

        let app = api::build_router().with_state(state);
        let Ok(request) = Request::builder()
            .uri(format!("/api/v1/conversations/{}/messages", conversation.id))
            .body(Body::empty())
        else {
            panic!("request build failed");
        };
        let Ok(response) = app.oneshot(request).await else {
            panic!("request failed");
        };
        assert_eq!(response.status(), StatusCode::OK);

        let Ok(collected) = response.into_body().collect().await else {
            panic!("body read failed");
        };
        let body: Result<serde_json::Value, _> = serde_json::from_slice(&collected.to_bytes());
        let Ok(body) = body else {
            panic!("body parse failed");
        };
        let Some(data) = body.get("data").and_then(serde_json::Value::as_array) else {
            panic!("missing data array");
        };
        assert_eq!(data.len(), 2);
        assert_eq!(
            data.first().and_then(|m| m.get("sender_type")),
            Some(&json!("human"))
        );
        assert_eq!(
            data.last().and_then(|m| m.get("sender_type")),
            Some(&json!("assistant"))
        );
    }
}
