//! Relay service: orchestrates webhook ingestion, persistence, and fan-out.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::normalizer::{FIELD_BOT_RESPONSE, FIELD_CONVERSATION_ID};
use crate::domain::{AccountId, ConversationId, Event, EventBus, EventKind, MessageId, normalize};
use crate::error::RelayError;
use crate::persistence::{ConversationStore, Message};

/// Orchestration layer for the event relay.
///
/// Stateless coordinator: owns the [`ConversationStore`] seam for
/// durability and the [`EventBus`] for live fan-out. The ingestion path
/// follows the pattern: normalize → persist (replies only) → publish →
/// return. Publishing happens after the store commit; no ordering is
/// promised between the two for observers that mix live push with
/// re-fetching.
#[derive(Clone)]
pub struct RelayService {
    store: Arc<dyn ConversationStore>,
    event_bus: EventBus,
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("subscribers", &self.event_bus.subscriber_count())
            .finish()
    }
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Ingests one external callback body.
    ///
    /// Normalizes the payload, persists assistant replies (marking the
    /// originating human message read in the same transaction), and fans
    /// the event out to every open push stream. A rejected or failed
    /// callback publishes nothing; retrying is the external job's
    /// responsibility, not this service's.
    ///
    /// # Errors
    ///
    /// Returns the normalization error for malformed or incomplete
    /// payloads, [`RelayError::ConversationNotFound`] /
    /// [`RelayError::MessageNotFound`] when a reply references unknown
    /// rows, or [`RelayError::Persistence`] on storage failure.
    pub async fn ingest_webhook(&self, raw: &Value) -> Result<Event, RelayError> {
        let event = normalize(raw)?;

        if event.kind() == &EventKind::AssistantReply {
            let message = self.persist_reply(&event).await?;
            tracing::info!(
                message_id = %message.id,
                conversation_id = %message.conversation_id,
                "assistant reply stored"
            );
        }

        let delivered = self.event_bus.publish(&event);
        tracing::debug!(kind = %event.kind(), delivered, "event relayed");
        Ok(event)
    }

    /// Counts unread assistant messages for an account.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    pub async fn unread_count(&self, account_id: AccountId) -> Result<i64, RelayError> {
        self.store.unread_count(account_id).await
    }

    /// Marks a message read (idempotent).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MessageNotFound`] if the message does not
    /// exist, or [`RelayError::Persistence`] on storage failure.
    pub async fn mark_read(&self, message_id: MessageId) -> Result<(), RelayError> {
        self.store.mark_read(message_id).await
    }

    /// Lists a conversation's messages in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConversationNotFound`] if the conversation
    /// does not exist, or [`RelayError::Persistence`] on storage failure.
    pub async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RelayError> {
        self.store.list_messages(conversation_id).await
    }

    /// Persists a normalized assistant reply.
    async fn persist_reply(&self, event: &Event) -> Result<Message, RelayError> {
        let raw_conversation = event
            .payload_str(FIELD_CONVERSATION_ID)
            .ok_or(RelayError::MissingField(FIELD_CONVERSATION_ID))?;
        let conversation_id: ConversationId = raw_conversation
            .parse()
            .map_err(|_| RelayError::ConversationNotFound(raw_conversation.to_string()))?;

        let body = match event.payload().get(FIELD_BOT_RESPONSE) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(RelayError::MissingField(FIELD_BOT_RESPONSE)),
        };

        // Correlation ids that are not UUIDs stay in the metadata for
        // traceability but cannot resolve to a stored message.
        let originating: Option<MessageId> = event
            .payload_str("message_id")
            .and_then(|s| s.parse().ok());

        let mut metadata = event.payload().clone();
        metadata.remove(FIELD_CONVERSATION_ID);
        metadata.remove(FIELD_BOT_RESPONSE);

        self.store
            .append_assistant_reply(
                conversation_id,
                &body,
                Value::Object(metadata),
                originating,
            )
            .await
    }
}
