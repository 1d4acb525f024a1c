//! Persistence layer: the durable conversation message log with
//! read/unread state.
//!
//! [`ConversationStore`] is the seam between the relay and the database.
//! The production implementation is [`postgres::PostgresStore`] over
//! `sqlx::PgPool`; [`memory::MemoryStore`] provides the same semantics
//! without a database for local development and tests.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use models::{Conversation, Message, SenderType};
pub use postgres::PostgresStore;

use crate::domain::{AccountId, ConversationId, MessageId};
use crate::error::RelayError;

/// Durable log of inbound and outbound messages per conversation.
///
/// Implementations must keep the read-state invariants: `is_read` only
/// transitions false→true, and the reply-append path applies its two
/// writes (insert reply, mark originating message read) atomically.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates a new conversation owned by the given account.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn create_conversation(&self, account_id: AccountId)
    -> Result<Conversation, RelayError>;

    /// Appends a human-authored message to a conversation.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConversationNotFound`] if the conversation
    /// does not exist, or [`RelayError::Persistence`] on storage failure.
    async fn append_human_message(
        &self,
        conversation_id: ConversationId,
        body: &str,
    ) -> Result<Message, RelayError>;

    /// Appends an assistant reply with `is_read = false`, refreshes the
    /// conversation's `updated_at`, and, when `originating_message_id` is
    /// present, marks that human message read.
    ///
    /// The writes are atomic: either the reply is stored and the
    /// originating message is marked read, or neither change commits.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConversationNotFound`] if the conversation
    /// does not exist, [`RelayError::MessageNotFound`] if the originating
    /// message does not exist, or [`RelayError::Persistence`] on storage
    /// failure.
    async fn append_assistant_reply(
        &self,
        conversation_id: ConversationId,
        body: &str,
        metadata: serde_json::Value,
        originating_message_id: Option<MessageId>,
    ) -> Result<Message, RelayError>;

    /// Counts unread assistant messages across all of an account's
    /// conversations.
    ///
    /// Reflects committed state immediately: any reply appended for this
    /// account's conversations is visible to the next call.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] on storage failure.
    async fn unread_count(&self, account_id: AccountId) -> Result<i64, RelayError>;

    /// Marks a message read. Idempotent: a message already read stays
    /// read, and the transition never reverses.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MessageNotFound`] if the message does not
    /// exist, or [`RelayError::Persistence`] on storage failure.
    async fn mark_read(&self, message_id: MessageId) -> Result<(), RelayError>;

    /// Lists a conversation's messages in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConversationNotFound`] if the conversation
    /// does not exist, or [`RelayError::Persistence`] on storage failure.
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RelayError>;
}
