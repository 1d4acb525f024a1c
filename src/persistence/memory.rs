//! In-memory implementation of the conversation store.
//!
//! Used when the gateway runs without a database (local development) and
//! as the store double in tests. Matches [`super::postgres::PostgresStore`]
//! semantics, including the both-or-neither behavior of the reply append:
//! every precondition is checked before the first mutation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::models::{Conversation, Message, SenderType};
use super::ConversationStore;
use crate::domain::{AccountId, ConversationId, MessageId};
use crate::error::RelayError;

#[derive(Debug, Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    // Insertion order doubles as creation order.
    messages: Vec<Message>,
}

/// Conversation store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(
        &self,
        account_id: AccountId,
    ) -> Result<Conversation, RelayError> {
        let now = Utc::now();
        let conversation = Conversation {
            id: ConversationId::new(),
            account_id,
            created_at: now,
            updated_at: now,
        };
        self.state()
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn append_human_message(
        &self,
        conversation_id: ConversationId,
        body: &str,
    ) -> Result<Message, RelayError> {
        let mut state = self.state();
        if !state.conversations.contains_key(&conversation_id) {
            return Err(RelayError::ConversationNotFound(conversation_id.to_string()));
        }
        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_type: SenderType::Human,
            body: body.to_string(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            is_read: false,
            created_at: Utc::now(),
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn append_assistant_reply(
        &self,
        conversation_id: ConversationId,
        body: &str,
        metadata: serde_json::Value,
        originating_message_id: Option<MessageId>,
    ) -> Result<Message, RelayError> {
        let mut state = self.state();

        // All preconditions first; the first mutation happens only once
        // the whole operation is known to succeed.
        if !state.conversations.contains_key(&conversation_id) {
            return Err(RelayError::ConversationNotFound(conversation_id.to_string()));
        }
        if let Some(originating) = originating_message_id {
            let found = state.messages.iter().any(|m| {
                m.id == originating
                    && m.conversation_id == conversation_id
                    && m.sender_type == SenderType::Human
            });
            if !found {
                return Err(RelayError::MessageNotFound(originating));
            }
        }

        let now = Utc::now();
        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_type: SenderType::Assistant,
            body: body.to_string(),
            metadata,
            is_read: false,
            created_at: now,
        };
        state.messages.push(message.clone());

        if let Some(originating) = originating_message_id {
            for m in &mut state.messages {
                if m.id == originating {
                    m.is_read = true;
                }
            }
        }
        if let Some(conversation) = state.conversations.get_mut(&conversation_id) {
            conversation.updated_at = now;
        }

        Ok(message)
    }

    async fn unread_count(&self, account_id: AccountId) -> Result<i64, RelayError> {
        let state = self.state();
        let count = state
            .messages
            .iter()
            .filter(|m| {
                m.sender_type == SenderType::Assistant
                    && !m.is_read
                    && state
                        .conversations
                        .get(&m.conversation_id)
                        .is_some_and(|c| c.account_id == account_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn mark_read(&self, message_id: MessageId) -> Result<(), RelayError> {
        let mut state = self.state();
        let message = state
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(RelayError::MessageNotFound(message_id))?;
        message.is_read = true;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RelayError> {
        let state = self.state();
        if !state.conversations.contains_key(&conversation_id) {
            return Err(RelayError::ConversationNotFound(conversation_id.to_string()));
        }
        Ok(state
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store_with_conversation() -> (MemoryStore, Conversation) {
        let store = MemoryStore::new();
        let conversation = store.create_conversation(AccountId::new()).await;
        let Ok(conversation) = conversation else {
            panic!("conversation creation failed");
        };
        (store, conversation)
    }

    #[tokio::test]
    async fn reply_marks_originating_message_read() {
        let (store, conversation) = store_with_conversation().await;
        let Ok(human) = store.append_human_message(conversation.id, "question").await else {
            panic!("human append failed");
        };

        let reply = store
            .append_assistant_reply(conversation.id, "answer", json!({}), Some(human.id))
            .await;
        let Ok(reply) = reply else {
            panic!("reply append failed");
        };
        assert_eq!(reply.sender_type, SenderType::Assistant);
        assert!(!reply.is_read);

        let Ok(messages) = store.list_messages(conversation.id).await else {
            panic!("list failed");
        };
        let Some(stored_human) = messages.iter().find(|m| m.id == human.id) else {
            panic!("human message lost");
        };
        assert!(stored_human.is_read);
    }

    #[tokio::test]
    async fn failed_reply_commits_neither_write() {
        let (store, conversation) = store_with_conversation().await;
        let Ok(human) = store.append_human_message(conversation.id, "question").await else {
            panic!("human append failed");
        };

        // Originating id that resolves to no message: the whole append
        // must fail without storing the reply or touching read state.
        let bogus = MessageId::new();
        let result = store
            .append_assistant_reply(conversation.id, "answer", json!({}), Some(bogus))
            .await;
        assert!(matches!(result, Err(RelayError::MessageNotFound(_))));

        let Ok(messages) = store.list_messages(conversation.id).await else {
            panic!("list failed");
        };
        assert_eq!(messages.len(), 1);
        let Some(stored_human) = messages.iter().find(|m| m.id == human.id) else {
            panic!("human message lost");
        };
        assert!(!stored_human.is_read);
    }

    #[tokio::test]
    async fn reply_to_unknown_conversation_fails() {
        let store = MemoryStore::new();
        let result = store
            .append_assistant_reply(ConversationId::new(), "answer", json!({}), None)
            .await;
        assert!(matches!(result, Err(RelayError::ConversationNotFound(_))));
    }

    #[tokio::test]
    async fn unread_count_tracks_assistant_messages_per_account() {
        let (store, conversation) = store_with_conversation().await;
        let account = conversation.account_id;
        assert_eq!(store.unread_count(account).await.unwrap_or(-1), 0);

        let Ok(first) = store
            .append_assistant_reply(conversation.id, "one", json!({}), None)
            .await
        else {
            panic!("append failed");
        };
        let Ok(_second) = store
            .append_assistant_reply(conversation.id, "two", json!({}), None)
            .await
        else {
            panic!("append failed");
        };
        assert_eq!(store.unread_count(account).await.unwrap_or(-1), 2);

        // Another account's conversations do not bleed into the count.
        assert_eq!(store.unread_count(AccountId::new()).await.unwrap_or(-1), 0);

        // Human messages never count as unread assistant messages.
        let Ok(_human) = store.append_human_message(conversation.id, "hm").await else {
            panic!("append failed");
        };
        assert_eq!(store.unread_count(account).await.unwrap_or(-1), 2);

        let Ok(()) = store.mark_read(first.id).await else {
            panic!("mark_read failed");
        };
        assert_eq!(store.unread_count(account).await.unwrap_or(-1), 1);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_never_reverses() {
        let (store, conversation) = store_with_conversation().await;
        let Ok(reply) = store
            .append_assistant_reply(conversation.id, "one", json!({}), None)
            .await
        else {
            panic!("append failed");
        };

        let Ok(()) = store.mark_read(reply.id).await else {
            panic!("first mark_read failed");
        };
        let Ok(()) = store.mark_read(reply.id).await else {
            panic!("second mark_read failed");
        };

        let Ok(messages) = store.list_messages(conversation.id).await else {
            panic!("list failed");
        };
        assert!(messages.iter().all(|m| m.id != reply.id || m.is_read));
        assert_eq!(
            store.unread_count(conversation.account_id).await.unwrap_or(-1),
            0
        );
    }

    #[tokio::test]
    async fn mark_read_unknown_message_fails() {
        let store = MemoryStore::new();
        let result = store.mark_read(MessageId::new()).await;
        assert!(matches!(result, Err(RelayError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn reply_refreshes_conversation_updated_at() {
        let (store, conversation) = store_with_conversation().await;
        let before = conversation.updated_at;

        let Ok(_human) = store.append_human_message(conversation.id, "q").await else {
            panic!("append failed");
        };
        let Ok(_reply) = store
            .append_assistant_reply(conversation.id, "a", json!({}), None)
            .await
        else {
            panic!("append failed");
        };

        let updated_at = store.state().conversations.get(&conversation.id).map(|c| c.updated_at);
        let Some(updated_at) = updated_at else {
            panic!("conversation lost");
        };
        assert!(updated_at >= before);
    }
}
