//! PostgreSQL implementation of the conversation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Conversation, Message, SenderType};
use super::ConversationStore;
use crate::domain::{AccountId, ConversationId, MessageId};
use crate::error::RelayError;

type MessageRow = (
    Uuid,
    Uuid,
    String,
    String,
    serde_json::Value,
    bool,
    DateTime<Utc>,
);

/// PostgreSQL-backed conversation store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence_err(e: sqlx::Error) -> RelayError {
    RelayError::Persistence(e.to_string())
}

fn decode_message(row: MessageRow) -> Result<Message, RelayError> {
    let (id, conversation_id, sender_type, body, metadata, is_read, created_at) = row;
    let sender_type = SenderType::parse(&sender_type)
        .ok_or_else(|| RelayError::Persistence(format!("unknown sender_type: {sender_type}")))?;
    Ok(Message {
        id: MessageId::from_uuid(id),
        conversation_id: ConversationId::from_uuid(conversation_id),
        sender_type,
        body,
        metadata,
        is_read,
        created_at,
    })
}

#[async_trait]
impl ConversationStore for PostgresStore {
    async fn create_conversation(
        &self,
        account_id: AccountId,
    ) -> Result<Conversation, RelayError> {
        let id = ConversationId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO conversations (id, account_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $3)",
        )
        .bind(id.as_uuid())
        .bind(account_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(persistence_err)?;

        Ok(Conversation {
            id,
            account_id,
            created_at: now,
            updated_at: now,
        })
    }

    async fn append_human_message(
        &self,
        conversation_id: ConversationId,
        body: &str,
    ) -> Result<Message, RelayError> {
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM conversations WHERE id = $1")
            .bind(conversation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence_err)?;
        if exists.is_none() {
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
        insert_message(&self.pool, &message).await?;
        Ok(message)
    }

    async fn append_assistant_reply(
        &self,
        conversation_id: ConversationId,
        body: &str,
        metadata: serde_json::Value,
        originating_message_id: Option<MessageId>,
    ) -> Result<Message, RelayError> {
        let mut tx = self.pool.begin().await.map_err(persistence_err)?;
        let now = Utc::now();

        // The conversation's updated_at is refreshed here, once per
        // inbound+outbound pair; the human-message path leaves it alone.
        let touched = sqlx::query_scalar::<_, Uuid>(
            "UPDATE conversations SET updated_at = $2 WHERE id = $1 RETURNING id",
        )
        .bind(conversation_id.as_uuid())
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(persistence_err)?;
        if touched.is_none() {
            return Err(RelayError::ConversationNotFound(conversation_id.to_string()));
        }

        let message = Message {
            id: MessageId::new(),
            conversation_id,
            sender_type: SenderType::Assistant,
            body: body.to_string(),
            metadata,
            is_read: false,
            created_at: now,
        };
        sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_type, body, metadata, is_read, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(message.id.as_uuid())
        .bind(conversation_id.as_uuid())
        .bind(message.sender_type.as_str())
        .bind(&message.body)
        .bind(&message.metadata)
        .bind(message.is_read)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await
        .map_err(persistence_err)?;

        if let Some(originating) = originating_message_id {
            let result = sqlx::query(
                "UPDATE messages SET is_read = TRUE \
                 WHERE id = $1 AND conversation_id = $2 AND sender_type = 'human'",
            )
            .bind(originating.as_uuid())
            .bind(conversation_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(persistence_err)?;
            if result.rows_affected() == 0 {
                // Transaction dropped here, so the reply insert above
                // rolls back with it.
                return Err(RelayError::MessageNotFound(originating));
            }
        }

        tx.commit().await.map_err(persistence_err)?;
        Ok(message)
    }

    async fn unread_count(&self, account_id: AccountId) -> Result<i64, RelayError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages m \
             JOIN conversations c ON c.id = m.conversation_id \
             WHERE c.account_id = $1 AND m.sender_type = 'assistant' AND m.is_read = FALSE",
        )
        .bind(account_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(persistence_err)
    }

    async fn mark_read(&self, message_id: MessageId) -> Result<(), RelayError> {
        let result = sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1")
            .bind(message_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence_err)?;
        if result.rows_affected() == 0 {
            return Err(RelayError::MessageNotFound(message_id));
        }
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, RelayError> {
        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM conversations WHERE id = $1")
            .bind(conversation_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence_err)?;
        if exists.is_none() {
            return Err(RelayError::ConversationNotFound(conversation_id.to_string()));
        }

        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, conversation_id, sender_type, body, metadata, is_read, created_at \
             FROM messages WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(conversation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(persistence_err)?;

        rows.into_iter().map(decode_message).collect()
    }
}

async fn insert_message(pool: &PgPool, message: &Message) -> Result<(), RelayError> {
    sqlx::query(
        "INSERT INTO messages (id, conversation_id, sender_type, body, metadata, is_read, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(message.id.as_uuid())
    .bind(message.conversation_id.as_uuid())
    .bind(message.sender_type.as_str())
    .bind(&message.body)
    .bind(&message.metadata)
    .bind(message.is_read)
    .bind(message.created_at)
    .execute(pool)
    .await
    .map_err(persistence_err)?;
    Ok(())
}
