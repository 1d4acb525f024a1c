//! DTOs for message log endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{ConversationId, MessageId};
use crate::persistence::{Message, SenderType};

/// One message in a conversation's log.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageDto {
    /// Message identifier.
    #[schema(value_type = uuid::Uuid)]
    pub id: MessageId,
    /// Conversation this message belongs to.
    #[schema(value_type = uuid::Uuid)]
    pub conversation_id: ConversationId,
    /// Who authored the message (`human` or `assistant`).
    #[schema(value_type = String)]
    pub sender_type: SenderType,
    /// Message text.
    pub body: String,
    /// Free-form metadata attached at ingestion time.
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    /// Whether the recipient has seen this message.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_type: message.sender_type,
            body: message.body,
            metadata: message.metadata,
            is_read: message.is_read,
            created_at: message.created_at,
        }
    }
}

/// A conversation's messages in creation order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageListResponse {
    /// Messages, oldest first.
    pub data: Vec<MessageDto>,
}

/// Acknowledgement for the mark-read endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    /// Always `true`; failures use the structured error shape instead.
    pub success: bool,
}
