//! Conversation and message rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, ConversationId, MessageId};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    /// A platform member.
    Human,
    /// The conversational-assistant backend.
    Assistant,
}

impl SenderType {
    /// Returns the database string for this sender type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Assistant => "assistant",
        }
    }

    /// Parses a database string back into a sender type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Self::Human),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A logical thread between one account and the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Owning account.
    pub account_id: AccountId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Refreshed once per inbound+outbound message pair.
    pub updated_at: DateTime<Utc>,
}

/// One message within a conversation.
///
/// Append-only: `body` is never mutated after creation, and `is_read`
/// transitions only false→true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// Who authored the message.
    pub sender_type: SenderType,
    /// Message text.
    pub body: String,
    /// Free-form metadata: confidence score, source citations,
    /// originating-request correlation id.
    pub metadata: serde_json::Value,
    /// Whether the recipient has seen this message.
    pub is_read: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn sender_type_round_trips() {
        assert_eq!(SenderType::parse("human"), Some(SenderType::Human));
        assert_eq!(SenderType::parse("assistant"), Some(SenderType::Assistant));
        assert_eq!(SenderType::parse("bot"), None);
        assert_eq!(SenderType::Assistant.as_str(), "assistant");
    }

    #[test]
    fn message_serializes_sender_as_snake_case() {
        let message = Message {
            id: MessageId::new(),
            conversation_id: ConversationId::new(),
            sender_type: SenderType::Assistant,
            body: "hi".to_string(),
            metadata: serde_json::json!({}),
            is_read: false,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&message).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json.get("sender_type"), Some(&serde_json::json!("assistant")));
        assert_eq!(json.get("is_read"), Some(&serde_json::json!(false)));
    }
}
