//! Canonical relay events.
//!
//! Every unit of information flowing through the [`super::EventBus`] is an
//! [`Event`]: a kind tag plus an opaque JSON payload. Events are produced
//! by the webhook normalizer or synthesized by the streaming layer
//! (`connected`, `ping`) and are never persisted.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Discriminator for the kind of a relay [`Event`].
///
/// Serialized as a plain string (`"job-complete"`, `"assistant-reply"`, ...).
/// Unknown strings round-trip through [`EventKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Synthetic first event on a freshly opened push stream.
    Connected,
    /// Periodic heartbeat on an open push stream.
    Ping,
    /// An external job finished successfully.
    JobComplete,
    /// An external job hit its deadline.
    JobTimeout,
    /// An external job failed.
    JobError,
    /// The assistant backend produced a reply for a conversation.
    AssistantReply,
    /// Any other callback type, fanned out verbatim.
    Custom(String),
}

impl EventKind {
    /// Returns the wire string for this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Ping => "ping",
            Self::JobComplete => "job-complete",
            Self::JobTimeout => "job-timeout",
            Self::JobError => "job-error",
            Self::AssistantReply => "assistant-reply",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "connected" => Self::Connected,
            "ping" => Self::Ping,
            "job-complete" => Self::JobComplete,
            "job-timeout" => Self::JobTimeout,
            "job-error" => Self::JobError,
            "assistant-reply" => Self::AssistantReply,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// One unit of information flowing through the bus.
///
/// Immutable once constructed. Serializes to a single JSON object with a
/// `type` field carrying the kind and the payload entries flattened in:
///
/// ```json
/// {"type": "assistant-reply", "conversation_id": "...", "bot_response": "..."}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Event {
    /// Creates an event of the given kind with an opaque payload.
    #[must_use]
    pub const fn new(kind: EventKind, payload: Map<String, Value>) -> Self {
        Self { kind, payload }
    }

    /// Synthetic event sent as the first frame of a push stream so the
    /// client can confirm liveness before any real event arrives.
    #[must_use]
    pub fn connected() -> Self {
        Self::new(EventKind::Connected, Map::new())
    }

    /// Heartbeat event emitted at a fixed interval on open push streams.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(EventKind::Ping, Map::new())
    }

    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Returns the opaque payload mapping.
    #[must_use]
    pub const fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Returns a payload field as a string slice, if present and a string.
    #[must_use]
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}
