//! Webhook payload normalization.
//!
//! External jobs report back with heterogeneous JSON bodies: a single
//! object, or a single-element array wrapping the object (an upstream
//! batch format kept for compatibility). [`normalize`] validates and maps
//! whatever arrives into one canonical [`Event`] before any further logic
//! touches it; downstream code never branches on raw external shape.
//!
//! Pure transformation: all persistence and broadcast side effects happen
//! in the caller after a successful normalization.

use serde_json::{Map, Value};

use super::{Event, EventKind};
use crate::error::RelayError;

/// Required field carrying the target conversation of an assistant reply.
pub const FIELD_CONVERSATION_ID: &str = "conversation_id";

/// Required field carrying the generated reply body (post-mapping).
pub const FIELD_BOT_RESPONSE: &str = "bot_response";

/// Normalizes a raw external callback body into a canonical [`Event`].
///
/// Status-only callbacks (`stt.complete`, `stt.timeout`, `stt.error`) fan
/// out essentially as received under the matching kind, with no field
/// remapping. Anything else with an explicit `type` becomes a
/// [`EventKind::Custom`] event. Bodies without a `type` are assistant
/// replies and must carry `conversation_id` and `bot_response`.
///
/// When the array form is used, a field literally named `output` is mapped
/// onto the canonical `bot_response` field before further processing. This
/// is a fixed compatibility rule for one upstream batch format, not a
/// general renaming mechanism.
///
/// # Errors
///
/// Returns [`RelayError::MalformedPayload`] when the body is not an object
/// or a non-empty array of objects, and [`RelayError::MissingField`] when
/// an assistant reply lacks a required field.
pub fn normalize(raw: &Value) -> Result<Event, RelayError> {
    let mut payload = unwrap_shape(raw)?;

    if let Some(kind) = classify_status(&payload) {
        return Ok(Event::new(kind, payload));
    }

    let conversation_id = payload
        .get(FIELD_CONVERSATION_ID)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty());
    if conversation_id.is_none() {
        return Err(RelayError::MissingField(FIELD_CONVERSATION_ID));
    }
    if !payload.contains_key(FIELD_BOT_RESPONSE) {
        return Err(RelayError::MissingField(FIELD_BOT_RESPONSE));
    }

    // Drop a leftover alias so downstream consumers see one canonical key.
    payload.remove("output");

    Ok(Event::new(EventKind::AssistantReply, payload))
}

/// Unwraps the two accepted body shapes into a payload mapping.
///
/// Array form takes the first element and applies the `output` →
/// `bot_response` compatibility mapping; object form is taken as-is.
fn unwrap_shape(raw: &Value) -> Result<Map<String, Value>, RelayError> {
    match raw {
        Value::Object(map) => Ok(map.clone()),
        Value::Array(items) => {
            let first = items
                .first()
                .ok_or_else(|| RelayError::MalformedPayload("empty array body".to_string()))?;
            let Value::Object(map) = first else {
                return Err(RelayError::MalformedPayload(
                    "array body must wrap a single object".to_string(),
                ));
            };
            let mut map = map.clone();
            if !map.contains_key(FIELD_BOT_RESPONSE)
                && let Some(output) = map.remove("output")
            {
                map.insert(FIELD_BOT_RESPONSE.to_string(), output);
            }
            Ok(map)
        }
        other => Err(RelayError::MalformedPayload(format!(
            "expected object or array body, got {other}"
        ))),
    }
}

/// Classifies an explicit `type` field into an event kind, if present.
fn classify_status(payload: &Map<String, Value>) -> Option<EventKind> {
    let kind = match payload.get("type").and_then(Value::as_str)? {
        "stt.complete" => EventKind::JobComplete,
        "stt.timeout" => EventKind::JobTimeout,
        "stt.error" => EventKind::JobError,
        other => EventKind::Custom(other.to_string()),
    };
    Some(kind)
}
