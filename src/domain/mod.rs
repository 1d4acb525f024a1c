//! Domain layer: canonical events, the publish/subscribe bus, identifier
//! newtypes, and webhook payload normalization.
//!
//! Everything that flows between the webhook ingestion path and the push
//! streams is expressed in this module's types; external payload shapes
//! never leak past [`normalizer::normalize`].

pub mod event;
pub mod event_bus;
pub mod ids;
pub mod normalizer;

pub use event::{Event, EventKind};
pub use event_bus::{EventBus, Unsubscribe};
pub use ids::{AccountId, ConversationId, MessageId};
pub use normalizer::normalize;
