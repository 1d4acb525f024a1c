//! Streaming layer: long-lived SSE push connections.
//!
//! The endpoint at `/api/v1/events` holds a hanging GET open
//! indefinitely and forwards every published event to the client as a
//! `data: <json>` frame.

pub mod channel;
pub mod handler;

pub use channel::StreamChannel;
