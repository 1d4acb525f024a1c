//! # relay-gateway
//!
//! Asynchronous event relay for a content/membership platform: webhook
//! ingestion, live SSE fan-out, and the durable conversation inbox.
//!
//! Long-running external jobs (assistant replies, transcription) report
//! back out-of-band via webhooks; this service reconciles those callbacks
//! with long-lived browser push streams and a per-conversation message
//! log with read/unread state. Page rendering, auth mechanics, and the
//! SaaS integrations around it are external collaborators.
//!
//! ## Architecture
//!
//! ```text
//! External jobs (webhooks)          Browsers (SSE)
//!     │                                 │
//!     ├── Webhook Handler (api/)        ├── StreamChannel (sse/)
//!     │                                 │
//!     ├── RelayService (service/)       │
//!     │       │                         │
//!     │       ├── normalize (domain/) ──┤
//!     │       ├── EventBus (domain/) ───┘
//!     │       │
//!     └────── ConversationStore (persistence/)
//!                 ├── PostgresStore
//!                 └── MemoryStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod sse;
