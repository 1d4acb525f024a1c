//! Service layer: business logic orchestration.
//!
//! [`RelayService`] coordinates webhook ingestion, delegates durability to
//! the [`crate::persistence::ConversationStore`], and emits events through
//! the [`crate::domain::EventBus`].

pub mod relay_service;

pub use relay_service::RelayService;
