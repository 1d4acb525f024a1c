//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Holds the process-wide relay service (and through it the event bus
/// subscriber set), so every webhook-handling request can reach the
/// streams opened by other requests.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay service for ingestion, persistence, and fan-out.
    pub relay_service: Arc<RelayService>,
    /// Interval between heartbeat `ping` events on open push streams.
    pub heartbeat_interval: Duration,
}
