//! DTOs for the webhook ingestion endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Acknowledgement returned to the external job on successful ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// Always `true`; failures use the structured error shape instead.
    pub ok: bool,
}
