//! DTOs for the unread-count endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Unread-count response for the authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    /// Always `true`; failures use the structured error shape instead.
    pub success: bool,
    /// Number of unread assistant messages across the account's
    /// conversations.
    #[serde(rename = "unreadCount")]
    pub unread_count: i64,
}
