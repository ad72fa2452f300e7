use chrono::{DateTime, Utc};
use serde::Serialize;

/// Persisted message DTO, produced by the repository after a create/update.
///
/// Broadcast payloads are always built from this value, never assembled ad
/// hoc, so the stored and broadcast state cannot diverge. Clients derive the
/// "edited" flag from `created_at != updated_at`.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: i64,
    pub channel_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
