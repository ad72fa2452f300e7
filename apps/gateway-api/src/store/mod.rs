//! Narrow repository contracts over the persistence layer.
//!
//! The gateway consumes these as read-only (memberships, channels) or
//! write-per-call (messages) lookups. Staleness is acceptable: a just-revoked
//! membership is resolved on the next action, never by invalidation push.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Channel, Membership, Message};

/// Unexpected persistence failure. Handlers log these and drop the event;
/// the connection and process survive.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

/// Membership and channel lookups, side-effect-free.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Resolve a user's membership in a server, or `None` if not a member.
    async fn find_membership(
        &self,
        user_id: i64,
        server_id: i64,
    ) -> Result<Option<Membership>, StoreError>;

    /// All user ids belonging to a server.
    async fn server_member_ids(&self, server_id: i64) -> Result<Vec<i64>, StoreError>;

    /// All server ids a user belongs to. Drives the connect/disconnect
    /// presence broadcasts.
    async fn server_ids_of(&self, user_id: i64) -> Result<Vec<i64>, StoreError>;

    /// Resolve a channel to its parent server, or `None` if it doesn't exist.
    async fn find_channel(&self, channel_id: i64) -> Result<Option<Channel>, StoreError>;
}

/// Message persistence. Each operation returns the persisted DTO used in
/// broadcasts; at most one write happens per accepted event.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(
        &self,
        channel_id: i64,
        author_id: i64,
        author_name: &str,
        content: &str,
    ) -> Result<Message, StoreError>;

    async fn find(&self, message_id: i64) -> Result<Option<Message>, StoreError>;

    /// Update a message's content. Returns the updated DTO, or `None` if the
    /// message doesn't exist. `updated_at` always moves forward on success.
    async fn update(&self, message_id: i64, content: &str)
        -> Result<Option<Message>, StoreError>;

    /// Delete a message. Returns the deleted DTO, or `None` if absent.
    async fn delete(&self, message_id: i64) -> Result<Option<Message>, StoreError>;
}
