//! In-memory store implementation.
//!
//! Backs the gateway until a SQL-backed store is wired in, and serves as the
//! fixture store in tests. The mutator methods stand in for the REST layer's
//! CRUD side effects (the gateway itself never calls them).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use parlor_common::SnowflakeGenerator;

use crate::models::{Channel, Membership, Message, Role};

use super::{MembershipDirectory, MessageRepository, StoreError};

pub struct MemoryStore {
    /// (server_id, user_id) → role.
    memberships: RwLock<HashMap<(i64, i64), Role>>,
    /// channel_id → server_id.
    channels: RwLock<HashMap<i64, i64>>,
    messages: RwLock<HashMap<i64, Message>>,
    snowflake: SnowflakeGenerator,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            memberships: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            snowflake: SnowflakeGenerator::new(0),
        }
    }

    /// Add or replace a membership (also how a role change lands).
    pub fn add_member(&self, server_id: i64, user_id: i64, role: Role) {
        self.memberships.write().insert((server_id, user_id), role);
    }

    pub fn remove_member(&self, server_id: i64, user_id: i64) {
        self.memberships.write().remove(&(server_id, user_id));
    }

    pub fn add_channel(&self, channel_id: i64, server_id: i64) {
        self.channels.write().insert(channel_id, server_id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipDirectory for MemoryStore {
    async fn find_membership(
        &self,
        user_id: i64,
        server_id: i64,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .memberships
            .read()
            .get(&(server_id, user_id))
            .map(|&role| Membership {
                server_id,
                user_id,
                role,
            }))
    }

    async fn server_member_ids(&self, server_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .memberships
            .read()
            .keys()
            .filter(|(sid, _)| *sid == server_id)
            .map(|(_, uid)| *uid)
            .collect())
    }

    async fn server_ids_of(&self, user_id: i64) -> Result<Vec<i64>, StoreError> {
        Ok(self
            .memberships
            .read()
            .keys()
            .filter(|(_, uid)| *uid == user_id)
            .map(|(sid, _)| *sid)
            .collect())
    }

    async fn find_channel(&self, channel_id: i64) -> Result<Option<Channel>, StoreError> {
        Ok(self
            .channels
            .read()
            .get(&channel_id)
            .map(|&server_id| Channel {
                id: channel_id,
                server_id,
            }))
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(
        &self,
        channel_id: i64,
        author_id: i64,
        author_name: &str,
        content: &str,
    ) -> Result<Message, StoreError> {
        let now = Utc::now();
        let message = Message {
            id: self.snowflake.generate(),
            channel_id,
            author_id,
            author_name: author_name.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.messages.write().insert(message.id, message.clone());
        Ok(message)
    }

    async fn find(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.read().get(&message_id).cloned())
    }

    async fn update(
        &self,
        message_id: i64,
        content: &str,
    ) -> Result<Option<Message>, StoreError> {
        let mut messages = self.messages.write();
        Ok(messages.get_mut(&message_id).map(|m| {
            m.content = content.to_string();
            m.updated_at = Utc::now();
            m.clone()
        }))
    }

    async fn delete(&self, message_id: i64) -> Result<Option<Message>, StoreError> {
        Ok(self.messages.write().remove(&message_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn membership_lookup_reflects_role_changes() {
        let store = MemoryStore::new();
        store.add_member(1, 10, Role::Member);

        let m = store.find_membership(10, 1).await.unwrap().unwrap();
        assert_eq!(m.role, Role::Member);

        store.add_member(1, 10, Role::Admin);
        let m = store.find_membership(10, 1).await.unwrap().unwrap();
        assert_eq!(m.role, Role::Admin);

        store.remove_member(1, 10);
        assert!(store.find_membership(10, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_and_user_scans() {
        let store = MemoryStore::new();
        store.add_member(1, 10, Role::Owner);
        store.add_member(1, 11, Role::Member);
        store.add_member(2, 10, Role::Member);

        let mut members = store.server_member_ids(1).await.unwrap();
        members.sort();
        assert_eq!(members, vec![10, 11]);

        let mut servers = store.server_ids_of(10).await.unwrap();
        servers.sort();
        assert_eq!(servers, vec![1, 2]);
    }

    #[tokio::test]
    async fn channel_resolution() {
        let store = MemoryStore::new();
        store.add_channel(5, 1);

        let ch = store.find_channel(5).await.unwrap().unwrap();
        assert_eq!(ch.server_id, 1);
        assert!(store.find_channel(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn message_lifecycle() {
        let store = MemoryStore::new();

        let created = store.create(5, 10, "alice", "hi").await.unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let updated = store.update(created.id, "edited").await.unwrap().unwrap();
        assert_eq!(updated.content, "edited");
        assert!(updated.updated_at > updated.created_at);

        let deleted = store.delete(created.id).await.unwrap().unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(store.find(created.id).await.unwrap().is_none());

        // Deleting again is a no-op.
        assert!(store.delete(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_missing_message_returns_none() {
        let store = MemoryStore::new();
        assert!(store.update(42, "x").await.unwrap().is_none());
    }
}
