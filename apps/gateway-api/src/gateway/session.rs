//! Per-connection gateway session state.

use std::collections::HashSet;

use parlor_common::id::{prefix, prefixed_ulid};

use crate::auth::AuthedUser;

use super::rooms::RoomKey;

/// State for a single WebSocket connection. The user identity is fixed at
/// handshake time; only the joined-room set changes afterwards, and only
/// from within the connection's own event loop.
pub struct GatewaySession {
    /// Unique connection identifier (`cn_` prefixed ULID).
    pub connection_id: String,
    /// Authenticated user ID (immutable after handshake).
    pub user_id: i64,
    /// Authenticated username (cached at handshake time).
    pub username: String,
    /// Rooms this connection has joined.
    rooms: HashSet<RoomKey>,
}

impl GatewaySession {
    pub fn new(user: AuthedUser) -> Self {
        Self {
            connection_id: prefixed_ulid(prefix::CONNECTION),
            user_id: user.user_id,
            username: user.username,
            rooms: HashSet::new(),
        }
    }

    /// Join a room. Returns `false` if already joined (idempotent).
    pub fn join(&mut self, room: RoomKey) -> bool {
        self.rooms.insert(room)
    }

    /// Whether this connection should receive events for a given room.
    pub fn is_joined(&self, room: &RoomKey) -> bool {
        self.rooms.contains(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GatewaySession {
        GatewaySession::new(AuthedUser {
            user_id: 10,
            username: "alice".to_string(),
        })
    }

    #[test]
    fn join_is_idempotent() {
        let mut s = session();
        assert!(s.join(RoomKey::Server(1)));
        assert!(!s.join(RoomKey::Server(1)));
        assert!(s.is_joined(&RoomKey::Server(1)));
    }

    #[test]
    fn unjoined_rooms_are_not_subscribed() {
        let mut s = session();
        s.join(RoomKey::Channel(5));
        assert!(!s.is_joined(&RoomKey::Server(5)));
        assert!(!s.is_joined(&RoomKey::Channel(6)));
    }

    #[test]
    fn connection_ids_are_unique() {
        assert_ne!(session().connection_id, session().connection_id);
    }
}
