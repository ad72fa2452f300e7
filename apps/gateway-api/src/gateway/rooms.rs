//! Room keys: broadcast scopes over active connections.
//!
//! A room is not a stored entity — purely a grouping key a connection joins
//! after the membership guard passes.

use std::fmt;

/// A broadcast scope, server- or channel-level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    Server(i64),
    Channel(i64),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Server(id) => write!(f, "server:{id}"),
            RoomKey::Channel(id) => write!(f, "channel:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_convention() {
        assert_eq!(RoomKey::Server(1).to_string(), "server:1");
        assert_eq!(RoomKey::Channel(5).to_string(), "channel:5");
    }

    #[test]
    fn kinds_with_same_id_are_distinct() {
        assert_ne!(RoomKey::Server(5), RoomKey::Channel(5));
    }
}
