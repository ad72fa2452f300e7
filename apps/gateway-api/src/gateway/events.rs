//! Wire-format messages: the `{t, d}` envelope, inbound event kinds, and
//! outbound payload shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::Message;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A message sent from the server to the client over WebSocket.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    pub t: String,
    pub d: Value,
}

impl GatewayMessage {
    pub fn event(name: &str, data: Value) -> Self {
        Self {
            t: name.to_string(),
            d: data,
        }
    }

    /// Action-level authorization failure, scoped to the acting connection.
    pub fn permission_error() -> Self {
        Self::event(
            EventName::ERROR_PERMISSION,
            serde_json::json!({ "code": code::FORBIDDEN }),
        )
    }

    /// Referenced entity does not exist.
    pub fn not_found(code: &str) -> Self {
        Self::event(
            EventName::ERROR_NOT_FOUND,
            serde_json::json!({ "code": code }),
        )
    }
}

/// A message received from the client over WebSocket.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    pub t: String,
    #[serde(default)]
    pub d: Value,
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ServerJoinPayload {
    pub server_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChannelJoinPayload {
    pub channel_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TypingPayload {
    pub channel_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct MessageCreatePayload {
    pub channel_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageUpdatePayload {
    pub message_id: i64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageDeletePayload {
    pub message_id: i64,
}

/// The seven inbound event kinds, one per handler.
#[derive(Debug)]
pub enum InboundEvent {
    ServerJoin(ServerJoinPayload),
    ChannelJoin(ChannelJoinPayload),
    TypingStart(TypingPayload),
    TypingStop(TypingPayload),
    MessageCreate(MessageCreatePayload),
    MessageUpdate(MessageUpdatePayload),
    MessageDelete(MessageDeletePayload),
}

impl InboundEvent {
    /// Match an envelope against the known event names.
    ///
    /// Returns `None` for an unknown name (the caller ignores it) and
    /// `Some(Err(_))` for a known name with a malformed payload.
    pub fn parse(envelope: ClientEnvelope) -> Option<Result<Self, serde_json::Error>> {
        let d = envelope.d;
        Some(match envelope.t.as_str() {
            "server:join" => serde_json::from_value(d).map(InboundEvent::ServerJoin),
            "channel:join" => serde_json::from_value(d).map(InboundEvent::ChannelJoin),
            "typing:start" => serde_json::from_value(d).map(InboundEvent::TypingStart),
            "typing:stop" => serde_json::from_value(d).map(InboundEvent::TypingStop),
            "message:create" => serde_json::from_value(d).map(InboundEvent::MessageCreate),
            "message:update" => serde_json::from_value(d).map(InboundEvent::MessageUpdate),
            "message:delete" => serde_json::from_value(d).map(InboundEvent::MessageDelete),
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Event names dispatched to clients.
pub struct EventName;

impl EventName {
    pub const SERVER_JOINED: &'static str = "server:joined";
    pub const CHANNEL_JOINED: &'static str = "channel:joined";
    pub const PRESENCE_UPDATE: &'static str = "presence:update";
    pub const TYPING_UPDATE: &'static str = "typing:update";
    pub const MESSAGE_NEW: &'static str = "message:new";
    pub const MESSAGE_UPDATED: &'static str = "message:updated";
    pub const MESSAGE_DELETED: &'static str = "message:deleted";
    pub const ERROR_PERMISSION: &'static str = "error:permission";
    pub const ERROR_NOT_FOUND: &'static str = "error:not_found";
}

/// Wire error codes.
pub mod code {
    pub const FORBIDDEN: &str = "E_FORBIDDEN";
    pub const CHANNEL_NOT_FOUND: &str = "E_CHANNEL_NOT_FOUND";
    pub const MESSAGE_NOT_FOUND: &str = "E_MESSAGE_NOT_FOUND";
}

/// `message:new` / `message:updated` payload.
#[derive(Debug, Serialize)]
pub struct MessagePayload {
    pub id: i64,
    pub channel_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: MessageAuthor,
}

#[derive(Debug, Serialize)]
pub struct MessageAuthor {
    pub id: i64,
    pub username: String,
}

impl From<&Message> for MessagePayload {
    fn from(m: &Message) -> Self {
        Self {
            id: m.id,
            channel_id: m.channel_id,
            content: m.content.clone(),
            created_at: m.created_at,
            updated_at: m.updated_at,
            user: MessageAuthor {
                id: m.author_id,
                username: m.author_name.clone(),
            },
        }
    }
}

/// `typing:update` payload. Ephemeral, never persisted; clients derive
/// "stopped typing" from an explicit `is_typing: false`.
#[derive(Debug, Serialize)]
pub struct TypingUpdate {
    pub channel_id: i64,
    pub user_id: i64,
    pub username: String,
    pub is_typing: bool,
}

/// `presence:update` payload: the full online snapshot for one server.
#[derive(Debug, Serialize)]
pub struct PresenceUpdate {
    pub server_id: i64,
    pub online_user_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(t: &str, d: Value) -> Option<Result<InboundEvent, serde_json::Error>> {
        InboundEvent::parse(ClientEnvelope {
            t: t.to_string(),
            d,
        })
    }

    #[test]
    fn parses_known_events() {
        let ev = parse("server:join", serde_json::json!({"server_id": 1}))
            .unwrap()
            .unwrap();
        assert!(matches!(ev, InboundEvent::ServerJoin(p) if p.server_id == 1));

        let ev = parse(
            "message:create",
            serde_json::json!({"channel_id": 5, "content": "hi"}),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(ev, InboundEvent::MessageCreate(p) if p.content == "hi"));
    }

    #[test]
    fn unknown_event_name_is_none() {
        assert!(parse("voice:join", serde_json::json!({})).is_none());
    }

    #[test]
    fn malformed_payload_is_some_err() {
        let result = parse("server:join", serde_json::json!({"server_id": "one"})).unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn message_payload_shape() {
        let now = Utc::now();
        let message = Message {
            id: 42,
            channel_id: 5,
            author_id: 10,
            author_name: "alice".to_string(),
            content: "hi".to_string(),
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(MessagePayload::from(&message)).unwrap();
        assert_eq!(value["id"], 42);
        assert_eq!(value["channel_id"], 5);
        assert_eq!(value["content"], "hi");
        assert_eq!(value["user"]["id"], 10);
        assert_eq!(value["user"]["username"], "alice");
        assert!(value["created_at"].is_string());
    }

    #[test]
    fn error_events_carry_codes() {
        let perm = serde_json::to_value(GatewayMessage::permission_error()).unwrap();
        assert_eq!(perm["t"], "error:permission");
        assert_eq!(perm["d"]["code"], "E_FORBIDDEN");

        let nf = serde_json::to_value(GatewayMessage::not_found(code::CHANNEL_NOT_FOUND)).unwrap();
        assert_eq!(nf["t"], "error:not_found");
        assert_eq!(nf["d"]["code"], "E_CHANNEL_NOT_FOUND");
    }
}
