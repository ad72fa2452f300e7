//! Broadcast hub for dispatching room-scoped events to connected sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each connection subscribes
//! and filters events locally by its joined-room set, so delivery is
//! fire-and-forget: a slow receiver lags and drops events without blocking
//! the broadcast to anyone else.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use super::rooms::RoomKey;

/// Capacity of the broadcast channel. Receivers that fall behind will skip
/// events (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// A payload broadcast to all connected gateway sessions.
#[derive(Debug, Clone)]
pub struct BroadcastPayload {
    /// The room this event is scoped to.
    pub room: RoomKey,
    /// The dispatch event name (e.g. "message:new").
    pub event_name: String,
    pub data: Value,
    /// Connection id that must not receive the event (typing echo
    /// suppression).
    pub exclude: Option<String>,
}

/// The global broadcast hub. Cloneable — store in AppState.
#[derive(Clone)]
pub struct GatewayBroadcast {
    sender: broadcast::Sender<Arc<BroadcastPayload>>,
}

impl GatewayBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the broadcast channel. Each gateway session calls this
    /// once, before entering its event loop.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastPayload>> {
        self.sender.subscribe()
    }

    /// Deliver an event to every connection joined to a room.
    pub fn emit_to_room(&self, room: RoomKey, event_name: &str, data: Value) {
        self.dispatch(BroadcastPayload {
            room,
            event_name: event_name.to_string(),
            data,
            exclude: None,
        });
    }

    /// Like [`emit_to_room`](Self::emit_to_room), but skips one connection.
    pub fn emit_to_room_except(
        &self,
        room: RoomKey,
        event_name: &str,
        data: Value,
        excluded_connection_id: &str,
    ) {
        self.dispatch(BroadcastPayload {
            room,
            event_name: event_name.to_string(),
            data,
            exclude: Some(excluded_connection_id.to_string()),
        });
    }

    /// Entry point for the REST layer: inform a server's connected clients
    /// of a side effect (invite accepted, member banned, ...) without going
    /// through the socket-originated event path.
    pub fn notify_server(&self, server_id: i64, event_name: &str, data: Value) {
        self.emit_to_room(RoomKey::Server(server_id), event_name, data);
    }

    /// Channel-scoped counterpart of [`notify_server`](Self::notify_server).
    pub fn notify_channel(&self, channel_id: i64, event_name: &str, data: Value) {
        self.emit_to_room(RoomKey::Channel(channel_id), event_name, data);
    }

    fn dispatch(&self, payload: BroadcastPayload) {
        // send() returns Err if there are no receivers — that's fine.
        let _ = self.sender.send(Arc::new(payload));
    }
}

impl Default for GatewayBroadcast {
    fn default() -> Self {
        Self::new()
    }
}
