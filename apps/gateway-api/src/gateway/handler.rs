//! Inbound event dispatch: one handler per event kind.
//!
//! Each handler validates authorization against the live store (never a
//! cached role), mutates persistence where the contract says so, and emits
//! room broadcasts through the fanout hub. The returned messages are the
//! direct replies for the acting connection only — errors are never
//! broadcast to a room.

use crate::models::Message;
use crate::store::StoreError;
use crate::AppState;

use super::events::{
    code, ChannelJoinPayload, EventName, GatewayMessage, InboundEvent, MessageCreatePayload,
    MessageDeletePayload, MessagePayload, MessageUpdatePayload, PresenceUpdate, ServerJoinPayload,
    TypingPayload, TypingUpdate,
};
use super::rooms::RoomKey;
use super::session::GatewaySession;

/// Route an inbound event to its handler. Returns the direct replies to send
/// on the acting connection.
pub async fn dispatch_event(
    state: &AppState,
    session: &mut GatewaySession,
    event: InboundEvent,
) -> Vec<GatewayMessage> {
    match event {
        InboundEvent::ServerJoin(p) => handle_server_join(state, session, p).await,
        InboundEvent::ChannelJoin(p) => handle_channel_join(state, session, p).await,
        InboundEvent::TypingStart(p) => handle_typing(state, session, p, true).await,
        InboundEvent::TypingStop(p) => handle_typing(state, session, p, false).await,
        InboundEvent::MessageCreate(p) => handle_message_create(state, session, p).await,
        InboundEvent::MessageUpdate(p) => handle_message_update(state, session, p).await,
        InboundEvent::MessageDelete(p) => handle_message_delete(state, session, p).await,
    }
}

/// Rebuild and broadcast the online snapshot for one server's room.
pub async fn broadcast_presence_snapshot(state: &AppState, server_id: i64) {
    let member_ids = match state.directory.server_member_ids(server_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(?e, server_id, "presence snapshot: member lookup failed");
            return;
        }
    };
    let snapshot = PresenceUpdate {
        server_id,
        online_user_ids: state.presence.online_among(&member_ids),
    };
    state.broadcast.emit_to_room(
        RoomKey::Server(server_id),
        EventName::PRESENCE_UPDATE,
        serde_json::to_value(snapshot).unwrap_or_default(),
    );
}

/// Broadcast presence to every server a user belongs to. Runs on the user's
/// true online/offline edges.
pub async fn broadcast_presence_for_user(state: &AppState, user_id: i64) {
    let server_ids = match state.directory.server_ids_of(user_id).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(?e, user_id, "presence broadcast: server lookup failed");
            return;
        }
    };
    for server_id in server_ids {
        broadcast_presence_snapshot(state, server_id).await;
    }
}

async fn handle_server_join(
    state: &AppState,
    session: &mut GatewaySession,
    payload: ServerJoinPayload,
) -> Vec<GatewayMessage> {
    let membership = match state
        .directory
        .find_membership(session.user_id, payload.server_id)
        .await
    {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "server:join"),
    };
    if membership.is_none() {
        return vec![GatewayMessage::permission_error()];
    }

    // Re-joining only re-acknowledges; the snapshot broadcast fires once.
    if session.join(RoomKey::Server(payload.server_id)) {
        broadcast_presence_snapshot(state, payload.server_id).await;
    }

    vec![GatewayMessage::event(
        EventName::SERVER_JOINED,
        serde_json::json!({ "server_id": payload.server_id }),
    )]
}

async fn handle_channel_join(
    state: &AppState,
    session: &mut GatewaySession,
    payload: ChannelJoinPayload,
) -> Vec<GatewayMessage> {
    let channel = match state.directory.find_channel(payload.channel_id).await {
        Ok(c) => c,
        Err(e) => return drop_on_store_error(e, session, "channel:join"),
    };
    let Some(channel) = channel else {
        return vec![GatewayMessage::not_found(code::CHANNEL_NOT_FOUND)];
    };

    let membership = match state
        .directory
        .find_membership(session.user_id, channel.server_id)
        .await
    {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "channel:join"),
    };
    if membership.is_none() {
        return vec![GatewayMessage::permission_error()];
    }

    session.join(RoomKey::Channel(payload.channel_id));

    vec![GatewayMessage::event(
        EventName::CHANNEL_JOINED,
        serde_json::json!({ "channel_id": payload.channel_id }),
    )]
}

/// Typing is best-effort: any failed lookup silently drops the event, and
/// the sender never receives its own indicator back.
async fn handle_typing(
    state: &AppState,
    session: &mut GatewaySession,
    payload: TypingPayload,
    is_typing: bool,
) -> Vec<GatewayMessage> {
    let Ok(Some(channel)) = state.directory.find_channel(payload.channel_id).await else {
        return Vec::new();
    };
    let Ok(Some(_)) = state
        .directory
        .find_membership(session.user_id, channel.server_id)
        .await
    else {
        return Vec::new();
    };

    let update = TypingUpdate {
        channel_id: payload.channel_id,
        user_id: session.user_id,
        username: session.username.clone(),
        is_typing,
    };
    state.broadcast.emit_to_room_except(
        RoomKey::Channel(payload.channel_id),
        EventName::TYPING_UPDATE,
        serde_json::to_value(update).unwrap_or_default(),
        &session.connection_id,
    );

    Vec::new()
}

async fn handle_message_create(
    state: &AppState,
    session: &mut GatewaySession,
    payload: MessageCreatePayload,
) -> Vec<GatewayMessage> {
    let content = payload.content.trim();
    if content.is_empty() {
        // No validation-error event exists on the wire; drop quietly.
        tracing::debug!(
            connection_id = %session.connection_id,
            channel_id = payload.channel_id,
            "dropping empty message:create"
        );
        return Vec::new();
    }

    let channel = match state.directory.find_channel(payload.channel_id).await {
        Ok(c) => c,
        Err(e) => return drop_on_store_error(e, session, "message:create"),
    };
    let Some(channel) = channel else {
        return vec![GatewayMessage::not_found(code::CHANNEL_NOT_FOUND)];
    };

    let membership = match state
        .directory
        .find_membership(session.user_id, channel.server_id)
        .await
    {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:create"),
    };
    if membership.is_none() {
        return vec![GatewayMessage::permission_error()];
    }

    let message = match state
        .messages
        .create(payload.channel_id, session.user_id, &session.username, content)
        .await
    {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:create"),
    };

    broadcast_message(state, EventName::MESSAGE_NEW, &message);
    Vec::new()
}

async fn handle_message_update(
    state: &AppState,
    session: &mut GatewaySession,
    payload: MessageUpdatePayload,
) -> Vec<GatewayMessage> {
    let content = payload.content.trim();
    if content.is_empty() {
        tracing::debug!(
            connection_id = %session.connection_id,
            message_id = payload.message_id,
            "dropping empty message:update"
        );
        return Vec::new();
    }

    let message = match state.messages.find(payload.message_id).await {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:update"),
    };
    let Some(message) = message else {
        return vec![GatewayMessage::not_found(code::MESSAGE_NOT_FOUND)];
    };

    match can_act_on(state, session, &message).await {
        Ok(true) => {}
        Ok(false) => return vec![GatewayMessage::permission_error()],
        Err(e) => return drop_on_store_error(e, session, "message:update"),
    }

    let updated = match state.messages.update(payload.message_id, content).await {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:update"),
    };
    // A concurrent delete can win the race between the lookup and the write.
    let Some(updated) = updated else {
        return vec![GatewayMessage::not_found(code::MESSAGE_NOT_FOUND)];
    };

    broadcast_message(state, EventName::MESSAGE_UPDATED, &updated);
    Vec::new()
}

async fn handle_message_delete(
    state: &AppState,
    session: &mut GatewaySession,
    payload: MessageDeletePayload,
) -> Vec<GatewayMessage> {
    let message = match state.messages.find(payload.message_id).await {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:delete"),
    };
    let Some(message) = message else {
        return vec![GatewayMessage::not_found(code::MESSAGE_NOT_FOUND)];
    };

    match can_act_on(state, session, &message).await {
        Ok(true) => {}
        Ok(false) => return vec![GatewayMessage::permission_error()],
        Err(e) => return drop_on_store_error(e, session, "message:delete"),
    }

    let deleted = match state.messages.delete(payload.message_id).await {
        Ok(m) => m,
        Err(e) => return drop_on_store_error(e, session, "message:delete"),
    };
    let Some(deleted) = deleted else {
        return vec![GatewayMessage::not_found(code::MESSAGE_NOT_FOUND)];
    };

    state.broadcast.emit_to_room(
        RoomKey::Channel(deleted.channel_id),
        EventName::MESSAGE_DELETED,
        serde_json::json!({ "message_id": deleted.id }),
    );
    Vec::new()
}

/// `can_act = is_author OR can_moderate`, evaluated fresh from the live
/// directory so role changes apply on the very next action.
async fn can_act_on(
    state: &AppState,
    session: &GatewaySession,
    message: &Message,
) -> Result<bool, StoreError> {
    if message.author_id == session.user_id {
        return Ok(true);
    }
    let Some(channel) = state.directory.find_channel(message.channel_id).await? else {
        return Ok(false);
    };
    let membership = state
        .directory
        .find_membership(session.user_id, channel.server_id)
        .await?;
    Ok(membership.is_some_and(|m| m.role.can_moderate()))
}

fn broadcast_message(state: &AppState, event_name: &str, message: &Message) {
    state.broadcast.emit_to_room(
        RoomKey::Channel(message.channel_id),
        event_name,
        serde_json::to_value(MessagePayload::from(message)).unwrap_or_default(),
    );
}

/// Unexpected persistence failure: log and drop the event. The connection
/// and all unrelated connections stay up.
fn drop_on_store_error(
    error: StoreError,
    session: &GatewaySession,
    event: &str,
) -> Vec<GatewayMessage> {
    tracing::error!(
        ?error,
        connection_id = %session.connection_id,
        event,
        "store failure, dropping event"
    );
    Vec::new()
}
