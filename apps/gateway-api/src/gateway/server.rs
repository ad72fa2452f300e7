//! WebSocket upgrade handler and per-connection event loop.
//!
//! Authentication happens during the HTTP handshake: the session cookie is
//! validated before the upgrade is accepted, so an unauthenticated client is
//! rejected with 401 and no socket ever opens.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time;

use crate::auth::AuthedUser;
use crate::error::ApiError;
use crate::AppState;

use super::events::{ClientEnvelope, GatewayMessage, InboundEvent};
use super::fanout::BroadcastPayload;
use super::handler::{broadcast_presence_for_user, dispatch_event};
use super::session::GatewaySession;

/// Close code for protocol violations (4000-range for application-level).
const CLOSE_INVALID_PAYLOAD: u16 = 4000;

/// Interval for protocol-level keepalive pings.
const PING_INTERVAL_SECS: u64 = 30;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(user) = state.sessions.validate(&headers) else {
        tracing::debug!("gateway handshake rejected: invalid or missing session");
        return ApiError::unauthorized("Invalid or missing session").into_response();
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, user))
        .into_response()
}

async fn handle_connection(socket: WebSocket, state: AppState, user: AuthedUser) {
    let (ws_tx, ws_rx) = socket.split();
    let mut session = GatewaySession::new(user);

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = session.user_id,
        "gateway connection established"
    );

    // Subscribe before flipping presence so this connection cannot miss a
    // snapshot triggered by its own online edge.
    let broadcast_rx = state.broadcast.subscribe();

    if state.presence.mark_online(session.user_id) {
        broadcast_presence_for_user(&state, session.user_id).await;
    }

    run_session(&state, &mut session, ws_tx, ws_rx, broadcast_rx).await;

    // The offline edge fires even on abrupt disconnects; the broadcast runs
    // detached so teardown never blocks on member lookups.
    if state.presence.mark_offline(session.user_id) {
        let state = state.clone();
        let user_id = session.user_id;
        tokio::spawn(async move {
            broadcast_presence_for_user(&state, user_id).await;
        });
    }

    tracing::info!(
        connection_id = %session.connection_id,
        user_id = session.user_id,
        "gateway connection closed"
    );
}

/// Main event loop: read client events, forward room broadcasts, keepalive.
async fn run_session(
    state: &AppState,
    session: &mut GatewaySession,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    mut broadcast_rx: broadcast::Receiver<std::sync::Arc<BroadcastPayload>>,
) {
    let mut ping_timer = time::interval(Duration::from_secs(PING_INTERVAL_SECS));
    ping_timer.tick().await; // First tick fires immediately; skip it.

    loop {
        tokio::select! {
            // Client sends us a frame.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let envelope: ClientEnvelope = match serde_json::from_str(&text) {
                            Ok(e) => e,
                            Err(_) => {
                                let _ = send_close(&mut ws_tx, CLOSE_INVALID_PAYLOAD, "Invalid JSON").await;
                                break;
                            }
                        };

                        let event = match InboundEvent::parse(envelope) {
                            Some(Ok(event)) => event,
                            Some(Err(e)) => {
                                // Known event, bad payload: drop it, keep the
                                // connection.
                                tracing::debug!(
                                    ?e,
                                    connection_id = %session.connection_id,
                                    "malformed event payload"
                                );
                                continue;
                            }
                            None => {
                                tracing::debug!(
                                    connection_id = %session.connection_id,
                                    "ignoring unknown event"
                                );
                                continue;
                            }
                        };

                        for reply in dispatch_event(state, session, event).await {
                            if send_message(&mut ws_tx, &reply).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %session.connection_id, "ws read error");
                        break;
                    }
                    _ => continue,
                }
            }

            // Broadcast event from the fanout hub.
            result = broadcast_rx.recv() => {
                match result {
                    Ok(payload) => {
                        if !session.is_joined(&payload.room) {
                            continue;
                        }
                        if payload.exclude.as_deref() == Some(session.connection_id.as_str()) {
                            continue;
                        }

                        let msg = GatewayMessage::event(&payload.event_name, payload.data.clone());
                        if send_message(&mut ws_tx, &msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(
                            connection_id = %session.connection_id,
                            skipped = n,
                            "gateway connection lagged behind broadcast"
                        );
                        // Continue — we just drop the missed events.
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Protocol-level keepalive.
            _ = ping_timer.tick() => {
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn send_message(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &GatewayMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
