//! Shared test helpers: in-process server, session cookies, WS plumbing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header};
use tokio::time;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

use gateway_api::auth::{CookieSessionValidator, SessionClaims, SessionValidator};
use gateway_api::config::Config;
use gateway_api::gateway::fanout::GatewayBroadcast;
use gateway_api::gateway::presence::PresenceRegistry;
use gateway_api::models::Role;
use gateway_api::store::{MembershipDirectory, MemoryStore, MessageRepository};
use gateway_api::AppState;

pub const SESSION_SECRET: &str = "gw-test-secret";
pub const SESSION_COOKIE: &str = "parlor_session";

pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub fn test_config() -> Config {
    Config {
        session_secret: SESSION_SECRET.to_string(),
        session_cookie: SESSION_COOKIE.to_string(),
        port: 0,
    }
}

/// Build an AppState over a fresh in-memory store. The store handle is
/// returned separately so tests can mutate fixtures mid-flight.
pub fn test_state() -> (AppState, Arc<MemoryStore>) {
    let config = test_config();
    let sessions: Arc<dyn SessionValidator> = Arc::new(CookieSessionValidator::new(
        &config.session_secret,
        config.session_cookie.clone(),
    ));

    let store = Arc::new(MemoryStore::new());
    let directory: Arc<dyn MembershipDirectory> = store.clone();
    let messages: Arc<dyn MessageRepository> = store.clone();

    let state = AppState {
        config: Arc::new(config),
        sessions,
        directory,
        messages,
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: GatewayBroadcast::new(),
    };
    (state, store)
}

/// Fixtures shared by most tests: server 1 with two channels, three members
/// (alice owns it), and user 99 as an outsider.
pub const SERVER: i64 = 1;
pub const CHANNEL: i64 = 5;
pub const OTHER_CHANNEL: i64 = 77;
pub const ALICE: i64 = 10;
pub const BOB: i64 = 11;
pub const CAROL: i64 = 12;
pub const MALLORY: i64 = 99;

pub fn seed_fixtures(store: &MemoryStore) {
    store.add_member(SERVER, ALICE, Role::Owner);
    store.add_member(SERVER, BOB, Role::Member);
    store.add_member(SERVER, CAROL, Role::Member);
    store.add_channel(CHANNEL, SERVER);
    store.add_channel(OTHER_CHANNEL, SERVER);
}

/// Start a real TCP server for WebSocket testing. Runs in the background.
pub async fn start_server() -> (SocketAddr, AppState, Arc<MemoryStore>) {
    let (state, store) = test_state();
    seed_fixtures(&store);
    let app = gateway_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state, store)
}

/// Mint a signed session cookie in `name=value` form.
pub fn mint_session_cookie(user_id: i64, username: &str) -> String {
    mint_session_cookie_with_exp(user_id, username, chrono::Utc::now().timestamp() + 300)
}

pub fn expired_session_cookie(user_id: i64, username: &str) -> String {
    mint_session_cookie_with_exp(user_id, username, chrono::Utc::now().timestamp() - 300)
}

fn mint_session_cookie_with_exp(user_id: i64, username: &str, exp: i64) -> String {
    let claims = SessionClaims {
        sub: user_id,
        username: username.to_string(),
        exp,
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
    )
    .unwrap();
    format!("{SESSION_COOKIE}={token}")
}

/// Attempt a gateway connection with an optional Cookie header.
pub async fn try_connect(
    addr: SocketAddr,
    cookie: Option<&str>,
) -> Result<WsStream, tungstenite::Error> {
    let mut request = format!("ws://{addr}/gateway").into_client_request()?;
    if let Some(cookie) = cookie {
        request
            .headers_mut()
            .insert("Cookie", cookie.parse().unwrap());
    }
    let (ws, _) = tokio_tungstenite::connect_async(request).await?;
    Ok(ws)
}

/// Connect as a user, asserting the handshake succeeds.
pub async fn connect(addr: SocketAddr, user_id: i64, username: &str) -> WsStream {
    let cookie = mint_session_cookie(user_id, username);
    try_connect(addr, Some(&cookie)).await.expect("ws connect")
}

pub async fn send_event(ws: &mut WsStream, t: &str, d: serde_json::Value) {
    let envelope = serde_json::json!({ "t": t, "d": d });
    ws.send(tungstenite::Message::Text(envelope.to_string().into()))
        .await
        .expect("send event");
}

/// Read the next text event, skipping protocol frames (pings).
pub async fn next_event(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timeout waiting for event")
            .expect("stream ended")
            .expect("ws read error");
        match msg {
            tungstenite::Message::Text(text) => {
                return serde_json::from_str(&text).expect("parse event")
            }
            tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_) => continue,
            other => panic!("expected text frame, got: {other:?}"),
        }
    }
}

/// Read events until one with the given name arrives, discarding others.
pub async fn next_event_named(ws: &mut WsStream, name: &str) -> serde_json::Value {
    for _ in 0..10 {
        let event = next_event(ws).await;
        if event["t"] == name {
            return event;
        }
    }
    panic!("no {name} event within 10 frames");
}

/// Assert no text event arrives within a short window.
pub async fn assert_silent(ws: &mut WsStream) {
    let result = time::timeout(Duration::from_millis(300), ws.next()).await;
    match result {
        Err(_) => {} // Timed out: silence, as expected.
        Ok(Some(Ok(tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_)))) => {}
        Ok(other) => panic!("expected silence, got: {other:?}"),
    }
}
