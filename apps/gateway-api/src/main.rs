use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_api::auth::{CookieSessionValidator, SessionValidator};
use gateway_api::config::Config;
use gateway_api::gateway::fanout::GatewayBroadcast;
use gateway_api::gateway::presence::PresenceRegistry;
use gateway_api::store::{MembershipDirectory, MemoryStore, MessageRepository};
use gateway_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (silently skip if missing — env vars may be set externally)
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let sessions: Arc<dyn SessionValidator> = Arc::new(CookieSessionValidator::new(
        &config.session_secret,
        config.session_cookie.clone(),
    ));

    // In-memory store for Phase 1. Replace with the database-backed store
    // once the REST layer's schema is shared.
    let store = Arc::new(MemoryStore::new());
    let directory: Arc<dyn MembershipDirectory> = store.clone();
    let messages: Arc<dyn MessageRepository> = store;

    let state = AppState {
        config: Arc::new(config),
        sessions,
        directory,
        messages,
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: GatewayBroadcast::new(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(gateway_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "gateway-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
