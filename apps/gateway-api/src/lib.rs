pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use auth::SessionValidator;
use config::Config;
use gateway::fanout::GatewayBroadcast;
use gateway::presence::PresenceRegistry;
use store::{MembershipDirectory, MessageRepository};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<dyn SessionValidator>,
    pub directory: Arc<dyn MembershipDirectory>,
    pub messages: Arc<dyn MessageRepository>,
    pub presence: Arc<PresenceRegistry>,
    pub broadcast: GatewayBroadcast,
}
