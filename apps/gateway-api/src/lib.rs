//! Presence and messaging gateway: authenticated WebSocket sessions, room
//! fanout, and the REST history surface.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod store;

use std::sync::Arc;

use auth::identity::IdentityVerifier;
use config::Config;
use gateway::fanout::BroadcastHub;
use gateway::presence::PresenceRegistry;
use store::messages::MessageStore;

/// Shared application state available to all route handlers and sessions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub messages: Arc<dyn MessageStore>,
    pub presence: Arc<PresenceRegistry>,
    pub broadcast: Arc<BroadcastHub>,
}
