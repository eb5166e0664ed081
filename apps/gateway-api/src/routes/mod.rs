pub mod health;
pub mod messages;

use axum::Router;

use crate::gateway;
use crate::AppState;

/// Top-level router. The WebSocket upgrade and the health probe sit at the
/// root; the REST surface hangs under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(gateway::server::router())
        .merge(health::router())
        .nest("/api/v1", messages::router())
}
