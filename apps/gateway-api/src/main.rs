use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gateway_api::auth::identity::{IdentityVerifier, JwtVerifier};
use gateway_api::config::Config;
use gateway_api::gateway::fanout::BroadcastHub;
use gateway_api::gateway::presence::PresenceRegistry;
use gateway_api::models::user::UserProfile;
use gateway_api::store::messages::{MemoryMessageStore, MessageStore};
use gateway_api::store::users::MemoryUserDirectory;
use gateway_api::AppState;

#[tokio::main]
async fn main() {
    load_env();
    init_tracing();

    let config = Config::from_env();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    // In-memory backends. The user directory and message store belong to
    // the wider platform; deployments swap real adapters in here.
    let directory = Arc::new(MemoryUserDirectory::new());
    seed_dev_users(&directory, config.dev_users_file.as_deref());

    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(JwtVerifier::new(&config.jwt_secret, directory));
    let messages: Arc<dyn MessageStore> = Arc::new(MemoryMessageStore::new());

    let cors = cors_layer(config.client_url.as_deref());

    let state = AppState {
        config: Arc::new(config),
        verifier,
        messages,
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: Arc::new(BroadcastHub::new()),
    };

    let app = gateway_api::routes::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("bind failed");
    tracing::info!(%addr, "gateway-api listening");
    axum::serve(listener, app).await.expect("http server failed");
}

// Checks the working directory first, then the crate root. Both may be
// absent; deployments set real environment variables.
fn load_env() {
    if dotenvy::dotenv().is_err() {
        let fallback = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(fallback);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gateway_api=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn cors_layer(client_url: Option<&str>) -> CorsLayer {
    match client_url {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .expect("CLIENT_URL must be a valid origin");
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    }
}

fn seed_dev_users(directory: &MemoryUserDirectory, path: Option<&str>) {
    let Some(path) = path else { return };

    let raw = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read dev users file {path}: {e}"));
    let profiles: Vec<UserProfile> = serde_json::from_str(&raw)
        .unwrap_or_else(|e| panic!("invalid dev users file {path}: {e}"));

    let count = profiles.len();
    for profile in profiles {
        directory.insert(profile);
    }
    tracing::info!(count, path, "seeded dev users");
}
