use std::net::SocketAddr;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;

use gateway_api::auth::identity::{IdentityVerifier, JwtVerifier};
use gateway_api::config::Config;
use gateway_api::gateway::fanout::BroadcastHub;
use gateway_api::gateway::presence::PresenceRegistry;
use gateway_api::models::user::{Role, UserProfile};
use gateway_api::store::messages::{MemoryMessageStore, MessageStore};
use gateway_api::store::users::MemoryUserDirectory;
use gateway_api::AppState;

pub const TEST_JWT_SECRET: &str = "gateway-test-secret";

/// Test state plus the handles the tests seed and inspect through.
pub struct TestContext {
    pub state: AppState,
    pub directory: Arc<MemoryUserDirectory>,
}

/// Build an AppState backed entirely by in-memory stores.
pub fn test_state() -> TestContext {
    let directory = Arc::new(MemoryUserDirectory::new());
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(JwtVerifier::new(TEST_JWT_SECRET, directory.clone()));
    let messages: Arc<dyn MessageStore> = Arc::new(MemoryMessageStore::new());

    let config = Config {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        port: 0,
        client_url: None,
        dev_users_file: None,
    };

    let state = AppState {
        config: Arc::new(config),
        verifier,
        messages,
        presence: Arc::new(PresenceRegistry::new()),
        broadcast: Arc::new(BroadcastHub::new()),
    };

    TestContext { state, directory }
}

/// Seed a user the platform's session tokens can resolve to.
pub fn seed_user(ctx: &TestContext, id: &str, name: &str) -> UserProfile {
    let profile = UserProfile {
        id: id.to_string(),
        name: name.to_string(),
        avatar: format!("https://cdn.alumnet.test/{id}.png"),
        role: Role::Student,
    };
    ctx.directory.insert(profile.clone());
    profile
}

/// Session-token claims, shaped like the platform's auth service mints them.
#[derive(Serialize)]
struct TestClaims {
    id: String,
    iat: i64,
    exp: i64,
}

/// Mint a valid session token for a user id.
pub fn mint_token(user_id: &str) -> String {
    mint_token_with_expiry(user_id, chrono::Utc::now().timestamp() + 300)
}

/// Mint a token that expired five minutes ago.
pub fn mint_expired_token(user_id: &str) -> String {
    mint_token_with_expiry(user_id, chrono::Utc::now().timestamp() - 300)
}

fn mint_token_with_expiry(user_id: &str, exp: i64) -> String {
    let claims = TestClaims {
        id: user_id.to_string(),
        iat: chrono::Utc::now().timestamp() - 60,
        exp,
    };
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("mint test token")
}

/// Start an actual TCP server for WebSocket testing. The server runs in
/// the background for the rest of the test.
pub async fn start_server(ctx: &TestContext) -> SocketAddr {
    let app = gateway_api::routes::router().with_state(ctx.state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}
