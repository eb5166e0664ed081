use std::env;

/// Gateway configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Secret for verifying the platform's HS256 session tokens.
    pub jwt_secret: String,
    /// TCP port the HTTP listener binds to.
    pub port: u16,
    /// Browser origin allowed by CORS. Unset means any origin.
    pub client_url: Option<String>,
    /// Optional JSON file of user profiles to seed the in-memory directory
    /// with on startup.
    pub dev_users_file: Option<String>,
}

impl Config {
    /// Reads every setting from the process environment.
    ///
    /// Panics if `JWT_SECRET` is missing.
    pub fn from_env() -> Self {
        Self {
            jwt_secret: required_var("JWT_SECRET"),
            port: optional_var("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            client_url: optional_var("CLIENT_URL"),
            dev_users_file: optional_var("DEV_USERS_FILE"),
        }
    }
}

fn required_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{name} is not set"))
}

/// Unset and empty variables both read as `None`.
fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
