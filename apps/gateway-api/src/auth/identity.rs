//! Credential verification at the connection boundary.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::models::message::MessageSender;
use crate::models::user::Role;
use crate::store::users::UserDirectory;

/// The resolved identity a connection is tagged with after verification.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub avatar: String,
    pub role: Role,
}

impl From<&Identity> for MessageSender {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.user_id.clone(),
            name: identity.name.clone(),
            avatar: identity.avatar.clone(),
            role: identity.role,
        }
    }
}

/// Verifies an opaque bearer credential into an [`Identity`].
///
/// Called once per connection attempt; the result lives only as long as
/// the connection.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Claims carried in the platform's HS256 session tokens.
#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    id: String,
    exp: i64,
}

/// HS256 token verifier backed by the user directory.
///
/// A token whose `id` claim matches no account fails exactly like a bad
/// signature; the distinction exists only in the server log.
pub struct JwtVerifier {
    decoding: DecodingKey,
    validation: Validation,
    directory: Arc<dyn UserDirectory>,
}

impl JwtVerifier {
    pub fn new(secret: &str, directory: Arc<dyn UserDirectory>) -> Self {
        Self {
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            directory,
        }
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        if credential.is_empty() {
            return Err(AuthError::InvalidCredential);
        }

        let data =
            jsonwebtoken::decode::<SessionClaims>(credential, &self.decoding, &self.validation)
                .map_err(|err| {
                    tracing::debug!(%err, "token validation failed");
                    AuthError::InvalidCredential
                })?;

        let profile = self
            .directory
            .find_by_id(&data.claims.id)
            .await
            .map_err(|err| {
                tracing::error!(%err, "identity lookup failed");
                AuthError::VerifierUnavailable
            })?
            .ok_or(AuthError::UnknownIdentity)?;

        Ok(Identity {
            user_id: profile.id,
            name: profile.name,
            avatar: profile.avatar,
            role: profile.role,
        })
    }
}
