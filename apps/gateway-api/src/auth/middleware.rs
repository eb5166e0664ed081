//! Bearer-token extraction for the REST surface.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::identity::Identity;
use crate::error::ApiError;
use crate::AppState;

/// Authenticated caller extracted from the `Authorization: Bearer <token>`
/// header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

/// Pulls the raw token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ")
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Expected a bearer token"))?;

        let identity = state
            .verifier
            .verify(token)
            .await
            .map_err(|err| ApiError::unauthorized(err.to_string()))?;

        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/v1/messages/community/com_1");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, _) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_token_requires_the_scheme() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer tok"))), Some("tok"));
        assert_eq!(bearer_token(&parts_with(Some("Basic tok"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
