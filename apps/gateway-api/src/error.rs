use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Why a connection attempt was refused.
///
/// Every variant renders the same client-facing message, so a caller can
/// never probe which identities exist. The variant itself is for logs.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential missing, malformed, expired, or signed with the wrong key.
    #[error("Authentication error")]
    InvalidCredential,
    /// Credential verified but no matching account exists.
    #[error("Authentication error")]
    UnknownIdentity,
    /// The directory backing verification failed.
    #[error("Authentication error")]
    VerifierUnavailable,
}

/// Failure from the message store or user directory.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Message not found")]
    NotFound,
    /// The store refused the write, e.g. a validation rule.
    #[error("{0}")]
    Rejected(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store call timed out")]
    Timeout,
}

/// Application-level error type that converts into an HTTP response with an
/// `{"error": {"code", "message"}}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("Message not found"),
            StoreError::Rejected(message) => Self::bad_request(message),
            StoreError::Unavailable(_) | StoreError::Timeout => {
                tracing::error!(%err, "store error");
                Self::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_share_one_client_message() {
        let invalid = AuthError::InvalidCredential.to_string();
        let unknown = AuthError::UnknownIdentity.to_string();
        let unavailable = AuthError::VerifierUnavailable.to_string();
        assert_eq!(invalid, unknown);
        assert_eq!(unknown, unavailable);
    }

    #[test]
    fn store_rejection_becomes_bad_request() {
        let err = ApiError::from(StoreError::Rejected("Message content is required".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "Message content is required");
    }
}
