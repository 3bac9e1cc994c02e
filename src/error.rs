use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::permission::DenyReason;
use crate::auth::principal::AuthProvider;

/// Failure taxonomy for the auth core. Everything here is terminal for the
/// current request; only `Unavailable` is safe to retry.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Malformed input, rejected before any I/O.
    #[error("{0}")]
    InvalidRequest(String),

    /// Uniform credential failure: unknown email, missing digest or bad
    /// password are indistinguishable to the caller.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Local sign-in against a federated-only account. Names the provider
    /// the account was registered with.
    #[error("Please log in with {0}")]
    WrongProvider(AuthProvider),

    #[error("Your account is inactive. Kindly check your email for the activation link")]
    AccountInactive,

    #[error("Email not provided by social provider. Please ensure your account has a public email or try another login method")]
    MissingProviderEmail,

    /// Federated identity collision: the email already belongs to an
    /// account under another provider.
    #[error("Email already registered with {0}")]
    AccountConflict(AuthProvider),

    /// Bad signature, wrong token kind, or a fingerprint mismatch (replay
    /// of a superseded refresh token).
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    ExpiredToken,

    #[error("User not found")]
    PrincipalNotFound,

    #[error("{0}")]
    PermissionDenied(DenyReason),

    /// Downstream store/mailer outage or timeout; retryable.
    #[error("Service temporarily unavailable")]
    Unavailable(anyhow::Error),

    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl AuthError {
    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        Self::Unavailable(err.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidRequest(_)
            | AuthError::AccountInactive
            | AuthError::MissingProviderEmail => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::WrongProvider(_)
            | AuthError::InvalidToken
            | AuthError::ExpiredToken => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AuthError::PrincipalNotFound => StatusCode::NOT_FOUND,
            AuthError::AccountConflict(_) => StatusCode::CONFLICT,
            AuthError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match &self {
            AuthError::Unavailable(e) => error!(error = %e, "downstream unavailable"),
            AuthError::Internal(e) => error!(error = %e, "internal error"),
            _ => {}
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_share_one_message() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
    }

    #[test]
    fn wrong_provider_names_the_provider() {
        let msg = AuthError::WrongProvider(AuthProvider::Google).to_string();
        assert_eq!(msg, "Please log in with google");
    }

    #[test]
    fn conflict_names_the_existing_provider() {
        let msg = AuthError::AccountConflict(AuthProvider::Email).to_string();
        assert_eq!(msg, "Email already registered with email");
    }

    #[test]
    fn unavailable_hides_the_cause() {
        let err = AuthError::unavailable(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "Service temporarily unavailable");
    }
}
