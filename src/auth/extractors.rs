use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::tokens::JwtKeys;
use crate::error::AuthError;

/// Extracts and verifies the Bearer access token, yielding the full claims
/// so downstream permission checks can see type and role. Every failure
/// path is a 401; protected routes fail closed.
#[derive(Debug)]
pub struct AuthPrincipal(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthPrincipal
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AuthError::InvalidToken)?;

        let claims = keys.verify(token, TokenKind::Access)?;
        Ok(AuthPrincipal(claims))
    }
}
