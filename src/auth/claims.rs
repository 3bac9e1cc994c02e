use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::principal::PrincipalType;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Session token payload. Embedded in both token kinds; the kind and the
/// signing secret differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub principal_type: PrincipalType,
    /// Admin role or user account type, as issued at sign-in.
    pub role: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
    /// Nonce so tokens minted within the same second still differ.
    pub jti: Uuid,
}

/// Payload of a single-purpose password-reset token: subject and email only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub email: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
