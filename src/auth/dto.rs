use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::principal::{AuthProvider, PrincipalType};
use crate::error::AuthError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Bodies arrive with free-form strings; these checks run before any store
/// access and turn anything off-contract into `InvalidRequest`.
pub(crate) fn parse_principal_type(value: &str) -> Result<PrincipalType, AuthError> {
    match value {
        "user" => Ok(PrincipalType::User),
        "admin" => Ok(PrincipalType::Admin),
        _ => Err(AuthError::InvalidRequest(
            "Invalid user type. Must be \"user\" or \"admin\"".into(),
        )),
    }
}

pub(crate) fn parse_social_provider(value: &str) -> Result<AuthProvider, AuthError> {
    match value {
        "google" => Ok(AuthProvider::Google),
        "github" => Ok(AuthProvider::Github),
        _ => Err(AuthError::InvalidRequest(
            "Invalid provider. Must be \"google\" or \"github\"".into(),
        )),
    }
}

pub(crate) fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::InvalidRequest("Password too short".into()));
    }
    Ok(())
}

/// Request body for local sign-in of either principal type.
#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    pub user_type: String,
}

/// Request body carrying a completed provider handshake.
#[derive(Debug, Deserialize)]
pub struct SocialLoginRequest {
    pub provider: String,
    pub provider_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Optional sign-out target; defaults to the caller itself.
#[derive(Debug, Default, Deserialize)]
pub struct SignOutRequest {
    pub user_id: Option<Uuid>,
    pub user_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Public projection of the authenticated principal.
#[derive(Debug, Serialize)]
pub struct PublicPrincipal {
    pub id: Uuid,
    pub email: String,
    pub principal_type: PrincipalType,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails_and_rejects_junk() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.domain.io"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn principal_type_parsing_is_closed() {
        assert_eq!(parse_principal_type("user").unwrap(), PrincipalType::User);
        assert_eq!(parse_principal_type("admin").unwrap(), PrincipalType::Admin);
        for bad in ["root", "Admin", "", "superuser"] {
            assert!(matches!(
                parse_principal_type(bad),
                Err(AuthError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn social_provider_parsing_excludes_email() {
        assert_eq!(parse_social_provider("google").unwrap(), AuthProvider::Google);
        assert_eq!(parse_social_provider("github").unwrap(), AuthProvider::Github);
        assert!(matches!(
            parse_social_provider("email"),
            Err(AuthError::InvalidRequest(_))
        ));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("longenough").is_ok());
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::InvalidRequest(_))
        ));
    }
}
