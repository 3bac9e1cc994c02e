use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{Claims, ResetClaims, TokenKind};
use crate::auth::principal::Principal;
use crate::config::JwtConfig;
use crate::error::AuthError;
use crate::state::AppState;

/// Stateless token service. Each kind is signed and verified with its own
/// secret; revocation happens only through the stored refresh fingerprint.
#[derive(Clone)]
pub struct JwtKeys {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(cfg.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(cfg.refresh_secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            access_ttl: Duration::from_secs((cfg.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((cfg.refresh_ttl_minutes as u64) * 60),
            reset_ttl: Duration::from_secs((cfg.reset_ttl_minutes as u64) * 60),
        }
    }

    fn keys_for(&self, kind: TokenKind) -> (&EncodingKey, &DecodingKey, Duration) {
        match kind {
            TokenKind::Access => (&self.access_encoding, &self.access_decoding, self.access_ttl),
            TokenKind::Refresh => (
                &self.refresh_encoding,
                &self.refresh_decoding,
                self.refresh_ttl,
            ),
        }
    }

    fn sign_with_kind(&self, principal: &Principal, kind: TokenKind) -> Result<String, AuthError> {
        let (encoding, _, ttl) = self.keys_for(kind);
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: principal.id(),
            email: principal.email().to_string(),
            principal_type: principal.principal_type(),
            role: principal.role().to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            jti: Uuid::new_v4(),
        };
        let token = encode(&Header::default(), &claims, encoding).map_err(AuthError::internal)?;
        debug!(subject = %claims.sub, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, principal: &Principal) -> Result<String, AuthError> {
        self.sign_with_kind(principal, TokenKind::Access)
    }

    pub fn sign_refresh(&self, principal: &Principal) -> Result<String, AuthError> {
        self.sign_with_kind(principal, TokenKind::Refresh)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation
    }

    /// Verify signature, expiry, issuer/audience and kind. Expiry maps to
    /// `ExpiredToken`; every other defect is a uniform `InvalidToken`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, AuthError> {
        let (_, decoding, _) = self.keys_for(kind);
        let data =
            decode::<Claims>(token, decoding, &self.validation()).map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;
        if data.claims.kind != kind {
            return Err(AuthError::InvalidToken);
        }
        debug!(subject = %data.claims.sub, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }

    /// Mint a single-purpose password-reset token carrying only the subject
    /// id and email. Signed with the access secret, short reset TTL.
    pub fn sign_reset(&self, user_id: Uuid, email: &str) -> Result<String, AuthError> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.reset_ttl.as_secs() as i64);
        let claims = ResetClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(&Header::default(), &claims, &self.access_encoding).map_err(AuthError::internal)
    }

    pub fn verify_reset(&self, token: &str) -> Result<ResetClaims, AuthError> {
        let data = decode::<ResetClaims>(token, &self.access_decoding, &self.validation())
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })?;
        Ok(data.claims)
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::new(&state.config.jwt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::principal::{
        AccountStatus, AccountType, AuthProvider, PrincipalType, User,
    };

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 60,
            reset_ttl_minutes: 30,
        }
    }

    fn make_keys() -> JwtKeys {
        JwtKeys::new(&test_config())
    }

    fn make_principal() -> Principal {
        Principal::User(User {
            user_id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: None,
            last_name: None,
            password: None,
            profile_picture: None,
            status: AccountStatus::Active,
            account_type: AccountType::Premium,
            provider: AuthProvider::Email,
            provider_id: None,
            email_verified: true,
            hashed_refresh_token: None,
            last_login: None,
            registration_date: OffsetDateTime::UNIX_EPOCH,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let principal = make_principal();
        let token = keys.sign_access(&principal).expect("sign access");
        let claims = keys.verify(&token, TokenKind::Access).expect("verify token");
        assert_eq!(claims.sub, principal.id());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.principal_type, PrincipalType::User);
        assert_eq!(claims.role, "premium");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.kind, TokenKind::Access);
    }

    #[test]
    fn sign_and_verify_refresh_token() {
        let keys = make_keys();
        let principal = make_principal();
        let token = keys.sign_refresh(&principal).expect("sign refresh");
        let claims = keys.verify(&token, TokenKind::Refresh).expect("verify refresh");
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn kinds_do_not_cross_verify() {
        let keys = make_keys();
        let principal = make_principal();
        // Different secrets per kind: the signature itself fails.
        let access = keys.sign_access(&principal).expect("sign access");
        let err = keys.verify(&access, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));

        let refresh = keys.sign_refresh(&principal).expect("sign refresh");
        let err = keys.verify(&refresh, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn rotation_yields_distinct_tokens() {
        let keys = make_keys();
        let principal = make_principal();
        let first = keys.sign_refresh(&principal).expect("sign refresh");
        let second = keys.sign_refresh(&principal).expect("sign refresh");
        assert_ne!(first, second);
    }

    #[test]
    fn expired_token_is_distinguished_from_tampered() {
        let keys = make_keys();
        let principal = make_principal();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: principal.id(),
            email: principal.email().to_string(),
            principal_type: PrincipalType::User,
            role: "premium".into(),
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize,
            iss: "test-issuer".into(),
            aud: "test-aud".into(),
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
        };
        let stale = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .expect("encode");
        let err = keys.verify(&stale, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AuthError::ExpiredToken));

        let valid = keys.sign_access(&principal).expect("sign access");
        let tampered = format!("{}x", valid);
        let err = keys.verify(&tampered, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good = make_keys();
        let mut cfg = test_config();
        cfg.issuer = "other-issuer".into();
        cfg.audience = "other-aud".into();
        let bad = JwtKeys::new(&cfg);
        let token = good.sign_access(&make_principal()).expect("sign access");
        let err = bad.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn reset_token_roundtrip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_reset(user_id, "a@x.com").expect("sign reset");
        let claims = keys.verify_reset(&token).expect("verify reset");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@x.com");
    }

    #[test]
    fn reset_verification_rejects_refresh_secret_tokens() {
        let keys = make_keys();
        let token = keys.sign_refresh(&make_principal()).expect("sign refresh");
        let err = keys.verify_reset(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }
}
