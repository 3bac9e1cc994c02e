use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::password;
use crate::auth::permission;
use crate::auth::principal::{AuthProvider, Principal, PrincipalRef, PrincipalType};
use crate::auth::resolver::{IdentityResolver, LocalCredentials, SocialIdentity};
use crate::auth::store::CredentialStore;
use crate::auth::tokens::JwtKeys;
use crate::error::AuthError;
use crate::mail::Mailer;
use crate::visits::{ua, VisitRecorder};

/// Request metadata captured for visit recording.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip_address: String,
    pub user_agent: String,
}

/// Result of a successful sign-in, social login or refresh.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub subject_id: Uuid,
}

/// Orchestrates sign-in, refresh and sign-out. Owns the invariant that at
/// most one valid refresh token exists per principal: every issuance stores
/// the fingerprint of the newest refresh token, implicitly superseding all
/// older ones.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    resolver: IdentityResolver,
    keys: JwtKeys,
    visits: Arc<dyn VisitRecorder>,
    mailer: Arc<dyn Mailer>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        keys: JwtKeys,
        visits: Arc<dyn VisitRecorder>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(store.clone()),
            store,
            keys,
            visits,
            mailer,
        }
    }

    /// Local credential sign-in for either principal type.
    pub async fn sign_in(
        &self,
        creds: &LocalCredentials,
        client: &ClientInfo,
    ) -> Result<SessionTokens, AuthError> {
        let principal = self.resolver.resolve_local(creds).await?;

        if let Principal::User(user) = &principal {
            self.record_visit(user.user_id, client).await;
        }

        let tokens = self.issue_session(&principal).await?;
        info!(subject = %tokens.subject_id, kind = %principal.principal_type(), "signed in");
        Ok(tokens)
    }

    /// Federated sign-in; creates the user on first contact.
    pub async fn social_login(
        &self,
        identity: &SocialIdentity,
        client: &ClientInfo,
    ) -> Result<SessionTokens, AuthError> {
        let user = self.resolver.resolve_social(identity).await?;
        self.record_visit(user.user_id, client).await;

        let principal = Principal::User(user);
        let tokens = self.issue_session(&principal).await?;
        info!(subject = %tokens.subject_id, provider = %identity.provider, "social sign-in");
        Ok(tokens)
    }

    /// Rotate a refresh token. The stored fingerprint is the only proof a
    /// refresh token is still live; replacing it is conditional on the
    /// digest observed here, so a replayed or raced token loses.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, AuthError> {
        let claims = self.keys.verify(refresh_token, TokenKind::Refresh)?;
        let target = PrincipalRef {
            id: claims.sub,
            kind: claims.principal_type,
        };

        let principal = self
            .store
            .find_by_id(target, false)
            .await
            .map_err(AuthError::unavailable)?
            .ok_or(AuthError::InvalidToken)?;

        let current = principal
            .refresh_fingerprint()
            .ok_or(AuthError::InvalidToken)?
            .to_string();

        let matches = password::verify_blocking(refresh_token.to_string(), current.clone())
            .await
            .map_err(AuthError::internal)?;
        if !matches {
            warn!(subject = %claims.sub, "refresh fingerprint mismatch");
            return Err(AuthError::InvalidToken);
        }

        let access_token = self.keys.sign_access(&principal)?;
        let refresh_replacement = self.keys.sign_refresh(&principal)?;
        let fingerprint = password::hash_blocking(refresh_replacement.clone())
            .await
            .map_err(AuthError::internal)?;

        let swapped = self
            .store
            .swap_refresh_fingerprint(target, &current, &fingerprint)
            .await
            .map_err(AuthError::unavailable)?;
        if !swapped {
            warn!(subject = %claims.sub, "refresh lost compare-and-replace race");
            return Err(AuthError::InvalidToken);
        }

        Ok(SessionTokens {
            access_token,
            refresh_token: refresh_replacement,
            subject_id: principal.id(),
        })
    }

    /// Clear the target's session. The caller must own the target id or
    /// hold an administrative role.
    pub async fn sign_out(&self, caller: &Claims, target: PrincipalRef) -> Result<(), AuthError> {
        permission::check(target.id, caller).map_err(AuthError::PermissionDenied)?;
        self.store
            .end_session(target)
            .await
            .map_err(AuthError::unavailable)?;
        info!(subject = %target.id, "signed out");
        Ok(())
    }

    /// Mint and deliver a password-reset token for a local-credential user.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let user = self
            .store
            .find_user_by_email(email, false)
            .await
            .map_err(AuthError::unavailable)?
            .ok_or(AuthError::PrincipalNotFound)?;

        if user.provider != AuthProvider::Email {
            return Err(AuthError::InvalidRequest(format!(
                "Password reset not available for {} users",
                user.provider
            )));
        }

        let token = self.keys.sign_reset(user.user_id, &user.email)?;
        self.mailer
            .send_password_reset_link(&user.email, &token)
            .await
            .map_err(AuthError::unavailable)?;
        info!(subject = %user.user_id, "password reset requested");
        Ok(())
    }

    /// Redeem a reset token: overwrite the digest (hashed exactly once) and
    /// revoke the active session.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let claims = self.keys.verify_reset(token)?;
        let target = PrincipalRef {
            id: claims.sub,
            kind: PrincipalType::User,
        };
        let principal = self
            .store
            .find_by_id(target, false)
            .await
            .map_err(AuthError::unavailable)?
            .ok_or(AuthError::PrincipalNotFound)?;

        let user = principal.as_user().ok_or(AuthError::PrincipalNotFound)?;
        if user.provider != AuthProvider::Email {
            return Err(AuthError::InvalidRequest(format!(
                "Password reset not available for {} users",
                user.provider
            )));
        }

        let digest = password::hash_blocking(new_password.to_string())
            .await
            .map_err(AuthError::internal)?;
        self.store
            .set_user_password(user.user_id, &digest)
            .await
            .map_err(AuthError::unavailable)?;
        info!(subject = %user.user_id, "password reset");
        Ok(())
    }

    /// Sign the pair and persist the refresh fingerprint, superseding any
    /// previous session for this principal.
    async fn issue_session(&self, principal: &Principal) -> Result<SessionTokens, AuthError> {
        let access_token = self.keys.sign_access(principal)?;
        let refresh_token = self.keys.sign_refresh(principal)?;
        let fingerprint = password::hash_blocking(refresh_token.clone())
            .await
            .map_err(AuthError::internal)?;
        self.store
            .start_session(principal.reference(), &fingerprint)
            .await
            .map_err(AuthError::unavailable)?;
        Ok(SessionTokens {
            access_token,
            refresh_token,
            subject_id: principal.id(),
        })
    }

    /// Best-effort visit recording; never fails the login.
    async fn record_visit(&self, user_id: Uuid, client: &ClientInfo) {
        let visit = ua::summarize(&client.ip_address, &client.user_agent);
        if let Err(e) = self.visits.record(user_id, &visit).await {
            warn!(error = %e, user_id = %user_id, "visit recording failed");
        }
    }
}
