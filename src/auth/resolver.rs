use std::sync::Arc;

use tracing::warn;

use crate::auth::password;
use crate::auth::principal::{AccountStatus, AuthProvider, Principal, PrincipalType, User};
use crate::auth::store::{CredentialStore, NewSocialUser};
use crate::error::AuthError;

/// A validated local sign-in attempt.
#[derive(Debug, Clone)]
pub struct LocalCredentials {
    pub email: String,
    pub password: String,
    pub principal_type: PrincipalType,
}

/// Assertion produced by a completed provider handshake.
#[derive(Debug, Clone)]
pub struct SocialIdentity {
    pub provider: AuthProvider,
    pub provider_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
}

/// Reconciles a login attempt into exactly one principal, creating a user
/// record on first federated contact.
pub struct IdentityResolver {
    store: Arc<dyn CredentialStore>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Local credential resolution. Unknown email, missing digest and bad
    /// password all collapse into `InvalidCredentials`; only the federated
    /// gate and the inactive gate disclose more.
    pub async fn resolve_local(&self, creds: &LocalCredentials) -> Result<Principal, AuthError> {
        let principal = match creds.principal_type {
            PrincipalType::User => self
                .store
                .find_user_by_email(&creds.email, true)
                .await
                .map_err(AuthError::unavailable)?
                .map(Principal::User),
            PrincipalType::Admin => self
                .store
                .find_admin_by_email(&creds.email, true)
                .await
                .map_err(AuthError::unavailable)?
                .map(Principal::Admin),
        };

        let principal = match principal {
            Some(p) => p,
            None => {
                warn!(email = %creds.email, "sign-in unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        // Federated-only accounts have no usable local credential; naming
        // the provider is not a brute-force-relevant disclosure.
        if let Principal::User(user) = &principal {
            if user.provider != AuthProvider::Email {
                warn!(email = %creds.email, provider = %user.provider, "local sign-in against federated account");
                return Err(AuthError::WrongProvider(user.provider));
            }
        }

        let digest = match principal.password_digest() {
            Some(d) => d.to_string(),
            None => {
                warn!(email = %creds.email, "sign-in with no stored digest");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let ok = password::verify_blocking(creds.password.clone(), digest)
            .await
            .map_err(AuthError::internal)?;
        if !ok {
            warn!(email = %creds.email, "sign-in invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        if let Principal::User(user) = &principal {
            if user.status == AccountStatus::Inactive {
                return Err(AuthError::AccountInactive);
            }
        }

        Ok(principal)
    }

    /// Federated resolution: a known (provider, provider_id) pair wins
    /// outright; otherwise a new user is created, refusing to adopt an
    /// email already owned by another provider's account.
    pub async fn resolve_social(&self, identity: &SocialIdentity) -> Result<User, AuthError> {
        if identity.provider == AuthProvider::Email {
            return Err(AuthError::InvalidRequest(
                "provider must be a social provider".into(),
            ));
        }

        if let Some(user) = self
            .store
            .find_user_by_provider(identity.provider, &identity.provider_id)
            .await
            .map_err(AuthError::unavailable)?
        {
            return Ok(user);
        }

        let email = identity
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or(AuthError::MissingProviderEmail)?;

        if let Some(existing) = self
            .store
            .find_user_by_email(email, false)
            .await
            .map_err(AuthError::unavailable)?
        {
            warn!(email = %email, provider = %existing.provider, "social sign-in email collision");
            return Err(AuthError::AccountConflict(existing.provider));
        }

        let user = self
            .store
            .create_social_user(NewSocialUser {
                email: email.to_string(),
                provider: identity.provider,
                provider_id: identity.provider_id.clone(),
                first_name: identity.first_name.clone(),
                last_name: identity.last_name.clone(),
                profile_picture: identity.profile_picture.clone(),
            })
            .await
            .map_err(AuthError::unavailable)?;

        Ok(user)
    }
}
