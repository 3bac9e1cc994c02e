use axum::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::principal::{
    AccountStatus, Admin, AuthProvider, Principal, PrincipalRef, PrincipalType, User,
};
#[cfg(test)]
use crate::auth::principal::AccountType;
#[cfg(test)]
use std::sync::Mutex;
#[cfg(test)]
use time::OffsetDateTime;

/// Fields for a user created on first federated contact. No password digest
/// is ever set for these accounts.
#[derive(Debug, Clone)]
pub struct NewSocialUser {
    pub email: String,
    pub provider: AuthProvider,
    pub provider_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
}

/// Persistence contract for principals. Password digests are only selected
/// when `include_secret` is set; the refresh fingerprint always travels with
/// the record since the session manager is its only consumer.
///
/// `swap_refresh_fingerprint` is the single linearization point for refresh:
/// a conditional update keyed on the previously observed digest, so of two
/// concurrent rotations using the same stale token exactly one can win.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<User>>;

    async fn find_admin_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<Admin>>;

    async fn find_by_id(
        &self,
        target: PrincipalRef,
        include_secret: bool,
    ) -> anyhow::Result<Option<Principal>>;

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> anyhow::Result<Option<User>>;

    async fn create_social_user(&self, new: NewSocialUser) -> anyhow::Result<User>;

    /// Store a fresh fingerprint and stamp `last_login`, superseding any
    /// previous session unconditionally.
    async fn start_session(&self, target: PrincipalRef, fingerprint: &str) -> anyhow::Result<()>;

    /// Replace the fingerprint only if it still equals `expected`. Returns
    /// whether the swap happened.
    async fn swap_refresh_fingerprint(
        &self,
        target: PrincipalRef,
        expected: &str,
        replacement: &str,
    ) -> anyhow::Result<bool>;

    /// Clear the fingerprint; the principal returns to the no-session state.
    async fn end_session(&self, target: PrincipalRef) -> anyhow::Result<()>;

    /// Overwrite the password digest and revoke the active session.
    async fn set_user_password(&self, user_id: Uuid, digest: &str) -> anyhow::Result<()>;
}

const USER_COLUMNS: &str = "user_id, email, first_name, last_name, \
     CASE WHEN $2 THEN password ELSE NULL END AS password, \
     profile_picture, status, account_type, provider, provider_id, \
     email_verified, hashed_refresh_token, last_login, registration_date";

const ADMIN_COLUMNS: &str = "admin_id, email, first_name, last_name, \
     CASE WHEN $2 THEN password ELSE NULL END AS password, \
     role, hashed_refresh_token, last_login";

pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_user_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .bind(include_secret)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_admin_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<Admin>> {
        let admin = sqlx::query_as::<_, Admin>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1"
        ))
        .bind(email)
        .bind(include_secret)
        .fetch_optional(&self.db)
        .await?;
        Ok(admin)
    }

    async fn find_by_id(
        &self,
        target: PrincipalRef,
        include_secret: bool,
    ) -> anyhow::Result<Option<Principal>> {
        match target.kind {
            PrincipalType::User => {
                let user = sqlx::query_as::<_, User>(&format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"
                ))
                .bind(target.id)
                .bind(include_secret)
                .fetch_optional(&self.db)
                .await?;
                Ok(user.map(Principal::User))
            }
            PrincipalType::Admin => {
                let admin = sqlx::query_as::<_, Admin>(&format!(
                    "SELECT {ADMIN_COLUMNS} FROM admins WHERE admin_id = $1"
                ))
                .bind(target.id)
                .bind(include_secret)
                .fetch_optional(&self.db)
                .await?;
                Ok(admin.map(Principal::Admin))
            }
        }
    }

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, email, first_name, last_name, NULL::varchar AS password, \
             profile_picture, status, account_type, provider, provider_id, \
             email_verified, hashed_refresh_token, last_login, registration_date \
             FROM users WHERE provider = $1 AND provider_id = $2",
        )
        .bind(provider)
        .bind(provider_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create_social_user(&self, new: NewSocialUser) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users \
             (email, provider, provider_id, email_verified, status, \
              first_name, last_name, profile_picture) \
             VALUES ($1, $2, $3, TRUE, $4, $5, $6, $7) \
             RETURNING user_id, email, first_name, last_name, NULL::varchar AS password, \
             profile_picture, status, account_type, provider, provider_id, \
             email_verified, hashed_refresh_token, last_login, registration_date",
        )
        .bind(&new.email)
        .bind(new.provider)
        .bind(&new.provider_id)
        .bind(AccountStatus::Active)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.profile_picture)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn start_session(&self, target: PrincipalRef, fingerprint: &str) -> anyhow::Result<()> {
        let sql = match target.kind {
            PrincipalType::User => {
                "UPDATE users SET hashed_refresh_token = $2, last_login = now() WHERE user_id = $1"
            }
            PrincipalType::Admin => {
                "UPDATE admins SET hashed_refresh_token = $2, last_login = now() WHERE admin_id = $1"
            }
        };
        sqlx::query(sql)
            .bind(target.id)
            .bind(fingerprint)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn swap_refresh_fingerprint(
        &self,
        target: PrincipalRef,
        expected: &str,
        replacement: &str,
    ) -> anyhow::Result<bool> {
        let sql = match target.kind {
            PrincipalType::User => {
                "UPDATE users SET hashed_refresh_token = $3, last_login = now() \
                 WHERE user_id = $1 AND hashed_refresh_token = $2"
            }
            PrincipalType::Admin => {
                "UPDATE admins SET hashed_refresh_token = $3, last_login = now() \
                 WHERE admin_id = $1 AND hashed_refresh_token = $2"
            }
        };
        let result = sqlx::query(sql)
            .bind(target.id)
            .bind(expected)
            .bind(replacement)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn end_session(&self, target: PrincipalRef) -> anyhow::Result<()> {
        let sql = match target.kind {
            PrincipalType::User => {
                "UPDATE users SET hashed_refresh_token = NULL WHERE user_id = $1"
            }
            PrincipalType::Admin => {
                "UPDATE admins SET hashed_refresh_token = NULL WHERE admin_id = $1"
            }
        };
        sqlx::query(sql).bind(target.id).execute(&self.db).await?;
        Ok(())
    }

    async fn set_user_password(&self, user_id: Uuid, digest: &str) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET password = $2, hashed_refresh_token = NULL WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(digest)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// In-memory store backing the unit tests. The swap runs under a single
/// lock acquisition, matching the conditional-update semantics of the
/// Postgres impl.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryCredentialStore {
    users: Mutex<Vec<User>>,
    admins: Mutex<Vec<Admin>>,
}

#[cfg(test)]
impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }

    pub fn insert_admin(&self, admin: Admin) {
        self.admins.lock().unwrap().push(admin);
    }

    fn strip_user(mut user: User, include_secret: bool) -> User {
        if !include_secret {
            user.password = None;
        }
        user
    }

    fn strip_admin(mut admin: Admin, include_secret: bool) -> Admin {
        if !include_secret {
            admin.password = None;
        }
        admin
    }
}

#[cfg(test)]
#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_user_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.email == email)
            .cloned()
            .map(|u| Self::strip_user(u, include_secret)))
    }

    async fn find_admin_by_email(
        &self,
        email: &str,
        include_secret: bool,
    ) -> anyhow::Result<Option<Admin>> {
        let admins = self.admins.lock().unwrap();
        Ok(admins
            .iter()
            .find(|a| a.email == email)
            .cloned()
            .map(|a| Self::strip_admin(a, include_secret)))
    }

    async fn find_by_id(
        &self,
        target: PrincipalRef,
        include_secret: bool,
    ) -> anyhow::Result<Option<Principal>> {
        match target.kind {
            PrincipalType::User => {
                let users = self.users.lock().unwrap();
                Ok(users
                    .iter()
                    .find(|u| u.user_id == target.id)
                    .cloned()
                    .map(|u| Principal::User(Self::strip_user(u, include_secret))))
            }
            PrincipalType::Admin => {
                let admins = self.admins.lock().unwrap();
                Ok(admins
                    .iter()
                    .find(|a| a.admin_id == target.id)
                    .cloned()
                    .map(|a| Principal::Admin(Self::strip_admin(a, include_secret))))
            }
        }
    }

    async fn find_user_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.provider == provider && u.provider_id.as_deref() == Some(provider_id))
            .cloned()
            .map(|u| Self::strip_user(u, false)))
    }

    async fn create_social_user(&self, new: NewSocialUser) -> anyhow::Result<User> {
        let now = OffsetDateTime::now_utc();
        let user = User {
            user_id: Uuid::new_v4(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            password: None,
            profile_picture: new.profile_picture,
            status: AccountStatus::Active,
            account_type: AccountType::Free,
            provider: new.provider,
            provider_id: Some(new.provider_id),
            email_verified: true,
            hashed_refresh_token: None,
            last_login: None,
            registration_date: now,
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn start_session(&self, target: PrincipalRef, fingerprint: &str) -> anyhow::Result<()> {
        let now = OffsetDateTime::now_utc();
        match target.kind {
            PrincipalType::User => {
                let mut users = self.users.lock().unwrap();
                if let Some(u) = users.iter_mut().find(|u| u.user_id == target.id) {
                    u.hashed_refresh_token = Some(fingerprint.to_string());
                    u.last_login = Some(now);
                }
            }
            PrincipalType::Admin => {
                let mut admins = self.admins.lock().unwrap();
                if let Some(a) = admins.iter_mut().find(|a| a.admin_id == target.id) {
                    a.hashed_refresh_token = Some(fingerprint.to_string());
                    a.last_login = Some(now);
                }
            }
        }
        Ok(())
    }

    async fn swap_refresh_fingerprint(
        &self,
        target: PrincipalRef,
        expected: &str,
        replacement: &str,
    ) -> anyhow::Result<bool> {
        let now = OffsetDateTime::now_utc();
        match target.kind {
            PrincipalType::User => {
                let mut users = self.users.lock().unwrap();
                match users.iter_mut().find(|u| {
                    u.user_id == target.id && u.hashed_refresh_token.as_deref() == Some(expected)
                }) {
                    Some(u) => {
                        u.hashed_refresh_token = Some(replacement.to_string());
                        u.last_login = Some(now);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            PrincipalType::Admin => {
                let mut admins = self.admins.lock().unwrap();
                match admins.iter_mut().find(|a| {
                    a.admin_id == target.id && a.hashed_refresh_token.as_deref() == Some(expected)
                }) {
                    Some(a) => {
                        a.hashed_refresh_token = Some(replacement.to_string());
                        a.last_login = Some(now);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
        }
    }

    async fn end_session(&self, target: PrincipalRef) -> anyhow::Result<()> {
        match target.kind {
            PrincipalType::User => {
                let mut users = self.users.lock().unwrap();
                if let Some(u) = users.iter_mut().find(|u| u.user_id == target.id) {
                    u.hashed_refresh_token = None;
                }
            }
            PrincipalType::Admin => {
                let mut admins = self.admins.lock().unwrap();
                if let Some(a) = admins.iter_mut().find(|a| a.admin_id == target.id) {
                    a.hashed_refresh_token = None;
                }
            }
        }
        Ok(())
    }

    async fn set_user_password(&self, user_id: Uuid, digest: &str) -> anyhow::Result<()> {
        let mut users = self.users.lock().unwrap();
        if let Some(u) = users.iter_mut().find(|u| u.user_id == user_id) {
            u.password = Some(digest.to_string());
            u.hashed_refresh_token = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_fingerprint(fp: &str) -> User {
        User {
            user_id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: None,
            last_name: None,
            password: Some("digest".into()),
            profile_picture: None,
            status: AccountStatus::Active,
            account_type: AccountType::Free,
            provider: AuthProvider::Email,
            provider_id: None,
            email_verified: true,
            hashed_refresh_token: Some(fp.into()),
            last_login: None,
            registration_date: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn swap_succeeds_only_against_the_current_fingerprint() {
        let store = MemoryCredentialStore::new();
        let user = user_with_fingerprint("old");
        let target = PrincipalRef {
            id: user.user_id,
            kind: PrincipalType::User,
        };
        store.insert_user(user);

        assert!(store
            .swap_refresh_fingerprint(target, "old", "new")
            .await
            .unwrap());
        // The first swap consumed "old"; replaying it must fail.
        assert!(!store
            .swap_refresh_fingerprint(target, "old", "newer")
            .await
            .unwrap());
        assert!(store
            .swap_refresh_fingerprint(target, "new", "newer")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn include_secret_gates_the_password_column() {
        let store = MemoryCredentialStore::new();
        store.insert_user(user_with_fingerprint("fp"));

        let hidden = store
            .find_user_by_email("a@x.com", false)
            .await
            .unwrap()
            .unwrap();
        assert!(hidden.password.is_none());

        let shown = store
            .find_user_by_email("a@x.com", true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shown.password.as_deref(), Some("digest"));
    }

    #[tokio::test]
    async fn set_password_revokes_the_session() {
        let store = MemoryCredentialStore::new();
        let user = user_with_fingerprint("fp");
        let id = user.user_id;
        store.insert_user(user);

        store.set_user_password(id, "new-digest").await.unwrap();
        let target = PrincipalRef {
            id,
            kind: PrincipalType::User,
        };
        let reloaded = store.find_by_id(target, true).await.unwrap().unwrap();
        assert_eq!(reloaded.password_digest(), Some("new-digest"));
        assert!(reloaded.refresh_fingerprint().is_none());
    }
}
