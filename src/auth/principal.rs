use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Which credential table a principal lives in. Ids are never shared
/// across the two namespaces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalType {
    User,
    Admin,
}

impl std::fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalType::User => write!(f, "user"),
            PrincipalType::Admin => write!(f, "admin"),
        }
    }
}

/// Identity source for a user account.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "auth_provider", rename_all = "lowercase")]
pub enum AuthProvider {
    Email,
    Google,
    Github,
}

impl std::fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthProvider::Email => write!(f, "email"),
            AuthProvider::Google => write!(f, "google"),
            AuthProvider::Github => write!(f, "github"),
        }
    }
}

/// User lifecycle status; only `active` accounts may sign in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
}

/// User tier; doubles as the user's role in permission decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
pub enum AccountType {
    Free,
    Premium,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Free => "free",
            AccountType::Premium => "premium",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "admin_role", rename_all = "lowercase")]
pub enum AdminRole {
    Super,
    Support,
    Quotations,
    System,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::Super => "super",
            AdminRole::Support => "support",
            AdminRole::Quotations => "quotations",
            AdminRole::System => "system",
        }
    }
}

/// User record. Secret columns are never serialized and only populated when
/// the store is asked to include them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub profile_picture: Option<String>,
    pub status: AccountStatus,
    pub account_type: AccountType,
    pub provider: AuthProvider,
    pub provider_id: Option<String>,
    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub hashed_refresh_token: Option<String>,
    pub last_login: Option<OffsetDateTime>,
    pub registration_date: OffsetDateTime,
}

/// Admin record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Admin {
    pub admin_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub role: AdminRole,
    #[serde(skip_serializing)]
    pub hashed_refresh_token: Option<String>,
    pub last_login: Option<OffsetDateTime>,
}

/// Lightweight handle naming a principal without carrying its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrincipalRef {
    pub id: Uuid,
    pub kind: PrincipalType,
}

/// Tagged variant over the two principal tables. Session and permission
/// logic only touch the common projection below.
#[derive(Debug, Clone)]
pub enum Principal {
    User(User),
    Admin(Admin),
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::User(u) => u.user_id,
            Principal::Admin(a) => a.admin_id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::User(u) => &u.email,
            Principal::Admin(a) => &a.email,
        }
    }

    pub fn principal_type(&self) -> PrincipalType {
        match self {
            Principal::User(_) => PrincipalType::User,
            Principal::Admin(_) => PrincipalType::Admin,
        }
    }

    /// Role-like field: the admin role, or the user's account type.
    pub fn role(&self) -> &'static str {
        match self {
            Principal::User(u) => u.account_type.as_str(),
            Principal::Admin(a) => a.role.as_str(),
        }
    }

    pub fn password_digest(&self) -> Option<&str> {
        match self {
            Principal::User(u) => u.password.as_deref(),
            Principal::Admin(a) => a.password.as_deref(),
        }
    }

    pub fn refresh_fingerprint(&self) -> Option<&str> {
        match self {
            Principal::User(u) => u.hashed_refresh_token.as_deref(),
            Principal::Admin(a) => a.hashed_refresh_token.as_deref(),
        }
    }

    pub fn reference(&self) -> PrincipalRef {
        PrincipalRef {
            id: self.id(),
            kind: self.principal_type(),
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            Principal::User(u) => Some(u),
            Principal::Admin(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_user() -> User {
        User {
            user_id: Uuid::new_v4(),
            email: "a@x.com".into(),
            first_name: None,
            last_name: None,
            password: Some("$argon2id$fake".into()),
            profile_picture: None,
            status: AccountStatus::Active,
            account_type: AccountType::Free,
            provider: AuthProvider::Email,
            provider_id: None,
            email_verified: true,
            hashed_refresh_token: None,
            last_login: None,
            registration_date: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn projection_picks_the_right_fields() {
        let user = sample_user();
        let id = user.user_id;
        let p = Principal::User(user);
        assert_eq!(p.id(), id);
        assert_eq!(p.principal_type(), PrincipalType::User);
        assert_eq!(p.role(), "free");
        assert!(p.password_digest().is_some());
        assert!(p.refresh_fingerprint().is_none());
    }

    #[test]
    fn secret_columns_never_serialize() {
        let mut user = sample_user();
        user.hashed_refresh_token = Some("digest".into());
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("hashed_refresh_token"));
        assert!(json.contains("a@x.com"));
    }
}
