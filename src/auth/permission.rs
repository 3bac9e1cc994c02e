use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::principal::PrincipalType;

/// Why an access check denied. The tag is the contract; message text is a
/// presentation concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotOwner,
    UpgradeRequired,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::NotOwner => write!(f, "You can only access your own resources"),
            DenyReason::UpgradeRequired => {
                write!(f, "Premium feature: Upgrade required for full access")
            }
        }
    }
}

/// Pure ownership check over verified claims: self-access or an
/// administrative principal passes, everything else denies. No I/O.
pub fn check(target_owner_id: Uuid, caller: &Claims) -> Result<(), DenyReason> {
    if caller.sub == target_owner_id {
        return Ok(());
    }
    // Administrative roles bypass ownership across all resource types.
    if caller.principal_type == PrincipalType::Admin {
        return Ok(());
    }
    if caller.role == "premium" {
        return Err(DenyReason::UpgradeRequired);
    }
    Err(DenyReason::NotOwner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;

    fn claims(kind: PrincipalType, role: &str) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            email: "p@x.com".into(),
            principal_type: kind,
            role: role.into(),
            iat: 0,
            exp: 0,
            iss: "iss".into(),
            aud: "aud".into(),
            kind: TokenKind::Access,
            jti: Uuid::new_v4(),
        }
    }

    #[test]
    fn self_access_is_allowed() {
        let caller = claims(PrincipalType::User, "free");
        assert!(check(caller.sub, &caller).is_ok());
    }

    #[test]
    fn every_admin_role_bypasses_ownership() {
        for role in ["super", "support", "quotations", "system"] {
            let caller = claims(PrincipalType::Admin, role);
            assert!(check(Uuid::new_v4(), &caller).is_ok());
        }
    }

    #[test]
    fn free_user_denied_with_generic_reason() {
        let caller = claims(PrincipalType::User, "free");
        assert_eq!(check(Uuid::new_v4(), &caller), Err(DenyReason::NotOwner));
    }

    #[test]
    fn premium_user_denied_with_upsell_reason() {
        let caller = claims(PrincipalType::User, "premium");
        assert_eq!(
            check(Uuid::new_v4(), &caller),
            Err(DenyReason::UpgradeRequired)
        );
    }
}
