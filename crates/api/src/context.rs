use bizadmin_auth::{Principal, Role};
use bizadmin_core::UserId;

/// Principal context for a request (authenticated identity + role).
///
/// Inserted by the auth middleware after the session token has been verified
/// and the account re-loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn user_id(&self) -> UserId {
        self.principal.user_id
    }

    pub fn role(&self) -> &Role {
        &self.principal.role
    }
}
