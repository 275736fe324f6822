use serde::{Deserialize, Serialize};

use bizadmin_core::UserId;

use crate::Role;

/// A fully resolved, authenticated identity.
///
/// Produced by the transport layer after the session token has been verified
/// and the account re-loaded; consumed by authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn has_role(&self, role: &Role) -> bool {
        &self.role == role
    }
}
