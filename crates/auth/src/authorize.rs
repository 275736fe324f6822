use thiserror::Error;

use bizadmin_core::DomainError;

use crate::{Operation, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user lacks the required roles [{required}] for {operation}; user has role '{actual}'")]
    Forbidden {
        operation: Operation,
        required: String,
        actual: String,
    },
}

impl From<AuthzError> for DomainError {
    fn from(err: AuthzError) -> Self {
        DomainError::forbidden(err.to_string())
    }
}

/// Authorize a principal for an operation.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, operation: Operation) -> Result<(), AuthzError> {
    let permitted = operation.permitted_roles();
    if permitted.is_empty() || permitted.iter().any(|r| principal.has_role(r)) {
        return Ok(());
    }

    Err(AuthzError::Forbidden {
        operation,
        required: permitted
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        actual: principal.role.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizadmin_core::UserId;

    use crate::Role;

    fn principal(role: Role) -> Principal {
        Principal {
            user_id: UserId::from_raw(1),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
        }
    }

    #[test]
    fn open_operations_allow_any_role() {
        let p = principal(Role::new("auditor"));
        assert_eq!(authorize(&p, Operation::ListMerchants), Ok(()));
        assert_eq!(authorize(&p, Operation::UpdateMerchantStatus), Ok(()));
    }

    #[test]
    fn admin_only_operations() {
        assert_eq!(authorize(&principal(Role::ADMIN), Operation::DeleteMerchant), Ok(()));
        assert_eq!(authorize(&principal(Role::ADMIN), Operation::ExportMerchants), Ok(()));

        let err = authorize(&principal(Role::ASSISTANT), Operation::DeleteMerchant).unwrap_err();
        assert_eq!(
            err.to_string(),
            "user lacks the required roles [admin] for merchants.delete; user has role 'assistant'"
        );
        assert!(matches!(DomainError::from(err), DomainError::Forbidden(_)));
    }
}
