//! API-side authorization guard.
//!
//! Handlers call this before touching a service, keeping the services
//! themselves role-agnostic.

use bizadmin_auth::{Operation, authorize};
use bizadmin_core::DomainError;

use crate::context::PrincipalContext;

/// Check that the caller may perform `operation`.
pub fn authorize_operation(principal: &PrincipalContext, operation: Operation) -> Result<(), DomainError> {
    authorize(principal.principal(), operation).map_err(|err| {
        tracing::warn!(
            user_id = %principal.user_id(),
            role = %principal.role(),
            operation = %operation,
            "operation forbidden"
        );
        DomainError::from(err)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizadmin_auth::{Principal, Role};
    use bizadmin_core::UserId;

    fn ctx(role: Role) -> PrincipalContext {
        PrincipalContext::new(Principal {
            user_id: UserId::from_raw(5),
            name: "Luis".to_string(),
            email: "luis@example.com".to_string(),
            role,
        })
    }

    #[test]
    fn assistants_cannot_export_or_delete() {
        for op in [Operation::ExportMerchants, Operation::DeleteMerchant] {
            assert!(matches!(
                authorize_operation(&ctx(Role::ASSISTANT), op),
                Err(DomainError::Forbidden(_))
            ));
            assert_eq!(authorize_operation(&ctx(Role::ADMIN), op), Ok(()));
        }
        assert_eq!(
            authorize_operation(&ctx(Role::ASSISTANT), Operation::CreateMerchant),
            Ok(())
        );
    }
}
