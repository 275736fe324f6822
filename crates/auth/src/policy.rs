//! Per-operation role policy.
//!
//! Each HTTP-exposed operation declares the roles allowed to run it. An empty
//! set means "any authenticated user".

use serde::Serialize;

use crate::Role;

const ANY_AUTHENTICATED: &[Role] = &[];
const ADMIN_ONLY: &[Role] = &[Role::ADMIN];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    VerifySession,
    ListDepartments,
    ListMerchants,
    GetMerchant,
    MerchantTotals,
    CreateMerchant,
    UpdateMerchant,
    UpdateMerchantStatus,
    DeleteMerchant,
    ExportMerchants,
}

impl Operation {
    pub fn permitted_roles(&self) -> &'static [Role] {
        match self {
            Operation::DeleteMerchant | Operation::ExportMerchants => ADMIN_ONLY,
            Operation::VerifySession
            | Operation::ListDepartments
            | Operation::ListMerchants
            | Operation::GetMerchant
            | Operation::MerchantTotals
            | Operation::CreateMerchant
            | Operation::UpdateMerchant
            | Operation::UpdateMerchantStatus => ANY_AUTHENTICATED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::VerifySession => "auth.verify_session",
            Operation::ListDepartments => "merchants.departments",
            Operation::ListMerchants => "merchants.list",
            Operation::GetMerchant => "merchants.get",
            Operation::MerchantTotals => "merchants.totals",
            Operation::CreateMerchant => "merchants.create",
            Operation::UpdateMerchant => "merchants.update",
            Operation::UpdateMerchantStatus => "merchants.update_status",
            Operation::DeleteMerchant => "merchants.delete",
            Operation::ExportMerchants => "merchants.export",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
