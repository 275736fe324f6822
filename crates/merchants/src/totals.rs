//! Revenue / headcount aggregation over a merchant's establishments.

use serde::{Deserialize, Serialize};

use crate::merchant::EstablishmentFigures;

/// Derived, non-persisted totals for one merchant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MerchantTotals {
    pub total_revenue: f64,
    pub total_employees: i64,
}

impl MerchantTotals {
    pub const ZERO: Self = Self {
        total_revenue: 0.0,
        total_employees: 0,
    };
}

impl Default for MerchantTotals {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Sum revenue and employee counts.
///
/// Missing values contribute zero; so does a NaN revenue. Infinite revenue is
/// not filtered and propagates through the sum.
pub fn calculate_merchant_totals(establishments: &[EstablishmentFigures]) -> MerchantTotals {
    if establishments.is_empty() {
        return MerchantTotals::ZERO;
    }

    establishments
        .iter()
        .fold(MerchantTotals::ZERO, |acc, e| MerchantTotals {
            total_revenue: acc.total_revenue + e.revenue.filter(|r| !r.is_nan()).unwrap_or(0.0),
            total_employees: acc.total_employees.saturating_add(e.employee_count.unwrap_or(0)),
        })
}
