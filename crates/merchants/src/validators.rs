use bizadmin_core::{DomainError, MerchantId};

use crate::reference::municipalities;

/// Whether `municipality` names a known city, ignoring case.
///
/// No trimming is applied: surrounding whitespace makes the check fail.
pub fn validate_municipality(municipality: &str) -> bool {
    if municipality.is_empty() {
        return false;
    }

    let wanted = municipality.to_lowercase();
    municipalities().any(|city| city.to_lowercase() == wanted)
}

/// Validate a numeric merchant id as received from loosely-typed input.
///
/// Zero, negatives, fractions, NaN and infinities are rejected.
pub fn validate_merchant_id(raw: f64) -> Result<MerchantId, DomainError> {
    if !raw.is_finite() || raw <= 0.0 || raw.fract() != 0.0 || raw > i64::MAX as f64 {
        return Err(DomainError::validation("merchant id must be a positive integer"));
    }
    MerchantId::new(raw as i64)
}
