//! Strongly-typed identifiers used across the domain.
//!
//! Records are keyed by database-assigned integers. Every identifier is a
//! positive `i64`; the newtypes keep merchant, establishment and user ids from
//! being mixed up at call sites.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a merchant record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MerchantId(i64);

/// Identifier of an establishment owned by a merchant.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstablishmentId(i64);

/// Identifier of a user account (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

macro_rules! impl_int_newtype {
    ($t:ty, $label:literal) => {
        impl $t {
            /// Wrap a raw identifier, rejecting zero and negative values.
            pub fn new(raw: i64) -> Result<Self, DomainError> {
                if raw <= 0 {
                    return Err(DomainError::validation(concat!(
                        $label,
                        " id must be a positive integer"
                    )));
                }
                Ok(Self(raw))
            }

            /// Wrap a value that is already known to be valid (e.g. read back from storage).
            pub const fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: i64 = s.parse().map_err(|_| {
                    DomainError::validation(concat!($label, " id must be a positive integer"))
                })?;
                Self::new(raw)
            }
        }
    };
}

impl_int_newtype!(MerchantId, "merchant");
impl_int_newtype!(EstablishmentId, "establishment");
impl_int_newtype!(UserId, "user");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_integers_only() {
        assert_eq!("42".parse::<MerchantId>().unwrap().get(), 42);
        assert!("0".parse::<MerchantId>().is_err());
        assert!("-3".parse::<MerchantId>().is_err());
        assert!("1.5".parse::<MerchantId>().is_err());
        assert!("abc".parse::<MerchantId>().is_err());
    }

    #[test]
    fn rejection_names_the_identifier() {
        let err = UserId::new(0).unwrap_err();
        assert_eq!(err, DomainError::validation("user id must be a positive integer"));
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&MerchantId::from_raw(7)).unwrap();
        assert_eq!(json, "7");
    }
}
