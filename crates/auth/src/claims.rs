use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bizadmin_core::UserId;

use crate::{Principal, Role};

/// Session token claims (transport-agnostic).
///
/// Timestamps travel as seconds since the epoch (`iat` / `exp`), which is what
/// standard JWT tooling expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user account id.
    pub sub: UserId,

    pub name: String,

    pub email: String,

    pub role: Role,

    /// Issued-at timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub iat: DateTime<Utc>,

    /// Expiration timestamp.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub exp: DateTime<Utc>,
}

impl SessionClaims {
    pub fn for_principal(principal: &Principal, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            sub: principal.user_id,
            name: principal.name.clone(),
            email: principal.email.clone(),
            role: principal.role.clone(),
            iat: issued_at,
            exp: issued_at + ttl,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate the claim time window.
///
/// Signature verification is done by the token codec; this only checks time.
/// `iat`/`exp` carry whole seconds, so a token is accepted from the start of
/// the second it was issued in.
pub fn validate_claims(claims: &SessionClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now.timestamp() < claims.iat.timestamp() {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(iat: DateTime<Utc>, ttl: Duration) -> SessionClaims {
        let principal = Principal {
            user_id: UserId::from_raw(1),
            name: "Ana Gómez".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::ADMIN,
        };
        SessionClaims::for_principal(&principal, iat, ttl)
    }

    #[test]
    fn accepts_tokens_inside_their_window() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now, Duration::hours(24)), now), Ok(()));
    }

    #[test]
    fn rejects_expired_future_and_inverted_windows() {
        let now = Utc::now();
        assert_eq!(
            validate_claims(&claims(now - Duration::hours(25), Duration::hours(24)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims(now + Duration::minutes(5), Duration::hours(1)), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(now, Duration::zero()), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn timestamps_serialize_as_epoch_seconds() {
        let now = Utc::now();
        let json = serde_json::to_value(claims(now, Duration::hours(1))).unwrap();
        assert_eq!(json["iat"].as_i64(), Some(now.timestamp()));
        assert_eq!(json["sub"].as_i64(), Some(1));
        assert_eq!(json["role"], "admin");
    }
}
