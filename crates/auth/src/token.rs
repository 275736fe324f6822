//! HS256 session token codec.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::claims::{SessionClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Mints session tokens.
pub trait JwtSigner: Send + Sync {
    fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError>;
}

/// Verifies session tokens and returns their claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError>;
}

/// Shared-secret (HS256) implementation of both halves.
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl Hs256Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let secret = secret.as_ref();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

impl core::fmt::Debug for Hs256Jwt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256Jwt").finish_non_exhaustive()
    }
}

impl JwtSigner for Hs256Jwt {
    fn sign(&self, claims: &SessionClaims) -> Result<String, TokenError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Sign(e.to_string()))
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        // Expiry is checked by `validate_claims` against the caller's clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Invalid(e.to_string()))?;

        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizadmin_core::UserId;
    use chrono::Duration;

    use crate::{Principal, Role};

    fn claims(now: DateTime<Utc>) -> SessionClaims {
        let principal = Principal {
            user_id: UserId::from_raw(12),
            name: "José María Ñoño".to_string(),
            email: "jose@example.com".to_string(),
            role: Role::ASSISTANT,
        };
        SessionClaims::for_principal(&principal, now, Duration::hours(24))
    }

    #[test]
    fn signed_token_validates_with_same_secret() {
        let jwt = Hs256Jwt::new("test-secret");
        let now = Utc::now();
        let token = jwt.sign(&claims(now)).unwrap();

        let decoded = jwt.validate(&token, now).unwrap();
        assert_eq!(decoded.sub, UserId::from_raw(12));
        assert_eq!(decoded.name, "José María Ñoño");
        assert_eq!(decoded.role, Role::ASSISTANT);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let now = Utc::now();
        let token = Hs256Jwt::new("secret-a").sign(&claims(now)).unwrap();
        let err = Hs256Jwt::new("secret-b").validate(&token, now).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = Hs256Jwt::new("test-secret");
        let issued = Utc::now() - Duration::hours(30);
        let token = jwt.sign(&claims(issued)).unwrap();
        let err = jwt.validate(&token, Utc::now()).unwrap_err();
        assert!(matches!(err, TokenError::Claims(TokenValidationError::Expired)));
    }
}
