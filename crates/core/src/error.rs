//! Domain error model.

use thiserror::Error;

/// Result type used across the domain and service layers.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure a caller can observe is one of these variants. Infrastructure
/// errors (store, cache, token signing) are logged where they happen and
/// re-wrapped into the nearest variant, so the original cause never leaks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or unacceptable input (HTTP 400).
    #[error("{0}")]
    Validation(String),

    /// A requested resource does not exist (HTTP 404).
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with current state (HTTP 409).
    #[error("{0}")]
    Conflict(String),

    /// Authentication failed (HTTP 401). Message is uniform by construction.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation (HTTP 403).
    #[error("{0}")]
    Forbidden(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Stable machine-readable code, used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_request",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_the_bare_message() {
        let err = DomainError::conflict("email already registered");
        assert_eq!(err.to_string(), "email already registered");
        assert_eq!(err.code(), "conflict");
    }
}
