//! `bizadmin-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash and verify passwords, mint and check session tokens, and decide
//! whether a resolved principal may run an operation.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthzError, authorize};
pub use claims::{SessionClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password};
pub use policy::Operation;
pub use principal::Principal;
pub use roles::Role;
pub use token::{Hs256Jwt, JwtSigner, JwtValidator, TokenError};
