//! `bizadmin-core`: shared building blocks.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! strongly-typed identifiers and the domain error taxonomy every other crate
//! reports through.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{EstablishmentId, MerchantId, UserId};
