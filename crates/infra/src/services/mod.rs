//! Application services: domain rules wired to storage and cache.

mod auth;
mod merchants;

pub use auth::{AuthService, INVALID_CREDENTIALS, LoginOutcome, SessionUser};
pub use merchants::{ExportFile, MerchantService, Outcome};
