//! Key/value cache with per-entry expiry.
//!
//! Values are opaque strings (JSON in practice). Callers treat every cache
//! failure as a miss; see [`MerchantCache`].

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

mod in_memory;
mod merchants;
#[cfg(feature = "redis")]
mod redis;

pub use in_memory::InMemoryCache;
pub use merchants::{LIST_LIMITS_TO_INVALIDATE, MerchantCache, list_key, merchant_key, totals_key};
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("cache command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removing a missing key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}
