//! Cache keys and fail-open read/write policy for merchant data.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use bizadmin_core::MerchantId;

use super::Cache;

/// Page sizes whose first page is dropped after any merchant mutation.
pub const LIST_LIMITS_TO_INVALIDATE: [u32; 3] = [5, 10, 20];

pub fn list_key(page: u32, limit: u32) -> String {
    format!("merchants:page:{page}:limit:{limit}")
}

pub fn merchant_key(id: MerchantId) -> String {
    format!("merchant:{id}")
}

pub fn totals_key(id: MerchantId) -> String {
    format!("merchant:{id}:totals")
}

/// Typed wrapper around a [`Cache`].
///
/// Every cache failure degrades to "no cache": reads become misses (and the
/// offending key is dropped), writes and deletes are logged and skipped.
#[derive(Clone)]
pub struct MerchantCache {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl MerchantCache {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed; treating as miss");
                self.forget(key).await;
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cached value is corrupt; dropping it");
                self.forget(key).await;
                None
            }
        }
    }

    pub async fn write<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to serialise value for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, raw, self.ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    pub async fn forget(&self, key: &str) {
        if let Err(e) = self.cache.del(key).await {
            tracing::warn!(key, error = %e, "cache delete failed");
        }
    }

    /// Drop the first page of every commonly requested page size.
    pub async fn invalidate_lists(&self) {
        for limit in LIST_LIMITS_TO_INVALIDATE {
            self.forget(&list_key(1, limit)).await;
        }
    }

    /// Drop a merchant's detail and totals entries.
    pub async fn invalidate_merchant(&self, id: MerchantId) {
        self.forget(&merchant_key(id)).await;
        self.forget(&totals_key(id)).await;
    }
}
