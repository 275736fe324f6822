use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::{Cache, CacheError};

/// Entry count that triggers the first sweep of expired entries.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug)]
struct State {
    entries: HashMap<String, Entry>,
    /// Size at which the next write sweeps expired entries.
    sweep_at: usize,
}

impl Default for State {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            sweep_at: SWEEP_THRESHOLD,
        }
    }
}

impl State {
    /// Drop expired entries once the map reaches `sweep_at`, then move the
    /// mark to twice the surviving size so sweeps stay amortised.
    fn sweep_if_due(&mut self, now: Instant) {
        if self.entries.len() < self.sweep_at {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        self.sweep_at = (self.entries.len() * 2).max(SWEEP_THRESHOLD);
        tracing::debug!(
            removed = before - self.entries.len(),
            remaining = self.entries.len(),
            "swept expired cache entries"
        );
    }
}

/// Process-local cache for tests and single-instance runs.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    inner: RwLock<State>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        match self.inner.read() {
            Ok(state) => state.entries.values().filter(|e| e.expires_at > now).count(),
            Err(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .read()
            .map(|state| state.entries.get(key).is_some_and(|e| e.expires_at > now))
            .unwrap_or(false)
    }

    /// Stored entries, expired ones included.
    #[cfg(test)]
    fn stored(&self) -> usize {
        self.inner.read().map(|state| state.entries.len()).unwrap_or(0)
    }
}

fn poisoned() -> CacheError {
    CacheError::Unavailable("in-memory cache lock poisoned".to_string())
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let state = self.inner.read().map_err(|_| poisoned())?;
            match state.entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        let mut state = self.inner.write().map_err(|_| poisoned())?;
        if state.entries.get(key).is_some_and(|e| e.expires_at <= now) {
            state.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| CacheError::Command(format!("ttl of {ttl:?} is out of range")))?;

        let mut state = self.inner.write().map_err(|_| poisoned())?;
        state.sweep_if_due(now);
        state
            .entries
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        let mut state = self.inner.write().map_err(|_| poisoned())?;
        state.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del() {
        let cache = InMemoryCache::new();
        cache
            .set("merchant:1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("merchant:1").await.unwrap().as_deref(), Some("{}"));

        cache.del("merchant:1").await.unwrap();
        assert_eq!(cache.get("merchant:1").await.unwrap(), None);
        cache.del("merchant:1").await.unwrap();
    }

    #[tokio::test]
    async fn expired_entries_are_misses() {
        let cache = InMemoryCache::new();
        cache
            .set("k", "v".to_string(), Duration::from_millis(0))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_ttl_is_rejected() {
        let cache = InMemoryCache::new();
        let err = cache
            .set("k", "v".to_string(), Duration::from_secs(u64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Command(_)));
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entries_are_swept_on_write() {
        let cache = InMemoryCache::new();
        for page in 0..10_000 {
            cache
                .set(&format!("merchants:page:{page}:limit:5"), "[]".to_string(), Duration::ZERO)
                .await
                .unwrap();
        }
        cache
            .set("merchant:1", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.len(), 1);
        assert!(cache.stored() <= SWEEP_THRESHOLD, "stored {}", cache.stored());
        assert!(cache.contains("merchant:1"));
    }

    #[tokio::test]
    async fn live_entries_survive_a_sweep() {
        let cache = InMemoryCache::new();
        for id in 0..SWEEP_THRESHOLD {
            cache
                .set(&format!("merchant:{id}"), "{}".to_string(), Duration::from_secs(60))
                .await
                .unwrap();
        }
        cache
            .set("merchant:last", "{}".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len(), SWEEP_THRESHOLD + 1);
        assert_eq!(cache.stored(), SWEEP_THRESHOLD + 1);
    }
}
