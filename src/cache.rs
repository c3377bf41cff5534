//! Detail cache backing list enrichment.
//!
//! The cache maps a content id to its serialized detail blob with a
//! time-to-live. Entries are advisory: absence or expiry never means the
//! content does not exist, only that it must be resolved again from the
//! store. The enrichment engine treats every cache failure as a miss, so an
//! unavailable cache degrades throughput, never correctness.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Default entry lifetime, matching the one-hour staleness window of the
/// list retrieval contract.
pub const DEFAULT_DETAIL_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("detail cache unavailable: {0}")]
    Unavailable(String),
}

/// Key-value store with per-entry expiry, keyed by content id.
///
/// Kept behind a trait so tests can inject failing or observable
/// implementations and so the in-process store could be swapped for a
/// networked tier without touching the engine.
#[rocket::async_trait]
pub trait DetailCache: Send + Sync {
    /// Fetch a live entry. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value, replacing any previous entry for the key. The entry
    /// expires `ttl` after the write.
    async fn set_with_expiry(&self, key: &str, value: String, ttl: Duration)
    -> Result<(), CacheError>;
}

struct CacheSlot {
    value: String,
    expires_at: Instant,
}

/// In-process detail cache shared by all requests.
///
/// DashMap gives lock-free-ish concurrent reads and writes; expiry is
/// enforced lazily on read, with expired slots removed as they are seen.
/// Writes are last-write-wins per key, which is safe because the same
/// content id always resolves to the same detail blob.
#[derive(Default)]
pub struct MemoryDetailCache {
    entries: DashMap<String, CacheSlot>,
}

impl MemoryDetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|slot| slot.expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[rocket::async_trait]
impl DetailCache for MemoryDetailCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        if let Some(slot) = self.entries.get(key) {
            if slot.expires_at > Instant::now() {
                return Ok(Some(slot.value.clone()));
            }
        } else {
            return Ok(None);
        }

        // Entry exists but is stale; drop it so the map does not grow
        // without bound under a churning working set.
        self.entries
            .remove_if(key, |_, slot| slot.expires_at <= Instant::now());
        Ok(None)
    }

    async fn set_with_expiry(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.entries.insert(
            key.to_string(),
            CacheSlot {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips_within_ttl() {
        let cache = MemoryDetailCache::new();
        cache
            .set_with_expiry("m1", "{\"title\":\"Inception\"}".to_string(), DEFAULT_DETAIL_TTL)
            .await
            .unwrap();

        let hit = cache.get("m1").await.unwrap();
        assert_eq!(hit.as_deref(), Some("{\"title\":\"Inception\"}"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entries_read_as_misses_and_are_evicted() {
        let cache = MemoryDetailCache::new();
        cache
            .set_with_expiry("m1", "stale".to_string(), Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(cache.get("m1").await.unwrap(), None);
        // The stale slot was removed on read.
        assert!(cache.entries.get("m1").is_none());
    }

    #[tokio::test]
    async fn set_replaces_previous_value_and_deadline() {
        let cache = MemoryDetailCache::new();
        cache
            .set_with_expiry("m1", "old".to_string(), Duration::ZERO)
            .await
            .unwrap();
        cache
            .set_with_expiry("m1", "new".to_string(), DEFAULT_DETAIL_TTL)
            .await
            .unwrap();

        assert_eq!(cache.get("m1").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn unknown_key_is_a_miss() {
        let cache = MemoryDetailCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
        assert!(cache.is_empty());
    }
}
