//! In-memory TTL cache shared by [`AsyncData`](super::AsyncData) resources

use chrono::{DateTime, Utc};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

struct TtlEntry {
    value: Arc<dyn Any + Send + Sync>,
    inserted: Instant,
    inserted_at: DateTime<Utc>,
    ttl: Duration,
}

/// A cache hit together with when it was inserted
#[derive(Debug, Clone)]
pub struct CachedValue<T> {
    pub value: T,
    /// Insertion time on tokio's clock, the one entries age on
    pub inserted: Instant,
    /// Insertion wall-clock time, for display
    pub inserted_at: DateTime<Utc>,
}

impl TtlEntry {
    fn is_fresh(&self) -> bool {
        self.inserted.elapsed() < self.ttl
    }
}

/// Type-erased, time-bounded cache keyed by string
///
/// Independent of the session [`CacheStore`](crate::cache::CacheStore).
/// Ages are measured on tokio's clock.
#[derive(Default)]
pub struct TtlCache {
    entries: Mutex<HashMap<String, TtlEntry>>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, TtlEntry>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Fresh value under `key`, if it holds a `T`
    ///
    /// Expired entries are removed on access.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|hit| hit.value)
    }

    /// Like [`get`](Self::get), keeping the insertion times
    pub fn get_entry<T: Clone + Send + Sync + 'static>(&self, key: &str) -> Option<CachedValue<T>> {
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_fresh() => {
                entry.value.downcast_ref::<T>().map(|value| CachedValue {
                    value: value.clone(),
                    inserted: entry.inserted,
                    inserted_at: entry.inserted_at,
                })
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: impl Into<String>, value: T, ttl: Duration) {
        self.entries().insert(
            key.into(),
            TtlEntry {
                value: Arc::new(value),
                inserted: Instant::now(),
                inserted_at: Utc::now(),
                ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries().remove(key);
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh());
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_then_expired() {
        let cache = TtlCache::new();
        cache.insert("gdp", 42u64, Duration::from_secs(60));
        assert_eq!(cache.get::<u64>("gdp"), Some(42));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get::<u64>("gdp"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_keeps_insertion_time() {
        let cache = TtlCache::new();
        let before = Utc::now();
        cache.insert("gdp", 42u64, Duration::from_secs(60));
        let inserted = Instant::now();

        tokio::time::advance(Duration::from_secs(30)).await;
        let hit = cache.get_entry::<u64>("gdp").unwrap();
        assert_eq!(hit.value, 42);
        assert_eq!(hit.inserted, inserted);
        assert_eq!(hit.inserted.elapsed(), Duration::from_secs(30));
        assert!(hit.inserted_at >= before);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_miss() {
        let cache = TtlCache::new();
        cache.insert("k", String::from("text"), Duration::from_secs(60));
        assert_eq!(cache.get::<u64>("k"), None);
        assert_eq!(cache.get::<String>("k").as_deref(), Some("text"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = TtlCache::new();
        cache.insert("short", 1u8, Duration::from_secs(1));
        cache.insert("long", 2u8, Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);

        cache.remove("long");
        assert!(cache.is_empty());
    }
}
