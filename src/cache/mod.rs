//! Session cache store for fetched source data
//!
//! A namespaced key/value wrapper over a [`StorageArea`]. Payloads are stored
//! as JSON [`CacheEntry`] values under `{prefix}-{key}`. The cache is
//! advisory: read failures are logged and treated as misses, write failures
//! are logged and dropped. Nothing is evicted; once a quota-limited area is
//! full, further writes are refused.
//!
//! # Example
//!
//! ```rust,ignore
//! use govnews::cache::{CacheConfig, CacheStore, SessionStorage};
//! use std::sync::Arc;
//!
//! let store = CacheStore::new(Arc::new(SessionStorage::new()), CacheConfig::default());
//! store.set("worldbank-TUR", &indicators);
//! let cached: Option<Vec<WorldBankIndicator>> = store.get("worldbank-TUR");
//! ```

mod storage;

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;

pub use storage::{SessionStorage, StorageArea, StorageError};

use crate::metrics;

/// Default key namespace
pub const DEFAULT_PREFIX: &str = "govnews-cache";

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Key prefix for namespacing
    pub prefix: String,

    /// Entry lifetime in seconds; `None` keeps entries for the whole session
    pub ttl_secs: Option<u64>,

    /// Byte quota of the backing session storage; `None` is unbounded
    pub quota_bytes: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ttl_secs: None,
            quota_bytes: None,
        }
    }
}

/// Serialized form of a cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Namespaced JSON cache over a storage area
#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn StorageArea>,
    config: CacheConfig,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn StorageArea>, config: CacheConfig) -> Self {
        Self { storage, config }
    }

    /// Storage key for a logical key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}-{key}", self.config.prefix)
    }

    /// Read a cached value; corrupt or expired entries read as misses
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);
        let Some(raw) = self.storage.get_item(&storage_key) else {
            metrics::record_cache_lookup(false);
            return None;
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "Failed to read cache entry");
                metrics::record_cache_lookup(false);
                return None;
            }
        };

        if self.is_expired(entry.timestamp) {
            tracing::debug!(key = %storage_key, "Cache entry expired");
            self.storage.remove_item(&storage_key);
            metrics::record_cache_lookup(false);
            return None;
        }

        tracing::debug!(key = %storage_key, "Cache hit");
        metrics::record_cache_lookup(true);
        Some(entry.data)
    }

    /// Store a value; failures are logged and otherwise ignored
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let storage_key = self.storage_key(key);
        let entry = CacheEntry {
            data,
            timestamp: Some(Utc::now()),
        };

        let raw = match serde_json::to_string(&entry) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.storage.set_item(&storage_key, &raw) {
            tracing::warn!(key = %storage_key, error = %e, "Failed to write cache entry");
        }
    }

    /// Remove one entry
    pub fn remove(&self, key: &str) {
        self.storage.remove_item(&self.storage_key(key));
    }

    /// Remove every entry in this store's namespace
    pub fn clear(&self) -> usize {
        let namespace = format!("{}-", self.config.prefix);
        let keys: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&namespace))
            .collect();

        for key in &keys {
            self.storage.remove_item(key);
        }

        tracing::info!(count = keys.len(), "Cleared cache namespace");
        keys.len()
    }

    /// Number of entries in this store's namespace
    pub fn len(&self) -> usize {
        let namespace = format!("{}-", self.config.prefix);
        self.storage
            .keys()
            .iter()
            .filter(|k| k.starts_with(&namespace))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get config reference
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn is_expired(&self, timestamp: Option<DateTime<Utc>>) -> bool {
        match (self.config.ttl_secs, timestamp) {
            (Some(ttl), Some(written)) => {
                let ttl = Duration::seconds(i64::try_from(ttl).unwrap_or(i64::MAX));
                Utc::now() - written > ttl
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn store() -> (Arc<SessionStorage>, CacheStore) {
        let storage = Arc::new(SessionStorage::new());
        let store = CacheStore::new(storage.clone(), CacheConfig::default());
        (storage, store)
    }

    /// Arbitrary JSON documents; floats are dyadic so their text form is exact
    fn json_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            (any::<i32>(), 0u32..4).prop_map(|(m, k)| Value::from(f64::from(m) / f64::from(1u32 << k))),
            ".{0,12}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|map| Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_round_trip(value in json_value(), key in "[a-z]{1,10}-[A-Z]{3}") {
            let (_, store) = store();
            store.set(&key, &value);
            prop_assert_eq!(store.get::<Value>(&key), Some(value));
        }
    }

    #[test]
    fn test_round_trip_of_record() {
        let (_, store) = store();
        let value = json!({"gdp": 1.1e12, "years": ["2022", "2023"], "nested": {"ok": true}});

        store.set("worldbank-TUR", &value);
        let cached: Option<serde_json::Value> = store.get("worldbank-TUR");
        assert_eq!(cached, Some(value));
    }

    #[test]
    fn test_miss_on_absent_key() {
        let (_, store) = store();
        assert!(store.get::<String>("never-written").is_none());
    }

    #[test]
    fn test_keys_are_prefixed() {
        let (storage, store) = store();
        store.set("gdelt-Turkey", &vec!["a", "b"]);

        assert!(storage.get_item("govnews-cache-gdelt-Turkey").is_some());
        assert!(storage.get_item("gdelt-Turkey").is_none());
    }

    #[test]
    fn test_corrupt_entry_reads_as_miss() {
        let (storage, store) = store();
        storage
            .set_item("govnews-cache-broken", "{not json")
            .unwrap();

        assert!(store.get::<serde_json::Value>("broken").is_none());
    }

    #[test]
    fn test_quota_exceeded_is_swallowed() {
        let storage = Arc::new(SessionStorage::with_quota(64));
        let store = CacheStore::new(storage, CacheConfig::default());

        store.set("big", &"x".repeat(500));
        assert!(store.get::<String>("big").is_none());
    }

    #[test]
    fn test_ttl_expiry() {
        let storage = Arc::new(SessionStorage::new());
        let store = CacheStore::new(
            storage.clone(),
            CacheConfig {
                ttl_secs: Some(60),
                ..Default::default()
            },
        );

        let stale = CacheEntry {
            data: "old",
            timestamp: Some(Utc::now() - Duration::seconds(120)),
        };
        storage
            .set_item("govnews-cache-old", &serde_json::to_string(&stale).unwrap())
            .unwrap();

        assert!(store.get::<String>("old").is_none());
        assert!(storage.get_item("govnews-cache-old").is_none());

        store.set("fresh", &"new");
        assert_eq!(store.get::<String>("fresh").as_deref(), Some("new"));
    }

    #[test]
    fn test_clear_only_touches_namespace() {
        let (storage, store) = store();
        storage.set_item("unrelated", "keep").unwrap();
        store.set("a", &1);
        store.set("b", &2);

        assert_eq!(store.len(), 2);
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(storage.get_item("unrelated").as_deref(), Some("keep"));
    }
}
