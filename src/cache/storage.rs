//! Key/value storage areas backing the cache store

use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised by a storage area
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Writing would exceed the area's byte quota
    #[error("Storage quota exceeded: {used} + {requested} bytes > {quota} bytes")]
    QuotaExceeded {
        used: usize,
        requested: usize,
        quota: usize,
    },

    /// Storage is no longer usable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A string key/value area with session lifetime
pub trait StorageArea: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove_item(&self, key: &str);

    fn keys(&self) -> Vec<String>;
}

/// In-process storage area living as long as the application session
///
/// Sizes are counted as key bytes plus value bytes. With a quota set, writes
/// that would exceed it fail and nothing is evicted.
#[derive(Debug, Default)]
pub struct SessionStorage {
    items: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage area that refuses writes beyond `quota_bytes`
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently held
    pub fn used_bytes(&self) -> usize {
        self.items
            .read()
            .map(|items| items.iter().map(|(k, v)| k.len() + v.len()).sum())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageArea for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))?;

        if let Some(quota) = self.quota_bytes {
            let existing = items.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
            let used: usize = items.iter().map(|(k, v)| k.len() + v.len()).sum::<usize>() - existing;
            let requested = key.len() + value.len();
            if used + requested > quota {
                return Err(StorageError::QuotaExceeded {
                    used,
                    requested,
                    quota,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        if let Ok(mut items) = self.items.write() {
            items.remove(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.items
            .read()
            .map(|items| items.keys().cloned().collect())
            .unwrap_or_default()
    }
}
