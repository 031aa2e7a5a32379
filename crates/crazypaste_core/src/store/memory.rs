//! In-process store used by tests and ephemeral sessions.

use super::{ensure_within_quota, KeyValueStore};
use crate::error::AppError;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Map-backed [`KeyValueStore`] with an optional byte quota.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    /// Create an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that rejects writes past `quota_bytes`.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::StorageMessage("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries()?;
        let used: usize = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
        let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
        ensure_within_quota(self.quota_bytes, used, replaced, key, value)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.entries()?.remove(key).is_some())
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        Ok(self.entries()?.keys().cloned().collect())
    }
}
