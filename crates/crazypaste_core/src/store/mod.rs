//! String key-value persistence port and its backends.
//!
//! Every collection in CrazyPaste is a JSON blob stored under a named key.
//! Callers never talk to a backend directly; they go through
//! [`KeyValueStore`] and the [`read_json`]/[`write_json`] helpers, which own
//! the corrupt-blob repair policy.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::error::AppError;
use serde::{de::DeserializeOwned, Serialize};

/// Persistent per-origin string store.
///
/// Implementations must be safe to share between threads. Writes replace the
/// whole value for a key; there is no partial update.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// Returns [`AppError::QuotaExceeded`] when the write would exceed the
    /// configured byte quota; the previous value is left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;

    /// Remove `key`.
    ///
    /// # Returns
    /// `true` when a value was removed.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be written.
    fn remove(&self, key: &str) -> Result<bool, AppError>;

    /// List every stored key in ascending order.
    ///
    /// # Errors
    /// Returns an error when the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>, AppError>;
}

/// Reject a write that would push usage past `quota`.
///
/// Usage counts key and value bytes. `replaced` is the size of the entry being
/// overwritten, if any.
pub(crate) fn ensure_within_quota(
    quota: Option<usize>,
    used: usize,
    replaced: usize,
    key: &str,
    value: &str,
) -> Result<(), AppError> {
    let Some(quota) = quota else {
        return Ok(());
    };
    let projected = used.saturating_sub(replaced) + key.len() + value.len();
    if projected > quota {
        return Err(AppError::QuotaExceeded(format!(
            "writing '{}' needs {} bytes but the quota is {} bytes",
            key, projected, quota
        )));
    }
    Ok(())
}

/// Read and decode the JSON blob stored under `key`.
///
/// A blob that fails to decode is discarded so the caller can reinitialize an
/// empty structure in its place.
///
/// # Returns
/// `Ok(None)` when the key is missing or held corrupt JSON.
///
/// # Errors
/// Returns an error when the backend read (or the repair removal) fails.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, AppError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!("Discarding corrupt blob under '{}': {}", key, err);
            store.remove(key)?;
            Ok(None)
        }
    }
}

/// Encode `value` as JSON and store it under `key`.
///
/// # Errors
/// Returns serialization errors and backend write errors, including
/// [`AppError::QuotaExceeded`].
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    let encoded = serde_json::to_string(value)?;
    store.set(key, &encoded)
}

/// Write `value` under `primary` and `mirror`, leaving `primary` as it was
/// when the mirror write fails.
///
/// # Errors
/// Returns the first serialization or write error. A failed rollback is
/// logged and the original error is still returned.
pub fn write_json_mirrored<T, M>(
    store: &dyn KeyValueStore,
    primary: &str,
    value: &T,
    mirror: &str,
    mirror_value: &M,
) -> Result<(), AppError>
where
    T: Serialize + ?Sized,
    M: Serialize + ?Sized,
{
    let encoded = serde_json::to_string(value)?;
    let mirror_encoded = serde_json::to_string(mirror_value)?;
    let previous = store.get(primary)?;
    store.set(primary, &encoded)?;
    if let Err(err) = store.set(mirror, &mirror_encoded) {
        let restored = match &previous {
            Some(old) => store.set(primary, old),
            None => store.remove(primary).map(|_| ()),
        };
        if let Err(rollback) = restored {
            tracing::warn!("Failed to restore {} after mirror write failed: {}", primary, rollback);
        }
        return Err(err);
    }
    Ok(())
}

/// Decode a JSON array stored under `key` one row at a time.
///
/// Rows that do not decode as `T` are logged and skipped; the rest are kept.
/// A blob that is not an array at all is treated like [`read_json`] treats
/// corrupt data.
///
/// # Errors
/// Returns backend read errors.
pub fn read_json_rows<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>, AppError> {
    let rows: Vec<serde_json::Value> = read_json(store, key)?.unwrap_or_default();
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            serde_json::from_value(row)
                .inspect_err(|err| tracing::warn!("Skipping row {} of {}: {}", index, key, err))
                .ok()
        })
        .collect())
}
