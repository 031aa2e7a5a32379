//! Storage layer: user directory, paste store, stats, and session state.
//!
//! Every accessor shares one [`KeyValueStore`]. Collections are read whole,
//! mutated in memory, and written back whole; there is no cross-handle
//! locking, so independent handles over the same store are last-write-wins.

/// Directory export/import.
pub mod backup;
/// Paste collection helpers.
pub mod paste;
/// Current-user session state and profile overrides.
pub mod session;
/// Derived per-user and global counters.
pub mod stats;
/// User directory helpers.
pub mod users;

use crate::config::Config;
use crate::error::AppError;
use crate::events::EventBus;
use crate::store::{KeyValueStore, MemoryStore, RedbStore};
use std::sync::Arc;

/// Database handle with access to every collection.
pub struct Database {
    pub store: Arc<dyn KeyValueStore>,
    pub events: Arc<EventBus>,
    pub users: users::UserDb,
    pub pastes: paste::PasteDb,
    pub stats: stats::StatsDb,
    pub session: session::SessionDb,
}

#[cfg(test)]
mod tests;

impl Database {
    /// Build a database over an existing store.
    ///
    /// # Returns
    /// A [`Database`] whose accessors share `store` and a fresh event bus.
    pub fn with_store(store: Arc<dyn KeyValueStore>, config: &Config) -> Self {
        let events = Arc::new(EventBus::new());
        let users = users::UserDb::new(store.clone());
        let pastes = paste::PasteDb::new(store.clone(), events.clone(), config.max_paste_chars);
        let stats = stats::StatsDb::new(
            store.clone(),
            pastes.clone(),
            users.clone(),
            events.clone(),
        );
        let session = session::SessionDb::new(store.clone(), users.clone());
        Self {
            store,
            events,
            users,
            pastes,
            stats,
            session,
        }
    }

    /// Open the redb-backed database described by `config`.
    ///
    /// # Errors
    /// Returns an error if the database directory or redb file cannot be
    /// opened.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        let store = RedbStore::open(&config.db_path, config.storage_quota_bytes)?;
        tracing::info!("Using database at {}", store.path().display());
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Open a redb-backed database at `path` with default settings.
    ///
    /// # Errors
    /// Returns an error if redb cannot open the database.
    pub fn new(path: &str) -> Result<Self, AppError> {
        Self::open(&Config::with_db_path(path))
    }

    /// In-memory database, used by tests and throwaway sessions.
    pub fn in_memory(config: &Config) -> Self {
        let store: Arc<dyn KeyValueStore> = match config.storage_quota_bytes {
            Some(quota) => Arc::new(MemoryStore::with_quota(quota)),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(store, config)
    }
}
