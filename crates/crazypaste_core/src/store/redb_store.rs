//! Durable [`KeyValueStore`] backed by a single redb table.

use super::{ensure_within_quota, KeyValueStore};
use crate::constants::REDB_FILE_NAME;
use crate::error::AppError;
use redb::{ReadableDatabase, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};

/// Raw string blobs keyed by storage key.
const KV: TableDefinition<&str, &str> = TableDefinition::new("kv");

/// redb-backed string store rooted at a database directory.
pub struct RedbStore {
    db: redb::Database,
    path: PathBuf,
    quota_bytes: Option<usize>,
}

impl RedbStore {
    /// Open (or create) the store under `db_dir`.
    ///
    /// The directory is created when missing and the redb file lives at
    /// `<db_dir>/data.redb`.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be created or redb cannot
    /// open the file (for example when another process holds it).
    pub fn open(db_dir: &str, quota_bytes: Option<usize>) -> Result<Self, AppError> {
        let dir = Path::new(db_dir);
        std::fs::create_dir_all(dir).map_err(|err| {
            AppError::StorageMessage(format!(
                "Failed to create database directory '{}': {}",
                dir.display(),
                err
            ))
        })?;
        let path = dir.join(REDB_FILE_NAME);
        let db = redb::Database::create(&path)?;

        let write_txn = db.begin_write()?;
        write_txn.open_table(KV)?;
        write_txn.commit()?;

        tracing::debug!("Opened redb store at {}", path.display());
        Ok(Self {
            db,
            path,
            quota_bytes,
        })
    }

    /// Location of the backing redb file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV)?;
        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(KV)?;
            if self.quota_bytes.is_some() {
                let mut used = 0usize;
                for item in table.iter()? {
                    let (k, v) = item?;
                    used += k.value().len() + v.value().len();
                }
                let replaced = table
                    .get(key)?
                    .map(|guard| key.len() + guard.value().len())
                    .unwrap_or(0);
                // Returning here drops the transaction uncommitted.
                ensure_within_quota(self.quota_bytes, used, replaced, key, value)?;
            }
            table.insert(key, value)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, AppError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(KV)?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(KV)?;
        let mut keys = Vec::new();
        for item in table.iter()? {
            let (key, _) = item?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}
