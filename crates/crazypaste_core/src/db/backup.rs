//! JSON export and import of the user directory and per-user stats.

use super::Database;
use crate::error::AppError;
use crate::models::stats::UserStats;
use crate::models::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Portable snapshot of the directory plus stored stats keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryExport {
    pub users: Vec<User>,
    #[serde(default)]
    pub stats: BTreeMap<String, UserStats>,
    pub exported_at: DateTime<Utc>,
}

impl DirectoryExport {
    pub fn to_json_pretty(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Snapshot every user and whichever stats blobs exist for them.
///
/// # Errors
/// Returns an error when the directory or a stats blob cannot be read.
pub fn export(db: &Database) -> Result<DirectoryExport, AppError> {
    let users = db.users.list()?;
    let mut stats = BTreeMap::new();
    for user in &users {
        if let Some(snapshot) = db.stats.stored(&user.id)? {
            stats.insert(user.id.clone(), snapshot);
        }
    }
    Ok(DirectoryExport {
        users,
        stats,
        exported_at: Utc::now(),
    })
}

/// Replace the directory with `export.users` and write its stats blobs.
///
/// Stats entries for ids absent from `export.users` are skipped.
///
/// # Returns
/// The number of users imported.
///
/// # Errors
/// Returns an error when the directory or a stats blob cannot be written.
pub fn import(db: &Database, export: &DirectoryExport) -> Result<usize, AppError> {
    db.users.replace_all(&export.users)?;
    for (user_id, snapshot) in &export.stats {
        if !export.users.iter().any(|user| &user.id == user_id) {
            tracing::warn!("Skipping stats for unknown user {}", user_id);
            continue;
        }
        db.stats.put(user_id, snapshot)?;
    }
    tracing::info!("Imported {} users", export.users.len());
    Ok(export.users.len())
}

/// Write `export` as pretty JSON to `path`.
pub fn write_export_file(path: &Path, export: &DirectoryExport) -> Result<(), AppError> {
    let raw = export.to_json_pretty()?;
    std::fs::write(path, raw).map_err(|err| {
        AppError::StorageMessage(format!("Failed to write {}: {}", path.display(), err))
    })
}

pub fn read_export_file(path: &Path) -> Result<DirectoryExport, AppError> {
    let raw = std::fs::read_to_string(path).map_err(|err| {
        AppError::StorageMessage(format!("Failed to read {}: {}", path.display(), err))
    })?;
    DirectoryExport::from_json(&raw)
}
