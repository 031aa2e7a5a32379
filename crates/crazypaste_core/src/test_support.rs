//! Shared test-only helpers for crazypaste_core.

use crate::models::user::User;
use crate::{Config, Database};
use tempfile::TempDir;

/// Creates an isolated redb-backed database and returns it with the temp dir.
///
/// Keep the [`TempDir`] alive for the full test to preserve the backing files.
///
/// # Panics
/// Panics if temp-dir creation or database initialization fails.
pub(crate) fn setup_temp_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("db");
    let db = Database::new(db_path.to_str().expect("db path")).expect("db");
    (db, temp_dir)
}

/// In-memory database with default settings.
pub(crate) fn memory_db() -> Database {
    Database::in_memory(&Config::default())
}

/// Register `name` with `<name>@example.com` / `secret`.
///
/// # Panics
/// Panics if registration fails.
pub(crate) fn register(db: &Database, name: &str) -> User {
    db.users
        .register(&format!("{}@example.com", name), "secret", name)
        .expect("register user")
}
