//! Core domain library for CrazyPaste (config, storage, models, session).

/// Session-aware application facade.
pub mod app;
/// Configuration loading and defaults.
pub mod config;
/// Shared constants and storage keys.
pub mod constants;
/// Database access layer over a key-value store.
pub mod db;
/// Process environment helpers.
pub mod env;
/// Application error types (storage/domain).
pub mod error;
/// In-process change notifications.
pub mod events;
/// Data models for persisted records and requests.
pub mod models;
/// Paste id and guest naming helpers.
pub mod naming;
/// Role table and permission checks.
pub mod roles;
/// Key-value storage backends.
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::CrazyPaste;
pub use config::Config;
pub use constants::{
    DEFAULT_MAX_PASTE_CHARS, DEFAULT_PUBLIC_LIST_LIMIT, DEFAULT_STATS_POLL_INTERVAL_MS,
};
pub use db::Database;
pub use error::AppError;
