//! Configuration loading from environment variables.

use crate::constants::{
    DEFAULT_MAX_PASTE_CHARS, DEFAULT_PUBLIC_LIST_LIMIT, DEFAULT_STATS_POLL_INTERVAL_MS,
};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Runtime configuration for CrazyPaste.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub db_path: String,
    pub max_paste_chars: usize,
    pub storage_quota_bytes: Option<usize>,
    pub stats_poll_interval_ms: u64,
    pub public_list_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_paste_chars: DEFAULT_MAX_PASTE_CHARS,
            storage_quota_bytes: None,
            stats_poll_interval_ms: DEFAULT_STATS_POLL_INTERVAL_MS,
            public_list_limit: DEFAULT_PUBLIC_LIST_LIMIT,
        }
    }
}

/// Expand tilde (~) in paths to the user's home directory
fn expand_tilde(path: String) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = resolve_home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path
}

fn resolve_home_dir() -> Option<PathBuf> {
    if let Ok(home) = env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(PathBuf::from(home));
        }
    }

    // Windows
    if let Ok(profile) = env::var("USERPROFILE") {
        if !profile.trim().is_empty() {
            return Some(PathBuf::from(profile));
        }
    }

    std::env::current_dir().ok()
}

fn default_db_path() -> String {
    let home = resolve_home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".cache")
        .join("crazypaste")
        .join("db")
        .to_string_lossy()
        .to_string()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Returns
    /// A populated [`Config`] with defaults applied when env vars are missing
    /// or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            db_path: env::var("DB_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(expand_tilde)
                .unwrap_or(defaults.db_path),
            max_paste_chars: env_parse("MAX_PASTE_SIZE").unwrap_or(defaults.max_paste_chars),
            // Zero disables the quota.
            storage_quota_bytes: env_parse::<usize>("STORAGE_QUOTA_BYTES")
                .filter(|bytes| *bytes > 0),
            stats_poll_interval_ms: env_parse("STATS_POLL_INTERVAL")
                .unwrap_or(defaults.stats_poll_interval_ms),
            public_list_limit: env_parse("PUBLIC_LIST_LIMIT")
                .unwrap_or(defaults.public_list_limit),
        }
    }

    /// Build a configuration rooted at `db_path` with all other defaults.
    pub fn with_db_path(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}
