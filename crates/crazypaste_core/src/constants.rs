//! Shared constants used across CrazyPaste crates.

/// Maximum paste length in characters accepted by the paste store.
pub const DEFAULT_MAX_PASTE_CHARS: usize = 100_000;

/// Default fallback interval for stats polling in milliseconds.
pub const DEFAULT_STATS_POLL_INTERVAL_MS: u64 = 5_000;

/// Default number of rows returned by public paste listings.
pub const DEFAULT_PUBLIC_LIST_LIMIT: usize = 20;

/// Length of generated paste ids.
pub const PASTE_ID_LEN: usize = 8;

/// File name for the redb database within the configured DB directory.
pub const REDB_FILE_NAME: &str = "data.redb";

/// User directory object (`{ users, totalUsers, lastUpdated }`).
pub const USERS_KEY: &str = "crazypaste_users_db";
/// Legacy bare `User[]` mirror kept in sync with [`USERS_KEY`].
pub const LEGACY_USERS_KEY: &str = "users";
/// Current session user.
pub const CURRENT_USER_KEY: &str = "crazypaste_current_user";
/// Older name for the current session user, written alongside [`CURRENT_USER_KEY`].
pub const LEGACY_CURRENT_USER_KEY: &str = "currentUser";
/// Bare `Paste[]` collection.
pub const PASTES_KEY: &str = "crazypaste_pastes";
/// Registration staging collection awaiting migration into the directory.
pub const PENDING_REGISTRATIONS_KEY: &str = "crazypaste_pending_registrations";
/// Site-wide counters.
pub const GLOBAL_STATS_KEY: &str = "crazypaste_global_stats";

/// Prefix for per-user stats blobs.
pub const STATS_KEY_PREFIX: &str = "crazypaste_stats_";
/// Prefix for per-user profile override blobs.
pub const PROFILE_OVERRIDE_KEY_PREFIX: &str = "crazypaste_profile_";
/// Prefix for per-user contact override blobs.
pub const CONTACT_OVERRIDE_KEY_PREFIX: &str = "crazypaste_contact_";

/// Storage key for a user's stats blob.
pub fn stats_key(user_id: &str) -> String {
    format!("{}{}", STATS_KEY_PREFIX, user_id)
}

/// Storage key for a user's profile override blob.
pub fn profile_override_key(user_id: &str) -> String {
    format!("{}{}", PROFILE_OVERRIDE_KEY_PREFIX, user_id)
}

/// Storage key for a user's contact override blob.
pub fn contact_override_key(user_id: &str) -> String {
    format!("{}{}", CONTACT_OVERRIDE_KEY_PREFIX, user_id)
}
