//! Derived counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user counters.
///
/// Paste counters are derived from a paste scan. `followers`, `following`
/// and `reputation` are stored counters with no backing relationship data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(default)]
    pub total_pastes: u64,
    #[serde(default)]
    pub public_pastes: u64,
    #[serde(default)]
    pub private_pastes: u64,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Compare every counter, ignoring `last_updated`.
    pub fn same_counters(&self, other: &UserStats) -> bool {
        UserStats {
            last_updated: None,
            ..self.clone()
        } == UserStats {
            last_updated: None,
            ..other.clone()
        }
    }
}

/// Site-wide counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStats {
    pub total_users: u64,
    pub total_pastes: u64,
    pub public_pastes: u64,
    pub total_views: u64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}
