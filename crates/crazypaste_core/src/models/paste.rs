//! Paste records, creation requests, and expiration handling.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language tag used when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "plaintext";
/// Title used when the caller leaves it blank.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Paste row stored in the paste collection.
///
/// `password` is kept and compared in plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paste {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Creation time, epoch milliseconds; 0 for rows that never recorded it.
    #[serde(default)]
    pub created: i64,
    /// Expiry time, epoch milliseconds.
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub burn_after_reading: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Paste {
    /// Whether the paste has passed its expiry at `now_ms`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires.is_some_and(|expires| expires <= now_ms)
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Private pastes are password-protected or burn-after-reading.
    pub fn is_private(&self) -> bool {
        self.has_password() || self.burn_after_reading
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id.as_deref() == Some(user_id)
    }
}

/// Expiration presets offered on paste creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiration {
    #[serde(rename = "10m")]
    TenMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[serde(rename = "1m")]
    OneMonth,
    #[default]
    #[serde(rename = "never")]
    Never,
    #[serde(rename = "burn")]
    Burn,
}

impl Expiration {
    pub fn as_str(self) -> &'static str {
        match self {
            Expiration::TenMinutes => "10m",
            Expiration::OneHour => "1h",
            Expiration::OneDay => "1d",
            Expiration::OneWeek => "1w",
            Expiration::OneMonth => "1m",
            Expiration::Never => "never",
            Expiration::Burn => "burn",
        }
    }

    /// Compute the expiry instant for a paste created at `created`.
    ///
    /// Months are added on the calendar (Jan 31 + 1m clamps to the last day of
    /// February). `never` and `burn` have no time-based expiry.
    ///
    /// # Returns
    /// Epoch milliseconds, or `None` when the paste does not expire by time.
    pub fn expires_at(self, created: DateTime<Utc>) -> Option<i64> {
        let expires = match self {
            Expiration::TenMinutes => created.checked_add_signed(Duration::minutes(10)),
            Expiration::OneHour => created.checked_add_signed(Duration::hours(1)),
            Expiration::OneDay => created.checked_add_signed(Duration::days(1)),
            Expiration::OneWeek => created.checked_add_signed(Duration::weeks(1)),
            Expiration::OneMonth => created.checked_add_months(Months::new(1)),
            Expiration::Never | Expiration::Burn => None,
        };
        expires.map(|instant| instant.timestamp_millis())
    }
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Expiration {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "10m" => Ok(Expiration::TenMinutes),
            "1h" => Ok(Expiration::OneHour),
            "1d" => Ok(Expiration::OneDay),
            "1w" => Ok(Expiration::OneWeek),
            "1m" => Ok(Expiration::OneMonth),
            "never" | "" => Ok(Expiration::Never),
            "burn" => Ok(Expiration::Burn),
            other => Err(format!(
                "unknown expiration '{}' (expected 10m, 1h, 1d, 1w, 1m, never, burn)",
                other
            )),
        }
    }
}

/// Request payload for creating a paste.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePasteRequest {
    pub title: Option<String>,
    pub content: String,
    pub language: Option<String>,
    #[serde(default)]
    pub expiration: Expiration,
    pub password: Option<String>,
    #[serde(default)]
    pub burn_after_reading: bool,
}

impl CreatePasteRequest {
    /// Request with only content set; everything else defaults.
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Normalize a language tag: trimmed, lowercased, defaulting to plaintext.
pub fn normalize_language(language: Option<&str>) -> String {
    language
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_else(default_language)
}

/// Normalize an optional paste password; blank means no password.
pub fn normalize_password(password: Option<&str>) -> Option<String> {
    password
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
