//! User records, profile sub-objects, and override resolution.

use crate::roles::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Account record stored in the user directory.
///
/// `password` holds the plaintext password. This is insecure by design:
/// stored records reproduce the product's observable behavior and must not be
/// treated as a credential store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

impl User {
    /// Build a fresh, active, non-guest account.
    pub fn new(id: String, email: String, username: String, password: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            username,
            password,
            role: Role::User,
            is_active: true,
            is_guest: false,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_login_at: None,
            profile: None,
        }
    }

    /// Whether this record takes part in email/username uniqueness.
    pub fn is_registered(&self) -> bool {
        self.is_active && !self.is_guest
    }

    /// Case-insensitive email comparison.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    /// Case-insensitive username comparison.
    pub fn username_matches(&self, username: &str) -> bool {
        self.username.trim().eq_ignore_ascii_case(username.trim())
    }

    /// Profile with defaults when the record has none.
    pub fn profile_or_default(&self) -> Profile {
        self.profile.clone().unwrap_or_default()
    }
}

/// Optional public profile fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Partial profile edit, also persisted as an override blob.
///
/// `Some("")` clears a field; `None` leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

fn apply_field(target: &mut Option<String>, update: &Option<String>) {
    if let Some(value) = update {
        let trimmed = value.trim();
        *target = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
    }
}

impl ProfileUpdate {
    /// Apply the set fields of this update onto `profile`.
    pub fn apply_to(&self, profile: &mut Profile) {
        apply_field(&mut profile.bio, &self.bio);
        apply_field(&mut profile.location, &self.location);
        apply_field(&mut profile.website, &self.website);
        apply_field(&mut profile.github, &self.github);
        apply_field(&mut profile.avatar, &self.avatar);
        apply_field(&mut profile.first_name, &self.first_name);
        apply_field(&mut profile.last_name, &self.last_name);
    }

    /// Layer `newer` on top of `self`; fields set in `newer` win.
    pub fn merged_with(&self, newer: &ProfileUpdate) -> ProfileUpdate {
        fn pick(older: &Option<String>, newer: &Option<String>) -> Option<String> {
            newer.clone().or_else(|| older.clone())
        }
        ProfileUpdate {
            bio: pick(&self.bio, &newer.bio),
            location: pick(&self.location, &newer.location),
            website: pick(&self.website, &newer.website),
            github: pick(&self.github, &newer.github),
            avatar: pick(&self.avatar, &newer.avatar),
            first_name: pick(&self.first_name, &newer.first_name),
            last_name: pick(&self.last_name, &newer.last_name),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &ProfileUpdate::default()
    }
}

/// Resolve the effective profile for display.
///
/// Precedence, lowest to highest: the directory record, the contact override
/// blob, the profile override blob.
pub fn resolve_profile(
    base: Option<&Profile>,
    contact: Option<&ProfileUpdate>,
    profile_override: Option<&ProfileUpdate>,
) -> Profile {
    let mut resolved = base.cloned().unwrap_or_default();
    for layer in [contact, profile_override].into_iter().flatten() {
        layer.apply_to(&mut resolved);
    }
    resolved
}

/// Serialized form of the user directory blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectory {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub total_users: usize,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            total_users: users.len(),
            users,
            last_updated: Utc::now(),
        }
    }
}
