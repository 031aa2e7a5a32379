//! Static role table: badges, feature bundles, and promotion ranks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. Variants are declared in ascending rank order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Role {
    #[default]
    User,
    Crazy,
    Verified,
    Contributor,
    Mod,
    Admin,
    Developer,
    Owner,
}

/// Boolean feature flags a role may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    AccessAdmin,
    Moderate,
    AssignRoles,
    CustomBadge,
    PrioritySupport,
}

/// Feature bundle attached to each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleFeatures {
    /// Per-paste character limit; `None` uses the configured ceiling.
    pub max_paste_chars: Option<usize>,
    pub can_access_admin: bool,
    pub can_moderate: bool,
    pub can_assign_roles: bool,
    pub custom_badge: bool,
    pub priority_support: bool,
}

const BASE: RoleFeatures = RoleFeatures {
    max_paste_chars: None,
    can_access_admin: false,
    can_moderate: false,
    can_assign_roles: false,
    custom_badge: false,
    priority_support: false,
};

const STAFF: RoleFeatures = RoleFeatures {
    max_paste_chars: Some(1_000_000),
    can_access_admin: true,
    can_moderate: true,
    can_assign_roles: true,
    custom_badge: true,
    priority_support: true,
};

impl Role {
    /// Every role, lowest rank first.
    pub const ALL: [Role; 8] = [
        Role::User,
        Role::Crazy,
        Role::Verified,
        Role::Contributor,
        Role::Mod,
        Role::Admin,
        Role::Developer,
        Role::Owner,
    ];

    /// Hierarchy rank used to gate promotions.
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Display name as stored in user records.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Crazy => "Crazy",
            Role::Verified => "Verified",
            Role::Contributor => "Contributor",
            Role::Mod => "Mod",
            Role::Admin => "Admin",
            Role::Developer => "Developer",
            Role::Owner => "Owner",
        }
    }

    /// Badge color (hex).
    pub fn color(self) -> &'static str {
        match self {
            Role::User => "#9ca3af",
            Role::Crazy => "#ec4899",
            Role::Verified => "#3b82f6",
            Role::Contributor => "#10b981",
            Role::Mod => "#f59e0b",
            Role::Admin => "#ef4444",
            Role::Developer => "#8b5cf6",
            Role::Owner => "#eab308",
        }
    }

    /// Badge icon name.
    pub fn icon(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Crazy => "zap",
            Role::Verified => "badge-check",
            Role::Contributor => "git-pull-request",
            Role::Mod => "shield",
            Role::Admin => "shield-alert",
            Role::Developer => "code",
            Role::Owner => "crown",
        }
    }

    pub fn features(self) -> RoleFeatures {
        match self {
            Role::User => BASE,
            Role::Crazy => RoleFeatures {
                custom_badge: true,
                ..BASE
            },
            Role::Verified => BASE,
            Role::Contributor => RoleFeatures {
                max_paste_chars: Some(250_000),
                custom_badge: true,
                priority_support: true,
                ..BASE
            },
            Role::Mod => RoleFeatures {
                can_access_admin: false,
                can_assign_roles: true,
                ..STAFF
            },
            Role::Admin | Role::Developer | Role::Owner => STAFF,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown role '{}'", trimmed))
    }
}

/// Check a single feature flag for `role`.
pub fn has_permission(role: Role, permission: Permission) -> bool {
    let features = role.features();
    match permission {
        Permission::AccessAdmin => features.can_access_admin,
        Permission::Moderate => features.can_moderate,
        Permission::AssignRoles => features.can_assign_roles,
        Permission::CustomBadge => features.custom_badge,
        Permission::PrioritySupport => features.priority_support,
    }
}

/// Whether `actor` may set another user's role to `target`.
///
/// Requires the assign-roles flag and a target ranked strictly below the actor.
pub fn can_assign(actor: Role, target: Role) -> bool {
    has_permission(actor, Permission::AssignRoles) && target.rank() < actor.rank()
}
