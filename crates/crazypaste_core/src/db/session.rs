//! Current-user session state.
//!
//! The session user is mirrored under two keys. Profile edits made outside
//! the directory live in per-user override blobs and are merged on restore
//! with [`resolve_profile`].

use super::users::UserDb;
use crate::constants::{
    contact_override_key, profile_override_key, CURRENT_USER_KEY, LEGACY_CURRENT_USER_KEY,
};
use crate::error::AppError;
use crate::models::user::{resolve_profile, Profile, ProfileUpdate, User};
use crate::store::{read_json, write_json, write_json_mirrored, KeyValueStore};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Holder of the acting user.
pub struct SessionDb {
    store: Arc<dyn KeyValueStore>,
    users: UserDb,
    current: RwLock<Option<User>>,
}

impl SessionDb {
    pub fn new(store: Arc<dyn KeyValueStore>, users: UserDb) -> Self {
        Self {
            store,
            users,
            current: RwLock::new(None),
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Option<User>> {
        self.current.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<User>> {
        self.current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persisted(&self) -> Result<Option<User>, AppError> {
        if let Some(user) = read_json::<User>(self.store.as_ref(), CURRENT_USER_KEY)? {
            return Ok(Some(user));
        }
        read_json(self.store.as_ref(), LEGACY_CURRENT_USER_KEY)
    }

    /// Resolve the acting user at startup.
    ///
    /// A persisted registered user is refreshed from the directory and gets
    /// its profile overrides merged in. A persisted user whose account is gone
    /// or inactive, a missing session, or a corrupt one all fall back to a
    /// freshly persisted guest.
    ///
    /// # Errors
    /// Returns an error when the store cannot be read or written.
    pub fn restore(&self) -> Result<User, AppError> {
        let restored = match self.persisted()? {
            Some(user) if user.is_guest => Some(user),
            Some(user) => match self.users.find_by_id(&user.id)? {
                Some(record) if record.is_active => Some(record),
                _ => {
                    tracing::info!("Session user {} no longer active; using guest", user.id);
                    None
                }
            },
            None => None,
        };

        let user = match restored {
            Some(mut user) => {
                if !user.is_guest {
                    user.profile = Some(self.resolved_profile(&user)?);
                }
                user
            }
            None => self.users.generate_guest_user(),
        };
        self.set_current(user.clone())?;
        Ok(user)
    }

    /// Held user, without touching storage.
    pub fn current(&self) -> Option<User> {
        self.read_slot().clone()
    }

    /// Held user, restoring the session first when nothing is held yet.
    pub fn acting_user(&self) -> Result<User, AppError> {
        if let Some(user) = self.current() {
            return Ok(user);
        }
        self.restore()
    }

    /// Replace the held user and persist it under both session keys.
    ///
    /// On a failed write neither key nor the held user changes.
    pub fn set_current(&self, user: User) -> Result<(), AppError> {
        write_json_mirrored(
            self.store.as_ref(),
            CURRENT_USER_KEY,
            &user,
            LEGACY_CURRENT_USER_KEY,
            &user,
        )?;
        *self.write_slot() = Some(user);
        Ok(())
    }

    /// Replace the session with a fresh guest.
    pub fn logout(&self) -> Result<User, AppError> {
        let guest = self.users.generate_guest_user();
        self.set_current(guest.clone())?;
        Ok(guest)
    }

    /// A non-guest user is held.
    pub fn is_authenticated(&self) -> bool {
        self.read_slot()
            .as_ref()
            .is_some_and(|user| !user.is_guest)
    }

    fn merge_override(&self, key: &str, update: &ProfileUpdate) -> Result<ProfileUpdate, AppError> {
        let merged = match read_json::<ProfileUpdate>(self.store.as_ref(), key)? {
            Some(existing) => existing.merged_with(update),
            None => update.clone(),
        };
        write_json(self.store.as_ref(), key, &merged)?;
        Ok(merged)
    }

    /// Layer `update` onto the stored profile override blob.
    pub fn save_profile_override(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdate, AppError> {
        self.merge_override(&profile_override_key(user_id), update)
    }

    /// Layer `update` onto the stored contact override blob.
    pub fn save_contact_override(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileUpdate, AppError> {
        self.merge_override(&contact_override_key(user_id), update)
    }

    /// Effective profile for `user` after applying stored overrides.
    pub fn resolved_profile(&self, user: &User) -> Result<Profile, AppError> {
        let contact = read_json::<ProfileUpdate>(self.store.as_ref(), &contact_override_key(&user.id))?;
        let profile_override =
            read_json::<ProfileUpdate>(self.store.as_ref(), &profile_override_key(&user.id))?;
        Ok(resolve_profile(
            user.profile.as_ref(),
            contact.as_ref(),
            profile_override.as_ref(),
        ))
    }
}
