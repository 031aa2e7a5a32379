//! Session-aware entry point used by front ends.
//!
//! [`CrazyPaste`] wraps a [`Database`] and applies the rules that need an
//! acting user: ownership, moderation, and role assignment.

use crate::config::Config;
use crate::db::backup::{self, DirectoryExport};
use crate::db::Database;
use crate::error::AppError;
use crate::models::paste::{CreatePasteRequest, Paste};
use crate::models::stats::{GlobalStats, UserStats};
use crate::models::user::{ProfileUpdate, User};
use crate::roles::{can_assign, has_permission, Permission, Role};
use crate::store::KeyValueStore;
use std::sync::Arc;

/// Application handle holding the database and the current session.
pub struct CrazyPaste {
    db: Database,
    config: Config,
}

impl CrazyPaste {
    /// Open the redb-backed store and restore the persisted session.
    ///
    /// # Errors
    /// Returns an error when the store cannot be opened or the session cannot
    /// be restored.
    pub fn open(config: Config) -> Result<Self, AppError> {
        let db = Database::open(&config)?;
        Self::from_database(db, config)
    }

    /// Build over an existing store and restore the persisted session.
    pub fn with_store(store: Arc<dyn KeyValueStore>, config: Config) -> Result<Self, AppError> {
        let db = Database::with_store(store, &config);
        Self::from_database(db, config)
    }

    fn from_database(db: Database, config: Config) -> Result<Self, AppError> {
        let migrated = db.users.migrate_pending()?;
        if migrated.migrated > 0 {
            tracing::info!("Applied {} staged registration(s)", migrated.migrated);
        }
        db.session.restore()?;
        Ok(Self { db, config })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Acting user; a guest when nobody is logged in.
    pub fn current_user(&self) -> Result<User, AppError> {
        self.db.session.acting_user()
    }

    /// Directory copy of the session user, so role checks never use a stale
    /// session snapshot.
    fn require_registered(&self) -> Result<User, AppError> {
        let user = self.current_user()?;
        if user.is_guest {
            return Err(AppError::Forbidden("You need to log in first".to_string()));
        }
        match self.db.users.find_by_id(&user.id)? {
            Some(record) if record.is_active => Ok(record),
            _ => Err(AppError::Forbidden(
                "Your account is no longer active".to_string(),
            )),
        }
    }

    /// Session guest, or the directory copy of a registered session user.
    fn acting_record(&self) -> Result<User, AppError> {
        let user = self.current_user()?;
        if user.is_guest {
            return Ok(user);
        }
        self.require_registered()
    }

    /// Register an account and make it the session user.
    pub fn register(&self, email: &str, password: &str, username: &str) -> Result<User, AppError> {
        let user = self.db.users.register(email, password, username)?;
        self.db.stats.recompute(&user.id)?;
        self.db.session.set_current(user.clone())?;
        Ok(user)
    }

    /// Log in and make the account the session user.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self.db.users.login(email, password)?;
        let mut session_user = user.clone();
        session_user.profile = Some(self.db.session.resolved_profile(&user)?);
        self.db.session.set_current(session_user.clone())?;
        tracing::info!("{} logged in", user.username);
        Ok(session_user)
    }

    pub fn logout(&self) -> Result<User, AppError> {
        self.db.session.logout()
    }

    /// Create a paste owned by the acting user, guests included.
    ///
    /// # Errors
    /// Propagates [`crate::db::paste::PasteDb::create`] errors.
    pub fn create_paste(&self, request: CreatePasteRequest) -> Result<Paste, AppError> {
        let owner = self.acting_record()?;
        let paste = self.db.pastes.create(request, &owner)?;
        self.refresh_stats(paste.user_id.as_deref());
        Ok(paste)
    }

    /// Open a paste for reading.
    ///
    /// Password-protected pastes require the exact password before any view is
    /// counted. Burn-after-reading pastes are consumed by this call.
    ///
    /// # Errors
    /// - [`AppError::NotFound`] when the paste is missing, expired, or burned.
    /// - [`AppError::Forbidden`] when the password is missing or wrong.
    pub fn open_paste(&self, id: &str, password: Option<&str>) -> Result<Paste, AppError> {
        let paste = self.db.pastes.peek(id)?.ok_or(AppError::NotFound)?;
        if paste.has_password() {
            let candidate = password.unwrap_or_default();
            if !self.db.pastes.verify_password(id, candidate)? {
                return Err(AppError::Forbidden(
                    "This paste is password protected".to_string(),
                ));
            }
        }

        let opened = if paste.burn_after_reading {
            self.db.pastes.get_by_id(id)?.ok_or(AppError::NotFound)?
        } else {
            let mut opened = self.db.pastes.get_by_id(id)?.ok_or(AppError::NotFound)?;
            if let Some(views) = self.db.pastes.increment_views(id)? {
                opened.views = views;
            }
            opened
        };
        self.refresh_stats(opened.user_id.as_deref());
        Ok(opened)
    }

    /// Delete a paste as the acting user.
    ///
    /// # Errors
    /// - [`AppError::NotFound`] when the paste is missing.
    /// - [`AppError::Forbidden`] unless the acting user owns the paste or can
    ///   moderate.
    pub fn delete_paste(&self, id: &str) -> Result<(), AppError> {
        let actor = self.acting_record()?;
        let paste = self.db.pastes.peek(id)?.ok_or(AppError::NotFound)?;
        let is_owner = paste.is_owned_by(&actor.id);
        let is_moderator = !actor.is_guest && has_permission(actor.role, Permission::Moderate);
        if !is_owner && !is_moderator {
            return Err(AppError::Forbidden(
                "Only the owner or a moderator can delete this paste".to_string(),
            ));
        }
        self.db.pastes.delete(id)?;
        if !is_owner {
            tracing::info!("{} removed paste {} as moderator", actor.username, id);
        }
        self.refresh_stats(paste.user_id.as_deref());
        Ok(())
    }

    pub fn list_public(&self, limit: Option<usize>) -> Result<Vec<Paste>, AppError> {
        self.db
            .pastes
            .list_public(limit.unwrap_or(self.config.public_list_limit))
    }

    /// Pastes owned by the acting user.
    pub fn my_pastes(&self) -> Result<Vec<Paste>, AppError> {
        let user = self.current_user()?;
        self.db.pastes.list_by_user(&user.id)
    }

    /// Change another account's role.
    ///
    /// # Errors
    /// - [`AppError::Forbidden`] when the acting user may not grant `role`
    ///   (see [`can_assign`]) or the target already outranks them.
    /// - [`AppError::NotFound`] when the target is unknown.
    pub fn assign_role(&self, target_id: &str, role: Role) -> Result<User, AppError> {
        let actor = self.require_registered()?;
        if !can_assign(actor.role, role) {
            return Err(AppError::Forbidden(format!(
                "{} cannot assign the {} role",
                actor.role, role
            )));
        }
        let target = self.db.users.find_by_id(target_id)?.ok_or(AppError::NotFound)?;
        if target.role >= actor.role {
            return Err(AppError::Forbidden(format!(
                "{} cannot change the role of a {}",
                actor.role, target.role
            )));
        }
        self.db.users.update_role(target_id, role)
    }

    pub fn follow(&self, followee_id: &str) -> Result<(), AppError> {
        let actor = self.require_registered()?;
        self.db.users.find_by_id(followee_id)?.ok_or(AppError::NotFound)?;
        self.db.stats.follow(&actor.id, followee_id)
    }

    pub fn unfollow(&self, followee_id: &str) -> Result<(), AppError> {
        let actor = self.require_registered()?;
        self.db.users.find_by_id(followee_id)?.ok_or(AppError::NotFound)?;
        self.db.stats.unfollow(&actor.id, followee_id)
    }

    /// Stats for `user_id`, or for the acting user when `None`.
    ///
    /// A guest session gets its counters computed but never stored.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `user_id` is not in the directory.
    pub fn stats(&self, user_id: Option<&str>) -> Result<UserStats, AppError> {
        match user_id {
            Some(id) => self.db.stats.recompute(id),
            None => {
                let user = self.current_user()?;
                if user.is_guest {
                    self.db.stats.compute(&user.id)
                } else {
                    self.db.stats.recompute(&user.id)
                }
            }
        }
    }

    pub fn global_stats(&self) -> Result<GlobalStats, AppError> {
        self.db.stats.global()
    }

    /// Edit the acting user's profile and refresh the session copy.
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<User, AppError> {
        let actor = self.require_registered()?;
        let mut updated = self.db.users.update_profile(&actor.id, update)?;
        updated.profile = Some(self.db.session.resolved_profile(&updated)?);
        self.db.session.set_current(updated.clone())?;
        Ok(updated)
    }

    /// Delete the acting user's account and fall back to a guest session.
    ///
    /// Pastes the account owned are left in place.
    pub fn delete_account(&self) -> Result<User, AppError> {
        let actor = self.require_registered()?;
        self.db.users.delete(&actor.id)?;
        self.db.session.logout()
    }

    pub fn purge_expired(&self) -> Result<usize, AppError> {
        self.db.pastes.purge_expired()
    }

    pub fn export(&self) -> Result<DirectoryExport, AppError> {
        backup::export(&self.db)
    }

    /// Replace the directory and stats blobs from an export.
    ///
    /// Import is also how a fresh store gets its first staff accounts, so it
    /// is not gated on the acting user's role.
    pub fn import(&self, export: &DirectoryExport) -> Result<usize, AppError> {
        let imported = backup::import(&self.db, export)?;
        self.db.session.restore()?;
        Ok(imported)
    }

    /// Recompute stored stats for a paste owner; guests and deleted accounts
    /// have no snapshot to refresh.
    fn refresh_stats(&self, user_id: Option<&str>) {
        let Some(user_id) = user_id else {
            return;
        };
        match self.db.stats.recompute(user_id) {
            Ok(_) | Err(AppError::NotFound) => {}
            Err(err) => tracing::warn!("Failed to refresh stats for {}: {}", user_id, err),
        }
    }
}
