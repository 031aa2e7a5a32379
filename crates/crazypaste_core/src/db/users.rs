//! User directory stored as a single JSON blob.

use crate::constants::{
    contact_override_key, profile_override_key, stats_key, LEGACY_USERS_KEY,
    PENDING_REGISTRATIONS_KEY, USERS_KEY,
};
use crate::error::AppError;
use crate::models::user::{ProfileUpdate, User, UserDirectory};
use crate::naming;
use crate::roles::Role;
use crate::store::{read_json, write_json, write_json_mirrored, KeyValueStore};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of moving staged registrations into the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Accessor for the user directory and its legacy mirror.
#[derive(Clone)]
pub struct UserDb {
    store: Arc<dyn KeyValueStore>,
}

fn validate_registration(
    email: &str,
    password: &str,
    username: &str,
) -> Result<(String, String), AppError> {
    let email = email.trim();
    let username = username.trim();
    if email.is_empty() || password.is_empty() || username.is_empty() {
        return Err(AppError::BadRequest(
            "Email, password and username are required".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest(format!(
            "'{}' is not a valid email address",
            email
        )));
    }
    Ok((email.to_string(), username.to_string()))
}

fn ensure_unique(users: &[User], email: &str, username: &str) -> Result<(), AppError> {
    let registered = || users.iter().filter(|user| user.is_registered());
    if registered().any(|user| user.email_matches(email)) {
        return Err(AppError::Conflict(format!(
            "An account with email '{}' already exists",
            email
        )));
    }
    if registered().any(|user| user.username_matches(username)) {
        return Err(AppError::Conflict(format!(
            "Username '{}' is already taken",
            username
        )));
    }
    Ok(())
}

impl UserDb {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load every user record in stored order.
    ///
    /// A missing directory is rebuilt from the legacy mirror when one exists.
    ///
    /// # Errors
    /// Returns an error when the store cannot be read or the rebuilt
    /// directory cannot be written.
    pub fn list(&self) -> Result<Vec<User>, AppError> {
        if let Some(directory) = read_json::<UserDirectory>(self.store.as_ref(), USERS_KEY)? {
            return Ok(directory.users);
        }
        match read_json::<Vec<User>>(self.store.as_ref(), LEGACY_USERS_KEY)? {
            Some(users) => {
                tracing::info!(
                    "Rebuilding user directory from legacy mirror ({} users)",
                    users.len()
                );
                self.save(&users)?;
                Ok(users)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Rewrite the directory object and its legacy mirror.
    fn save(&self, users: &[User]) -> Result<(), AppError> {
        let directory = UserDirectory::new(users.to_vec());
        write_json_mirrored(
            self.store.as_ref(),
            USERS_KEY,
            &directory,
            LEGACY_USERS_KEY,
            users,
        )
    }

    /// Replace the whole directory, preserving the order of `users`.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be written.
    pub fn replace_all(&self, users: &[User]) -> Result<(), AppError> {
        self.save(users)
    }

    /// Apply `mutate` to the user with `id` and persist the result.
    fn modify<F>(&self, id: &str, mutate: F) -> Result<User, AppError>
    where
        F: FnOnce(&mut User),
    {
        let mut users = self.list()?;
        let user = users
            .iter_mut()
            .find(|user| user.id == id)
            .ok_or(AppError::NotFound)?;
        mutate(user);
        user.updated_at = Utc::now();
        let updated = user.clone();
        self.save(&users)?;
        Ok(updated)
    }

    /// Register a new account.
    ///
    /// # Returns
    /// The stored [`User`].
    ///
    /// # Errors
    /// - [`AppError::BadRequest`] when a field is blank or the email is malformed.
    /// - [`AppError::Conflict`] when the email or username (case-insensitive)
    ///   belongs to an active registered account. Nothing is written.
    pub fn register(&self, email: &str, password: &str, username: &str) -> Result<User, AppError> {
        let (email, username) = validate_registration(email, password, username)?;
        let mut users = self.list()?;
        ensure_unique(&users, &email, &username)?;

        let user = User::new(
            Uuid::new_v4().to_string(),
            email,
            username,
            password.to_string(),
        );
        users.push(user.clone());
        self.save(&users)?;
        tracing::info!("Registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    /// Check credentials against active registered accounts.
    ///
    /// Passwords are compared as plaintext.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidCredentials`] for any mismatch, without
    /// revealing which part was wrong.
    pub fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let mut users = self.list()?;
        let Some(user) = users
            .iter_mut()
            .find(|user| user.is_registered() && user.email_matches(email))
            .filter(|user| user.password == password)
        else {
            tracing::warn!("Rejected login attempt for {}", email.trim());
            return Err(AppError::InvalidCredentials);
        };
        let now = Utc::now();
        user.last_login_at = Some(now);
        user.updated_at = now;
        let user = user.clone();
        self.save(&users)?;
        Ok(user)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.list()?.into_iter().find(|user| user.id == id))
    }

    /// Active registered account with `email` (case-insensitive).
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|user| user.is_registered() && user.email_matches(email)))
    }

    /// Active registered account with `username` (case-insensitive).
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|user| user.is_registered() && user.username_matches(username)))
    }

    /// Set a user's role.
    ///
    /// No rank check happens here; callers gate promotions with
    /// [`crate::roles::can_assign`].
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `id` is unknown.
    pub fn update_role(&self, id: &str, role: Role) -> Result<User, AppError> {
        let user = self.modify(id, |user| user.role = role)?;
        tracing::info!("Set role of {} to {}", user.username, role);
        Ok(user)
    }

    /// Apply a profile edit to the stored record.
    ///
    /// # Errors
    /// Returns [`AppError::NotFound`] when `id` is unknown.
    pub fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, AppError> {
        self.modify(id, |user| {
            let mut profile = user.profile_or_default();
            update.apply_to(&mut profile);
            user.profile = Some(profile);
        })
    }

    /// Soft-delete: keep the record but mark it inactive.
    ///
    /// Inactive accounts cannot log in and no longer reserve their email or
    /// username.
    pub fn deactivate(&self, id: &str) -> Result<User, AppError> {
        self.modify(id, |user| user.is_active = false)
    }

    /// Remove the record and every per-user blob derived from it.
    ///
    /// # Returns
    /// `true` when a record was removed.
    ///
    /// # Errors
    /// Returns an error when the directory cannot be rewritten.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut users = self.list()?;
        let before = users.len();
        users.retain(|user| user.id != id);
        if users.len() == before {
            return Ok(false);
        }
        self.save(&users)?;

        for key in [stats_key(id), profile_override_key(id), contact_override_key(id)] {
            if let Err(err) = self.store.remove(&key) {
                tracing::error!("Failed to remove '{}' for deleted user: {}", key, err);
            }
        }
        tracing::info!("Deleted user {}", id);
        Ok(true)
    }

    /// Fresh guest account; never persisted to the directory.
    pub fn generate_guest_user(&self) -> User {
        naming::generate_guest_user(Utc::now())
    }

    /// Records waiting in the registration staging collection.
    pub fn pending(&self) -> Result<Vec<User>, AppError> {
        Ok(read_json(self.store.as_ref(), PENDING_REGISTRATIONS_KEY)?.unwrap_or_default())
    }

    /// Stage a registration without touching the directory.
    ///
    /// # Errors
    /// Same validation and uniqueness rules as [`UserDb::register`], checked
    /// against both the directory and the staging collection.
    pub fn stage_registration(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<User, AppError> {
        let (email, username) = validate_registration(email, password, username)?;
        let mut pending = self.pending()?;
        ensure_unique(&self.list()?, &email, &username)?;
        ensure_unique(&pending, &email, &username)?;

        let user = User::new(
            Uuid::new_v4().to_string(),
            email,
            username,
            password.to_string(),
        );
        pending.push(user.clone());
        write_json(self.store.as_ref(), PENDING_REGISTRATIONS_KEY, &pending)?;
        Ok(user)
    }

    /// Move staged registrations into the directory.
    ///
    /// Entries whose email or username collide with a registered account are
    /// dropped. The staging collection is cleared afterwards.
    ///
    /// # Errors
    /// Returns an error when either collection cannot be read or written.
    pub fn migrate_pending(&self) -> Result<MigrationReport, AppError> {
        let pending = self.pending()?;
        let mut report = MigrationReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        let mut users = self.list()?;
        for candidate in pending {
            if ensure_unique(&users, &candidate.email, &candidate.username).is_err() {
                tracing::warn!(
                    "Skipping staged registration for {}: already registered",
                    candidate.username
                );
                report.skipped += 1;
                continue;
            }
            users.push(candidate);
            report.migrated += 1;
        }
        self.save(&users)?;
        self.store.remove(PENDING_REGISTRATIONS_KEY)?;
        tracing::info!(
            "Migrated {} staged registration(s), skipped {}",
            report.migrated,
            report.skipped
        );
        Ok(report)
    }
}
