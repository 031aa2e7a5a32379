//! Random identifiers for pastes and guest accounts.

use crate::constants::PASTE_ID_LEN;
use crate::models::user::User;
use crate::roles::Role;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random lowercase alphanumeric string of `len` characters.
pub fn random_suffix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

/// Short random paste id.
pub fn generate_paste_id() -> String {
    random_suffix(PASTE_ID_LEN)
}

/// Generate a paste id that does not collide according to `exists_check`.
///
/// Falls back to a longer id after repeated collisions.
pub fn generate_unique_paste_id<F>(exists_check: F) -> String
where
    F: Fn(&str) -> bool,
{
    for _ in 0..8 {
        let id = generate_paste_id();
        if !exists_check(&id) {
            return id;
        }
    }

    let mut len = PASTE_ID_LEN * 2;
    loop {
        let id = random_suffix(len);
        if !exists_check(&id) {
            return id;
        }
        len += 1;
    }
}

/// Synthesize a guest account for a visitor with no session.
///
/// The record is never written to the user directory. Its id combines
/// `now` with a random suffix, so two calls never share an id or username.
pub fn generate_guest_user(now: DateTime<Utc>) -> User {
    let suffix = random_suffix(6);
    let id = format!("guest_{}_{}", now.timestamp_millis(), suffix);
    let username = format!("Guest_{}", suffix);
    User {
        id,
        email: String::new(),
        username,
        password: String::new(),
        role: Role::User,
        is_active: true,
        is_guest: true,
        email_verified: false,
        created_at: now,
        updated_at: now,
        last_login_at: None,
        profile: None,
    }
}
