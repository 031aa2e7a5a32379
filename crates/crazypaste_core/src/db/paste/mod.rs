//! Paste collection stored as a single newest-first JSON array.

use crate::constants::PASTES_KEY;
use crate::error::AppError;
use crate::events::{Event, EventBus};
use crate::models::paste::*;
use crate::models::user::User;
use crate::naming::generate_unique_paste_id;
use crate::store::{read_json_rows, write_json, KeyValueStore};
use chrono::Utc;
use std::sync::Arc;

/// Accessor for the paste collection.
#[derive(Clone)]
pub struct PasteDb {
    store: Arc<dyn KeyValueStore>,
    events: Arc<EventBus>,
    max_paste_chars: usize,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl PasteDb {
    pub fn new(store: Arc<dyn KeyValueStore>, events: Arc<EventBus>, max_paste_chars: usize) -> Self {
        Self {
            store,
            events,
            max_paste_chars,
        }
    }

    /// Rows that fail to decode are skipped rather than wiping the collection.
    fn load(&self) -> Result<Vec<Paste>, AppError> {
        read_json_rows(self.store.as_ref(), PASTES_KEY)
    }

    fn save(&self, pastes: &[Paste]) -> Result<(), AppError> {
        write_json(self.store.as_ref(), PASTES_KEY, pastes).inspect_err(|err| {
            if matches!(err, AppError::QuotaExceeded(_)) {
                tracing::warn!("Paste collection write rejected: {}", err);
            }
        })
    }

    fn emit(&self, paste: &Paste, kind: fn(String, Option<String>) -> Event) {
        self.events.emit(kind(paste.id.clone(), paste.user_id.clone()));
    }

    /// Drop expired rows from `pastes`.
    ///
    /// # Returns
    /// Number of rows removed.
    fn evict_expired(pastes: &mut Vec<Paste>, now_ms: i64) -> usize {
        let before = pastes.len();
        pastes.retain(|paste| !paste.is_expired_at(now_ms));
        before - pastes.len()
    }

    /// Character limit that applies to pastes owned by `owner`.
    pub fn limit_for(&self, owner: &User) -> usize {
        if owner.is_guest {
            return self.max_paste_chars;
        }
        owner
            .role
            .features()
            .max_paste_chars
            .unwrap_or(self.max_paste_chars)
    }

    /// Create a paste owned by `owner` and prepend it to the collection.
    ///
    /// # Returns
    /// The stored [`Paste`] with `views = 0`.
    ///
    /// # Errors
    /// - [`AppError::BadRequest`] for blank content or an inactive owner.
    /// - [`AppError::PayloadTooLarge`] when content exceeds the owner's limit.
    /// - [`AppError::QuotaExceeded`] when storage is full; nothing is stored.
    pub fn create(&self, request: CreatePasteRequest, owner: &User) -> Result<Paste, AppError> {
        if request.content.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Paste content cannot be empty".to_string(),
            ));
        }
        if owner.id.is_empty() || !owner.is_active {
            return Err(AppError::BadRequest(
                "Pastes need an active session user".to_string(),
            ));
        }
        let limit = self.limit_for(owner);
        let chars = request.content.chars().count();
        if chars > limit {
            return Err(AppError::PayloadTooLarge(format!(
                "{} characters exceeds the {} character limit",
                chars, limit
            )));
        }

        let created = Utc::now();
        let mut pastes = self.load()?;
        let id = generate_unique_paste_id(|candidate| pastes.iter().any(|p| p.id == candidate));
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(DEFAULT_TITLE)
            .to_string();
        let paste = Paste {
            id,
            title,
            content: request.content,
            language: normalize_language(request.language.as_deref()),
            created: created.timestamp_millis(),
            expires: request.expiration.expires_at(created),
            password: normalize_password(request.password.as_deref()),
            burn_after_reading: request.burn_after_reading
                || request.expiration == Expiration::Burn,
            views: 0,
            user_id: Some(owner.id.clone()),
        };

        pastes.insert(0, paste.clone());
        self.save(&pastes)?;
        tracing::debug!("Created paste {} for {}", paste.id, owner.id);
        self.emit(&paste, |paste_id, user_id| Event::PasteCreated {
            paste_id,
            user_id,
            timestamp: Utc::now(),
        });
        Ok(paste)
    }

    /// Fetch a paste for viewing.
    ///
    /// Expired pastes are evicted and reported missing. A burn-after-reading
    /// paste is served once: the first read counts the view, the next read
    /// evicts it.
    ///
    /// # Returns
    /// A copy of the stored paste, or `None`.
    ///
    /// # Errors
    /// Returns an error when the collection cannot be read or rewritten.
    pub fn get_by_id(&self, id: &str) -> Result<Option<Paste>, AppError> {
        let mut pastes = self.load()?;
        let Some(index) = pastes.iter().position(|paste| paste.id == id) else {
            return Ok(None);
        };

        if pastes[index].is_expired_at(now_millis()) {
            let evicted = pastes.remove(index);
            self.save(&pastes)?;
            tracing::debug!("Evicted expired paste {}", id);
            self.emit(&evicted, |paste_id, user_id| Event::PasteDeleted {
                paste_id,
                user_id,
                timestamp: Utc::now(),
            });
            return Ok(None);
        }

        if pastes[index].burn_after_reading {
            if pastes[index].views > 0 {
                let burned = pastes.remove(index);
                self.save(&pastes)?;
                tracing::debug!("Burned paste {} after reading", id);
                self.emit(&burned, |paste_id, user_id| Event::PasteDeleted {
                    paste_id,
                    user_id,
                    timestamp: Utc::now(),
                });
                return Ok(None);
            }
            pastes[index].views = pastes[index].views.saturating_add(1);
            let served = pastes[index].clone();
            self.save(&pastes)?;
            return Ok(Some(served));
        }

        Ok(Some(pastes[index].clone()))
    }

    /// Look up a paste without consuming a burn-after-reading view.
    ///
    /// Expired pastes are still evicted.
    pub fn peek(&self, id: &str) -> Result<Option<Paste>, AppError> {
        let mut pastes = self.load()?;
        let Some(index) = pastes.iter().position(|paste| paste.id == id) else {
            return Ok(None);
        };
        if pastes[index].is_expired_at(now_millis()) {
            let evicted = pastes.remove(index);
            self.save(&pastes)?;
            tracing::debug!("Evicted expired paste {}", id);
            self.emit(&evicted, |paste_id, user_id| Event::PasteDeleted {
                paste_id,
                user_id,
                timestamp: Utc::now(),
            });
            return Ok(None);
        }
        Ok(Some(pastes[index].clone()))
    }

    /// Compare `candidate` with the stored plaintext password.
    ///
    /// # Returns
    /// `true` only when the paste exists, has a password, and it equals
    /// `candidate` exactly.
    pub fn verify_password(&self, id: &str, candidate: &str) -> Result<bool, AppError> {
        let Some(paste) = self.peek(id)? else {
            return Ok(false);
        };
        Ok(paste.password.as_deref() == Some(candidate))
    }

    /// Add one view.
    ///
    /// # Returns
    /// The new view count, or `None` when the paste is missing.
    pub fn increment_views(&self, id: &str) -> Result<Option<u64>, AppError> {
        let mut pastes = self.load()?;
        let Some(paste) = pastes.iter_mut().find(|paste| paste.id == id) else {
            return Ok(None);
        };
        paste.views = paste.views.saturating_add(1);
        let views = paste.views;
        self.save(&pastes)?;
        Ok(Some(views))
    }

    /// Replace the stored row that shares `paste.id`.
    ///
    /// # Returns
    /// `false` when no such paste exists.
    pub fn update(&self, paste: &Paste) -> Result<bool, AppError> {
        let mut pastes = self.load()?;
        let Some(slot) = pastes.iter_mut().find(|stored| stored.id == paste.id) else {
            return Ok(false);
        };
        *slot = paste.clone();
        self.save(&pastes)?;
        self.emit(paste, |paste_id, user_id| Event::PasteUpdated {
            paste_id,
            user_id,
            timestamp: Utc::now(),
        });
        Ok(true)
    }

    /// Delete a paste by id.
    ///
    /// # Returns
    /// The removed row, or `None` when missing.
    pub fn delete_and_return(&self, id: &str) -> Result<Option<Paste>, AppError> {
        let mut pastes = self.load()?;
        let Some(index) = pastes.iter().position(|paste| paste.id == id) else {
            return Ok(None);
        };
        let removed = pastes.remove(index);
        self.save(&pastes)?;
        self.emit(&removed, |paste_id, user_id| Event::PasteDeleted {
            paste_id,
            user_id,
            timestamp: Utc::now(),
        });
        Ok(Some(removed))
    }

    /// Delete a paste by id.
    ///
    /// # Returns
    /// `true` when a row was deleted.
    pub fn delete(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.delete_and_return(id)?.is_some())
    }

    /// Every live paste in stored (newest-first) order.
    ///
    /// Expired rows found during the scan are evicted.
    pub fn list_all(&self) -> Result<Vec<Paste>, AppError> {
        let mut pastes = self.load()?;
        if Self::evict_expired(&mut pastes, now_millis()) > 0 {
            self.save(&pastes)?;
        }
        Ok(pastes)
    }

    /// Live pastes without writing back evictions.
    pub fn snapshot(&self) -> Result<Vec<Paste>, AppError> {
        let mut pastes = self.load()?;
        Self::evict_expired(&mut pastes, now_millis());
        Ok(pastes)
    }

    /// Public pastes, newest first.
    ///
    /// Password-protected and burn-after-reading pastes are excluded. Pastes
    /// created in the same millisecond keep no particular relative order.
    pub fn list_public(&self, limit: usize) -> Result<Vec<Paste>, AppError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut public: Vec<Paste> = self
            .list_all()?
            .into_iter()
            .filter(|paste| !paste.is_private())
            .collect();
        public.sort_by(|a, b| b.created.cmp(&a.created));
        public.truncate(limit);
        Ok(public)
    }

    /// Live pastes owned by `user_id`, newest first.
    pub fn list_by_user(&self, user_id: &str) -> Result<Vec<Paste>, AppError> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|paste| paste.is_owned_by(user_id))
            .collect())
    }

    /// Remove every expired paste.
    ///
    /// # Returns
    /// Number of pastes removed.
    pub fn purge_expired(&self) -> Result<usize, AppError> {
        let mut pastes = self.load()?;
        let removed = Self::evict_expired(&mut pastes, now_millis());
        if removed > 0 {
            self.save(&pastes)?;
            tracing::info!("Purged {} expired paste(s)", removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
