//! Per-user and site-wide counters derived from the paste collection.

use super::paste::PasteDb;
use super::users::UserDb;
use crate::constants::{stats_key, GLOBAL_STATS_KEY};
use crate::error::AppError;
use crate::events::{Event, EventBus};
use crate::models::paste::Paste;
use crate::models::stats::{GlobalStats, UserStats};
use crate::store::{read_json, write_json, KeyValueStore};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Accessor for stats blobs.
#[derive(Clone)]
pub struct StatsDb {
    store: Arc<dyn KeyValueStore>,
    pastes: PasteDb,
    users: UserDb,
    events: Arc<EventBus>,
}

/// Paste-derived counters for `user_id` over `pastes`.
fn paste_counters(pastes: &[Paste], user_id: &str) -> (u64, u64, u64, u64) {
    let mut total = 0;
    let mut public = 0;
    let mut private = 0;
    let mut views: u64 = 0;
    for paste in pastes.iter().filter(|paste| paste.is_owned_by(user_id)) {
        total += 1;
        if paste.is_private() {
            private += 1;
        } else {
            public += 1;
        }
        views = views.saturating_add(paste.views);
    }
    (total, public, private, views)
}

impl StatsDb {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        pastes: PasteDb,
        users: UserDb,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            pastes,
            users,
            events,
        }
    }

    /// Stored snapshot for `user_id`, if one was ever written.
    pub fn stored(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        read_json(self.store.as_ref(), &stats_key(user_id))
    }

    /// Stored snapshot for `user_id`, or zeroed counters.
    pub fn get(&self, user_id: &str) -> Result<UserStats, AppError> {
        Ok(self.stored(user_id)?.unwrap_or_default())
    }

    /// Overwrite the stored snapshot without recomputing.
    pub fn put(&self, user_id: &str, stats: &UserStats) -> Result<(), AppError> {
        write_json(self.store.as_ref(), &stats_key(user_id), stats)
    }

    fn notify(&self, user_id: &str) {
        self.events.emit(Event::StatsUpdated {
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn ensure_known(&self, user_id: &str) -> Result<(), AppError> {
        match self.users.find_by_id(user_id)? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound),
        }
    }

    /// Paste counters for `user_id` merged over the stored snapshot, without
    /// writing anything.
    ///
    /// Works for any id, guests included.
    pub fn compute(&self, user_id: &str) -> Result<UserStats, AppError> {
        let pastes = self.pastes.snapshot()?;
        let (total_pastes, public_pastes, private_pastes, total_views) =
            paste_counters(&pastes, user_id);
        let stored = self.get(user_id)?;
        Ok(UserStats {
            total_pastes,
            public_pastes,
            private_pastes,
            total_views,
            last_updated: Some(Utc::now()),
            ..stored
        })
    }

    /// Recompute paste counters for `user_id` and store the merged snapshot.
    ///
    /// `followers`, `following` and `reputation` are carried over from the
    /// stored snapshot unchanged. Running this twice with no paste changes in
    /// between yields the same counters.
    ///
    /// # Errors
    /// - [`AppError::NotFound`] when `user_id` is not in the directory;
    ///   nothing is written for guests or unknown ids.
    /// - Scan and write errors from the store.
    pub fn recompute(&self, user_id: &str) -> Result<UserStats, AppError> {
        self.ensure_known(user_id)?;
        let stats = self.compute(user_id)?;
        self.put(user_id, &stats)?;
        self.notify(user_id);
        Ok(stats)
    }

    fn adjust<F>(&self, user_id: &str, change: F) -> Result<UserStats, AppError>
    where
        F: FnOnce(&mut UserStats),
    {
        self.ensure_known(user_id)?;
        let mut stats = self.get(user_id)?;
        change(&mut stats);
        stats.last_updated = Some(Utc::now());
        self.put(user_id, &stats)?;
        self.notify(user_id);
        Ok(stats)
    }

    /// Count a follow: bumps `followee.followers` and `follower.following`.
    ///
    /// No follow relationship is recorded, so repeated calls keep counting.
    ///
    /// # Errors
    /// - [`AppError::BadRequest`] when both ids are equal.
    /// - [`AppError::NotFound`] when either id is not in the directory.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> Result<(), AppError> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }
        self.adjust(followee_id, |stats| {
            stats.followers = stats.followers.saturating_add(1)
        })?;
        self.adjust(follower_id, |stats| {
            stats.following = stats.following.saturating_add(1)
        })?;
        Ok(())
    }

    /// Undo a follow; counters never drop below zero.
    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<(), AppError> {
        if follower_id == followee_id {
            return Err(AppError::BadRequest(
                "You cannot unfollow yourself".to_string(),
            ));
        }
        self.adjust(followee_id, |stats| {
            stats.followers = stats.followers.saturating_sub(1)
        })?;
        self.adjust(follower_id, |stats| {
            stats.following = stats.following.saturating_sub(1)
        })?;
        Ok(())
    }

    pub fn add_reputation(&self, user_id: &str, delta: i64) -> Result<UserStats, AppError> {
        self.adjust(user_id, |stats| {
            stats.reputation = stats.reputation.saturating_add(delta)
        })
    }

    /// Drop the stored snapshot for `user_id`.
    pub fn remove(&self, user_id: &str) -> Result<bool, AppError> {
        self.store.remove(&stats_key(user_id))
    }

    /// Recompute site-wide totals and store them.
    pub fn global(&self) -> Result<GlobalStats, AppError> {
        let total_users = self
            .users
            .list()?
            .iter()
            .filter(|user| user.is_registered())
            .count() as u64;
        let pastes = self.pastes.snapshot()?;
        let stats = GlobalStats {
            total_users,
            total_pastes: pastes.len() as u64,
            public_pastes: pastes.iter().filter(|paste| !paste.is_private()).count() as u64,
            total_views: pastes
                .iter()
                .fold(0, |total: u64, paste| total.saturating_add(paste.views)),
            last_updated: Some(Utc::now()),
        };
        write_json(self.store.as_ref(), GLOBAL_STATS_KEY, &stats)?;
        self.events.emit(Event::GlobalStatsUpdated {
            timestamp: Utc::now(),
        });
        Ok(stats)
    }
}

/// Fallback refresh for views that miss change events.
///
/// Call [`StatsPoller::tick`] from a timer; it recomputes only once per
/// interval.
#[derive(Debug, Clone)]
pub struct StatsPoller {
    user_id: String,
    interval: Duration,
    last_run: Option<DateTime<Utc>>,
}

impl StatsPoller {
    pub fn new(user_id: impl Into<String>, interval_ms: u64) -> Self {
        Self {
            user_id: user_id.into(),
            interval: Duration::milliseconds(i64::try_from(interval_ms).unwrap_or(i64::MAX)),
            last_run: None,
        }
    }

    /// Whether a refresh is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_run {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }

    /// Recompute when the interval has elapsed.
    ///
    /// # Returns
    /// The refreshed snapshot, or `None` when no refresh was due.
    ///
    /// # Errors
    /// Propagates [`StatsDb::recompute`] errors; the poller retries on the
    /// next due tick.
    pub fn tick(
        &mut self,
        stats: &StatsDb,
        now: DateTime<Utc>,
    ) -> Result<Option<UserStats>, AppError> {
        if !self.is_due(now) {
            return Ok(None);
        }
        let refreshed = stats.recompute(&self.user_id)?;
        self.last_run = Some(now);
        Ok(Some(refreshed))
    }
}
