//! Change notifications for views that mirror stored data.
//!
//! Subscribers get their own unbounded channel. Each emission is delivered to
//! every live subscriber at most once, in emission order.

use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Data-change event broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename_all = "camelCase")]
    StatsUpdated {
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    GlobalStatsUpdated { timestamp: DateTime<Utc> },
    #[serde(rename_all = "camelCase")]
    PasteCreated {
        paste_id: String,
        user_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    PasteUpdated {
        paste_id: String,
        user_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    PasteDeleted {
        paste_id: String,
        user_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// Wire name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StatsUpdated { .. } => "stats-updated",
            Event::GlobalStatsUpdated { .. } => "global-stats-updated",
            Event::PasteCreated { .. } => "paste-created",
            Event::PasteUpdated { .. } => "paste-updated",
            Event::PasteDeleted { .. } => "paste-deleted",
        }
    }
}

/// Fan-out publisher for [`Event`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<Event>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    ///
    /// Dropping the receiver unsubscribes it on the next emission.
    pub fn subscribe(&self) -> Receiver<Event> {
        let (tx, rx) = unbounded();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        rx
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&self, event: Event) {
        let mut subscribers = match self.subscribers.lock() {
            Ok(subscribers) => subscribers,
            Err(poisoned) => poisoned.into_inner(),
        };
        tracing::trace!(
            "Emitting {} to {} subscriber(s)",
            event.name(),
            subscribers.len()
        );
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        match self.subscribers.lock() {
            Ok(subscribers) => subscribers.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
