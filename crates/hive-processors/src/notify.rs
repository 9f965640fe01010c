//! Player notifications raised while processing.

use std::sync::{Mutex, PoisonError};

use hive_types::{RoomName, UserId};
use serde::Serialize;

/// One message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Recipient.
    pub user: UserId,
    /// Room the event happened in.
    pub room: RoomName,
    /// Tick of the event.
    pub tick: u64,
    /// Message text.
    pub message: String,
}

/// Receiver of notifications.
pub trait NotificationSink: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: Notification);
}

/// Collects notifications in memory until drained.
#[derive(Debug, Default)]
pub struct NotificationBuffer {
    pending: Mutex<Vec<Notification>>,
}

impl NotificationBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of notifications waiting.
    pub fn len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for NotificationBuffer {
    fn notify(&self, notification: Notification) {
        tracing::debug!(
            user_id = %notification.user,
            room = %notification.room,
            tick = notification.tick,
            "Notification queued"
        );
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
