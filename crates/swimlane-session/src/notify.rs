//! Auto-expiring user notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// 0 means the notification stays until dismissed
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct Queue {
    items: Mutex<Vec<Notification>>,
    next_id: AtomicU64,
}

impl Queue {
    fn remove(&self, id: &str) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let before = items.len();
        items.retain(|n| n.id != id);
        items.len() != before
    }
}

/// Shared notification queue. Clones observe the same queue.
///
/// Expiry timers are fire-and-forget tasks on the current tokio runtime; outside
/// a runtime notifications simply stay until dismissed.
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    queue: Arc<Queue>,
    default_duration: Duration,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        NotificationCenter::new(Duration::from_millis(5000))
    }
}

impl NotificationCenter {
    pub fn new(default_duration: Duration) -> Self {
        NotificationCenter {
            queue: Arc::new(Queue::default()),
            default_duration,
        }
    }

    pub fn success(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationKind::Success, self.default_duration)
    }

    pub fn warning(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationKind::Warning, self.default_duration)
    }

    pub fn error(&self, message: impl Into<String>) -> String {
        self.push(message, NotificationKind::Error, self.default_duration)
    }

    /// Queue a notification and return its id.
    pub fn push(
        &self,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) -> String {
        let n = self.queue.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let notification = Notification {
            id: format!("note-{n}"),
            message: message.into(),
            kind,
            duration_ms: duration.as_millis() as u64,
        };
        let id = notification.id.clone();
        self.queue
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);

        if !duration.is_zero() {
            if let Ok(handle) = Handle::try_current() {
                let queue = Arc::clone(&self.queue);
                let expired = id.clone();
                handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    queue.remove(&expired);
                });
            }
        }
        id
    }

    /// Remove a notification early. Safe to call after it already expired.
    pub fn dismiss(&self, id: &str) -> bool {
        self.queue.remove(id)
    }

    /// Current notifications, oldest first.
    pub fn list(&self) -> Vec<Notification> {
        self.queue
            .items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
