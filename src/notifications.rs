//! Ephemeral notification list shared by the timer controller, the board
//! engine and the UI.
//!
//! Entries keep insertion order. Every entry gets a fresh
//! [`NotificationId`] on push and is only ever removed by that id, so an
//! expiry that fires after other entries were dismissed still removes the
//! right one.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use crate::model::notification::{Notification, NotificationId, NotificationKind};

pub const DEFAULT_TTL: Duration = Duration::from_millis(3000);

#[derive(Default)]
struct Inner {
    items: Vec<Notification>,
    next_id: u64,
}

#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<Mutex<Inner>>,
    ttl: Duration,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl NotificationQueue {
    /// `ttl` is applied by the [`error`](Self::error)/[`success`](Self::success) helpers.
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append `notification`; if it has a ttl, schedule its removal by id.
    pub fn push(&self, mut notification: Notification) -> NotificationId {
        let id = {
            let mut inner = self.lock();
            inner.next_id += 1;
            let id = NotificationId(inner.next_id);
            notification.id = id;
            inner.items.push(notification.clone());
            id
        };
        debug!(id = id.0, kind = %notification.kind, message = %notification.message, "notification pushed");

        if let Some(ttl) = notification.ttl {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let weak: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
                    handle.spawn(async move {
                        tokio::time::sleep(ttl).await;
                        if let Some(inner) = weak.upgrade() {
                            remove(&inner, id);
                        }
                    });
                }
                Err(_) => warn!(id = id.0, "no runtime to expire notification; it stays until dismissed"),
            }
        }
        id
    }

    /// Push unless an entry with the same key is already shown.
    pub fn push_unique(&self, notification: Notification) -> Option<NotificationId> {
        if let Some(key) = &notification.key {
            if self.contains_key(key) {
                return None;
            }
        }
        Some(self.push(notification))
    }

    pub fn dismiss(&self, id: NotificationId) -> bool {
        remove(&self.inner, id)
    }

    pub fn list(&self) -> Vec<Notification> {
        self.lock().items.clone()
    }

    pub fn contains(&self, id: NotificationId) -> bool {
        self.lock().items.iter().any(|n| n.id == id)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock()
            .items
            .iter()
            .any(|n| n.key.as_deref() == Some(key))
    }

    pub fn newest(&self) -> Option<NotificationId> {
        self.lock().items.last().map(|n| n.id)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn error(&self, key: &str, message: impl Into<String>) -> NotificationId {
        self.push(self.expiring(NotificationKind::Error, key, message))
    }

    pub fn info(&self, key: &str, message: impl Into<String>) -> NotificationId {
        self.push(self.expiring(NotificationKind::Info, key, message))
    }

    fn expiring(&self, kind: NotificationKind, key: &str, message: impl Into<String>) -> Notification {
        Notification::new(kind, message)
            .with_key(key)
            .with_ttl(self.ttl)
    }
}

fn remove(inner: &Mutex<Inner>, id: NotificationId) -> bool {
    let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match inner.items.iter().position(|n| n.id == id) {
        Some(pos) => {
            inner.items.remove(pos);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order_and_assigns_fresh_ids() {
        let queue = NotificationQueue::default();
        let a = queue.push(Notification::info("first"));
        let b = queue.push(Notification::info("second"));
        let c = queue.push(Notification::info("first"));

        assert_ne!(a, b);
        assert_ne!(a, c);
        let messages: Vec<_> = queue.list().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["first", "second", "first"]);
    }

    #[test]
    fn duplicates_by_content_are_kept() {
        let queue = NotificationQueue::default();
        queue.push(Notification::error("boom").with_key("err"));
        queue.push(Notification::error("boom").with_key("err"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn push_unique_filters_by_key() {
        let queue = NotificationQueue::default();
        assert!(queue.push_unique(Notification::error("boom").with_key("err")).is_some());
        assert!(queue.push_unique(Notification::error("boom").with_key("err")).is_none());
        assert!(queue.push_unique(Notification::error("boom")).is_some());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn dismiss_removes_by_identity() {
        let queue = NotificationQueue::default();
        let a = queue.push(Notification::info("a"));
        let b = queue.push(Notification::info("b"));
        let c = queue.push(Notification::info("c"));

        assert!(queue.dismiss(a));
        assert!(queue.dismiss(c));
        assert!(!queue.dismiss(c));
        let left: Vec<_> = queue.list().into_iter().map(|n| n.id).collect();
        assert_eq!(left, vec![b]);
    }

    #[test]
    fn ttl_without_runtime_keeps_entry() {
        let queue = NotificationQueue::default();
        let id = queue.push(Notification::info("stays").with_ttl(Duration::from_millis(1)));
        assert!(queue.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_after_delay() {
        let queue = NotificationQueue::default();
        let id = queue.push(Notification::new(NotificationKind::Success, "saved").with_ttl(Duration::from_millis(3000)));
        assert!(queue.contains(id));

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert!(queue.contains(id));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!queue.contains(id));
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_targets_identity_after_earlier_removals() {
        let queue = NotificationQueue::default();
        let first = queue.push(Notification::info("first"));
        let second = queue.push(Notification::info("second"));
        let timed = queue.push(Notification::error("timed").with_ttl(Duration::from_millis(3000)));
        let last = queue.push(Notification::info("last"));

        // Shift positions before the expiry fires.
        queue.dismiss(first);
        queue.dismiss(second);

        tokio::time::sleep(Duration::from_millis(3001)).await;
        let left: Vec<_> = queue.list().into_iter().map(|n| n.id).collect();
        assert_eq!(left, vec![last]);
        assert!(!queue.contains(timed));
    }

    #[tokio::test(start_paused = true)]
    async fn helpers_use_queue_ttl() {
        let queue = NotificationQueue::new(Duration::from_millis(500));
        let id = queue.error("error-moving-ticket", "Error moving ticket ABC-1");
        assert!(queue.contains_key("error-moving-ticket"));
        tokio::time::sleep(Duration::from_millis(501)).await;
        assert!(!queue.contains(id));
    }
}
