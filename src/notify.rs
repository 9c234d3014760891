//! Change notifications.
//!
//! After a write commits, the registry publishes a [`Notification`] to every
//! subscriber. Publishing never blocks: each subscriber has a bounded
//! channel, and a subscriber whose channel is full or closed is dropped.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChangeKind::Created => "created",
            ChangeKind::Updated => "updated",
            ChangeKind::Deleted => "deleted",
        })
    }
}

/// One committed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: ChangeKind,
    /// full name of the resource, including the revision for revisioned kinds
    pub resource: String,
}

impl Notification {
    pub fn new(kind: ChangeKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            resource: resource.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// the subscriber's channel was full
    Lagged,
}

/// The receiving end handed to a subscriber.
pub struct Subscription {
    receiver: Receiver<Notification>,
    drop_reason: Arc<Mutex<Option<DropReason>>>,
}

impl Subscription {
    pub fn recv(&self) -> Result<Notification, crossbeam::channel::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Notification, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<Notification, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// everything queued right now
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// why the notifier stopped delivering, if it did
    pub fn drop_reason(&self) -> Option<DropReason> {
        *self.drop_reason.lock()
    }
}

struct Subscriber {
    sender: Sender<Notification>,
    drop_reason: Arc<Mutex<Option<DropReason>>>,
}

#[derive(Default)]
struct NotifierState {
    subscribers: BTreeMap<u64, Subscriber>,
    next_id: u64,
}

/// Fans committed changes out to subscribers.
///
/// Clones share the same subscribers.
#[derive(Clone)]
pub struct ChangeNotifier {
    enabled: bool,
    inner: Arc<Mutex<NotifierState>>,
}

impl ChangeNotifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            inner: Arc::new(Mutex::new(NotifierState::default())),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// register a subscriber whose channel holds up to `capacity` notifications
    pub fn subscribe(&self, capacity: usize) -> Subscription {
        let (sender, receiver) = crossbeam::channel::bounded(capacity.max(1));
        let drop_reason = Arc::new(Mutex::new(None));

        let mut state = self.inner.lock();
        let id = state.next_id;
        state.next_id = state.next_id.saturating_add(1);
        state.subscribers.insert(
            id,
            Subscriber {
                sender,
                drop_reason: Arc::clone(&drop_reason),
            },
        );

        Subscription { receiver, drop_reason }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// deliver `notification` to every subscriber without blocking
    pub fn notify(&self, notification: Notification) {
        if !self.enabled {
            return;
        }

        let mut state = self.inner.lock();
        let mut dropped = Vec::new();
        for (id, subscriber) in &state.subscribers {
            match subscriber.sender.try_send(notification.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    *subscriber.drop_reason.lock() = Some(DropReason::Lagged);
                    dropped.push(*id);
                }
                Err(TrySendError::Disconnected(_)) => {
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            state.subscribers.remove(&id);
            tracing::warn!(subscriber = id, resource = %notification.resource, "dropped change subscriber");
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("enabled", &self.enabled)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivers_to_every_subscriber() {
        let notifier = ChangeNotifier::new(true);
        let a = notifier.subscribe(8);
        let b = notifier.subscribe(8);

        notifier.notify(Notification::new(ChangeKind::Created, "projects/p1"));
        notifier.notify(Notification::new(ChangeKind::Deleted, "projects/p1"));

        for sub in [&a, &b] {
            let kinds: Vec<_> = sub.drain().into_iter().map(|n| n.kind).collect();
            assert_eq!(kinds, vec![ChangeKind::Created, ChangeKind::Deleted]);
        }
    }

    #[test]
    fn test_full_subscriber_is_dropped() {
        let notifier = ChangeNotifier::new(true);
        let slow = notifier.subscribe(1);
        let fast = notifier.subscribe(8);

        notifier.notify(Notification::new(ChangeKind::Updated, "projects/p1"));
        notifier.notify(Notification::new(ChangeKind::Updated, "projects/p2"));

        assert_eq!(slow.drop_reason(), Some(DropReason::Lagged));
        assert_eq!(slow.drain().len(), 1);
        assert_eq!(fast.drain().len(), 2);
        assert_eq!(notifier.subscriber_count(), 1);
    }

    #[test]
    fn test_closed_subscriber_is_dropped() {
        let notifier = ChangeNotifier::new(true);
        drop(notifier.subscribe(4));
        notifier.notify(Notification::new(ChangeKind::Created, "projects/p1"));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_disabled_notifier_is_silent() {
        let notifier = ChangeNotifier::new(false);
        let sub = notifier.subscribe(4);
        notifier.notify(Notification::new(ChangeKind::Created, "projects/p1"));
        assert!(sub.try_recv().is_err());
    }
}
