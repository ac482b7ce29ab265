//! # Subscription: Per-Flow Observer Registry
//!
//! Each flow keeps its observers here. The registry holds only weak
//! references, so it never keeps a subscriber alive, and every entry carries
//! the delivery context its subscriber chose.
//!
//! Every subscription also has a validity flag shared with the
//! [`SubscriptionHandle`] returned to the caller. Delivery checks the flag and
//! the subscriber's reachability right before calling it.

use crate::delivery::DeliveryContext;
use crate::navigation::{NavigationPerformer, NavigationRequest};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Observer of one flow's state changes.
///
/// Every subscriber is also a [`NavigationPerformer`]; the default `perform`
/// ignores navigation.
pub trait Subscriber<S>: NavigationPerformer + 'static {
    fn update(&self, state: &S);
}

/// Caller-side view of a subscription.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: u64,
    live: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Invalidate the subscription. Notifications already posted but not yet
    /// delivered are suppressed.
    pub fn cancel(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

struct Entry<S> {
    key: usize,
    subscriber: Weak<dyn Subscriber<S>>,
    context: DeliveryContext,
    handle: SubscriptionHandle,
}

impl<S> Entry<S> {
    fn is_live(&self) -> bool {
        self.handle.is_active() && self.subscriber.strong_count() > 0
    }
}

/// Guarded set of subscriptions for one flow.
pub struct SubscriptionRegistry<S> {
    entries: Mutex<Vec<Entry<S>>>,
    next_id: AtomicU64,
}

fn identity<T: ?Sized>(subscriber: &Arc<T>) -> usize {
    Arc::as_ptr(subscriber) as *const () as usize
}

impl<S: Send + Sync + 'static> SubscriptionRegistry<S> {
    pub fn new() -> Self {
        SubscriptionRegistry {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `subscriber`, creating its delivery context only when the
    /// subscriber is new. A repeated call returns the existing handle.
    pub fn subscribe<T, F>(&self, subscriber: &Arc<T>, context: F) -> SubscriptionHandle
    where
        T: Subscriber<S>,
        F: FnOnce() -> DeliveryContext,
    {
        let key = identity(subscriber);
        let mut entries = self.entries.lock();
        // Prune first: a dead subscriber's address may have been reused.
        entries.retain(Entry::is_live);

        if let Some(existing) = entries.iter().find(|entry| entry.key == key) {
            return existing.handle.clone();
        }

        let handle = SubscriptionHandle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            live: Arc::new(AtomicBool::new(true)),
        };
        let weak: Weak<T> = Arc::downgrade(subscriber);
        entries.push(Entry {
            key,
            subscriber: weak,
            context: context(),
            handle: handle.clone(),
        });
        handle
    }

    /// Remove `subscriber`. Returns `false` when it was not registered.
    pub fn unsubscribe<T: ?Sized>(&self, subscriber: &Arc<T>) -> bool {
        let key = identity(subscriber);
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| {
            if entry.key == key {
                entry.handle.cancel();
                false
            } else {
                true
            }
        });
        entries.len() != before
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.entries.lock().iter().filter(|entry| entry.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prune dead entries and return the survivors' delivery targets.
    fn live_targets(&self) -> Vec<(Weak<dyn Subscriber<S>>, DeliveryContext, SubscriptionHandle)> {
        let mut entries = self.entries.lock();
        entries.retain(Entry::is_live);
        entries
            .iter()
            .map(|entry| {
                (
                    entry.subscriber.clone(),
                    entry.context.clone(),
                    entry.handle.clone(),
                )
            })
            .collect()
    }

    /// Post a state snapshot to every live subscriber on its own context.
    pub fn notify_state(&self, state: Arc<S>) -> usize {
        let targets = self.live_targets();
        let count = targets.len();
        for (subscriber, context, handle) in targets {
            let state = state.clone();
            context.post(move || {
                if !handle.is_active() {
                    return;
                }
                if let Some(subscriber) = subscriber.upgrade() {
                    subscriber.update(&state);
                }
            });
        }
        count
    }

    /// Post a resolved navigation request to every live subscriber.
    pub fn notify_navigation(&self, request: &Arc<NavigationRequest>) -> usize {
        let targets = self.live_targets();
        let count = targets.len();
        for (subscriber, context, handle) in targets {
            let request = request.clone();
            context.post(move || {
                if !handle.is_active() {
                    return;
                }
                if let Some(subscriber) = subscriber.upgrade() {
                    subscriber.perform(&request);
                }
            });
        }
        count
    }
}

impl<S: Send + Sync + 'static> Default for SubscriptionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    struct Recorder {
        tx: mpsc::UnboundedSender<u32>,
    }

    impl NavigationPerformer for Recorder {}

    impl Subscriber<u32> for Recorder {
        fn update(&self, state: &u32) {
            let _ = self.tx.send(*state);
        }
    }

    fn recorder() -> (Arc<Recorder>, mpsc::UnboundedReceiver<u32>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Recorder { tx }), rx)
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_keeps_one_entry() {
        let registry = SubscriptionRegistry::<u32>::new();
        let (sub, mut rx) = recorder();

        let first = registry.subscribe(&sub, || DeliveryContext::dedicated("a"));
        let second = registry.subscribe(&sub, || panic!("context must not be rebuilt"));
        assert_eq!(first.id(), second.id());
        assert_eq!(registry.len(), 1);

        registry.notify_state(Arc::new(7));
        assert_eq!(timeout(Duration::from_secs(1), rx.recv()).await.unwrap(), Some(7));
        assert!(
            timeout(Duration::from_millis(50), rx.recv()).await.is_err(),
            "exactly one delivery expected"
        );
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let registry = SubscriptionRegistry::<u32>::new();
        let (sub, _rx) = recorder();
        registry.subscribe(&sub, || DeliveryContext::dedicated("a"));
        drop(sub);

        assert_eq!(registry.notify_state(Arc::new(1)), 0);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_and_cancel() {
        let registry = SubscriptionRegistry::<u32>::new();
        let (a, _rx_a) = recorder();
        let (b, _rx_b) = recorder();

        let handle_a = registry.subscribe(&a, || DeliveryContext::dedicated("a"));
        let handle_b = registry.subscribe(&b, || DeliveryContext::dedicated("b"));

        assert!(registry.unsubscribe(&a));
        assert!(!registry.unsubscribe(&a));
        assert!(!handle_a.is_active());

        handle_b.cancel();
        assert_eq!(registry.notify_state(Arc::new(3)), 0);
    }
}
