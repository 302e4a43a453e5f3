/*!
 * Event Hub
 *
 * Explicit observer list: subscribers are identified by id, invoked in
 * subscription order, and removed only by an explicit unsubscribe.
 *
 * Publishing snapshots the list and invokes callbacks outside the lock, so a
 * callback may subscribe or unsubscribe (including itself) without
 * deadlocking. Such changes take effect from the next publish.
 */

use crate::core::sync::{AtomicCell, Mutex};
use crate::core::types::SubscriberId;
use crate::executor::panic;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync + 'static>;

/// Ordered set of callbacks receiving events of type `E`
pub struct EventHub<E> {
    subscribers: Mutex<Vec<(SubscriberId, Handler<E>)>>,
    next_id: AtomicCell<u64>,
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicCell::new(0),
        }
    }

    /// Append `handler` to the invocation list
    pub fn subscribe<F>(&self, handler: F) -> SubscriberId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.next_id.increment();
        self.subscribers.acquire().push((id, Arc::new(handler)));
        debug!(subscriber = id, "Subscribed");
        id
    }

    /// Remove a subscriber; returns `false` if it was not subscribed
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.acquire();
        match subscribers.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                subscribers.remove(index);
                debug!(subscriber = id, "Unsubscribed");
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every subscriber in subscription order
    ///
    /// A panicking subscriber is logged and skipped; later subscribers still
    /// run. Returns the number of subscribers that handled the event.
    pub fn publish(&self, event: &E) -> usize {
        let snapshot: Vec<(SubscriberId, Handler<E>)> = self.subscribers.acquire().clone();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match panic::contain(|| handler(event)) {
                Ok(()) => delivered += 1,
                Err(message) => warn!(subscriber = id, error = %message, "Subscriber panicked"),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.acquire().len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.subscribers
            .acquire()
            .iter()
            .any(|(existing, _)| *existing == id)
    }

    /// Remove every subscriber
    pub fn clear(&self) {
        self.subscribers.acquire().clear();
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
