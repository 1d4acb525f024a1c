//! Process-wide publish/subscribe bus for relay events.
//!
//! [`EventBus`] holds the current set of subscribed delivery channels and
//! hands every published [`Event`] to each of them. It lives in shared
//! application state: created once at startup, never torn down, reachable
//! from any webhook-handling request regardless of which request performed
//! the `subscribe`.
//!
//! The key correctness property is broken-subscriber isolation: a failed
//! send removes exactly that subscriber and never blocks or drops delivery
//! to the rest. Without it a single dead browser tab could stall
//! notifications for every other connected client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use super::Event;

/// Internal identity of one subscription in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SubscriberId(uuid::Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

type Registry = HashMap<SubscriberId, mpsc::UnboundedSender<Event>>;

/// Broadcast bus over a guarded subscriber registry.
///
/// `publish` snapshots the registry before iterating, so a subscriber
/// removed mid-delivery (by a failed send or a racing [`Unsubscribe`])
/// never corrupts the set. The registry lock is held only for the snapshot
/// and for pruning, never across a send or an await.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a delivery channel and returns the capability that
    /// removes it again.
    ///
    /// The bus does not own the underlying connection, only the sending
    /// half used to push events to it.
    #[must_use]
    pub fn subscribe(&self, sender: mpsc::UnboundedSender<Event>) -> Unsubscribe {
        let id = SubscriberId::new();
        self.registry().insert(id, sender);
        tracing::debug!(subscribers = self.subscriber_count(), "channel subscribed");
        Unsubscribe {
            bus: self.clone(),
            id,
            spent: AtomicBool::new(false),
        }
    }

    /// Delivers an event to every currently subscribed channel.
    ///
    /// Returns the number of channels that accepted the event. Channels
    /// whose receiving half is gone are pruned from the registry; delivery
    /// to the remaining channels is unaffected. Per-subscriber order
    /// matches publish-call order; no order is guaranteed across
    /// subscribers.
    pub fn publish(&self, event: &Event) -> usize {
        let snapshot: Vec<(SubscriberId, mpsc::UnboundedSender<Event>)> = self
            .registry()
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (id, sender) in snapshot {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(id);
            }
        }

        if !dead.is_empty() {
            let mut registry = self.registry();
            for id in &dead {
                registry.remove(id);
            }
            drop(registry);
            tracing::warn!(
                pruned = dead.len(),
                kind = %event.kind(),
                "dropped subscribers with closed channels"
            );
        }

        delivered
    }

    /// Returns the current number of subscribed channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    fn remove(&self, id: SubscriberId) {
        self.registry().remove(&id);
    }
}

/// Single-use capability that removes one subscription from the bus.
///
/// Returned by [`EventBus::subscribe`]. Calling [`Unsubscribe::unsubscribe`]
/// more than once is a no-op, and concurrent calls from racing cleanup
/// paths are safe: the first caller wins, the rest observe the spent flag.
#[derive(Debug)]
pub struct Unsubscribe {
    bus: EventBus,
    id: SubscriberId,
    spent: AtomicBool,
}

impl Unsubscribe {
    /// Removes the associated channel from the bus, once.
    pub fn unsubscribe(&self) {
        if !self.spent.swap(true, Ordering::SeqCst) {
            self.bus.remove(self.id);
            tracing::debug!(
                subscribers = self.bus.subscriber_count(),
                "channel unsubscribed"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::EventKind;
    use serde_json::json;

    fn make_event() -> Event {
        let mut payload = serde_json::Map::new();
        payload.insert("job_id".to_string(), json!("j-1"));
        Event::new(EventKind::JobComplete, payload)
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&make_event()), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_exactly_one_delivery() {
        let bus = EventBus::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx3, mut rx3) = mpsc::unbounded_channel();
        let _u1 = bus.subscribe(tx1);
        let _u2 = bus.subscribe(tx2);
        let _u3 = bus.subscribe(tx3);

        assert_eq!(bus.publish(&make_event()), 3);

        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            let Some(event) = rx.recv().await else {
                panic!("expected one delivery");
            };
            assert_eq!(event.kind(), &EventKind::JobComplete);
            assert!(rx.try_recv().is_err(), "exactly one delivery expected");
        }
    }

    #[tokio::test]
    async fn broken_subscriber_never_blocks_the_rest() {
        let bus = EventBus::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        let _u1 = bus.subscribe(tx_dead);
        let _u2 = bus.subscribe(tx_live);

        // Kill the first channel, then publish twice.
        drop(rx_dead);
        assert_eq!(bus.publish(&make_event()), 1);
        assert_eq!(bus.publish(&make_event()), 1);

        // The live channel saw both; the dead one was pruned after the
        // first failed send and never retried.
        assert!(rx_live.recv().await.is_some());
        assert!(rx_live.recv().await.is_some());
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn per_subscriber_order_matches_publish_order() {
        let bus = EventBus::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _u = bus.subscribe(tx);

        for n in 0..5 {
            let mut payload = serde_json::Map::new();
            payload.insert("seq".to_string(), json!(n));
            bus.publish(&Event::new(EventKind::JobComplete, payload));
        }

        for n in 0..5 {
            let Some(event) = rx.recv().await else {
                panic!("expected event {n}");
            };
            assert_eq!(event.payload().get("seq"), Some(&json!(n)));
        }
    }

    #[test]
    fn unsubscribe_is_single_use_and_idempotent() {
        let bus = EventBus::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let unsub = bus.subscribe(tx_a);
        let _keep = bus.subscribe(tx_b);
        assert_eq!(bus.subscriber_count(), 2);

        unsub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);

        // Second call must not remove anything else or panic.
        unsub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_subscribe_and_publish_do_not_lose_subscribers() {
        let bus = EventBus::new();
        let mut receivers = Vec::new();
        let mut tasks = Vec::new();

        for _ in 0..8 {
            let (tx, rx) = mpsc::unbounded_channel();
            receivers.push(rx);
            let bus = bus.clone();
            // Dropping the capability without calling it leaves the
            // subscription registered.
            tasks.push(tokio::spawn(async move {
                let _unsub = bus.subscribe(tx);
            }));
        }
        for task in tasks {
            let _ = task.await;
        }

        assert_eq!(bus.subscriber_count(), 8);
        assert_eq!(bus.publish(&make_event()), 8);
    }
}
