//! Subscriber hub for broadcasting session events.

use crate::config::DEFAULT_SUBSCRIBER_CAPACITY;
use crate::error::Result;
use crate::events::{encode_envelope, SessionEvent};
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::types::{Disposer, EncodedEvent, SubscriberId, Subscription};

/// Registered subscriber channels.
pub(crate) struct Registry {
    subscribers: Mutex<HashMap<SubscriberId, Sender<EncodedEvent>>>,
    /// Counter for generating subscriber IDs.
    next_id: AtomicU64,
}

impl Registry {
    /// Remove a subscriber, closing its channel. Returns false if absent.
    pub(crate) fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }
}

/// Fans out encoded events to subscribers without ever blocking.
///
/// A subscriber whose buffer is full when an event is delivered is evicted:
/// removed from the registry and its channel closed. Subscribers whose
/// receiver was dropped are removed the same way.
#[derive(Clone)]
pub struct SubscriberHub {
    registry: Arc<Registry>,
    capacity: usize,
}

impl SubscriberHub {
    /// Create a hub with the default subscriber capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Create a hub whose subscribers buffer up to `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.registry.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(self.capacity);

        self.registry.subscribers.lock().insert(id, sender);
        tracing::debug!(subscriber = %id, "subscriber added");

        Subscription {
            id,
            receiver,
            disposer: Disposer::new(id, Arc::downgrade(&self.registry)),
        }
    }

    /// Remove a subscriber. Safe to call repeatedly or after eviction.
    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.registry.remove(id) {
            tracing::debug!(subscriber = %id, "subscriber removed");
        }
    }

    /// Get subscriber count.
    pub fn subscriber_count(&self) -> usize {
        self.registry.subscribers.lock().len()
    }

    pub fn is_subscribed(&self, id: SubscriberId) -> bool {
        self.registry.subscribers.lock().contains_key(&id)
    }

    /// Encode `event` once and deliver it to every subscriber.
    ///
    /// Returns the number of subscribers that received it. Nothing is
    /// delivered if encoding fails.
    pub fn publish(&self, event: &SessionEvent) -> Result<usize> {
        let encoded = event.encode()?;
        Ok(self.deliver(EncodedEvent::from(encoded)))
    }

    /// Publish an arbitrary payload under its own event name.
    pub fn publish_named<T: Serialize + ?Sized>(&self, event: &str, payload: &T) -> Result<usize> {
        let encoded = encode_envelope(event, payload)?;
        Ok(self.deliver(EncodedEvent::from(encoded)))
    }

    /// Deliver `event` to a single subscriber.
    ///
    /// Returns false if the subscriber is unknown or was evicted by this call.
    pub fn send_to(&self, id: SubscriberId, event: &SessionEvent) -> Result<bool> {
        let encoded = EncodedEvent::from(event.encode()?);

        let mut subscribers = self.registry.subscribers.lock();
        let delivered = match subscribers.get(&id) {
            Some(sender) => try_deliver(id, sender, &encoded),
            None => return Ok(false),
        };
        if !delivered {
            subscribers.remove(&id);
        }
        Ok(delivered)
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn deliver(&self, encoded: EncodedEvent) -> usize {
        let mut delivered = 0;
        self.registry.subscribers.lock().retain(|id, sender| {
            let ok = try_deliver(*id, sender, &encoded);
            if ok {
                delivered += 1;
            }
            ok
        });
        delivered
    }
}

impl Default for SubscriberHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking send. Returns false if the subscriber must be dropped.
fn try_deliver(id: SubscriberId, sender: &Sender<EncodedEvent>, encoded: &EncodedEvent) -> bool {
    match sender.try_send(Arc::clone(encoded)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(subscriber = %id, "subscriber non-responsive, closing");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::debug!(subscriber = %id, "subscriber disconnected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RadarSnapshot;
    use crate::types::Offset;
    use crossbeam_channel::TryRecvError;
    use std::time::Duration;

    fn heartbeat(offset: u64) -> SessionEvent {
        SessionEvent::RadarSnapshot(RadarSnapshot {
            offset: Offset(offset),
            ..Default::default()
        })
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let hub = SubscriberHub::new();

        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_subscribed(sub.id));

        hub.unsubscribe(sub.id);
        assert_eq!(hub.subscriber_count(), 0);

        // Idempotent, both through the hub and the disposer
        hub.unsubscribe(sub.id);
        sub.dispose();
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_ids_are_monotonic() {
        let hub = SubscriberHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        a.dispose();
        let c = hub.subscribe();

        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = SubscriberHub::new();
        assert_eq!(hub.publish(&heartbeat(1)).unwrap(), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let hub = SubscriberHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();

        assert_eq!(hub.publish(&heartbeat(7)).unwrap(), 2);

        let from_a = a.recv_timeout(Duration::from_millis(100)).unwrap();
        let from_b = b.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(from_a, from_b);

        // Encoded once, shared by both
        assert!(Arc::ptr_eq(&from_a, &from_b));

        let value: serde_json::Value = serde_json::from_str(&from_a).unwrap();
        assert_eq!(value["e"], "SESSION_RADAR_SNAPSHOT");
        assert_eq!(value["d"]["offset"], 7);
    }

    #[test]
    fn test_slow_subscriber_is_evicted() {
        let hub = SubscriberHub::new();
        let slow = hub.subscribe();
        let fast = hub.subscribe();

        for i in 0..16 {
            assert_eq!(hub.publish(&heartbeat(i)).unwrap(), 2);
            fast.try_recv().unwrap();
        }

        // 17th message overflows the slow subscriber only
        assert_eq!(hub.publish(&heartbeat(16)).unwrap(), 1);
        assert!(!hub.is_subscribed(slow.id));
        assert!(hub.is_subscribed(fast.id));

        // Buffered messages drain, then the channel reports closed
        for _ in 0..16 {
            slow.try_recv().unwrap();
        }
        assert_eq!(slow.try_recv(), Err(TryRecvError::Disconnected));

        // Disposer is now a no-op
        slow.dispose();
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_capacity_bounds_pending_events() {
        assert_eq!(SubscriberHub::new().capacity(), DEFAULT_SUBSCRIBER_CAPACITY);

        // Zero would make every send fail
        let hub = SubscriberHub::with_capacity(0);
        assert_eq!(hub.capacity(), 1);

        let sub = hub.subscribe();
        assert_eq!(hub.publish(&heartbeat(1)).unwrap(), 1);
        assert_eq!(hub.publish(&heartbeat(2)).unwrap(), 0);
        assert!(!hub.is_subscribed(sub.id));
    }

    #[test]
    fn test_dropped_receiver_is_removed() {
        let hub = SubscriberHub::new();
        let sub = hub.subscribe();
        let Subscription { id, receiver, .. } = sub;
        drop(receiver);

        assert_eq!(hub.publish(&heartbeat(1)).unwrap(), 0);
        assert!(!hub.is_subscribed(id));
    }

    #[test]
    fn test_send_to_single_subscriber() {
        let hub = SubscriberHub::with_capacity(1);
        let a = hub.subscribe();
        let b = hub.subscribe();

        assert!(hub.send_to(a.id, &heartbeat(1)).unwrap());
        assert!(a.try_recv().is_ok());
        assert_eq!(b.try_recv(), Err(TryRecvError::Empty));

        // Fill b, then overflow it
        assert!(hub.send_to(b.id, &heartbeat(2)).unwrap());
        assert!(!hub.send_to(b.id, &heartbeat(3)).unwrap());
        assert!(!hub.is_subscribed(b.id));

        assert!(!hub.send_to(SubscriberId(999), &heartbeat(4)).unwrap());
    }

    #[test]
    fn test_disposer_outlives_hub() {
        let hub = SubscriberHub::new();
        let sub = hub.subscribe();
        drop(hub);

        sub.dispose();
        assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[test]
    fn test_serialization_error_delivers_nothing() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _: S) -> std::result::Result<S::Ok, S::Error> {
                Err(<S::Error as serde::ser::Error>::custom("unencodable payload"))
            }
        }

        let hub = SubscriberHub::new();
        let sub = hub.subscribe();

        let result = hub.publish_named("BROKEN", &Unencodable);
        assert!(matches!(result, Err(crate::SessionError::Serialization(_))));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));

        // Later publishes are unaffected
        assert_eq!(hub.publish(&heartbeat(1)).unwrap(), 1);
    }
}
