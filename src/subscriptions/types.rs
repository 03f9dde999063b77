//! Subscription types for event fan-out.

use crossbeam_channel::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::hub::Registry;

/// An encoded envelope, shared by every subscriber it is delivered to.
pub type EncodedEvent = Arc<str>;

/// Unique identifier for a subscriber.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriberId({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Removes a subscriber from its hub.
///
/// Idempotent, and a no-op once the subscriber was evicted or the hub dropped.
#[derive(Clone)]
pub struct Disposer {
    id: SubscriberId,
    registry: Weak<Registry>,
}

impl Disposer {
    pub(crate) fn new(id: SubscriberId, registry: Weak<Registry>) -> Self {
        Self { id, registry }
    }

    pub fn dispose(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer").field("id", &self.id).finish()
    }
}

/// Handle to a registered subscriber.
///
/// The receiver is closed when the subscriber is disposed or evicted; any
/// messages already buffered can still be drained.
pub struct Subscription {
    pub id: SubscriberId,
    /// Channel to receive encoded events.
    pub receiver: Receiver<EncodedEvent>,
    pub disposer: Disposer,
}

impl Subscription {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<EncodedEvent, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<EncodedEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EncodedEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Unsubscribe.
    pub fn dispose(&self) {
        self.disposer.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish()
    }
}
