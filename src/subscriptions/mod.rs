//! Subscriber hub for live session updates.
//!
//! Every published event is encoded once and offered to each subscriber
//! through a bounded channel. Delivery never blocks: a subscriber that has
//! fallen a full buffer behind is disconnected instead.
//!
//! # Example
//!
//! ```ignore
//! let hub = SubscriberHub::new();
//! let sub = hub.subscribe();
//!
//! hub.publish(&SessionEvent::RadarSnapshot(snapshot))?;
//!
//! // Forward raw envelopes to a websocket client
//! while let Ok(message) = sub.recv() {
//!     socket.send_text(&message)?;
//! }
//! // Channel closed: disposed or evicted
//! ```

mod hub;
mod types;

pub use hub::SubscriberHub;
pub use types::{Disposer, EncodedEvent, SubscriberId, Subscription};
