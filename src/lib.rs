//! # Radarcast
//!
//! Live telemetry session server core: ingests entity deltas from a flight
//! simulation feed, keeps an authoritative snapshot of every tracked object,
//! and broadcasts incremental changes to independently paced subscribers.
//!
//! ## Core Concepts
//!
//! - **Store**: Objects keyed by identifier, versioned by a logical offset
//!   advanced once per applied delta batch
//! - **Differ**: Periodic created/updated/deleted classification against the
//!   last published offset
//! - **Hub**: Non-blocking fan-out; subscribers that fall a full buffer
//!   behind are disconnected
//! - **Orchestrator**: Connect, stream, reconnect; drives the differ
//!
//! ## Example
//!
//! ```ignore
//! use radarcast::{SessionConfig, SessionOrchestrator, Endpoint};
//!
//! let config = SessionConfig::new("caucasus", Endpoint {
//!     host: "10.0.0.5".into(),
//!     port: 42674,
//!     password: "secret".into(),
//! });
//! let mut session = SessionOrchestrator::new(config, Arc::new(telemetry_client));
//! session.start()?;
//!
//! let sub = session.subscribe();
//! while let Ok(message) = sub.recv() {
//!     // {"e": "SESSION_RADAR_SNAPSHOT", "d": {...}}
//!     forward(&message);
//! }
//! ```

pub mod config;
pub mod enrichment;
pub mod error;
pub mod events;
pub mod ingest;
pub mod session;
pub mod state;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use config::{RetryPolicy, SessionConfig};
pub use enrichment::{EnrichmentSource, Geometry, PlayersInSlot, SharedGeometry, SlotPlayer};
pub use error::{Result, SessionError};
pub use events::{RadarSnapshot, SessionEvent, SessionStatePayload};
pub use ingest::{TelemetryConnection, TelemetrySource, TelemetryStream};
pub use session::{SessionOrchestrator, SessionPhase};
pub use state::{ObjectStateStore, SnapshotDiffer};
pub use subscriptions::{Disposer, EncodedEvent, SubscriberHub, SubscriberId, Subscription};
pub use types::*;
