//! Boundary to the telemetry protocol client.
//!
//! The protocol decoder lives outside this crate. It connects to the
//! simulator's real-time telemetry endpoint, performs the handshake and turns
//! the raw feed into [`DeltaBatch`]es delivered over a channel.

use crate::error::Result;
use crate::types::{DeltaBatch, Endpoint, SessionHeader};
use crossbeam_channel::Receiver;

/// Stream of decoded delta batches.
///
/// A disconnected channel is a clean end-of-stream; an `Err` item is a
/// transport failure.
pub type TelemetryStream = Receiver<Result<DeltaBatch>>;

/// An established telemetry session.
pub struct TelemetryConnection {
    pub header: SessionHeader,
    pub stream: TelemetryStream,
}

impl TelemetryConnection {
    pub fn new(header: SessionHeader, stream: TelemetryStream) -> Self {
        Self { header, stream }
    }
}

/// Connects to a telemetry endpoint.
pub trait TelemetrySource: Send + Sync {
    /// Connect and complete the handshake.
    ///
    /// Fails with [`SessionError::Connect`](crate::SessionError::Connect) when
    /// the endpoint is unreachable or rejects the credentials.
    fn connect(&self, endpoint: &Endpoint) -> Result<TelemetryConnection>;
}
