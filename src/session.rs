//! Session orchestrator tying the store, differ and hub together.

use crate::config::SessionConfig;
use crate::enrichment::{EnrichmentSource, PlayersInSlot, SharedGeometry};
use crate::error::{Result, SessionError};
use crate::events::{SessionEvent, SessionStatePayload};
use crate::ingest::TelemetrySource;
use crate::state::{ObjectStateStore, SnapshotDiffer};
use crate::subscriptions::{SubscriberHub, SubscriberId, Subscription};
use crate::types::{Entity, PlayerMetadata};
use crossbeam_channel::{after, bounded, select, tick, Receiver, Sender};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Where the ingestion lifecycle currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// Not started.
    Idle,
    /// Connecting to the telemetry source.
    Connecting,
    /// Streaming delta batches into the store.
    Active,
    /// Backing off after a failure.
    Error,
    /// Backing off after a clean end-of-stream.
    Closed,
    /// Stopped by the caller or by the retry policy.
    Stopped,
}

/// How a connected stream ended.
enum StreamEnd {
    Closed,
    Transport(SessionError),
    Shutdown,
}

/// State shared between the orchestrator and its workers.
struct Shared {
    config: SessionConfig,
    store: ObjectStateStore,
    hub: SubscriberHub,
    source: Arc<dyn TelemetrySource>,
    enrichment: Option<Arc<dyn EnrichmentSource>>,
    enabled: AtomicBool,
    phase: RwLock<SessionPhase>,
}

/// Drives one telemetry session.
///
/// Owns the object store and the subscriber hub, and runs two workers once
/// started:
/// - ingestion: connect, initialize, apply delta batches, reconnect after a
///   fixed backoff on failure or end-of-stream
/// - diff: every refresh interval, publish a radar snapshot (and enrichment
///   events) while the session is active
///
/// Both workers observe the shutdown signal at every wait, so [`stop`]
/// returns promptly except while a connect attempt is in flight.
///
/// [`stop`]: SessionOrchestrator::stop
pub struct SessionOrchestrator {
    shared: Arc<Shared>,
    shutdown: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl SessionOrchestrator {
    /// Create an orchestrator without enrichment.
    pub fn new(config: SessionConfig, source: Arc<dyn TelemetrySource>) -> Self {
        Self::build(config, source, None)
    }

    /// Create an orchestrator that republishes roster and overlay data.
    pub fn with_enrichment(
        config: SessionConfig,
        source: Arc<dyn TelemetrySource>,
        enrichment: Arc<dyn EnrichmentSource>,
    ) -> Self {
        Self::build(config, source, Some(enrichment))
    }

    fn build(
        config: SessionConfig,
        source: Arc<dyn TelemetrySource>,
        enrichment: Option<Arc<dyn EnrichmentSource>>,
    ) -> Self {
        let hub = SubscriberHub::with_capacity(config.subscriber_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                store: ObjectStateStore::new(),
                hub,
                source,
                enrichment,
                enabled: AtomicBool::new(false),
                phase: RwLock::new(SessionPhase::Idle),
            }),
            shutdown: None,
            workers: Vec::new(),
        }
    }

    // --- Lifecycle ---

    /// Spawn the ingestion and diff workers.
    pub fn start(&mut self) -> Result<()> {
        if self.shutdown.is_some() {
            return Err(SessionError::AlreadyRunning);
        }

        self.shared.set_phase(SessionPhase::Connecting);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let name = &self.shared.config.name;

        let ingest = {
            let shared = Arc::clone(&self.shared);
            let shutdown = shutdown_rx.clone();
            thread::Builder::new()
                .name(format!("{}-ingest", name))
                .spawn(move || shared.run_ingestion(&shutdown))?
        };

        let diff = {
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name(format!("{}-diff", name))
                .spawn(move || shared.run_diff(&shutdown_rx))
        };

        let diff = match diff {
            Ok(handle) => handle,
            Err(e) => {
                drop(shutdown_tx);
                let _ = ingest.join();
                return Err(e.into());
            }
        };

        tracing::info!(session = %name, endpoint = %self.shared.config.endpoint, "session started");
        self.shutdown = Some(shutdown_tx);
        self.workers = vec![ingest, diff];
        Ok(())
    }

    /// Signal both workers to stop and wait for them.
    ///
    /// Idempotent. The store is left in place, inactive.
    pub fn stop(&mut self) {
        let Some(shutdown) = self.shutdown.take() else {
            return;
        };

        tracing::info!(session = %self.shared.config.name, "stop requested");
        // Disconnecting the channel wakes every select on it
        drop(shutdown);

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!(session = %self.shared.config.name, "session worker panicked");
            }
        }

        self.shared.mark_disconnected();
        self.shared.set_phase(SessionPhase::Stopped);
    }

    /// Whether the workers are live.
    ///
    /// False once the retry policy gave up, even before `stop()` is called.
    /// `start()` still requires a `stop()` first in that case.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some() && self.phase() != SessionPhase::Stopped
    }

    // --- Accessors ---

    /// Whether the session is currently connected and initialized.
    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> SessionPhase {
        *self.shared.phase.read()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &ObjectStateStore {
        &self.shared.store
    }

    pub fn hub(&self) -> &SubscriberHub {
        &self.shared.hub
    }

    /// Copy of all live objects.
    pub fn snapshot_all(&self) -> Vec<Entity> {
        self.shared.store.snapshot_all()
    }

    /// Pilots currently in aircraft.
    pub fn player_list(&self) -> Vec<PlayerMetadata> {
        self.shared.store.player_list()
    }

    /// Full baseline, `None` while the session is inactive.
    pub fn initial_state(&self) -> Option<SessionStatePayload> {
        self.shared.store.initial_state()
    }

    // --- Subscriptions ---

    /// Register a subscriber.
    ///
    /// With `baseline_on_subscribe`, an active session also sends the new
    /// subscriber a private `SESSION_STATE`. It is taken after registration,
    /// so it may arrive after a radar snapshot published in between; the
    /// baseline is newer than any such snapshot.
    pub fn subscribe(&self) -> Subscription {
        let subscription = self.shared.hub.subscribe();

        if self.shared.config.baseline_on_subscribe {
            if let Some(state) = self.shared.store.initial_state() {
                let event = SessionEvent::SessionState(state);
                if let Err(e) = self.shared.hub.send_to(subscription.id, &event) {
                    tracing::warn!(subscriber = %subscription.id, error = %e, "failed to send baseline");
                }
            }
        }

        subscription
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.shared.hub.unsubscribe(id);
    }
}

impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn set_phase(&self, phase: SessionPhase) {
        *self.phase.write() = phase;
    }

    fn mark_disconnected(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.store.deactivate();
    }

    // --- Ingestion worker ---

    fn run_ingestion(&self, shutdown: &Receiver<()>) {
        let span = tracing::info_span!("session", name = %self.config.name);
        let _guard = span.enter();

        let mut failures: u32 = 0;
        loop {
            self.set_phase(SessionPhase::Connecting);

            match self.run_connection(shutdown, &mut failures) {
                Ok(StreamEnd::Shutdown) => return,
                Ok(StreamEnd::Closed) => {
                    tracing::info!("telemetry stream closed");
                    self.mark_disconnected();
                    self.set_phase(SessionPhase::Closed);
                }
                Ok(StreamEnd::Transport(e)) => {
                    tracing::warn!(error = %e, "telemetry stream failed");
                    self.mark_disconnected();
                    self.set_phase(SessionPhase::Error);
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(error = %e, failures, "telemetry session failed");
                    self.mark_disconnected();

                    if self.config.retry.exhausted(failures) {
                        tracing::error!(failures, "retry limit reached, ingestion stopped");
                        self.set_phase(SessionPhase::Stopped);
                        return;
                    }
                    self.set_phase(SessionPhase::Error);
                }
            }

            select! {
                recv(shutdown) -> _ => return,
                recv(after(self.config.retry.interval)) -> _ => {}
            }
        }
    }

    /// Connect, initialize and stream until the stream ends.
    ///
    /// Connect and initialize failures are returned as errors; anything after
    /// a successful initialize is reported as a [`StreamEnd`].
    fn run_connection(&self, shutdown: &Receiver<()>, failures: &mut u32) -> Result<StreamEnd> {
        let connection = self.source.connect(&self.config.endpoint)?;
        self.store.initialize(&connection.header)?;

        *failures = 0;
        self.enabled.store(true, Ordering::SeqCst);
        self.set_phase(SessionPhase::Active);
        tracing::info!(session_id = %connection.header.session_id, "telemetry session initialized");

        if let Some(state) = self.store.initial_state() {
            if let Err(e) = self.hub.publish(&SessionEvent::SessionState(state)) {
                tracing::warn!(error = %e, "failed to publish session state");
            }
        }

        loop {
            select! {
                recv(shutdown) -> _ => return Ok(StreamEnd::Shutdown),
                recv(connection.stream) -> message => match message {
                    Ok(Ok(batch)) => {
                        let changes = batch.len();
                        let offset = self.store.apply(batch);
                        tracing::trace!(%offset, changes, "delta batch applied");
                    }
                    Ok(Err(e)) => return Ok(StreamEnd::Transport(e)),
                    Err(_) => return Ok(StreamEnd::Closed),
                },
            }
        }
    }

    // --- Diff worker ---

    fn run_diff(&self, shutdown: &Receiver<()>) {
        let span = tracing::info_span!("session", name = %self.config.name);
        let _guard = span.enter();

        let mut differ = SnapshotDiffer::new();
        let ticker = tick(self.config.effective_refresh_interval());

        loop {
            select! {
                recv(shutdown) -> _ => return,
                recv(ticker) -> _ => self.diff_cycle(&mut differ),
            }
        }
    }

    fn diff_cycle(&self, differ: &mut SnapshotDiffer) {
        let snapshot = match differ.tick(&self.store) {
            Some(snapshot) => snapshot,
            None => return,
        };

        tracing::trace!(
            offset = %snapshot.offset,
            created = snapshot.created.len(),
            updated = snapshot.updated.len(),
            deleted = snapshot.deleted.len(),
            heartbeat = snapshot.is_empty(),
            "radar snapshot"
        );
        if let Err(e) = self.hub.publish(&SessionEvent::RadarSnapshot(snapshot)) {
            tracing::warn!(error = %e, "failed to publish radar snapshot");
        }

        if let Some(enrichment) = &self.enrichment {
            self.publish_enrichment(enrichment.as_ref());
        }
    }

    /// Republish overlay and roster data; failed fetches publish empty payloads.
    fn publish_enrichment(&self, source: &dyn EnrichmentSource) {
        let server_name = self.config.server_name.as_str();

        let overlay = source.fetch_overlay(server_name).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "shared geometry unavailable");
            SharedGeometry::default()
        });
        if let Err(e) = self.hub.publish(&SessionEvent::SharedGeometry(overlay)) {
            tracing::warn!(error = %e, "failed to publish shared geometry");
        }

        let roster = source.fetch_roster(server_name).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "player roster unavailable");
            PlayersInSlot::default()
        });
        if let Err(e) = self.hub.publish(&SessionEvent::PlayersInSlot(roster)) {
            tracing::warn!(error = %e, "failed to publish player roster");
        }
    }
}
