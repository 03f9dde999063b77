//! Authoritative in-memory snapshot of all tracked objects.

use crate::error::{Result, SessionError};
use crate::events::SessionStatePayload;
use crate::types::{DeltaBatch, Entity, ObjectId, Offset, PlayerMetadata, SessionHeader, AIR_TAG};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;

use super::operations::apply_change;

/// Mutable session state guarded by the store lock.
#[derive(Clone, Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) session_id: String,
    /// Bumped by every successful initialize; offsets restart at 0 with it.
    pub(crate) epoch: u64,
    pub(crate) offset: Offset,
    pub(crate) active: bool,
    pub(crate) objects: BTreeMap<ObjectId, Entity>,
}

impl SessionState {
    /// Copies of all objects not marked deleted, ordered by identifier.
    fn live_objects(&self) -> Vec<Entity> {
        self.objects
            .values()
            .filter(|entity| !entity.deleted)
            .cloned()
            .collect()
    }
}

/// Concurrent store of tracked objects with a logical offset.
///
/// All mutation goes through one exclusive lock; read accessors take the
/// shared lock and hand out copies, never references into the map.
pub struct ObjectStateStore {
    state: RwLock<SessionState>,
}

impl ObjectStateStore {
    /// Create an empty, inactive store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SessionState::default()),
        }
    }

    /// Reset to an empty, active session identified by the header.
    ///
    /// On failure the previous state is left untouched.
    pub fn initialize(&self, header: &SessionHeader) -> Result<()> {
        let session_id = header.session_id.trim();
        if session_id.is_empty() {
            return Err(SessionError::InvalidHeader(
                "missing session identifier".to_string(),
            ));
        }

        let mut state = self.state.write();
        let epoch = state.epoch + 1;
        *state = SessionState {
            session_id: session_id.to_string(),
            epoch,
            offset: Offset(0),
            active: true,
            objects: BTreeMap::new(),
        };
        Ok(())
    }

    /// Apply a delta batch, advancing the offset by exactly one.
    ///
    /// Returns the offset the batch was stamped with.
    pub fn apply(&self, batch: DeltaBatch) -> Offset {
        if batch.is_empty() {
            tracing::trace!("applying empty delta batch");
        }
        let mut state = self.state.write();
        let offset = state.offset.next();
        for change in batch.changes {
            apply_change(&mut state.objects, change, offset);
        }
        state.offset = offset;
        offset
    }

    /// Mark the session inactive, leaving objects in place for late readers.
    pub fn deactivate(&self) {
        self.state.write().active = false;
    }

    /// Point-in-time copy of all live objects, ordered by identifier.
    pub fn snapshot_all(&self) -> Vec<Entity> {
        self.state.read().live_objects()
    }

    /// Full baseline for (re)connecting subscribers, `None` while inactive.
    pub fn initial_state(&self) -> Option<SessionStatePayload> {
        let state = self.state.read();
        if !state.active {
            return None;
        }

        Some(SessionStatePayload {
            session_id: state.session_id.clone(),
            offset: state.offset,
            objects: state.live_objects(),
        })
    }

    /// Pilots currently in aircraft.
    ///
    /// AI flights are skipped: their pilot name starts with the group name.
    pub fn player_list(&self) -> Vec<PlayerMetadata> {
        let state = self.state.read();
        state
            .objects
            .values()
            .filter(|entity| !entity.deleted && entity.has_type(AIR_TAG))
            .filter_map(|entity| {
                let pilot = entity.property("Pilot")?;
                let group = entity.property("Group").unwrap_or_default();
                if pilot.starts_with(group) {
                    return None;
                }
                Some(PlayerMetadata {
                    name: pilot.to_string(),
                    kind: entity.property("Name").unwrap_or_default().to_string(),
                })
            })
            .collect()
    }

    pub fn is_active(&self) -> bool {
        self.state.read().active
    }

    pub fn offset(&self) -> Offset {
        self.state.read().offset
    }

    pub fn session_id(&self) -> String {
        self.state.read().session_id.clone()
    }

    /// Copy of a single object, including one pending deletion.
    pub fn get(&self, id: ObjectId) -> Option<Entity> {
        self.state.read().objects.get(&id).cloned()
    }

    /// Number of stored objects, including those pending deletion.
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Exclusive access for the diff cycle.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write()
    }
}

impl Default for ObjectStateStore {
    fn default() -> Self {
        Self::new()
    }
}
