//! Periodic change classification against the last published offset.

use crate::events::RadarSnapshot;
use crate::types::Offset;

use super::store::ObjectStateStore;

/// Computes created/updated/deleted snapshots between diff cycles.
///
/// The cursor is the offset published by the previous cycle. Deleted objects
/// are reported once and purged from the store in the same critical section.
/// A re-initialized store restarts its offsets, so the cursor is reset to 0
/// the first time the differ sees the new session.
#[derive(Debug, Default)]
pub struct SnapshotDiffer {
    cursor: Offset,
    epoch: u64,
}

impl SnapshotDiffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset published by the previous cycle.
    pub fn cursor(&self) -> Offset {
        self.cursor
    }

    /// Run one diff cycle.
    ///
    /// Returns `None` without touching the cursor when the store is inactive.
    /// Otherwise always returns a snapshot, even an empty one.
    pub fn tick(&mut self, store: &ObjectStateStore) -> Option<RadarSnapshot> {
        let mut state = store.write();
        if !state.active {
            return None;
        }

        if state.epoch != self.epoch {
            tracing::debug!(session_id = %state.session_id, "new session, diff cursor reset");
            self.epoch = state.epoch;
            self.cursor = Offset(0);
        }

        let mut snapshot = RadarSnapshot {
            offset: state.offset,
            ..Default::default()
        };

        // deleted > created > updated
        for entity in state.objects.values() {
            if entity.deleted {
                snapshot.deleted.push(entity.id);
            } else if entity.created_at > self.cursor {
                snapshot.created.push(entity.clone());
            } else if entity.updated_at > self.cursor {
                snapshot.updated.push(entity.clone());
            }
        }

        for id in &snapshot.deleted {
            state.objects.remove(id);
        }

        self.cursor = state.offset;
        Some(snapshot)
    }
}
