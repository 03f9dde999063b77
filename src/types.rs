//! Core types for the telemetry session.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a tracked object, unique within a live session.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Logical version of the session state, advanced once per applied batch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Offset(pub u64);

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Offset({})", self.0)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Offset {
    pub fn next(self) -> Self {
        Offset(self.0 + 1)
    }
}

/// Category tag marking an entity as an aircraft.
pub const AIR_TAG: &str = "Air";

/// A tracked simulation object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: ObjectId,

    /// Category tags (e.g. `Air`, `FixedWing`).
    pub types: BTreeSet<String>,

    /// Free-form properties (`Name`, `Pilot`, `Group`, ...).
    pub properties: BTreeMap<String, String>,

    /// Offset of the batch that created this entity.
    pub created_at: Offset,

    /// Offset of the last batch that touched this entity.
    pub updated_at: Offset,

    /// Marked for removal; purged by the next diff cycle.
    pub deleted: bool,
}

impl Entity {
    /// Create a fresh entity stamped with `offset`.
    pub fn new(id: ObjectId, offset: Offset) -> Self {
        Self {
            id,
            types: BTreeSet::new(),
            properties: BTreeMap::new(),
            created_at: offset,
            updated_at: offset,
            deleted: false,
        }
    }

    pub fn has_type(&self, tag: &str) -> bool {
        self.types.contains(tag)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// A single change carried by a delta batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectChange {
    /// Insert or replace an object.
    Create {
        id: ObjectId,
        types: BTreeSet<String>,
        properties: BTreeMap<String, String>,
    },

    /// Merge changed tags and properties into an existing object.
    Update {
        id: ObjectId,
        types: BTreeSet<String>,
        properties: BTreeMap<String, String>,
    },

    /// Mark an object as deleted.
    Remove { id: ObjectId },
}

impl ObjectChange {
    pub fn id(&self) -> ObjectId {
        match self {
            ObjectChange::Create { id, .. }
            | ObjectChange::Update { id, .. }
            | ObjectChange::Remove { id } => *id,
        }
    }

    /// Create change with no tags or properties.
    pub fn create(id: u64) -> Self {
        ObjectChange::Create {
            id: ObjectId(id),
            types: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Update change with no tags or properties.
    pub fn update(id: u64) -> Self {
        ObjectChange::Update {
            id: ObjectId(id),
            types: BTreeSet::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn remove(id: u64) -> Self {
        ObjectChange::Remove { id: ObjectId(id) }
    }

    /// Add a category tag (no-op for removals).
    pub fn with_type(mut self, tag: impl Into<String>) -> Self {
        if let ObjectChange::Create { types, .. } | ObjectChange::Update { types, .. } = &mut self {
            types.insert(tag.into());
        }
        self
    }

    /// Set a property (no-op for removals).
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let ObjectChange::Create { properties, .. } | ObjectChange::Update { properties, .. } =
            &mut self
        {
            properties.insert(key.into(), value.into());
        }
        self
    }
}

/// A unit of ingested change, applied atomically.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaBatch {
    pub changes: Vec<ObjectChange>,
}

impl DeltaBatch {
    pub fn new(changes: Vec<ObjectChange>) -> Self {
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

impl FromIterator<ObjectChange> for DeltaBatch {
    fn from_iter<I: IntoIterator<Item = ObjectChange>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Header returned by the telemetry source on a successful handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub session_id: String,

    /// Any additional header fields the source reports.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl SessionHeader {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            properties: BTreeMap::new(),
        }
    }
}

/// Where and how to reach the telemetry source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub password: String,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 42674,
            password: String::new(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Roster entry derived from live aircraft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_next() {
        assert_eq!(Offset(0).next(), Offset(1));
        assert_eq!(Offset(41).next(), Offset(42));
    }

    #[test]
    fn test_change_builders() {
        let change = ObjectChange::create(7)
            .with_type(AIR_TAG)
            .with_property("Pilot", "Maverick");

        match &change {
            ObjectChange::Create { id, types, properties } => {
                assert_eq!(*id, ObjectId(7));
                assert!(types.contains(AIR_TAG));
                assert_eq!(properties.get("Pilot").map(String::as_str), Some("Maverick"));
            }
            other => panic!("Expected Create, got {:?}", other),
        }

        // Removals ignore tags and properties
        let removal = ObjectChange::remove(7).with_type(AIR_TAG);
        assert_eq!(removal, ObjectChange::Remove { id: ObjectId(7) });
        assert_eq!(removal.id(), ObjectId(7));
    }

    #[test]
    fn test_ids_serialize_as_numbers() {
        let json = serde_json::to_string(&(ObjectId(12), Offset(3))).unwrap();
        assert_eq!(json, "[12,3]");
    }
}
