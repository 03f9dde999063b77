//! Application of individual object changes.

use crate::types::{Entity, ObjectChange, ObjectId, Offset};
use std::collections::BTreeMap;

/// Apply a single change to the object map, stamping it with `offset`.
///
/// - `Create` inserts or replaces the object; a replaced object starts over
///   as a new logical entity.
/// - `Update` merges tags and properties into a live object. An update for an
///   unknown identifier is treated as an implicit creation. Updates for an
///   object already marked deleted are ignored.
/// - `Remove` only marks the object; purging is left to the next diff cycle.
pub fn apply_change(objects: &mut BTreeMap<ObjectId, Entity>, change: ObjectChange, offset: Offset) {
    match change {
        ObjectChange::Create {
            id,
            types,
            properties,
        } => {
            let mut entity = Entity::new(id, offset);
            entity.types = types;
            entity.properties = properties;
            objects.insert(id, entity);
        }

        ObjectChange::Update {
            id,
            types,
            properties,
        } => match objects.get_mut(&id) {
            Some(entity) if entity.deleted => {
                tracing::debug!(object = %id, "ignoring update for deleted object");
            }
            Some(entity) => {
                entity.types.extend(types);
                entity.properties.extend(properties);
                entity.updated_at = offset;
            }
            None => {
                tracing::debug!(object = %id, "update for unknown object, creating it");
                let mut entity = Entity::new(id, offset);
                entity.types = types;
                entity.properties = properties;
                objects.insert(id, entity);
            }
        },

        ObjectChange::Remove { id } => {
            if let Some(entity) = objects.get_mut(&id) {
                entity.deleted = true;
                entity.updated_at = offset;
            }
        }
    }
}
