//! FILENAME: core/pivot-engine/src/identifiers.rs
//! Identifier Map - backing-store ids for everything the pivot shows.
//!
//! Built fresh on every full reload and updated incrementally after
//! successful writes. Write-back uses it to decide insert versus update.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Backing-store row identifier.
pub type ItemId = i64;

/// Object ids of a relationship, in object-class order.
pub type ObjectIds = SmallVec<[ItemId; 4]>;

/// The entity a parameter value belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    Object(ItemId),
    Relationship(ObjectIds),
}

/// Canonical identity of one stored parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueKey {
    pub entity: EntityRef,
    pub parameter_id: ItemId,
    pub index: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    /// (object class, object name) -> object id
    objects: FxHashMap<(String, String), ItemId>,
    /// object ids -> relationship id, for the loaded relationship class
    relationships: FxHashMap<ObjectIds, ItemId>,
    /// parameter name -> parameter definition id
    parameters: FxHashMap<String, ItemId>,
    values: FxHashMap<ValueKey, ItemId>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_id(&self, class: &str, name: &str) -> Option<ItemId> {
        self.objects.get(&(class.to_string(), name.to_string())).copied()
    }

    pub fn insert_object(&mut self, class: &str, name: &str, id: ItemId) {
        self.objects.insert((class.to_string(), name.to_string()), id);
    }

    pub fn remove_object(&mut self, class: &str, name: &str) -> Option<ItemId> {
        self.objects.remove(&(class.to_string(), name.to_string()))
    }

    pub fn relationship_id(&self, objects: &[ItemId]) -> Option<ItemId> {
        self.relationships.get(objects).copied()
    }

    pub fn insert_relationship(&mut self, objects: ObjectIds, id: ItemId) {
        self.relationships.insert(objects, id);
    }

    pub fn remove_relationship(&mut self, objects: &[ItemId]) -> Option<ItemId> {
        self.relationships.remove(objects)
    }

    pub fn parameter_id(&self, name: &str) -> Option<ItemId> {
        self.parameters.get(name).copied()
    }

    pub fn insert_parameter(&mut self, name: &str, id: ItemId) {
        self.parameters.insert(name.to_string(), id);
    }

    pub fn value_id(&self, key: &ValueKey) -> Option<ItemId> {
        self.values.get(key).copied()
    }

    pub fn contains_value(&self, key: &ValueKey) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert_value(&mut self, key: ValueKey, id: ItemId) {
        self.values.insert(key, id);
    }

    pub fn remove_value(&mut self, key: &ValueKey) -> Option<ItemId> {
        self.values.remove(key)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Drops every value row that belongs to `entity`.
    pub fn remove_values_of(&mut self, entity: &EntityRef) {
        self.values.retain(|key, _| key.entity != *entity);
    }

    /// Drops an object together with the relationships and values that
    /// referenced it, mirroring the store's removal cascade.
    pub fn purge_object(&mut self, id: ItemId) {
        self.objects.retain(|_, object| *object != id);
        self.relationships.retain(|members, _| !members.contains(&id));
        self.values.retain(|key, _| match &key.entity {
            EntityRef::Object(object) => *object != id,
            EntityRef::Relationship(members) => !members.contains(&id),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_lookup_round_trip() {
        let mut ids = IdentifierMap::new();
        ids.insert_object("unit", "u1", 10);
        ids.insert_parameter("capacity", 3);
        ids.insert_relationship(smallvec![10, 11], 20);
        let key = ValueKey {
            entity: EntityRef::Relationship(smallvec![10, 11]),
            parameter_id: 3,
            index: 1,
        };
        ids.insert_value(key.clone(), 99);

        assert_eq!(ids.object_id("unit", "u1"), Some(10));
        assert_eq!(ids.object_id("node", "u1"), None);
        assert_eq!(ids.relationship_id(&[10, 11]), Some(20));
        assert_eq!(ids.value_id(&key), Some(99));

        ids.remove_values_of(&EntityRef::Relationship(smallvec![10, 11]));
        assert_eq!(ids.value_count(), 0);
    }

    #[test]
    fn test_purge_object_cascades() {
        let mut ids = IdentifierMap::new();
        ids.insert_object("unit", "u1", 10);
        ids.insert_object("node", "n1", 11);
        ids.insert_relationship(smallvec![10, 11], 20);
        ids.insert_value(
            ValueKey {
                entity: EntityRef::Object(11),
                parameter_id: 3,
                index: 1,
            },
            98,
        );
        ids.insert_value(
            ValueKey {
                entity: EntityRef::Relationship(smallvec![10, 11]),
                parameter_id: 4,
                index: 1,
            },
            99,
        );

        ids.purge_object(10);
        assert_eq!(ids.object_id("unit", "u1"), None);
        assert_eq!(ids.relationship_id(&[10, 11]), None);
        assert_eq!(ids.value_count(), 1);
    }
}
