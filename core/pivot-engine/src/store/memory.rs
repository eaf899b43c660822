//! FILENAME: core/pivot-engine/src/store/memory.rs
//! In-memory backing store with the integrity rules of the relational one:
//! unique names, existing references, unique value keys, removal cascades.
//! Commit and rollback work on whole-table snapshots.

use std::collections::BTreeMap;

use super::{
    BackingStore, BatchResult, ItemKind, ObjectSpec, ParameterValueSpec, QueryFilter, QueryKind,
    Record, RelationshipSpec, RemoveError, RemoveItems, ValuePayload, ValueUpdate,
};
use crate::descriptor::ClassKind;
use crate::error::StoreError;
use crate::identifiers::{EntityRef, ItemId, ObjectIds};

#[derive(Debug, Clone, PartialEq)]
struct StoredValue {
    class_name: String,
    entity: EntityRef,
    parameter_id: ItemId,
    index: i64,
    value: ValuePayload,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Tables {
    object_classes: BTreeMap<ItemId, String>,
    relationship_classes: BTreeMap<ItemId, (String, Vec<String>)>,
    /// id -> (class, name)
    objects: BTreeMap<ItemId, (String, String)>,
    /// id -> (class, member object ids)
    relationships: BTreeMap<ItemId, (String, ObjectIds)>,
    /// id -> (class, name)
    parameters: BTreeMap<ItemId, (String, String)>,
    values: BTreeMap<ItemId, StoredValue>,
    next_id: ItemId,
}

impl Tables {
    fn allocate(&mut self) -> ItemId {
        self.next_id += 1;
        self.next_id
    }

    fn object_class_exists(&self, name: &str) -> bool {
        self.object_classes.values().any(|c| c == name)
    }

    fn relationship_class(&self, name: &str) -> Option<&Vec<String>> {
        self.relationship_classes
            .values()
            .find(|(n, _)| n == name)
            .map(|(_, classes)| classes)
    }

    fn entity_class(&self, entity: &EntityRef) -> Option<&str> {
        match entity {
            EntityRef::Object(id) => self.objects.get(id).map(|(class, _)| class.as_str()),
            EntityRef::Relationship(object_ids) => self
                .relationships
                .values()
                .find(|(_, members)| members == object_ids)
                .map(|(class, _)| class.as_str()),
        }
    }

    fn remove_relationship(&mut self, id: ItemId) -> bool {
        match self.relationships.remove(&id) {
            Some((_, members)) => {
                let entity = EntityRef::Relationship(members);
                self.values.retain(|_, v| v.entity != entity);
                true
            }
            None => false,
        }
    }

    fn remove_object(&mut self, id: ItemId) -> bool {
        if self.objects.remove(&id).is_none() {
            return false;
        }
        let doomed: Vec<ItemId> = self
            .relationships
            .iter()
            .filter(|(_, (_, members))| members.contains(&id))
            .map(|(rel, _)| *rel)
            .collect();
        for rel in doomed {
            self.remove_relationship(rel);
        }
        self.values.retain(|_, v| v.entity != EntityRef::Object(id));
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
    committed: Tables,
    commits: Vec<String>,
    disconnected: bool,
    /// Mutating calls left before the connection drops.
    calls_before_disconnect: Option<usize>,
    /// Mutating calls left before one fails as a whole, and its message.
    failing_call: Option<(usize, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Fixture helpers (schema setup outside the pivot contract)
    // ------------------------------------------------------------------

    pub fn add_object_class(&mut self, name: &str) -> ItemId {
        let id = self.tables.allocate();
        self.tables.object_classes.insert(id, name.to_string());
        id
    }

    pub fn add_relationship_class<S: AsRef<str>>(&mut self, name: &str, object_classes: &[S]) -> ItemId {
        let id = self.tables.allocate();
        let classes = object_classes.iter().map(|c| c.as_ref().to_string()).collect();
        self.tables
            .relationship_classes
            .insert(id, (name.to_string(), classes));
        id
    }

    pub fn add_parameter_definition(&mut self, class_name: &str, name: &str) -> ItemId {
        let id = self.tables.allocate();
        self.tables
            .parameters
            .insert(id, (class_name.to_string(), name.to_string()));
        id
    }

    /// Makes the current state the committed state.
    pub fn seal(&mut self) {
        self.committed = self.tables.clone();
    }

    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    pub fn reconnect(&mut self) {
        self.disconnected = false;
        self.calls_before_disconnect = None;
    }

    /// Drops the connection after `calls` more successful mutating calls.
    pub fn disconnect_after(&mut self, calls: usize) {
        self.calls_before_disconnect = Some(calls);
    }

    /// Fails the mutating call after the next `calls` ones with
    /// `StoreError::Other`. The connection stays up.
    pub fn fail_call_after(&mut self, calls: usize, message: &str) {
        self.failing_call = Some((calls, message.to_string()));
    }

    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    pub fn object_id(&self, class_name: &str, name: &str) -> Option<ItemId> {
        self.tables
            .objects
            .iter()
            .find(|(_, (c, n))| c == class_name && n == name)
            .map(|(id, _)| *id)
    }

    pub fn object_count(&self) -> usize {
        self.tables.objects.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.tables.relationships.len()
    }

    pub fn value_count(&self) -> usize {
        self.tables.values.len()
    }

    /// The stored value of `(entity, parameter name, index)`, if any.
    pub fn value_of(&self, entity: &EntityRef, parameter: &str, index: i64) -> Option<&ValuePayload> {
        let parameter_id = self
            .tables
            .parameters
            .iter()
            .find(|(_, (_, n))| n == parameter)
            .map(|(id, _)| *id)?;
        self.tables
            .values
            .values()
            .find(|v| v.entity == *entity && v.parameter_id == parameter_id && v.index == index)
            .map(|v| &v.value)
    }

    fn check_connected(&self) -> Result<(), StoreError> {
        if self.disconnected {
            Err(StoreError::Disconnected)
        } else {
            Ok(())
        }
    }

    fn begin_call(&mut self) -> Result<(), StoreError> {
        self.check_connected()?;
        if let Some((remaining, message)) = self.failing_call.as_mut() {
            if *remaining == 0 {
                let error = StoreError::Other(std::mem::take(message));
                self.failing_call = None;
                return Err(error);
            }
            *remaining -= 1;
        }
        if let Some(remaining) = self.calls_before_disconnect.as_mut() {
            if *remaining == 0 {
                self.disconnected = true;
                return Err(StoreError::Disconnected);
            }
            *remaining -= 1;
        }
        Ok(())
    }
}

impl BackingStore for MemoryStore {
    fn query(&self, kind: QueryKind, filter: &QueryFilter) -> Result<Vec<Record>, StoreError> {
        self.check_connected()?;
        let t = &self.tables;
        let records = match kind {
            QueryKind::Classes(ClassKind::Object) => t
                .object_classes
                .iter()
                .filter(|(_, name)| filter.matches(name))
                .map(|(id, name)| Record::ObjectClass {
                    id: *id,
                    name: name.clone(),
                })
                .collect(),
            QueryKind::Classes(ClassKind::Relationship) => t
                .relationship_classes
                .iter()
                .filter(|(_, (name, _))| filter.matches(name))
                .map(|(id, (name, classes))| Record::RelationshipClass {
                    id: *id,
                    name: name.clone(),
                    object_classes: classes.clone(),
                })
                .collect(),
            QueryKind::Objects => t
                .objects
                .iter()
                .filter(|(_, (class, _))| filter.matches(class))
                .map(|(id, (class, name))| Record::Object {
                    id: *id,
                    class_name: class.clone(),
                    name: name.clone(),
                })
                .collect(),
            QueryKind::Relationships => t
                .relationships
                .iter()
                .filter(|(_, (class, _))| filter.matches(class))
                .map(|(id, (class, members))| Record::Relationship {
                    id: *id,
                    class_name: class.clone(),
                    object_ids: members.clone(),
                })
                .collect(),
            QueryKind::ParameterDefinitions => t
                .parameters
                .iter()
                .filter(|(_, (class, _))| filter.matches(class))
                .map(|(id, (class, name))| Record::ParameterDefinition {
                    id: *id,
                    class_name: class.clone(),
                    name: name.clone(),
                })
                .collect(),
            QueryKind::ParameterValues => t
                .values
                .iter()
                .filter(|(_, v)| filter.matches(&v.class_name))
                .map(|(id, v)| Record::ParameterValue {
                    id: *id,
                    class_name: v.class_name.clone(),
                    entity: v.entity.clone(),
                    parameter_id: v.parameter_id,
                    index: v.index,
                    value: v.value.clone(),
                })
                .collect(),
        };
        Ok(records)
    }

    fn add_objects(&mut self, specs: &[ObjectSpec]) -> Result<BatchResult, StoreError> {
        self.begin_call()?;
        let mut result = BatchResult::default();
        for (position, spec) in specs.iter().enumerate() {
            if !self.tables.object_class_exists(&spec.class_name) {
                result.reject(position, format!("object class {:?} not found", spec.class_name));
            } else if spec.name.trim().is_empty() {
                result.reject(position, "object name is empty");
            } else if self.object_id(&spec.class_name, &spec.name).is_some() {
                result.reject(
                    position,
                    format!("there's already an object called {:?} in class {:?}", spec.name, spec.class_name),
                );
            } else {
                let id = self.tables.allocate();
                self.tables
                    .objects
                    .insert(id, (spec.class_name.clone(), spec.name.clone()));
                result.succeeded.push((position, id));
            }
        }
        Ok(result)
    }

    fn add_relationships(&mut self, specs: &[RelationshipSpec]) -> Result<BatchResult, StoreError> {
        self.begin_call()?;
        let mut result = BatchResult::default();
        for (position, spec) in specs.iter().enumerate() {
            let Some(classes) = self.tables.relationship_class(&spec.class_name).cloned() else {
                result.reject(position, format!("relationship class {:?} not found", spec.class_name));
                continue;
            };
            if classes.len() != spec.object_ids.len() {
                result.reject(
                    position,
                    format!("expected {} objects, got {}", classes.len(), spec.object_ids.len()),
                );
                continue;
            }
            let members_ok = classes.iter().zip(spec.object_ids.iter()).all(|(class, id)| {
                self.tables
                    .objects
                    .get(id)
                    .is_some_and(|(object_class, _)| object_class == class)
            });
            if !members_ok {
                result.reject(position, "relationship refers to missing objects");
                continue;
            }
            let duplicate = self
                .tables
                .relationships
                .values()
                .any(|(class, members)| *class == spec.class_name && *members == spec.object_ids);
            if duplicate {
                result.reject(position, "relationship already exists");
                continue;
            }
            let id = self.tables.allocate();
            self.tables
                .relationships
                .insert(id, (spec.class_name.clone(), spec.object_ids.clone()));
            result.succeeded.push((position, id));
        }
        Ok(result)
    }

    fn add_parameter_values(&mut self, specs: &[ParameterValueSpec]) -> Result<BatchResult, StoreError> {
        self.begin_call()?;
        let mut result = BatchResult::default();
        for (position, spec) in specs.iter().enumerate() {
            let parameter_class = self.tables.parameters.get(&spec.parameter_id).map(|(c, _)| c);
            if parameter_class != Some(&spec.class_name) {
                result.reject(position, format!("parameter {} not defined for {:?}", spec.parameter_id, spec.class_name));
                continue;
            }
            if self.tables.entity_class(&spec.entity) != Some(spec.class_name.as_str()) {
                result.reject(position, "parameter value refers to a missing entity");
                continue;
            }
            let duplicate = self.tables.values.values().any(|v| {
                v.entity == spec.entity && v.parameter_id == spec.parameter_id && v.index == spec.index
            });
            if duplicate {
                result.reject(position, "parameter value already exists");
                continue;
            }
            let id = self.tables.allocate();
            self.tables.values.insert(
                id,
                StoredValue {
                    class_name: spec.class_name.clone(),
                    entity: spec.entity.clone(),
                    parameter_id: spec.parameter_id,
                    index: spec.index,
                    value: spec.value.clone(),
                },
            );
            result.succeeded.push((position, id));
        }
        Ok(result)
    }

    fn update_parameter_values(&mut self, updates: &[ValueUpdate]) -> Result<BatchResult, StoreError> {
        self.begin_call()?;
        let mut result = BatchResult::default();
        for (position, update) in updates.iter().enumerate() {
            match self.tables.values.get_mut(&update.id) {
                Some(stored) => {
                    stored.value = update.value.clone();
                    result.succeeded.push((position, update.id));
                }
                None => result.reject(position, format!("parameter value {} not found", update.id)),
            }
        }
        Ok(result)
    }

    fn remove_items(&mut self, items: &RemoveItems) -> Result<Vec<RemoveError>, StoreError> {
        self.begin_call()?;
        let mut errors = Vec::new();
        let missing = |kind: ItemKind, id: ItemId| RemoveError {
            kind,
            id,
            message: format!("{} {} not found", kind.label(), id),
        };
        for id in &items.parameter_values {
            if self.tables.values.remove(id).is_none() {
                errors.push(missing(ItemKind::ParameterValue, *id));
            }
        }
        for id in &items.relationships {
            if !self.tables.remove_relationship(*id) {
                errors.push(missing(ItemKind::Relationship, *id));
            }
        }
        for id in &items.objects {
            if !self.tables.remove_object(*id) {
                errors.push(missing(ItemKind::Object, *id));
            }
        }
        Ok(errors)
    }

    fn commit_session(&mut self, message: &str) -> Result<(), StoreError> {
        self.check_connected()?;
        self.committed = self.tables.clone();
        self.commits.push(message.to_string());
        Ok(())
    }

    fn rollback_session(&mut self) -> Result<(), StoreError> {
        self.check_connected()?;
        self.tables = self.committed.clone();
        Ok(())
    }
}
