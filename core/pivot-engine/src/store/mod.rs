//! FILENAME: core/pivot-engine/src/store/mod.rs
//! Backing store contract: the relational data-mapping layer the pivot reads
//! from and writes to.
//!
//! All calls are synchronous. A call either fails as a whole with
//! [`StoreError`] (e.g. the connection is gone) or succeeds with per-row
//! outcomes: rows the store rejected travel in `errors`, never as `Err`.

pub mod memory;

pub use memory::MemoryStore;

use datamodel::ScalarValue;
use serde::{Deserialize, Serialize};

use crate::descriptor::ClassKind;
use crate::error::StoreError;
use crate::identifiers::{EntityRef, ItemId, ObjectIds};

/// A stored parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValuePayload {
    Scalar(ScalarValue),
    /// A packed json array (json value mode).
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectSpec {
    pub class_name: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationshipSpec {
    pub class_name: String,
    /// Member object ids in object-class order.
    pub object_ids: ObjectIds,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValueSpec {
    pub class_name: String,
    pub entity: EntityRef,
    pub parameter_id: ItemId,
    pub index: i64,
    pub value: ValuePayload,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueUpdate {
    pub id: ItemId,
    pub value: ValuePayload,
}

/// One rejected row of a batch. `position` indexes the request slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub position: usize,
    pub message: String,
}

/// Outcome of an add or update batch: `(position, id)` for each accepted row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub succeeded: Vec<(usize, ItemId)>,
    pub errors: Vec<RowError>,
}

impl BatchResult {
    pub fn reject(&mut self, position: usize, message: impl Into<String>) {
        self.errors.push(RowError {
            position,
            message: message.into(),
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKind {
    Object,
    Relationship,
    ParameterValue,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Object => "object",
            ItemKind::Relationship => "relationship",
            ItemKind::ParameterValue => "parameter value",
        }
    }
}

/// Ids to remove, by kind. Removing an entity cascades to everything that
/// references it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveItems {
    pub objects: Vec<ItemId>,
    pub relationships: Vec<ItemId>,
    pub parameter_values: Vec<ItemId>,
}

impl RemoveItems {
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.relationships.is_empty() && self.parameter_values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveError {
    pub kind: ItemKind,
    pub id: ItemId,
    pub message: String,
}

/// What to fetch in a [`BackingStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Classes(ClassKind),
    Objects,
    Relationships,
    ParameterDefinitions,
    ParameterValues,
}

/// Narrows a query to one class. `None` fetches everything of the kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    pub class_name: Option<String>,
}

impl QueryFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn class(name: impl Into<String>) -> Self {
        QueryFilter {
            class_name: Some(name.into()),
        }
    }

    fn matches(&self, class_name: &str) -> bool {
        self.class_name.as_deref().map_or(true, |c| c == class_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    ObjectClass {
        id: ItemId,
        name: String,
    },
    RelationshipClass {
        id: ItemId,
        name: String,
        object_classes: Vec<String>,
    },
    Object {
        id: ItemId,
        class_name: String,
        name: String,
    },
    Relationship {
        id: ItemId,
        class_name: String,
        object_ids: ObjectIds,
    },
    ParameterDefinition {
        id: ItemId,
        class_name: String,
        name: String,
    },
    ParameterValue {
        id: ItemId,
        class_name: String,
        entity: EntityRef,
        parameter_id: ItemId,
        index: i64,
        value: ValuePayload,
    },
}

pub trait BackingStore {
    fn query(&self, kind: QueryKind, filter: &QueryFilter) -> Result<Vec<Record>, StoreError>;

    fn add_objects(&mut self, specs: &[ObjectSpec]) -> Result<BatchResult, StoreError>;

    fn add_relationships(&mut self, specs: &[RelationshipSpec]) -> Result<BatchResult, StoreError>;

    fn add_parameter_values(&mut self, specs: &[ParameterValueSpec]) -> Result<BatchResult, StoreError>;

    fn update_parameter_values(&mut self, updates: &[ValueUpdate]) -> Result<BatchResult, StoreError>;

    fn remove_items(&mut self, items: &RemoveItems) -> Result<Vec<RemoveError>, StoreError>;

    fn commit_session(&mut self, message: &str) -> Result<(), StoreError>;

    fn rollback_session(&mut self) -> Result<(), StoreError>;
}
