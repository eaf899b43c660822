//! FILENAME: tests/common/mod.rs
//! Fixtures for pivot-engine integration tests: a seeded in-memory store and
//! sessions opened on it.

#![allow(dead_code)]

use datamodel::ScalarValue;
use pivot_engine::store::{ObjectSpec, ParameterValueSpec, RelationshipSpec};
use pivot_engine::{
    BackingStore, EntityKind, EntityRef, ItemId, MemoryStore, PivotConfig, PivotSession,
    ValueMode, ValuePayload,
};
use smallvec::smallvec;

/// Ids of the seeded items.
pub struct Seeded {
    pub u1: ItemId,
    pub u2: ItemId,
    pub n1: ItemId,
    pub n2: ItemId,
    pub capacity: ItemId,
    pub profile: ItemId,
    pub flow: ItemId,
}

/// Two units, two nodes, one unit__node relationship (u1, n1).
///
/// Stored values:
/// - u1 capacity = 5.0 at index 1
/// - u1 profile = [1.0, 2.0] at index 1
/// - (u1, n1) flow = 3.0 at index 1
pub fn seeded_store() -> (MemoryStore, Seeded) {
    let mut store = MemoryStore::new();
    store.add_object_class("unit");
    store.add_object_class("node");
    store.add_relationship_class("unit__node", &["unit", "node"]);
    let capacity = store.add_parameter_definition("unit", "capacity");
    let profile = store.add_parameter_definition("unit", "profile");
    let flow = store.add_parameter_definition("unit__node", "flow");

    let objects = store
        .add_objects(&[object("unit", "u1"), object("unit", "u2"), object("node", "n1"), object("node", "n2")])
        .expect("seed objects");
    let ids: Vec<ItemId> = objects.succeeded.iter().map(|(_, id)| *id).collect();
    let (u1, u2, n1, n2) = (ids[0], ids[1], ids[2], ids[3]);

    store
        .add_relationships(&[RelationshipSpec {
            class_name: "unit__node".into(),
            object_ids: smallvec![u1, n1],
        }])
        .expect("seed relationships");

    store
        .add_parameter_values(&[
            value("unit", EntityRef::Object(u1), capacity, ValuePayload::Scalar(ScalarValue::number(5.0))),
            value(
                "unit",
                EntityRef::Object(u1),
                profile,
                ValuePayload::Json(serde_json::json!([1.0, 2.0])),
            ),
            value(
                "unit__node",
                EntityRef::Relationship(smallvec![u1, n1]),
                flow,
                ValuePayload::Scalar(ScalarValue::number(3.0)),
            ),
        ])
        .expect("seed values");
    store.seal();

    (store, Seeded { u1, u2, n1, n2, capacity, profile, flow })
}

pub fn unit_session(mode: ValueMode) -> (PivotSession<MemoryStore>, Seeded) {
    let (store, seeded) = seeded_store();
    let mut session = PivotSession::open(store, PivotConfig::default());
    session
        .select(EntityKind::object_class("unit"), mode)
        .expect("select unit");
    (session, seeded)
}

pub fn unit_node_session() -> (PivotSession<MemoryStore>, Seeded) {
    let (store, seeded) = seeded_store();
    let mut session = PivotSession::open(store, PivotConfig::default());
    session
        .select(
            EntityKind::relationship_class("unit__node", ["unit", "node"]),
            ValueMode::Scalar,
        )
        .expect("select unit__node");
    (session, seeded)
}

fn object(class: &str, name: &str) -> ObjectSpec {
    ObjectSpec {
        class_name: class.into(),
        name: name.into(),
    }
}

fn value(class: &str, entity: EntityRef, parameter_id: ItemId, value: ValuePayload) -> ParameterValueSpec {
    ParameterValueSpec {
        class_name: class.into(),
        entity,
        parameter_id,
        index: 1,
        value,
    }
}
