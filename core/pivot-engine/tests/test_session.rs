//! FILENAME: tests/test_session.rs
//! Integration tests for loading, editing and saving through a pivot session.

mod common;

use std::collections::BTreeSet;

use common::{unit_node_session, unit_session};
use datamodel::{tuple, ScalarValue};
use pivot_engine::store::{ItemKind, ObjectSpec};
use pivot_engine::{BackingStore, Direction, EntityKind, EntityRef, ValueMode, ValuePayload};
use smallvec::smallvec;

fn number(n: f64) -> Option<ScalarValue> {
    Some(ScalarValue::number(n))
}

fn stored(n: f64) -> Option<ValuePayload> {
    Some(ValuePayload::Scalar(ScalarValue::number(n)))
}

// ============================================================================
// LOADING
// ============================================================================

#[test]
fn test_scalar_mode_renders_json_as_text() {
    let (session, _) = unit_session(ValueMode::Scalar);
    let model = session.model();
    assert_eq!(model.row_headers(), &[tuple!("u1"), tuple!("u2")]);
    assert_eq!(model.column_headers(), &[tuple!("capacity"), tuple!("profile")]);
    assert!(matches!(
        model.cell(&tuple!("u1"), &tuple!("profile")),
        Some(ScalarValue::Text(text)) if text.starts_with('[')
    ));
}

#[test]
fn test_json_mode_explodes_arrays() {
    let (session, _) = unit_session(ValueMode::Json);
    let model = session.model();
    assert_eq!(
        model.layout().rows(),
        &["unit".to_string(), "json time".to_string()]
    );
    assert_eq!(model.row_headers(), &[tuple!("u1", 1i64), tuple!("u1", 2i64)]);
    assert_eq!(
        model.cell(&tuple!("u1", 2i64), &tuple!("profile")),
        Some(&ScalarValue::number(2.0))
    );
    // Scalar capacity has no place in json mode.
    assert_eq!(model.cell(&tuple!("u1", 1i64), &tuple!("capacity")), None);
}

#[test]
fn test_relationship_class_uses_tuple_headers() {
    let (session, _) = unit_node_session();
    let model = session.model();
    assert_eq!(model.row_headers(), &[tuple!("u1", "n1")]);
    assert_eq!(
        model.cell(&tuple!("u1", "n1"), &tuple!("flow")),
        Some(&ScalarValue::number(3.0))
    );
}

#[test]
fn test_layout_preference_is_per_value_mode() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    session
        .set_pivot(
            vec!["db parameter".into()],
            vec!["unit".into()],
            vec!["db index".into()],
            tuple!(1i64),
        )
        .unwrap();

    session.select(EntityKind::object_class("unit"), ValueMode::Json).unwrap();
    assert_eq!(session.model().layout().columns(), &["db parameter".to_string()]);

    session.select(EntityKind::object_class("unit"), ValueMode::Scalar).unwrap();
    assert_eq!(session.model().layout().columns(), &["unit".to_string()]);
}

#[test]
fn test_reload_keeps_filters() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    let allowed: BTreeSet<ScalarValue> = [ScalarValue::text("u2")].into_iter().collect();
    session.set_filter("unit", allowed).unwrap();
    assert_eq!(session.proxy().row_count(), 1);

    session.reload().unwrap();
    assert_eq!(session.proxy().row_count(), 1);
    assert_eq!(session.proxy().row_header(session.model(), 0), Some(&tuple!("u2")));

    session.clear_filter("unit");
    assert_eq!(session.proxy().row_count(), 2);
}

// ============================================================================
// SAVING
// ============================================================================

#[test]
fn test_relationship_created_for_edited_cell() {
    let (mut session, _) = unit_node_session();
    session
        .with_model(|model| {
            model.add_header(Direction::Row, tuple!("u2", "n2"))?;
            model.edit_cell(&tuple!("u2", "n2"), &tuple!("flow"), number(7.0))
        })
        .unwrap();

    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(session.store().relationship_count(), 2);

    let u2 = session.store().object_id("unit", "u2").unwrap();
    let n2 = session.store().object_id("node", "n2").unwrap();
    assert_eq!(
        session
            .store()
            .value_of(&EntityRef::Relationship(smallvec![u2, n2]), "flow", 1)
            .cloned(),
        stored(7.0)
    );
    assert!(!session.model().is_dirty());
    assert!(session.model().added_tuple_index_entries().is_empty());
}

#[test]
fn test_new_header_creates_object() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    session
        .with_model(|model| {
            model.add_header(Direction::Row, tuple!("u3"))?;
            model.edit_cell(&tuple!("u3"), &tuple!("capacity"), number(1.5))
        })
        .unwrap();

    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    let u3 = session.store().object_id("unit", "u3").unwrap();
    assert_eq!(
        session.store().value_of(&EntityRef::Object(u3), "capacity", 1).cloned(),
        stored(1.5)
    );
    assert_eq!(session.model().identifiers().object_id("unit", "u3"), Some(u3));
}

#[test]
fn test_json_edit_is_packed_with_gap_fill() {
    let (mut session, seeded) = unit_session(ValueMode::Json);
    session
        .with_model(|model| {
            model.add_header(Direction::Row, tuple!("u1", 4i64))?;
            model.edit_cell(&tuple!("u1", 4i64), &tuple!("profile"), number(4.0))
        })
        .unwrap();

    assert!(session.save().is_clean());
    assert_eq!(
        session.store().value_of(&EntityRef::Object(seeded.u1), "profile", 1).cloned(),
        Some(ValuePayload::Json(serde_json::json!([1.0, 2.0, 0, 4.0])))
    );
}

#[test]
fn test_deleting_row_removes_object_and_values() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    session.delete_selection(&[0], Direction::Row).unwrap();
    assert!(session.model().is_dirty());

    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(session.store().object_id("unit", "u1"), None);
    assert_eq!(session.store().relationship_count(), 0);
    assert_eq!(session.store().value_count(), 0);
    assert_eq!(session.model().row_headers(), &[tuple!("u2")]);
    assert!(!session.model().is_dirty());
}

#[test]
fn test_restored_row_survives_save() {
    let (mut session, seeded) = unit_session(ValueMode::Scalar);
    session.delete_selection(&[0], Direction::Row).unwrap();
    // Typing the stored capacity back brings u1 back.
    session
        .with_model(|model| model.edit_cell(&tuple!("u1"), &tuple!("capacity"), number(5.0)))
        .unwrap();
    assert_eq!(session.model().row_headers(), &[tuple!("u1"), tuple!("u2")]);

    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(session.store().object_id("unit", "u1"), Some(seeded.u1));
    assert_eq!(
        session.store().value_of(&EntityRef::Object(seeded.u1), "capacity", 1).cloned(),
        stored(5.0)
    );
    // Profile was not restored and goes.
    assert_eq!(session.store().value_of(&EntityRef::Object(seeded.u1), "profile", 1), None);
    assert_eq!(
        session.model().cell(&tuple!("u1"), &tuple!("capacity")),
        Some(&ScalarValue::number(5.0))
    );
    assert!(!session.model().is_dirty());
}

#[test]
fn test_deleting_relationship_row_keeps_objects() {
    let (mut session, seeded) = unit_node_session();
    session.delete_selection(&[0], Direction::Row).unwrap();
    assert!(session.model().row_headers().is_empty());

    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert_eq!(session.store().relationship_count(), 0);
    assert_eq!(session.store().object_id("unit", "u1"), Some(seeded.u1));
    assert_eq!(session.store().object_id("node", "n1"), Some(seeded.n1));
    assert_eq!(
        session
            .store()
            .value_of(&EntityRef::Relationship(smallvec![seeded.u1, seeded.n1]), "flow", 1),
        None
    );
    // u1's own values are not part of the relationship.
    assert_eq!(session.store().value_count(), 2);
    assert!(!session.model().is_dirty());
}

#[test]
fn test_failed_batch_does_not_stop_later_batches() {
    let (mut session, seeded) = unit_session(ValueMode::Scalar);
    session
        .with_model(|model| {
            model.edit_cell(&tuple!("u2"), &tuple!("capacity"), number(2.0))?;
            model.edit_cell(&tuple!("u1"), &tuple!("capacity"), number(7.0))
        })
        .unwrap();
    // The insert batch is refused as a whole; the update batch is not.
    session.store_mut().fail_call_after(0, "table locked");

    let report = session.save();
    assert!(!report.aborted);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, ItemKind::ParameterValue);
    assert!(report.errors[0].context.contains("u2"));
    assert!(report.errors[0].message.contains("table locked"));

    assert_eq!(
        session.store().value_of(&EntityRef::Object(seeded.u1), "capacity", 1).cloned(),
        stored(7.0)
    );
    assert_eq!(session.store().value_of(&EntityRef::Object(seeded.u2), "capacity", 1), None);
    let model = session.model();
    assert!(model.is_edited(&tuple!("u2"), &tuple!("capacity")));
    assert!(!model.is_edited(&tuple!("u1"), &tuple!("capacity")));
}

#[test]
fn test_rejected_rows_stay_pending() {
    let (mut session, seeded) = unit_session(ValueMode::Scalar);
    session
        .with_model(|model| {
            model.add_header(Direction::Row, tuple!("u3"))?;
            model.edit_cell(&tuple!("u3"), &tuple!("capacity"), number(1.0))?;
            model.edit_cell(&tuple!("u1"), &tuple!("capacity"), number(7.0))
        })
        .unwrap();
    // Someone else takes the name first.
    session
        .store_mut()
        .add_objects(&[ObjectSpec {
            class_name: "unit".into(),
            name: "u3".into(),
        }])
        .unwrap();

    let report = session.save();
    assert!(!report.is_clean());
    assert!(!report.aborted);
    assert!(report.errors.iter().any(|e| e.kind == ItemKind::Object));
    assert!(report.failure_notice().is_some());

    // The update went through, the new object's value did not.
    assert_eq!(
        session.store().value_of(&EntityRef::Object(seeded.u1), "capacity", 1).cloned(),
        stored(7.0)
    );
    let model = session.model();
    assert!(model.is_dirty());
    assert_eq!(model.edits().len(), 1);
    assert!(model.is_edited(&tuple!("u3"), &tuple!("capacity")));
    assert!(!model.is_edited(&tuple!("u1"), &tuple!("capacity")));
}

#[test]
fn test_lost_connection_aborts_pass() {
    let (mut session, seeded) = unit_session(ValueMode::Scalar);
    session
        .with_model(|model| {
            model.add_header(Direction::Row, tuple!("u3"))?;
            model.edit_cell(&tuple!("u3"), &tuple!("capacity"), number(1.0))?;
            model.edit_cell(&tuple!("u1"), &tuple!("capacity"), number(7.0))
        })
        .unwrap();
    // The object batch goes through, the value inserts do not.
    session.store_mut().disconnect_after(1);

    let report = session.save();
    assert!(report.aborted);
    assert!(session.store().object_id("unit", "u3").is_some());
    assert_eq!(session.model().edits().len(), 2);

    session.store_mut().reconnect();
    let report = session.save();
    assert!(report.is_clean(), "{:?}", report.errors);
    assert!(!session.model().is_dirty());
    assert_eq!(
        session.store().value_of(&EntityRef::Object(seeded.u1), "capacity", 1).cloned(),
        stored(7.0)
    );
}

// ============================================================================
// SESSION CONTROL
// ============================================================================

#[test]
fn test_commit_then_rollback() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    session
        .with_model(|model| model.edit_cell(&tuple!("u2"), &tuple!("capacity"), number(2.0)))
        .unwrap();
    assert!(session.save().is_clean());
    session.commit("set u2 capacity").unwrap();

    session
        .with_model(|model| model.edit_cell(&tuple!("u1"), &tuple!("capacity"), number(0.5)))
        .unwrap();
    assert!(session.save().is_clean());
    session.rollback().unwrap();

    let model = session.model();
    assert_eq!(model.cell(&tuple!("u2"), &tuple!("capacity")), Some(&ScalarValue::number(2.0)));
    assert_eq!(model.cell(&tuple!("u1"), &tuple!("capacity")), Some(&ScalarValue::number(5.0)));
    assert_eq!(session.store().commits(), &["set u2 capacity".to_string()]);
}

#[test]
fn test_select_fails_when_disconnected() {
    let (mut session, _) = unit_session(ValueMode::Scalar);
    session.store_mut().disconnect();
    assert!(session.reload().is_err());
    // The previous pivot stays usable.
    assert_eq!(session.model().row_count(), 2);
    assert!(session.store().query(
        pivot_engine::store::QueryKind::Objects,
        &pivot_engine::store::QueryFilter::all()
    ).is_err());
}
