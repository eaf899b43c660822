//! FILENAME: core/pivot-engine/src/writeback.rs
//! Write-Back Translator - turns unsaved pivot changes into backing-store calls.
//!
//! Order of one pass:
//! 1. add objects named by new header entries
//! 2. add relationships: new tuple entries and ones implied by edited cells
//! 3. add, then update, then remove parameter values
//! 4. remove relationships, then objects
//!
//! Rejected rows and unresolvable edits are collected as data and stay in the
//! model's Edit/Delete Sets. A lost connection aborts the rest of the pass;
//! batches that completed before it are still reported for fold-back.

use std::collections::{BTreeMap, BTreeSet};

use datamodel::{pack_json_array, RowKey, ScalarValue, Tuple};
use rustc_hash::FxHashMap;

use crate::catalog::AxisGroup;
use crate::descriptor::{EntityKind, ValueMode};
use crate::error::StoreError;
use crate::identifiers::{EntityRef, IdentifierMap, ItemId, ObjectIds, ValueKey};
use crate::model::PivotTableModel;
use crate::store::{
    BackingStore, ItemKind, ObjectSpec, ParameterValueSpec, RelationshipSpec, RemoveItems,
    ValuePayload, ValueUpdate,
};

/// One failed item of a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBackError {
    pub message: String,
    pub kind: ItemKind,
    /// What the item was, e.g. an object name or a row key.
    pub context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBackReport {
    /// Store rows written successfully.
    pub succeeded: usize,
    pub errors: Vec<WriteBackError>,
    /// The connection was lost and the pass stopped early.
    pub aborted: bool,
}

impl WriteBackReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && !self.aborted
    }

    /// Text for the "could not be saved" notice, if anything failed.
    pub fn failure_notice(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let mut notice = format!("{} item(s) could not be saved:", self.errors.len());
        for error in &self.errors {
            notice.push_str(&format!("\n{} {}: {}", error.kind.label(), error.context, error.message));
        }
        Some(notice)
    }

    fn record(&mut self, kind: ItemKind, context: impl Into<String>, message: impl Into<String>) {
        let error = WriteBackError {
            message: message.into(),
            kind,
            context: context.into(),
        };
        log::warn!(
            target: "PIVOT",
            "{} {} not saved: {}",
            error.kind.label(),
            error.context,
            error.message
        );
        self.errors.push(error);
    }
}

/// What a pass actually changed in the store, for
/// [`PivotTableModel::fold_back`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBackOutcome {
    pub succeeded: usize,
    pub persisted_edits: Vec<RowKey>,
    pub persisted_deletes: Vec<RowKey>,
    /// (class, name, id)
    pub objects_added: Vec<(String, String, ItemId)>,
    pub objects_removed: Vec<(String, String, ItemId)>,
    pub relationships_added: Vec<(ObjectIds, ItemId)>,
    pub relationships_removed: Vec<ObjectIds>,
    pub values_inserted: Vec<(ValueKey, ItemId)>,
    pub values_removed: Vec<ValueKey>,
    /// Index entries now matching the store.
    pub entries_persisted: Vec<(String, ScalarValue)>,
    /// Deleted index entries now gone from the store.
    pub entries_unpersisted: Vec<(String, ScalarValue)>,
    pub tuples_persisted: Vec<(AxisGroup, Tuple)>,
    pub tuples_unpersisted: Vec<(AxisGroup, Tuple)>,
}

/// One parameter value operation and the pivot rows it settles.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedValue {
    pub key: ValueKey,
    pub rows: Vec<RowKey>,
    /// None for deletions.
    pub payload: Option<ValuePayload>,
    /// The stored id for updates and deletions.
    pub id: Option<ItemId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuePlan {
    pub inserts: Vec<PlannedValue>,
    pub updates: Vec<PlannedValue>,
    pub deletes: Vec<PlannedValue>,
    /// Deleted rows with nothing stored behind them.
    pub settled: Vec<RowKey>,
    /// Rows whose entity or parameter cannot be resolved, with the reason.
    pub unresolved: Vec<(Vec<RowKey>, String)>,
}

/// Schema positions of the axes a value key is resolved from.
struct KeyPositions {
    entities: Vec<(usize, String)>,
    parameter: usize,
    index: usize,
}

pub struct WriteBack<'a> {
    model: &'a PivotTableModel,
}

impl<'a> WriteBack<'a> {
    pub fn new(model: &'a PivotTableModel) -> Self {
        WriteBack { model }
    }

    pub fn run<S: BackingStore + ?Sized>(&self, store: &mut S) -> (WriteBackReport, WriteBackOutcome) {
        let mut pass = Pass {
            store,
            ids: self.model.identifiers().clone(),
            report: WriteBackReport::default(),
            outcome: WriteBackOutcome::default(),
        };
        let Some((kind, mode)) = self.model.descriptor() else {
            log::warn!(target: "PIVOT", "save skipped: the pivot has no entity descriptor");
            pass.report.aborted = true;
            return (pass.report, pass.outcome);
        };
        let Some(positions) = self.positions(kind) else {
            log::warn!(target: "PIVOT", "save skipped: entity axes missing from the pivot");
            pass.report.aborted = true;
            return (pass.report, pass.outcome);
        };

        self.add_objects(&mut pass, kind);
        if !pass.report.aborted {
            self.add_relationships(&mut pass, kind, &positions);
        }
        if !pass.report.aborted {
            let plan = self.plan(&pass.ids, kind, *mode, &positions);
            self.write_values(&mut pass, kind, plan);
        }
        if !pass.report.aborted {
            self.remove_relationships(&mut pass, kind);
        }
        if !pass.report.aborted {
            self.remove_objects(&mut pass, kind);
        }

        pass.outcome.succeeded = pass.report.succeeded;
        log::info!(
            target: "PIVOT",
            "write-back {}: {} written, {} failed{}",
            kind.class_name(),
            pass.report.succeeded,
            pass.report.errors.len(),
            if pass.report.aborted { ", aborted" } else { "" }
        );
        (pass.report, pass.outcome)
    }

    /// Classifies every edited and deleted value against `ids`: stored keys
    /// become updates or deletes, the rest inserts.
    pub fn plan_values(&self, ids: &IdentifierMap) -> ValuePlan {
        match self.model.descriptor() {
            Some((kind, mode)) => match self.positions(kind) {
                Some(positions) => self.plan(ids, kind, *mode, &positions),
                None => ValuePlan::default(),
            },
            None => ValuePlan::default(),
        }
    }

    fn positions(&self, kind: &EntityKind) -> Option<KeyPositions> {
        let schema = self.model.schema();
        let config = self.model.config();
        let entities = kind
            .object_axes()
            .into_iter()
            .map(|(axis, class)| schema.position(&axis).ok().map(|p| (p, class)))
            .collect::<Option<Vec<_>>>()?;
        Some(KeyPositions {
            entities,
            parameter: schema.position(&config.parameter_axis).ok()?,
            index: schema.position(&config.index_axis).ok()?,
        })
    }

    fn object_ids(&self, ids: &IdentifierMap, kind: &EntityKind, names: &[&ScalarValue]) -> Result<ObjectIds, String> {
        kind.object_axes()
            .iter()
            .zip(names)
            .map(|((_, class), name)| {
                ids.object_id(class, &entity_name(name))
                    .ok_or_else(|| format!("object {:?} of class {:?} does not exist", entity_name(name), class))
            })
            .collect()
    }

    fn resolve(&self, ids: &IdentifierMap, kind: &EntityKind, positions: &KeyPositions, key: &RowKey) -> Result<ValueKey, String> {
        let names: Vec<&ScalarValue> = positions.entities.iter().map(|(p, _)| &key[*p]).collect();
        let objects = self.object_ids(ids, kind, &names)?;
        let entity = match kind {
            EntityKind::ObjectClass { .. } => EntityRef::Object(objects[0]),
            EntityKind::RelationshipClass { .. } => {
                if ids.relationship_id(&objects).is_none() {
                    return Err(format!(
                        "relationship {} does not exist",
                        Tuple::from(names.into_iter().cloned().collect::<Vec<_>>())
                    ));
                }
                EntityRef::Relationship(objects)
            }
        };
        let parameter = entity_name(&key[positions.parameter]);
        let parameter_id = ids.parameter_id(&parameter).ok_or_else(|| {
            format!("parameter {:?} is not defined for class {:?}", parameter, kind.class_name())
        })?;
        let index = key[positions.index]
            .as_index()
            .ok_or_else(|| format!("{} is not a valid index", key[positions.index]))?;
        Ok(ValueKey {
            entity,
            parameter_id,
            index,
        })
    }

    fn plan(&self, ids: &IdentifierMap, kind: &EntityKind, mode: ValueMode, positions: &KeyPositions) -> ValuePlan {
        let mut plan = ValuePlan::default();
        match mode {
            ValueMode::Scalar => {
                let mut edits: Vec<(&RowKey, &ScalarValue)> = self.model.edits().iter().collect();
                edits.sort_by(|a, b| a.0.cmp(b.0));
                for (row, value) in edits {
                    let key = match self.resolve(ids, kind, positions, row) {
                        Ok(key) => key,
                        Err(reason) => {
                            plan.unresolved.push((vec![row.clone()], reason));
                            continue;
                        }
                    };
                    let planned = PlannedValue {
                        id: ids.value_id(&key),
                        key,
                        rows: vec![row.clone()],
                        payload: Some(ValuePayload::Scalar(value.clone())),
                    };
                    if planned.id.is_some() {
                        plan.updates.push(planned);
                    } else {
                        plan.inserts.push(planned);
                    }
                }
                let mut deletes: Vec<&RowKey> = self.model.deletes().iter().collect();
                deletes.sort();
                for row in deletes {
                    let resolved = self.resolve(ids, kind, positions, row).ok();
                    match resolved.and_then(|key| ids.value_id(&key).map(|id| (key, id))) {
                        Some((key, id)) => plan.deletes.push(PlannedValue {
                            key,
                            rows: vec![row.clone()],
                            payload: None,
                            id: Some(id),
                        }),
                        None => plan.settled.push(row.clone()),
                    }
                }
            }
            ValueMode::Json => {
                for group in self.model.json_groups() {
                    let Some(first) = group.touched.first() else {
                        continue;
                    };
                    let key = match self.resolve(ids, kind, positions, first) {
                        Ok(key) => key,
                        Err(reason) => {
                            plan.unresolved.push((group.touched, reason));
                            continue;
                        }
                    };
                    let id = ids.value_id(&key);
                    if group.entries.is_empty() {
                        match id {
                            Some(id) => plan.deletes.push(PlannedValue {
                                key,
                                rows: group.touched,
                                payload: None,
                                id: Some(id),
                            }),
                            None => plan.settled.extend(group.touched),
                        }
                        continue;
                    }
                    let packed = match pack_json_array(&group.entries) {
                        Ok(packed) => packed,
                        Err(e) => {
                            plan.unresolved.push((group.touched, e.to_string()));
                            continue;
                        }
                    };
                    let planned = PlannedValue {
                        key,
                        rows: group.touched,
                        payload: Some(ValuePayload::Json(packed)),
                        id,
                    };
                    if id.is_some() {
                        plan.updates.push(planned);
                    } else {
                        plan.inserts.push(planned);
                    }
                }
            }
        }
        plan
    }

    fn add_objects<S: BackingStore + ?Sized>(&self, pass: &mut Pass<'_, S>, kind: &EntityKind) {
        let added = self.model.added_index_entries();
        let mut wanted: BTreeMap<(String, String), Vec<(String, ScalarValue)>> = BTreeMap::new();
        for (axis, class) in kind.object_axes() {
            let Some(values) = added.get(&axis) else {
                continue;
            };
            for value in values {
                let name = entity_name(value);
                if pass.ids.object_id(&class, &name).is_some() {
                    pass.outcome.entries_persisted.push((axis.clone(), value.clone()));
                } else {
                    wanted
                        .entry((class.clone(), name))
                        .or_default()
                        .push((axis.clone(), value.clone()));
                }
            }
        }
        if wanted.is_empty() {
            return;
        }
        let requests: Vec<((String, String), Vec<(String, ScalarValue)>)> = wanted.into_iter().collect();
        let specs: Vec<ObjectSpec> = requests
            .iter()
            .map(|((class, name), _)| ObjectSpec {
                class_name: class.clone(),
                name: name.clone(),
            })
            .collect();
        let names: Vec<String> = requests.iter().map(|((_, name), _)| name.clone()).collect();
        let Some(result) = pass.call(ItemKind::Object, kind.class_name(), &names, |s| s.add_objects(&specs)) else {
            return;
        };
        for (position, id) in result.succeeded {
            let ((class, name), entries) = &requests[position];
            pass.ids.insert_object(class, name, id);
            pass.outcome.objects_added.push((class.clone(), name.clone(), id));
            pass.outcome.entries_persisted.extend(entries.iter().cloned());
            pass.report.succeeded += 1;
        }
        for error in result.errors {
            let ((_, name), _) = &requests[error.position];
            pass.report.record(ItemKind::Object, name.clone(), error.message);
        }
    }

    fn add_relationships<S: BackingStore + ?Sized>(&self, pass: &mut Pass<'_, S>, kind: &EntityKind, positions: &KeyPositions) {
        let Some(group) = kind.relationship_group() else {
            return;
        };
        let mut candidates: BTreeSet<Tuple> = self
            .model
            .added_tuple_index_entries()
            .remove(&group)
            .unwrap_or_default();
        // Cells edited before their relationship exists.
        candidates.extend(
            self.model
                .edits()
                .keys()
                .map(|key| positions.entities.iter().map(|(p, _)| key[*p].clone()).collect::<Tuple>()),
        );

        let mut requests: Vec<(Tuple, ObjectIds)> = Vec::new();
        for tuple in candidates {
            let names: Vec<&ScalarValue> = tuple.iter().collect();
            let objects = match self.object_ids(&pass.ids, kind, &names) {
                Ok(objects) => objects,
                Err(reason) => {
                    pass.report.record(ItemKind::Relationship, tuple.to_string(), reason);
                    continue;
                }
            };
            if pass.ids.relationship_id(&objects).is_some() {
                pass.outcome.tuples_persisted.push((group.clone(), tuple));
            } else {
                requests.push((tuple, objects));
            }
        }
        if requests.is_empty() {
            return;
        }
        let specs: Vec<RelationshipSpec> = requests
            .iter()
            .map(|(_, objects)| RelationshipSpec {
                class_name: kind.class_name().to_string(),
                object_ids: objects.clone(),
            })
            .collect();
        let tuples: Vec<String> = requests.iter().map(|(tuple, _)| tuple.to_string()).collect();
        let Some(result) = pass.call(ItemKind::Relationship, kind.class_name(), &tuples, |s| s.add_relationships(&specs)) else {
            return;
        };
        for (position, id) in result.succeeded {
            let (tuple, objects) = &requests[position];
            pass.ids.insert_relationship(objects.clone(), id);
            pass.outcome.relationships_added.push((objects.clone(), id));
            pass.outcome.tuples_persisted.push((group.clone(), tuple.clone()));
            pass.report.succeeded += 1;
        }
        for error in result.errors {
            let (tuple, _) = &requests[error.position];
            pass.report.record(ItemKind::Relationship, tuple.to_string(), error.message);
        }
    }

    fn write_values<S: BackingStore + ?Sized>(&self, pass: &mut Pass<'_, S>, kind: &EntityKind, plan: ValuePlan) {
        for (rows, reason) in plan.unresolved {
            let context = rows.first().map(ToString::to_string).unwrap_or_default();
            pass.report.record(ItemKind::ParameterValue, context, reason);
        }
        for row in plan.settled {
            pass.outcome.persisted_deletes.push(row);
        }

        let (inserts, specs): (Vec<&PlannedValue>, Vec<ParameterValueSpec>) = plan
            .inserts
            .iter()
            .filter_map(|planned| {
                let spec = ParameterValueSpec {
                    class_name: kind.class_name().to_string(),
                    entity: planned.key.entity.clone(),
                    parameter_id: planned.key.parameter_id,
                    index: planned.key.index,
                    value: planned.payload.clone()?,
                };
                Some((planned, spec))
            })
            .unzip();
        // A failed batch does not stop the next one, a lost connection does.
        let contexts: Vec<String> = inserts.iter().map(|p| row_context(p)).collect();
        let result = if specs.is_empty() {
            None
        } else {
            pass.call(ItemKind::ParameterValue, kind.class_name(), &contexts, |s| s.add_parameter_values(&specs))
        };
        if let Some(result) = result {
            for (position, id) in result.succeeded {
                let planned = inserts[position];
                pass.ids.insert_value(planned.key.clone(), id);
                pass.outcome.values_inserted.push((planned.key.clone(), id));
                self.settle(&mut pass.outcome, &planned.rows);
                pass.report.succeeded += 1;
            }
            for error in result.errors {
                let context = row_context(inserts[error.position]);
                pass.report.record(ItemKind::ParameterValue, context, error.message);
            }
        }
        if pass.report.aborted {
            return;
        }

        let (updated, updates): (Vec<&PlannedValue>, Vec<ValueUpdate>) = plan
            .updates
            .iter()
            .filter_map(|planned| {
                let update = ValueUpdate {
                    id: planned.id?,
                    value: planned.payload.clone()?,
                };
                Some((planned, update))
            })
            .unzip();
        let contexts: Vec<String> = updated.iter().map(|p| row_context(p)).collect();
        let result = if updates.is_empty() {
            None
        } else {
            pass.call(ItemKind::ParameterValue, kind.class_name(), &contexts, |s| s.update_parameter_values(&updates))
        };
        if let Some(result) = result {
            for (position, _) in result.succeeded {
                self.settle(&mut pass.outcome, &updated[position].rows);
                pass.report.succeeded += 1;
            }
            for error in result.errors {
                let context = row_context(updated[error.position]);
                pass.report.record(ItemKind::ParameterValue, context, error.message);
            }
        }
        if pass.report.aborted {
            return;
        }

        if !plan.deletes.is_empty() {
            let by_id: FxHashMap<ItemId, &PlannedValue> = plan
                .deletes
                .iter()
                .filter_map(|planned| planned.id.map(|id| (id, planned)))
                .collect();
            let items = RemoveItems {
                parameter_values: plan.deletes.iter().filter_map(|p| p.id).collect(),
                ..Default::default()
            };
            let contexts: Vec<String> = plan.deletes.iter().map(row_context).collect();
            let Some(errors) = pass.call(ItemKind::ParameterValue, kind.class_name(), &contexts, |s| s.remove_items(&items)) else {
                return;
            };
            let failed: BTreeSet<ItemId> = errors.iter().map(|e| e.id).collect();
            for error in errors {
                let context = by_id.get(&error.id).map(|p| row_context(p)).unwrap_or_default();
                pass.report.record(ItemKind::ParameterValue, context, error.message);
            }
            for planned in &plan.deletes {
                if planned.id.is_some_and(|id| failed.contains(&id)) {
                    continue;
                }
                pass.ids.remove_value(&planned.key);
                pass.outcome.values_removed.push(planned.key.clone());
                self.settle(&mut pass.outcome, &planned.rows);
                pass.report.succeeded += 1;
            }
        }
    }

    fn remove_relationships<S: BackingStore + ?Sized>(&self, pass: &mut Pass<'_, S>, kind: &EntityKind) {
        let Some(group) = kind.relationship_group() else {
            return;
        };
        let Some(deleted) = self.model.deleted_tuple_index_entries().remove(&group) else {
            return;
        };
        let mut requests: Vec<(ItemId, Tuple, ObjectIds)> = Vec::new();
        for tuple in deleted {
            let names: Vec<&ScalarValue> = tuple.iter().collect();
            let stored = self
                .object_ids(&pass.ids, kind, &names)
                .ok()
                .and_then(|objects| pass.ids.relationship_id(&objects).map(|id| (id, objects)));
            match stored {
                Some((id, objects)) => requests.push((id, tuple, objects)),
                None => pass.outcome.tuples_unpersisted.push((group.clone(), tuple)),
            }
        }
        if requests.is_empty() {
            return;
        }
        let items = RemoveItems {
            relationships: requests.iter().map(|(id, _, _)| *id).collect(),
            ..Default::default()
        };
        let tuples: Vec<String> = requests.iter().map(|(_, tuple, _)| tuple.to_string()).collect();
        let Some(errors) = pass.call(ItemKind::Relationship, kind.class_name(), &tuples, |s| s.remove_items(&items)) else {
            return;
        };
        let failed: BTreeSet<ItemId> = errors.iter().map(|e| e.id).collect();
        for (id, tuple, objects) in requests {
            if failed.contains(&id) {
                pass.report
                    .record(ItemKind::Relationship, tuple.to_string(), "relationship could not be removed");
                continue;
            }
            pass.ids.remove_relationship(&objects);
            pass.outcome.relationships_removed.push(objects);
            pass.outcome.tuples_unpersisted.push((group.clone(), tuple));
            pass.report.succeeded += 1;
        }
    }

    fn remove_objects<S: BackingStore + ?Sized>(&self, pass: &mut Pass<'_, S>, kind: &EntityKind) {
        let deleted = self.model.deleted_index_entries();
        let object_axes = kind.object_axes();
        let mut doomed: BTreeMap<(String, String), Vec<(String, ScalarValue)>> = BTreeMap::new();
        for (axis, class) in &object_axes {
            let Some(values) = deleted.get(axis) else {
                continue;
            };
            for value in values {
                // Another axis of the same class may still show the object.
                let still_shown = object_axes
                    .iter()
                    .any(|(other, c)| c == class && self.model.catalog().contains(other, value));
                if still_shown {
                    pass.outcome.entries_unpersisted.push((axis.clone(), value.clone()));
                    continue;
                }
                doomed
                    .entry((class.clone(), entity_name(value)))
                    .or_default()
                    .push((axis.clone(), value.clone()));
            }
        }

        let mut requests = Vec::new();
        for ((class, name), entries) in doomed {
            match pass.ids.object_id(&class, &name) {
                Some(id) => requests.push((id, class, name, entries)),
                None => pass.outcome.entries_unpersisted.extend(entries),
            }
        }
        if requests.is_empty() {
            return;
        }
        let items = RemoveItems {
            objects: requests.iter().map(|(id, ..)| *id).collect(),
            ..Default::default()
        };
        let names: Vec<String> = requests.iter().map(|(_, _, name, _)| name.clone()).collect();
        let Some(errors) = pass.call(ItemKind::Object, kind.class_name(), &names, |s| s.remove_items(&items)) else {
            return;
        };
        let failed: BTreeSet<ItemId> = errors.iter().map(|e| e.id).collect();
        for (id, class, name, entries) in requests {
            if failed.contains(&id) {
                pass.report.record(ItemKind::Object, name, "object could not be removed");
                continue;
            }
            pass.ids.purge_object(id);
            pass.outcome.objects_removed.push((class, name, id));
            pass.outcome.entries_unpersisted.extend(entries);
            pass.report.succeeded += 1;
        }
    }

    /// Marks pivot rows as written: edits become stored values, deletions leave.
    fn settle(&self, outcome: &mut WriteBackOutcome, rows: &[RowKey]) {
        for row in rows {
            if self.model.edits().contains_key(row) {
                outcome.persisted_edits.push(row.clone());
            } else {
                outcome.persisted_deletes.push(row.clone());
            }
        }
    }
}

/// Mutable state of one write-back pass.
struct Pass<'s, S: BackingStore + ?Sized> {
    store: &'s mut S,
    /// Identifier Map as the pass goes: creations are visible to later steps.
    ids: IdentifierMap,
    report: WriteBackReport,
    outcome: WriteBackOutcome,
}

impl<'s, S: BackingStore + ?Sized> Pass<'s, S> {
    /// Runs one store call over a batch of `items`. A lost connection is
    /// recorded once against `class` and stops the pass; any other
    /// whole-call failure is recorded against every item of the batch.
    fn call<T>(
        &mut self,
        kind: ItemKind,
        class: &str,
        items: &[String],
        f: impl FnOnce(&mut S) -> Result<T, StoreError>,
    ) -> Option<T> {
        match f(&mut *self.store) {
            Ok(result) => Some(result),
            Err(StoreError::Disconnected) => {
                self.report.aborted = true;
                self.report.record(kind, class, StoreError::Disconnected.to_string());
                None
            }
            Err(error) => {
                let message = error.to_string();
                for item in items {
                    self.report.record(kind, item.clone(), message.clone());
                }
                None
            }
        }
    }
}

fn entity_name(value: &ScalarValue) -> String {
    match value.as_text() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

fn row_context(planned: &PlannedValue) -> String {
    planned.rows.first().map(ToString::to_string).unwrap_or_default()
}
