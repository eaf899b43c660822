//! FILENAME: core/pivot-engine/src/session.rs
//! Pivot session: one open editor over a backing store.
//!
//! Owns the store, the model, the filter proxy and the layout preferences.
//! The host talks to the session instead of reaching into shared state.

use std::collections::BTreeSet;

use datamodel::{unpack_json_array, ScalarValue, Tuple};
use rustc_hash::FxHashMap;

use crate::capabilities::Editable;
use crate::config::PivotConfig;
use crate::descriptor::{EntityKind, Selection, ValueMode};
use crate::error::{PivotError, StoreError};
use crate::identifiers::{EntityRef, IdentifierMap, ItemId, ValueKey};
use crate::layout::AxisRole;
use crate::model::{Direction, PivotData, PivotTableModel};
use crate::preferences::PivotPreferences;
use crate::proxy::PivotFilterProxy;
use crate::store::{BackingStore, QueryFilter, QueryKind, Record, ValuePayload};
use crate::writeback::{WriteBack, WriteBackReport};

pub struct PivotSession<S: BackingStore> {
    store: S,
    config: PivotConfig,
    model: PivotTableModel,
    proxy: PivotFilterProxy,
    preferences: PivotPreferences,
    selection: Option<(EntityKind, ValueMode)>,
}

impl<S: BackingStore> PivotSession<S> {
    pub fn open(store: S, config: PivotConfig) -> Self {
        let model = PivotTableModel::empty(config.clone());
        let proxy = PivotFilterProxy::new(&model);
        PivotSession {
            store,
            config,
            model,
            proxy,
            preferences: PivotPreferences::new(),
            selection: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn model(&self) -> &PivotTableModel {
        &self.model
    }

    pub fn proxy(&self) -> &PivotFilterProxy {
        &self.proxy
    }

    pub fn preferences(&self) -> &PivotPreferences {
        &self.preferences
    }

    pub fn selection(&self) -> Option<&(EntityKind, ValueMode)> {
        self.selection.as_ref()
    }

    /// Runs `f` against the model and refreshes the filter proxy afterwards.
    pub fn with_model<R>(&mut self, f: impl FnOnce(&mut PivotTableModel) -> R) -> R {
        let result = f(&mut self.model);
        self.proxy.refresh(&self.model);
        result
    }

    /// Loads a class into the pivot, with the remembered layout for this
    /// (class, value mode) when it still fits.
    pub fn select(&mut self, kind: EntityKind, mode: ValueMode) -> Result<(), PivotError> {
        let classes = self.store.query(
            QueryKind::Classes(kind.class_kind()),
            &QueryFilter::class(kind.class_name()),
        )?;
        if classes.is_empty() {
            return Err(StoreError::ClassNotFound(kind.class_name().to_string()).into());
        }

        let data = self.load(&kind, mode)?;
        log::info!(
            target: "PIVOT",
            "select {:?} ({:?}): {} data points",
            kind.class_name(),
            mode,
            data.rows.len()
        );
        self.model.set_new_data(data)?;
        self.proxy = PivotFilterProxy::new(&self.model);
        self.selection = Some((kind, mode));
        Ok(())
    }

    /// Re-queries the current selection, dropping unsaved changes.
    pub fn reload(&mut self) -> Result<(), PivotError> {
        let (kind, mode) = self.selection.clone().ok_or(PivotError::NoSelection)?;
        let filters = self.proxy.filters().clone();
        self.select(kind, mode)?;
        for (axis, allowed) in filters {
            if self.model.schema().contains(&axis) {
                self.proxy.set_filter(&self.model, &axis, allowed)?;
            }
        }
        Ok(())
    }

    fn load(&self, kind: &EntityKind, mode: ValueMode) -> Result<PivotData, PivotError> {
        let filter = QueryFilter::class(kind.class_name());
        let (axis_names, axis_types) = kind.axes(mode, &self.config);
        let mut ids = IdentifierMap::new();
        let mut data = PivotData::new(axis_names.clone(), axis_types);

        let mut object_names: FxHashMap<ItemId, String> = FxHashMap::default();
        for (axis, class) in kind.object_axes() {
            let mut entries = BTreeSet::new();
            for record in self.store.query(QueryKind::Objects, &QueryFilter::class(class.clone()))? {
                if let Record::Object { id, name, .. } = record {
                    ids.insert_object(&class, &name, id);
                    entries.insert(ScalarValue::text(name.clone()));
                    object_names.insert(id, name);
                }
            }
            data.index_entries.insert(axis, entries);
        }

        if let Some(group) = kind.relationship_group() {
            let mut tuples = BTreeSet::new();
            for record in self.store.query(QueryKind::Relationships, &filter)? {
                if let Record::Relationship { id, object_ids, .. } = record {
                    let names: Option<Tuple> = object_ids
                        .iter()
                        .map(|object| object_names.get(object).map(|n| ScalarValue::text(n.clone())))
                        .collect();
                    if let Some(names) = names {
                        tuples.insert(names);
                    }
                    ids.insert_relationship(object_ids, id);
                }
            }
            data.tuple_entries.insert(group, tuples);
        }

        let mut parameter_names: FxHashMap<ItemId, String> = FxHashMap::default();
        let mut parameters = BTreeSet::new();
        for record in self.store.query(QueryKind::ParameterDefinitions, &filter)? {
            if let Record::ParameterDefinition { id, name, .. } = record {
                ids.insert_parameter(&name, id);
                parameters.insert(ScalarValue::text(name.clone()));
                parameter_names.insert(id, name);
            }
        }
        data.index_entries
            .insert(self.config.parameter_axis.clone(), parameters);

        for record in self.store.query(QueryKind::ParameterValues, &filter)? {
            let Record::ParameterValue {
                id,
                entity,
                parameter_id,
                index,
                value,
                ..
            } = record
            else {
                continue;
            };
            let members: Vec<ItemId> = match &entity {
                EntityRef::Object(object) => vec![*object],
                EntityRef::Relationship(objects) => objects.to_vec(),
            };
            let names: Option<Vec<ScalarValue>> = members
                .iter()
                .map(|m| object_names.get(m).map(|n| ScalarValue::text(n.clone())))
                .collect();
            let (Some(names), Some(parameter)) = (names, parameter_names.get(&parameter_id)) else {
                log::warn!(target: "PIVOT", "value {} refers to an entity outside this class", id);
                continue;
            };
            let mut prefix = names;
            prefix.push(ScalarValue::text(parameter.clone()));
            prefix.push(ScalarValue::Integer(index));
            // Registered even when not shown, so an edit at the same key
            // updates the stored value instead of colliding with it.
            ids.insert_value(
                ValueKey {
                    entity,
                    parameter_id,
                    index,
                },
                id,
            );

            match (mode, value) {
                (ValueMode::Scalar, ValuePayload::Scalar(scalar)) => {
                    let mut row = prefix;
                    row.push(scalar);
                    data.rows.push(row);
                }
                (ValueMode::Scalar, ValuePayload::Json(json)) => {
                    let mut row = prefix;
                    row.push(ScalarValue::Text(json.to_string()));
                    data.rows.push(row);
                }
                (ValueMode::Json, ValuePayload::Json(json)) => match unpack_json_array(&json) {
                    Ok(elements) => {
                        for (position, element) in elements {
                            let mut row = prefix.clone();
                            row.push(ScalarValue::Integer(position));
                            row.push(element);
                            data.rows.push(row);
                        }
                    }
                    Err(e) => log::debug!(target: "PIVOT", "value {} not shown: {}", id, e),
                },
                (ValueMode::Json, ValuePayload::Scalar(_)) => {
                    log::debug!(target: "PIVOT", "value {} is not a json array, not shown", id);
                }
            }
        }

        let selection = Selection::of(kind, mode);
        let layout = self.preferences.recall(&selection, &axis_names, &self.config);
        data.identifiers = ids;
        data.descriptor = Some((kind.clone(), mode));
        Ok(data.with_layout(&layout))
    }

    fn remember_layout(&mut self) {
        if let Some((kind, mode)) = &self.selection {
            self.preferences
                .remember(Selection::of(kind, *mode), self.model.layout().clone());
        }
    }

    /// Changes the layout and remembers it for the current selection.
    pub fn set_pivot(
        &mut self,
        rows: Vec<String>,
        columns: Vec<String>,
        frozen: Vec<String>,
        frozen_value: Tuple,
    ) -> Result<(), PivotError> {
        self.model.set_pivot(rows, columns, frozen, frozen_value)?;
        self.remember_layout();
        self.proxy.refresh(&self.model);
        Ok(())
    }

    pub fn move_axis(&mut self, axis: &str, role: AxisRole, position: usize) -> Result<(), PivotError> {
        self.model.move_axis(axis, role, position)?;
        self.remember_layout();
        self.proxy.refresh(&self.model);
        Ok(())
    }

    pub fn set_frozen_value(&mut self, value: Tuple) -> Result<(), PivotError> {
        self.model.set_frozen_value(value)?;
        self.remember_layout();
        self.proxy.refresh(&self.model);
        Ok(())
    }

    pub fn set_filter(&mut self, axis: &str, allowed: BTreeSet<ScalarValue>) -> Result<(), PivotError> {
        self.proxy.set_filter(&self.model, axis, allowed)
    }

    pub fn clear_filter(&mut self, axis: &str) {
        self.proxy.clear_filter(&self.model, axis);
    }

    /// Deletes visible rows or columns (proxy indices).
    pub fn delete_selection(&mut self, selected: &[usize], direction: Direction) -> Result<(), PivotError> {
        self.proxy.delete_row_col(&mut self.model, selected, direction)
    }

    /// Writes unsaved changes to the store and folds what succeeded back into
    /// the model. Failures stay pending and are listed in the report.
    pub fn save(&mut self) -> WriteBackReport {
        let (report, outcome) = WriteBack::new(&self.model).run(&mut self.store);
        self.model.fold_back(&outcome);
        self.proxy.refresh(&self.model);
        report
    }

    pub fn commit(&mut self, message: &str) -> Result<(), PivotError> {
        self.store.commit_session(message)?;
        log::info!(target: "PIVOT", "committed: {}", message);
        Ok(())
    }

    /// Rolls the store back to the last commit and reloads the pivot.
    pub fn rollback(&mut self) -> Result<(), PivotError> {
        self.store.rollback_session()?;
        log::info!(target: "PIVOT", "rolled back");
        if self.selection.is_some() {
            self.reload()?;
        }
        Ok(())
    }
}

/// Edits address visible (filtered) cells.
impl<S: BackingStore> Editable for PivotSession<S> {
    fn edit(&mut self, row: usize, column: usize, value: Option<ScalarValue>) -> Result<(), PivotError> {
        let source_row = self
            .proxy
            .source_row(row)
            .ok_or(PivotError::OutOfRange { direction: "row", index: row })?;
        let source_column = self
            .proxy
            .source_column(column)
            .ok_or(PivotError::OutOfRange { direction: "column", index: column })?;
        self.model.edit_cell_at(source_row, source_column, value)
    }

    fn is_dirty(&self) -> bool {
        self.model.is_dirty()
    }
}
