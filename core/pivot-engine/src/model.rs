//! FILENAME: core/pivot-engine/src/model.rs
//! Pivot Table Model - folds keyed values into a 2-D grid.
//!
//! The model owns:
//! - the Cell Value Mapping (`data`): the last known stored values
//! - the Edit Set (`edits`) and Delete Set (`deletes`): unsaved changes
//! - the Identifier Map: backing-store ids of what was loaded
//! - the Index Entry Catalog, plus a baseline snapshot taken at reload/save
//!
//! A data point is shown at (row header, column header) when its projection
//! onto the frozen axes equals the frozen value and its row/column projections
//! match. The "current" keys are `data - deletes + edits`.

use std::collections::{BTreeMap, BTreeSet};

use datamodel::{AxisSchema, AxisType, RowKey, ScalarValue, Tuple};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::catalog::{AxisGroup, IndexEntryCatalog};
use crate::config::{PivotConfig, ValidRange};
use crate::descriptor::{EntityKind, ValueMode};
use crate::error::{LayoutError, PivotError};
use crate::events::{EventBus, PivotEvent};
use crate::identifiers::IdentifierMap;
use crate::layout::{AxisRole, PivotLayout};
use crate::projection::{reconstruct, Projector};

/// Rows or columns of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Row,
    Column,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Row => "row",
            Direction::Column => "column",
        }
    }

    fn slot(self) -> usize {
        match self {
            Direction::Row => 0,
            Direction::Column => 1,
        }
    }
}

/// Everything a full reload needs.
///
/// Each entry of `rows` is the flat shape importers produce: one scalar per
/// axis (in `axis_names` order) followed by the stored value.
#[derive(Debug, Clone, Default)]
pub struct PivotData {
    pub rows: Vec<Vec<ScalarValue>>,
    pub axis_names: Vec<String>,
    pub axis_types: Vec<AxisType>,
    pub row_axes: Vec<String>,
    pub column_axes: Vec<String>,
    pub frozen_axes: Vec<String>,
    pub frozen_value: Tuple,
    pub valid_ranges: FxHashMap<String, ValidRange>,
    /// Entries that must have headers even without data.
    pub index_entries: FxHashMap<String, BTreeSet<ScalarValue>>,
    /// Valid composite tuples per axis group (e.g. existing relationships).
    pub tuple_entries: FxHashMap<AxisGroup, BTreeSet<Tuple>>,
    pub identifiers: IdentifierMap,
    /// What the rows describe; write-back needs it to address the store.
    pub descriptor: Option<(EntityKind, ValueMode)>,
}

impl PivotData {
    pub fn new(axis_names: Vec<String>, axis_types: Vec<AxisType>) -> Self {
        PivotData {
            axis_names,
            axis_types,
            ..Default::default()
        }
    }

    pub fn with_layout(mut self, layout: &PivotLayout) -> Self {
        self.row_axes = layout.rows().to_vec();
        self.column_axes = layout.columns().to_vec();
        self.frozen_axes = layout.frozen().to_vec();
        self.frozen_value = layout.frozen_value().clone();
        self
    }

    pub fn with_rows(mut self, rows: Vec<Vec<ScalarValue>>) -> Self {
        self.rows = rows;
        self
    }
}

/// The values of one json-packed parameter value touched by unsaved changes.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonGroup {
    /// The row key without its json component.
    pub base: Tuple,
    /// Current entries by json index: stored, minus deletions, plus edits.
    pub entries: BTreeMap<i64, ScalarValue>,
    /// Edit and Delete Set keys belonging to this group.
    pub touched: Vec<RowKey>,
}

pub struct PivotTableModel {
    config: PivotConfig,
    schema: AxisSchema,
    data: FxHashMap<RowKey, ScalarValue>,
    edits: FxHashMap<RowKey, ScalarValue>,
    deletes: FxHashSet<RowKey>,
    identifiers: IdentifierMap,
    descriptor: Option<(EntityKind, ValueMode)>,
    catalog: IndexEntryCatalog,
    baseline: IndexEntryCatalog,
    layout: PivotLayout,
    valid_ranges: FxHashMap<String, ValidRange>,
    groups: Vec<(AxisGroup, Projector)>,
    row_projector: Projector,
    column_projector: Projector,
    frozen_projector: Projector,
    row_headers: Vec<Tuple>,
    column_headers: Vec<Tuple>,
    /// Headers added by hand that have no data yet, per direction.
    added_headers: [BTreeSet<Tuple>; 2],
    events: EventBus,
}

impl PivotTableModel {
    /// Creates a model over the axes of `layout`, with `catalog` as its
    /// initial index entries. Integer axes are the configured index and json
    /// axes. Fails when the layout names an axis twice, which a deserialized
    /// layout can do.
    pub fn new(
        config: PivotConfig,
        catalog: IndexEntryCatalog,
        layout: PivotLayout,
    ) -> Result<Self, PivotError> {
        let names: Vec<String> = layout.all_axes().cloned().collect();
        let types = names
            .iter()
            .map(|name| {
                if *name == config.index_axis || *name == config.json_axis {
                    AxisType::Integer
                } else {
                    AxisType::Text
                }
            })
            .collect();
        let schema = AxisSchema::new(names, types)?;
        Ok(Self::from_parts(config, schema, catalog, layout))
    }

    pub fn empty(config: PivotConfig) -> Self {
        Self::from_parts(config, AxisSchema::default(), IndexEntryCatalog::new(), PivotLayout::default())
    }

    fn from_parts(
        config: PivotConfig,
        schema: AxisSchema,
        catalog: IndexEntryCatalog,
        layout: PivotLayout,
    ) -> Self {
        let mut model = PivotTableModel {
            config,
            schema,
            data: FxHashMap::default(),
            edits: FxHashMap::default(),
            deletes: FxHashSet::default(),
            identifiers: IdentifierMap::new(),
            descriptor: None,
            baseline: catalog.clone(),
            catalog,
            layout,
            valid_ranges: FxHashMap::default(),
            groups: Vec::new(),
            row_projector: Projector::default(),
            column_projector: Projector::default(),
            frozen_projector: Projector::default(),
            row_headers: Vec::new(),
            column_headers: Vec::new(),
            added_headers: [BTreeSet::new(), BTreeSet::new()],
            events: EventBus::default(),
        };
        model.rebuild_projectors();
        model.recompute_headers();
        model
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PivotEvent) + 'static) {
        self.events.subscribe(Box::new(listener));
    }

    // ------------------------------------------------------------------
    // Reload and layout
    // ------------------------------------------------------------------

    /// Full reload. Validates everything before touching any state, so a
    /// shape or layout error leaves the previous data in place.
    pub fn set_new_data(&mut self, data: PivotData) -> Result<(), PivotError> {
        let schema = AxisSchema::new(data.axis_names, data.axis_types)?;
        let frozen_value = coerce_frozen(&schema, &data.frozen_axes, data.frozen_value)?;
        let layout = PivotLayout::new(
            data.row_axes,
            data.column_axes,
            data.frozen_axes,
            frozen_value,
            schema.names(),
        )?;

        let arity = schema.len();
        let mut values = FxHashMap::default();
        values.reserve(data.rows.len());
        for (i, mut row) in data.rows.into_iter().enumerate() {
            if row.len() != arity + 1 {
                return Err(PivotError::Shape {
                    row: i,
                    expected: arity + 1,
                    found: row.len(),
                });
            }
            let value = row.pop().ok_or(PivotError::Shape {
                row: i,
                expected: arity + 1,
                found: 0,
            })?;
            let key = schema.row_key(row)?;
            values.insert(key, value);
        }

        let mut groups = Vec::with_capacity(data.tuple_entries.len());
        for group in data.tuple_entries.keys() {
            let projector = Projector::new(&schema, group.names())
                .map_err(|_| PivotError::UnknownGroup(group.names().to_vec()))?;
            groups.push((group.clone(), projector));
        }
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        let mut catalog = IndexEntryCatalog::new();
        for name in schema.names() {
            catalog.declare_axis(name);
        }
        for (axis, entries) in data.index_entries {
            let position = schema.position(&axis)?;
            let coerced = entries
                .into_iter()
                .map(|v| schema.coerce(position, v))
                .collect::<Result<Vec<_>, _>>()?;
            catalog.register(&axis, coerced);
        }
        for (group, tuples) in data.tuple_entries {
            catalog.register_tuple(&group, tuples);
        }
        for key in values.keys() {
            for (position, value) in key.iter().enumerate() {
                catalog.register(&schema.names()[position], [value.clone()]);
            }
            for (group, projector) in &groups {
                catalog.register_tuple(group, [projector.project(key)]);
            }
        }
        if schema.contains(&self.config.index_axis) {
            catalog.ensure_default_index(&self.config.index_axis, self.config.default_index);
        }

        let mut valid_ranges = data.valid_ranges;
        for (axis, range) in [
            (&self.config.index_axis, self.config.index_range),
            (&self.config.json_axis, self.config.json_range),
        ] {
            if schema.contains(axis) {
                valid_ranges.entry(axis.clone()).or_insert(range);
            }
        }

        log::info!(
            target: "PIVOT",
            "reload axes={:?} values={} rows={:?} columns={:?} frozen={:?}",
            schema.names(),
            values.len(),
            layout.rows(),
            layout.columns(),
            layout.frozen()
        );

        self.schema = schema;
        self.data = values;
        self.edits.clear();
        self.deletes.clear();
        self.identifiers = data.identifiers;
        self.descriptor = data.descriptor;
        self.baseline = catalog.clone();
        self.catalog = catalog;
        self.layout = layout;
        self.valid_ranges = valid_ranges;
        self.groups = groups;
        self.added_headers = [BTreeSet::new(), BTreeSet::new()];
        self.rebuild_projectors();
        self.recompute_headers();
        self.events.emit(PivotEvent::Reset);
        Ok(())
    }

    /// Re-lays out the grid without reloading data.
    pub fn set_pivot(
        &mut self,
        rows: Vec<String>,
        columns: Vec<String>,
        frozen: Vec<String>,
        frozen_value: Tuple,
    ) -> Result<(), PivotError> {
        let frozen_value = coerce_frozen(&self.schema, &frozen, frozen_value)?;
        self.layout
            .set(rows, columns, frozen, frozen_value, self.schema.names())?;
        log::debug!(
            target: "PIVOT",
            "set_pivot rows={:?} columns={:?} frozen={:?}={}",
            self.layout.rows(),
            self.layout.columns(),
            self.layout.frozen(),
            self.layout.frozen_value()
        );
        self.after_layout_change();
        Ok(())
    }

    /// Moves one axis to another role. When the axis becomes frozen its value
    /// is the first known entry of the axis (the default index for the
    /// scalar-index axis).
    pub fn move_axis(&mut self, axis: &str, role: AxisRole, position: usize) -> Result<(), PivotError> {
        let component = if role == AxisRole::Frozen && self.layout.role_of(axis) != Some(AxisRole::Frozen) {
            let first = self
                .catalog
                .entries(axis)
                .and_then(|entries| entries.iter().next().cloned());
            match first {
                Some(value) => Some(value),
                None if axis == self.config.index_axis => {
                    Some(ScalarValue::Integer(self.config.default_index))
                }
                None => return Err(LayoutError::MissingFrozenValue(axis.to_string()).into()),
            }
        } else {
            None
        };
        self.layout.move_axis(axis, role, position, component)?;
        self.after_layout_change();
        Ok(())
    }

    /// Changes the visible slice. Edit and Delete Sets are untouched.
    pub fn set_frozen_value(&mut self, value: Tuple) -> Result<(), PivotError> {
        let value = coerce_frozen(&self.schema, self.layout.frozen(), value)?;
        self.layout.set_frozen_value(value)?;
        self.recompute_headers();
        self.events
            .emit(PivotEvent::FrozenValueChanged(self.layout.frozen_value().clone()));
        Ok(())
    }

    fn after_layout_change(&mut self) {
        self.added_headers = [BTreeSet::new(), BTreeSet::new()];
        self.rebuild_projectors();
        self.recompute_headers();
        self.events.emit(PivotEvent::LayoutChanged);
    }

    fn rebuild_projectors(&mut self) {
        let positions = |axes: &[String]| -> Vec<usize> {
            axes.iter()
                .filter_map(|a| self.schema.position(a).ok())
                .collect()
        };
        self.row_projector = Projector::from_positions(positions(self.layout.rows()));
        self.column_projector = Projector::from_positions(positions(self.layout.columns()));
        self.frozen_projector = Projector::from_positions(positions(self.layout.frozen()));
    }

    fn recompute_headers(&mut self) {
        self.row_headers = self.compute_headers(Direction::Row);
        self.column_headers = self.compute_headers(Direction::Column);
    }

    /// Sorted distinct projections of the visible keys, completed with
    /// catalog entries that have no data yet:
    /// - a single axis gets every index entry of that axis;
    /// - several axes inside one tuple group get that group's tuples
    ///   (restricted to the frozen slice where the group overlaps it);
    /// - no axes at all yields one empty header.
    fn compute_headers(&self, direction: Direction) -> Vec<Tuple> {
        let (axes, projector) = match direction {
            Direction::Row => (self.layout.rows(), &self.row_projector),
            Direction::Column => (self.layout.columns(), &self.column_projector),
        };
        let frozen_value = self.layout.frozen_value();
        let mut headers: BTreeSet<Tuple> = self
            .current_keys()
            .filter(|key| self.frozen_projector.project(key) == *frozen_value)
            .map(|key| projector.project(key))
            .collect();

        match axes.len() {
            0 => {
                headers.insert(Tuple::new());
            }
            1 => {
                if let Some(entries) = self.catalog.entries(&axes[0]) {
                    headers.extend(entries.iter().map(|v| Tuple::from(vec![v.clone()])));
                }
            }
            _ => {
                for (group, _) in &self.groups {
                    if !axes.iter().all(|a| group.names().contains(a)) {
                        continue;
                    }
                    let inner: Vec<usize> = axes
                        .iter()
                        .filter_map(|a| group.names().iter().position(|g| g == a))
                        .collect();
                    let constraints: Vec<(usize, &ScalarValue)> = self
                        .layout
                        .frozen()
                        .iter()
                        .zip(frozen_value.iter())
                        .filter_map(|(axis, value)| {
                            group.names().iter().position(|g| g == axis).map(|i| (i, value))
                        })
                        .collect();
                    if let Some(tuples) = self.catalog.tuples(group) {
                        for tuple in tuples {
                            if constraints.iter().all(|(i, v)| tuple.get(*i) == Some(*v)) {
                                headers.insert(crate::projection::project(tuple, &inner));
                            }
                        }
                    }
                }
            }
        }
        headers.extend(self.added_headers[direction.slot()].iter().cloned());
        headers.into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Read accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &PivotConfig {
        &self.config
    }

    pub fn schema(&self) -> &AxisSchema {
        &self.schema
    }

    pub fn layout(&self) -> &PivotLayout {
        &self.layout
    }

    pub fn catalog(&self) -> &IndexEntryCatalog {
        &self.catalog
    }

    pub fn baseline(&self) -> &IndexEntryCatalog {
        &self.baseline
    }

    pub fn identifiers(&self) -> &IdentifierMap {
        &self.identifiers
    }

    pub fn descriptor(&self) -> Option<&(EntityKind, ValueMode)> {
        self.descriptor.as_ref()
    }

    pub fn data(&self) -> &FxHashMap<RowKey, ScalarValue> {
        &self.data
    }

    pub fn edits(&self) -> &FxHashMap<RowKey, ScalarValue> {
        &self.edits
    }

    pub fn deletes(&self) -> &FxHashSet<RowKey> {
        &self.deletes
    }

    pub fn tuple_groups(&self) -> impl Iterator<Item = &AxisGroup> {
        self.groups.iter().map(|(group, _)| group)
    }

    pub fn is_dirty(&self) -> bool {
        !self.edits.is_empty()
            || !self.deletes.is_empty()
            || self.catalog != self.baseline
    }

    pub fn row_headers(&self) -> &[Tuple] {
        &self.row_headers
    }

    pub fn column_headers(&self) -> &[Tuple] {
        &self.column_headers
    }

    pub fn headers(&self, direction: Direction) -> &[Tuple] {
        match direction {
            Direction::Row => &self.row_headers,
            Direction::Column => &self.column_headers,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_headers.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_headers.len()
    }

    pub fn row_index(&self, header: &Tuple) -> Option<usize> {
        self.row_headers.binary_search(header).ok()
    }

    pub fn column_index(&self, header: &Tuple) -> Option<usize> {
        self.column_headers.binary_search(header).ok()
    }

    /// Keys of `data - deletes + edits`.
    pub fn current_keys(&self) -> impl Iterator<Item = &RowKey> {
        self.data
            .keys()
            .filter(move |key| !self.deletes.contains(*key))
            .chain(self.edits.keys().filter(move |key| !self.data.contains_key(*key)))
    }

    /// The edited value if any, else the stored value unless deleted.
    pub fn value(&self, key: &RowKey) -> Option<&ScalarValue> {
        if let Some(value) = self.edits.get(key) {
            return Some(value);
        }
        if self.deletes.contains(key) {
            return None;
        }
        self.data.get(key)
    }

    /// The full row key shown at (row header, column header) in the current slice.
    pub fn key_for(&self, row: &Tuple, column: &Tuple) -> Option<RowKey> {
        reconstruct(
            self.schema.len(),
            &[
                (&self.row_projector, row),
                (&self.column_projector, column),
                (&self.frozen_projector, self.layout.frozen_value()),
            ],
        )
    }

    pub fn cell(&self, row: &Tuple, column: &Tuple) -> Option<&ScalarValue> {
        let key = self.key_for(row, column)?;
        self.value(&key)
    }

    pub fn cell_at(&self, row: usize, column: usize) -> Option<&ScalarValue> {
        let row = self.row_headers.get(row)?;
        let column = self.column_headers.get(column)?;
        self.cell(row, column)
    }

    /// True when the cell holds an unsaved edit.
    pub fn is_edited(&self, row: &Tuple, column: &Tuple) -> bool {
        self.key_for(row, column)
            .is_some_and(|key| self.edits.contains_key(&key))
    }

    /// Values selectable for the frozen axes: every frozen projection of the
    /// current keys, the catalog entries when a single axis is frozen, and the
    /// current frozen value.
    pub fn frozen_values(&self) -> Vec<Tuple> {
        let mut values: BTreeSet<Tuple> = self
            .current_keys()
            .map(|key| self.frozen_projector.project(key))
            .collect();
        if let [axis] = self.layout.frozen() {
            if let Some(entries) = self.catalog.entries(axis) {
                values.extend(entries.iter().map(|v| Tuple::from(vec![v.clone()])));
            }
        }
        values.insert(self.layout.frozen_value().clone());
        values.into_iter().collect()
    }

    pub fn added_index_entries(&self) -> FxHashMap<String, BTreeSet<ScalarValue>> {
        self.catalog.added_since(&self.baseline)
    }

    pub fn deleted_index_entries(&self) -> FxHashMap<String, BTreeSet<ScalarValue>> {
        self.catalog.removed_since(&self.baseline)
    }

    /// Composite tuples present now but not at the last reload or save, e.g.
    /// relationships a save has to create.
    pub fn added_tuple_index_entries(&self) -> FxHashMap<AxisGroup, BTreeSet<Tuple>> {
        self.catalog.added_tuples_since(&self.baseline)
    }

    pub fn deleted_tuple_index_entries(&self) -> FxHashMap<AxisGroup, BTreeSet<Tuple>> {
        self.catalog.removed_tuples_since(&self.baseline)
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Writes `value` into the cell at (row header, column header).
    ///
    /// `None` or blank text clears the cell: a stored value moves to the
    /// Delete Set, an unsaved one is dropped. Writing the stored value back
    /// leaves no dirty state behind.
    pub fn edit_cell(
        &mut self,
        row: &Tuple,
        column: &Tuple,
        value: Option<ScalarValue>,
    ) -> Result<(), PivotError> {
        let key = self.key_for(row, column).ok_or(PivotError::Value(
            datamodel::ValueError::Arity {
                expected: self.layout.rows().len() + self.layout.columns().len(),
                found: row.len() + column.len(),
            },
        ))?;
        let key = self.validate_key(key)?;
        self.apply_value(key, value.filter(|v| !v.is_blank()));
        self.events.emit(PivotEvent::CellChanged {
            row: row.clone(),
            column: column.clone(),
        });
        Ok(())
    }

    pub fn edit_cell_at(
        &mut self,
        row: usize,
        column: usize,
        value: Option<ScalarValue>,
    ) -> Result<(), PivotError> {
        let row_header = self
            .row_headers
            .get(row)
            .cloned()
            .ok_or(PivotError::OutOfRange { direction: "row", index: row })?;
        let column_header = self
            .column_headers
            .get(column)
            .cloned()
            .ok_or(PivotError::OutOfRange { direction: "column", index: column })?;
        self.edit_cell(&row_header, &column_header, value)
    }

    fn apply_value(&mut self, key: RowKey, value: Option<ScalarValue>) {
        match value {
            Some(value) => {
                // The key is current again, so are its entries, even when a
                // delete had dropped them from the catalog.
                self.deletes.remove(&key);
                self.register_key(&key);
                if self.data.get(&key) == Some(&value) {
                    self.edits.remove(&key);
                    log::debug!(target: "PIVOT", "edit {} restores stored value", key);
                } else {
                    log::debug!(target: "PIVOT", "edit {} = {}", key, value);
                    self.edits.insert(key, value);
                }
            }
            None => {
                self.edits.remove(&key);
                if self.data.contains_key(&key) {
                    log::debug!(target: "PIVOT", "clear {}", key);
                    self.deletes.insert(key);
                }
            }
        }
    }

    /// Checks every component of `key` against its axis.
    fn validate_key(&self, key: RowKey) -> Result<RowKey, PivotError> {
        key.into_iter()
            .enumerate()
            .map(|(position, value)| self.validate_entry(position, value))
            .collect()
    }

    fn validate_entry(&self, position: usize, value: ScalarValue) -> Result<ScalarValue, PivotError> {
        let axis = self.schema.name(position).unwrap_or_default();
        let invalid = |value: &ScalarValue| PivotError::InvalidEntry {
            axis: axis.to_string(),
            value: value.to_string(),
        };
        if value.is_blank() {
            return Err(invalid(&value));
        }
        let value = self.schema.coerce(position, value)?;
        if let (Some(range), Some(index)) = (self.valid_ranges.get(axis), value.as_index()) {
            if !range.contains(index) {
                return Err(invalid(&value));
            }
        }
        Ok(value)
    }

    /// Registers every component and tuple projection of a current key.
    /// Headers are recomputed when that adds an entry.
    fn register_key(&mut self, key: &RowKey) {
        let mut events = Vec::new();
        for (position, value) in key.iter().enumerate() {
            let axis = &self.schema.names()[position];
            let added = self.catalog.register(axis, [value.clone()]);
            events.extend(PivotEvent::entries_added(axis, added));
        }
        for (group, projector) in &self.groups {
            let added = self.catalog.register_tuple(group, [projector.project(key)]);
            if !added.is_empty() {
                events.push(PivotEvent::TupleEntriesChanged {
                    group: group.clone(),
                    diff: crate::catalog::EntryDiff {
                        added,
                        removed: BTreeSet::new(),
                    },
                });
            }
        }
        if events.is_empty() {
            return;
        }
        self.recompute_headers();
        for event in events {
            self.events.emit(event);
        }
        self.events.emit(PivotEvent::HeadersChanged);
    }

    /// Adds a header row or column that has no data yet, e.g. a new object
    /// name typed into the blank header row. Its values become added index
    /// entries; when the header spans a whole tuple group, the tuple becomes
    /// an added tuple entry.
    pub fn add_header(&mut self, direction: Direction, header: Tuple) -> Result<(), PivotError> {
        let axes = match direction {
            Direction::Row => self.layout.rows().to_vec(),
            Direction::Column => self.layout.columns().to_vec(),
        };
        if header.len() != axes.len() {
            return Err(datamodel::ValueError::Arity {
                expected: axes.len(),
                found: header.len(),
            }
            .into());
        }
        let mut validated = Tuple::with_capacity(header.len());
        for (axis, value) in axes.iter().zip(header) {
            let position = self.schema.position(axis)?;
            validated.push(self.validate_entry(position, value)?);
        }

        let mut events = Vec::new();
        for (axis, value) in axes.iter().zip(validated.iter()) {
            let added = self.catalog.register(axis, [value.clone()]);
            events.extend(PivotEvent::entries_added(axis, added));
        }
        for (group, _) in &self.groups {
            if !group.covered_by(&axes) {
                continue;
            }
            let tuple: Tuple = group
                .names()
                .iter()
                .filter_map(|g| axes.iter().position(|a| a == g))
                .map(|i| validated[i].clone())
                .collect();
            let added = self.catalog.register_tuple(group, [tuple]);
            if !added.is_empty() {
                events.push(PivotEvent::TupleEntriesChanged {
                    group: group.clone(),
                    diff: crate::catalog::EntryDiff {
                        added,
                        removed: BTreeSet::new(),
                    },
                });
            }
        }
        log::debug!(target: "PIVOT", "add {} header {}", direction.label(), validated);
        self.added_headers[direction.slot()].insert(validated);
        self.recompute_headers();
        for event in events {
            self.events.emit(event);
        }
        self.events.emit(PivotEvent::HeadersChanged);
        Ok(())
    }

    /// Renames one component of a header. Every value under the old header
    /// (across all frozen slices) moves to the renamed key: stored old keys
    /// go to the Delete Set, new keys enter the Edit Set.
    pub fn edit_header(
        &mut self,
        direction: Direction,
        header_index: usize,
        axis: &str,
        new_value: ScalarValue,
    ) -> Result<(), PivotError> {
        let header = self
            .headers(direction)
            .get(header_index)
            .cloned()
            .ok_or(PivotError::OutOfRange {
                direction: direction.label(),
                index: header_index,
            })?;
        let axes = match direction {
            Direction::Row => self.layout.rows(),
            Direction::Column => self.layout.columns(),
        };
        let within = axes
            .iter()
            .position(|a| a == axis)
            .ok_or_else(|| LayoutError::UnknownAxis(axis.to_string()))?;
        let position = self.schema.position(axis)?;
        let new_value = self.validate_entry(position, new_value)?;
        if header[within] == new_value {
            return Ok(());
        }
        let mut renamed = header.clone();
        renamed.replace(within, new_value);

        let projector = match direction {
            Direction::Row => self.row_projector.clone(),
            Direction::Column => self.column_projector.clone(),
        };
        let moved: Vec<(RowKey, ScalarValue)> = self
            .current_keys()
            .filter(|key| projector.project(key) == header)
            .filter_map(|key| self.value(key).map(|v| (key.clone(), v.clone())))
            .collect();

        for (old_key, value) in moved {
            let mut new_key = old_key.clone();
            new_key.replace(position, renamed[within].clone());
            self.apply_value(old_key, None);
            self.apply_value(new_key, Some(value));
        }
        let slot = &mut self.added_headers[direction.slot()];
        slot.remove(&header);
        slot.insert(renamed.clone());
        let added = self.catalog.register(axis, [renamed[within].clone()]);
        log::debug!(target: "PIVOT", "rename {} header {} -> {}", direction.label(), header, renamed);
        self.recompute_headers();
        if let Some(event) = PivotEvent::entries_added(axis, added) {
            self.events.emit(event);
        }
        self.events.emit(PivotEvent::HeadersChanged);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    /// Removes every current key whose component on a named axis is one of
    /// the given values, drops those values from the catalog, and drops the
    /// tuple entries that contain them.
    pub fn delete_index_values(
        &mut self,
        values: &FxHashMap<String, BTreeSet<ScalarValue>>,
    ) -> Result<(), PivotError> {
        let mut targets = Vec::with_capacity(values.len());
        for (axis, doomed) in values {
            targets.push((axis.clone(), self.schema.position(axis)?, doomed));
        }
        let doomed_keys: Vec<RowKey> = self
            .current_keys()
            .filter(|key| targets.iter().any(|(_, p, doomed)| doomed.contains(&key[*p])))
            .cloned()
            .collect();
        self.drop_keys(&doomed_keys);

        let mut events = Vec::new();
        for (axis, _, doomed) in &targets {
            let in_use = self.values_in_use(&[axis.clone()]);
            let removed = self.catalog.remove(axis, doomed.iter(), &in_use);
            events.extend(PivotEvent::entries_removed(axis, removed));
        }
        for (group, projector) in &self.groups {
            let hits: Vec<(usize, &BTreeSet<ScalarValue>)> = targets
                .iter()
                .filter_map(|(axis, _, doomed)| {
                    group.names().iter().position(|g| g == axis).map(|i| (i, *doomed))
                })
                .collect();
            if hits.is_empty() {
                continue;
            }
            let stale: Vec<Tuple> = self
                .catalog
                .tuples(group)
                .map(|tuples| {
                    tuples
                        .iter()
                        .filter(|t| hits.iter().any(|(i, doomed)| doomed.contains(&t[*i])))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let in_use: BTreeSet<Tuple> = self.current_keys().map(|k| projector.project(k)).collect();
            let removed = self.catalog.remove_tuple(group, &stale, &in_use);
            if !removed.is_empty() {
                events.push(PivotEvent::TupleEntriesChanged {
                    group: group.clone(),
                    diff: crate::catalog::EntryDiff {
                        added: BTreeSet::new(),
                        removed,
                    },
                });
            }
        }
        for slot in self.added_headers.iter_mut() {
            slot.retain(|header| !header.iter().any(|v| targets.iter().any(|(_, _, d)| d.contains(v))));
        }
        events.extend(self.prune_derived_axes(&doomed_keys));
        log::info!(
            target: "PIVOT",
            "deleted index values on {:?}: {} keys",
            targets.iter().map(|(a, _, _)| a.as_str()).collect::<Vec<_>>(),
            doomed_keys.len()
        );
        self.recompute_headers();
        for event in events {
            self.events.emit(event);
        }
        self.events.emit(PivotEvent::HeadersChanged);
        Ok(())
    }

    /// Removes composite tuples (e.g. relationships) and every key that
    /// projects onto them. The component entries stay: the entities
    /// themselves still exist.
    pub fn delete_tuple_index_values(
        &mut self,
        tuples: &FxHashMap<AxisGroup, BTreeSet<Tuple>>,
    ) -> Result<(), PivotError> {
        let mut targets = Vec::with_capacity(tuples.len());
        for (group, doomed) in tuples {
            let projector = self
                .groups
                .iter()
                .find(|(g, _)| g == group)
                .map(|(_, p)| p.clone())
                .ok_or_else(|| PivotError::UnknownGroup(group.names().to_vec()))?;
            targets.push((group.clone(), projector, doomed));
        }
        let doomed_keys: Vec<RowKey> = self
            .current_keys()
            .filter(|key| targets.iter().any(|(_, p, doomed)| doomed.contains(&p.project(key))))
            .cloned()
            .collect();
        self.drop_keys(&doomed_keys);

        let mut events = Vec::new();
        for (group, projector, doomed) in &targets {
            let in_use: BTreeSet<Tuple> = self.current_keys().map(|k| projector.project(k)).collect();
            let removed = self.catalog.remove_tuple(group, doomed.iter(), &in_use);
            if !removed.is_empty() {
                events.push(PivotEvent::TupleEntriesChanged {
                    group: group.clone(),
                    diff: crate::catalog::EntryDiff {
                        added: BTreeSet::new(),
                        removed,
                    },
                });
            }
        }
        events.extend(self.prune_derived_axes(&doomed_keys));
        log::info!(target: "PIVOT", "deleted tuple entries: {} keys", doomed_keys.len());
        self.recompute_headers();
        for event in events {
            self.events.emit(event);
        }
        self.events.emit(PivotEvent::HeadersChanged);
        Ok(())
    }

    fn drop_keys(&mut self, keys: &[RowKey]) {
        for key in keys {
            self.edits.remove(key);
            if self.data.contains_key(key) {
                self.deletes.insert(key.clone());
            }
        }
    }

    /// Values of the given axes referenced by current keys.
    fn values_in_use(&self, axes: &[String]) -> BTreeSet<ScalarValue> {
        let positions: Vec<usize> = axes
            .iter()
            .filter_map(|a| self.schema.position(a).ok())
            .collect();
        self.current_keys()
            .flat_map(|key| positions.iter().map(move |p| key[*p].clone()))
            .collect()
    }

    /// The index and json axes have no existence outside the data: their
    /// entries disappear once no key references them. The default index is
    /// put back so the frozen slice stays selectable.
    fn prune_derived_axes(&mut self, deleted: &[RowKey]) -> Vec<PivotEvent> {
        let mut events = Vec::new();
        let derived = [self.config.index_axis.clone(), self.config.json_axis.clone()];
        for axis in derived {
            let Ok(position) = self.schema.position(&axis) else {
                continue;
            };
            let candidates: BTreeSet<ScalarValue> =
                deleted.iter().map(|key| key[position].clone()).collect();
            let mut in_use = self.values_in_use(&[axis.clone()]);
            if axis == self.config.index_axis {
                in_use.insert(ScalarValue::Integer(self.config.default_index));
            }
            let removed = self.catalog.remove(&axis, candidates.iter(), &in_use);
            events.extend(PivotEvent::entries_removed(&axis, removed));
        }
        events
    }

    // ------------------------------------------------------------------
    // Write-back support
    // ------------------------------------------------------------------

    /// Groups unsaved changes by packed json value: for every (entity,
    /// parameter, index) with an edited or deleted json entry, the merged
    /// current entries of that value.
    pub fn json_groups(&self) -> Vec<JsonGroup> {
        let Ok(json_position) = self.schema.position(&self.config.json_axis) else {
            return Vec::new();
        };
        let base_of = |key: &RowKey| {
            let mut base = key.clone();
            base.remove(json_position);
            base
        };
        let mut groups: BTreeMap<Tuple, JsonGroup> = BTreeMap::new();
        for key in self.edits.keys().chain(self.deletes.iter()) {
            let base = base_of(key);
            groups
                .entry(base.clone())
                .or_insert_with(|| JsonGroup {
                    base,
                    entries: BTreeMap::new(),
                    touched: Vec::new(),
                })
                .touched
                .push(key.clone());
        }
        for key in self.current_keys() {
            if let Some(group) = groups.get_mut(&base_of(key)) {
                if let (Some(index), Some(value)) = (key[json_position].as_index(), self.value(key)) {
                    group.entries.insert(index, value.clone());
                }
            }
        }
        for group in groups.values_mut() {
            group.touched.sort();
        }
        groups.into_values().collect()
    }

    /// Applies a write-back result: persisted edits become stored values,
    /// persisted deletions leave the data, identifiers and the baseline
    /// catalog catch up. Unpersisted changes stay pending.
    pub fn fold_back(&mut self, outcome: &crate::writeback::WriteBackOutcome) {
        for (class, name, id) in &outcome.objects_added {
            self.identifiers.insert_object(class, name, *id);
        }
        for (objects, id) in &outcome.relationships_added {
            self.identifiers.insert_relationship(objects.clone(), *id);
        }
        for objects in &outcome.relationships_removed {
            self.identifiers.remove_relationship(objects);
            self.identifiers
                .remove_values_of(&crate::identifiers::EntityRef::Relationship(objects.clone()));
        }
        for (_, _, id) in &outcome.objects_removed {
            self.identifiers.purge_object(*id);
        }
        for key in &outcome.values_removed {
            self.identifiers.remove_value(key);
        }
        for (key, id) in &outcome.values_inserted {
            self.identifiers.insert_value(key.clone(), *id);
        }

        let mut touched = Vec::new();
        for key in &outcome.persisted_edits {
            if let Some(value) = self.edits.remove(key) {
                self.data.insert(key.clone(), value);
                touched.push(key.clone());
            }
        }
        for key in &outcome.persisted_deletes {
            if self.deletes.remove(key) {
                self.data.remove(key);
                touched.push(key.clone());
            }
        }

        for (axis, value) in &outcome.entries_persisted {
            self.baseline.register(axis, [value.clone()]);
        }
        for (axis, value) in &outcome.entries_unpersisted {
            self.baseline.remove(axis, [value], &BTreeSet::new());
        }
        for (group, tuple) in &outcome.tuples_persisted {
            self.baseline.register_tuple(group, [tuple.clone()]);
        }
        for (group, tuple) in &outcome.tuples_unpersisted {
            self.baseline.remove_tuple(group, [tuple], &BTreeSet::new());
        }
        // Parameter names and index values have no entity of their own to
        // create, so the baseline simply follows the current entries.
        for axis in [
            self.config.parameter_axis.clone(),
            self.config.index_axis.clone(),
            self.config.json_axis.clone(),
        ] {
            self.sync_baseline_axis(&axis);
        }

        log::info!(
            target: "PIVOT",
            "fold back: {} values written, {} edits and {} deletions pending",
            touched.len(),
            self.edits.len(),
            self.deletes.len()
        );
        self.recompute_headers();
        for key in touched {
            let row = self.row_projector.project(&key);
            let column = self.column_projector.project(&key);
            self.events.emit(PivotEvent::CellChanged { row, column });
        }
        self.events.emit(PivotEvent::Saved {
            succeeded: outcome.succeeded,
        });
    }

    fn sync_baseline_axis(&mut self, axis: &str) {
        let Some(current) = self.catalog.entries(axis).cloned() else {
            return;
        };
        let stale: Vec<ScalarValue> = self
            .baseline
            .entries(axis)
            .map(|entries| entries.difference(&current).cloned().collect())
            .unwrap_or_default();
        self.baseline.remove(axis, stale.iter(), &BTreeSet::new());
        self.baseline.register(axis, current);
    }
}

impl std::fmt::Debug for PivotTableModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotTableModel")
            .field("axes", &self.schema.names())
            .field("layout", &self.layout)
            .field("values", &self.data.len())
            .field("edits", &self.edits.len())
            .field("deletes", &self.deletes.len())
            .finish()
    }
}

/// Normalizes frozen value components to their axis types. Arity problems
/// are left for layout validation to report.
fn coerce_frozen(schema: &AxisSchema, frozen: &[String], value: Tuple) -> Result<Tuple, PivotError> {
    if frozen.len() != value.len() {
        return Ok(value);
    }
    let mut out = Tuple::with_capacity(value.len());
    for (axis, component) in frozen.iter().zip(value) {
        match schema.position(axis) {
            Ok(position) => out.push(schema.coerce(position, component)?),
            Err(_) => out.push(component),
        }
    }
    Ok(out)
}
