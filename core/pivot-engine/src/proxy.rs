//! FILENAME: core/pivot-engine/src/proxy.rs
//! Pivot Filter Proxy - hides header rows/columns whose values on a filtered
//! axis are not in that axis' allowed set.
//!
//! The proxy keeps only index maps into the model's header lists; it never
//! copies cell data. Filters on axes that are currently frozen have no effect
//! until the axis moves to rows or columns.

use std::collections::{BTreeMap, BTreeSet};

use datamodel::{ScalarValue, Tuple};
use rustc_hash::FxHashMap;

use crate::catalog::AxisGroup;
use crate::error::{LayoutError, PivotError};
use crate::model::{Direction, PivotTableModel};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotFilterProxy {
    filters: BTreeMap<String, BTreeSet<ScalarValue>>,
    rows: Vec<usize>,
    columns: Vec<usize>,
}

impl PivotFilterProxy {
    pub fn new(model: &PivotTableModel) -> Self {
        let mut proxy = Self::default();
        proxy.refresh(model);
        proxy
    }

    /// Restricts `axis` to `allowed`. Several filters combine with AND.
    pub fn set_filter(
        &mut self,
        model: &PivotTableModel,
        axis: &str,
        allowed: BTreeSet<ScalarValue>,
    ) -> Result<(), PivotError> {
        if !model.schema().contains(axis) {
            return Err(LayoutError::UnknownAxis(axis.to_string()).into());
        }
        log::debug!(target: "PIVOT", "filter {} to {} values", axis, allowed.len());
        self.filters.insert(axis.to_string(), allowed);
        self.refresh(model);
        Ok(())
    }

    pub fn clear_filter(&mut self, model: &PivotTableModel, axis: &str) {
        if self.filters.remove(axis).is_some() {
            self.refresh(model);
        }
    }

    pub fn clear_all(&mut self, model: &PivotTableModel) {
        self.filters.clear();
        self.refresh(model);
    }

    pub fn filter(&self, axis: &str) -> Option<&BTreeSet<ScalarValue>> {
        self.filters.get(axis)
    }

    pub fn filters(&self) -> &BTreeMap<String, BTreeSet<ScalarValue>> {
        &self.filters
    }

    /// Recomputes the visible rows and columns. Call after any model change
    /// that alters headers.
    pub fn refresh(&mut self, model: &PivotTableModel) {
        self.rows = self.visible(model.layout().rows(), model.row_headers());
        self.columns = self.visible(model.layout().columns(), model.column_headers());
    }

    fn visible(&self, axes: &[String], headers: &[Tuple]) -> Vec<usize> {
        let checks: Vec<(usize, &BTreeSet<ScalarValue>)> = axes
            .iter()
            .enumerate()
            .filter_map(|(i, axis)| self.filters.get(axis).map(|allowed| (i, allowed)))
            .collect();
        headers
            .iter()
            .enumerate()
            .filter(|(_, header)| {
                checks
                    .iter()
                    .all(|(i, allowed)| header.get(*i).is_some_and(|v| allowed.contains(v)))
            })
            .map(|(index, _)| index)
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn source_row(&self, row: usize) -> Option<usize> {
        self.rows.get(row).copied()
    }

    pub fn source_column(&self, column: usize) -> Option<usize> {
        self.columns.get(column).copied()
    }

    pub fn row_header<'m>(&self, model: &'m PivotTableModel, row: usize) -> Option<&'m Tuple> {
        model.row_headers().get(self.source_row(row)?)
    }

    pub fn column_header<'m>(&self, model: &'m PivotTableModel, column: usize) -> Option<&'m Tuple> {
        model.column_headers().get(self.source_column(column)?)
    }

    pub fn cell<'m>(&self, model: &'m PivotTableModel, row: usize, column: usize) -> Option<&'m ScalarValue> {
        model.cell_at(self.source_row(row)?, self.source_column(column)?)
    }

    /// Deletes the selected visible rows or columns through the model.
    ///
    /// For each selected header, tuple groups whose axes are all part of the
    /// header are removed as tuples (e.g. a relationship); the remaining
    /// header axes are removed as index values.
    pub fn delete_row_col(
        &mut self,
        model: &mut PivotTableModel,
        selected: &[usize],
        direction: Direction,
    ) -> Result<(), PivotError> {
        let axes: Vec<String> = match direction {
            Direction::Row => model.layout().rows().to_vec(),
            Direction::Column => model.layout().columns().to_vec(),
        };
        let view: &PivotTableModel = model;
        let headers: Vec<Tuple> = selected
            .iter()
            .filter_map(|&index| match direction {
                Direction::Row => self.row_header(view, index),
                Direction::Column => self.column_header(view, index),
            })
            .cloned()
            .collect();
        if headers.is_empty() || axes.is_empty() {
            return Ok(());
        }

        let covered: Vec<AxisGroup> = model
            .tuple_groups()
            .filter(|group| group.covered_by(&axes))
            .cloned()
            .collect();
        let mut tuples: FxHashMap<AxisGroup, BTreeSet<Tuple>> = FxHashMap::default();
        for group in &covered {
            let inner: Vec<usize> = group
                .names()
                .iter()
                .filter_map(|name| axes.iter().position(|a| a == name))
                .collect();
            let entry = tuples.entry(group.clone()).or_default();
            for header in &headers {
                entry.insert(crate::projection::project(header, &inner));
            }
        }
        let mut values: FxHashMap<String, BTreeSet<ScalarValue>> = FxHashMap::default();
        for (i, axis) in axes.iter().enumerate() {
            if covered.iter().any(|group| group.names().contains(axis)) {
                continue;
            }
            let entry = values.entry(axis.clone()).or_default();
            entry.extend(headers.iter().map(|header| header[i].clone()));
        }

        if !tuples.is_empty() {
            model.delete_tuple_index_values(&tuples)?;
        }
        if !values.is_empty() {
            model.delete_index_values(&values)?;
        }
        self.refresh(model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PivotConfig;
    use crate::model::PivotData;
    use datamodel::{tuple, AxisType};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn model() -> PivotTableModel {
        let mut data = PivotData::new(
            names(&["unit", "db parameter", "db index"]),
            vec![AxisType::Text, AxisType::Text, AxisType::Integer],
        )
        .with_rows(vec![
            vec!["u1".into(), "p1".into(), 1i64.into(), 1.0.into()],
            vec!["u2".into(), "p1".into(), 1i64.into(), 2.0.into()],
            vec!["u3".into(), "p2".into(), 1i64.into(), 3.0.into()],
        ]);
        data.row_axes = names(&["unit"]);
        data.column_axes = names(&["db parameter"]);
        data.frozen_axes = names(&["db index"]);
        data.frozen_value = tuple!(1i64);
        let mut model = PivotTableModel::empty(PivotConfig::default());
        model.set_new_data(data).unwrap();
        model
    }

    fn allow(values: &[&str]) -> BTreeSet<ScalarValue> {
        values.iter().map(|v| ScalarValue::text(*v)).collect()
    }

    #[test]
    fn test_filter_hides_rows() {
        let model = model();
        let mut proxy = PivotFilterProxy::new(&model);
        assert_eq!(proxy.row_count(), 3);

        proxy.set_filter(&model, "unit", allow(&["u1", "u3"])).unwrap();
        assert_eq!(proxy.row_count(), 2);
        assert_eq!(proxy.source_row(1), Some(2));
        assert_eq!(proxy.cell(&model, 1, 1), Some(&ScalarValue::number(3.0)));

        proxy.set_filter(&model, "db parameter", allow(&["p2"])).unwrap();
        assert_eq!(proxy.column_count(), 1);
        assert_eq!(proxy.column_header(&model, 0), Some(&tuple!("p2")));

        proxy.clear_filter(&model, "unit");
        assert_eq!(proxy.row_count(), 3);
        assert!(proxy.filter("unit").is_none());
    }

    #[test]
    fn test_filter_on_frozen_axis_has_no_effect() {
        let model = model();
        let mut proxy = PivotFilterProxy::new(&model);
        let mut allowed = BTreeSet::new();
        allowed.insert(ScalarValue::Integer(2));
        proxy.set_filter(&model, "db index", allowed).unwrap();
        assert_eq!(proxy.row_count(), 3);
        assert_eq!(proxy.column_count(), 2);
    }

    #[test]
    fn test_unknown_axis_is_rejected() {
        let model = model();
        let mut proxy = PivotFilterProxy::new(&model);
        assert_eq!(
            proxy.set_filter(&model, "node", allow(&["n1"])),
            Err(PivotError::Layout(LayoutError::UnknownAxis("node".into())))
        );
    }

    #[test]
    fn test_delete_visible_rows() {
        let mut model = model();
        let mut proxy = PivotFilterProxy::new(&model);
        proxy.set_filter(&model, "unit", allow(&["u2", "u3"])).unwrap();

        // Visible row 0 is u2.
        proxy.delete_row_col(&mut model, &[0], Direction::Row).unwrap();
        assert_eq!(model.row_headers(), &[tuple!("u1"), tuple!("u3")]);
        assert!(model.deletes().contains(&tuple!("u2", "p1", 1i64)));
        assert_eq!(proxy.row_count(), 1);
        assert_eq!(proxy.row_header(&model, 0), Some(&tuple!("u3")));
    }
}
