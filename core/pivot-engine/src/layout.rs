//! FILENAME: core/pivot-engine/src/layout.rs
//! Pivot Layout - which axes are rows, which are columns, which are frozen.
//!
//! The three role lists always partition the dataset's axis names, and the
//! frozen value always has one component per frozen axis. Every mutation
//! builds the new lists first and swaps them in only after validation, so an
//! axis never appears in two roles, even transiently.

use std::collections::HashSet;

use datamodel::{ScalarValue, Tuple};
use serde::{Deserialize, Serialize};

use crate::config::PivotConfig;
use crate::error::LayoutError;

/// The place an axis occupies in the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisRole {
    Row,
    Column,
    Frozen,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotLayout {
    rows: Vec<String>,
    columns: Vec<String>,
    frozen: Vec<String>,
    frozen_value: Tuple,
}

impl PivotLayout {
    /// Builds a validated layout over `axis_names`.
    pub fn new(
        rows: Vec<String>,
        columns: Vec<String>,
        frozen: Vec<String>,
        frozen_value: Tuple,
        axis_names: &[String],
    ) -> Result<Self, LayoutError> {
        validate(&rows, &columns, &frozen, &frozen_value, axis_names)?;
        Ok(PivotLayout {
            rows,
            columns,
            frozen,
            frozen_value,
        })
    }

    /// Replaces the whole layout. On error the current layout is kept.
    pub fn set(
        &mut self,
        rows: Vec<String>,
        columns: Vec<String>,
        frozen: Vec<String>,
        frozen_value: Tuple,
        axis_names: &[String],
    ) -> Result<(), LayoutError> {
        *self = Self::new(rows, columns, frozen, frozen_value, axis_names)?;
        Ok(())
    }

    /// Default arrangement: the parameter axis in columns, the scalar index
    /// axis frozen at the default index, everything else in rows.
    pub fn default_for(axis_names: &[String], config: &PivotConfig) -> Self {
        let mut layout = PivotLayout::default();
        for name in axis_names {
            if *name == config.parameter_axis {
                layout.columns.push(name.clone());
            } else if *name == config.index_axis {
                layout.frozen.push(name.clone());
                layout.frozen_value.push(ScalarValue::Integer(config.default_index));
            } else {
                layout.rows.push(name.clone());
            }
        }
        layout
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn frozen(&self) -> &[String] {
        &self.frozen
    }

    pub fn frozen_value(&self) -> &Tuple {
        &self.frozen_value
    }

    pub fn axes(&self, role: AxisRole) -> &[String] {
        match role {
            AxisRole::Row => &self.rows,
            AxisRole::Column => &self.columns,
            AxisRole::Frozen => &self.frozen,
        }
    }

    pub fn role_of(&self, axis: &str) -> Option<AxisRole> {
        if self.rows.iter().any(|a| a == axis) {
            Some(AxisRole::Row)
        } else if self.columns.iter().any(|a| a == axis) {
            Some(AxisRole::Column)
        } else if self.frozen.iter().any(|a| a == axis) {
            Some(AxisRole::Frozen)
        } else {
            None
        }
    }

    /// All axis names in role order (rows, columns, frozen).
    pub fn all_axes(&self) -> impl Iterator<Item = &String> {
        self.rows.iter().chain(&self.columns).chain(&self.frozen)
    }

    pub fn set_frozen_value(&mut self, value: Tuple) -> Result<(), LayoutError> {
        if value.len() != self.frozen.len() {
            return Err(LayoutError::FrozenArity {
                expected: self.frozen.len(),
                found: value.len(),
            });
        }
        self.frozen_value = value;
        Ok(())
    }

    /// Moves `axis` to `role` at `position` (clamped to the end).
    ///
    /// Moving into the frozen role needs `frozen_component`, the value the
    /// axis is fixed to. Moving out of it drops the axis' component of the
    /// frozen value.
    pub fn move_axis(
        &mut self,
        axis: &str,
        role: AxisRole,
        position: usize,
        frozen_component: Option<ScalarValue>,
    ) -> Result<(), LayoutError> {
        let current = self
            .role_of(axis)
            .ok_or_else(|| LayoutError::UnknownAxis(axis.to_string()))?;

        let mut rows = self.rows.clone();
        let mut columns = self.columns.clone();
        let mut frozen = self.frozen.clone();
        let mut frozen_value = self.frozen_value.clone();

        let mut carried = None;
        match current {
            AxisRole::Row => rows.retain(|a| a != axis),
            AxisRole::Column => columns.retain(|a| a != axis),
            AxisRole::Frozen => {
                if let Some(index) = frozen.iter().position(|a| a == axis) {
                    frozen.remove(index);
                    carried = frozen_value.remove(index);
                }
            }
        }

        match role {
            AxisRole::Row => insert_clamped(&mut rows, position, axis),
            AxisRole::Column => insert_clamped(&mut columns, position, axis),
            AxisRole::Frozen => {
                let value = frozen_component
                    .or(carried)
                    .ok_or_else(|| LayoutError::MissingFrozenValue(axis.to_string()))?;
                let at = position.min(frozen.len());
                frozen.insert(at, axis.to_string());
                frozen_value.insert(at, value);
            }
        }

        let axis_names: Vec<String> = self.all_axes().cloned().collect();
        validate(&rows, &columns, &frozen, &frozen_value, &axis_names)?;
        self.rows = rows;
        self.columns = columns;
        self.frozen = frozen;
        self.frozen_value = frozen_value;
        Ok(())
    }

    /// True when this layout covers exactly `axis_names`.
    pub fn matches_axes(&self, axis_names: &[String]) -> bool {
        validate(&self.rows, &self.columns, &self.frozen, &self.frozen_value, axis_names).is_ok()
    }
}

fn insert_clamped(list: &mut Vec<String>, position: usize, axis: &str) {
    let at = position.min(list.len());
    list.insert(at, axis.to_string());
}

fn validate(
    rows: &[String],
    columns: &[String],
    frozen: &[String],
    frozen_value: &Tuple,
    axis_names: &[String],
) -> Result<(), LayoutError> {
    let known: HashSet<&str> = axis_names.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    for axis in rows.iter().chain(columns).chain(frozen) {
        if !known.contains(axis.as_str()) {
            return Err(LayoutError::UnknownAxis(axis.clone()));
        }
        if !seen.insert(axis.as_str()) {
            return Err(LayoutError::DuplicateAxis(axis.clone()));
        }
    }
    if let Some(missing) = axis_names.iter().find(|a| !seen.contains(a.as_str())) {
        return Err(LayoutError::MissingAxis(missing.clone()));
    }
    if frozen_value.len() != frozen.len() {
        return Err(LayoutError::FrozenArity {
            expected: frozen.len(),
            found: frozen_value.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamodel::tuple;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn axes() -> Vec<String> {
        names(&["unit", "db parameter", "db index"])
    }

    #[test]
    fn test_default_layout() {
        let layout = PivotLayout::default_for(&axes(), &PivotConfig::default());
        assert_eq!(layout.rows(), names(&["unit"]).as_slice());
        assert_eq!(layout.columns(), names(&["db parameter"]).as_slice());
        assert_eq!(layout.frozen(), names(&["db index"]).as_slice());
        assert_eq!(layout.frozen_value(), &tuple!(1i64));
        assert!(layout.matches_axes(&axes()));
    }

    #[test]
    fn test_default_layout_without_synthetic_axes() {
        let layout = PivotLayout::default_for(&names(&["a", "b"]), &PivotConfig::default());
        assert_eq!(layout.rows(), names(&["a", "b"]).as_slice());
        assert!(layout.columns().is_empty());
        assert!(layout.frozen_value().is_empty());
    }

    #[test]
    fn test_set_rejects_bad_partitions_and_keeps_layout() {
        let mut layout = PivotLayout::default_for(&axes(), &PivotConfig::default());
        let before = layout.clone();

        let duplicate = layout.set(
            names(&["unit", "db index"]),
            names(&["db parameter", "unit"]),
            vec![],
            Tuple::new(),
            &axes(),
        );
        assert_eq!(duplicate, Err(LayoutError::DuplicateAxis("unit".into())));

        let missing = layout.set(names(&["unit"]), names(&["db parameter"]), vec![], Tuple::new(), &axes());
        assert_eq!(missing, Err(LayoutError::MissingAxis("db index".into())));

        let arity = layout.set(
            names(&["unit"]),
            names(&["db parameter"]),
            names(&["db index"]),
            tuple!(1i64, 2i64),
            &axes(),
        );
        assert_eq!(arity, Err(LayoutError::FrozenArity { expected: 1, found: 2 }));
        assert_eq!(layout, before);
    }

    #[test]
    fn test_move_axis_between_roles() {
        let mut layout = PivotLayout::default_for(&axes(), &PivotConfig::default());

        layout.move_axis("db index", AxisRole::Row, 0, None).unwrap();
        assert_eq!(layout.rows(), names(&["db index", "unit"]).as_slice());
        assert!(layout.frozen().is_empty());
        assert!(layout.frozen_value().is_empty());

        layout
            .move_axis("unit", AxisRole::Frozen, 0, Some(ScalarValue::text("u1")))
            .unwrap();
        assert_eq!(layout.frozen(), names(&["unit"]).as_slice());
        assert_eq!(layout.frozen_value(), &tuple!("u1"));
        assert_eq!(layout.role_of("unit"), Some(AxisRole::Frozen));
    }

    #[test]
    fn test_move_into_frozen_needs_value() {
        let mut layout = PivotLayout::default_for(&axes(), &PivotConfig::default());
        let before = layout.clone();
        let result = layout.move_axis("unit", AxisRole::Frozen, 0, None);
        assert_eq!(result, Err(LayoutError::MissingFrozenValue("unit".into())));
        assert_eq!(layout, before);
    }

    #[test]
    fn test_reordering_within_frozen_keeps_component() {
        let mut layout = PivotLayout::new(
            names(&[]),
            names(&["db parameter"]),
            names(&["unit", "db index"]),
            tuple!("u1", 1i64),
            &axes(),
        )
        .unwrap();
        layout.move_axis("db index", AxisRole::Frozen, 0, None).unwrap();
        assert_eq!(layout.frozen(), names(&["db index", "unit"]).as_slice());
        assert_eq!(layout.frozen_value(), &tuple!(1i64, "u1"));
    }
}
