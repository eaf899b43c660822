//! FILENAME: core/datamodel/src/schema.rs
//! PURPOSE: Axis names, axis types and the name -> position mapping.
//! CONTEXT: Fixed once data is loaded. Every row key of a dataset has one
//! component per axis, in schema order.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ValueError;
use crate::tuple::{RowKey, Tuple};
use crate::value::ScalarValue;

/// The kind of values an axis holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    /// Names: object names, parameter names.
    Text,
    /// 1-based integer positions: the scalar index and json index axes.
    Integer,
}

impl Default for AxisType {
    fn default() -> Self {
        AxisType::Text
    }
}

/// Ordered axis names with their types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSchema {
    names: Vec<String>,
    types: Vec<AxisType>,
    positions: FxHashMap<String, usize>,
}

impl AxisSchema {
    pub fn new(names: Vec<String>, types: Vec<AxisType>) -> Result<Self, ValueError> {
        if names.len() != types.len() {
            return Err(ValueError::Arity {
                expected: names.len(),
                found: types.len(),
            });
        }
        let mut positions = FxHashMap::default();
        for (position, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), position).is_some() {
                return Err(ValueError::DuplicateAxis(name.clone()));
            }
        }
        Ok(AxisSchema {
            names,
            types,
            positions,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn types(&self) -> &[AxisType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Result<usize, ValueError> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| ValueError::UnknownAxis(name.to_string()))
    }

    pub fn positions<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<usize>, ValueError> {
        names.iter().map(|n| self.position(n.as_ref())).collect()
    }

    pub fn axis_type(&self, position: usize) -> AxisType {
        self.types.get(position).copied().unwrap_or_default()
    }

    pub fn name(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }

    /// Checks one value against the type of the axis at `position`.
    /// Integer axes accept integral floats and normalize them to `Integer`.
    pub fn coerce(&self, position: usize, value: ScalarValue) -> Result<ScalarValue, ValueError> {
        match self.axis_type(position) {
            AxisType::Text => Ok(value),
            AxisType::Integer => value.as_index().map(ScalarValue::Integer).ok_or_else(|| {
                ValueError::Type {
                    axis: self.names[position].clone(),
                    value: value.to_string(),
                }
            }),
        }
    }

    /// Builds a full row key, checking arity and per-axis types.
    pub fn row_key<I>(&self, values: I) -> Result<RowKey, ValueError>
    where
        I: IntoIterator<Item = ScalarValue>,
    {
        let mut key = Tuple::with_capacity(self.len());
        for (position, value) in values.into_iter().enumerate() {
            if position >= self.len() {
                return Err(ValueError::Arity {
                    expected: self.len(),
                    found: position + 1,
                });
            }
            key.push(self.coerce(position, value)?);
        }
        if key.len() != self.len() {
            return Err(ValueError::Arity {
                expected: self.len(),
                found: key.len(),
            });
        }
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple;

    fn schema() -> AxisSchema {
        AxisSchema::new(
            vec!["unit".into(), "db parameter".into(), "db index".into()],
            vec![AxisType::Text, AxisType::Text, AxisType::Integer],
        )
        .unwrap()
    }

    #[test]
    fn test_positions_follow_declaration_order() {
        let schema = schema();
        assert_eq!(schema.position("db index").unwrap(), 2);
        assert_eq!(schema.positions(&["db index", "unit"]).unwrap(), vec![2, 0]);
        assert!(matches!(schema.position("nope"), Err(ValueError::UnknownAxis(_))));
    }

    #[test]
    fn test_duplicate_axis_rejected() {
        let result = AxisSchema::new(
            vec!["a".into(), "a".into()],
            vec![AxisType::Text, AxisType::Text],
        );
        assert!(matches!(result, Err(ValueError::DuplicateAxis(name)) if name == "a"));
    }

    #[test]
    fn test_row_key_checks_arity_and_types() {
        let schema = schema();
        let key = schema
            .row_key(vec!["u1".into(), "p1".into(), ScalarValue::number(2.0)])
            .unwrap();
        assert_eq!(key, tuple!("u1", "p1", 2i64));

        assert!(matches!(
            schema.row_key(vec!["u1".into(), "p1".into()]),
            Err(ValueError::Arity { expected: 3, found: 2 })
        ));
        assert!(matches!(
            schema.row_key(vec!["u1".into(), "p1".into(), "x".into()]),
            Err(ValueError::Type { .. })
        ));
    }
}
