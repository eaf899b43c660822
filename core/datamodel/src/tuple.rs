//! FILENAME: core/datamodel/src/tuple.rs
//! PURPOSE: Fixed-arity tuples of scalars used as row keys and header keys.
//! CONTEXT: A full `RowKey` identifies one data point across every axis. The
//! same type carries projections (row headers, column headers, frozen values),
//! so one-axis and many-axis tuples share a single representation.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::value::ScalarValue;

/// Most pivots have at most four axes; those stay on the stack.
pub type TupleStorage = SmallVec<[ScalarValue; 4]>;

/// An ordered, hashable sequence of scalar values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple(TupleStorage);

/// A tuple covering every axis of a dataset.
pub type RowKey = Tuple;

impl Tuple {
    pub fn new() -> Self {
        Tuple(SmallVec::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Tuple(SmallVec::with_capacity(capacity))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ScalarValue> {
        self.0.get(position)
    }

    pub fn push(&mut self, value: ScalarValue) {
        self.0.push(value);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScalarValue> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[ScalarValue] {
        &self.0
    }

    /// Replaces the component at `position`, returning the previous value.
    pub fn replace(&mut self, position: usize, value: ScalarValue) -> Option<ScalarValue> {
        self.0
            .get_mut(position)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// Removes the component at `position`.
    pub fn remove(&mut self, position: usize) -> Option<ScalarValue> {
        if position < self.0.len() {
            Some(self.0.remove(position))
        } else {
            None
        }
    }

    pub fn insert(&mut self, position: usize, value: ScalarValue) {
        let position = position.min(self.0.len());
        self.0.insert(position, value);
    }
}

impl Index<usize> for Tuple {
    type Output = ScalarValue;

    fn index(&self, position: usize) -> &ScalarValue {
        &self.0[position]
    }
}

impl FromIterator<ScalarValue> for Tuple {
    fn from_iter<I: IntoIterator<Item = ScalarValue>>(iter: I) -> Self {
        Tuple(iter.into_iter().collect())
    }
}

impl From<Vec<ScalarValue>> for Tuple {
    fn from(values: Vec<ScalarValue>) -> Self {
        Tuple(SmallVec::from_vec(values))
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type Item = &'a ScalarValue;
    type IntoIter = std::slice::Iter<'a, ScalarValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Tuple {
    type Item = ScalarValue;
    type IntoIter = smallvec::IntoIter<[ScalarValue; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str(")")
    }
}

/// Builds a `Tuple` from a list of values convertible to `ScalarValue`.
#[macro_export]
macro_rules! tuple {
    () => { $crate::Tuple::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::Tuple::from(vec![$($crate::ScalarValue::from($value)),+])
    };
}
