//! FILENAME: core/pivot-engine/src/error.rs

use datamodel::ValueError;
use thiserror::Error;

/// A layout that does not partition the axis set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("axis {0:?} is assigned more than once")]
    DuplicateAxis(String),

    #[error("axis {0:?} is not assigned to rows, columns or frozen")]
    MissingAxis(String),

    #[error("axis {0:?} does not exist in this dataset")]
    UnknownAxis(String),

    #[error("frozen value has {found} components but {expected} axes are frozen")]
    FrozenArity { expected: usize, found: usize },

    #[error("axis {0:?} needs a value to become frozen")]
    MissingFrozenValue(String),
}

/// Contract violations at the model boundary. These fail fast and leave the
/// model untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PivotError {
    #[error("data row {row} has {found} values, expected {expected}")]
    Shape {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("{value:?} is not a valid entry for axis {axis:?}")]
    InvalidEntry { axis: String, value: String },

    #[error("{direction} {index} is out of range")]
    OutOfRange { direction: &'static str, index: usize },

    #[error("axis group {0:?} is not a tuple group of this dataset")]
    UnknownGroup(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no class is selected")]
    NoSelection,
}

/// Failures reported by a backing store for a whole call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("backing store connection lost")]
    Disconnected,

    #[error("class {0:?} not found")]
    ClassNotFound(String),

    #[error("backing store error: {0}")]
    Other(String),
}
