//! FILENAME: core/datamodel/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected {expected} values, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("value {value:?} does not fit axis {axis:?}")]
    Type { axis: String, value: String },

    #[error("axis {0:?} appears more than once")]
    DuplicateAxis(String),

    #[error("unknown axis {0:?}")]
    UnknownAxis(String),

    #[error("invalid json value: {0}")]
    Json(String),
}
