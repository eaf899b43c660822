//! FILENAME: core/persistence/src/lib.rs
//! Interchange for pivot datasets.
//!
//! Tab-separated clipboard text, and `.xlsx` workbooks with one dataset per
//! sheet. A dataset row has the shape the pivot model reloads from: one
//! scalar per axis followed by the value.

pub mod clipboard;
mod error;
mod xlsx_reader;
mod xlsx_writer;

pub use clipboard::{copy_tsv, parse_tsv};
pub use error::PersistenceError;
pub use xlsx_reader::import_datasets;
pub use xlsx_writer::export_dataset;

use datamodel::ScalarValue;
use serde::{Deserialize, Serialize};

// ============================================================================
// SHEET HEADER CONVENTION
// ============================================================================

pub const SHEET_TYPE_LABEL: &str = "Sheet type";
pub const DATA_TYPE_LABEL: &str = "Data type";
pub const CLASS_NAME_LABEL: &str = "Class name";
pub const DIMENSIONS_LABEL: &str = "Number of dimensions";
/// Title of the last column of the axis header row.
pub const VALUE_COLUMN: &str = "value";

/// Rows before the axis header row.
pub(crate) const META_ROWS: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetType {
    Object,
    Relationship,
}

impl SheetType {
    pub fn label(self) -> &'static str {
        match self {
            SheetType::Object => "object",
            SheetType::Relationship => "relationship",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "object" => Some(SheetType::Object),
            "relationship" => Some(SheetType::Relationship),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Parameter,
    JsonArray,
}

impl DataType {
    pub fn label(self) -> &'static str {
        match self {
            DataType::Parameter => "Parameter",
            DataType::JsonArray => "json array",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "parameter" => Some(DataType::Parameter),
            "json array" => Some(DataType::JsonArray),
            _ => None,
        }
    }
}

// ============================================================================
// PIVOT SHEET
// ============================================================================

/// One dataset as exported: what class it belongs to, its axes and its rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotSheet {
    pub sheet_type: SheetType,
    pub data_type: DataType,
    pub class_name: String,
    pub axis_names: Vec<String>,
    /// Axis values followed by the value.
    pub rows: Vec<Vec<ScalarValue>>,
}

impl PivotSheet {
    pub fn new(
        sheet_type: SheetType,
        data_type: DataType,
        class_name: impl Into<String>,
        axis_names: Vec<String>,
    ) -> Self {
        PivotSheet {
            sheet_type,
            data_type,
            class_name: class_name.into(),
            axis_names,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<ScalarValue>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn dimensions(&self) -> usize {
        self.axis_names.len()
    }
}
