//! FILENAME: core/pivot-engine/src/capabilities.rs
//! Small capability interfaces a GUI host programs against, instead of one
//! deep table-model hierarchy.

use std::collections::BTreeSet;

use datamodel::ScalarValue;

use crate::error::PivotError;
use crate::model::{PivotData, PivotTableModel};
use crate::proxy::PivotFilterProxy;

pub trait Reloadable {
    fn reload(&mut self, data: PivotData) -> Result<(), PivotError>;
}

/// Positional editing, as a grid widget addresses cells.
pub trait Editable {
    fn edit(&mut self, row: usize, column: usize, value: Option<ScalarValue>) -> Result<(), PivotError>;

    fn is_dirty(&self) -> bool;
}

pub trait Filterable {
    fn set_filter(
        &mut self,
        model: &PivotTableModel,
        axis: &str,
        allowed: BTreeSet<ScalarValue>,
    ) -> Result<(), PivotError>;

    fn clear_filter(&mut self, model: &PivotTableModel, axis: &str);
}

impl Reloadable for PivotTableModel {
    fn reload(&mut self, data: PivotData) -> Result<(), PivotError> {
        self.set_new_data(data)
    }
}

impl Editable for PivotTableModel {
    fn edit(&mut self, row: usize, column: usize, value: Option<ScalarValue>) -> Result<(), PivotError> {
        self.edit_cell_at(row, column, value)
    }

    fn is_dirty(&self) -> bool {
        PivotTableModel::is_dirty(self)
    }
}

impl Filterable for PivotFilterProxy {
    fn set_filter(
        &mut self,
        model: &PivotTableModel,
        axis: &str,
        allowed: BTreeSet<ScalarValue>,
    ) -> Result<(), PivotError> {
        PivotFilterProxy::set_filter(self, model, axis, allowed)
    }

    fn clear_filter(&mut self, model: &PivotTableModel, axis: &str) {
        PivotFilterProxy::clear_filter(self, model, axis)
    }
}
