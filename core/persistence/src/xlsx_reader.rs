//! FILENAME: core/persistence/src/xlsx_reader.rs

use crate::{
    DataType, PersistenceError, PivotSheet, SheetType, CLASS_NAME_LABEL, DATA_TYPE_LABEL,
    DIMENSIONS_LABEL, META_ROWS, SHEET_TYPE_LABEL, VALUE_COLUMN,
};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use datamodel::ScalarValue;
use std::path::Path;

/// Reads every worksheet that follows the dataset header convention.
/// Worksheets that do not start with the "Sheet type" label are skipped.
pub fn import_datasets(path: &Path) -> Result<Vec<PivotSheet>, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let mut datasets = Vec::new();
    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name)?;
        if text_at(&range, 0, 0).as_deref() != Some(SHEET_TYPE_LABEL) {
            continue;
        }
        datasets.push(read_sheet(sheet_name, &range)?);
    }
    Ok(datasets)
}

fn read_sheet(sheet_name: &str, range: &Range<Data>) -> Result<PivotSheet, PersistenceError> {
    let invalid = |message: String| PersistenceError::InvalidSheet {
        sheet: sheet_name.to_string(),
        message,
    };

    let labelled = |row: u32, label: &str| -> Result<String, PersistenceError> {
        if text_at(range, row, 0).as_deref() != Some(label) {
            return Err(invalid(format!("expected {:?} in row {}", label, row + 1)));
        }
        text_at(range, row, 1).ok_or_else(|| invalid(format!("{:?} has no value", label)))
    };

    let sheet_type = labelled(0, SHEET_TYPE_LABEL)?;
    let sheet_type =
        SheetType::from_label(&sheet_type).ok_or_else(|| invalid(format!("unknown sheet type {:?}", sheet_type)))?;
    let data_type = labelled(1, DATA_TYPE_LABEL)?;
    let data_type =
        DataType::from_label(&data_type).ok_or_else(|| invalid(format!("unknown data type {:?}", data_type)))?;
    let class_name = labelled(2, CLASS_NAME_LABEL)?;
    let dimensions = labelled(3, DIMENSIONS_LABEL)?;
    let dimensions: usize = dimensions
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|d| *d >= 0.0 && d.fract() == 0.0)
        .map(|d| d as usize)
        .ok_or_else(|| invalid(format!("bad number of dimensions {:?}", dimensions)))?;

    let mut axis_names = Vec::with_capacity(dimensions);
    for col in 0..dimensions {
        let name = text_at(range, META_ROWS, col as u32)
            .ok_or_else(|| invalid(format!("axis {} has no name", col + 1)))?;
        axis_names.push(name);
    }
    if text_at(range, META_ROWS, dimensions as u32).as_deref() != Some(VALUE_COLUMN) {
        return Err(invalid(format!("expected {:?} after the axis names", VALUE_COLUMN)));
    }

    let mut sheet = PivotSheet::new(sheet_type, data_type, class_name, axis_names);
    let last_row = range.end().map(|(row, _)| row).unwrap_or(0);
    for row in (META_ROWS + 1)..=last_row {
        let cells: Vec<Option<ScalarValue>> = (0..=dimensions as u32)
            .map(|col| scalar(range.get_value((row, col))))
            .collect::<Result<_, _>>()
            .map_err(|message| invalid(format!("row {}: {}", row + 1, message)))?;
        if cells.iter().all(Option::is_none) {
            continue;
        }
        // A data point without a value is not a data point.
        if cells[dimensions].is_none() {
            continue;
        }
        if let Some(col) = cells[..dimensions].iter().position(Option::is_none) {
            return Err(invalid(format!(
                "row {}: missing value for axis {:?}",
                row + 1,
                sheet.axis_names[col]
            )));
        }
        sheet.rows.push(cells.into_iter().flatten().collect());
    }
    Ok(sheet)
}

fn scalar(cell: Option<&Data>) -> Result<Option<ScalarValue>, String> {
    let value = match cell {
        None | Some(Data::Empty) => return Ok(None),
        Some(Data::String(s)) if s.is_empty() => return Ok(None),
        Some(Data::String(s)) => ScalarValue::Text(s.clone()),
        Some(Data::Float(f)) => ScalarValue::number(*f),
        Some(Data::Int(i)) => ScalarValue::Integer(*i),
        Some(Data::Bool(b)) => ScalarValue::Boolean(*b),
        Some(Data::DateTime(dt)) => ScalarValue::number(dt.as_f64()),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => ScalarValue::Text(s.clone()),
        Some(Data::Error(e)) => return Err(format!("cell error {:?}", e)),
    };
    Ok(Some(value))
}

fn text_at(range: &Range<Data>, row: u32, col: u32) -> Option<String> {
    match range.get_value((row, col))? {
        Data::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        _ => None,
    }
}
