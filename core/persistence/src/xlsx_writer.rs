//! FILENAME: core/persistence/src/xlsx_writer.rs

use crate::{
    PersistenceError, PivotSheet, CLASS_NAME_LABEL, DATA_TYPE_LABEL, DIMENSIONS_LABEL, META_ROWS,
    SHEET_TYPE_LABEL, VALUE_COLUMN,
};
use datamodel::ScalarValue;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};
use std::collections::HashSet;
use std::path::Path;

/// Excel's limit on worksheet names.
const MAX_SHEET_NAME: usize = 31;

/// Writes each dataset to its own worksheet, named after its class.
pub fn export_dataset(sheets: &[PivotSheet], path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();
    let bold = Format::new().set_bold();
    let mut used_names = HashSet::new();

    for sheet in sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(unique_sheet_name(&sheet.class_name, &mut used_names))?;

        let meta = [
            (SHEET_TYPE_LABEL, sheet.sheet_type.label().to_string()),
            (DATA_TYPE_LABEL, sheet.data_type.label().to_string()),
            (CLASS_NAME_LABEL, sheet.class_name.clone()),
            (DIMENSIONS_LABEL, sheet.dimensions().to_string()),
        ];
        for (row, (label, value)) in meta.iter().enumerate() {
            worksheet.write_string_with_format(row as u32, 0, *label, &bold)?;
            worksheet.write_string(row as u32, 1, value)?;
        }

        for (col, name) in sheet.axis_names.iter().enumerate() {
            worksheet.write_string_with_format(META_ROWS, col as u16, name, &bold)?;
        }
        worksheet.write_string_with_format(META_ROWS, sheet.dimensions() as u16, VALUE_COLUMN, &bold)?;

        for (i, row) in sheet.rows.iter().enumerate() {
            let xlsx_row = META_ROWS + 1 + i as u32;
            for (col, value) in row.iter().enumerate() {
                write_value(worksheet, xlsx_row, col as u16, value)?;
            }
        }
    }

    xlsx.save(path)?;
    Ok(())
}

fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &ScalarValue,
) -> Result<(), PersistenceError> {
    match value {
        ScalarValue::Integer(i) => {
            worksheet.write_number(row, col, *i as f64)?;
        }
        ScalarValue::Number(n) => {
            worksheet.write_number(row, col, n.0)?;
        }
        ScalarValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        ScalarValue::Boolean(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

/// Sheet names are unique and at most 31 characters; a repeated class name
/// (e.g. exported as parameters and as json arrays) gets a numeric suffix.
fn unique_sheet_name(class_name: &str, used: &mut HashSet<String>) -> String {
    let base: String = class_name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let mut name = base.clone();
    let mut n = 1;
    while used.contains(&name.to_lowercase()) {
        n += 1;
        let suffix = format!(" ({})", n);
        let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
    }
    used.insert(name.to_lowercase());
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_class_names_get_suffix() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("unit", &mut used), "unit");
        assert_eq!(unique_sheet_name("unit", &mut used), "unit (2)");
        assert_eq!(unique_sheet_name("a/b", &mut used), "a_b");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let mut used = HashSet::new();
        let long = "x".repeat(40);
        assert_eq!(unique_sheet_name(&long, &mut used).chars().count(), MAX_SHEET_NAME);
        let second = unique_sheet_name(&long, &mut used);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
    }
}
