//! FILENAME: tests/test_xlsx.rs
//! Round trips of pivot datasets through .xlsx files.

use datamodel::ScalarValue;
use persistence::{export_dataset, import_datasets, DataType, PersistenceError, PivotSheet, SheetType};
use rust_xlsxwriter::Workbook;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn unit_sheet() -> PivotSheet {
    PivotSheet::new(
        SheetType::Object,
        DataType::Parameter,
        "unit",
        names(&["unit", "db parameter", "db index"]),
    )
    .with_rows(vec![
        vec!["u1".into(), "capacity".into(), 1.0.into(), 5.5.into()],
        vec!["u2".into(), "online".into(), 1.0.into(), true.into()],
    ])
}

fn flow_sheet() -> PivotSheet {
    PivotSheet::new(
        SheetType::Relationship,
        DataType::JsonArray,
        "unit__node",
        names(&["unit", "node", "db parameter", "db index", "json time"]),
    )
    .with_rows(vec![
        vec!["u1".into(), "n1".into(), "flow".into(), 1.0.into(), 1.0.into(), 3.0.into()],
        vec!["u1".into(), "n1".into(), "flow".into(), 1.0.into(), 2.0.into(), "high".into()],
    ])
}

#[test]
fn test_export_then_import() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pivot.xlsx");
    let sheets = vec![unit_sheet(), flow_sheet()];

    export_dataset(&sheets, &path).unwrap();
    let imported = import_datasets(&path).unwrap();

    assert_eq!(imported, sheets);
}

#[test]
fn test_empty_dataset_keeps_its_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.xlsx");
    let sheet = PivotSheet::new(SheetType::Object, DataType::Parameter, "node", names(&["node", "db parameter"]));

    export_dataset(&[sheet.clone()], &path).unwrap();
    let imported = import_datasets(&path).unwrap();

    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].axis_names, sheet.axis_names);
    assert_eq!(imported[0].dimensions(), 2);
    assert!(imported[0].rows.is_empty());
}

#[test]
fn test_foreign_sheets_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.xlsx");
    let mut workbook = Workbook::new();
    let notes = workbook.add_worksheet();
    notes.set_name("notes").unwrap();
    notes.write_string(0, 0, "hello").unwrap();
    workbook.save(&path).unwrap();

    assert_eq!(import_datasets(&path).unwrap(), Vec::<PivotSheet>::new());
}

#[test]
fn test_bad_header_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("unit").unwrap();
    sheet.write_string(0, 0, "Sheet type").unwrap();
    sheet.write_string(0, 1, "spreadsheet").unwrap();
    workbook.save(&path).unwrap();

    match import_datasets(&path) {
        Err(PersistenceError::InvalidSheet { sheet, message }) => {
            assert_eq!(sheet, "unit");
            assert!(message.contains("spreadsheet"));
        }
        other => panic!("expected an invalid sheet error, got {:?}", other),
    }
}

#[test]
fn test_rows_without_value_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gaps.xlsx");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (row, (label, value)) in [
        ("Sheet type", "object"),
        ("Data type", "Parameter"),
        ("Class name", "unit"),
        ("Number of dimensions", "1"),
    ]
    .iter()
    .enumerate()
    {
        sheet.write_string(row as u32, 0, *label).unwrap();
        sheet.write_string(row as u32, 1, *value).unwrap();
    }
    sheet.write_string(4, 0, "unit").unwrap();
    sheet.write_string(4, 1, "value").unwrap();
    sheet.write_string(5, 0, "u1").unwrap();
    sheet.write_number(5, 1, 2.0).unwrap();
    sheet.write_string(6, 0, "u2").unwrap();
    workbook.save(&path).unwrap();

    let imported = import_datasets(&path).unwrap();
    assert_eq!(imported[0].rows, vec![vec![ScalarValue::text("u1"), ScalarValue::number(2.0)]]);
}
