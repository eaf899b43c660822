//! FILENAME: core/persistence/src/clipboard.rs
//! Tab-separated clipboard text, as spreadsheet programs copy and paste it.

use csv::{ReaderBuilder, WriterBuilder};
use datamodel::ScalarValue;

use crate::PersistenceError;

/// Renders a block of cells as TSV. Missing cells become empty fields; one
/// line per row.
pub fn copy_tsv(cells: &[Vec<Option<ScalarValue>>]) -> Result<String, PersistenceError> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());
    for row in cells {
        writer.write_record(
            row.iter()
                .map(|cell| cell.as_ref().map(ToString::to_string).unwrap_or_default()),
        )?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PersistenceError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PersistenceError::InvalidFormat(e.to_string()))
}

/// Parses pasted TSV. Empty fields are `None`; numbers become `Integer` or
/// `Number`, `true`/`false` become booleans, anything else stays text.
/// Rows may differ in length.
pub fn parse_tsv(text: &str) -> Result<Vec<Vec<Option<ScalarValue>>>, PersistenceError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(ScalarValue::parse).collect());
    }
    Ok(rows)
}
