//! FILENAME: core/persistence/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("clipboard text error: {0}")]
    Tsv(#[from] csv::Error),

    #[error("invalid sheet {sheet:?}: {message}")]
    InvalidSheet { sheet: String, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}
