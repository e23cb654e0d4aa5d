//! Flat-file export of annotation results.

mod csv;

use std::path::PathBuf;

use thiserror::Error;

pub use self::csv::{CsvExporter, CSV_HEADER};

/// Errors from the export sink.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot open export file {0}: {1}")]
    Open(PathBuf, #[source] std::io::Error),

    #[error("export file already closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
