use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading a source table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist under the data root.
    #[error("source file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file was read but a required header is absent.
    #[error("{} is missing expected column `{column}`", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// The file has no header row at all.
    #[error("{} has no header row", path.display())]
    EmptySource { path: PathBuf },

    #[error("{} has an unsupported extension (expected csv, tsv, xlsx, xls or ods)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to read delimited file {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read spreadsheet {}: {source}", path.display())]
    Spreadsheet {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
}

/// Failures while deriving rollups from loaded tables.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("{table} table has no `{column}` column to aggregate on")]
    MissingColumn { table: String, column: String },
}

/// Failures while writing the output workbook.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Permission denied, usually because the target is open in a spreadsheet application.
    #[error("cannot write {}: file is locked or not writable (close it in Excel and retry)", path.display())]
    Locked { path: PathBuf },

    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build workbook: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),
}

impl ExportError {
    /// Classify an I/O failure on `path`, separating lock/permission conflicts.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => ExportError::Locked { path },
            _ => ExportError::Io { path, source },
        }
    }
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Computation(#[from] ComputationError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
