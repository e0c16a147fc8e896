use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, DictionaryError>;

/// Error type covering the different failure cases that can occur when the
/// tool reads study workbooks, consolidates them, or renders the dictionary.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Raised when a workbook cannot be loaded into rectangular sheets.
    #[error("invalid workbook structure: {0}")]
    InvalidWorkbook(String),

    /// Raised when a subcategory-bearing sheet has no boundary marker row.
    #[error("sheet '{sheet}' has no '{marker}' row in its first column")]
    MissingBoundaryMarker { sheet: String, marker: String },

    /// Raised when a canonical column cannot be resolved after alias mapping.
    #[error("sheet '{sheet}' does not define the '{column}' column")]
    MissingColumn { sheet: String, column: String },

    /// Raised when a working table does not match the schema it is merged with.
    #[error("table columns {found:?} do not match schema columns {expected:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Raised when the configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Attaches the workbook identifier to a failure raised while processing it.
    #[error("workbook '{workbook}': {source}")]
    Workbook {
        workbook: String,
        #[source]
        source: Box<DictionaryError>,
    },

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl DictionaryError {
    /// Wraps the error with the identifier of the workbook being processed.
    pub fn in_workbook(self, workbook: impl Into<String>) -> Self {
        match self {
            already @ DictionaryError::Workbook { .. } => already,
            other => DictionaryError::Workbook {
                workbook: workbook.into(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping workbook context wrappers.
    pub fn root(&self) -> &DictionaryError {
        match self {
            DictionaryError::Workbook { source, .. } => source.root(),
            other => other,
        }
    }
}
