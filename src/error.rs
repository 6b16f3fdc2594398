use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems while reading the expenditure sheet. No partial load is
/// ever returned alongside one of these.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("sheet has no header row")]
    EmptySheet,

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: cost '{value}' is not a number")]
    InvalidCost { row: usize, value: String },
}

/// A drill-down selection that does not match the loaded data.
#[derive(Debug, Error, PartialEq)]
pub enum DashboardError {
    #[error("the dataset is empty")]
    NoData,

    #[error("unknown week '{0}'")]
    UnknownWeek(String),

    #[error("type '{kind}' has no rows in week '{week}'")]
    UnknownType { week: String, kind: String },
}
