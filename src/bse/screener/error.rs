use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ScreenerError>;

/// Error type covering the different failure cases that can occur when the
/// tool loads cached company data, flattens it, or writes it out.
#[derive(Debug, Error)]
pub enum ScreenerError {
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

    /// Errors bubbled up from the CSV reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Raised when the record cache does not hold a JSON object of entities.
    #[error("invalid record cache: {0}")]
    InvalidCache(String),

    /// Raised when a stock listing cannot be interpreted.
    #[error("invalid stock list: {0}")]
    InvalidStockList(String),

    /// Raised when a value is not a six digit BSE scrip code.
    #[error("invalid BSE code '{0}'")]
    InvalidCode(String),

    /// Raised when an entity nests deeper than the flattener accepts.
    #[error("record for entity {entity} nests deeper than {limit} levels")]
    DepthExceeded { entity: String, limit: usize },

    /// Raised by a data source when one section of a company cannot be fetched.
    #[error("failed to fetch {section} for {code}: {message}")]
    Fetch {
        code: String,
        section: String,
        message: String,
    },

    /// Raised when configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
