//! XLS error types

use thiserror::Error;

/// Result type for XLS operations
pub type XlsResult<T> = std::result::Result<T, XlsError>;

/// Errors that can occur while reading an XLS workbook
#[derive(Debug, Error)]
pub enum XlsError {
    /// IO error, including a file that is not a compound document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The container or record stream is not an XLS workbook
    #[error("Invalid XLS format: {0}")]
    InvalidFormat(String),

    /// A BIFF version older than BIFF8 (Excel 97)
    #[error("Unsupported XLS version: {0}")]
    UnsupportedVersion(String),

    /// Requested worksheet does not exist
    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    /// A record body ended early or held malformed data
    #[error("Parse error: {0}")]
    Parse(String),
}
