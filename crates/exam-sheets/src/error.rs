//! Run-level extraction errors

use std::path::PathBuf;

use thiserror::Error;

/// Result type for extraction runs
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Failures that abort an extraction run.
///
/// Row-level faults never surface here; they are counted in
/// [`ExtractionResult`](crate::ExtractionResult) instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The header marker did not appear within the search bound
    #[error("header marker '{marker}' not found in the first {searched} rows")]
    HeaderNotFound { marker: String, searched: u32 },

    /// The source could not be opened or decoded
    #[error("cannot read {}: {reason}", path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    /// A course code pattern failed to compile
    #[error("invalid course code pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A column mapping could not be loaded or is out of range
    #[error("invalid column mapping: {0}")]
    Mapping(String),
}

impl ExtractError {
    /// Whether this is the "no header" failure rather than an I/O one
    pub fn is_header_not_found(&self) -> bool {
        matches!(self, ExtractError::HeaderNotFound { .. })
    }
}
