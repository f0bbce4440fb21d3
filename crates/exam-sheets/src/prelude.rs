//! Prelude module - common imports for exam-sheets users
//!
//! ```rust
//! use exam_sheets::prelude::*;
//! ```

pub use crate::{
    analyze,
    extract,
    extract_file,
    CellNormalizer,
    ColumnMapping,
    CourseCode,
    CourseCodeValidator,
    DateParser,
    Diagnostic,
    ExamRecord,
    ExtractError,
    ExtractOptions,
    ExtractionResult,
    RowExtractor,
    Severity,
    SheetSelector,
    // Source types
    CellValue,
    NumberFormat,
    TabularSource,
    Worksheet,
};
