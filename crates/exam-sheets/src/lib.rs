//! # exam-sheets
//!
//! Extracts exam records from spreadsheet exports whose layout drifts from
//! file to file: extra title rows above the header, spacer and section rows
//! between the data, and cells that may hold text, numbers, dates stored as
//! serial numbers, booleans or formulas.
//!
//! - [`CellNormalizer`] turns any cell into a canonical string
//! - [`CourseCodeValidator`] decides which rows are exam data
//! - [`DateParser`] reads the date columns, yielding `None` for unparseable text
//! - [`RowExtractor`] finds the header and converts the rows below it
//!
//! ## Example
//!
//! ```rust
//! use exam_sheets::prelude::*;
//!
//! let mut sheet = Worksheet::new("Eksamen");
//! sheet.set_cell_value("A1", "Emnekode").unwrap();
//! sheet.set_cell_value("A2", "ITF10214").unwrap();
//! sheet.set_cell_value("B2", "Datasikkerhet").unwrap();
//! sheet.set_cell_value("F2", "16.12.2024 09:00").unwrap();
//! sheet.set_cell_value("A3", "Mastersemester").unwrap();
//!
//! let result = extract(&sheet, &ExtractOptions::default()).unwrap();
//! assert_eq!(result.records_produced, 1);
//! assert_eq!(result.rows_skipped, 1);
//! assert_eq!(result.records[0].formatted_start(), "16.12.2024 09:00");
//! ```

pub mod analyze;
pub mod config;
pub mod course_code;
pub mod date;
pub mod diagnostic;
pub mod error;
pub mod extract;
pub mod mapping;
pub mod normalize;
pub mod prelude;
pub mod record;

pub use analyze::{analyze, truncate, SampleCell, SampleRow, SheetAnalysis};
pub use config::{ExtractOptions, DEFAULT_HEADER_MARKER, DEFAULT_HEADER_SEARCH_ROWS};
pub use course_code::{course_code_matches, CourseCode, CourseCodeValidator};
pub use date::{format_timestamp, parse_date, DateParser, TIMESTAMP_FORMAT};
pub use diagnostic::{Diagnostic, Severity};
pub use error::{ExtractError, ExtractResult};
pub use extract::{
    extract, extract_file, extract_sheet_file, open_sheet, ExtractionResult, RowExtractor,
};
pub use mapping::ColumnMapping;
pub use normalize::{format_number, CellNormalizer, NormalizeError};
pub use record::ExamRecord;

// Re-export the pieces callers need to build or load a source
pub use exam_sheets_core::{
    CellData, CellKind, CellValue, NumberFormat, SheetSelector, SourceRow, TabularSource,
    Worksheet,
};
pub use exam_sheets_xls::XlsReader;
pub use exam_sheets_xlsx::XlsxReader;
