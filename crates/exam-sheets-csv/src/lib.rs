//! # exam-sheets-csv
//!
//! CSV export for exam records. One header line names every field, fields
//! follow [`ExamRecord::FIELD_NAMES`](exam_sheets::ExamRecord::FIELD_NAMES)
//! order, and values are quoted only when they contain the delimiter, a quote
//! or a line break.

mod error;
mod options;
mod writer;

pub use error::{CsvError, CsvResult};
pub use options::{CsvWriteOptions, LineTerminator};
pub use writer::ExamCsvWriter;
