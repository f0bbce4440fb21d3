//! # exam-sheets-xlsx
//!
//! Reads a worksheet out of an XLSX (Office Open XML) workbook into an
//! in-memory [`Worksheet`](exam_sheets_core::Worksheet).
//!
//! Only the parts the extraction engine consumes are read: cell values,
//! cached formula results, shared strings, number formats and the workbook
//! date system. The archive is closed before the worksheet is returned.

pub mod error;
pub mod reader;

mod styles;

pub use error::{XlsxError, XlsxResult};
pub use exam_sheets_core::SheetSelector;
pub use reader::XlsxReader;
