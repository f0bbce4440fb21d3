//! # exam-sheets-xls
//!
//! Reads a worksheet out of a legacy XLS (BIFF8) workbook into an in-memory
//! [`Worksheet`](exam_sheets_core::Worksheet).
//!
//! Like the XLSX reader, only what the extraction engine needs is decoded:
//! cell values, cached formula results, the shared string table, number
//! formats (so date cells can be told apart from plain numbers) and the
//! 1904 date flag. Formula token streams are not decoded.

pub mod biff;
pub mod error;
pub mod reader;

pub use error::{XlsError, XlsResult};
pub use reader::XlsReader;
