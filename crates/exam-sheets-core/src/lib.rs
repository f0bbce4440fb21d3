//! # exam-sheets-core
//!
//! Core data structures shared by the exam-sheets crates.
//!
//! This crate provides:
//! - [`CellValue`] and [`CellData`] - what a spreadsheet cell holds, including
//!   the number format needed to tell dates from plain numbers
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Worksheet`] - an in-memory grid of rows
//! - [`TabularSource`] and [`SourceRow`] - the read-only view the extraction
//!   engine consumes, implemented by [`Worksheet`] and by anything else that can
//!   hand out rows of cells
//!
//! ## Example
//!
//! ```rust
//! use exam_sheets_core::{CellValue, TabularSource, Worksheet};
//!
//! let mut sheet = Worksheet::new("Sheet1");
//! sheet.set_cell_value("A1", "Emnekode").unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::string("ITF10214"));
//!
//! assert_eq!(sheet.row_count(), 2);
//! assert_eq!(sheet.cell_at(1, 0).unwrap().value.as_string(), Some("ITF10214"));
//! ```

pub mod cell;
pub mod date;
pub mod error;
pub mod number_format;
pub mod source;
pub mod worksheet;

pub use cell::{CellAddress, CellData, CellError, CellKind, CellRange, CellValue};
pub use date::{datetime_to_serial, serial_to_datetime};
pub use error::{Error, Result};
pub use number_format::NumberFormat;
pub use source::{SheetSelector, SourceRow, TabularSource};
pub use worksheet::{Row, Worksheet};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
