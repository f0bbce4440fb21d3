//! Cell-related types
//!
//! This module contains:
//! - [`CellValue`] - The value stored in a cell
//! - [`CellData`] - A value together with its number format
//! - [`CellKind`] - The variant kind of a possibly-absent cell
//! - [`CellAddress`] / [`CellRange`] - A cell's location (e.g., "A1", "A1:B3")

mod address;
mod value;

pub use address::{CellAddress, CellRange};
pub use value::{CellError, CellValue};

use crate::number_format::NumberFormat;

/// A stored cell: its value and the number format it is displayed with
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellData {
    /// The cell's value
    pub value: CellValue,
    /// Number format applied to the cell
    pub number_format: NumberFormat,
}

impl CellData {
    /// Create cell data with the general number format
    pub fn new<V: Into<CellValue>>(value: V) -> Self {
        Self {
            value: value.into(),
            number_format: NumberFormat::General,
        }
    }

    /// Create cell data with an explicit number format
    pub fn with_format<V: Into<CellValue>>(value: V, number_format: NumberFormat) -> Self {
        Self {
            value: value.into(),
            number_format,
        }
    }

    /// Whether the cell is formatted as a date or time.
    ///
    /// Only meaningful for numeric values (and formulas producing numbers);
    /// text that happens to sit in a date-formatted cell stays text.
    pub fn is_date_formatted(&self) -> bool {
        self.number_format.is_date_format()
    }

    /// The variant kind of this cell
    pub fn kind(&self) -> CellKind {
        match &self.value {
            CellValue::Empty => CellKind::Blank,
            CellValue::Boolean(_) => CellKind::Boolean,
            CellValue::Number(_) => CellKind::Number,
            CellValue::String(_) => CellKind::Text,
            CellValue::Error(_) => CellKind::Error,
            CellValue::Formula { .. } => CellKind::Formula,
        }
    }
}

/// Variant kind of a raw cell as seen by the extraction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// No cell exists at this position
    Absent,
    /// Cell exists but holds nothing
    Blank,
    Text,
    Number,
    Boolean,
    Formula,
    Error,
}

impl CellKind {
    /// Kind of an optional cell, mapping `None` to [`CellKind::Absent`]
    pub fn of(cell: Option<&CellData>) -> Self {
        cell.map_or(CellKind::Absent, CellData::kind)
    }

    /// Upper-case name, as printed in file analysis reports
    pub fn name(&self) -> &'static str {
        match self {
            CellKind::Absent => "NULL",
            CellKind::Blank => "BLANK",
            CellKind::Text => "STRING",
            CellKind::Number => "NUMERIC",
            CellKind::Boolean => "BOOLEAN",
            CellKind::Formula => "FORMULA",
            CellKind::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for CellKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
