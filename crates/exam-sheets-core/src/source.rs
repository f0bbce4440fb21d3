//! Read-only tabular input consumed by the extraction engine
//!
//! Anything that can hand out rows of [`CellData`] by index can feed the
//! engine: an XLSX worksheet loaded into a [`Worksheet`](crate::Worksheet),
//! a test fixture, or an adapter over another spreadsheet library.

use std::fmt;

use crate::cell::CellData;
use crate::error::Result;

/// Which worksheet of a workbook to read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SheetSelector {
    /// The first sheet in workbook order
    #[default]
    First,
    /// A sheet by 0-based position
    Index(usize),
    /// A sheet by name (case-insensitive)
    Name(String),
}

impl SheetSelector {
    /// Position of the selected sheet among `names`, in workbook order
    pub fn position<'a, I>(&self, names: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names = names.into_iter();
        match self {
            SheetSelector::First => names.next().map(|_| 0),
            SheetSelector::Index(i) => names.nth(*i).map(|_| *i),
            SheetSelector::Name(wanted) => names.position(|name| name.eq_ignore_ascii_case(wanted)),
        }
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::First => f.write_str("first sheet (workbook has no sheets)"),
            SheetSelector::Index(i) => write!(f, "sheet #{}", i),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// One row of a tabular source
pub trait SourceRow {
    /// 0-based index of this row within its source
    fn index(&self) -> u32;

    /// Cell at the given 0-based column.
    ///
    /// `Ok(None)` means the cell is absent, which is an ordinary condition.
    /// `Err` is reserved for structural faults in the underlying source.
    fn cell(&self, col: u16) -> Result<Option<&CellData>>;
}

/// A finite, ordered, repeatable sequence of rows
pub trait TabularSource {
    /// Number of row slots, i.e. index of the last row plus one
    fn row_count(&self) -> u32;

    /// Row at the given index; `None` for rows with no stored cells
    fn row(&self, index: u32) -> Option<&dyn SourceRow>;

    /// Whether serial dates count from 1904 instead of 1900
    fn date_1904(&self) -> bool {
        false
    }

    /// Random access to a single cell, used when evaluating formula references
    fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.row(row).and_then(|r| r.cell(col).ok().flatten())
    }
}
