//! In-memory worksheet

use std::collections::BTreeMap;

use crate::cell::{CellAddress, CellData, CellValue};
use crate::error::{Error, Result};
use crate::number_format::NumberFormat;
use crate::source::{SourceRow, TabularSource};
use crate::MAX_COLS;

/// A sparse row of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    index: u32,
    cells: BTreeMap<u16, CellData>,
}

impl Row {
    fn new(index: u32) -> Self {
        Self {
            index,
            cells: BTreeMap::new(),
        }
    }

    /// Index of the last stored column plus one
    pub fn width(&self) -> u16 {
        self.cells.keys().next_back().map_or(0, |c| c + 1)
    }
}

impl SourceRow for Row {
    fn index(&self) -> u32 {
        self.index
    }

    fn cell(&self, col: u16) -> Result<Option<&CellData>> {
        if col >= MAX_COLS {
            return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
        }
        Ok(self.cells.get(&col))
    }
}

/// A single worksheet held in memory
#[derive(Debug, Clone, Default)]
pub struct Worksheet {
    name: String,
    rows: BTreeMap<u32, Row>,
    date_1904: bool,
}

impl Worksheet {
    /// Create a new, empty worksheet
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            rows: BTreeMap::new(),
            date_1904: false,
        }
    }

    /// Get the worksheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Use the 1904 date system for serial dates
    pub fn set_date_1904(&mut self, date_1904: bool) {
        self.date_1904 = date_1904;
    }

    /// Set a cell by A1-style address
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value);
        Ok(())
    }

    /// Set a cell value at row/column indices (0-based) with the general format
    pub fn set_cell_value_at<V: Into<CellValue>>(&mut self, row: u32, col: u16, value: V) {
        self.set_cell_at(row, col, CellData::new(value));
    }

    /// Set a cell value with an explicit number format
    pub fn set_cell_formatted_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
        number_format: NumberFormat,
    ) {
        self.set_cell_at(row, col, CellData::with_format(value, number_format));
    }

    /// Store complete cell data at row/column indices (0-based)
    pub fn set_cell_at(&mut self, row: u32, col: u16, data: CellData) {
        self.rows
            .entry(row)
            .or_insert_with(|| Row::new(row))
            .cells
            .insert(col, data);
    }

    /// Iterate over stored rows in order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    /// Whether the sheet holds no cells
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TabularSource for Worksheet {
    fn row_count(&self) -> u32 {
        self.rows.keys().next_back().map_or(0, |r| r + 1)
    }

    fn row(&self, index: u32) -> Option<&dyn SourceRow> {
        self.rows.get(&index).map(|r| r as &dyn SourceRow)
    }

    fn date_1904(&self) -> bool {
        self.date_1904
    }

    fn cell_at(&self, row: u32, col: u16) -> Option<&CellData> {
        self.rows.get(&row).and_then(|r| r.cells.get(&col))
    }
}
