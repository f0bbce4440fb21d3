//! A1-style cell addresses

use std::fmt;

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// 0-based position of a cell.
///
/// `$` markers are accepted when parsing and dropped: references never move,
/// so absolute and relative addresses resolve to the same cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse `B2`, `$B$2` or `b2`
    ///
    /// ```
    /// use exam_sheets_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$N$13").unwrap();
    /// assert_eq!((addr.row, addr.col), (12, 13));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = |why: &str| Error::InvalidAddress(format!("{} in '{}'", why, s));

        let text = s.trim().replace('$', "");
        let split = text
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(text.len());
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() {
            return Err(invalid("no column letters"));
        }
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("no row number"));
        }

        let col = Self::letters_to_column(letters)?;
        let row: u32 = digits.parse().map_err(|_| invalid("row number too large"))?;
        let row = row.checked_sub(1).ok_or_else(|| invalid("row 0"))?;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }
        Ok(Self::new(row, col))
    }

    /// `0` is `A`, `26` is `AA`
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = u32::from(col) + 1;
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        letters.iter().rev().map(|&b| b as char).collect()
    }

    /// `A` is `0`, `AA` is `26`; case is ignored
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        let col = letters.bytes().try_fold(0u32, |acc, b| {
            if !b.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("bad column '{}'", letters)));
            }
            let next = acc * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
            if next > u32::from(MAX_COLS) {
                return Err(Error::InvalidAddress(format!(
                    "column '{}' past the last column",
                    letters
                )));
            }
            Ok(next)
        })?;
        match col {
            0 => Err(Error::InvalidAddress("empty column".into())),
            n => Ok((n - 1) as u16),
        }
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_to_letters(self.col), self.row + 1)
    }
}

/// Inclusive rectangle of cells, stored top-left to bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    /// Range spanned by two opposite corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Parse `A1:B3`; a lone address is a one-cell range
    pub fn parse(s: &str) -> Result<Self> {
        let (a, b) = s.split_once(':').unwrap_or((s, s));
        let corner = |text: &str| {
            CellAddress::parse(text).map_err(|_| Error::InvalidRange(s.trim().to_string()))
        };
        Ok(Self::new(corner(a)?, corner(b)?))
    }

    pub fn cell_count(&self) -> u64 {
        let rows = u64::from(self.end.row - self.start.row) + 1;
        let cols = u64::from(self.end.col - self.start.col) + 1;
        rows * cols
    }

    /// Addresses in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> + '_ {
        let cols = self.start.col..=self.end.col;
        (self.start.row..=self.end.row)
            .flat_map(move |row| cols.clone().map(move |col| CellAddress::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
