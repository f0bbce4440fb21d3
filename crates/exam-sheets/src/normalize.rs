//! Cell normalization
//!
//! Every cell is turned into a canonical string before anything interprets
//! it. Whether a number is a date is decided here, from the cell's number
//! format, because that information is gone once the value is text.

use exam_sheets_core::{serial_to_datetime, CellData, CellError, CellValue, TabularSource};
use exam_sheets_formula::{evaluate_formula, FormulaError, FormulaValue};
use thiserror::Error;

use crate::date::format_timestamp;

/// Why a cell could not be normalized
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The formula has no usable cached value and evaluating it failed
    #[error("formula '{formula}' could not be evaluated: {source}")]
    Formula {
        formula: String,
        #[source]
        source: FormulaError,
    },

    /// The formula evaluated to an error value
    #[error("formula '{formula}' evaluated to {value}")]
    FormulaErrorValue { formula: String, value: CellError },
}

/// Converts raw cells of any kind into canonical strings
#[derive(Clone, Copy)]
pub struct CellNormalizer<'a> {
    source: &'a dyn TabularSource,
}

impl<'a> CellNormalizer<'a> {
    /// Normalizer for cells of `source`.
    ///
    /// The source supplies the date system and is what uncached formulas are
    /// evaluated against.
    pub fn new(source: &'a dyn TabularSource) -> Self {
        Self { source }
    }

    /// Canonical string for `cell`. Never fails: anything that goes wrong
    /// yields `""` and a logged warning.
    pub fn normalize(&self, cell: Option<&CellData>) -> String {
        match self.try_normalize(cell) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("cell normalized to empty string: {}", e);
                String::new()
            }
        }
    }

    /// Canonical string for `cell`, reporting formula failures
    pub fn try_normalize(&self, cell: Option<&CellData>) -> Result<String, NormalizeError> {
        let Some(cell) = cell else {
            return Ok(String::new());
        };
        let is_date = cell.is_date_formatted();

        match &cell.value {
            CellValue::Empty | CellValue::Error(_) => Ok(String::new()),
            CellValue::String(s) => Ok(s.trim().to_string()),
            CellValue::Boolean(b) => Ok(format_bool(*b)),
            CellValue::Number(n) => Ok(self.format_number(*n, is_date)),
            CellValue::Formula { text, cached } => match cached.as_deref() {
                Some(CellValue::String(s)) => Ok(s.trim().to_string()),
                Some(CellValue::Boolean(b)) => Ok(format_bool(*b)),
                Some(CellValue::Number(n)) => Ok(self.format_number(*n, is_date)),
                _ => self.evaluate(text, is_date),
            },
        }
    }

    fn evaluate(&self, formula: &str, is_date: bool) -> Result<String, NormalizeError> {
        let value =
            evaluate_formula(formula, self.source).map_err(|source| NormalizeError::Formula {
                formula: formula.to_string(),
                source,
            })?;

        match value {
            FormulaValue::Empty => Ok(String::new()),
            FormulaValue::String(s) => Ok(s.trim().to_string()),
            FormulaValue::Boolean(b) => Ok(format_bool(b)),
            FormulaValue::Number(n) => Ok(self.format_number(n, is_date)),
            FormulaValue::Error(value) => Err(NormalizeError::FormulaErrorValue {
                formula: formula.to_string(),
                value,
            }),
        }
    }

    fn format_number(&self, value: f64, is_date: bool) -> String {
        if is_date {
            match serial_to_datetime(value, self.source.date_1904()) {
                Some(timestamp) => return format_timestamp(&timestamp),
                None => log::debug!("serial {} is not a valid date, keeping the number", value),
            }
        }
        format_number(value)
    }
}

impl std::fmt::Debug for CellNormalizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellNormalizer")
            .field("date_1904", &self.source.date_1904())
            .finish()
    }
}

fn format_bool(value: bool) -> String {
    value.to_string()
}

/// Render a plain number: integral values without a decimal point, all
/// others with the shortest representation that reads back to the same value
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_sheets_core::{NumberFormat, Worksheet};
    use pretty_assertions::assert_eq;

    fn normalize_at(sheet: &Worksheet, row: u32, col: u16) -> String {
        CellNormalizer::new(sheet).normalize(sheet.cell_at(row, col))
    }

    #[test]
    fn test_absent_blank_and_error() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(0, 0, CellValue::Empty);
        sheet.set_cell_value_at(0, 1, CellError::NotAvailable);

        assert_eq!(normalize_at(&sheet, 0, 0), "");
        assert_eq!(normalize_at(&sheet, 0, 1), "");
        assert_eq!(normalize_at(&sheet, 5, 5), "");
    }

    #[test]
    fn test_text_and_boolean() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(0, 0, "  Digital forretning \n");
        sheet.set_cell_value_at(0, 1, true);
        sheet.set_cell_value_at(0, 2, false);

        assert_eq!(normalize_at(&sheet, 0, 0), "Digital forretning");
        assert_eq!(normalize_at(&sheet, 0, 1), "true");
        assert_eq!(normalize_at(&sheet, 0, 2), "false");
    }

    #[test]
    fn test_numbers() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(0, 0, 1500.0);
        sheet.set_cell_value_at(0, 1, 2.5);
        sheet.set_cell_value_at(0, 2, -3.0);
        sheet.set_cell_value_at(0, 3, 0.1);

        assert_eq!(normalize_at(&sheet, 0, 0), "1500");
        assert_eq!(normalize_at(&sheet, 0, 1), "2.5");
        assert_eq!(normalize_at(&sheet, 0, 2), "-3");
        assert_eq!(normalize_at(&sheet, 0, 3), "0.1");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_date_formatted_numbers() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_formatted_at(0, 0, 45642.583_333_333_3, NumberFormat::datetime());
        sheet.set_cell_formatted_at(0, 1, 45642.0, NumberFormat::from_string("dd.mm.yyyy"));
        // Not representable as a date; the raw number is kept
        sheet.set_cell_formatted_at(0, 2, -5.0, NumberFormat::date_short());

        assert_eq!(normalize_at(&sheet, 0, 0), "16.12.2024 14:00");
        assert_eq!(normalize_at(&sheet, 0, 1), "16.12.2024 00:00");
        assert_eq!(normalize_at(&sheet, 0, 2), "-5");
    }

    #[test]
    fn test_date_1904_system() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_date_1904(true);
        sheet.set_cell_formatted_at(0, 0, 44180.0, NumberFormat::date_short());

        assert_eq!(normalize_at(&sheet, 0, 0), "16.12.2024 00:00");
    }

    #[test]
    fn test_formula_uses_cached_value() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(
            0,
            0,
            CellValue::formula_with_cached("=A2&B2", CellValue::string(" ITF10214 ")),
        );
        sheet.set_cell_formatted_at(
            0,
            1,
            CellValue::formula_with_cached("=C2+1", CellValue::Number(45642.5)),
            NumberFormat::datetime(),
        );
        sheet.set_cell_value_at(
            0,
            2,
            CellValue::formula_with_cached("=C2>0", CellValue::Boolean(true)),
        );

        assert_eq!(normalize_at(&sheet, 0, 0), "ITF10214");
        assert_eq!(normalize_at(&sheet, 0, 1), "16.12.2024 12:00");
        assert_eq!(normalize_at(&sheet, 0, 2), "true");
    }

    #[test]
    fn test_formula_without_cache_is_evaluated() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(1, 0, "itf");
        sheet.set_cell_value_at(1, 1, 10214.0);
        sheet.set_cell_value_at(0, 0, CellValue::formula("=UPPER(A2)&B2"));
        sheet.set_cell_formatted_at(
            0,
            1,
            CellValue::formula("=DATE(2024,12,16)+TIME(14,0,0)"),
            NumberFormat::datetime(),
        );
        sheet.set_cell_value_at(0, 2, CellValue::formula("=B2/4"));
        // A cached error is not usable, so the formula is evaluated again
        sheet.set_cell_value_at(
            0,
            3,
            CellValue::formula_with_cached("=B2*2", CellValue::Error(CellError::Ref)),
        );

        assert_eq!(normalize_at(&sheet, 0, 0), "ITF10214");
        assert_eq!(normalize_at(&sheet, 0, 1), "16.12.2024 14:00");
        assert_eq!(normalize_at(&sheet, 0, 2), "2553.5");
        assert_eq!(normalize_at(&sheet, 0, 3), "20428");
    }

    #[test]
    fn test_failing_formula_is_empty() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell_value_at(0, 0, CellValue::formula("=VLOOKUP(1,B1:C9,2)"));
        sheet.set_cell_value_at(0, 1, CellValue::formula("=1/0"));
        sheet.set_cell_value_at(0, 2, CellValue::formula("=(1+"));

        let normalizer = CellNormalizer::new(&sheet);
        assert_eq!(normalize_at(&sheet, 0, 0), "");
        assert_eq!(normalize_at(&sheet, 0, 1), "");
        assert_eq!(normalize_at(&sheet, 0, 2), "");

        assert!(matches!(
            normalizer.try_normalize(sheet.cell_at(0, 0)),
            Err(NormalizeError::Formula { .. })
        ));
        assert!(matches!(
            normalizer.try_normalize(sheet.cell_at(0, 1)),
            Err(NormalizeError::FormulaErrorValue {
                value: CellError::DivZero,
                ..
            })
        ));
    }

    #[test]
    fn test_deeply_nested_formula_is_empty() {
        let mut sheet = Worksheet::new("Sheet1");
        let text = format!("={}1{}", "(".repeat(3000), ")".repeat(3000));
        sheet.set_cell_value_at(0, 0, CellValue::formula(text));

        assert_eq!(normalize_at(&sheet, 0, 0), "");
        assert!(matches!(
            CellNormalizer::new(&sheet).try_normalize(sheet.cell_at(0, 0)),
            Err(NormalizeError::Formula { .. })
        ));
    }
}
