//! Structure report for a sheet
//!
//! Used to find out why a file yields no records: it shows where the header
//! was found, what the header labels say, and how the first data rows look
//! to the normalizer.

use std::fmt;

use exam_sheets_core::{CellKind, TabularSource};

use crate::config::ExtractOptions;
use crate::extract::RowExtractor;
use crate::normalize::CellNormalizer;

/// Columns shown per row
pub const ANALYZED_COLUMNS: u16 = 15;

/// Data rows shown after the header
pub const SAMPLE_ROWS: u32 = 3;

/// Width sample values are cut to
pub const SAMPLE_VALUE_WIDTH: usize = 30;

/// One cell of a sample row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleCell {
    /// Normalized value, truncated to [`SAMPLE_VALUE_WIDTH`]
    pub value: String,
    pub kind: CellKind,
}

/// A data row as the normalizer sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    /// 0-based row index
    pub row: u32,
    pub cells: Vec<SampleCell>,
}

/// Result of [`analyze`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetAnalysis {
    pub total_rows: u32,
    /// 0-based header row, if found within the search bound
    pub header_row: Option<u32>,
    /// Normalized labels of the first [`ANALYZED_COLUMNS`] header cells
    pub header_labels: Vec<String>,
    pub samples: Vec<SampleRow>,
    /// How many leading rows were searched
    pub searched_rows: u32,
}

/// Describe the layout of `source`
pub fn analyze(source: &dyn TabularSource, options: &ExtractOptions) -> SheetAnalysis {
    let normalizer = CellNormalizer::new(source);
    let total_rows = source.row_count();
    let header_row = RowExtractor::new(options).find_header(source);

    let mut analysis = SheetAnalysis {
        total_rows,
        header_row,
        header_labels: Vec::new(),
        samples: Vec::new(),
        searched_rows: total_rows.min(options.header_search_rows),
    };

    let Some(header) = header_row else {
        return analysis;
    };

    if let Some(row) = source.row(header) {
        analysis.header_labels = (0..ANALYZED_COLUMNS)
            .map(|col| normalizer.normalize(row.cell(col).ok().flatten()))
            .collect();
    }

    let last = total_rows.min(header.saturating_add(1 + SAMPLE_ROWS));
    for index in header + 1..last {
        let Some(row) = source.row(index) else {
            continue;
        };
        let cells = (0..ANALYZED_COLUMNS)
            .map(|col| {
                let cell = row.cell(col).ok().flatten();
                SampleCell {
                    value: truncate(&normalizer.normalize(cell), SAMPLE_VALUE_WIDTH),
                    kind: CellKind::of(cell),
                }
            })
            .collect();
        analysis.samples.push(SampleRow { row: index, cells });
    }

    analysis
}

/// Cut `text` to at most `max` characters, ending in `...` when shortened
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

impl fmt::Display for SheetAnalysis {
    // Rows print 1-based
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total rows: {}", self.total_rows)?;
        let Some(header) = self.header_row else {
            return writeln!(f, "No header row found in the first {} rows", self.searched_rows);
        };
        writeln!(f, "Header found at row: {}", header + 1)?;

        writeln!(f)?;
        writeln!(f, "----- HEADER COLUMNS -----")?;
        for (col, label) in self.header_labels.iter().enumerate() {
            writeln!(f, "Column {}: {}", col, label)?;
        }

        writeln!(f)?;
        writeln!(f, "----- SAMPLE DATA ROWS -----")?;
        for sample in &self.samples {
            writeln!(f)?;
            writeln!(f, "Data Row {}:", sample.row + 1)?;
            for (col, cell) in sample.cells.iter().enumerate() {
                writeln!(f, "  Col {:<2}: {:<30} (Type: {})", col, cell.value, cell.kind)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_sheets_core::{CellValue, Worksheet};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("", 30), "");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("æøåæøåæøå", 6), "æøå...");
    }

    #[test]
    fn test_analysis_of_sheet() {
        let mut sheet = Worksheet::new("Eksamen");
        sheet.set_cell_value_at(0, 0, "Eksamensplan");
        sheet.set_cell_value_at(1, 0, "Emnekode");
        sheet.set_cell_value_at(1, 1, "Emnenavn");
        sheet.set_cell_value_at(2, 0, "ITF10214");
        sheet.set_cell_value_at(2, 1, "A very long course name that does not fit");
        sheet.set_cell_value_at(2, 2, 1000.0);
        sheet.set_cell_value_at(2, 3, CellValue::formula_with_cached("=C3", CellValue::Number(1000.0)));
        sheet.set_cell_value_at(4, 0, "ITF20215");
        sheet.set_cell_value_at(6, 0, "ITF30216");

        let analysis = analyze(&sheet, &ExtractOptions::default());
        assert_eq!(analysis.total_rows, 7);
        assert_eq!(analysis.header_row, Some(1));
        assert_eq!(analysis.header_labels.len(), 15);
        assert_eq!(analysis.header_labels[0], "Emnekode");
        assert_eq!(analysis.header_labels[1], "Emnenavn");
        assert_eq!(analysis.header_labels[2], "");

        // Rows 2..=4 are sampled; row 3 has no cells
        let rows: Vec<u32> = analysis.samples.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![2, 4]);

        let first = &analysis.samples[0].cells;
        assert_eq!(first[1].value, "A very long course name tha...");
        assert_eq!(first[2].kind, CellKind::Number);
        assert_eq!(first[3].kind, CellKind::Formula);
        assert_eq!(first[3].value, "1000");
        assert_eq!(first[14].kind, CellKind::Absent);

        let report = analysis.to_string();
        assert!(report.contains("Header found at row: 2"));
        assert!(report.contains("Data Row 3:"));
        assert!(report.contains("(Type: NUMERIC)"));
    }

    #[test]
    fn test_analysis_without_header() {
        let mut sheet = Worksheet::new("Eksamen");
        sheet.set_cell_value_at(0, 0, "Course");

        let analysis = analyze(&sheet, &ExtractOptions::default());
        assert_eq!(analysis.header_row, None);
        assert!(analysis.samples.is_empty());
        assert_eq!(
            analysis.to_string(),
            "Total rows: 1\nNo header row found in the first 1 rows\n"
        );
    }
}
