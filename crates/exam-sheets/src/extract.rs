//! Row extraction
//!
//! The extractor walks a [`TabularSource`] in two phases: it seeks a header
//! row within a bounded number of leading rows, then scans every following
//! row. A row becomes a record only if its course code column holds a valid
//! course code; any other row is skipped without complaint. A fault while
//! converting a qualifying row rejects that row alone.

use std::collections::BTreeSet;
use std::path::Path;

use exam_sheets_core::{CellData, SheetSelector, SourceRow, TabularSource};
use exam_sheets_xls::XlsReader;
use exam_sheets_xlsx::XlsxReader;

use crate::config::ExtractOptions;
use crate::course_code::CourseCode;
use crate::diagnostic::{Diagnostic, Severity};
use crate::error::{ExtractError, ExtractResult};
use crate::normalize::CellNormalizer;
use crate::record::ExamRecord;

/// Records and counters of one extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Records in source row order
    pub records: Vec<ExamRecord>,
    /// 0-based index of the header row
    pub header_row: u32,
    /// Rows considered after the header
    pub rows_scanned: u32,
    pub records_produced: u32,
    /// Rows without a valid course code
    pub rows_skipped: u32,
    /// Qualifying rows that could not be converted
    pub rows_failed: u32,
    pub diagnostics: Vec<Diagnostic>,
}

impl ExtractionResult {
    /// Rows that did not produce a record
    pub fn rows_rejected(&self) -> u32 {
        self.rows_skipped + self.rows_failed
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct course codes, sorted
    pub fn course_codes(&self) -> Vec<&CourseCode> {
        self.records
            .iter()
            .map(ExamRecord::course_code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Records whose fields contain `text`, ignoring case
    pub fn search<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a ExamRecord> + 'a {
        self.records.iter().filter(move |r| r.matches_text(text))
    }

    /// Records with the given course code
    pub fn by_course<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a ExamRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.course_code().as_str() == code.trim())
    }

    /// Diagnostics at or above `severity`
    pub fn diagnostics_at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity >= severity)
    }
}

/// Where the extractor is in its scan
#[derive(Debug, Clone, Copy)]
enum ScanState {
    SeekingHeader,
    ScanningData { header_row: u32 },
}

/// Converts the rows of a source into exam records
#[derive(Debug, Clone, Copy)]
pub struct RowExtractor<'o> {
    options: &'o ExtractOptions,
}

impl<'o> RowExtractor<'o> {
    pub fn new(options: &'o ExtractOptions) -> Self {
        Self { options }
    }

    /// Run one extraction over `source`.
    ///
    /// Fails when the column mapping is out of range or no header row is
    /// found; everything row-level ends up in the result's counters and
    /// diagnostics.
    pub fn extract(&self, source: &dyn TabularSource) -> ExtractResult<ExtractionResult> {
        self.options.column_mapping.validate()?;
        let normalizer = CellNormalizer::new(source);
        let row_count = source.row_count();
        let mut result = ExtractionResult::default();
        let mut state = ScanState::SeekingHeader;
        let mut index = 0;

        while index < row_count {
            match state {
                ScanState::SeekingHeader => {
                    if index >= self.options.header_search_rows {
                        break;
                    }
                    if self.is_header(source.row(index), &normalizer) {
                        log::debug!("header found at row {}", index);
                        state = ScanState::ScanningData { header_row: index };
                    }
                }
                ScanState::ScanningData { .. } => {
                    result.rows_scanned += 1;
                    self.scan_row(index, source.row(index), &normalizer, &mut result);
                }
            }
            index += 1;
        }

        match state {
            ScanState::ScanningData { header_row } => result.header_row = header_row,
            ScanState::SeekingHeader => {
                let searched = row_count.min(self.options.header_search_rows);
                log::warn!(
                    "header marker '{}' not found in the first {} rows",
                    self.options.header_marker,
                    searched
                );
                return Err(ExtractError::HeaderNotFound {
                    marker: self.options.header_marker.clone(),
                    searched,
                });
            }
        }

        log::info!(
            "extracted {} records from {} rows ({} skipped, {} failed)",
            result.records_produced,
            result.rows_scanned,
            result.rows_skipped,
            result.rows_failed
        );
        Ok(result)
    }

    /// Index of the header row, if it appears within the search bound
    pub fn find_header(&self, source: &dyn TabularSource) -> Option<u32> {
        let normalizer = CellNormalizer::new(source);
        let bound = source.row_count().min(self.options.header_search_rows);
        (0..bound).find(|&index| self.is_header(source.row(index), &normalizer))
    }

    fn is_header(&self, row: Option<&dyn SourceRow>, normalizer: &CellNormalizer<'_>) -> bool {
        let Some(row) = row else {
            return false;
        };
        let marker = self.options.header_marker.to_lowercase();
        match row.cell(self.options.column_mapping.course_code) {
            Ok(cell) => normalizer.normalize(cell).to_lowercase().contains(&marker),
            Err(e) => {
                log::debug!("row {} unreadable while seeking header: {}", row.index(), e);
                false
            }
        }
    }

    fn scan_row(
        &self,
        index: u32,
        row: Option<&dyn SourceRow>,
        normalizer: &CellNormalizer<'_>,
        result: &mut ExtractionResult,
    ) {
        let Some(row) = row else {
            log::debug!("row {} is empty, skipping", index);
            result.rows_skipped += 1;
            return;
        };

        let mut diagnostics = Vec::new();
        match self.convert_row(row, normalizer, &mut diagnostics) {
            Ok(Some(record)) => {
                result.records.push(record);
                result.records_produced += 1;
                result.diagnostics.append(&mut diagnostics);
            }
            Ok(None) => {
                result.rows_skipped += 1;
            }
            Err(e) => {
                log::warn!("row {} rejected: {}", index, e);
                result.rows_failed += 1;
                result
                    .diagnostics
                    .push(Diagnostic::error(index, format!("row rejected: {}", e)));
            }
        }
    }

    /// `Ok(None)` for rows that are not exam data, `Err` for structural faults
    fn convert_row(
        &self,
        row: &dyn SourceRow,
        normalizer: &CellNormalizer<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> exam_sheets_core::Result<Option<ExamRecord>> {
        let index = row.index();
        let mapping = &self.options.column_mapping;

        let first = row.cell(mapping.course_code)?;
        let code_text = normalizer.normalize(first);
        let Some(code) = self.options.course_code.validate(&code_text) else {
            if !code_text.is_empty() {
                log::debug!("row {} skipped, '{}' is not a course code", index, code_text);
            }
            return Ok(None);
        };

        let mut text = |col: u16| -> exam_sheets_core::Result<String> {
            let cell: Option<&CellData> = row.cell(col)?;
            Ok(match normalizer.try_normalize(cell) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("row {} column {}: {}", index, col, e);
                    diagnostics.push(Diagnostic::warning(
                        index,
                        format!("column {}: {}", col, e),
                    ));
                    String::new()
                }
            })
        };

        let mut record = ExamRecord::new(code);
        record.course_name = text(mapping.course_name)?;
        record.exam_type = text(mapping.exam_type)?;
        record.honorar = text(mapping.honorar)?;
        record.platform = text(mapping.platform)?;
        let start_text = text(mapping.exam_start)?;
        let end_text = text(mapping.exam_end)?;
        record.responsible = text(mapping.responsible)?;
        record.internal_sensor = text(mapping.internal_sensor)?;
        record.internal_sensor_2 = text(mapping.internal_sensor_2)?;
        record.external_sensor = text(mapping.external_sensor)?;
        record.honorar_2 = text(mapping.honorar_2)?;
        record.comment = text(mapping.comment)?;

        record.exam_start = self.parse_date(index, "start", &start_text, diagnostics);
        record.exam_end = self.parse_date(index, "end", &end_text, diagnostics);

        Ok(Some(record))
    }

    fn parse_date(
        &self,
        index: u32,
        which: &str,
        text: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<chrono::NaiveDateTime> {
        let parsed = self.options.date_parser.parse(text);
        if parsed.is_none() && !text.is_empty() {
            diagnostics.push(Diagnostic::info(
                index,
                format!("unparseable {} date '{}'", which, text),
            ));
        }
        parsed
    }
}

/// Extract records from `source` with `options`
pub fn extract(
    source: &dyn TabularSource,
    options: &ExtractOptions,
) -> ExtractResult<ExtractionResult> {
    RowExtractor::new(options).extract(source)
}

/// Read the first worksheet of a workbook file and extract records from it
pub fn extract_file<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> ExtractResult<ExtractionResult> {
    extract_sheet_file(path, &SheetSelector::First, options)
}

/// Read the selected worksheet of a workbook file and extract records from it.
///
/// The workbook is read into memory and the file is closed before the scan
/// starts, so the handle is released on every path.
pub fn extract_sheet_file<P: AsRef<Path>>(
    path: P,
    selector: &SheetSelector,
    options: &ExtractOptions,
) -> ExtractResult<ExtractionResult> {
    let sheet = open_sheet(path.as_ref(), selector)?;
    extract(&sheet, options)
}

/// Load a worksheet from an `.xlsx`, `.xlsm` or `.xls` file, mapping every
/// failure to [`ExtractError::SourceUnreadable`]
pub fn open_sheet(
    path: &Path,
    selector: &SheetSelector,
) -> ExtractResult<exam_sheets_core::Worksheet> {
    let unreadable = |reason: String| ExtractError::SourceUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => {
            XlsxReader::read_sheet_file(path, selector).map_err(|e| unreadable(e.to_string()))
        }
        Some("xls") => {
            XlsReader::read_sheet_file(path, selector).map_err(|e| unreadable(e.to_string()))
        }
        Some(other) => Err(unreadable(format!("unsupported file type '.{}'", other))),
        None => Err(unreadable("file has no extension".to_string())),
    }
}
