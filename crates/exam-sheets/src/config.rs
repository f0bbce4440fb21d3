//! Extraction options

use crate::course_code::CourseCodeValidator;
use crate::date::DateParser;
use crate::error::ExtractResult;
use crate::mapping::ColumnMapping;

/// Marker that identifies the header row, matched case-insensitively
pub const DEFAULT_HEADER_MARKER: &str = "emnekode";

/// How many leading rows are searched for the header
pub const DEFAULT_HEADER_SEARCH_ROWS: u32 = 20;

/// Everything an extraction run assumes about the export format
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Substring the header row's course code column contains
    pub header_marker: String,
    /// Number of leading rows searched for the header
    pub header_search_rows: u32,
    /// Decides which rows are exam data
    pub course_code: CourseCodeValidator,
    /// Where each field sits
    pub column_mapping: ColumnMapping,
    /// Formats tried, in order, for the date columns
    pub date_parser: DateParser,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            header_marker: DEFAULT_HEADER_MARKER.to_string(),
            header_search_rows: DEFAULT_HEADER_SEARCH_ROWS,
            course_code: CourseCodeValidator::default(),
            column_mapping: ColumnMapping::default(),
            date_parser: DateParser::default(),
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.header_marker = marker.into();
        self
    }

    pub fn with_header_search_rows(mut self, rows: u32) -> Self {
        self.header_search_rows = rows;
        self
    }

    /// Replace the course code grammar with a regular expression
    pub fn with_course_code_pattern(mut self, pattern: &str) -> ExtractResult<Self> {
        self.course_code = CourseCodeValidator::new(pattern)?;
        Ok(self)
    }

    /// Use `mapping` for field positions; columns past the last one are rejected
    pub fn with_column_mapping(mut self, mapping: ColumnMapping) -> ExtractResult<Self> {
        mapping.validate()?;
        self.column_mapping = mapping;
        Ok(self)
    }

    pub fn with_date_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.date_parser = DateParser::new(formats);
        self
    }
}
