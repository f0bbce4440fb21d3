//! Column-to-field mapping
//!
//! Exports produced over the years disagree on where the date columns and the
//! trailing columns sit, so the layout is configuration rather than constants.
//! Two known layouts ship as presets; others can be loaded from JSON.

use std::fs;
use std::path::Path;

use exam_sheets_core::MAX_COLS;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractResult};

/// 0-based column index of every record field.
///
/// Missing keys in a JSON layout fall back to [`ColumnMapping::sequential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnMapping {
    pub course_code: u16,
    pub course_name: u16,
    pub exam_type: u16,
    pub honorar: u16,
    pub platform: u16,
    pub exam_start: u16,
    pub exam_end: u16,
    pub responsible: u16,
    pub internal_sensor: u16,
    pub internal_sensor_2: u16,
    pub external_sensor: u16,
    pub honorar_2: u16,
    pub comment: u16,
}

impl ColumnMapping {
    /// Every field in its own column, left to right in record order
    pub const fn sequential() -> Self {
        Self {
            course_code: 0,
            course_name: 1,
            exam_type: 2,
            honorar: 3,
            platform: 4,
            exam_start: 5,
            exam_end: 6,
            responsible: 7,
            internal_sensor: 8,
            internal_sensor_2: 9,
            external_sensor: 10,
            honorar_2: 11,
            comment: 12,
        }
    }

    /// Layout with the end date before the start date and an unused
    /// column ahead of the second honorarium
    pub const fn processor_layout() -> Self {
        Self {
            exam_start: 6,
            exam_end: 5,
            honorar_2: 12,
            comment: 13,
            ..Self::sequential()
        }
    }

    /// Look up a preset by name (`sequential` or `processor`)
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sequential" | "default" => Some(Self::sequential()),
            "processor" | "processor_layout" => Some(Self::processor_layout()),
            _ => None,
        }
    }

    /// Parse a layout from JSON
    pub fn from_json_str(json: &str) -> ExtractResult<Self> {
        let mapping: Self =
            serde_json::from_str(json).map_err(|e| ExtractError::Mapping(e.to_string()))?;
        mapping.validate()?;
        Ok(mapping)
    }

    /// Load a layout from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ExtractResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| ExtractError::Mapping(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// `(field name, column)` pairs in record order
    pub fn columns(&self) -> [(&'static str, u16); 13] {
        [
            ("course_code", self.course_code),
            ("course_name", self.course_name),
            ("exam_type", self.exam_type),
            ("honorar", self.honorar),
            ("platform", self.platform),
            ("exam_start", self.exam_start),
            ("exam_end", self.exam_end),
            ("responsible", self.responsible),
            ("internal_sensor", self.internal_sensor),
            ("internal_sensor_2", self.internal_sensor_2),
            ("external_sensor", self.external_sensor),
            ("honorar_2", self.honorar_2),
            ("comment", self.comment),
        ]
    }

    /// Highest column any field reads
    pub fn max_column(&self) -> u16 {
        self.columns().iter().map(|(_, c)| *c).max().unwrap_or(0)
    }

    /// Reject columns beyond the sheet width and a course code column
    /// shared with another field
    pub fn validate(&self) -> ExtractResult<()> {
        for (name, col) in self.columns() {
            if col >= MAX_COLS {
                return Err(ExtractError::Mapping(format!(
                    "column {} for {} is beyond the last column ({})",
                    col,
                    name,
                    MAX_COLS - 1
                )));
            }
        }
        if let Some((name, _)) = self.columns()[1..]
            .iter()
            .find(|(_, col)| *col == self.course_code)
        {
            return Err(ExtractError::Mapping(format!(
                "{} shares column {} with course_code",
                name, self.course_code
            )));
        }
        Ok(())
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::sequential()
    }
}
