//! Exam records

use std::fmt;

use chrono::NaiveDateTime;

use crate::course_code::CourseCode;
use crate::date::format_timestamp;

/// One validated exam row.
///
/// Only the course code is mandatory; every other text field is empty when
/// its cell was absent or blank, and the timestamps are `None` when the date
/// text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamRecord {
    course_code: CourseCode,
    pub course_name: String,
    pub exam_type: String,
    pub honorar: String,
    pub platform: String,
    pub exam_start: Option<NaiveDateTime>,
    pub exam_end: Option<NaiveDateTime>,
    pub responsible: String,
    pub internal_sensor: String,
    pub internal_sensor_2: String,
    pub external_sensor: String,
    pub honorar_2: String,
    pub comment: String,
}

impl ExamRecord {
    /// Canonical field order, used for export headers and [`to_fields`](Self::to_fields)
    pub const FIELD_NAMES: [&'static str; 13] = [
        "CourseCode",
        "CourseName",
        "ExamType",
        "Honorar",
        "Platform",
        "ExamDate",
        "ExamDateEnd",
        "Responsible",
        "InternalSensor",
        "InternalSensor2",
        "ExternalSensor",
        "Honorar2",
        "Comment",
    ];

    /// Record with the given course code and every other field empty
    pub fn new(course_code: CourseCode) -> Self {
        Self {
            course_code,
            course_name: String::new(),
            exam_type: String::new(),
            honorar: String::new(),
            platform: String::new(),
            exam_start: None,
            exam_end: None,
            responsible: String::new(),
            internal_sensor: String::new(),
            internal_sensor_2: String::new(),
            external_sensor: String::new(),
            honorar_2: String::new(),
            comment: String::new(),
        }
    }

    pub fn course_code(&self) -> &CourseCode {
        &self.course_code
    }

    /// Start as `dd.MM.yyyy HH:mm`, or `""` when unknown
    pub fn formatted_start(&self) -> String {
        self.exam_start.as_ref().map(format_timestamp).unwrap_or_default()
    }

    /// End as `dd.MM.yyyy HH:mm`, or `""` when unknown
    pub fn formatted_end(&self) -> String {
        self.exam_end.as_ref().map(format_timestamp).unwrap_or_default()
    }

    /// Human-readable span of the exam
    pub fn formatted_date_range(&self) -> String {
        match (&self.exam_start, &self.exam_end) {
            (Some(start), Some(end)) => {
                format!("{} - {}", format_timestamp(start), format_timestamp(end))
            }
            (Some(start), None) => format!("From {}", format_timestamp(start)),
            (None, Some(end)) => format!("Until {}", format_timestamp(end)),
            (None, None) => String::new(),
        }
    }

    /// Field values as strings, in [`FIELD_NAMES`](Self::FIELD_NAMES) order
    pub fn to_fields(&self) -> [String; 13] {
        [
            self.course_code.to_string(),
            self.course_name.clone(),
            self.exam_type.clone(),
            self.honorar.clone(),
            self.platform.clone(),
            self.formatted_start(),
            self.formatted_end(),
            self.responsible.clone(),
            self.internal_sensor.clone(),
            self.internal_sensor_2.clone(),
            self.external_sensor.clone(),
            self.honorar_2.clone(),
            self.comment.clone(),
        ]
    }

    /// Case-insensitive substring match against every field
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.to_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl fmt::Display for ExamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} {}-{}",
            self.course_code,
            self.course_name,
            self.formatted_start(),
            self.formatted_end()
        )
    }
}
