//! Course code grammar
//!
//! The course code in the first column is the only thing that decides whether
//! a row is exam data. Section headers, spacer rows and footnotes fail the
//! pattern and are skipped.

use std::fmt;
use std::ops::Deref;

use lazy_regex::regex;
use regex::Regex;

use crate::error::ExtractResult;

/// Default grammar: two or three upper-case letters followed by five ASCII digits
pub const DEFAULT_COURSE_CODE_PATTERN: &str = r"^[A-Z]{2,3}[0-9]{5}$";

/// A course code that passed validation.
///
/// Only [`CourseCodeValidator::validate`] creates one, so holding a
/// `CourseCode` means the text matched the grammar in effect for the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CourseCode(String);

impl CourseCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for CourseCode {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CourseCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Predicate deciding which first-column values are course codes
#[derive(Debug, Clone)]
pub struct CourseCodeValidator {
    pattern: Regex,
}

impl CourseCodeValidator {
    /// Validator for a custom pattern.
    ///
    /// The pattern is used as given; anchor it with `^...$` to require a
    /// whole-value match.
    pub fn new(pattern: &str) -> ExtractResult<Self> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// The pattern in effect
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether `text`, after trimming, is a course code (case-sensitive)
    pub fn matches(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty() && self.pattern.is_match(text)
    }

    /// Trimmed course code if `text` matches
    pub fn validate(&self, text: &str) -> Option<CourseCode> {
        if self.matches(text) {
            Some(CourseCode(text.trim().to_string()))
        } else {
            None
        }
    }
}

impl Default for CourseCodeValidator {
    fn default() -> Self {
        let pattern: &Regex = regex!(r"^[A-Z]{2,3}[0-9]{5}$");
        Self {
            pattern: pattern.clone(),
        }
    }
}

/// Check `text` against the default course code grammar
pub fn course_code_matches(text: &str) -> bool {
    let text = text.trim();
    regex!(r"^[A-Z]{2,3}[0-9]{5}$").is_match(text)
}
