//! Cell values as a spreadsheet file stores them

use std::fmt;

/// What a cell holds.
///
/// Dates have no variant of their own: they are numbers whose cell carries a
/// date number format (see [`CellData::is_date_formatted`](super::CellData::is_date_formatted)).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Stored but blank, e.g. a cell that only carries a style
    #[default]
    Empty,
    Boolean(bool),
    Number(f64),
    String(String),
    Error(CellError),
    /// Formula text (with the leading `=`) and the result the saving
    /// application last computed, if it stored one
    Formula {
        text: String,
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    pub fn string<S: Into<String>>(s: S) -> Self {
        CellValue::String(s.into())
    }

    /// Formula that was never calculated
    pub fn formula<S: Into<String>>(text: S) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached: None,
        }
    }

    pub fn formula_with_cached<S: Into<String>>(text: S, cached: CellValue) -> Self {
        CellValue::Formula {
            text: text.into(),
            cached: Some(Box::new(cached)),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Text of a string cell, or of a formula whose cached result is text
    pub fn as_string(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            CellValue::Formula {
                cached: Some(inner),
                ..
            } => inner.as_string(),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    // Formulas show their cached result when there is one
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Boolean(true) => f.write_str("TRUE"),
            CellValue::Boolean(false) => f.write_str("FALSE"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::String(s) => f.write_str(s),
            CellValue::Error(e) => write!(f, "{}", e),
            CellValue::Formula { cached, text } => match cached {
                Some(inner) => write!(f, "{}", inner),
                None => f.write_str(text),
            },
        }
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<CellError> for CellValue {
    fn from(e: CellError) -> Self {
        CellValue::Error(e)
    }
}

/// Error literals a cell can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    DivZero,
    Value,
    Ref,
    Name,
    Num,
    NotAvailable,
}

const ERROR_LITERALS: [(CellError, &str); 7] = [
    (CellError::Null, "#NULL!"),
    (CellError::DivZero, "#DIV/0!"),
    (CellError::Value, "#VALUE!"),
    (CellError::Ref, "#REF!"),
    (CellError::Name, "#NAME?"),
    (CellError::Num, "#NUM!"),
    (CellError::NotAvailable, "#N/A"),
];

impl CellError {
    pub fn as_str(&self) -> &'static str {
        ERROR_LITERALS
            .iter()
            .find(|(error, _)| error == self)
            .map_or("#VALUE!", |(_, literal)| *literal)
    }

    /// Parse an error literal, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        ERROR_LITERALS
            .iter()
            .find(|(_, literal)| literal.eq_ignore_ascii_case(s))
            .map(|(error, _)| *error)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
