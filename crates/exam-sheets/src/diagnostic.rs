//! Diagnostics collected during an extraction run

use std::fmt;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Expected, recoverable conditions such as an unparseable date
    Info,
    /// A value was dropped, e.g. a formula that could not be evaluated
    Warning,
    /// A qualifying row was rejected
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message about the run, optionally tied to a 0-based source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub row: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new<S: Into<String>>(severity: Severity, row: Option<u32>, message: S) -> Self {
        Self {
            severity,
            row,
            message: message.into(),
        }
    }

    pub fn info<S: Into<String>>(row: u32, message: S) -> Self {
        Self::new(Severity::Info, Some(row), message)
    }

    pub fn warning<S: Into<String>>(row: u32, message: S) -> Self {
        Self::new(Severity::Warning, Some(row), message)
    }

    pub fn error<S: Into<String>>(row: u32, message: S) -> Self {
        Self::new(Severity::Error, Some(row), message)
    }
}

impl fmt::Display for Diagnostic {
    // Rows print 1-based, the way spreadsheet applications number them
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "[{}] row {}: {}", self.severity, row + 1, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}
