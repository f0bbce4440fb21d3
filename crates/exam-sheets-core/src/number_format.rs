//! Number format types

/// Number format of a cell, as far as the reader needs to know it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    /// General format (default)
    #[default]
    General,

    /// Built-in format by ID
    BuiltIn(u32),

    /// Custom format string
    Custom(String),
}

impl NumberFormat {
    /// Create a number format from a format string
    pub fn from_string<S: Into<String>>(format: S) -> Self {
        NumberFormat::Custom(format.into())
    }

    /// Create a built-in format by ID
    pub fn from_id(id: u32) -> Self {
        match id {
            0 => NumberFormat::General,
            id => NumberFormat::BuiltIn(id),
        }
    }

    /// Short date (mm-dd-yy)
    pub fn date_short() -> Self {
        NumberFormat::BuiltIn(14)
    }

    /// Date and time (m/d/yy h:mm)
    pub fn datetime() -> Self {
        NumberFormat::BuiltIn(22)
    }

    /// Check if this is a date/time format
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22 | 27..=36 | 45..=47 | 50..=58),
            NumberFormat::Custom(s) => is_date_format_code(s),
            NumberFormat::General => false,
        }
    }
}

/// Scan a custom format code for date/time tokens.
///
/// Quoted literals, backslash escapes and bracketed sections (colors,
/// conditions, locales) are skipped; elapsed-time brackets like `[h]` count.
fn is_date_format_code(code: &str) -> bool {
    // Only the positive section decides
    let section = code.split(';').next().unwrap_or("");
    if section.eq_ignore_ascii_case("general") {
        return false;
    }

    let mut chars = section.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for b in chars.by_ref() {
                    if b == ']' {
                        break;
                    }
                    inner.push(b);
                }
                let inner = inner.to_ascii_lowercase();
                if !inner.is_empty() && inner.chars().all(|ch| matches!(ch, 'h' | 'm' | 's')) {
                    return true;
                }
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }

    false
}
