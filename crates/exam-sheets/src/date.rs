//! Date text parsing
//!
//! Dates reach the parser as normalized cell text: either typed in by hand
//! (`16.12.2024`, `16.12.2024 14:00`) or produced by the normalizer from a
//! date-formatted serial number. Anything else is unparseable, which is an
//! expected outcome and yields `None`.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Display format for timestamps, also the first input format tried
pub const TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Input formats tried in order by [`DateParser::default`]
pub const DEFAULT_DATE_FORMATS: &[&str] = &[TIMESTAMP_FORMAT, "%d.%m.%Y"];

/// Parses date text against an ordered list of `chrono` format strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParser {
    formats: Vec<String>,
}

impl DateParser {
    /// Parser trying `formats` in order; the first successful parse wins
    pub fn new<I, S>(formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            formats: formats.into_iter().map(Into::into).collect(),
        }
    }

    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    /// Parse `text` into a timestamp.
    ///
    /// The input is trimmed. A date without a time part (a `.` but no `:`)
    /// is read as midnight. Date-only formats also yield midnight.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut candidates = Vec::with_capacity(2);
        if text.contains('.') && !text.contains(':') {
            candidates.push(format!("{} 00:00", text));
        }
        candidates.push(text.to_string());

        for format in &self.formats {
            for candidate in &candidates {
                if let Some(parsed) = parse_with(candidate, format) {
                    return Some(parsed);
                }
            }
        }

        log::debug!("unparseable date '{}'", text);
        None
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS.iter().copied())
    }
}

// chrono accepts any width for numeric fields (`24` for `%Y`, `1` for `%m`).
// A parse only counts when printing the result with the same format gives the
// input back; the day alone may drop its leading zero.
fn parse_with(text: &str, format: &str) -> Option<NaiveDateTime> {
    let parsed = NaiveDateTime::parse_from_str(text, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })?;

    let unpadded_day = format.replace("%d", "%-d");
    let exact = parsed.format(format).to_string() == text
        || parsed.format(&unpadded_day).to_string() == text;
    exact.then_some(parsed)
}

/// Parse with the default formats
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    DateParser::default().parse(text)
}

/// Render a timestamp the way the normalizer and exports show it
pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
