//! CSV writer

use std::fs::File;
use std::io::Write;
use std::path::Path;

use exam_sheets::ExamRecord;

use crate::error::CsvResult;
use crate::options::{CsvWriteOptions, LineTerminator};

/// Writes exam records as CSV
pub struct ExamCsvWriter;

impl ExamCsvWriter {
    /// Write records to a CSV file, replacing it if it exists
    pub fn write_file<P: AsRef<Path>>(
        records: &[ExamRecord],
        path: P,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Self::write(records, file, options)?;
        log::info!("wrote {} records to {}", records.len(), path.display());
        Ok(())
    }

    /// Write records to a writer. The header is written even when there are
    /// no records.
    pub fn write<W: Write>(
        records: &[ExamRecord],
        writer: W,
        options: &CsvWriteOptions,
    ) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(terminator)
            .from_writer(writer);

        if options.write_header {
            csv_writer.write_record(ExamRecord::FIELD_NAMES)?;
        }
        for record in records {
            csv_writer.write_record(record.to_fields())?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render records to a CSV string
    pub fn to_string(records: &[ExamRecord], options: &CsvWriteOptions) -> CsvResult<String> {
        let mut buffer = Vec::new();
        Self::write(records, &mut buffer, options)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
