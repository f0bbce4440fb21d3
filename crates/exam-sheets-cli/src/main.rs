//! Exams CLI - pull exam schedules out of spreadsheet exports

mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use exam_sheets::prelude::*;
use exam_sheets::{open_sheet, truncate};
use exam_sheets_csv::{CsvWriteOptions, ExamCsvWriter};

#[derive(Parser)]
#[command(name = "exams")]
#[command(
    author,
    version,
    about = "Extract exam schedules from spreadsheet exports"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract exam records and print them as a table
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// Also write the records to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only records with this course code
        #[arg(long)]
        course: Option<String>,

        /// Only records with a field containing this text
        #[arg(long)]
        search: Option<String>,

        /// Print the summary line only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show where the header is and how the first data rows are read
    Analyze {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the distinct course codes in a file
    Codes {
        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Input spreadsheet (xlsx or xls)
    input: PathBuf,

    /// Worksheet, by 0-based index or by name (default: first)
    #[arg(short, long)]
    sheet: Option<String>,

    /// Text that marks the header row
    #[arg(long, default_value = exam_sheets::DEFAULT_HEADER_MARKER)]
    marker: String,

    /// Number of leading rows searched for the header
    #[arg(long, default_value_t = exam_sheets::DEFAULT_HEADER_SEARCH_ROWS)]
    search_rows: u32,

    /// Column layout: `sequential`, `processor` or a JSON layout file
    #[arg(long, default_value = "sequential")]
    mapping: String,
}

impl SourceArgs {
    fn selector(&self) -> SheetSelector {
        parse_sheet_selector(self.sheet.as_deref())
    }

    fn options(&self) -> Result<ExtractOptions> {
        Ok(ExtractOptions::new()
            .with_header_marker(self.marker.as_str())
            .with_header_search_rows(self.search_rows)
            .with_column_mapping(resolve_mapping(&self.mapping)?)?)
    }

    fn open(&self) -> Result<Worksheet> {
        open_sheet(&self.input, &self.selector())
            .with_context(|| format!("Failed to open '{}'", self.input.display()))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let quiet = matches!(cli.command, Commands::Extract { quiet: true, .. });
    logging::init(cli.verbose, quiet);

    match cli.command {
        Commands::Extract {
            source,
            output,
            course,
            search,
            quiet,
        } => run_extract(
            &source,
            output.as_deref(),
            course.as_deref(),
            search.as_deref(),
            quiet,
        ),
        Commands::Analyze { source } => run_analyze(&source),
        Commands::Codes { source } => list_codes(&source),
    }
}

fn run_extract(
    source: &SourceArgs,
    output: Option<&Path>,
    course: Option<&str>,
    search: Option<&str>,
    quiet: bool,
) -> Result<()> {
    let options = source.options()?;
    let sheet = source.open()?;
    tracing::info!("read sheet '{}' from {}", sheet.name(), source.input.display());

    let result = extract(&sheet, &options)
        .with_context(|| format!("No exam data in '{}'", source.input.display()))?;

    let records: Vec<ExamRecord> = result
        .records
        .iter()
        .filter(|r| course.map_or(true, |c| r.course_code().as_str() == c.trim()))
        .filter(|r| search.map_or(true, |s| r.matches_text(s)))
        .cloned()
        .collect();

    let mut stdout = io::stdout().lock();
    if !quiet {
        write_table(&mut stdout, &records).context("Failed to write to stdout")?;
        for diagnostic in result.diagnostics_at_least(Severity::Warning) {
            eprintln!("{}", diagnostic);
        }
    }
    writeln!(stdout, "{}", summary(&result, records.len())).context("Failed to write to stdout")?;

    if let Some(path) = output {
        ExamCsvWriter::write_file(&records, path, &CsvWriteOptions::default())
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        eprintln!("Wrote {} records to '{}'", records.len(), path.display());
    }

    Ok(())
}

fn run_analyze(source: &SourceArgs) -> Result<()> {
    let options = source.options()?;
    let sheet = source.open()?;

    println!("File: {}", source.input.display());
    println!("Sheet: {}", sheet.name());
    print!("{}", analyze(&sheet, &options));
    Ok(())
}

fn list_codes(source: &SourceArgs) -> Result<()> {
    let options = source.options()?;
    let sheet = source.open()?;
    let result = extract(&sheet, &options)
        .with_context(|| format!("No exam data in '{}'", source.input.display()))?;

    for code in result.course_codes() {
        println!("{}", code);
    }
    Ok(())
}

/// A number selects by index, anything else by name
fn parse_sheet_selector(sheet: Option<&str>) -> SheetSelector {
    match sheet.map(str::trim) {
        None | Some("") => SheetSelector::First,
        Some(text) => match text.parse::<usize>() {
            Ok(index) => SheetSelector::Index(index),
            Err(_) => SheetSelector::Name(text.to_string()),
        },
    }
}

/// A preset name, or the path of a JSON layout
fn resolve_mapping(mapping: &str) -> Result<ColumnMapping> {
    if let Some(preset) = ColumnMapping::preset(mapping) {
        return Ok(preset);
    }
    let path = Path::new(mapping);
    if !path.exists() {
        bail!(
            "Unknown column mapping '{}' (expected sequential, processor or a JSON file)",
            mapping
        );
    }
    ColumnMapping::from_json_file(path)
        .with_context(|| format!("Invalid column mapping '{}'", path.display()))
}

const COLUMNS: [(&str, usize); 7] = [
    ("Code", 10),
    ("Name", 30),
    ("Type", 12),
    ("Start", 16),
    ("End", 16),
    ("Platform", 12),
    ("Responsible", 20),
];

fn write_table<W: Write>(out: &mut W, records: &[ExamRecord]) -> io::Result<()> {
    let header: Vec<&str> = COLUMNS.iter().map(|(name, _)| *name).collect();
    write_row(out, &header)?;
    let rule: Vec<String> = COLUMNS.iter().map(|(_, width)| "-".repeat(*width)).collect();
    write_row(out, &rule)?;

    for record in records {
        let start = record.formatted_start();
        let end = record.formatted_end();
        write_row(
            out,
            &[
                record.course_code().as_str(),
                record.course_name.as_str(),
                record.exam_type.as_str(),
                start.as_str(),
                end.as_str(),
                record.platform.as_str(),
                record.responsible.as_str(),
            ],
        )?;
    }
    Ok(())
}

fn write_row<W: Write, S: AsRef<str>>(out: &mut W, cells: &[S]) -> io::Result<()> {
    let line: Vec<String> = COLUMNS
        .iter()
        .zip(cells)
        .map(|((_, width), cell)| {
            format!("{:<width$}", truncate(cell.as_ref(), *width), width = *width)
        })
        .collect();
    writeln!(out, "{}", line.join("  ").trim_end())
}

fn summary(result: &ExtractionResult, shown: usize) -> String {
    let mut line = format!(
        "{} records from {} rows after header row {} ({} skipped, {} failed)",
        result.records_produced,
        result.rows_scanned,
        result.header_row + 1,
        result.rows_skipped,
        result.rows_failed
    );
    if shown != result.len() {
        line.push_str(&format!(", {} shown", shown));
    }
    line
}
