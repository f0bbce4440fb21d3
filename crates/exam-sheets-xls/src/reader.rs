//! XLS reader
//!
//! The workbook stream is pulled out of the OLE2 compound document, split
//! into records, and read in two passes: the globals substream first (sheet
//! list, shared strings, number formats, date system), then the substream of
//! the selected worksheet.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::ops::Range;
use std::path::Path;

use exam_sheets_core::{CellData, CellError, CellValue, NumberFormat, SheetSelector, Worksheet};

use crate::biff::records;
use crate::biff::strings::{parse_sst, read_short_string, read_unicode_string};
use crate::biff::{self, BiffRecord, RecordCursor};
use crate::error::{XlsError, XlsResult};

/// BOUNDSHEET entry
#[derive(Debug)]
struct SheetEntry {
    name: String,
    sheet_type: u8,
}

/// What the globals substream says about the workbook
#[derive(Debug, Default)]
struct Globals {
    sheets: Vec<SheetEntry>,
    shared_strings: Vec<String>,
    date_1904: bool,
    /// Custom format codes by format id
    format_codes: HashMap<u16, String>,
    /// Format id of each XF record, by XF index
    xf_formats: Vec<u16>,
}

impl Globals {
    fn number_format(&self, xf: u16) -> NumberFormat {
        let id = self.xf_formats.get(usize::from(xf)).copied().unwrap_or(0);
        match self.format_codes.get(&id) {
            Some(code) => NumberFormat::from_string(code.as_str()),
            None => NumberFormat::from_id(u32::from(id)),
        }
    }

    fn worksheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets
            .iter()
            .filter(|s| s.sheet_type == records::SHEET_TYPE_WORKSHEET)
            .map(|s| s.name.as_str())
    }
}

/// XLS file reader
pub struct XlsReader;

impl XlsReader {
    /// Read the first worksheet from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsResult<Worksheet> {
        Self::read_sheet_file(path, &SheetSelector::First)
    }

    /// Read the selected worksheet from a file path.
    ///
    /// The file is closed when this returns, whether or not reading succeeded.
    pub fn read_sheet_file<P: AsRef<Path>>(
        path: P,
        selector: &SheetSelector,
    ) -> XlsResult<Worksheet> {
        let path = path.as_ref();
        log::debug!("opening legacy workbook {}", path.display());
        let file = File::open(path)?;
        Self::read_sheet(BufReader::new(file), selector)
    }

    /// Read the first worksheet from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsResult<Worksheet> {
        Self::read_sheet(reader, &SheetSelector::First)
    }

    /// Names of all worksheets, in workbook order
    pub fn sheet_names<R: Read + Seek>(reader: R) -> XlsResult<Vec<String>> {
        let stream = Self::workbook_stream(reader)?;
        let all = biff::read_records(&stream)?;
        let (globals, _) = Self::read_globals(&all)?;
        Ok(globals.worksheet_names().map(str::to_string).collect())
    }

    /// Read the selected worksheet from a reader
    pub fn read_sheet<R: Read + Seek>(reader: R, selector: &SheetSelector) -> XlsResult<Worksheet> {
        let stream = Self::workbook_stream(reader)?;
        let all = biff::read_records(&stream)?;
        let (globals, globals_end) = Self::read_globals(&all)?;

        // Substreams follow the globals in BOUNDSHEET order
        let sheet_records = &all[globals_end..];
        let substreams = split_substreams(sheet_records);
        let position = selector
            .position(globals.worksheet_names())
            .ok_or_else(|| XlsError::SheetNotFound(selector.to_string()))?;
        let (slot, entry) = globals
            .sheets
            .iter()
            .enumerate()
            .filter(|(_, s)| s.sheet_type == records::SHEET_TYPE_WORKSHEET)
            .nth(position)
            .ok_or_else(|| XlsError::SheetNotFound(selector.to_string()))?;
        let range = substreams.get(slot).cloned().ok_or_else(|| {
            XlsError::InvalidFormat(format!("no substream for sheet '{}'", entry.name))
        })?;

        let mut worksheet = Worksheet::new(entry.name.as_str());
        worksheet.set_date_1904(globals.date_1904);
        read_cells(&sheet_records[range], &globals, &mut worksheet)?;

        log::debug!(
            "read worksheet '{}' ({} rows, date1904={})",
            worksheet.name(),
            worksheet.rows().count(),
            globals.date_1904
        );
        Ok(worksheet)
    }

    fn workbook_stream<R: Read + Seek>(reader: R) -> XlsResult<Vec<u8>> {
        let mut container = cfb::CompoundFile::open(reader)?;
        let name = ["/Workbook", "/Book"]
            .into_iter()
            .find(|name| container.is_stream(name))
            .ok_or_else(|| XlsError::InvalidFormat("no Workbook stream".into()))?;

        let mut stream = Vec::new();
        container.open_stream(name)?.read_to_end(&mut stream)?;
        Ok(stream)
    }

    /// Globals and the index of the first record after them
    fn read_globals(all: &[BiffRecord]) -> XlsResult<(Globals, usize)> {
        let first = all
            .first()
            .filter(|r| r.id == records::BOF)
            .ok_or_else(|| XlsError::InvalidFormat("stream does not start with BOF".into()))?;
        let (version, kind) = biff::parse_bof(first)?;
        if kind != records::BOF_WORKBOOK_GLOBALS {
            return Err(XlsError::InvalidFormat(format!(
                "first substream has type 0x{:04X}, expected workbook globals",
                kind
            )));
        }
        if version != records::BIFF8_VERSION {
            return Err(XlsError::UnsupportedVersion(format!(
                "BIFF version 0x{:04X}, only BIFF8 (Excel 97 and later) is read",
                version
            )));
        }

        let mut globals = Globals::default();
        for (index, record) in all.iter().enumerate().skip(1) {
            match record.id {
                records::EOF => return Ok((globals, index + 1)),
                records::BOUNDSHEET => {
                    let mut cursor = record.cursor();
                    cursor.skip(5)?;
                    let sheet_type = cursor.u8()?;
                    let name = read_short_string(&mut cursor)?;
                    globals.sheets.push(SheetEntry { name, sheet_type });
                }
                records::SST => globals.shared_strings = parse_sst(record)?,
                records::DATEMODE => globals.date_1904 = record.cursor().u16()? == 1,
                records::FORMAT => {
                    let mut cursor = record.cursor();
                    let id = cursor.u16()?;
                    match read_unicode_string(&mut cursor) {
                        Ok(code) => {
                            globals.format_codes.insert(id, code);
                        }
                        Err(e) => log::debug!("skipping number format {}: {}", id, e),
                    }
                }
                records::XF => {
                    let mut cursor = record.cursor();
                    cursor.skip(2)?;
                    globals.xf_formats.push(cursor.u16()?);
                }
                _ => {}
            }
        }

        Err(XlsError::InvalidFormat("workbook globals have no EOF".into()))
    }
}

/// Record ranges of each top-level BOF..EOF substream, BOF and EOF excluded
fn split_substreams(sheet_records: &[BiffRecord]) -> Vec<Range<usize>> {
    let mut substreams = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (index, record) in sheet_records.iter().enumerate() {
        match record.id {
            records::BOF => {
                if depth == 0 {
                    start = index + 1;
                }
                depth += 1;
            }
            records::EOF if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    substreams.push(start..index);
                }
            }
            _ => {}
        }
    }
    substreams
}

/// Copy the cell records of one worksheet substream into `worksheet`
fn read_cells(body: &[BiffRecord], globals: &Globals, worksheet: &mut Worksheet) -> XlsResult<()> {
    // FORMULA with a text result; the text follows in a STRING record
    let mut pending_text: Option<(u32, u16, NumberFormat)> = None;
    // Charts embedded in the sheet have their own BOF..EOF
    let mut nested = 0usize;

    for record in body {
        match record.id {
            records::BOF => nested += 1,
            records::EOF => nested = nested.saturating_sub(1),
            _ if nested > 0 => {}
            records::STRING => {
                if let Some((row, col, format)) = pending_text.take() {
                    let text = read_unicode_string(&mut record.cursor())?;
                    let value = CellValue::formula_with_cached("", CellValue::String(text));
                    worksheet.set_cell_at(row, col, CellData::with_format(value, format));
                }
            }
            records::FORMULA => pending_text = read_formula(record, globals, worksheet)?,
            id => {
                pending_text = None;
                read_value_record(id, record, globals, worksheet)?;
            }
        }
    }
    Ok(())
}

/// Row, column and XF index that open every cell record
fn cell_header(cursor: &mut RecordCursor<'_>) -> XlsResult<(u32, u16, u16)> {
    Ok((u32::from(cursor.u16()?), cursor.u16()?, cursor.u16()?))
}

fn read_value_record(
    id: u16,
    record: &BiffRecord,
    globals: &Globals,
    worksheet: &mut Worksheet,
) -> XlsResult<()> {
    let mut cursor = record.cursor();
    let mut put = |row: u32, col: u16, xf: u16, value: CellValue| {
        worksheet.set_cell_at(row, col, CellData::with_format(value, globals.number_format(xf)));
    };

    match id {
        records::LABELSST => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            let index = cursor.u32()? as usize;
            match globals.shared_strings.get(index) {
                Some(text) => put(row, col, xf, CellValue::string(text.as_str())),
                None => log::warn!("cell ({}, {}) refers to missing shared string {}", row, col, index),
            }
        }
        records::LABEL => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            put(row, col, xf, CellValue::String(read_unicode_string(&mut cursor)?));
        }
        records::NUMBER => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            put(row, col, xf, CellValue::Number(cursor.f64()?));
        }
        records::RK => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            put(row, col, xf, CellValue::Number(cursor.rk()?));
        }
        records::BOOLERR => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            let value = cursor.u8()?;
            let value = match cursor.u8()? {
                0 => CellValue::Boolean(value != 0),
                _ => CellValue::Error(error_from_code(value)),
            };
            put(row, col, xf, value);
        }
        records::BLANK => {
            let (row, col, xf) = cell_header(&mut cursor)?;
            put(row, col, xf, CellValue::Empty);
        }
        // row, first column, one entry per column, last column
        records::MULRK | records::MULBLANK => {
            let entry = if id == records::MULRK { 6 } else { 2 };
            let row = u32::from(cursor.u16()?);
            let first = cursor.u16()?;
            let count = record.data.len().saturating_sub(6) / entry;
            for offset in 0..count {
                let Some(col) = u16::try_from(offset).ok().and_then(|o| first.checked_add(o)) else {
                    break;
                };
                let xf = cursor.u16()?;
                let value = if id == records::MULRK {
                    CellValue::Number(cursor.rk()?)
                } else {
                    CellValue::Empty
                };
                put(row, col, xf, value);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Store a FORMULA cell with its cached result.
///
/// The formula itself is kept as tokens in the file and is not decoded, so
/// the cell's text is empty. Returns the cell when its text result follows
/// in a STRING record.
fn read_formula(
    record: &BiffRecord,
    globals: &Globals,
    worksheet: &mut Worksheet,
) -> XlsResult<Option<(u32, u16, NumberFormat)>> {
    let mut cursor = record.cursor();
    let (row, col, xf) = cell_header(&mut cursor)?;
    let result = cursor.take(8)?;
    let format = globals.number_format(xf);

    // A result whose top two bytes are 0xFFFF is tagged by its first byte;
    // anything else is a plain double
    let cached = if result[6] == 0xFF && result[7] == 0xFF {
        match result[0] {
            0x00 => {
                let value = CellData::with_format(CellValue::formula(""), format.clone());
                worksheet.set_cell_at(row, col, value);
                return Ok(Some((row, col, format)));
            }
            0x01 => Some(CellValue::Boolean(result[2] != 0)),
            0x02 => Some(CellValue::Error(error_from_code(result[2]))),
            0x03 => Some(CellValue::String(String::new())),
            other => {
                log::debug!("cell ({}, {}) has unknown formula result type {}", row, col, other);
                None
            }
        }
    } else {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(result);
        Some(CellValue::Number(f64::from_le_bytes(bytes)))
    };

    let value = match cached {
        Some(cached) => CellValue::formula_with_cached("", cached),
        None => CellValue::formula(""),
    };
    worksheet.set_cell_at(row, col, CellData::with_format(value, format));
    Ok(None)
}

fn error_from_code(code: u8) -> CellError {
    match code {
        0x00 => CellError::Null,
        0x07 => CellError::DivZero,
        0x0F => CellError::Value,
        0x17 => CellError::Ref,
        0x1D => CellError::Name,
        0x24 => CellError::Num,
        0x2A => CellError::NotAvailable,
        _ => CellError::Value,
    }
}
