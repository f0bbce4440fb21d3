//! BIFF8 strings
//!
//! A string is a character count, an option byte and the characters. Bit 0
//! of the option byte picks UTF-16LE over one byte per character; bit 3
//! announces rich-text runs and bit 2 phonetic data, both skipped here.
//! When the characters of a shared string cross into a CONTINUE record, the
//! continuation opens with a fresh option byte and may switch width.

use super::cursor::RecordCursor;
use super::BiffRecord;
use crate::error::{XlsError, XlsResult};

const WIDE: u8 = 0x01;
const PHONETIC: u8 = 0x04;
const RICH: u8 = 0x08;

/// String with a 1-byte length, as in BOUNDSHEET
pub fn read_short_string(cursor: &mut RecordCursor<'_>) -> XlsResult<String> {
    let count = usize::from(cursor.u8()?);
    let options = cursor.u8()?;
    read_chars(cursor, count, options, &[])
}

/// String with a 2-byte length, as in LABEL, STRING and FORMAT
pub fn read_unicode_string(cursor: &mut RecordCursor<'_>) -> XlsResult<String> {
    read_string(cursor, &[])
}

/// The shared string table, in index order.
///
/// A malformed entry ends the table; the strings before it are kept.
pub fn parse_sst(record: &BiffRecord) -> XlsResult<Vec<String>> {
    let mut cursor = record.cursor();
    let _total_refs = cursor.u32()?;
    let unique = cursor.u32()? as usize;

    let mut strings = Vec::with_capacity(unique.min(record.data.len()));
    for index in 0..unique {
        match read_string(&mut cursor, &record.continuations) {
            Ok(text) => strings.push(text),
            Err(e) => {
                log::warn!("shared string {} of {} unreadable: {}", index, unique, e);
                break;
            }
        }
    }
    Ok(strings)
}

fn read_string(cursor: &mut RecordCursor<'_>, continuations: &[usize]) -> XlsResult<String> {
    let count = usize::from(cursor.u16()?);
    let options = cursor.u8()?;
    let runs = if options & RICH != 0 { cursor.u16()? } else { 0 };
    let phonetic = if options & PHONETIC != 0 { cursor.u32()? } else { 0 };

    let text = read_chars(cursor, count, options, continuations)?;
    cursor.skip(usize::from(runs) * 4)?;
    cursor.skip(phonetic as usize)?;
    Ok(text)
}

fn read_chars(
    cursor: &mut RecordCursor<'_>,
    count: usize,
    options: u8,
    continuations: &[usize],
) -> XlsResult<String> {
    let start = cursor.position();
    let mut wide = options & WIDE != 0;
    let mut units: Vec<u16> = Vec::with_capacity(count);

    while units.len() < count {
        let pos = cursor.position();
        if pos > start && continuations.contains(&pos) {
            wide = cursor.u8()? & WIDE != 0;
            continue;
        }

        let segment_end = continuations
            .iter()
            .copied()
            .find(|&offset| offset > pos)
            .unwrap_or_else(|| cursor.len());
        let width = if wide { 2 } else { 1 };
        let fit = ((segment_end - pos) / width).min(count - units.len());
        if fit == 0 {
            return Err(XlsError::Parse(format!(
                "string of {} characters runs past the record",
                count
            )));
        }

        let bytes = cursor.take(fit * width)?;
        if wide {
            units.extend(bytes.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])));
        } else {
            units.extend(bytes.iter().map(|&b| u16::from(b)));
        }
    }

    Ok(String::from_utf16_lossy(&units))
}
