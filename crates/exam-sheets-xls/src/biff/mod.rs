//! BIFF8 record stream
//!
//! A workbook stream is a flat run of records, each a 2-byte id, a 2-byte
//! body length and the body. Bodies longer than 8224 bytes continue in
//! CONTINUE records; those are folded into the record they extend, and the
//! offsets where each continuation starts are kept because strings that
//! cross one restate their encoding there.

pub mod cursor;
pub mod records;
pub mod strings;

pub use cursor::{decode_rk, RecordCursor};

use crate::error::{XlsError, XlsResult};

/// One record with its CONTINUE bodies appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiffRecord {
    pub id: u16,
    pub data: Vec<u8>,
    /// Offsets into `data` where a CONTINUE body begins
    pub continuations: Vec<usize>,
}

impl BiffRecord {
    pub fn cursor(&self) -> RecordCursor<'_> {
        RecordCursor::new(&self.data)
    }
}

/// Split a workbook stream into records
pub fn read_records(stream: &[u8]) -> XlsResult<Vec<BiffRecord>> {
    let mut records: Vec<BiffRecord> = Vec::new();
    let mut cursor = RecordCursor::new(stream);

    while cursor.remaining() >= 4 {
        let id = cursor.u16()?;
        let len = usize::from(cursor.u16()?);
        let body = cursor.take(len).map_err(|_| {
            XlsError::Parse(format!(
                "record 0x{:04X} at byte {} is cut short",
                id,
                cursor.position() - 4
            ))
        })?;

        if id == records::CONTINUE {
            match records.last_mut() {
                Some(previous) => {
                    previous.continuations.push(previous.data.len());
                    previous.data.extend_from_slice(body);
                }
                None => log::debug!("CONTINUE record with nothing to continue"),
            }
        } else {
            records.push(BiffRecord {
                id,
                data: body.to_vec(),
                continuations: Vec::new(),
            });
        }
    }

    Ok(records)
}

/// `(version, substream type)` of a BOF record
pub fn parse_bof(record: &BiffRecord) -> XlsResult<(u16, u16)> {
    let mut cursor = record.cursor();
    Ok((cursor.u16()?, cursor.u16()?))
}
