//! Little-endian reads over a record body

use crate::error::{XlsError, XlsResult};

/// Forward-only reader over a byte slice
#[derive(Debug, Clone)]
pub struct RecordCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// The next `n` bytes
    pub fn take(&mut self, n: usize) -> XlsResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                XlsError::Parse(format!(
                    "need {} bytes at offset {}, record has {}",
                    n,
                    self.pos,
                    self.data.len()
                ))
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, n: usize) -> XlsResult<()> {
        self.take(n).map(|_| ())
    }

    pub fn u8(&mut self) -> XlsResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> XlsResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> XlsResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn f64(&mut self) -> XlsResult<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    /// An RK-compressed number
    pub fn rk(&mut self) -> XlsResult<f64> {
        self.u32().map(decode_rk)
    }
}

/// Decode an RK number.
///
/// Bit 0 divides the result by 100. Bit 1 selects a signed 30-bit integer
/// in bits 2..32; otherwise bits 2..32 are the high bits of an IEEE double
/// whose low 34 bits are zero.
pub fn decode_rk(rk: u32) -> f64 {
    let value = if rk & 0x02 != 0 {
        f64::from((rk as i32) >> 2)
    } else {
        f64::from_bits(u64::from(rk & !0x03) << 32)
    };
    if rk & 0x01 != 0 {
        value / 100.0
    } else {
        value
    }
}
