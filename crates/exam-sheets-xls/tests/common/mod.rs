//! Builds small BIFF8 workbooks inside a compound document

#![allow(dead_code)]

use std::io::{Cursor, Write};

pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const BOUNDSHEET: u16 = 0x0085;
pub const SST: u16 = 0x00FC;
pub const DATEMODE: u16 = 0x0022;
pub const FORMAT: u16 = 0x041E;
pub const XF: u16 = 0x00E0;
pub const LABELSST: u16 = 0x00FD;
pub const LABEL: u16 = 0x0204;
pub const NUMBER: u16 = 0x0203;
pub const RK: u16 = 0x027E;
pub const MULRK: u16 = 0x00BD;
pub const BOOLERR: u16 = 0x0205;
pub const FORMULA: u16 = 0x0006;
pub const STRING: u16 = 0x0207;

/// XF 0 is General, XF 1 the built-in short date, XF 2 a custom timestamp
pub const XF_GENERAL: u16 = 0;
pub const XF_DATE: u16 = 1;
pub const XF_TIMESTAMP: u16 = 2;

pub fn record(id: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = id.to_le_bytes().to_vec();
    bytes.extend_from_slice(&(body.len() as u16).to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u8).collect()
}

/// 2-byte length, compressed characters
pub fn unicode_string(text: &str) -> Vec<u8> {
    let mut bytes = (text.chars().count() as u16).to_le_bytes().to_vec();
    bytes.push(0);
    bytes.extend(latin1(text));
    bytes
}

fn cell_header(row: u16, col: u16, xf: u16) -> Vec<u8> {
    [row, col, xf].iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn label_sst(row: u16, col: u16, index: u32) -> Vec<u8> {
    let mut body = cell_header(row, col, XF_GENERAL);
    body.extend_from_slice(&index.to_le_bytes());
    record(LABELSST, &body)
}

pub fn label(row: u16, col: u16, text: &str) -> Vec<u8> {
    let mut body = cell_header(row, col, XF_GENERAL);
    body.extend(unicode_string(text));
    record(LABEL, &body)
}

pub fn number(row: u16, col: u16, xf: u16, value: f64) -> Vec<u8> {
    let mut body = cell_header(row, col, xf);
    body.extend_from_slice(&value.to_le_bytes());
    record(NUMBER, &body)
}

/// RK cell holding a whole number
pub fn rk_int(row: u16, col: u16, value: i32) -> Vec<u8> {
    let mut body = cell_header(row, col, XF_GENERAL);
    body.extend_from_slice(&(((value << 2) as u32) | 0x02).to_le_bytes());
    record(RK, &body)
}

pub fn mulrk_ints(row: u16, first_col: u16, xf: u16, values: &[i32]) -> Vec<u8> {
    let mut body = [row, first_col].iter().flat_map(|v| v.to_le_bytes()).collect::<Vec<u8>>();
    for value in values {
        body.extend_from_slice(&xf.to_le_bytes());
        body.extend_from_slice(&(((value << 2) as u32) | 0x02).to_le_bytes());
    }
    body.extend_from_slice(&(first_col + values.len() as u16 - 1).to_le_bytes());
    record(MULRK, &body)
}

pub fn boolerr(row: u16, col: u16, value: u8, is_error: bool) -> Vec<u8> {
    let mut body = cell_header(row, col, XF_GENERAL);
    body.extend_from_slice(&[value, u8::from(is_error)]);
    record(BOOLERR, &body)
}

/// FORMULA with an 8-byte result field and an empty token stream
pub fn formula(row: u16, col: u16, result: [u8; 8]) -> Vec<u8> {
    let mut body = cell_header(row, col, XF_GENERAL);
    body.extend_from_slice(&result);
    body.extend_from_slice(&[0; 6]);
    body.extend_from_slice(&[0, 0]);
    record(FORMULA, &body)
}

pub fn tagged_result(tag: u8, payload: u8) -> [u8; 8] {
    [tag, 0, payload, 0, 0, 0, 0xFF, 0xFF]
}

pub fn string_result(text: &str) -> Vec<u8> {
    record(STRING, &unicode_string(text))
}

/// A sheet entry: name, BOUNDSHEET type and its substream records
pub struct Sheet {
    pub name: &'static str,
    pub sheet_type: u8,
    pub cells: Vec<Vec<u8>>,
}

impl Sheet {
    pub fn worksheet(name: &'static str, cells: Vec<Vec<u8>>) -> Self {
        Self { name, sheet_type: 0x00, cells }
    }

    pub fn chart(name: &'static str) -> Self {
        Self { name, sheet_type: 0x02, cells: Vec::new() }
    }
}

fn bof(version: u16, kind: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&version.to_le_bytes());
    body.extend_from_slice(&kind.to_le_bytes());
    body.extend_from_slice(&[0; 12]);
    record(BOF, &body)
}

/// The workbook stream for `sheets`, sharing `strings`
pub fn workbook_stream(version: u16, date_1904: bool, strings: &[&str], sheets: &[Sheet]) -> Vec<u8> {
    let mut stream = bof(version, 0x0005);
    stream.extend(record(DATEMODE, &u16::from(date_1904).to_le_bytes()));

    let mut format = 164u16.to_le_bytes().to_vec();
    format.extend(unicode_string("dd.mm.yyyy hh:mm"));
    stream.extend(record(FORMAT, &format));
    for format_id in [0u16, 14, 164] {
        let mut xf = vec![0, 0];
        xf.extend_from_slice(&format_id.to_le_bytes());
        xf.resize(20, 0);
        stream.extend(record(XF, &xf));
    }

    for sheet in sheets {
        let mut body = vec![0, 0, 0, 0, 0, sheet.sheet_type];
        body.push(sheet.name.chars().count() as u8);
        body.push(0);
        body.extend(latin1(sheet.name));
        stream.extend(record(BOUNDSHEET, &body));
    }

    let mut sst = (strings.len() as u32).to_le_bytes().to_vec();
    sst.extend_from_slice(&(strings.len() as u32).to_le_bytes());
    for text in strings {
        sst.extend(unicode_string(text));
    }
    stream.extend(record(SST, &sst));
    stream.extend(record(EOF, &[]));

    for sheet in sheets {
        let kind = if sheet.sheet_type == 0x02 { 0x0020 } else { 0x0010 };
        stream.extend(bof(version, kind));
        for cell in &sheet.cells {
            stream.extend_from_slice(cell);
        }
        stream.extend(record(EOF, &[]));
    }
    stream
}

/// Wrap a workbook stream in a compound document
pub fn compound_file(stream: &[u8]) -> Vec<u8> {
    let mut container = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    {
        let mut workbook = container.create_stream("/Workbook").unwrap();
        workbook.write_all(stream).unwrap();
        workbook.flush().unwrap();
    }
    container.flush().unwrap();
    container.into_inner().into_inner()
}
