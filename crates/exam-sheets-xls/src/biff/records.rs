//! BIFF8 record ids read by this crate

pub const BOF: u16 = 0x0809;
pub const EOF: u16 = 0x000A;
pub const CONTINUE: u16 = 0x003C;

// Workbook globals
pub const BOUNDSHEET: u16 = 0x0085;
pub const SST: u16 = 0x00FC;
pub const DATEMODE: u16 = 0x0022;
pub const FORMAT: u16 = 0x041E;
pub const XF: u16 = 0x00E0;

// Cells
pub const LABELSST: u16 = 0x00FD;
pub const LABEL: u16 = 0x0204;
pub const NUMBER: u16 = 0x0203;
pub const RK: u16 = 0x027E;
pub const MULRK: u16 = 0x00BD;
pub const BLANK: u16 = 0x0201;
pub const MULBLANK: u16 = 0x00BE;
pub const BOOLERR: u16 = 0x0205;
pub const FORMULA: u16 = 0x0006;
pub const STRING: u16 = 0x0207;

/// `dt` field of a BOF record
pub const BOF_WORKBOOK_GLOBALS: u16 = 0x0005;
pub const BOF_WORKSHEET: u16 = 0x0010;

pub const BIFF8_VERSION: u16 = 0x0600;

/// BOUNDSHEET sheet type of an ordinary worksheet
pub const SHEET_TYPE_WORKSHEET: u8 = 0x00;
