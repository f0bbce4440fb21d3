//! Reading BIFF8 workbooks built in memory and on disk

mod common;

use std::io::Cursor;

use common::*;
use exam_sheets_core::{CellError, CellValue, SheetSelector, TabularSource, Worksheet};
use exam_sheets_xls::{XlsError, XlsReader};
use pretty_assertions::assert_eq;

const STRINGS: &[&str] = &["Emnekode", "ITF10214", "Vår"];

fn exam_sheet() -> Sheet {
    Sheet::worksheet(
        "Eksamen",
        vec![
            label_sst(0, 0, 0),
            label_sst(1, 0, 1),
            label(1, 1, "Datasikkerhet"),
            rk_int(1, 3, 1000),
            number(1, 5, XF_TIMESTAMP, 45642.375),
            boolerr(1, 10, 1, false),
            boolerr(1, 11, 0x2A, true),
            formula(2, 0, tagged_result(0x00, 0)),
            string_result("ITF20215"),
            formula(2, 1, 2.5f64.to_le_bytes()),
            formula(2, 2, tagged_result(0x01, 1)),
            formula(2, 3, tagged_result(0x02, 0x07)),
            mulrk_ints(3, 0, XF_DATE, &[45642, 45643]),
        ],
    )
}

fn workbook(date_1904: bool) -> Vec<u8> {
    let sheets = [
        Sheet::worksheet("Forside", vec![label_sst(0, 0, 2)]),
        Sheet::chart("Diagram"),
        exam_sheet(),
    ];
    compound_file(&workbook_stream(0x0600, date_1904, STRINGS, &sheets))
}

fn value(sheet: &Worksheet, row: u32, col: u16) -> CellValue {
    sheet.cell_at(row, col).map(|c| c.value.clone()).unwrap_or_default()
}

#[test]
fn reads_values_of_every_record_type() {
    let sheet =
        XlsReader::read_sheet(Cursor::new(workbook(false)), &SheetSelector::Index(1)).unwrap();
    assert_eq!(sheet.name(), "Eksamen");
    assert!(!sheet.date_1904());

    assert_eq!(value(&sheet, 0, 0), CellValue::string("Emnekode"));
    assert_eq!(value(&sheet, 1, 0), CellValue::string("ITF10214"));
    assert_eq!(value(&sheet, 1, 1), CellValue::string("Datasikkerhet"));
    assert_eq!(value(&sheet, 1, 3), CellValue::Number(1000.0));
    assert_eq!(value(&sheet, 1, 5), CellValue::Number(45642.375));
    assert_eq!(value(&sheet, 1, 10), CellValue::Boolean(true));
    assert_eq!(value(&sheet, 1, 11), CellValue::Error(CellError::NotAvailable));

    assert_eq!(value(&sheet, 2, 0).as_string(), Some("ITF20215"));
    assert_eq!(
        value(&sheet, 2, 1),
        CellValue::formula_with_cached("", CellValue::Number(2.5))
    );
    assert_eq!(
        value(&sheet, 2, 2),
        CellValue::formula_with_cached("", CellValue::Boolean(true))
    );
    assert_eq!(
        value(&sheet, 2, 3),
        CellValue::formula_with_cached("", CellValue::Error(CellError::DivZero))
    );

    assert_eq!(value(&sheet, 3, 0), CellValue::Number(45642.0));
    assert_eq!(value(&sheet, 3, 1), CellValue::Number(45643.0));
}

#[test]
fn number_formats_mark_dates() {
    let sheet = XlsReader::read_sheet(
        Cursor::new(workbook(false)),
        &SheetSelector::Name("eksamen".into()),
    )
    .unwrap();

    let cell = |row, col| sheet.cell_at(row, col).unwrap();
    assert!(cell(1, 5).is_date_formatted());
    assert!(cell(3, 0).is_date_formatted());
    assert!(!cell(1, 3).is_date_formatted());
    assert!(!cell(0, 0).is_date_formatted());
}

#[test]
fn sheet_names_skip_charts() {
    let names = XlsReader::sheet_names(Cursor::new(workbook(true))).unwrap();
    assert_eq!(names, vec!["Forside".to_string(), "Eksamen".to_string()]);

    let first = XlsReader::read(Cursor::new(workbook(true))).unwrap();
    assert_eq!(first.name(), "Forside");
    assert!(first.date_1904());
    assert_eq!(value(&first, 0, 0), CellValue::string("Vår"));

    assert!(matches!(
        XlsReader::read_sheet(Cursor::new(workbook(true)), &SheetSelector::Index(2)),
        Err(XlsError::SheetNotFound(_))
    ));
    assert!(matches!(
        XlsReader::read_sheet(
            Cursor::new(workbook(true)),
            &SheetSelector::Name("Diagram".into())
        ),
        Err(XlsError::SheetNotFound(_))
    ));
}

#[test]
fn reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("eksamen.xls");
    std::fs::write(&path, workbook(false)).unwrap();

    let sheet = XlsReader::read_sheet_file(&path, &SheetSelector::Name("Eksamen".into())).unwrap();
    assert_eq!(value(&sheet, 1, 0), CellValue::string("ITF10214"));
    assert!(XlsReader::read_file(dir.path().join("missing.xls")).is_err());
}

#[test]
fn rejects_non_biff8_input() {
    let not_ole = XlsReader::read(Cursor::new(b"Emnekode;Emnenavn\n".to_vec())).unwrap_err();
    assert!(matches!(not_ole, XlsError::Io(_)));

    let biff5 = compound_file(&workbook_stream(0x0500, false, &[], &[exam_sheet()]));
    assert!(matches!(
        XlsReader::read(Cursor::new(biff5)),
        Err(XlsError::UnsupportedVersion(_))
    ));
}
