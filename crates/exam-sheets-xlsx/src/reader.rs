//! XLSX reader

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::read_number_formats;
use exam_sheets_core::{
    CellAddress, CellData, CellError, CellValue, NumberFormat, SheetSelector, Worksheet,
};

/// Decode Excel's `_xHHHH_` escape sequences in strings.
///
/// `_x000d_` is a carriage return, `_x000a_` a line feed and `_x005f_` an
/// escaped underscore. Anything that is not a complete sequence is kept.
fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(ch) => {
                result.push(ch);
                rest = &candidate[7..];
            }
            None => {
                result.push('_');
                rest = &candidate[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Sheet entry from `xl/workbook.xml`
struct SheetEntry {
    name: String,
    rel_id: String,
}

/// Workbook-level information shared by every sheet
struct WorkbookInfo {
    sheets: Vec<SheetEntry>,
    date_1904: bool,
}

/// XLSX file reader
pub struct XlsxReader;

impl XlsxReader {
    /// Read the first worksheet from a file path.
    ///
    /// The file is closed when this returns, whether or not reading succeeded.
    pub fn read_file<P: AsRef<Path>>(path: P) -> XlsxResult<Worksheet> {
        Self::read_sheet_file(path, &SheetSelector::First)
    }

    /// Read the selected worksheet from a file path
    pub fn read_sheet_file<P: AsRef<Path>>(
        path: P,
        selector: &SheetSelector,
    ) -> XlsxResult<Worksheet> {
        let path = path.as_ref();
        log::debug!("opening workbook {}", path.display());
        let file = File::open(path)?;
        Self::read_sheet(BufReader::new(file), selector)
    }

    /// Read the first worksheet from a reader
    pub fn read<R: Read + Seek>(reader: R) -> XlsxResult<Worksheet> {
        Self::read_sheet(reader, &SheetSelector::First)
    }

    /// Names of all worksheets, in workbook order
    pub fn sheet_names<R: Read + Seek>(reader: R) -> XlsxResult<Vec<String>> {
        let mut archive = Self::open_archive(reader)?;
        let info = Self::read_workbook_xml(&mut archive)?;
        Ok(info.sheets.into_iter().map(|s| s.name).collect())
    }

    /// Read the selected worksheet from a reader
    pub fn read_sheet<R: Read + Seek>(reader: R, selector: &SheetSelector) -> XlsxResult<Worksheet> {
        let mut archive = Self::open_archive(reader)?;

        let info = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let entry = selector
            .position(info.sheets.iter().map(|s| s.name.as_str()))
            .and_then(|i| info.sheets.get(i))
            .ok_or_else(|| XlsxError::SheetNotFound(selector.to_string()))?;

        let path = sheet_paths
            .get(&entry.rel_id)
            .ok_or_else(|| XlsxError::MissingPart(format!("relationship {}", entry.rel_id)))?;

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let formats = Self::read_styles(&mut archive)?;

        let mut worksheet = Worksheet::new(entry.name.as_str());
        worksheet.set_date_1904(info.date_1904);
        Self::read_worksheet(&mut archive, path, &mut worksheet, &shared_strings, &formats)?;

        log::debug!(
            "read worksheet '{}' ({} rows, date1904={})",
            worksheet.name(),
            worksheet.rows().count(),
            info.date_1904
        );
        Ok(worksheet)
    }

    fn open_archive<R: Read + Seek>(reader: R) -> XlsxResult<zip::ZipArchive<R>> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat(
                "Missing [Content_Types].xml".into(),
            ));
        }
        Ok(archive)
    }

    /// Read the shared strings table
    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        // Phonetic runs repeat the text in another script and are not part of it
        let mut in_rph = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_rph = true,
                    b"t" if in_si && !in_rph => in_t = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) if e.name().as_ref() == b"si" => strings.push(String::new()),
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_excel_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"rPh" => in_rph = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    let text = e.unescape()?;
                    current.push_str(&text);
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<Vec<NumberFormat>> {
        match archive.by_name("xl/styles.xml") {
            Ok(file) => read_number_formats(file),
            Err(_) => Ok(Vec::new()),
        }
    }

    /// Read workbook.xml for sheet names, rIds and the date system
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<WorkbookInfo> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| XlsxError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut info = WorkbookInfo {
            sheets: Vec::new(),
            date_1904: false,
        };

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"workbookPr" => {
                        info.date_1904 = attr_value(&e, b"date1904")
                            .map_or(false, |v| v == "1" || v.eq_ignore_ascii_case("true"));
                    }
                    b"sheet" => {
                        if let (Some(name), Some(rel_id)) =
                            (attr_value(&e, b"name"), attr_value(&e, b"r:id"))
                        {
                            info.sheets.push(SheetEntry { name, rel_id });
                        }
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(info)
    }

    /// Read workbook.xml.rels to get sheet file paths
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> XlsxResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| XlsxError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    let id = attr_value(&e, b"Id");
                    let target = attr_value(&e, b"Target");
                    let rel_type = attr_value(&e, b"Type");

                    if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                        if rel_type.ends_with("/worksheet") {
                            // Targets are relative to xl/ unless absolute
                            let full_path = match target.strip_prefix('/') {
                                Some(absolute) => absolute.to_string(),
                                None => format!("xl/{}", target),
                            };
                            rels.insert(id, full_path);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        path: &str,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        formats: &[NumberFormat],
    ) -> XlsxResult<()> {
        let file = archive
            .by_name(path)
            .map_err(|_| XlsxError::MissingPart(path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(false);

        let mut buf = Vec::new();
        let mut cell: Option<PendingCell> = None;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_text = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"c" => cell = Some(PendingCell::from_element(&e)),
                    b"v" if cell.is_some() => in_value = true,
                    b"f" if cell.is_some() => in_formula = true,
                    b"t" if cell.is_some() => in_inline_text = true,
                    _ => {}
                },
                Ok(Event::Empty(e)) => match e.name().as_ref() {
                    // Value-less cell, usually present only to carry a style
                    b"c" => {
                        PendingCell::from_element(&e).store(worksheet, shared_strings, formats)?
                    }
                    // Shared formula continuation without its own text
                    b"f" => {
                        if let Some(c) = cell.as_mut() {
                            c.formula.get_or_insert_with(String::new);
                        }
                    }
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"c" => {
                        if let Some(c) = cell.take() {
                            c.store(worksheet, shared_strings, formats)?;
                        }
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"t" => in_inline_text = false,
                    _ => {}
                },
                Ok(Event::Text(e)) => {
                    if let Some(c) = cell.as_mut() {
                        if in_value || in_inline_text {
                            c.value
                                .get_or_insert_with(String::new)
                                .push_str(&e.unescape()?);
                        } else if in_formula {
                            c.formula
                                .get_or_insert_with(String::new)
                                .push_str(&e.unescape()?);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }
}

/// A `<c>` element being assembled from its children
struct PendingCell {
    reference: Option<String>,
    cell_type: Option<String>,
    style: Option<usize>,
    value: Option<String>,
    formula: Option<String>,
}

impl PendingCell {
    fn from_element(e: &BytesStart<'_>) -> Self {
        Self {
            reference: attr_value(e, b"r"),
            cell_type: attr_value(e, b"t"),
            style: attr_value(e, b"s").and_then(|s| s.parse().ok()),
            value: None,
            formula: None,
        }
    }

    fn store(
        self,
        worksheet: &mut Worksheet,
        shared_strings: &[String],
        formats: &[NumberFormat],
    ) -> XlsxResult<()> {
        let Some(reference) = self.reference.as_deref() else {
            log::warn!("skipping cell without a reference");
            return Ok(());
        };
        let addr = CellAddress::parse(reference)?;
        let number_format = self
            .style
            .and_then(|s| formats.get(s).cloned())
            .unwrap_or_default();

        let cell_type = self.cell_type.as_deref();
        let value = match (self.formula, self.value.as_deref()) {
            // Shared formula children carry no text; keep the cached result only
            (Some(f), cached) if !f.trim().is_empty() => {
                let cached = match cached {
                    Some(v) => Some(parse_value(cell_type, v, shared_strings)?),
                    None => None,
                };
                let text = if f.starts_with('=') {
                    f
                } else {
                    format!("={}", f)
                };
                match cached {
                    Some(cached) => CellValue::formula_with_cached(text, cached),
                    None => CellValue::formula(text),
                }
            }
            (_, Some(v)) => parse_value(cell_type, v, shared_strings)?,
            (_, None) => CellValue::Empty,
        };

        worksheet.set_cell_at(addr.row, addr.col, CellData::with_format(value, number_format));
        Ok(())
    }
}

fn parse_value(cell_type: Option<&str>, value: &str, shared_strings: &[String]) -> XlsxResult<CellValue> {
    Ok(match cell_type {
        Some("s") => {
            let idx: usize = value.trim().parse().map_err(|_| {
                XlsxError::Parse(format!("Invalid shared string index: {}", value))
            })?;
            let s = shared_strings.get(idx).ok_or_else(|| {
                XlsxError::Parse(format!("Shared string index {} out of bounds", idx))
            })?;
            CellValue::String(s.clone())
        }
        Some("b") => CellValue::Boolean(value == "1" || value.eq_ignore_ascii_case("true")),
        Some("e") => CellError::parse(value)
            .map(CellValue::Error)
            .unwrap_or_else(|| CellValue::String(value.to_string())),
        Some("inlineStr") | Some("str") => CellValue::String(decode_excel_escapes(value)),
        None | Some("n") | Some("d") => match value.trim().parse::<f64>() {
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::String(value.to_string()),
        },
        Some(_) => CellValue::String(value.to_string()),
    })
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|s| s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_sheets_core::{CellKind, TabularSource};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/></Relationships>"#;

    fn build_xlsx(workbook_pr: &str, sheet1: &str, shared: Option<&str>, styles: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = zip::write::SimpleFileOptions::default();

            zip.start_file("[Content_Types].xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#).unwrap();

            zip.start_file("xl/workbook.xml", options).unwrap();
            let workbook = format!(
                r#"<?xml version="1.0"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">{}<sheets><sheet name="Eksamen" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#,
                workbook_pr
            );
            zip.write_all(workbook.as_bytes()).unwrap();

            zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
            zip.write_all(WORKBOOK_RELS.as_bytes()).unwrap();

            zip.start_file("xl/worksheets/sheet1.xml", options).unwrap();
            let sheet = format!(
                r#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
                sheet1
            );
            zip.write_all(sheet.as_bytes()).unwrap();

            zip.start_file("xl/worksheets/sheet2.xml", options).unwrap();
            zip.write_all(br#"<?xml version="1.0"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>notes</t></is></c></row></sheetData></worksheet>"#).unwrap();

            if let Some(shared) = shared {
                zip.start_file("xl/sharedStrings.xml", options).unwrap();
                zip.write_all(shared.as_bytes()).unwrap();
            }
            if let Some(styles) = styles {
                zip.start_file("xl/styles.xml", options).unwrap();
                zip.write_all(styles.as_bytes()).unwrap();
            }

            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn test_decode_excel_escapes() {
        assert_eq!(decode_excel_escapes("hello_x000d_world"), "hello\rworld");
        assert_eq!(decode_excel_escapes("line1_x000D__x000A_line2"), "line1\r\nline2");
        assert_eq!(decode_excel_escapes("under_x005f_score"), "under_score");
        assert_eq!(decode_excel_escapes("plain text"), "plain text");
        assert_eq!(decode_excel_escapes("_x000d"), "_x000d");
        assert_eq!(decode_excel_escapes("a_xZZZZ_b"), "a_xZZZZ_b");
    }

    #[test]
    fn test_read_cells_of_every_type() {
        let shared = r#"<?xml version="1.0"?><sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2"><si><t>Emnekode</t></si><si><r><t>Digital </t></r><r><t>forretning</t></r></si></sst>"#;
        let styles = r#"<?xml version="1.0"?><styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><cellXfs count="2"><xf numFmtId="0"/><xf numFmtId="22"/></cellXfs></styleSheet>"#;
        let cells = r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="b"><v>1</v></c><c r="D1" t="e"><v>#DIV/0!</v></c></row><row r="3"><c r="A3"><v>1000</v></c><c r="B3" s="1"><v>45642.375</v></c><c r="C3" t="str"><f>A1&amp;"X"</f><v>EmnekodeX</v></c><c r="D3"><f>A3*2</f></c><c r="E3" s="1"/><c r="F3" t="inlineStr"><is><t>inline</t></is></c></row>"#;

        let bytes = build_xlsx("", cells, Some(shared), Some(styles));
        let sheet = XlsxReader::read(Cursor::new(bytes)).unwrap();

        assert_eq!(sheet.name(), "Eksamen");
        assert_eq!(sheet.row_count(), 3);
        assert!(sheet.row(1).is_none());

        assert_eq!(sheet.cell_at(0, 0).unwrap().value, CellValue::String("Emnekode".into()));
        assert_eq!(
            sheet.cell_at(0, 1).unwrap().value,
            CellValue::String("Digital forretning".into())
        );
        assert_eq!(sheet.cell_at(0, 2).unwrap().value, CellValue::Boolean(true));
        assert_eq!(sheet.cell_at(0, 3).unwrap().value, CellValue::Error(CellError::DivZero));

        assert_eq!(sheet.cell_at(2, 0).unwrap().value, CellValue::Number(1000.0));
        let date = sheet.cell_at(2, 1).unwrap();
        assert_eq!(date.value, CellValue::Number(45642.375));
        assert!(date.is_date_formatted());

        assert_eq!(
            sheet.cell_at(2, 2).unwrap().value,
            CellValue::formula_with_cached("=A1&\"X\"", CellValue::String("EmnekodeX".into()))
        );
        assert_eq!(sheet.cell_at(2, 3).unwrap().value, CellValue::formula("=A3*2"));

        let styled_blank = sheet.cell_at(2, 4);
        assert_eq!(CellKind::of(styled_blank), CellKind::Blank);
        assert_eq!(sheet.cell_at(2, 5).unwrap().value, CellValue::String("inline".into()));
    }

    #[test]
    fn test_date_1904_flag() {
        let bytes = build_xlsx(r#"<workbookPr date1904="1"/>"#, "", None, None);
        let sheet = XlsxReader::read(Cursor::new(bytes)).unwrap();
        assert!(sheet.date_1904());
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_sheet_selection() {
        let bytes = build_xlsx("", "", None, None);

        assert_eq!(
            XlsxReader::sheet_names(Cursor::new(bytes.clone())).unwrap(),
            vec!["Eksamen".to_string(), "Notes".to_string()]
        );

        let by_name =
            XlsxReader::read_sheet(Cursor::new(bytes.clone()), &SheetSelector::Name("notes".into()))
                .unwrap();
        assert_eq!(by_name.name(), "Notes");
        assert_eq!(by_name.cell_at(0, 0).unwrap().value, CellValue::String("notes".into()));

        let by_index =
            XlsxReader::read_sheet(Cursor::new(bytes.clone()), &SheetSelector::Index(1)).unwrap();
        assert_eq!(by_index.name(), "Notes");

        assert!(matches!(
            XlsxReader::read_sheet(Cursor::new(bytes), &SheetSelector::Index(5)),
            Err(XlsxError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_non_xlsx_input() {
        let err = XlsxReader::read(Cursor::new(b"not a zip file".to_vec())).unwrap_err();
        assert!(matches!(err, XlsxError::Zip(_)));
    }
}
