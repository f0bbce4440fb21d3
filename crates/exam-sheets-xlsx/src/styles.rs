//! Number format table from `xl/styles.xml`
//!
//! Cells reference a `cellXfs` entry through their `s` attribute; each entry
//! names a number format id that is either built in or declared under
//! `numFmts`. Fonts, fills and borders are not needed and are skipped.

use std::collections::HashMap;
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{XlsxError, XlsxResult};
use exam_sheets_core::NumberFormat;

/// Number format of every `cellXfs` entry, indexed by style id
pub(crate) fn read_number_formats<R: Read>(reader: R) -> XlsxResult<Vec<NumberFormat>> {
    let mut xml_reader = Reader::from_reader(BufReader::new(reader));
    xml_reader.trim_text(true);

    let mut buf = Vec::new();
    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_ids: Vec<u32> = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => xf_ids.push(num_fmt_id(&e)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"numFmt" => {
                    let mut id = None;
                    let mut code = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"numFmtId" => {
                                id = attr.unescape_value().ok().and_then(|s| s.parse().ok())
                            }
                            b"formatCode" => {
                                code = attr.unescape_value().ok().map(|s| s.to_string())
                            }
                            _ => {}
                        }
                    }
                    if let (Some(id), Some(code)) = (id, code) {
                        custom.insert(id, code);
                    }
                }
                b"xf" if in_cell_xfs => xf_ids.push(num_fmt_id(&e)),
                _ => {}
            },
            Ok(Event::End(e)) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(xf_ids
        .into_iter()
        .map(|id| match custom.get(&id) {
            Some(code) => NumberFormat::from_string(code.as_str()),
            None => NumberFormat::from_id(id),
        })
        .collect())
}

fn num_fmt_id(e: &BytesStart<'_>) -> u32 {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"numFmtId")
        .and_then(|attr| attr.unescape_value().ok().and_then(|s| s.parse().ok()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cell_xfs_resolve_builtin_and_custom_formats() {
        let xml = br#"<?xml version="1.0"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="dd/mm/yyyy\ hh:mm"/></numFmts>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0"/></cellStyleXfs>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0"><alignment wrapText="1"/></xf>
    <xf numFmtId="4" fontId="0" fillId="0" borderId="0" xfId="0"/>
  </cellXfs>
</styleSheet>"#;

        let formats = read_number_formats(&xml[..]).unwrap();
        assert_eq!(
            formats,
            vec![
                NumberFormat::General,
                NumberFormat::BuiltIn(14),
                NumberFormat::Custom("dd/mm/yyyy\\ hh:mm".into()),
                NumberFormat::BuiltIn(4),
            ]
        );
        assert!(formats[1].is_date_format());
        assert!(formats[2].is_date_format());
        assert!(!formats[3].is_date_format());
    }
}
