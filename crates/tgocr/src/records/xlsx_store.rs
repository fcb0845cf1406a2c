//! `.xlsx` output: written as a minimal SpreadsheetML package, read back with calamine.

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};

use calamine::{open_workbook, Data, Reader, Xlsx, XlsxError};
use log::warn;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StorageError;

use super::record::{Cell, ColumnMap, ImageRecord, HEADERS};
use super::{write_replacing, RecordStore};

/// Excel refuses to open cells longer than this.
const MAX_CELL_CHARS: usize = 32_767;

const SPREADSHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

const COLUMN_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

#[derive(Debug, Clone)]
pub struct XlsxStore {
    path: PathBuf,
}

impl XlsxStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for XlsxStore {
    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<ImageRecord>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut workbook: Xlsx<_> = open_workbook(&self.path).map_err(|e| match e {
            XlsxError::Io(source) => StorageError::ReadFile {
                path: self.path.clone(),
                source,
            },
            other => StorageError::malformed(&self.path, other.to_string()),
        })?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| StorageError::malformed(&self.path, "workbook has no sheets"))?
            .map_err(|e| StorageError::malformed(&self.path, e.to_string()))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };

        let headers: Vec<String> = header_row
            .iter()
            .map(|data| match to_cell(data) {
                Cell::Text(s) => s,
                Cell::Number(n) => n.to_string(),
                Cell::Empty => String::new(),
            })
            .collect();
        let columns = ColumnMap::from_headers(&self.path, &headers)?;

        let mut records = Vec::new();
        for (index, row) in rows.enumerate() {
            let cells: Vec<Cell> = row.iter().map(to_cell).collect();
            if let Some(record) = columns.parse_row(&self.path, index + 2, &cells)? {
                records.push(record);
            }
        }

        Ok(records)
    }

    fn save(&self, records: &[ImageRecord]) -> Result<(), StorageError> {
        let sheet = sheet_xml(records).map_err(|reason| StorageError::Encode {
            path: self.path.clone(),
            reason,
        })?;

        write_replacing(&self.path, |file| {
            write_package(file, &sheet).map_err(|e| StorageError::Encode {
                path: self.path.clone(),
                reason: e.to_string(),
            })
        })
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(date) => Cell::Text(date.format(super::DATE_FORMAT).to_string()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

fn write_package<W: Write + Seek>(out: W, sheet: &[u8]) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", ROOT_RELS_XML.as_bytes()),
        ("xl/workbook.xml", WORKBOOK_XML.as_bytes()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS_XML.as_bytes()),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }

    zip.finish()?;
    Ok(())
}

enum SheetValue<'a> {
    Number(i64),
    Text(&'a str),
}

fn sheet_xml(records: &[ImageRecord]) -> Result<Vec<u8>, String> {
    let mut writer = Writer::new(Vec::new());

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))),
    )?;
    let mut worksheet = BytesStart::new("worksheet");
    worksheet.push_attribute(("xmlns", SPREADSHEET_NS));
    emit(&mut writer, Event::Start(worksheet))?;
    emit(&mut writer, Event::Start(BytesStart::new("sheetData")))?;

    let header: Vec<SheetValue> = HEADERS.iter().map(|h| SheetValue::Text(h)).collect();
    write_row(&mut writer, 1, &header)?;

    for (index, record) in records.iter().enumerate() {
        let date = record.date_cell();
        let row = [
            SheetValue::Number(record.message_id() as i64),
            SheetValue::Text(&date),
            SheetValue::Text(record.image_link()),
            SheetValue::Text(record.extracted_text()),
        ];
        write_row(&mut writer, index + 2, &row)?;
    }

    emit(&mut writer, Event::End(BytesEnd::new("sheetData")))?;
    emit(&mut writer, Event::End(BytesEnd::new("worksheet")))?;

    Ok(writer.into_inner())
}

fn write_row(
    writer: &mut Writer<Vec<u8>>,
    row: usize,
    values: &[SheetValue],
) -> Result<(), String> {
    let row_ref = row.to_string();
    let mut start = BytesStart::new("row");
    start.push_attribute(("r", row_ref.as_str()));
    emit(writer, Event::Start(start))?;

    for (column, value) in values.iter().enumerate() {
        let reference = format!("{}{}", COLUMN_LETTERS[column], row);
        let mut cell = BytesStart::new("c");
        cell.push_attribute(("r", reference.as_str()));

        match value {
            SheetValue::Number(n) => {
                emit(writer, Event::Start(cell))?;
                emit(writer, Event::Start(BytesStart::new("v")))?;
                emit(writer, Event::Text(BytesText::new(&n.to_string())))?;
                emit(writer, Event::End(BytesEnd::new("v")))?;
            }
            SheetValue::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                let text = cell_text(text, &reference);
                cell.push_attribute(("t", "inlineStr"));
                emit(writer, Event::Start(cell))?;
                emit(writer, Event::Start(BytesStart::new("is")))?;
                let mut t = BytesStart::new("t");
                t.push_attribute(("xml:space", "preserve"));
                emit(writer, Event::Start(t))?;
                emit(writer, Event::Text(BytesText::new(&text)))?;
                emit(writer, Event::End(BytesEnd::new("t")))?;
                emit(writer, Event::End(BytesEnd::new("is")))?;
            }
        }

        emit(writer, Event::End(BytesEnd::new("c")))?;
    }

    emit(writer, Event::End(BytesEnd::new("row")))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| e.to_string())
}

/// Drops characters XML 1.0 cannot carry and clips to the Excel cell limit.
fn cell_text(text: &str, reference: &str) -> String {
    let mut cleaned: String = text.chars().filter(|c| is_xml_char(*c)).collect();

    if cleaned.chars().count() > MAX_CELL_CHARS {
        warn!(
            "Cell {} exceeds {} characters and was truncated",
            reference, MAX_CELL_CHARS
        );
        cleaned = cleaned.chars().take(MAX_CELL_CHARS).collect();
    }

    cleaned
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r')
        || ('\u{20}'..='\u{D7FF}').contains(&c)
        || ('\u{E000}'..='\u{FFFD}').contains(&c)
        || c >= '\u{10000}'
}
