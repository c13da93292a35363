#![allow(dead_code)]

use chrono::NaiveDate;
use sheetcut_core::document::serial::datetime_to_serial;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Style index of the date cell format in the mock stylesheet
pub const DATE_STYLE: u32 = 1;

/// A cell of a mock worksheet
#[derive(Debug, Clone)]
pub enum MockCell {
    Empty,
    Text(String),
    Number(f64),
    /// Serial date carrying the date style
    Date(f64),
    /// Formula text without `=`, plus its cached result
    Formula(String, f64),
}

pub fn text(value: &str) -> MockCell {
    MockCell::Text(value.to_string())
}

pub fn date(y: i32, m: u32, d: u32) -> MockCell {
    let value = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid test date");
    MockCell::Date(datetime_to_serial(value, false))
}

pub fn formula(text: &str, cached: f64) -> MockCell {
    MockCell::Formula(text.to_string(), cached)
}

#[derive(Debug, Clone, Default)]
pub struct MockSheet {
    pub name: String,
    pub rows: Vec<Vec<MockCell>>,
    /// Raw XML placed after `</sheetData>` (merged cells, margins)
    pub trailer: String,
    /// Raw `<cols>` element
    pub cols: String,
    /// (cell, author, text) notes, written as a comments part plus its drawing
    pub comments: Vec<(String, String, String)>,
}

impl MockSheet {
    pub fn new(name: &str, rows: Vec<Vec<MockCell>>) -> Self {
        Self {
            name: name.to_string(),
            rows,
            ..Default::default()
        }
    }
}

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

/// Write a minimal XLSX package with the given sheets, a stylesheet with one
/// date format and a calculation chain
pub fn write_mock_xlsx(path: &Path, sheets: &[MockSheet]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#,
    );
    content_types.push_str(r#"<Default Extension="vml" ContentType="application/vnd.openxmlformats-officedocument.vmlDrawing"/>"#);
    for (i, sheet) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
        if !sheet.comments.is_empty() {
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/comments{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#,
                i + 1
            ));
        }
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#)?;

    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (i, sheet) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            sheet.name,
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str(r#"</sheets><calcPr calcId="191029"/></workbook>"#);
    zip.write_all(workbook_xml.as_bytes())?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheets.len() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i, i
        ));
    }
    rels_xml.push_str(r#"<Relationship Id="rId90" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    rels_xml.push_str(r#"<Relationship Id="rId91" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/>"#);
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    zip.start_file("xl/styles.xml", options)?;
    zip.write_all(STYLES.as_bytes())?;

    zip.start_file("xl/calcChain.xml", options)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<calcChain xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><c r="G2" i="1"/></calcChain>"#)?;

    for (i, sheet) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(worksheet_xml(sheet).as_bytes())?;
        if !sheet.comments.is_empty() {
            write_mock_comments(&mut zip, options, i + 1, &sheet.comments)?;
        }
    }

    zip.finish()?;
    Ok(())
}

fn worksheet_xml(sheet: &MockSheet) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1"/><sheetFormatPr defaultRowHeight="15"/>"#,
    );
    xml.push_str(&sheet.cols);
    xml.push_str("<sheetData>");
    for (r, row) in sheet.rows.iter().enumerate() {
        let number = r + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, number));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_name(c as u32 + 1), number);
            match cell {
                MockCell::Empty => {}
                MockCell::Text(t) => xml.push_str(&format!(
                    r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    reference, t
                )),
                MockCell::Number(n) => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n))
                }
                MockCell::Date(serial) => xml.push_str(&format!(
                    r#"<c r="{}" s="{}"><v>{}</v></c>"#,
                    reference, DATE_STYLE, serial
                )),
                MockCell::Formula(f, cached) => xml.push_str(&format!(
                    r#"<c r="{}"><f>{}</f><v>{}</v></c>"#,
                    reference, f, cached
                )),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    xml.push_str(&sheet.trailer);
    if !sheet.comments.is_empty() {
        xml.push_str(r#"<legacyDrawing r:id="rId2"/>"#);
    }
    xml.push_str("</worksheet>");
    xml
}

fn write_mock_comments(
    zip: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    index: usize,
    comments: &[(String, String, String)],
) -> anyhow::Result<()> {
    zip.start_file(format!("xl/worksheets/_rels/sheet{}.xml.rels", index), options)?;
    zip.write_all(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments{0}.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing" Target="../drawings/vmlDrawing{0}.vml"/></Relationships>"#,
        index
    ).as_bytes())?;

    let mut authors: Vec<&str> = Vec::new();
    let mut list = String::new();
    let mut shapes = String::new();
    for (n, (cell, author, text)) in comments.iter().enumerate() {
        if !authors.contains(&author.as_str()) {
            authors.push(author);
        }
        let author_id = authors.iter().position(|a| *a == author.as_str()).unwrap_or(0);
        list.push_str(&format!(
            r#"<comment ref="{}" authorId="{}"><text><r><t>{}</t></r></text></comment>"#,
            cell, author_id, text
        ));
        shapes.push_str(&format!(
            r##"<v:shape id="_x0000_s{}" type="#_x0000_t202"><x:ClientData ObjectType="Note"><x:Row>0</x:Row><x:Column>0</x:Column></x:ClientData></v:shape>"##,
            1025 + n
        ));
    }
    let authors: String = authors.iter().map(|a| format!("<author>{}</author>", a)).collect();

    zip.start_file(format!("xl/comments{}.xml", index), options)?;
    zip.write_all(format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors>{}</authors><commentList>{}</commentList></comments>"#,
        authors, list
    ).as_bytes())?;

    zip.start_file(format!("xl/drawings/vmlDrawing{}.vml", index), options)?;
    zip.write_all(format!(
        r#"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:x="urn:schemas-microsoft-com:office:excel">{}</xml>"#,
        shapes
    ).as_bytes())?;
    Ok(())
}

fn column_name(mut col: u32) -> String {
    let mut name = String::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.insert(0, (b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    name
}

/// Read one part of an XLSX package as text
pub fn read_part(path: &Path, name: &str) -> anyhow::Result<String> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let mut part = zip.by_name(name)?;
    let mut content = String::new();
    part.read_to_string(&mut content)?;
    Ok(content)
}

pub fn has_part(path: &Path, name: &str) -> anyhow::Result<bool> {
    let file = File::open(path)?;
    let mut zip = zip::ZipArchive::new(file)?;
    let found = zip.by_name(name).is_ok();
    Ok(found)
}

/// A ledger row: entity in A, amount in E, governing date in F and a formula in G
pub fn ledger_row(entity: &str, amount: f64, when: MockCell, row: u32) -> Vec<MockCell> {
    vec![
        text(entity),
        MockCell::Empty,
        MockCell::Empty,
        MockCell::Empty,
        MockCell::Number(amount),
        when,
        formula(&format!("E{}*2", row), amount * 2.0),
    ]
}

pub fn ledger_header() -> Vec<MockCell> {
    vec![
        text("Entity"),
        text("Ref"),
        text("Memo"),
        text("Account"),
        text("Amount"),
        text("Date"),
        text("Double"),
    ]
}
