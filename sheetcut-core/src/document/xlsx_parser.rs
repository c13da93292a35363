//! XLSX package reader built on zip + quick-xml

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

use super::cell_ref::CellRef;
use super::serial::serial_to_datetime;
use super::styles::StyleSheet;
use super::workbook::{Cell, CellValue, ColumnFormat, Comment, Hyperlink, RowFormat, Sheet};
use super::xml_utils::{attr_value, is_truthy, read_text_node, skip_element};
use super::{Document, LoadMode, Part};
use crate::formula::translate_formula;

pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub(crate) const STYLES_PART: &str = "xl/styles.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

const COMMENTS_REL: &str = "/relationships/comments";
const VML_DRAWING_REL: &str = "/relationships/vmlDrawing";

/// Parse a complete document from the bytes of an XLSX package
pub(crate) fn read_document(bytes: &[u8], mode: LoadMode) -> Result<Document> {
    let parts = read_parts(bytes)?;

    let workbook_xml =
        part_text(&parts, WORKBOOK_PART)?.context("Failed to find xl/workbook.xml")?;
    let catalog = parse_workbook_xml(&workbook_xml)?;
    let rels: HashMap<String, String> = match part_text(&parts, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?
            .into_iter()
            .map(|rel| (rel.id, rel.target))
            .collect(),
        None => HashMap::new(),
    };
    let shared_strings = match part_text(&parts, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };
    let styles = StyleSheet::parse(part_text(&parts, STYLES_PART)?)?;

    let context = SheetContext {
        shared_strings: &shared_strings,
        styles: &styles,
        date1904: catalog.date1904,
        mode,
    };

    let mut sheets = Vec::with_capacity(catalog.sheets.len());
    for (name, rid) in &catalog.sheets {
        let target = rels.get(rid).with_context(|| {
            format!("Relationship '{}' not found for sheet '{}'", rid, name)
        })?;
        let path = resolve_part(WORKBOOK_PART, target);
        let xml = part_text(&parts, &path)?
            .with_context(|| format!("Sheet '{}' points at missing part {}", name, path))?;
        let mut sheet = parse_worksheet(&xml, &context)
            .with_context(|| format!("Failed to parse sheet '{}'", name))?;
        attach_comments(&parts, &path, &mut sheet)
            .with_context(|| format!("Failed to read comments of sheet '{}'", name))?;
        sheet.name = name.clone();
        sheet.part = Some(path);
        sheets.push(sheet);
    }

    Ok(Document {
        parts,
        sheets,
        styles,
        date1904: catalog.date1904,
    })
}

fn read_parts(bytes: &[u8]) -> Result<Vec<Part>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("Failed to open zip archive")?;
    let mut parts = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read part {}", name))?;
        parts.push((name, buffer));
    }
    Ok(parts)
}

pub(crate) fn part_text(parts: &[Part], name: &str) -> Result<Option<String>> {
    match parts.iter().find(|(n, _)| n == name) {
        Some((_, bytes)) => Ok(Some(
            String::from_utf8(bytes.clone()).with_context(|| format!("{} is not UTF-8", name))?,
        )),
        None => Ok(None),
    }
}

/// Resolve a relationship target against the part that owns the relationship.
/// Targets are usually relative ("worksheets/sheet1.xml", "../comments1.xml").
fn resolve_part(owner: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = owner.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            segment => segments.push(segment),
        }
    }
    segments.join("/")
}

/// "xl/worksheets/sheet1.xml" -> "xl/worksheets/_rels/sheet1.xml.rels"
fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

struct WorkbookCatalog {
    /// (sheet name, r:id) in display order
    sheets: Vec<(String, String)>,
    date1904: bool,
}

fn parse_workbook_xml(xml: &str) -> Result<WorkbookCatalog> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut sheets = Vec::new();
    let mut date1904 = false;

    loop {
        match reader.read_event().context("Failed to parse workbook.xml")? {
            Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                b"sheet" => {
                    let name = attr_value(&e, b"name")?.unwrap_or_default();
                    let rid = attr_value(&e, b"r:id")?.unwrap_or_default();
                    sheets.push((name, rid));
                }
                b"workbookPr" => {
                    date1904 = is_truthy(attr_value(&e, b"date1904")?.as_deref());
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(WorkbookCatalog { sheets, date1904 })
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut rels = Vec::new();

    loop {
        match reader.read_event().context("Failed to parse relationships")? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) =
                    (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?)
                {
                    let kind = attr_value(&e, b"Type")?.unwrap_or_default();
                    rels.push(Relationship { id, kind, target });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event().context("Failed to parse sharedStrings.xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"t" => current.push_str(&read_text_node(&mut reader)?),
                // Phonetic runs are not part of the displayed text
                b"rPh" => skip_element(&mut reader)?,
                _ => {}
            },
            Event::End(e) if e.name().as_ref() == b"si" => {
                strings.push(std::mem::take(&mut current));
            }
            Event::Empty(e) if e.name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

struct SheetContext<'a> {
    shared_strings: &'a [String],
    styles: &'a StyleSheet,
    date1904: bool,
    mode: LoadMode,
}

/// Parse one worksheet part into cells, sizing metadata and its layout skeleton
fn parse_worksheet(xml: &str, context: &SheetContext<'_>) -> Result<Sheet> {
    let mut sheet = Sheet::default();
    let mut reader = Reader::from_str(xml);
    let mut layout = Writer::new(Cursor::new(Vec::new()));
    let mut links = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"sheetData" => {
                layout.write_event(Event::Empty(e))?;
                parse_sheet_data(&mut reader, &mut sheet, context)?;
            }
            Event::Empty(e) if e.name().as_ref() == b"dimension" => {}
            Event::Start(e) if e.name().as_ref() == b"dimension" => skip_element(&mut reader)?,
            Event::Empty(e) if e.name().as_ref() == b"col" => {
                sheet.columns.push(parse_column(&e)?);
                layout.write_event(Event::Empty(e))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"pane" => {
                if let Some(anchor) = frozen_anchor(&e)? {
                    sheet.freeze_panes = Some(anchor);
                }
                layout.write_event(Event::Empty(e))?;
            }
            // Links move onto their cells; the empty element marks where they go back
            Event::Start(e) if e.name().as_ref() == b"hyperlinks" => {
                links.extend(parse_hyperlinks(&mut reader)?);
                layout.write_event(Event::Empty(e))?;
            }
            Event::Eof => break,
            e => layout.write_event(e)?,
        }
    }

    for (anchor, link) in links {
        sheet.cell_mut(anchor.row, anchor.col).hyperlink = Some(link);
    }
    sheet.layout_xml = Some(String::from_utf8(layout.into_inner().into_inner())?);
    Ok(sheet)
}

/// Entries of a `<hyperlinks>` block, anchored at the top-left cell of their range
fn parse_hyperlinks(reader: &mut Reader<&[u8]>) -> Result<Vec<(CellRef, Hyperlink)>> {
    let mut links = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"hyperlink" => {
                let anchor = attr_value(&e, b"ref")?
                    .and_then(|r| r.split(':').next().and_then(CellRef::parse));
                let link = Hyperlink {
                    rel_id: attr_value(&e, b"r:id")?,
                    location: attr_value(&e, b"location")?,
                    display: attr_value(&e, b"display")?,
                    tooltip: attr_value(&e, b"tooltip")?,
                };
                match anchor {
                    Some(anchor) => links.push((anchor, link)),
                    None => tracing::debug!("Hyperlink without a cell reference dropped"),
                }
            }
            Event::End(e) if e.name().as_ref() == b"hyperlinks" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(links)
}

/// Load the sheet's comments onto its cells and remember the parts to rewrite
fn attach_comments(parts: &[Part], sheet_part: &str, sheet: &mut Sheet) -> Result<()> {
    let Some(rels_xml) = part_text(parts, &rels_part_for(sheet_part))? else {
        return Ok(());
    };
    let rels = parse_relationships(&rels_xml)?;
    let find = |kind: &str| {
        rels.iter()
            .find(|rel| rel.kind.ends_with(kind))
            .map(|rel| resolve_part(sheet_part, &rel.target))
    };
    let Some(comments_part) = find(COMMENTS_REL) else {
        return Ok(());
    };
    let Some(xml) = part_text(parts, &comments_part)? else {
        return Ok(());
    };

    for (anchor, comment) in parse_comments(&xml)? {
        sheet.cell_mut(anchor.row, anchor.col).comment = Some(comment);
    }
    sheet.vml_part = find(VML_DRAWING_REL);
    sheet.comments_part = Some(comments_part);
    Ok(())
}

/// Comments as plain text; run formatting is not kept
fn parse_comments(xml: &str) -> Result<Vec<(CellRef, Comment)>> {
    let mut reader = Reader::from_str(xml);
    let mut authors = Vec::new();
    let mut comments = Vec::new();
    let mut open: Option<(CellRef, usize)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event().context("Failed to parse comments")? {
            Event::Start(e) => match e.name().as_ref() {
                b"author" => authors.push(read_text_node(&mut reader)?),
                b"comment" => {
                    let anchor = attr_value(&e, b"ref")?.and_then(|r| CellRef::parse(&r));
                    let author = attr_value(&e, b"authorId")?
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                    open = anchor.map(|anchor| (anchor, author));
                    text.clear();
                }
                b"t" => text.push_str(&read_text_node(&mut reader)?),
                b"rPh" => skip_element(&mut reader)?,
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"author" => authors.push(String::new()),
            Event::End(e) if e.name().as_ref() == b"comment" => {
                if let Some((anchor, author)) = open.take() {
                    comments.push((
                        anchor,
                        Comment {
                            author: authors.get(author).cloned().unwrap_or_default(),
                            text: std::mem::take(&mut text),
                        },
                    ));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(comments)
}

fn parse_column(e: &BytesStart<'_>) -> Result<ColumnFormat> {
    let number = |key: &[u8]| -> Result<Option<u32>> {
        Ok(attr_value(e, key)?.and_then(|v| v.parse().ok()))
    };
    Ok(ColumnFormat {
        min: number(b"min")?.unwrap_or(1),
        max: number(b"max")?.unwrap_or(1),
        width: attr_value(e, b"width")?.and_then(|v| v.parse().ok()),
        custom_width: is_truthy(attr_value(e, b"customWidth")?.as_deref()),
        hidden: is_truthy(attr_value(e, b"hidden")?.as_deref()),
        style: number(b"style")?,
    })
}

/// Anchor of a frozen pane; split panes that are not frozen yield `None`
fn frozen_anchor(e: &BytesStart<'_>) -> Result<Option<CellRef>> {
    let state = attr_value(e, b"state")?;
    if !matches!(state.as_deref(), Some("frozen") | Some("frozenSplit")) {
        return Ok(None);
    }
    if let Some(anchor) = attr_value(e, b"topLeftCell")?.and_then(|v| CellRef::parse(&v)) {
        return Ok(Some(anchor));
    }
    let split = |key: &[u8]| -> Result<u32> {
        Ok(attr_value(e, key)?
            .and_then(|v| v.parse::<f64>().ok())
            .map(|v| v as u32)
            .unwrap_or(0))
    };
    Ok(Some(CellRef::new(split(b"ySplit")? + 1, split(b"xSplit")? + 1)))
}

fn parse_row_format(e: &BytesStart<'_>) -> Result<Option<RowFormat>> {
    let format = RowFormat {
        height: attr_value(e, b"ht")?.and_then(|v| v.parse().ok()),
        custom_height: is_truthy(attr_value(e, b"customHeight")?.as_deref()),
        hidden: is_truthy(attr_value(e, b"hidden")?.as_deref()),
        style: if is_truthy(attr_value(e, b"customFormat")?.as_deref()) {
            attr_value(e, b"s")?.and_then(|v| v.parse().ok())
        } else {
            None
        },
    };
    Ok((format != RowFormat::default()).then_some(format))
}

fn parse_sheet_data(
    reader: &mut Reader<&[u8]>,
    sheet: &mut Sheet,
    context: &SheetContext<'_>,
) -> Result<()> {
    let mut shared_formulas: HashMap<String, (String, CellRef)> = HashMap::new();
    let mut current_row = 0u32;
    let mut next_col = 1u32;

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"row" => {
                current_row = attr_value(&e, b"r")?
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(current_row + 1);
                next_col = 1;
                if let Some(format) = parse_row_format(&e)? {
                    sheet.row_formats.insert(current_row, format);
                }
                sheet.row_mut(current_row);
            }
            Event::Start(e) if e.name().as_ref() == b"c" => {
                let position = cell_position(&e, current_row, next_col)?;
                next_col = position.col + 1;
                let raw = read_raw_cell(reader, &e)?;
                let cell = build_cell(raw, position, context, &mut shared_formulas);
                *sheet.cell_mut(position.row, position.col) = cell;
            }
            Event::Empty(e) if e.name().as_ref() == b"c" => {
                let position = cell_position(&e, current_row, next_col)?;
                next_col = position.col + 1;
                let style = attr_value(&e, b"s")?.and_then(|v| v.parse().ok());
                sheet.cell_mut(position.row, position.col).style = style;
            }
            Event::End(e) if e.name().as_ref() == b"sheetData" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn cell_position(e: &BytesStart<'_>, row: u32, next_col: u32) -> Result<CellRef> {
    Ok(attr_value(e, b"r")?
        .and_then(|r| CellRef::parse(&r))
        .unwrap_or(CellRef::new(row.max(1), next_col)))
}

/// Cell contents as they appear in the XML, before typing
#[derive(Debug, Default)]
struct RawCell {
    style: Option<u32>,
    kind: String,
    value: Option<String>,
    inline: Option<String>,
    formula: Option<String>,
    shared_index: Option<String>,
}

fn read_raw_cell(reader: &mut Reader<&[u8]>, start: &BytesStart<'_>) -> Result<RawCell> {
    let mut raw = RawCell {
        style: attr_value(start, b"s")?.and_then(|v| v.parse().ok()),
        kind: attr_value(start, b"t")?.unwrap_or_default(),
        ..Default::default()
    };

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"v" => raw.value = Some(read_text_node(reader)?),
                b"f" => {
                    if attr_value(&e, b"t")?.as_deref() == Some("shared") {
                        raw.shared_index = attr_value(&e, b"si")?;
                    }
                    let text = read_text_node(reader)?;
                    if !text.is_empty() {
                        raw.formula = Some(text);
                    }
                }
                b"is" => {
                    let mut text = String::new();
                    loop {
                        match reader.read_event()? {
                            Event::Start(inner) if inner.name().as_ref() == b"t" => {
                                text.push_str(&read_text_node(reader)?);
                            }
                            Event::Start(inner) if inner.name().as_ref() == b"rPh" => {
                                skip_element(reader)?;
                            }
                            Event::End(inner) if inner.name().as_ref() == b"is" => break,
                            Event::Eof => break,
                            _ => {}
                        }
                    }
                    raw.inline = Some(text);
                }
                _ => skip_element(reader)?,
            },
            Event::Empty(e) if e.name().as_ref() == b"f" => {
                if attr_value(&e, b"t")?.as_deref() == Some("shared") {
                    raw.shared_index = attr_value(&e, b"si")?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"c" => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(raw)
}

fn build_cell(
    raw: RawCell,
    position: CellRef,
    context: &SheetContext<'_>,
    shared_formulas: &mut HashMap<String, (String, CellRef)>,
) -> Cell {
    let formula = match (&raw.shared_index, &raw.formula) {
        (Some(si), Some(text)) => {
            shared_formulas.insert(si.clone(), (text.clone(), position));
            Some(text.clone())
        }
        (Some(si), None) => shared_formulas.get(si).and_then(|(text, origin)| {
            match translate_formula(text, *origin, position) {
                Ok(moved) => Some(moved),
                Err(err) => {
                    tracing::debug!(cell = %position, "Shared formula not expanded: {}", err);
                    None
                }
            }
        }),
        (None, formula) => formula.clone(),
    };

    let mut cell = Cell {
        style: raw.style,
        ..Default::default()
    };
    match (context.mode, formula) {
        (LoadMode::Formulas, Some(formula)) => cell.formula = Some(formula),
        _ => cell.value = cached_value(&raw, context),
    }
    cell
}

fn cached_value(raw: &RawCell, context: &SheetContext<'_>) -> CellValue {
    if raw.kind == "inlineStr" {
        return raw.inline.clone().map(CellValue::Text).unwrap_or_default();
    }
    let Some(text) = raw.value.as_deref() else {
        return CellValue::Empty;
    };

    match raw.kind.as_str() {
        "s" => text
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|idx| context.shared_strings.get(idx).cloned())
            .map(CellValue::Text)
            .unwrap_or_default(),
        "b" => CellValue::Boolean(text.trim() == "1" || text.trim() == "true"),
        "e" => CellValue::Error(text.to_string()),
        "str" => CellValue::Text(text.to_string()),
        "d" => parse_iso_datetime(text)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(text.to_string())),
        _ => {
            let style = raw.style.unwrap_or(0);
            if context.styles.is_text_style(style) {
                return CellValue::Text(text.to_string());
            }
            match text.trim().parse::<f64>() {
                Ok(n) if context.styles.is_date_style(style) => {
                    serial_to_datetime(n, context.date1904)
                        .map(CellValue::Date)
                        .unwrap_or(CellValue::Number(n))
                }
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(text.to_string()),
            }
        }
    }
}

fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<styleSheet><numFmts count="1"><numFmt numFmtId="164" formatCode="MM/DD/YY h:mm AM/PM"/></numFmts><cellXfs count="3"><xf numFmtId="0"/><xf numFmtId="164" applyNumberFormat="1"/><xf numFmtId="49" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:D4"/><sheetViews><sheetView workbookViewId="0"><pane ySplit="1" topLeftCell="A2" activePane="bottomLeft" state="frozen"/></sheetView></sheetViews><cols><col min="1" max="2" width="18.5" customWidth="1"/><col min="4" max="4" width="9" hidden="1"/></cols><sheetData><row r="1" ht="30" customHeight="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="inlineStr"><is><r><t>Da</t></r><r><t>te</t></r></is></c></row><row r="2"><c r="A2" s="1"><v>44348</v></c><c r="B2"><f>A2+1</f><v>44349</v></c><c r="C2"><f t="shared" ref="C2:C3" si="0">B2*2</f><v>88698</v></c><c r="D2" s="2"><v>0012</v></c></row><row r="4"><c r="A4" t="b"><v>1</v></c><c r="C4"><f t="shared" si="0"/><v>0</v></c><c r="D4" s="1"/></row></sheetData><mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells><hyperlinks><hyperlink ref="A2" r:id="rId1" display="site"/><hyperlink ref="C4:D4" location="Summary!A1"/></hyperlinks><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#;

    fn parse(mode: LoadMode) -> Sheet {
        let styles = StyleSheet::parse(Some(STYLES.to_string())).unwrap();
        let shared = vec!["Entity".to_string()];
        let context = SheetContext {
            shared_strings: &shared,
            styles: &styles,
            date1904: false,
            mode,
        };
        parse_worksheet(SHEET, &context).unwrap()
    }

    #[test]
    fn test_values_only_mode() {
        let sheet = parse(LoadMode::ValuesOnly);
        assert_eq!(sheet.max_row(), 4);
        assert_eq!(sheet.cell(1, 1).unwrap().value, CellValue::Text("Entity".into()));
        assert_eq!(sheet.cell(1, 2).unwrap().value, CellValue::Text("Date".into()));
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(sheet.cell(2, 1).unwrap().value, CellValue::Date(date));
        assert_eq!(sheet.cell(2, 2).unwrap().value, CellValue::Number(44349.0));
        assert!(sheet.cell(2, 2).unwrap().formula.is_none());
        assert_eq!(sheet.cell(2, 4).unwrap().value, CellValue::Text("0012".into()));
        assert_eq!(sheet.cell(4, 1).unwrap().value, CellValue::Boolean(true));
        assert!(sheet.row(3).unwrap().is_blank());
        assert_eq!(sheet.cell(4, 4).unwrap().style, Some(1));
    }

    #[test]
    fn test_formula_mode_expands_shared_formulas() {
        let sheet = parse(LoadMode::Formulas);
        assert_eq!(sheet.cell(2, 2).unwrap().formula.as_deref(), Some("A2+1"));
        assert_eq!(sheet.cell(2, 3).unwrap().formula.as_deref(), Some("B2*2"));
        assert_eq!(sheet.cell(4, 3).unwrap().formula.as_deref(), Some("B4*2"));
        assert!(sheet.cell(2, 3).unwrap().value.is_empty());
    }

    #[test]
    fn test_layout_metadata() {
        let sheet = parse(LoadMode::ValuesOnly);
        assert_eq!(sheet.freeze_panes, Some(CellRef::new(2, 1)));
        assert_eq!(sheet.columns.len(), 2);
        assert_eq!(sheet.columns[0].width, Some(18.5));
        assert!(sheet.columns[1].hidden);
        assert_eq!(sheet.row_formats.get(&1).and_then(|f| f.height), Some(30.0));
        assert!(!sheet.row_formats.contains_key(&2));

        let layout = sheet.layout_xml.unwrap();
        assert!(layout.contains("<sheetData/>"));
        assert!(!layout.contains("<dimension"));
        assert!(!layout.contains("<row"));
        assert!(layout.contains(r#"<mergeCell ref="A1:B1"/>"#));
        assert!(layout.contains("<hyperlinks/><pageMargins"));
        assert!(!layout.contains("<hyperlink "));
    }

    #[test]
    fn test_hyperlinks_land_on_cells() {
        let sheet = parse(LoadMode::ValuesOnly);
        let link = sheet.cell(2, 1).and_then(|c| c.hyperlink.clone()).unwrap();
        assert_eq!(link.rel_id.as_deref(), Some("rId1"));
        assert_eq!(link.display.as_deref(), Some("site"));
        let link = sheet.cell(4, 3).and_then(|c| c.hyperlink.clone()).unwrap();
        assert_eq!(link.location.as_deref(), Some("Summary!A1"));
        assert_eq!(sheet.hyperlinks().count(), 2);
    }

    #[test]
    fn test_parse_comments() {
        let xml = r#"<comments><authors><author>Ana</author><author>Luis</author></authors><commentList><comment ref="B3" authorId="1"><text><r><rPr><b/></rPr><t>Luis:</t></r><r><t xml:space="preserve"> paid late</t></r></text></comment><comment ref="A1" authorId="0"><text><t>header</t></text></comment></commentList></comments>"#;
        let comments = parse_comments(xml).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].0, CellRef::new(3, 2));
        assert_eq!(comments[0].1.author, "Luis");
        assert_eq!(comments[0].1.text, "Luis: paid late");
        assert_eq!(comments[1].1.author, "Ana");
        assert_eq!(comments[1].1.text, "header");
    }

    #[test]
    fn test_resolve_part() {
        assert_eq!(resolve_part(WORKBOOK_PART, "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_part(WORKBOOK_PART, "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_part("xl/worksheets/sheet1.xml", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(
            resolve_part("xl/worksheets/sheet1.xml", "../drawings/vmlDrawing1.vml"),
            "xl/drawings/vmlDrawing1.vml"
        );
        assert_eq!(rels_part_for("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
    }

    #[test]
    fn test_parse_iso_datetime() {
        assert!(parse_iso_datetime("2022-01-01T08:30:00").is_some());
        assert!(parse_iso_datetime("2022-01-01").is_some());
        assert!(parse_iso_datetime("January").is_none());
    }
}
