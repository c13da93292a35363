//! XLSX package writer: regenerates worksheet and style parts, copies the rest

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::Document;
use super::cell_ref::{CellRef, column_letters};
use super::serial::datetime_to_serial;
use super::workbook::{Cell, CellValue, ColumnFormat, Row, RowFormat, Sheet};
use super::xlsx_parser::{STYLES_PART, WORKBOOK_PART, WORKBOOK_RELS_PART};
use super::xml_utils::{attr_value, skip_element};

const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

const DEFAULT_LAYOUT: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    r#"<sheetData/>"#,
    r#"<pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/>"#,
    r#"</worksheet>"#
);

const MAIN_NAMESPACE: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

/// Worksheet elements that come after `<hyperlinks>`
const AFTER_HYPERLINKS: &[&[u8]] = &[
    b"printOptions",
    b"pageMargins",
    b"pageSetup",
    b"headerFooter",
    b"rowBreaks",
    b"colBreaks",
    b"customProperties",
    b"cellWatches",
    b"ignoredErrors",
    b"smartTags",
    b"drawing",
    b"legacyDrawing",
    b"legacyDrawingHF",
    b"picture",
    b"oleObjects",
    b"controls",
    b"webPublishItems",
    b"tableParts",
];

/// Elements that may follow `<calcPr>` inside `<workbook>`
const AFTER_CALC_PR: &[&[u8]] = &[
    b"oleSize",
    b"customWorkbookViews",
    b"pivotCaches",
    b"smartTagPr",
    b"smartTagTypes",
    b"webPublishing",
    b"fileRecoveryPr",
    b"webPublishObjects",
    b"extLst",
];

/// Serialize a document into XLSX package bytes.
///
/// The calculation chain is dropped and a full recalculation is requested on
/// load, so cells written as formulas without cached values show up computed.
pub(crate) fn write_document(document: &Document) -> Result<Vec<u8>> {
    let mut sheet_parts: HashMap<&str, &Sheet> = HashMap::new();
    let mut comment_parts: HashMap<&str, &Sheet> = HashMap::new();
    let mut vml_parts: HashMap<&str, (usize, &Sheet)> = HashMap::new();
    for (index, sheet) in document.sheets.iter().enumerate() {
        let part = sheet
            .part
            .as_deref()
            .with_context(|| format!("Sheet '{}' has no package part", sheet.name))?;
        sheet_parts.insert(part, sheet);
        if let Some(comments) = sheet.comments_part.as_deref() {
            comment_parts.insert(comments, sheet);
        }
        if let Some(vml) = sheet.vml_part.as_deref() {
            vml_parts.insert(vml, (index, sheet));
        }
    }

    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, bytes) in &document.parts {
        if name == CALC_CHAIN_PART {
            continue;
        }

        let content: Vec<u8> = if let Some(sheet) = sheet_parts.get(name.as_str()) {
            write_worksheet(sheet, document.date1904)
                .with_context(|| format!("Failed to write sheet '{}'", sheet.name))?
                .into_bytes()
        } else if let Some(sheet) = comment_parts.get(name.as_str()) {
            write_comments(sheet)?.into_bytes()
        } else if let Some((index, sheet)) = vml_parts.get(name.as_str()) {
            write_comment_drawing(sheet, *index).into_bytes()
        } else if name == STYLES_PART {
            match document.styles.to_xml()? {
                Some(xml) => xml.into_bytes(),
                None => bytes.clone(),
            }
        } else if name == WORKBOOK_PART {
            force_full_calc_on_load(std::str::from_utf8(bytes)?)?.into_bytes()
        } else if name == CONTENT_TYPES_PART {
            remove_calc_chain_content_type(std::str::from_utf8(bytes)?)?.into_bytes()
        } else if name == WORKBOOK_RELS_PART {
            remove_calc_chain_relationship(std::str::from_utf8(bytes)?)?.into_bytes()
        } else {
            bytes.clone()
        };

        zip_writer.start_file(name.as_str(), options)?;
        zip_writer.write_all(&content)?;
    }

    Ok(zip_writer.finish()?.into_inner())
}

/// Replay the sheet's layout skeleton, filling in columns, panes and cell data
fn write_worksheet(sheet: &Sheet, date1904: bool) -> Result<String> {
    let layout = sheet.layout_xml.as_deref().unwrap_or(DEFAULT_LAYOUT);
    let mut reader = Reader::from_str(layout);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut views_written = false;
    let mut in_sheet_view = false;
    let mut links_written = false;

    loop {
        let event = reader.read_event().context("Failed to parse worksheet layout")?;
        if let Event::Start(e) | Event::Empty(e) = &event
            && !views_written
            && is_after_sheet_views(e)
        {
            // No <sheetViews> in the layout; it goes right before these
            views_written = true;
            write_sheet_views(&mut writer, sheet.freeze_panes)?;
        }
        let before_links = match &event {
            Event::Start(e) | Event::Empty(e) => AFTER_HYPERLINKS.contains(&e.name().as_ref()),
            Event::End(e) => e.name().as_ref() == b"worksheet",
            _ => false,
        };
        if before_links && !links_written {
            links_written = true;
            write_hyperlinks(&mut writer, sheet)?;
        }

        match event {
            Event::Start(e) if e.name().as_ref() == b"sheetViews" => {
                views_written = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::Empty(e) if e.name().as_ref() == b"sheetViews" => {
                views_written = true;
                if has_frozen_pane(sheet.freeze_panes) {
                    write_sheet_views(&mut writer, sheet.freeze_panes)?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Start(e) if e.name().as_ref() == b"hyperlinks" => {
                skip_element(&mut reader)?;
                links_written = true;
                write_hyperlinks(&mut writer, sheet)?;
            }
            Event::Empty(e) if e.name().as_ref() == b"hyperlinks" => {
                links_written = true;
                write_hyperlinks(&mut writer, sheet)?;
            }
            Event::Start(e) if e.name().as_ref() == b"sheetView" => {
                in_sheet_view = true;
                writer.write_event(Event::Start(e))?;
                write_pane(&mut writer, sheet.freeze_panes)?;
            }
            Event::Empty(e) if e.name().as_ref() == b"sheetView" => {
                writer.write_event(Event::Start(e.borrow()))?;
                write_pane(&mut writer, sheet.freeze_panes)?;
                writer.write_event(Event::End(e.to_end()))?;
            }
            Event::End(e) if e.name().as_ref() == b"sheetView" => {
                in_sheet_view = false;
                writer.write_event(Event::End(e))?;
            }
            // Panes and selections are regenerated from `freeze_panes`
            Event::Empty(e) if in_sheet_view && is_pane_child(&e) => {}
            Event::Start(e) if in_sheet_view && is_pane_child(&e) => skip_element(&mut reader)?,
            Event::Start(e) if e.name().as_ref() == b"cols" => skip_element(&mut reader)?,
            Event::Empty(e) if e.name().as_ref() == b"cols" => {}
            Event::Start(e) if e.name().as_ref() == b"sheetData" => {
                skip_element(&mut reader)?;
                write_columns(&mut writer, &sheet.columns)?;
                write_sheet_data(&mut writer, sheet, date1904)?;
            }
            Event::Empty(e) if e.name().as_ref() == b"sheetData" => {
                write_columns(&mut writer, &sheet.columns)?;
                write_sheet_data(&mut writer, sheet, date1904)?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn has_frozen_pane(anchor: Option<CellRef>) -> bool {
    anchor.is_some_and(|a| a != CellRef::new(1, 1))
}

fn write_sheet_views(writer: &mut Writer<Cursor<Vec<u8>>>, anchor: Option<CellRef>) -> Result<()> {
    if !has_frozen_pane(anchor) {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new("sheetViews")))?;
    let mut view = BytesStart::new("sheetView");
    view.push_attribute(("workbookViewId", "0"));
    writer.write_event(Event::Start(view))?;
    write_pane(writer, anchor)?;
    writer.write_event(Event::End(BytesEnd::new("sheetView")))?;
    writer.write_event(Event::End(BytesEnd::new("sheetViews")))?;
    Ok(())
}

fn is_pane_child(e: &BytesStart<'_>) -> bool {
    matches!(e.name().as_ref(), b"pane" | b"selection")
}

fn is_after_sheet_views(e: &BytesStart<'_>) -> bool {
    matches!(e.name().as_ref(), b"sheetFormatPr" | b"cols" | b"sheetData")
}

/// Write a frozen `<pane>` whose scrollable region starts at `anchor`
fn write_pane(writer: &mut Writer<Cursor<Vec<u8>>>, anchor: Option<CellRef>) -> Result<()> {
    let Some(anchor) = anchor else {
        return Ok(());
    };
    let (x_split, y_split) = (anchor.col - 1, anchor.row - 1);
    if x_split == 0 && y_split == 0 {
        return Ok(());
    }

    let active = match (x_split > 0, y_split > 0) {
        (true, true) => "bottomRight",
        (false, true) => "bottomLeft",
        _ => "topRight",
    };
    let (x, y, top_left) = (x_split.to_string(), y_split.to_string(), anchor.to_string());
    let mut pane = BytesStart::new("pane");
    if x_split > 0 {
        pane.push_attribute(("xSplit", x.as_str()));
    }
    if y_split > 0 {
        pane.push_attribute(("ySplit", y.as_str()));
    }
    pane.push_attribute(("topLeftCell", top_left.as_str()));
    pane.push_attribute(("activePane", active));
    pane.push_attribute(("state", "frozen"));
    writer.write_event(Event::Empty(pane))?;

    let mut selection = BytesStart::new("selection");
    selection.push_attribute(("pane", active));
    writer.write_event(Event::Empty(selection))?;
    Ok(())
}

/// `<hyperlinks>` rebuilt from the cells that carry one
fn write_hyperlinks(writer: &mut Writer<Cursor<Vec<u8>>>, sheet: &Sheet) -> Result<()> {
    let mut links = sheet.hyperlinks().peekable();
    if links.peek().is_none() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new("hyperlinks")))?;
    for (anchor, link) in links {
        let reference = anchor.to_string();
        let mut elem = BytesStart::new("hyperlink");
        elem.push_attribute(("ref", reference.as_str()));
        let attributes = [
            ("r:id", &link.rel_id),
            ("location", &link.location),
            ("display", &link.display),
            ("tooltip", &link.tooltip),
        ];
        for (key, value) in attributes {
            if let Some(value) = value {
                elem.push_attribute((key, value.as_str()));
            }
        }
        writer.write_event(Event::Empty(elem))?;
    }
    writer.write_event(Event::End(BytesEnd::new("hyperlinks")))?;
    Ok(())
}

/// Comments part rebuilt from the cells that carry one
fn write_comments(sheet: &Sheet) -> Result<String> {
    let comments: Vec<_> = sheet.comments().collect();
    let mut authors: Vec<&str> = Vec::new();
    for (_, comment) in &comments {
        if !authors.contains(&comment.author.as_str()) {
            authors.push(&comment.author);
        }
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    let mut root = BytesStart::new("comments");
    root.push_attribute(("xmlns", MAIN_NAMESPACE));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("authors")))?;
    for author in &authors {
        write_text_element(&mut writer, "author", author)?;
    }
    writer.write_event(Event::End(BytesEnd::new("authors")))?;

    writer.write_event(Event::Start(BytesStart::new("commentList")))?;
    for (anchor, comment) in &comments {
        let reference = anchor.to_string();
        let author_id = authors
            .iter()
            .position(|a| *a == comment.author)
            .unwrap_or(0)
            .to_string();
        let mut elem = BytesStart::new("comment");
        elem.push_attribute(("ref", reference.as_str()));
        elem.push_attribute(("authorId", author_id.as_str()));
        writer.write_event(Event::Start(elem))?;
        writer.write_event(Event::Start(BytesStart::new("text")))?;
        let mut t = BytesStart::new("t");
        t.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(t))?;
        writer.write_event(Event::Text(BytesText::new(&comment.text)))?;
        writer.write_event(Event::End(BytesEnd::new("t")))?;
        writer.write_event(Event::End(BytesEnd::new("text")))?;
        writer.write_event(Event::End(BytesEnd::new("comment")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("commentList")))?;
    writer.write_event(Event::End(BytesEnd::new("comments")))?;

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

/// Legacy drawing with one hidden note box per comment; the text itself lives
/// in the comments part
fn write_comment_drawing(sheet: &Sheet, sheet_index: usize) -> String {
    let block = sheet_index + 1;
    let mut xml = format!(
        concat!(
            r##"<xml xmlns:v="urn:schemas-microsoft-com:vml" xmlns:o="urn:schemas-microsoft-com:office:office" xmlns:x="urn:schemas-microsoft-com:office:excel">"##,
            r##"<o:shapelayout v:ext="edit"><o:idmap v:ext="edit" data="{}"/></o:shapelayout>"##,
            r##"<v:shapetype id="_x0000_t202" coordsize="21600,21600" o:spt="202" path="m,l,21600r21600,l21600,xe">"##,
            r##"<v:stroke joinstyle="miter"/><v:path gradientshapeok="t" o:connecttype="rect"/></v:shapetype>"##
        ),
        block
    );
    for (n, (anchor, _)) in sheet.comments().enumerate() {
        let (row, col) = (anchor.row - 1, anchor.col - 1);
        let top = row.saturating_sub(1);
        xml.push_str(&format!(
            concat!(
                r##"<v:shape id="_x0000_s{}" type="#_x0000_t202" "##,
                r##"style="position:absolute;margin-left:59.25pt;margin-top:1.5pt;width:108pt;height:59.25pt;z-index:{};visibility:hidden" "##,
                r##"fillcolor="#ffffe1" o:insetmode="auto">"##,
                r##"<v:fill color2="#ffffe1"/><v:shadow on="t" color="black" obscured="t"/><v:path o:connecttype="none"/>"##,
                r##"<v:textbox style="mso-direction-alt:auto"><div style="text-align:left"></div></v:textbox>"##,
                r##"<x:ClientData ObjectType="Note"><x:MoveWithCells/><x:SizeWithCells/>"##,
                r##"<x:Anchor>{}, 15, {}, 10, {}, 15, {}, 4</x:Anchor><x:AutoFill>False</x:AutoFill>"##,
                r##"<x:Row>{}</x:Row><x:Column>{}</x:Column></x:ClientData></v:shape>"##
            ),
            block * 1024 + n + 1,
            n + 1,
            col + 1,
            top,
            col + 3,
            top + 4,
            row,
            col
        ));
    }
    xml.push_str("</xml>");
    xml
}

fn write_columns(writer: &mut Writer<Cursor<Vec<u8>>>, columns: &[ColumnFormat]) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new("cols")))?;
    for column in columns {
        let (min, max) = (column.min.to_string(), column.max.to_string());
        let width = column.width.map(|w| w.to_string());
        let style = column.style.map(|s| s.to_string());
        let mut col = BytesStart::new("col");
        col.push_attribute(("min", min.as_str()));
        col.push_attribute(("max", max.as_str()));
        if let Some(width) = &width {
            col.push_attribute(("width", width.as_str()));
        }
        if let Some(style) = &style {
            col.push_attribute(("style", style.as_str()));
        }
        if column.hidden {
            col.push_attribute(("hidden", "1"));
        }
        if column.custom_width {
            col.push_attribute(("customWidth", "1"));
        }
        writer.write_event(Event::Empty(col))?;
    }
    writer.write_event(Event::End(BytesEnd::new("cols")))?;
    Ok(())
}

fn write_sheet_data(writer: &mut Writer<Cursor<Vec<u8>>>, sheet: &Sheet, date1904: bool) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (idx, row) in sheet.rows.iter().enumerate() {
        let number = idx as u32 + 1;
        write_row(writer, number, row, sheet.row_formats.get(&number), date1904)?;
    }
    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    Ok(())
}

fn is_written(cell: &Cell) -> bool {
    !cell.is_blank() || cell.style.is_some()
}

fn write_row(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    number: u32,
    row: &Row,
    format: Option<&RowFormat>,
    date1904: bool,
) -> Result<()> {
    if format.is_none() && !row.cells.iter().any(is_written) {
        return Ok(());
    }

    let r = number.to_string();
    let mut elem = BytesStart::new("row");
    elem.push_attribute(("r", r.as_str()));
    let height = format.and_then(|f| f.height).map(|h| h.to_string());
    let style = format.and_then(|f| f.style).map(|s| s.to_string());
    if let Some(style) = &style {
        elem.push_attribute(("s", style.as_str()));
        elem.push_attribute(("customFormat", "1"));
    }
    if let Some(height) = &height {
        elem.push_attribute(("ht", height.as_str()));
    }
    if format.is_some_and(|f| f.hidden) {
        elem.push_attribute(("hidden", "1"));
    }
    if format.is_some_and(|f| f.custom_height) {
        elem.push_attribute(("customHeight", "1"));
    }

    if !row.cells.iter().any(is_written) {
        writer.write_event(Event::Empty(elem))?;
        return Ok(());
    }

    writer.write_event(Event::Start(elem))?;
    for (idx, cell) in row.cells.iter().enumerate() {
        if is_written(cell) {
            let reference = format!("{}{}", column_letters(idx as u32 + 1), number);
            write_cell(writer, &reference, cell, date1904)?;
        }
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_cell(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    reference: &str,
    cell: &Cell,
    date1904: bool,
) -> Result<()> {
    let style = cell.style.map(|s| s.to_string());
    let mut elem = BytesStart::new("c");
    elem.push_attribute(("r", reference));
    if let Some(style) = &style {
        elem.push_attribute(("s", style.as_str()));
    }

    if let Some(formula) = &cell.formula {
        writer.write_event(Event::Start(elem))?;
        write_text_element(writer, "f", formula)?;
        writer.write_event(Event::End(BytesEnd::new("c")))?;
        return Ok(());
    }

    let (kind, value) = match &cell.value {
        CellValue::Empty => {
            writer.write_event(Event::Empty(elem))?;
            return Ok(());
        }
        CellValue::Text(text) => {
            elem.push_attribute(("t", "inlineStr"));
            writer.write_event(Event::Start(elem))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
            return Ok(());
        }
        CellValue::Number(n) if n.is_finite() => (None, n.to_string()),
        CellValue::Number(_) => (Some("e"), "#NUM!".to_string()),
        CellValue::Boolean(b) => (Some("b"), if *b { "1" } else { "0" }.to_string()),
        CellValue::Date(d) => (None, datetime_to_serial(*d, date1904).to_string()),
        CellValue::Error(e) => (Some("e"), e.clone()),
    };

    if let Some(kind) = kind {
        elem.push_attribute(("t", kind));
    }
    writer.write_event(Event::Start(elem))?;
    write_text_element(writer, "v", &value)?;
    writer.write_event(Event::End(BytesEnd::new("c")))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Cursor<Vec<u8>>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Set `fullCalcOnLoad` on `<calcPr>`, adding the element if needed
fn force_full_calc_on_load(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut written = false;

    loop {
        match reader.read_event().context("Failed to parse workbook.xml")? {
            Event::Empty(e) if e.name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Empty(with_full_calc(&e)))?;
                written = true;
            }
            Event::Start(e) if e.name().as_ref() == b"calcPr" => {
                writer.write_event(Event::Empty(with_full_calc(&e)))?;
                skip_element(&mut reader)?;
                written = true;
            }
            Event::Empty(e) if !written && AFTER_CALC_PR.contains(&e.name().as_ref()) => {
                write_calc_pr(&mut writer)?;
                written = true;
                writer.write_event(Event::Empty(e))?;
            }
            Event::Start(e) if !written && AFTER_CALC_PR.contains(&e.name().as_ref()) => {
                write_calc_pr(&mut writer)?;
                written = true;
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) if !written && e.name().as_ref() == b"workbook" => {
                write_calc_pr(&mut writer)?;
                written = true;
                writer.write_event(Event::End(e))?;
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn with_full_calc<'a>(e: &'a BytesStart<'_>) -> BytesStart<'a> {
    let mut calc = BytesStart::new("calcPr");
    calc.extend_attributes(
        e.attributes()
            .flatten()
            .filter(|a| a.key.as_ref() != b"fullCalcOnLoad"),
    );
    calc.push_attribute(("fullCalcOnLoad", "1"));
    calc
}

fn write_calc_pr(writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
    let mut calc = BytesStart::new("calcPr");
    calc.push_attribute(("fullCalcOnLoad", "1"));
    writer.write_event(Event::Empty(calc))?;
    Ok(())
}

fn remove_calc_chain_content_type(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        match reader.read_event().context("Failed to parse [Content_Types].xml")? {
            Event::Empty(e) if e.name().as_ref() == b"Override" => {
                let part_name = attr_value(&e, b"PartName")?.unwrap_or_default();
                if part_name != format!("/{}", CALC_CHAIN_PART) {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn remove_calc_chain_relationship(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    loop {
        match reader.read_event().context("Failed to parse workbook relationships")? {
            Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let target = attr_value(&e, b"Target")?.unwrap_or_default();
                if !target.ends_with("calcChain.xml") {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            e => writer.write_event(e)?,
        }
    }

    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}
