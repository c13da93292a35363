//! Common XML helpers shared by the reader and the writer

use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Unescaped value of the attribute named `key`, if present
pub fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Interpret an XML boolean attribute value
pub fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

/// Read text content until the current element closes
pub fn read_text_node(reader: &mut Reader<&[u8]>) -> Result<String> {
    let mut text = String::new();
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(e.unescape()?.as_ref()),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}

/// Skip everything up to and including the end tag matching an already-read start tag
pub fn skip_element(reader: &mut Reader<&[u8]>) -> Result<()> {
    let mut depth = 0usize;
    loop {
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth > 0 => depth -= 1,
            Event::End(_) => break,
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}
