//! Cell format table (`xl/styles.xml`): number format lookup and custom format registration

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use std::io::Cursor;

use super::xml_utils::attr_value;

/// First id available for custom number formats
const FIRST_CUSTOM_FORMAT_ID: u32 = 164;

/// Built-in number formats (simplified subset)
fn builtin_format(id: u32) -> Option<&'static str> {
    Some(match id {
        0 => "General",
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

/// Decide whether a number format code renders a date or time
pub fn is_date_format(code: &str) -> bool {
    let mut plain = String::with_capacity(code.len());
    let mut chars = code.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                for inner in chars.by_ref() {
                    if inner == '"' {
                        break;
                    }
                }
            }
            '[' => {
                let mut section = String::new();
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                    section.push(inner);
                }
                // Elapsed time sections like [h] count; colors and locales do not
                if matches!(section.to_ascii_lowercase().as_str(), "h" | "hh" | "m" | "mm" | "s" | "ss") {
                    plain.push('h');
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            _ => plain.push(ch.to_ascii_lowercase()),
        }
    }

    if plain.contains("general") {
        return false;
    }
    plain.contains('d')
        || plain.contains('y')
        || ((plain.contains('m') || plain.contains('h') || plain.contains('s'))
            && !plain.contains('#'))
}

/// Parsed view of `xl/styles.xml` plus any formats registered since loading
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    xml: Option<String>,
    custom_formats: BTreeMap<u32, String>,
    /// numFmtId for each entry of `<cellXfs>`, indexed by style index
    cell_formats: Vec<u32>,
    added_formats: Vec<(u32, String)>,
    added_cell_formats: Vec<u32>,
}

impl StyleSheet {
    /// Parse a stylesheet; `None` means the package has no styles part
    pub fn parse(xml: Option<String>) -> Result<Self> {
        let Some(xml) = xml else {
            return Ok(Self::default());
        };

        let mut custom_formats = BTreeMap::new();
        let mut cell_formats = Vec::new();
        {
            let mut reader = Reader::from_str(&xml);
            reader.config_mut().trim_text(true);
            let mut in_cell_xfs = false;
            loop {
                match reader.read_event().context("Failed to parse styles.xml")? {
                    Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                        b"numFmt" => {
                            let id = attr_value(&e, b"numFmtId")?.and_then(|v| v.parse().ok());
                            let code = attr_value(&e, b"formatCode")?;
                            if let (Some(id), Some(code)) = (id, code) {
                                custom_formats.insert(id, code);
                            }
                        }
                        b"cellXfs" => in_cell_xfs = true,
                        b"xf" if in_cell_xfs => {
                            let id = attr_value(&e, b"numFmtId")?
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0);
                            cell_formats.push(id);
                        }
                        _ => {}
                    },
                    Event::End(e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
                    Event::Eof => break,
                    _ => {}
                }
            }
        }

        Ok(Self {
            xml: Some(xml),
            custom_formats,
            cell_formats,
            added_formats: Vec::new(),
            added_cell_formats: Vec::new(),
        })
    }

    /// Number format code applied by a style index
    pub fn number_format(&self, style: u32) -> Option<&str> {
        let id = *self.cell_formats.get(style as usize)?;
        self.custom_formats
            .get(&id)
            .map(String::as_str)
            .or_else(|| builtin_format(id))
    }

    /// Whether numbers carrying this style are dates
    pub fn is_date_style(&self, style: u32) -> bool {
        self.number_format(style).is_some_and(is_date_format)
    }

    /// Whether numbers carrying this style are stored as text ("@")
    pub fn is_text_style(&self, style: u32) -> bool {
        self.number_format(style) == Some("@")
    }

    /// Register a cell format that only sets `code` as number format.
    ///
    /// Returns the style index to assign to cells. Registering the same code
    /// twice returns the same index.
    pub fn add_number_format_style(&mut self, code: &str) -> Result<u32> {
        if self.xml.is_none() {
            anyhow::bail!("Workbook has no stylesheet to register format '{}'", code);
        }

        let format_id = match self.custom_formats.iter().find(|(_, c)| c.as_str() == code) {
            Some((id, _)) => *id,
            None => {
                let id = self
                    .custom_formats
                    .keys()
                    .next_back()
                    .map(|last| last + 1)
                    .unwrap_or(FIRST_CUSTOM_FORMAT_ID)
                    .max(FIRST_CUSTOM_FORMAT_ID);
                self.custom_formats.insert(id, code.to_string());
                self.added_formats.push((id, code.to_string()));
                id
            }
        };

        if let Some(pos) = self
            .cell_formats
            .iter()
            .skip(self.cell_formats.len() - self.added_cell_formats.len())
            .position(|id| *id == format_id)
        {
            let base = self.cell_formats.len() - self.added_cell_formats.len();
            return Ok((base + pos) as u32);
        }

        self.cell_formats.push(format_id);
        self.added_cell_formats.push(format_id);
        Ok((self.cell_formats.len() - 1) as u32)
    }

    pub fn is_modified(&self) -> bool {
        !self.added_formats.is_empty() || !self.added_cell_formats.is_empty()
    }

    /// Serialize the stylesheet with registered formats appended
    pub fn to_xml(&self) -> Result<Option<String>> {
        let Some(xml) = &self.xml else {
            return Ok(None);
        };
        if !self.is_modified() {
            return Ok(Some(xml.clone()));
        }

        let mut reader = Reader::from_str(xml);
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let mut formats_written = self.added_formats.is_empty();

        loop {
            match reader.read_event().context("Failed to parse styles.xml")? {
                Event::Start(e) if e.name().as_ref() == b"numFmts" => {
                    let count = self.custom_formats.len().to_string();
                    writer.write_event(Event::Start(with_count(&e, &count)))?;
                }
                Event::Empty(e) if e.name().as_ref() == b"numFmts" => {
                    let count = self.custom_formats.len().to_string();
                    writer.write_event(Event::Start(with_count(&e, &count)))?;
                    self.write_added_formats(&mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new("numFmts")))?;
                    formats_written = true;
                }
                Event::End(e) if e.name().as_ref() == b"numFmts" => {
                    self.write_added_formats(&mut writer)?;
                    writer.write_event(Event::End(e))?;
                    formats_written = true;
                }
                Event::Start(e) if e.name().as_ref() == b"fonts" && !formats_written => {
                    // No <numFmts> yet; it must precede <fonts>
                    let count = self.added_formats.len().to_string();
                    let mut num_fmts = BytesStart::new("numFmts");
                    num_fmts.push_attribute(("count", count.as_str()));
                    writer.write_event(Event::Start(num_fmts))?;
                    self.write_added_formats(&mut writer)?;
                    writer.write_event(Event::End(BytesEnd::new("numFmts")))?;
                    formats_written = true;
                    writer.write_event(Event::Start(e))?;
                }
                Event::Start(e) if e.name().as_ref() == b"cellXfs" => {
                    let count = self.cell_formats.len().to_string();
                    writer.write_event(Event::Start(with_count(&e, &count)))?;
                }
                Event::End(e) if e.name().as_ref() == b"cellXfs" => {
                    for format_id in &self.added_cell_formats {
                        let id = format_id.to_string();
                        let mut xf = BytesStart::new("xf");
                        xf.push_attribute(("numFmtId", id.as_str()));
                        xf.push_attribute(("fontId", "0"));
                        xf.push_attribute(("fillId", "0"));
                        xf.push_attribute(("borderId", "0"));
                        xf.push_attribute(("xfId", "0"));
                        xf.push_attribute(("applyNumberFormat", "1"));
                        writer.write_event(Event::Empty(xf))?;
                    }
                    writer.write_event(Event::End(e))?;
                }
                Event::Eof => break,
                e => writer.write_event(e)?,
            }
        }

        let result = writer.into_inner().into_inner();
        Ok(Some(String::from_utf8(result)?))
    }

    fn write_added_formats(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<()> {
        for (id, code) in &self.added_formats {
            let id = id.to_string();
            let mut num_fmt = BytesStart::new("numFmt");
            num_fmt.push_attribute(("numFmtId", id.as_str()));
            num_fmt.push_attribute(("formatCode", code.as_str()));
            writer.write_event(Event::Empty(num_fmt))?;
        }
        Ok(())
    }
}

/// Copy an element, replacing its `count` attribute
fn with_count<'a>(e: &'a BytesStart<'_>, count: &'a str) -> BytesStart<'a> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut elem = BytesStart::new(name);
    elem.extend_attributes(
        e.attributes()
            .flatten()
            .filter(|a| a.key.as_ref() != b"count"),
    );
    elem.push_attribute(("count", count));
    elem
}
