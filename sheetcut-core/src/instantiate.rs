//! Per-entity documents stamped out of a shared template

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::document::{CellValue, Document, Sheet};

/// Header text written by the preview output
pub const PLACEHOLDER_HEADER: &str = "Name";

/// Entity name of a ledger file: its stem without ASCII digits, trimmed
pub fn entity_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    stem.chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameColumn {
    Found(u32),
    NotFound,
}

/// First column whose row-1 header equals `header`, ignoring case
pub fn find_name_column(sheet: &Sheet, header: &str) -> NameColumn {
    let header = header.to_lowercase();
    sheet
        .row(1)
        .and_then(|row| {
            row.cells.iter().position(|cell| {
                cell.value
                    .as_text()
                    .is_some_and(|text| text.to_lowercase() == header)
            })
        })
        .map(|idx| NameColumn::Found(idx as u32 + 1))
        .unwrap_or(NameColumn::NotFound)
}

/// What goes into the name header of an instantiated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderLabel {
    Entity(String),
    /// Keep the generic header, for previewing the template itself
    Placeholder,
}

impl HeaderLabel {
    pub fn text(&self) -> &str {
        match self {
            HeaderLabel::Entity(name) => name,
            HeaderLabel::Placeholder => PLACEHOLDER_HEADER,
        }
    }
}

/// Copy `template` and write `label` into the name header of its first sheet
pub fn instantiate(template: &Document, label: &HeaderLabel, header: &str) -> Result<(Document, NameColumn)> {
    let mut document = template.clone();
    let sheet = document
        .sheet_at_mut(0)
        .context("Template has no sheets")?;

    let column = find_name_column(sheet, header);
    match column {
        NameColumn::Found(col) => {
            sheet
                .cell_mut(1, col)
                .set_value(CellValue::Text(label.text().to_string()));
        }
        NameColumn::NotFound => {
            tracing::warn!(sheet = %sheet.name(), header, "Template has no name column");
        }
    }
    Ok((document, column))
}

/// `<entity><suffix>.xlsx` inside `dest`
pub fn output_path(dest: &Path, entity: &str, suffix: &str) -> PathBuf {
    dest.join(format!("{}{}.xlsx", entity, suffix))
}
