//! In-memory spreadsheet documents backed by an XLSX package

pub mod cell_ref;
pub mod serial;
pub mod styles;
pub mod workbook;
mod xlsx_parser;
mod xlsx_writer;
mod xml_utils;

pub use cell_ref::CellRef;
pub use styles::StyleSheet;
pub use workbook::{Cell, CellValue, ColumnFormat, Comment, Hyperlink, Row, RowFormat, Sheet};

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// A raw package entry: (path inside the archive, bytes)
pub(crate) type Part = (String, Vec<u8>);

/// What a loaded cell holds when it has both a formula and a cached result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Keep formulas, drop cached results
    Formulas,
    /// Keep the last computed value, drop formulas
    ValuesOnly,
}

/// An opened workbook: its sheets plus every other package part untouched
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) parts: Vec<Part>,
    pub(crate) sheets: Vec<Sheet>,
    pub(crate) styles: StyleSheet,
    pub(crate) date1904: bool,
}

impl Document {
    pub fn from_bytes(bytes: &[u8], mode: LoadMode) -> Result<Self> {
        xlsx_parser::read_document(bytes, mode)
    }

    /// Open a workbook file
    pub fn open(path: &Path, mode: LoadMode) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_bytes(&bytes, mode)
            .with_context(|| format!("Failed to load workbook {}", path.display()))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Sheet by display position
    pub fn sheet_at(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_at_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    /// Put `sheet` in place of the sheet titled `title`, keeping its position,
    /// title and layout. Returns the sheet that was removed.
    pub fn replace_sheet(&mut self, title: &str, mut sheet: Sheet) -> Result<Sheet> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.name == title)
            .with_context(|| format!("Sheet '{}' not found", title))?;
        let old = &self.sheets[index];
        sheet.name = old.name.clone();
        sheet.copy_layout_from(old);
        Ok(std::mem::replace(&mut self.sheets[index], sheet))
    }

    pub fn styles(&self) -> &StyleSheet {
        &self.styles
    }

    pub fn styles_mut(&mut self) -> &mut StyleSheet {
        &mut self.styles
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        xlsx_writer::write_document(self)
    }

    /// Write the workbook to `path`, replacing any existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
    }
}
