//! Workbook data structures

use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use super::cell_ref::CellRef;

/// Represents a worksheet: dense rows plus the non-cell metadata that travels with it
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub(crate) name: String,
    /// Row `n` lives at index `n - 1`
    pub rows: Vec<Row>,
    /// Column widths/hidden flags as `<col>` spans
    pub columns: Vec<ColumnFormat>,
    /// Row heights/hidden flags keyed by 1-based row number
    pub row_formats: BTreeMap<u32, RowFormat>,
    /// Top-left cell of the scrollable region when panes are frozen
    pub freeze_panes: Option<CellRef>,
    /// Internal path to the sheet XML file in the ZIP archive
    pub(crate) part: Option<String>,
    /// Source worksheet XML with its cell data removed; merged regions,
    /// margins and the rest are replayed from here on save
    pub(crate) layout_xml: Option<String>,
    /// Comments part and its VML drawing, regenerated from the cells on save
    pub(crate) comments_part: Option<String>,
    pub(crate) vml_part: Option<String>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows, including trailing rows that only carry formatting
    pub fn max_row(&self) -> u32 {
        self.rows.len() as u32
    }

    /// Widest row in the sheet
    pub fn max_column(&self) -> u32 {
        self.rows.iter().map(Row::width).max().unwrap_or(0)
    }

    /// Get a row by its 1-based number
    pub fn row(&self, row: u32) -> Option<&Row> {
        row.checked_sub(1)
            .and_then(|idx| self.rows.get(idx as usize))
    }

    /// Get a row by its 1-based number, growing the sheet as needed
    pub fn row_mut(&mut self, row: u32) -> &mut Row {
        let idx = row.max(1) as usize - 1;
        if self.rows.len() <= idx {
            self.rows.resize_with(idx + 1, Row::default);
        }
        &mut self.rows[idx]
    }

    /// Append a row at the end, returning its 1-based number
    pub fn push_row(&mut self, row: Row) -> u32 {
        self.rows.push(row);
        self.rows.len() as u32
    }

    /// Get a cell at the given 1-based position
    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.row(row).and_then(|r| r.cell(col))
    }

    /// Get a cell at the given 1-based position, creating it if absent
    pub fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.row_mut(row).cell_mut(col)
    }

    /// Take over the column sizing, panes and package layout of `source`.
    /// Row formats stay with the rows they belong to.
    pub fn copy_layout_from(&mut self, source: &Sheet) {
        self.columns = source.columns.clone();
        self.freeze_panes = source.freeze_panes;
        self.part = source.part.clone();
        self.layout_xml = source.layout_xml.clone();
        self.comments_part = source.comments_part.clone();
        self.vml_part = source.vml_part.clone();
    }

    /// Cells carrying a hyperlink, in row-major order
    pub fn hyperlinks(&self) -> impl Iterator<Item = (CellRef, &Hyperlink)> {
        self.anchored(|cell| cell.hyperlink.as_ref())
    }

    /// Cells carrying a comment, in row-major order
    pub fn comments(&self) -> impl Iterator<Item = (CellRef, &Comment)> {
        self.anchored(|cell| cell.comment.as_ref())
    }

    fn anchored<'a, T: 'a>(
        &'a self,
        pick: fn(&'a Cell) -> Option<&'a T>,
    ) -> impl Iterator<Item = (CellRef, &'a T)> {
        self.rows.iter().enumerate().flat_map(move |(r, row)| {
            row.cells.iter().enumerate().filter_map(move |(c, cell)| {
                pick(cell).map(|item| (CellRef::new(r as u32 + 1, c as u32 + 1), item))
            })
        })
    }
}

/// An ordered run of cells; column `n` lives at index `n - 1`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Number of cell slots in the row
    pub fn width(&self) -> u32 {
        self.cells.len() as u32
    }

    pub fn cell(&self, col: u32) -> Option<&Cell> {
        col.checked_sub(1)
            .and_then(|idx| self.cells.get(idx as usize))
    }

    pub fn cell_mut(&mut self, col: u32) -> &mut Cell {
        let idx = col.max(1) as usize - 1;
        if self.cells.len() <= idx {
            self.cells.resize_with(idx + 1, Cell::default);
        }
        &mut self.cells[idx]
    }

    /// True when no cell holds a value or formula
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_blank)
    }
}

/// Represents a single cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
    /// Index into the workbook's cell formats
    pub style: Option<u32>,
    pub hyperlink: Option<Hyperlink>,
    pub comment: Option<Comment>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: u32) -> Self {
        self.style = Some(style);
        self
    }

    /// Replace the content with a literal value
    pub fn set_value(&mut self, value: CellValue) {
        self.value = value;
        self.formula = None;
    }

    /// Replace the content with a formula; a leading `=` is accepted
    pub fn set_formula(&mut self, formula: impl AsRef<str>) {
        let formula = formula.as_ref();
        self.formula = Some(formula.strip_prefix('=').unwrap_or(formula).to_string());
        self.value = CellValue::Empty;
    }

    /// Formula as typed in the editor, with the leading `=`
    pub fn formula_text(&self) -> Option<String> {
        self.formula.as_ref().map(|f| format!("={}", f))
    }

    pub fn is_blank(&self) -> bool {
        self.formula.is_none() && self.value.is_empty()
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDateTime),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

/// Link attached to a cell (`<hyperlink>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hyperlink {
    /// Relationship id of an external target in the sheet's rels part
    pub rel_id: Option<String>,
    /// Place inside the workbook, such as `Summary!A1`
    pub location: Option<String>,
    pub display: Option<String>,
    pub tooltip: Option<String>,
}

/// Note attached to a cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comment {
    pub author: String,
    pub text: String,
}

/// Width/visibility of a span of columns (`<col min max ...>`)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnFormat {
    pub min: u32,
    pub max: u32,
    pub width: Option<f64>,
    pub custom_width: bool,
    pub hidden: bool,
    pub style: Option<u32>,
}

/// Height/visibility of a single row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowFormat {
    pub height: Option<f64>,
    pub custom_height: bool,
    pub hidden: bool,
    pub style: Option<u32>,
}
