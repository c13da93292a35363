//! Two-way split of a ledger sheet around the cutoff

use anyhow::{Context, Result};

use crate::classify::{RowClass, RowClassifier};
use crate::document::{Document, Row, Sheet};

/// Counts gathered while splitting one sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Rows examined before the scan ended
    pub scanned: u32,
    pub pass_through: u32,
    pub kept: u32,
    pub skipped: u32,
    pub blank: u32,
    /// Source row at which the blank run stopped the scan
    pub truncated_at: Option<u32>,
}

impl SplitSummary {
    /// Rows written to the output sheet
    pub fn written(&self) -> u32 {
        self.pass_through + self.kept
    }
}

/// Build a sheet holding the pass-through and kept rows of `source`, renumbered
/// from 1 in their original order.
///
/// Every row is read as the first `scan_columns` cells, capped at the sheet's
/// widest row and padded with empty cells. Values, styles, hyperlinks and
/// comments travel with their cells; row heights travel with their rows.
pub fn split_sheet(
    source: &Sheet,
    mut classifier: RowClassifier,
    scan_columns: u32,
) -> (Sheet, SplitSummary) {
    let mut output = Sheet::new(source.name());
    let mut summary = SplitSummary::default();
    let width = source.max_column().min(scan_columns) as usize;

    for (idx, row) in source.rows.iter().enumerate() {
        let number = idx as u32 + 1;
        let mut cells: Vec<_> = row.cells.iter().take(width).cloned().collect();
        cells.resize_with(width, Default::default);
        let row = Row::new(cells);

        summary.scanned += 1;
        let class = classifier.classify(&row);
        match class {
            RowClass::PassThrough => summary.pass_through += 1,
            RowClass::Keep => summary.kept += 1,
            RowClass::Skip => summary.skipped += 1,
            RowClass::Blank => summary.blank += 1,
            RowClass::EndOfData => {
                summary.blank += 1;
                summary.truncated_at = Some(number);
                break;
            }
        }

        if matches!(class, RowClass::PassThrough | RowClass::Keep) {
            let moved_to = output.push_row(row);
            if let Some(format) = source.row_formats.get(&number) {
                output.row_formats.insert(moved_to, format.clone());
            }
        }
    }

    (output, summary)
}

/// Split the first sheet of `document` in place
pub fn split_document(
    document: &mut Document,
    classifier: RowClassifier,
    scan_columns: u32,
) -> Result<SplitSummary> {
    let source = document
        .sheet_at(0)
        .context("Workbook has no sheets to split")?;
    let title = source.name().to_string();
    let mode = classifier.mode();
    let (sheet, summary) = split_sheet(source, classifier, scan_columns);

    tracing::debug!(
        sheet = %title,
        ?mode,
        scanned = summary.scanned,
        written = summary.written(),
        truncated_at = ?summary.truncated_at,
        "Split sheet"
    );
    document.replace_sheet(&title, sheet)?;
    Ok(summary)
}
