//! Formula fill-down for the current ledger
//!
//! Anchor formulas are captured once from a reference ledger and replayed on
//! every row appended below the split output, so new entries keep computing
//! without a manual fill.

use crate::document::{CellRef, CellValue, Document, Sheet};
use crate::formula::{TranslateError, translate_formula};

/// An anchor formula for one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaTemplate {
    /// 1-based column the formula fills
    pub column: u32,
    /// Formula text including the leading `=`
    pub formula: String,
    /// Where the formula was captured
    pub anchor: CellRef,
}

impl FormulaTemplate {
    /// The formula as it would read at `row` of the same column
    pub fn relocate(&self, row: u32) -> Result<String, TranslateError> {
        translate_formula(&self.formula, self.anchor, CellRef::new(row, self.column))
    }
}

/// Capture at most one template per column from `reference_row` of `reference`.
///
/// A cell qualifies when its content reads as a formula, that is it starts
/// with `=`.
pub fn capture_templates(reference: &Sheet, reference_row: u32, scan_columns: u32) -> Vec<FormulaTemplate> {
    let Some(row) = reference.row(reference_row) else {
        return Vec::new();
    };

    (1..=scan_columns)
        .filter_map(|column| {
            let cell = row.cell(column)?;
            let formula = match (&cell.formula, &cell.value) {
                (Some(_), _) => cell.formula_text()?,
                (None, CellValue::Text(text)) if text.starts_with('=') => text.clone(),
                _ => return None,
            };
            Some(FormulaTemplate {
                column,
                formula,
                anchor: CellRef::new(reference_row, column),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillSummary {
    /// First appended row
    pub first_row: u32,
    /// Last row that received formulas
    pub last_row: u32,
    pub filled: u32,
    pub failed: u32,
}

/// Write relocated templates into every row after the sheet's current end,
/// through `fill_rows` (or the current end, when it is already further down).
///
/// A template that cannot be moved to a given row leaves that cell without a
/// formula; the failure is logged and the fill continues.
pub fn extend_formulas(sheet: &mut Sheet, templates: &[FormulaTemplate], fill_rows: u32) -> FillSummary {
    let row_count = sheet.max_row();
    let mut summary = FillSummary {
        first_row: row_count + 1,
        last_row: fill_rows.max(row_count),
        ..Default::default()
    };
    if templates.is_empty() {
        return summary;
    }

    for row in summary.first_row..=summary.last_row {
        for template in templates {
            match template.relocate(row) {
                Ok(formula) => {
                    sheet.cell_mut(row, template.column).set_formula(formula);
                    summary.filled += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        sheet = %sheet.name(),
                        cell = %CellRef::new(row, template.column),
                        "Formula not relocated: {}",
                        err
                    );
                    summary.failed += 1;
                }
            }
        }
    }
    summary
}

/// Give every cell of `column` from `first_row` through `last_row` the style `style`
pub fn apply_column_style(sheet: &mut Sheet, column: u32, style: u32, first_row: u32, last_row: u32) {
    for row in first_row..=last_row {
        sheet.cell_mut(row, column).style = Some(style);
    }
}

/// Copy formulas from the same-named sheets of `reference` onto every sheet of
/// `target` after the first. Returns the number of cells restored.
pub fn restore_companion_formulas(target: &mut Document, reference: &Document) -> u32 {
    let mut restored = 0;
    for index in 1..target.sheets().len() {
        let Some(sheet) = target.sheet_at_mut(index) else {
            continue;
        };
        let Some(source) = reference.sheet(sheet.name()) else {
            tracing::debug!(sheet = %sheet.name(), "No reference sheet to restore formulas from");
            continue;
        };

        for (r, row) in source.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if let Some(formula) = &cell.formula {
                    sheet.cell_mut(r as u32 + 1, c as u32 + 1).set_formula(formula);
                    restored += 1;
                }
            }
        }
    }
    restored
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Sheet {
        let mut sheet = Sheet::new("Ledger");
        sheet.cell_mut(1, 1).set_value("Entity".into());
        sheet.cell_mut(2, 1).set_value("Acme".into());
        sheet.cell_mut(2, 7).set_formula("=IF(F2=\"\",\"\",YEAR(F2))");
        sheet.cell_mut(2, 8).set_formula("=H1+E2*$K$1");
        sheet.cell_mut(2, 9).set_value("=not evaluated".into());
        sheet.cell_mut(2, 12).set_formula("=A2");
        sheet
    }

    #[test]
    fn test_capture_templates() {
        let templates = capture_templates(&reference(), 2, 11);
        let columns: Vec<u32> = templates.iter().map(|t| t.column).collect();
        assert_eq!(columns, [7, 8, 9]);
        assert_eq!(templates[0].formula, "=IF(F2=\"\",\"\",YEAR(F2))");
        assert_eq!(templates[0].anchor, CellRef::new(2, 7));
        assert_eq!(templates[2].formula, "=not evaluated");

        assert!(capture_templates(&reference(), 40, 11).is_empty());
    }

    #[test]
    fn test_relocate_shifts_relative_rows() {
        let templates = capture_templates(&reference(), 2, 11);
        assert_eq!(templates[1].relocate(12).unwrap(), "=H11+E12*$K$1");
        assert_eq!(templates[0].relocate(2).unwrap(), templates[0].formula);
    }

    #[test]
    fn test_extend_formulas_fills_through_floor() {
        let mut sheet = reference();
        let templates = capture_templates(&sheet, 2, 11)[..2].to_vec();

        let summary = extend_formulas(&mut sheet, &templates, 50);
        assert_eq!(summary.first_row, 3);
        assert_eq!(summary.last_row, 50);
        assert_eq!(summary.filled, 96);
        assert_eq!(sheet.max_row(), 50);
        assert_eq!(
            sheet.cell(50, 7).unwrap().formula_text().as_deref(),
            Some("=IF(F50=\"\",\"\",YEAR(F50))")
        );
        assert_eq!(sheet.cell(3, 8).unwrap().formula.as_deref(), Some("H2+E3*$K$1"));
        // Existing rows are not touched
        assert_eq!(sheet.cell(2, 8).unwrap().formula.as_deref(), Some("H1+E2*$K$1"));
    }

    #[test]
    fn test_extend_formulas_past_the_floor() {
        let mut sheet = reference();
        sheet.cell_mut(80, 1).set_value("late".into());
        let templates = capture_templates(&sheet, 2, 11);

        let summary = extend_formulas(&mut sheet, &templates, 50);
        assert_eq!(summary.filled, 0);
        assert_eq!(summary.last_row, 80);
    }

    #[test]
    fn test_failed_relocation_leaves_cell_empty() {
        let mut sheet = Sheet::new("Ledger");
        let templates = vec![FormulaTemplate {
            column: 2,
            formula: "=\"open".to_string(),
            anchor: CellRef::new(100, 2),
        }];
        let summary = extend_formulas(&mut sheet, &templates, 3);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.filled, 0);
        assert!(sheet.cell(3, 2).is_none());
    }

    #[test]
    fn test_apply_column_style() {
        let mut sheet = reference();
        apply_column_style(&mut sheet, 6, 4, 2, 5);
        assert_eq!(sheet.cell(1, 6).and_then(|c| c.style), None);
        assert!((2..=5).all(|r| sheet.cell(r, 6).unwrap().style == Some(4)));
        assert_eq!(sheet.cell(2, 1).unwrap().style, None);
    }
}
