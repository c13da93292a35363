//! Formula reference shifting.
//!
//! Moving a formula from one cell to another shifts every relative row and
//! column reference by the distance between the two cells, the way a spreadsheet
//! editor does on copy/paste or fill-down. Absolute parts (`$A`, `$1`) stay put.
//! String literals, quoted sheet names and bracketed sections (external
//! workbooks, structured references) are copied untouched.

use regex::{Captures, Regex};
use thiserror::Error;

use crate::document::cell_ref::{CellRef, MAX_COLUMN, MAX_ROW, column_index, column_letters};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("unterminated string literal in formula '{0}'")]
    UnterminatedString(String),
    #[error("unterminated quoted sheet name in formula '{0}'")]
    UnterminatedSheetName(String),
    #[error("unbalanced brackets in formula '{0}'")]
    UnbalancedBrackets(String),
    #[error("reference {reference} leaves the sheet when moved {rows} rows and {cols} columns")]
    OutOfBounds {
        reference: String,
        rows: i64,
        cols: i64,
    },
}

thread_local! {
    static REFERENCE: Regex = Regex::new(
        r"(?x)
          (?P<cabs>\$?)(?P<col>[A-Za-z]{1,3})(?P<rabs>\$?)(?P<row>[0-9]{1,7})
        | (?P<c1abs>\$?)(?P<c1>[A-Za-z]{1,3}):(?P<c2abs>\$?)(?P<c2>[A-Za-z]{1,3})
        | (?P<r1abs>\$?)(?P<r1>[0-9]{1,7}):(?P<r2abs>\$?)(?P<r2>[0-9]{1,7})
        ",
    )
    .expect("reference pattern is valid");
}

/// Move `formula` written at `origin` so that it reads correctly at `target`
pub fn translate_formula(
    formula: &str,
    origin: CellRef,
    target: CellRef,
) -> Result<String, TranslateError> {
    let shift = Shift {
        rows: target.row as i64 - origin.row as i64,
        cols: target.col as i64 - origin.col as i64,
    };
    if shift.rows == 0 && shift.cols == 0 {
        return Ok(formula.to_string());
    }

    let mut out = String::with_capacity(formula.len() + 8);
    let mut code = String::new();
    let mut chars = formula.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                shift.flush(&mut code, &mut out)?;
                out.push(ch);
                copy_quoted(&mut chars, '"', &mut out)
                    .ok_or_else(|| TranslateError::UnterminatedString(formula.to_string()))?;
            }
            '\'' => {
                shift.flush(&mut code, &mut out)?;
                out.push(ch);
                copy_quoted(&mut chars, '\'', &mut out)
                    .ok_or_else(|| TranslateError::UnterminatedSheetName(formula.to_string()))?;
            }
            '[' => {
                shift.flush(&mut code, &mut out)?;
                out.push(ch);
                let mut depth = 1usize;
                while depth > 0 {
                    let inner = chars
                        .next()
                        .ok_or_else(|| TranslateError::UnbalancedBrackets(formula.to_string()))?;
                    match inner {
                        '[' => depth += 1,
                        ']' => depth -= 1,
                        _ => {}
                    }
                    out.push(inner);
                }
            }
            _ => code.push(ch),
        }
    }
    shift.flush(&mut code, &mut out)?;
    Ok(out)
}

/// Copy through the closing `quote`, honouring doubled quotes as escapes
fn copy_quoted(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    out: &mut String,
) -> Option<()> {
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch == quote {
            if chars.peek() == Some(&quote) {
                out.push(quote);
                chars.next();
            } else {
                return Some(());
            }
        }
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct Shift {
    rows: i64,
    cols: i64,
}

impl Shift {
    /// Shift every reference in a stretch of plain formula code
    fn flush(&self, code: &mut String, out: &mut String) -> Result<(), TranslateError> {
        if code.is_empty() {
            return Ok(());
        }
        REFERENCE.with(|re| {
            let mut last = 0;
            for caps in re.captures_iter(code.as_str()) {
                let whole = caps.get(0).expect("group 0 always matches");
                out.push_str(&code[last..whole.start()]);
                last = whole.end();

                let before = code[..whole.start()].chars().next_back();
                let after = code[whole.end()..].chars().next();
                let bounded = !before.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
                    && !after.is_some_and(|c| {
                        c.is_alphanumeric() || matches!(c, '_' | '(' | '!' | '.')
                    });

                match bounded.then(|| self.rewrite(&caps)).flatten() {
                    Some(rewritten) => out.push_str(&rewritten?),
                    None => out.push_str(whole.as_str()),
                }
            }
            out.push_str(&code[last..]);
            Ok::<(), TranslateError>(())
        })?;
        code.clear();
        Ok(())
    }

    /// `None` when the match is not a reference after all (e.g. a name past XFD)
    fn rewrite(&self, caps: &Captures<'_>) -> Option<Result<String, TranslateError>> {
        let is_abs = |name: &str| caps.name(name).is_some_and(|m| !m.as_str().is_empty());

        if let (Some(col), Some(row)) = (caps.name("col"), caps.name("row")) {
            let col = column_index(col.as_str())?;
            let row = row.as_str().parse::<u32>().ok().filter(|r| (1..=MAX_ROW).contains(r))?;
            let (cabs, rabs) = (is_abs("cabs"), is_abs("rabs"));
            return Some(
                match (self.col(col, cabs), self.row(row, rabs)) {
                    (Some(c), Some(r)) => Ok(format!(
                        "{}{}{}{}",
                        if cabs { "$" } else { "" },
                        column_letters(c),
                        if rabs { "$" } else { "" },
                        r
                    )),
                    _ => Err(self.out_of_bounds(&caps[0])),
                },
            );
        }

        if let (Some(c1), Some(c2)) = (caps.name("c1"), caps.name("c2")) {
            let c1 = column_index(c1.as_str())?;
            let c2 = column_index(c2.as_str())?;
            let (a1, a2) = (is_abs("c1abs"), is_abs("c2abs"));
            return Some(match (self.col(c1, a1), self.col(c2, a2)) {
                (Some(c1), Some(c2)) => Ok(format!(
                    "{}{}:{}{}",
                    if a1 { "$" } else { "" },
                    column_letters(c1),
                    if a2 { "$" } else { "" },
                    column_letters(c2)
                )),
                _ => Err(self.out_of_bounds(&caps[0])),
            });
        }

        let r1 = caps.name("r1")?.as_str().parse::<u32>().ok()?;
        let r2 = caps.name("r2")?.as_str().parse::<u32>().ok()?;
        if r1 == 0 || r2 == 0 {
            return None;
        }
        let (a1, a2) = (is_abs("r1abs"), is_abs("r2abs"));
        Some(match (self.row(r1, a1), self.row(r2, a2)) {
            (Some(r1), Some(r2)) => Ok(format!(
                "{}{}:{}{}",
                if a1 { "$" } else { "" },
                r1,
                if a2 { "$" } else { "" },
                r2
            )),
            _ => Err(self.out_of_bounds(&caps[0])),
        })
    }

    fn row(&self, row: u32, absolute: bool) -> Option<u32> {
        if absolute {
            return Some(row);
        }
        let moved = row as i64 + self.rows;
        (1..=MAX_ROW as i64).contains(&moved).then_some(moved as u32)
    }

    fn col(&self, col: u32, absolute: bool) -> Option<u32> {
        if absolute {
            return Some(col);
        }
        let moved = col as i64 + self.cols;
        (1..=MAX_COLUMN as i64).contains(&moved).then_some(moved as u32)
    }

    fn out_of_bounds(&self, reference: &str) -> TranslateError {
        TranslateError::OutOfBounds {
            reference: reference.to_string(),
            rows: self.rows,
            cols: self.cols,
        }
    }
}
