//! Row classification against a cutoff year
//!
//! Every data row carries a governing date in a fixed column. A row is kept
//! by the split that owns its date, handed through untouched when the date
//! cannot be read at all, and a long enough run of blank dates marks the end
//! of the data.

use chrono::{NaiveDate, NaiveDateTime};

use crate::document::{CellValue, Row};

/// Datetime layouts accepted for dates stored as text
///
/// Two-digit years come first: `%Y` would also accept "22" as year 22.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%y %I:%M %p",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Outcome of reading a row's governing date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoverningDate {
    Parsed(NaiveDateTime),
    /// The cell exists but holds nothing
    Blank,
    /// The cell is missing or holds something that is not a date
    Unparsable,
}

impl GoverningDate {
    /// Read the governing date from the 1-based `column` of `row`
    pub fn read(row: &Row, column: u32) -> Self {
        let Some(cell) = row.cell(column) else {
            return GoverningDate::Unparsable;
        };
        if cell.formula.is_some() {
            return GoverningDate::Unparsable;
        }
        match &cell.value {
            CellValue::Empty => GoverningDate::Blank,
            CellValue::Date(date) => GoverningDate::Parsed(*date),
            CellValue::Text(text) if text.trim().is_empty() => GoverningDate::Blank,
            CellValue::Text(text) => parse_date_text(text)
                .map(GoverningDate::Parsed)
                .unwrap_or(GoverningDate::Unparsable),
            CellValue::Number(_) | CellValue::Boolean(_) | CellValue::Error(_) => {
                GoverningDate::Unparsable
            }
        }
    }
}

/// Parse a date written as text, with or without a time of day
pub fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// January 1 of the cutoff year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffDate {
    year: i32,
    start: NaiveDateTime,
}

impl CutoffDate {
    pub fn from_year(year: i32) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?;
        Some(Self { year, start })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Strictly before January 1; the boundary instant itself is current
    pub fn is_archived(&self, date: NaiveDateTime) -> bool {
        date < self.start
    }
}

/// Which side of the cutoff a split keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Archive,
    Current,
}

impl SplitMode {
    pub fn keeps(&self, date: NaiveDateTime, cutoff: &CutoffDate) -> bool {
        match self {
            SplitMode::Archive => cutoff.is_archived(date),
            SplitMode::Current => !cutoff.is_archived(date),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowClass {
    /// No readable date: copied into every output as is
    PassThrough,
    /// Dated on this split's side of the cutoff
    Keep,
    /// Dated on the other side of the cutoff
    Skip,
    /// Blank date, not yet enough of them to stop
    Blank,
    /// Blank run exceeded the limit; nothing after this row is scanned
    EndOfData,
}

/// Classifies successive rows of one sheet, tracking the run of blank dates
#[derive(Debug, Clone)]
pub struct RowClassifier {
    cutoff: CutoffDate,
    mode: SplitMode,
    date_column: u32,
    blank_run_limit: u32,
    blank_run: u32,
}

impl RowClassifier {
    pub fn new(cutoff: CutoffDate, mode: SplitMode, date_column: u32, blank_run_limit: u32) -> Self {
        Self {
            cutoff,
            mode,
            date_column,
            blank_run_limit,
            blank_run: 0,
        }
    }

    pub fn mode(&self) -> SplitMode {
        self.mode
    }

    pub fn classify(&mut self, row: &Row) -> RowClass {
        match GoverningDate::read(row, self.date_column) {
            GoverningDate::Unparsable => RowClass::PassThrough,
            GoverningDate::Blank => {
                self.blank_run += 1;
                if self.blank_run > self.blank_run_limit {
                    RowClass::EndOfData
                } else {
                    RowClass::Blank
                }
            }
            GoverningDate::Parsed(date) => {
                self.blank_run = 0;
                if self.mode.keeps(date, &self.cutoff) {
                    RowClass::Keep
                } else {
                    RowClass::Skip
                }
            }
        }
    }
}
