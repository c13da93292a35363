//! A1-style cell addressing shared by the codec and the formula tools

use std::fmt;

/// Last column addressable in an XLSX worksheet (XFD)
pub const MAX_COLUMN: u32 = 16_384;
/// Last row addressable in an XLSX worksheet
pub const MAX_ROW: u32 = 1_048_576;

/// A 1-based (row, column) cell coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Parse a reference like "B12" or "$B$12" (absolute markers are ignored)
    pub fn parse(cell_ref: &str) -> Option<Self> {
        let trimmed: String = cell_ref.chars().filter(|c| *c != '$').collect();
        let split = trimmed.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = trimmed.split_at(split);
        let col = column_index(letters)?;
        let row = digits.parse::<u32>().ok()?;
        if row == 0 || row > MAX_ROW {
            return None;
        }
        Some(Self { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// Convert column letters ("A", "AB") to a 1-based index
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col = 0u32;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
    }
    if col > MAX_COLUMN { None } else { Some(col) }
}

/// Convert a 1-based column index to its letters
pub fn column_letters(col: u32) -> String {
    let mut c = col;
    let mut letters = String::new();
    while c > 0 {
        let m = (c - 1) % 26;
        letters.insert(0, (b'A' + m as u8) as char);
        c = (c - m) / 26;
    }
    letters
}
