//! Cell addresses and ranges in A1 notation
//!
//! Addresses are stored zero-based internally and rendered one-based in the
//! familiar letter-number form. Parsing tolerates `$` markers because live
//! hosts report addresses like `$A$1:$C$3`; the markers are discarded so
//! every address and range this crate hands out is in canonical plain form.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Maximum number of rows in a worksheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (column XFD)
pub const MAX_COLS: u16 = 16_384;

/// A single cell coordinate (zero-based row and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based, so A1 has row 0)
    pub row: u32,
    /// Column index (0-based, so A1 has column 0)
    pub col: u16,
}

impl CellAddress {
    /// Create an address from zero-based row and column indices
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse an address like `A1`, `$B$2`, or `XFD1048576`
    pub fn parse(s: &str) -> Result<Self> {
        let mut chars = s.chars().peekable();
        if chars.peek() == Some(&'$') {
            chars.next();
        }

        let mut letters = String::new();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_alphabetic() {
                letters.push(c.to_ascii_uppercase());
                chars.next();
            } else {
                break;
            }
        }
        if chars.peek() == Some(&'$') {
            chars.next();
        }
        let digits: String = chars.collect();

        if letters.is_empty() || digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid(format!("cell address: {s}")));
        }

        let col = letters_to_column(&letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::invalid(format!("cell address row: {s}")))?;
        if row == 0 || row > MAX_ROWS {
            return Err(Error::invalid(format!("cell address row out of range: {s}")));
        }

        Ok(Self { row: row - 1, col })
    }

    /// Render as plain A1 notation
    pub fn to_a1(&self) -> String {
        format!("{}{}", column_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Convert a zero-based column index to letters (0 -> "A", 27 -> "AB")
pub fn column_to_letters(col: u16) -> String {
    let mut result = String::new();
    let mut n = col as u32 + 1;
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        result.insert(0, (b'A' + rem) as char);
        n = (n - 1) / 26;
    }
    result
}

/// Convert column letters to a zero-based index ("A" -> 0, "XFD" -> 16383)
pub fn letters_to_column(letters: &str) -> Result<u16> {
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return Err(Error::invalid(format!("column letters: {letters}")));
        }
        col = col * 26 + (c as u32 - 'A' as u32 + 1);
        if col > MAX_COLS as u32 {
            return Err(Error::invalid(format!("column out of range: {letters}")));
        }
    }
    if col == 0 {
        return Err(Error::invalid("empty column letters"));
    }
    Ok((col - 1) as u16)
}

/// A rectangular range of cells
///
/// Always held in canonical form: `start` is the top-left corner and `end`
/// the bottom-right, regardless of the corner order a backend reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range from two corners, normalizing their order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range like `A1:C10`, `$A$1:$C$10`, or a single cell `C3`
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellAddress::parse(a)?;
                let end = CellAddress::parse(b)?;
                Ok(Self::new(start, end))
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Render as `A1:C10` (or `A1` for a single cell)
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// True if the range contains the given address
    pub fn contains(&self, addr: CellAddress) -> bool {
        addr.row >= self.start.row
            && addr.row <= self.end.row
            && addr.col >= self.start.col
            && addr.col <= self.end.col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters_roundtrip() {
        assert_eq!(column_to_letters(0), "A");
        assert_eq!(column_to_letters(25), "Z");
        assert_eq!(column_to_letters(26), "AA");
        assert_eq!(column_to_letters(701), "ZZ");
        assert_eq!(column_to_letters(702), "AAA");
        assert_eq!(column_to_letters(16383), "XFD");

        for col in [0u16, 1, 25, 26, 27, 700, 701, 702, 16383] {
            assert_eq!(letters_to_column(&column_to_letters(col)).unwrap(), col);
        }
    }

    #[test]
    fn test_parse_address() {
        let addr = CellAddress::parse("B3").unwrap();
        assert_eq!(addr, CellAddress::new(2, 1));
        assert_eq!(addr.to_a1(), "B3");

        // Absolute markers are tolerated and discarded
        assert_eq!(CellAddress::parse("$B$3").unwrap(), CellAddress::new(2, 1));
        assert_eq!(CellAddress::parse("$B3").unwrap(), CellAddress::new(2, 1));

        // Lowercase letters are accepted
        assert_eq!(CellAddress::parse("aa10").unwrap(), CellAddress::new(9, 26));
    }

    #[test]
    fn test_parse_address_errors() {
        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("XFE1").is_err());
        assert!(CellAddress::parse("123").is_err());
        assert!(CellAddress::parse("ABC").is_err());
        assert!(CellAddress::parse("A1B2").is_err());
    }

    #[test]
    fn test_range_normalization() {
        // Corners reported in reverse order normalize to canonical form
        let range = CellRange::parse("C10:A1").unwrap();
        assert_eq!(range.to_a1(), "A1:C10");

        // Mixed corners (bottom-left / top-right) normalize too
        let range = CellRange::new(CellAddress::new(9, 0), CellAddress::new(0, 2));
        assert_eq!(range.to_a1(), "A1:C10");
    }

    #[test]
    fn test_range_parse() {
        let range = CellRange::parse("$A$1:$C$3").unwrap();
        assert_eq!(range.to_a1(), "A1:C3");
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);

        let single = CellRange::parse("C3").unwrap();
        assert_eq!(single.to_a1(), "C3");
        assert_eq!(single.row_count(), 1);
    }

    #[test]
    fn test_range_contains() {
        let range = CellRange::parse("B2:D10").unwrap();
        assert!(range.contains(CellAddress::parse("B2").unwrap()));
        assert!(range.contains(CellAddress::parse("C5").unwrap()));
        assert!(range.contains(CellAddress::parse("D10").unwrap()));
        assert!(!range.contains(CellAddress::parse("A1").unwrap()));
        assert!(!range.contains(CellAddress::parse("E10").unwrap()));
    }
}
