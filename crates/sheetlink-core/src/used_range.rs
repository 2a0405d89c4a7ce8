//! Used-range bookkeeping for backends that must maintain the dimension
//! themselves
//!
//! The live backend reads the host's used range directly; the file backend
//! grows a [`UsedRange`] as writes land and serializes it back into the
//! document's dimension record.

use crate::cell::{CellAddress, CellRange};
use crate::error::Result;

/// A monotonically growing bounding rectangle over written cells.
///
/// The tracked rectangle only ever expands: writing inside the current
/// bounds leaves them unchanged, and nothing shrinks them, even if the cell
/// that established an edge is later cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsedRange {
    bounds: Option<CellRange>,
}

impl UsedRange {
    /// A tracker that has seen no cells yet
    pub fn new() -> Self {
        UsedRange { bounds: None }
    }

    /// Seed the tracker from a stored dimension string such as `A1:C10`
    pub fn from_dimension(dimension: &str) -> Result<Self> {
        let trimmed = dimension.trim();
        if trimmed.is_empty() {
            return Ok(UsedRange { bounds: None });
        }
        Ok(UsedRange {
            bounds: Some(CellRange::parse(trimmed)?),
        })
    }

    /// Expand the bounds to include `cell`
    pub fn include(&mut self, cell: CellAddress) {
        self.bounds = Some(match self.bounds {
            None => CellRange::single(cell),
            Some(range) => {
                let start = CellAddress::new(range.start.row.min(cell.row), range.start.col.min(cell.col));
                let end = CellAddress::new(range.end.row.max(cell.row), range.end.col.max(cell.col));
                CellRange::new(start, end)
            }
        });
    }

    /// Expand the bounds to include every cell of `range`
    pub fn include_range(&mut self, range: CellRange) {
        self.include(range.start);
        self.include(range.end);
    }

    /// The current bounds; an untouched sheet reports the single cell `A1`
    pub fn bounds(&self) -> CellRange {
        self.bounds
            .unwrap_or_else(|| CellRange::single(CellAddress::new(0, 0)))
    }

    /// Whether any cell has been recorded
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Serialize as a dimension string (`A1:C10`, or `A1` for a single cell)
    pub fn dimension(&self) -> String {
        self.bounds().to_a1()
    }
}

impl Default for UsedRange {
    fn default() -> Self {
        UsedRange::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(a1: &str) -> CellAddress {
        CellAddress::parse(a1).unwrap()
    }

    #[test]
    fn test_empty_sheet_reports_a1() {
        let tracker = UsedRange::new();
        assert!(tracker.is_empty());
        assert_eq!(tracker.dimension(), "A1");
        assert_eq!(tracker.bounds(), CellRange::single(cell("A1")));
    }

    #[test]
    fn test_single_write_then_grow() {
        let mut tracker = UsedRange::new();
        tracker.include(cell("A1"));
        assert_eq!(tracker.dimension(), "A1");

        tracker.include(cell("C3"));
        assert_eq!(tracker.dimension(), "A1:C3");
    }

    #[test]
    fn test_growth_is_monotonic() {
        let mut tracker = UsedRange::new();
        tracker.include(cell("C3"));
        tracker.include(cell("E5"));
        assert_eq!(tracker.dimension(), "C3:E5");

        // Interior writes leave the bounds alone.
        tracker.include(cell("D4"));
        assert_eq!(tracker.dimension(), "C3:E5");

        // Writes above/left pull the start corner out.
        tracker.include(cell("A1"));
        assert_eq!(tracker.dimension(), "A1:E5");
    }

    #[test]
    fn test_seed_from_dimension() {
        let mut tracker = UsedRange::from_dimension("B2:D4").unwrap();
        assert_eq!(tracker.dimension(), "B2:D4");
        tracker.include(cell("F1"));
        assert_eq!(tracker.dimension(), "B1:F4");

        let empty = UsedRange::from_dimension("").unwrap();
        assert!(empty.is_empty());

        let single = UsedRange::from_dimension("C7").unwrap();
        assert_eq!(single.dimension(), "C7");
    }

    #[test]
    fn test_include_range() {
        let mut tracker = UsedRange::new();
        tracker.include_range(CellRange::parse("B2:C9").unwrap());
        tracker.include_range(CellRange::parse("A5:A5").unwrap());
        assert_eq!(tracker.dimension(), "A2:C9");
    }
}
