//! Paged traversal of a sheet's used range

use crate::cell::{CellAddress, CellRange};
use crate::error::{Error, Result};

/// Breaks a sheet's used range into bounded pages for callers that stream
/// large sheets instead of reading them whole.
///
/// Backends choose the page geometry; callers only iterate the ranges the
/// strategy hands out.
pub trait PagingStrategy {
    /// The pages covering the used range, in reading order.
    ///
    /// Every used cell falls in exactly one page and pages never overlap.
    fn page_ranges(&self) -> Result<Vec<CellRange>>;

    /// Rows per page this strategy was built with
    fn rows_per_page(&self) -> u32;
}

/// The row-band strategy both backends use: full-width horizontal slices of
/// the used range, each at most `rows_per_page` rows tall.
#[derive(Debug, Clone)]
pub struct FixedRowPages {
    used: CellRange,
    rows_per_page: u32,
}

impl FixedRowPages {
    pub fn new(used: CellRange, rows_per_page: u32) -> Result<Self> {
        if rows_per_page == 0 {
            return Err(Error::invalid("page size must be at least one row"));
        }
        Ok(FixedRowPages {
            used,
            rows_per_page,
        })
    }
}

impl PagingStrategy for FixedRowPages {
    fn page_ranges(&self) -> Result<Vec<CellRange>> {
        let mut pages = Vec::new();
        let mut top = self.used.start.row;
        while top <= self.used.end.row {
            let bottom = self
                .used
                .end
                .row
                .min(top + self.rows_per_page - 1);
            pages.push(CellRange::new(
                CellAddress::new(top, self.used.start.col),
                CellAddress::new(bottom, self.used.end.col),
            ));
            if bottom == u32::MAX {
                break;
            }
            top = bottom + 1;
        }
        Ok(pages)
    }

    fn rows_per_page(&self) -> u32 {
        self.rows_per_page
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(a1: &str) -> CellRange {
        CellRange::parse(a1).unwrap()
    }

    #[test]
    fn test_single_page_when_range_fits() {
        let pages = FixedRowPages::new(range("A1:C10"), 100)
            .unwrap()
            .page_ranges()
            .unwrap();
        assert_eq!(pages, vec![range("A1:C10")]);
    }

    #[test]
    fn test_splits_into_row_bands() {
        let pages = FixedRowPages::new(range("A1:D25"), 10)
            .unwrap()
            .page_ranges()
            .unwrap();
        assert_eq!(
            pages,
            vec![range("A1:D10"), range("A11:D20"), range("A21:D25")]
        );
    }

    #[test]
    fn test_bands_keep_column_span() {
        let pages = FixedRowPages::new(range("C5:F8"), 2)
            .unwrap()
            .page_ranges()
            .unwrap();
        assert_eq!(pages, vec![range("C5:F6"), range("C7:F8")]);
    }

    #[test]
    fn test_exact_multiple_has_no_stub_page() {
        let pages = FixedRowPages::new(range("A1:B20"), 10)
            .unwrap()
            .page_ranges()
            .unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1], range("A11:B20"));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(FixedRowPages::new(range("A1:B2"), 0).is_err());
    }
}
