//! The capability contract both backends implement
//!
//! Call sites never branch on backend identity: only the selector (which
//! picks an implementation at open time) and each backend's codec know which
//! side of the boundary they are on. An operation a backend cannot express
//! returns [`Error::Unsupported`](crate::Error::Unsupported) so callers can
//! detect capability gaps instead of silently losing work.

use crate::cell::CellRange;
use crate::conditional::CfRule;
use crate::error::Result;
use crate::paging::PagingStrategy;
use crate::style::CellStyle;
use crate::validation::DataValidationRule;
use crate::value::CellValue;

/// Maximum sheet name length imposed by the container format
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// An open spreadsheet document.
///
/// Exclusively owned by whichever backend opened it; dropped when the
/// caller's session ends. Persistence is caller-triggered via [`save`],
/// never automatic.
///
/// [`save`]: Workbook::save
pub trait Workbook {
    /// Short name of the active backend ("live" or "file")
    fn backend_name(&self) -> &'static str;

    /// Sheet names in workbook order
    fn sheet_names(&mut self) -> Result<Vec<String>>;

    /// Acquire a sheet by name.
    ///
    /// The returned guard borrows the workbook; dropping it releases any
    /// backend resources the acquisition pinned. A sheet must be dropped
    /// before the next workbook-level call, which is how the borrow checker
    /// enforces the release-before-save ordering.
    fn sheet<'a>(&'a mut self, name: &str) -> Result<Box<dyn Worksheet + 'a>>;

    /// Create a new empty sheet
    fn create_sheet(&mut self, name: &str) -> Result<()>;

    /// Copy an existing sheet; the copy is placed immediately after the
    /// source and named `new_name`
    fn copy_sheet(&mut self, source: &str, new_name: &str) -> Result<()>;

    /// Persist the document through the backend's native mechanism
    fn save(&mut self) -> Result<()>;
}

/// One sheet within an open workbook
pub trait Worksheet {
    /// The sheet's name
    fn name(&self) -> &str;

    /// Tables on this sheet (discovery only)
    fn tables(&mut self) -> Result<Vec<Table>>;

    /// Pivot tables on this sheet (discovery only)
    fn pivot_tables(&mut self) -> Result<Vec<PivotTable>>;

    /// Write a value to a cell
    fn set_value(&mut self, cell: &str, value: &CellValue) -> Result<()>;

    /// Write a formula to a cell
    fn set_formula(&mut self, cell: &str, formula: &str) -> Result<()>;

    /// Read a cell's value as display text
    fn value(&mut self, cell: &str) -> Result<String>;

    /// Read a cell's formula (`=`-prefixed); falls back to the value when
    /// the cell stores no formula
    fn formula(&mut self, cell: &str) -> Result<String>;

    /// The smallest rectangle known to contain all non-empty cells
    fn used_range(&mut self) -> Result<CellRange>;

    /// A strategy that partitions reads of this sheet into bounded pages
    fn paging_strategy(&mut self, page_size: u32) -> Result<Box<dyn PagingStrategy>>;

    /// Capture a range as an image, base64-encoded
    fn capture_picture(&mut self, range: &str) -> Result<String>;

    /// Add a table over the given range
    fn add_table(&mut self, range: &str, name: &str) -> Result<()>;

    /// Read a cell's semantic style
    fn cell_style(&mut self, cell: &str) -> Result<CellStyle>;

    /// Add a data validation rule over the given range
    fn add_data_validation(&mut self, range: &str, rule: &DataValidationRule) -> Result<()>;

    /// Add a conditional formatting rule over the given range
    fn add_conditional_format(&mut self, range: &str, rule: &CfRule) -> Result<()>;

    /// Evaluate macro code in the host
    fn run_macro(&mut self, code: &str) -> Result<()>;

    /// Inject a named macro module into the workbook's macro project
    fn add_macro_module(&mut self, name: &str, code: &str) -> Result<()>;
}

/// A named table attached to a worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub range: CellRange,
}

/// A pivot table attached to a worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    pub name: String,
    pub range: CellRange,
}

/// Validate a sheet name against container format rules
pub fn validate_sheet_name(name: &str) -> Result<()> {
    use crate::error::Error;

    if name.is_empty() {
        return Err(Error::invalid("sheet name cannot be empty"));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::invalid(format!(
            "sheet name exceeds {MAX_SHEET_NAME_LEN} characters: {name}"
        )));
    }
    if name.contains(['\\', '/', '?', '*', '[', ']', ':']) {
        return Err(Error::invalid(format!(
            "sheet name contains invalid characters: {name}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sheet_name() {
        assert!(validate_sheet_name("Sheet1").is_ok());
        assert!(validate_sheet_name("Sheet1 Copy").is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name("a/b").is_err());
        assert!(validate_sheet_name("what?").is_err());
        assert!(validate_sheet_name(&"x".repeat(32)).is_err());
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
    }
}
