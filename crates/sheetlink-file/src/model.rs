//! In-memory document model for the file backend
//!
//! The container is parsed into this model in full, mutated through the
//! backend, and serialized back out on save. Cells are stored sparsely and
//! styles are pooled so identical formatting is written once.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ahash::AHashMap;
use sheetlink_core::{
    validate_sheet_name, CellRange, CellStyle, CellValue, CfRule, DataValidationRule, Error,
    PivotTable, Result, Table, UsedRange,
};

/// One parsed document
#[derive(Debug)]
pub struct WorkbookModel {
    /// Original path; `save` writes back here
    pub path: PathBuf,
    pub sheets: Vec<SheetModel>,
    pub styles: StylePool,
}

impl WorkbookModel {
    /// An empty document bound to `path` with a single default sheet
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        WorkbookModel {
            path: path.into(),
            sheets: vec![SheetModel::new("Sheet1")],
            styles: StylePool::new(),
        }
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    /// Append a new empty sheet at the end of the sheet list
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        self.check_new_name(name)?;
        self.sheets.push(SheetModel::new(name));
        Ok(self.sheets.len() - 1)
    }

    /// Deep-copy `source` and insert the copy immediately after it
    pub fn copy_sheet_after(&mut self, source: &str, new_name: &str) -> Result<usize> {
        self.check_new_name(new_name)?;
        let src_idx = self
            .sheet_index(source)
            .ok_or_else(|| Error::not_found(format!("sheet {source}")))?;
        let mut copy = self.sheets[src_idx].clone();
        copy.name = new_name.to_string();
        self.sheets.insert(src_idx + 1, copy);
        Ok(src_idx + 1)
    }

    /// Reject invalid or duplicate sheet names. Duplicates are compared
    /// case-insensitively, as the host application does.
    fn check_new_name(&self, name: &str) -> Result<()> {
        validate_sheet_name(name)?;
        if self
            .sheets
            .iter()
            .any(|s| s.name.eq_ignore_ascii_case(name))
        {
            return Err(Error::invalid(format!("sheet {name} already exists")));
        }
        Ok(())
    }
}

/// One sheet's contents
#[derive(Debug, Clone)]
pub struct SheetModel {
    pub name: String,
    /// Sparse cells keyed by (row, col), zero-based
    pub cells: BTreeMap<(u32, u16), Cell>,
    pub used: UsedRange,
    pub validations: Vec<(CellRange, DataValidationRule)>,
    pub conditional_formats: Vec<(CellRange, CfRule)>,
    pub tables: Vec<Table>,
    pub pivot_tables: Vec<PivotTable>,
}

impl SheetModel {
    pub fn new<S: Into<String>>(name: S) -> Self {
        SheetModel {
            name: name.into(),
            cells: BTreeMap::new(),
            used: UsedRange::new(),
            validations: Vec::new(),
            conditional_formats: Vec::new(),
            tables: Vec::new(),
            pivot_tables: Vec::new(),
        }
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Write a cell and grow the used range
    pub fn put_cell(&mut self, row: u32, col: u16, cell: Cell) {
        self.used.include(sheetlink_core::CellAddress::new(row, col));
        self.cells.insert((row, col), cell);
    }
}

/// One stored cell: its value plus an index into the style pool
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style: Option<u32>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Cell { value, style: None }
    }
}

/// Deduplicating store for cell styles
///
/// Documents typically have many cells sharing the same formatting. Each
/// unique style is stored once; cells reference styles by index. Index 0 is
/// always the plain default.
#[derive(Debug)]
pub struct StylePool {
    styles: Vec<CellStyle>,
    index_map: AHashMap<CellStyle, u32>,
}

impl StylePool {
    pub fn new() -> Self {
        let mut pool = StylePool {
            styles: Vec::with_capacity(64),
            index_map: AHashMap::with_capacity(64),
        };
        let default = CellStyle::default();
        pool.styles.push(default.clone());
        pool.index_map.insert(default, 0);
        pool
    }

    /// Get or create a style, returning its index
    pub fn get_or_insert(&mut self, style: CellStyle) -> u32 {
        if let Some(&idx) = self.index_map.get(&style) {
            return idx;
        }
        let idx = self.styles.len() as u32;
        self.index_map.insert(style.clone(), idx);
        self.styles.push(style);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&CellStyle> {
        self.styles.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &CellStyle)> {
        self.styles.iter().enumerate().map(|(i, s)| (i as u32, s))
    }
}

impl Default for StylePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetlink_core::FontStyle;

    #[test]
    fn test_pool_deduplicates() {
        let mut pool = StylePool::new();

        let bold = CellStyle {
            font: Some(FontStyle::new().with_bold(true)),
            ..Default::default()
        };
        let bold_again = bold.clone();
        let italic = CellStyle {
            font: Some(FontStyle::new().with_italic(true)),
            ..Default::default()
        };

        let a = pool.get_or_insert(bold);
        let b = pool.get_or_insert(bold_again);
        let c = pool.get_or_insert(italic);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 3); // default + 2 custom
    }

    #[test]
    fn test_pool_default_is_index_zero() {
        let mut pool = StylePool::new();
        assert_eq!(pool.get_or_insert(CellStyle::default()), 0);
        assert_eq!(pool.get(0), Some(&CellStyle::default()));
    }

    #[test]
    fn test_duplicate_sheet_name_rejected() {
        let mut wb = WorkbookModel::new("/tmp/book.xlsx");
        assert!(wb.add_sheet("Data").is_ok());
        assert!(wb.add_sheet("data").is_err());
        assert!(wb.add_sheet("Sheet1").is_err());
    }

    #[test]
    fn test_copy_inserts_after_source() {
        let mut wb = WorkbookModel::new("/tmp/book.xlsx");
        wb.add_sheet("Data").unwrap();
        wb.add_sheet("Summary").unwrap();

        let idx = wb.copy_sheet_after("Data", "Data Copy").unwrap();
        assert_eq!(idx, 2);
        let names: Vec<&str> = wb.sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sheet1", "Data", "Data Copy", "Summary"]);
    }

    #[test]
    fn test_put_cell_grows_used_range() {
        let mut sheet = SheetModel::new("Sheet1");
        assert_eq!(sheet.used.dimension(), "A1");
        sheet.put_cell(2, 2, Cell::new(CellValue::from(1.0)));
        assert_eq!(sheet.used.dimension(), "C3");
        sheet.put_cell(0, 0, Cell::new(CellValue::from(2.0)));
        assert_eq!(sheet.used.dimension(), "A1:C3");
    }
}
