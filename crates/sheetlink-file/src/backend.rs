//! The capability contract implemented over the in-memory model
//!
//! Every mutation lands in the model only; nothing touches the filesystem
//! until [`Workbook::save`], which serializes the whole container and
//! writes it back to the original path in one step. Operations that need a
//! running host (range capture, macros) return typed unsupported errors.

use std::path::{Path, PathBuf};

use crate::error::FileResult;
use crate::model::{Cell, WorkbookModel};
use crate::read::ContainerReader;
use crate::write::ContainerWriter;
use sheetlink_core::{
    CellAddress, CellRange, CellStyle, CellValue, CfRule, DataValidationRule, Error,
    FixedRowPages, PagingStrategy, PivotTable, Result, Table, Workbook, Worksheet,
};

/// Name the backend reports through the contract and in typed errors
pub const BACKEND_NAME: &str = "file";

/// A document opened through the container parser
pub struct FileWorkbook {
    model: WorkbookModel,
}

impl FileWorkbook {
    /// Parse an existing container from disk
    pub fn open<P: AsRef<Path>>(path: P) -> FileResult<Self> {
        let model = ContainerReader::read_file(path.as_ref())?;
        tracing::debug!(
            "Opened container {} with {} sheet(s)",
            path.as_ref().display(),
            model.sheets.len()
        );
        Ok(FileWorkbook { model })
    }

    /// A new empty document bound to `path`. Nothing is written until the
    /// first save.
    pub fn create<P: Into<PathBuf>>(path: P) -> Self {
        FileWorkbook {
            model: WorkbookModel::new(path),
        }
    }

    /// The underlying model, for inspection
    pub fn model(&self) -> &WorkbookModel {
        &self.model
    }
}

impl Workbook for FileWorkbook {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn sheet_names(&mut self) -> Result<Vec<String>> {
        Ok(self.model.sheets.iter().map(|s| s.name.clone()).collect())
    }

    fn sheet<'a>(&'a mut self, name: &str) -> Result<Box<dyn Worksheet + 'a>> {
        let index = self
            .model
            .sheet_index(name)
            .ok_or_else(|| Error::not_found(format!("sheet {name}")))?;
        Ok(Box::new(FileWorksheet {
            model: &mut self.model,
            index,
        }))
    }

    fn create_sheet(&mut self, name: &str) -> Result<()> {
        self.model.add_sheet(name)?;
        Ok(())
    }

    fn copy_sheet(&mut self, source: &str, new_name: &str) -> Result<()> {
        self.model.copy_sheet_after(source, new_name)?;
        Ok(())
    }

    fn save(&mut self) -> Result<()> {
        // Serialize first, then write the bytes directly. Writing through
        // the filesystem rather than a format library keeps long paths
        // working; any path the OS accepts is saved to.
        let bytes = ContainerWriter::to_bytes(&self.model).map_err(Error::from)?;
        std::fs::write(&self.model.path, bytes)
            .map_err(|e| Error::resource(&self.model.path.display().to_string(), e))?;
        tracing::debug!("Saved container to {}", self.model.path.display());
        Ok(())
    }
}

struct FileWorksheet<'a> {
    model: &'a mut WorkbookModel,
    index: usize,
}

impl FileWorksheet<'_> {
    fn sheet(&self) -> &crate::model::SheetModel {
        &self.model.sheets[self.index]
    }

    fn sheet_mut(&mut self) -> &mut crate::model::SheetModel {
        &mut self.model.sheets[self.index]
    }

    /// Store a value, keeping any style already on the cell
    fn put_value(&mut self, cell: &str, value: CellValue) -> Result<()> {
        let addr = CellAddress::parse(cell)?;
        let sheet = self.sheet_mut();
        let style = sheet.cell(addr.row, addr.col).and_then(|c| c.style);
        let mut stored = Cell::new(value);
        stored.style = style;
        sheet.put_cell(addr.row, addr.col, stored);
        Ok(())
    }
}

impl Worksheet for FileWorksheet<'_> {
    fn name(&self) -> &str {
        &self.sheet().name
    }

    fn tables(&mut self) -> Result<Vec<Table>> {
        Ok(self.sheet().tables.clone())
    }

    fn pivot_tables(&mut self) -> Result<Vec<PivotTable>> {
        Ok(self.sheet().pivot_tables.clone())
    }

    fn set_value(&mut self, cell: &str, value: &CellValue) -> Result<()> {
        self.put_value(cell, value.clone())
    }

    fn set_formula(&mut self, cell: &str, formula: &str) -> Result<()> {
        let text = formula.strip_prefix('=').unwrap_or(formula).to_string();
        self.put_value(cell, CellValue::Formula { text, cached: None })
    }

    fn value(&mut self, cell: &str) -> Result<String> {
        let addr = CellAddress::parse(cell)?;
        let text = self
            .sheet()
            .cell(addr.row, addr.col)
            // A formula cell's display text is its cached result
            .map(|c| c.value.display_text())
            .unwrap_or_default();
        Ok(text)
    }

    fn formula(&mut self, cell: &str) -> Result<String> {
        let addr = CellAddress::parse(cell)?;
        match self.sheet().cell(addr.row, addr.col) {
            Some(c) => match c.value.formula_text() {
                Some(text) => Ok(format!("={text}")),
                None => Ok(c.value.display_text()),
            },
            None => Ok(String::new()),
        }
    }

    fn used_range(&mut self) -> Result<CellRange> {
        Ok(self.sheet().used.bounds())
    }

    fn paging_strategy(&mut self, page_size: u32) -> Result<Box<dyn PagingStrategy>> {
        let pages = FixedRowPages::new(self.sheet().used.bounds(), page_size)?;
        Ok(Box::new(pages))
    }

    fn capture_picture(&mut self, _range: &str) -> Result<String> {
        // No rendering surface exists without a host application
        Err(Error::unsupported(BACKEND_NAME, "capture_picture"))
    }

    fn add_table(&mut self, range: &str, name: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::invalid("table name cannot be empty"));
        }
        if name.contains(' ') {
            return Err(Error::invalid(format!(
                "table name cannot contain spaces: {name}"
            )));
        }
        if self
            .model
            .sheets
            .iter()
            .flat_map(|s| &s.tables)
            .any(|t| t.name == name)
        {
            return Err(Error::invalid(format!("table {name} already exists")));
        }
        let range = CellRange::parse(range)?;
        self.sheet_mut().tables.push(Table {
            name: name.to_string(),
            range,
        });
        Ok(())
    }

    fn cell_style(&mut self, cell: &str) -> Result<CellStyle> {
        let addr = CellAddress::parse(cell)?;
        let style = self
            .sheet()
            .cell(addr.row, addr.col)
            .and_then(|c| c.style)
            .and_then(|idx| self.model.styles.get(idx))
            .cloned()
            .unwrap_or_default();
        Ok(style)
    }

    fn add_data_validation(&mut self, range: &str, rule: &DataValidationRule) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.sheet_mut().validations.push((range, rule.clone()));
        Ok(())
    }

    fn add_conditional_format(&mut self, range: &str, rule: &CfRule) -> Result<()> {
        let range = CellRange::parse(range)?;
        self.sheet_mut()
            .conditional_formats
            .push((range, rule.clone()));
        Ok(())
    }

    fn run_macro(&mut self, _code: &str) -> Result<()> {
        // No executable host behind a parsed container
        Err(Error::unsupported(BACKEND_NAME, "run_macro"))
    }

    fn add_macro_module(&mut self, _name: &str, _code: &str) -> Result<()> {
        Err(Error::unsupported(BACKEND_NAME, "add_macro_module"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn workbook() -> FileWorkbook {
        FileWorkbook::create("test.xlsx")
    }

    #[test]
    fn test_value_and_formula_fallbacks() {
        let mut wb = workbook();
        {
            let mut sheet = wb.sheet("Sheet1").unwrap();
            sheet.set_value("A1", &CellValue::Number(42.0)).unwrap();
            sheet.set_formula("B1", "=SUM(A1:A1)").unwrap();
        }

        let mut sheet = wb.sheet("Sheet1").unwrap();
        // Plain value reads as display text
        assert_eq!(sheet.value("A1").unwrap(), "42");
        // A formula with no cached result displays as empty
        assert_eq!(sheet.value("B1").unwrap(), "");
        // Formula always comes back =-prefixed
        assert_eq!(sheet.formula("B1").unwrap(), "=SUM(A1:A1)");
        // No formula stored: same as value()
        assert_eq!(sheet.formula("A1").unwrap(), "42");
        assert_eq!(sheet.formula("Z9").unwrap(), "");
    }

    #[test]
    fn test_used_range_grows_with_writes() {
        let mut wb = workbook();
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.set_value("A1", &CellValue::Number(1.0)).unwrap();
        assert_eq!(sheet.used_range().unwrap().to_a1(), "A1");
        sheet.set_value("C3", &CellValue::Number(2.0)).unwrap();
        assert_eq!(sheet.used_range().unwrap().to_a1(), "A1:C3");
        // Interior writes leave the bounds alone
        sheet.set_value("B2", &CellValue::Number(3.0)).unwrap();
        assert_eq!(sheet.used_range().unwrap().to_a1(), "A1:C3");
    }

    #[test]
    fn test_copy_sheet_is_adjacent() {
        let mut wb = workbook();
        wb.create_sheet("Data").unwrap();
        wb.copy_sheet("Sheet1", "Sheet1 Copy").unwrap();
        assert_eq!(
            wb.sheet_names().unwrap(),
            vec!["Sheet1", "Sheet1 Copy", "Data"]
        );
    }

    #[test]
    fn test_unsupported_operations_are_typed() {
        let mut wb = workbook();
        let mut sheet = wb.sheet("Sheet1").unwrap();
        assert!(sheet.capture_picture("A1:B2").unwrap_err().is_unsupported());
        assert!(sheet.run_macro("1+1").unwrap_err().is_unsupported());
        assert!(sheet
            .add_macro_module("Module1", "Sub A()\nEnd Sub")
            .unwrap_err()
            .is_unsupported());
    }

    #[test]
    fn test_add_table_rejects_duplicates() {
        let mut wb = workbook();
        {
            let mut sheet = wb.sheet("Sheet1").unwrap();
            sheet.add_table("A1:C5", "Inventory").unwrap();
            assert!(sheet.add_table("E1:F5", "Inventory").is_err());
            assert!(sheet.add_table("E1:F5", "bad name").is_err());
        }
        wb.create_sheet("Other").unwrap();
        let mut other = wb.sheet("Other").unwrap();
        // Table names are unique workbook-wide
        assert!(other.add_table("A1:B2", "Inventory").is_err());
    }

    #[test]
    fn test_missing_sheet_is_not_found() {
        let mut wb = workbook();
        let err = wb.sheet("Nope").map(|_| ()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
