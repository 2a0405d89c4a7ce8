//! Workbook and worksheet adapters over the bridge.

use std::path::Path;

use sheetlink_core::{
    validate_sheet_name, CellRange, CellStyle, CellValue, CfRule, DataValidationRule, Error,
    FixedRowPages, PagingStrategy, PivotTable, Result, Table, Workbook, Worksheet,
};
use sheetlink_protocol::{Scalar, TableInfo, WorkbookInfo};

use crate::bridge::{linux_to_wine_path, BridgeConfig, SessionBridge};
use crate::codec;
use crate::error::{BridgeError, Result as BridgeResult};

pub const BACKEND_NAME: &str = "live";

/// Rows per page when reading through the live session. The caller's hint
/// is ignored: interactive hosts throttle large reads, so pages stay at a
/// fixed height tuned for round-trip cost.
const PAGE_ROWS: u32 = 1000;

/// A document open in the running host application, driven through the
/// bridge process.
pub struct LiveWorkbook {
    bridge: SessionBridge,
    handle: u64,
}

impl LiveWorkbook {
    /// Start a bridge and attach to the open document matching `path`.
    ///
    /// The host's open-document list is matched against the path (native
    /// and WINE views, volume-normalized) and against the remote-document
    /// heuristic; no match is `NoMatch`, which the selector treats as
    /// NotFound and falls back from.
    pub fn attach<P: AsRef<Path>>(config: BridgeConfig, path: P) -> BridgeResult<Self> {
        let bridge = SessionBridge::start(config)?;
        let path = path.as_ref();

        let workbooks = bridge.list_workbooks()?;
        let writable = path_is_writable(path);
        let Some(index) = select_workbook(&workbooks, path, writable) else {
            return Err(BridgeError::NoMatch(path.display().to_string()));
        };

        tracing::debug!(
            "Attaching to open document {} of {}",
            index,
            workbooks.len()
        );
        let handle = bridge.attach_workbook(index)?;
        Ok(Self { bridge, handle })
    }

    /// End the session the way drop would, but report the outcome: host
    /// settings restored, bridge process reaped.
    pub fn close(&mut self) -> BridgeResult<()> {
        self.bridge.shutdown()
    }
}

impl Workbook for LiveWorkbook {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn sheet_names(&mut self) -> Result<Vec<String>> {
        Ok(self.bridge.list_sheets(self.handle)?)
    }

    fn sheet<'a>(&'a mut self, name: &str) -> Result<Box<dyn Worksheet + 'a>> {
        let names = self.bridge.list_sheets(self.handle)?;
        if !names.iter().any(|n| n == name) {
            return Err(Error::not_found(format!("sheet {name}")));
        }
        Ok(Box::new(LiveWorksheet {
            bridge: &self.bridge,
            workbook: self.handle,
            name: name.to_string(),
        }))
    }

    fn create_sheet(&mut self, name: &str) -> Result<()> {
        validate_sheet_name(name)?;
        Ok(self.bridge.add_sheet_after_active(self.handle, name)?)
    }

    fn copy_sheet(&mut self, source: &str, new_name: &str) -> Result<()> {
        validate_sheet_name(new_name)?;
        Ok(self
            .bridge
            .copy_sheet_after(self.handle, source, new_name)?)
    }

    fn save(&mut self) -> Result<()> {
        self.bridge.save_workbook(self.handle)?;
        tracing::debug!("Saved document through the host");
        Ok(())
    }
}

/// One sheet of an attached document. Holds a borrow of the workbook, so
/// the borrow checker enforces that sheets are released before the next
/// workbook-level call.
struct LiveWorksheet<'a> {
    bridge: &'a SessionBridge,
    workbook: u64,
    name: String,
}

impl Worksheet for LiveWorksheet<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn tables(&mut self) -> Result<Vec<Table>> {
        let infos = self.bridge.list_tables(self.workbook, &self.name)?;
        infos.into_iter().map(table_from_info).collect()
    }

    fn pivot_tables(&mut self) -> Result<Vec<PivotTable>> {
        let infos = self.bridge.list_pivot_tables(self.workbook, &self.name)?;
        infos
            .into_iter()
            .map(|info| {
                let range = parse_host_range(&info.range)?;
                Ok(PivotTable {
                    name: info.name,
                    range,
                })
            })
            .collect()
    }

    fn set_value(&mut self, cell: &str, value: &CellValue) -> Result<()> {
        let scalar = match value {
            CellValue::Empty => Scalar::Null,
            CellValue::Boolean(b) => Scalar::Bool(*b),
            CellValue::Number(n) => Scalar::Number(*n),
            CellValue::Text(s) => Scalar::String(s.clone()),
            CellValue::Error(e) => Scalar::String(e.clone()),
            CellValue::Formula { text, .. } => {
                let formula = format!("={text}");
                return Ok(self
                    .bridge
                    .set_cell_formula(self.workbook, &self.name, cell, &formula)?);
            }
        };
        Ok(self
            .bridge
            .set_cell_value(self.workbook, &self.name, cell, scalar)?)
    }

    fn set_formula(&mut self, cell: &str, formula: &str) -> Result<()> {
        let formula = if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={formula}")
        };
        Ok(self
            .bridge
            .set_cell_formula(self.workbook, &self.name, cell, &formula)?)
    }

    /// The host's displayed text: what the cell shows after number
    /// formatting, not the underlying value.
    fn value(&mut self, cell: &str) -> Result<String> {
        Ok(self.bridge.get_cell_text(self.workbook, &self.name, cell)?)
    }

    /// The host returns the literal value text when the cell stores no
    /// formula, which is exactly the contract's fallback.
    fn formula(&mut self, cell: &str) -> Result<String> {
        Ok(self
            .bridge
            .get_cell_formula(self.workbook, &self.name, cell)?)
    }

    fn used_range(&mut self) -> Result<CellRange> {
        let address = self.bridge.get_used_range(self.workbook, &self.name)?;
        parse_host_range(&address)
    }

    fn paging_strategy(&mut self, _page_size: u32) -> Result<Box<dyn PagingStrategy>> {
        let used = self.used_range()?;
        Ok(Box::new(FixedRowPages::new(used, PAGE_ROWS)?))
    }

    fn capture_picture(&mut self, range: &str) -> Result<String> {
        Ok(self
            .bridge
            .capture_picture(self.workbook, &self.name, range)?)
    }

    fn add_table(&mut self, range: &str, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(' ') {
            return Err(Error::invalid(format!("table name: {name:?}")));
        }
        Ok(self.bridge.add_table(self.workbook, &self.name, range, name)?)
    }

    fn cell_style(&mut self, cell: &str) -> Result<CellStyle> {
        let raw = self.bridge.read_cell_style(self.workbook, &self.name, cell)?;
        Ok(codec::decode_cell_style(&raw))
    }

    fn add_data_validation(&mut self, range: &str, rule: &DataValidationRule) -> Result<()> {
        let raw = codec::encode_validation(rule);
        Ok(self
            .bridge
            .add_validation(self.workbook, &self.name, range, raw)?)
    }

    fn add_conditional_format(&mut self, range: &str, rule: &CfRule) -> Result<()> {
        let raw = codec::encode_conditional(rule)?;
        Ok(self
            .bridge
            .add_conditional_format(self.workbook, &self.name, range, raw)?)
    }

    fn run_macro(&mut self, code: &str) -> Result<()> {
        Ok(self.bridge.run_macro(self.workbook, code)?)
    }

    fn add_macro_module(&mut self, name: &str, code: &str) -> Result<()> {
        Ok(self.bridge.add_macro_module(self.workbook, name, code)?)
    }
}

fn table_from_info(info: TableInfo) -> Result<Table> {
    let range = parse_host_range(&info.range)?;
    Ok(Table {
        name: info.name,
        range,
    })
}

/// Host range addresses come back absolute (`$A$1:$C$3`) and sometimes
/// sheet-qualified; reduce them to the canonical bare form.
fn parse_host_range(address: &str) -> Result<CellRange> {
    let address = address.rsplit_once('!').map_or(address, |(_, tail)| tail);
    CellRange::parse(address)
}

/// Pick the open document matching the requested path, scanning in the
/// host's workbook order.
///
/// A document opened from a remote host reports an URL as its full name
/// and has no retrievable local path; if its display name equals the
/// requested base name and the requested path is not writable (the local
/// file is a sync placeholder), that document is the match. Otherwise full
/// names are compared against the native path and its WINE view after
/// volume normalization.
pub(crate) fn select_workbook(
    workbooks: &[WorkbookInfo],
    requested: &Path,
    requested_writable: bool,
) -> Option<u32> {
    let native = normalize_path(&requested.display().to_string());
    let wine = normalize_path(&linux_to_wine_path(requested));
    let basename = requested
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for info in workbooks {
        if info.full_name.starts_with("https:") && info.name == basename {
            if !requested_writable {
                return Some(info.index);
            }
            // A writable local file exists, so this open remote document
            // is not the one the caller means.
        } else {
            let full = normalize_path(&info.full_name);
            if full == native || full == wine {
                return Some(info.index);
            }
        }
    }
    None
}

/// Unify separators and uppercase the volume prefix. Host full names and
/// canonicalized request paths are already clean; only separators and the
/// volume case vary between the two sides.
fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('/', "\\");
    let lower_volume = {
        let bytes = normalized.as_bytes();
        bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_lowercase()
    };
    if lower_volume {
        normalized[0..1].make_ascii_uppercase();
    }
    normalized
}

fn path_is_writable(path: &Path) -> bool {
    std::fs::OpenOptions::new().write(true).open(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(index: u32, name: &str, full_name: &str) -> WorkbookInfo {
        WorkbookInfo {
            index,
            name: name.to_string(),
            full_name: full_name.to_string(),
        }
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("z:/home/user/book.xlsx"), "Z:\\home\\user\\book.xlsx");
        assert_eq!(normalize_path("C:\\Users\\a\\book.xlsx"), "C:\\Users\\a\\book.xlsx");
        assert_eq!(normalize_path("relative\\path"), "relative\\path");
    }

    #[test]
    fn test_select_by_wine_path() {
        let workbooks = vec![
            info(1, "other.xlsx", "Z:\\tmp\\other.xlsx"),
            info(2, "book.xlsx", "z:\\home\\user\\book.xlsx"),
        ];
        let selected = select_workbook(&workbooks, Path::new("/home/user/book.xlsx"), true);
        assert_eq!(selected, Some(2));
    }

    #[test]
    fn test_select_by_native_path() {
        let workbooks = vec![info(1, "book.xlsx", "C:\\Users\\a\\book.xlsx")];
        let selected = select_workbook(&workbooks, Path::new("c:\\Users\\a\\book.xlsx"), true);
        assert_eq!(selected, Some(1));
    }

    #[test]
    fn test_remote_document_matches_unwritable_placeholder() {
        let workbooks = vec![info(
            1,
            "report.xlsx",
            "https://tenant.example.com/docs/report.xlsx",
        )];
        let requested = Path::new("/sync/placeholder/report.xlsx");
        assert_eq!(select_workbook(&workbooks, requested, false), Some(1));
        // A writable local path means the remote document is not ours
        assert_eq!(select_workbook(&workbooks, requested, true), None);
    }

    #[test]
    fn test_no_match() {
        let workbooks = vec![info(1, "a.xlsx", "Z:\\tmp\\a.xlsx")];
        assert_eq!(
            select_workbook(&workbooks, Path::new("/tmp/b.xlsx"), true),
            None
        );
    }

    #[test]
    fn test_first_match_wins() {
        let workbooks = vec![
            info(1, "book.xlsx", "Z:\\data\\book.xlsx"),
            info(2, "book.xlsx", "Z:\\data\\book.xlsx"),
        ];
        let selected = select_workbook(&workbooks, Path::new("/data/book.xlsx"), true);
        assert_eq!(selected, Some(1));
    }
}
