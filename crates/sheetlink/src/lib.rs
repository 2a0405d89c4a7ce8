//! # sheetlink
//!
//! Inspect and mutate spreadsheet documents through one operation set,
//! whichever of two execution paths is available:
//!
//! - the **live-session backend** drives a running host application
//!   through a COM bridge process and mutates its in-memory document;
//! - the **file-format backend** parses the on-disk container into an
//!   in-memory model, mutates that, and re-serializes on save.
//!
//! [`open`] prefers the live session so in-flight unsaved edits and macro
//! state are respected, and falls back to the file backend so everything
//! still works with no host running. After open, all calls go through the
//! [`Workbook`]/[`Worksheet`] contract; nothing downstream branches on
//! which backend answered.
//!
//! ## Example
//!
//! ```no_run
//! use sheetlink::prelude::*;
//!
//! let mut session = sheetlink::open("/data/report.xlsx")?;
//! {
//!     let mut sheet = session.sheet("Sheet1")?;
//!     sheet.set_value("A1", &CellValue::from(42.0))?;
//!     println!("used range: {}", sheet.used_range()?);
//! }
//! session.save()?;
//! session.close()?;
//! # Ok::<(), sheetlink::Error>(())
//! ```

pub mod prelude;

use std::path::{Path, PathBuf};

use sheetlink_file::FileWorkbook;
use sheetlink_live::{BridgeConfig, LiveWorkbook};

// Re-export the semantic model and contract
pub use sheetlink_core::{
    validate_sheet_name, BorderEdge, BorderLine, BorderSide, CellAddress, CellRange, CellStyle,
    CellValue, CfAnchor, CfAnchorKind, CfOperator, CfRule, CfRuleKind, DataValidationRule, Error,
    FillKind, FillPattern, FillShading, FillStyle, FixedRowPages, FontStyle, FontVerticalAlign,
    PagingStrategy, PivotTable, Result, Table, Underline, UsedRange, ValidationKind,
    ValidationOperator, Workbook, Worksheet, MAX_SHEET_NAME_LEN,
};
pub use sheetlink_file::FileError;
pub use sheetlink_live::BridgeError;

/// Which backends the selector may try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Try the live session first, fall back to the file backend.
    #[default]
    Auto,
    /// Live session only; fail if no running host has the document open.
    Live,
    /// File backend only; never spawn a bridge.
    File,
}

/// Options for [`open_with`].
#[derive(Default)]
pub struct OpenOptions {
    pub preference: BackendPreference,
    /// Bridge process configuration used when the live backend is tried.
    pub bridge: BridgeConfig,
}

enum Backend {
    Live(LiveWorkbook),
    File(FileWorkbook),
}

/// An open document session: the selected backend plus the teardown that
/// releases it.
///
/// Implements [`Workbook`], so a `Session` is used exactly like either
/// backend. Dropping a session releases its resources too (the live
/// backend restores the host settings it suppressed), but only [`close`]
/// reports whether that teardown succeeded.
///
/// [`close`]: Session::close
pub struct Session {
    backend: Backend,
}

impl Session {
    /// End the session, restoring any host-wide settings the live backend
    /// suppressed on open.
    pub fn close(mut self) -> Result<()> {
        match &mut self.backend {
            Backend::Live(workbook) => workbook.close().map_err(Error::from),
            Backend::File(_) => Ok(()),
        }
    }
}

impl Workbook for Session {
    fn backend_name(&self) -> &'static str {
        match &self.backend {
            Backend::Live(wb) => wb.backend_name(),
            Backend::File(wb) => wb.backend_name(),
        }
    }

    fn sheet_names(&mut self) -> Result<Vec<String>> {
        match &mut self.backend {
            Backend::Live(wb) => wb.sheet_names(),
            Backend::File(wb) => wb.sheet_names(),
        }
    }

    fn sheet<'a>(&'a mut self, name: &str) -> Result<Box<dyn Worksheet + 'a>> {
        match &mut self.backend {
            Backend::Live(wb) => wb.sheet(name),
            Backend::File(wb) => wb.sheet(name),
        }
    }

    fn create_sheet(&mut self, name: &str) -> Result<()> {
        match &mut self.backend {
            Backend::Live(wb) => wb.create_sheet(name),
            Backend::File(wb) => wb.create_sheet(name),
        }
    }

    fn copy_sheet(&mut self, source: &str, new_name: &str) -> Result<()> {
        match &mut self.backend {
            Backend::Live(wb) => wb.copy_sheet(source, new_name),
            Backend::File(wb) => wb.copy_sheet(source, new_name),
        }
    }

    fn save(&mut self) -> Result<()> {
        match &mut self.backend {
            Backend::Live(wb) => wb.save(),
            Backend::File(wb) => wb.save(),
        }
    }
}

/// Open a document with the default policy: live session first, file
/// backend as fallback.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Session> {
    open_with(path, OpenOptions::default())
}

/// Open a document under explicit backend and bridge options.
///
/// Under [`BackendPreference::Auto`] a live-session failure is absorbed:
/// "no running host has this document open" is the expected state on a
/// machine without the application running, so the file backend's more
/// diagnostic error is the one surfaced if both fail.
///
/// The live attach runs before any filesystem check: a host can hold a
/// remote/synced document whose local path is only a placeholder, and the
/// attach matcher handles that case by name.
pub fn open_with<P: AsRef<Path>>(path: P, options: OpenOptions) -> Result<Session> {
    let path = absolute_path(path.as_ref());

    match options.preference {
        BackendPreference::File => open_file(&path),
        BackendPreference::Live => {
            let workbook = LiveWorkbook::attach(options.bridge, &path)?;
            Ok(Session {
                backend: Backend::Live(workbook),
            })
        }
        BackendPreference::Auto => match LiveWorkbook::attach(options.bridge, &path) {
            Ok(workbook) => {
                tracing::debug!("Attached to live session for {}", path.display());
                Ok(Session {
                    backend: Backend::Live(workbook),
                })
            }
            Err(live_err) => {
                tracing::debug!(
                    "No live session for {} ({live_err}); using the file backend",
                    path.display()
                );
                open_file(&path)
            }
        },
    }
}

fn open_file(path: &Path) -> Result<Session> {
    if !path.exists() {
        return Err(Error::not_found(format!("document {}", path.display())));
    }
    let workbook = FileWorkbook::open(path).map_err(Error::from)?;
    Ok(Session {
        backend: Backend::File(workbook),
    })
}

fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_document_is_not_found() {
        let options = OpenOptions {
            preference: BackendPreference::File,
            ..OpenOptions::default()
        };
        let err = open_with("/definitely/not/here.xlsx", options)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_default_preference_is_auto() {
        assert_eq!(OpenOptions::default().preference, BackendPreference::Auto);
    }
}
