//! Subprocess management and JSON IPC for the bridge process.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sheetlink_protocol::{
    Command as BridgeCommand, RawCellStyle, RawConditionalFormat, RawValidation, Request, Response,
    ResponseData, ResponseResult, Scalar, TableInfo, WorkbookInfo,
};

use crate::error::{BridgeError, Result};

/// Configuration for the bridge process.
pub struct BridgeConfig {
    /// Path to the `sheetlink-bridge.exe` Windows executable.
    /// If None, `SHEETLINK_BRIDGE_EXE` is consulted, then common locations
    /// relative to the current binary.
    pub bridge_exe: Option<PathBuf>,

    /// Command the executable runs under. `None` runs it directly (native
    /// Windows); the default runs it under WINE, honoring `SHEETLINK_WINE`.
    pub wine_cmd: Option<PathBuf>,

    /// Optional WINEPREFIX to use (for isolating the WINE environment).
    pub wine_prefix: Option<PathBuf>,

    /// Timeout for waiting for bridge responses.
    pub timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        let wine = std::env::var_os("SHEETLINK_WINE")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("wine"));
        Self {
            bridge_exe: None,
            wine_cmd: if cfg!(windows) { None } else { Some(wine) },
            wine_prefix: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// The handle for communicating with the bridge process.
///
/// Manages the subprocess lifecycle and serializes one request line per
/// command, reading one response line back. The host's suppressed settings
/// (screen updating, event firing) are restored when the bridge shuts down,
/// so [`shutdown`] runs on drop as well if it was never called explicitly.
///
/// [`shutdown`]: SessionBridge::shutdown
pub struct SessionBridge {
    child: Mutex<Child>,
    stdin: Mutex<std::process::ChildStdin>,
    stdout: Mutex<BufReader<std::process::ChildStdout>>,
    next_id: AtomicU64,
    shut_down: bool,
}

impl SessionBridge {
    /// Start the bridge process and attach to the running host application.
    pub fn start(config: BridgeConfig) -> Result<Self> {
        let exe_path = config.bridge_exe.clone().unwrap_or_else(find_bridge_exe);

        if !exe_path.exists() {
            return Err(BridgeError::BridgeExeNotFound(
                exe_path.display().to_string(),
            ));
        }

        let mut cmd = match &config.wine_cmd {
            Some(wine) => {
                let mut cmd = std::process::Command::new(wine);
                cmd.arg(&exe_path);
                cmd
            }
            None => std::process::Command::new(&exe_path),
        };

        if let Some(prefix) = &config.wine_prefix {
            cmd.env("WINEPREFIX", prefix);
        }

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit()); // Bridge diagnostics go to our stderr

        tracing::info!("Starting bridge: {:?}", cmd);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound && config.wine_cmd.is_some() {
                BridgeError::WineNotFound
            } else {
                BridgeError::SpawnFailed(e)
            }
        })?;

        let stdin = child.stdin.take().expect("stdin was piped");
        let stdout = child.stdout.take().expect("stdout was piped");

        let bridge = Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            next_id: AtomicU64::new(1),
            shut_down: false,
        };

        // Initialize COM and attach to the host session
        bridge.call(BridgeCommand::Init)?;

        Ok(bridge)
    }

    /// Send a command to the bridge and wait for the matching response.
    fn call(&self, command: BridgeCommand) -> Result<Option<ResponseData>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let request = Request { id, command };
        let json = serde_json::to_string(&request)?;

        // Send the request
        {
            let mut stdin = self.stdin.lock().unwrap();
            writeln!(stdin, "{json}").map_err(|e| BridgeError::SendFailed(e.to_string()))?;
            stdin
                .flush()
                .map_err(|e| BridgeError::SendFailed(e.to_string()))?;
        }

        // Read the response
        let response: Response = {
            let mut stdout = self.stdout.lock().unwrap();
            let mut line = String::new();
            stdout
                .read_line(&mut line)
                .map_err(|e| BridgeError::ReadFailed(e.to_string()))?;

            if line.is_empty() {
                return Err(BridgeError::NotRunning);
            }

            serde_json::from_str(&line)?
        };

        if response.id != id {
            return Err(BridgeError::IdMismatch {
                sent: id,
                got: response.id,
            });
        }

        match response.result {
            ResponseResult::Ok { data } => Ok(data),
            ResponseResult::Error { message } => Err(BridgeError::Bridge(message)),
        }
    }

    /// Shut down the bridge: restore host settings, release COM objects,
    /// and reap the process. Idempotent; the drop path calls it too.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let result = self.call(BridgeCommand::Shutdown);

        let mut child = self.child.lock().unwrap();
        if result.is_err() {
            let _ = child.kill();
        }
        let _ = child.wait();

        result.map(|_| ())
    }

    // -- Typed commands used by the workbook and worksheet adapters --

    pub(crate) fn list_workbooks(&self) -> Result<Vec<WorkbookInfo>> {
        match self.call(BridgeCommand::ListWorkbooks)? {
            Some(ResponseData::Workbooks { workbooks }) => Ok(workbooks),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn attach_workbook(&self, index: u32) -> Result<u64> {
        match self.call(BridgeCommand::AttachWorkbook { index })? {
            Some(ResponseData::WorkbookHandle { workbook }) => Ok(workbook),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn list_sheets(&self, workbook: u64) -> Result<Vec<String>> {
        match self.call(BridgeCommand::ListSheets { workbook })? {
            Some(ResponseData::Names { names }) => Ok(names),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn add_sheet_after_active(&self, workbook: u64, name: &str) -> Result<()> {
        self.call(BridgeCommand::AddSheetAfterActive {
            workbook,
            name: name.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn copy_sheet_after(
        &self,
        workbook: u64,
        source: &str,
        new_name: &str,
    ) -> Result<()> {
        self.call(BridgeCommand::CopySheetAfter {
            workbook,
            source: source.to_string(),
            new_name: new_name.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn set_cell_value(
        &self,
        workbook: u64,
        sheet: &str,
        cell: &str,
        value: Scalar,
    ) -> Result<()> {
        self.call(BridgeCommand::SetCellValue {
            workbook,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            value,
        })?;
        Ok(())
    }

    pub(crate) fn set_cell_formula(
        &self,
        workbook: u64,
        sheet: &str,
        cell: &str,
        formula: &str,
    ) -> Result<()> {
        self.call(BridgeCommand::SetCellFormula {
            workbook,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
            formula: formula.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn get_cell_text(&self, workbook: u64, sheet: &str, cell: &str) -> Result<String> {
        match self.call(BridgeCommand::GetCellText {
            workbook,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
        })? {
            Some(ResponseData::Text { text }) => Ok(text),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_cell_formula(
        &self,
        workbook: u64,
        sheet: &str,
        cell: &str,
    ) -> Result<String> {
        match self.call(BridgeCommand::GetCellFormula {
            workbook,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
        })? {
            Some(ResponseData::Formula { formula }) => Ok(formula),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn get_used_range(&self, workbook: u64, sheet: &str) -> Result<String> {
        match self.call(BridgeCommand::GetUsedRange {
            workbook,
            sheet: sheet.to_string(),
        })? {
            Some(ResponseData::Range { range }) => Ok(range),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn list_tables(&self, workbook: u64, sheet: &str) -> Result<Vec<TableInfo>> {
        match self.call(BridgeCommand::ListTables {
            workbook,
            sheet: sheet.to_string(),
        })? {
            Some(ResponseData::Tables { tables }) => Ok(tables),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn list_pivot_tables(&self, workbook: u64, sheet: &str) -> Result<Vec<TableInfo>> {
        match self.call(BridgeCommand::ListPivotTables {
            workbook,
            sheet: sheet.to_string(),
        })? {
            Some(ResponseData::Pivots { pivots }) => Ok(pivots),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn add_table(
        &self,
        workbook: u64,
        sheet: &str,
        range: &str,
        name: &str,
    ) -> Result<()> {
        self.call(BridgeCommand::AddTable {
            workbook,
            sheet: sheet.to_string(),
            range: range.to_string(),
            name: name.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn read_cell_style(
        &self,
        workbook: u64,
        sheet: &str,
        cell: &str,
    ) -> Result<RawCellStyle> {
        match self.call(BridgeCommand::ReadCellStyle {
            workbook,
            sheet: sheet.to_string(),
            cell: cell.to_string(),
        })? {
            Some(ResponseData::Style { style }) => Ok(style),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn add_validation(
        &self,
        workbook: u64,
        sheet: &str,
        range: &str,
        rule: RawValidation,
    ) -> Result<()> {
        self.call(BridgeCommand::AddValidation {
            workbook,
            sheet: sheet.to_string(),
            range: range.to_string(),
            rule,
        })?;
        Ok(())
    }

    pub(crate) fn add_conditional_format(
        &self,
        workbook: u64,
        sheet: &str,
        range: &str,
        rule: RawConditionalFormat,
    ) -> Result<()> {
        self.call(BridgeCommand::AddConditionalFormat {
            workbook,
            sheet: sheet.to_string(),
            range: range.to_string(),
            rule,
        })?;
        Ok(())
    }

    pub(crate) fn capture_picture(&self, workbook: u64, sheet: &str, range: &str) -> Result<String> {
        match self.call(BridgeCommand::CapturePicture {
            workbook,
            sheet: sheet.to_string(),
            range: range.to_string(),
        })? {
            Some(ResponseData::Image { image }) => Ok(image),
            _ => Err(BridgeError::UnexpectedResponse),
        }
    }

    pub(crate) fn run_macro(&self, workbook: u64, code: &str) -> Result<()> {
        self.call(BridgeCommand::RunMacro {
            workbook,
            code: code.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn add_macro_module(&self, workbook: u64, name: &str, code: &str) -> Result<()> {
        self.call(BridgeCommand::AddMacroModule {
            workbook,
            name: name.to_string(),
            code: code.to_string(),
        })?;
        Ok(())
    }

    pub(crate) fn save_workbook(&self, workbook: u64) -> Result<()> {
        self.call(BridgeCommand::SaveWorkbook { workbook })?;
        Ok(())
    }
}

impl Drop for SessionBridge {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Convert a Linux filesystem path to a WINE (Windows) path.
///
/// WINE maps `/` to `Z:\`, so `/home/user/file.xlsx` becomes
/// `Z:\home\user\file.xlsx`.
pub fn linux_to_wine_path(linux_path: &Path) -> String {
    let abs = if linux_path.is_absolute() {
        linux_path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(linux_path)
    };

    // WINE maps the root filesystem to Z:
    format!("Z:{}", abs.display()).replace('/', "\\")
}

/// Attempt to locate the bridge exe relative to the current executable or in
/// common paths.
fn find_bridge_exe() -> PathBuf {
    if let Some(path) = std::env::var_os("SHEETLINK_BRIDGE_EXE") {
        return PathBuf::from(path);
    }

    // Check next to the current executable
    if let Ok(mut exe) = std::env::current_exe() {
        exe.pop();
        let candidate = exe.join("sheetlink-bridge.exe");
        if candidate.exists() {
            return candidate;
        }
    }

    // Check in the target directory (for development)
    for profile in ["release", "debug"] {
        let candidate =
            PathBuf::from(format!("target/x86_64-pc-windows-gnu/{profile}/sheetlink-bridge.exe"));
        if candidate.exists() {
            return candidate;
        }
    }

    // Default: assume it's in the current directory
    PathBuf::from("sheetlink-bridge.exe")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linux_to_wine_path() {
        assert_eq!(
            linux_to_wine_path(Path::new("/home/user/book.xlsx")),
            "Z:\\home\\user\\book.xlsx"
        );
    }
}
