//! sheetlink bridge — a Windows process that automates the running
//! spreadsheet host via COM, controlled by JSON commands over stdin/stdout.
//!
//! Designed to be cross-compiled from Linux and run under WINE.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! - Reads `Request` objects from stdin
//! - Writes `Response` objects to stdout
//! - Diagnostic/log messages go to stderr (never stdout)

mod bmp;
#[cfg(windows)]
mod dispatch;
#[cfg(windows)]
mod session;

#[cfg(not(windows))]
fn main() {
    eprintln!("sheetlink-bridge must be compiled for Windows (--target x86_64-pc-windows-gnu)");
    eprintln!("and run under WINE on Linux.");
    std::process::exit(1);
}

#[cfg(windows)]
fn main() {
    use std::io::{self, BufRead, Write};

    use sheetlink_protocol::*;

    // Use stderr for all diagnostic output so stdout stays clean for protocol
    eprintln!("[sheetlink-bridge] Starting up...");

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut session: Option<session::HostSession> = None;

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("[sheetlink-bridge] stdin read error: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("[sheetlink-bridge] JSON parse error: {e}");
                eprintln!("[sheetlink-bridge] Line was: {line}");
                // Send an error response with id=0 since we couldn't parse the request
                let resp = Response {
                    id: 0,
                    result: ResponseResult::Error {
                        message: format!("JSON parse error: {e}"),
                    },
                };
                let _ = writeln!(out, "{}", serde_json::to_string(&resp).unwrap());
                let _ = out.flush();
                continue;
            }
        };

        let response = handle_command(&mut session, &request);
        let json = serde_json::to_string(&response).unwrap();
        let _ = writeln!(out, "{json}");
        let _ = out.flush();

        // If it was a shutdown command and it succeeded, exit
        if matches!(request.command, Command::Shutdown)
            && matches!(response.result, ResponseResult::Ok { .. })
        {
            eprintln!("[sheetlink-bridge] Shutdown complete, exiting.");
            break;
        }
    }

    // If the session is still attached when stdin closes, restore the host
    if let Some(mut s) = session {
        eprintln!("[sheetlink-bridge] stdin closed, restoring host settings...");
        let _ = s.restore();
        uninit_com();
    }

    eprintln!("[sheetlink-bridge] Process exiting.");
}

#[cfg(windows)]
fn handle_command(
    session: &mut Option<session::HostSession>,
    request: &sheetlink_protocol::Request,
) -> sheetlink_protocol::Response {
    use sheetlink_protocol::*;

    let id = request.id;

    let result = match &request.command {
        Command::Init => init_com_and_attach(session),
        Command::ListWorkbooks => with_session(session, |s| {
            let workbooks = s.list_workbooks()?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Workbooks { workbooks }),
            })
        }),
        Command::AttachWorkbook { index } => with_session(session, |s| {
            let handle = s.attach_workbook(*index)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::WorkbookHandle { workbook: handle }),
            })
        }),
        Command::ListSheets { workbook } => with_session(session, |s| {
            let names = s.list_sheets(*workbook)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Names { names }),
            })
        }),
        Command::AddSheetAfterActive { workbook, name } => with_session(session, |s| {
            s.add_sheet_after_active(*workbook, name)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::CopySheetAfter {
            workbook,
            source,
            new_name,
        } => with_session(session, |s| {
            s.copy_sheet_after(*workbook, source, new_name)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::SetCellValue {
            workbook,
            sheet,
            cell,
            value,
        } => with_session(session, |s| {
            s.set_cell_value(*workbook, sheet, cell, value)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::SetCellFormula {
            workbook,
            sheet,
            cell,
            formula,
        } => with_session(session, |s| {
            s.set_cell_formula(*workbook, sheet, cell, formula)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::GetCellText {
            workbook,
            sheet,
            cell,
        } => with_session(session, |s| {
            let text = s.get_cell_text(*workbook, sheet, cell)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Text { text }),
            })
        }),
        Command::GetCellFormula {
            workbook,
            sheet,
            cell,
        } => with_session(session, |s| {
            let formula = s.get_cell_formula(*workbook, sheet, cell)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Formula { formula }),
            })
        }),
        Command::GetUsedRange { workbook, sheet } => with_session(session, |s| {
            let range = s.get_used_range(*workbook, sheet)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Range { range }),
            })
        }),
        Command::ListTables { workbook, sheet } => with_session(session, |s| {
            let tables = s.list_tables(*workbook, sheet)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Tables { tables }),
            })
        }),
        Command::ListPivotTables { workbook, sheet } => with_session(session, |s| {
            let pivots = s.list_pivot_tables(*workbook, sheet)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Pivots { pivots }),
            })
        }),
        Command::AddTable {
            workbook,
            sheet,
            range,
            name,
        } => with_session(session, |s| {
            s.add_table(*workbook, sheet, range, name)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::ReadCellStyle {
            workbook,
            sheet,
            cell,
        } => with_session(session, |s| {
            let style = s.read_cell_style(*workbook, sheet, cell)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Style { style }),
            })
        }),
        Command::AddValidation {
            workbook,
            sheet,
            range,
            rule,
        } => with_session(session, |s| {
            s.add_validation(*workbook, sheet, range, rule)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::AddConditionalFormat {
            workbook,
            sheet,
            range,
            rule,
        } => with_session(session, |s| {
            s.add_conditional_format(*workbook, sheet, range, rule)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::CapturePicture {
            workbook,
            sheet,
            range,
        } => with_session(session, |s| {
            let image = s.capture_picture(*workbook, sheet, range)?;
            Ok(ResponseResult::Ok {
                data: Some(ResponseData::Image { image }),
            })
        }),
        Command::RunMacro { workbook, code } => with_session(session, |s| {
            s.run_macro(*workbook, code)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::AddMacroModule {
            workbook,
            name,
            code,
        } => with_session(session, |s| {
            s.add_macro_module(*workbook, name, code)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::SaveWorkbook { workbook } => with_session(session, |s| {
            s.save_workbook(*workbook)?;
            Ok(ResponseResult::Ok { data: None })
        }),
        Command::Shutdown => match session.take() {
            Some(mut s) => match s.restore() {
                Ok(()) => {
                    drop(s);
                    uninit_com();
                    ResponseResult::Ok { data: None }
                }
                Err(e) => ResponseResult::Error {
                    message: format!("Shutdown failed: {e}"),
                },
            },
            None => ResponseResult::Ok { data: None },
        },
    };

    Response { id, result }
}

#[cfg(windows)]
fn init_com_and_attach(
    session: &mut Option<session::HostSession>,
) -> sheetlink_protocol::ResponseResult {
    use sheetlink_protocol::ResponseResult;
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};

    if session.is_some() {
        return ResponseResult::Ok { data: None }; // Already initialized
    }

    // Initialize COM in Single-Threaded Apartment mode (required by the host)
    unsafe {
        let hr = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        if let Err(e) = hr.ok() {
            return ResponseResult::Error {
                message: format!("CoInitializeEx failed: {e}"),
            };
        }
    }

    eprintln!("[sheetlink-bridge] COM initialized (STA)");

    match session::HostSession::attach() {
        Ok(s) => {
            eprintln!("[sheetlink-bridge] Attached to running host session");
            *session = Some(s);
            ResponseResult::Ok { data: None }
        }
        Err(e) => {
            uninit_com();
            ResponseResult::Error {
                message: format!("Failed to attach to host session: {e}"),
            }
        }
    }
}

#[cfg(windows)]
fn uninit_com() {
    unsafe {
        windows::Win32::System::Com::CoUninitialize();
    }
    eprintln!("[sheetlink-bridge] COM uninitialized");
}

#[cfg(windows)]
fn with_session(
    session: &mut Option<session::HostSession>,
    f: impl FnOnce(&mut session::HostSession) -> Result<sheetlink_protocol::ResponseResult, String>,
) -> sheetlink_protocol::ResponseResult {
    match session.as_mut() {
        Some(s) => match f(s) {
            Ok(r) => r,
            Err(e) => sheetlink_protocol::ResponseResult::Error { message: e },
        },
        None => sheetlink_protocol::ResponseResult::Error {
            message: "Session not attached. Send 'Init' command first.".to_string(),
        },
    }
}
