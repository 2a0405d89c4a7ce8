//! Shared protocol types for communication between the native Linux client
//! and the Windows COM bridge process running under WINE.
//!
//! The protocol is JSON-over-stdio: one JSON object per line in each
//! direction. Style, validation and conditional-format payloads carry the
//! host's raw integer codes; the client converts them to and from semantic
//! types on its side of the pipe, so the bridge stays a thin dispatcher.

use serde::{Deserialize, Serialize};

/// Host border edge index for the left edge (xlEdgeLeft).
pub const EDGE_LEFT: i32 = 7;
/// Host border edge index for the top edge (xlEdgeTop).
pub const EDGE_TOP: i32 = 8;
/// Host border edge index for the bottom edge (xlEdgeBottom).
pub const EDGE_BOTTOM: i32 = 9;
/// Host border edge index for the right edge (xlEdgeRight).
pub const EDGE_RIGHT: i32 = 10;

/// A command sent from the Linux client to the WINE bridge process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Monotonically increasing request ID for correlating responses.
    pub id: u64,
    /// The command to execute.
    #[serde(flatten)]
    pub command: Command,
}

/// Commands the client can send to the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "params")]
pub enum Command {
    /// Initialize COM, attach to the running host application and suppress
    /// screen updates and event firing until shutdown.
    Init,

    /// List the workbooks currently open in the host session.
    ListWorkbooks,

    /// Retain the workbook at the given 1-based position in the host's
    /// workbook collection. Returns a workbook handle.
    AttachWorkbook { index: u32 },

    /// List sheet names in workbook order.
    ListSheets { workbook: u64 },

    /// Insert a new sheet after the active one, then rename it.
    AddSheetAfterActive { workbook: u64, name: String },

    /// Copy a sheet so the copy lands immediately after the source, then
    /// rename the copy.
    CopySheetAfter {
        workbook: u64,
        source: String,
        new_name: String,
    },

    /// Set a cell's value (number, string, or bool).
    SetCellValue {
        workbook: u64,
        sheet: String,
        cell: String,
        value: Scalar,
    },

    /// Set a cell's formula (e.g., "=SUM(A1:A10)").
    SetCellFormula {
        workbook: u64,
        sheet: String,
        cell: String,
        formula: String,
    },

    /// Get a cell's displayed text.
    GetCellText {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Get a cell's formula string (empty string if no formula).
    GetCellFormula {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Get the host's used-range address for a sheet.
    GetUsedRange { workbook: u64, sheet: String },

    /// List the tables on a sheet.
    ListTables { workbook: u64, sheet: String },

    /// List the pivot tables on a sheet.
    ListPivotTables { workbook: u64, sheet: String },

    /// Create a table over a range and name it.
    AddTable {
        workbook: u64,
        sheet: String,
        range: String,
        name: String,
    },

    /// Read a cell's style as raw host codes.
    ReadCellStyle {
        workbook: u64,
        sheet: String,
        cell: String,
    },

    /// Apply a data validation rule to a range.
    AddValidation {
        workbook: u64,
        sheet: String,
        range: String,
        rule: RawValidation,
    },

    /// Replace the conditional formatting on a range with one rule.
    AddConditionalFormat {
        workbook: u64,
        sheet: String,
        range: String,
        rule: RawConditionalFormat,
    },

    /// Copy a range to the clipboard as a picture and return it as a
    /// base64-encoded BMP.
    CapturePicture {
        workbook: u64,
        sheet: String,
        range: String,
    },

    /// Evaluate macro code in the host application.
    RunMacro { workbook: u64, code: String },

    /// Add a named standard module to the workbook's macro project.
    AddMacroModule {
        workbook: u64,
        name: String,
        code: String,
    },

    /// Save the workbook through the host's own save.
    SaveWorkbook { workbook: u64 },

    /// Shut down the bridge: restore host settings, release COM objects,
    /// uninitialize COM. Never closes the user's workbooks.
    Shutdown,
}

/// A scalar cell value that can be sent to/from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// One open workbook in the host session, as reported by `ListWorkbooks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookInfo {
    /// 1-based position in the host's workbook collection.
    pub index: u32,
    /// Display name, usually the file's base name.
    pub name: String,
    /// Full path, or a URL for documents opened from a remote host.
    pub full_name: String,
}

/// A table or pivot table discovered on a sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    /// A1-style range address.
    pub range: String,
}

/// A cell's style as raw host codes. Decoding these into semantic styles is
/// the client's job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCellStyle {
    pub font: Option<RawFont>,
    pub interior: Option<RawInterior>,
    #[serde(default)]
    pub borders: Vec<RawBorder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawFont {
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
    /// BGR-ordered color integer.
    pub color: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawInterior {
    /// Host pattern code (xlPatternSolid = 1, xlPatternNone = -4142, ...).
    pub pattern: i32,
    /// BGR color; absent when the pattern is none.
    pub color: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawBorder {
    /// Host edge index ([`EDGE_LEFT`] .. [`EDGE_RIGHT`]).
    pub edge: i32,
    /// Host line style code (xlContinuous = 1, xlLineStyleNone = -4142, ...).
    pub line_style: i32,
    /// BGR color; absent when the line style is none.
    pub color: Option<i64>,
}

/// A data validation rule in raw host codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawValidation {
    /// Host validation type code (xlValidateWholeNumber = 1 ..
    /// xlValidateCustom = 7).
    pub kind: i32,
    /// Host operator code (xlBetween = 1 .. xlLessEqual = 8).
    pub operator: i32,
    /// First formula; for list validations, the comma-joined entries.
    pub formula1: String,
    /// Second formula, empty when the operator takes one value.
    pub formula2: String,
    pub show_input: bool,
    pub input_title: String,
    pub input_message: String,
    pub show_error: bool,
    pub error_title: String,
    pub error_message: String,
}

/// A conditional formatting rule in raw host codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RawConditionalFormat {
    /// Compare each cell's value against one or two thresholds.
    CellValue {
        /// Host comparison operator (xlBetween = 1 .. xlLessEqual = 8).
        operator: i32,
        value1: String,
        value2: Option<String>,
        format: Option<RawFormat>,
    },
    /// Format cells where a formula evaluates true.
    Expression {
        formula: String,
        format: Option<RawFormat>,
    },
    /// A two- or three-anchor color scale.
    ColorScale { anchors: Vec<RawScaleAnchor> },
    /// A data bar; the host picks the span from its defaults.
    DataBar { color: Option<i64> },
}

/// Formatting applied by a matching conditional rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawFormat {
    pub bold: bool,
    pub italic: bool,
    /// BGR font color.
    pub font_color: Option<i64>,
    pub font_size: Option<f64>,
    /// BGR interior color.
    pub fill_color: Option<i64>,
}

/// One color-scale anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScaleAnchor {
    /// Host anchor type (xlConditionValueNumber = 0 ..
    /// xlConditionValueHighestValue = 5).
    pub kind: i32,
    /// Threshold value or formula; absent for min/max anchors.
    pub value: Option<String>,
    /// BGR color for this anchor.
    pub color: i64,
}

/// A response sent from the WINE bridge back to the Linux client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// The request ID this response corresponds to.
    pub id: u64,
    /// The result of the command.
    #[serde(flatten)]
    pub result: ResponseResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ResponseResult {
    #[serde(rename = "ok")]
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    #[serde(rename = "error")]
    Error { message: String },
}

/// Data returned in successful responses. Every variant wraps a uniquely
/// named field so the untagged representation stays unambiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// Handle to an attached workbook.
    WorkbookHandle { workbook: u64 },
    /// The host's open-workbook list.
    Workbooks { workbooks: Vec<WorkbookInfo> },
    /// Sheet names in workbook order.
    Names { names: Vec<String> },
    /// A cell's displayed text.
    Text { text: String },
    /// A formula string.
    Formula { formula: String },
    /// An A1-style range address.
    Range { range: String },
    /// Tables on a sheet.
    Tables { tables: Vec<TableInfo> },
    /// Pivot tables on a sheet.
    Pivots { pivots: Vec<TableInfo> },
    /// A base64-encoded image.
    Image { image: String },
    /// A cell's raw style codes.
    Style { style: RawCellStyle },
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::String(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::String(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "<empty>"),
            Scalar::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::String(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_shape() {
        let req = Request {
            id: 3,
            command: Command::GetCellText {
                workbook: 1,
                sheet: "Sheet1".to_string(),
                cell: "B2".to_string(),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"id":3,"cmd":"GetCellText","params":{"workbook":1,"sheet":"Sheet1","cell":"B2"}}"#
        );

        let back: Request = serde_json::from_str(&json).unwrap();
        assert!(matches!(back.command, Command::GetCellText { .. }));
    }

    #[test]
    fn test_scalar_is_untagged() {
        let req = Request {
            id: 1,
            command: Command::SetCellValue {
                workbook: 1,
                sheet: "Sheet1".to_string(),
                cell: "A1".to_string(),
                value: Scalar::Number(42.0),
            },
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""value":42.0"#) || json.contains(r#""value":42"#));

        let text: Scalar = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(text.as_str(), Some("hello"));
        let boolean: Scalar = serde_json::from_str("true").unwrap();
        assert_eq!(boolean.as_bool(), Some(true));
        let null: Scalar = serde_json::from_str("null").unwrap();
        assert!(null.is_null());
    }

    #[test]
    fn test_response_status_tag() {
        let ok = Response {
            id: 7,
            result: ResponseResult::Ok {
                data: Some(ResponseData::Formula {
                    formula: "=SUM(A1:A3)".to_string(),
                }),
            },
        };
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"status":"ok","data":{"formula":"=SUM(A1:A3)"}}"#
        );

        let err: Response =
            serde_json::from_str(r#"{"id":8,"status":"error","message":"no such sheet"}"#).unwrap();
        match err.result {
            ResponseResult::Error { message } => assert_eq!(message, "no such sheet"),
            other => panic!("expected error result, got {other:?}"),
        }
    }

    #[test]
    fn test_ok_without_data_omits_field() {
        let ok = Response {
            id: 2,
            result: ResponseResult::Ok { data: None },
        };
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"id":2,"status":"ok"}"#);
    }

    #[test]
    fn test_response_data_variants_stay_distinct() {
        let style: ResponseData = serde_json::from_str(
            r#"{"style":{"font":{"size":11.0,"bold":true,"italic":false,"color":255},"interior":null,"borders":[]}}"#,
        )
        .unwrap();
        match style {
            ResponseData::Style { style } => {
                let font = style.font.unwrap();
                assert!(font.bold);
                assert_eq!(font.color, 255);
            }
            other => panic!("expected style data, got {other:?}"),
        }

        let names: ResponseData = serde_json::from_str(r#"{"names":["Sheet1","Data"]}"#).unwrap();
        match names {
            ResponseData::Names { names } => assert_eq!(names.len(), 2),
            other => panic!("expected names data, got {other:?}"),
        }
    }

    #[test]
    fn test_conditional_format_kind_tag() {
        let rule = RawConditionalFormat::CellValue {
            operator: 5,
            value1: "10".to_string(),
            value2: None,
            format: Some(RawFormat {
                bold: true,
                ..RawFormat::default()
            }),
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.starts_with(r#"{"kind":"cellValue""#));

        let scale: RawConditionalFormat = serde_json::from_str(
            r#"{"kind":"colorScale","anchors":[{"kind":4,"value":null,"color":255},{"kind":5,"value":null,"color":65280}]}"#,
        )
        .unwrap();
        match scale {
            RawConditionalFormat::ColorScale { anchors } => assert_eq!(anchors.len(), 2),
            other => panic!("expected color scale, got {other:?}"),
        }
    }
}
