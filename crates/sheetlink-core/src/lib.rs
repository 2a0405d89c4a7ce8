//! # sheetlink-core
//!
//! Semantic model and capability contract for the sheetlink spreadsheet
//! bridge.
//!
//! This crate defines everything backends share:
//! - [`CellValue`], [`CellAddress`], [`CellRange`] - cell contents and A1 addressing
//! - [`CellStyle`], [`FontStyle`], [`FillStyle`], [`BorderEdge`] - semantic formatting
//! - [`DataValidationRule`] and [`CfRule`] - validation and conditional formatting
//! - [`Workbook`] / [`Worksheet`] - the contract every backend implements
//! - [`UsedRange`] - monotonic dimension tracking for backends that keep their own
//! - [`Error`] - the error taxonomy surfaced to callers
//!
//! Backend-native representations (integer codes, container XML) never appear
//! here; each backend converts at its own boundary.
//!
//! ## Example
//!
//! ```rust
//! use sheetlink_core::{CellAddress, CellRange, CellValue};
//!
//! let addr = CellAddress::parse("$B$2").unwrap();
//! assert_eq!(addr.to_a1(), "B2");
//!
//! let range = CellRange::parse("A1:C10").unwrap();
//! assert!(range.contains(addr));
//!
//! let value = CellValue::from(42.0);
//! assert_eq!(value.display_text(), "42");
//! ```

pub mod cell;
pub mod conditional;
pub mod contract;
pub mod error;
pub mod paging;
pub mod style;
pub mod used_range;
pub mod validation;
pub mod value;

// Re-exports for convenience
pub use cell::{CellAddress, CellRange, MAX_COLS, MAX_ROWS};
pub use conditional::{CfAnchor, CfAnchorKind, CfOperator, CfRule, CfRuleKind};
pub use contract::{validate_sheet_name, PivotTable, Table, Workbook, Worksheet, MAX_SHEET_NAME_LEN};
pub use error::{Error, Result};
pub use paging::{FixedRowPages, PagingStrategy};
pub use used_range::UsedRange;
pub use validation::{DataValidationRule, ValidationKind, ValidationOperator};
pub use value::CellValue;

// Re-export all style types for convenience
pub use style::{
    color_components, normalize_color, BorderEdge, BorderLine, BorderSide, CellStyle, FillKind,
    FillPattern, FillShading, FillStyle, FontStyle, FontVerticalAlign, Underline,
};
