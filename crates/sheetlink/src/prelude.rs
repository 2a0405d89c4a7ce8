//! Prelude module - common imports for sheetlink users
//!
//! ```rust
//! use sheetlink::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellRange,
    CellValue,
    // Style types
    CellStyle,
    BorderEdge,
    BorderLine,
    BorderSide,
    FillPattern,
    FillStyle,
    FontStyle,
    // Validation and conditional formatting
    CfAnchor,
    CfAnchorKind,
    CfOperator,
    CfRule,
    CfRuleKind,
    DataValidationRule,
    ValidationKind,
    ValidationOperator,
    // Error types
    Error,
    Result,
    // Selector types
    BackendPreference,
    OpenOptions,
    Session,
    // The contract
    PagingStrategy,
    PivotTable,
    Table,
    Workbook,
    Worksheet,
};
