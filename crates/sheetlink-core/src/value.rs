//! Cell value types

use std::fmt;

/// Represents the value stored in a cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    /// Empty cell (no value)
    #[default]
    Empty,

    /// Boolean value (TRUE/FALSE)
    Boolean(bool),

    /// Numeric value (all numbers stored as f64)
    Number(f64),

    /// String value
    Text(String),

    /// Error value (#VALUE!, #REF!, etc.)
    Error(String),

    /// Formula with its last calculated result, if the container carried one
    Formula {
        /// Formula text without the leading `=`
        text: String,
        /// Cached calculated value
        cached: Option<Box<CellValue>>,
    },
}

impl CellValue {
    /// Create a string value
    pub fn text<S: Into<String>>(s: S) -> Self {
        CellValue::Text(s.into())
    }

    /// Create a formula value, stripping any leading `=`
    pub fn formula<S: Into<String>>(text: S) -> Self {
        let text = text.into();
        let text = text.strip_prefix('=').map(str::to_string).unwrap_or(text);
        CellValue::Formula { text, cached: None }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Check if the cell contains a formula
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula { .. })
    }

    /// Get the formula text (without `=`) if this is a formula cell
    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// The text a spreadsheet would display for this value.
    ///
    /// Formula cells render their cached result when one is present and an
    /// empty string otherwise; whole numbers drop the fractional point.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Error(e) => e.clone(),
            CellValue::Formula { cached, .. } => {
                cached.as_ref().map(|v| v.display_text()).unwrap_or_default()
            }
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_text())
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text() {
        assert_eq!(CellValue::Empty.display_text(), "");
        assert_eq!(CellValue::Boolean(true).display_text(), "TRUE");
        assert_eq!(CellValue::Boolean(false).display_text(), "FALSE");
        assert_eq!(CellValue::Number(42.0).display_text(), "42");
        assert_eq!(CellValue::Number(3.25).display_text(), "3.25");
        assert_eq!(CellValue::text("hello").display_text(), "hello");
        assert_eq!(CellValue::Error("#DIV/0!".into()).display_text(), "#DIV/0!");
    }

    #[test]
    fn test_formula_strips_equals() {
        let f = CellValue::formula("=SUM(A1:A3)");
        assert_eq!(f.formula_text(), Some("SUM(A1:A3)"));

        let f = CellValue::formula("B1*2");
        assert_eq!(f.formula_text(), Some("B1*2"));
    }

    #[test]
    fn test_formula_display_uses_cached() {
        let f = CellValue::Formula {
            text: "SUM(A1:A3)".into(),
            cached: Some(Box::new(CellValue::Number(6.0))),
        };
        assert_eq!(f.display_text(), "6");

        let f = CellValue::formula("SUM(A1:A3)");
        assert_eq!(f.display_text(), "");
    }
}
