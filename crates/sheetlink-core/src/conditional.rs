//! Conditional formatting rules

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::style::CellStyle;

/// A conditional formatting rule applied to a range
#[derive(Debug, Clone, PartialEq)]
pub struct CfRule {
    pub kind: CfRuleKind,
    /// Style applied when the rule matches (comparison kinds only; scale,
    /// bar, and icon rules carry their presentation inside the kind)
    pub format: Option<CellStyle>,
}

impl CfRule {
    pub fn new(kind: CfRuleKind) -> Self {
        Self { kind, format: None }
    }

    pub fn with_format(mut self, format: CellStyle) -> Self {
        self.format = Some(format);
        self
    }
}

/// Conditional formatting rule kinds
#[derive(Debug, Clone, PartialEq)]
pub enum CfRuleKind {
    /// Compare each cell's value against one or two bounds
    CellValue {
        operator: CfOperator,
        value1: String,
        value2: Option<String>,
    },
    /// A boolean formula evaluated per cell
    Expression { formula: String },
    /// Two- or three-point color scale
    ColorScale {
        min: CfAnchor,
        mid: Option<CfAnchor>,
        max: CfAnchor,
    },
    /// In-cell data bar
    DataBar {
        min: CfAnchor,
        max: CfAnchor,
        /// Bar color, `#RRGGBB`
        color: String,
    },
    /// Icon set keyed by a host style name (e.g. `3Arrows`)
    IconSet { style: String, reverse: bool },
}

impl CfRuleKind {
    /// Semantic kind name used across backend boundaries
    pub fn as_str(&self) -> &'static str {
        match self {
            CfRuleKind::CellValue { .. } => "cellValue",
            CfRuleKind::Expression { .. } => "expression",
            CfRuleKind::ColorScale { .. } => "colorScale",
            CfRuleKind::DataBar { .. } => "dataBar",
            CfRuleKind::IconSet { .. } => "iconSet",
        }
    }
}

/// One anchor point of a color scale or data bar
#[derive(Debug, Clone, PartialEq)]
pub struct CfAnchor {
    pub kind: CfAnchorKind,
    /// Threshold value; unused for Min/Max anchors
    pub value: Option<String>,
    /// Anchor color (`#RRGGBB`); data-bar anchors carry no color
    pub color: Option<String>,
}

impl CfAnchor {
    pub fn new(kind: CfAnchorKind) -> Self {
        Self {
            kind,
            value: None,
            color: None,
        }
    }

    pub fn with_value<S: Into<String>>(mut self, value: S) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// How a scale/bar anchor's threshold is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CfAnchorKind {
    #[default]
    Num,
    Percent,
    Percentile,
    Formula,
    Min,
    Max,
}

impl CfAnchorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfAnchorKind::Num => "num",
            CfAnchorKind::Percent => "percent",
            CfAnchorKind::Percentile => "percentile",
            CfAnchorKind::Formula => "formula",
            CfAnchorKind::Min => "min",
            CfAnchorKind::Max => "max",
        }
    }

    /// Parse a caller-supplied anchor kind, defaulting to Num (original
    /// behavior for unrecognized scale types).
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for CfAnchorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CfAnchorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "num" => Ok(CfAnchorKind::Num),
            "percent" => Ok(CfAnchorKind::Percent),
            "percentile" => Ok(CfAnchorKind::Percentile),
            "formula" => Ok(CfAnchorKind::Formula),
            "min" => Ok(CfAnchorKind::Min),
            "max" => Ok(CfAnchorKind::Max),
            _ => Err(Error::invalid(format!("anchor kind: {s}"))),
        }
    }
}

/// Comparison operators for cell-value rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CfOperator {
    Between,
    NotBetween,
    #[default]
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl CfOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            CfOperator::Between => "between",
            CfOperator::NotBetween => "notBetween",
            CfOperator::Equal => "equal",
            CfOperator::NotEqual => "notEqual",
            CfOperator::GreaterThan => "greaterThan",
            CfOperator::LessThan => "lessThan",
            CfOperator::GreaterThanOrEqual => "greaterThanOrEqual",
            CfOperator::LessThanOrEqual => "lessThanOrEqual",
        }
    }

    /// Parse a caller-supplied criteria name, defaulting to Equal (original
    /// behavior for unrecognized criteria).
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for CfOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CfOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "between" => Ok(CfOperator::Between),
            "notBetween" => Ok(CfOperator::NotBetween),
            "equal" => Ok(CfOperator::Equal),
            "notEqual" => Ok(CfOperator::NotEqual),
            "greaterThan" => Ok(CfOperator::GreaterThan),
            "lessThan" => Ok(CfOperator::LessThan),
            "greaterThanOrEqual" => Ok(CfOperator::GreaterThanOrEqual),
            "lessThanOrEqual" => Ok(CfOperator::LessThanOrEqual),
            _ => Err(Error::invalid(format!("cf operator: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FontStyle;

    #[test]
    fn test_cell_value_rule() {
        let rule = CfRule::new(CfRuleKind::CellValue {
            operator: CfOperator::GreaterThan,
            value1: "100".into(),
            value2: None,
        })
        .with_format(CellStyle {
            font: Some(FontStyle::new().with_bold(true).with_color("#FF0000")),
            ..Default::default()
        });
        assert_eq!(rule.kind.as_str(), "cellValue");
        assert!(rule.format.is_some());
    }

    #[test]
    fn test_color_scale_anchors() {
        let min = CfAnchor::new(CfAnchorKind::Min).with_color("#FFFFFF");
        let max = CfAnchor::new(CfAnchorKind::Percentile)
            .with_value("90")
            .with_color("#00B050");
        let rule = CfRule::new(CfRuleKind::ColorScale {
            min,
            mid: None,
            max,
        });
        assert_eq!(rule.kind.as_str(), "colorScale");
    }

    #[test]
    fn test_operator_default_is_equal() {
        assert_eq!(CfOperator::parse_or_default("nonsense"), CfOperator::Equal);
        assert_eq!(
            CfOperator::parse_or_default("lessThanOrEqual"),
            CfOperator::LessThanOrEqual
        );
    }
}
