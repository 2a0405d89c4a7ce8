//! Semantic cell style model
//!
//! Backend-independent description of a cell's visual formatting. Colors are
//! always uppercase `#RRGGBB` strings here; each backend stores colors in its
//! own native encoding and converts on every crossing.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Complete semantic style for one cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CellStyle {
    /// Border edges present on the cell
    pub borders: Vec<BorderEdge>,
    /// Font settings, if any differ from the sheet default
    pub font: Option<FontStyle>,
    /// Fill settings, if the cell has a visible fill
    pub fill: Option<FillStyle>,
    /// Custom number format code
    pub number_format: Option<String>,
    /// Decimal places implied by the number format
    pub decimal_places: Option<u32>,
}

impl CellStyle {
    /// True if no field is populated
    pub fn is_plain(&self) -> bool {
        self.borders.is_empty()
            && self.font.is_none()
            && self.fill.is_none()
            && self.number_format.is_none()
            && self.decimal_places.is_none()
    }
}

/// Which side of the cell a border edge sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl BorderSide {
    /// Semantic name used across backend boundaries
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderSide::Left => "left",
            BorderSide::Right => "right",
            BorderSide::Top => "top",
            BorderSide::Bottom => "bottom",
        }
    }
}

impl fmt::Display for BorderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorderSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(BorderSide::Left),
            "right" => Ok(BorderSide::Right),
            "top" => Ok(BorderSide::Top),
            "bottom" => Ok(BorderSide::Bottom),
            _ => Err(Error::invalid(format!("border side: {s}"))),
        }
    }
}

/// One border edge: side, line kind, and color
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    pub side: BorderSide,
    pub line: BorderLine,
    /// `#RRGGBB`, if the edge has an explicit color
    pub color: Option<String>,
}

impl BorderEdge {
    pub fn new(side: BorderSide, line: BorderLine) -> Self {
        Self {
            side,
            line,
            color: None,
        }
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Border line kinds in the semantic model
///
/// This is the subset both backends can express; each backend's native code
/// space is larger and collapses onto these values on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLine {
    None,
    #[default]
    Continuous,
    Dash,
    Dot,
    Double,
    DashDot,
    DashDotDot,
    SlantDashDot,
    MediumDashDot,
    MediumDashDotDot,
}

impl BorderLine {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderLine::None => "none",
            BorderLine::Continuous => "continuous",
            BorderLine::Dash => "dash",
            BorderLine::Dot => "dot",
            BorderLine::Double => "double",
            BorderLine::DashDot => "dashDot",
            BorderLine::DashDotDot => "dashDotDot",
            BorderLine::SlantDashDot => "slantDashDot",
            BorderLine::MediumDashDot => "mediumDashDot",
            BorderLine::MediumDashDotDot => "mediumDashDotDot",
        }
    }
}

impl fmt::Display for BorderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BorderLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(BorderLine::None),
            "continuous" => Ok(BorderLine::Continuous),
            "dash" => Ok(BorderLine::Dash),
            "dot" => Ok(BorderLine::Dot),
            "double" => Ok(BorderLine::Double),
            "dashDot" => Ok(BorderLine::DashDot),
            "dashDotDot" => Ok(BorderLine::DashDotDot),
            "slantDashDot" => Ok(BorderLine::SlantDashDot),
            "mediumDashDot" => Ok(BorderLine::MediumDashDot),
            "mediumDashDotDot" => Ok(BorderLine::MediumDashDotDot),
            _ => Err(Error::invalid(format!("border line: {s}"))),
        }
    }
}

/// Font settings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FontStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strike: bool,
    /// Size in points
    pub size: Option<f64>,
    /// `#RRGGBB`
    pub color: Option<String>,
    pub vertical_align: FontVerticalAlign,
}

impl FontStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_color<S: Into<String>>(mut self, color: S) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_underline(mut self, underline: Underline) -> Self {
        self.underline = underline;
        self
    }

    pub fn with_strike(mut self, strike: bool) -> Self {
        self.strike = strike;
        self
    }

    /// True if no field differs from the default
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

// Manual Hash because of the f64 size; sizes are never NaN so bit equality
// is the right notion here.
impl std::hash::Hash for FontStyle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bold.hash(state);
        self.italic.hash(state);
        self.underline.hash(state);
        self.strike.hash(state);
        self.size.map(f64::to_bits).hash(state);
        self.color.hash(state);
        self.vertical_align.hash(state);
    }
}

impl Eq for FontStyle {}

/// Underline style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
}

impl Underline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Underline::None => "none",
            Underline::Single => "single",
            Underline::Double => "double",
        }
    }
}

impl FromStr for Underline {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "" => Ok(Underline::None),
            "single" => Ok(Underline::Single),
            "double" => Ok(Underline::Double),
            _ => Err(Error::invalid(format!("underline: {s}"))),
        }
    }
}

/// Superscript/subscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontVerticalAlign {
    #[default]
    Baseline,
    Superscript,
    Subscript,
}

impl FontVerticalAlign {
    pub fn as_str(&self) -> &'static str {
        match self {
            FontVerticalAlign::Baseline => "baseline",
            FontVerticalAlign::Superscript => "superscript",
            FontVerticalAlign::Subscript => "subscript",
        }
    }
}

impl FromStr for FontVerticalAlign {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "baseline" | "" => Ok(FontVerticalAlign::Baseline),
            "superscript" => Ok(FontVerticalAlign::Superscript),
            "subscript" => Ok(FontVerticalAlign::Subscript),
            _ => Err(Error::invalid(format!("vertical align: {s}"))),
        }
    }
}

/// Fill settings
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FillStyle {
    pub kind: FillKind,
    pub pattern: FillPattern,
    /// Fill colors (`#RRGGBB`); patterns use one, gradients two
    pub colors: Vec<String>,
    pub shading: FillShading,
}

impl FillStyle {
    /// Solid fill of a single color
    pub fn solid<S: Into<String>>(color: S) -> Self {
        Self {
            kind: FillKind::Pattern,
            pattern: FillPattern::Solid,
            colors: vec![color.into()],
            shading: FillShading::default(),
        }
    }

    /// Pattern fill
    pub fn pattern<S: Into<String>>(pattern: FillPattern, color: S) -> Self {
        Self {
            kind: FillKind::Pattern,
            pattern,
            colors: vec![color.into()],
            shading: FillShading::default(),
        }
    }

    /// Two-color gradient fill
    pub fn gradient<S: Into<String>>(shading: FillShading, colors: Vec<S>) -> Self {
        Self {
            kind: FillKind::Gradient,
            pattern: FillPattern::None,
            colors: colors.into_iter().map(Into::into).collect(),
            shading,
        }
    }
}

/// Fill family: pattern (including solid) or gradient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillKind {
    #[default]
    Pattern,
    Gradient,
}

impl FillKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillKind::Pattern => "pattern",
            FillKind::Gradient => "gradient",
        }
    }
}

/// Pattern fill kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillPattern {
    #[default]
    None,
    Solid,
    MediumGray,
    DarkGray,
    LightGray,
    DarkHorizontal,
    DarkVertical,
    DarkDown,
    DarkUp,
    DarkGrid,
    DarkTrellis,
    LightHorizontal,
    LightVertical,
    LightDown,
    LightUp,
    LightGrid,
    LightTrellis,
    Gray125,
    Gray0625,
}

impl FillPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillPattern::None => "none",
            FillPattern::Solid => "solid",
            FillPattern::MediumGray => "mediumGray",
            FillPattern::DarkGray => "darkGray",
            FillPattern::LightGray => "lightGray",
            FillPattern::DarkHorizontal => "darkHorizontal",
            FillPattern::DarkVertical => "darkVertical",
            FillPattern::DarkDown => "darkDown",
            FillPattern::DarkUp => "darkUp",
            FillPattern::DarkGrid => "darkGrid",
            FillPattern::DarkTrellis => "darkTrellis",
            FillPattern::LightHorizontal => "lightHorizontal",
            FillPattern::LightVertical => "lightVertical",
            FillPattern::LightDown => "lightDown",
            FillPattern::LightUp => "lightUp",
            FillPattern::LightGrid => "lightGrid",
            FillPattern::LightTrellis => "lightTrellis",
            FillPattern::Gray125 => "gray125",
            FillPattern::Gray0625 => "gray0625",
        }
    }
}

impl fmt::Display for FillPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(FillPattern::None),
            "solid" => Ok(FillPattern::Solid),
            "mediumGray" => Ok(FillPattern::MediumGray),
            "darkGray" => Ok(FillPattern::DarkGray),
            "lightGray" => Ok(FillPattern::LightGray),
            "darkHorizontal" => Ok(FillPattern::DarkHorizontal),
            "darkVertical" => Ok(FillPattern::DarkVertical),
            "darkDown" => Ok(FillPattern::DarkDown),
            "darkUp" => Ok(FillPattern::DarkUp),
            "darkGrid" => Ok(FillPattern::DarkGrid),
            "darkTrellis" => Ok(FillPattern::DarkTrellis),
            "lightHorizontal" => Ok(FillPattern::LightHorizontal),
            "lightVertical" => Ok(FillPattern::LightVertical),
            "lightDown" => Ok(FillPattern::LightDown),
            "lightUp" => Ok(FillPattern::LightUp),
            "lightGrid" => Ok(FillPattern::LightGrid),
            "lightTrellis" => Ok(FillPattern::LightTrellis),
            "gray125" => Ok(FillPattern::Gray125),
            "gray0625" => Ok(FillPattern::Gray0625),
            _ => Err(Error::invalid(format!("fill pattern: {s}"))),
        }
    }
}

/// Gradient fill direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillShading {
    #[default]
    Horizontal,
    Vertical,
    DiagonalDown,
    DiagonalUp,
    FromCenter,
    FromCorner,
}

impl FillShading {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillShading::Horizontal => "horizontal",
            FillShading::Vertical => "vertical",
            FillShading::DiagonalDown => "diagonalDown",
            FillShading::DiagonalUp => "diagonalUp",
            FillShading::FromCenter => "fromCenter",
            FillShading::FromCorner => "fromCorner",
        }
    }
}

impl FromStr for FillShading {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "horizontal" => Ok(FillShading::Horizontal),
            "vertical" => Ok(FillShading::Vertical),
            "diagonalDown" => Ok(FillShading::DiagonalDown),
            "diagonalUp" => Ok(FillShading::DiagonalUp),
            "fromCenter" => Ok(FillShading::FromCenter),
            "fromCorner" => Ok(FillShading::FromCorner),
            _ => Err(Error::invalid(format!("fill shading: {s}"))),
        }
    }
}

/// Normalize a color to the canonical uppercase `#RRGGBB` form.
///
/// Accepts `#rrggbb`, `RRGGBB`, and 8-digit ARGB (alpha stripped).
pub fn normalize_color(color: &str) -> Result<String> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    let hex = match hex.len() {
        6 => hex,
        8 => &hex[2..],
        _ => return Err(Error::invalid(format!("color: {color}"))),
    };
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::invalid(format!("color: {color}")));
    }
    Ok(format!("#{}", hex.to_ascii_uppercase()))
}

/// Split a `#RRGGBB` color into its components
pub fn color_components(color: &str) -> Result<(u8, u8, u8)> {
    let normalized = normalize_color(color)?;
    let hex = &normalized[1..];
    let r = u8::from_str_radix(&hex[0..2], 16).map_err(|e| Error::invalid(format!("color: {e}")))?;
    let g = u8::from_str_radix(&hex[2..4], 16).map_err(|e| Error::invalid(format!("color: {e}")))?;
    let b = u8::from_str_radix(&hex[4..6], 16).map_err(|e| Error::invalid(format!("color: {e}")))?;
    Ok((r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_border_line_names_roundtrip() {
        for line in [
            BorderLine::None,
            BorderLine::Continuous,
            BorderLine::Dash,
            BorderLine::Dot,
            BorderLine::Double,
            BorderLine::DashDot,
            BorderLine::DashDotDot,
            BorderLine::SlantDashDot,
            BorderLine::MediumDashDot,
            BorderLine::MediumDashDotDot,
        ] {
            assert_eq!(line.as_str().parse::<BorderLine>().unwrap(), line);
        }
        assert!("thick".parse::<BorderLine>().is_err());
    }

    #[test]
    fn test_fill_pattern_names_roundtrip() {
        for pattern in [
            FillPattern::None,
            FillPattern::Solid,
            FillPattern::MediumGray,
            FillPattern::Gray125,
            FillPattern::Gray0625,
            FillPattern::LightTrellis,
        ] {
            assert_eq!(pattern.as_str().parse::<FillPattern>().unwrap(), pattern);
        }
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("#ff8000").unwrap(), "#FF8000");
        assert_eq!(normalize_color("FF8000").unwrap(), "#FF8000");
        assert_eq!(normalize_color("FFFF8000").unwrap(), "#FF8000");
        assert!(normalize_color("#F80").is_err());
        assert!(normalize_color("#GGGGGG").is_err());
    }

    #[test]
    fn test_color_components() {
        assert_eq!(color_components("#FF8001").unwrap(), (0xFF, 0x80, 0x01));
        assert_eq!(color_components("#000000").unwrap(), (0, 0, 0));
    }

    #[test]
    fn test_cell_style_is_plain() {
        assert!(CellStyle::default().is_plain());

        let styled = CellStyle {
            font: Some(FontStyle::new().with_bold(true)),
            ..Default::default()
        };
        assert!(!styled.is_plain());
    }
}
