//! Container-format code tables
//!
//! The container stores borders, fills and colors in its own string
//! vocabulary. These tables convert between that vocabulary and the semantic
//! model, collapsing container values the model does not distinguish. Unknown
//! inputs never fail: each decoder documents its fallback value. The live
//! backend keeps a separate table over its own integer codes with different
//! fallbacks.

use lazy_regex::regex_captures;
use sheetlink_core::{normalize_color, BorderLine, FillPattern, FillShading, Result};

/// Decode a container border style name.
///
/// Weight-only variants (`thin`, `medium`, `thick`, `hair`, `mediumDashed`)
/// collapse to `Continuous`; unknown names also decode to `Continuous`.
pub fn decode_border_line(name: &str) -> BorderLine {
    match name {
        "none" => BorderLine::None,
        "thin" | "medium" | "thick" | "hair" | "mediumDashed" => BorderLine::Continuous,
        "dashed" => BorderLine::Dash,
        "dotted" => BorderLine::Dot,
        "double" => BorderLine::Double,
        "dashDot" => BorderLine::DashDot,
        "dashDotDot" => BorderLine::DashDotDot,
        "slantDashDot" => BorderLine::SlantDashDot,
        "mediumDashDot" => BorderLine::MediumDashDot,
        "mediumDashDotDot" => BorderLine::MediumDashDotDot,
        _ => BorderLine::Continuous,
    }
}

/// Encode a semantic border line as a container style name.
///
/// `None` yields no name: an absent edge is simply not written.
pub fn encode_border_line(line: BorderLine) -> Option<&'static str> {
    match line {
        BorderLine::None => None,
        BorderLine::Continuous => Some("thin"),
        BorderLine::Dash => Some("dashed"),
        BorderLine::Dot => Some("dotted"),
        BorderLine::Double => Some("double"),
        BorderLine::DashDot => Some("dashDot"),
        BorderLine::DashDotDot => Some("dashDotDot"),
        BorderLine::SlantDashDot => Some("slantDashDot"),
        BorderLine::MediumDashDot => Some("mediumDashDot"),
        BorderLine::MediumDashDotDot => Some("mediumDashDotDot"),
    }
}

/// Decode a container pattern type name; unknown names decode to `None`.
pub fn decode_fill_pattern(name: &str) -> FillPattern {
    name.parse().unwrap_or(FillPattern::None)
}

/// Encode a semantic fill pattern as a container pattern type name.
///
/// The container's pattern vocabulary and the semantic one coincide.
pub fn encode_fill_pattern(pattern: FillPattern) -> &'static str {
    pattern.as_str()
}

/// Geometry a gradient fill is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradientGeometry {
    /// Linear gradient at the given angle in degrees
    Linear { degree: u32 },
    /// Path gradient; `center` selects the from-center variant
    Path { center: bool },
}

/// Encode a semantic shading as container gradient geometry
pub fn encode_gradient(shading: FillShading) -> GradientGeometry {
    match shading {
        FillShading::Horizontal => GradientGeometry::Linear { degree: 90 },
        FillShading::Vertical => GradientGeometry::Linear { degree: 0 },
        FillShading::DiagonalDown => GradientGeometry::Linear { degree: 45 },
        FillShading::DiagonalUp => GradientGeometry::Linear { degree: 135 },
        FillShading::FromCenter => GradientGeometry::Path { center: true },
        FillShading::FromCorner => GradientGeometry::Path { center: false },
    }
}

/// Decode a linear gradient angle; unknown angles decode to `Horizontal`.
pub fn decode_gradient_degree(degree: u32) -> FillShading {
    match degree {
        90 => FillShading::Horizontal,
        0 => FillShading::Vertical,
        45 => FillShading::DiagonalDown,
        135 => FillShading::DiagonalUp,
        _ => FillShading::Horizontal,
    }
}

/// Decode a path gradient by its left inset: centered paths start at 0.5.
pub fn decode_gradient_path(left: f64) -> FillShading {
    if (left - 0.5).abs() < f64::EPSILON {
        FillShading::FromCenter
    } else {
        FillShading::FromCorner
    }
}

/// Decode a container ARGB color (`FFRRGGBB`) to `#RRGGBB`, uppercased.
/// Malformed values decode to `None` rather than failing the whole read.
pub fn decode_argb(value: &str) -> Option<String> {
    normalize_color(value).ok()
}

/// Encode a `#RRGGBB` color as container ARGB with an opaque alpha
pub fn encode_argb(color: &str) -> Result<String> {
    let normalized = normalize_color(color)?;
    Ok(format!("FF{}", &normalized[1..]))
}

/// Decimal places implied by a number format code: the run of zeros after
/// the decimal point in its first section (`0.00` has two).
pub fn decimal_places(format: &str) -> Option<u32> {
    let (_, zeros) = regex_captures!(r"\.(0+)", format)?;
    Some(zeros.len() as u32)
}

/// Format code for a builtin number format id.
///
/// Ids 0 (General) and the reserved gaps return `None`; a style referencing
/// them reads back with no explicit format.
pub fn builtin_number_format(id: u32) -> Option<&'static str> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_border_decode_collapses_weights() {
        assert_eq!(decode_border_line("thin"), BorderLine::Continuous);
        assert_eq!(decode_border_line("medium"), BorderLine::Continuous);
        assert_eq!(decode_border_line("thick"), BorderLine::Continuous);
        assert_eq!(decode_border_line("hair"), BorderLine::Continuous);
        assert_eq!(decode_border_line("mediumDashed"), BorderLine::Continuous);
        assert_eq!(decode_border_line("dashed"), BorderLine::Dash);
        assert_eq!(decode_border_line("none"), BorderLine::None);
    }

    #[test]
    fn test_border_unknown_decodes_to_continuous() {
        assert_eq!(decode_border_line("wavy"), BorderLine::Continuous);
        assert_eq!(decode_border_line(""), BorderLine::Continuous);
    }

    #[test]
    fn test_builtin_number_formats() {
        assert_eq!(builtin_number_format(2), Some("0.00"));
        assert_eq!(builtin_number_format(10), Some("0.00%"));
        assert_eq!(builtin_number_format(49), Some("@"));
        assert_eq!(builtin_number_format(0), None);
        assert_eq!(builtin_number_format(163), None);
        assert_eq!(
            builtin_number_format(2).and_then(decimal_places),
            Some(2)
        );
    }

    #[test]
    fn test_border_encode_decode_is_identity() {
        for line in [
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
            let name = encode_border_line(line).unwrap();
            assert_eq!(decode_border_line(name), line, "line {line:?} via {name}");
        }
        assert_eq!(encode_border_line(BorderLine::None), None);
    }

    #[test]
    fn test_pattern_encode_decode_is_identity() {
        for pattern in [
            FillPattern::None,
            FillPattern::Solid,
            FillPattern::MediumGray,
            FillPattern::DarkGray,
            FillPattern::LightGray,
            FillPattern::DarkHorizontal,
            FillPattern::DarkVertical,
            FillPattern::DarkDown,
            FillPattern::DarkUp,
            FillPattern::DarkGrid,
            FillPattern::DarkTrellis,
            FillPattern::LightHorizontal,
            FillPattern::LightVertical,
            FillPattern::LightDown,
            FillPattern::LightUp,
            FillPattern::LightGrid,
            FillPattern::LightTrellis,
            FillPattern::Gray125,
            FillPattern::Gray0625,
        ] {
            assert_eq!(decode_fill_pattern(encode_fill_pattern(pattern)), pattern);
        }
        assert_eq!(decode_fill_pattern("speckled"), FillPattern::None);
    }

    #[test]
    fn test_gradient_encode_decode_is_identity() {
        for shading in [
            FillShading::Horizontal,
            FillShading::Vertical,
            FillShading::DiagonalDown,
            FillShading::DiagonalUp,
            FillShading::FromCenter,
            FillShading::FromCorner,
        ] {
            let decoded = match encode_gradient(shading) {
                GradientGeometry::Linear { degree } => decode_gradient_degree(degree),
                GradientGeometry::Path { center } => {
                    decode_gradient_path(if center { 0.5 } else { 0.0 })
                }
            };
            assert_eq!(decoded, shading);
        }
        assert_eq!(decode_gradient_degree(33), FillShading::Horizontal);
    }

    #[test]
    fn test_argb_conversion() {
        assert_eq!(decode_argb("FF00A0FF"), Some("#00A0FF".to_string()));
        assert_eq!(decode_argb("ff8000ff"), Some("#8000FF".to_string()));
        assert_eq!(decode_argb("zzz"), None);
        assert_eq!(encode_argb("#00A0FF").unwrap(), "FF00A0FF");
        assert_eq!(encode_argb("00a0ff").unwrap(), "FF00A0FF");
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places("0.00"), Some(2));
        assert_eq!(decimal_places("#,##0.0"), Some(1));
        assert_eq!(decimal_places("0.0000%"), Some(4));
        assert_eq!(decimal_places("0"), None);
        assert_eq!(decimal_places("General"), None);
    }
}
