//! Conversions between semantic style/rule types and the host's raw
//! integer codes.
//!
//! The bridge is a thin dispatcher: it puts and gets whatever integers it
//! is handed. This module owns the host constant tables, so everything the
//! wire carries is encoded here on the way out and decoded here on the way
//! back. Unknown host codes decode to this backend's documented defaults
//! (`BorderLine::None`, `FillPattern::None`); the file backend documents
//! different defaults for its own tables.

use sheetlink_core::{
    color_components, BorderEdge, BorderLine, BorderSide, CellStyle, CfAnchor, CfAnchorKind,
    CfOperator, CfRule, CfRuleKind, DataValidationRule, FillPattern, FillStyle, FontStyle, Result,
    ValidationKind, ValidationOperator,
};
use sheetlink_protocol::{
    RawCellStyle, RawConditionalFormat, RawFormat, RawScaleAnchor, RawValidation, EDGE_BOTTOM,
    EDGE_LEFT, EDGE_RIGHT, EDGE_TOP,
};

use crate::backend::BACKEND_NAME;

/// Encode a `#RRGGBB` color as the host's BGR-ordered integer
/// (`r + g*256 + b*65536`, the value `Application.RGB` produces).
pub fn encode_color(color: &str) -> Result<i64> {
    let (r, g, b) = color_components(color)?;
    Ok(r as i64 + (g as i64) * 256 + (b as i64) * 65536)
}

/// Decode a host BGR color integer to `#RRGGBB`.
pub fn decode_color(code: i64) -> String {
    let code = code as u32;
    let r = code & 0xFF;
    let g = (code >> 8) & 0xFF;
    let b = (code >> 16) & 0xFF;
    format!("#{r:02X}{g:02X}{b:02X}")
}

/// Decode a host border line style constant. Unknown codes decode to
/// `None` (no visible line), matching the host's own fallback.
pub fn decode_border_line(code: i32) -> BorderLine {
    match code {
        1 => BorderLine::Continuous,       // xlContinuous
        -4115 => BorderLine::Dash,         // xlDash
        -4118 => BorderLine::Dot,          // xlDot
        -4119 => BorderLine::Double,       // xlDouble
        4 => BorderLine::DashDot,          // xlDashDot
        5 => BorderLine::DashDotDot,       // xlDashDotDot
        13 => BorderLine::SlantDashDot,    // xlSlantDashDot
        _ => BorderLine::None,             // xlLineStyleNone and anything else
    }
}

/// Encode a border line style as a host constant. The medium-weight dash
/// variants have no host line style of their own; they collapse to their
/// plain-weight codes.
pub fn encode_border_line(line: BorderLine) -> i32 {
    match line {
        BorderLine::None => -4142,
        BorderLine::Continuous => 1,
        BorderLine::Dash => -4115,
        BorderLine::Dot => -4118,
        BorderLine::Double => -4119,
        BorderLine::DashDot | BorderLine::MediumDashDot => 4,
        BorderLine::DashDotDot | BorderLine::MediumDashDotDot => 5,
        BorderLine::SlantDashDot => 13,
    }
}

/// Decode a host interior pattern constant. Several patterns have two host
/// codes; unknown codes decode to `None`.
pub fn decode_fill_pattern(code: i32) -> FillPattern {
    match code {
        1 => FillPattern::Solid,
        -4125 => FillPattern::DarkGray,   // xlPatternGray75
        -4124 => FillPattern::MediumGray, // xlPatternGray50
        -4126 => FillPattern::LightGray,  // xlPatternGray25
        -4121 => FillPattern::Gray125,    // xlPatternGray16
        -4127 => FillPattern::Gray0625,   // xlPatternGray8
        9 | 5 => FillPattern::LightHorizontal,
        12 | 6 => FillPattern::LightVertical,
        10 | 7 => FillPattern::LightDown,
        11 | 8 => FillPattern::LightUp,
        16 | 15 => FillPattern::LightGrid,
        17 | 18 => FillPattern::LightTrellis,
        13 | 2 => FillPattern::DarkHorizontal,
        3 => FillPattern::DarkVertical,
        4 => FillPattern::DarkDown,
        14 => FillPattern::DarkUp,
        -4162 => FillPattern::DarkGrid,
        -4166 => FillPattern::DarkTrellis,
        _ => FillPattern::None, // xlPatternNone and anything else
    }
}

/// Encode an interior pattern as its canonical host constant.
pub fn encode_fill_pattern(pattern: FillPattern) -> i32 {
    match pattern {
        FillPattern::None => -4142,
        FillPattern::Solid => 1,
        FillPattern::DarkGray => -4125,
        FillPattern::MediumGray => -4124,
        FillPattern::LightGray => -4126,
        FillPattern::Gray125 => -4121,
        FillPattern::Gray0625 => -4127,
        FillPattern::LightHorizontal => 9,
        FillPattern::LightVertical => 12,
        FillPattern::LightDown => 10,
        FillPattern::LightUp => 11,
        FillPattern::LightGrid => 16,
        FillPattern::LightTrellis => 17,
        FillPattern::DarkHorizontal => 13,
        FillPattern::DarkVertical => 3,
        FillPattern::DarkDown => 4,
        FillPattern::DarkUp => 14,
        FillPattern::DarkGrid => -4162,
        FillPattern::DarkTrellis => -4166,
    }
}

fn decode_edge(code: i32) -> Option<BorderSide> {
    match code {
        EDGE_LEFT => Some(BorderSide::Left),
        EDGE_TOP => Some(BorderSide::Top),
        EDGE_BOTTOM => Some(BorderSide::Bottom),
        EDGE_RIGHT => Some(BorderSide::Right),
        _ => None,
    }
}

fn validation_kind_code(kind: ValidationKind) -> i32 {
    match kind {
        ValidationKind::Whole => 1,      // xlValidateWholeNumber
        ValidationKind::Decimal => 2,    // xlValidateDecimal
        ValidationKind::List => 3,       // xlValidateList
        ValidationKind::Date => 4,       // xlValidateDate
        ValidationKind::Time => 5,       // xlValidateTime
        ValidationKind::TextLength => 6, // xlValidateTextLength
        ValidationKind::Custom => 7,     // xlValidateCustom
    }
}

fn validation_operator_code(operator: ValidationOperator) -> i32 {
    match operator {
        ValidationOperator::Between => 1,
        ValidationOperator::NotBetween => 2,
        ValidationOperator::Equal => 3,
        ValidationOperator::NotEqual => 4,
        ValidationOperator::GreaterThan => 5,
        ValidationOperator::LessThan => 6,
        ValidationOperator::GreaterThanOrEqual => 7,
        ValidationOperator::LessThanOrEqual => 8,
    }
}

fn cf_operator_code(operator: CfOperator) -> i32 {
    match operator {
        CfOperator::Between => 1,
        CfOperator::NotBetween => 2,
        CfOperator::Equal => 3,
        CfOperator::NotEqual => 4,
        CfOperator::GreaterThan => 5,
        CfOperator::LessThan => 6,
        CfOperator::GreaterThanOrEqual => 7,
        CfOperator::LessThanOrEqual => 8,
    }
}

fn anchor_kind_code(kind: CfAnchorKind) -> i32 {
    match kind {
        CfAnchorKind::Num => 0,        // xlConditionValueNumber
        CfAnchorKind::Percent => 1,    // xlConditionValuePercent
        CfAnchorKind::Percentile => 2, // xlConditionValuePercentile
        CfAnchorKind::Formula => 3,    // xlConditionValueFormula
        CfAnchorKind::Min => 4,        // xlConditionValueLowestValue
        CfAnchorKind::Max => 5,        // xlConditionValueHighestValue
    }
}

/// Encode a validation rule as raw host codes.
///
/// List rules send the comma-joined entries as formula1; custom rules
/// ignore the operator (the host fixes it at Between). Input and error
/// messages ride along only when their show flag is set and the title is
/// non-empty.
pub fn encode_validation(rule: &DataValidationRule) -> RawValidation {
    let operator = if rule.kind == ValidationKind::Custom {
        1
    } else {
        validation_operator_code(rule.operator)
    };

    let formula1 = if rule.kind == ValidationKind::List && !rule.dropdown.is_empty() {
        rule.dropdown.join(",")
    } else {
        rule.formula1.clone()
    };

    let (show_input, input_title, input_message) =
        if rule.show_input_message && !rule.input_title.is_empty() {
            (true, rule.input_title.clone(), rule.input_message.clone())
        } else {
            (false, String::new(), String::new())
        };
    let (show_error, error_title, error_message) =
        if rule.show_error_message && !rule.error_title.is_empty() {
            (true, rule.error_title.clone(), rule.error_message.clone())
        } else {
            (false, String::new(), String::new())
        };

    RawValidation {
        kind: validation_kind_code(rule.kind),
        operator,
        formula1,
        formula2: rule.formula2.clone(),
        show_input,
        input_title,
        input_message,
        show_error,
        error_title,
        error_message,
    }
}

/// Encode a conditional formatting rule as raw host codes.
///
/// Icon sets cannot be expressed through the automation interface this
/// backend drives, so they return the typed unsupported error.
pub fn encode_conditional(rule: &CfRule) -> Result<RawConditionalFormat> {
    let format = rule.format.as_ref().map(encode_format).transpose()?;

    match &rule.kind {
        CfRuleKind::CellValue {
            operator,
            value1,
            value2,
        } => Ok(RawConditionalFormat::CellValue {
            operator: cf_operator_code(*operator),
            value1: value1.clone(),
            value2: value2.clone(),
            format,
        }),
        CfRuleKind::Expression { formula } => Ok(RawConditionalFormat::Expression {
            formula: formula.clone(),
            format,
        }),
        CfRuleKind::ColorScale { min, mid, max } => {
            let mut anchors = Vec::with_capacity(3);
            anchors.push(encode_anchor(min)?);
            if let Some(mid) = mid {
                anchors.push(encode_anchor(mid)?);
            }
            anchors.push(encode_anchor(max)?);
            Ok(RawConditionalFormat::ColorScale { anchors })
        }
        CfRuleKind::DataBar { color, .. } => Ok(RawConditionalFormat::DataBar {
            color: Some(encode_color(color)?),
        }),
        CfRuleKind::IconSet { .. } => Err(sheetlink_core::Error::unsupported(
            BACKEND_NAME,
            "icon set conditional formatting",
        )),
    }
}

/// Encode the format half of a conditional rule: the subset of a cell
/// style the host condition object can carry (font bold/italic/color/size
/// and interior color).
fn encode_format(style: &CellStyle) -> Result<RawFormat> {
    let font = style.font.as_ref();
    let font_color = match font.and_then(|f| f.color.as_deref()) {
        Some(color) => Some(encode_color(color)?),
        None => None,
    };
    let fill_color = match style.fill.as_ref().and_then(|f| f.colors.first()) {
        Some(color) => Some(encode_color(color)?),
        None => None,
    };

    Ok(RawFormat {
        bold: font.is_some_and(|f| f.bold),
        italic: font.is_some_and(|f| f.italic),
        font_color,
        font_size: font.and_then(|f| f.size),
        fill_color,
    })
}

/// Anchors without a color encode as black, the host's parse fallback.
fn encode_anchor(anchor: &CfAnchor) -> Result<RawScaleAnchor> {
    let color = match anchor.color.as_deref() {
        Some(color) => encode_color(color)?,
        None => 0,
    };
    Ok(RawScaleAnchor {
        kind: anchor_kind_code(anchor.kind),
        value: anchor.value.clone(),
        color,
    })
}

/// Decode a raw style read into the semantic form.
///
/// The host always reports a concrete font (size, weight, color) even for
/// untouched cells, and that is surfaced as-is; only edges whose line
/// style is none and interiors whose pattern is none are dropped.
pub fn decode_cell_style(raw: &RawCellStyle) -> CellStyle {
    let mut style = CellStyle::default();

    for border in &raw.borders {
        let line = decode_border_line(border.line_style);
        if line == BorderLine::None {
            continue;
        }
        let Some(side) = decode_edge(border.edge) else {
            continue;
        };
        let mut edge = BorderEdge::new(side, line);
        if let Some(color) = border.color {
            edge = edge.with_color(decode_color(color));
        }
        style.borders.push(edge);
    }

    if let Some(font) = &raw.font {
        let mut decoded = FontStyle::new()
            .with_bold(font.bold)
            .with_italic(font.italic)
            .with_color(decode_color(font.color));
        if font.size > 0.0 {
            decoded = decoded.with_size(font.size);
        }
        style.font = Some(decoded);
    }

    if let Some(interior) = &raw.interior {
        let pattern = decode_fill_pattern(interior.pattern);
        if pattern != FillPattern::None {
            let color = interior.color.map(decode_color).unwrap_or_default();
            style.fill = Some(FillStyle::pattern(pattern, color));
        }
    }

    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use sheetlink_protocol::{RawBorder, RawFont, RawInterior};

    #[test]
    fn test_border_line_roundtrip() {
        for line in [
            BorderLine::Continuous,
            BorderLine::Dash,
            BorderLine::Dot,
            BorderLine::Double,
            BorderLine::DashDot,
            BorderLine::DashDotDot,
            BorderLine::SlantDashDot,
            BorderLine::None,
        ] {
            assert_eq!(decode_border_line(encode_border_line(line)), line);
        }
        // Medium weights collapse to their plain-weight codes
        assert_eq!(
            decode_border_line(encode_border_line(BorderLine::MediumDashDot)),
            BorderLine::DashDot
        );
        assert_eq!(
            decode_border_line(encode_border_line(BorderLine::MediumDashDotDot)),
            BorderLine::DashDotDot
        );
    }

    #[test]
    fn test_unknown_codes_decode_to_defaults() {
        assert_eq!(decode_border_line(999), BorderLine::None);
        assert_eq!(decode_border_line(-1), BorderLine::None);
        assert_eq!(decode_fill_pattern(999), FillPattern::None);
        assert_eq!(decode_fill_pattern(-4142), FillPattern::None);
    }

    #[test]
    fn test_fill_pattern_roundtrip() {
        for code in [-4125, -4124, -4126, -4121, -4127, -4162, -4166, 1, 3, 4, 9, 10, 11, 12, 13,
            14, 16, 17]
        {
            let pattern = decode_fill_pattern(code);
            assert_eq!(encode_fill_pattern(pattern), code);
        }
        // Alternate host codes decode to the same patterns as the canonical ones
        assert_eq!(decode_fill_pattern(5), decode_fill_pattern(9));
        assert_eq!(decode_fill_pattern(2), decode_fill_pattern(13));
        assert_eq!(decode_fill_pattern(15), decode_fill_pattern(16));
    }

    #[test]
    fn test_validation_encoding() {
        let rule = DataValidationRule::list(["Yes", "No"])
            .with_input_message("Answer", "Pick one")
            .with_error_message("Invalid", "Yes or No only");
        let raw = encode_validation(&rule);
        assert_eq!(raw.kind, 3);
        assert_eq!(raw.operator, 1);
        assert_eq!(raw.formula1, "Yes,No");
        assert!(raw.show_input);
        assert_eq!(raw.input_title, "Answer");
        assert!(raw.show_error);

        let rule = DataValidationRule::whole_number(ValidationOperator::GreaterThan, "0");
        let raw = encode_validation(&rule);
        assert_eq!(raw.kind, 1);
        assert_eq!(raw.operator, 5);
        assert_eq!(raw.formula1, "0");
        assert!(!raw.show_input);

        // Custom rules pin the operator at Between
        let rule = DataValidationRule::custom("=A1>0");
        let raw = encode_validation(&rule);
        assert_eq!(raw.kind, 7);
        assert_eq!(raw.operator, 1);
    }

    #[test]
    fn test_message_requires_title() {
        let mut rule = DataValidationRule::list(["a"]);
        rule.show_input_message = true;
        rule.input_message = "orphan message".to_string();
        let raw = encode_validation(&rule);
        assert!(!raw.show_input);
        assert_eq!(raw.input_message, "");
    }

    #[test]
    fn test_conditional_encoding() {
        let rule = CfRule::new(CfRuleKind::CellValue {
            operator: CfOperator::GreaterThan,
            value1: "100".to_string(),
            value2: None,
        })
        .with_format(CellStyle {
            font: Some(FontStyle::new().with_bold(true).with_color("#FF0000")),
            fill: Some(FillStyle::solid("#FFFF00")),
            ..Default::default()
        });
        match encode_conditional(&rule).unwrap() {
            RawConditionalFormat::CellValue {
                operator, format, ..
            } => {
                assert_eq!(operator, 5);
                let format = format.unwrap();
                assert!(format.bold);
                assert_eq!(format.font_color, Some(0x0000FF)); // red in BGR
                assert_eq!(format.fill_color, Some(0x00FFFF)); // yellow in BGR
            }
            other => panic!("expected cell value rule, got {other:?}"),
        }

        let rule = CfRule::new(CfRuleKind::ColorScale {
            min: CfAnchor::new(CfAnchorKind::Min).with_color("#FF0000"),
            mid: Some(CfAnchor::new(CfAnchorKind::Percentile).with_value("50")),
            max: CfAnchor::new(CfAnchorKind::Max).with_color("#00FF00"),
        });
        match encode_conditional(&rule).unwrap() {
            RawConditionalFormat::ColorScale { anchors } => {
                assert_eq!(anchors.len(), 3);
                assert_eq!(anchors[0].kind, 4);
                assert_eq!(anchors[1].kind, 2);
                assert_eq!(anchors[1].value.as_deref(), Some("50"));
                assert_eq!(anchors[1].color, 0); // colorless anchors encode as black
                assert_eq!(anchors[2].kind, 5);
            }
            other => panic!("expected color scale, got {other:?}"),
        }
    }

    #[test]
    fn test_icon_set_is_unsupported() {
        let rule = CfRule::new(CfRuleKind::IconSet {
            style: "3Arrows".to_string(),
            reverse: false,
        });
        let err = encode_conditional(&rule).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_style_decode() {
        let raw = RawCellStyle {
            font: Some(RawFont {
                size: 14.0,
                bold: true,
                italic: false,
                color: 0x0000FF, // red in BGR
            }),
            interior: Some(RawInterior {
                pattern: 1,
                color: Some(0x00FFFF), // yellow in BGR
            }),
            borders: vec![
                RawBorder {
                    edge: EDGE_LEFT,
                    line_style: -4115,
                    color: Some(0xFF0000), // blue in BGR
                },
                RawBorder {
                    edge: EDGE_TOP,
                    line_style: -4142,
                    color: None,
                },
            ],
        };

        let style = decode_cell_style(&raw);
        assert_eq!(style.borders.len(), 1);
        assert_eq!(style.borders[0].side, BorderSide::Left);
        assert_eq!(style.borders[0].line, BorderLine::Dash);
        assert_eq!(style.borders[0].color.as_deref(), Some("#0000FF"));

        let font = style.font.unwrap();
        assert!(font.bold);
        assert_eq!(font.size, Some(14.0));
        assert_eq!(font.color.as_deref(), Some("#FF0000"));

        let fill = style.fill.unwrap();
        assert_eq!(fill.pattern, FillPattern::Solid);
        assert_eq!(fill.colors, vec!["#FFFF00"]);
    }

    #[test]
    fn test_none_pattern_drops_fill() {
        let raw = RawCellStyle {
            font: None,
            interior: Some(RawInterior {
                pattern: -4142,
                color: None,
            }),
            borders: Vec::new(),
        };
        assert_eq!(decode_cell_style(&raw).fill, None);
    }

    proptest! {
        #[test]
        fn color_roundtrips_through_bgr(r: u8, g: u8, b: u8) {
            let color = format!("#{r:02X}{g:02X}{b:02X}");
            let encoded = encode_color(&color).unwrap();
            prop_assert_eq!(decode_color(encoded), color);
        }

        #[test]
        fn bgr_roundtrips_through_hex(code in 0i64..0x0100_0000) {
            let decoded = decode_color(code);
            prop_assert_eq!(encode_color(&decoded).unwrap(), code);
        }
    }
}
