//! Container styles part (styles.xml) read/write helpers

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::codec;
use crate::error::{FileError, FileResult};
use crate::model::StylePool;
use sheetlink_core::{
    BorderEdge, BorderSide, CellStyle, FillKind, FillShading, FillStyle, FontStyle,
    FontVerticalAlign, Underline,
};

// === Writing ===

#[derive(Debug, Clone, Copy)]
struct ResolvedXfIds {
    font_id: u32,
    fill_id: u32,
    border_id: u32,
    num_fmt_id: u32,
}

/// Serialize the style pool and the differential formats used by
/// conditional formatting rules. The pool index of a style equals its
/// position in `cellXfs`, so cells can carry pool indices directly.
pub(crate) fn write_styles_xml(pool: &StylePool, dxfs: &[CellStyle]) -> String {
    // Component tables, deduplicated. The container requires fill 0 to be
    // none and fill 1 to be gray125.
    let mut font_ids: HashMap<Option<FontStyle>, u32> = HashMap::new();
    let mut fonts: Vec<Option<FontStyle>> = vec![None];
    font_ids.insert(None, 0);

    let mut fill_ids: HashMap<Option<FillStyle>, u32> = HashMap::new();
    let mut fills: Vec<Option<FillStyle>> = vec![
        None,
        Some(FillStyle::pattern(
            sheetlink_core::FillPattern::Gray125,
            "#FFFFFF",
        )),
    ];
    fill_ids.insert(None, 0);

    let mut border_ids: HashMap<Vec<BorderEdge>, u32> = HashMap::new();
    let mut borders: Vec<Vec<BorderEdge>> = vec![Vec::new()];
    border_ids.insert(Vec::new(), 0);

    let mut numfmt_ids: HashMap<String, u32> = HashMap::new();
    let mut numfmts: Vec<(u32, String)> = Vec::new();
    let mut next_numfmt_id: u32 = 164;

    let mut resolved: Vec<ResolvedXfIds> = Vec::with_capacity(pool.len());

    for (_, style) in pool.iter() {
        let font_id = match font_ids.get(&style.font) {
            Some(&id) => id,
            None => {
                let id = fonts.len() as u32;
                fonts.push(style.font.clone());
                font_ids.insert(style.font.clone(), id);
                id
            }
        };

        let fill_id = match fill_ids.get(&style.fill) {
            Some(&id) => id,
            None => {
                let id = fills.len() as u32;
                fills.push(style.fill.clone());
                fill_ids.insert(style.fill.clone(), id);
                id
            }
        };

        let border_id = match border_ids.get(&style.borders) {
            Some(&id) => id,
            None => {
                let id = borders.len() as u32;
                borders.push(style.borders.clone());
                border_ids.insert(style.borders.clone(), id);
                id
            }
        };

        let num_fmt_id = match effective_number_format(style) {
            None => 0,
            Some(code) => {
                if let Some(&id) = numfmt_ids.get(&code) {
                    id
                } else {
                    let id = next_numfmt_id;
                    next_numfmt_id += 1;
                    numfmt_ids.insert(code.clone(), id);
                    numfmts.push((id, code));
                    id
                }
            }
        };

        resolved.push(ResolvedXfIds {
            font_id,
            fill_id,
            border_id,
            num_fmt_id,
        });
    }

    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );

    if !numfmts.is_empty() {
        xml.push_str(&format!("\n  <numFmts count=\"{}\">", numfmts.len()));
        for (id, code) in &numfmts {
            xml.push_str(&format!(
                "\n    <numFmt numFmtId=\"{}\" formatCode=\"{}\"/>",
                id,
                escape_xml_attr(code)
            ));
        }
        xml.push_str("\n  </numFmts>");
    }

    xml.push_str(&format!("\n  <fonts count=\"{}\">", fonts.len()));
    for font in &fonts {
        xml.push_str("\n    ");
        xml.push_str(&write_font(font.as_ref()));
    }
    xml.push_str("\n  </fonts>");

    xml.push_str(&format!("\n  <fills count=\"{}\">", fills.len()));
    for fill in &fills {
        xml.push_str("\n    ");
        xml.push_str(&write_fill(fill.as_ref()));
    }
    xml.push_str("\n  </fills>");

    xml.push_str(&format!("\n  <borders count=\"{}\">", borders.len()));
    for edges in &borders {
        xml.push_str("\n    ");
        xml.push_str(&write_border(edges));
    }
    xml.push_str("\n  </borders>");

    xml.push_str(
        r#"
  <cellStyleXfs count="1">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
  </cellStyleXfs>"#,
    );

    xml.push_str(&format!("\n  <cellXfs count=\"{}\">", pool.len()));
    for ids in &resolved {
        xml.push_str(&format!(
            "\n    <xf numFmtId=\"{}\" fontId=\"{}\" fillId=\"{}\" borderId=\"{}\" xfId=\"0\"/>",
            ids.num_fmt_id, ids.font_id, ids.fill_id, ids.border_id
        ));
    }
    xml.push_str("\n  </cellXfs>");

    xml.push_str(
        r#"
  <cellStyles count="1">
    <cellStyle name="Normal" xfId="0" builtinId="0"/>
  </cellStyles>"#,
    );

    if dxfs.is_empty() {
        xml.push_str("\n  <dxfs count=\"0\"/>");
    } else {
        xml.push_str(&format!("\n  <dxfs count=\"{}\">", dxfs.len()));
        for dxf in dxfs {
            xml.push_str("\n    ");
            xml.push_str(&write_dxf(dxf));
        }
        xml.push_str("\n  </dxfs>");
    }

    xml.push_str("\n</styleSheet>");
    xml
}

/// The number format code a style is written with: the explicit code, or one
/// synthesized from `decimal_places` when only that is set.
fn effective_number_format(style: &CellStyle) -> Option<String> {
    if let Some(code) = &style.number_format {
        return Some(code.clone());
    }
    style
        .decimal_places
        .map(|places| format!("0.{}", "0".repeat(places as usize)))
}

fn escape_xml_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn write_font(font: Option<&FontStyle>) -> String {
    let Some(font) = font else {
        return "<font/>".to_string();
    };
    let mut s = String::from("<font>");
    if font.bold {
        s.push_str("<b/>");
    }
    if font.italic {
        s.push_str("<i/>");
    }
    if font.strike {
        s.push_str("<strike/>");
    }
    match font.underline {
        Underline::None => {}
        Underline::Single => s.push_str("<u/>"),
        Underline::Double => s.push_str("<u val=\"double\"/>"),
    }
    match font.vertical_align {
        FontVerticalAlign::Baseline => {}
        FontVerticalAlign::Superscript => s.push_str("<vertAlign val=\"superscript\"/>"),
        FontVerticalAlign::Subscript => s.push_str("<vertAlign val=\"subscript\"/>"),
    }
    if let Some(size) = font.size {
        s.push_str(&format!("<sz val=\"{size}\"/>"));
    }
    if let Some(color) = &font.color {
        if let Ok(argb) = codec::encode_argb(color) {
            s.push_str(&format!("<color rgb=\"{argb}\"/>"));
        }
    }
    s.push_str("</font>");
    s
}

fn write_fill(fill: Option<&FillStyle>) -> String {
    let Some(fill) = fill else {
        return "<fill><patternFill patternType=\"none\"/></fill>".to_string();
    };
    match fill.kind {
        FillKind::Pattern => {
            let mut s = format!(
                "<fill><patternFill patternType=\"{}\">",
                codec::encode_fill_pattern(fill.pattern)
            );
            if let Some(color) = fill.colors.first() {
                if let Ok(argb) = codec::encode_argb(color) {
                    s.push_str(&format!("<fgColor rgb=\"{argb}\"/>"));
                }
            }
            s.push_str("<bgColor indexed=\"64\"/></patternFill></fill>");
            s
        }
        FillKind::Gradient => {
            let mut s = String::from("<fill><gradientFill");
            match codec::encode_gradient(fill.shading) {
                codec::GradientGeometry::Linear { degree } => {
                    s.push_str(&format!(" degree=\"{degree}\""));
                }
                codec::GradientGeometry::Path { center } => {
                    let inset = if center { "0.5" } else { "0" };
                    s.push_str(&format!(
                        " type=\"path\" left=\"{inset}\" right=\"{inset}\" top=\"{inset}\" bottom=\"{inset}\""
                    ));
                }
            }
            s.push('>');
            for (i, color) in fill.colors.iter().enumerate() {
                if let Ok(argb) = codec::encode_argb(color) {
                    s.push_str(&format!(
                        "<stop position=\"{i}\"><color rgb=\"{argb}\"/></stop>"
                    ));
                }
            }
            s.push_str("</gradientFill></fill>");
            s
        }
    }
}

fn write_border(edges: &[BorderEdge]) -> String {
    let mut s = String::from("<border>");
    for side in [
        BorderSide::Left,
        BorderSide::Right,
        BorderSide::Top,
        BorderSide::Bottom,
    ] {
        let tag = side.as_str();
        match edges
            .iter()
            .find(|e| e.side == side)
            .and_then(|e| codec::encode_border_line(e.line).map(|name| (e, name)))
        {
            Some((edge, name)) => {
                s.push_str(&format!("<{tag} style=\"{name}\">"));
                if let Some(color) = &edge.color {
                    if let Ok(argb) = codec::encode_argb(color) {
                        s.push_str(&format!("<color rgb=\"{argb}\"/>"));
                    }
                }
                s.push_str(&format!("</{tag}>"));
            }
            None => s.push_str(&format!("<{tag}/>")),
        }
    }
    s.push_str("<diagonal/></border>");
    s
}

/// Differential formats carry only the font and fill parts; that is the
/// surface conditional formatting can express on both backends.
fn write_dxf(style: &CellStyle) -> String {
    let mut s = String::from("<dxf>");
    if let Some(font) = &style.font {
        s.push_str(&write_font(Some(font)));
    }
    if let Some(fill) = &style.fill {
        s.push_str(&write_fill(Some(fill)));
    }
    s.push_str("</dxf>");
    s
}

// === Reading ===

#[derive(Debug)]
pub(crate) struct ParsedStyles {
    /// Styles indexed by cellXf position
    pub cell_styles: Vec<CellStyle>,
    /// Differential formats indexed by dxfId
    pub dxf_styles: Vec<CellStyle>,
}

impl Default for ParsedStyles {
    fn default() -> Self {
        ParsedStyles {
            cell_styles: vec![CellStyle::default()],
            dxf_styles: Vec::new(),
        }
    }
}

/// Where a `<color>` element currently belongs
#[derive(Debug, Clone, Copy, PartialEq)]
enum ColorTarget {
    None,
    Font,
    PatternForeground,
    GradientStop,
    BorderEdge,
}

pub(crate) fn read_styles_xml<R: Read>(reader: R) -> FileResult<ParsedStyles> {
    let buf_reader = BufReader::new(reader);
    parse_styles(Reader::from_reader(buf_reader))
}

fn attr_value(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn parse_styles<R: BufRead>(mut xml_reader: Reader<R>) -> FileResult<ParsedStyles> {
    xml_reader.trim_text(true);
    let mut buf = Vec::new();

    // Component tables as parsed
    let mut numfmt_codes: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<Option<FontStyle>> = Vec::new();
    let mut fills: Vec<Option<FillStyle>> = Vec::new();
    let mut borders: Vec<Vec<BorderEdge>> = Vec::new();
    let mut xfs: Vec<(u32, u32, u32, u32)> = Vec::new(); // (numFmt, font, fill, border)
    let mut dxf_styles: Vec<CellStyle> = Vec::new();

    // Parser state
    let mut in_dxf = false;
    let mut in_cell_style_xfs = false;
    let mut current_font: Option<FontStyle> = None;
    let mut in_pattern_fill = false;
    let mut current_pattern: Option<FillStyle> = None;
    let mut in_gradient_fill = false;
    let mut current_gradient: Option<FillStyle> = None;
    let mut current_border: Option<Vec<BorderEdge>> = None;
    let mut current_edge: Option<BorderEdge> = None;
    let mut color_target = ColorTarget::None;
    let mut dxf_font: Option<FontStyle> = None;
    let mut dxf_fill: Option<FillStyle> = None;

    loop {
        let event = xml_reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let is_empty = matches!(event, Ok(Event::Empty(_)));
                match e.name().as_ref() {
                    b"numFmt" => {
                        if let (Some(id), Some(code)) = (
                            attr_value(e, b"numFmtId").and_then(|v| v.parse::<u32>().ok()),
                            attr_value(e, b"formatCode"),
                        ) {
                            numfmt_codes.insert(id, code);
                        }
                    }
                    b"font" => {
                        current_font = Some(FontStyle::default());
                        color_target = ColorTarget::Font;
                        if is_empty {
                            finish_font(current_font.take(), in_dxf, &mut fonts, &mut dxf_font);
                            color_target = ColorTarget::None;
                        }
                    }
                    b"b" => set_font(&mut current_font, |f| f.bold = true),
                    b"i" => set_font(&mut current_font, |f| f.italic = true),
                    b"strike" => set_font(&mut current_font, |f| f.strike = true),
                    b"u" => {
                        let kind = match attr_value(e, b"val").as_deref() {
                            Some("double") => Underline::Double,
                            Some("none") => Underline::None,
                            _ => Underline::Single,
                        };
                        set_font(&mut current_font, |f| f.underline = kind);
                    }
                    b"vertAlign" => {
                        let align = match attr_value(e, b"val").as_deref() {
                            Some("superscript") => FontVerticalAlign::Superscript,
                            Some("subscript") => FontVerticalAlign::Subscript,
                            _ => FontVerticalAlign::Baseline,
                        };
                        set_font(&mut current_font, |f| f.vertical_align = align);
                    }
                    b"sz" => {
                        if let Some(size) = attr_value(e, b"val").and_then(|v| v.parse().ok()) {
                            set_font(&mut current_font, |f| f.size = Some(size));
                        }
                    }
                    b"patternFill" => {
                        in_pattern_fill = true;
                        let pattern = attr_value(e, b"patternType")
                            .map(|v| codec::decode_fill_pattern(&v))
                            .unwrap_or_default();
                        current_pattern = Some(FillStyle {
                            kind: FillKind::Pattern,
                            pattern,
                            colors: Vec::new(),
                            shading: FillShading::default(),
                        });
                        if is_empty {
                            in_pattern_fill = false;
                        }
                    }
                    b"fgColor" if in_pattern_fill => {
                        if let Some(color) = attr_value(e, b"rgb").and_then(|v| codec::decode_argb(&v))
                        {
                            if let Some(fill) = current_pattern.as_mut() {
                                fill.colors.push(color);
                            }
                        }
                    }
                    b"gradientFill" => {
                        in_gradient_fill = true;
                        let shading = if attr_value(e, b"type").as_deref() == Some("path") {
                            let left = attr_value(e, b"left")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0.0);
                            codec::decode_gradient_path(left)
                        } else {
                            let degree = attr_value(e, b"degree")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(90);
                            codec::decode_gradient_degree(degree)
                        };
                        current_gradient = Some(FillStyle {
                            kind: FillKind::Gradient,
                            pattern: sheetlink_core::FillPattern::None,
                            colors: Vec::new(),
                            shading,
                        });
                        if is_empty {
                            in_gradient_fill = false;
                        }
                    }
                    b"stop" if in_gradient_fill => {
                        color_target = ColorTarget::GradientStop;
                    }
                    b"border" => {
                        current_border = Some(Vec::new());
                        if is_empty {
                            finish_border(current_border.take(), in_dxf, &mut borders);
                        }
                    }
                    b"left" | b"right" | b"top" | b"bottom" if current_border.is_some() => {
                        if let Some(style_name) = attr_value(e, b"style") {
                            let side = match e.name().as_ref() {
                                b"left" => BorderSide::Left,
                                b"right" => BorderSide::Right,
                                b"top" => BorderSide::Top,
                                _ => BorderSide::Bottom,
                            };
                            let edge =
                                BorderEdge::new(side, codec::decode_border_line(&style_name));
                            if is_empty {
                                if let Some(border) = current_border.as_mut() {
                                    border.push(edge);
                                }
                            } else {
                                current_edge = Some(edge);
                                color_target = ColorTarget::BorderEdge;
                            }
                        }
                    }
                    b"color" => {
                        let color = attr_value(e, b"rgb").and_then(|v| codec::decode_argb(&v));
                        if let Some(color) = color {
                            match color_target {
                                ColorTarget::Font => {
                                    set_font(&mut current_font, |f| f.color = Some(color));
                                }
                                ColorTarget::GradientStop => {
                                    if let Some(fill) = current_gradient.as_mut() {
                                        fill.colors.push(color);
                                    }
                                }
                                ColorTarget::BorderEdge => {
                                    if let Some(edge) = current_edge.as_mut() {
                                        edge.color = Some(color);
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    b"cellStyleXfs" => {
                        // Named-style xf rows; real files carry one per named
                        // style (Normal, Hyperlink, ...), so skip the whole
                        // section rather than assuming a fixed row count.
                        if !is_empty {
                            in_cell_style_xfs = true;
                        }
                    }
                    b"xf" if !in_dxf && !in_cell_style_xfs => {
                        xfs.push((
                            attr_value(e, b"numFmtId")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0),
                            attr_value(e, b"fontId")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0),
                            attr_value(e, b"fillId")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0),
                            attr_value(e, b"borderId")
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(0),
                        ));
                    }
                    b"dxf" => {
                        in_dxf = true;
                        dxf_font = None;
                        dxf_fill = None;
                        if is_empty {
                            dxf_styles.push(CellStyle::default());
                            in_dxf = false;
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"cellStyleXfs" => {
                    in_cell_style_xfs = false;
                }
                b"font" => {
                    finish_font(current_font.take(), in_dxf, &mut fonts, &mut dxf_font);
                    color_target = ColorTarget::None;
                }
                b"patternFill" => {
                    in_pattern_fill = false;
                }
                b"gradientFill" => {
                    in_gradient_fill = false;
                }
                b"stop" => {
                    color_target = ColorTarget::None;
                }
                b"fill" => {
                    let fill = current_gradient.take().or_else(|| current_pattern.take());
                    let fill = fill.filter(|f| {
                        f.kind == FillKind::Gradient
                            || f.pattern != sheetlink_core::FillPattern::None
                    });
                    if in_dxf {
                        dxf_fill = fill;
                    } else {
                        fills.push(fill);
                    }
                }
                b"left" | b"right" | b"top" | b"bottom" => {
                    if let Some(edge) = current_edge.take() {
                        if let Some(border) = current_border.as_mut() {
                            border.push(edge);
                        }
                    }
                    if color_target == ColorTarget::BorderEdge {
                        color_target = ColorTarget::None;
                    }
                }
                b"border" => {
                    finish_border(current_border.take(), in_dxf, &mut borders);
                }
                b"dxf" => {
                    dxf_styles.push(CellStyle {
                        font: dxf_font.take().filter(|f| !f.is_plain()),
                        fill: dxf_fill.take(),
                        ..Default::default()
                    });
                    in_dxf = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FileError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    let mut cell_styles = Vec::with_capacity(xfs.len().max(1));
    for &(numfmt, font_id, fill_id, border_id) in &xfs {
        let number_format = if numfmt == 0 {
            None
        } else {
            numfmt_codes
                .get(&numfmt)
                .cloned()
                .or_else(|| codec::builtin_number_format(numfmt).map(str::to_string))
        };
        let decimal_places = number_format.as_deref().and_then(codec::decimal_places);
        cell_styles.push(CellStyle {
            borders: borders.get(border_id as usize).cloned().unwrap_or_default(),
            font: fonts
                .get(font_id as usize)
                .cloned()
                .flatten()
                .filter(|f| !f.is_plain()),
            fill: fills.get(fill_id as usize).cloned().flatten(),
            number_format,
            decimal_places,
        });
    }
    if cell_styles.is_empty() {
        cell_styles.push(CellStyle::default());
    }

    Ok(ParsedStyles {
        cell_styles,
        dxf_styles,
    })
}

fn set_font<F: FnOnce(&mut FontStyle)>(font: &mut Option<FontStyle>, apply: F) {
    if let Some(font) = font.as_mut() {
        apply(font);
    }
}

fn finish_font(
    font: Option<FontStyle>,
    in_dxf: bool,
    fonts: &mut Vec<Option<FontStyle>>,
    dxf_font: &mut Option<FontStyle>,
) {
    let font = font.unwrap_or_default();
    if in_dxf {
        *dxf_font = Some(font);
    } else {
        fonts.push(if font.is_plain() { None } else { Some(font) });
    }
}

fn finish_border(border: Option<Vec<BorderEdge>>, in_dxf: bool, borders: &mut Vec<Vec<BorderEdge>>) {
    if !in_dxf {
        borders.push(border.unwrap_or_default());
    }
}
