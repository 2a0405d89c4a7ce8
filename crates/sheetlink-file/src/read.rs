//! Container reader
//!
//! Parses a document container into a [`WorkbookModel`]. Reading is lenient
//! where the container allows variation (missing optional parts, unknown
//! codes) and strict where the model would otherwise corrupt (bad cell
//! references, dangling style indices).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::{FileError, FileResult};
use crate::model::{Cell, SheetModel, StylePool, WorkbookModel};
use crate::styles::{read_styles_xml, ParsedStyles};
use sheetlink_core::{
    CellAddress, CellRange, CellValue, CfAnchor, CfAnchorKind, CfOperator, CfRule, CfRuleKind,
    DataValidationRule, PivotTable, Table, UsedRange, ValidationKind, ValidationOperator,
};

/// Decode the container's `_xHHHH_` escape sequences.
///
/// Control characters the XML layer cannot carry are stored this way:
/// `_x000d_` is CR, `_x000a_` is LF, `_x005f_` is an escaped underscore.
fn decode_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '_' {
            result.push(c);
            continue;
        }
        let mut hex_chars = String::new();
        let mut decoded = None;
        if chars.peek() == Some(&'x') {
            chars.next();
            for _ in 0..4 {
                match chars.peek() {
                    Some(&ch) if ch.is_ascii_hexdigit() => {
                        hex_chars.push(ch);
                        chars.next();
                    }
                    _ => break,
                }
            }
            if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                chars.next();
                decoded = u32::from_str_radix(&hex_chars, 16)
                    .ok()
                    .and_then(char::from_u32);
            }
        }
        match decoded {
            Some(ch) => result.push(ch),
            None => {
                result.push('_');
                if !hex_chars.is_empty() {
                    result.push('x');
                    result.push_str(&hex_chars);
                }
            }
        }
    }

    result
}

fn attr_value(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
}

fn attr_flag(e: &BytesStart, name: &[u8]) -> bool {
    matches!(attr_value(e, name).as_deref(), Some("1") | Some("true"))
}

/// Resolve a relationship target against the directory of the part that
/// declared it. Targets starting with `/` are container-absolute.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for component in target.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Container file reader
pub struct ContainerReader;

impl ContainerReader {
    /// Read a document from a file path
    pub fn read_file<P: AsRef<Path>>(path: P) -> FileResult<WorkbookModel> {
        let file = File::open(path.as_ref())?;
        Self::read(file, path.as_ref().to_path_buf())
    }

    /// Read a document from any seekable reader. The model remembers `path`
    /// as its save destination.
    pub fn read<R: Read + Seek>(reader: R, path: PathBuf) -> FileResult<WorkbookModel> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(FileError::InvalidFormat(
                "missing [Content_Types].xml".into(),
            ));
        }

        let shared_strings = Self::read_shared_strings(&mut archive)?;
        let parsed_styles = Self::read_styles(&mut archive)?;
        let sheet_entries = Self::read_workbook_xml(&mut archive)?;
        let sheet_paths = Self::read_workbook_rels(&mut archive)?;

        let mut model = WorkbookModel {
            path,
            sheets: Vec::with_capacity(sheet_entries.len()),
            styles: StylePool::new(),
        };
        // Memoizes container style index -> pool index
        let mut style_memo: HashMap<u32, u32> = HashMap::new();

        for (name, r_id) in &sheet_entries {
            let Some(part_path) = sheet_paths.get(r_id) else {
                continue;
            };
            let mut sheet = SheetModel::new(name.clone());
            let table_rel_ids = Self::read_worksheet(
                &mut archive,
                part_path,
                &mut sheet,
                &shared_strings,
                &parsed_styles,
                &mut model.styles,
                &mut style_memo,
            )?;
            Self::attach_sheet_parts(&mut archive, part_path, &mut sheet, &table_rel_ids)?;
            model.sheets.push(sheet);
        }

        if model.sheets.is_empty() {
            model.sheets.push(SheetModel::new("Sheet1"));
        }

        Ok(model)
    }

    fn read_shared_strings<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> FileResult<Vec<String>> {
        let mut strings = Vec::new();

        let file = match archive.by_name("xl/sharedStrings.xml") {
            Ok(f) => f,
            // A document with no string cells has no sharedStrings part
            Err(_) => return Ok(strings),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => match e.name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"t" if in_si => in_t = true,
                    _ => {}
                },
                Ok(Event::End(e)) => match e.name().as_ref() {
                    b"si" => {
                        strings.push(decode_escapes(&current));
                        current.clear();
                        in_si = false;
                    }
                    b"t" => in_t = false,
                    _ => {}
                },
                Ok(Event::Text(e)) if in_t => {
                    if let Ok(text) = e.unescape() {
                        current.push_str(&text);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(strings)
    }

    fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> FileResult<ParsedStyles> {
        let file = match archive.by_name("xl/styles.xml") {
            Ok(f) => f,
            Err(_) => return Ok(ParsedStyles::default()),
        };
        read_styles_xml(file)
    }

    /// Sheet names and their relationship ids, in workbook order
    fn read_workbook_xml<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> FileResult<Vec<(String, String)>> {
        let file = archive
            .by_name("xl/workbook.xml")
            .map_err(|_| FileError::MissingPart("xl/workbook.xml".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut sheets = Vec::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                    if let (Some(name), Some(r_id)) =
                        (attr_value(&e, b"name"), attr_value(&e, b"r:id"))
                    {
                        sheets.push((name, r_id));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(sheets)
    }

    /// Relationship id -> worksheet part path
    fn read_workbook_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
    ) -> FileResult<HashMap<String, String>> {
        let file = archive
            .by_name("xl/_rels/workbook.xml.rels")
            .map_err(|_| FileError::MissingPart("xl/_rels/workbook.xml.rels".into()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut rels = HashMap::new();

        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    if let (Some(id), Some(target), Some(rel_type)) = (
                        attr_value(&e, b"Id"),
                        attr_value(&e, b"Target"),
                        attr_value(&e, b"Type"),
                    ) {
                        if rel_type.ends_with("/worksheet") {
                            rels.insert(id, resolve_target("xl", &target));
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Parse one worksheet part into `sheet`. Returns the relationship ids
    /// of table parts referenced by the sheet.
    #[allow(clippy::too_many_arguments)]
    fn read_worksheet<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part_path: &str,
        sheet: &mut SheetModel,
        shared_strings: &[String],
        parsed_styles: &ParsedStyles,
        pool: &mut StylePool,
        style_memo: &mut HashMap<u32, u32>,
    ) -> FileResult<Vec<String>> {
        let file = archive
            .by_name(part_path)
            .map_err(|_| FileError::MissingPart(part_path.to_string()))?;

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut table_rel_ids = Vec::new();

        // Current cell state
        let mut cell_ref: Option<String> = None;
        let mut cell_type: Option<String> = None;
        let mut cell_style: Option<u32> = None;
        let mut cell_value: Option<String> = None;
        let mut cell_formula: Option<String> = None;
        let mut in_cell = false;
        let mut in_value = false;
        let mut in_formula = false;
        let mut in_inline_str = false;
        let mut in_inline_text = false;

        // Data validation state
        let mut in_validation = false;
        let mut validation_ranges: Vec<CellRange> = Vec::new();
        let mut current_validation: Option<DataValidationRule> = None;
        let mut in_dv_formula1 = false;
        let mut in_dv_formula2 = false;
        let mut dv_formula1: Option<String> = None;
        let mut dv_formula2: Option<String> = None;

        // Conditional formatting state
        let mut cf_ranges: Vec<CellRange> = Vec::new();
        let mut in_cf_rule = false;
        let mut cf_kind: Option<String> = None;
        let mut cf_operator = CfOperator::Equal;
        let mut cf_dxf_id: Option<usize> = None;
        let mut in_cf_formula = false;
        let mut cf_formulas: Vec<String> = Vec::new();
        let mut cf_anchors: Vec<(CfAnchorKind, Option<String>)> = Vec::new();
        let mut cf_colors: Vec<String> = Vec::new();
        let mut cf_icon_style: Option<String> = None;
        let mut cf_icon_reverse = false;

        loop {
            let event = xml_reader.read_event_into(&mut buf);
            match event {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let is_empty = matches!(event, Ok(Event::Empty(_)));
                    match e.name().as_ref() {
                        b"dimension" => {
                            if let Some(r) = attr_value(e, b"ref") {
                                if let Ok(seeded) = UsedRange::from_dimension(&r) {
                                    sheet.used = seeded;
                                }
                            }
                        }
                        b"c" => {
                            cell_ref = attr_value(e, b"r");
                            cell_type = attr_value(e, b"t");
                            cell_style = attr_value(e, b"s").and_then(|s| s.parse().ok());
                            cell_value = None;
                            cell_formula = None;
                            if is_empty {
                                Self::store_cell(
                                    sheet,
                                    pool,
                                    style_memo,
                                    parsed_styles,
                                    shared_strings,
                                    cell_ref.take(),
                                    cell_type.take(),
                                    None,
                                    None,
                                    cell_style.take(),
                                )?;
                            } else {
                                in_cell = true;
                            }
                        }
                        b"v" if in_cell => in_value = true,
                        b"f" if in_cell => in_formula = true,
                        b"is" if in_cell => in_inline_str = true,
                        b"t" if in_inline_str => in_inline_text = true,
                        b"dataValidation" => {
                            let (ranges, rule) = Self::parse_validation_attrs(e);
                            validation_ranges = ranges;
                            current_validation = Some(rule);
                            dv_formula1 = None;
                            dv_formula2 = None;
                            if is_empty {
                                Self::finish_validation(
                                    sheet,
                                    &mut validation_ranges,
                                    &mut current_validation,
                                    &mut dv_formula1,
                                    &mut dv_formula2,
                                );
                            } else {
                                in_validation = true;
                            }
                        }
                        b"formula1" if in_validation => in_dv_formula1 = true,
                        b"formula2" if in_validation => in_dv_formula2 = true,
                        b"conditionalFormatting" => {
                            cf_ranges = attr_value(e, b"sqref")
                                .map(|sqref| {
                                    sqref
                                        .split_whitespace()
                                        .filter_map(|part| CellRange::parse(part).ok())
                                        .collect()
                                })
                                .unwrap_or_default();
                        }
                        b"cfRule" => {
                            in_cf_rule = true;
                            cf_kind = attr_value(e, b"type");
                            cf_operator = attr_value(e, b"operator")
                                .map(|op| CfOperator::parse_or_default(&op))
                                .unwrap_or_default();
                            cf_dxf_id = attr_value(e, b"dxfId").and_then(|v| v.parse().ok());
                            cf_formulas.clear();
                            cf_anchors.clear();
                            cf_colors.clear();
                            cf_icon_style = None;
                            cf_icon_reverse = false;
                            if is_empty {
                                in_cf_rule = false;
                            }
                        }
                        b"formula" if in_cf_rule => in_cf_formula = true,
                        b"cfvo" if in_cf_rule => {
                            let kind = attr_value(e, b"type")
                                .map(|t| CfAnchorKind::parse_or_default(&t))
                                .unwrap_or_default();
                            cf_anchors.push((kind, attr_value(e, b"val")));
                        }
                        b"color" if in_cf_rule => {
                            if let Some(color) =
                                attr_value(e, b"rgb").and_then(|v| crate::codec::decode_argb(&v))
                            {
                                cf_colors.push(color);
                            }
                        }
                        b"iconSet" if in_cf_rule => {
                            cf_icon_style = attr_value(e, b"iconSet");
                            cf_icon_reverse = attr_flag(e, b"reverse");
                        }
                        b"tablePart" => {
                            if let Some(id) = attr_value(e, b"r:id") {
                                table_rel_ids.push(id);
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"c" => {
                        Self::store_cell(
                            sheet,
                            pool,
                            style_memo,
                            parsed_styles,
                            shared_strings,
                            cell_ref.take(),
                            cell_type.take(),
                            cell_value.take(),
                            cell_formula.take(),
                            cell_style.take(),
                        )?;
                        in_cell = false;
                    }
                    b"v" => in_value = false,
                    b"f" => in_formula = false,
                    b"is" => in_inline_str = false,
                    b"t" if in_inline_str => in_inline_text = false,
                    b"dataValidation" => {
                        Self::finish_validation(
                            sheet,
                            &mut validation_ranges,
                            &mut current_validation,
                            &mut dv_formula1,
                            &mut dv_formula2,
                        );
                        in_validation = false;
                    }
                    b"formula1" => in_dv_formula1 = false,
                    b"formula2" => in_dv_formula2 = false,
                    b"formula" if in_cf_rule => in_cf_formula = false,
                    b"cfRule" => {
                        let kind = Self::build_cf_kind(
                            cf_kind.take().as_deref(),
                            cf_operator,
                            &cf_formulas,
                            &cf_anchors,
                            &cf_colors,
                            cf_icon_style.take(),
                            cf_icon_reverse,
                        );
                        if let Some(kind) = kind {
                            let mut rule = CfRule::new(kind);
                            if let Some(dxf) =
                                cf_dxf_id.and_then(|id| parsed_styles.dxf_styles.get(id))
                            {
                                rule.format = Some(dxf.clone());
                            }
                            for range in &cf_ranges {
                                sheet.conditional_formats.push((*range, rule.clone()));
                            }
                        }
                        in_cf_rule = false;
                    }
                    b"conditionalFormatting" => cf_ranges.clear(),
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if let Ok(text) = e.unescape() {
                        if in_value {
                            cell_value = Some(text.to_string());
                        } else if in_formula {
                            cell_formula = Some(text.to_string());
                        } else if in_inline_text {
                            cell_value = Some(text.to_string());
                            cell_type = Some("inlineStr".to_string());
                        } else if in_dv_formula1 {
                            dv_formula1 = Some(text.to_string());
                        } else if in_dv_formula2 {
                            dv_formula2 = Some(text.to_string());
                        } else if in_cf_formula {
                            cf_formulas.push(text.to_string());
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(table_rel_ids)
    }

    /// Decode one parsed cell into the sheet model
    #[allow(clippy::too_many_arguments)]
    fn store_cell(
        sheet: &mut SheetModel,
        pool: &mut StylePool,
        style_memo: &mut HashMap<u32, u32>,
        parsed_styles: &ParsedStyles,
        shared_strings: &[String],
        cell_ref: Option<String>,
        cell_type: Option<String>,
        value: Option<String>,
        formula: Option<String>,
        style_idx: Option<u32>,
    ) -> FileResult<()> {
        let Some(cell_ref) = cell_ref else {
            return Ok(());
        };
        let addr = CellAddress::parse(&cell_ref)
            .map_err(|e| FileError::Parse(format!("cell reference {cell_ref}: {e}")))?;

        let cell_type = cell_type.as_deref();
        let decoded = match &formula {
            Some(f) => {
                let cached =
                    value.and_then(|v| Self::decode_plain_value(&v, cell_type, shared_strings));
                Some(CellValue::Formula {
                    text: f.strip_prefix('=').unwrap_or(f).to_string(),
                    cached: cached.map(Box::new),
                })
            }
            None => value.and_then(|v| Self::decode_plain_value(&v, cell_type, shared_strings)),
        };

        let style = match style_idx {
            Some(s) if s != 0 => {
                if let Some(&pool_idx) = style_memo.get(&s) {
                    Some(pool_idx)
                } else {
                    let parsed = parsed_styles
                        .cell_styles
                        .get(s as usize)
                        .ok_or_else(|| FileError::Parse(format!("style index {s} out of bounds")))?;
                    let pool_idx = pool.get_or_insert(parsed.clone());
                    style_memo.insert(s, pool_idx);
                    Some(pool_idx)
                }
            }
            _ => None,
        };

        if decoded.is_none() && style.is_none() {
            return Ok(());
        }
        let mut cell = Cell::new(decoded.unwrap_or(CellValue::Empty));
        cell.style = style;
        sheet.put_cell(addr.row, addr.col, cell);
        Ok(())
    }

    fn decode_plain_value(
        value: &str,
        cell_type: Option<&str>,
        shared_strings: &[String],
    ) -> Option<CellValue> {
        match cell_type {
            Some("s") => {
                let idx: usize = value.parse().ok()?;
                shared_strings.get(idx).map(|s| CellValue::Text(s.clone()))
            }
            Some("b") => Some(CellValue::Boolean(
                value == "1" || value.eq_ignore_ascii_case("true"),
            )),
            Some("e") => Some(CellValue::Error(value.to_string())),
            Some("str") | Some("inlineStr") => Some(CellValue::Text(decode_escapes(value))),
            None | Some("n") => Some(match value.parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(value.to_string()),
            }),
            Some(_) => Some(CellValue::Text(value.to_string())),
        }
    }

    /// Build a validation rule skeleton from the element attributes; the
    /// bound formulas arrive as child elements and are applied at the end.
    fn parse_validation_attrs(e: &BytesStart) -> (Vec<CellRange>, DataValidationRule) {
        let ranges = attr_value(e, b"sqref")
            .map(|sqref| {
                sqref
                    .split_whitespace()
                    .filter_map(|part| CellRange::parse(part).ok())
                    .collect()
            })
            .unwrap_or_default();

        let kind = attr_value(e, b"type")
            .and_then(|t| t.parse::<ValidationKind>().ok())
            .unwrap_or(ValidationKind::Custom);
        let operator = attr_value(e, b"operator")
            .map(|op| ValidationOperator::parse_or_default(&op))
            .unwrap_or_default();

        let mut rule = match kind {
            ValidationKind::List => DataValidationRule::list(Vec::<String>::new()),
            ValidationKind::Whole => DataValidationRule::whole_number(operator, ""),
            ValidationKind::Decimal => DataValidationRule::decimal(operator, ""),
            ValidationKind::Date => DataValidationRule::date(operator, ""),
            ValidationKind::Time => DataValidationRule::time(operator, ""),
            ValidationKind::TextLength => DataValidationRule::text_length(operator, ""),
            ValidationKind::Custom => DataValidationRule::custom(""),
        };

        rule.show_input_message = attr_flag(e, b"showInputMessage");
        rule.input_title = attr_value(e, b"promptTitle").unwrap_or_default();
        rule.input_message = attr_value(e, b"prompt").unwrap_or_default();
        rule.show_error_message = attr_flag(e, b"showErrorMessage");
        rule.error_title = attr_value(e, b"errorTitle").unwrap_or_default();
        rule.error_message = attr_value(e, b"error").unwrap_or_default();

        (ranges, rule)
    }

    fn finish_validation(
        sheet: &mut SheetModel,
        ranges: &mut Vec<CellRange>,
        rule: &mut Option<DataValidationRule>,
        formula1: &mut Option<String>,
        formula2: &mut Option<String>,
    ) {
        let Some(mut rule) = rule.take() else {
            return;
        };
        let formula1 = formula1.take().unwrap_or_default();
        rule.formula2 = formula2.take().unwrap_or_default();

        if rule.kind == ValidationKind::List {
            // An inline list source is a quoted comma-separated string; a
            // range reference source stays in formula1.
            if let Some(inner) = formula1
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
            {
                rule.dropdown = inner.split(',').map(str::to_string).collect();
            } else {
                rule.formula1 = formula1;
            }
        } else {
            rule.formula1 = formula1;
        }

        for range in ranges.drain(..) {
            sheet.validations.push((range, rule.clone()));
        }
    }

    fn build_cf_kind(
        kind: Option<&str>,
        operator: CfOperator,
        formulas: &[String],
        anchors: &[(CfAnchorKind, Option<String>)],
        colors: &[String],
        icon_style: Option<String>,
        icon_reverse: bool,
    ) -> Option<CfRuleKind> {
        // Scale anchors pair the i-th cfvo with the i-th color; a data
        // bar's cfvo pair carries no colors of its own.
        let scale_anchor = |i: usize| -> Option<CfAnchor> {
            let (kind, value) = anchors.get(i)?.clone();
            Some(CfAnchor {
                kind,
                value,
                color: colors.get(i).cloned(),
            })
        };
        let bar_anchor = |i: usize, fallback: CfAnchorKind| -> CfAnchor {
            match anchors.get(i) {
                Some((kind, value)) => CfAnchor {
                    kind: *kind,
                    value: value.clone(),
                    color: None,
                },
                None => CfAnchor::new(fallback),
            }
        };

        match kind {
            Some("cellIs") => Some(CfRuleKind::CellValue {
                operator,
                value1: formulas.first().cloned().unwrap_or_default(),
                value2: formulas.get(1).cloned(),
            }),
            Some("expression") => Some(CfRuleKind::Expression {
                formula: formulas.first().cloned().unwrap_or_default(),
            }),
            Some("colorScale") => {
                let (min, mid, max) = match anchors.len() {
                    2 => (scale_anchor(0)?, None, scale_anchor(1)?),
                    3 => (scale_anchor(0)?, scale_anchor(1), scale_anchor(2)?),
                    _ => return None,
                };
                Some(CfRuleKind::ColorScale { min, mid, max })
            }
            Some("dataBar") => Some(CfRuleKind::DataBar {
                min: bar_anchor(0, CfAnchorKind::Min),
                max: bar_anchor(1, CfAnchorKind::Max),
                color: colors
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "#638EC6".to_string()),
            }),
            Some("iconSet") => Some(CfRuleKind::IconSet {
                style: icon_style.unwrap_or_else(|| "3TrafficLights1".to_string()),
                reverse: icon_reverse,
            }),
            _ => None,
        }
    }

    /// Resolve table and pivot table parts referenced by a worksheet
    fn attach_sheet_parts<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part_path: &str,
        sheet: &mut SheetModel,
        table_rel_ids: &[String],
    ) -> FileResult<()> {
        let rels = Self::read_sheet_rels(archive, part_path)?;

        for id in table_rel_ids {
            if let Some((_, target)) = rels.get(id) {
                if let Some(table) = Self::read_table_part(archive, target)? {
                    sheet.tables.push(table);
                }
            }
        }

        // Pivot tables have no in-sheet marker; only the relationship
        // points at them.
        for (rel_type, target) in rels.values() {
            if rel_type.ends_with("/pivotTable") {
                if let Some(pivot) = Self::read_pivot_part(archive, target)? {
                    sheet.pivot_tables.push(pivot);
                }
            }
        }

        Ok(())
    }

    /// Relationship id -> (type, resolved target path) for one sheet
    fn read_sheet_rels<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part_path: &str,
    ) -> FileResult<HashMap<String, (String, String)>> {
        let mut rels = HashMap::new();

        let (dir, file_name) = match part_path.rsplit_once('/') {
            Some(split) => split,
            None => ("", part_path),
        };
        let rels_path = format!("{dir}/_rels/{file_name}.rels");

        let file = match archive.by_name(&rels_path) {
            Ok(f) => f,
            Err(_) => return Ok(rels),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e))
                    if e.name().as_ref() == b"Relationship" =>
                {
                    if let (Some(id), Some(target), Some(rel_type)) = (
                        attr_value(&e, b"Id"),
                        attr_value(&e, b"Target"),
                        attr_value(&e, b"Type"),
                    ) {
                        rels.insert(id, (rel_type, resolve_target(dir, &target)));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(rels)
    }

    fn read_table_part<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part_path: &str,
    ) -> FileResult<Option<Table>> {
        let file = match archive.by_name(part_path) {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut table = None;
        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"table" => {
                    let name = attr_value(&e, b"displayName")
                        .or_else(|| attr_value(&e, b"name"))
                        .unwrap_or_default();
                    if let Some(range) =
                        attr_value(&e, b"ref").and_then(|r| CellRange::parse(&r).ok())
                    {
                        table = Some(Table { name, range });
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(table)
    }

    fn read_pivot_part<R: Read + Seek>(
        archive: &mut zip::ZipArchive<R>,
        part_path: &str,
    ) -> FileResult<Option<PivotTable>> {
        let file = match archive.by_name(part_path) {
            Ok(f) => f,
            Err(_) => return Ok(None),
        };

        let mut xml_reader = Reader::from_reader(BufReader::new(file));
        xml_reader.trim_text(true);

        let mut buf = Vec::new();
        let mut name = String::new();
        let mut range = None;
        loop {
            match xml_reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                    b"pivotTableDefinition" => {
                        if let Some(n) = attr_value(&e, b"name") {
                            name = n;
                        }
                    }
                    b"location" => {
                        range = attr_value(&e, b"ref").and_then(|r| CellRange::parse(&r).ok());
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileError::Xml(e)),
                _ => {}
            }
            buf.clear();
        }

        Ok(range.map(|range| PivotTable { name, range }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_escapes("line1_x000a_line2"), "line1\nline2");
        assert_eq!(decode_escapes("a_x005f_b"), "a_b");
        assert_eq!(decode_escapes("plain_text"), "plain_text");
        assert_eq!(decode_escapes("_x00"), "_x00");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "../tables/table1.xml"),
            "xl/tables/table1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets", "/xl/pivotTables/pivotTable1.xml"),
            "xl/pivotTables/pivotTable1.xml"
        );
    }
}
