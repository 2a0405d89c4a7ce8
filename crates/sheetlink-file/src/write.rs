//! Container writer
//!
//! Serializes a [`WorkbookModel`] back into a document container. Strings
//! are written inline rather than through a shared string table. Pivot
//! tables are discovery-only in the model and are not written back.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use crate::codec;
use crate::error::FileResult;
use crate::model::{SheetModel, WorkbookModel};
use crate::styles::write_styles_xml;
use sheetlink_core::{
    CellAddress, CellStyle, CellValue, CfAnchor, CfRuleKind, Table, ValidationKind,
};

/// Container file writer
pub struct ContainerWriter;

impl ContainerWriter {
    /// Write a document to a file path
    pub fn write_file<P: AsRef<Path>>(model: &WorkbookModel, path: P) -> FileResult<()> {
        let file = File::create(path)?;
        Self::write(model, file)
    }

    /// Serialize a document to an in-memory buffer
    pub fn to_bytes(model: &WorkbookModel) -> FileResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        Self::write(model, &mut buf)?;
        Ok(buf.into_inner())
    }

    /// Write a document to a writer
    pub fn write<W: Write + Seek>(model: &WorkbookModel, writer: W) -> FileResult<()> {
        let mut zip = zip::ZipWriter::new(writer);

        let (dxfs, dxf_ids) = Self::collect_dxfs(model);

        // Table part numbering is workbook-global; each sheet records the
        // 1-based part numbers of its tables.
        let mut table_parts: Vec<Vec<u32>> = Vec::with_capacity(model.sheets.len());
        let mut next_table = 1u32;
        for sheet in &model.sheets {
            let numbers: Vec<u32> = sheet
                .tables
                .iter()
                .map(|_| {
                    let n = next_table;
                    next_table += 1;
                    n
                })
                .collect();
            table_parts.push(numbers);
        }

        Self::write_content_types(&mut zip, model, &table_parts)?;
        Self::write_root_rels(&mut zip)?;
        Self::write_workbook_xml(&mut zip, model)?;
        Self::write_workbook_rels(&mut zip, model)?;

        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(write_styles_xml(&model.styles, &dxfs).as_bytes())?;

        for (i, sheet) in model.sheets.iter().enumerate() {
            Self::write_worksheet(&mut zip, sheet, i, &table_parts[i], &dxf_ids)?;
            if !sheet.tables.is_empty() {
                Self::write_worksheet_rels(&mut zip, i, &table_parts[i])?;
                for (table, &number) in sheet.tables.iter().zip(&table_parts[i]) {
                    Self::write_table_part(&mut zip, sheet, table, number)?;
                }
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Deduplicate the formats attached to conditional rules into the dxf
    /// table, keyed back by (sheet index, rule index).
    fn collect_dxfs(model: &WorkbookModel) -> (Vec<CellStyle>, HashMap<(usize, usize), u32>) {
        let mut dxfs: Vec<CellStyle> = Vec::new();
        let mut by_style: HashMap<CellStyle, u32> = HashMap::new();
        let mut ids: HashMap<(usize, usize), u32> = HashMap::new();

        for (sheet_idx, sheet) in model.sheets.iter().enumerate() {
            for (rule_idx, (_, rule)) in sheet.conditional_formats.iter().enumerate() {
                let Some(format) = &rule.format else {
                    continue;
                };
                let id = match by_style.get(format) {
                    Some(&id) => id,
                    None => {
                        let id = dxfs.len() as u32;
                        dxfs.push(format.clone());
                        by_style.insert(format.clone(), id);
                        id
                    }
                };
                ids.insert((sheet_idx, rule_idx), id);
            }
        }

        (dxfs, ids)
    }

    fn write_content_types<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        model: &WorkbookModel,
        table_parts: &[Vec<u32>],
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#,
        );

        for i in 0..model.sheets.len() {
            content.push_str(&format!(
                r#"
    <Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i + 1
            ));
        }

        for numbers in table_parts {
            for &n in numbers {
                content.push_str(&format!(
                    r#"
    <Override PartName="/xl/tables/table{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"/>"#,
                ));
            }
        }

        content.push_str("\n</Types>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_root_rels<W: Write + Seek>(zip: &mut zip::ZipWriter<W>) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("_rels/.rels", options)?;

        let content = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_xml<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        model: &WorkbookModel,
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/workbook.xml", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>"#,
        );

        for (i, sheet) in model.sheets.iter().enumerate() {
            content.push_str(&format!(
                r#"
        <sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                Self::escape_xml(&sheet.name),
                i + 1,
                i + 1
            ));
        }

        content.push_str(
            r#"
    </sheets>
</workbook>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_workbook_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        model: &WorkbookModel,
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("xl/_rels/workbook.xml.rels", options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for i in 0..model.sheets.len() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i + 1,
                i + 1
            ));
        }

        content.push_str(&format!(
            r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
            model.sheets.len() + 1
        ));

        content.push_str("\n</Relationships>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_worksheet<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &SheetModel,
        index: usize,
        table_numbers: &[u32],
        dxf_ids: &HashMap<(usize, usize), u32>,
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/worksheets/sheet{}.xml", index + 1), options)?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
        );

        content.push_str(&format!(
            "\n    <dimension ref=\"{}\"/>",
            sheet.used.dimension()
        ));

        content.push_str("\n    <sheetData>");

        // Sparse cells in row-major order; the map key ordering gives us
        // that directly.
        let mut current_row: Option<u32> = None;
        for (&(row, col), cell) in &sheet.cells {
            if current_row != Some(row) {
                if current_row.is_some() {
                    content.push_str("\n        </row>");
                }
                content.push_str(&format!("\n        <row r=\"{}\">", row + 1));
                current_row = Some(row);
            }

            let cell_ref = CellAddress::new(row, col).to_a1();
            let style_attr = match cell.style {
                Some(s) if s != 0 => format!(" s=\"{s}\""),
                _ => String::new(),
            };

            match &cell.value {
                CellValue::Empty => {
                    if !style_attr.is_empty() {
                        content.push_str(&format!("\n            <c r=\"{cell_ref}\"{style_attr}/>"));
                    }
                }
                CellValue::Number(n) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{cell_ref}\"{style_attr}><v>{n}</v></c>"
                    ));
                }
                CellValue::Boolean(b) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{cell_ref}\"{style_attr} t=\"b\"><v>{}</v></c>",
                        if *b { 1 } else { 0 }
                    ));
                }
                CellValue::Text(s) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{cell_ref}\"{style_attr} t=\"inlineStr\"><is><t>{}</t></is></c>",
                        Self::escape_xml(s)
                    ));
                }
                CellValue::Error(e) => {
                    content.push_str(&format!(
                        "\n            <c r=\"{cell_ref}\"{style_attr} t=\"e\"><v>{}</v></c>",
                        Self::escape_xml(e)
                    ));
                }
                CellValue::Formula { text, cached } => {
                    let formula = Self::escape_xml(text);
                    let (type_attr, cached_part) = match cached.as_deref() {
                        Some(CellValue::Number(n)) => (String::new(), format!("<v>{n}</v>")),
                        Some(CellValue::Text(s)) => (
                            " t=\"str\"".to_string(),
                            format!("<v>{}</v>", Self::escape_xml(s)),
                        ),
                        Some(CellValue::Boolean(b)) => (
                            " t=\"b\"".to_string(),
                            format!("<v>{}</v>", if *b { 1 } else { 0 }),
                        ),
                        Some(CellValue::Error(e)) => (
                            " t=\"e\"".to_string(),
                            format!("<v>{}</v>", Self::escape_xml(e)),
                        ),
                        _ => (String::new(), String::new()),
                    };
                    content.push_str(&format!(
                        "\n            <c r=\"{cell_ref}\"{style_attr}{type_attr}><f>{formula}</f>{cached_part}</c>"
                    ));
                }
            }
        }

        if current_row.is_some() {
            content.push_str("\n        </row>");
        }

        content.push_str("\n    </sheetData>");

        Self::write_data_validations(&mut content, sheet);
        Self::write_conditional_formats(&mut content, sheet, index, dxf_ids);

        if !table_numbers.is_empty() {
            content.push_str(&format!(
                "\n    <tableParts count=\"{}\">",
                table_numbers.len()
            ));
            for (i, _) in table_numbers.iter().enumerate() {
                content.push_str(&format!("\n        <tablePart r:id=\"rId{}\"/>", i + 1));
            }
            content.push_str("\n    </tableParts>");
        }

        content.push_str("\n</worksheet>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_data_validations(content: &mut String, sheet: &SheetModel) {
        if sheet.validations.is_empty() {
            return;
        }

        content.push_str(&format!(
            "\n    <dataValidations count=\"{}\">",
            sheet.validations.len()
        ));

        for (range, rule) in &sheet.validations {
            let operator_attr = match rule.kind {
                ValidationKind::Whole
                | ValidationKind::Decimal
                | ValidationKind::Date
                | ValidationKind::Time
                | ValidationKind::TextLength => {
                    format!(" operator=\"{}\"", rule.operator.as_str())
                }
                ValidationKind::List | ValidationKind::Custom => String::new(),
            };

            let show_input = if rule.show_input_message {
                " showInputMessage=\"1\""
            } else {
                ""
            };
            let show_error = if rule.show_error_message {
                " showErrorMessage=\"1\""
            } else {
                ""
            };
            let mut message_attrs = String::new();
            if !rule.input_title.is_empty() {
                message_attrs.push_str(&format!(
                    " promptTitle=\"{}\"",
                    Self::escape_xml(&rule.input_title)
                ));
            }
            if !rule.input_message.is_empty() {
                message_attrs.push_str(&format!(
                    " prompt=\"{}\"",
                    Self::escape_xml(&rule.input_message)
                ));
            }
            if !rule.error_title.is_empty() {
                message_attrs.push_str(&format!(
                    " errorTitle=\"{}\"",
                    Self::escape_xml(&rule.error_title)
                ));
            }
            if !rule.error_message.is_empty() {
                message_attrs.push_str(&format!(
                    " error=\"{}\"",
                    Self::escape_xml(&rule.error_message)
                ));
            }

            content.push_str(&format!(
                "\n        <dataValidation type=\"{}\"{} allowBlank=\"1\"{}{}{} sqref=\"{}\">",
                rule.kind.as_str(),
                operator_attr,
                show_input,
                show_error,
                message_attrs,
                range.to_a1()
            ));

            let formula1 = if rule.kind == ValidationKind::List && !rule.dropdown.is_empty() {
                format!("\"{}\"", rule.dropdown.join(","))
            } else {
                rule.formula1.clone()
            };
            if !formula1.is_empty() {
                content.push_str(&format!(
                    "\n            <formula1>{}</formula1>",
                    Self::escape_xml(&formula1)
                ));
            }
            if !rule.formula2.is_empty() {
                content.push_str(&format!(
                    "\n            <formula2>{}</formula2>",
                    Self::escape_xml(&rule.formula2)
                ));
            }

            content.push_str("\n        </dataValidation>");
        }

        content.push_str("\n    </dataValidations>");
    }

    fn write_conditional_formats(
        content: &mut String,
        sheet: &SheetModel,
        sheet_index: usize,
        dxf_ids: &HashMap<(usize, usize), u32>,
    ) {
        for (rule_idx, (range, rule)) in sheet.conditional_formats.iter().enumerate() {
            content.push_str(&format!(
                "\n    <conditionalFormatting sqref=\"{}\">",
                range.to_a1()
            ));

            let priority = rule_idx + 1;
            let dxf_attr = dxf_ids
                .get(&(sheet_index, rule_idx))
                .map(|id| format!(" dxfId=\"{id}\""))
                .unwrap_or_default();

            match &rule.kind {
                CfRuleKind::CellValue {
                    operator,
                    value1,
                    value2,
                } => {
                    content.push_str(&format!(
                        "\n        <cfRule type=\"cellIs\"{dxf_attr} priority=\"{priority}\" operator=\"{}\">\n            <formula>{}</formula>",
                        operator.as_str(),
                        Self::escape_xml(value1)
                    ));
                    if let Some(v2) = value2 {
                        content.push_str(&format!(
                            "\n            <formula>{}</formula>",
                            Self::escape_xml(v2)
                        ));
                    }
                    content.push_str("\n        </cfRule>");
                }
                CfRuleKind::Expression { formula } => {
                    content.push_str(&format!(
                        "\n        <cfRule type=\"expression\"{dxf_attr} priority=\"{priority}\">\n            <formula>{}</formula>\n        </cfRule>",
                        Self::escape_xml(formula)
                    ));
                }
                CfRuleKind::ColorScale { min, mid, max } => {
                    let anchors: Vec<&CfAnchor> = match mid {
                        Some(mid) => vec![min, mid, max],
                        None => vec![min, max],
                    };
                    content.push_str(&format!(
                        "\n        <cfRule type=\"colorScale\" priority=\"{priority}\">\n            <colorScale>"
                    ));
                    for anchor in &anchors {
                        content.push_str(&format!(
                            "\n                <cfvo type=\"{}\"{}/>",
                            anchor.kind.as_str(),
                            Self::val_attr(anchor)
                        ));
                    }
                    for anchor in &anchors {
                        content.push_str(&format!(
                            "\n                <color rgb=\"{}\"/>",
                            Self::argb_or_default(anchor.color.as_deref())
                        ));
                    }
                    content.push_str("\n            </colorScale>\n        </cfRule>");
                }
                CfRuleKind::DataBar { min, max, color } => {
                    content.push_str(&format!(
                        "\n        <cfRule type=\"dataBar\" priority=\"{priority}\">\n            <dataBar>"
                    ));
                    for anchor in [min, max] {
                        content.push_str(&format!(
                            "\n                <cfvo type=\"{}\"{}/>",
                            anchor.kind.as_str(),
                            Self::val_attr(anchor)
                        ));
                    }
                    content.push_str(&format!(
                        "\n                <color rgb=\"{}\"/>\n            </dataBar>\n        </cfRule>",
                        Self::argb_or_default(Some(color))
                    ));
                }
                CfRuleKind::IconSet { style, reverse } => {
                    let reverse_attr = if *reverse { " reverse=\"1\"" } else { "" };
                    content.push_str(&format!(
                        "\n        <cfRule type=\"iconSet\" priority=\"{priority}\">\n            <iconSet iconSet=\"{}\"{reverse_attr}>",
                        Self::escape_xml(style)
                    ));
                    // Evenly spaced percent thresholds, one per icon
                    let icons = Self::icon_count(style);
                    for i in 0..icons {
                        content.push_str(&format!(
                            "\n                <cfvo type=\"percent\" val=\"{}\"/>",
                            i * 100 / icons
                        ));
                    }
                    content.push_str("\n            </iconSet>\n        </cfRule>");
                }
            }

            content.push_str("\n    </conditionalFormatting>");
        }
    }

    fn val_attr(anchor: &CfAnchor) -> String {
        anchor
            .value
            .as_ref()
            .map(|v| format!(" val=\"{}\"", Self::escape_xml(v)))
            .unwrap_or_default()
    }

    fn argb_or_default(color: Option<&str>) -> String {
        color
            .and_then(|c| codec::encode_argb(c).ok())
            .unwrap_or_else(|| "FFFFFFFF".to_string())
    }

    /// Number of icons named by an icon set style (`3Arrows`, `5Rating`, ...)
    fn icon_count(style: &str) -> u32 {
        style
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .filter(|&n| (3..=5).contains(&n))
            .unwrap_or(3)
    }

    fn write_worksheet_rels<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet_index: usize,
        table_numbers: &[u32],
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(
            format!("xl/worksheets/_rels/sheet{}.xml.rels", sheet_index + 1),
            options,
        )?;

        let mut content = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        for (i, n) in table_numbers.iter().enumerate() {
            content.push_str(&format!(
                r#"
    <Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/table" Target="../tables/table{}.xml"/>"#,
                i + 1,
                n
            ));
        }

        content.push_str("\n</Relationships>");

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn write_table_part<W: Write + Seek>(
        zip: &mut zip::ZipWriter<W>,
        sheet: &SheetModel,
        table: &Table,
        number: u32,
    ) -> FileResult<()> {
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file(format!("xl/tables/table{number}.xml"), options)?;

        let range = table.range;
        let name = Self::escape_xml(&table.name);
        let mut content = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="{number}" name="{name}" displayName="{name}" ref="{range_ref}" totalsRowShown="0">
    <autoFilter ref="{range_ref}"/>"#,
            range_ref = range.to_a1()
        );

        // Column names come from the header row; unset headers get
        // positional names.
        let column_count = range.col_count();
        content.push_str(&format!(
            "\n    <tableColumns count=\"{column_count}\">"
        ));
        for (i, col) in (range.start.col..=range.end.col).enumerate() {
            let header = sheet
                .cell(range.start.row, col)
                .map(|c| c.value.display_text())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| format!("Column{}", i + 1));
            content.push_str(&format!(
                "\n        <tableColumn id=\"{}\" name=\"{}\"/>",
                i + 1,
                Self::escape_xml(&header)
            ));
        }
        content.push_str("\n    </tableColumns>");

        content.push_str(
            r#"
    <tableStyleInfo name="TableStyleMedium2" showFirstColumn="0" showLastColumn="0" showRowStripes="1" showColumnStripes="1"/>
</table>"#,
        );

        zip.write_all(content.as_bytes())?;
        Ok(())
    }

    fn escape_xml(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_count() {
        assert_eq!(ContainerWriter::icon_count("3Arrows"), 3);
        assert_eq!(ContainerWriter::icon_count("4ArrowsGray"), 4);
        assert_eq!(ContainerWriter::icon_count("5Rating"), 5);
        assert_eq!(ContainerWriter::icon_count("Stars"), 3);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            ContainerWriter::escape_xml(r#"a<b>&"c'"#),
            "a&lt;b&gt;&amp;&quot;c&apos;"
        );
    }
}
