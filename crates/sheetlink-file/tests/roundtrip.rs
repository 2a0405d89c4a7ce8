//! End-to-end container tests: build a document through the backend or the
//! model, write it to disk, read it back, and assert the semantic content
//! survived.

use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use sheetlink_core::{
    BorderEdge, BorderLine, BorderSide, CellStyle, CellValue, CfAnchor, CfAnchorKind, CfOperator,
    CfRule, CfRuleKind, DataValidationRule, FillStyle, FontStyle, ValidationKind,
    ValidationOperator, Workbook, Worksheet,
};
use sheetlink_file::model::Cell;
use sheetlink_file::{ContainerReader, ContainerWriter, FileWorkbook, WorkbookModel};

#[test]
fn values_and_formulas_survive_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("values.xlsx");

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.set_value("A1", &CellValue::Number(42.0)).unwrap();
        sheet
            .set_value("B1", &CellValue::Text("total <&>".into()))
            .unwrap();
        sheet.set_value("C1", &CellValue::Boolean(true)).unwrap();
        sheet.set_formula("C3", "=SUM(A1:A2)").unwrap();
    }
    wb.save().unwrap();

    let mut reloaded = FileWorkbook::open(&path).unwrap();
    let mut sheet = reloaded.sheet("Sheet1").unwrap();
    assert_eq!(sheet.value("A1").unwrap(), "42");
    assert_eq!(sheet.value("B1").unwrap(), "total <&>");
    assert_eq!(sheet.value("C1").unwrap(), "TRUE");
    assert_eq!(sheet.formula("C3").unwrap(), "=SUM(A1:A2)");
    // Writes grew the dimension and it came back with the document
    assert_eq!(sheet.used_range().unwrap().to_a1(), "A1:C3");
}

#[test]
fn formula_cached_results_serve_value_reads() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cached.xlsx");

    let mut model = WorkbookModel::new(&path);
    model.sheets[0].put_cell(
        0,
        0,
        Cell::new(CellValue::Formula {
            text: "A2*2".into(),
            cached: Some(Box::new(CellValue::Number(84.0))),
        }),
    );
    model.sheets[0].put_cell(
        1,
        0,
        Cell::new(CellValue::Formula {
            text: "CONCAT(\"a\",\"b\")".into(),
            cached: Some(Box::new(CellValue::Text("ab".into()))),
        }),
    );
    ContainerWriter::write_file(&model, &path).unwrap();

    let mut wb = FileWorkbook::open(&path).unwrap();
    let mut sheet = wb.sheet("Sheet1").unwrap();
    // Value reads fall back to the cached result of the stored formula
    assert_eq!(sheet.value("A1").unwrap(), "84");
    assert_eq!(sheet.value("A2").unwrap(), "ab");
    assert_eq!(sheet.formula("A1").unwrap(), "=A2*2");
}

#[test]
fn styles_survive_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("styled.xlsx");

    let style = CellStyle {
        // Edge order matches the serialized left/right/top/bottom order so
        // the reloaded style compares equal structurally.
        borders: vec![
            BorderEdge::new(BorderSide::Left, BorderLine::Dash).with_color("#0000FF"),
            BorderEdge::new(BorderSide::Bottom, BorderLine::Double),
        ],
        font: Some(
            FontStyle::new()
                .with_bold(true)
                .with_size(14.0)
                .with_color("#FF0000"),
        ),
        fill: Some(FillStyle::solid("#FFFF00")),
        number_format: Some("0.00".to_string()),
        decimal_places: Some(2),
    };

    let mut model = WorkbookModel::new(&path);
    let idx = model.styles.get_or_insert(style.clone());
    let mut cell = Cell::new(CellValue::Number(3.5));
    cell.style = Some(idx);
    model.sheets[0].put_cell(1, 1, cell);
    ContainerWriter::write_file(&model, &path).unwrap();

    let mut wb = FileWorkbook::open(&path).unwrap();
    let mut sheet = wb.sheet("Sheet1").unwrap();
    assert_eq!(sheet.cell_style("B2").unwrap(), style);
    assert_eq!(sheet.value("B2").unwrap(), "3.5");
    // Unstyled cells report the plain default
    assert!(sheet.cell_style("Z99").unwrap().is_plain());
}

#[test]
fn validation_rules_survive_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("validated.xlsx");

    let list_rule = DataValidationRule::list(["Yes", "No"])
        .with_input_message("Answer", "Pick one")
        .with_error_message("Invalid", "Yes or No only");
    let bounds_rule = DataValidationRule::whole_number(ValidationOperator::Between, "1")
        .with_formula2("100");

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.add_data_validation("B2:B10", &list_rule).unwrap();
        sheet.add_data_validation("C1:C5", &bounds_rule).unwrap();
    }
    wb.save().unwrap();

    let model = ContainerReader::read_file(&path).unwrap();
    let validations = &model.sheets[0].validations;
    assert_eq!(validations.len(), 2);
    assert_eq!(validations[0].0.to_a1(), "B2:B10");
    assert_eq!(validations[0].1, list_rule);
    assert_eq!(validations[0].1.kind, ValidationKind::List);
    assert_eq!(validations[0].1.dropdown, vec!["Yes", "No"]);
    assert_eq!(validations[1].0.to_a1(), "C1:C5");
    assert_eq!(validations[1].1, bounds_rule);
}

#[test]
fn conditional_formats_survive_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("conditional.xlsx");

    let highlight = CellStyle {
        font: Some(FontStyle::new().with_bold(true)),
        fill: Some(FillStyle::solid("#FFC7CE")),
        ..Default::default()
    };
    let cell_rule = CfRule::new(CfRuleKind::CellValue {
        operator: CfOperator::GreaterThan,
        value1: "100".into(),
        value2: None,
    })
    .with_format(highlight.clone());
    let expr_rule = CfRule::new(CfRuleKind::Expression {
        formula: "$A1>$B1".into(),
    })
    .with_format(highlight);
    let scale_rule = CfRule::new(CfRuleKind::ColorScale {
        min: CfAnchor::new(CfAnchorKind::Min).with_color("#FF0000"),
        mid: Some(
            CfAnchor::new(CfAnchorKind::Percentile)
                .with_value("50")
                .with_color("#FFFF00"),
        ),
        max: CfAnchor::new(CfAnchorKind::Max).with_color("#00FF00"),
    });
    let bar_rule = CfRule::new(CfRuleKind::DataBar {
        min: CfAnchor::new(CfAnchorKind::Min),
        max: CfAnchor::new(CfAnchorKind::Max),
        color: "#638EC6".into(),
    });
    let icon_rule = CfRule::new(CfRuleKind::IconSet {
        style: "3Arrows".into(),
        reverse: true,
    });

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.add_conditional_format("A1:A10", &cell_rule).unwrap();
        sheet.add_conditional_format("B1:B10", &expr_rule).unwrap();
        sheet.add_conditional_format("C1:C10", &scale_rule).unwrap();
        sheet.add_conditional_format("D1:D10", &bar_rule).unwrap();
        sheet.add_conditional_format("E1:E10", &icon_rule).unwrap();
    }
    wb.save().unwrap();

    let model = ContainerReader::read_file(&path).unwrap();
    let formats = &model.sheets[0].conditional_formats;
    assert_eq!(formats.len(), 5);
    assert_eq!(formats[0].0.to_a1(), "A1:A10");
    assert_eq!(formats[0].1, cell_rule);
    assert_eq!(formats[1].1, expr_rule);
    assert_eq!(formats[2].1, scale_rule);
    assert_eq!(formats[3].1, bar_rule);
    assert_eq!(formats[4].1, icon_rule);
}

#[test]
fn copy_sheet_lands_adjacent_and_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("copied.xlsx");

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.set_value("A1", &CellValue::Text("seed".into())).unwrap();
    }
    wb.create_sheet("Data").unwrap();
    wb.copy_sheet("Sheet1", "Sheet1 Copy").unwrap();
    wb.save().unwrap();

    let mut reloaded = FileWorkbook::open(&path).unwrap();
    assert_eq!(
        reloaded.sheet_names().unwrap(),
        vec!["Sheet1", "Sheet1 Copy", "Data"]
    );
    let mut copy = reloaded.sheet("Sheet1 Copy").unwrap();
    assert_eq!(copy.value("A1").unwrap(), "seed");
}

#[test]
fn tables_survive_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tables.xlsx");

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        for (cell, header) in [("A1", "SKU"), ("B1", "Qty"), ("C1", "Price")] {
            sheet
                .set_value(cell, &CellValue::Text(header.into()))
                .unwrap();
        }
        sheet.set_value("A2", &CellValue::Text("W-1".into())).unwrap();
        sheet.add_table("A1:C5", "Inventory").unwrap();
    }
    wb.save().unwrap();

    let mut reloaded = FileWorkbook::open(&path).unwrap();
    let mut sheet = reloaded.sheet("Sheet1").unwrap();
    let tables = sheet.tables().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].name, "Inventory");
    assert_eq!(tables[0].range.to_a1(), "A1:C5");
}

#[test]
fn save_ignores_path_length_limits() {
    let dir = tempdir().unwrap();
    // Two long directory components push the full path well past the
    // 207-character cap some format libraries enforce.
    let long = "d".repeat(120);
    let nested = dir.path().join(&long).join(&long);
    std::fs::create_dir_all(&nested).unwrap();
    let path = nested.join("workbook.xlsx");
    assert!(path.to_string_lossy().len() > 207);

    let mut wb = FileWorkbook::create(&path);
    {
        let mut sheet = wb.sheet("Sheet1").unwrap();
        sheet.set_value("A1", &CellValue::Number(1.0)).unwrap();
    }
    wb.save().unwrap();

    let mut reloaded = FileWorkbook::open(&path).unwrap();
    let mut sheet = reloaded.sheet("Sheet1").unwrap();
    assert_eq!(sheet.value("A1").unwrap(), "1");
}

/// Pivot tables are discovered through worksheet relationships; the writer
/// never emits them, so the fixture is assembled by hand.
#[test]
fn pivot_tables_are_discovered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("pivots.xlsx");

    let file = std::fs::File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    let parts: &[(&str, &str)] = &[
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
    <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#,
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#,
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
    <sheets>
        <sheet name="Report" sheetId="1" r:id="rId1"/>
    </sheets>
</workbook>"#,
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#,
        ),
        (
            "xl/worksheets/sheet1.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
    <sheetData/>
</worksheet>"#,
        ),
        (
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/pivotTable" Target="../pivotTables/pivotTable1.xml"/>
</Relationships>"#,
        ),
        (
            "xl/pivotTables/pivotTable1.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<pivotTableDefinition xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" name="SalesPivot">
    <location ref="A3:C20" firstHeaderRow="1" firstDataRow="2" firstDataCol="1"/>
</pivotTableDefinition>"#,
        ),
    ];
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();

    let mut wb = FileWorkbook::open(&path).unwrap();
    let mut sheet = wb.sheet("Report").unwrap();
    let pivots = sheet.pivot_tables().unwrap();
    assert_eq!(pivots.len(), 1);
    assert_eq!(pivots[0].name, "SalesPivot");
    assert_eq!(pivots[0].range.to_a1(), "A3:C20");
}
