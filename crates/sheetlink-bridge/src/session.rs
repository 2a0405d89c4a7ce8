//! Host-specific automation layer built on top of the generic IDispatch
//! wrapper.
//!
//! Attaches to the user's already-running host instance rather than
//! creating one: the bridge never opens or closes documents, it only
//! operates on workbooks the user has open. Host-wide settings suppressed
//! on attach (screen updating, event firing) are restored on shutdown so
//! the session is returned in the state it was found.

#![cfg(windows)]

use std::collections::HashMap;

use windows::Win32::Foundation::HGLOBAL;
use windows::Win32::System::DataExchange::{CloseClipboard, GetClipboardData, OpenClipboard};
use windows::Win32::System::Memory::{GlobalLock, GlobalSize, GlobalUnlock};
use windows::Win32::System::Ole::CF_DIB;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use sheetlink_protocol::{
    RawBorder, RawCellStyle, RawConditionalFormat, RawFont, RawFormat, RawInterior, RawValidation,
    Scalar, TableInfo, WorkbookInfo, EDGE_BOTTOM, EDGE_LEFT, EDGE_RIGHT, EDGE_TOP,
};

use crate::bmp::dib_to_bmp;
use crate::dispatch::{
    variant_bool, variant_dispatch, variant_empty, variant_f64, variant_get_bool, variant_get_f64,
    variant_get_i64, variant_get_string, variant_i32, variant_str, DispatchObject,
};

/// xlLineStyleNone / xlPatternNone.
const STYLE_NONE: i64 = -4142;
/// xlValidAlertStop.
const ALERT_STOP: i32 = 1;

/// An attached host application instance and the workbooks retained from it.
pub struct HostSession {
    app: DispatchObject,
    /// Map from handle IDs to retained workbook dispatch objects.
    workbooks: HashMap<u64, DispatchObject>,
    next_handle: u64,
    prev_screen_updating: bool,
    prev_enable_events: bool,
}

impl HostSession {
    /// Attach to the running host instance and suppress screen updates and
    /// event firing for the duration of the session.
    pub fn attach() -> Result<Self, String> {
        let app = DispatchObject::attach_active("Excel.Application")?;

        let prev_screen_updating = variant_get_bool(&app.get_property("ScreenUpdating")?)
            .unwrap_or(true);
        let prev_enable_events =
            variant_get_bool(&app.get_property("EnableEvents")?).unwrap_or(true);

        app.set_property("ScreenUpdating", variant_bool(false))?;
        app.set_property("EnableEvents", variant_bool(false))?;

        Ok(Self {
            app,
            workbooks: HashMap::new(),
            next_handle: 1,
            prev_screen_updating,
            prev_enable_events,
        })
    }

    /// Restore the suppressed host settings and release the retained
    /// workbook objects. Never quits the host or closes documents.
    pub fn restore(&mut self) -> Result<(), String> {
        self.workbooks.clear();
        self.app
            .set_property("EnableEvents", variant_bool(self.prev_enable_events))?;
        self.app
            .set_property("ScreenUpdating", variant_bool(self.prev_screen_updating))?;
        Ok(())
    }

    /// The host's open-workbook list, in collection order.
    pub fn list_workbooks(&self) -> Result<Vec<WorkbookInfo>, String> {
        let collection = self.app.get_child("Workbooks")?;
        let count = self.collection_count(&collection)?;
        let mut infos = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let workbook = collection.get_indexed("Item", &variant_i32(i))?;
            let name = variant_get_string(&workbook.get_property("Name")?).unwrap_or_default();
            let full_name =
                variant_get_string(&workbook.get_property("FullName")?).unwrap_or_default();
            infos.push(WorkbookInfo {
                index: i as u32,
                name,
                full_name,
            });
        }
        Ok(infos)
    }

    /// Retain the workbook at the given 1-based position. Returns a handle.
    pub fn attach_workbook(&mut self, index: u32) -> Result<u64, String> {
        let collection = self.app.get_child("Workbooks")?;
        let workbook = collection.get_indexed("Item", &variant_i32(index as i32))?;
        let handle = self.next_handle;
        self.next_handle += 1;
        self.workbooks.insert(handle, workbook);
        Ok(handle)
    }

    pub fn list_sheets(&self, wb_handle: u64) -> Result<Vec<String>, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        let count = self.collection_count(&sheets)?;
        let mut names = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let sheet = sheets.get_indexed("Item", &variant_i32(i))?;
            names.push(variant_get_string(&sheet.get_property("Name")?).unwrap_or_default());
        }
        Ok(names)
    }

    /// Insert a new sheet immediately after the active one, then rename it.
    pub fn add_sheet_after_active(&self, wb_handle: u64, name: &str) -> Result<(), String> {
        let workbook = self.workbook(wb_handle)?;
        let active = workbook.get_child("ActiveSheet")?;
        let active_index = variant_get_i64(&active.get_property("Index")?)
            .ok_or_else(|| "ActiveSheet.Index is not numeric".to_string())?;

        let sheets = workbook.get_child("Worksheets")?;
        // Worksheets.Add(Before, After): inserting after the active sheet
        sheets.invoke_method("Add", &[variant_empty(), variant_dispatch(&active)])?;

        let added = sheets.get_indexed("Item", &variant_i32(active_index as i32 + 1))?;
        added.set_property("Name", variant_str(name))
    }

    /// Duplicate a sheet so the copy lands immediately after the source,
    /// then rename the copy.
    pub fn copy_sheet_after(
        &self,
        wb_handle: u64,
        source: &str,
        new_name: &str,
    ) -> Result<(), String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        let src = sheets.get_indexed("Item", &variant_str(source))?;
        let src_index = variant_get_i64(&src.get_property("Index")?)
            .ok_or_else(|| format!("'{source}'.Index is not numeric"))?;

        src.invoke_method("Copy", &[variant_empty(), variant_dispatch(&src)])?;

        let copy = sheets.get_indexed("Item", &variant_i32(src_index as i32 + 1))?;
        copy.set_property("Name", variant_str(new_name))
    }

    pub fn set_cell_value(
        &self,
        wb_handle: u64,
        sheet: &str,
        cell: &str,
        value: &Scalar,
    ) -> Result<(), String> {
        let range = self.range(wb_handle, sheet, cell)?;
        let variant = match value {
            Scalar::Null => variant_empty(),
            Scalar::Bool(b) => variant_bool(*b),
            Scalar::Number(n) => variant_f64(*n),
            Scalar::String(s) => variant_str(s),
        };
        range.set_property("Value", variant)
    }

    pub fn set_cell_formula(
        &self,
        wb_handle: u64,
        sheet: &str,
        cell: &str,
        formula: &str,
    ) -> Result<(), String> {
        let range = self.range(wb_handle, sheet, cell)?;
        range.set_property("Formula", variant_str(formula))
    }

    /// A cell's displayed text: what the host shows after number
    /// formatting, not the underlying typed value.
    pub fn get_cell_text(&self, wb_handle: u64, sheet: &str, cell: &str) -> Result<String, String> {
        let range = self.range(wb_handle, sheet, cell)?;
        let text = range.get_property("Text")?;
        Ok(variant_get_string(&text).unwrap_or_default())
    }

    /// A cell's formula string. The host reports the literal value text
    /// for cells without a formula.
    pub fn get_cell_formula(
        &self,
        wb_handle: u64,
        sheet: &str,
        cell: &str,
    ) -> Result<String, String> {
        let range = self.range(wb_handle, sheet, cell)?;
        let formula = range.get_property("Formula")?;
        Ok(variant_get_string(&formula).unwrap_or_default())
    }

    pub fn get_used_range(&self, wb_handle: u64, sheet: &str) -> Result<String, String> {
        let used = self.sheet(wb_handle, sheet)?.get_child("UsedRange")?;
        let address = used.get_property("Address")?;
        variant_get_string(&address).ok_or_else(|| "UsedRange.Address is not a string".to_string())
    }

    pub fn list_tables(&self, wb_handle: u64, sheet: &str) -> Result<Vec<TableInfo>, String> {
        let tables = self.sheet(wb_handle, sheet)?.get_child("ListObjects")?;
        self.named_ranges(&tables, "Range")
    }

    pub fn list_pivot_tables(&self, wb_handle: u64, sheet: &str) -> Result<Vec<TableInfo>, String> {
        let pivots = self.sheet(wb_handle, sheet)?.get_child("PivotTables")?;
        self.named_ranges(&pivots, "TableRange1")
    }

    /// Create a table over a range and name it.
    pub fn add_table(
        &self,
        wb_handle: u64,
        sheet: &str,
        range: &str,
        name: &str,
    ) -> Result<(), String> {
        let worksheet = self.sheet(wb_handle, sheet)?;
        let source = worksheet.get_indexed("Range", &variant_str(range))?;
        let tables = worksheet.get_child("ListObjects")?;
        // ListObjects.Add(SourceType=xlSrcRange, Source, LinkSource, HasHeaders=xlYes)
        let table = tables.invoke_child(
            "Add",
            &[
                variant_i32(1),
                variant_dispatch(&source),
                variant_empty(),
                variant_i32(1),
            ],
        )?;
        table.set_property("Name", variant_str(name))
    }

    /// Read a cell's font, interior and border codes as the host stores
    /// them. Decoding into semantic styles happens on the client side.
    pub fn read_cell_style(
        &self,
        wb_handle: u64,
        sheet: &str,
        cell: &str,
    ) -> Result<RawCellStyle, String> {
        let range = self.range(wb_handle, sheet, cell)?;

        let font_obj = range.get_child("Font")?;
        let font = Some(RawFont {
            size: variant_get_f64(&font_obj.get_property("Size")?).unwrap_or(11.0),
            bold: variant_get_bool(&font_obj.get_property("Bold")?).unwrap_or(false),
            italic: variant_get_bool(&font_obj.get_property("Italic")?).unwrap_or(false),
            color: variant_get_i64(&font_obj.get_property("Color")?).unwrap_or(0),
        });

        let interior_obj = range.get_child("Interior")?;
        let pattern =
            variant_get_i64(&interior_obj.get_property("Pattern")?).unwrap_or(STYLE_NONE) as i32;
        let interior_color = if i64::from(pattern) == STYLE_NONE {
            None
        } else {
            variant_get_i64(&interior_obj.get_property("Color")?)
        };
        let interior = Some(RawInterior {
            pattern,
            color: interior_color,
        });

        let mut borders = Vec::with_capacity(4);
        for edge in [EDGE_LEFT, EDGE_TOP, EDGE_BOTTOM, EDGE_RIGHT] {
            let border = range.get_indexed("Borders", &variant_i32(edge))?;
            let line_style =
                variant_get_i64(&border.get_property("LineStyle")?).unwrap_or(STYLE_NONE) as i32;
            let color = if i64::from(line_style) == STYLE_NONE {
                None
            } else {
                variant_get_i64(&border.get_property("Color")?)
            };
            borders.push(RawBorder {
                edge,
                line_style,
                color,
            });
        }

        Ok(RawCellStyle {
            font,
            interior,
            borders,
        })
    }

    /// Apply a data validation rule to a range, replacing any rule already
    /// on it.
    pub fn add_validation(
        &self,
        wb_handle: u64,
        sheet: &str,
        range: &str,
        rule: &RawValidation,
    ) -> Result<(), String> {
        let target = self.sheet(wb_handle, sheet)?.get_indexed("Range", &variant_str(range))?;
        let validation = target.get_child("Validation")?;

        // Add fails if a rule already exists; an empty range has nothing
        // to delete, so the failure there is ignored.
        let _ = validation.invoke_method("Delete", &[]);

        // Validation.Add(Type, AlertStyle, Operator, Formula1, Formula2)
        let mut args = vec![
            variant_i32(rule.kind),
            variant_i32(ALERT_STOP),
            variant_i32(rule.operator),
            variant_str(&rule.formula1),
        ];
        if !rule.formula2.is_empty() {
            args.push(variant_str(&rule.formula2));
        }
        validation.invoke_method("Add", &args)?;

        if rule.show_input {
            validation.set_property("InputTitle", variant_str(&rule.input_title))?;
            validation.set_property("InputMessage", variant_str(&rule.input_message))?;
            validation.set_property("ShowInput", variant_bool(true))?;
        }
        if rule.show_error {
            validation.set_property("ErrorTitle", variant_str(&rule.error_title))?;
            validation.set_property("ErrorMessage", variant_str(&rule.error_message))?;
            validation.set_property("ShowError", variant_bool(true))?;
        }
        Ok(())
    }

    /// Replace the conditional formatting on a range with one rule.
    pub fn add_conditional_format(
        &self,
        wb_handle: u64,
        sheet: &str,
        range: &str,
        rule: &RawConditionalFormat,
    ) -> Result<(), String> {
        let target = self.sheet(wb_handle, sheet)?.get_indexed("Range", &variant_str(range))?;
        let conditions = target.get_child("FormatConditions")?;
        conditions.invoke_method("Delete", &[])?;

        match rule {
            RawConditionalFormat::CellValue {
                operator,
                value1,
                value2,
                format,
            } => {
                // FormatConditions.Add(Type=xlCellValue, Operator, Formula1, Formula2)
                let mut args = vec![
                    variant_i32(1),
                    variant_i32(*operator),
                    variant_str(value1),
                ];
                if let Some(value2) = value2 {
                    args.push(variant_str(value2));
                }
                let condition = conditions.invoke_child("Add", &args)?;
                if let Some(format) = format {
                    apply_condition_format(&condition, format)?;
                }
            }
            RawConditionalFormat::Expression { formula, format } => {
                // Type=xlExpression; the operator slot is unused
                let condition = conditions.invoke_child(
                    "Add",
                    &[variant_i32(2), variant_empty(), variant_str(formula)],
                )?;
                if let Some(format) = format {
                    apply_condition_format(&condition, format)?;
                }
            }
            RawConditionalFormat::ColorScale { anchors } => {
                let scale =
                    conditions.invoke_child("AddColorScale", &[variant_i32(anchors.len() as i32)])?;
                let criteria = scale.get_child("ColorScaleCriteria")?;
                for (i, anchor) in anchors.iter().enumerate() {
                    let criterion = criteria.get_indexed("Item", &variant_i32(i as i32 + 1))?;
                    criterion.set_property("Type", variant_i32(anchor.kind))?;
                    if let Some(value) = &anchor.value {
                        criterion.set_property("Value", variant_str(value))?;
                    }
                    criterion.set_property("FormatColor", variant_f64(anchor.color as f64))?;
                }
            }
            RawConditionalFormat::DataBar { color } => {
                let bar = conditions.invoke_child("AddDatabar", &[])?;
                if let Some(color) = color {
                    bar.set_property("BarColor", variant_f64(*color as f64))?;
                }
            }
        }
        Ok(())
    }

    /// Copy a range to the clipboard as a screen-resolution bitmap and
    /// return it as a base64-encoded BMP.
    pub fn capture_picture(
        &self,
        wb_handle: u64,
        sheet: &str,
        range: &str,
    ) -> Result<String, String> {
        let target = self.sheet(wb_handle, sheet)?.get_indexed("Range", &variant_str(range))?;
        // CopyPicture(Appearance=xlScreen, Format=xlBitmap)
        target.invoke_method("CopyPicture", &[variant_i32(1), variant_i32(2)])?;

        let dib = read_clipboard_dib()?;
        let bmp = dib_to_bmp(&dib)?;
        Ok(BASE64.encode(bmp))
    }

    /// Evaluate macro code in the host's expression evaluator.
    pub fn run_macro(&self, wb_handle: u64, code: &str) -> Result<(), String> {
        let app = self.workbook(wb_handle)?.get_child("Application")?;
        app.invoke_method("Evaluate", &[variant_str(code)])?;
        Ok(())
    }

    /// Add a named standard module to the workbook's macro project and
    /// insert the source text line by line.
    pub fn add_macro_module(&self, wb_handle: u64, name: &str, code: &str) -> Result<(), String> {
        let project = self.workbook(wb_handle)?.get_child("VBProject")?;
        let components = project.get_child("VBComponents")?;

        // vbext_ct_StdModule = 1
        let module = components.invoke_child("Add", &[variant_i32(1)])?;
        module.set_property("Name", variant_str(name))?;

        let code_module = module.get_child("CodeModule")?;
        for (i, line) in code.lines().enumerate() {
            code_module.invoke_method(
                "InsertLines",
                &[variant_i32(i as i32 + 1), variant_str(line)],
            )?;
        }
        Ok(())
    }

    /// Save through the host's own save, honoring its format rules.
    pub fn save_workbook(&self, wb_handle: u64) -> Result<(), String> {
        self.workbook(wb_handle)?.invoke_method("Save", &[])?;
        Ok(())
    }

    // -- Object lookup helpers --

    fn workbook(&self, handle: u64) -> Result<&DispatchObject, String> {
        self.workbooks
            .get(&handle)
            .ok_or_else(|| format!("Unknown workbook handle: {handle}"))
    }

    fn sheet(&self, wb_handle: u64, name: &str) -> Result<DispatchObject, String> {
        let sheets = self.workbook(wb_handle)?.get_child("Worksheets")?;
        sheets
            .get_indexed("Item", &variant_str(name))
            .map_err(|e| format!("no sheet '{name}': {e}"))
    }

    fn range(&self, wb_handle: u64, sheet: &str, cell: &str) -> Result<DispatchObject, String> {
        self.sheet(wb_handle, sheet)?
            .get_indexed("Range", &variant_str(cell))
    }

    fn collection_count(&self, collection: &DispatchObject) -> Result<i32, String> {
        variant_get_i64(&collection.get_property("Count")?)
            .map(|c| c as i32)
            .ok_or_else(|| "collection Count is not numeric".to_string())
    }

    /// Enumerate a collection of named, ranged objects (tables, pivots).
    fn named_ranges(
        &self,
        collection: &DispatchObject,
        range_property: &str,
    ) -> Result<Vec<TableInfo>, String> {
        let count = self.collection_count(collection)?;
        let mut infos = Vec::with_capacity(count as usize);
        for i in 1..=count {
            let item = collection.get_indexed("Item", &variant_i32(i))?;
            let name = variant_get_string(&item.get_property("Name")?).unwrap_or_default();
            let item_range = item.get_child(range_property)?;
            let address =
                variant_get_string(&item_range.get_property("Address")?).unwrap_or_default();
            infos.push(TableInfo {
                name,
                range: address,
            });
        }
        Ok(infos)
    }
}

/// Apply the format half of a conditional rule to a condition object.
fn apply_condition_format(condition: &DispatchObject, format: &RawFormat) -> Result<(), String> {
    let font = condition.get_child("Font")?;
    if format.bold {
        font.set_property("Bold", variant_bool(true))?;
    }
    if format.italic {
        font.set_property("Italic", variant_bool(true))?;
    }
    if let Some(color) = format.font_color {
        font.set_property("Color", variant_f64(color as f64))?;
    }
    if let Some(size) = format.font_size {
        font.set_property("Size", variant_f64(size))?;
    }
    if let Some(color) = format.fill_color {
        let interior = condition.get_child("Interior")?;
        interior.set_property("Color", variant_f64(color as f64))?;
    }
    Ok(())
}

/// Read the CF_DIB payload currently on the clipboard.
fn read_clipboard_dib() -> Result<Vec<u8>, String> {
    unsafe {
        OpenClipboard(None).map_err(|e| format!("OpenClipboard failed: {e}"))?;
        let result = read_dib_locked();
        let _ = CloseClipboard();
        result
    }
}

unsafe fn read_dib_locked() -> Result<Vec<u8>, String> {
    let handle = GetClipboardData(CF_DIB.0 as u32)
        .map_err(|e| format!("no DIB image on the clipboard: {e}"))?;
    let hglobal = HGLOBAL(handle.0);
    let ptr = GlobalLock(hglobal);
    if ptr.is_null() {
        return Err("GlobalLock failed on clipboard data".to_string());
    }
    let size = GlobalSize(hglobal);
    let bytes = std::slice::from_raw_parts(ptr as *const u8, size).to_vec();
    let _ = GlobalUnlock(hglobal);
    Ok(bytes)
}
