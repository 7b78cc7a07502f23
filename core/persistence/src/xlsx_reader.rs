//! FILENAME: core/persistence/src/xlsx_reader.rs
//! PURPOSE: Loads an XLSX file into a `Workbook`.
//! CONTEXT: calamine supplies values and formulas; the layout reader supplies
//! merges, hidden units, sizes and cell styles, which calamine does not expose.

use std::path::Path;

use calamine::{open_workbook, CellErrorType, Data, Reader, Xlsx};
use engine::{Cell, CellError, CellRef, CellValue, RegionIndex, SheetStore, Worksheet};
use log::{info, warn};

use crate::xlsx_layout::{read_layout, SheetLayout};
use crate::{PersistenceError, Workbook};

fn convert_error(error: &CellErrorType) -> CellError {
    match error {
        CellErrorType::Div0 => CellError::Div0,
        CellErrorType::NA => CellError::NA,
        CellErrorType::Name => CellError::Name,
        CellErrorType::Null => CellError::Null,
        CellErrorType::Num => CellError::Num,
        CellErrorType::Ref => CellError::Ref,
        CellErrorType::Value | CellErrorType::GettingData => CellError::Value,
    }
}

fn convert_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(convert_error(e)),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

fn apply_layout(sheet: &mut Worksheet, layout: SheetLayout, cell_formats: &[engine::CellStyle]) {
    for (pos, xf) in layout.cell_styles {
        match cell_formats.get(xf) {
            Some(style) if !style.is_default() => {
                let index = sheet.styles.get_or_create(style.clone());
                sheet.cell_mut(pos).style_index = index;
            }
            Some(_) => {}
            None => warn!(target: "FILE", "{}: {} refers to missing style {}", sheet.name, pos, xf),
        }
    }

    for range in layout.merges {
        if let Err(e) = sheet.add_region(range) {
            warn!(target: "FILE", "{}: skipping merged region {}: {}", sheet.name, range, e);
        }
    }

    sheet.hidden_rows = layout.hidden_rows;
    sheet.hidden_columns = layout.hidden_columns;
    sheet.row_heights = layout.row_heights;
    sheet.column_widths = layout.column_widths;
}

/// Reads every sheet of the file at `path`.
pub fn load_xlsx(path: &Path) -> Result<Workbook, PersistenceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let sheet_names = workbook.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }

    let layout = match read_layout(path, &sheet_names) {
        Ok(layout) => layout,
        Err(e) => {
            warn!(target: "FILE", "{}: layout unreadable, loading values only: {}", path.display(), e);
            Default::default()
        }
    };
    let mut layouts = layout.sheets.into_iter();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let mut sheet = Worksheet::new(sheet_name.as_str());

        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| PersistenceError::InvalidFormat(e.to_string()))?;
        // calamine ranges start at the first used cell, 0-based
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));
        for (row, col, data) in range.used_cells() {
            let value = convert_value(data);
            if value == CellValue::Empty {
                continue;
            }
            let pos = CellRef::new(row_offset + row as u32 + 1, col_offset + col as u32 + 1);
            sheet.set_cell(pos, Cell { formula: None, value, style_index: 0 });
        }

        match workbook.worksheet_formula(sheet_name) {
            Ok(formulas) => {
                let (row_offset, col_offset) = formulas.start().unwrap_or((0, 0));
                for (row, col, formula) in formulas.used_cells() {
                    if formula.is_empty() {
                        continue;
                    }
                    let pos = CellRef::new(row_offset + row as u32 + 1, col_offset + col as u32 + 1);
                    sheet.cell_mut(pos).formula = Some(format!("={}", formula));
                }
            }
            Err(e) => warn!(target: "FILE", "{}: formulas unreadable: {}", sheet_name, e),
        }

        if let Some(sheet_layout) = layouts.next() {
            apply_layout(&mut sheet, sheet_layout, &layout.cell_formats);
        }

        info!(
            target: "FILE",
            "loaded sheet '{}': {} cell(s), {} merged region(s)",
            sheet.name,
            sheet.grid.cells.len(),
            sheet.merges.all().len()
        );
        sheets.push(sheet);
    }

    Ok(Workbook {
        sheets,
        active_sheet: 0,
    })
}
