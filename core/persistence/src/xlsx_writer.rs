//! FILENAME: core/persistence/src/xlsx_writer.rs
//! PURPOSE: Saves a `Workbook` as an XLSX file.
//! CONTEXT: Writes values, formulas with their cached results, cell styles,
//! merged regions, hidden rows/columns and unit sizes. Coordinates are
//! 1-based in the engine and 0-based in rust_xlsxwriter.

use std::path::Path;

use engine::{BorderLineStyle, BorderStyle, Cell, CellStyle, CellValue, Color, RegionIndex, Worksheet};
use log::info;
use rust_xlsxwriter::{
    ColNum, Format, FormatBorder, FormatPattern, FormatUnderline, Formula, RowNum, Workbook as XlsxWorkbook,
    Worksheet as XlsxWorksheet,
};

use crate::{PersistenceError, Workbook};

pub fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet)?;
    }

    xlsx.save(path)?;
    info!(target: "FILE", "saved {} sheet(s) to {}", workbook.sheets.len(), path.display());
    Ok(())
}

fn row_num(row: u32) -> RowNum {
    row - 1
}

fn col_num(col: u32) -> ColNum {
    (col - 1) as ColNum
}

fn write_sheet(worksheet: &mut XlsxWorksheet, sheet: &Worksheet) -> Result<(), PersistenceError> {
    let formats: Vec<Format> = sheet.styles.all_styles().iter().map(convert_style_to_format).collect();
    let format_of = |cell: Option<&Cell>| -> &Format {
        let index = cell.map(|c| c.style_index).unwrap_or(0);
        formats.get(index).unwrap_or(&formats[0])
    };

    // Column widths are character units, row heights points
    for (col, width) in &sheet.column_widths {
        worksheet.set_column_width(col_num(*col), *width)?;
    }
    for (row, height) in &sheet.row_heights {
        worksheet.set_row_height(row_num(*row), *height)?;
    }
    for row in &sheet.hidden_rows {
        worksheet.set_row_hidden(row_num(*row))?;
    }
    for col in &sheet.hidden_columns {
        worksheet.set_column_hidden(col_num(*col))?;
    }

    // merge_range fills the region with formatted blanks; cells are written over it
    for region in sheet.merges.all() {
        let anchor = region.anchor();
        worksheet.merge_range(
            row_num(region.min_row),
            col_num(region.min_col),
            row_num(region.max_row),
            col_num(region.max_col),
            "",
            format_of(sheet.grid.get_cell(anchor.row, anchor.col)),
        )?;
    }

    for (pos, cell) in sheet.grid.sorted_cells() {
        write_cell(worksheet, row_num(pos.row), col_num(pos.col), cell, format_of(Some(cell)))?;
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut XlsxWorksheet,
    row: RowNum,
    col: ColNum,
    cell: &Cell,
    format: &Format,
) -> Result<(), PersistenceError> {
    if let Some(formula) = &cell.formula {
        let clean_formula = formula.strip_prefix('=').unwrap_or(formula);
        let formula = Formula::new(clean_formula).set_result(cell.display_value());
        worksheet.write_formula_with_format(row, col, formula, format)?;
        return Ok(());
    }

    match &cell.value {
        CellValue::Empty => {
            if cell.style_index > 0 {
                worksheet.write_blank(row, col, format)?;
            }
        }
        CellValue::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        CellValue::Text(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        CellValue::Boolean(b) => {
            worksheet.write_boolean_with_format(row, col, *b, format)?;
        }
        CellValue::Error(e) => {
            worksheet.write_string_with_format(row, col, e.as_str(), format)?;
        }
    }
    Ok(())
}

fn convert_border(style: BorderLineStyle) -> FormatBorder {
    match style {
        BorderLineStyle::None => FormatBorder::None,
        BorderLineStyle::Thin => FormatBorder::Thin,
        BorderLineStyle::Medium => FormatBorder::Medium,
        BorderLineStyle::Thick => FormatBorder::Thick,
        BorderLineStyle::Dashed => FormatBorder::Dashed,
        BorderLineStyle::Dotted => FormatBorder::Dotted,
        BorderLineStyle::Double => FormatBorder::Double,
    }
}

fn color_to_xlsx(color: &Color) -> rust_xlsxwriter::Color {
    rust_xlsxwriter::Color::RGB(color.to_rgb_u32())
}

pub(crate) fn convert_style_to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    let font = &style.font;

    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if font.strikethrough {
        format = format.set_font_strikethrough();
    }
    if font.size != engine::style::DEFAULT_FONT_SIZE {
        format = format.set_font_size(font.size as f64);
    }
    if font.family != engine::style::DEFAULT_FONT_FAMILY {
        format = format.set_font_name(&font.family);
    }
    if font.color != Color::black() {
        format = format.set_font_color(color_to_xlsx(&font.color));
    }

    if let Some(background) = &style.background {
        format = format
            .set_pattern(FormatPattern::Solid)
            .set_background_color(color_to_xlsx(background));
    }

    let edge = |border: &BorderStyle| (convert_border(border.style), color_to_xlsx(&border.color));
    let borders = &style.borders;
    if !borders.top.is_none() {
        let (line, color) = edge(&borders.top);
        format = format.set_border_top(line).set_border_top_color(color);
    }
    if !borders.right.is_none() {
        let (line, color) = edge(&borders.right);
        format = format.set_border_right(line).set_border_right_color(color);
    }
    if !borders.bottom.is_none() {
        let (line, color) = edge(&borders.bottom);
        format = format.set_border_bottom(line).set_border_bottom_color(color);
    }
    if !borders.left.is_none() {
        let (line, color) = edge(&borders.left);
        format = format.set_border_left(line).set_border_left_color(color);
    }

    format
}
