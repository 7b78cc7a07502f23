//! FILENAME: core/persistence/src/report.rs
//! PURPOSE: Writes the execution report of a batch as an XLSX file.
//! CONTEXT: One row per step: number, operation display name, result and
//! detail text. The caller supplies display names; this module only lays
//! out and formats the sheet.

use std::path::{Path, PathBuf};

use log::info;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, FormatPattern, Workbook as XlsxWorkbook};
use serde::{Deserialize, Serialize};

use crate::PersistenceError;

/// Name of the single sheet in a report.
pub const REPORT_SHEET_NAME: &str = "执行结果报告";

const HEADERS: [&str; 4] = ["步骤", "操作", "执行结果", "详细信息"];
const COLUMN_WIDTHS: [f64; 4] = [8.0, 20.0, 10.0, 60.0];

const HEADER_FILL: u32 = 0xDDDDDD;
const SUCCESS_FILL: u32 = 0xC6EFCE;
const FAILURE_FILL: u32 = 0xFFC7CE;

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub step: usize,
    pub operation: String,
    pub success: bool,
    pub detail: String,
}

fn bordered() -> Format {
    Format::new().set_border(FormatBorder::Thin)
}

/// Writes `rows` to `output_dir/file_name` and returns the path written.
pub fn save_report(rows: &[ReportRow], output_dir: &Path, file_name: &str) -> Result<PathBuf, PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();
    let worksheet = xlsx.add_worksheet();
    worksheet.set_name(REPORT_SHEET_NAME)?;

    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        worksheet.set_column_width(col as u16, *width)?;
    }

    let header = bordered()
        .set_bold()
        .set_font_size(12)
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    for (col, title) in HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }

    let plain = bordered();
    let centered = bordered().set_align(FormatAlign::Center);
    let result_format = |success: bool| {
        let fill = if success { SUCCESS_FILL } else { FAILURE_FILL };
        bordered()
            .set_align(FormatAlign::Center)
            .set_pattern(FormatPattern::Solid)
            .set_background_color(Color::RGB(fill))
    };

    for (index, row) in rows.iter().enumerate() {
        let r = index as u32 + 1;
        worksheet.write_number_with_format(r, 0, row.step as f64, &centered)?;
        worksheet.write_string_with_format(r, 1, &row.operation, &plain)?;
        let result = if row.success { "成功" } else { "失败" };
        worksheet.write_string_with_format(r, 2, result, &result_format(row.success))?;
        worksheet.write_string_with_format(r, 3, &row.detail, &plain)?;
    }

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(file_name);
    xlsx.save(&path)?;
    info!(target: "FILE", "report with {} step(s) written to {}", rows.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_xlsx;
    use engine::{CellRef, Color as StyleColor};

    #[test]
    fn test_report_layout() {
        let dir = tempfile::tempdir().unwrap();
        let rows = vec![
            ReportRow {
                step: 1,
                operation: "删除行".to_string(),
                success: true,
                detail: "deleted 2 row(s)".to_string(),
            },
            ReportRow {
                step: 2,
                operation: "合并单元格".to_string(),
                success: false,
                detail: "Region conflict at A1:B2".to_string(),
            },
        ];

        let path = save_report(&rows, dir.path(), "report.xlsx").unwrap();
        let workbook = load_xlsx(&path).unwrap();
        assert_eq!(workbook.sheet_names(), vec![REPORT_SHEET_NAME]);

        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.text(CellRef::new(1, 3)), "执行结果");
        assert_eq!(sheet.text(CellRef::new(2, 1)), "1");
        assert_eq!(sheet.text(CellRef::new(2, 3)), "成功");
        assert_eq!(sheet.text(CellRef::new(3, 3)), "失败");
        assert_eq!(sheet.text(CellRef::new(3, 4)), "Region conflict at A1:B2");

        assert!(sheet.style_of(CellRef::new(1, 1)).font.bold);
        assert_eq!(sheet.style_of(CellRef::new(2, 3)).background, Some(StyleColor::new(0xC6, 0xEF, 0xCE)));
        assert_eq!(sheet.style_of(CellRef::new(3, 3)).background, Some(StyleColor::new(0xFF, 0xC7, 0xCE)));
        assert!(sheet.column_widths.get(&4).is_some_and(|w| *w >= 60.0));
    }
}
