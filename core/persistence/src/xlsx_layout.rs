//! FILENAME: core/persistence/src/xlsx_layout.rs
//! PURPOSE: Reads what calamine does not expose from an XLSX package:
//! merged regions, hidden rows/columns, row heights, column widths and the
//! font/fill/border part of cell styles.
//! CONTEXT: The package is opened as a ZIP archive and the parts are scanned
//! with quick-xml. Parsing is lenient: malformed parts yield what was read
//! up to the error, plus a warning.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Read, Seek};
use std::path::Path;

use engine::{BorderLineStyle, BorderStyle, Borders, CellStyle, Color, FontStyle};
use log::warn;
use parser::{CellRange, CellRef};
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::PersistenceError;

/// Layout of one worksheet part.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    pub merges: Vec<CellRange>,
    pub hidden_rows: BTreeSet<u32>,
    pub hidden_columns: BTreeSet<u32>,
    pub row_heights: BTreeMap<u32, f64>,
    pub column_widths: BTreeMap<u32, f64>,
    /// Cells with a non-default `s` attribute, as (cell, cellXfs index).
    pub cell_styles: Vec<(CellRef, usize)>,
}

/// Layout of a whole package, sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct WorkbookLayout {
    /// Resolved `cellXfs` entries, indexed like the `s` attribute.
    pub cell_formats: Vec<CellStyle>,
    pub sheets: Vec<SheetLayout>,
}

// ============================================================================
// ATTRIBUTE HELPERS
// ============================================================================

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value);
            match unescape(&raw) {
                Ok(v) => v.into_owned(),
                Err(_) => raw.into_owned(),
            }
        })
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart, key: &[u8]) -> Option<T> {
    attr(e, key).and_then(|v| v.parse().ok())
}

fn attr_flag(e: &BytesStart, key: &[u8]) -> bool {
    matches!(attr(e, key).as_deref(), Some("1") | Some("true"))
}

fn attr_color(e: &BytesStart) -> Option<Color> {
    attr(e, b"rgb").and_then(|hex| Color::from_hex(&hex))
}

fn cell_ref(reference: &str) -> Option<CellRef> {
    parser::parse_cell_range(reference)
        .ok()
        .filter(|r| r.is_single_cell())
        .map(|r| r.top_left())
}

// ============================================================================
// styles.xml
// ============================================================================

#[derive(Debug, Clone, Default)]
struct XfEntry {
    font_id: usize,
    fill_id: usize,
    border_id: usize,
}

/// Resolves every `cellXfs` entry of a styles part into a CellStyle.
pub fn parse_styles_xml(xml: &str) -> Vec<CellStyle> {
    let fonts = parse_fonts(xml);
    let fills = parse_fills(xml);
    let borders = parse_borders(xml);

    parse_cell_xfs(xml)
        .into_iter()
        .map(|xf| CellStyle {
            font: fonts.get(xf.font_id).cloned().unwrap_or_default(),
            background: fills.get(xf.fill_id).copied().flatten(),
            borders: borders.get(xf.border_id).cloned().unwrap_or_default(),
        })
        .collect()
}

fn parse_fonts(xml: &str) -> Vec<FontStyle> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = FontStyle::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = FontStyle::default();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"b" => current.bold = attr(e, b"val").map_or(true, |v| v != "0"),
                b"i" => current.italic = attr(e, b"val").map_or(true, |v| v != "0"),
                b"u" => current.underline = attr(e, b"val").map_or(true, |v| v != "none"),
                b"strike" => current.strikethrough = attr(e, b"val").map_or(true, |v| v != "0"),
                b"sz" => {
                    if let Some(size) = attr_parse::<f32>(e, b"val") {
                        current.size = size.round() as u8;
                    }
                }
                b"color" => {
                    if let Some(color) = attr_color(e) {
                        current.color = color;
                    }
                }
                b"name" => {
                    if let Some(family) = attr(e, b"val") {
                        current.family = family;
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(current.clone());
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(target: "FILE", "styles.xml fonts: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    fonts
}

/// Solid fill colors; None for any other fill.
fn parse_fills(xml: &str) -> Vec<Option<Color>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fills>, 2 = inside <fill>
    let mut solid = false;
    let mut current: Option<Color> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"fills" if depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    solid = false;
                    current = None;
                }
                b"patternFill" if depth == 2 => {
                    solid = attr(e, b"patternType").as_deref() == Some("solid");
                }
                b"fgColor" if depth == 2 && solid => current = attr_color(e),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"fill" if depth == 2 => {
                    fills.push(current);
                    depth = 1;
                }
                b"fills" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(target: "FILE", "styles.xml fills: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    fills
}

fn side_mut<'a>(borders: &'a mut Borders, side: &[u8]) -> Option<&'a mut BorderStyle> {
    match side {
        b"top" => Some(&mut borders.top),
        b"right" => Some(&mut borders.right),
        b"bottom" => Some(&mut borders.bottom),
        b"left" => Some(&mut borders.left),
        _ => None,
    }
}

fn parse_borders(xml: &str) -> Vec<Borders> {
    let mut borders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <borders>, 2 = inside <border>
    let mut current = Borders::default();
    let mut current_side: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"borders" if depth == 0 => depth = 1,
                b"border" if depth == 1 => {
                    depth = 2;
                    current = Borders::default();
                }
                side @ (b"top" | b"right" | b"bottom" | b"left") if depth == 2 => {
                    let style = attr(e, b"style").map(|s| BorderLineStyle::from_xlsx(&s)).unwrap_or_default();
                    if let Some(edge) = side_mut(&mut current, side) {
                        edge.style = style;
                    }
                    current_side = Some(side.to_vec());
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                side @ (b"top" | b"right" | b"bottom" | b"left") => {
                    let style = attr(e, b"style").map(|s| BorderLineStyle::from_xlsx(&s)).unwrap_or_default();
                    if let Some(edge) = side_mut(&mut current, side) {
                        edge.style = style;
                    }
                }
                b"color" => {
                    if let (Some(side), Some(color)) = (current_side.as_deref(), attr_color(e)) {
                        if let Some(edge) = side_mut(&mut current, side) {
                            edge.color = color;
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"top" | b"right" | b"bottom" | b"left" => current_side = None,
                b"border" if depth == 2 => {
                    borders.push(current.clone());
                    depth = 1;
                }
                b"borders" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(target: "FILE", "styles.xml borders: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    borders
}

fn parse_cell_xfs(xml: &str) -> Vec<XfEntry> {
    let mut entries = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => entries.push(XfEntry {
                    font_id: attr_parse(e, b"fontId").unwrap_or(0),
                    fill_id: attr_parse(e, b"fillId").unwrap_or(0),
                    border_id: attr_parse(e, b"borderId").unwrap_or(0),
                }),
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(target: "FILE", "styles.xml cellXfs: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    entries
}

// ============================================================================
// WORKSHEET PARTS
// ============================================================================

/// Reads merges, hidden flags, sizes and per-cell style ids of a worksheet part.
pub fn parse_sheet_layout(xml: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"row" => {
                    if let Some(row) = attr_parse::<u32>(e, b"r") {
                        if attr_flag(e, b"hidden") {
                            layout.hidden_rows.insert(row);
                        }
                        if attr_flag(e, b"customHeight") {
                            if let Some(height) = attr_parse::<f64>(e, b"ht") {
                                layout.row_heights.insert(row, height);
                            }
                        }
                    }
                }
                b"c" => {
                    let style = attr_parse::<usize>(e, b"s").unwrap_or(0);
                    if style > 0 {
                        if let Some(pos) = attr(e, b"r").as_deref().and_then(cell_ref) {
                            layout.cell_styles.push((pos, style));
                        }
                    }
                }
                b"col" => {
                    let min = attr_parse::<u32>(e, b"min").unwrap_or(1);
                    let max = attr_parse::<u32>(e, b"max").unwrap_or(min);
                    let hidden = attr_flag(e, b"hidden");
                    let width = attr_parse::<f64>(e, b"width").filter(|_| attr_flag(e, b"customWidth"));
                    // Unbounded spans like 1..16384 only matter when hidden or sized
                    for col in min..=max.min(parser::MAX_COLUMNS) {
                        if hidden {
                            layout.hidden_columns.insert(col);
                        }
                        if let Some(width) = width {
                            layout.column_widths.insert(col, width);
                        }
                    }
                }
                b"mergeCell" => {
                    if let Some(range) = attr(e, b"ref").and_then(|r| parser::parse_cell_range(&r).ok()) {
                        layout.merges.push(range);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(target: "FILE", "worksheet layout: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    layout
}

// ============================================================================
// PACKAGE
// ============================================================================

/// Read a file from a ZIP archive.
fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, PersistenceError> {
    let mut file = archive.by_name(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Resolves the worksheet part of each named sheet through workbook.xml and
/// its relationships. Unknown sheets map to None.
fn resolve_worksheet_paths(workbook_xml: &str, rels_xml: &str, sheet_names: &[String]) -> Vec<Option<String>> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr(e, b"name"), attr(e, b"r:id")) {
                    name_to_rid.insert(name, rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    rid_to_target.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    sheet_names
        .iter()
        .map(|name| {
            let target = rid_to_target.get(name_to_rid.get(name)?)?;
            Some(match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("xl/{}", target),
            })
        })
        .collect()
}

/// Reads the layout of every named sheet of the package at `path`.
pub fn read_layout(path: &Path, sheet_names: &[String]) -> Result<WorkbookLayout, PersistenceError> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let cell_formats = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles_xml(&xml),
        Err(_) => Vec::new(),
    };

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml")?;
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let paths = resolve_worksheet_paths(&workbook_xml, &rels_xml, sheet_names);

    let mut sheets = Vec::with_capacity(paths.len());
    for (name, part) in sheet_names.iter().zip(paths) {
        let layout = match part.map(|p| read_zip_file(&mut archive, &p)) {
            Some(Ok(xml)) => parse_sheet_layout(&xml),
            _ => {
                warn!(target: "FILE", "no worksheet part for '{}', layout skipped", name);
                SheetLayout::default()
            }
        };
        sheets.push(layout);
    }

    Ok(WorkbookLayout { cell_formats, sheets })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <borders count="2">
    <border><left/><right/><top/><bottom/><diagonal/></border>
    <border><left style="thin"><color rgb="FF0000FF"/></left><right style="thin"/><top style="medium"/><bottom/></border>
  </borders>
  <cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
  <cellXfs count="3">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
    <xf numFmtId="0" fontId="1" fillId="2" borderId="0" xfId="0" applyFont="1" applyFill="1"/>
    <xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"><alignment horizontal="center"/></xf>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles_resolves_xfs() {
        let styles = parse_styles_xml(STYLES_XML);
        assert_eq!(styles.len(), 3);
        assert!(styles[0].is_default());

        let bold = &styles[1];
        assert!(bold.font.bold);
        assert_eq!(bold.font.size, 14);
        assert_eq!(bold.font.family, "Arial");
        assert_eq!(bold.font.color, Color::new(255, 0, 0));
        assert_eq!(bold.background, Some(Color::new(255, 255, 0)));

        let bordered = &styles[2];
        assert_eq!(bordered.borders.left.style, BorderLineStyle::Thin);
        assert_eq!(bordered.borders.left.color, Color::new(0, 0, 255));
        assert_eq!(bordered.borders.top.style, BorderLineStyle::Medium);
        assert!(bordered.borders.bottom.is_none());
        assert!(bordered.background.is_none());
    }

    #[test]
    fn test_parse_empty_styles() {
        assert!(parse_styles_xml("<styleSheet/>").is_empty());
    }

    #[test]
    fn test_parse_sheet_layout() {
        let xml = r#"<worksheet>
  <cols>
    <col min="2" max="3" width="20.5" customWidth="1"/>
    <col min="5" max="5" width="9" hidden="1"/>
  </cols>
  <sheetData>
    <row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1"><v>2</v></c></row>
    <row r="3" hidden="1"><c r="A3" s="0"><v>1</v></c></row>
    <row r="4" ht="30" customHeight="1"/>
  </sheetData>
  <mergeCells count="1"><mergeCell ref="B2:C3"/></mergeCells>
</worksheet>"#;

        let layout = parse_sheet_layout(xml);
        assert_eq!(layout.column_widths, BTreeMap::from([(2, 20.5), (3, 20.5)]));
        assert_eq!(layout.hidden_columns, BTreeSet::from([5]));
        assert_eq!(layout.hidden_rows, BTreeSet::from([3]));
        assert_eq!(layout.row_heights, BTreeMap::from([(4, 30.0)]));
        assert_eq!(layout.cell_styles, vec![(CellRef::new(1, 1), 1)]);
        assert_eq!(layout.merges, vec![CellRange::from_bounds(2, 2, 3, 3)]);
    }

    #[test]
    fn test_attr_unescapes_entities() {
        let e = BytesStart::from_content(r#"sheet name="A &amp; B &lt;1&gt;" bad="x &unknown; y""#, 5);
        assert_eq!(attr(&e, b"name").as_deref(), Some("A & B <1>"));
        assert_eq!(attr(&e, b"bad").as_deref(), Some("x &unknown; y"));
        assert_eq!(attr(&e, b"missing"), None);
    }

    #[test]
    fn test_resolve_worksheet_paths() {
        let workbook = r#"<workbook><sheets>
            <sheet name="First" sheetId="1" r:id="rId1"/>
            <sheet name="A &amp; B" sheetId="2" r:id="rId2"/>
        </sheets></workbook>"#;
        let rels = r#"<Relationships>
            <Relationship Id="rId1" Target="worksheets/sheet1.xml"/>
            <Relationship Id="rId2" Target="/xl/worksheets/sheet2.xml"/>
        </Relationships>"#;
        let names = vec!["First".to_string(), "A & B".to_string(), "Missing".to_string()];

        let paths = resolve_worksheet_paths(workbook, rels, &names);
        assert_eq!(
            paths,
            vec![
                Some("xl/worksheets/sheet1.xml".to_string()),
                Some("xl/worksheets/sheet2.xml".to_string()),
                None
            ]
        );
    }
}
