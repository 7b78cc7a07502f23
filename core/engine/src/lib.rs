//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the sheet editing engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.
//! The engine holds sheets in memory and edits them; it performs no file I/O.

pub mod cell;
pub mod error;
pub mod executor;
pub mod grid;
pub mod merge;
pub mod merging;
pub mod sheet;
pub mod structure;
pub mod style;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellError, CellValue};
pub use error::{EditError, EditResult, ErrorKind};
pub use executor::{apply_over_range, apply_over_sheet, used_range, ApplyOutcome, RangePolicy};
pub use grid::Grid;
pub use merge::{find_intersecting_regions, find_owning_region, LinearRegionIndex, MergedRegion, RegionIndex};
pub use merging::{merge, unmerge, unmerge_all, unmerge_region, MergeOutcome, UnmergeValuePolicy};
pub use sheet::{check_band, SheetStore, Worksheet};
pub use structure::{
    delete_hidden_units, delete_units, insert_units, set_hidden, DeleteMergePolicy, DeletionReport,
    MergeReconciliationRecord, UnitOutcome,
};
pub use style::{BorderLineStyle, BorderStyle, Borders, CellStyle, Color, FontStyle, StyleRegistry};

// The coordinate model comes from the range parser
pub use parser::{Axis, CellRange, CellRef, Position, RangeSpec};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_cells() {
        let cell = Cell::new_number(42.0);
        assert_eq!(cell.value, CellValue::Number(42.0));
    }

    #[test]
    fn integration_test_parse_then_edit() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(CellRef::new(2, 2), Cell::new_text("X"));

        let rect = parser::parse_cell_range("B2:C3").unwrap();
        merge(&mut sheet, rect).unwrap();

        let hits = find_intersecting_regions(&sheet, &parser::parse_cell_range("C1:C9").unwrap());
        assert_eq!(hits.len(), 1);

        delete_units(&mut sheet, Axis::Row, 1, 1, DeleteMergePolicy::UnmergeKeepValue).unwrap();
        let (region, anchor) = find_owning_region(&sheet, CellRef::new(2, 3)).unwrap();
        assert_eq!(region.to_string(), "B1:C2");
        assert_eq!(anchor, CellRef::new(1, 2));
        assert_eq!(sheet.text(anchor), "X");
    }

    #[test]
    fn content_writes_land_on_anchors() {
        let mut sheet = Worksheet::new("Sheet1");
        merge(&mut sheet, parser::parse_cell_range("A1:B2").unwrap()).unwrap();

        let spec = parser::parse_range("B2,D4").unwrap();
        let outcome = apply_over_range(&mut sheet, &spec, RangePolicy::AnchorOnly, |s, pos| {
            s.cell_mut(pos).value = CellValue::Text("hi".to_string());
            Ok(())
        });

        assert_eq!(outcome.visited, 2);
        assert_eq!(sheet.text(CellRef::new(1, 1)), "hi");
        assert_eq!(sheet.text(CellRef::new(2, 2)), "");
        assert_eq!(sheet.text(CellRef::new(4, 4)), "hi");
    }
}
