//! FILENAME: core/engine/src/sheet.rs
//! PURPOSE: The storage-level sheet: cells, styles, merged regions, hidden
//! flags and unit sizes, plus the raw structural primitives.
//! CONTEXT: Editing operations are written against the `SheetStore` trait.
//! `Worksheet` is the in-memory implementation loaded from and saved to xlsx.
//!
//! RAW PRIMITIVES:
//! - `insert_units` moves cells, sizes and hidden flags. It does not touch
//!   merged regions; the reconciler re-registers them.
//! - `delete_unit` handles still-registered regions the way the file format
//!   does natively: a region whose first unit is deleted disappears, a region
//!   straddling the unit shrinks, a region after it moves back.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use parser::{Axis, CellRange, CellRef};

use crate::cell::{Cell, CellValue};
use crate::error::{EditError, EditResult};
use crate::grid::{
    shift_indices_for_delete, shift_indices_for_insert, shift_set_for_delete, shift_set_for_insert, Grid,
};
use crate::merge::{LinearRegionIndex, MergedRegion, RegionIndex};
use crate::style::{CellStyle, StyleRegistry};

/// What the editing operations need from a sheet.
pub trait SheetStore {
    type Regions: RegionIndex;

    fn name(&self) -> &str;

    fn cell(&self, pos: CellRef) -> Option<&Cell>;

    /// The cell at `pos`, created empty when absent.
    fn cell_mut(&mut self, pos: CellRef) -> &mut Cell;

    /// Removes value and formula, keeping the style.
    fn clear_content(&mut self, pos: CellRef);

    fn regions(&self) -> &Self::Regions;

    /// Registers a merge. Fails on single cells and overlaps. Non-anchor
    /// member contents are cleared.
    fn add_region(&mut self, rect: CellRange) -> EditResult<MergedRegion>;

    /// Unregisters a merge, leaving every cell as it is.
    fn remove_region(&mut self, region: &MergedRegion) -> bool;

    fn insert_units(&mut self, axis: Axis, at: u32, count: u32) -> EditResult<()>;

    fn delete_unit(&mut self, axis: Axis, at: u32) -> EditResult<()>;

    fn is_hidden(&self, axis: Axis, index: u32) -> bool;

    fn set_unit_hidden(&mut self, axis: Axis, index: u32, hidden: bool);

    /// Highest index along `axis` that holds content or a region.
    fn extent(&self, axis: Axis) -> u32;
}

/// Validates a contiguous band of units along an axis.
pub fn check_band(axis: Axis, position: u32, count: u32) -> EditResult<()> {
    if count == 0 {
        return Err(EditError::StructuralEdit(format!("{} count must be at least 1", axis)));
    }
    if position == 0 {
        return Err(EditError::StructuralEdit(format!("{} 0 does not exist", axis)));
    }
    let last = position as u64 + count as u64 - 1;
    if last > axis.limit() as u64 {
        return Err(EditError::StructuralEdit(format!(
            "{} {}..{} exceeds the sheet limit of {}",
            axis,
            position,
            last,
            axis.limit()
        )));
    }
    Ok(())
}

// ============================================================================
// WORKSHEET
// ============================================================================

#[derive(Debug, Clone)]
pub struct Worksheet {
    pub name: String,
    pub grid: Grid,
    pub styles: StyleRegistry,
    pub merges: LinearRegionIndex,
    pub hidden_rows: BTreeSet<u32>,
    pub hidden_columns: BTreeSet<u32>,
    pub row_heights: BTreeMap<u32, f64>,
    pub column_widths: BTreeMap<u32, f64>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Self {
        Worksheet {
            name: name.into(),
            grid: Grid::new(),
            styles: StyleRegistry::new(),
            merges: LinearRegionIndex::new(),
            hidden_rows: BTreeSet::new(),
            hidden_columns: BTreeSet::new(),
            row_heights: BTreeMap::new(),
            column_widths: BTreeMap::new(),
        }
    }

    pub fn set_cell(&mut self, pos: CellRef, cell: Cell) {
        self.grid.set_cell(pos.row, pos.col, cell);
    }

    pub fn value(&self, pos: CellRef) -> CellValue {
        self.grid
            .get_cell(pos.row, pos.col)
            .map(|c| c.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// Display text of the cell, empty when absent.
    pub fn text(&self, pos: CellRef) -> String {
        self.grid
            .get_cell(pos.row, pos.col)
            .map(|c| c.display_value())
            .unwrap_or_default()
    }

    pub fn style_of(&self, pos: CellRef) -> &CellStyle {
        let index = self.grid.get_cell(pos.row, pos.col).map(|c| c.style_index).unwrap_or(0);
        self.styles.get(index)
    }

    /// Derives a new style for the cell from its current one.
    pub fn update_style(&mut self, pos: CellRef, change: impl FnOnce(&mut CellStyle)) {
        let mut style = self.style_of(pos).clone();
        change(&mut style);
        let index = self.styles.get_or_create(style);
        self.grid.cell_mut(pos.row, pos.col).style_index = index;
    }

    fn hidden_set(&self, axis: Axis) -> &BTreeSet<u32> {
        match axis {
            Axis::Row => &self.hidden_rows,
            Axis::Column => &self.hidden_columns,
        }
    }

    fn hidden_set_mut(&mut self, axis: Axis) -> &mut BTreeSet<u32> {
        match axis {
            Axis::Row => &mut self.hidden_rows,
            Axis::Column => &mut self.hidden_columns,
        }
    }

    fn sizes_mut(&mut self, axis: Axis) -> &mut BTreeMap<u32, f64> {
        match axis {
            Axis::Row => &mut self.row_heights,
            Axis::Column => &mut self.column_widths,
        }
    }

    /// Native handling of one deleted unit for a still-registered region.
    fn adjust_region_for_delete(region: MergedRegion, axis: Axis, at: u32) -> Option<MergedRegion> {
        let (min, max) = region.span(axis);
        if max < at {
            return Some(region);
        }
        if min > at {
            return Some(region.with_span(axis, min - 1, max - 1));
        }
        if min == at {
            return None;
        }
        let shrunk = region.with_span(axis, min, max - 1);
        if shrunk.is_single_cell() {
            None
        } else {
            Some(shrunk)
        }
    }
}

impl SheetStore for Worksheet {
    type Regions = LinearRegionIndex;

    fn name(&self) -> &str {
        &self.name
    }

    fn cell(&self, pos: CellRef) -> Option<&Cell> {
        self.grid.get_cell(pos.row, pos.col)
    }

    fn cell_mut(&mut self, pos: CellRef) -> &mut Cell {
        self.grid.cell_mut(pos.row, pos.col)
    }

    fn clear_content(&mut self, pos: CellRef) {
        let Some(cell) = self.grid.cells.get_mut(&(pos.row, pos.col)) else {
            return;
        };
        cell.clear_content();
        if cell.is_default() {
            self.grid.clear_cell(pos.row, pos.col);
        }
    }

    fn regions(&self) -> &LinearRegionIndex {
        &self.merges
    }

    fn add_region(&mut self, rect: CellRange) -> EditResult<MergedRegion> {
        if rect.is_single_cell() {
            return Err(EditError::region_conflict(rect, "a merge must cover at least two cells"));
        }
        if let Some(existing) = self.merges.intersecting(&rect).first() {
            return Err(EditError::region_conflict(
                rect,
                format!("overlaps merged region {}", existing),
            ));
        }
        let region = MergedRegion::from(rect);
        for pos in region.non_anchor_cells() {
            self.clear_content(pos);
        }
        self.merges.insert(region);
        Ok(region)
    }

    fn remove_region(&mut self, region: &MergedRegion) -> bool {
        self.merges.remove(region)
    }

    fn insert_units(&mut self, axis: Axis, at: u32, count: u32) -> EditResult<()> {
        check_band(axis, at, count)?;
        let extent = self.extent(axis);
        if extent >= at && extent as u64 + count as u64 > axis.limit() as u64 {
            return Err(EditError::StructuralEdit(format!(
                "inserting {} {}(s) would push content past {} {}",
                count,
                axis,
                axis,
                axis.limit()
            )));
        }

        self.grid.insert_units(axis, at, count);
        shift_indices_for_insert(self.sizes_mut(axis), at, count);
        shift_set_for_insert(self.hidden_set_mut(axis), at, count);
        debug!(target: "STRUCT", "{}: raw insert of {} {}(s) at {}", self.name, count, axis, at);
        Ok(())
    }

    fn delete_unit(&mut self, axis: Axis, at: u32) -> EditResult<()> {
        check_band(axis, at, 1)?;

        for region in self.merges.all() {
            match Worksheet::adjust_region_for_delete(region, axis, at) {
                Some(adjusted) if adjusted == region => {}
                Some(adjusted) => {
                    self.merges.remove(&region);
                    self.merges.insert(adjusted);
                }
                None => {
                    self.merges.remove(&region);
                }
            }
        }

        self.grid.delete_unit(axis, at);
        shift_indices_for_delete(self.sizes_mut(axis), at);
        shift_set_for_delete(self.hidden_set_mut(axis), at);
        debug!(target: "STRUCT", "{}: raw delete of {} {}", self.name, axis, at);
        Ok(())
    }

    fn is_hidden(&self, axis: Axis, index: u32) -> bool {
        self.hidden_set(axis).contains(&index)
    }

    fn set_unit_hidden(&mut self, axis: Axis, index: u32, hidden: bool) {
        let set = self.hidden_set_mut(axis);
        if hidden {
            set.insert(index);
        } else {
            set.remove(&index);
        }
    }

    fn extent(&self, axis: Axis) -> u32 {
        let regions = self
            .merges
            .all()
            .iter()
            .map(|r| r.span(axis).1)
            .max()
            .unwrap_or(0);
        self.grid.extent(axis).max(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Color;

    fn at(a1: &str) -> CellRef {
        parser::parse_cell_range(a1).unwrap().top_left()
    }

    fn rect(a: &str) -> CellRange {
        parser::parse_cell_range(a).unwrap()
    }

    #[test]
    fn test_add_region_clears_members_and_rejects_overlap() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_text("keep"));
        sheet.set_cell(at("B2"), Cell::new_text("drop"));

        sheet.add_region(rect("A1:B2")).unwrap();
        assert_eq!(sheet.text(at("A1")), "keep");
        assert_eq!(sheet.text(at("B2")), "");

        let err = sheet.add_region(rect("B2:C3")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RegionConflict);
        assert!(sheet.add_region(rect("D4")).is_err());
    }

    #[test]
    fn test_clear_content_keeps_styled_cell() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("C3"), Cell::new_text("v"));
        sheet.update_style(at("C3"), |s| s.font.bold = true);

        sheet.clear_content(at("C3"));
        assert!(sheet.cell(at("C3")).is_some());
        assert!(sheet.style_of(at("C3")).font.bold);

        sheet.set_cell(at("D3"), Cell::new_text("v"));
        sheet.clear_content(at("D3"));
        assert!(sheet.cell(at("D3")).is_none());
    }

    #[test]
    fn test_update_style_shares_registry_entries() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.update_style(at("A1"), |s| s.font.color = Color::new(255, 0, 0));
        sheet.update_style(at("B1"), |s| s.font.color = Color::new(255, 0, 0));
        assert_eq!(sheet.styles.len(), 2);
        assert_eq!(sheet.style_of(at("B1")).font.color.to_hex(), "FF0000");
    }

    #[test]
    fn test_raw_delete_handles_registered_regions() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.add_region(rect("A1:B1")).unwrap(); // before the unit
        sheet.add_region(rect("A3:B4")).unwrap(); // starts at the unit
        sheet.add_region(rect("D2:E5")).unwrap(); // straddles the unit
        sheet.add_region(rect("A6:B7")).unwrap(); // after the unit

        sheet.delete_unit(Axis::Row, 3).unwrap();

        let regions: Vec<String> = sheet.merges.all().iter().map(|r| r.to_string()).collect();
        assert_eq!(regions, vec!["A1:B1", "D2:E4", "A5:B6"]);
    }

    #[test]
    fn test_raw_delete_drops_region_shrunk_to_one_cell() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.add_region(rect("B2:B3")).unwrap();
        sheet.delete_unit(Axis::Row, 3).unwrap();
        assert!(sheet.merges.is_empty());
    }

    #[test]
    fn test_raw_insert_moves_sizes_and_flags() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A2"), Cell::new_number(1.0));
        sheet.row_heights.insert(2, 30.0);
        sheet.set_unit_hidden(Axis::Row, 2, true);

        sheet.insert_units(Axis::Row, 1, 3).unwrap();

        assert_eq!(sheet.text(at("A5")), "1");
        assert_eq!(sheet.row_heights.get(&5), Some(&30.0));
        assert!(sheet.is_hidden(Axis::Row, 5));
        assert!(!sheet.is_hidden(Axis::Row, 2));
    }

    #[test]
    fn test_raw_primitives_reject_bad_bands() {
        let mut sheet = Worksheet::new("Sheet1");
        assert!(sheet.insert_units(Axis::Row, 0, 1).is_err());
        assert!(sheet.insert_units(Axis::Row, 1, 0).is_err());
        assert!(sheet.delete_unit(Axis::Column, 16_385).is_err());

        sheet.set_cell(CellRef::new(1, 16_384), Cell::new_text("edge"));
        let err = sheet.insert_units(Axis::Column, 1, 1).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::StructuralEditFailure);
    }

    #[test]
    fn test_extent_includes_regions() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_number(1.0));
        sheet.add_region(rect("A1:C9")).unwrap();
        assert_eq!(sheet.extent(Axis::Row), 9);
        assert_eq!(sheet.extent(Axis::Column), 3);
    }
}
