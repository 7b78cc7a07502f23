//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Manages the collection of cells (The Spreadsheet Grid).
//! CONTEXT: This file defines the `Grid` struct which acts as the container
//! for all cell data. It uses a sparse storage strategy (HashMap) to
//! efficiently handle massive spreadsheets where most cells are empty.
//! It also holds the key-shifting helpers used by row/column insertion and
//! deletion for every per-cell or per-index map of a sheet.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parser::{Axis, CellRef};

use crate::cell::Cell;

/// The Grid struct holds the state of the spreadsheet data.
/// It uses a sparse representation (HashMap) mapping coordinates to Cells.
/// Row and Col are 1-based indices.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Sparse storage: keys are (row, col), values are Cell instances.
    pub cells: HashMap<(u32, u32), Cell>,

    /// Tracks the highest row index currently in use (0 when empty).
    pub max_row: u32,

    /// Tracks the highest column index currently in use (0 when empty).
    pub max_col: u32,
}

impl Grid {
    /// Creates a new, empty Grid.
    pub fn new() -> Self {
        Grid::default()
    }

    /// Sets a cell at the specified coordinates.
    /// Updates max_row/max_col boundaries automatically.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.track(row, col);
        self.cells.insert((row, col), cell);
    }

    /// Retrieves a reference to a cell at the specified coordinates.
    /// Returns None if the cell is empty (not stored).
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Returns the cell at the coordinates, creating an empty one if needed.
    pub fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        self.track(row, col);
        self.cells.entry((row, col)).or_default()
    }

    /// Removes a cell from the grid (clearing it).
    /// If the cell was at a boundary (max_row or max_col), recalculates bounds.
    pub fn clear_cell(&mut self, row: u32, col: u32) {
        let was_at_boundary = row == self.max_row || col == self.max_col;
        self.cells.remove(&(row, col));

        // Only recalculate bounds if we cleared a cell at a boundary
        if was_at_boundary {
            self.recalculate_bounds();
        }
    }

    /// Recalculates max_row and max_col by scanning all cells.
    /// This is O(n) where n is the number of non-empty cells.
    pub fn recalculate_bounds(&mut self) {
        let mut new_max_row = 0u32;
        let mut new_max_col = 0u32;

        for &(row, col) in self.cells.keys() {
            new_max_row = new_max_row.max(row);
            new_max_col = new_max_col.max(col);
        }

        self.max_row = new_max_row;
        self.max_col = new_max_col;
    }

    /// Highest used index along an axis.
    pub fn extent(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.max_row,
            Axis::Column => self.max_col,
        }
    }

    /// Stored cells in row-major order.
    pub fn sorted_cells(&self) -> Vec<(CellRef, &Cell)> {
        let mut cells: Vec<(CellRef, &Cell)> = self
            .cells
            .iter()
            .map(|(&(row, col), cell)| (CellRef::new(row, col), cell))
            .collect();
        cells.sort_by_key(|(pos, _)| *pos);
        cells
    }

    /// Opens `count` empty units at `at`; everything at or after `at` moves.
    pub fn insert_units(&mut self, axis: Axis, at: u32, count: u32) {
        shift_cells_for_insert(&mut self.cells, axis, at, count);
        self.recalculate_bounds();
    }

    /// Removes unit `at`; everything after it moves back by one.
    pub fn delete_unit(&mut self, axis: Axis, at: u32) {
        shift_cells_for_delete(&mut self.cells, axis, at);
        self.recalculate_bounds();
    }

    fn track(&mut self, row: u32, col: u32) {
        if row > self.max_row {
            self.max_row = row;
        }
        if col > self.max_col {
            self.max_col = col;
        }
    }
}

// ============================================================================
// KEY SHIFTING
// ============================================================================

fn axis_coord(key: (u32, u32), axis: Axis) -> u32 {
    match axis {
        Axis::Row => key.0,
        Axis::Column => key.1,
    }
}

fn with_axis_coord(key: (u32, u32), axis: Axis, value: u32) -> (u32, u32) {
    match axis {
        Axis::Row => (value, key.1),
        Axis::Column => (key.0, value),
    }
}

/// Shift all cell positions in a HashMap where the key is (row, col).
pub fn shift_cells_for_insert<V>(map: &mut HashMap<(u32, u32), V>, axis: Axis, at: u32, count: u32) {
    let entries: Vec<_> = map.drain().collect();
    for (key, v) in entries {
        let coord = axis_coord(key, axis);
        let new_coord = if coord >= at { coord + count } else { coord };
        map.insert(with_axis_coord(key, axis, new_coord), v);
    }
}

/// Drops entries on unit `at` and moves the ones after it back by one.
pub fn shift_cells_for_delete<V>(map: &mut HashMap<(u32, u32), V>, axis: Axis, at: u32) {
    let entries: Vec<_> = map.drain().collect();
    for (key, v) in entries {
        let coord = axis_coord(key, axis);
        if coord == at {
            continue;
        }
        let new_coord = if coord > at { coord - 1 } else { coord };
        map.insert(with_axis_coord(key, axis, new_coord), v);
    }
}

/// Shift per-unit values (row heights, column widths).
pub fn shift_indices_for_insert<V>(map: &mut BTreeMap<u32, V>, at: u32, count: u32) {
    let tail = map.split_off(&at);
    for (index, v) in tail {
        map.insert(index + count, v);
    }
}

pub fn shift_indices_for_delete<V>(map: &mut BTreeMap<u32, V>, at: u32) {
    let mut tail = map.split_off(&at);
    tail.remove(&at);
    for (index, v) in tail {
        map.insert(index - 1, v);
    }
}

/// Same as the map variants, for flag sets such as hidden rows.
pub fn shift_set_for_insert(set: &mut BTreeSet<u32>, at: u32, count: u32) {
    let tail = set.split_off(&at);
    set.extend(tail.into_iter().map(|index| index + count));
}

pub fn shift_set_for_delete(set: &mut BTreeSet<u32>, at: u32) {
    let mut tail = set.split_off(&at);
    tail.remove(&at);
    set.extend(tail.into_iter().map(|index| index - 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    #[test]
    fn test_bounds_follow_content() {
        let mut grid = Grid::new();
        grid.set_cell(3, 2, Cell::new_number(1.0));
        grid.set_cell(1, 5, Cell::new_number(2.0));
        assert_eq!((grid.max_row, grid.max_col), (3, 5));

        grid.clear_cell(3, 2);
        assert_eq!((grid.max_row, grid.max_col), (1, 5));
        assert_eq!(grid.extent(Axis::Column), 5);
    }

    #[test]
    fn test_cell_mut_creates_cell() {
        let mut grid = Grid::new();
        grid.cell_mut(4, 4).value = CellValue::Text("x".to_string());
        assert_eq!(grid.get_cell(4, 4).unwrap().display_value(), "x");
        assert_eq!(grid.max_row, 4);
    }

    #[test]
    fn test_insert_rows_shifts_cells() {
        let mut grid = Grid::new();
        grid.set_cell(1, 1, Cell::new_text("top"));
        grid.set_cell(3, 1, Cell::new_text("moved"));

        grid.insert_units(Axis::Row, 2, 2);

        assert!(grid.get_cell(1, 1).is_some());
        assert!(grid.get_cell(3, 1).is_none());
        assert_eq!(grid.get_cell(5, 1).unwrap().display_value(), "moved");
        assert_eq!(grid.max_row, 5);
    }

    #[test]
    fn test_delete_column_drops_and_shifts() {
        let mut grid = Grid::new();
        grid.set_cell(1, 1, Cell::new_text("a"));
        grid.set_cell(1, 2, Cell::new_text("b"));
        grid.set_cell(1, 3, Cell::new_text("c"));

        grid.delete_unit(Axis::Column, 2);

        assert_eq!(grid.get_cell(1, 1).unwrap().display_value(), "a");
        assert_eq!(grid.get_cell(1, 2).unwrap().display_value(), "c");
        assert!(grid.get_cell(1, 3).is_none());
        assert_eq!(grid.max_col, 2);
    }

    #[test]
    fn test_sorted_cells_row_major() {
        let mut grid = Grid::new();
        grid.set_cell(2, 1, Cell::new_number(3.0));
        grid.set_cell(1, 2, Cell::new_number(2.0));
        grid.set_cell(1, 1, Cell::new_number(1.0));
        let order: Vec<String> = grid.sorted_cells().iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(order, vec!["A1", "B1", "A2"]);
    }

    #[test]
    fn test_index_shifting() {
        let mut heights = BTreeMap::from([(1, 10.0), (3, 30.0), (4, 40.0)]);
        shift_indices_for_insert(&mut heights, 3, 2);
        assert_eq!(heights, BTreeMap::from([(1, 10.0), (5, 30.0), (6, 40.0)]));

        shift_indices_for_delete(&mut heights, 5);
        assert_eq!(heights, BTreeMap::from([(1, 10.0), (5, 40.0)]));

        let mut hidden = BTreeSet::from([2, 4, 9]);
        shift_set_for_delete(&mut hidden, 4);
        assert_eq!(hidden, BTreeSet::from([2, 8]));
        shift_set_for_insert(&mut hidden, 1, 1);
        assert_eq!(hidden, BTreeSet::from([3, 9]));
    }
}
