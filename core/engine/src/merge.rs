//! FILENAME: core/engine/src/merge.rs
//! PURPOSE: Merged regions and the index that answers queries over them.
//! CONTEXT: A sheet owns one `RegionIndex`. Callers only use the trait,
//! so the linear scan below can be swapped for a spatial index.

use std::fmt;

use parser::{Axis, CellRange, CellRef};

use crate::sheet::SheetStore;

/// A merged rectangle. Its value lives at the top-left anchor; the other
/// member cells are shadowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergedRegion {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl MergedRegion {
    pub fn rect(&self) -> CellRange {
        CellRange::from_bounds(self.min_row, self.min_col, self.max_row, self.max_col)
    }

    pub fn anchor(&self) -> CellRef {
        CellRef::new(self.min_row, self.min_col)
    }

    /// Inclusive (min, max) along an axis.
    pub fn span(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Row => (self.min_row, self.max_row),
            Axis::Column => (self.min_col, self.max_col),
        }
    }

    /// The same rectangle with its span along `axis` replaced.
    pub fn with_span(&self, axis: Axis, min: u32, max: u32) -> MergedRegion {
        let mut region = *self;
        match axis {
            Axis::Row => {
                region.min_row = min;
                region.max_row = max;
            }
            Axis::Column => {
                region.min_col = min;
                region.max_col = max;
            }
        }
        region
    }

    pub fn is_single_cell(&self) -> bool {
        self.rect().is_single_cell()
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        self.rect().contains(cell)
    }

    /// Member cells other than the anchor, row-major.
    pub fn non_anchor_cells(&self) -> impl Iterator<Item = CellRef> {
        let anchor = self.anchor();
        self.rect().cells().filter(move |c| *c != anchor)
    }
}

impl From<CellRange> for MergedRegion {
    fn from(range: CellRange) -> Self {
        MergedRegion {
            min_row: range.min_row,
            min_col: range.min_col,
            max_row: range.max_row,
            max_col: range.max_col,
        }
    }
}

impl fmt::Display for MergedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rect())
    }
}

// ============================================================================
// INDEX
// ============================================================================

/// Query contract over a sheet's merged regions.
pub trait RegionIndex {
    fn insert(&mut self, region: MergedRegion);

    /// Removes an exact region. Returns false when it was not registered.
    fn remove(&mut self, region: &MergedRegion) -> bool;

    /// Regions overlapping `rect`, ordered by anchor (row-major).
    fn intersecting(&self, rect: &CellRange) -> Vec<MergedRegion>;

    /// The region owning `cell`, if any.
    fn containing(&self, cell: CellRef) -> Option<MergedRegion>;

    /// Every region, ordered by anchor.
    fn all(&self) -> Vec<MergedRegion>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Linear-scan index. Sheets carry at most a few hundred regions.
#[derive(Debug, Clone, Default)]
pub struct LinearRegionIndex {
    regions: Vec<MergedRegion>,
}

impl LinearRegionIndex {
    pub fn new() -> Self {
        LinearRegionIndex::default()
    }
}

fn sorted(mut regions: Vec<MergedRegion>) -> Vec<MergedRegion> {
    regions.sort_by_key(|r| (r.min_row, r.min_col));
    regions
}

impl RegionIndex for LinearRegionIndex {
    fn insert(&mut self, region: MergedRegion) {
        if !self.regions.contains(&region) {
            self.regions.push(region);
        }
    }

    fn remove(&mut self, region: &MergedRegion) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r != region);
        self.regions.len() != before
    }

    fn intersecting(&self, rect: &CellRange) -> Vec<MergedRegion> {
        sorted(
            self.regions
                .iter()
                .filter(|r| r.rect().intersects(rect))
                .copied()
                .collect(),
        )
    }

    fn containing(&self, cell: CellRef) -> Option<MergedRegion> {
        self.regions.iter().find(|r| r.contains(cell)).copied()
    }

    fn all(&self) -> Vec<MergedRegion> {
        sorted(self.regions.clone())
    }

    fn len(&self) -> usize {
        self.regions.len()
    }
}

/// Regions of `sheet` overlapping `rect`.
pub fn find_intersecting_regions<S: SheetStore>(sheet: &S, rect: &CellRange) -> Vec<MergedRegion> {
    sheet.regions().intersecting(rect)
}

/// The region owning `cell` and its anchor.
pub fn find_owning_region<S: SheetStore>(sheet: &S, cell: CellRef) -> Option<(MergedRegion, CellRef)> {
    sheet.regions().containing(cell).map(|r| (r, r.anchor()))
}
