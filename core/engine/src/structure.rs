//! FILENAME: core/engine/src/structure.rs
//! PURPOSE: Row/column insertion, deletion, hiding and delete-hidden with
//! merged-region reconciliation.
//! CONTEXT: The raw primitives on `SheetStore` only move cells. This module
//! keeps merged regions at the right coordinates and their anchor values
//! where they belong.
//!
//! DELETION STATE MACHINE:
//!   collect affected regions -> snapshot -> unmerge -> raw delete (highest
//!   unit first) -> recompute coordinates -> recreate survivors
//! With no affected region the call is a plain reverse-order raw delete.

use std::collections::BTreeMap;

use log::{debug, info, warn};
use parser::{Axis, CellRange, MAX_COLUMNS, MAX_ROWS};
use serde::{Deserialize, Serialize};

use crate::cell::Cell;
use crate::error::EditResult;
use crate::merge::{MergedRegion, RegionIndex};
use crate::sheet::{check_band, SheetStore};

/// Merge handling when deleting rows or columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMergePolicy {
    /// Regions crossing the deleted band are left to the raw primitive.
    /// Regions after the band are still moved.
    #[default]
    Ignore,
    /// Crossing regions are unmerged; only the anchor keeps its value.
    UnmergeOnly,
    /// Crossing regions are unmerged and the anchor value is copied to
    /// every member first, so surviving members keep it.
    UnmergeKeepValue,
}

/// Snapshot of a region taken before a deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeReconciliationRecord {
    pub region: MergedRegion,
    /// Anchor content at snapshot time, None when the anchor cell was absent.
    pub anchor: Option<Cell>,
    /// The region in A1 notation, for logs.
    pub range_ref: String,
}

impl MergeReconciliationRecord {
    fn capture<S: SheetStore>(sheet: &S, region: MergedRegion) -> Self {
        MergeReconciliationRecord {
            region,
            anchor: sheet.cell(region.anchor()).cloned(),
            range_ref: region.to_string(),
        }
    }
}

/// Regions touched by one deletion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionReport {
    /// Regions re-registered at their new coordinates (new rectangles).
    pub recreated: Vec<MergedRegion>,
    /// Regions not recreated (original rectangles).
    pub removed: Vec<MergedRegion>,
}

/// Outcome of one unit in a delete-hidden pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOutcome {
    Deleted,
    Failed(String),
}

/// Whole rows or whole columns `first..=last`.
pub fn band_rect(axis: Axis, first: u32, last: u32) -> CellRange {
    match axis {
        Axis::Row => CellRange::from_bounds(first, 1, last, MAX_COLUMNS),
        Axis::Column => CellRange::from_bounds(1, first, MAX_ROWS, last),
    }
}

// ============================================================================
// INSERTION
// ============================================================================

/// Inserts `count` units at `position`. Regions starting at or after the
/// position move with their cells; regions straddling it are untouched.
pub fn insert_units<S: SheetStore>(sheet: &mut S, axis: Axis, position: u32, count: u32) -> EditResult<()> {
    check_band(axis, position, count)?;

    let moving: Vec<MergedRegion> = sheet
        .regions()
        .all()
        .into_iter()
        .filter(|r| r.span(axis).0 >= position)
        .collect();

    for region in &moving {
        sheet.remove_region(region);
    }

    if let Err(e) = sheet.insert_units(axis, position, count) {
        for region in &moving {
            if let Err(restore) = sheet.add_region(region.rect()) {
                warn!(target: "STRUCT", "{}: could not restore {}: {}", sheet.name(), region, restore);
            }
        }
        return Err(e);
    }

    for region in &moving {
        let (min, max) = region.span(axis);
        let shifted = region.with_span(axis, min + count, max + count);
        if let Err(e) = sheet.add_region(shifted.rect()) {
            warn!(target: "STRUCT", "{}: dropped {} after insert: {}", sheet.name(), region, e);
        }
    }

    info!(
        target: "STRUCT",
        "{}: inserted {} {}(s) at {}, moved {} region(s)",
        sheet.name(),
        count,
        axis,
        position,
        moving.len()
    );
    Ok(())
}

// ============================================================================
// DELETION
// ============================================================================

/// Units of `first..=last` strictly below `bound`.
fn deleted_before(first: u32, last: u32, bound: u32) -> u32 {
    if bound <= first {
        0
    } else {
        last.min(bound - 1) - first + 1
    }
}

/// Units of `first..=last` at or below `bound`.
fn deleted_up_to(first: u32, last: u32, bound: u32) -> u32 {
    if bound < first {
        0
    } else {
        last.min(bound) - first + 1
    }
}

/// New rectangle of a region after `first..=last` were deleted, or None when
/// it must not be recreated.
fn recompute(region: &MergedRegion, axis: Axis, first: u32, last: u32) -> Option<MergedRegion> {
    let (min, max) = region.span(axis);
    if (first..=last).contains(&min) {
        return None;
    }
    let new_min = min as i64 - deleted_before(first, last, min) as i64;
    let new_max = max as i64 - deleted_up_to(first, last, max) as i64;
    if new_min < 1 || new_max < 1 || new_min > new_max {
        return None;
    }
    let moved = region.with_span(axis, new_min as u32, new_max as u32);
    if moved.is_single_cell() {
        return None;
    }
    Some(moved)
}

/// Deletes `count` units starting at `position`.
pub fn delete_units<S: SheetStore>(
    sheet: &mut S,
    axis: Axis,
    position: u32,
    count: u32,
    policy: DeleteMergePolicy,
) -> EditResult<DeletionReport> {
    check_band(axis, position, count)?;
    let last = position + count - 1;

    // collect
    let intersecting = sheet.regions().intersecting(&band_rect(axis, position, last));
    let mut affected: Vec<MergedRegion> = sheet
        .regions()
        .all()
        .into_iter()
        .filter(|r| r.span(axis).0 > last)
        .collect();
    if policy != DeleteMergePolicy::Ignore {
        affected.extend(intersecting);
    }

    if affected.is_empty() {
        for unit in (position..=last).rev() {
            sheet.delete_unit(axis, unit)?;
        }
        debug!(target: "STRUCT", "{}: deleted {} {}(s) at {}, no regions affected", sheet.name(), count, axis, position);
        return Ok(DeletionReport::default());
    }

    // snapshot
    let records: Vec<MergeReconciliationRecord> = affected
        .iter()
        .map(|r| MergeReconciliationRecord::capture(sheet, *r))
        .collect();

    // unmerge
    for record in &records {
        sheet.remove_region(&record.region);
        if policy == DeleteMergePolicy::Ignore {
            continue;
        }
        for pos in record.region.non_anchor_cells() {
            match (policy, &record.anchor) {
                (DeleteMergePolicy::UnmergeKeepValue, Some(anchor)) if !anchor.is_blank() => {
                    sheet.cell_mut(pos).copy_content_from(anchor);
                }
                _ => sheet.clear_content(pos),
            }
        }
    }

    // raw delete
    for unit in (position..=last).rev() {
        sheet.delete_unit(axis, unit)?;
    }

    // recompute and recreate
    let mut report = DeletionReport::default();
    for record in &records {
        let Some(moved) = recompute(&record.region, axis, position, last) else {
            debug!(target: "STRUCT", "{}: region {} not recreated", sheet.name(), record.range_ref);
            report.removed.push(record.region);
            continue;
        };
        match sheet.add_region(moved.rect()) {
            Ok(region) => {
                match &record.anchor {
                    Some(anchor) => sheet.cell_mut(region.anchor()).copy_content_from(anchor),
                    None => sheet.clear_content(region.anchor()),
                }
                report.recreated.push(region);
            }
            Err(e) => {
                warn!(target: "STRUCT", "{}: could not recreate {} as {}: {}", sheet.name(), record.range_ref, moved, e);
                report.removed.push(record.region);
            }
        }
    }

    info!(
        target: "STRUCT",
        "{}: deleted {} {}(s) at {} ({:?}), {} region(s) recreated, {} removed",
        sheet.name(),
        count,
        axis,
        position,
        policy,
        report.recreated.len(),
        report.removed.len()
    );
    Ok(report)
}

// ============================================================================
// VISIBILITY
// ============================================================================

/// Sets or clears the hidden flag of `count` units from `position`.
pub fn set_hidden<S: SheetStore>(sheet: &mut S, axis: Axis, position: u32, count: u32, hidden: bool) -> EditResult<()> {
    check_band(axis, position, count)?;
    for unit in position..position + count {
        sheet.set_unit_hidden(axis, unit, hidden);
    }
    debug!(
        target: "STRUCT",
        "{}: {} {} {}(s) at {}",
        sheet.name(),
        if hidden { "hid" } else { "unhid" },
        count,
        axis,
        position
    );
    Ok(())
}

/// Deletes every hidden unit up to `max(extent, scan_limit)`, highest first,
/// each through `delete_units` with `policy`.
pub fn delete_hidden_units<S: SheetStore>(
    sheet: &mut S,
    axis: Axis,
    policy: DeleteMergePolicy,
    scan_limit: u32,
) -> BTreeMap<u32, UnitOutcome> {
    let bound = sheet.extent(axis).max(scan_limit).min(axis.limit());
    let hidden: Vec<u32> = (1..=bound).filter(|&unit| sheet.is_hidden(axis, unit)).collect();

    for &unit in &hidden {
        sheet.set_unit_hidden(axis, unit, false);
    }

    let mut outcomes = BTreeMap::new();
    for &unit in hidden.iter().rev() {
        let outcome = match delete_units(sheet, axis, unit, 1, policy) {
            Ok(_) => UnitOutcome::Deleted,
            Err(e) => {
                warn!(target: "STRUCT", "{}: could not delete hidden {} {}: {}", sheet.name(), axis, unit, e);
                UnitOutcome::Failed(e.to_string())
            }
        };
        outcomes.insert(unit, outcome);
    }

    info!(
        target: "STRUCT",
        "{}: deleted {} hidden {}(s) (scanned 1..={})",
        sheet.name(),
        outcomes.len(),
        axis,
        bound
    );
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::merging::merge;
    use crate::sheet::Worksheet;
    use parser::CellRef;

    const ALL_POLICIES: [DeleteMergePolicy; 3] = [
        DeleteMergePolicy::Ignore,
        DeleteMergePolicy::UnmergeOnly,
        DeleteMergePolicy::UnmergeKeepValue,
    ];

    fn at(a1: &str) -> CellRef {
        parser::parse_cell_range(a1).unwrap().top_left()
    }

    fn rect(a: &str) -> CellRange {
        parser::parse_cell_range(a).unwrap()
    }

    fn regions(sheet: &Worksheet) -> Vec<String> {
        sheet.merges.all().iter().map(|r| r.to_string()).collect()
    }

    fn merged_sheet(range: &str, anchor_text: &str) -> Worksheet {
        let mut sheet = Worksheet::new("Sheet1");
        let r = rect(range);
        sheet.set_cell(r.top_left(), Cell::new_text(anchor_text));
        merge(&mut sheet, r).unwrap();
        sheet
    }

    #[test]
    fn test_counting_helpers() {
        assert_eq!(deleted_before(2, 3, 5), 2);
        assert_eq!(deleted_before(2, 3, 3), 1);
        assert_eq!(deleted_before(2, 3, 2), 0);
        assert_eq!(deleted_up_to(2, 3, 3), 2);
        assert_eq!(deleted_up_to(2, 3, 1), 0);
        assert_eq!(deleted_up_to(4, 6, 5), 2);
    }

    #[test]
    fn test_band_before_region_shifts_it() {
        for policy in ALL_POLICIES {
            let mut sheet = merged_sheet("B5:C8", "anchor");
            let report = delete_units(&mut sheet, Axis::Row, 2, 2, policy).unwrap();

            assert_eq!(regions(&sheet), vec!["B3:C6"], "{:?}", policy);
            assert_eq!(sheet.text(at("B3")), "anchor");
            assert_eq!(report.recreated.len(), 1);
        }
    }

    #[test]
    fn test_single_row_region_removed_with_its_row() {
        for policy in ALL_POLICIES {
            let mut sheet = merged_sheet("B5:D5", "x");
            delete_units(&mut sheet, Axis::Row, 5, 1, policy).unwrap();
            assert!(sheet.merges.is_empty(), "{:?}", policy);
            assert_eq!(sheet.text(at("B5")), "");
        }
    }

    #[test]
    fn test_region_losing_its_first_row_is_not_recreated() {
        for policy in ALL_POLICIES {
            let mut sheet = merged_sheet("B5:C7", "x");
            delete_units(&mut sheet, Axis::Row, 5, 1, policy).unwrap();
            assert!(sheet.merges.is_empty(), "{:?}", policy);
        }
    }

    #[test]
    fn test_keep_value_broadcasts_into_survivors() {
        let mut sheet = merged_sheet("B5:C7", "x");
        delete_units(&mut sheet, Axis::Row, 5, 1, DeleteMergePolicy::UnmergeKeepValue).unwrap();

        // Former rows 6 and 7 are now 5 and 6, plain cells holding the value
        for pos in rect("B5:C6").cells() {
            assert_eq!(sheet.value(pos), CellValue::Text("x".to_string()), "at {}", pos);
        }
    }

    #[test]
    fn test_unmerge_only_leaves_survivors_empty() {
        let mut sheet = merged_sheet("B5:C7", "x");
        delete_units(&mut sheet, Axis::Row, 5, 1, DeleteMergePolicy::UnmergeOnly).unwrap();
        for pos in rect("B5:C6").cells() {
            assert_eq!(sheet.value(pos), CellValue::Empty, "at {}", pos);
        }
    }

    #[test]
    fn test_row_above_region_keep_value_scenario() {
        let mut sheet = merged_sheet("B2:C3", "X");
        delete_units(&mut sheet, Axis::Row, 1, 1, DeleteMergePolicy::UnmergeKeepValue).unwrap();

        assert_eq!(regions(&sheet), vec!["B1:C2"]);
        assert_eq!(sheet.text(at("B1")), "X");
    }

    #[test]
    fn test_band_inside_region_shrinks_it() {
        let mut sheet = merged_sheet("A2:B6", "keep");
        let report = delete_units(&mut sheet, Axis::Row, 3, 2, DeleteMergePolicy::UnmergeOnly).unwrap();

        assert_eq!(regions(&sheet), vec!["A2:B4"]);
        assert_eq!(sheet.text(at("A2")), "keep");
        assert_eq!(report.recreated, vec![MergedRegion::from(rect("A2:B4"))]);
    }

    #[test]
    fn test_region_collapsing_to_one_cell_is_dropped() {
        let mut sheet = merged_sheet("C2:C3", "v");
        let report = delete_units(&mut sheet, Axis::Row, 3, 1, DeleteMergePolicy::UnmergeKeepValue).unwrap();

        assert!(sheet.merges.is_empty());
        assert_eq!(sheet.text(at("C2")), "v");
        assert_eq!(report.removed.len(), 1);
    }

    #[test]
    fn test_ignore_lets_raw_delete_shrink_crossing_region() {
        let mut sheet = merged_sheet("A2:B6", "keep");
        merge(&mut sheet, rect("D9:E10")).unwrap();

        let report = delete_units(&mut sheet, Axis::Row, 3, 2, DeleteMergePolicy::Ignore).unwrap();

        // Crossing region handled natively, downstream region reconciled
        assert_eq!(regions(&sheet), vec!["A2:B4", "D7:E8"]);
        assert_eq!(report.recreated, vec![MergedRegion::from(rect("D7:E8"))]);
    }

    #[test]
    fn test_column_deletion_reconciles_regions_to_the_right() {
        let mut sheet = merged_sheet("D1:F2", "wide");
        delete_units(&mut sheet, Axis::Column, 1, 2, DeleteMergePolicy::UnmergeOnly).unwrap();

        assert_eq!(regions(&sheet), vec!["B1:D2"]);
        assert_eq!(sheet.text(at("B1")), "wide");
    }

    #[test]
    fn test_no_regions_is_plain_delete() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_text("a"));
        sheet.set_cell(at("A4"), Cell::new_text("d"));

        let report = delete_units(&mut sheet, Axis::Row, 2, 2, DeleteMergePolicy::UnmergeOnly).unwrap();

        assert_eq!(report, DeletionReport::default());
        assert_eq!(sheet.text(at("A2")), "d");
    }

    #[test]
    fn test_delete_rejects_bad_band() {
        let mut sheet = Worksheet::new("Sheet1");
        let err = delete_units(&mut sheet, Axis::Row, 0, 1, DeleteMergePolicy::Ignore).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::StructuralEditFailure);
        assert!(delete_units(&mut sheet, Axis::Column, 16_384, 2, DeleteMergePolicy::Ignore).is_err());
    }

    #[test]
    fn test_insert_moves_regions_at_or_after_position() {
        let mut sheet = merged_sheet("A3:B4", "moved");
        merge(&mut sheet, rect("D1:E5")).unwrap();

        insert_units(&mut sheet, Axis::Row, 3, 2).unwrap();

        assert_eq!(regions(&sheet), vec!["D1:E5", "A5:B6"]);
        assert_eq!(sheet.text(at("A5")), "moved");
    }

    #[test]
    fn test_insert_failure_restores_regions() {
        let mut sheet = merged_sheet("A3:B4", "x");
        sheet.set_cell(CellRef::new(MAX_ROWS, 1), Cell::new_text("bottom"));

        assert!(insert_units(&mut sheet, Axis::Row, 1, 1).is_err());
        assert_eq!(regions(&sheet), vec!["A3:B4"]);
    }

    #[test]
    fn test_hide_and_unhide() {
        let mut sheet = merged_sheet("A1:B2", "x");
        set_hidden(&mut sheet, Axis::Column, 2, 3, true).unwrap();
        assert!(sheet.is_hidden(Axis::Column, 4));
        assert!(!sheet.is_hidden(Axis::Column, 5));
        assert_eq!(regions(&sheet), vec!["A1:B2"]);

        set_hidden(&mut sheet, Axis::Column, 3, 1, false).unwrap();
        assert!(!sheet.is_hidden(Axis::Column, 3));
        assert!(set_hidden(&mut sheet, Axis::Row, 0, 1, true).is_err());
    }

    #[test]
    fn test_delete_hidden_rows_beyond_extent() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_text("1"));
        sheet.set_cell(at("A3"), Cell::new_text("3"));
        sheet.set_cell(at("A5"), Cell::new_text("5"));
        set_hidden(&mut sheet, Axis::Row, 2, 1, true).unwrap();
        set_hidden(&mut sheet, Axis::Row, 4, 1, true).unwrap();
        set_hidden(&mut sheet, Axis::Row, 40, 1, true).unwrap();

        let outcomes = delete_hidden_units(&mut sheet, Axis::Row, DeleteMergePolicy::Ignore, 100);

        assert_eq!(outcomes.keys().copied().collect::<Vec<_>>(), vec![2, 4, 40]);
        assert!(outcomes.values().all(|o| *o == UnitOutcome::Deleted));
        assert_eq!(sheet.text(at("A2")), "3");
        assert_eq!(sheet.text(at("A3")), "5");
        assert!(sheet.hidden_rows.is_empty());
    }

    #[test]
    fn test_delete_hidden_reconciles_per_unit() {
        let mut sheet = merged_sheet("B4:C6", "m");
        set_hidden(&mut sheet, Axis::Row, 1, 2, true).unwrap();
        set_hidden(&mut sheet, Axis::Row, 5, 1, true).unwrap();

        delete_hidden_units(&mut sheet, Axis::Row, DeleteMergePolicy::UnmergeOnly, 10);

        assert_eq!(regions(&sheet), vec!["B2:C3"]);
        assert_eq!(sheet.text(at("B2")), "m");
    }
}
