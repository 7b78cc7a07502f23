//! FILENAME: core/engine/src/merging.rs
//! PURPOSE: Merge and unmerge operations on top of the storage primitives.
//! CONTEXT: Merging keeps only the anchor value. Unmerging either leaves the
//! value at the anchor (Discard) or copies it to every member (Broadcast).

use log::{info, warn};
use parser::{CellRange, CellRef};
use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::merge::{MergedRegion, RegionIndex};
use crate::sheet::SheetStore;

/// How many discarded cells a merge warning names before summarizing.
pub const MERGE_WARNING_SAMPLE: usize = 5;

/// What to do with member cells when a region is unmerged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnmergeValuePolicy {
    /// Only the anchor keeps the value.
    #[default]
    Discard,
    /// Every member receives the anchor's value and formula.
    Broadcast,
}

/// Result of a merge: the new region and the non-empty values it discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub region: MergedRegion,
    pub discarded: Vec<(CellRef, String)>,
}

impl MergeOutcome {
    /// Human-readable warning, None when nothing was discarded.
    pub fn warning(&self) -> Option<String> {
        if self.discarded.is_empty() {
            return None;
        }
        let sample: Vec<String> = self
            .discarded
            .iter()
            .take(MERGE_WARNING_SAMPLE)
            .map(|(pos, text)| format!("{}={}", pos, text))
            .collect();
        let more = if self.discarded.len() > MERGE_WARNING_SAMPLE { ", ..." } else { "" };
        Some(format!(
            "merging {} discarded {} non-anchor value(s): {}{}",
            self.region,
            self.discarded.len(),
            sample.join(", "),
            more
        ))
    }
}

/// Merges `rect`. Non-anchor values are discarded with a warning.
pub fn merge<S: SheetStore>(sheet: &mut S, rect: CellRange) -> EditResult<MergeOutcome> {
    if rect.is_single_cell() {
        return Err(EditError::region_conflict(rect, "a merge must cover at least two cells"));
    }
    if let Some(existing) = sheet.regions().intersecting(&rect).first() {
        return Err(EditError::region_conflict(
            rect,
            format!("overlaps merged region {}", existing),
        ));
    }

    let anchor = rect.top_left();
    let discarded: Vec<(CellRef, String)> = rect
        .cells()
        .filter(|pos| *pos != anchor)
        .filter_map(|pos| {
            sheet
                .cell(pos)
                .filter(|c| !c.is_blank())
                .map(|c| (pos, c.display_value()))
        })
        .collect();

    let region = sheet.add_region(rect)?;
    let outcome = MergeOutcome { region, discarded };
    match outcome.warning() {
        Some(message) => warn!(target: "MERGE", "{}: {}", sheet.name(), message),
        None => info!(target: "MERGE", "{}: merged {}", sheet.name(), region),
    }
    Ok(outcome)
}

/// Unregisters one region and applies the value policy to its members.
pub fn unmerge_region<S: SheetStore>(sheet: &mut S, region: &MergedRegion, policy: UnmergeValuePolicy) {
    let anchor = sheet.cell(region.anchor()).cloned();
    sheet.remove_region(region);

    for pos in region.non_anchor_cells() {
        match (policy, &anchor) {
            (UnmergeValuePolicy::Broadcast, Some(source)) if !source.is_blank() => {
                sheet.cell_mut(pos).copy_content_from(source);
            }
            _ => sheet.clear_content(pos),
        }
    }
}

/// Unmerges every region intersecting `rect`. Fails when there is none.
pub fn unmerge<S: SheetStore>(
    sheet: &mut S,
    rect: CellRange,
    policy: UnmergeValuePolicy,
) -> EditResult<Vec<MergedRegion>> {
    let regions = sheet.regions().intersecting(&rect);
    if regions.is_empty() {
        return Err(EditError::region_conflict(rect, "no merged region intersects the range"));
    }
    for region in &regions {
        unmerge_region(sheet, region, policy);
    }
    info!(
        target: "MERGE",
        "{}: unmerged {} region(s) in {} ({:?})",
        sheet.name(),
        regions.len(),
        rect,
        policy
    );
    Ok(regions)
}

/// Unmerges every region of the sheet. An unmerged sheet is not an error.
pub fn unmerge_all<S: SheetStore>(sheet: &mut S, policy: UnmergeValuePolicy) -> Vec<MergedRegion> {
    let regions = sheet.regions().all();
    for region in &regions {
        unmerge_region(sheet, region, policy);
    }
    if !regions.is_empty() {
        info!(target: "MERGE", "{}: unmerged all {} region(s)", sheet.name(), regions.len());
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellValue};
    use crate::sheet::Worksheet;
    use crate::ErrorKind;

    fn at(a1: &str) -> CellRef {
        parser::parse_cell_range(a1).unwrap().top_left()
    }

    fn rect(a: &str) -> CellRange {
        parser::parse_cell_range(a).unwrap()
    }

    #[test]
    fn test_merge_reports_discarded_values() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_text("anchor"));
        sheet.set_cell(at("B1"), Cell::new_text("lost"));
        sheet.set_cell(at("A2"), Cell::new_number(7.0));

        let outcome = merge(&mut sheet, rect("A1:B2")).unwrap();

        assert_eq!(outcome.discarded, vec![(at("B1"), "lost".to_string()), (at("A2"), "7".to_string())]);
        let warning = outcome.warning().unwrap();
        assert!(warning.contains("B1=lost"));
        assert!(warning.contains("2 non-anchor"));
        assert_eq!(sheet.text(at("A1")), "anchor");
        assert_eq!(sheet.text(at("B1")), "");
    }

    #[test]
    fn test_merge_warning_is_capped() {
        let mut sheet = Worksheet::new("Sheet1");
        for col in 1..=8 {
            sheet.set_cell(CellRef::new(1, col), Cell::new_number(col as f64));
        }
        let outcome = merge(&mut sheet, rect("A1:H1")).unwrap();
        assert_eq!(outcome.discarded.len(), 7);
        let warning = outcome.warning().unwrap();
        assert!(warning.ends_with(", ..."));
        assert!(!warning.contains("H1=8"));
        assert!(warning.contains("F1=6"));
    }

    #[test]
    fn test_merge_rejects_single_cell_and_overlap() {
        let mut sheet = Worksheet::new("Sheet1");
        assert_eq!(merge(&mut sheet, rect("C3")).unwrap_err().kind(), ErrorKind::RegionConflict);

        merge(&mut sheet, rect("A1:B2")).unwrap();
        let err = merge(&mut sheet, rect("B2:D4")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegionConflict);
        assert!(err.to_string().contains("A1:B2"));
    }

    #[test]
    fn test_round_trip_broadcast_restores_anchor_value() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("B2"), Cell::new_text("V"));
        merge(&mut sheet, rect("B2:C4")).unwrap();

        unmerge(&mut sheet, rect("B2:C4"), UnmergeValuePolicy::Broadcast).unwrap();

        for pos in rect("B2:C4").cells() {
            assert_eq!(sheet.value(pos), CellValue::Text("V".to_string()), "at {}", pos);
        }
        assert!(sheet.merges.is_empty());
    }

    #[test]
    fn test_round_trip_discard_leaves_only_anchor() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("B2"), Cell::new_text("V"));
        merge(&mut sheet, rect("B2:C4")).unwrap();

        unmerge(&mut sheet, rect("C3"), UnmergeValuePolicy::Discard).unwrap();

        assert_eq!(sheet.text(at("B2")), "V");
        for pos in rect("B2:C4").cells().skip(1) {
            assert_eq!(sheet.value(pos), CellValue::Empty, "at {}", pos);
        }
    }

    #[test]
    fn test_broadcast_copies_formula_text() {
        let mut sheet = Worksheet::new("Sheet1");
        sheet.set_cell(at("A1"), Cell::new_formula("=1+1".to_string(), CellValue::Number(2.0)));
        merge(&mut sheet, rect("A1:A2")).unwrap();
        unmerge(&mut sheet, rect("A1:A2"), UnmergeValuePolicy::Broadcast).unwrap();
        assert_eq!(sheet.cell(at("A2")).unwrap().formula.as_deref(), Some("=1+1"));
    }

    #[test]
    fn test_unmerge_without_region_is_conflict() {
        let mut sheet = Worksheet::new("Sheet1");
        let err = unmerge(&mut sheet, rect("A1:B2"), UnmergeValuePolicy::Discard).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RegionConflict);
        assert!(unmerge_all(&mut sheet, UnmergeValuePolicy::Discard).is_empty());
    }

    #[test]
    fn test_unmerge_all() {
        let mut sheet = Worksheet::new("Sheet1");
        merge(&mut sheet, rect("A1:B1")).unwrap();
        merge(&mut sheet, rect("A3:A5")).unwrap();
        assert_eq!(unmerge_all(&mut sheet, UnmergeValuePolicy::Broadcast).len(), 2);
        assert!(sheet.merges.is_empty());
    }
}
