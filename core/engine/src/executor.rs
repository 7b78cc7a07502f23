//! FILENAME: core/engine/src/executor.rs
//! PURPOSE: Applies a per-cell transformation over a parsed range list.
//! CONTEXT: Every range-driven operation declares one `RangePolicy`.
//! Formatting uses `Raw`, content writes use `AnchorOnly`.
//!
//! Each effective cell is visited at most once per call, even when entries of
//! the list overlap or several members of one merged region redirect to the
//! same anchor. Entries are walked in input order, cells row-major.

use std::collections::HashSet;

use log::{debug, warn};
use parser::{CellRange, CellRef, RangeSpec};
use serde::{Deserialize, Serialize};

use crate::error::EditResult;
use crate::merge::{MergedRegion, RegionIndex};
use crate::sheet::SheetStore;

/// Merged-cell handling of a range operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Every literal coordinate, merged members included.
    Raw,
    /// Coordinates inside a merged region redirect to its anchor, once.
    AnchorOnly,
}

/// What happened during one `apply_over_range` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOutcome {
    /// Number of distinct cells the transformation ran on.
    pub visited: usize,
    /// Cells whose transformation failed, with the error text.
    pub failures: Vec<(CellRef, String)>,
}

impl ApplyOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line description of the failures, None when there were none.
    pub fn failure_summary(&self) -> Option<String> {
        let (first, message) = self.failures.first()?;
        Some(format!(
            "{} cell(s) failed, first at {}: {}",
            self.failures.len(),
            first,
            message
        ))
    }

    fn merge_from(&mut self, other: ApplyOutcome) {
        self.visited += other.visited;
        self.failures.extend(other.failures);
    }
}

fn resolve_target(cell: CellRef, policy: RangePolicy, regions: &[MergedRegion]) -> CellRef {
    match policy {
        RangePolicy::Raw => cell,
        RangePolicy::AnchorOnly => regions
            .iter()
            .find(|r| r.contains(cell))
            .map(|r| r.anchor())
            .unwrap_or(cell),
    }
}

fn apply_one_range<S, F>(
    sheet: &mut S,
    range: &CellRange,
    policy: RangePolicy,
    visited: &mut HashSet<CellRef>,
    transform: &mut F,
) -> ApplyOutcome
where
    S: SheetStore,
    F: FnMut(&mut S, CellRef) -> EditResult<()>,
{
    let regions = match policy {
        RangePolicy::Raw => Vec::new(),
        RangePolicy::AnchorOnly => sheet.regions().intersecting(range),
    };

    let mut outcome = ApplyOutcome::default();
    for cell in range.cells() {
        let target = resolve_target(cell, policy, &regions);
        if !visited.insert(target) {
            continue;
        }
        outcome.visited += 1;
        if let Err(e) = transform(sheet, target) {
            warn!(target: "RANGE", "{}: skipping {}: {}", sheet.name(), target, e);
            outcome.failures.push((target, e.to_string()));
        }
    }
    outcome
}

/// Runs `transform` once per distinct effective cell of `spec`.
/// A failing cell is logged and skipped; the rest still run.
pub fn apply_over_range<S, F>(sheet: &mut S, spec: &RangeSpec, policy: RangePolicy, mut transform: F) -> ApplyOutcome
where
    S: SheetStore,
    F: FnMut(&mut S, CellRef) -> EditResult<()>,
{
    let mut visited = HashSet::new();
    let mut outcome = ApplyOutcome::default();
    for range in spec {
        outcome.merge_from(apply_one_range(sheet, range, policy, &mut visited, &mut transform));
    }
    debug!(
        target: "RANGE",
        "{}: applied over {} ({:?}), {} cell(s), {} failure(s)",
        sheet.name(),
        spec,
        policy,
        outcome.visited,
        outcome.failures.len()
    );
    outcome
}

/// The used area of the sheet, None when it holds nothing.
pub fn used_range<S: SheetStore>(sheet: &S) -> Option<CellRange> {
    let rows = sheet.extent(parser::Axis::Row);
    let cols = sheet.extent(parser::Axis::Column);
    if rows == 0 || cols == 0 {
        return None;
    }
    Some(CellRange::from_bounds(1, 1, rows, cols))
}

/// `apply_over_range` over the used area of the sheet.
pub fn apply_over_sheet<S, F>(sheet: &mut S, policy: RangePolicy, transform: F) -> ApplyOutcome
where
    S: SheetStore,
    F: FnMut(&mut S, CellRef) -> EditResult<()>,
{
    match used_range(sheet) {
        Some(range) => apply_over_range(sheet, &RangeSpec::new(vec![range]), policy, transform),
        None => ApplyOutcome::default(),
    }
}
