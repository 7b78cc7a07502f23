//! FILENAME: app/batch/src/operations.rs
//! PURPOSE: One handler per operation, applied to every open workbook.
//! CONTEXT: A failure in one file or sheet is recorded in the step outcome and
//! the handler moves on to the next; nothing here returns early on error.
//! Formatting, content and formula steps cover every sheet. Merge and
//! structural steps cover the step's sheet indexes (or the configured ones).

use engine::{
    apply_over_range, apply_over_sheet, delete_hidden_units, delete_units, insert_units, merge, set_hidden,
    unmerge_all, unmerge_region, ApplyOutcome, Axis, BorderStyle, Borders, CellRange, CellRef, CellStyle,
    CellValue, Color, DeleteMergePolicy, EditResult, ErrorKind, MergedRegion, Position, RangePolicy, RangeSpec,
    RegionIndex, SheetStore, UnitOutcome, UnmergeValuePolicy, Worksheet,
};
use log::{debug, info};
use persistence::PersistenceError;

use crate::context::{existing_sheets, BatchContext};
use crate::outcome::StepOutcome;
use crate::steps::{RangeTarget, StructuralEdit};
use crate::{log_enter, log_exit};

fn location(file: &str, sheet: &Worksheet) -> String {
    format!("{}/{}", file, sheet.name)
}

// ============================================================================
// CONTENT
// ============================================================================

/// Drops every formula, keeping its last computed value.
pub fn convert_formulas_to_values(ctx: &mut BatchContext) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut converted = 0usize;

    for file in ctx.files.iter_mut() {
        for sheet in file.workbook.sheets.iter_mut() {
            let before = converted;
            for cell in sheet.grid.cells.values_mut() {
                if cell.formula.take().is_some() {
                    converted += 1;
                }
            }
            debug!(target: "STEP", "{}: {} formula(s) converted", location(&file.name, sheet), converted - before);
        }
    }

    outcome.note(format!("converted {} formula cell(s)", converted));
    outcome
}

/// Writes `content` as text into every target cell; merged regions receive
/// it at their anchor only. Empty content clears the cells.
pub fn set_content(ctx: &mut BatchContext, range: &RangeSpec, content: &str) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut written = 0usize;

    for file in ctx.files.iter_mut() {
        for sheet in file.workbook.sheets.iter_mut() {
            let result = apply_over_range(sheet, range, RangePolicy::AnchorOnly, |s, pos| {
                let cell = s.cell_mut(pos);
                cell.formula = None;
                cell.value = if content.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(content.to_string())
                };
                Ok(())
            });
            written += result.visited;
            record_apply(&mut outcome, &file.name, sheet, &result);
        }
    }

    outcome.note(format!("wrote {} cell(s)", written));
    outcome
}

// ============================================================================
// FORMATTING
// ============================================================================

fn record_apply(outcome: &mut StepOutcome, file: &str, sheet: &Worksheet, result: &ApplyOutcome) {
    if let Some(summary) = result.failure_summary() {
        outcome.warn(format!("{}: {}", location(file, sheet), summary));
    }
}

/// Applies a style change to the literal cells of the target. A merged
/// region is only covered where the target names its cells.
fn format_cells(ctx: &mut BatchContext, target: &RangeTarget, change: impl Fn(&mut CellStyle)) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut formatted = 0usize;

    for file in ctx.files.iter_mut() {
        for sheet in file.workbook.sheets.iter_mut() {
            let transform = |s: &mut Worksheet, pos: CellRef| -> EditResult<()> {
                s.update_style(pos, &change);
                Ok(())
            };
            let result = match target {
                RangeTarget::Specific(range) => apply_over_range(sheet, range, RangePolicy::Raw, transform),
                RangeTarget::EntireSheet => apply_over_sheet(sheet, RangePolicy::Raw, transform),
            };
            formatted += result.visited;
            record_apply(&mut outcome, &file.name, sheet, &result);
        }
    }

    outcome.note(format!("formatted {} cell(s)", formatted));
    outcome
}

pub fn set_font_color(ctx: &mut BatchContext, color: Color, target: &RangeTarget) -> StepOutcome {
    format_cells(ctx, target, |style| style.font.color = color)
}

pub fn set_fill_color(ctx: &mut BatchContext, color: Color, target: &RangeTarget) -> StepOutcome {
    format_cells(ctx, target, |style| style.background = Some(color))
}

/// Thin borders on every edge when `add`, no borders otherwise.
pub fn set_borders(ctx: &mut BatchContext, add: bool, target: &RangeTarget) -> StepOutcome {
    let borders = if add {
        Borders::all(BorderStyle::thin())
    } else {
        Borders::default()
    };
    format_cells(ctx, target, |style| style.borders = borders.clone())
}

// ============================================================================
// MERGES
// ============================================================================

pub fn unmerge_everything(ctx: &mut BatchContext, policy: UnmergeValuePolicy) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut total = 0usize;

    for file in ctx.files.iter_mut() {
        for sheet in file.workbook.sheets.iter_mut() {
            let removed = unmerge_all(sheet, policy);
            if !removed.is_empty() {
                info!(target: "MERGE", "{}: unmerged {} region(s)", location(&file.name, sheet), removed.len());
            }
            total += removed.len();
        }
    }

    outcome.note(format!("unmerged {} region(s)", total));
    outcome
}

/// Unmerges the regions intersecting `range` on every sheet. Fails when no
/// file has one; files without any are named in a warning.
pub fn unmerge_in_range(ctx: &mut BatchContext, range: &RangeSpec, policy: UnmergeValuePolicy) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut total = 0usize;
    let mut without = Vec::new();

    for file in ctx.files.iter_mut() {
        let mut found = 0usize;
        for sheet in file.workbook.sheets.iter_mut() {
            let mut regions: Vec<MergedRegion> = Vec::new();
            for rect in range.iter() {
                for region in sheet.regions().intersecting(rect) {
                    if !regions.contains(&region) {
                        regions.push(region);
                    }
                }
            }
            for region in &regions {
                unmerge_region(sheet, region, policy);
            }
            found += regions.len();
        }
        if found == 0 {
            without.push(file.name.clone());
        }
        total += found;
    }

    if total == 0 {
        outcome.fail(
            Some(ErrorKind::RegionConflict),
            format!("no merged region intersects {} in any file", range),
        );
    } else {
        if !without.is_empty() {
            outcome.warn(format!("no merged region intersects {} in: {}", range, without.join(", ")));
        }
        outcome.note(format!("unmerged {} region(s)", total));
    }
    outcome
}

pub fn merge_cells(ctx: &mut BatchContext, rect: CellRange, sheet_indexes: &Option<Vec<usize>>) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let indexes = ctx.sheet_indexes(sheet_indexes);
    let mut merged = 0usize;

    for file in ctx.files.iter_mut() {
        for index in existing_sheets(file, &indexes, &mut outcome) {
            let sheet = &mut file.workbook.sheets[index];
            let at = location(&file.name, sheet);
            match merge(sheet, rect) {
                Ok(result) => {
                    if let Some(warning) = result.warning() {
                        outcome.warn(format!("{}: {}", at, warning));
                    }
                    merged += 1;
                }
                Err(e) => outcome.edit_error(&at, &e),
            }
        }
    }

    outcome.note(format!("merged {} on {} sheet(s)", rect, merged));
    outcome
}

// ============================================================================
// WORKSHEETS
// ============================================================================

pub fn create_worksheet(ctx: &mut BatchContext, name: &str) -> StepOutcome {
    let mut outcome = StepOutcome::default();

    for file in ctx.files.iter_mut() {
        match file.workbook.add_sheet(name) {
            Ok(_) => {}
            Err(PersistenceError::DuplicateSheet(_)) => outcome.fail(
                Some(ErrorKind::StructuralEditFailure),
                format!("{}: sheet '{}' already exists", file.name, name),
            ),
            Err(e) => outcome.fail(None, format!("{}: {}", file.name, e)),
        }
    }
    outcome
}

/// Deletes the sheet from every file that has it. Files missing it make
/// the step fail, after the others have been processed.
pub fn delete_worksheet(ctx: &mut BatchContext, name: &str) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let mut missing = Vec::new();

    for file in ctx.files.iter_mut() {
        match file.workbook.remove_sheet(name) {
            Ok(_) => {}
            Err(PersistenceError::SheetNotFound(_)) => missing.push(file.name.clone()),
            Err(PersistenceError::LastSheet(_)) => outcome.fail(
                Some(ErrorKind::StructuralEditFailure),
                format!("{}: '{}' is the only sheet and cannot be deleted", file.name, name),
            ),
            Err(e) => outcome.fail(None, format!("{}: {}", file.name, e)),
        }
    }

    if !missing.is_empty() {
        outcome.fail(
            Some(ErrorKind::SheetNotFound),
            format!("sheet '{}' does not exist in: {}", name, missing.join(", ")),
        );
    }
    outcome
}

// ============================================================================
// ROWS AND COLUMNS
// ============================================================================

fn apply_structural(
    sheet: &mut Worksheet,
    at: &str,
    edit: StructuralEdit,
    axis: Axis,
    position: &Position,
    policy: DeleteMergePolicy,
    outcome: &mut StepOutcome,
) {
    let start = position.start();
    let count = position.count();
    let result = match edit {
        StructuralEdit::Insert => insert_units(sheet, axis, start, count),
        StructuralEdit::Delete => delete_units(sheet, axis, start, count, policy).map(|report| {
            if !report.removed.is_empty() {
                let names: Vec<String> = report.removed.iter().map(|r| r.to_string()).collect();
                outcome.warn(format!("{}: merged region(s) {} not recreated", at, names.join(", ")));
            }
        }),
        StructuralEdit::Hide => set_hidden(sheet, axis, start, count, true),
        StructuralEdit::Unhide => set_hidden(sheet, axis, start, count, false),
    };
    if let Err(e) = result {
        outcome.edit_error(&format!("{} {} {}", at, axis, position), &e);
    }
}

/// Applies each position token in the order written. Inserting or deleting
/// shifts the numbering later tokens refer to.
pub fn structural_edit(
    ctx: &mut BatchContext,
    edit: StructuralEdit,
    axis: Axis,
    positions: &[Position],
    sheet_indexes: &Option<Vec<usize>>,
    policy: Option<DeleteMergePolicy>,
) -> StepOutcome {
    log_enter!("STRUCT", "structural_edit", "{:?} {} x{}", edit, axis, positions.len());
    let mut outcome = StepOutcome::default();
    let indexes = ctx.sheet_indexes(sheet_indexes);
    let policy = ctx.delete_policy(policy);

    for file in ctx.files.iter_mut() {
        for index in existing_sheets(file, &indexes, &mut outcome) {
            let sheet = &mut file.workbook.sheets[index];
            let at = location(&file.name, sheet);
            for position in positions {
                apply_structural(sheet, &at, edit, axis, position, policy, &mut outcome);
            }
        }
    }

    if matches!(edit, StructuralEdit::Insert | StructuralEdit::Delete) && positions.len() > 1 {
        outcome.note(format!("{} positions were applied in order; each shifted the ones after it", axis));
    }
    log_exit!("STRUCT", "structural_edit", "failures={}", outcome.failures.len());
    outcome
}

pub fn delete_hidden(
    ctx: &mut BatchContext,
    axis: Axis,
    sheet_indexes: &Option<Vec<usize>>,
    policy: Option<DeleteMergePolicy>,
) -> StepOutcome {
    let mut outcome = StepOutcome::default();
    let indexes = ctx.sheet_indexes(sheet_indexes);
    let policy = ctx.delete_policy(policy);
    let scan_limit = ctx.config.scan_limit(axis);
    let mut deleted = 0usize;

    for file in ctx.files.iter_mut() {
        for index in existing_sheets(file, &indexes, &mut outcome) {
            let sheet = &mut file.workbook.sheets[index];
            let at = location(&file.name, sheet);
            for (unit, result) in delete_hidden_units(sheet, axis, policy, scan_limit) {
                match result {
                    UnitOutcome::Deleted => deleted += 1,
                    UnitOutcome::Failed(message) => outcome.fail(
                        Some(ErrorKind::StructuralEditFailure),
                        format!("{}: hidden {} {}: {}", at, axis, unit, message),
                    ),
                }
            }
        }
    }

    outcome.note(format!("deleted {} hidden {}(s)", deleted, axis));
    outcome
}
