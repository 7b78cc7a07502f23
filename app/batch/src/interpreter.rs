//! FILENAME: app/batch/src/interpreter.rs
//! PURPOSE: Runs a step list over a set of workbooks.
//! CONTEXT: Steps run strictly in list order, each over every open file,
//! and each sees the result of the previous ones. A step that fails (or
//! failed to build) is recorded and the batch continues unless
//! `keep_going_on_step_error` is off. Outputs are saved only when every
//! step got its turn.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use persistence::{save_report, save_xlsx, ReportRow};

use crate::config::BatchConfig;
use crate::context::{BatchContext, CancelToken, ProgressFn};
use crate::error::BatchError;
use crate::operations;
use crate::outcome::{BatchReport, FileResult, FileStatus, StepOutcome, StepResult};
use crate::steps::{Operation, StepEntry, StepList};
use crate::{log_enter, log_exit};

// ============================================================================
// DISPATCH
// ============================================================================

pub fn execute_operation(ctx: &mut BatchContext, operation: &Operation) -> StepOutcome {
    match operation {
        Operation::ConvertFormulasToValues => operations::convert_formulas_to_values(ctx),
        Operation::UnmergeAll { policy } => operations::unmerge_everything(ctx, *policy),
        Operation::UnmergeRange { range, policy } => operations::unmerge_in_range(ctx, range, *policy),
        Operation::Merge { rect, sheet_indexes } => operations::merge_cells(ctx, *rect, sheet_indexes),
        Operation::CreateWorksheet { name } => operations::create_worksheet(ctx, name),
        Operation::DeleteWorksheet { name } => operations::delete_worksheet(ctx, name),
        Operation::Structural {
            edit,
            axis,
            positions,
            sheet_indexes,
            policy,
        } => operations::structural_edit(ctx, *edit, *axis, positions, sheet_indexes, *policy),
        Operation::DeleteHidden {
            axis,
            sheet_indexes,
            policy,
        } => operations::delete_hidden(ctx, *axis, sheet_indexes, *policy),
        Operation::FontColor { color, target } => operations::set_font_color(ctx, *color, target),
        Operation::FillColor { color, target } => operations::set_fill_color(ctx, *color, target),
        Operation::Border { add, target } => operations::set_borders(ctx, *add, target),
        Operation::SetContent { range, content } => operations::set_content(ctx, range, content),
    }
}

/// Runs one entry. `number` is its 1-based position in the list.
pub fn execute_step(ctx: &mut BatchContext, number: usize, entry: &StepEntry) -> StepResult {
    match &entry.operation {
        Ok(operation) => {
            let code = operation.code();
            info!(target: "STEP", "step {}: {}", number, code.name());
            let outcome = execute_operation(ctx, operation);
            let result = StepResult::from_outcome(number, code.name(), code.display_name(), outcome);
            if result.success {
                info!(target: "STEP", "step {} succeeded", number);
            } else {
                error!(target: "STEP", "step {} failed: {}", number, result.detail);
            }
            result
        }
        Err(e) => {
            error!(target: "STEP", "step {} ({}) not run: {}", number, entry.descriptor.operation, e);
            StepResult::failed(number, &entry.descriptor.operation, &entry.display_name(), e.kind, &e.message)
        }
    }
}

/// Step results plus why the run stopped early, if it did.
#[derive(Debug, Clone, Default)]
pub struct StepRun {
    pub results: Vec<StepResult>,
    pub cancelled: bool,
    pub aborted: bool,
}

pub fn run_steps(ctx: &mut BatchContext, steps: &StepList) -> StepRun {
    let total = steps.len();
    let mut run = StepRun::default();

    for (index, entry) in steps.entries.iter().enumerate() {
        if ctx.is_cancelled() {
            warn!(target: "STEP", "cancelled before step {} of {}", index + 1, total);
            run.cancelled = true;
            break;
        }

        let result = execute_step(ctx, index + 1, entry);
        let failed = !result.success;
        run.results.push(result);
        ctx.report_progress(index + 1, total);

        if failed && !ctx.config.keep_going_on_step_error {
            warn!(target: "STEP", "stopping after failed step {}", index + 1);
            run.aborted = true;
            break;
        }
    }
    run
}

// ============================================================================
// OUTPUT
// ============================================================================

/// `name`, or `stem_N.ext` when an earlier output already took it.
fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    let mut candidate = name.to_string();
    let path = Path::new(name);
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let ext = path.extension().map(|s| s.to_string_lossy().into_owned());
    let mut n = 2;
    while used.contains(&candidate) {
        candidate = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        n += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Saves every open workbook into the output directory under its input's
/// file name.
pub fn save_outputs(ctx: &BatchContext) -> Vec<FileResult> {
    let output_dir = &ctx.config.output_dir;
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        error!(target: "FILE", "cannot create {}: {}", output_dir.display(), e);
        let message = format!("cannot create {}: {}", output_dir.display(), e);
        return ctx
            .files
            .iter()
            .map(|file| FileResult {
                input: file.input_path(),
                status: FileStatus::SaveFailed(message.clone()),
            })
            .collect();
    }

    let mut used = HashSet::new();
    ctx.files
        .iter()
        .map(|file| {
            let path = output_dir.join(unique_name(&mut used, &file.name));
            let status = match save_xlsx(&file.workbook, &path) {
                Ok(()) => {
                    info!(target: "FILE", "saved {}", path.display());
                    FileStatus::Saved(path)
                }
                Err(e) => {
                    error!(target: "FILE", "saving {} failed: {}", path.display(), e);
                    FileStatus::SaveFailed(e.to_string())
                }
            };
            FileResult {
                input: file.input_path(),
                status,
            }
        })
        .collect()
}

/// Writes the execution report. A failure is logged, never fatal.
pub fn write_report(config: &BatchConfig, results: &[StepResult]) -> Option<PathBuf> {
    let rows: Vec<ReportRow> = results.iter().map(StepResult::report_row).collect();
    match save_report(&rows, &config.output_dir, &config.report_name) {
        Ok(path) => Some(path),
        Err(e) => {
            error!(target: "FILE", "writing the report failed: {}", e);
            None
        }
    }
}

/// Runs the steps over an already opened context, then saves.
pub fn run_context(ctx: &mut BatchContext, steps: &StepList) -> BatchReport {
    let run = run_steps(ctx, steps);

    let files = if run.cancelled || run.aborted {
        let reason = if run.cancelled {
            "batch cancelled"
        } else {
            "batch stopped after a failed step"
        };
        ctx.files
            .iter()
            .map(|file| FileResult {
                input: file.input_path(),
                status: FileStatus::NotSaved(reason.to_string()),
            })
            .collect()
    } else {
        save_outputs(ctx)
    };

    let report_path = if ctx.config.write_report {
        write_report(&ctx.config, &run.results)
    } else {
        None
    };

    BatchReport {
        steps: run.results,
        files,
        report_path,
        cancelled: run.cancelled,
        aborted: run.aborted,
    }
}

/// Copies and loads `inputs`, runs `steps` over them and saves the results.
/// Only setup failures are errors; step and file failures are in the report.
pub fn run_batch(
    config: BatchConfig,
    steps: &StepList,
    inputs: &[PathBuf],
    cancel: CancelToken,
    progress: Option<ProgressFn>,
) -> Result<BatchReport, BatchError> {
    log_enter!("STEP", "run_batch", "steps={} inputs={}", steps.len(), inputs.len());

    let (ctx, load_failures) = BatchContext::open(config, inputs)?;
    let mut ctx = ctx.with_cancel_token(cancel);
    if let Some(progress) = progress {
        ctx = ctx.with_progress(progress);
    }

    let mut report = if ctx.files.is_empty() {
        error!(target: "STEP", "no input could be loaded, no step run");
        BatchReport::default()
    } else {
        run_context(&mut ctx, steps)
    };

    report.files.extend(load_failures);
    report
        .files
        .sort_by_key(|f| inputs.iter().position(|input| *input == f.input).unwrap_or(usize::MAX));

    let failed_steps = report.steps.iter().filter(|s| !s.success).count();
    let saved = report.files.iter().filter(|f| f.is_saved()).count();
    info!(
        target: "STEP",
        "batch done: {} step(s), {} failed, {}/{} file(s) saved",
        report.steps.len(),
        failed_steps,
        saved,
        inputs.len()
    );
    log_exit!("STEP", "run_batch", "ok={}", report.all_succeeded());
    Ok(report)
}
