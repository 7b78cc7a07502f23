//! FILENAME: app/batch/src/outcome.rs
//! PURPOSE: Result values returned across the batch API boundary.
//! CONTEXT: Handlers collect what happened into a `StepOutcome`; the
//! interpreter turns it into a `StepResult` (one per step, in order).
//! Nothing in here is an error type: failures are data.

use std::path::PathBuf;

use engine::{EditError, ErrorKind};
use log::warn;
use persistence::ReportRow;
use serde::Serialize;

/// Messages listed in a step detail before the rest is summarized.
const DETAIL_SAMPLE: usize = 5;

/// What a handler observed while running one step over every file.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: Vec<(Option<ErrorKind>, String)>,
}

impl StepOutcome {
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "STEP", "{}", message);
        self.warnings.push(message);
    }

    pub fn fail(&mut self, kind: Option<ErrorKind>, message: impl Into<String>) {
        let message = message.into();
        warn!(target: "STEP", "failed: {}", message);
        self.failures.push((kind, message));
    }

    /// Records an engine error at `location` (file or file/sheet).
    pub fn edit_error(&mut self, location: &str, error: &EditError) {
        self.fail(Some(error.kind()), format!("{}: {}", location, error));
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn sample(messages: &[String]) -> String {
    let mut text = messages.iter().take(DETAIL_SAMPLE).cloned().collect::<Vec<_>>().join("; ");
    if messages.len() > DETAIL_SAMPLE {
        text.push_str(&format!("; ... ({} more)", messages.len() - DETAIL_SAMPLE));
    }
    text
}

/// Result of one step, as shown to the user and written to the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// 1-based position in the step list.
    pub step: usize,
    pub operation: String,
    pub display_name: String,
    pub success: bool,
    /// Kind of the first failure.
    pub error_kind: Option<ErrorKind>,
    pub detail: String,
}

impl StepResult {
    pub fn from_outcome(step: usize, operation: &str, display_name: &str, outcome: StepOutcome) -> Self {
        let success = outcome.is_success();
        let detail = if success {
            let extra: Vec<String> = outcome.warnings.iter().chain(outcome.notes.iter()).cloned().collect();
            if extra.is_empty() {
                "执行成功".to_string()
            } else {
                format!("执行成功 - {}", sample(&extra))
            }
        } else {
            let messages: Vec<String> = outcome.failures.iter().map(|(_, m)| m.clone()).collect();
            format!("执行失败: {}", sample(&messages))
        };

        StepResult {
            step,
            operation: operation.to_string(),
            display_name: display_name.to_string(),
            success,
            error_kind: outcome.failures.first().and_then(|(kind, _)| *kind),
            detail,
        }
    }

    /// A step that did not run at all.
    pub fn failed(step: usize, operation: &str, display_name: &str, kind: Option<ErrorKind>, message: &str) -> Self {
        StepResult {
            step,
            operation: operation.to_string(),
            display_name: display_name.to_string(),
            success: false,
            error_kind: kind,
            detail: format!("执行失败: {}", message),
        }
    }

    pub fn report_row(&self) -> ReportRow {
        ReportRow {
            step: self.step,
            operation: self.display_name.clone(),
            success: self.success,
            detail: self.detail.clone(),
        }
    }
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FileStatus {
    Saved(PathBuf),
    LoadFailed(String),
    SaveFailed(String),
    /// Steps ran but the batch was cancelled or aborted before saving.
    NotSaved(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub input: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileResult {
    pub fn is_saved(&self) -> bool {
        matches!(self.status, FileStatus::Saved(_))
    }
}

/// Everything a batch run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub steps: Vec<StepResult>,
    pub files: Vec<FileResult>,
    pub report_path: Option<PathBuf>,
    pub cancelled: bool,
    /// A step failed with `keep_going_on_step_error` off.
    pub aborted: bool,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        !self.cancelled
            && !self.aborted
            && self.steps.iter().all(|s| s.success)
            && self.files.iter().all(|f| f.is_saved())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_detail_lists_warnings_first() {
        let mut outcome = StepOutcome::default();
        outcome.note("merged 2 region(s)");
        outcome.warn("a.xlsx/Sheet1: discarded 1 value(s)");

        let result = StepResult::from_outcome(3, "merge_cells", "合并单元格", outcome);
        assert!(result.success);
        assert_eq!(result.error_kind, None);
        assert_eq!(result.detail, "执行成功 - a.xlsx/Sheet1: discarded 1 value(s); merged 2 region(s)");
    }

    #[test]
    fn test_failure_detail_and_kind() {
        let mut outcome = StepOutcome::default();
        outcome.edit_error("a.xlsx/Sheet1", &EditError::region_conflict("A1:B2", "overlaps C2:D3"));
        for i in 0..6 {
            outcome.fail(None, format!("extra {}", i));
        }

        let result = StepResult::from_outcome(1, "merge_cells", "合并单元格", outcome);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::RegionConflict));
        assert!(result.detail.starts_with("执行失败: a.xlsx/Sheet1: Region conflict at A1:B2"));
        assert!(result.detail.ends_with("(2 more)"));
    }

    #[test]
    fn test_report_row_uses_display_name() {
        let result = StepResult::failed(2, "explode", "explode", None, "unknown operation 'explode'");
        let row = result.report_row();
        assert_eq!(row.step, 2);
        assert!(!row.success);
        assert_eq!(row.detail, "执行失败: unknown operation 'explode'");
    }

    #[test]
    fn test_file_status_serializes_tagged() {
        let file = FileResult {
            input: PathBuf::from("in.xlsx"),
            status: FileStatus::LoadFailed("bad zip".to_string()),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["status"], "load_failed");
        assert_eq!(json["detail"], "bad zip");
    }
}
