//! FILENAME: app/batch/src/context.rs
//! PURPOSE: State shared by every step of one batch.
//! CONTEXT: Holds the open workbooks (each loaded from a private working
//! copy), the configuration, the cancellation flag and the progress callback.
//! Handlers receive `&mut BatchContext` and iterate `files` themselves.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use engine::DeleteMergePolicy;
use log::{error, info};
use persistence::{load_xlsx, Workbook, WorkingCopy, WorkingDir};

use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::outcome::{FileResult, FileStatus, StepOutcome};

/// Cooperative cancellation, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called with (steps done, steps total) after every step.
pub type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;

/// One workbook being edited.
#[derive(Debug)]
pub struct OpenWorkbook {
    /// File name used in messages and for the saved output.
    pub name: String,
    /// None for workbooks added in memory.
    pub source: Option<WorkingCopy>,
    pub workbook: Workbook,
}

impl OpenWorkbook {
    pub fn input_path(&self) -> PathBuf {
        match &self.source {
            Some(copy) => copy.original.clone(),
            None => PathBuf::from(&self.name),
        }
    }
}

pub struct BatchContext {
    pub config: BatchConfig,
    pub files: Vec<OpenWorkbook>,
    cancel: CancelToken,
    progress: Option<ProgressFn>,
    // Dropping it removes the copies.
    _working: Option<WorkingDir>,
}

impl BatchContext {
    /// A context with no files.
    pub fn new(config: BatchConfig) -> Self {
        BatchContext {
            config,
            files: Vec::new(),
            cancel: CancelToken::new(),
            progress: None,
            _working: None,
        }
    }

    /// Copies every input into a working directory and loads the copies.
    /// Inputs that fail to copy or load are reported and left out; the
    /// batch still runs on the rest.
    pub fn open(config: BatchConfig, inputs: &[PathBuf]) -> Result<(Self, Vec<FileResult>), BatchError> {
        if inputs.is_empty() {
            return Err(BatchError::NoInputs);
        }
        let working = WorkingDir::new()?;
        let mut context = BatchContext::new(config);
        let mut failed = Vec::new();

        for (index, input) in inputs.iter().enumerate() {
            match Self::load_one(&working, input, index) {
                Ok(file) => {
                    info!(target: "FILE", "opened {} ({} sheet(s))", file.name, file.workbook.sheets.len());
                    context.files.push(file);
                }
                Err(message) => {
                    error!(target: "FILE", "{}: {}", input.display(), message);
                    failed.push(FileResult {
                        input: input.clone(),
                        status: FileStatus::LoadFailed(message),
                    });
                }
            }
        }

        context._working = Some(working);
        Ok((context, failed))
    }

    fn load_one(working: &WorkingDir, input: &Path, index: usize) -> Result<OpenWorkbook, String> {
        let copy = working.copy_in(input, index).map_err(|e| e.to_string())?;
        let workbook = load_xlsx(&copy.copy).map_err(|e| e.to_string())?;
        Ok(OpenWorkbook {
            name: copy.file_name(),
            source: Some(copy),
            workbook,
        })
    }

    pub fn add_workbook(&mut self, name: impl Into<String>, workbook: Workbook) {
        self.files.push(OpenWorkbook {
            name: name.into(),
            source: None,
            workbook,
        });
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn report_progress(&mut self, done: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(done, total);
        }
    }

    /// Sheet indexes a step targets: its own, else the configured ones.
    pub fn sheet_indexes(&self, requested: &Option<Vec<usize>>) -> Vec<usize> {
        let mut indexes: Vec<usize> = Vec::new();
        for &index in requested.as_ref().unwrap_or(&self.config.sheet_indexes) {
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }
        indexes
    }

    pub fn delete_policy(&self, requested: Option<DeleteMergePolicy>) -> DeleteMergePolicy {
        requested.unwrap_or(self.config.delete_merge_policy)
    }
}

/// The indexes of `indexes` that exist in `workbook`; a warning for the rest.
pub fn existing_sheets(file: &OpenWorkbook, indexes: &[usize], outcome: &mut StepOutcome) -> Vec<usize> {
    let count = file.workbook.sheets.len();
    indexes
        .iter()
        .copied()
        .filter(|&index| {
            if index < count {
                true
            } else {
                outcome.warn(format!(
                    "{}: sheet index {} out of range ({} sheet(s)), skipped",
                    file.name, index, count
                ));
                false
            }
        })
        .collect()
}
