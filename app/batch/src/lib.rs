//! FILENAME: app/batch/src/lib.rs
// PURPOSE: Main library entry point of the batch editor.
// CONTEXT: A batch is a step list (JSON) run in order over copies of one or
// more xlsx workbooks. Results are saved to an output directory together
// with an execution report.

pub mod config;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod logging;
pub mod operations;
pub mod outcome;
pub mod steps;

pub use config::{BatchConfig, DEFAULT_REPORT_NAME};
pub use context::{BatchContext, CancelToken, OpenWorkbook, ProgressFn};
pub use error::BatchError;
pub use interpreter::{execute_operation, execute_step, run_batch, run_context, run_steps, StepRun};
pub use logging::{init_log_file, next_seq, write_log};
pub use outcome::{BatchReport, FileResult, FileStatus, StepOutcome, StepResult};
pub use steps::{
    build_operation, resolve_color, Operation, OperationCode, RangeTarget, StepDescriptor, StepEntry, StepError,
    StepList, StructuralEdit,
};
