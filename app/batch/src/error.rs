//! FILENAME: app/batch/src/error.rs

use std::path::PathBuf;

use persistence::PersistenceError;
use thiserror::Error;

/// Failures that stop a whole batch before or outside step execution.
/// Step and per-file failures are results, not errors.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {what}: {source}")]
    Json {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("Step list must be a JSON array of {{\"operation\", \"params\"}} objects")]
    NotAStepList,

    #[error("No input files")]
    NoInputs,
}

impl BatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn json(what: impl Into<String>, source: serde_json::Error) -> Self {
        BatchError::Json {
            what: what.into(),
            source,
        }
    }
}
