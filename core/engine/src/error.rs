//! FILENAME: core/engine/src/error.rs
//! PURPOSE: Error type shared by every editing operation of the engine.
//! CONTEXT: Operations return `Result<_, EditError>` internally. At the step
//! boundary the error is flattened into an `ErrorKind` tag plus a message.

use parser::{ParseError, ParseErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable tag of an error, reported in step results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedRange,
    InconsistentAxis,
    RegionConflict,
    InvalidPosition,
    StructuralEditFailure,
    SheetNotFound,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedRange => "MalformedRangeError",
            ErrorKind::InconsistentAxis => "InconsistentAxisError",
            ErrorKind::RegionConflict => "RegionConflictError",
            ErrorKind::InvalidPosition => "InvalidPositionError",
            ErrorKind::StructuralEditFailure => "StructuralEditFailure",
            ErrorKind::SheetNotFound => "SheetNotFound",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Region conflict at {range}: {reason}")]
    RegionConflict { range: String, reason: String },

    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    #[error("Structural edit failed: {0}")]
    StructuralEdit(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

impl EditError {
    pub fn region_conflict(range: impl ToString, reason: impl Into<String>) -> Self {
        EditError::RegionConflict {
            range: range.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EditError::Parse(e) => match e.kind {
                ParseErrorKind::MalformedRange => ErrorKind::MalformedRange,
                ParseErrorKind::InconsistentAxis => ErrorKind::InconsistentAxis,
                ParseErrorKind::InvalidPosition => ErrorKind::InvalidPosition,
            },
            EditError::RegionConflict { .. } => ErrorKind::RegionConflict,
            EditError::InvalidPosition(_) => ErrorKind::InvalidPosition,
            EditError::StructuralEdit(_) => ErrorKind::StructuralEditFailure,
            EditError::SheetNotFound(_) => ErrorKind::SheetNotFound,
        }
    }
}

pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_keep_their_kind() {
        let err: EditError = parser::parse_positions("1,A", parser::Axis::Row)
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::InconsistentAxis);

        let err: EditError = parser::parse_range("A1:").unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::MalformedRange);
    }

    #[test]
    fn region_conflict_message() {
        let err = EditError::region_conflict("B2:C3", "overlaps A1:B2");
        assert_eq!(err.kind(), ErrorKind::RegionConflict);
        assert_eq!(err.to_string(), "Region conflict at B2:C3: overlaps A1:B2");
    }
}
