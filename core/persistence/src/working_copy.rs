//! FILENAME: core/persistence/src/working_copy.rs
//! PURPOSE: Per-batch scratch directory holding copies of the input files.
//! CONTEXT: A batch loads from the copy so the user's file is never opened
//! for writing. The directory is removed when the `WorkingDir` is dropped.

use std::path::{Path, PathBuf};

use log::debug;
use tempfile::TempDir;

use crate::PersistenceError;

/// Temporary directory owning the copies of one batch.
#[derive(Debug)]
pub struct WorkingDir {
    dir: TempDir,
}

/// An input file and its copy inside a `WorkingDir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub original: PathBuf,
    pub copy: PathBuf,
}

impl WorkingCopy {
    /// File name of the original, used for the saved output.
    pub fn file_name(&self) -> String {
        self.original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl WorkingDir {
    pub fn new() -> Result<Self, PersistenceError> {
        let dir = tempfile::Builder::new().prefix("calcula-batch-").tempdir()?;
        debug!(target: "FILE", "working directory {}", dir.path().display());
        Ok(WorkingDir { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Copies `original` into the directory. Copies are numbered so inputs
    /// sharing a file name do not collide.
    pub fn copy_in(&self, original: &Path, index: usize) -> Result<WorkingCopy, PersistenceError> {
        if !original.is_file() {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("input file not found: {}", original.display()),
            )));
        }
        let name = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input.xlsx".to_string());
        let copy = self.dir.path().join(format!("{:03}_{}", index, name));
        std::fs::copy(original, &copy)?;
        debug!(target: "FILE", "copied {} to {}", original.display(), copy.display());
        Ok(WorkingCopy {
            original: original.to_path_buf(),
            copy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_in_keeps_original_untouched() {
        let source_dir = tempfile::tempdir().unwrap();
        let original = source_dir.path().join("data.xlsx");
        std::fs::write(&original, b"payload").unwrap();

        let working = WorkingDir::new().unwrap();
        let first = working.copy_in(&original, 0).unwrap();
        let second = working.copy_in(&original, 1).unwrap();

        assert_ne!(first.copy, second.copy);
        assert!(first.copy.starts_with(working.path()));
        assert_eq!(first.file_name(), "data.xlsx");
        assert_eq!(std::fs::read(&first.copy).unwrap(), b"payload");

        std::fs::write(&first.copy, b"edited").unwrap();
        assert_eq!(std::fs::read(&original).unwrap(), b"payload");
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let working = WorkingDir::new().unwrap();
        let result = working.copy_in(Path::new("/definitely/not/here.xlsx"), 0);
        assert!(matches!(result, Err(PersistenceError::Io(_))));
    }

    #[test]
    fn test_directory_removed_on_drop() {
        let working = WorkingDir::new().unwrap();
        let path = working.path().to_path_buf();
        assert!(path.is_dir());
        drop(working);
        assert!(!path.exists());
    }
}
