//! FILENAME: app/batch/src/config.rs
//! PURPOSE: Batch-wide settings loaded from an optional JSON file.
//! CONTEXT: Every field has a default, so `{}` is a complete configuration.
//! Command-line flags override individual fields after loading.

use std::path::{Path, PathBuf};

use engine::DeleteMergePolicy;
use serde::{Deserialize, Serialize};

use crate::error::BatchError;

/// File name of the execution report.
pub const DEFAULT_REPORT_NAME: &str = "执行报告.xlsx";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Where edited workbooks and the report are written.
    pub output_dir: PathBuf,
    /// Sheets a structural or merge step targets when it names none.
    pub sheet_indexes: Vec<usize>,
    /// Merge handling of deletions when a step names none.
    pub delete_merge_policy: DeleteMergePolicy,
    /// Delete-hidden scans at least this many rows, past the used area.
    pub hidden_scan_limit_rows: u32,
    /// Delete-hidden scans at least this many columns, past the used area.
    pub hidden_scan_limit_columns: u32,
    pub write_report: bool,
    pub report_name: String,
    /// Run the remaining steps after a failed one.
    pub keep_going_on_step_error: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            output_dir: PathBuf::from("./output"),
            sheet_indexes: vec![0],
            delete_merge_policy: DeleteMergePolicy::Ignore,
            hidden_scan_limit_rows: 10_000,
            hidden_scan_limit_columns: 1_000,
            write_report: true,
            report_name: DEFAULT_REPORT_NAME.to_string(),
            keep_going_on_step_error: true,
            log_file: None,
        }
    }
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        serde_json::from_str(json).map_err(|e| BatchError::json("configuration", e))
    }

    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let json = std::fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| BatchError::json(path.display().to_string(), e))
    }

    pub fn scan_limit(&self, axis: engine::Axis) -> u32 {
        match axis {
            engine::Axis::Row => self.hidden_scan_limit_rows,
            engine::Axis::Column => self.hidden_scan_limit_columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(BatchConfig::from_json("{}").unwrap(), BatchConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = BatchConfig::from_json(
            r#"{"delete_merge_policy": "unmerge_keep_value", "sheet_indexes": [0, 2], "write_report": false}"#,
        )
        .unwrap();
        assert_eq!(config.delete_merge_policy, DeleteMergePolicy::UnmergeKeepValue);
        assert_eq!(config.sheet_indexes, vec![0, 2]);
        assert!(!config.write_report);
        assert_eq!(config.report_name, DEFAULT_REPORT_NAME);
        assert_eq!(config.scan_limit(engine::Axis::Column), 1_000);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let err = BatchConfig::from_json(r#"{"delete_merge_policy": "sometimes"}"#).unwrap_err();
        assert!(matches!(err, BatchError::Json { .. }));
    }
}
