//! FILENAME: core/persistence/src/lib.rs
//! Calcula Persistence Module
//!
//! Handles loading and saving workbooks in XLSX format, the execution report,
//! and the working copies a batch edits instead of the user's files.

mod error;
mod report;
mod working_copy;
mod xlsx_layout;
mod xlsx_reader;
mod xlsx_writer;

pub use error::PersistenceError;
pub use report::{save_report, ReportRow, REPORT_SHEET_NAME};
pub use working_copy::{WorkingCopy, WorkingDir};
pub use xlsx_layout::{parse_sheet_layout, parse_styles_xml, read_layout, SheetLayout, WorkbookLayout};
pub use xlsx_reader::load_xlsx;
pub use xlsx_writer::save_xlsx;

use engine::Worksheet;
use log::info;

// ============================================================================
// WORKBOOK
// ============================================================================

/// A complete workbook held in memory while a batch edits it.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<Worksheet>,
    pub active_sheet: usize,
}

impl Workbook {
    pub fn new() -> Self {
        Self {
            sheets: vec![Worksheet::new("Sheet1")],
            active_sheet: 0,
        }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    /// Appends an empty sheet. Names must be unique.
    pub fn add_sheet(&mut self, name: &str) -> Result<usize, PersistenceError> {
        if self.sheet_index(name).is_some() {
            return Err(PersistenceError::DuplicateSheet(name.to_string()));
        }
        self.sheets.push(Worksheet::new(name));
        info!(target: "FILE", "created sheet '{}'", name);
        Ok(self.sheets.len() - 1)
    }

    /// Removes a sheet by name. The last remaining sheet cannot be removed.
    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet, PersistenceError> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| PersistenceError::SheetNotFound(name.to_string()))?;
        if self.sheets.len() == 1 {
            return Err(PersistenceError::LastSheet(name.to_string()));
        }
        let removed = self.sheets.remove(index);
        if self.active_sheet >= self.sheets.len() {
            self.active_sheet = self.sheets.len() - 1;
        }
        info!(target: "FILE", "deleted sheet '{}'", name);
        Ok(removed)
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sheet_rejects_duplicates() {
        let mut workbook = Workbook::new();
        assert_eq!(workbook.add_sheet("Data").unwrap(), 1);
        assert!(matches!(workbook.add_sheet("Data"), Err(PersistenceError::DuplicateSheet(_))));
        assert_eq!(workbook.sheet_names(), vec!["Sheet1", "Data"]);
    }

    #[test]
    fn test_remove_sheet_rules() {
        let mut workbook = Workbook::new();
        assert!(matches!(workbook.remove_sheet("Nope"), Err(PersistenceError::SheetNotFound(_))));
        assert!(matches!(workbook.remove_sheet("Sheet1"), Err(PersistenceError::LastSheet(_))));

        workbook.add_sheet("Other").unwrap();
        workbook.active_sheet = 1;
        workbook.remove_sheet("Other").unwrap();
        assert_eq!(workbook.active_sheet, 0);
        assert_eq!(workbook.sheets.len(), 1);
    }
}
