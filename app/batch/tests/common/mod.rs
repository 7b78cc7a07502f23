//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for batch integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use app_lib::{run_batch, BatchConfig, BatchReport, CancelToken, StepList};
use engine::{Cell, CellRange, CellRef, CellValue, SheetStore, Worksheet};
use persistence::{load_xlsx, save_xlsx, Workbook};
use tempfile::TempDir;

/// Input workbooks written to a temporary directory, plus an output
/// directory next to them.
pub struct TestHarness {
    pub dir: TempDir,
    pub inputs: Vec<PathBuf>,
}

impl TestHarness {
    pub fn new() -> Self {
        TestHarness {
            dir: tempfile::tempdir().unwrap(),
            inputs: Vec::new(),
        }
    }

    /// A harness with one `sales.xlsx` input holding `sample_sheet`.
    pub fn with_sample_file() -> Self {
        let mut harness = Self::new();
        harness.add_input("sales.xlsx", Workbook {
            sheets: vec![sample_sheet("Data")],
            active_sheet: 0,
        });
        harness
    }

    pub fn add_input(&mut self, name: &str, workbook: Workbook) -> PathBuf {
        let path = self.dir.path().join("in").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        save_xlsx(&workbook, &path).unwrap();
        self.inputs.push(path.clone());
        path
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn config(&self) -> BatchConfig {
        BatchConfig {
            output_dir: self.output_dir(),
            ..BatchConfig::default()
        }
    }

    pub fn run(&self, steps_json: &str) -> BatchReport {
        self.run_with(self.config(), steps_json)
    }

    pub fn run_with(&self, config: BatchConfig, steps_json: &str) -> BatchReport {
        let steps = StepList::from_json(steps_json).unwrap();
        run_batch(config, &steps, &self.inputs, CancelToken::new(), None).unwrap()
    }

    pub fn load_output(&self, name: &str) -> Workbook {
        load_xlsx(&self.output_dir().join(name)).unwrap()
    }

    pub fn output_exists(&self, name: &str) -> bool {
        self.output_dir().join(name).is_file()
    }
}

/// Ten rows of data under a header, a formula column, and a merged title
/// in A12:B13.
pub fn sample_sheet(name: &str) -> Worksheet {
    let mut sheet = Worksheet::new(name);
    sheet.set_cell(CellRef::new(1, 1), Cell::new_text("Item"));
    sheet.set_cell(CellRef::new(1, 2), Cell::new_text("Qty"));
    sheet.set_cell(CellRef::new(1, 3), Cell::new_text("Double"));
    for i in 0..10u32 {
        let row = i + 2;
        sheet.set_cell(CellRef::new(row, 1), Cell::new_text(format!("item{}", i + 1)));
        sheet.set_cell(CellRef::new(row, 2), Cell::new_number((i + 1) as f64));
        sheet.set_cell(
            CellRef::new(row, 3),
            Cell::new_formula(format!("=B{}*2", row), CellValue::Number(((i + 1) * 2) as f64)),
        );
    }
    sheet.set_cell(CellRef::new(12, 1), Cell::new_text("Total"));
    sheet.add_region(CellRange::from_bounds(12, 1, 13, 2)).unwrap();
    sheet
}

pub fn assert_cell_text(sheet: &Worksheet, row: u32, col: u32, expected: &str) {
    assert_eq!(sheet.text(CellRef::new(row, col)), expected, "text at ({}, {})", row, col);
}

pub fn assert_cell_number(sheet: &Worksheet, row: u32, col: u32, expected: f64) {
    assert_eq!(sheet.value(CellRef::new(row, col)), CellValue::Number(expected), "value at ({}, {})", row, col);
}

pub fn region_names(sheet: &Worksheet) -> Vec<String> {
    use engine::RegionIndex;
    sheet.regions().all().iter().map(|r| r.to_string()).collect()
}

pub fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
