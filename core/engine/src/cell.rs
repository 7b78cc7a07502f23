//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct and `CellValue` enum.
//! A cell keeps the formula text read from the file next to its cached value;
//! the engine never evaluates formulas, it only carries them.

use serde::{Deserialize, Serialize};

/// Error values a cell can hold (e.g., #DIV/0!)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    Div0,
    NA,
    Name,
    Null,
    Num,
    Ref,
    Value,
}

impl CellError {
    /// The literal shown in the sheet.
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Div0 => "#DIV/0!",
            CellError::NA => "#N/A",
            CellError::Name => "#NAME?",
            CellError::Null => "#NULL!",
            CellError::Num => "#NUM!",
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
        }
    }
}

/// Represents the cached result or raw data within a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(CellError),
}

/// The atomic unit of the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub formula: Option<String>,
    pub value: CellValue,
    pub style_index: usize,
}

impl Cell {
    pub fn new() -> Self {
        Cell {
            formula: None,
            value: CellValue::Empty,
            style_index: 0,
        }
    }

    pub fn new_number(num: f64) -> Self {
        Cell {
            formula: None,
            value: CellValue::Number(num),
            style_index: 0,
        }
    }

    pub fn new_text(text: impl Into<String>) -> Self {
        Cell {
            formula: None,
            value: CellValue::Text(text.into()),
            style_index: 0,
        }
    }

    /// A formula cell with the cached value the file carried for it.
    pub fn new_formula(formula: String, cached: CellValue) -> Self {
        Cell {
            formula: Some(formula),
            value: cached,
            style_index: 0,
        }
    }

    pub fn new_boolean(value: bool) -> Self {
        Cell {
            formula: None,
            value: CellValue::Boolean(value),
            style_index: 0,
        }
    }

    /// True when the cell has neither a value nor a formula.
    /// A styled but empty cell is blank.
    pub fn is_blank(&self) -> bool {
        self.formula.is_none() && self.value == CellValue::Empty
    }

    /// True when nothing distinguishes the cell from an absent one.
    pub fn is_default(&self) -> bool {
        self.is_blank() && self.style_index == 0
    }

    /// Copies value and formula from another cell, keeping this cell's style.
    pub fn copy_content_from(&mut self, other: &Cell) {
        self.formula = other.formula.clone();
        self.value = other.value.clone();
    }

    /// Removes value and formula, keeping the style.
    pub fn clear_content(&mut self) {
        self.formula = None;
        self.value = CellValue::Empty;
    }

    /// Returns the display value of the cell as a String.
    /// Used in log lines and merge warnings.
    pub fn display_value(&self) -> String {
        match &self.value {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => {
                // Format without unnecessary decimal places
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{:.0}", n)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => {
                if *b { "TRUE" } else { "FALSE" }.to_string()
            }
            CellValue::Error(e) => e.as_str().to_string(),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}
