//! FILENAME: core/parser/src/ast.rs
//! PURPOSE: Defines the coordinate model produced by the range and position parser.
//! CONTEXT: After the Lexer tokenizes a range string, the Parser converts
//! those tokens into these structures. The engine resolves them against a sheet.
//!
//! COORDINATE MODEL:
//! - Rows and columns are 1-indexed: "A1" is (row 1, col 1)
//! - Column letters: "A" = 1, "Z" = 26, "AA" = 27, "XFD" = 16384
//! - A CellRange is always normalized (min <= max on both axes)

use std::fmt;

/// Highest row number an xlsx worksheet can address.
pub const MAX_ROWS: u32 = 1_048_576;

/// Highest column number an xlsx worksheet can address (XFD).
pub const MAX_COLUMNS: u32 = 16_384;

// ============================================================================
// COLUMN LETTERS
// ============================================================================

/// Converts column letters (case-insensitive) to a 1-based column number.
/// "A" -> 1, "Z" -> 26, "AA" -> 27. Returns None for empty or non-letter input
/// and for numbers that overflow.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut result: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
        result = result.checked_mul(26)?.checked_add(digit)?;
    }
    Some(result)
}

/// Converts a 1-based column number to its letters.
/// 1 -> "A", 26 -> "Z", 27 -> "AA". Zero yields an empty string.
pub fn column_letters(mut col: u32) -> String {
    let mut result = String::new();
    while col > 0 {
        let remainder = (col - 1) % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        col = (col - 1) / 26;
    }
    result
}

// ============================================================================
// CELLS AND RANGES
// ============================================================================

/// A single cell coordinate, 1-indexed on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub const fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// An axis-aligned rectangle of cells. Construction always normalizes the
/// corners, so `min_row <= max_row` and `min_col <= max_col` hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub min_row: u32,
    pub min_col: u32,
    pub max_row: u32,
    pub max_col: u32,
}

impl CellRange {
    /// Builds a range from two corners given in any order.
    pub fn new(a: CellRef, b: CellRef) -> Self {
        CellRange {
            min_row: a.row.min(b.row),
            min_col: a.col.min(b.col),
            max_row: a.row.max(b.row),
            max_col: a.col.max(b.col),
        }
    }

    /// Builds a range from raw bounds given in any order.
    pub fn from_bounds(row1: u32, col1: u32, row2: u32, col2: u32) -> Self {
        CellRange::new(CellRef::new(row1, col1), CellRef::new(row2, col2))
    }

    /// A degenerate range covering one cell.
    pub fn single(cell: CellRef) -> Self {
        CellRange::new(cell, cell)
    }

    pub fn top_left(&self) -> CellRef {
        CellRef::new(self.min_row, self.min_col)
    }

    pub fn bottom_right(&self) -> CellRef {
        CellRef::new(self.max_row, self.max_col)
    }

    pub fn is_single_cell(&self) -> bool {
        self.min_row == self.max_row && self.min_col == self.max_col
    }

    pub fn height(&self) -> u32 {
        self.max_row - self.min_row + 1
    }

    pub fn width(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.height() as u64 * self.width() as u64
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row >= self.min_row
            && cell.row <= self.max_row
            && cell.col >= self.min_col
            && cell.col <= self.max_col
    }

    /// Two rectangles overlap unless one lies entirely above, below,
    /// left of, or right of the other.
    pub fn intersects(&self, other: &CellRange) -> bool {
        !(self.max_row < other.min_row
            || self.min_row > other.max_row
            || self.max_col < other.min_col
            || self.min_col > other.max_col)
    }

    /// Iterates the covered cells in row-major order.
    pub fn cells(self) -> impl Iterator<Item = CellRef> {
        let (min_col, max_col) = (self.min_col, self.max_col);
        (self.min_row..=self.max_row)
            .flat_map(move |row| (min_col..=max_col).map(move |col| CellRef::new(row, col)))
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.top_left())
        } else {
            write!(f, "{}:{}", self.top_left(), self.bottom_right())
        }
    }
}

/// The parsed form of a comma-separated range list such as "A1,B2:C3".
/// Ranges are kept in input order and are never merged into a bounding box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RangeSpec {
    pub ranges: Vec<CellRange>,
}

impl RangeSpec {
    pub fn new(ranges: Vec<CellRange>) -> Self {
        RangeSpec { ranges }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CellRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

impl<'a> IntoIterator for &'a RangeSpec {
    type Item = &'a CellRange;
    type IntoIter = std::slice::Iter<'a, CellRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

// ============================================================================
// ROW / COLUMN POSITIONS
// ============================================================================

/// Which axis a structural edit works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Row,
    Column,
}

impl Axis {
    /// Largest addressable index along this axis.
    pub fn limit(&self) -> u32 {
        match self {
            Axis::Row => MAX_ROWS,
            Axis::Column => MAX_COLUMNS,
        }
    }

    pub fn other(&self) -> Axis {
        match self {
            Axis::Row => Axis::Column,
            Axis::Column => Axis::Row,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Row => write!(f, "row"),
            Axis::Column => write!(f, "column"),
        }
    }
}

/// One entry of a position list: "3", "3:5", "C" or "C:E".
/// Letters are stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
    Index(u32),
    IndexRange(u32, u32),
    Letters(String),
    LetterRange(String, String),
}

impl Position {
    pub fn axis(&self) -> Axis {
        match self {
            Position::Index(_) | Position::IndexRange(_, _) => Axis::Row,
            Position::Letters(_) | Position::LetterRange(_, _) => Axis::Column,
        }
    }

    /// Inclusive numeric bounds of the entry. Letters are converted to column
    /// numbers; letters that do not convert yield 0, which no edit accepts.
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            Position::Index(n) => (*n, *n),
            Position::IndexRange(a, b) => (*a, *b),
            Position::Letters(s) => {
                let n = column_index(s).unwrap_or(0);
                (n, n)
            }
            Position::LetterRange(a, b) => {
                (column_index(a).unwrap_or(0), column_index(b).unwrap_or(0))
            }
        }
    }

    pub fn start(&self) -> u32 {
        self.bounds().0
    }

    /// Number of rows or columns the entry covers.
    pub fn count(&self) -> u32 {
        let (start, end) = self.bounds();
        end.saturating_sub(start) + 1
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Index(n) => write!(f, "{}", n),
            Position::IndexRange(a, b) => write!(f, "{}:{}", a, b),
            Position::Letters(s) => write!(f, "{}", s),
            Position::LetterRange(a, b) => write!(f, "{}:{}", a, b),
        }
    }
}
