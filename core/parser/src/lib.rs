//! FILENAME: core/parser/src/lib.rs
//! PURPOSE: Library root for the range and position parser.
//! CONTEXT: This module exposes the lexer, parser, and coordinate model
//! needed to turn user-typed targets into normalized coordinates.
//!
//! PIPELINE: Input --> normalize_separators --> Lexer --> Tokens --> Parser --> RangeSpec / Positions
//!
//! SUPPORTED INPUT:
//! - Single cells: A1, aa100
//! - Ranges in any corner order: A1:B10, C3:A1
//! - Lists: A1,C3:D4
//! - Row positions: 1, 3:5, 1,3:5
//! - Column positions: A, C:E, a,c:e
//! - Full-width separators: A1，B2：C3

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


// Re-export commonly used types for convenience
pub use ast::{
    column_index, column_letters, Axis, CellRange, CellRef, Position, RangeSpec, MAX_COLUMNS,
    MAX_ROWS,
};
pub use lexer::{normalize_separators, Lexer};
pub use parser::{
    parse_cell_range, parse_positions, parse_range, ParseError, ParseErrorKind, ParseResult,
    Parser,
};
pub use token::Token;
