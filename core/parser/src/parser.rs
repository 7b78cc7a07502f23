//! FILENAME: core/parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts range and position strings
//! into the normalized coordinate model.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds RangeSpecs (cell ranges) or Position lists
//! (row/column targets of structural edits).
//!
//! GRAMMAR (cell ranges):
//!   range_spec  --> range_token ( "," range_token )*
//!   range_token --> CELL ( ":" CELL )?
//!   CELL        --> COLUMN_LETTERS ROW_DIGITS
//!
//! GRAMMAR (positions):
//!   position_list --> position ( "," position )*
//!   position      --> UNIT ( ":" UNIT )?
//!   UNIT          --> DIGITS | LETTERS      // the first UNIT fixes which one

use crate::ast::{column_index, Axis, CellRange, CellRef, Position, RangeSpec, MAX_COLUMNS};
use crate::lexer::{normalize_separators, Lexer};
use crate::token::Token;

/// Classification of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    /// Cell or range syntax that cannot be read at all.
    MalformedRange,
    /// Row numbers and column letters mixed in one position list.
    InconsistentAxis,
    /// Syntactically readable but out of bounds: row 0, bad letters, start > end.
    InvalidPosition,
}

/// Parser errors with the offending fragment of the input.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub fragment: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    fn malformed(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::new(ParseErrorKind::MalformedRange, fragment, message)
    }

    fn inconsistent(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::new(ParseErrorKind::InconsistentAxis, fragment, message)
    }

    fn invalid(fragment: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::new(ParseErrorKind::InvalidPosition, fragment, message)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.kind {
            ParseErrorKind::MalformedRange => "Malformed range",
            ParseErrorKind::InconsistentAxis => "Inconsistent axis",
            ParseErrorKind::InvalidPosition => "Invalid position",
        };
        if self.fragment.is_empty() {
            write!(f, "{}: {}", label, self.message)
        } else {
            write!(f, "{} '{}': {}", label, self.fragment, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Kind of a bare position token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Numeric,
    Alphabetic,
}

impl UnitKind {
    fn classify(ident: &str) -> Option<UnitKind> {
        if ident.chars().all(|c| c.is_ascii_digit()) {
            Some(UnitKind::Numeric)
        } else if ident.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(UnitKind::Alphabetic)
        } else {
            None
        }
    }

    fn axis(self) -> Axis {
        match self {
            UnitKind::Numeric => Axis::Row,
            UnitKind::Alphabetic => Axis::Column,
        }
    }
}

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser over already-normalized input.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
        }
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Consumes the current token if it is an identifier and returns its text.
    fn expect_identifier(&mut self, what: &str) -> ParseResult<String> {
        match std::mem::replace(&mut self.current_token, Token::EOF) {
            Token::Identifier(text) => {
                self.advance();
                Ok(text)
            }
            Token::EOF => Err(ParseError::malformed("", format!("Expected {}, found end of input", what))),
            token => {
                let fragment = token.to_string();
                self.current_token = token;
                Err(ParseError::malformed(fragment, format!("Expected {}", what)))
            }
        }
    }

    /// Handles the token after a list entry: a comma continues the list,
    /// end of input finishes it, anything else is an error.
    fn end_of_entry(&mut self) -> ParseResult<bool> {
        match &self.current_token {
            Token::Comma => {
                self.advance();
                Ok(true)
            }
            Token::EOF => Ok(false),
            token => Err(ParseError::malformed(
                token.to_string(),
                "Unexpected character after entry",
            )),
        }
    }

    // ========================================================================
    // CELL RANGES
    // ========================================================================

    /// Parses the entire input as a comma-separated list of cells and ranges.
    pub fn parse_range_spec(&mut self) -> ParseResult<RangeSpec> {
        if self.current_token == Token::EOF {
            return Err(ParseError::malformed("", "Empty range"));
        }

        let mut ranges = Vec::new();
        loop {
            ranges.push(self.parse_range_token()?);
            if !self.end_of_entry()? {
                break;
            }
        }

        Ok(RangeSpec::new(ranges))
    }

    /// Parses "A1" or "A1:B2" into a normalized range.
    fn parse_range_token(&mut self) -> ParseResult<CellRange> {
        let start_text = self.expect_identifier("a cell reference")?;
        let start = split_cell_reference(&start_text)?;

        if self.current_token != Token::Colon {
            return Ok(CellRange::single(start));
        }
        self.advance();

        let end_text = self.expect_identifier("a cell reference after ':'")?;
        let end = split_cell_reference(&end_text)?;

        Ok(CellRange::new(start, end))
    }

    // ========================================================================
    // POSITIONS
    // ========================================================================

    /// Parses the entire input as a list of row numbers or column letters.
    /// The first unit decides the list's kind; it must match `axis`.
    pub fn parse_position_list(&mut self, axis: Axis) -> ParseResult<Vec<Position>> {
        if self.current_token == Token::EOF {
            return Err(ParseError::invalid("", "Empty position list"));
        }

        let mut list_kind: Option<UnitKind> = None;
        let mut positions = Vec::new();

        loop {
            let start = self.expect_identifier("a row number or column letters")?;
            let kind = check_unit(&start, axis, &mut list_kind)?;

            let position = if self.current_token == Token::Colon {
                self.advance();
                let end = self.expect_identifier("a row number or column letters after ':'")?;
                check_unit(&end, axis, &mut list_kind)?;
                build_range_position(kind, &start, &end, axis)?
            } else {
                build_single_position(kind, &start, axis)?
            };
            positions.push(position);

            if !self.end_of_entry()? {
                break;
            }
        }

        Ok(positions)
    }
}

/// Splits a cell reference like "AA100" into a coordinate.
fn split_cell_reference(identifier: &str) -> ParseResult<CellRef> {
    let mut col = String::new();
    let mut row_str = String::new();

    for ch in identifier.chars() {
        if ch.is_ascii_alphabetic() {
            if !row_str.is_empty() {
                return Err(ParseError::malformed(identifier, "Letters after row digits"));
            }
            col.push(ch);
        } else if ch.is_ascii_digit() {
            row_str.push(ch);
        } else {
            return Err(ParseError::malformed(identifier, "Invalid character in cell reference"));
        }
    }

    if col.is_empty() {
        return Err(ParseError::malformed(identifier, "Cell reference missing column letters"));
    }
    if row_str.is_empty() {
        return Err(ParseError::malformed(identifier, "Cell reference missing row number"));
    }

    let col_num = match column_index(&col) {
        Some(n) if n <= MAX_COLUMNS => n,
        _ => return Err(ParseError::invalid(identifier, "Column is beyond the last sheet column")),
    };

    let row: u32 = row_str
        .parse()
        .map_err(|_| ParseError::invalid(identifier, "Row number is too large"))?;
    if row == 0 {
        return Err(ParseError::invalid(identifier, "Row number must be >= 1"));
    }
    if row > Axis::Row.limit() {
        return Err(ParseError::invalid(identifier, "Row is beyond the last sheet row"));
    }

    Ok(CellRef::new(row, col_num))
}

/// Classifies one position unit and enforces a single kind per list.
fn check_unit(unit: &str, axis: Axis, list_kind: &mut Option<UnitKind>) -> ParseResult<UnitKind> {
    let kind = UnitKind::classify(unit).ok_or_else(|| {
        ParseError::invalid(unit, "Expected a row number or column letters")
    })?;

    match *list_kind {
        None => {
            if kind.axis() != axis {
                return Err(ParseError::inconsistent(
                    unit,
                    format!("List starts with a {} but a {} position was requested", kind.axis(), axis),
                ));
            }
            *list_kind = Some(kind);
        }
        Some(expected) if expected != kind => {
            return Err(ParseError::inconsistent(
                unit,
                format!("List started with a {}; cannot mix in a {}", expected.axis(), kind.axis()),
            ));
        }
        Some(_) => {}
    }

    Ok(kind)
}

/// Converts a validated unit to its number along the axis.
fn unit_number(kind: UnitKind, unit: &str, axis: Axis) -> ParseResult<u32> {
    let value = match kind {
        UnitKind::Numeric => unit
            .parse::<u32>()
            .map_err(|_| ParseError::invalid(unit, "Row number is too large"))?,
        UnitKind::Alphabetic => column_index(unit)
            .ok_or_else(|| ParseError::invalid(unit, "Column letters are too long"))?,
    };

    if value == 0 {
        return Err(ParseError::invalid(unit, "Row number must be >= 1"));
    }
    if value > axis.limit() {
        return Err(ParseError::invalid(unit, format!("Beyond the last sheet {}", axis)));
    }
    Ok(value)
}

fn build_single_position(kind: UnitKind, unit: &str, axis: Axis) -> ParseResult<Position> {
    let value = unit_number(kind, unit, axis)?;
    Ok(match kind {
        UnitKind::Numeric => Position::Index(value),
        UnitKind::Alphabetic => Position::Letters(unit.to_string()),
    })
}

fn build_range_position(kind: UnitKind, start: &str, end: &str, axis: Axis) -> ParseResult<Position> {
    let start_value = unit_number(kind, start, axis)?;
    let end_value = unit_number(kind, end, axis)?;

    if start_value > end_value {
        return Err(ParseError::invalid(
            format!("{}:{}", start, end),
            format!("Start {} must not come after end {}", axis, axis),
        ));
    }

    Ok(match kind {
        UnitKind::Numeric => Position::IndexRange(start_value, end_value),
        UnitKind::Alphabetic => Position::LetterRange(start.to_string(), end.to_string()),
    })
}

// ============================================================================
// CONVENIENCE ENTRY POINTS
// ============================================================================

/// Parses a range list such as "A1,B2:C3" (full-width separators accepted).
pub fn parse_range(input: &str) -> ParseResult<RangeSpec> {
    let normalized = normalize_separators(input);
    let mut parser = Parser::new(&normalized);
    parser.parse_range_spec()
}

/// Parses a position list such as "1,3:5" or "A,C:E" for the given axis.
pub fn parse_positions(input: &str, axis: Axis) -> ParseResult<Vec<Position>> {
    let normalized = normalize_separators(input);
    let mut parser = Parser::new(&normalized);
    parser.parse_position_list(axis)
}

/// Parses exactly one cell or range, e.g. the `ref` of a merged region.
pub fn parse_cell_range(input: &str) -> ParseResult<CellRange> {
    let spec = parse_range(input)?;
    match spec.ranges.as_slice() {
        [single] => Ok(*single),
        _ => Err(ParseError::malformed(input, "Expected a single cell or range")),
    }
}
