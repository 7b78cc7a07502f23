//! FILENAME: core/parser/src/lexer.rs
//! PURPOSE: Scans a raw range or position string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. Input is expected to
//! have passed through `normalize_separators` so that only ASCII delimiters remain.
//!
//! SUPPORTED DELIMITERS:
//! - List separator: ,
//! - Range separator: :
//! - Whitespace is skipped everywhere

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

/// Full-width comma used by CJK input methods.
pub const FULLWIDTH_COMMA: char = '\u{FF0C}';
/// Full-width colon used by CJK input methods.
pub const FULLWIDTH_COLON: char = '\u{FF1A}';

/// Replaces full-width `，` and `：` with their ASCII equivalents.
/// Every range-accepting entry point runs this before tokenizing.
pub fn normalize_separators(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            FULLWIDTH_COMMA => ',',
            FULLWIDTH_COLON => ':',
            other => other,
        })
        .collect()
}

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some(',') => Token::Comma,
            Some(':') => Token::Colon,

            // Cell references, row numbers and column letters
            Some(ch) if ch.is_ascii_alphanumeric() => self.read_identifier(ch),

            // End of input
            None => Token::EOF,

            // Unknown character
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    fn read_identifier(&mut self, first_char: char) -> Token {
        let mut ident = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_alphanumeric() {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        Token::Identifier(ident.to_ascii_uppercase())
    }
}
