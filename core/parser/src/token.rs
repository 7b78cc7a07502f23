//! FILENAME: core/parser/src/token.rs
//! PURPOSE: Token definitions for the range and position lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.

/// Tokens recognized by the range lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// A run of ASCII letters and digits, normalized to uppercase: A1, AA100, 12, C
    Identifier(String),

    // Delimiters
    Comma,
    Colon,

    // Special
    EOF,
    Illegal(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(s) => write!(f, "{}", s),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::EOF => write!(f, "EOF"),
            Token::Illegal(c) => write!(f, "{}", c),
        }
    }
}
