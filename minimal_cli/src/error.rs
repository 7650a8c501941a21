//! CLI-level error taxonomy.
//!
//! Discriminants mirror the `MiniStatus` ordinal table this front end was
//! distilled from (`SUCCESS = 0` through `INVALID_CONSTRUCT = 16`): only the
//! ordinals this front end can actually produce get a variant here.
//! `NONMATCHING_TOKEN` / `NONMATCHING_CATEGORY` / `LAST_TOKEN` /
//! `VALID_CONSTRUCT` / `INVALID_CONSTRUCT` are match-primitive return values
//! internal to parsing, not process exit codes, and are folded into
//! `Lexical`/`Parse` here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MinimalError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("no input file provided")]
    NoInputFile,

    #[error("source file not found: {0}")]
    FileNotFound(String),

    #[error("source file was empty: {0}")]
    FileEmpty(String),

    #[error("line {line} of {file} is longer than the maximum of {max} characters")]
    LineTooLong { file: String, line: usize, max: usize },

    #[error("line {line} of {file} cannot take a trailing delimiter at the maximum line length")]
    CantAddDelimiter { file: String, line: usize },

    #[error(transparent)]
    Lexical(#[from] minimal_lexer::LexError),

    #[error("parse error:\n{0}")]
    Parse(String),
}

impl MinimalError {
    /// The process exit code this error maps to, matching the ordinal this
    /// error condition holds in the `MiniStatus` table.
    pub fn exit_code(&self) -> i32 {
        use MinimalError::*;
        match self {
            Io(_) => 1,
            InvalidArgument(_) => 3,
            NoInputFile => 4,
            FileNotFound(_) => 6,
            FileEmpty(_) => 7,
            LineTooLong { .. } => 8,
            CantAddDelimiter { .. } => 9,
            Lexical(_) => 10,
            Parse(_) => 11,
        }
    }
}
