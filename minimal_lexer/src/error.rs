//! Lexical error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexError {
    #[error("lexical error: could not classify '{candidate}' on line {line}")]
    InvalidSyntax { line: usize, candidate: String },

    #[error("file error: source file was empty")]
    FileEmpty,

    #[error("syntax error: line {line} is longer than the maximum of {max} characters")]
    LineTooLong { line: usize, max: usize },
}
