//! Token model and lexer for the Minimal front end.
//!
//! Converts preprocessed Minimal source into the typed, comment/whitespace
//! -filtered token stream the parser consumes. See [`lexer::tokenize`].

pub mod error;
pub mod lexer;
pub mod token;

pub use error::LexError;
pub use lexer::tokenize;
pub use token::{Token, TokenCategory, TokenName};
