//! Recursive-descent parser and concrete syntax tree for Minimal.
//!
//! Each non-terminal in [`non_terminals`] is its own type implementing
//! [`Parse`]; entering a nested non-terminal is a struct field of that
//! non-terminal's type (CHILD) and continuing at the same level is the next
//! field in declaration order, or an item of a [`modulars::Delimited`] /
//! [`modulars::Terminated`] list for tail-recursive productions (SIBLING).
//! This realizes the first-child/next-sibling concrete syntax tree as a
//! statically typed field tree rather than a separate runtime node type —
//! see `SPEC_FULL.md` §3 for the rationale.

use std::iter::Peekable;
use std::slice::Iter;

use minimal_lexer::Token;

pub mod modulars;
pub mod non_terminals;
pub mod parser_utils;
pub mod terminals;

/// Implemented by every terminal wrapper and non-terminal struct: attempts
/// to consume a production starting at the buffer's current position.
///
/// A failed parse must not advance the caller's buffer — every `parse` is
/// called against a [`ParseBuffer::fork`] and only committed (`*buffer =
/// fork`) by the caller on success. This is the look-ahead primitive of
/// `SPEC_FULL.md` §9.
pub trait Parse<T = Self>
where
    Self: Sized,
{
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<T, String>;
    fn parse_label() -> String;
}

/// Implemented by every construct that can print itself as a node of the
/// concrete syntax tree (§4.4's print-subtree operation).
pub trait ParseDisplay {
    fn display(&self, depth: usize, label: Option<String>);
    fn lexeme_signature(&self) -> String;
}

impl<T: ParseDisplay> ParseDisplay for Option<T> {
    fn display(&self, depth: usize, label: Option<String>) {
        if let Some(inner) = self {
            inner.display(depth, label);
        }
    }

    fn lexeme_signature(&self) -> String {
        self.as_ref().map(ParseDisplay::lexeme_signature).unwrap_or_default()
    }
}

impl<T: ParseDisplay> ParseDisplay for Box<T> {
    fn display(&self, depth: usize, label: Option<String>) {
        (**self).display(depth, label)
    }

    fn lexeme_signature(&self) -> String {
        (**self).lexeme_signature()
    }
}

/// Two spaces per level (`TREE_INDENT_WIDTH`, `SPEC_FULL.md` §6) — the same
/// indent width whether this is driving the CLI's CST dump or a standalone
/// trace.
pub fn make_indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// A cursor over a borrowed token stream. Cheap to [`fork`](Self::fork):
/// cloning only copies the underlying slice iterator, not the tokens.
#[derive(Clone)]
pub struct ParseBuffer<'t> {
    buffer: Peekable<Iter<'t, Token>>,
}

impl<'t> ParseBuffer<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        ParseBuffer {
            buffer: tokens.iter().peekable(),
        }
    }

    /// Read-only look-ahead: does not advance the cursor.
    pub fn peek(&mut self) -> Option<&&'t Token> {
        self.buffer.peek()
    }

    /// An independent cursor at the same position, for speculative parses.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn is_at_end(&mut self) -> bool {
        self.peek().is_none()
    }
}

impl<'t> Iterator for ParseBuffer<'t> {
    type Item = &'t Token;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.next()
    }
}
