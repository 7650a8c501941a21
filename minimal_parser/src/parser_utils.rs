//! Parser utilities (§4.5): category-based terminal matches shared by
//! several non-terminals, plus the identifier/literal "supertype" terminals
//! that `primary-expr` dispatches over.
//!
//! Single-name matches are handled by [`crate::terminals::impl_terminal_parse`];
//! the helpers here are for productions that accept *any* name within a
//! category (`id`, `literal`, `keyword-literal`, `type`).

use minimal_lexer::{Token, TokenCategory, TokenName};

use crate::{make_indent, Parse, ParseBuffer, ParseDisplay};

/// Matches the current token if its category is one of `categories`,
/// without attaching or advancing past a mismatch (§4.5 `match-category`).
pub fn match_category(buffer: &mut ParseBuffer<'_>, categories: &[TokenCategory]) -> Option<Token> {
    let matches = matches!(buffer.peek(), Some(tok) if categories.contains(&tok.category));
    if matches {
        buffer.next().cloned()
    } else {
        None
    }
}

/// Matches the current token if its name is one of `names` (§4.5 `match`).
pub fn match_names(buffer: &mut ParseBuffer<'_>, names: &[TokenName]) -> Option<Token> {
    let matches = matches!(buffer.peek(), Some(tok) if names.contains(&tok.name));
    if matches {
        buffer.next().cloned()
    } else {
        None
    }
}

macro_rules! impl_category_terminal {
    ($struct_name:ident, $categories:expr, $label:expr) => {
        #[derive(Debug, Clone)]
        pub struct $struct_name {
            pub token: Token,
        }

        impl Parse for $struct_name {
            fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
                match match_category(buffer, $categories) {
                    Some(token) => Ok($struct_name { token }),
                    None => match buffer.peek() {
                        Some(tok) => Err(format!(
                            "expected {}, found '{}' at line {}",
                            $label, tok.lexeme, tok.line
                        )),
                        None => Err(format!("expected {}, found end of input", $label)),
                    },
                }
            }

            fn parse_label() -> String {
                $label.to_string()
            }
        }

        impl ParseDisplay for $struct_name {
            fn display(&self, depth: usize, label: Option<String>) {
                let indent = make_indent(depth);
                let label = label.unwrap_or_else(Self::parse_label);
                println!("{indent}[{}: {}]", label, self.token.lexeme);
            }

            fn lexeme_signature(&self) -> String {
                self.token.lexeme.clone()
            }
        }
    };
}

impl_category_terminal!(
    Id,
    &[TokenCategory::Identifier],
    "an identifier"
);

impl_category_terminal!(
    Literal,
    &[TokenCategory::Literal],
    "a literal"
);

impl_category_terminal!(
    KeywordLiteral,
    &[TokenCategory::LiteralKw],
    "a keyword literal"
);

/// `type` (§4.6): matches any `TYPE_KW` token. Per the REDESIGN FLAG applied
/// in `SPEC_FULL.md` §9, a `TYPE_KW`-shaped lexeme with a name the naming
/// pass could not resolve is a hard parse error rather than silently
/// defaulting to `VOID`.
impl_category_terminal!(Type, &[TokenCategory::TypeKw], "a type");

impl_category_terminal!(UnaAssignOpTerm, &[TokenCategory::UnaAssignOp], "an increment/decrement operator");

/// `bin-assign-op` as used by `incrementation`: every `BinAssignOp` name
/// except plain `:=`, which `assignment` already owns exclusively.
#[derive(Debug, Clone)]
pub struct BinAssignOpTerm {
    pub token: Token,
}

const COMPOUND_ASSIGN_NAMES: &[TokenName] = &[
    TokenName::PlusAssign,
    TokenName::MinusAssign,
    TokenName::MultiplyAssign,
    TokenName::DivideAssign,
    TokenName::ModuloAssign,
];

impl Parse for BinAssignOpTerm {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        match match_names(buffer, COMPOUND_ASSIGN_NAMES) {
            Some(token) => Ok(BinAssignOpTerm { token }),
            None => match buffer.peek() {
                Some(tok) => Err(format!(
                    "expected a compound assignment operator, found '{}' at line {}",
                    tok.lexeme, tok.line
                )),
                None => Err("expected a compound assignment operator, found end of input".into()),
            },
        }
    }

    fn parse_label() -> String {
        "a compound assignment operator".to_string()
    }
}

impl ParseDisplay for BinAssignOpTerm {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        println!("{indent}[{}: {}]", label, self.token.lexeme);
    }

    fn lexeme_signature(&self) -> String {
        self.token.lexeme.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minimal_lexer::tokenize;

    #[test]
    fn type_matches_any_type_keyword() {
        let tokens = tokenize("<#>\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let ty = Type::parse(&mut buffer).unwrap();
        assert_eq!(ty.token.name, TokenName::Int);
    }

    #[test]
    fn id_rejects_non_identifier() {
        let tokens = tokenize("<#>\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        assert!(Id::parse(&mut buffer).is_err());
    }
}
