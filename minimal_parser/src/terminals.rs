//! Single-name terminal wrappers.
//!
//! Each of these mirrors the teacher's `impl_terminal_parse!` macro: a
//! struct wrapping an owned [`Token`](minimal_lexer::Token), implementing
//! [`Parse`] by checking the current token's *name* (not just its
//! category — see [`crate::parser_utils`] for the category-based terminals)
//! and [`ParseDisplay`] by printing its bracketed descriptor.

use minimal_lexer::{Token, TokenName};

use crate::{make_indent, Parse, ParseBuffer, ParseDisplay};

macro_rules! impl_terminal_parse {
    ($struct_name:ident, $token_name:expr, $label:expr) => {
        #[derive(Debug, Clone)]
        pub struct $struct_name {
            pub token: Token,
        }

        impl Parse for $struct_name {
            fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
                match buffer.peek() {
                    Some(tok) if tok.name == $token_name => {
                        let token = buffer.next().unwrap().clone();
                        Ok($struct_name { token })
                    }
                    Some(tok) => Err(format!(
                        "expected {}, found '{}' at line {}",
                        $token_name.describe(),
                        tok.lexeme,
                        tok.line
                    )),
                    None => Err(format!(
                        "expected {}, found end of input",
                        $token_name.describe()
                    )),
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

impl_terminal_parse!(MainDeclarationTerm, TokenName::MainDeclaration, "MAIN_DECLARATION");
impl_terminal_parse!(EndModuleOpenTerm, TokenName::EndModuleOpen, "END_MODULE_OPEN");
impl_terminal_parse!(EndModuleCloseTerm, TokenName::EndModuleClose, "END_MODULE_CLOSE");
impl_terminal_parse!(MainTerm, TokenName::Main, "MAIN");
impl_terminal_parse!(EndMainTerm, TokenName::EndMain, "END_MAIN");
impl_terminal_parse!(ImportTerm, TokenName::Import, "IMPORT");
impl_terminal_parse!(MImportTerm, TokenName::MImport, "M_IMPORT");
impl_terminal_parse!(CImportTerm, TokenName::CImport, "C_IMPORT");
impl_terminal_parse!(StringLit, TokenName::StringLiteral, "STRING_LITERAL");
impl_terminal_parse!(Semicolon, TokenName::Semicolon, "SEMICOLON");
impl_terminal_parse!(Redirect, TokenName::Redirect, "REDIRECT");
impl_terminal_parse!(CustomTypeTerm, TokenName::CustomT, "CUSTOM_T");
impl_terminal_parse!(MiniId, TokenName::MiniId, "MINI_ID");
impl_terminal_parse!(MiniConstId, TokenName::MiniConstId, "MINI_CONST_ID");
impl_terminal_parse!(MiniExtId, TokenName::MiniExtId, "MINI_EXT_ID");
impl_terminal_parse!(CIdent, TokenName::CId, "C_ID");
impl_terminal_parse!(Assign, TokenName::Assign, "ASSIGN");
impl_terminal_parse!(FuncTerm, TokenName::Func, "FUNC");
impl_terminal_parse!(LeftParen, TokenName::LeftParen, "LEFT_PAREN");
impl_terminal_parse!(RightParen, TokenName::RightParen, "RIGHT_PAREN");
impl_terminal_parse!(Comma, TokenName::Comma, "COMMA");
impl_terminal_parse!(ArgvTerm, TokenName::Argv, "ARGV");
impl_terminal_parse!(EndFuncTerm, TokenName::EndFunc, "END_FUNC");
impl_terminal_parse!(IfTerm, TokenName::If, "IF");
/// Structurally distinct from [`IfTerm`] only by label: the source reuses
/// the `IF` keyword to chain an `elif-block` off a preceding `if-block`'s
/// tail alternation (§4.6 `if-block`), rather than lexing a separate
/// `ELSE_IF` keyword.
impl_terminal_parse!(ElseIfTerm, TokenName::If, "ELSE_IF");
impl_terminal_parse!(ElseTerm, TokenName::Else, "ELSE");
impl_terminal_parse!(EndIfTerm, TokenName::EndIf, "END_IF");
impl_terminal_parse!(SwitchTerm, TokenName::Switch, "SWITCH");
impl_terminal_parse!(CaseTerm, TokenName::Case, "CASE");
impl_terminal_parse!(DefaultTerm, TokenName::Default, "DEFAULT");
impl_terminal_parse!(EndSwitchTerm, TokenName::EndSwitch, "END_SWITCH");
impl_terminal_parse!(LoopTerm, TokenName::Loop, "LOOP");
impl_terminal_parse!(EndLoopTerm, TokenName::EndLoop, "END_LOOP");
impl_terminal_parse!(BreakTerm, TokenName::Break, "BREAK");
impl_terminal_parse!(ContinueTerm, TokenName::Continue, "CONTINUE");
impl_terminal_parse!(ReturnTerm, TokenName::Return, "RETURN");
impl_terminal_parse!(CallTerm, TokenName::Call, "CALL");
impl_terminal_parse!(LeftBracket, TokenName::LeftBracket, "LEFT_BRACKET");
impl_terminal_parse!(RightBracket, TokenName::RightBracket, "RIGHT_BRACKET");
impl_terminal_parse!(Colon, TokenName::Colon, "COLON");
impl_terminal_parse!(ReadWriteTerm, TokenName::ReadWrite, "READ_WRITE");
impl_terminal_parse!(Plus, TokenName::Plus, "PLUS");
impl_terminal_parse!(Minus, TokenName::Minus, "MINUS");
impl_terminal_parse!(Multiply, TokenName::Multiply, "MULTIPLY");
impl_terminal_parse!(Divide, TokenName::Divide, "DIVIDE");
impl_terminal_parse!(Increment, TokenName::Increment, "INCREMENT");
impl_terminal_parse!(Decrement, TokenName::Decrement, "DECREMENT");
impl_terminal_parse!(TrueTerm, TokenName::True, "TRUE");
impl_terminal_parse!(FalseTerm, TokenName::False, "FALSE");
impl_terminal_parse!(NulTerm, TokenName::Nul, "NUL");

#[cfg(test)]
mod tests {
    use super::*;
    use minimal_lexer::tokenize;

    #[test]
    fn terminal_matches_and_advances() {
        let tokens = tokenize(";\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        assert!(Semicolon::parse(&mut buffer).is_ok());
        assert!(buffer.is_at_end());
    }

    #[test]
    fn terminal_mismatch_does_not_advance_the_original_buffer() {
        let tokens = tokenize(";\n").unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let mut fork = buffer.fork();
        assert!(Comma::parse(&mut fork).is_err());
        // the original buffer (not the fork) is untouched
        assert!(Semicolon::parse(&mut buffer).is_ok());
    }
}
