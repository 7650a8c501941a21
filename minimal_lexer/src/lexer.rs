//! Greedy-shrinking classification and the line-by-line scanner (§4.3).
//!
//! The lexer never widens past ASCII: every per-character predicate here is
//! `u8`-based and intentionally ignores the host locale (§9, "Character-table
//! classifiers").

use crate::error::LexError;
use crate::token::{Token, TokenName};

pub const MAX_LINE_LENGTH: usize = 100;
pub const MAX_IDENTIFIER_LEN: usize = 8;

type Kw = (&'static str, TokenName);

const BRANCH_KWDS: &[Kw] = &[
    ("??", TokenName::If),
    ("##", TokenName::Switch),
    ("@@", TokenName::Loop),
];

const TERM_KWDS: &[Kw] = &[
    ("{{{", TokenName::EndModuleClose),
    ("<<<", TokenName::EndMain),
    ("|?", TokenName::EndSwitch),
    ("|.", TokenName::EndCase),
    ("~?", TokenName::EndIf),
    ("#=", TokenName::EndFunc),
    ("~#", TokenName::EndDict),
    ("~@", TokenName::EndLoop),
    ("~$", TokenName::ReadWrite),
];

const CONTROL_KWDS: &[Kw] = &[
    ("M::", TokenName::MImport),
    ("C::", TokenName::CImport),
    ("::", TokenName::Import),
    ("->", TokenName::Redirect),
    ("$", TokenName::Call),
    ("<-", TokenName::Argv),
    (".", TokenName::Break),
    ("..", TokenName::Continue),
    ("!", TokenName::Return),
];

/// `Else`/`Case`/`Default` extend this family past the four retrieved
/// entries — `subprogram`'s `FUNC` keyword is the source's own `$$` (distinct
/// from `CALL`'s single `$`: classification matches the whole candidate
/// string, so the two never collide), but the keyword corpus has no entry
/// left over for `else`/`case`/`default`. Grounded in the block-opener
/// pattern (`}}}`/`>>>`/`!~>..<~!`) rather than in a retrieved table entry —
/// see DESIGN.md.
const PROGRAM_BLOCK_KWDS: &[Kw] = &[
    ("}}}", TokenName::EndModuleOpen),
    (">>>", TokenName::Main),
    ("!~>..<~!", TokenName::MainDeclaration),
    ("$$", TokenName::Func),
    ("%%%", TokenName::Else),
    ("%%", TokenName::Case),
    ("%#", TokenName::Default),
];

const LITERAL_KWDS: &[Kw] = &[
    ("T", TokenName::True),
    ("F", TokenName::False),
    ("N", TokenName::Nul),
    ("...", TokenName::Ellipsis),
    ("[..]", TokenName::EmptyCollection),
    ("_", TokenName::Underscore),
];

const PAREN_SEP: &[Kw] = &[
    ("(", TokenName::LeftParen),
    (")", TokenName::RightParen),
    ("[", TokenName::LeftBracket),
    ("]", TokenName::RightBracket),
    ("{", TokenName::LeftBrace),
    ("}", TokenName::RightBrace),
    ("|", TokenName::Pipe),
];

const PUNCT_SEP: &[Kw] = &[
    (",", TokenName::Comma),
    (";", TokenName::Semicolon),
    (":", TokenName::Colon),
];

const BIN_MATH_OP: &[Kw] = &[
    ("+", TokenName::Plus),
    ("-", TokenName::Minus),
    ("*", TokenName::Multiply),
    ("/", TokenName::Divide),
    ("**", TokenName::Power),
    ("%", TokenName::Modulo),
];

const UNA_MATH_OP: &[Kw] = &[
    ("\\/", TokenName::Root),
    ("^", TokenName::Square),
    ("@", TokenName::AddressOf),
];

const BIN_ASSIGN_OP: &[Kw] = &[
    (":=", TokenName::Assign),
    ("+=", TokenName::PlusAssign),
    ("-=", TokenName::MinusAssign),
    ("*=", TokenName::MultiplyAssign),
    ("/=", TokenName::DivideAssign),
    ("%=", TokenName::ModuloAssign),
];

const UNA_ASSIGN_OP: &[Kw] = &[("++", TokenName::Increment), ("--", TokenName::Decrement)];

const COMP_OP: &[Kw] = &[
    ("=", TokenName::Equal),
    ("~=", TokenName::NotEqual),
    ("<", TokenName::Less),
    (">", TokenName::Greater),
    ("<=", TokenName::LessEqual),
    (">=", TokenName::GreaterEqual),
];

const BIN_LOG_OP: &[Kw] = &[("V", TokenName::Or), ("&", TokenName::And)];
const UNA_LOG_OP: &[Kw] = &[("~", TokenName::Not)];

/// The full general-bullet search order from §4.3: "Branch, terminator,
/// control, program-block, literal-keyword, parenthetical/punctuational
/// separator, and each operator family."
const GENERAL_TABLES: &[&[Kw]] = &[
    BRANCH_KWDS,
    TERM_KWDS,
    CONTROL_KWDS,
    PROGRAM_BLOCK_KWDS,
    LITERAL_KWDS,
    PAREN_SEP,
    PUNCT_SEP,
    BIN_MATH_OP,
    UNA_MATH_OP,
    BIN_ASSIGN_OP,
    UNA_ASSIGN_OP,
    COMP_OP,
    BIN_LOG_OP,
    UNA_LOG_OP,
];

fn match_table(candidate: &str, table: &[Kw]) -> Option<TokenName> {
    table
        .iter()
        .find(|(lexeme, _)| *lexeme == candidate)
        .map(|(_, name)| *name)
}

/// `M:` / `C:` qualified identifiers, constant identifiers, and ordinary
/// identifiers — the four sub-kinds of §4.3's "Identifier shape".
fn identifier_shape(candidate: &str) -> Option<TokenName> {
    if let Some(rest) = candidate.strip_prefix("M:") {
        let ok = !rest.is_empty()
            && candidate.len() <= MAX_IDENTIFIER_LEN + 2
            && rest.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        return ok.then_some(TokenName::MiniExtId);
    }
    if let Some(rest) = candidate.strip_prefix("C:") {
        let ok = rest.len() >= 1
            && rest
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        return ok.then_some(TokenName::CId);
    }

    let bytes = candidate.as_bytes();
    let first = bytes[0];

    if first.is_ascii_uppercase() {
        if candidate.len() == 1 {
            // Single uppercase letters fall through to the literal-keyword
            // and operator tables (`T`/`F`/`N`, `V`) rather than being
            // swallowed as constant identifiers here.
            return None;
        }
        if candidate.len() > MAX_IDENTIFIER_LEN {
            return None;
        }
        if !candidate.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
            return None;
        }
        if candidate.len() == 2 {
            let second = bytes[1];
            if !(second.is_ascii_uppercase() || second.is_ascii_digit()) {
                return None;
            }
        }
        return Some(TokenName::MiniConstId);
    }

    if first.is_ascii_lowercase() {
        if candidate.len() > MAX_IDENTIFIER_LEN {
            return None;
        }
        if candidate
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Some(TokenName::MiniId);
        }
    }

    None
}

/// Optional sign, digits, at most one `.`, at most one `e`.
fn number_literal_shape(candidate: &str) -> Option<TokenName> {
    let bytes = candidate.as_bytes();
    let mut i = if bytes[0] == b'-' { 1 } else { 0 };
    if i >= bytes.len() || !bytes[i].is_ascii_digit() {
        return None;
    }

    let mut dots = 0u32;
    let mut es = 0u32;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => {}
            b'.' => {
                dots += 1;
                if dots > 1 {
                    return None;
                }
            }
            b'e' => {
                es += 1;
                if es > 1 {
                    return None;
                }
            }
            _ => return None,
        }
        i += 1;
    }

    Some(if dots > 0 || es > 0 {
        TokenName::FloatLiteral
    } else {
        TokenName::IntLiteral
    })
}

/// Two unescaped `"`, the second terminating the candidate.
fn string_literal_shape(candidate: &str) -> Option<TokenName> {
    let bytes = candidate.as_bytes();
    if bytes.first() != Some(&b'"') {
        return None;
    }
    let mut i = 1;
    let mut escaped = false;
    while i < bytes.len() {
        let c = bytes[i];
        if escaped {
            escaped = false;
        } else if c == b'\\' {
            escaped = true;
        } else if c == b'"' {
            return (i == bytes.len() - 1).then_some(TokenName::StringLiteral);
        }
        i += 1;
    }
    None
}

const TYPE_MID_SET: &[u8] = b"#%\"BSEU:,^";

/// `<`/`[`/`{` ... matching `>`/`]`/`}`, stripping trailing `^`s, plus the
/// custom-type form.
fn type_kw_shape(candidate: &str) -> Option<TokenName> {
    let bytes = candidate.as_bytes();
    let open = bytes[0];
    let close = match open {
        b'<' => b'>',
        b'[' => b']',
        b'{' => b'}',
        _ => return None,
    };

    let mut end = candidate.len();
    while end > 1 && bytes[end - 1] == b'^' {
        end -= 1;
    }
    if end < 2 || bytes[end - 1] != close {
        return None;
    }
    let mid = &candidate[1..end - 1];

    if open == b'<' {
        if !mid.is_empty()
            && mid.as_bytes()[0].is_ascii_lowercase()
            && mid.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Some(TokenName::CustomT);
        }
        if mid.is_empty() {
            return Some(TokenName::Void);
        }
        if !mid.bytes().all(|b| TYPE_MID_SET.contains(&b)) {
            return None;
        }
        return match mid {
            "#" => Some(TokenName::Int),
            "%" => Some(TokenName::Float),
            "\"" => Some(TokenName::Str),
            "B" => Some(TokenName::Bool),
            "S" => Some(TokenName::Stream),
            "E" => Some(TokenName::EnumT),
            "U" => Some(TokenName::UnionT),
            _ => None,
        };
    }

    if !mid.bytes().all(|b| TYPE_MID_SET.contains(&b)) {
        return None;
    }
    if open == b'[' {
        return Some(if mid.contains(':') {
            TokenName::DictT
        } else {
            TokenName::ListT
        });
    }
    Some(TokenName::StructT)
}

enum Classification {
    Named(TokenName),
    Comment,
    Whitespace,
    Unclassifiable,
}

/// The total, first-match-wins classification predicate of §4.3.
fn classify(candidate: &str) -> Classification {
    if candidate.is_empty() {
        return Classification::Unclassifiable;
    }
    if candidate.len() == 1 && candidate.as_bytes()[0].is_ascii_whitespace() {
        return Classification::Whitespace;
    }
    if candidate.starts_with("//") {
        return Classification::Comment;
    }

    let first = candidate.as_bytes()[0];

    if first.is_ascii_alphabetic() || first == b'_' {
        if let Some(name) = identifier_shape(candidate) {
            return Classification::Named(name);
        }
        // Not shaped like an identifier: a single-letter candidate can still
        // be a literal keyword (`T`/`F`/`N`) or the logical-or operator
        // (`V`), so fall through to the same keyword/operator tables the
        // non-alphabetic branch below uses, instead of stopping at
        // `CONTROL_KWDS`/`LITERAL_KWDS` alone.
        for table in GENERAL_TABLES {
            if let Some(name) = match_table(candidate, table) {
                return Classification::Named(name);
            }
        }
        return Classification::Unclassifiable;
    }

    if first.is_ascii_digit() || (first == b'-' && candidate.len() > 1 && candidate.as_bytes()[1].is_ascii_digit())
    {
        return match number_literal_shape(candidate) {
            Some(name) => Classification::Named(name),
            None => Classification::Unclassifiable,
        };
    }

    if first == b'"' {
        return match string_literal_shape(candidate) {
            Some(name) => Classification::Named(name),
            None => Classification::Unclassifiable,
        };
    }

    if first == b'<' || first == b'[' || first == b'{' {
        if let Some(name) = type_kw_shape(candidate) {
            return Classification::Named(name);
        }
    }

    for table in GENERAL_TABLES {
        if let Some(name) = match_table(candidate, table) {
            return Classification::Named(name);
        }
    }

    Classification::Unclassifiable
}

/// Scans a single preprocessed line by the greedy-shrinking algorithm of
/// §4.3, tracking 1-based column positions of each emitted token.
pub struct LineScanner<'a> {
    line: &'a str,
    line_no: usize,
    cursor: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(line: &'a str, line_no: usize) -> Self {
        LineScanner {
            line,
            line_no,
            cursor: 0,
        }
    }

    /// Consumes one more token from the remaining line, or `None` once
    /// exhausted. Comment/whitespace candidates are classified but never
    /// surfaced as a `Token` (they are filtered before the parser sees the
    /// stream, per §3's token-model invariant).
    pub fn tick(&mut self) -> Result<Option<Token>, LexError> {
        loop {
            if self.cursor >= self.line.len() {
                return Ok(None);
            }
            let start = self.cursor;
            let mut end = self.line.len();
            loop {
                let candidate = &self.line[start..end];
                match classify(candidate) {
                    Classification::Named(name) => {
                        self.cursor = end;
                        return Ok(Some(Token::new(name, candidate, self.line_no, start + 1)));
                    }
                    Classification::Comment | Classification::Whitespace => {
                        self.cursor = end;
                        break;
                    }
                    Classification::Unclassifiable => {
                        if candidate.len() <= 1 {
                            return Err(LexError::InvalidSyntax {
                                line: self.line_no,
                                candidate: candidate.to_string(),
                            });
                        }
                        end -= 1;
                    }
                }
            }
        }
    }

    /// Drains every remaining token on the line.
    pub fn finalize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.tick()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Tokenizes a full preprocessed source, one line at a time.
///
/// An input with zero lines is [`LexError::FileEmpty`]; a line longer than
/// [`MAX_LINE_LENGTH`] is [`LexError::LineTooLong`].
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut line_count = 0usize;

    for (idx, line) in source.lines().enumerate() {
        line_count += 1;
        if line.len() > MAX_LINE_LENGTH {
            return Err(LexError::LineTooLong {
                line: idx + 1,
                max: MAX_LINE_LENGTH,
            });
        }
        let scanner = LineScanner::new(line, idx + 1);
        tokens.extend(scanner.finalize()?);
    }

    if line_count == 0 {
        return Err(LexError::FileEmpty);
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_type_keyword() {
        let tokens = tokenize("<#>\n").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].name, TokenName::Int);
        assert_eq!(tokens[0].category, crate::token::TokenCategory::TypeKw);
    }

    #[test]
    fn unclassifiable_single_char_is_an_error() {
        let err = tokenize("<garbage\n").unwrap_err();
        assert!(matches!(err, LexError::InvalidSyntax { .. }));
    }

    #[test]
    fn greedy_shrink_prefers_longest_operator() {
        let tokens = tokenize("a += 1\n").unwrap();
        assert_eq!(tokens[1].name, TokenName::PlusAssign);
    }

    #[test]
    fn identifier_length_boundary() {
        assert!(identifier_shape("abcdefgh").is_some());
        assert!(identifier_shape("abcdefghi").is_none());
    }

    #[test]
    fn qualified_identifiers() {
        assert_eq!(identifier_shape("M:abc"), Some(TokenName::MiniExtId));
        assert_eq!(identifier_shape("C:abc"), Some(TokenName::CId));
    }

    #[test]
    fn single_uppercase_letter_is_not_an_identifier() {
        assert_eq!(identifier_shape("T"), None);
        assert_eq!(identifier_shape("F"), None);
        assert_eq!(identifier_shape("N"), None);
        assert_eq!(identifier_shape("V"), None);
        // two-or-more-letter all-caps candidates are still constant identifiers
        assert_eq!(identifier_shape("TT"), Some(TokenName::MiniConstId));
    }

    #[test]
    fn single_letter_literal_keywords_and_operator_classify_correctly() {
        let tokens = tokenize("T F N V\n").unwrap();
        assert_eq!(tokens[0].name, TokenName::True);
        assert_eq!(tokens[1].name, TokenName::False);
        assert_eq!(tokens[2].name, TokenName::Nul);
        assert_eq!(tokens[3].name, TokenName::Or);
    }

    #[test]
    fn number_literal_rejects_two_dots() {
        assert!(number_literal_shape("1.2.3").is_none());
        assert!(number_literal_shape("1.2e3").is_some());
    }

    #[test]
    fn string_literal_must_close_at_candidate_end() {
        assert_eq!(string_literal_shape("\"hi\""), Some(TokenName::StringLiteral));
        assert_eq!(string_literal_shape("\"hi\\\""), Some(TokenName::StringLiteral));
        assert!(string_literal_shape("\"hi").is_none());
    }

    #[test]
    fn empty_source_is_file_empty() {
        assert!(matches!(tokenize(""), Err(LexError::FileEmpty)));
    }

    #[test]
    fn comments_and_whitespace_are_filtered() {
        let tokens = tokenize("// hello\n").unwrap();
        assert!(tokens.is_empty());
    }
}
