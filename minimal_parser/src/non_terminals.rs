//! The grammar itself (§4.6): one type per non-terminal, entering a nested
//! non-terminal as a struct field (CHILD) and continuing at the same level
//! as the next field, or as an item of a [`crate::modulars::Repeated`] /
//! [`crate::modulars::Delimited`] list (SIBLING).
//!
//! Field order always matches the right-hand side the non-terminal matched,
//! so a depth-first, field-order walk of any of these types reconstructs
//! the production exactly.

use minimal_lexer::{TokenCategory, TokenName};

use crate::modulars::{Delimited, Repeated};
use crate::parser_utils::{BinAssignOpTerm, Id, KeywordLiteral, Literal, Type, UnaAssignOpTerm};
use crate::terminals::{
    ArgvTerm, Assign, BreakTerm, CImportTerm, CallTerm, CaseTerm, Colon, Comma, ContinueTerm,
    CustomTypeTerm, DefaultTerm, Divide, ElseIfTerm, ElseTerm, EndFuncTerm, EndIfTerm,
    EndLoopTerm, EndMainTerm, EndModuleCloseTerm, EndModuleOpenTerm, EndSwitchTerm,
    FuncTerm, IfTerm, ImportTerm, LeftBracket, LeftParen, LoopTerm, MImportTerm,
    MainDeclarationTerm, MainTerm, MiniConstId, MiniId, Minus, Multiply, Plus, ReadWriteTerm,
    Redirect, ReturnTerm, RightBracket, RightParen, StringLit, SwitchTerm,
};
use crate::{make_indent, Parse, ParseBuffer, ParseDisplay};

macro_rules! nonterminal_display {
    ($ty:ty, $label:expr, [$($field:ident),* $(,)?]) => {
        impl ParseDisplay for $ty {
            fn display(&self, depth: usize, label: Option<String>) {
                let indent = make_indent(depth);
                let label = label.unwrap_or_else(|| $label.to_string());
                println!("{indent}[{label}]");
                $( self.$field.display(depth + 1, None); )*
            }

            fn lexeme_signature(&self) -> String {
                #[allow(unused_mut)]
                let mut sig = String::new();
                $(
                    let piece = self.$field.lexeme_signature();
                    if !piece.is_empty() {
                        if !sig.is_empty() {
                            sig.push(' ');
                        }
                        sig.push_str(&piece);
                    }
                )*
                sig
            }
        }
    };
}

macro_rules! enum_display {
    ($ty:ty, [$($variant:ident),+ $(,)?]) => {
        impl ParseDisplay for $ty {
            fn display(&self, depth: usize, label: Option<String>) {
                match self {
                    $(<$ty>::$variant(inner) => inner.display(depth, label),)+
                }
            }

            fn lexeme_signature(&self) -> String {
                match self {
                    $(<$ty>::$variant(inner) => inner.lexeme_signature(),)+
                }
            }
        }
    };
}

// ---------------------------------------------------------------------
// source / module-file / main-file
// ---------------------------------------------------------------------

pub enum Source {
    Modules {
        modules: Repeated<ModuleFile>,
        main: Option<MainFile>,
    },
    MainOnly(MainFile),
}

impl Parse for Source {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(first) = ModuleFile::parse(&mut fork) {
            let mut modules = vec![first];
            loop {
                let mut next_fork = fork.fork();
                match ModuleFile::parse(&mut next_fork) {
                    Ok(m) => {
                        modules.push(m);
                        fork = next_fork;
                    }
                    Err(_) => break,
                }
            }
            let main = MainFile::parse(&mut fork).ok();
            *buffer = fork;
            return Ok(Source::Modules {
                modules: modules.into(),
                main,
            });
        }

        let mut fork = buffer.fork();
        let main = MainFile::parse(&mut fork)?;
        *buffer = fork;
        Ok(Source::MainOnly(main))
    }

    fn parse_label() -> String {
        "SOURCE".to_string()
    }
}

impl ParseDisplay for Source {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        println!("{indent}[{label}]");
        match self {
            Source::Modules { modules, main } => {
                modules.display(depth + 1, None);
                main.display(depth + 1, None);
            }
            Source::MainOnly(main) => main.display(depth + 1, None),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            Source::Modules { modules, main } => {
                let mut sig = modules.lexeme_signature();
                let m = main.lexeme_signature();
                if !m.is_empty() {
                    if !sig.is_empty() {
                        sig.push(' ');
                    }
                    sig.push_str(&m);
                }
                sig
            }
            Source::MainOnly(main) => main.lexeme_signature(),
        }
    }
}

pub struct ModuleFile {
    pub module_part: ModulePart,
}

impl Parse for ModuleFile {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        Ok(ModuleFile {
            module_part: ModulePart::parse(buffer)?,
        })
    }

    fn parse_label() -> String {
        "MODULE_FILE".to_string()
    }
}
nonterminal_display!(ModuleFile, "MODULE_FILE", [module_part]);

pub struct MainFile {
    pub declaration: MainDeclarationTerm,
    pub module_part: Option<ModulePart>,
    pub main_part: MainPart,
}

impl Parse for MainFile {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let declaration = MainDeclarationTerm::parse(&mut fork)?;
        let module_part = ModulePart::parse(&mut fork).ok();
        let main_part = MainPart::parse(&mut fork)?;
        *buffer = fork;
        Ok(MainFile {
            declaration,
            module_part,
            main_part,
        })
    }

    fn parse_label() -> String {
        "MAIN_FILE".to_string()
    }
}
nonterminal_display!(MainFile, "MAIN_FILE", [declaration, module_part, main_part]);

// ---------------------------------------------------------------------
// module-part / module-seq
// ---------------------------------------------------------------------

pub struct ModulePart {
    pub open: EndModuleOpenTerm,
    pub name: MiniId,
    pub colon: Colon,
    pub seq: ModuleSeq,
    pub close: EndModuleCloseTerm,
}

impl Parse for ModulePart {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let open = EndModuleOpenTerm::parse(&mut fork)?;
        let name = MiniId::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let seq = ModuleSeq::parse(&mut fork)?;
        let close = EndModuleCloseTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(ModulePart {
            open,
            name,
            colon,
            seq,
            close,
        })
    }

    fn parse_label() -> String {
        "MODULE_PART".to_string()
    }
}
nonterminal_display!(ModulePart, "MODULE_PART", [open, name, colon, seq, close]);

pub type ModuleSeq = Repeated<ModuleSeqItem>;

pub enum ModuleSeqItem {
    Import(Import),
    TypeAlias(TypeAlias),
    Subprogram(Subprogram),
    ModuleDecl(ModuleDecl),
}

impl Parse for ModuleSeqItem {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let next_name = buffer.peek().map(|t| t.name);
        match next_name {
            Some(TokenName::Import) | Some(TokenName::MImport) | Some(TokenName::CImport) => {
                let mut fork = buffer.fork();
                let item = Import::parse(&mut fork)?;
                *buffer = fork;
                Ok(ModuleSeqItem::Import(item))
            }
            Some(TokenName::Func) => {
                let mut fork = buffer.fork();
                let item = Subprogram::parse(&mut fork)?;
                *buffer = fork;
                Ok(ModuleSeqItem::Subprogram(item))
            }
            _ => {
                // A type keyword selects between `type-alias` (second token
                // is `->`) and `module-decl` (second token is an identifier).
                let mut probe = buffer.fork();
                let _first = probe.next();
                let second_is_redirect =
                    matches!(probe.peek(), Some(tok) if tok.name == TokenName::Redirect);
                if second_is_redirect {
                    let mut fork = buffer.fork();
                    let item = TypeAlias::parse(&mut fork)?;
                    *buffer = fork;
                    Ok(ModuleSeqItem::TypeAlias(item))
                } else {
                    let mut fork = buffer.fork();
                    let item = ModuleDecl::parse(&mut fork)?;
                    *buffer = fork;
                    Ok(ModuleSeqItem::ModuleDecl(item))
                }
            }
        }
    }

    fn parse_label() -> String {
        "MODULE_SEQ_ITEM".to_string()
    }
}
enum_display!(ModuleSeqItem, [Import, TypeAlias, Subprogram, ModuleDecl]);

// ---------------------------------------------------------------------
// import / type-alias / module-decl / subprogram / param-list
// ---------------------------------------------------------------------

pub enum Import {
    Module {
        kw: ImportTerm,
        name: MiniId,
        semi: crate::terminals::Semicolon,
    },
    External {
        kind: ImportKind,
        path: StringLit,
        semi: crate::terminals::Semicolon,
    },
}

pub enum ImportKind {
    M(MImportTerm),
    C(CImportTerm),
}

impl Parse for ImportKind {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(m) = MImportTerm::parse(&mut fork) {
            *buffer = fork;
            return Ok(ImportKind::M(m));
        }
        let mut fork = buffer.fork();
        let c = CImportTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(ImportKind::C(c))
    }

    fn parse_label() -> String {
        "M_IMPORT | C_IMPORT".to_string()
    }
}
impl ParseDisplay for ImportKind {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            ImportKind::M(inner) => inner.display(depth, label),
            ImportKind::C(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            ImportKind::M(inner) => inner.lexeme_signature(),
            ImportKind::C(inner) => inner.lexeme_signature(),
        }
    }
}

impl Parse for Import {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(kw) = ImportTerm::parse(&mut fork) {
            let name = MiniId::parse(&mut fork)?;
            let semi = crate::terminals::Semicolon::parse(&mut fork)?;
            *buffer = fork;
            return Ok(Import::Module { kw, name, semi });
        }

        let mut fork = buffer.fork();
        let kind = ImportKind::parse(&mut fork)?;
        let path = StringLit::parse(&mut fork)?;
        let semi = crate::terminals::Semicolon::parse(&mut fork)?;
        *buffer = fork;
        Ok(Import::External { kind, path, semi })
    }

    fn parse_label() -> String {
        "IMPORT".to_string()
    }
}
impl ParseDisplay for Import {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        println!("{indent}[{label}]");
        match self {
            Import::Module { kw, name, semi } => {
                kw.display(depth + 1, None);
                name.display(depth + 1, None);
                semi.display(depth + 1, None);
            }
            Import::External { kind, path, semi } => {
                kind.display(depth + 1, None);
                path.display(depth + 1, None);
                semi.display(depth + 1, None);
            }
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            Import::Module { kw, name, semi } => format!(
                "{} {} {}",
                kw.lexeme_signature(),
                name.lexeme_signature(),
                semi.lexeme_signature()
            ),
            Import::External { kind, path, semi } => format!(
                "{} {} {}",
                kind.lexeme_signature(),
                path.lexeme_signature(),
                semi.lexeme_signature()
            ),
        }
    }
}

pub struct TypeAlias {
    pub ty: Type,
    pub arrow: Redirect,
    pub alias: CustomTypeTerm,
    pub semi: crate::terminals::Semicolon,
}

impl Parse for TypeAlias {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let ty = Type::parse(&mut fork)?;
        let arrow = Redirect::parse(&mut fork)?;
        let alias = CustomTypeTerm::parse(&mut fork)?;
        let semi = crate::terminals::Semicolon::parse(&mut fork)?;
        *buffer = fork;
        Ok(TypeAlias {
            ty,
            arrow,
            alias,
            semi,
        })
    }

    fn parse_label() -> String {
        "TYPE_ALIAS".to_string()
    }
}
nonterminal_display!(TypeAlias, "TYPE_ALIAS", [ty, arrow, alias, semi]);

pub enum IdOrConst {
    Id(MiniId),
    Const(MiniConstId),
}

impl Parse for IdOrConst {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(id) = MiniId::parse(&mut fork) {
            *buffer = fork;
            return Ok(IdOrConst::Id(id));
        }
        let mut fork = buffer.fork();
        let c = MiniConstId::parse(&mut fork)?;
        *buffer = fork;
        Ok(IdOrConst::Const(c))
    }

    fn parse_label() -> String {
        "MINI_ID | MINI_CONST_ID".to_string()
    }
}
enum_display!(IdOrConst, [Id, Const]);

pub struct Declaration {
    pub ty: Type,
    pub name: IdOrConst,
    pub init: Option<DeclarationInit>,
}

pub struct DeclarationInit {
    pub assign: Assign,
    pub value: CollectionOrPrimary,
}

pub enum CollectionOrPrimary {
    Collection(Collection),
    Primary(Box<PrimaryExpr>),
}

impl Parse for CollectionOrPrimary {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(c) = Collection::parse(&mut fork) {
            *buffer = fork;
            return Ok(CollectionOrPrimary::Collection(c));
        }
        let mut fork = buffer.fork();
        let p = PrimaryExpr::parse(&mut fork)?;
        *buffer = fork;
        Ok(CollectionOrPrimary::Primary(Box::new(p)))
    }

    fn parse_label() -> String {
        "COLLECTION | PRIMARY_EXPR".to_string()
    }
}
enum_display!(CollectionOrPrimary, [Collection, Primary]);

impl Parse for DeclarationInit {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let assign = Assign::parse(&mut fork)?;
        let value = CollectionOrPrimary::parse(&mut fork)?;
        *buffer = fork;
        Ok(DeclarationInit { assign, value })
    }

    fn parse_label() -> String {
        "DECLARATION_INIT".to_string()
    }
}
nonterminal_display!(DeclarationInit, "DECLARATION_INIT", [assign, value]);

impl Parse for Declaration {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let ty = Type::parse(&mut fork)?;
        let name = IdOrConst::parse(&mut fork)?;
        let init = DeclarationInit::parse(&mut fork).ok();
        *buffer = fork;
        Ok(Declaration { ty, name, init })
    }

    fn parse_label() -> String {
        "DECLARATION".to_string()
    }
}
nonterminal_display!(Declaration, "DECLARATION", [ty, name, init]);

pub struct ModuleDecl {
    pub decl: Declaration,
    pub semi: crate::terminals::Semicolon,
}

impl Parse for ModuleDecl {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let decl = Declaration::parse(&mut fork)?;
        let semi = crate::terminals::Semicolon::parse(&mut fork)?;
        *buffer = fork;
        Ok(ModuleDecl { decl, semi })
    }

    fn parse_label() -> String {
        "MODULE_DECL".to_string()
    }
}
nonterminal_display!(ModuleDecl, "MODULE_DECL", [decl, semi]);

pub struct Param {
    pub ty: Type,
    pub name: MiniId,
}

impl Parse for Param {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let ty = Type::parse(&mut fork)?;
        let name = MiniId::parse(&mut fork)?;
        *buffer = fork;
        Ok(Param { ty, name })
    }

    fn parse_label() -> String {
        "PARAM".to_string()
    }
}
nonterminal_display!(Param, "PARAM", [ty, name]);

pub type ParamList = Delimited<Param, Comma>;

pub struct Subprogram {
    pub func: FuncTerm,
    pub name: MiniId,
    pub lparen: LeftParen,
    pub params: ParamList,
    pub rparen: RightParen,
    pub arrow: Redirect,
    pub ret_ty: Type,
    pub colon: Colon,
    pub body: Sequence,
    pub end: EndFuncTerm,
}

impl Parse for Subprogram {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let func = FuncTerm::parse(&mut fork)?;
        let name = MiniId::parse(&mut fork)?;
        let lparen = LeftParen::parse(&mut fork)?;
        let params = ParamList::parse(&mut fork)?;
        let rparen = RightParen::parse(&mut fork)?;
        let arrow = Redirect::parse(&mut fork)?;
        let ret_ty = Type::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let end = EndFuncTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(Subprogram {
            func,
            name,
            lparen,
            params,
            rparen,
            arrow,
            ret_ty,
            colon,
            body,
            end,
        })
    }

    fn parse_label() -> String {
        "SUBPROGRAM".to_string()
    }
}
nonterminal_display!(
    Subprogram,
    "SUBPROGRAM",
    [func, name, lparen, params, rparen, arrow, ret_ty, colon, body, end]
);

// ---------------------------------------------------------------------
// main-part / sequence / statement
// ---------------------------------------------------------------------

pub struct MainPart {
    pub main: MainTerm,
    pub name: MiniId,
    pub argv: Option<ArgvTerm>,
    pub colon: Colon,
    pub body: Sequence,
    pub end: EndMainTerm,
}

impl Parse for MainPart {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let main = MainTerm::parse(&mut fork)?;
        let name = MiniId::parse(&mut fork)?;
        let argv = ArgvTerm::parse(&mut fork).ok();
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let end = EndMainTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(MainPart {
            main,
            name,
            argv,
            colon,
            body,
            end,
        })
    }

    fn parse_label() -> String {
        "MAIN_PART".to_string()
    }
}
nonterminal_display!(MainPart, "MAIN_PART", [main, name, argv, colon, body, end]);

pub type Sequence = Repeated<SequenceItem>;

pub enum SequenceItem {
    Statement(Statement),
    Branch(Box<Branch>),
}

impl Parse for SequenceItem {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(s) = Statement::parse(&mut fork) {
            *buffer = fork;
            return Ok(SequenceItem::Statement(s));
        }
        let mut fork = buffer.fork();
        let b = Branch::parse(&mut fork)?;
        *buffer = fork;
        Ok(SequenceItem::Branch(Box::new(b)))
    }

    fn parse_label() -> String {
        "SEQUENCE_ITEM".to_string()
    }
}
impl ParseDisplay for SequenceItem {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            SequenceItem::Statement(inner) => inner.display(depth, label),
            SequenceItem::Branch(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            SequenceItem::Statement(inner) => inner.lexeme_signature(),
            SequenceItem::Branch(inner) => inner.lexeme_signature(),
        }
    }
}

pub struct Statement {
    pub body: StatementBody,
    pub semi: crate::terminals::Semicolon,
}

pub enum StatementBody {
    Declaration(Declaration),
    Control(Control),
    Designation(Designation),
}

impl Parse for StatementBody {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let category = buffer.peek().map(|t| t.category);
        match category {
            Some(TokenCategory::TypeKw) => {
                let mut fork = buffer.fork();
                let d = Declaration::parse(&mut fork)?;
                *buffer = fork;
                Ok(StatementBody::Declaration(d))
            }
            Some(TokenCategory::ControlKw) => {
                let mut fork = buffer.fork();
                let c = Control::parse(&mut fork)?;
                *buffer = fork;
                Ok(StatementBody::Control(c))
            }
            _ => {
                let mut fork = buffer.fork();
                let d = Designation::parse(&mut fork)?;
                *buffer = fork;
                Ok(StatementBody::Designation(d))
            }
        }
    }

    fn parse_label() -> String {
        "STATEMENT_BODY".to_string()
    }
}
enum_display!(StatementBody, [Declaration, Control, Designation]);

impl Parse for Statement {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let body = StatementBody::parse(&mut fork)?;
        let semi = crate::terminals::Semicolon::parse(&mut fork)?;
        *buffer = fork;
        Ok(Statement { body, semi })
    }

    fn parse_label() -> String {
        "STATEMENT".to_string()
    }
}
nonterminal_display!(Statement, "STATEMENT", [body, semi]);

// ---------------------------------------------------------------------
// branch: if/switch/loop
// ---------------------------------------------------------------------

pub enum Branch {
    If(IfBlock),
    Switch(SwitchBlock),
    Loop(LoopBlock),
}

impl Parse for Branch {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        match buffer.peek().map(|t| t.name) {
            Some(TokenName::If) => {
                let mut fork = buffer.fork();
                let b = IfBlock::parse(&mut fork)?;
                *buffer = fork;
                Ok(Branch::If(b))
            }
            Some(TokenName::Switch) => {
                let mut fork = buffer.fork();
                let b = SwitchBlock::parse(&mut fork)?;
                *buffer = fork;
                Ok(Branch::Switch(b))
            }
            Some(TokenName::Loop) => {
                let mut fork = buffer.fork();
                let b = LoopBlock::parse(&mut fork)?;
                *buffer = fork;
                Ok(Branch::Loop(b))
            }
            Some(_) => Err("expected a branch (if/switch/loop)".to_string()),
            None => Err("expected a branch, found end of input".to_string()),
        }
    }

    fn parse_label() -> String {
        "BRANCH".to_string()
    }
}
enum_display!(Branch, [If, Switch, Loop]);

pub enum IfTail {
    EndIf(EndIfTerm),
    Elif(Box<ElifBlock>),
    Else(Box<ElseBlock>),
}

impl Parse for IfTail {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(end) = EndIfTerm::parse(&mut fork) {
            *buffer = fork;
            return Ok(IfTail::EndIf(end));
        }
        let mut fork = buffer.fork();
        if let Ok(elif) = ElifBlock::parse(&mut fork) {
            *buffer = fork;
            return Ok(IfTail::Elif(Box::new(elif)));
        }
        let mut fork = buffer.fork();
        let else_block = ElseBlock::parse(&mut fork)?;
        *buffer = fork;
        Ok(IfTail::Else(Box::new(else_block)))
    }

    fn parse_label() -> String {
        "END_IF | ELIF_BLOCK | ELSE_BLOCK".to_string()
    }
}
impl ParseDisplay for IfTail {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            IfTail::EndIf(inner) => inner.display(depth, label),
            IfTail::Elif(inner) => inner.display(depth, label),
            IfTail::Else(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            IfTail::EndIf(inner) => inner.lexeme_signature(),
            IfTail::Elif(inner) => inner.lexeme_signature(),
            IfTail::Else(inner) => inner.lexeme_signature(),
        }
    }
}

pub struct IfBlock {
    pub kw: IfTerm,
    pub cond: LogicalExpr,
    pub colon: Colon,
    pub body: Sequence,
    pub tail: IfTail,
}

impl Parse for IfBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = IfTerm::parse(&mut fork)?;
        let cond = LogicalExpr::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let tail = IfTail::parse(&mut fork)?;
        *buffer = fork;
        Ok(IfBlock {
            kw,
            cond,
            colon,
            body,
            tail,
        })
    }

    fn parse_label() -> String {
        "IF_BLOCK".to_string()
    }
}
nonterminal_display!(IfBlock, "IF_BLOCK", [kw, cond, colon, body, tail]);

pub struct ElifBlock {
    pub kw: ElseIfTerm,
    pub cond: LogicalExpr,
    pub colon: Colon,
    pub body: Sequence,
    pub tail: IfTail,
}

impl Parse for ElifBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = ElseIfTerm::parse(&mut fork)?;
        let cond = LogicalExpr::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let tail = IfTail::parse(&mut fork)?;
        *buffer = fork;
        Ok(ElifBlock {
            kw,
            cond,
            colon,
            body,
            tail,
        })
    }

    fn parse_label() -> String {
        "ELIF_BLOCK".to_string()
    }
}
nonterminal_display!(ElifBlock, "ELIF_BLOCK", [kw, cond, colon, body, tail]);

pub struct ElseBlock {
    pub kw: ElseTerm,
    pub colon: Colon,
    pub body: Sequence,
    pub end: EndIfTerm,
}

impl Parse for ElseBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = ElseTerm::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let end = EndIfTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(ElseBlock {
            kw,
            colon,
            body,
            end,
        })
    }

    fn parse_label() -> String {
        "ELSE_BLOCK".to_string()
    }
}
nonterminal_display!(ElseBlock, "ELSE_BLOCK", [kw, colon, body, end]);

pub enum CaseValue {
    Literal(Literal),
    KeywordLiteral(KeywordLiteral),
}

impl Parse for CaseValue {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(l) = Literal::parse(&mut fork) {
            *buffer = fork;
            return Ok(CaseValue::Literal(l));
        }
        let mut fork = buffer.fork();
        let k = KeywordLiteral::parse(&mut fork)?;
        *buffer = fork;
        Ok(CaseValue::KeywordLiteral(k))
    }

    fn parse_label() -> String {
        "CONST_VALUE".to_string()
    }
}
enum_display!(CaseValue, [Literal, KeywordLiteral]);

pub enum CaseKey {
    Value(CaseValue),
    Default(DefaultTerm),
}

impl Parse for CaseKey {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(d) = DefaultTerm::parse(&mut fork) {
            *buffer = fork;
            return Ok(CaseKey::Default(d));
        }
        let mut fork = buffer.fork();
        let v = CaseValue::parse(&mut fork)?;
        *buffer = fork;
        Ok(CaseKey::Value(v))
    }

    fn parse_label() -> String {
        "CONST_VALUE | DEFAULT".to_string()
    }
}
impl ParseDisplay for CaseKey {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            CaseKey::Value(inner) => inner.display(depth, label),
            CaseKey::Default(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            CaseKey::Value(inner) => inner.lexeme_signature(),
            CaseKey::Default(inner) => inner.lexeme_signature(),
        }
    }
}

pub enum CaseTail {
    EndSwitch(EndSwitchTerm),
    Next(Box<CaseBlock>),
}
impl ParseDisplay for CaseTail {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            CaseTail::EndSwitch(inner) => inner.display(depth, label),
            CaseTail::Next(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            CaseTail::EndSwitch(inner) => inner.lexeme_signature(),
            CaseTail::Next(inner) => inner.lexeme_signature(),
        }
    }
}

pub struct CaseBlock {
    pub kw: CaseTerm,
    pub key: CaseKey,
    pub colon: Colon,
    pub body: Sequence,
    pub tail: CaseTail,
}

impl Parse for CaseBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = CaseTerm::parse(&mut fork)?;
        let key = CaseKey::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;

        // Once the key was DEFAULT, only END_SWITCH may follow — no further
        // CASE (§4.6 case-block continuation look-ahead policy).
        let was_default = matches!(key, CaseKey::Default(_));
        let tail = if was_default {
            let end = EndSwitchTerm::parse(&mut fork)?;
            CaseTail::EndSwitch(end)
        } else {
            let mut end_fork = fork.fork();
            if let Ok(end) = EndSwitchTerm::parse(&mut end_fork) {
                fork = end_fork;
                CaseTail::EndSwitch(end)
            } else {
                let next = CaseBlock::parse(&mut fork)?;
                CaseTail::Next(Box::new(next))
            }
        };

        *buffer = fork;
        Ok(CaseBlock {
            kw,
            key,
            colon,
            body,
            tail,
        })
    }

    fn parse_label() -> String {
        "CASE_BLOCK".to_string()
    }
}
nonterminal_display!(CaseBlock, "CASE_BLOCK", [kw, key, colon, body, tail]);

pub struct SwitchBlock {
    pub kw: SwitchTerm,
    pub subject: Box<PrimaryExpr>,
    pub colon: Colon,
    pub body: Option<Sequence>,
    pub cases: CaseBlock,
}

impl Parse for SwitchBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = SwitchTerm::parse(&mut fork)?;
        let subject = PrimaryExpr::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork).ok().filter(|s: &Sequence| !s.is_empty());
        let cases = CaseBlock::parse(&mut fork)?;
        *buffer = fork;
        Ok(SwitchBlock {
            kw,
            subject: Box::new(subject),
            colon,
            body,
            cases,
        })
    }

    fn parse_label() -> String {
        "SWITCH_BLOCK".to_string()
    }
}
nonterminal_display!(SwitchBlock, "SWITCH_BLOCK", [kw, subject, colon, body, cases]);

pub enum LoopBlock {
    For(ForLoop),
    While(WhileLoop),
}

impl Parse for LoopBlock {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut probe = buffer.fork();
        let _kw = LoopTerm::parse(&mut probe)
            .map_err(|e| format!("while parsing LOOP_BLOCK...\n    {e}"))?;
        match probe.peek().map(|t| t.category) {
            Some(TokenCategory::TypeKw) => {
                let mut fork = buffer.fork();
                let f = ForLoop::parse(&mut fork)?;
                *buffer = fork;
                Ok(LoopBlock::For(f))
            }
            Some(TokenCategory::Identifier) | Some(TokenCategory::LiteralKw) | Some(TokenCategory::Literal) => {
                let mut fork = buffer.fork();
                let w = WhileLoop::parse(&mut fork)?;
                *buffer = fork;
                Ok(LoopBlock::While(w))
            }
            _ => Err("expected a declaration (for-loop) or a condition (while-loop) after LOOP".to_string()),
        }
    }

    fn parse_label() -> String {
        "LOOP_BLOCK".to_string()
    }
}
enum_display!(LoopBlock, [For, While]);

pub struct ForLoop {
    pub kw: LoopTerm,
    pub init: Declaration,
    pub semi1: crate::terminals::Semicolon,
    pub cond: LogicalExpr,
    pub semi2: crate::terminals::Semicolon,
    pub step: Incrementation,
    pub colon: Colon,
    pub body: Sequence,
    pub end: EndLoopTerm,
}

impl Parse for ForLoop {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = LoopTerm::parse(&mut fork)?;
        let init = Declaration::parse(&mut fork)?;
        let semi1 = crate::terminals::Semicolon::parse(&mut fork)?;
        let cond = LogicalExpr::parse(&mut fork)?;
        let semi2 = crate::terminals::Semicolon::parse(&mut fork)?;
        let step = Incrementation::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let end = EndLoopTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(ForLoop {
            kw,
            init,
            semi1,
            cond,
            semi2,
            step,
            colon,
            body,
            end,
        })
    }

    fn parse_label() -> String {
        "FOR_LOOP".to_string()
    }
}
nonterminal_display!(
    ForLoop,
    "FOR_LOOP",
    [kw, init, semi1, cond, semi2, step, colon, body, end]
);

pub struct WhileLoop {
    pub kw: LoopTerm,
    pub cond: LogicalExpr,
    pub colon: Colon,
    pub body: Sequence,
    pub end: EndLoopTerm,
}

impl Parse for WhileLoop {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = LoopTerm::parse(&mut fork)?;
        let cond = LogicalExpr::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let body = Sequence::parse(&mut fork)?;
        let end = EndLoopTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(WhileLoop {
            kw,
            cond,
            colon,
            body,
            end,
        })
    }

    fn parse_label() -> String {
        "WHILE_LOOP".to_string()
    }
}
nonterminal_display!(WhileLoop, "WHILE_LOOP", [kw, cond, colon, body, end]);

// ---------------------------------------------------------------------
// designation: assignment / incrementation
// ---------------------------------------------------------------------

pub enum Designation {
    Assignment(Assignment),
    Incrementation(Incrementation),
}

impl Parse for Designation {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        // `id ':='` selects assignment; anything else starting with an id,
        // or a leading una-assign-op, is incrementation (§4.6 designation
        // look-ahead policy).
        let mut probe = buffer.fork();
        if Id::parse(&mut probe).is_ok() {
            let next_is_assign = matches!(probe.peek(), Some(tok) if tok.name == TokenName::Assign);
            if next_is_assign {
                let mut fork = buffer.fork();
                let a = Assignment::parse(&mut fork)?;
                *buffer = fork;
                return Ok(Designation::Assignment(a));
            }
        }
        let mut fork = buffer.fork();
        let inc = Incrementation::parse(&mut fork)?;
        *buffer = fork;
        Ok(Designation::Incrementation(inc))
    }

    fn parse_label() -> String {
        "DESIGNATION".to_string()
    }
}
enum_display!(Designation, [Assignment, Incrementation]);

pub struct Assignment {
    pub name: Id,
    pub assign: Assign,
    pub value: CollectionOrPrimary,
}

impl Parse for Assignment {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let name = Id::parse(&mut fork)?;
        let assign = Assign::parse(&mut fork)?;
        let value = CollectionOrPrimary::parse(&mut fork)?;
        *buffer = fork;
        Ok(Assignment {
            name,
            assign,
            value,
        })
    }

    fn parse_label() -> String {
        "ASSIGNMENT".to_string()
    }
}
nonterminal_display!(Assignment, "ASSIGNMENT", [name, assign, value]);

pub enum IncrementationOp {
    Compound {
        op: BinAssignOpTerm,
        value: Box<PrimaryExpr>,
    },
    Unary(UnaAssignOpTerm),
}

impl Parse for IncrementationOp {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(op) = BinAssignOpTerm::parse(&mut fork) {
            let value = PrimaryExpr::parse(&mut fork)?;
            *buffer = fork;
            return Ok(IncrementationOp::Compound {
                op,
                value: Box::new(value),
            });
        }
        let mut fork = buffer.fork();
        let op = UnaAssignOpTerm::parse(&mut fork)?;
        *buffer = fork;
        Ok(IncrementationOp::Unary(op))
    }

    fn parse_label() -> String {
        "BIN_ASSIGN_OP PRIMARY_EXPR | UNA_ASSIGN_OP".to_string()
    }
}
impl ParseDisplay for IncrementationOp {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        match self {
            IncrementationOp::Compound { op, value } => {
                let label = label.unwrap_or_else(|| "INCREMENTATION_OP".to_string());
                println!("{indent}[{label}]");
                op.display(depth + 1, None);
                value.display(depth + 1, None);
            }
            IncrementationOp::Unary(op) => op.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            IncrementationOp::Compound { op, value } => {
                format!("{} {}", op.lexeme_signature(), value.lexeme_signature())
            }
            IncrementationOp::Unary(op) => op.lexeme_signature(),
        }
    }
}

pub enum Incrementation {
    IdThenOp { name: Id, op: IncrementationOp },
    OpThenId { op: UnaAssignOpTerm, name: Id },
}

impl Parse for Incrementation {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(op) = UnaAssignOpTerm::parse(&mut fork) {
            if let Ok(name) = Id::parse(&mut fork) {
                *buffer = fork;
                return Ok(Incrementation::OpThenId { op, name });
            }
        }

        let mut fork = buffer.fork();
        let name = Id::parse(&mut fork)?;
        let op = IncrementationOp::parse(&mut fork)?;
        *buffer = fork;
        Ok(Incrementation::IdThenOp { name, op })
    }

    fn parse_label() -> String {
        "INCREMENTATION".to_string()
    }
}
impl ParseDisplay for Incrementation {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        println!("{indent}[{label}]");
        match self {
            Incrementation::IdThenOp { name, op } => {
                name.display(depth + 1, None);
                op.display(depth + 1, None);
            }
            Incrementation::OpThenId { op, name } => {
                op.display(depth + 1, None);
                name.display(depth + 1, None);
            }
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            Incrementation::IdThenOp { name, op } => {
                format!("{} {}", name.lexeme_signature(), op.lexeme_signature())
            }
            Incrementation::OpThenId { op, name } => {
                format!("{} {}", op.lexeme_signature(), name.lexeme_signature())
            }
        }
    }
}

// ---------------------------------------------------------------------
// control: io-control / func-call / flow-control
// ---------------------------------------------------------------------

pub enum Control {
    Io(IoControl),
    Call(FuncCall),
    Flow(FlowControl),
}

impl Parse for Control {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        match buffer.peek().map(|t| t.name) {
            Some(TokenName::ReadWrite) => {
                let mut fork = buffer.fork();
                let io = IoControl::parse(&mut fork)?;
                *buffer = fork;
                Ok(Control::Io(io))
            }
            Some(TokenName::Call) => {
                let mut fork = buffer.fork();
                let call = FuncCall::parse(&mut fork)?;
                *buffer = fork;
                Ok(Control::Call(call))
            }
            Some(TokenName::Break) | Some(TokenName::Continue) | Some(TokenName::Return) => {
                let mut fork = buffer.fork();
                let flow = FlowControl::parse(&mut fork)?;
                *buffer = fork;
                Ok(Control::Flow(flow))
            }
            Some(_) => Err("expected a control construct (read/write, call, break, continue, or return)".to_string()),
            None => Err("expected a control construct, found end of input".to_string()),
        }
    }

    fn parse_label() -> String {
        "CONTROL".to_string()
    }
}
enum_display!(Control, [Io, Call, Flow]);

pub struct IoControl {
    pub kw: ReadWriteTerm,
    pub from: Box<PrimaryExpr>,
    pub arrow: Redirect,
    pub to: Box<PrimaryExpr>,
}

impl Parse for IoControl {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = ReadWriteTerm::parse(&mut fork)?;
        let from = PrimaryExpr::parse(&mut fork)?;
        let arrow = Redirect::parse(&mut fork)?;
        let to = PrimaryExpr::parse(&mut fork)?;
        *buffer = fork;
        Ok(IoControl {
            kw,
            from: Box::new(from),
            arrow,
            to: Box::new(to),
        })
    }

    fn parse_label() -> String {
        "IO_CONTROL".to_string()
    }
}
nonterminal_display!(IoControl, "IO_CONTROL", [kw, from, arrow, to]);

pub enum FlowControl {
    Break(BreakTerm),
    Continue(ContinueTerm),
    Return {
        kw: ReturnTerm,
        value: Box<PrimaryExpr>,
    },
}

impl Parse for FlowControl {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(b) = BreakTerm::parse(&mut fork) {
            *buffer = fork;
            return Ok(FlowControl::Break(b));
        }
        let mut fork = buffer.fork();
        if let Ok(c) = ContinueTerm::parse(&mut fork) {
            *buffer = fork;
            return Ok(FlowControl::Continue(c));
        }
        let mut fork = buffer.fork();
        let kw = ReturnTerm::parse(&mut fork)?;
        let value = PrimaryExpr::parse(&mut fork)?;
        *buffer = fork;
        Ok(FlowControl::Return {
            kw,
            value: Box::new(value),
        })
    }

    fn parse_label() -> String {
        "FLOW_CONTROL".to_string()
    }
}
impl ParseDisplay for FlowControl {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        match self {
            FlowControl::Break(inner) => inner.display(depth, label),
            FlowControl::Continue(inner) => inner.display(depth, label),
            FlowControl::Return { kw, value } => {
                let label = label.unwrap_or_else(Self::parse_label);
                println!("{indent}[{label}]");
                kw.display(depth + 1, None);
                value.display(depth + 1, None);
            }
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            FlowControl::Break(inner) => inner.lexeme_signature(),
            FlowControl::Continue(inner) => inner.lexeme_signature(),
            FlowControl::Return { kw, value } => {
                format!("{} {}", kw.lexeme_signature(), value.lexeme_signature())
            }
        }
    }
}

pub type ArgList = Delimited<PrimaryExpr, Comma>;

pub struct FuncCall {
    pub kw: CallTerm,
    pub name: Id,
    pub lparen: LeftParen,
    pub args: ArgList,
    pub rparen: RightParen,
}

impl Parse for FuncCall {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let kw = CallTerm::parse(&mut fork)?;
        let name = Id::parse(&mut fork)?;
        let lparen = LeftParen::parse(&mut fork)?;
        let args = ArgList::parse(&mut fork)?;
        let rparen = RightParen::parse(&mut fork)?;
        *buffer = fork;
        Ok(FuncCall {
            kw,
            name,
            lparen,
            args,
            rparen,
        })
    }

    fn parse_label() -> String {
        "FUNC_CALL".to_string()
    }
}
nonterminal_display!(FuncCall, "FUNC_CALL", [kw, name, lparen, args, rparen]);

// ---------------------------------------------------------------------
// collection: list / dict
// ---------------------------------------------------------------------

pub struct DictEntry {
    pub key: Box<PrimaryExpr>,
    pub colon: Colon,
    pub value: Box<PrimaryExpr>,
}

impl Parse for DictEntry {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let key = PrimaryExpr::parse(&mut fork)?;
        let colon = Colon::parse(&mut fork)?;
        let value = PrimaryExpr::parse(&mut fork)?;
        *buffer = fork;
        Ok(DictEntry {
            key: Box::new(key),
            colon,
            value: Box::new(value),
        })
    }

    fn parse_label() -> String {
        "DICT_ENTRY".to_string()
    }
}
nonterminal_display!(DictEntry, "DICT_ENTRY", [key, colon, value]);

pub enum CollectionBody {
    List(Delimited<PrimaryExpr, Comma>),
    Dict(Delimited<DictEntry, Comma>),
}

pub struct Collection {
    pub lbracket: LeftBracket,
    pub body: CollectionBody,
    pub rbracket: RightBracket,
}

impl Parse for Collection {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let lbracket = LeftBracket::parse(&mut fork)?;

        // Peek past the first value to see whether `:` (dict) or `,`/`]`
        // (list) follows (§4.6 collection look-ahead policy).
        let mut probe = fork.fork();
        let is_dict = if PrimaryExpr::parse(&mut probe).is_ok() {
            matches!(probe.peek(), Some(tok) if tok.name == TokenName::Colon)
        } else {
            false
        };

        let body = if is_dict {
            CollectionBody::Dict(Delimited::<DictEntry, Comma>::parse(&mut fork)?)
        } else {
            CollectionBody::List(Delimited::<PrimaryExpr, Comma>::parse(&mut fork)?)
        };

        let rbracket = RightBracket::parse(&mut fork)?;
        *buffer = fork;
        Ok(Collection {
            lbracket,
            body,
            rbracket,
        })
    }

    fn parse_label() -> String {
        "COLLECTION".to_string()
    }
}
impl ParseDisplay for Collection {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        let label = label.unwrap_or_else(Self::parse_label);
        println!("{indent}[{label}]");
        self.lbracket.display(depth + 1, None);
        match &self.body {
            CollectionBody::List(list) => list.display(depth + 1, None),
            CollectionBody::Dict(dict) => dict.display(depth + 1, None),
        }
        self.rbracket.display(depth + 1, None);
    }

    fn lexeme_signature(&self) -> String {
        let body = match &self.body {
            CollectionBody::List(list) => list.lexeme_signature(),
            CollectionBody::Dict(dict) => dict.lexeme_signature(),
        };
        format!(
            "{} {} {}",
            self.lbracket.lexeme_signature(),
            body,
            self.rbracket.lexeme_signature()
        )
    }
}

// ---------------------------------------------------------------------
// primary-expr / expression / arithmetic-expr / logical-expr
// ---------------------------------------------------------------------

pub enum PrimaryExpr {
    Id(Id),
    Literal(Literal),
    KeywordLiteral(KeywordLiteral),
    Expression(Box<Expression>),
}

pub enum Expression {
    Parenthesized {
        lparen: LeftParen,
        inner: Box<PrimaryExpr>,
        rparen: RightParen,
    },
    Arithmetic(ArithmeticExpr),
    Logical(LogicalExpr),
}

/// What the unbounded forward scan (§9 Open Question: "crosses parentheses
/// without depth tracking") found before the next punctuation separator or
/// closing bracket: this, not alternative order, is what `primary-expr`
/// dispatches on.
enum LookaheadShape {
    Logical,
    Arithmetic,
    Atom,
}

fn classify_lookahead(buffer: &ParseBuffer<'_>) -> LookaheadShape {
    let mut probe = buffer.fork();
    let mut saw_logical = false;
    let mut saw_arith = false;
    while let Some(tok) = probe.next() {
        match tok.category {
            TokenCategory::PunctSep => break,
            TokenCategory::ParenSep
                if matches!(
                    tok.name,
                    TokenName::RightParen | TokenName::RightBracket | TokenName::RightBrace
                ) =>
            {
                break
            }
            TokenCategory::CompOp | TokenCategory::BinLogOp | TokenCategory::UnaLogOp => {
                saw_logical = true;
            }
            TokenCategory::BinMathOp | TokenCategory::UnaMathOp => {
                saw_arith = true;
            }
            _ => {}
        }
    }
    if saw_logical {
        LookaheadShape::Logical
    } else if saw_arith {
        LookaheadShape::Arithmetic
    } else {
        LookaheadShape::Atom
    }
}

impl Parse for PrimaryExpr {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        if matches!(buffer.peek(), Some(tok) if tok.name == TokenName::LeftParen) {
            let mut fork = buffer.fork();
            let lparen = LeftParen::parse(&mut fork)?;
            let inner = PrimaryExpr::parse(&mut fork)?;
            let rparen = RightParen::parse(&mut fork)?;
            *buffer = fork;
            return Ok(PrimaryExpr::Expression(Box::new(Expression::Parenthesized {
                lparen,
                inner: Box::new(inner),
                rparen,
            })));
        }

        match classify_lookahead(buffer) {
            LookaheadShape::Logical => {
                let mut fork = buffer.fork();
                let expr = LogicalExpr::parse(&mut fork)?;
                *buffer = fork;
                Ok(PrimaryExpr::Expression(Box::new(Expression::Logical(expr))))
            }
            LookaheadShape::Arithmetic => {
                let mut fork = buffer.fork();
                let expr = ArithmeticExpr::parse(&mut fork)?;
                *buffer = fork;
                Ok(PrimaryExpr::Expression(Box::new(Expression::Arithmetic(expr))))
            }
            LookaheadShape::Atom => {
                let mut fork = buffer.fork();
                if let Ok(id) = Id::parse(&mut fork) {
                    *buffer = fork;
                    return Ok(PrimaryExpr::Id(id));
                }
                let mut fork = buffer.fork();
                if let Ok(lit) = Literal::parse(&mut fork) {
                    *buffer = fork;
                    return Ok(PrimaryExpr::Literal(lit));
                }
                let mut fork = buffer.fork();
                let kw = KeywordLiteral::parse(&mut fork)?;
                *buffer = fork;
                Ok(PrimaryExpr::KeywordLiteral(kw))
            }
        }
    }

    fn parse_label() -> String {
        "PRIMARY_EXPR".to_string()
    }
}
impl ParseDisplay for PrimaryExpr {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            PrimaryExpr::Id(inner) => inner.display(depth, label),
            PrimaryExpr::Literal(inner) => inner.display(depth, label),
            PrimaryExpr::KeywordLiteral(inner) => inner.display(depth, label),
            PrimaryExpr::Expression(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            PrimaryExpr::Id(inner) => inner.lexeme_signature(),
            PrimaryExpr::Literal(inner) => inner.lexeme_signature(),
            PrimaryExpr::KeywordLiteral(inner) => inner.lexeme_signature(),
            PrimaryExpr::Expression(inner) => inner.lexeme_signature(),
        }
    }
}

impl ParseDisplay for Expression {
    fn display(&self, depth: usize, label: Option<String>) {
        let indent = make_indent(depth);
        match self {
            Expression::Parenthesized {
                lparen,
                inner,
                rparen,
            } => {
                let label = label.unwrap_or_else(|| "EXPRESSION".to_string());
                println!("{indent}[{label}]");
                lparen.display(depth + 1, None);
                inner.display(depth + 1, None);
                rparen.display(depth + 1, None);
            }
            Expression::Arithmetic(inner) => inner.display(depth, label),
            Expression::Logical(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            Expression::Parenthesized {
                lparen,
                inner,
                rparen,
            } => format!(
                "{} {} {}",
                lparen.lexeme_signature(),
                inner.lexeme_signature(),
                rparen.lexeme_signature()
            ),
            Expression::Arithmetic(inner) => inner.lexeme_signature(),
            Expression::Logical(inner) => inner.lexeme_signature(),
        }
    }
}

/// Preserved exactly as documented (§9 Open Question): only the three
/// keyword literals `TRUE`/`FALSE`/`NUL` are recognized. A full
/// arithmetic/logical expression grammar with precedence is out of scope
/// pending a semantic specification.
pub struct LogicalExpr {
    pub token: KeywordLiteral,
}

const LOGICAL_LITERAL_NAMES: &[TokenName] = &[TokenName::True, TokenName::False, TokenName::Nul];

impl Parse for LogicalExpr {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        match fork.peek() {
            Some(tok) if LOGICAL_LITERAL_NAMES.contains(&tok.name) => {
                let token = crate::parser_utils::match_names(&mut fork, LOGICAL_LITERAL_NAMES)
                    .expect("peeked name just matched");
                *buffer = fork;
                Ok(LogicalExpr {
                    token: KeywordLiteral { token },
                })
            }
            Some(tok) => Err(format!(
                "expected TRUE, FALSE, or NUL, found '{}' at line {}",
                tok.lexeme, tok.line
            )),
            None => Err("expected TRUE, FALSE, or NUL, found end of input".to_string()),
        }
    }

    fn parse_label() -> String {
        "LOGICAL_EXPR".to_string()
    }
}
nonterminal_display!(LogicalExpr, "LOGICAL_EXPR", [token]);

// --- arithmetic-expr / term / factor, grounded in the teacher's own
// left-associative Term/Factor shape, kept deliberately small: `factor`'s
// atomic alternative goes directly to id/literal/keyword-literal rather
// than back through `primary-expr`, so descent always consumes a token and
// cannot cycle.

pub enum AddSub {
    Plus(Plus),
    Minus(Minus),
}

impl Parse for AddSub {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(p) = Plus::parse(&mut fork) {
            *buffer = fork;
            return Ok(AddSub::Plus(p));
        }
        let mut fork = buffer.fork();
        let m = Minus::parse(&mut fork)?;
        *buffer = fork;
        Ok(AddSub::Minus(m))
    }

    fn parse_label() -> String {
        "PLUS | MINUS".to_string()
    }
}
enum_display!(AddSub, [Plus, Minus]);

pub enum MulDiv {
    Multiply(Multiply),
    Divide(Divide),
}

impl Parse for MulDiv {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(m) = Multiply::parse(&mut fork) {
            *buffer = fork;
            return Ok(MulDiv::Multiply(m));
        }
        let mut fork = buffer.fork();
        let d = Divide::parse(&mut fork)?;
        *buffer = fork;
        Ok(MulDiv::Divide(d))
    }

    fn parse_label() -> String {
        "MULTIPLY | DIVIDE".to_string()
    }
}
enum_display!(MulDiv, [Multiply, Divide]);

pub enum Factor {
    Id(Id),
    Literal(Literal),
    KeywordLiteral(KeywordLiteral),
    Parenthesized(Box<ParenthesizedArithmetic>),
}

pub struct ParenthesizedArithmetic {
    pub lparen: LeftParen,
    pub inner: ArithmeticExpr,
    pub rparen: RightParen,
}

impl Parse for ParenthesizedArithmetic {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let lparen = LeftParen::parse(&mut fork)?;
        let inner = ArithmeticExpr::parse(&mut fork)?;
        let rparen = RightParen::parse(&mut fork)?;
        *buffer = fork;
        Ok(ParenthesizedArithmetic {
            lparen,
            inner,
            rparen,
        })
    }

    fn parse_label() -> String {
        "PARENTHESIZED_ARITHMETIC".to_string()
    }
}
nonterminal_display!(ParenthesizedArithmetic, "PARENTHESIZED_ARITHMETIC", [lparen, inner, rparen]);

impl Parse for Factor {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        if let Ok(p) = ParenthesizedArithmetic::parse(&mut fork) {
            *buffer = fork;
            return Ok(Factor::Parenthesized(Box::new(p)));
        }
        let mut fork = buffer.fork();
        if let Ok(id) = Id::parse(&mut fork) {
            *buffer = fork;
            return Ok(Factor::Id(id));
        }
        let mut fork = buffer.fork();
        if let Ok(lit) = Literal::parse(&mut fork) {
            *buffer = fork;
            return Ok(Factor::Literal(lit));
        }
        let mut fork = buffer.fork();
        let kw = KeywordLiteral::parse(&mut fork)?;
        *buffer = fork;
        Ok(Factor::KeywordLiteral(kw))
    }

    fn parse_label() -> String {
        "FACTOR".to_string()
    }
}
impl ParseDisplay for Factor {
    fn display(&self, depth: usize, label: Option<String>) {
        match self {
            Factor::Id(inner) => inner.display(depth, label),
            Factor::Literal(inner) => inner.display(depth, label),
            Factor::KeywordLiteral(inner) => inner.display(depth, label),
            Factor::Parenthesized(inner) => inner.display(depth, label),
        }
    }

    fn lexeme_signature(&self) -> String {
        match self {
            Factor::Id(inner) => inner.lexeme_signature(),
            Factor::Literal(inner) => inner.lexeme_signature(),
            Factor::KeywordLiteral(inner) => inner.lexeme_signature(),
            Factor::Parenthesized(inner) => inner.lexeme_signature(),
        }
    }
}

pub struct FactorExtend {
    pub op: MulDiv,
    pub factor: Factor,
    pub extend: Option<Box<FactorExtend>>,
}

impl Parse for FactorExtend {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let op = MulDiv::parse(&mut fork)?;
        let factor = Factor::parse(&mut fork)?;
        let extend = FactorExtend::parse(&mut fork).ok().map(Box::new);
        *buffer = fork;
        Ok(FactorExtend { op, factor, extend })
    }

    fn parse_label() -> String {
        "FACTOR_EXTEND".to_string()
    }
}
nonterminal_display!(FactorExtend, "FACTOR_EXTEND", [op, factor, extend]);

pub struct Term {
    pub factor: Factor,
    pub extend: Option<Box<FactorExtend>>,
}

impl Parse for Term {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let factor = Factor::parse(&mut fork)?;
        let extend = FactorExtend::parse(&mut fork).ok().map(Box::new);
        *buffer = fork;
        Ok(Term { factor, extend })
    }

    fn parse_label() -> String {
        "TERM".to_string()
    }
}
nonterminal_display!(Term, "TERM", [factor, extend]);

pub struct TermExtend {
    pub op: AddSub,
    pub term: Term,
    pub extend: Option<Box<TermExtend>>,
}

impl Parse for TermExtend {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let op = AddSub::parse(&mut fork)?;
        let term = Term::parse(&mut fork)?;
        let extend = TermExtend::parse(&mut fork).ok().map(Box::new);
        *buffer = fork;
        Ok(TermExtend { op, term, extend })
    }

    fn parse_label() -> String {
        "TERM_EXTEND".to_string()
    }
}
nonterminal_display!(TermExtend, "TERM_EXTEND", [op, term, extend]);

pub struct ArithmeticExpr {
    pub term: Term,
    pub extend: Option<Box<TermExtend>>,
}

impl Parse for ArithmeticExpr {
    fn parse(buffer: &mut ParseBuffer<'_>) -> Result<Self, String> {
        let mut fork = buffer.fork();
        let term = Term::parse(&mut fork)?;
        let extend = TermExtend::parse(&mut fork).ok().map(Box::new);
        *buffer = fork;
        Ok(ArithmeticExpr { term, extend })
    }

    fn parse_label() -> String {
        "ARITHMETIC_EXPR".to_string()
    }
}
nonterminal_display!(ArithmeticExpr, "ARITHMETIC_EXPR", [term, extend]);

#[cfg(test)]
mod tests {
    use super::*;
    use minimal_lexer::tokenize;

    #[test]
    fn main_only_source_with_trivial_main_part() {
        let src = "!~>..<~! >>> main : <<<\n";
        let tokens = tokenize(src).unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let source = Source::parse(&mut buffer).unwrap();
        assert!(buffer.is_at_end());
        match source {
            Source::MainOnly(main) => {
                assert!(main.module_part.is_none());
                assert!(main.main_part.body.is_empty());
            }
            Source::Modules { .. } => panic!("expected a main-only source"),
        }
    }

    #[test]
    fn module_file_with_one_import() {
        let src = "}}} util : :: other; {{{\n";
        let tokens = tokenize(src).unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let source = Source::parse(&mut buffer).unwrap();
        assert!(buffer.is_at_end());
        match source {
            Source::Modules { modules, main } => {
                assert_eq!(modules.items().len(), 1);
                assert!(main.is_none());
                let seq = &modules.items()[0].module_part.seq;
                assert_eq!(seq.items().len(), 1);
                match &seq.items()[0] {
                    ModuleSeqItem::Import(Import::Module { name, .. }) => {
                        assert_eq!(name.token.lexeme, "other");
                    }
                    _ => panic!("expected a module import"),
                }
            }
            Source::MainOnly(_) => panic!("expected a module file"),
        }
    }

    #[test]
    fn for_loop_is_recognized_by_leading_declaration() {
        let src = "@@ <#> i := 0 ; T ; ++i : ~@\n";
        let tokens = tokenize(src).unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let block = LoopBlock::parse(&mut buffer).unwrap();
        assert!(buffer.is_at_end());
        assert!(matches!(block, LoopBlock::For(_)));
    }

    #[test]
    fn while_loop_is_recognized_by_leading_condition() {
        let src = "@@ T : ~@\n";
        let tokens = tokenize(src).unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let block = LoopBlock::parse(&mut buffer).unwrap();
        assert!(buffer.is_at_end());
        assert!(matches!(block, LoopBlock::While(_)));
    }

    #[test]
    fn missing_semicolon_is_a_parse_error_naming_semicolon() {
        let src = "?? T : x := 1\n";
        let tokens = tokenize(src).unwrap();
        let mut buffer = ParseBuffer::new(&tokens);
        let err = Statement::parse(&mut buffer).unwrap_err();
        assert!(err.contains("';'"));
    }
}
