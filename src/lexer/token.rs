//! The closed set of token classes the parser depends on (spec §6).

use crate::base::Name;

/// Reserved words of the language. One variant per entry in the root scope's
/// KEYWORD namespace (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Action,
    Actions,
    Apply,
    Bit,
    Bool,
    Const,
    Control,
    Default,
    Else,
    Entries,
    Enum,
    Error,
    Exit,
    Extern,
    False,
    Header,
    HeaderUnion,
    If,
    In,
    Inout,
    Int,
    Key,
    MatchKind,
    Out,
    Package,
    Parser,
    Return,
    Select,
    State,
    String,
    Struct,
    Switch,
    Table,
    Transition,
    True,
    Tuple,
    Type,
    Typedef,
    Varbit,
    Void,
}

impl Keyword {
    /// All reserved words, in the order spec §4.2 lists them.
    pub const ALL: &'static [(&'static str, Keyword)] = &[
        ("action", Keyword::Action),
        ("actions", Keyword::Actions),
        ("apply", Keyword::Apply),
        ("bit", Keyword::Bit),
        ("bool", Keyword::Bool),
        ("const", Keyword::Const),
        ("control", Keyword::Control),
        ("default", Keyword::Default),
        ("else", Keyword::Else),
        ("entries", Keyword::Entries),
        ("enum", Keyword::Enum),
        ("error", Keyword::Error),
        ("exit", Keyword::Exit),
        ("extern", Keyword::Extern),
        ("false", Keyword::False),
        ("header", Keyword::Header),
        ("header_union", Keyword::HeaderUnion),
        ("if", Keyword::If),
        ("in", Keyword::In),
        ("inout", Keyword::Inout),
        ("int", Keyword::Int),
        ("key", Keyword::Key),
        ("match_kind", Keyword::MatchKind),
        ("out", Keyword::Out),
        ("package", Keyword::Package),
        ("parser", Keyword::Parser),
        ("return", Keyword::Return),
        ("select", Keyword::Select),
        ("state", Keyword::State),
        ("string", Keyword::String),
        ("struct", Keyword::Struct),
        ("switch", Keyword::Switch),
        ("table", Keyword::Table),
        ("transition", Keyword::Transition),
        ("true", Keyword::True),
        ("tuple", Keyword::Tuple),
        ("type", Keyword::Type),
        ("typedef", Keyword::Typedef),
        ("varbit", Keyword::Varbit),
        ("void", Keyword::Void),
    ];

    pub fn text(self) -> &'static str {
        Self::ALL
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(text, _)| *text)
            .expect("every Keyword variant is listed in Keyword::ALL")
    }
}

/// Punctuation and grouping tokens (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    Semi,
    Colon,
    Comma,
    Dot,
    Assign,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Bang,
    Tilde,
    AndAnd,
    OrOr,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Mask, // &&&
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
}

impl Punct {
    pub fn text(self) -> &'static str {
        use Punct::*;
        match self {
            Semi => ";",
            Colon => ":",
            Comma => ",",
            Dot => ".",
            Assign => "=",
            EqEq => "==",
            NotEq => "!=",
            Lt => "<",
            LtEq => "<=",
            Gt => ">",
            GtEq => ">=",
            Bang => "!",
            Tilde => "~",
            AndAnd => "&&",
            OrOr => "||",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Shl => "<<",
            Shr => ">>",
            Mask => "&&&",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            LParen => "(",
            RParen => ")",
            LBrace => "{",
            RBrace => "}",
            LBracket => "[",
            RBracket => "]",
        }
    }
}

/// The lexical class of a token. `Identifier` may be rewritten to
/// `TypeIdentifier` or `Keyword(_)` by the token window (C2) based on the
/// active scope — the lexer itself never produces those two variants for an
/// identifier-shaped lexeme; it always starts as `Identifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Identifier,
    /// Produced only by scope-aware rewriting (spec §4.1); never emitted by
    /// the lexer directly.
    TypeIdentifier,
    Keyword(Keyword),
    IntLiteral,
    StringLiteral,
    Punct(Punct),
    /// `_`
    DontCare,
    /// Used by the expression grammar to mark a primary-position `-` as
    /// unary rather than binary; synthesized by the parser, never by the
    /// lexer (spec §6 lists it as part of the parser's closed token-class
    /// vocabulary, not the lexer's).
    UnaryMinus,
    Comment,
    StartOfInput,
    EndOfInput,
    LexicalError,
}

impl TokenClass {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenClass::Comment)
    }

    pub fn describe(self) -> String {
        match self {
            TokenClass::Identifier => "identifier".to_string(),
            TokenClass::TypeIdentifier => "type identifier".to_string(),
            TokenClass::Keyword(kw) => format!("'{}'", kw.text()),
            TokenClass::IntLiteral => "integer literal".to_string(),
            TokenClass::StringLiteral => "string literal".to_string(),
            TokenClass::Punct(p) => format!("'{}'", p.text()),
            TokenClass::DontCare => "'_'".to_string(),
            TokenClass::UnaryMinus => "unary '-'".to_string(),
            TokenClass::Comment => "comment".to_string(),
            TokenClass::StartOfInput => "start of input".to_string(),
            TokenClass::EndOfInput => "end of input".to_string(),
            TokenClass::LexicalError => "lexical error".to_string(),
        }
    }
}

/// Payload carried by literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Integer {
        is_signed: bool,
        width: u32,
        value: i64,
    },
    Str(String),
    None,
}

/// A single lexical token. `klass` is `Cell`-free here — the rewrite in C2
/// happens on a mutable `Token` held by the token window, not on the
/// immutable array the lexer produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub klass: TokenClass,
    pub lexeme: Name,
    pub line: u32,
    pub column: u32,
    pub payload: Payload,
}

impl Token {
    pub fn new(klass: TokenClass, lexeme: Name, line: u32, column: u32, payload: Payload) -> Self {
        Self {
            klass,
            lexeme,
            line,
            column,
            payload,
        }
    }
}
