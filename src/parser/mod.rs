//! Recursive-descent parser (P1, C2 + C3 + C4 + C5). Grounded on the
//! teacher's `parser/parser.rs`: a `Parser` struct holding the token
//! array, a cursor, and an error sink, with `current()`/`at()`/`bump()`/
//! `expect()` helpers driving hand-written grammar routines split by
//! concern (see `grammar.rs`) rather than a generated table.
//!
//! The one load-bearing difference from a conventional recursive-descent
//! parser: every `bump()` applies the C2 token-class rewrite — an
//! `Identifier` becomes `Keyword(_)` or `TypeIdentifier` depending on
//! what the active scope says about that lexeme, right before the
//! grammar routines inspect its class.

mod grammar;

use crate::ast::{Ast, NodeId};
use crate::context::CompileOptions;
use crate::error::CompileError;
use crate::lexer::{Payload, Token, TokenClass};
use crate::resolve::NodeScopeMap;
use crate::scope::{Namespace, ScopeTable};

pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: &'a str,
    options: &'a CompileOptions,
    pub(crate) ast: Ast,
    pub(crate) scopes: ScopeTable,
    pub(crate) node_scopes: NodeScopeMap,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, file: &'a str, options: &'a CompileOptions, ast: Ast, scopes: ScopeTable) -> Self {
        let mut parser = Self {
            tokens,
            pos: 0,
            file,
            options,
            ast,
            scopes,
            node_scopes: NodeScopeMap::new(),
        };
        parser.rewrite_current();
        parser
    }

    pub fn finish(self) -> (Ast, ScopeTable, NodeScopeMap) {
        (self.ast, self.scopes, self.node_scopes)
    }

    // ---- token window -------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn current_class(&self) -> TokenClass {
        self.current().klass
    }

    fn at_eof(&self) -> bool {
        matches!(self.current_class(), TokenClass::EndOfInput)
    }

    /// Applies the C2 rewrite to the token under the cursor: an
    /// `Identifier` whose lexeme has a KEYWORD declaration in the active
    /// scope becomes that keyword's class; failing that, a TYPE
    /// declaration makes it `TypeIdentifier`. Comments are skipped here so
    /// every other routine can assume the cursor never rests on trivia.
    fn rewrite_current(&mut self) {
        while self.tokens[self.pos].klass.is_trivia() {
            self.pos += 1;
        }
        self.tokens[self.pos].klass = self.effective_class(self.pos);
    }

    /// What `tok.klass` would become after the C2 rewrite, without
    /// mutating the token array. Shared by `rewrite_current` (applied to
    /// the token under the cursor) and `peek_class` (applied read-only to
    /// a token further ahead, so lookahead decisions see the same class
    /// the grammar would see once the cursor actually reaches it).
    fn effective_class(&self, idx: usize) -> TokenClass {
        let tok = &self.tokens[idx];
        if tok.klass != TokenClass::Identifier {
            return tok.klass;
        }
        let entry = self.scopes.lookup_current(&tok.lexeme);
        if let Some(decl) = entry.ns_keyword.first() {
            TokenClass::Keyword(decl.keyword.expect("KEYWORD-namespace NameDecl always carries a Keyword"))
        } else if entry.is_populated(Namespace::Type) {
            TokenClass::TypeIdentifier
        } else {
            tok.klass
        }
    }

    /// The effective class of the token `ahead` non-trivia positions past
    /// the cursor (`ahead == 1` is the token right after `current()`).
    /// `None` past the end of the stream.
    fn peek_class(&self, ahead: usize) -> Option<TokenClass> {
        let mut idx = self.pos + 1;
        let mut remaining = ahead;
        loop {
            let tok = self.tokens.get(idx)?;
            if tok.klass.is_trivia() {
                idx += 1;
                continue;
            }
            if remaining > 1 {
                remaining -= 1;
                idx += 1;
                continue;
            }
            return Some(self.effective_class(idx));
        }
    }

    /// Advances past the current token, applying the C2 rewrite to the
    /// new one, and returns the token just consumed.
    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if !self.at_eof() {
            self.pos += 1;
            self.rewrite_current();
        }
        tok
    }

    fn at(&self, class: TokenClass) -> bool {
        self.current_class() == class
    }

    fn eat(&mut self, class: TokenClass) -> bool {
        if self.at(class) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, class: TokenClass) -> Result<Token, CompileError> {
        if self.at(class) {
            Ok(self.bump())
        } else if self.current_class() == TokenClass::LexicalError {
            Err(self.lexical_error())
        } else {
            Err(self.syntax_error(class))
        }
    }

    fn syntax_error(&self, expected: TokenClass) -> CompileError {
        let tok = self.current();
        CompileError::syntax(self.file, tok.line, tok.column, expected.describe(), tok.klass)
    }

    /// Raised when the cursor rests on a token the lexer itself could not
    /// classify, instead of letting a grammar fallback report a confusing
    /// "expected X, found lexical error".
    fn lexical_error(&self) -> CompileError {
        let tok = self.current();
        CompileError::LexicalError {
            file: self.file.to_string(),
            line: tok.line,
            column: tok.column,
            lexeme: tok.lexeme.to_string(),
        }
    }

    fn int_payload(tok: &Token) -> (bool, u32, i64) {
        match &tok.payload {
            Payload::Integer { is_signed, width, value } => (*is_signed, *width, *value),
            _ => (true, 32, 0),
        }
    }

    fn push_name(&mut self, tok: &Token) -> NodeId {
        self.ast
            .push(crate::ast::NodeKind::Name { text: tok.lexeme.clone() }, tok.line, tok.column)
    }

    pub(crate) fn allow_entries(&self) -> bool {
        self.options.allow_entries
    }
}
