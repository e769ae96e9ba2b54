//! The fatal-only error taxonomy (spec §7). Every fallible entry point
//! returns `Result<_, CompileError>`; there is no recovery and no
//! diagnostic batching — the first error detected is the only one
//! reported.

use thiserror::Error;

use crate::lexer::TokenClass;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("{file}:{line}:{column}: lexical error at '{lexeme}'")]
    LexicalError {
        file: String,
        line: u32,
        column: u32,
        lexeme: String,
    },

    #[error("{file}:{line}:{column}: expected {expected}, found {found}")]
    SyntaxError {
        file: String,
        line: u32,
        column: u32,
        expected: String,
        found: String,
    },

    #[error(
        "{file}:{line}:{column}: redeclaration of '{name}' (previously declared at line {previous_line})"
    )]
    Redeclaration {
        file: String,
        line: u32,
        column: u32,
        name: String,
        previous_line: u32,
    },

    #[error("{file}:{line}:{column}: unresolved name '{name}'")]
    UnresolvedName {
        file: String,
        line: u32,
        column: u32,
        name: String,
    },

    #[error("{file}: internal invariant violated: {detail}")]
    InternalInvariant { file: String, detail: String },
}

impl CompileError {
    pub fn syntax(file: &str, line: u32, column: u32, expected: impl Into<String>, found: TokenClass) -> Self {
        CompileError::SyntaxError {
            file: file.to_string(),
            line,
            column,
            expected: expected.into(),
            found: found.describe(),
        }
    }
}
