//! Top-level driver (C1-C7 wired together): owns every pass's output for
//! one compilation unit and exposes the single `compile` entry point.
//! Grounded on the teacher's `driver.rs`, which does the equivalent
//! lex-parse-resolve pipeline wiring for KerML/SysML sources, down to
//! building a fresh symbol table per run rather than reusing one across
//! files.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::base::Interner;
use crate::error::CompileError;
use crate::lexer;
use crate::p2;
use crate::parser::Parser;
use crate::resolve::{self, NameRefMap, NodeScopeMap};
use crate::scope::{Namespace, ScopeTable};
use crate::types::{AtomicType, TypePool};

/// Knobs that change which constructs the parser accepts, independent of
/// the language's own grammar. Mirrors the teacher's `CompileOptions`
/// (feature gates threaded down into the parser rather than checked only
/// after the fact).
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub file: String,
    /// Gates table `entries` properties (an Open Question in the design:
    /// the grammar always recognizes and consumes the property so a
    /// closed gate never turns into a syntax error; closed by default
    /// since `const entries` is the less common table form).
    pub allow_entries: bool,
}

impl CompileOptions {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            allow_entries: false,
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self::new("<input>")
    }
}

/// Every pass's output for one compilation unit, plus the interner all of
/// them shared while producing it.
pub struct CompilationContext {
    pub ast: Ast,
    pub scopes: ScopeTable,
    pub node_scopes: NodeScopeMap,
    pub interner: Interner,
    pub types: TypePool,
    pub name_refs: NameRefMap,
    pub program: NodeId,
}

const ATOMIC_BUILTINS: &[(&str, AtomicType)] = &[
    ("void", AtomicType::Void),
    ("bool", AtomicType::Bool),
    ("int", AtomicType::Int),
    ("bit", AtomicType::Bit),
    ("varbit", AtomicType::Varbit),
    ("string", AtomicType::String),
    ("error", AtomicType::Error),
    ("match_kind", AtomicType::MatchKind),
];

/// The two reserved parser states, pre-declared VAR names per spec §4.2 —
/// `error` doubles as a VAR name too (the bare `error` primary expression
/// resolves against it via the base-type builtin's own synthetic site).
const VAR_BUILTINS: &[&str] = &["accept", "reject", "error"];

/// Populates the root scope's TYPE/VAR namespaces and seeds the type pool,
/// each builtin tied to its own synthetic AST node (spec §4.2/§4.4 —
/// builtins need a real declaring node so the type pool can key off it the
/// same way a user declaration would).
fn seed_root(ast: &mut Ast, scopes: &mut ScopeTable, types: &mut TypePool, interner: &mut Interner) {
    for (text, atomic) in ATOMIC_BUILTINS {
        let site = ast.push(NodeKind::Name { text: interner.intern(text) }, 0, 0);
        scopes.declare_builtin(Namespace::Type, text, site);
        types.seed_builtin(*atomic, site);
    }
    for text in VAR_BUILTINS {
        let site = ast.push(NodeKind::Name { text: interner.intern(text) }, 0, 0);
        scopes.declare_builtin(Namespace::Var, text, site);
    }
}

/// Runs the full pipeline — lex, parse (P1), finish scopes (P2), resolve
/// names (P3), build types (P4) — over `source`.
pub fn compile(source: &str, options: CompileOptions) -> Result<CompilationContext, CompileError> {
    let mut ast = Ast::new();
    let mut scopes = ScopeTable::with_keywords_populated();
    let mut types = TypePool::new();
    let mut interner = Interner::new();
    seed_root(&mut ast, &mut scopes, &mut types, &mut interner);

    let tokens = lexer::lex(source, &mut interner);

    let mut parser = Parser::new(tokens, &options.file, &options, ast, scopes);
    let program = parser.parse_program()?;
    let (mut ast, mut scopes, mut node_scopes) = parser.finish();

    p2::build_scopes(&ast, &mut scopes, &mut node_scopes, program, &options.file)?;
    let name_refs = resolve::resolve_unit(&ast, &scopes, &node_scopes, program, &options.file)?;
    crate::types::build::build_types(&ast, &scopes, &node_scopes, &name_refs, &mut types, program, &options.file)?;

    Ok(CompilationContext {
        ast,
        scopes,
        node_scopes,
        interner,
        types,
        name_refs,
        program,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_declares_every_builtin_type_and_var() {
        let mut ast = Ast::new();
        let mut scopes = ScopeTable::with_keywords_populated();
        let mut types = TypePool::new();
        let mut interner = Interner::new();
        seed_root(&mut ast, &mut scopes, &mut types, &mut interner);

        assert!(scopes.lookup_current("int").is_populated(Namespace::Type));
        assert!(scopes.lookup_current("match_kind").is_populated(Namespace::Type));
        assert!(scopes.lookup_current("accept").is_populated(Namespace::Var));
        assert!(scopes.lookup_current("reject").is_populated(Namespace::Var));
        assert_eq!(types.node_count(), ATOMIC_BUILTINS.len());
    }

    #[test]
    fn compiles_a_minimal_unit() {
        let options = CompileOptions::new("<test>");
        let ctx = compile("typedef bit<32> PortId_t;\n", options).expect("compiles");
        assert!(ctx.ast.iter().count() > 0);
    }
}
