//! Name resolution (P3, C6): a single top-down walk that records, for
//! every AST name use-site, the `(name, scope)` pair it resolves against,
//! then checks that the name reaches a TYPE or VAR declaration somewhere
//! up the scope chain. Grounded on the teacher's
//! `semantic/resolver/name_resolver.rs` — a `Resolver` holding a borrowed
//! symbol table and walking the scope chain outward — generalized from its
//! KerML/SysML-specific dispatch to this AST's node kinds.

use std::collections::HashMap;

use crate::ast::{Ast, Node, NodeId, NodeKind, TypeRefKind};
use crate::base::Name;
use crate::error::CompileError;
use crate::scope::{Namespace, ScopeId, ScopeTable};

/// One resolved use-site: the name text, the line it appeared on, and the
/// scope the walk was in when it saw the name (spec §3).
#[derive(Debug, Clone)]
pub struct NameRef {
    pub strname: Name,
    pub line: u32,
    pub defining_scope: ScopeId,
}

#[derive(Debug, Default)]
pub struct NameRefMap {
    refs: HashMap<NodeId, NameRef>,
}

impl NameRefMap {
    pub fn get(&self, node: NodeId) -> Option<&NameRef> {
        self.refs.get(&node)
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

/// Maps an AST node that introduces a scope (parser/control/action/state/
/// block/table/enum declarations) to the `ScopeId` P1/P2 pushed for it.
/// Without this, P3's walk would have no way to know which child scope to
/// descend into at each scope boundary, since the AST itself stores no
/// parent pointer or scope reference (Design Notes: no upward pointers).
pub type NodeScopeMap = HashMap<NodeId, ScopeId>;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Type,
    Expr,
}

struct Walker<'a> {
    ast: &'a Ast,
    scopes: &'a ScopeTable,
    node_scopes: &'a NodeScopeMap,
    file: &'a str,
    out: NameRefMap,
}

/// Runs P3 over the whole compilation unit, rooted at `program`.
pub fn resolve_unit(
    ast: &Ast,
    scopes: &ScopeTable,
    node_scopes: &NodeScopeMap,
    program: NodeId,
    file: &str,
) -> Result<NameRefMap, CompileError> {
    let mut walker = Walker {
        ast,
        scopes,
        node_scopes,
        file,
        out: NameRefMap::default(),
    };
    walker.walk(program, scopes.root())?;
    Ok(walker.out)
}

impl<'a> Walker<'a> {
    fn node(&self, id: NodeId) -> &'a Node {
        self.ast.get(id)
    }

    /// The scope to use for `id`'s children: the scope P1/P2 pushed for it,
    /// if any, else the scope the walk is already carrying.
    fn child_scope(&self, id: NodeId, current: ScopeId) -> ScopeId {
        self.node_scopes.get(&id).copied().unwrap_or(current)
    }

    fn record_use(&mut self, name_node: NodeId, scope: ScopeId, position: Position) -> Result<(), CompileError> {
        let Node { kind, line, .. } = self.node(name_node);
        let NodeKind::Name { text } = kind else {
            return Ok(());
        };
        let entry = self.scopes.lookup(scope, text);
        let found = match position {
            Position::Type => entry.is_populated(Namespace::Type),
            Position::Expr => entry.is_populated(Namespace::Var) || entry.is_populated(Namespace::Type),
        };
        if !found {
            return Err(CompileError::UnresolvedName {
                file: self.file.to_string(),
                line: *line,
                column: self.node(name_node).column,
                name: text.to_string(),
            });
        }
        self.out.refs.insert(
            name_node,
            NameRef {
                strname: text.clone(),
                line: *line,
                defining_scope: scope,
            },
        );
        Ok(())
    }

    fn walk_type_ref(&mut self, id: NodeId, scope: ScopeId) -> Result<(), CompileError> {
        let kind = self.node(id).kind.clone();
        match kind {
            NodeKind::TypeRef(TypeRefKind::Named { name, type_args }) => {
                self.record_use(name, scope, Position::Type)?;
                for arg in type_args {
                    self.walk_type_ref(arg, scope)?;
                }
                Ok(())
            }
            NodeKind::TypeRef(TypeRefKind::Bit { width } | TypeRefKind::Varbit { width }) => {
                if let Some(w) = width {
                    self.walk(w, scope)?;
                }
                Ok(())
            }
            NodeKind::TypeRef(TypeRefKind::Tuple { elems }) => {
                for e in elems {
                    self.walk_type_ref(e, scope)?;
                }
                Ok(())
            }
            NodeKind::TypeRef(TypeRefKind::HeaderStack { elem, size }) => {
                self.walk_type_ref(elem, scope)?;
                self.walk(size, scope)
            }
            NodeKind::TypeRef(TypeRefKind::Base(_) | TypeRefKind::DontCare) => Ok(()),
            _ => Ok(()),
        }
    }

    /// Top-down walk. `scope` is the scope active for `id`'s own position;
    /// children that introduce their own scope switch into it via
    /// `child_scope`, then the walk restores `scope` when returning.
    fn walk(&mut self, id: NodeId, scope: ScopeId) -> Result<(), CompileError> {
        let kind = self.node(id).kind.clone();
        match kind {
            NodeKind::Name { .. } => self.record_use(id, scope, Position::Expr),
            NodeKind::TypeRef(_) => self.walk_type_ref(id, scope),

            NodeKind::Program { declarations } => {
                for d in declarations {
                    self.walk(d, scope)?;
                }
                Ok(())
            }

            NodeKind::TypedefDecl { target, .. } => self.walk_type_ref(target, scope),
            NodeKind::ConstDecl { ty, init, .. } => {
                self.walk_type_ref(ty, scope)?;
                self.walk(init, scope)
            }
            NodeKind::VarDecl { ty, init, .. } => {
                self.walk_type_ref(ty, scope)?;
                if let Some(init) = init {
                    self.walk(init, scope)?;
                }
                Ok(())
            }
            NodeKind::StructField { ty, .. } | NodeKind::HeaderField { ty, .. } => self.walk_type_ref(ty, scope),
            NodeKind::StructDecl { fields, .. }
            | NodeKind::HeaderDecl { fields, .. }
            | NodeKind::HeaderUnionDecl { fields, .. } => {
                for f in fields {
                    self.walk(f, scope)?;
                }
                Ok(())
            }
            NodeKind::EnumDecl { members, .. } => {
                let inner = self.child_scope(id, scope);
                for m in members {
                    self.walk(m, inner)?;
                }
                Ok(())
            }
            NodeKind::EnumMember { value, .. } => {
                if let Some(v) = value {
                    self.walk(v, scope)?;
                }
                Ok(())
            }
            NodeKind::Parameter { ty, .. } => self.walk_type_ref(ty, scope),
            NodeKind::FunctionProto { params, return_ty, .. } => {
                for p in params {
                    self.walk(p, scope)?;
                }
                if let Some(r) = return_ty {
                    self.walk_type_ref(r, scope)?;
                }
                Ok(())
            }
            NodeKind::ExternDecl { methods, .. } => {
                let inner = self.child_scope(id, scope);
                for m in methods {
                    self.walk(m, inner)?;
                }
                Ok(())
            }
            NodeKind::PackageDecl { params, .. } => {
                let inner = self.child_scope(id, scope);
                for p in params {
                    self.walk(p, inner)?;
                }
                Ok(())
            }
            NodeKind::ParserDecl {
                params,
                locals,
                states,
                ..
            } => {
                let inner = self.child_scope(id, scope);
                for p in params {
                    self.walk(p, inner)?;
                }
                for l in locals {
                    self.walk(l, inner)?;
                }
                for s in states {
                    self.walk(s, inner)?;
                }
                Ok(())
            }
            NodeKind::ControlDecl {
                params,
                locals,
                actions,
                tables,
                apply,
                ..
            } => {
                let inner = self.child_scope(id, scope);
                for p in params {
                    self.walk(p, inner)?;
                }
                for l in locals {
                    self.walk(l, inner)?;
                }
                for a in actions {
                    self.walk(a, inner)?;
                }
                for t in tables {
                    self.walk(t, inner)?;
                }
                self.walk(apply, inner)
            }
            NodeKind::ActionDecl { params, body, .. } => {
                let inner = self.child_scope(id, scope);
                for p in params {
                    self.walk(p, inner)?;
                }
                self.walk(body, inner)
            }

            NodeKind::StateDecl { body, transition, .. } => {
                let inner = self.child_scope(id, scope);
                for s in body {
                    self.walk(s, inner)?;
                }
                if let Some(t) = transition {
                    self.walk(t, inner)?;
                }
                Ok(())
            }
            NodeKind::TransitionDirect { target } => self.record_use(target, scope, Position::Expr),
            NodeKind::TransitionSelect { exprs, cases } => {
                for e in exprs {
                    self.walk(e, scope)?;
                }
                for c in cases {
                    self.walk(c, scope)?;
                }
                Ok(())
            }
            NodeKind::SelectCase { keyset, target } => {
                use crate::ast::Keyset;
                match keyset {
                    Keyset::Expr(e) => {
                        self.walk(e, scope)?;
                    }
                    Keyset::Tuple(elems) => {
                        for e in elems {
                            self.walk(e, scope)?;
                        }
                    }
                    Keyset::Default | Keyset::DontCare => {}
                }
                self.record_use(target, scope, Position::Expr)
            }

            NodeKind::TableDecl { properties, .. } => {
                for p in properties {
                    self.walk(p, scope)?;
                }
                Ok(())
            }
            // `match_kind` values (`exact`, `ternary`, `lpm`, ...) are an
            // open, library-extensible set in the source language rather
            // than a fixed enum (spec's `match_kind` is a base type, not a
            // set of declared members) — left unresolved like a member
            // name, not looked up as a use-site.
            NodeKind::KeyElement { expr, .. } => self.walk(expr, scope),
            NodeKind::TableKeyProperty { keys } => {
                for k in keys {
                    self.walk(k, scope)?;
                }
                Ok(())
            }
            NodeKind::ActionRef { name, args } => {
                self.record_use(name, scope, Position::Expr)?;
                for a in args {
                    self.walk(a, scope)?;
                }
                Ok(())
            }
            NodeKind::TableActionsProperty { actions } => {
                for a in actions {
                    self.walk(a, scope)?;
                }
                Ok(())
            }
            NodeKind::TableSimpleProperty { value, .. } => self.walk(value, scope),
            NodeKind::TableEntriesProperty { entries } => {
                for e in entries {
                    self.walk(e, scope)?;
                }
                Ok(())
            }

            NodeKind::Block { stmts } => {
                let inner = self.child_scope(id, scope);
                for s in stmts {
                    self.walk(s, inner)?;
                }
                Ok(())
            }
            NodeKind::IfStmt {
                cond,
                then_branch,
                else_branch,
            } => {
                self.walk(cond, scope)?;
                self.walk(then_branch, scope)?;
                if let Some(e) = else_branch {
                    self.walk(e, scope)?;
                }
                Ok(())
            }
            NodeKind::SwitchStmt { expr, cases } => {
                self.walk(expr, scope)?;
                for c in cases {
                    self.walk(c, scope)?;
                }
                Ok(())
            }
            NodeKind::SwitchCase { body, .. } => {
                if let Some(b) = body {
                    self.walk(b, scope)?;
                }
                Ok(())
            }
            NodeKind::AssignStmt { lhs, rhs } => {
                self.walk(lhs, scope)?;
                self.walk(rhs, scope)
            }
            NodeKind::MethodCallStmt { call } => self.walk(call, scope),
            NodeKind::ReturnStmt { value } => {
                if let Some(v) = value {
                    self.walk(v, scope)?;
                }
                Ok(())
            }
            NodeKind::ExitStmt | NodeKind::EmptyStmt => Ok(()),

            NodeKind::NameExpr { name, .. } => self.record_use(name, scope, Position::Expr),
            NodeKind::IntLiteralExpr { .. }
            | NodeKind::BoolLiteralExpr { .. }
            | NodeKind::StringLiteralExpr { .. }
            | NodeKind::ErrorPrimaryExpr => Ok(()),
            NodeKind::ParenExpr { inner } => self.walk(inner, scope),
            NodeKind::CastExpr { ty, expr } => {
                self.walk_type_ref(ty, scope)?;
                self.walk(expr, scope)
            }
            NodeKind::UnaryExpr { expr, .. } => self.walk(expr, scope),
            NodeKind::BinaryExpr { lhs, rhs, .. } => {
                self.walk(lhs, scope)?;
                self.walk(rhs, scope)
            }
            // Member-select resolves only the left-hand side; the member
            // component is left to a later semantic pass (spec §4.3).
            NodeKind::MemberExpr { base, .. } => self.walk(base, scope),
            NodeKind::IndexExpr { base, index } => {
                self.walk(base, scope)?;
                self.walk(index, scope)
            }
            NodeKind::CallExpr { callee, args } => {
                self.walk(callee, scope)?;
                for a in args {
                    self.walk(a, scope)?;
                }
                Ok(())
            }
            NodeKind::InstantiationExpr { ty, args } => {
                self.walk_type_ref(ty, scope)?;
                for a in args {
                    self.walk(a, scope)?;
                }
                Ok(())
            }

            NodeKind::TypeParam { .. } => Ok(()),
        }
    }
}
