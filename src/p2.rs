//! Scope/symbol finishing pass (P2, C4). Walks the parsed AST to install
//! declarations the parser could not install while it was still reading
//! tokens: action bodies, control/parser bodies' parameters and locals,
//! block-statement locals, enum members, and table scopes. The parser
//! (P1) already pushed and populated scopes for type-parameter lists
//! (`extern`/`package`/`parser`/`control`, recorded in `node_scopes`) since
//! those names must resolve to `TypeIdentifier` *while parsing* the body
//! that follows them — everything else is VAR-namespace bookkeeping that
//! has no bearing on how the grammar itself is parsed, so it is finished
//! here instead, in its own pass, mirroring the spec's own P1/P2 split.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::CompileError;
use crate::resolve::NodeScopeMap;
use crate::scope::{Namespace, ScopeTable};

pub fn build_scopes(
    ast: &Ast,
    scopes: &mut ScopeTable,
    node_scopes: &mut NodeScopeMap,
    program: NodeId,
    file: &str,
) -> Result<(), CompileError> {
    walk(ast, scopes, node_scopes, program, file)
}

fn declare_name(
    scopes: &mut ScopeTable,
    ns: Namespace,
    ast: &Ast,
    name_node: NodeId,
    site: NodeId,
    file: &str,
) -> Result<(), CompileError> {
    let node = ast.get(name_node);
    let NodeKind::Name { text } = &node.kind else {
        return Ok(());
    };
    scopes
        .declare(ns, text.clone(), node.line, node.column, site)
        .map_err(|e| CompileError::Redeclaration {
            file: file.to_string(),
            line: node.line,
            column: node.column,
            name: e.name.to_string(),
            previous_line: e.previous_line,
        })
}

fn walk(
    ast: &Ast,
    scopes: &mut ScopeTable,
    node_scopes: &mut NodeScopeMap,
    id: NodeId,
    file: &str,
) -> Result<(), CompileError> {
    let kind = ast.get(id).kind.clone();
    match kind {
        NodeKind::Program { declarations } => {
            for d in declarations {
                walk(ast, scopes, node_scopes, d, file)?;
            }
        }

        // Type-parameter scope already exists (P1); finish installing the
        // VAR-namespace parameters and recurse into the body using it.
        NodeKind::ParserDecl {
            params,
            locals,
            states,
            ..
        } => {
            let scope = *node_scopes
                .get(&id)
                .ok_or_else(|| internal(file, "parser declaration missing its type-parameter scope"))?;
            enter(scopes, scope);
            for p in &params {
                declare_parameter(ast, scopes, *p, file)?;
            }
            for l in &locals {
                walk(ast, scopes, node_scopes, *l, file)?;
            }
            for s in &states {
                walk(ast, scopes, node_scopes, *s, file)?;
            }
            scopes.pop();
        }
        NodeKind::ControlDecl {
            params,
            locals,
            actions,
            tables,
            apply,
            ..
        } => {
            let scope = *node_scopes
                .get(&id)
                .ok_or_else(|| internal(file, "control declaration missing its type-parameter scope"))?;
            enter(scopes, scope);
            for p in &params {
                declare_parameter(ast, scopes, *p, file)?;
            }
            for l in &locals {
                walk(ast, scopes, node_scopes, *l, file)?;
            }
            for a in &actions {
                if let NodeKind::ActionDecl { name, .. } = &ast.get(*a).kind {
                    declare_name(scopes, Namespace::Var, ast, *name, *a, file)?;
                }
                walk(ast, scopes, node_scopes, *a, file)?;
            }
            for t in &tables {
                walk(ast, scopes, node_scopes, *t, file)?;
            }
            walk(ast, scopes, node_scopes, apply, file)?;
            scopes.pop();
        }

        NodeKind::ActionDecl { params, body, .. } => {
            let scope = scopes.push();
            node_scopes.insert(id, scope);
            for p in &params {
                declare_parameter(ast, scopes, *p, file)?;
            }
            walk(ast, scopes, node_scopes, body, file)?;
            scopes.pop();
        }

        NodeKind::Block { stmts } => {
            let scope = scopes.push();
            node_scopes.insert(id, scope);
            for s in &stmts {
                walk(ast, scopes, node_scopes, *s, file)?;
            }
            scopes.pop();
        }

        NodeKind::StateDecl { body, transition, .. } => {
            let scope = scopes.push();
            node_scopes.insert(id, scope);
            for s in &body {
                walk(ast, scopes, node_scopes, *s, file)?;
            }
            if let Some(t) = transition {
                walk(ast, scopes, node_scopes, t, file)?;
            }
            scopes.pop();
        }

        NodeKind::TableDecl { properties, .. } => {
            let scope = scopes.push();
            node_scopes.insert(id, scope);
            for p in &properties {
                walk(ast, scopes, node_scopes, *p, file)?;
            }
            scopes.pop();
        }

        NodeKind::EnumDecl { members, .. } => {
            let scope = scopes.push();
            node_scopes.insert(id, scope);
            for m in &members {
                if let NodeKind::EnumMember { name, .. } = &ast.get(*m).kind {
                    declare_name(scopes, Namespace::Var, ast, *name, *m, file)?;
                }
            }
            scopes.pop();
        }

        NodeKind::ConstDecl { name, .. } => {
            declare_name(scopes, Namespace::Var, ast, name, id, file)?;
        }
        NodeKind::VarDecl { name, .. } => {
            declare_name(scopes, Namespace::Var, ast, name, id, file)?;
        }

        // Everything else has no scoping role of its own; just recurse.
        other => {
            for child in crate::ast::children(&other) {
                walk(ast, scopes, node_scopes, child, file)?;
            }
        }
    }
    Ok(())
}

fn declare_parameter(ast: &Ast, scopes: &mut ScopeTable, param: NodeId, file: &str) -> Result<(), CompileError> {
    if let NodeKind::Parameter { name, .. } = &ast.get(param).kind {
        declare_name(scopes, Namespace::Var, ast, *name, param, file)?;
    }
    Ok(())
}

/// P1 leaves its scope cursor at the root once parsing finishes; P2 walks
/// the AST in a different order than P1 built it in (it descends into
/// `locals`/`states`/etc. directly rather than interleaving with token
/// consumption), so it re-enters each scope the parser already created by
/// id rather than by re-running push/pop.
fn enter(scopes: &mut ScopeTable, target: crate::scope::ScopeId) {
    scopes.goto(target);
}

fn internal(file: &str, detail: &str) -> CompileError {
    CompileError::InternalInvariant {
        file: file.to_string(),
        detail: detail.to_string(),
    }
}
