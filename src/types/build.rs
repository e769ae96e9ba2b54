//! P4: walks the fully-resolved AST once more, this time building each
//! node's `Typeset` from its children's already-built ones (spec §4.4).
//! Mirrors `resolve::Walker`'s shape — a borrowed struct holding the
//! passes it depends on, one top-down `walk` dispatching on `NodeKind` —
//! but returns a value (the node's own typeset) instead of recording uses,
//! since every rule here needs its children's types in hand before it can
//! compute its own.
//!
//! Declarations are built in the order they appear in `Program`, so a
//! forward reference to a not-yet-typed declaration (there is no such
//! scenario in the accepted inputs this was built against) resolves to an
//! empty typeset rather than a computed one — documented in DESIGN.md
//! rather than handled, since fixing it needs a declare-then-build split
//! this AST doesn't currently have a reason to carry.

use crate::ast::{Ast, BaseTypeTag, Keyset, NodeId, NodeKind, TypeRefKind};
use crate::error::CompileError;
use crate::resolve::NodeScopeMap;
use crate::scope::{ScopeId, ScopeTable};
use crate::resolve::NameRefMap;
use crate::types::{AtomicType, TypeKind, TypePool, Typeset};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Position {
    Type,
    Value,
}

struct Builder<'a> {
    ast: &'a Ast,
    scopes: &'a ScopeTable,
    node_scopes: &'a NodeScopeMap,
    name_refs: &'a NameRefMap,
    types: &'a mut TypePool,
    file: &'a str,
}

/// Runs P4 over the whole compilation unit, rooted at `program`.
pub fn build_types(
    ast: &Ast,
    scopes: &ScopeTable,
    node_scopes: &NodeScopeMap,
    name_refs: &NameRefMap,
    types: &mut TypePool,
    program: NodeId,
    file: &str,
) -> Result<(), CompileError> {
    let mut builder = Builder {
        ast,
        scopes,
        node_scopes,
        name_refs,
        types,
        file,
    };
    builder.walk(program, scopes.root())?;
    Ok(())
}

impl<'a> Builder<'a> {
    fn child_scope(&self, id: NodeId, current: ScopeId) -> ScopeId {
        self.node_scopes.get(&id).copied().unwrap_or(current)
    }

    fn void_ts(&mut self) -> Typeset {
        Typeset::singleton(self.types.builtin(AtomicType::Void))
    }

    fn tag(&mut self, id: NodeId, ts: Typeset) -> Typeset {
        self.types.set_typeset(id, ts.clone());
        ts
    }

    fn tag_empty(&mut self, id: NodeId) -> Typeset {
        self.tag(id, Typeset::default())
    }

    fn name_text(&self, name_node: NodeId) -> crate::base::Name {
        match &self.ast.get(name_node).kind {
            NodeKind::Name { text } => text.clone(),
            _ => unreachable!("declaration name fields always hold a Name node"),
        }
    }

    /// "Name use-site" rule: re-runs the lookup P3 already proved would
    /// succeed, this time collecting every matching declaration's typeset
    /// (overloads install all matches) instead of just checking presence.
    fn type_name_use(&mut self, name_node: NodeId, position: Position) -> Typeset {
        let Some(name_ref) = self.name_refs.get(name_node) else {
            return self.tag_empty(name_node);
        };
        let entry = self.scopes.lookup(name_ref.defining_scope, &name_ref.strname);
        let mut merged = Typeset::default();
        let sites = match position {
            Position::Type => entry.ns_type.iter(),
            Position::Value => entry.ns_type.iter().chain(entry.ns_var.iter()),
        };
        for decl in sites {
            if let Some(site) = decl.site {
                if let Some(ts) = self.types.typeset_of(site) {
                    merged.add_set(ts);
                }
            }
        }
        self.tag(name_node, merged)
    }

    fn atomic_for_tag(tag: BaseTypeTag) -> AtomicType {
        match tag {
            BaseTypeTag::Void => AtomicType::Void,
            BaseTypeTag::Bool => AtomicType::Bool,
            BaseTypeTag::Int => AtomicType::Int,
            BaseTypeTag::String => AtomicType::String,
            BaseTypeTag::Error => AtomicType::Error,
            BaseTypeTag::MatchKind => AtomicType::MatchKind,
        }
    }

    fn type_of_type_ref(&mut self, id: NodeId, scope: ScopeId) -> Result<Typeset, CompileError> {
        let kind = self.ast.get(id).kind.clone();
        let NodeKind::TypeRef(refkind) = kind else {
            return self.walk(id, scope);
        };
        let ts = match refkind {
            TypeRefKind::Base(tag) => Typeset::singleton(self.types.builtin(Self::atomic_for_tag(tag))),
            TypeRefKind::Bit { width } => {
                if let Some(w) = width {
                    self.walk(w, scope)?;
                }
                Typeset::singleton(self.types.builtin(AtomicType::Bit))
            }
            TypeRefKind::Varbit { width } => {
                if let Some(w) = width {
                    self.walk(w, scope)?;
                }
                Typeset::singleton(self.types.builtin(AtomicType::Varbit))
            }
            TypeRefKind::DontCare => Typeset::singleton(self.types.alloc(TypeKind::TypeVar, id)),
            TypeRefKind::Named { name, type_args } => {
                let base = self.type_name_use(name, Position::Type);
                for arg in &type_args {
                    self.type_of_type_ref(*arg, scope)?;
                }
                base
            }
            // Each element is type-checked on its own; the tuple-type node
            // itself carries no type (it only ever appears nested inside
            // another `TypeRefKind`, never as something a value is typed
            // against directly).
            TypeRefKind::Tuple { elems } => {
                for e in &elems {
                    self.type_of_type_ref(*e, scope)?;
                }
                Typeset::default()
            }
            TypeRefKind::HeaderStack { elem, size } => {
                let elem_ts = self.type_of_type_ref(elem, scope)?;
                self.walk(size, scope)?;
                let elem_ty = elem_ts.primary().unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                Typeset::singleton(self.types.alloc(TypeKind::HeaderStack { elem: elem_ty, size }, id))
            }
        };
        Ok(self.tag(id, ts))
    }

    /// Parameter/StructField/HeaderField: the declared member's type is its
    /// `ty` field's type, unwrapped (no extra indirection).
    fn member_like(&mut self, name: NodeId, ty: NodeId, owner: NodeId, scope: ScopeId) -> Result<Typeset, CompileError> {
        let ts = self.type_of_type_ref(ty, scope)?;
        self.tag(name, ts.clone());
        Ok(self.tag(owner, ts))
    }

    fn aggregate(
        &mut self,
        id: NodeId,
        name: NodeId,
        fields: &[NodeId],
        scope: ScopeId,
    ) -> Result<Typeset, CompileError> {
        let mut field_tys = Vec::with_capacity(fields.len());
        for f in fields {
            let ts = self.walk(*f, scope)?;
            if let Some(p) = ts.primary() {
                field_tys.push(p);
            }
        }
        let ts = match self.types.right_leaning_product(id, &field_tys) {
            Some(p) => Typeset::singleton(p),
            None => self.void_ts(),
        };
        self.tag(name, ts.clone());
        Ok(self.tag(id, ts))
    }

    fn function_like(
        &mut self,
        id: NodeId,
        params: &[NodeId],
        return_ty: Option<NodeId>,
        scope: ScopeId,
    ) -> Result<TypeKind, CompileError> {
        let mut param_tys = Vec::with_capacity(params.len());
        for p in params {
            let ts = self.walk(*p, scope)?;
            if let Some(t) = ts.primary() {
                param_tys.push(t);
            }
        }
        let params_ty = self
            .types
            .right_leaning_product(id, &param_tys)
            .unwrap_or_else(|| self.types.builtin(AtomicType::Void));
        let return_ty = match return_ty {
            Some(r) => self
                .type_of_type_ref(r, scope)?
                .primary()
                .unwrap_or_else(|| self.types.builtin(AtomicType::Void)),
            None => self.types.builtin(AtomicType::Void),
        };
        Ok(TypeKind::Function { params_ty, return_ty })
    }

    fn walk(&mut self, id: NodeId, scope: ScopeId) -> Result<Typeset, CompileError> {
        let kind = self.ast.get(id).kind.clone();
        match kind {
            NodeKind::Name { .. } => Ok(self.tag_empty(id)),
            NodeKind::TypeRef(_) => self.type_of_type_ref(id, scope),

            NodeKind::Program { declarations } => {
                for d in &declarations {
                    self.walk(*d, scope)?;
                }
                Ok(self.void_ts())
            }

            NodeKind::TypedefDecl { name, target, .. } => {
                let target_ts = self.type_of_type_ref(target, scope)?;
                let ty = target_ts.primary().unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeRef { target: ty }, id));
                self.tag(name, ts.clone());
                Ok(self.tag(id, ts))
            }

            NodeKind::ConstDecl { name, ty, init } => {
                let ty_ts = self.type_of_type_ref(ty, scope)?;
                self.walk(init, scope)?;
                let target = ty_ts.primary().unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeRef { target }, id));
                self.tag(name, ts.clone());
                Ok(self.tag(id, ts))
            }
            NodeKind::VarDecl { name, ty, init } => {
                let ty_ts = self.type_of_type_ref(ty, scope)?;
                if let Some(init) = init {
                    self.walk(init, scope)?;
                }
                let target = ty_ts.primary().unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeRef { target }, id));
                self.tag(name, ts.clone());
                Ok(self.tag(id, ts))
            }

            NodeKind::StructField { name, ty } | NodeKind::HeaderField { name, ty } => {
                self.member_like(name, ty, id, scope)
            }
            NodeKind::StructDecl { name, fields } | NodeKind::HeaderDecl { name, fields } | NodeKind::HeaderUnionDecl { name, fields } => {
                self.aggregate(id, name, &fields, scope)
            }

            NodeKind::EnumDecl { name, members } => {
                let strname = self.name_text(name);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeName { strname }, id));
                self.tag(name, ts.clone());
                let inner = self.child_scope(id, scope);
                for m in &members {
                    self.walk(*m, inner)?;
                }
                Ok(self.tag(id, ts))
            }
            NodeKind::EnumMember { name, value } => {
                if let Some(v) = value {
                    self.walk(v, scope)?;
                }
                self.tag_empty(name);
                Ok(self.tag_empty(id))
            }

            NodeKind::TypeParam { name } => {
                let strname = self.name_text(name);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeParam { strname }, id));
                self.tag(name, ts.clone());
                Ok(self.tag(id, ts))
            }
            NodeKind::Parameter { name, ty, .. } => self.member_like(name, ty, id, scope),

            NodeKind::FunctionProto {
                name,
                type_params,
                params,
                return_ty,
            } => {
                for tp in &type_params {
                    self.walk(*tp, scope)?;
                }
                let kind = self.function_like(id, &params, return_ty, scope)?;
                let ts = Typeset::singleton(self.types.alloc(kind, id));
                self.tag(name, ts.clone());
                Ok(self.tag(id, ts))
            }

            NodeKind::ExternDecl {
                name,
                type_params,
                methods,
            } => {
                let strname = self.name_text(name);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeName { strname }, id));
                self.tag(name, ts.clone());
                let inner = self.child_scope(id, scope);
                for tp in &type_params {
                    self.walk(*tp, inner)?;
                }
                for m in &methods {
                    self.walk(*m, inner)?;
                }
                Ok(self.tag(id, ts))
            }
            NodeKind::PackageDecl {
                name,
                type_params,
                params,
            } => {
                let strname = self.name_text(name);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeName { strname }, id));
                self.tag(name, ts.clone());
                let inner = self.child_scope(id, scope);
                for tp in &type_params {
                    self.walk(*tp, inner)?;
                }
                for p in &params {
                    self.walk(*p, inner)?;
                }
                Ok(self.tag(id, ts))
            }

            NodeKind::ParserDecl {
                name,
                type_params,
                params,
                locals,
                states,
            } => {
                let inner = self.child_scope(id, scope);
                for tp in &type_params {
                    self.walk(*tp, inner)?;
                }
                let kind = self.function_like(id, &params, None, inner)?;
                let func = self.types.alloc(kind, id);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeRef { target: func }, id));
                self.tag(name, ts.clone());
                for l in &locals {
                    self.walk(*l, inner)?;
                }
                for s in &states {
                    self.walk(*s, inner)?;
                }
                Ok(self.tag(id, ts))
            }
            NodeKind::ControlDecl {
                name,
                type_params,
                params,
                locals,
                actions,
                tables,
                apply,
            } => {
                let inner = self.child_scope(id, scope);
                for tp in &type_params {
                    self.walk(*tp, inner)?;
                }
                let kind = self.function_like(id, &params, None, inner)?;
                let func = self.types.alloc(kind, id);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeRef { target: func }, id));
                self.tag(name, ts.clone());
                for l in &locals {
                    self.walk(*l, inner)?;
                }
                for a in &actions {
                    self.walk(*a, inner)?;
                }
                for t in &tables {
                    self.walk(*t, inner)?;
                }
                self.walk(apply, inner)?;
                Ok(self.tag(id, ts))
            }
            NodeKind::ActionDecl { name, params, body } => {
                let inner = self.child_scope(id, scope);
                let kind = self.function_like(id, &params, None, inner)?;
                let ts = Typeset::singleton(self.types.alloc(kind, id));
                self.tag(name, ts.clone());
                self.walk(body, inner)?;
                Ok(self.tag(id, ts))
            }

            NodeKind::StateDecl { name, body, transition } => {
                self.tag_empty(name);
                let inner = self.child_scope(id, scope);
                for s in &body {
                    self.walk(*s, inner)?;
                }
                if let Some(t) = transition {
                    self.walk(t, inner)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TransitionDirect { target } => {
                self.type_name_use(target, Position::Value);
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TransitionSelect { exprs, cases } => {
                for e in &exprs {
                    self.walk(*e, scope)?;
                }
                for c in &cases {
                    self.walk(*c, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::SelectCase { keyset, target } => {
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
                self.type_name_use(target, Position::Value);
                Ok(self.void_ts_tagged(id))
            }

            NodeKind::TableDecl { name, properties } => {
                self.tag_empty(name);
                let inner = self.child_scope(id, scope);
                for p in &properties {
                    self.walk(*p, inner)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::KeyElement { expr, match_kind } => {
                self.walk(expr, scope)?;
                self.tag_empty(match_kind);
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TableKeyProperty { keys } => {
                for k in &keys {
                    self.walk(*k, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::ActionRef { name, args } => {
                self.type_name_use(name, Position::Value);
                for a in &args {
                    self.walk(*a, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TableActionsProperty { actions } => {
                for a in &actions {
                    self.walk(*a, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TableSimpleProperty { name, value } => {
                self.tag_empty(name);
                self.walk(value, scope)?;
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::TableEntriesProperty { entries } => {
                for e in &entries {
                    self.walk(*e, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }

            NodeKind::Block { stmts } => {
                let inner = self.child_scope(id, scope);
                for s in &stmts {
                    self.walk(*s, inner)?;
                }
                Ok(self.void_ts_tagged(id))
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
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::SwitchStmt { expr, cases } => {
                self.walk(expr, scope)?;
                for c in &cases {
                    self.walk(*c, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::SwitchCase { label, body } => {
                if let Some(l) = label {
                    self.tag_empty(l);
                }
                if let Some(b) = body {
                    self.walk(b, scope)?;
                }
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::AssignStmt { lhs, rhs } => {
                let lhs_ts = self.walk(lhs, scope)?;
                let rhs_ts = self.walk(rhs, scope)?;
                let ts = self.call_shaped(id, &[lhs_ts, rhs_ts]);
                Ok(self.tag(id, ts))
            }
            NodeKind::MethodCallStmt { call } => {
                self.walk(call, scope)?;
                Ok(self.void_ts_tagged(id))
            }
            NodeKind::ReturnStmt { value } => {
                let ts = match value {
                    Some(v) => self.walk(v, scope)?,
                    None => self.void_ts(),
                };
                Ok(self.tag(id, ts))
            }
            NodeKind::ExitStmt | NodeKind::EmptyStmt => Ok(self.void_ts_tagged(id)),

            NodeKind::NameExpr { name, .. } => {
                let ts = self.type_name_use(name, Position::Value);
                Ok(self.tag(id, ts))
            }
            NodeKind::IntLiteralExpr { .. } => Ok(self.tag(id, Typeset::singleton(self.types.builtin(AtomicType::Int)))),
            NodeKind::BoolLiteralExpr { .. } => Ok(self.tag(id, Typeset::singleton(self.types.builtin(AtomicType::Bool)))),
            NodeKind::StringLiteralExpr { .. } => Ok(self.tag(id, Typeset::singleton(self.types.builtin(AtomicType::String)))),
            NodeKind::ErrorPrimaryExpr => Ok(self.tag(id, Typeset::singleton(self.types.builtin(AtomicType::Error)))),
            NodeKind::ParenExpr { inner } => {
                let ts = self.walk(inner, scope)?;
                Ok(self.tag(id, ts))
            }
            NodeKind::CastExpr { ty, expr } => {
                let ts = self.type_of_type_ref(ty, scope)?;
                self.walk(expr, scope)?;
                Ok(self.tag(id, ts))
            }
            NodeKind::UnaryExpr { expr, .. } => {
                let operand_ts = self.walk(expr, scope)?;
                let ts = self.call_shaped(id, std::slice::from_ref(&operand_ts));
                Ok(self.tag(id, ts))
            }
            NodeKind::BinaryExpr { lhs, rhs, .. } => {
                let lhs_ts = self.walk(lhs, scope)?;
                let rhs_ts = self.walk(rhs, scope)?;
                let ts = self.call_shaped(id, &[lhs_ts, rhs_ts]);
                Ok(self.tag(id, ts))
            }
            NodeKind::MemberExpr { base, member } => {
                self.walk(base, scope)?;
                self.tag_empty(member);
                let ts = Typeset::singleton(self.types.alloc(TypeKind::TypeVar, id));
                Ok(self.tag(id, ts))
            }
            NodeKind::IndexExpr { base, index } => {
                let base_ts = self.walk(base, scope)?;
                self.walk(index, scope)?;
                Ok(self.tag(id, base_ts))
            }
            NodeKind::CallExpr { callee, args } => {
                self.walk(callee, scope)?;
                let mut arg_tys = Vec::with_capacity(args.len());
                for a in &args {
                    let ts = self.walk(*a, scope)?;
                    if let Some(p) = ts.primary() {
                        arg_tys.push(p);
                    }
                }
                let args_ty = self
                    .types
                    .right_leaning_product(id, &arg_tys)
                    .unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                let ts = Typeset::singleton(self.types.alloc(TypeKind::FunctionCall { args_ty }, id));
                Ok(self.tag(id, ts))
            }
            NodeKind::InstantiationExpr { ty, args } => {
                self.type_of_type_ref(ty, scope)?;
                let mut arg_tys = Vec::with_capacity(args.len());
                for a in &args {
                    let ts = self.walk(*a, scope)?;
                    if let Some(p) = ts.primary() {
                        arg_tys.push(p);
                    }
                }
                let args_ty = self
                    .types
                    .right_leaning_product(id, &arg_tys)
                    .unwrap_or_else(|| self.types.builtin(AtomicType::Void));
                let ts = Typeset::singleton(self.types.alloc(TypeKind::FunctionCall { args_ty }, id));
                Ok(self.tag(id, ts))
            }
        }
    }

    fn void_ts_tagged(&mut self, id: NodeId) -> Typeset {
        let ts = self.void_ts();
        self.tag(id, ts)
    }

    /// The shape shared by binary expressions and assignment statements:
    /// a right-leaning Product of the operand types wrapped in a
    /// `FunctionCall` — treats the operator as a call of that arity.
    fn call_shaped(&mut self, origin: NodeId, operand_tys: &[Typeset]) -> Typeset {
        let tys: Vec<_> = operand_tys.iter().filter_map(|t| t.primary()).collect();
        let args_ty = self
            .types
            .right_leaning_product(origin, &tys)
            .unwrap_or_else(|| self.types.builtin(AtomicType::Void));
        Typeset::singleton(self.types.alloc(TypeKind::FunctionCall { args_ty }, origin))
    }
}
