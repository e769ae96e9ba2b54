//! Type construction (P4, C7): a pool of `Type` values plus a per-AST-node
//! typeset map. Grounded more loosely than the other passes — the teacher's
//! own `semantic/types/mod.rs` only carries diagnostic/IDE token types, not
//! a real type system — so this module instead generalizes the teacher's
//! arena-plus-tagged-variant style (`Symbol` in `symbol_table/symbol.rs`)
//! to a recursive `Type` graph addressed by index rather than by pointer.

pub mod build;

use std::collections::HashMap;

use crate::ast::NodeId;
use crate::base::{Arena, Idx, Name};

pub type TypeId = Idx<TypeData>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtomicType {
    Void,
    Bool,
    Int,
    Bit,
    Varbit,
    String,
    Error,
    MatchKind,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Atomic(AtomicType),
    /// An unresolved generic parameter.
    TypeParam { strname: Name },
    /// A declared aggregate (package/extern/enum/header/struct/union)
    /// referenced by name.
    TypeName { strname: Name },
    /// A one-level indirection so distinct nodes can share an underlying
    /// type without alias confusion.
    TypeRef { target: TypeId },
    /// Right-leaning 2-tuple; N-ary products chain through `rhs`.
    Product { lhs: TypeId, rhs: TypeId },
    Function { params_ty: TypeId, return_ty: TypeId },
    FunctionCall { args_ty: TypeId },
    HeaderStack { elem: TypeId, size: NodeId },
    /// A fresh placeholder produced by member selection; resolved by a
    /// later semantic pass, not here.
    TypeVar,
}

#[derive(Debug, Clone)]
pub struct TypeData {
    pub kind: TypeKind,
    /// The AST node that gave rise to this type, for later diagnostics.
    pub origin: NodeId,
}

/// A Type plus the list of member Types sharing one AST-node key —
/// multiple declarations (overloads) with the same name populate more than
/// one member; singleton typesets are the common case. Insertion order is
/// preserved (Design Notes: deterministic test output).
#[derive(Debug, Clone, Default)]
pub struct Typeset {
    members: Vec<TypeId>,
}

impl Typeset {
    pub fn singleton(ty: TypeId) -> Self {
        Self { members: vec![ty] }
    }

    pub fn add_type(&mut self, ty: TypeId) {
        self.members.push(ty);
    }

    pub fn add_set(&mut self, other: &Typeset) {
        self.members.extend(other.members.iter().copied());
    }

    pub fn primary(&self) -> Option<TypeId> {
        self.members.first().copied()
    }

    pub fn members(&self) -> &[TypeId] {
        &self.members
    }
}

/// The type pool: owns every `TypeData` and the id-keyed typeset map.
pub struct TypePool {
    arena: Arena<TypeData>,
    by_node: HashMap<NodeId, Typeset>,
    builtins: HashMap<AtomicType, TypeId>,
}

impl TypePool {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            by_node: HashMap::new(),
            builtins: HashMap::new(),
        }
    }

    pub fn alloc(&mut self, kind: TypeKind, origin: NodeId) -> TypeId {
        self.arena.alloc(TypeData { kind, origin })
    }

    pub fn get(&self, id: TypeId) -> &TypeData {
        self.arena.get(id)
    }

    /// Seeds one canonical `Type` per built-in, keyed by `origin` (the
    /// synthetic AST node the root scope's TYPE declaration points at —
    /// spec §4.4's "Seeding" step).
    pub fn seed_builtin(&mut self, atomic: AtomicType, origin: NodeId) -> TypeId {
        let id = self.alloc(TypeKind::Atomic(atomic), origin);
        self.builtins.insert(atomic, id);
        self.set_typeset(origin, Typeset::singleton(id));
        id
    }

    pub fn builtin(&self, atomic: AtomicType) -> TypeId {
        *self
            .builtins
            .get(&atomic)
            .expect("seed_builtin must run for every AtomicType before first use")
    }

    pub fn set_type(&mut self, node: NodeId, ty: TypeId) {
        self.set_typeset(node, Typeset::singleton(ty));
    }

    pub fn set_typeset(&mut self, node: NodeId, typeset: Typeset) {
        self.by_node.insert(node, typeset);
    }

    pub fn typeset_of(&self, node: NodeId) -> Option<&Typeset> {
        self.by_node.get(&node)
    }

    /// Builds a right-leaning N-ary product from left to right, e.g.
    /// `[a, b, c]` becomes `Product(a, Product(b, c))`. Returns `None` for
    /// an empty slice (callers substitute Void per the field-aggregate and
    /// argument-list typing rules).
    pub fn right_leaning_product(&mut self, origin: NodeId, members: &[TypeId]) -> Option<TypeId> {
        let mut iter = members.iter().rev().copied();
        let mut acc = iter.next()?;
        for ty in iter {
            acc = self.alloc(TypeKind::Product { lhs: ty, rhs: acc }, origin);
        }
        Some(acc)
    }

    pub fn node_count(&self) -> usize {
        self.by_node.len()
    }
}

impl Default for TypePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Ast, NodeKind};

    fn dummy_node(ast: &mut Ast) -> NodeId {
        ast.push(NodeKind::EmptyStmt, 1, 1)
    }

    #[test]
    fn seeding_builtins_installs_singleton_typesets() {
        let mut ast = Ast::new();
        let mut pool = TypePool::new();
        let origin = dummy_node(&mut ast);
        let int_ty = pool.seed_builtin(AtomicType::Int, origin);
        assert_eq!(pool.builtin(AtomicType::Int), int_ty);
        assert_eq!(pool.typeset_of(origin).unwrap().primary(), Some(int_ty));
    }

    #[test]
    fn right_leaning_product_nests_towards_the_tail() {
        let mut ast = Ast::new();
        let mut pool = TypePool::new();
        let origin = dummy_node(&mut ast);
        let a = pool.alloc(TypeKind::TypeVar, origin);
        let b = pool.alloc(TypeKind::TypeVar, origin);
        let c = pool.alloc(TypeKind::TypeVar, origin);

        let prod = pool.right_leaning_product(origin, &[a, b, c]).unwrap();
        match &pool.get(prod).kind {
            TypeKind::Product { lhs, rhs } => {
                assert_eq!(*lhs, a);
                match &pool.get(*rhs).kind {
                    TypeKind::Product { lhs, rhs } => {
                        assert_eq!(*lhs, b);
                        assert_eq!(*rhs, c);
                    }
                    other => panic!("expected nested Product, got {other:?}"),
                }
            }
            other => panic!("expected Product, got {other:?}"),
        }
    }

    #[test]
    fn empty_member_list_has_no_product() {
        let mut pool = TypePool::new();
        assert!(pool.right_leaning_product(dummy_origin(), &[]).is_none());
    }

    fn dummy_origin() -> NodeId {
        let mut ast = Ast::new();
        dummy_node(&mut ast)
    }
}
