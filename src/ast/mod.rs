//! The AST node pool (C3): tagged variants, one per grammar production,
//! each carrying a kind tag, source line/column, and a kind-specific
//! payload. Children are held as typed fields inside each variant rather
//! than as a generic list (Design Notes: "prefer child-vectors for
//! ergonomic iteration"); no parent pointers are stored — every pass
//! threads the enclosing scope/context through its own recursive walk
//! instead of climbing back up the tree.

use crate::base::{Arena, Idx, Name};

pub type NodeId = Idx<Node>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    In,
    Out,
    Inout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseTypeTag {
    Void,
    Bool,
    Int,
    String,
    Error,
    MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    BitNot,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Mul,
    Div,
    Mask,
}

/// What a `typedef`/`type` target or a declared variable's type position
/// refers to. Distinct from [`crate::types::Type`], which is what P4
/// *attaches* to these nodes — this is purely syntax.
#[derive(Debug, Clone)]
pub enum TypeRefKind {
    Base(BaseTypeTag),
    Bit { width: Option<NodeId> },
    Varbit { width: Option<NodeId> },
    DontCare,
    Named { name: NodeId, type_args: Vec<NodeId> },
    Tuple { elems: Vec<NodeId> },
    HeaderStack { elem: NodeId, size: NodeId },
}

#[derive(Debug, Clone)]
pub enum Keyset {
    Default,
    DontCare,
    Expr(NodeId),
    Tuple(Vec<NodeId>),
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    // ---- leaves -----------------------------------------------------
    /// A use-site or declaration-site name. P3 resolves every use-site
    /// `Name` node into the name-ref map.
    Name { text: Name },
    TypeRef(TypeRefKind),

    // ---- program ------------------------------------------------------
    Program { declarations: Vec<NodeId> },

    // ---- declarations ---------------------------------------------------
    TypedefDecl { name: NodeId, target: NodeId, is_typedef: bool },
    ConstDecl { name: NodeId, ty: NodeId, init: NodeId },
    VarDecl { name: NodeId, ty: NodeId, init: Option<NodeId> },
    StructField { name: NodeId, ty: NodeId },
    HeaderField { name: NodeId, ty: NodeId },
    StructDecl { name: NodeId, fields: Vec<NodeId> },
    HeaderDecl { name: NodeId, fields: Vec<NodeId> },
    HeaderUnionDecl { name: NodeId, fields: Vec<NodeId> },
    EnumMember { name: NodeId, value: Option<NodeId> },
    EnumDecl { name: NodeId, members: Vec<NodeId> },
    TypeParam { name: NodeId },
    Parameter { name: NodeId, ty: NodeId, direction: Direction },
    FunctionProto {
        name: NodeId,
        type_params: Vec<NodeId>,
        params: Vec<NodeId>,
        return_ty: Option<NodeId>,
    },
    ExternDecl {
        name: NodeId,
        type_params: Vec<NodeId>,
        methods: Vec<NodeId>,
    },
    PackageDecl {
        name: NodeId,
        type_params: Vec<NodeId>,
        params: Vec<NodeId>,
    },
    ParserDecl {
        name: NodeId,
        type_params: Vec<NodeId>,
        params: Vec<NodeId>,
        locals: Vec<NodeId>,
        states: Vec<NodeId>,
    },
    ControlDecl {
        name: NodeId,
        type_params: Vec<NodeId>,
        params: Vec<NodeId>,
        locals: Vec<NodeId>,
        actions: Vec<NodeId>,
        tables: Vec<NodeId>,
        apply: NodeId,
    },
    ActionDecl { name: NodeId, params: Vec<NodeId>, body: NodeId },

    // ---- parser states --------------------------------------------------
    StateDecl { name: NodeId, body: Vec<NodeId>, transition: Option<NodeId> },
    TransitionDirect { target: NodeId },
    TransitionSelect { exprs: Vec<NodeId>, cases: Vec<NodeId> },
    SelectCase { keyset: Keyset, target: NodeId },

    // ---- tables -----------------------------------------------------------
    TableDecl { name: NodeId, properties: Vec<NodeId> },
    KeyElement { expr: NodeId, match_kind: NodeId },
    TableKeyProperty { keys: Vec<NodeId> },
    ActionRef { name: NodeId, args: Vec<NodeId> },
    TableActionsProperty { actions: Vec<NodeId> },
    TableSimpleProperty { name: NodeId, value: NodeId },
    TableEntriesProperty { entries: Vec<NodeId> },

    // ---- statements ---------------------------------------------------
    Block { stmts: Vec<NodeId> },
    IfStmt { cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    SwitchCase { label: Option<NodeId>, body: Option<NodeId> },
    SwitchStmt { expr: NodeId, cases: Vec<NodeId> },
    AssignStmt { lhs: NodeId, rhs: NodeId },
    MethodCallStmt { call: NodeId },
    ReturnStmt { value: Option<NodeId> },
    ExitStmt,
    EmptyStmt,

    // ---- expressions ---------------------------------------------------
    NameExpr { name: NodeId, global: bool },
    IntLiteralExpr { is_signed: bool, width: u32, value: i64 },
    BoolLiteralExpr { value: bool },
    StringLiteralExpr { value: String },
    ErrorPrimaryExpr,
    ParenExpr { inner: NodeId },
    CastExpr { ty: NodeId, expr: NodeId },
    UnaryExpr { op: UnaryOp, expr: NodeId },
    BinaryExpr { op: BinaryOp, lhs: NodeId, rhs: NodeId },
    MemberExpr { base: NodeId, member: NodeId },
    IndexExpr { base: NodeId, index: NodeId },
    CallExpr { callee: NodeId, args: Vec<NodeId> },
    InstantiationExpr { ty: NodeId, args: Vec<NodeId> },
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub line: u32,
    pub column: u32,
}

/// The AST node pool. A node's id is simply the [`NodeId`] `push` returns —
/// monotonically increasing and unique within the compilation unit, since
/// the arena only ever grows (spec §3).
pub struct Ast {
    arena: Arena<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    pub fn push(&mut self, kind: NodeKind, line: u32, column: u32) -> NodeId {
        self.arena.alloc(Node { kind, line, column })
    }

    pub fn get(&self, id: NodeId) -> &Node {
        self.arena.get(id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.arena.iter()
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic child enumeration, used by passes that only need to recurse
/// (P2's scope walk, P3's name-ref walk) without special-casing every kind.
pub fn children(kind: &NodeKind) -> Vec<NodeId> {
    use NodeKind::*;
    match kind {
        Name { .. } | BoolLiteralExpr { .. } | StringLiteralExpr { .. } | ErrorPrimaryExpr
        | IntLiteralExpr { .. } | ExitStmt | EmptyStmt => vec![],
        TypeRef(t) => match t {
            TypeRefKind::Base(_) | TypeRefKind::DontCare => vec![],
            TypeRefKind::Bit { width } | TypeRefKind::Varbit { width } => {
                width.iter().copied().collect()
            }
            TypeRefKind::Named { name, type_args } => {
                let mut v = vec![*name];
                v.extend(type_args.iter().copied());
                v
            }
            TypeRefKind::Tuple { elems } => elems.clone(),
            TypeRefKind::HeaderStack { elem, size } => vec![*elem, *size],
        },
        Program { declarations } => declarations.clone(),
        TypedefDecl { name, target, .. } => vec![*name, *target],
        ConstDecl { name, ty, init } => vec![*name, *ty, *init],
        VarDecl { name, ty, init } => {
            let mut v = vec![*name, *ty];
            v.extend(init.iter().copied());
            v
        }
        StructField { name, ty } | HeaderField { name, ty } => vec![*name, *ty],
        StructDecl { name, fields } | HeaderDecl { name, fields } | HeaderUnionDecl { name, fields } => {
            let mut v = vec![*name];
            v.extend(fields.iter().copied());
            v
        }
        EnumMember { name, value } => {
            let mut v = vec![*name];
            v.extend(value.iter().copied());
            v
        }
        EnumDecl { name, members } => {
            let mut v = vec![*name];
            v.extend(members.iter().copied());
            v
        }
        TypeParam { name } => vec![*name],
        Parameter { name, ty, .. } => vec![*name, *ty],
        FunctionProto {
            name,
            type_params,
            params,
            return_ty,
        } => {
            let mut v = vec![*name];
            v.extend(type_params.iter().copied());
            v.extend(params.iter().copied());
            v.extend(return_ty.iter().copied());
            v
        }
        ExternDecl {
            name,
            type_params,
            methods,
        } => {
            let mut v = vec![*name];
            v.extend(type_params.iter().copied());
            v.extend(methods.iter().copied());
            v
        }
        PackageDecl {
            name,
            type_params,
            params,
        } => {
            let mut v = vec![*name];
            v.extend(type_params.iter().copied());
            v.extend(params.iter().copied());
            v
        }
        ParserDecl {
            name,
            type_params,
            params,
            locals,
            states,
        } => {
            let mut v = vec![*name];
            v.extend(type_params.iter().copied());
            v.extend(params.iter().copied());
            v.extend(locals.iter().copied());
            v.extend(states.iter().copied());
            v
        }
        ControlDecl {
            name,
            type_params,
            params,
            locals,
            actions,
            tables,
            apply,
        } => {
            let mut v = vec![*name];
            v.extend(type_params.iter().copied());
            v.extend(params.iter().copied());
            v.extend(locals.iter().copied());
            v.extend(actions.iter().copied());
            v.extend(tables.iter().copied());
            v.push(*apply);
            v
        }
        ActionDecl { name, params, body } => {
            let mut v = vec![*name];
            v.extend(params.iter().copied());
            v.push(*body);
            v
        }
        StateDecl {
            name,
            body,
            transition,
        } => {
            let mut v = vec![*name];
            v.extend(body.iter().copied());
            v.extend(transition.iter().copied());
            v
        }
        TransitionDirect { target } => vec![*target],
        TransitionSelect { exprs, cases } => {
            let mut v = exprs.clone();
            v.extend(cases.iter().copied());
            v
        }
        SelectCase { keyset, target } => {
            let mut v = match keyset {
                Keyset::Default | Keyset::DontCare => vec![],
                Keyset::Expr(e) => vec![*e],
                Keyset::Tuple(elems) => elems.clone(),
            };
            v.push(*target);
            v
        }
        TableDecl { name, properties } => {
            let mut v = vec![*name];
            v.extend(properties.iter().copied());
            v
        }
        KeyElement { expr, match_kind } => vec![*expr, *match_kind],
        TableKeyProperty { keys } => keys.clone(),
        ActionRef { name, args } => {
            let mut v = vec![*name];
            v.extend(args.iter().copied());
            v
        }
        TableActionsProperty { actions } => actions.clone(),
        TableSimpleProperty { name, value } => vec![*name, *value],
        TableEntriesProperty { entries } => entries.clone(),
        Block { stmts } => stmts.clone(),
        IfStmt {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut v = vec![*cond, *then_branch];
            v.extend(else_branch.iter().copied());
            v
        }
        SwitchCase { label, body } => {
            let mut v: Vec<NodeId> = label.iter().copied().collect();
            v.extend(body.iter().copied());
            v
        }
        SwitchStmt { expr, cases } => {
            let mut v = vec![*expr];
            v.extend(cases.iter().copied());
            v
        }
        AssignStmt { lhs, rhs } => vec![*lhs, *rhs],
        MethodCallStmt { call } => vec![*call],
        ReturnStmt { value } => value.iter().copied().collect(),
        NameExpr { name, .. } => vec![*name],
        ParenExpr { inner } => vec![*inner],
        CastExpr { ty, expr } => vec![*ty, *expr],
        UnaryExpr { expr, .. } => vec![*expr],
        BinaryExpr { lhs, rhs, .. } => vec![*lhs, *rhs],
        MemberExpr { base, .. } => vec![*base],
        IndexExpr { base, index } => vec![*base, *index],
        CallExpr { callee, args } => {
            let mut v = vec![*callee];
            v.extend(args.iter().copied());
            v
        }
        InstantiationExpr { ty, args } => {
            let mut v = vec![*ty];
            v.extend(args.iter().copied());
            v
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_in_allocation_order() {
        let mut ast = Ast::new();
        let a = ast.push(NodeKind::BoolLiteralExpr { value: true }, 1, 1);
        let b = ast.push(NodeKind::BoolLiteralExpr { value: false }, 1, 5);
        assert!(a.index() < b.index());
        assert_eq!(ast.get(a).line, 1);
        assert_eq!(ast.get(b).column, 5);
    }

    #[test]
    fn children_enumerates_block_statements() {
        let mut ast = Ast::new();
        let s1 = ast.push(NodeKind::EmptyStmt, 1, 1);
        let s2 = ast.push(NodeKind::ExitStmt, 2, 1);
        let block = NodeKind::Block {
            stmts: vec![s1, s2],
        };
        assert_eq!(children(&block), vec![s1, s2]);
    }
}
