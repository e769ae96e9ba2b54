//! End-to-end pipeline tests: one compilation unit per scenario, driven
//! through the public `compile` entry point, checking the scope/type shape
//! the language's own worked examples describe.

use pipeline_frontend::ast::{BinaryOp, NodeId, NodeKind, TypeRefKind};
use pipeline_frontend::types::{AtomicType, TypeId, TypeKind, TypePool};
use pipeline_frontend::{compile, CompilationContext, CompileOptions};

fn compiles(source: &str) -> CompilationContext {
    compile(source, CompileOptions::new("<test>")).unwrap_or_else(|e| panic!("expected {source:?} to compile, got {e}"))
}

fn program_decls(ctx: &CompilationContext) -> Vec<NodeId> {
    match &ctx.ast.get(ctx.program).kind {
        NodeKind::Program { declarations } => declarations.clone(),
        other => panic!("root node is not a Program: {other:?}"),
    }
}

/// Follows a chain of `TypeKind::TypeRef` indirections down to whatever
/// they eventually point at.
fn through_refs(pool: &TypePool, mut id: TypeId) -> TypeId {
    loop {
        match &pool.get(id).kind {
            TypeKind::TypeRef { target } => id = *target,
            _ => return id,
        }
    }
}

fn primary_ty(ctx: &CompilationContext, node: NodeId) -> TypeId {
    ctx.types
        .typeset_of(node)
        .and_then(|ts| ts.primary())
        .unwrap_or_else(|| panic!("node {node:?} has no typeset"))
}

// S1: a typedef'd bit width used as a variable's type.
#[test]
fn typedef_use_site_resolves_through_the_type_ref_chain_to_bit() {
    let ctx = compiles("typedef bit<9> PortId_t;\nPortId_t p;\n");
    let decls = program_decls(&ctx);
    assert_eq!(decls.len(), 2);

    let var_decl = decls[1];
    let NodeKind::VarDecl { ty, .. } = &ctx.ast.get(var_decl).kind else {
        panic!("expected a VarDecl")
    };
    let NodeKind::TypeRef(TypeRefKind::Named { name: use_name, .. }) = &ctx.ast.get(*ty).kind else {
        panic!("expected a named type reference")
    };

    let name_ref = ctx.name_refs.get(*use_name).expect("use-site recorded in the name-ref map");
    assert_eq!(&*name_ref.strname, "PortId_t");
    assert_eq!(name_ref.defining_scope, ctx.scopes.root());

    let var_ty = primary_ty(&ctx, var_decl);
    let bottom = through_refs(&ctx.types, var_ty);
    assert_eq!(bottom, ctx.types.builtin(AtomicType::Bit));
}

// S2: a single-field struct wrapping a single-field header degenerates,
// through two right-leaning products of one member each, straight to the
// field's own atomic type.
#[test]
fn single_field_struct_over_header_degenerates_to_the_field_type() {
    let ctx = compiles("header H { bit<16> f; }\nstruct S { H h; }\nS s;\n");
    let decls = program_decls(&ctx);
    assert_eq!(decls.len(), 3);

    let header_decl = decls[0];
    let struct_decl = decls[1];
    let var_decl = decls[2];

    let header_ty = primary_ty(&ctx, header_decl);
    let struct_ty = primary_ty(&ctx, struct_decl);
    assert_eq!(
        struct_ty, header_ty,
        "a single-field struct over a single-field header should degenerate to the same underlying type"
    );
    assert!(matches!(ctx.types.get(struct_ty).kind, TypeKind::Atomic(AtomicType::Bit)));

    let NodeKind::VarDecl { ty, .. } = &ctx.ast.get(var_decl).kind else {
        panic!("expected a VarDecl")
    };
    let NodeKind::TypeRef(TypeRefKind::Named { name: use_name, .. }) = &ctx.ast.get(*ty).kind else {
        panic!("expected a named type reference")
    };
    let name_ref = ctx.name_refs.get(*use_name).expect("S is a recorded use-site");
    assert_eq!(&*name_ref.strname, "S");

    let s_var_ty = through_refs(&ctx.types, primary_ty(&ctx, var_decl));
    assert_eq!(s_var_ty, struct_ty);
}

// S3: accept resolves against the root scope from inside a nested parser
// state scope.
#[test]
fn accept_resolves_against_the_root_scope_from_a_nested_state() {
    let ctx = compiles("parser P(inout H h) { state start { transition accept; } }\n");
    let decls = program_decls(&ctx);
    let parser_decl = decls[0];
    let NodeKind::ParserDecl { states, .. } = &ctx.ast.get(parser_decl).kind else {
        panic!("expected a ParserDecl")
    };
    let state = states[0];
    let NodeKind::StateDecl { transition: Some(transition), .. } = &ctx.ast.get(state).kind else {
        panic!("expected a state with a transition")
    };
    let NodeKind::TransitionDirect { target } = &ctx.ast.get(*transition).kind else {
        panic!("expected a direct transition")
    };

    let name_ref = ctx.name_refs.get(*target).expect("accept is a recorded use-site");
    assert_eq!(&*name_ref.strname, "accept");
    assert_eq!(name_ref.defining_scope, ctx.scopes.root());
}

// S4: every use of the action parameter resolves, and the binary/assign
// expressions get the Product+FunctionCall shape spec'd for operator calls.
#[test]
fn action_body_types_the_increment_as_a_binary_operator_call() {
    let ctx = compiles("control C() { action a(in bit<8> x) { x = x + 1; } apply { } }\n");
    let decls = program_decls(&ctx);
    let control = decls[0];
    let NodeKind::ControlDecl { actions, .. } = &ctx.ast.get(control).kind else {
        panic!("expected a ControlDecl")
    };
    let action = actions[0];
    let NodeKind::ActionDecl { name, body, .. } = &ctx.ast.get(action).kind else {
        panic!("expected an ActionDecl")
    };

    // P2 declares the action's own name as a VAR in the enclosing (control)
    // scope, so a use-site like `actions = { a; }` elsewhere can resolve it.
    let control_scope = *ctx.node_scopes.get(&control).expect("control has a scope");
    let name_text = match &ctx.ast.get(*name).kind {
        NodeKind::Name { text } => text.clone(),
        other => panic!("expected a Name node, got {other:?}"),
    };
    assert!(
        ctx.scopes.lookup(control_scope, &name_text).is_populated(pipeline_frontend::scope::Namespace::Var),
        "action name should be declared VAR in the enclosing control scope"
    );

    let NodeKind::Block { stmts } = &ctx.ast.get(*body).kind else {
        panic!("expected a block body")
    };
    let assign = stmts[0];
    let NodeKind::AssignStmt { lhs, rhs } = &ctx.ast.get(assign).kind else {
        panic!("expected an assignment statement")
    };
    let NodeKind::NameExpr { name: lhs_name, .. } = &ctx.ast.get(*lhs).kind else {
        panic!("expected a name expression on the left")
    };
    let lhs_ref = ctx.name_refs.get(*lhs_name).expect("x is a recorded use-site");
    assert_eq!(&*lhs_ref.strname, "x");

    let NodeKind::BinaryExpr { op, .. } = &ctx.ast.get(*rhs).kind else {
        panic!("expected a binary expression on the right")
    };
    assert_eq!(*op, BinaryOp::Add);

    let add_ty = ctx.types.get(primary_ty(&ctx, *rhs)).kind.clone();
    let TypeKind::FunctionCall { args_ty } = add_ty else {
        panic!("expected the addition to be typed as a FunctionCall")
    };
    let TypeKind::Product { lhs: bit_ty, rhs: int_ty } = ctx.types.get(args_ty).kind else {
        panic!("expected the call's args to be a Product")
    };
    assert!(matches!(ctx.types.get(bit_ty).kind, TypeKind::Atomic(AtomicType::Bit)));
    assert!(matches!(ctx.types.get(int_ty).kind, TypeKind::Atomic(AtomicType::Int)));

    let assign_ty = ctx.types.get(primary_ty(&ctx, assign)).kind.clone();
    let TypeKind::FunctionCall { args_ty: assign_args } = assign_ty else {
        panic!("expected the assignment to be typed as a FunctionCall too")
    };
    let TypeKind::Product { lhs: assign_lhs_ty, rhs: assign_rhs_ty } = ctx.types.get(assign_args).kind else {
        panic!("expected the assignment's args to be a Product")
    };
    assert!(matches!(ctx.types.get(assign_lhs_ty).kind, TypeKind::Atomic(AtomicType::Bit)));
    assert_eq!(assign_rhs_ty, primary_ty(&ctx, *rhs));
}

// S5: two nested empty block scopes, and a boolean condition typed Bool.
#[test]
fn if_condition_over_a_bool_literal_is_typed_bool() {
    let ctx = compiles("control C() { apply { if (true) { } else { } } }\n");
    let decls = program_decls(&ctx);
    let control = decls[0];
    let NodeKind::ControlDecl { apply, .. } = &ctx.ast.get(control).kind else {
        panic!("expected a ControlDecl")
    };
    let NodeKind::Block { stmts } = &ctx.ast.get(*apply).kind else {
        panic!("expected the apply block")
    };
    let if_stmt = stmts[0];
    let NodeKind::IfStmt { cond, then_branch, else_branch } = &ctx.ast.get(if_stmt).kind else {
        panic!("expected an if statement")
    };
    assert!(matches!(ctx.ast.get(*then_branch).kind, NodeKind::Block { .. }));
    assert!(matches!(ctx.ast.get(else_branch.expect("has an else branch")).kind, NodeKind::Block { .. }));

    assert!(matches!(ctx.ast.get(*cond).kind, NodeKind::BoolLiteralExpr { value: true }));
    let cond_ty = primary_ty(&ctx, *cond);
    assert_eq!(cond_ty, ctx.types.builtin(AtomicType::Bool));
}

// S6: enum members declared as VAR in the enum's own scope, a member-select
// typed as a fresh TypeVar, and the variable's declared type wrapping the
// enum's TypeName.
#[test]
fn enum_member_select_gets_a_fresh_type_var_and_var_decl_wraps_the_enum_name() {
    let ctx = compiles("enum E { A, B = 2 }\nE e = E.A;\n");
    let decls = program_decls(&ctx);
    assert_eq!(decls.len(), 2);

    let enum_decl = decls[0];
    let NodeKind::EnumDecl { members, .. } = &ctx.ast.get(enum_decl).kind else {
        panic!("expected an EnumDecl")
    };
    assert_eq!(members.len(), 2);

    let enum_ty = primary_ty(&ctx, enum_decl);
    assert!(matches!(&ctx.types.get(enum_ty).kind, TypeKind::TypeName { strname } if &**strname == "E"));

    let var_decl = decls[1];
    let NodeKind::VarDecl { ty, init, .. } = &ctx.ast.get(var_decl).kind else {
        panic!("expected a VarDecl")
    };
    let NodeKind::TypeRef(TypeRefKind::Named { .. }) = &ctx.ast.get(*ty).kind else {
        panic!("expected a named type reference")
    };
    let var_decl_ty = ctx.types.get(primary_ty(&ctx, var_decl)).kind.clone();
    let TypeKind::TypeRef { target } = var_decl_ty else {
        panic!("expected the var decl's type to wrap the enum's TypeName in a TypeRef")
    };
    assert_eq!(target, enum_ty);

    let init_expr = init.expect("has an initializer");
    let NodeKind::MemberExpr { member, .. } = &ctx.ast.get(init_expr).kind else {
        panic!("expected E.A to parse as a member-select")
    };
    assert!(ctx.name_refs.get(*member).is_none(), "a member name is never looked up as a use-site");

    let select_ty = ctx.types.get(primary_ty(&ctx, init_expr)).kind.clone();
    assert!(matches!(select_ty, TypeKind::TypeVar));
}

// I3: every AST node gets a typeset entry after P4, with no gaps.
#[test]
fn every_node_has_a_typeset_after_p4() {
    let ctx = compiles(
        "typedef bit<9> PortId_t;\n\
         header H { bit<16> f; }\n\
         struct S { H h; }\n\
         enum E { A, B = 2 }\n\
         control C(inout S s) {\n\
             action a(in bit<8> x) { x = x + 1; }\n\
             table t { key = { s.h.f : exact; } actions = { a; } }\n\
             apply { if (true) { a(1); } else { } }\n\
         }\n\
         parser P(inout H h) { state start { transition accept; } }\n",
    );
    for (id, _) in ctx.ast.iter() {
        assert!(ctx.types.typeset_of(id).is_some(), "node {id:?} has no typeset after P4");
    }
}

// I5: redeclaring a name in the same scope/namespace is a fatal error
// naming both line numbers.
#[test]
fn redeclaration_in_the_same_scope_reports_both_lines() {
    let err = compile("bit<8> x;\nbit<8> x;\n", CompileOptions::new("<test>")).expect_err("should fail to compile");
    match err {
        pipeline_frontend::CompileError::Redeclaration { name, previous_line, line, .. } => {
            assert_eq!(name, "x");
            assert_eq!(previous_line, 1);
            assert_eq!(line, 2);
        }
        other => panic!("expected a Redeclaration error, got {other:?}"),
    }
}

// spec §6/§7: a token the lexer itself could not classify is a fatal
// LexicalError, not a generic syntax error from whatever grammar fallback
// happens to see it next.
#[test]
fn an_unclassifiable_token_reports_lexical_error_not_syntax_error() {
    let err = compile("bit<8> x = @@@;\n", CompileOptions::new("<test>")).expect_err("should fail to compile");
    match err {
        pipeline_frontend::CompileError::LexicalError { lexeme, .. } => {
            assert_eq!(lexeme, "@@@");
        }
        other => panic!("expected a LexicalError, got {other:?}"),
    }
}

// I8: precedence laws, end to end through the real pipeline rather than a
// parser-only test: `a + b * c == d && e` parses as `((a + (b * c)) == d) && e`.
#[test]
fn precedence_laws_hold_through_the_whole_pipeline() {
    let ctx = compiles(
        "control C() {\n\
             action a(in int a1, in int b1, in int c1, in int d1, in bool e1, in bool r) {\n\
                 r = a1 + b1 * c1 == d1 && e1;\n\
             }\n\
         }\n",
    );
    let decls = program_decls(&ctx);
    let NodeKind::ControlDecl { actions, .. } = &ctx.ast.get(decls[0]).kind else {
        panic!("expected a ControlDecl")
    };
    let NodeKind::ActionDecl { body, .. } = &ctx.ast.get(actions[0]).kind else {
        panic!("expected an ActionDecl")
    };
    let NodeKind::Block { stmts } = &ctx.ast.get(*body).kind else {
        panic!("expected a block body")
    };
    let NodeKind::AssignStmt { rhs, .. } = &ctx.ast.get(stmts[0]).kind else {
        panic!("expected an assignment")
    };

    let NodeKind::BinaryExpr { op: and_op, lhs: eq_node, .. } = &ctx.ast.get(*rhs).kind else {
        panic!("expected the outermost operator to be &&")
    };
    assert_eq!(*and_op, BinaryOp::And);

    let NodeKind::BinaryExpr { op: eq_op, lhs: add_node, .. } = &ctx.ast.get(*eq_node).kind else {
        panic!("expected == to sit just inside &&")
    };
    assert_eq!(*eq_op, BinaryOp::Eq);

    let NodeKind::BinaryExpr { op: add_op, rhs: mul_node, .. } = &ctx.ast.get(*add_node).kind else {
        panic!("expected + to sit just inside ==")
    };
    assert_eq!(*add_op, BinaryOp::Add);

    assert!(matches!(
        ctx.ast.get(*mul_node).kind,
        NodeKind::BinaryExpr { op: BinaryOp::Mul, .. }
    ));
}

// I8: `a &&& b == c` parses as `(a &&& b) == c` — mask binds tighter than
// relational.
#[test]
fn mask_binds_tighter_than_relational() {
    let ctx = compiles(
        "control C() {\n\
             action a(in bit<8> a1, in bit<8> b1, in bit<8> c1, in bool r) {\n\
                 r = a1 &&& b1 == c1;\n\
             }\n\
         }\n",
    );
    let decls = program_decls(&ctx);
    let NodeKind::ControlDecl { actions, .. } = &ctx.ast.get(decls[0]).kind else {
        panic!("expected a ControlDecl")
    };
    let NodeKind::ActionDecl { body, .. } = &ctx.ast.get(actions[0]).kind else {
        panic!("expected an ActionDecl")
    };
    let NodeKind::Block { stmts } = &ctx.ast.get(*body).kind else {
        panic!("expected a block body")
    };
    let NodeKind::AssignStmt { rhs, .. } = &ctx.ast.get(stmts[0]).kind else {
        panic!("expected an assignment")
    };
    let NodeKind::BinaryExpr { op: eq_op, lhs: mask_node, .. } = &ctx.ast.get(*rhs).kind else {
        panic!("expected == to be the outermost operator")
    };
    assert_eq!(*eq_op, BinaryOp::Eq);
    assert!(matches!(
        ctx.ast.get(*mask_node).kind,
        NodeKind::BinaryExpr { op: BinaryOp::Mask, .. }
    ));
}

// R1/R2: re-running resolution and type construction over the same parsed
// AST is idempotent.
#[test]
fn rerunning_resolve_and_build_types_is_idempotent() {
    use pipeline_frontend::resolve;
    use pipeline_frontend::types::build;

    let ctx = compiles("header H { bit<16> f; }\nstruct S { H h; }\nS s;\n");
    let again = resolve::resolve_unit(&ctx.ast, &ctx.scopes, &ctx.node_scopes, ctx.program, "<test>")
        .expect("re-resolution should succeed");
    assert_eq!(again.len(), ctx.name_refs.len());

    let mut types_again = TypePool::new();
    // Re-seed the same builtins the first pass seeded, keyed by the same
    // synthetic nodes, so the rebuilt pool's ids line up with the original.
    for atomic in [
        AtomicType::Void,
        AtomicType::Bool,
        AtomicType::Int,
        AtomicType::Bit,
        AtomicType::Varbit,
        AtomicType::String,
        AtomicType::Error,
        AtomicType::MatchKind,
    ] {
        let origin = ctx.types.get(ctx.types.builtin(atomic)).origin;
        types_again.seed_builtin(atomic, origin);
    }
    build::build_types(&ctx.ast, &ctx.scopes, &ctx.node_scopes, &ctx.name_refs, &mut types_again, ctx.program, "<test>")
        .expect("rebuilding types should succeed");

    let decls = program_decls(&ctx);
    let struct_decl = decls[1];
    let first = ctx.types.get(primary_ty(&ctx, struct_decl)).kind.clone();
    let second = types_again.get(types_again.typeset_of(struct_decl).unwrap().primary().unwrap()).kind.clone();
    assert!(
        matches!((first, second), (TypeKind::Atomic(a), TypeKind::Atomic(b)) if a == b),
        "rebuilding the type map twice should agree on the struct's underlying atomic type"
    );
}
