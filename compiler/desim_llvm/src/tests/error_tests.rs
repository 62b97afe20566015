use inkwell::context::Context;

use desim_ir::ast::{BinaryOp, StmtKind, UnaryOp};
use desim_ir::DataType;

use super::helpers::*;
use crate::error::CodegenError;
use crate::module::Generator;

fn generate(program: &desim_ir::ast::Program) -> Result<(), CodegenError> {
    let context = Context::create();
    let mut generator = Generator::new(&context, "test");
    generator.generate(program)
}

#[test]
fn mixed_operand_types_are_a_type_mismatch() {
    // No implicit coercion: INT + REAL fails for every operator.
    for op in [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Eq,
        BinaryOp::Lt,
        BinaryOp::GtEq,
    ] {
        let program = main_program(vec![assign("x", binary(op, int(1), real(2.0)))]);
        assert_eq!(
            generate(&program),
            Err(CodegenError::TypeMismatch {
                context: "binary expression"
            }),
            "operator {op:?}"
        );
    }
}

#[test]
fn logical_operators_reject_real_operands() {
    let program = main_program(vec![assign(
        "x",
        binary(BinaryOp::And, real(1.0), real(0.0)),
    )]);
    assert!(matches!(
        generate(&program),
        Err(CodegenError::TypeMismatch { .. })
    ));
}

#[test]
fn reading_before_initialization_fails() {
    // INT x; y = x
    let program = main_program(vec![
        var_decl("x", DataType::Int, None),
        assign("y", ident("x")),
    ]);
    assert_eq!(
        generate(&program),
        Err(CodegenError::uninitialized_read("x"))
    );
}

#[test]
fn declared_and_initialized_variable_reads_fine() {
    let program = main_program(vec![
        var_decl("x", DataType::Int, Some(int(3))),
        ret(Some(ident("x"))),
    ]);
    assert!(generate(&program).is_ok());
}

#[test]
fn unknown_identifier_fails() {
    let program = main_program(vec![assign("y", ident("ghost"))]);
    assert_eq!(
        generate(&program),
        Err(CodegenError::undefined_variable("ghost"))
    );
}

#[test]
fn double_declaration_fails() {
    let program = main_program(vec![
        var_decl("x", DataType::Int, None),
        var_decl("x", DataType::Real, None),
    ]);
    assert_eq!(generate(&program), Err(CodegenError::redeclaration("x")));
}

#[test]
fn unknown_function_fails() {
    let program = main_program(vec![assign("y", call_at(1, "nope", vec![]))]);
    assert_eq!(
        generate(&program),
        Err(CodegenError::undefined_function("nope"))
    );
}

#[test]
fn stdlib_call_with_wrong_arity_fails() {
    let program = main_program(vec![assign(
        "y",
        stdlib_call("uniform", vec![int(1)]),
    )]);
    assert_eq!(
        generate(&program),
        Err(CodegenError::undefined_function("uniform"))
    );
}

#[test]
fn object_creation_for_unknown_class_fails() {
    let creation = desim_ir::ast::Stmt::new(
        StmtKind::ObjectCreation {
            variable: "obj".to_owned(),
            class: "Ghost".to_owned(),
            args: vec![],
        },
        at(1),
    );
    assert_eq!(
        generate(&main_program(vec![creation])),
        Err(CodegenError::undefined_class_or_object("Ghost"))
    );
}

#[test]
fn logical_not_on_real_fails() {
    let program = main_program(vec![assign(
        "x",
        desim_ir::ast::Expr::new(
            desim_ir::ast::ExprKind::Unary {
                op: UnaryOp::Not,
                operand: Box::new(real(1.0)),
            },
            at(0),
        ),
    )]);
    assert!(matches!(
        generate(&program),
        Err(CodegenError::TypeMismatch { .. })
    ));
}

#[test]
fn unsupported_set_literal_degrades_without_failing() {
    // Set forms are a stated gap: the assignment becomes a no-op, the
    // unit still generates and verifies.
    let set = desim_ir::ast::Expr::new(
        desim_ir::ast::ExprKind::SetLiteral(vec![int(1), int(2)]),
        at(0),
    );
    let program = main_program(vec![assign("s", set), ret(Some(int(0)))]);
    assert!(generate(&program).is_ok());
}

#[test]
fn duplicate_entity_declaration_fails() {
    let entity = |name: &str| {
        desim_ir::ast::Stmt::new(
            StmtKind::EntityDecl {
                name: name.to_owned(),
                attributes: vec![],
            },
            at(0),
        )
    };
    let result = generate(&program(vec![entity("Customer"), entity("Customer")], vec![]));
    assert_eq!(result, Err(CodegenError::redeclaration("Customer")));
}
