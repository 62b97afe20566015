//! AST construction helpers for backend tests.

use desim_ir::ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind};
use desim_ir::{DataType, Pos};

pub fn at(line: u32) -> Pos {
    Pos::new(line, 1)
}

pub fn int(value: i32) -> Expr {
    Expr::new(ExprKind::Int(value), at(0))
}

pub fn real(value: f64) -> Expr {
    Expr::new(ExprKind::Real(value), at(0))
}

pub fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Ident(name.to_owned()), at(0))
}

pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::new(
        ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        at(0),
    )
}

pub fn call_at(line: u32, name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::Call {
            name: name.to_owned(),
            args,
        },
        at(line),
    )
}

pub fn stdlib_call(name: &str, args: Vec<Expr>) -> Expr {
    Expr::new(
        ExprKind::StdlibCall {
            name: name.to_owned(),
            args,
        },
        at(0),
    )
}

pub fn var_decl(name: &str, ty: DataType, init: Option<Expr>) -> Stmt {
    Stmt::new(
        StmtKind::VarDecl {
            name: name.to_owned(),
            ty,
            init,
        },
        at(0),
    )
}

pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::new(
        StmtKind::Assign {
            target: target.to_owned(),
            value,
        },
        at(0),
    )
}

pub fn write(expr: Expr) -> Stmt {
    Stmt::new(StmtKind::Write(expr), at(0))
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return(value), at(0))
}

pub fn block(stmts: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::Block(stmts), at(0))
}

pub fn if_then(condition: Expr, then_branch: Stmt) -> Stmt {
    Stmt::new(
        StmtKind::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: None,
        },
        at(0),
    )
}

pub fn if_then_else(condition: Expr, then_branch: Stmt, else_branch: Stmt) -> Stmt {
    Stmt::new(
        StmtKind::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Some(Box::new(else_branch)),
        },
        at(0),
    )
}

pub fn while_loop(condition: Expr, body: Stmt) -> Stmt {
    Stmt::new(
        StmtKind::While {
            condition,
            body: Box::new(body),
        },
        at(0),
    )
}

pub fn for_loop(variable: &str, start: Expr, end: Expr, step: Option<Expr>, body: Stmt) -> Stmt {
    Stmt::new(
        StmtKind::For {
            variable: variable.to_owned(),
            start,
            end,
            step,
            body: Box::new(body),
        },
        at(0),
    )
}

pub fn function_decl(name: &str, return_ty: DataType, body: Vec<Stmt>) -> Stmt {
    Stmt::new(
        StmtKind::FunctionDecl {
            name: name.to_owned(),
            params: vec![],
            return_ty,
            body: Box::new(block(body)),
        },
        at(0),
    )
}

pub fn main_program(main: Vec<Stmt>) -> Program {
    Program::new(vec![], main)
}

pub fn program(preamble: Vec<Stmt>, main: Vec<Stmt>) -> Program {
    Program::new(preamble, main)
}
