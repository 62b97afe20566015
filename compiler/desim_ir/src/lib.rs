//! AST and type model for the desim compiler.
//!
//! The parser (an external collaborator) produces this tree; the LLVM
//! backend consumes it read-only. Nodes own their children exclusively:
//! dropping a node drops its whole subtree, no cycles.

pub mod ast;

mod pos;
mod types;

pub use pos::Pos;
pub use types::DataType;

pub use ast::{
    Attribute, BinaryOp, Expr, ExprKind, Param, Program, SetOp, Stmt, StmtKind, UnaryOp,
};
