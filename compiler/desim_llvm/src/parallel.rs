//! Parallel-region suitability analysis and emission policy.
//!
//! The predicate is a pure static analysis over a statement tree; its
//! verdict is advisory. The policy seam maps the verdict to an emission
//! strategy, of which only sequential emission exists: true parallel
//! codegen is out of scope, and the seam keeps that decision in one
//! place.

use desim_ir::ast::{Stmt, StmtKind};

/// How a parallel region's body is emitted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EmissionStrategy {
    Sequential,
}

/// Maps the suitability verdict to an emission strategy.
pub trait ParallelPolicy {
    fn strategy(&self, suitable: bool) -> EmissionStrategy;
}

/// Default policy: always sequential, whatever the predicate says.
pub struct SequentialPolicy;

impl ParallelPolicy for SequentialPolicy {
    fn strategy(&self, _suitable: bool) -> EmissionStrategy {
        EmissionStrategy::Sequential
    }
}

/// Decide whether a statement tree is safe to parallelize.
///
/// A body is unsafe if it (recursively, through nested loops and both
/// branches of conditionals) performs screen or file I/O, schedules
/// events, or advances simulation time. Assignments and pure computation
/// are safe; any other statement kind is conservatively unsafe.
pub fn body_is_parallel_safe(body: &Stmt) -> bool {
    match &body.kind {
        StmtKind::Block(stmts) => stmts.iter().all(statement_is_parallel_safe),
        StmtKind::Assign { .. } | StmtKind::VarDecl { .. } => true,
        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            body_is_parallel_safe(then_branch)
                && else_branch.as_deref().is_none_or(body_is_parallel_safe)
        }
        _ => false,
    }
}

fn statement_is_parallel_safe(stmt: &Stmt) -> bool {
    match &stmt.kind {
        // I/O, event scheduling, and time advancement conflict with
        // parallel execution.
        StmtKind::Write(_)
        | StmtKind::WriteToFile { .. }
        | StmtKind::OpenFile { .. }
        | StmtKind::CloseFile { .. }
        | StmtKind::ReadFromFile { .. }
        | StmtKind::StartSimulation
        | StmtKind::Schedule { .. }
        | StmtKind::AdvanceTime(_) => false,

        // Nested loops are as safe as their bodies.
        StmtKind::For { body, .. }
        | StmtKind::While { body, .. }
        | StmtKind::ForEach { body, .. } => body_is_parallel_safe(body),

        StmtKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            body_is_parallel_safe(then_branch)
                && else_branch.as_deref().is_none_or(body_is_parallel_safe)
        }

        StmtKind::Assign { .. } | StmtKind::VarDecl { .. } => true,
        StmtKind::Block(stmts) => stmts.iter().all(statement_is_parallel_safe),

        // Everything else is conservatively unsuitable.
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use desim_ir::ast::{BinaryOp, Expr, ExprKind};
    use desim_ir::Pos;

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt::new(kind, Pos::default())
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Pos::default())
    }

    fn assign(target: &str) -> Stmt {
        stmt(StmtKind::Assign {
            target: target.to_owned(),
            value: expr(ExprKind::Binary {
                op: BinaryOp::Add,
                left: Box::new(expr(ExprKind::Int(1))),
                right: Box::new(expr(ExprKind::Int(2))),
            }),
        })
    }

    fn write() -> Stmt {
        stmt(StmtKind::Write(expr(ExprKind::Int(1))))
    }

    #[test]
    fn arithmetic_assignments_are_suitable() {
        let body = stmt(StmtKind::Block(vec![assign("x"), assign("y")]));
        assert!(body_is_parallel_safe(&body));
    }

    #[test]
    fn write_makes_a_body_unsuitable() {
        let body = stmt(StmtKind::Block(vec![assign("x"), write()]));
        assert!(!body_is_parallel_safe(&body));
    }

    #[test]
    fn nested_loop_bodies_are_checked_recursively() {
        let inner = stmt(StmtKind::While {
            condition: expr(ExprKind::Int(1)),
            body: Box::new(stmt(StmtKind::Block(vec![write()]))),
        });
        let body = stmt(StmtKind::Block(vec![inner]));
        assert!(!body_is_parallel_safe(&body));

        let clean_inner = stmt(StmtKind::While {
            condition: expr(ExprKind::Int(1)),
            body: Box::new(stmt(StmtKind::Block(vec![assign("x")]))),
        });
        let body = stmt(StmtKind::Block(vec![clean_inner]));
        assert!(body_is_parallel_safe(&body));
    }

    #[test]
    fn both_conditional_branches_are_checked() {
        let safe_if = stmt(StmtKind::If {
            condition: expr(ExprKind::Int(1)),
            then_branch: Box::new(assign("x")),
            else_branch: Some(Box::new(assign("y"))),
        });
        assert!(body_is_parallel_safe(&safe_if));

        let unsafe_else = stmt(StmtKind::If {
            condition: expr(ExprKind::Int(1)),
            then_branch: Box::new(assign("x")),
            else_branch: Some(Box::new(write())),
        });
        assert!(!body_is_parallel_safe(&unsafe_else));
    }

    #[test]
    fn scheduling_is_unsuitable() {
        let body = stmt(StmtKind::Block(vec![stmt(StmtKind::Schedule {
            event: "arrival".to_owned(),
            time: expr(ExprKind::Real(1.5)),
            args: vec![],
        })]));
        assert!(!body_is_parallel_safe(&body));
    }

    #[test]
    fn unknown_statement_kinds_are_conservatively_unsuitable() {
        let body = stmt(StmtKind::Block(vec![stmt(StmtKind::Barrier)]));
        assert!(!body_is_parallel_safe(&body));
    }

    #[test]
    fn sequential_policy_ignores_the_verdict() {
        assert_eq!(SequentialPolicy.strategy(true), EmissionStrategy::Sequential);
        assert_eq!(
            SequentialPolicy.strategy(false),
            EmissionStrategy::Sequential
        );
    }
}
