//! Statement and declaration nodes.

use crate::{DataType, Pos};

use super::expr::Expr;
use super::{Attribute, Param};

/// A statement node with its source position.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub pos: Pos,
}

impl Stmt {
    pub fn new(kind: StmtKind, pos: Pos) -> Self {
        Stmt { kind, pos }
    }
}

/// Statement variants.
///
/// Declarations appear here too: the surface language allows entity, event,
/// function, and class declarations both in the preamble and (for some of
/// them) inline in the main body.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// A nested statement list.
    Block(Vec<Stmt>),
    /// `INT x` / `REAL y = expr` — declared type, optional initializer.
    VarDecl {
        name: String,
        ty: DataType,
        init: Option<Expr>,
    },
    /// `x = expr`. An unknown target is implicitly declared with its type
    /// inferred from the right-hand side.
    Assign { target: String, value: Expr },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    /// `FOR v = start TO end [STEP s]` — inclusive upper bound, default
    /// step 1, loop variable defaults to INT.
    For {
        variable: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `FOR EACH v IN set` — iteration is not implemented; the body is
    /// lowered exactly once with a diagnostic.
    ForEach {
        variable: String,
        set: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    /// `WRITE expr` — prints the value and a newline.
    Write(Expr),
    /// `WRITE expr TO FILE "name"` — accepted, not implemented.
    WriteToFile { expr: Expr, filename: String },
    /// `OPEN FILE "name" AS id` — accepted, not implemented.
    OpenFile { filename: String, file_id: i32 },
    /// `CLOSE FILE id` — accepted, not implemented.
    CloseFile { file_id: i32 },
    /// `READ v FROM FILE id` — accepted, not implemented.
    ReadFromFile { variable: String, file_id: i32 },
    /// `START SIMULATION` — accepted, not implemented.
    StartSimulation,
    /// `SCHEDULE event AT time` — lowered to a runtime stub call.
    Schedule {
        event: String,
        time: Expr,
        args: Vec<Expr>,
    },
    /// `ADVANCE TIME BY delta` — lowered to a runtime stub call.
    AdvanceTime(Expr),
    EntityDecl {
        name: String,
        attributes: Vec<Attribute>,
    },
    EventDecl { name: String, params: Vec<Param> },
    FunctionDecl {
        name: String,
        params: Vec<Param>,
        return_ty: DataType,
        body: Box<Stmt>,
    },
    ClassDecl {
        name: String,
        parent: Option<String>,
        members: Vec<Stmt>,
    },
    MethodDecl {
        name: String,
        params: Vec<Param>,
        return_ty: DataType,
        body: Box<Stmt>,
        is_override: bool,
    },
    /// `CREATE obj AS ClassName(...)` — registers the variable, allocates
    /// an opaque slot; constructor semantics are not implemented.
    ObjectCreation {
        variable: String,
        class: String,
        args: Vec<Expr>,
    },
    /// `CALL obj.method(...)` — accepted, not implemented.
    MethodCall {
        object: String,
        method: String,
        args: Vec<Expr>,
    },
    /// Parallel region; body is analyzed for suitability but always
    /// lowered sequentially.
    Parallel(Box<Stmt>),
    ParallelSections(Vec<Stmt>),
    Critical(Box<Stmt>),
    Barrier,
    Master(Box<Stmt>),
    Single(Box<Stmt>),
    Threadprivate(String),
}
