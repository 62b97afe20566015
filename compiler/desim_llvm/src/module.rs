//! The code generator: program driver and engine API.
//!
//! A [`Generator`] owns the LLVM module and builder for one compilation
//! unit, plus the flat symbol table. It optionally shares a
//! [`DebugHandle`] with the runtime hook; the handle is borrowed state,
//! never copied, so compile-time records and runtime breakpoint checks
//! see the same context.

use std::io;
use std::path::Path;

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context;
use inkwell::execution_engine::ExecutionEngine;
use inkwell::values::{BasicValueEnum, FunctionValue};
use tracing::instrument;

use desim_debug::{DebugHandle, HookToken};
use desim_ir::ast::{Program, StmtKind};

use crate::builder::Builder;
use crate::context::CodegenCx;
use crate::error::CodegenError;
use crate::parallel::{ParallelPolicy, SequentialPolicy};
use crate::symbols::SymbolTable;

/// Saved emission context for one function being emitted.
///
/// Frames form an explicit stack so nested function emission is safe to
/// arbitrary depth, not just one saved level.
pub(crate) struct EmitFrame<'ll> {
    pub(crate) function: Option<FunctionValue<'ll>>,
    pub(crate) name: String,
    pub(crate) block: Option<BasicBlock<'ll>>,
}

/// Code generator for one compilation unit.
pub struct Generator<'ll> {
    pub(crate) cx: CodegenCx<'ll>,
    pub(crate) builder: Builder<'ll>,
    pub(crate) symbols: SymbolTable<'ll>,
    pub(crate) debug: Option<DebugHandle>,
    pub(crate) policy: Box<dyn ParallelPolicy>,
    pub(crate) frames: Vec<EmitFrame<'ll>>,
    pub(crate) current_function: Option<FunctionValue<'ll>>,
    pub(crate) current_function_name: String,
    pub(crate) engine: Option<ExecutionEngine<'ll>>,
    pub(crate) hook_token: Option<HookToken>,
}

impl<'ll> Generator<'ll> {
    /// Create a generator with no debug instrumentation.
    pub fn new(llcx: &'ll Context, module_name: &str) -> Self {
        Generator {
            cx: CodegenCx::new(llcx, module_name),
            builder: Builder::new(llcx),
            symbols: SymbolTable::new(),
            debug: None,
            policy: Box::new(SequentialPolicy),
            frames: Vec::new(),
            current_function: None,
            current_function_name: String::new(),
            engine: None,
            hook_token: None,
        }
    }

    /// Create a generator that threads debug instrumentation into the
    /// emitted code. Declares the hook symbol up front.
    pub fn with_debug(llcx: &'ll Context, module_name: &str, debug: DebugHandle) -> Self {
        let generator = Generator::new(llcx, module_name);
        generator.cx.declare_debug_hook();
        Generator {
            debug: Some(debug),
            ..generator
        }
    }

    pub fn debug_handle(&self) -> Option<&DebugHandle> {
        self.debug.as_ref()
    }

    pub fn set_debug_handle(&mut self, debug: Option<DebugHandle>) {
        if debug.is_some() {
            self.cx.declare_debug_hook();
        }
        self.debug = debug;
    }

    /// Replace the parallel-region emission policy.
    pub fn set_parallel_policy(&mut self, policy: Box<dyn ParallelPolicy>) {
        self.policy = policy;
    }

    #[inline]
    pub fn cx(&self) -> &CodegenCx<'ll> {
        &self.cx
    }

    // -- Program driver --

    /// Lower a whole program into the module and verify it.
    ///
    /// Declarations in the preamble are emitted as standalone functions or
    /// registered in the symbol table; the remaining statements become the
    /// body of the implicit `main` entry function, which returns `i32 0`.
    #[instrument(skip(self, program), level = "debug")]
    pub fn generate(&mut self, program: &Program) -> Result<(), CodegenError> {
        let main_ty = self.cx.llcx().i32_type().fn_type(&[], false);
        let main = self.cx.llmod().add_function("main", main_ty, None);
        let entry = self.cx.append_block(main, "entry");
        self.builder.position_at_end(entry);
        self.current_function = Some(main);
        self.current_function_name = "main".to_owned();

        for decl in &program.preamble {
            match &decl.kind {
                StmtKind::FunctionDecl { .. } => self.compile_function(decl)?,
                StmtKind::EntityDecl { .. }
                | StmtKind::EventDecl { .. }
                | StmtKind::ClassDecl { .. } => self.compile_stmt(decl)?,
                _ => {
                    tracing::warn!(line = decl.pos.line, "unexpected preamble statement, skipped");
                }
            }
        }

        for stmt in &program.main {
            self.compile_stmt(stmt)?;
        }

        if !self.builder.has_terminator() {
            self.builder
                .ret(self.cx.llcx().i32_type().const_int(0, false).into());
        }

        self.cx
            .llmod()
            .verify()
            .map_err(|message| CodegenError::ModuleVerification {
                message: message.to_string(),
            })
    }

    // -- IR output --

    /// Render the module as textual LLVM IR.
    pub fn ir_to_string(&self) -> String {
        self.cx.llmod().print_to_string().to_string()
    }

    /// Write textual LLVM IR to a file.
    pub fn write_ir_to_file(&self, path: &Path) -> io::Result<()> {
        self.cx
            .llmod()
            .print_to_file(path)
            .map_err(|message| io::Error::other(message.to_string()))
    }

    /// Print textual LLVM IR to stdout.
    pub fn print_ir(&self) {
        print!("{}", self.ir_to_string());
    }

    // -- Emission frames --

    /// Save the current emission context and switch to `function`.
    pub(crate) fn push_frame(&mut self, function: FunctionValue<'ll>, name: &str) {
        self.frames.push(EmitFrame {
            function: self.current_function,
            name: std::mem::take(&mut self.current_function_name),
            block: self.builder.current_block(),
        });
        self.current_function = Some(function);
        self.current_function_name = name.to_owned();
    }

    /// Restore the caller's emission context.
    pub(crate) fn pop_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.current_function = frame.function;
            self.current_function_name = frame.name;
            if let Some(block) = frame.block {
                self.builder.position_at_end(block);
            }
        }
    }

    /// The function instructions are currently emitted into.
    pub(crate) fn function(&self) -> FunctionValue<'ll> {
        self.current_function
            .expect("lowering outside of a function")
    }

    // -- Debug instrumentation helpers --

    /// Run a closure against the shared debug context, if any.
    pub(crate) fn with_debug_ctx<R>(
        &self,
        f: impl FnOnce(&mut desim_debug::DebugContext) -> R,
    ) -> Option<R> {
        self.debug.as_ref().map(|handle| f(&mut handle.lock()))
    }

    /// Record a variable's (possibly constant) value in the debug stream.
    pub(crate) fn debug_log_variable(&self, name: &str, value: BasicValueEnum<'ll>) {
        if self.debug.is_none() {
            return;
        }
        let (ty, rendered) = match value {
            BasicValueEnum::IntValue(v) => (
                "INT",
                v.get_sign_extended_constant()
                    .map_or_else(|| "runtime_value".to_owned(), |c| c.to_string()),
            ),
            BasicValueEnum::FloatValue(v) => (
                "REAL",
                v.get_constant()
                    .map_or_else(|| "runtime_value".to_owned(), |(c, _)| format!("{c:.6}")),
            ),
            BasicValueEnum::PointerValue(_) => ("TEXT", "string".to_owned()),
            _ => ("unknown", "runtime_value".to_owned()),
        };
        self.with_debug_ctx(|ctx| ctx.log_variable(name, ty, &rendered));
    }
}
