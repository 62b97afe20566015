//! Expression lowering.
//!
//! Lowering an expression yields `Ok(Some(value))`, `Ok(None)` for
//! value-less results (void calls, the recognized-but-unlowered set
//! forms), or `Err` for the unrecoverable failures of §errors. The
//! distinction matters: `Ok(None)` degrades to a per-construct no-op at
//! the statement level, while `Err` aborts the whole generation pass.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};
use inkwell::{FloatPredicate, IntPredicate};
use tracing::warn;

use desim_ir::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use desim_ir::DataType;

use crate::error::CodegenError;
use crate::module::Generator;

/// Fixed signature of a built-in library routine.
struct StdlibSig {
    symbol: &'static str,
    params: &'static [DataType],
    ret: DataType,
}

/// Library routines callable without declaration, by surface name.
fn stdlib_signature(name: &str) -> Option<StdlibSig> {
    match name {
        "random" => Some(StdlibSig {
            symbol: "desim_rand_uniform",
            params: &[],
            ret: DataType::Real,
        }),
        "uniform" => Some(StdlibSig {
            symbol: "desim_rand_uniform_int",
            params: &[DataType::Int, DataType::Int],
            ret: DataType::Int,
        }),
        "normal" => Some(StdlibSig {
            symbol: "desim_rand_normal",
            params: &[DataType::Real, DataType::Real],
            ret: DataType::Real,
        }),
        "exponential" => Some(StdlibSig {
            symbol: "desim_rand_exponential",
            params: &[DataType::Real],
            ret: DataType::Real,
        }),
        "poisson" => Some(StdlibSig {
            symbol: "desim_rand_poisson",
            params: &[DataType::Real],
            ret: DataType::Int,
        }),
        "seed" => Some(StdlibSig {
            symbol: "desim_rand_seed",
            params: &[DataType::Int],
            ret: DataType::Void,
        }),
        _ => None,
    }
}

impl<'ll> Generator<'ll> {
    /// Lower one expression to a typed value.
    pub(crate) fn compile_expr(
        &mut self,
        expr: &Expr,
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        match &expr.kind {
            ExprKind::Int(value) => Ok(Some(
                self.cx
                    .llcx()
                    .i32_type()
                    .const_int(*value as u64, true)
                    .into(),
            )),
            ExprKind::Real(value) => {
                Ok(Some(self.cx.llcx().f64_type().const_float(*value).into()))
            }
            ExprKind::Text(value) => {
                Ok(Some(self.builder.global_string_ptr(value, "str").into()))
            }

            ExprKind::Ident(name) => self.compile_ident(name),

            ExprKind::Binary { op, left, right } => self.compile_binary(*op, left, right),
            ExprKind::Unary { op, operand } => self.compile_unary(*op, operand),

            ExprKind::Call { name, args } => self.compile_call(expr, name, args),
            ExprKind::StdlibCall { name, args } => self.compile_stdlib_call(expr, name, args),

            // Set forms are recognized but not lowered: a deliberate gap.
            ExprKind::SetLiteral(_) => {
                warn!(line = expr.pos.line, "set literals are not implemented");
                Ok(None)
            }
            ExprKind::SetOperation { .. } => {
                warn!(line = expr.pos.line, "set operations are not implemented");
                Ok(None)
            }
        }
    }

    /// Lower an expression that must produce a value.
    pub(crate) fn compile_value(
        &mut self,
        expr: &Expr,
        context: &'static str,
    ) -> Result<BasicValueEnum<'ll>, CodegenError> {
        self.compile_expr(expr)?
            .ok_or(CodegenError::TypeMismatch { context })
    }

    fn compile_ident(
        &mut self,
        name: &str,
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        let Some(symbol) = self.symbols.lookup(name) else {
            return Err(CodegenError::undefined_variable(name));
        };
        if !symbol.initialized {
            return Err(CodegenError::uninitialized_read(name));
        }
        let Some(storage) = symbol.storage else {
            return Err(CodegenError::uninitialized_read(name));
        };
        let Some(ty) = self.cx.basic_type(symbol.ty) else {
            return Err(CodegenError::undefined_variable(name));
        };
        Ok(Some(self.builder.load(ty, storage, name)))
    }

    /// Operator selection is type-directed: identical operand types are
    /// required (no implicit coercion), then float operands pick the
    /// ordered float variants and integer operands the signed ones.
    fn compile_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        let Some(lhs) = self.compile_expr(left)? else {
            return Ok(None);
        };
        let Some(rhs) = self.compile_expr(right)? else {
            return Ok(None);
        };

        if lhs.get_type() != rhs.get_type() {
            return Err(CodegenError::TypeMismatch {
                context: "binary expression",
            });
        }

        if let (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) = (lhs, rhs) {
            let b = &self.builder;
            let value: BasicValueEnum<'ll> = match op {
                BinaryOp::Add => b.fadd(l, r, "fadd").into(),
                BinaryOp::Sub => b.fsub(l, r, "fsub").into(),
                BinaryOp::Mul => b.fmul(l, r, "fmul").into(),
                BinaryOp::Div => b.fdiv(l, r, "fdiv").into(),
                BinaryOp::Eq => b.fcmp(FloatPredicate::OEQ, l, r, "feq").into(),
                BinaryOp::NotEq => b.fcmp(FloatPredicate::ONE, l, r, "fne").into(),
                BinaryOp::Lt => b.fcmp(FloatPredicate::OLT, l, r, "flt").into(),
                BinaryOp::Gt => b.fcmp(FloatPredicate::OGT, l, r, "fgt").into(),
                BinaryOp::LtEq => b.fcmp(FloatPredicate::OLE, l, r, "fle").into(),
                BinaryOp::GtEq => b.fcmp(FloatPredicate::OGE, l, r, "fge").into(),
                BinaryOp::And | BinaryOp::Or => {
                    return Err(CodegenError::TypeMismatch {
                        context: "logical operator on REAL operands",
                    })
                }
            };
            return Ok(Some(value));
        }

        if let (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) = (lhs, rhs) {
            let b = &self.builder;
            let value: BasicValueEnum<'ll> = match op {
                BinaryOp::Add => b.add(l, r, "add").into(),
                BinaryOp::Sub => b.sub(l, r, "sub").into(),
                BinaryOp::Mul => b.mul(l, r, "mul").into(),
                BinaryOp::Div => b.sdiv(l, r, "div").into(),
                BinaryOp::Eq => b.icmp(IntPredicate::EQ, l, r, "eq").into(),
                BinaryOp::NotEq => b.icmp(IntPredicate::NE, l, r, "ne").into(),
                BinaryOp::Lt => b.icmp(IntPredicate::SLT, l, r, "lt").into(),
                BinaryOp::Gt => b.icmp(IntPredicate::SGT, l, r, "gt").into(),
                BinaryOp::LtEq => b.icmp(IntPredicate::SLE, l, r, "le").into(),
                BinaryOp::GtEq => b.icmp(IntPredicate::SGE, l, r, "ge").into(),
                BinaryOp::And => b.and(l, r, "and").into(),
                BinaryOp::Or => b.or(l, r, "or").into(),
            };
            return Ok(Some(value));
        }

        // Same-typed pointers (TEXT, SET): no operators are defined.
        Err(CodegenError::TypeMismatch {
            context: "binary expression",
        })
    }

    fn compile_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        let Some(value) = self.compile_expr(operand)? else {
            return Ok(None);
        };
        match (op, value) {
            (UnaryOp::Not, BasicValueEnum::IntValue(v)) => {
                Ok(Some(self.builder.not(v, "not").into()))
            }
            (UnaryOp::Minus, BasicValueEnum::IntValue(v)) => {
                Ok(Some(self.builder.ineg(v, "neg").into()))
            }
            (UnaryOp::Minus, BasicValueEnum::FloatValue(v)) => {
                Ok(Some(self.builder.fneg(v, "fneg").into()))
            }
            _ => Err(CodegenError::TypeMismatch {
                context: "unary expression",
            }),
        }
    }

    /// Call of a user-declared function: the callee must already exist in
    /// the module (declarations are lowered before the main body).
    fn compile_call(
        &mut self,
        expr: &Expr,
        name: &str,
        args: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        let Some(callee) = self.cx.llmod().get_function(name) else {
            return Err(CodegenError::undefined_function(name));
        };

        self.debug_call_entry(expr, name);

        let mut lowered: Vec<BasicMetadataValueEnum<'ll>> = Vec::with_capacity(args.len());
        for arg in args {
            let Some(value) = self.compile_expr(arg)? else {
                warn!(line = expr.pos.line, callee = name, "call argument has no value");
                self.debug_call_exit(name);
                return Ok(None);
            };
            lowered.push(value.into());
        }

        let result = self.builder.call(callee, &lowered, "call");
        self.debug_call_exit(name);
        Ok(result)
    }

    /// Library call with a fixed external signature, declared on demand.
    fn compile_stdlib_call(
        &mut self,
        expr: &Expr,
        name: &str,
        args: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        self.debug_call_entry(expr, name);
        let result = self.compile_stdlib_inner(expr, name, args);
        self.debug_call_exit(name);
        result
    }

    fn compile_stdlib_inner(
        &mut self,
        expr: &Expr,
        name: &str,
        args: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ll>>, CodegenError> {
        // Statistics over collections need SET lowering; degrade.
        if name == "mean" && args.len() == 1 {
            warn!(line = expr.pos.line, "'mean' is not implemented, yielding 0.0");
            return Ok(Some(self.cx.llcx().f64_type().const_float(0.0).into()));
        }

        let Some(sig) = stdlib_signature(name).filter(|sig| sig.params.len() == args.len())
        else {
            return Err(CodegenError::undefined_function(name));
        };

        let param_types: Vec<_> = sig
            .params
            .iter()
            .filter_map(|&ty| self.cx.basic_type(ty))
            .collect();
        let fn_ty = match sig.symbol {
            // The seed state is 64-bit at the runtime boundary.
            "desim_rand_seed" => self
                .cx
                .llcx()
                .void_type()
                .fn_type(&[self.cx.llcx().i64_type().into()], false),
            _ => self.cx.fn_type(sig.ret, &param_types),
        };
        let callee = self.cx.get_or_declare(sig.symbol, fn_ty);

        let mut lowered: Vec<BasicMetadataValueEnum<'ll>> = Vec::with_capacity(args.len());
        for (arg, &expected) in args.iter().zip(sig.params) {
            let value = self.compile_value(arg, "library call argument")?;
            lowered.push(self.adapt_runtime_arg(value, expected, sig.symbol).into());
        }

        Ok(self.builder.call(callee, &lowered, name))
    }

    /// Widen arguments at the runtime-call boundary where the external
    /// contract differs from the language type (seed takes i64).
    fn adapt_runtime_arg(
        &self,
        value: BasicValueEnum<'ll>,
        expected: DataType,
        symbol: &str,
    ) -> BasicValueEnum<'ll> {
        match (symbol, value) {
            ("desim_rand_seed", BasicValueEnum::IntValue(v)) => self
                .builder
                .sext(v, self.cx.llcx().i64_type(), "seed64")
                .into(),
            (_, BasicValueEnum::IntValue(v))
                if matches!(expected, DataType::Real | DataType::Double) =>
            {
                self.builder
                    .sitofp(v, self.cx.llcx().f64_type(), "tofp")
                    .into()
            }
            _ => value,
        }
    }

    // -- Call-site instrumentation --

    /// Entry records plus the synchronous hook call, when instrumentation
    /// is active.
    fn debug_call_entry(&mut self, expr: &Expr, name: &str) {
        if self.debug.is_none() {
            return;
        }
        self.with_debug_ctx(|ctx| {
            ctx.log_call(name, &[]);
            ctx.perf_start(name);
        });

        if let Some(hook) = self.cx.debug_hook() {
            let line = self
                .cx
                .llcx()
                .i32_type()
                .const_int(u64::from(expr.pos.line), false);
            let enclosing = self
                .builder
                .global_string_ptr(&self.current_function_name, "fn_name");
            self.builder
                .call(hook, &[line.into(), enclosing.into()], "");
        }
    }

    fn debug_call_exit(&mut self, name: &str) {
        self.with_debug_ctx(|ctx| {
            ctx.log_return(name, None);
            ctx.perf_end(name);
        });
    }
}
