//! Statement and control-flow lowering.
//!
//! Error propagation is deliberately asymmetric: undefined names, type
//! mismatches, and redeclarations abort the whole pass, while the
//! not-yet-implemented constructs (file I/O, object semantics, set
//! iteration) degrade to a warning and a no-op for that node.

use inkwell::values::{BasicValueEnum, FloatValue};
use inkwell::IntPredicate;
use tracing::{info, warn};

use desim_ir::ast::{Expr, Stmt, StmtKind};
use desim_ir::DataType;

use crate::error::CodegenError;
use crate::module::Generator;
use crate::parallel::EmissionStrategy;
use crate::symbols::SymbolInfo;

impl<'ll> Generator<'ll> {
    /// Lower one statement into the current insertion point.
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.compile_stmt(stmt)?;
                }
                Ok(())
            }

            StmtKind::VarDecl { name, ty, init } => self.compile_var_decl(name, *ty, init.as_ref()),
            StmtKind::Assign { target, value } => self.compile_assign(stmt, target, value),
            StmtKind::Write(expr) => self.compile_write(expr),
            StmtKind::Return(value) => self.compile_return(value.as_ref()),

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => self.compile_if(condition, then_branch, else_branch.as_deref()),
            StmtKind::While { condition, body } => self.compile_while(condition, body),
            StmtKind::For {
                variable,
                start,
                end,
                step,
                body,
            } => self.compile_for(variable, start, end, step.as_ref(), body),
            StmtKind::ForEach { variable, body, .. } => {
                self.compile_for_each(stmt, variable, body)
            }

            StmtKind::EntityDecl { name, attributes } => self.compile_entity_decl(name, attributes),
            StmtKind::EventDecl { name, params } => {
                self.symbols.add_event(name, params.clone())
            }
            StmtKind::FunctionDecl { .. } => {
                // Function declarations are emitted from the preamble.
                Ok(())
            }
            StmtKind::ClassDecl {
                name,
                parent,
                members,
            } => self.compile_class_decl(name, parent.as_deref(), members),
            StmtKind::MethodDecl { name, .. } => {
                warn!(line = stmt.pos.line, "method '{name}' declared outside a class, skipped");
                Ok(())
            }
            StmtKind::ObjectCreation {
                variable, class, ..
            } => self.compile_object_creation(variable, class),
            StmtKind::MethodCall { object, method, .. } => {
                if self.symbols.lookup(object).is_none() {
                    return Err(CodegenError::undefined_class_or_object(object));
                }
                info!(line = stmt.pos.line, "method call {object}.{method} is not implemented");
                Ok(())
            }

            StmtKind::Schedule { event, time, .. } => self.compile_schedule(event, time),
            StmtKind::AdvanceTime(delta) => self.compile_advance_time(delta),

            StmtKind::WriteToFile { .. } => {
                warn!(line = stmt.pos.line, "WRITE TO FILE is not implemented");
                Ok(())
            }
            StmtKind::OpenFile { .. } => {
                warn!(line = stmt.pos.line, "OPEN FILE is not implemented");
                Ok(())
            }
            StmtKind::CloseFile { .. } => {
                warn!(line = stmt.pos.line, "CLOSE FILE is not implemented");
                Ok(())
            }
            StmtKind::ReadFromFile { .. } => {
                warn!(line = stmt.pos.line, "READ FROM FILE is not implemented");
                Ok(())
            }
            StmtKind::StartSimulation => {
                info!(line = stmt.pos.line, "START SIMULATION encountered");
                Ok(())
            }

            StmtKind::Parallel(body) => self.compile_parallel(body),
            StmtKind::ParallelSections(sections) => {
                info!("lowering parallel sections sequentially");
                for (index, section) in sections.iter().enumerate() {
                    info!(section = index, "lowering section");
                    self.compile_stmt(section)?;
                }
                Ok(())
            }
            StmtKind::Critical(body) => {
                info!("lowering critical section sequentially");
                self.compile_stmt(body)
            }
            StmtKind::Barrier => {
                info!("barrier has no sequential lowering");
                Ok(())
            }
            StmtKind::Master(body) => {
                info!("lowering master region sequentially");
                self.compile_stmt(body)
            }
            StmtKind::Single(body) => {
                info!("lowering single region sequentially");
                self.compile_stmt(body)
            }
            StmtKind::Threadprivate(name) => {
                if self.symbols.lookup(name).is_some() {
                    info!("variable '{name}' marked thread-private (no lowering)");
                } else {
                    warn!("variable '{name}' not found for THREADPRIVATE");
                }
                Ok(())
            }
        }
    }

    // -- Declarations & assignment --

    fn compile_var_decl(
        &mut self,
        name: &str,
        ty: DataType,
        init: Option<&Expr>,
    ) -> Result<(), CodegenError> {
        self.symbols.add(name, ty)?;

        let Some(llvm_ty) = self.cx.basic_type(ty) else {
            warn!("variable '{name}' has no storable type");
            return Ok(());
        };
        let slot = self.builder.alloca(llvm_ty, name);
        self.symbols.set_storage(name, slot);

        if let Some(init) = init {
            if let Some(value) = self.compile_expr(init)? {
                self.builder.store(slot, value);
                self.symbols.mark_initialized(name);
                self.debug_log_variable(name, value);
            }
        }
        Ok(())
    }

    /// Assignment doubles as implicit declaration: an unknown target is
    /// declared with its type inferred from the lowered right-hand side.
    fn compile_assign(
        &mut self,
        stmt: &Stmt,
        target: &str,
        value: &Expr,
    ) -> Result<(), CodegenError> {
        let Some(value) = self.compile_expr(value)? else {
            warn!(line = stmt.pos.line, "assignment to '{target}' has no value");
            return Ok(());
        };

        if self.symbols.lookup(target).is_none() {
            let inferred = self.cx.infer_data_type(value);
            self.symbols.add(target, inferred)?;
            let Some(llvm_ty) = self.cx.basic_type(inferred) else {
                return Ok(());
            };
            let slot = self.builder.alloca(llvm_ty, target);
            self.symbols.set_storage(target, slot);
            self.builder.store(slot, value);
        } else {
            let Some(slot) = self.symbols.lookup(target).and_then(|s| s.storage) else {
                warn!(line = stmt.pos.line, "'{target}' has no storage, assignment skipped");
                return Ok(());
            };
            self.builder.store(slot, value);
        }

        self.symbols.mark_initialized(target);
        self.debug_log_variable(target, value);
        Ok(())
    }

    // -- I/O --

    fn compile_write(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        let Some(value) = self.compile_expr(expr)? else {
            return Ok(());
        };
        let printf = self.cx.printf();

        // Format selection mirrors the type mapping; sub-32-bit integers
        // (comparison results) are widened for the variadic call.
        let (format, value): (&str, BasicValueEnum<'ll>) = match value {
            BasicValueEnum::FloatValue(_) => ("%.2f\n", value),
            BasicValueEnum::PointerValue(_) => ("%s\n", value),
            BasicValueEnum::IntValue(v) => {
                let i32_ty = self.cx.llcx().i32_type();
                let widened = if v.get_type().get_bit_width() < 32 {
                    self.builder.zext(v, i32_ty, "wide").into()
                } else {
                    value
                };
                ("%d\n", widened)
            }
            _ => ("%d\n", value),
        };

        let format = self.builder.global_string_ptr(format, "fmt");
        self.builder
            .call(printf, &[format.into(), value.into()], "");
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&Expr>) -> Result<(), CodegenError> {
        match value {
            Some(expr) => match self.compile_expr(expr)? {
                Some(value) => self.builder.ret(value),
                None => self.builder.ret_void(),
            },
            None => self.builder.ret_void(),
        }
        Ok(())
    }

    // -- Control flow --

    fn condition_value(
        &mut self,
        condition: &Expr,
        context: &'static str,
    ) -> Result<inkwell::values::IntValue<'ll>, CodegenError> {
        match self.compile_value(condition, context)? {
            BasicValueEnum::IntValue(v) => Ok(v),
            _ => Err(CodegenError::TypeMismatch { context }),
        }
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), CodegenError> {
        let cond = self.condition_value(condition, "IF condition")?;
        let function = self.function();

        let then_block = self.cx.append_block(function, "then");
        let merge_block = self.cx.append_block(function, "merge");

        if else_branch.is_some() {
            let else_block = self.cx.append_block(function, "else");
            self.builder.cond_br(cond, then_block, else_block);

            self.builder.position_at_end(then_block);
            self.compile_stmt(then_branch)?;
            // A branch ending in `return` keeps its terminator.
            if !self.builder.has_terminator() {
                self.builder.br(merge_block);
            }

            self.builder.position_at_end(else_block);
            if let Some(else_branch) = else_branch {
                self.compile_stmt(else_branch)?;
            }
            if !self.builder.has_terminator() {
                self.builder.br(merge_block);
            }
        } else {
            self.builder.cond_br(cond, then_block, merge_block);

            self.builder.position_at_end(then_block);
            self.compile_stmt(then_branch)?;
            if !self.builder.has_terminator() {
                self.builder.br(merge_block);
            }
        }

        self.builder.position_at_end(merge_block);
        Ok(())
    }

    fn compile_while(&mut self, condition: &Expr, body: &Stmt) -> Result<(), CodegenError> {
        let function = self.function();
        let cond_block = self.cx.append_block(function, "while_cond");
        let body_block = self.cx.append_block(function, "while_body");
        let exit_block = self.cx.append_block(function, "while_exit");

        self.builder.br(cond_block);

        self.builder.position_at_end(cond_block);
        let cond = self.condition_value(condition, "WHILE condition")?;
        self.builder.cond_br(cond, body_block, exit_block);

        self.builder.position_at_end(body_block);
        self.compile_stmt(body)?;
        if !self.builder.has_terminator() {
            self.builder.br(cond_block);
        }

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    /// `FOR v = start TO end [STEP s]`: inclusive upper bound via signed
    /// `<=`, step defaulting to 1. Descending ranges are not supported by
    /// this comparison direction.
    fn compile_for(
        &mut self,
        variable: &str,
        start: &Expr,
        end: &Expr,
        step: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), CodegenError> {
        let i32_ty = self.cx.llcx().i32_type();

        // The loop variable defaults to INT and may be reused if declared.
        if self.symbols.lookup(variable).is_none() {
            self.symbols.add(variable, DataType::Int)?;
            let slot = self.builder.alloca(i32_ty.into(), variable);
            self.symbols.set_storage(variable, slot);
        }
        let Some(slot) = self.symbols.lookup(variable).and_then(|s| s.storage) else {
            return Err(CodegenError::TypeMismatch {
                context: "FOR loop variable",
            });
        };

        let start = self.compile_value(start, "FOR start bound")?;
        self.builder.store(slot, start);
        self.symbols.mark_initialized(variable);

        let function = self.function();
        let cond_block = self.cx.append_block(function, "for_cond");
        let body_block = self.cx.append_block(function, "for_body");
        let incr_block = self.cx.append_block(function, "for_incr");
        let exit_block = self.cx.append_block(function, "for_exit");

        self.builder.br(cond_block);

        // Condition: current <= end, end re-evaluated each iteration.
        self.builder.position_at_end(cond_block);
        let current = self
            .builder
            .load(i32_ty.into(), slot, variable)
            .into_int_value();
        let BasicValueEnum::IntValue(end) = self.compile_value(end, "FOR end bound")? else {
            return Err(CodegenError::TypeMismatch {
                context: "FOR end bound",
            });
        };
        let cmp = self.builder.icmp(IntPredicate::SLE, current, end, "for_cmp");
        self.builder.cond_br(cmp, body_block, exit_block);

        self.builder.position_at_end(body_block);
        self.compile_stmt(body)?;
        if !self.builder.has_terminator() {
            self.builder.br(incr_block);
        }

        self.builder.position_at_end(incr_block);
        let step = match step {
            Some(step) => match self.compile_value(step, "FOR step")? {
                BasicValueEnum::IntValue(v) => v,
                _ => {
                    return Err(CodegenError::TypeMismatch {
                        context: "FOR step",
                    })
                }
            },
            None => i32_ty.const_int(1, false),
        };
        let current = self
            .builder
            .load(i32_ty.into(), slot, variable)
            .into_int_value();
        let next = self.builder.add(current, step, "next");
        self.builder.store(slot, next.into());
        self.builder.br(cond_block);

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    /// Collection iteration is not implemented: the loop variable is
    /// registered and the body lowered exactly once.
    fn compile_for_each(
        &mut self,
        stmt: &Stmt,
        variable: &str,
        body: &Stmt,
    ) -> Result<(), CodegenError> {
        if self.symbols.lookup(variable).is_none() {
            self.symbols.add(variable, DataType::Int)?;
            let slot = self
                .builder
                .alloca(self.cx.llcx().i32_type().into(), variable);
            self.symbols.set_storage(variable, slot);
        }
        warn!(line = stmt.pos.line, "FOR EACH iteration is not implemented; body lowered once");
        self.compile_stmt(body)
    }

    // -- Structural declarations --

    fn compile_entity_decl(
        &mut self,
        name: &str,
        attributes: &[desim_ir::ast::Attribute],
    ) -> Result<(), CodegenError> {
        self.symbols.add_entity(name, attributes.to_vec())?;

        let fields: Vec<_> = attributes
            .iter()
            .filter_map(|attr| self.cx.basic_type(attr.ty))
            .collect();
        self.cx.register_entity_struct(name, &fields);
        Ok(())
    }

    fn compile_class_decl(
        &mut self,
        name: &str,
        parent: Option<&str>,
        members: &[Stmt],
    ) -> Result<(), CodegenError> {
        self.symbols.add_class(name, parent)?;

        let Some(symbol) = self.symbols.lookup_mut(name) else {
            return Ok(());
        };
        let SymbolInfo::Class {
            members: member_table,
            methods: method_table,
            ..
        } = &mut symbol.info
        else {
            return Ok(());
        };

        for member in members {
            match &member.kind {
                StmtKind::VarDecl { name, ty, .. } => {
                    member_table.add_member(name, *ty)?;
                }
                StmtKind::MethodDecl {
                    name,
                    params,
                    return_ty,
                    ..
                } => {
                    method_table.add_method(name, *return_ty, params.clone())?;
                }
                _ => {
                    warn!(line = member.pos.line, "unsupported class member, skipped");
                }
            }
        }
        Ok(())
    }

    /// Constructor semantics are not implemented: the object variable gets
    /// an opaque pointer slot and nothing else.
    fn compile_object_creation(
        &mut self,
        variable: &str,
        class: &str,
    ) -> Result<(), CodegenError> {
        if self.symbols.lookup(class).is_none() {
            return Err(CodegenError::undefined_class_or_object(class));
        }

        self.symbols.add(variable, DataType::Void)?;
        let Some(ptr_ty) = self.cx.basic_type(DataType::Text) else {
            return Ok(());
        };
        let slot = self.builder.alloca(ptr_ty, variable);
        self.symbols.set_storage(variable, slot);
        Ok(())
    }

    // -- Simulation runtime calls --

    fn to_f64(&self, value: BasicValueEnum<'ll>) -> FloatValue<'ll> {
        match value {
            BasicValueEnum::FloatValue(v) => v,
            BasicValueEnum::IntValue(v) => {
                self.builder.sitofp(v, self.cx.llcx().f64_type(), "tofp")
            }
            _ => self.cx.llcx().f64_type().const_float(0.0),
        }
    }

    /// `SCHEDULE` lowers to a call into the (stub) simulation runtime;
    /// the real event queue is an external collaborator.
    fn compile_schedule(&mut self, event: &str, time: &Expr) -> Result<(), CodegenError> {
        let llcx = self.cx.llcx();
        let fn_ty = llcx.void_type().fn_type(
            &[
                llcx.ptr_type(inkwell::AddressSpace::default()).into(),
                llcx.f64_type().into(),
            ],
            false,
        );
        let callee = self.cx.get_or_declare("desim_sim_schedule", fn_ty);

        let time = self.compile_value(time, "SCHEDULE time")?;
        let time = self.to_f64(time);
        let event = self.builder.global_string_ptr(event, "event");
        self.builder
            .call(callee, &[event.into(), time.into()], "");
        Ok(())
    }

    fn compile_advance_time(&mut self, delta: &Expr) -> Result<(), CodegenError> {
        let llcx = self.cx.llcx();
        let fn_ty = llcx
            .void_type()
            .fn_type(&[llcx.f64_type().into()], false);
        let callee = self.cx.get_or_declare("desim_sim_advance", fn_ty);

        let delta = self.compile_value(delta, "ADVANCE TIME delta")?;
        let delta = self.to_f64(delta);
        self.builder.call(callee, &[delta.into()], "");
        Ok(())
    }

    // -- Parallel regions --

    /// The suitability predicate is advisory: its verdict is logged, and
    /// the configured policy decides the emission strategy. The only
    /// strategy implemented is sequential.
    fn compile_parallel(&mut self, body: &Stmt) -> Result<(), CodegenError> {
        let suitable = crate::parallel::body_is_parallel_safe(body);
        if suitable {
            info!("parallel region body is suitable for parallelization");
        } else {
            warn!("parallel region body performs I/O or simulation control; lowering sequentially");
        }

        match self.policy.strategy(suitable) {
            EmissionStrategy::Sequential => self.compile_stmt(body),
        }
    }
}
