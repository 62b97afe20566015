//! Function emission.

use inkwell::types::BasicTypeEnum;
use tracing::instrument;

use desim_ir::ast::{Stmt, StmtKind};
use desim_ir::DataType;

use crate::error::CodegenError;
use crate::module::Generator;

impl<'ll> Generator<'ll> {
    /// Emit a standalone function from its declaration.
    ///
    /// The caller's emission context (current function + insertion point)
    /// is pushed onto the frame stack and restored afterwards, so nested
    /// emission is safe to arbitrary depth.
    #[instrument(skip(self, decl), level = "debug")]
    pub(crate) fn compile_function(&mut self, decl: &Stmt) -> Result<(), CodegenError> {
        let StmtKind::FunctionDecl {
            name,
            params,
            return_ty,
            body,
        } = &decl.kind
        else {
            return Ok(());
        };

        self.symbols
            .add_function(name, *return_ty, params.clone())?;

        let param_types: Vec<BasicTypeEnum<'ll>> = params
            .iter()
            .filter_map(|param| self.cx.basic_type(param.ty))
            .collect();
        let fn_ty = self.cx.fn_type(*return_ty, &param_types);
        let function = self.cx.llmod().add_function(name, fn_ty, None);

        let entry = self.cx.append_block(function, "entry");
        self.push_frame(function, name);
        self.builder.position_at_end(entry);

        // Parameters get stack slots and are stored from the incoming
        // arguments. The flat symbol table means a parameter name may
        // already be bound; in that case the existing binding's storage
        // is rebound to this function's slot.
        for (index, param) in params.iter().enumerate() {
            let Some(param_ty) = self.cx.basic_type(param.ty) else {
                continue;
            };
            let _ = self.symbols.add(&param.name, param.ty);
            let slot = self.builder.alloca(param_ty, &param.name);
            self.symbols.set_storage(&param.name, slot);

            if let Some(arg) = function.get_nth_param(index as u32) {
                self.builder.store(slot, arg);
            }
            self.symbols.mark_initialized(&param.name);
        }

        self.compile_stmt(body)?;

        // Fallthrough termination: a body whose final block has no
        // terminator returns a type-appropriate default.
        if !self.builder.has_terminator() {
            match self.cx.default_value(*return_ty) {
                Some(default) => self.builder.ret(default),
                None => self.builder.ret_void(),
            }
        }

        self.pop_frame();
        Ok(())
    }

    /// Return type of a declared function, if known.
    pub fn declared_return_type(&self, name: &str) -> Option<DataType> {
        self.symbols.lookup(name).map(|symbol| symbol.ty)
    }
}
