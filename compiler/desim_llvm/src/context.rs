//! LLVM codegen context: type mapping and declaration cache.
//!
//! Holds the LLVM context reference, the module under construction, and
//! the deterministic mapping from language-level [`DataType`]s to LLVM
//! types. Instruction generation lives in [`crate::builder::Builder`];
//! lowering logic in the `Generator` impls.

use std::cell::RefCell;

use inkwell::basic_block::BasicBlock;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::AddressSpace;
use rustc_hash::FxHashMap;

use desim_ir::DataType;

/// Symbol name of the debug hook trampoline in emitted code.
pub const DEBUG_HOOK_SYMBOL: &str = "desim_debug_hook";

/// Minimal LLVM context wrapper.
pub struct CodegenCx<'ll> {
    /// The LLVM context (owns all LLVM types and values).
    llcx: &'ll Context,
    /// The LLVM module being built.
    llmod: Module<'ll>,
    /// Named entity struct types, keyed by entity name.
    named_structs: RefCell<FxHashMap<String, StructType<'ll>>>,
}

impl<'ll> CodegenCx<'ll> {
    pub fn new(llcx: &'ll Context, module_name: &str) -> Self {
        CodegenCx {
            llcx,
            llmod: llcx.create_module(module_name),
            named_structs: RefCell::new(FxHashMap::default()),
        }
    }

    #[inline]
    pub fn llcx(&self) -> &'ll Context {
        self.llcx
    }

    #[inline]
    pub fn llmod(&self) -> &Module<'ll> {
        &self.llmod
    }

    /// Append a basic block to a function.
    pub fn append_block(&self, function: FunctionValue<'ll>, name: &str) -> BasicBlock<'ll> {
        self.llcx.append_basic_block(function, name)
    }

    // -- Type mapping --

    /// Map a language type to its LLVM value type. `Void` has no value
    /// type and maps to `None`.
    pub fn basic_type(&self, ty: DataType) -> Option<BasicTypeEnum<'ll>> {
        match ty {
            DataType::Int => Some(self.llcx.i32_type().into()),
            DataType::Real | DataType::Double => Some(self.llcx.f64_type().into()),
            DataType::Text | DataType::Alpha | DataType::Set => {
                Some(self.llcx.ptr_type(AddressSpace::default()).into())
            }
            DataType::Void => None,
        }
    }

    /// The aggregate behind a `SET` pointer: `{ ptr elements, i32 size,
    /// i32 capacity }`.
    pub fn set_struct_type(&self) -> StructType<'ll> {
        self.llcx.struct_type(
            &[
                self.llcx.ptr_type(AddressSpace::default()).into(),
                self.llcx.i32_type().into(),
                self.llcx.i32_type().into(),
            ],
            false,
        )
    }

    /// Build a function type from a return type and parameter types.
    pub fn fn_type(
        &self,
        return_ty: DataType,
        params: &[BasicTypeEnum<'ll>],
    ) -> FunctionType<'ll> {
        let params: Vec<BasicMetadataTypeEnum<'ll>> =
            params.iter().map(|&ty| ty.into()).collect();
        match self.basic_type(return_ty) {
            Some(ret) => ret.fn_type(&params, false),
            None => self.llcx.void_type().fn_type(&params, false),
        }
    }

    /// Infer a language type back from an LLVM value, for
    /// assignment-first implicit declarations. Pointers are assumed to be
    /// text.
    pub fn infer_data_type(&self, value: BasicValueEnum<'ll>) -> DataType {
        match value {
            BasicValueEnum::FloatValue(_) => DataType::Real,
            BasicValueEnum::PointerValue(_) => DataType::Text,
            _ => DataType::Int,
        }
    }

    /// Zero/null constant of a type, used for injected default returns.
    pub fn default_value(&self, ty: DataType) -> Option<BasicValueEnum<'ll>> {
        match ty {
            DataType::Int => Some(self.llcx.i32_type().const_int(0, false).into()),
            DataType::Real | DataType::Double => {
                Some(self.llcx.f64_type().const_float(0.0).into())
            }
            DataType::Text | DataType::Alpha | DataType::Set => Some(
                self.llcx
                    .ptr_type(AddressSpace::default())
                    .const_null()
                    .into(),
            ),
            DataType::Void => None,
        }
    }

    // -- Declarations --

    /// Get a function, declaring it on first use.
    pub fn get_or_declare(&self, name: &str, ty: FunctionType<'ll>) -> FunctionValue<'ll> {
        self.llmod
            .get_function(name)
            .unwrap_or_else(|| self.llmod.add_function(name, ty, None))
    }

    /// `printf` with a C-variadic signature, for WRITE lowering.
    pub fn printf(&self) -> FunctionValue<'ll> {
        self.llmod.get_function("printf").unwrap_or_else(|| {
            let ty = self.llcx.i32_type().fn_type(
                &[self.llcx.ptr_type(AddressSpace::default()).into()],
                true,
            );
            self.llmod.add_function("printf", ty, None)
        })
    }

    /// Declare the debug hook: `void desim_debug_hook(i32 line, ptr name)`.
    pub fn declare_debug_hook(&self) -> FunctionValue<'ll> {
        self.get_or_declare(
            DEBUG_HOOK_SYMBOL,
            self.llcx.void_type().fn_type(
                &[
                    self.llcx.i32_type().into(),
                    self.llcx.ptr_type(AddressSpace::default()).into(),
                ],
                false,
            ),
        )
    }

    /// The already-declared debug hook, if instrumentation is active.
    pub fn debug_hook(&self) -> Option<FunctionValue<'ll>> {
        self.llmod.get_function(DEBUG_HOOK_SYMBOL)
    }

    // -- Entity struct registry --

    /// Create (or fetch) the named aggregate type for an entity and set
    /// its body from the attribute types.
    pub fn register_entity_struct(
        &self,
        name: &str,
        fields: &[BasicTypeEnum<'ll>],
    ) -> StructType<'ll> {
        let ty = self.get_or_create_named_struct(name);
        ty.set_body(fields, false);
        ty
    }

    pub fn get_entity_struct(&self, name: &str) -> Option<StructType<'ll>> {
        self.named_structs.borrow().get(name).copied()
    }

    fn get_or_create_named_struct(&self, name: &str) -> StructType<'ll> {
        if let Some(&ty) = self.named_structs.borrow().get(name) {
            return ty;
        }
        let ty = self.llcx.opaque_struct_type(name);
        self.named_structs.borrow_mut().insert(name.to_owned(), ty);
        ty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mapping_is_deterministic() {
        let context = Context::create();
        let cx = CodegenCx::new(&context, "test");

        assert_eq!(
            cx.basic_type(DataType::Int),
            Some(context.i32_type().into())
        );
        assert_eq!(
            cx.basic_type(DataType::Real),
            cx.basic_type(DataType::Double)
        );
        assert!(cx.basic_type(DataType::Text).is_some_and(|t| t.is_pointer_type()));
        assert!(cx.basic_type(DataType::Void).is_none());
    }

    #[test]
    fn set_struct_has_three_fields() {
        let context = Context::create();
        let cx = CodegenCx::new(&context, "test");
        assert_eq!(cx.set_struct_type().count_fields(), 3);
    }

    #[test]
    fn entity_struct_registry_round_trips() {
        let context = Context::create();
        let cx = CodegenCx::new(&context, "test");
        let fields = [
            cx.basic_type(DataType::Int).expect("int"),
            cx.basic_type(DataType::Real).expect("real"),
        ];
        cx.register_entity_struct("Customer", &fields);
        let ty = cx.get_entity_struct("Customer").expect("registered");
        assert_eq!(ty.count_fields(), 2);
    }

    #[test]
    fn printf_is_declared_once() {
        let context = Context::create();
        let cx = CodegenCx::new(&context, "test");
        let a = cx.printf();
        let b = cx.printf();
        assert_eq!(a, b);
    }
}
