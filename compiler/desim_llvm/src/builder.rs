//! LLVM instruction builder wrapper.
//!
//! Wraps an LLVM `IRBuilder` and exposes the instruction set the lowering
//! engine needs. Instructions are generated at the builder's current
//! insertion point; the `expect`s only fail on internal LLVM state
//! corruption, not on user input.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder as LLVMBuilder;
use inkwell::context::Context;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{
    BasicMetadataValueEnum, BasicValueEnum, FloatValue, FunctionValue, IntValue, PointerValue,
};
use inkwell::{FloatPredicate, IntPredicate};

/// Instruction builder with a movable insertion point.
pub struct Builder<'ll> {
    llbuilder: LLVMBuilder<'ll>,
}

impl<'ll> Builder<'ll> {
    pub fn new(llcx: &'ll Context) -> Self {
        Builder {
            llbuilder: llcx.create_builder(),
        }
    }

    /// The block instructions are currently appended to.
    pub fn current_block(&self) -> Option<BasicBlock<'ll>> {
        self.llbuilder.get_insert_block()
    }

    pub fn position_at_end(&self, block: BasicBlock<'ll>) {
        self.llbuilder.position_at_end(block);
    }

    /// Whether the current block already ends in a terminator.
    pub fn has_terminator(&self) -> bool {
        self.current_block()
            .is_some_and(|block| block.get_terminator().is_some())
    }

    // -- Terminators --

    pub fn ret(&self, value: BasicValueEnum<'ll>) {
        self.llbuilder
            .build_return(Some(&value))
            .expect("build_return");
    }

    pub fn ret_void(&self) {
        self.llbuilder.build_return(None).expect("build_return");
    }

    pub fn br(&self, dest: BasicBlock<'ll>) {
        self.llbuilder
            .build_unconditional_branch(dest)
            .expect("build_br");
    }

    pub fn cond_br(
        &self,
        cond: IntValue<'ll>,
        then_block: BasicBlock<'ll>,
        else_block: BasicBlock<'ll>,
    ) {
        self.llbuilder
            .build_conditional_branch(cond, then_block, else_block)
            .expect("build_cond_br");
    }

    // -- Memory --

    pub fn alloca(&self, ty: BasicTypeEnum<'ll>, name: &str) -> PointerValue<'ll> {
        self.llbuilder.build_alloca(ty, name).expect("build_alloca")
    }

    pub fn store(&self, ptr: PointerValue<'ll>, value: BasicValueEnum<'ll>) {
        self.llbuilder.build_store(ptr, value).expect("build_store");
    }

    pub fn load(
        &self,
        ty: BasicTypeEnum<'ll>,
        ptr: PointerValue<'ll>,
        name: &str,
    ) -> BasicValueEnum<'ll> {
        self.llbuilder.build_load(ty, ptr, name).expect("build_load")
    }

    /// NUL-terminated global string, returned as a pointer to its bytes.
    pub fn global_string_ptr(&self, value: &str, name: &str) -> PointerValue<'ll> {
        self.llbuilder
            .build_global_string_ptr(value, name)
            .expect("build_global_string_ptr")
            .as_pointer_value()
    }

    // -- Calls --

    pub fn call(
        &self,
        function: FunctionValue<'ll>,
        args: &[BasicMetadataValueEnum<'ll>],
        name: &str,
    ) -> Option<BasicValueEnum<'ll>> {
        self.llbuilder
            .build_call(function, args, name)
            .expect("build_call")
            .try_as_basic_value()
            .left()
    }

    // -- Integer arithmetic --

    pub fn add(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_int_add(lhs, rhs, name).expect("add")
    }

    pub fn sub(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_int_sub(lhs, rhs, name).expect("sub")
    }

    pub fn mul(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_int_mul(lhs, rhs, name).expect("mul")
    }

    pub fn sdiv(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder
            .build_int_signed_div(lhs, rhs, name)
            .expect("sdiv")
    }

    pub fn and(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_and(lhs, rhs, name).expect("and")
    }

    pub fn or(&self, lhs: IntValue<'ll>, rhs: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_or(lhs, rhs, name).expect("or")
    }

    pub fn not(&self, value: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_not(value, name).expect("not")
    }

    pub fn ineg(&self, value: IntValue<'ll>, name: &str) -> IntValue<'ll> {
        self.llbuilder.build_int_neg(value, name).expect("ineg")
    }

    pub fn icmp(
        &self,
        pred: IntPredicate,
        lhs: IntValue<'ll>,
        rhs: IntValue<'ll>,
        name: &str,
    ) -> IntValue<'ll> {
        self.llbuilder
            .build_int_compare(pred, lhs, rhs, name)
            .expect("icmp")
    }

    // -- Float arithmetic --

    pub fn fadd(&self, lhs: FloatValue<'ll>, rhs: FloatValue<'ll>, name: &str) -> FloatValue<'ll> {
        self.llbuilder.build_float_add(lhs, rhs, name).expect("fadd")
    }

    pub fn fsub(&self, lhs: FloatValue<'ll>, rhs: FloatValue<'ll>, name: &str) -> FloatValue<'ll> {
        self.llbuilder.build_float_sub(lhs, rhs, name).expect("fsub")
    }

    pub fn fmul(&self, lhs: FloatValue<'ll>, rhs: FloatValue<'ll>, name: &str) -> FloatValue<'ll> {
        self.llbuilder.build_float_mul(lhs, rhs, name).expect("fmul")
    }

    pub fn fdiv(&self, lhs: FloatValue<'ll>, rhs: FloatValue<'ll>, name: &str) -> FloatValue<'ll> {
        self.llbuilder.build_float_div(lhs, rhs, name).expect("fdiv")
    }

    pub fn fneg(&self, value: FloatValue<'ll>, name: &str) -> FloatValue<'ll> {
        self.llbuilder.build_float_neg(value, name).expect("fneg")
    }

    pub fn fcmp(
        &self,
        pred: FloatPredicate,
        lhs: FloatValue<'ll>,
        rhs: FloatValue<'ll>,
        name: &str,
    ) -> IntValue<'ll> {
        self.llbuilder
            .build_float_compare(pred, lhs, rhs, name)
            .expect("fcmp")
    }

    // -- Conversions (runtime call boundaries only) --

    pub fn sext(
        &self,
        value: IntValue<'ll>,
        ty: inkwell::types::IntType<'ll>,
        name: &str,
    ) -> IntValue<'ll> {
        self.llbuilder
            .build_int_s_extend(value, ty, name)
            .expect("sext")
    }

    pub fn zext(
        &self,
        value: IntValue<'ll>,
        ty: inkwell::types::IntType<'ll>,
        name: &str,
    ) -> IntValue<'ll> {
        self.llbuilder
            .build_int_z_extend(value, ty, name)
            .expect("zext")
    }

    pub fn sitofp(
        &self,
        value: IntValue<'ll>,
        ty: inkwell::types::FloatType<'ll>,
        name: &str,
    ) -> FloatValue<'ll> {
        self.llbuilder
            .build_signed_int_to_float(value, ty, name)
            .expect("sitofp")
    }
}
