// Builder wraps LLVMBuilderRef. Builders are never shared, so they are plain RAII values
// disposed in Drop rather than going through the ownership cache. Every LLVMBuild* entry point
// of llvm-c/Core.h is exposed; the uniform ones (two-operand arithmetic, one-operand
// negation, casts) are generated by macros. Names are marshalled into C strings, so a name
// with an interior NUL is an error, and a builder call that returns a null ref (no insertion
// point, malformed operands LLVM rejects without asserting) becomes LlvmError::NullHandle.
// Terminators and instructions that are edited after creation (switch, phi, landing pad,
// catchswitch, funclet pads, indirectbr) come back as their typed view.

//! Instruction builders.

use crate::basic_block::BasicBlock;
use crate::context::Context;
use crate::enums::{AtomicOrdering, AtomicRmwBinOp, IntPredicate, Opcode, RealPredicate};
use crate::error::{LlvmError, LlvmResult};
use crate::operand_bundle::OperandBundle;
use crate::support::{llvm_bool, to_cstring};
use crate::types::{FunctionType, Type};
use crate::values::instruction::{FuncletInst, LandingPadInst, PhiNode, SwitchInst};
use crate::values::{raw_values, Instruction, Metadata, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMBuilderRef, LLVMOperandBundleRef, LLVMValueRef};
use std::fmt;
use std::marker::PhantomData;

fn built<'ctx>(raw: LLVMValueRef) -> LlvmResult<Value<'ctx>> {
    unsafe { Value::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "instruction" })
}

fn raw_bundles(bundles: &[OperandBundle]) -> Vec<LLVMOperandBundleRef> {
    bundles.iter().map(|b| b.as_raw()).collect()
}

macro_rules! binary_builders {
    ($($(#[$meta:meta])* $name:ident => $f:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(&self, lhs: Value<'ctx>, rhs: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
                let name = to_cstring(name)?;
                built(unsafe { $f(self.raw, lhs.as_raw(), rhs.as_raw(), name.as_ptr()) })
            }
        )+
    };
}

macro_rules! unary_builders {
    ($($name:ident => $f:ident),+ $(,)?) => {
        $(
            pub fn $name(&self, value: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
                let name = to_cstring(name)?;
                built(unsafe { $f(self.raw, value.as_raw(), name.as_ptr()) })
            }
        )+
    };
}

macro_rules! cast_builders {
    ($($name:ident => $f:ident),+ $(,)?) => {
        $(
            pub fn $name(&self, value: Value<'ctx>, to: Type<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
                let name = to_cstring(name)?;
                built(unsafe { $f(self.raw, value.as_raw(), to.as_raw(), name.as_ptr()) })
            }
        )+
    };
}

/// An instruction builder for one context.
pub struct Builder<'ctx> {
    raw: LLVMBuilderRef,
    _marker: PhantomData<&'ctx Context>,
}

impl<'ctx> Builder<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self {
            raw: unsafe { LLVMCreateBuilderInContext(context.as_raw()) },
            _marker: PhantomData,
        }
    }

    pub fn as_raw(&self) -> LLVMBuilderRef {
        self.raw
    }

    // Positioning

    /// Insert before `instruction` in `block`, or at the end of `block` with `None`.
    pub fn position(&self, block: BasicBlock<'ctx>, instruction: Option<Instruction<'ctx>>) {
        let instr = instruction.map_or(std::ptr::null_mut(), |i| i.as_raw());
        unsafe { LLVMPositionBuilder(self.raw, block.as_raw(), instr) }
    }

    pub fn position_before(&self, instruction: Instruction<'ctx>) {
        unsafe { LLVMPositionBuilderBefore(self.raw, instruction.as_raw()) }
    }

    pub fn position_at_end(&self, block: BasicBlock<'ctx>) {
        unsafe { LLVMPositionBuilderAtEnd(self.raw, block.as_raw()) }
    }

    pub fn insert_block(&self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetInsertBlock(self.raw)) }
    }

    pub fn clear_insertion_position(&self) {
        unsafe { LLVMClearInsertionPosition(self.raw) }
    }

    /// Insert a detached instruction at the current position.
    pub fn insert(&self, instruction: Instruction<'ctx>) {
        unsafe { LLVMInsertIntoBuilder(self.raw, instruction.as_raw()) }
    }

    pub fn insert_with_name(&self, instruction: Instruction<'ctx>, name: &str) -> LlvmResult<()> {
        let name = to_cstring(name)?;
        unsafe { LLVMInsertIntoBuilderWithName(self.raw, instruction.as_raw(), name.as_ptr()) };
        Ok(())
    }

    // Debug locations and default metadata

    pub fn current_debug_location(&self) -> Option<Metadata<'ctx>> {
        unsafe { Metadata::from_raw_opt(LLVMGetCurrentDebugLocation2(self.raw)) }
    }

    pub fn set_current_debug_location(&self, location: Option<Metadata<'ctx>>) {
        let raw = location.map_or(std::ptr::null_mut(), |m| m.as_raw());
        unsafe { LLVMSetCurrentDebugLocation2(self.raw, raw) }
    }

    /// Stamp the builder's current debug location onto `instruction`.
    pub fn set_instruction_debug_location(&self, instruction: Instruction<'ctx>) {
        unsafe { LLVMSetInstDebugLocation(self.raw, instruction.as_raw()) }
    }

    /// Attach the builder's default metadata (debug location, fp math tag) to `instruction`.
    pub fn add_metadata_to_instruction(&self, instruction: Instruction<'ctx>) {
        unsafe { LLVMAddMetadataToInst(self.raw, instruction.as_raw()) }
    }

    pub fn default_fp_math_tag(&self) -> Option<Metadata<'ctx>> {
        unsafe { Metadata::from_raw_opt(LLVMBuilderGetDefaultFPMathTag(self.raw)) }
    }

    pub fn set_default_fp_math_tag(&self, tag: Option<Metadata<'ctx>>) {
        let raw = tag.map_or(std::ptr::null_mut(), |m| m.as_raw());
        unsafe { LLVMBuilderSetDefaultFPMathTag(self.raw, raw) }
    }

    // Terminators

    /// `ret` with a value, or `ret void` for `None`.
    pub fn build_ret(&self, value: Option<Value<'ctx>>) -> LlvmResult<Value<'ctx>> {
        match value {
            Some(value) => built(unsafe { LLVMBuildRet(self.raw, value.as_raw()) }),
            None => self.build_ret_void(),
        }
    }

    pub fn build_ret_void(&self) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildRetVoid(self.raw) })
    }

    /// Return several values as one first-class aggregate.
    pub fn build_aggregate_ret(&self, values: &[Value<'ctx>]) -> LlvmResult<Value<'ctx>> {
        let mut raw = raw_values(values);
        built(unsafe { LLVMBuildAggregateRet(self.raw, raw.as_mut_ptr(), raw.len() as u32) })
    }

    pub fn build_br(&self, dest: BasicBlock<'ctx>) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildBr(self.raw, dest.as_raw()) })
    }

    pub fn build_cond_br(
        &self,
        condition: Value<'ctx>,
        then_block: BasicBlock<'ctx>,
        else_block: BasicBlock<'ctx>,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe {
            LLVMBuildCondBr(self.raw, condition.as_raw(), then_block.as_raw(), else_block.as_raw())
        })
    }

    /// `switch`; add cases through the returned view.
    pub fn build_switch(
        &self,
        value: Value<'ctx>,
        default: BasicBlock<'ctx>,
        expected_cases: u32,
    ) -> LlvmResult<SwitchInst<'ctx>> {
        let raw = built(unsafe { LLVMBuildSwitch(self.raw, value.as_raw(), default.as_raw(), expected_cases) })?;
        Ok(unsafe { SwitchInst::from_raw_unchecked(raw.as_raw()) })
    }

    /// `indirectbr` to each of `destinations`.
    pub fn build_indirect_br(
        &self,
        address: Value<'ctx>,
        destinations: &[BasicBlock<'ctx>],
    ) -> LlvmResult<Instruction<'ctx>> {
        let raw = built(unsafe {
            LLVMBuildIndirectBr(self.raw, address.as_raw(), destinations.len() as u32)
        })?;
        for dest in destinations {
            unsafe { LLVMAddDestination(raw.as_raw(), dest.as_raw()) };
        }
        Ok(unsafe { Instruction::from_raw_unchecked(raw.as_raw()) })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn build_invoke(
        &self,
        fn_type: FunctionType<'ctx>,
        callee: Value<'ctx>,
        args: &[Value<'ctx>],
        normal: BasicBlock<'ctx>,
        unwind: BasicBlock<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        built(unsafe {
            LLVMBuildInvoke2(
                self.raw,
                fn_type.as_raw(),
                callee.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                normal.as_raw(),
                unwind.as_raw(),
                name.as_ptr(),
            )
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn build_invoke_with_bundles(
        &self,
        fn_type: FunctionType<'ctx>,
        callee: Value<'ctx>,
        args: &[Value<'ctx>],
        normal: BasicBlock<'ctx>,
        unwind: BasicBlock<'ctx>,
        bundles: &[OperandBundle],
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        let mut raw_bundles = raw_bundles(bundles);
        built(unsafe {
            LLVMBuildInvokeWithOperandBundles(
                self.raw,
                fn_type.as_raw(),
                callee.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                normal.as_raw(),
                unwind.as_raw(),
                raw_bundles.as_mut_ptr(),
                raw_bundles.len() as u32,
                name.as_ptr(),
            )
        })
    }

    pub fn build_unreachable(&self) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildUnreachable(self.raw) })
    }

    pub fn build_resume(&self, exception: Value<'ctx>) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildResume(self.raw, exception.as_raw()) })
    }

    /// `landingpad`; add clauses through the returned view.
    pub fn build_landing_pad(
        &self,
        ty: Type<'ctx>,
        personality: Option<Value<'ctx>>,
        expected_clauses: u32,
        name: &str,
    ) -> LlvmResult<LandingPadInst<'ctx>> {
        let name = to_cstring(name)?;
        let personality = personality.map_or(std::ptr::null_mut(), |p| p.as_raw());
        let raw = built(unsafe {
            LLVMBuildLandingPad(self.raw, ty.as_raw(), personality, expected_clauses, name.as_ptr())
        })?;
        Ok(unsafe { LandingPadInst::from_raw_unchecked(raw.as_raw()) })
    }

    pub fn build_catch_pad(
        &self,
        parent: Value<'ctx>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> LlvmResult<FuncletInst<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        let raw = built(unsafe {
            LLVMBuildCatchPad(
                self.raw,
                parent.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                name.as_ptr(),
            )
        })?;
        Ok(unsafe { FuncletInst::from_raw_unchecked(raw.as_raw()) })
    }

    /// `cleanuppad`; `parent` is `none` (a token constant) at the function's top level.
    pub fn build_cleanup_pad(
        &self,
        parent: Value<'ctx>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> LlvmResult<FuncletInst<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        let raw = built(unsafe {
            LLVMBuildCleanupPad(
                self.raw,
                parent.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                name.as_ptr(),
            )
        })?;
        Ok(unsafe { FuncletInst::from_raw_unchecked(raw.as_raw()) })
    }

    /// `catchswitch`; an absent unwind block means "unwind to caller".
    pub fn build_catch_switch(
        &self,
        parent: Value<'ctx>,
        unwind: Option<BasicBlock<'ctx>>,
        expected_handlers: u32,
        name: &str,
    ) -> LlvmResult<FuncletInst<'ctx>> {
        let name = to_cstring(name)?;
        let unwind = unwind.map_or(std::ptr::null_mut(), |b| b.as_raw());
        let raw = built(unsafe {
            LLVMBuildCatchSwitch(self.raw, parent.as_raw(), unwind, expected_handlers, name.as_ptr())
        })?;
        Ok(unsafe { FuncletInst::from_raw_unchecked(raw.as_raw()) })
    }

    pub fn build_catch_ret(&self, catch_pad: FuncletInst<'ctx>, dest: BasicBlock<'ctx>) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildCatchRet(self.raw, catch_pad.as_raw(), dest.as_raw()) })
    }

    pub fn build_cleanup_ret(
        &self,
        cleanup_pad: FuncletInst<'ctx>,
        unwind: Option<BasicBlock<'ctx>>,
    ) -> LlvmResult<Value<'ctx>> {
        let unwind = unwind.map_or(std::ptr::null_mut(), |b| b.as_raw());
        built(unsafe { LLVMBuildCleanupRet(self.raw, cleanup_pad.as_raw(), unwind) })
    }

    // Arithmetic and bitwise operations

    binary_builders! {
        build_add => LLVMBuildAdd,
        build_nsw_add => LLVMBuildNSWAdd,
        build_nuw_add => LLVMBuildNUWAdd,
        build_fadd => LLVMBuildFAdd,
        build_sub => LLVMBuildSub,
        build_nsw_sub => LLVMBuildNSWSub,
        build_nuw_sub => LLVMBuildNUWSub,
        build_fsub => LLVMBuildFSub,
        build_mul => LLVMBuildMul,
        build_nsw_mul => LLVMBuildNSWMul,
        build_nuw_mul => LLVMBuildNUWMul,
        build_fmul => LLVMBuildFMul,
        build_udiv => LLVMBuildUDiv,
        build_exact_udiv => LLVMBuildExactUDiv,
        build_sdiv => LLVMBuildSDiv,
        build_exact_sdiv => LLVMBuildExactSDiv,
        build_fdiv => LLVMBuildFDiv,
        build_urem => LLVMBuildURem,
        build_srem => LLVMBuildSRem,
        build_frem => LLVMBuildFRem,
        build_shl => LLVMBuildShl,
        build_lshr => LLVMBuildLShr,
        build_ashr => LLVMBuildAShr,
        build_and => LLVMBuildAnd,
        build_or => LLVMBuildOr,
        build_xor => LLVMBuildXor,
    }

    /// Any two-operand instruction by opcode.
    pub fn build_binop(&self, op: Opcode, lhs: Value<'ctx>, rhs: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildBinOp(self.raw, op, lhs.as_raw(), rhs.as_raw(), name.as_ptr()) })
    }

    unary_builders! {
        build_neg => LLVMBuildNeg,
        build_nsw_neg => LLVMBuildNSWNeg,
        build_fneg => LLVMBuildFNeg,
        build_not => LLVMBuildNot,
        build_freeze => LLVMBuildFreeze,
        build_is_null => LLVMBuildIsNull,
        build_is_not_null => LLVMBuildIsNotNull,
    }

    // Memory

    /// Call `malloc` for one `ty`.
    pub fn build_malloc(&self, ty: Type<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildMalloc(self.raw, ty.as_raw(), name.as_ptr()) })
    }

    pub fn build_array_malloc(&self, ty: Type<'ctx>, count: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildArrayMalloc(self.raw, ty.as_raw(), count.as_raw(), name.as_ptr()) })
    }

    pub fn build_free(&self, pointer: Value<'ctx>) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildFree(self.raw, pointer.as_raw()) })
    }

    pub fn build_memset(
        &self,
        pointer: Value<'ctx>,
        value: Value<'ctx>,
        len: Value<'ctx>,
        align: u32,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildMemSet(self.raw, pointer.as_raw(), value.as_raw(), len.as_raw(), align) })
    }

    pub fn build_memcpy(
        &self,
        dest: Value<'ctx>,
        dest_align: u32,
        src: Value<'ctx>,
        src_align: u32,
        size: Value<'ctx>,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe {
            LLVMBuildMemCpy(self.raw, dest.as_raw(), dest_align, src.as_raw(), src_align, size.as_raw())
        })
    }

    pub fn build_memmove(
        &self,
        dest: Value<'ctx>,
        dest_align: u32,
        src: Value<'ctx>,
        src_align: u32,
        size: Value<'ctx>,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe {
            LLVMBuildMemMove(self.raw, dest.as_raw(), dest_align, src.as_raw(), src_align, size.as_raw())
        })
    }

    pub fn build_alloca(&self, ty: Type<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildAlloca(self.raw, ty.as_raw(), name.as_ptr()) })
    }

    pub fn build_array_alloca(&self, ty: Type<'ctx>, count: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildArrayAlloca(self.raw, ty.as_raw(), count.as_raw(), name.as_ptr()) })
    }

    pub fn build_load(&self, ty: Type<'ctx>, pointer: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildLoad2(self.raw, ty.as_raw(), pointer.as_raw(), name.as_ptr()) })
    }

    pub fn build_store(&self, value: Value<'ctx>, pointer: Value<'ctx>) -> LlvmResult<Value<'ctx>> {
        built(unsafe { LLVMBuildStore(self.raw, value.as_raw(), pointer.as_raw()) })
    }

    pub fn build_gep(
        &self,
        ty: Type<'ctx>,
        pointer: Value<'ctx>,
        indices: &[Value<'ctx>],
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw = raw_values(indices);
        built(unsafe {
            LLVMBuildGEP2(self.raw, ty.as_raw(), pointer.as_raw(), raw.as_mut_ptr(), raw.len() as u32, name.as_ptr())
        })
    }

    pub fn build_in_bounds_gep(
        &self,
        ty: Type<'ctx>,
        pointer: Value<'ctx>,
        indices: &[Value<'ctx>],
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw = raw_values(indices);
        built(unsafe {
            LLVMBuildInBoundsGEP2(
                self.raw,
                ty.as_raw(),
                pointer.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
                name.as_ptr(),
            )
        })
    }

    /// Address of field `index` of the struct `ty` at `pointer`.
    pub fn build_struct_gep(
        &self,
        ty: Type<'ctx>,
        pointer: Value<'ctx>,
        index: u32,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        if crate::types::StructType::try_from(ty).map_or(true, |s| index >= s.count_fields()) {
            return Err(LlvmError::Message {
                operation: "build_struct_gep",
                message: format!("no field {index} in {ty}"),
            });
        }
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildStructGEP2(self.raw, ty.as_raw(), pointer.as_raw(), index, name.as_ptr()) })
    }

    /// A private global holding `text` plus a terminator.
    pub fn build_global_string(&self, text: &str, name: &str) -> LlvmResult<Value<'ctx>> {
        let text = to_cstring(text)?;
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildGlobalString(self.raw, text.as_ptr(), name.as_ptr()) })
    }

    /// Like [`Builder::build_global_string`], returning a pointer to the first character.
    pub fn build_global_string_ptr(&self, text: &str, name: &str) -> LlvmResult<Value<'ctx>> {
        let text = to_cstring(text)?;
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildGlobalStringPtr(self.raw, text.as_ptr(), name.as_ptr()) })
    }

    // Casts

    cast_builders! {
        build_trunc => LLVMBuildTrunc,
        build_zext => LLVMBuildZExt,
        build_sext => LLVMBuildSExt,
        build_fp_to_ui => LLVMBuildFPToUI,
        build_fp_to_si => LLVMBuildFPToSI,
        build_ui_to_fp => LLVMBuildUIToFP,
        build_si_to_fp => LLVMBuildSIToFP,
        build_fp_trunc => LLVMBuildFPTrunc,
        build_fp_ext => LLVMBuildFPExt,
        build_ptr_to_int => LLVMBuildPtrToInt,
        build_int_to_ptr => LLVMBuildIntToPtr,
        build_bit_cast => LLVMBuildBitCast,
        build_addr_space_cast => LLVMBuildAddrSpaceCast,
        build_zext_or_bit_cast => LLVMBuildZExtOrBitCast,
        build_sext_or_bit_cast => LLVMBuildSExtOrBitCast,
        build_trunc_or_bit_cast => LLVMBuildTruncOrBitCast,
        build_pointer_cast => LLVMBuildPointerCast,
        build_fp_cast => LLVMBuildFPCast,
    }

    /// Any cast by opcode.
    pub fn build_cast(&self, op: Opcode, value: Value<'ctx>, to: Type<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildCast(self.raw, op, value.as_raw(), to.as_raw(), name.as_ptr()) })
    }

    /// Integer resize, sign- or zero-extending as asked.
    pub fn build_int_cast(&self, value: Value<'ctx>, to: Type<'ctx>, signed: bool, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildIntCast2(self.raw, value.as_raw(), to.as_raw(), llvm_bool(signed), name.as_ptr()) })
    }

    // Comparisons and misc

    pub fn build_icmp(
        &self,
        predicate: IntPredicate,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildICmp(self.raw, predicate.into(), lhs.as_raw(), rhs.as_raw(), name.as_ptr()) })
    }

    pub fn build_fcmp(
        &self,
        predicate: RealPredicate,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildFCmp(self.raw, predicate.into(), lhs.as_raw(), rhs.as_raw(), name.as_ptr()) })
    }

    /// An empty `phi`; add incoming edges through the returned view.
    pub fn build_phi(&self, ty: Type<'ctx>, name: &str) -> LlvmResult<PhiNode<'ctx>> {
        let name = to_cstring(name)?;
        let raw = built(unsafe { LLVMBuildPhi(self.raw, ty.as_raw(), name.as_ptr()) })?;
        Ok(unsafe { PhiNode::from_raw_unchecked(raw.as_raw()) })
    }

    pub fn build_call(
        &self,
        fn_type: FunctionType<'ctx>,
        callee: Value<'ctx>,
        args: &[Value<'ctx>],
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        built(unsafe {
            LLVMBuildCall2(
                self.raw,
                fn_type.as_raw(),
                callee.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                name.as_ptr(),
            )
        })
    }

    pub fn build_call_with_bundles(
        &self,
        fn_type: FunctionType<'ctx>,
        callee: Value<'ctx>,
        args: &[Value<'ctx>],
        bundles: &[OperandBundle],
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        let mut raw_args = raw_values(args);
        let mut raw_bundles = raw_bundles(bundles);
        built(unsafe {
            LLVMBuildCallWithOperandBundles(
                self.raw,
                fn_type.as_raw(),
                callee.as_raw(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
                raw_bundles.as_mut_ptr(),
                raw_bundles.len() as u32,
                name.as_ptr(),
            )
        })
    }

    pub fn build_select(
        &self,
        condition: Value<'ctx>,
        then_value: Value<'ctx>,
        else_value: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe {
            LLVMBuildSelect(self.raw, condition.as_raw(), then_value.as_raw(), else_value.as_raw(), name.as_ptr())
        })
    }

    pub fn build_va_arg(&self, list: Value<'ctx>, ty: Type<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildVAArg(self.raw, list.as_raw(), ty.as_raw(), name.as_ptr()) })
    }

    pub fn build_extract_element(&self, vector: Value<'ctx>, index: Value<'ctx>, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildExtractElement(self.raw, vector.as_raw(), index.as_raw(), name.as_ptr()) })
    }

    pub fn build_insert_element(
        &self,
        vector: Value<'ctx>,
        element: Value<'ctx>,
        index: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe {
            LLVMBuildInsertElement(self.raw, vector.as_raw(), element.as_raw(), index.as_raw(), name.as_ptr())
        })
    }

    pub fn build_shuffle_vector(
        &self,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        mask: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildShuffleVector(self.raw, lhs.as_raw(), rhs.as_raw(), mask.as_raw(), name.as_ptr()) })
    }

    pub fn build_extract_value(&self, aggregate: Value<'ctx>, index: u32, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildExtractValue(self.raw, aggregate.as_raw(), index, name.as_ptr()) })
    }

    pub fn build_insert_value(
        &self,
        aggregate: Value<'ctx>,
        element: Value<'ctx>,
        index: u32,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe {
            LLVMBuildInsertValue(self.raw, aggregate.as_raw(), element.as_raw(), index, name.as_ptr())
        })
    }

    /// `(lhs - rhs) / sizeof(element_type)` for two pointers.
    pub fn build_ptr_diff(
        &self,
        element_type: Type<'ctx>,
        lhs: Value<'ctx>,
        rhs: Value<'ctx>,
        name: &str,
    ) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildPtrDiff2(self.raw, element_type.as_raw(), lhs.as_raw(), rhs.as_raw(), name.as_ptr()) })
    }

    // Atomics

    pub fn build_fence(&self, ordering: AtomicOrdering, single_thread: bool, name: &str) -> LlvmResult<Value<'ctx>> {
        let name = to_cstring(name)?;
        built(unsafe { LLVMBuildFence(self.raw, ordering.into(), llvm_bool(single_thread), name.as_ptr()) })
    }

    pub fn build_atomic_rmw(
        &self,
        op: AtomicRmwBinOp,
        pointer: Value<'ctx>,
        value: Value<'ctx>,
        ordering: AtomicOrdering,
        single_thread: bool,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe {
            LLVMBuildAtomicRMW(
                self.raw,
                op.into(),
                pointer.as_raw(),
                value.as_raw(),
                ordering.into(),
                llvm_bool(single_thread),
            )
        })
    }

    pub fn build_atomic_cmpxchg(
        &self,
        pointer: Value<'ctx>,
        expected: Value<'ctx>,
        new: Value<'ctx>,
        success: AtomicOrdering,
        failure: AtomicOrdering,
        single_thread: bool,
    ) -> LlvmResult<Value<'ctx>> {
        built(unsafe {
            LLVMBuildAtomicCmpXchg(
                self.raw,
                pointer.as_raw(),
                expected.as_raw(),
                new.as_raw(),
                success.into(),
                failure.into(),
                llvm_bool(single_thread),
            )
        })
    }
}

impl Drop for Builder<'_> {
    fn drop(&mut self) {
        unsafe { LLVMDisposeBuilder(self.raw) }
    }
}

impl fmt::Debug for Builder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("raw", &self.raw)
            .field("block", &self.insert_block())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::instruction::{AtomicInst, MemoryInst};
    use crate::values::AnyInstruction;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_build_loop_with_phi() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("loop").unwrap();
        let i32_ty = ctx.i32_type();
        let function = module
            .add_function("count", i32_ty.fn_type(&[i32_ty.as_type()], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let body = ctx.append_basic_block(function, "body").unwrap();
        let exit = ctx.append_basic_block(function, "exit").unwrap();
        let builder = ctx.create_builder();

        builder.position_at_end(entry);
        builder.build_br(body).unwrap();

        builder.position_at_end(body);
        let phi = builder.build_phi(i32_ty.as_type(), "i").unwrap();
        let one = i32_ty.const_int(1, false).as_value();
        let next = builder.build_add(phi.as_value(), one, "next").unwrap();
        let limit = function.param(0).unwrap().as_value();
        let done = builder.build_icmp(IntPredicate::Uge, next, limit, "done").unwrap();
        builder.build_cond_br(done, exit, body).unwrap();
        phi.add_incoming(&[(i32_ty.const_int(0, false).as_value(), entry), (next, body)]);

        builder.position_at_end(exit);
        builder.build_ret(Some(next)).unwrap();

        assert_eq!(phi.count_incoming(), 2);
        assert_eq!(phi.incoming(1), Some((next, body)));
        assert!(phi.incoming(2).is_none());
        assert_eq!(builder.insert_block(), Some(exit));
        module.verify().unwrap();
    }

    #[test]
    fn test_switch_and_memory() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("switch").unwrap();
        let i8_ty = ctx.i8_type();
        let function = module
            .add_function("pick", ctx.void_type().fn_type(&[i8_ty.as_type()], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let other = ctx.append_basic_block(function, "other").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);

        let slot = builder.build_alloca(i8_ty.as_type(), "slot").unwrap();
        let store = builder.build_store(function.param(0).unwrap().as_value(), slot).unwrap();
        let load = builder.build_load(i8_ty.as_type(), slot, "loaded").unwrap();
        let switch = builder.build_switch(load, other, 1).unwrap();
        switch.add_case(i8_ty.const_int(3, false), other);
        assert_eq!(switch.default_dest(), other);
        builder.position_at_end(other);
        builder.build_ret_void().unwrap();

        let store = MemoryInst::try_from(store).unwrap();
        assert!(!store.is_load());
        store.set_volatile(true);
        assert!(store.is_volatile());
        assert!(matches!(
            Instruction::try_from(load).unwrap().classify(),
            AnyInstruction::Load(_)
        ));
        assert_eq!(Instruction::from(switch).successor_count(), 2);
        module.verify().unwrap();
    }

    #[test]
    fn test_atomics() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("atomics").unwrap();
        let i64_ty = ctx.i64_type();
        let function = module
            .add_function("bump", ctx.void_type().fn_type(&[ctx.ptr_type(0).as_type()], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        let ptr = function.param(0).unwrap().as_value();
        let one = i64_ty.const_int(1, false).as_value();

        let rmw = builder
            .build_atomic_rmw(AtomicRmwBinOp::Add, ptr, one, AtomicOrdering::SequentiallyConsistent, false)
            .unwrap();
        let cas = builder
            .build_atomic_cmpxchg(ptr, one, one, AtomicOrdering::Acquire, AtomicOrdering::Monotonic, true)
            .unwrap();
        let fence = builder.build_fence(AtomicOrdering::Release, false, "").unwrap();
        builder.build_ret_void().unwrap();

        let rmw = AtomicInst::try_from(rmw).unwrap();
        assert_eq!(rmw.rmw_bin_op(), Some(AtomicRmwBinOp::Add));
        assert_eq!(rmw.ordering(), Some(AtomicOrdering::SequentiallyConsistent));
        assert_eq!(rmw.success_ordering(), None);

        let cas = AtomicInst::try_from(cas).unwrap();
        assert_eq!(cas.success_ordering(), Some(AtomicOrdering::Acquire));
        assert_eq!(cas.failure_ordering(), Some(AtomicOrdering::Monotonic));
        assert!(cas.is_single_thread());
        assert_eq!(cas.is_weak(), Some(false));
        assert_eq!(cas.ordering(), None);

        let fence = AtomicInst::try_from(fence).unwrap();
        assert_eq!(fence.ordering(), Some(AtomicOrdering::Release));
        module.verify().unwrap();
    }

    #[test]
    fn test_struct_gep_bounds_and_names() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("gep").unwrap();
        let pair = ctx.struct_type(&[ctx.i32_type().as_type(), ctx.i64_type().as_type()], false);
        let function = module
            .add_function("second", ctx.void_type().fn_type(&[ctx.ptr_type(0).as_type()], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        let ptr = function.param(0).unwrap().as_value();

        let field = builder.build_struct_gep(pair.as_type(), ptr, 1, "field").unwrap();
        assert_eq!(field.name(), "field");
        assert!(builder.build_struct_gep(pair.as_type(), ptr, 2, "oob").is_err());
        assert!(builder
            .build_struct_gep(ctx.i32_type().as_type(), ptr, 0, "scalar")
            .is_err());
        assert!(matches!(
            builder.build_alloca(ctx.i8_type().as_type(), "bad\0name"),
            Err(LlvmError::InteriorNul { position: 3 })
        ));
    }

    #[test]
    fn test_global_string() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("strings").unwrap();
        let function = module
            .add_function("f", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        builder.build_global_string_ptr("hello", "greeting").unwrap();
        builder.build_ret_void().unwrap();
        let global = module.get_global("greeting").unwrap().unwrap();
        let text = global.initializer().unwrap();
        let data = crate::values::ConstantData::try_from(text.as_value()).unwrap();
        assert_eq!(data.as_string().as_deref(), Some("hello\0"));
    }
}
