// Instruction views and opcode dispatch. Instruction is the common view: opcode, position in
// its block, cloning and erasure, successors of terminators, metadata attachments, debug
// locations and the poison-generating flags (nuw/nsw, exact, nneg, disjoint) plus fast-math
// flags. Each flag accessor checks the opcode first because LLVM asserts on the wrong class.
// AnyInstruction maps an opcode to the view that exposes that instruction's extra state:
// calls and invokes, comparisons, GEPs, phis, switches, branches, allocas, loads and stores,
// atomics, aggregate access, vector shuffles, landing pads and funclet pads. Other opcodes
// degrade to AnyInstruction::Other.

//! Instructions and opcode dispatch.

use crate::attributes::{Attribute, AttributeIndex};
use crate::basic_block::BasicBlock;
use crate::enums::{
    AtomicOrdering, AtomicRmwBinOp, CallConv, FastMathFlags, IntPredicate, Opcode, RealPredicate,
    TailCallKind,
};
use crate::error::{LlvmError, LlvmResult};
use crate::operand_bundle::OperandBundle;
use crate::support::{from_llvm_bool, llvm_bool, string_from_parts};
use crate::types::{FunctionType, Type};
use crate::values::{raw_values, ConstantInt, MetadataEntries, MetadataValue, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMAttributeRef, LLVMBasicBlockRef, LLVMValueRef};
use std::ffi::c_char;

fn opcode_of(raw: LLVMValueRef) -> Option<Opcode> {
    unsafe {
        if LLVMIsAInstruction(raw).is_null() {
            None
        } else {
            Some(LLVMGetInstructionOpcode(raw))
        }
    }
}

value_view!(
    /// Any instruction.
    Instruction, "Instruction", |raw| opcode_of(raw).is_some()
);

value_view!(
    /// `call` or `invoke`.
    CallInst, "CallInst", |raw| matches!(opcode_of(raw), Some(Opcode::LLVMCall | Opcode::LLVMInvoke))
);

value_view!(CmpInst, "CmpInst", |raw| matches!(opcode_of(raw), Some(Opcode::LLVMICmp | Opcode::LLVMFCmp)));

value_view!(GepInst, "GetElementPtrInst", |raw| opcode_of(raw) == Some(Opcode::LLVMGetElementPtr));

value_view!(PhiNode, "PHINode", |raw| opcode_of(raw) == Some(Opcode::LLVMPHI));

value_view!(SwitchInst, "SwitchInst", |raw| opcode_of(raw) == Some(Opcode::LLVMSwitch));

value_view!(BranchInst, "BranchInst", |raw| opcode_of(raw) == Some(Opcode::LLVMBr));

value_view!(AllocaInst, "AllocaInst", |raw| opcode_of(raw) == Some(Opcode::LLVMAlloca));

value_view!(
    /// `load` or `store`.
    MemoryInst, "MemoryAccessInst", |raw| matches!(opcode_of(raw), Some(Opcode::LLVMLoad | Opcode::LLVMStore))
);

value_view!(
    /// `atomicrmw`, `cmpxchg` or `fence`.
    AtomicInst,
    "AtomicInst",
    |raw| matches!(
        opcode_of(raw),
        Some(Opcode::LLVMAtomicRMW | Opcode::LLVMAtomicCmpXchg | Opcode::LLVMFence)
    )
);

value_view!(
    /// `extractvalue` or `insertvalue`.
    AggregateInst,
    "AggregateInst",
    |raw| matches!(opcode_of(raw), Some(Opcode::LLVMExtractValue | Opcode::LLVMInsertValue))
);

value_view!(ShuffleVectorInst, "ShuffleVectorInst", |raw| opcode_of(raw) == Some(Opcode::LLVMShuffleVector));

value_view!(LandingPadInst, "LandingPadInst", |raw| opcode_of(raw) == Some(Opcode::LLVMLandingPad));

value_view!(
    /// Exception-handling funclet instructions.
    FuncletInst,
    "FuncletInst",
    |raw| matches!(
        opcode_of(raw),
        Some(
            Opcode::LLVMCatchSwitch
                | Opcode::LLVMCatchPad
                | Opcode::LLVMCleanupPad
                | Opcode::LLVMCleanupRet
        )
    )
);

upcast!(CallInst => Instruction);
upcast!(CmpInst => Instruction);
upcast!(GepInst => Instruction);
upcast!(PhiNode => Instruction);
upcast!(SwitchInst => Instruction);
upcast!(BranchInst => Instruction);
upcast!(AllocaInst => Instruction);
upcast!(MemoryInst => Instruction);
upcast!(AtomicInst => Instruction);
upcast!(AggregateInst => Instruction);
upcast!(ShuffleVectorInst => Instruction);
upcast!(LandingPadInst => Instruction);
upcast!(FuncletInst => Instruction);

fn flag_error(flag: &'static str, inst: Instruction<'_>) -> LlvmError {
    LlvmError::Message {
        operation: flag,
        message: format!("not supported on {:?}", inst.opcode()),
    }
}

impl<'ctx> Instruction<'ctx> {
    pub fn opcode(self) -> Opcode {
        unsafe { LLVMGetInstructionOpcode(self.as_raw()) }
    }

    /// Dispatch to the view for this instruction's opcode.
    pub fn classify(self) -> AnyInstruction<'ctx> {
        AnyInstruction::from(self)
    }

    pub fn parent(self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetInstructionParent(self.as_raw())) }
    }

    pub fn next_instruction(self) -> Option<Instruction<'ctx>> {
        let raw = unsafe { LLVMGetNextInstruction(self.as_raw()) };
        (!raw.is_null()).then(|| unsafe { Instruction::from_raw_unchecked(raw) })
    }

    pub fn previous_instruction(self) -> Option<Instruction<'ctx>> {
        let raw = unsafe { LLVMGetPreviousInstruction(self.as_raw()) };
        (!raw.is_null()).then(|| unsafe { Instruction::from_raw_unchecked(raw) })
    }

    /// Unlink from the parent block; the instruction stays alive.
    pub fn remove_from_parent(self) {
        unsafe { LLVMInstructionRemoveFromParent(self.as_raw()) }
    }

    /// Unlink from the parent block and free the instruction.
    ///
    /// # Safety
    /// No copy of this view, and no use of the instruction, may remain.
    pub unsafe fn erase_from_parent(self) {
        LLVMInstructionEraseFromParent(self.as_raw())
    }

    /// Free an instruction that has no parent.
    ///
    /// # Safety
    /// No copy of this view, and no use of the instruction, may remain.
    pub unsafe fn delete(self) {
        LLVMDeleteInstruction(self.as_raw())
    }

    /// Copy without a parent or a name.
    pub fn clone_instruction(self) -> Instruction<'ctx> {
        unsafe { Instruction::from_raw_unchecked(LLVMInstructionClone(self.as_raw())) }
    }

    pub fn is_terminator(self) -> bool {
        !unsafe { LLVMIsATerminatorInst(self.as_raw()) }.is_null()
    }

    pub fn successor_count(self) -> u32 {
        if !self.is_terminator() {
            return 0;
        }
        unsafe { LLVMGetNumSuccessors(self.as_raw()) }
    }

    pub fn successor(self, index: u32) -> Option<BasicBlock<'ctx>> {
        if index >= self.successor_count() {
            return None;
        }
        unsafe { BasicBlock::from_raw_opt(LLVMGetSuccessor(self.as_raw(), index)) }
    }

    pub fn successors(self) -> Vec<BasicBlock<'ctx>> {
        (0..self.successor_count()).filter_map(|i| self.successor(i)).collect()
    }

    pub fn set_successor(self, index: u32, block: BasicBlock<'ctx>) -> LlvmResult<()> {
        if index >= self.successor_count() {
            return Err(LlvmError::Message {
                operation: "set_successor",
                message: format!("successor {index} out of range ({})", self.successor_count()),
            });
        }
        unsafe { LLVMSetSuccessor(self.as_raw(), index, block.as_raw()) };
        Ok(())
    }

    pub fn has_metadata(self) -> bool {
        unsafe { LLVMHasMetadata(self.as_raw()) != 0 }
    }

    pub fn metadata(self, kind_id: u32) -> Option<MetadataValue<'ctx>> {
        let raw = unsafe { LLVMGetMetadata(self.as_raw(), kind_id) };
        (!raw.is_null()).then(|| unsafe { MetadataValue::from_raw_unchecked(raw) })
    }

    /// Attach `node` (or with `None` detach) metadata of `kind_id`.
    pub fn set_metadata(self, kind_id: u32, node: Option<MetadataValue<'ctx>>) {
        let raw = node.map_or(std::ptr::null_mut(), |n| n.as_raw());
        unsafe { LLVMSetMetadata(self.as_raw(), kind_id, raw) }
    }

    pub fn all_metadata_other_than_debug_loc(self) -> LlvmResult<MetadataEntries> {
        let mut count = 0;
        let raw = unsafe { LLVMInstructionGetAllMetadataOtherThanDebugLoc(self.as_raw(), &mut count) };
        unsafe { MetadataEntries::from_raw(raw, count) }
    }

    /// Source line, 0 without a debug location.
    pub fn debug_loc_line(self) -> u32 {
        unsafe { LLVMGetDebugLocLine(self.as_raw()) }
    }

    pub fn debug_loc_column(self) -> u32 {
        unsafe { LLVMGetDebugLocColumn(self.as_raw()) }
    }

    pub fn debug_loc_filename(self) -> Option<String> {
        let mut len = 0;
        let ptr = unsafe { LLVMGetDebugLocFilename(self.as_raw(), &mut len) };
        (!ptr.is_null()).then(|| unsafe { string_from_parts(ptr, len as usize) })
    }

    pub fn debug_loc_directory(self) -> Option<String> {
        let mut len = 0;
        let ptr = unsafe { LLVMGetDebugLocDirectory(self.as_raw(), &mut len) };
        (!ptr.is_null()).then(|| unsafe { string_from_parts(ptr, len as usize) })
    }

    fn has_wrap_flags(self) -> bool {
        matches!(
            self.opcode(),
            Opcode::LLVMAdd | Opcode::LLVMSub | Opcode::LLVMMul | Opcode::LLVMShl | Opcode::LLVMTrunc
        )
    }

    /// `nuw` flag; `None` for opcodes without wrap flags.
    pub fn no_unsigned_wrap(self) -> Option<bool> {
        self.has_wrap_flags()
            .then(|| from_llvm_bool(unsafe { LLVMGetNUW(self.as_raw()) }))
    }

    pub fn set_no_unsigned_wrap(self, nuw: bool) -> LlvmResult<()> {
        if !self.has_wrap_flags() {
            return Err(flag_error("set_no_unsigned_wrap", self));
        }
        unsafe { LLVMSetNUW(self.as_raw(), llvm_bool(nuw)) };
        Ok(())
    }

    pub fn no_signed_wrap(self) -> Option<bool> {
        self.has_wrap_flags()
            .then(|| from_llvm_bool(unsafe { LLVMGetNSW(self.as_raw()) }))
    }

    pub fn set_no_signed_wrap(self, nsw: bool) -> LlvmResult<()> {
        if !self.has_wrap_flags() {
            return Err(flag_error("set_no_signed_wrap", self));
        }
        unsafe { LLVMSetNSW(self.as_raw(), llvm_bool(nsw)) };
        Ok(())
    }

    fn has_exact_flag(self) -> bool {
        matches!(
            self.opcode(),
            Opcode::LLVMUDiv | Opcode::LLVMSDiv | Opcode::LLVMLShr | Opcode::LLVMAShr
        )
    }

    pub fn is_exact(self) -> Option<bool> {
        self.has_exact_flag()
            .then(|| from_llvm_bool(unsafe { LLVMGetExact(self.as_raw()) }))
    }

    pub fn set_exact(self, exact: bool) -> LlvmResult<()> {
        if !self.has_exact_flag() {
            return Err(flag_error("set_exact", self));
        }
        unsafe { LLVMSetExact(self.as_raw(), llvm_bool(exact)) };
        Ok(())
    }

    /// `nneg` on `zext`.
    fn has_non_negative_flag(self) -> bool {
        matches!(self.opcode(), Opcode::LLVMZExt | Opcode::LLVMUIToFP)
    }

    pub fn is_non_negative(self) -> Option<bool> {
        self.has_non_negative_flag()
            .then(|| from_llvm_bool(unsafe { LLVMGetNNeg(self.as_raw()) }))
    }

    pub fn set_non_negative(self, nneg: bool) -> LlvmResult<()> {
        if !self.has_non_negative_flag() {
            return Err(flag_error("set_non_negative", self));
        }
        unsafe { LLVMSetNNeg(self.as_raw(), llvm_bool(nneg)) };
        Ok(())
    }

    /// `disjoint` on `or`.
    pub fn is_disjoint(self) -> Option<bool> {
        (self.opcode() == Opcode::LLVMOr)
            .then(|| from_llvm_bool(unsafe { LLVMGetIsDisjoint(self.as_raw()) }))
    }

    pub fn set_disjoint(self, disjoint: bool) -> LlvmResult<()> {
        if self.opcode() != Opcode::LLVMOr {
            return Err(flag_error("set_disjoint", self));
        }
        unsafe { LLVMSetIsDisjoint(self.as_raw(), llvm_bool(disjoint)) };
        Ok(())
    }

    pub fn can_use_fast_math_flags(self) -> bool {
        from_llvm_bool(unsafe { LLVMCanValueUseFastMathFlags(self.as_raw()) })
    }

    pub fn fast_math_flags(self) -> Option<FastMathFlags> {
        self.can_use_fast_math_flags()
            .then(|| FastMathFlags::from_bits(unsafe { LLVMGetFastMathFlags(self.as_raw()) }))
    }

    pub fn set_fast_math_flags(self, flags: FastMathFlags) -> LlvmResult<()> {
        if !self.can_use_fast_math_flags() {
            return Err(flag_error("set_fast_math_flags", self));
        }
        unsafe { LLVMSetFastMathFlags(self.as_raw(), flags.bits()) };
        Ok(())
    }
}

impl<'ctx> CallInst<'ctx> {
    pub fn as_instruction(self) -> Instruction<'ctx> {
        self.into()
    }

    pub fn is_invoke(self) -> bool {
        self.as_instruction().opcode() == Opcode::LLVMInvoke
    }

    pub fn arg_count(self) -> u32 {
        unsafe { LLVMGetNumArgOperands(self.as_raw()) }
    }

    pub fn arg(self, index: u32) -> Option<Value<'ctx>> {
        if index >= self.arg_count() {
            return None;
        }
        unsafe { Value::from_raw_opt(LLVMGetArgOperand(self.as_raw(), index)) }
    }

    pub fn set_arg(self, index: u32, value: Value<'ctx>) -> LlvmResult<()> {
        if index >= self.arg_count() {
            return Err(LlvmError::Message {
                operation: "set_arg",
                message: format!("argument {index} out of range ({})", self.arg_count()),
            });
        }
        unsafe { LLVMSetArgOperand(self.as_raw(), index, value.as_raw()) };
        Ok(())
    }

    pub fn called_value(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMGetCalledValue(self.as_raw())) }
    }

    pub fn called_function_type(self) -> FunctionType<'ctx> {
        unsafe { FunctionType::from_raw_unchecked(LLVMGetCalledFunctionType(self.as_raw())) }
    }

    pub fn call_conv(self) -> Option<CallConv> {
        CallConv::from_u32(unsafe { LLVMGetInstructionCallConv(self.as_raw()) })
    }

    pub fn set_call_conv(self, cc: CallConv) {
        unsafe { LLVMSetInstructionCallConv(self.as_raw(), cc as u32) }
    }

    /// Tail-call marker; `None` for invokes.
    pub fn tail_call_kind(self) -> Option<TailCallKind> {
        (!self.is_invoke()).then(|| TailCallKind::from(unsafe { LLVMGetTailCallKind(self.as_raw()) }))
    }

    pub fn set_tail_call_kind(self, kind: TailCallKind) -> LlvmResult<()> {
        if self.is_invoke() {
            return Err(flag_error("set_tail_call_kind", self.as_instruction()));
        }
        unsafe { LLVMSetTailCallKind(self.as_raw(), kind.into()) };
        Ok(())
    }

    pub fn is_tail_call(self) -> bool {
        !self.is_invoke() && from_llvm_bool(unsafe { LLVMIsTailCall(self.as_raw()) })
    }

    pub fn set_tail_call(self, tail: bool) -> LlvmResult<()> {
        if self.is_invoke() {
            return Err(flag_error("set_tail_call", self.as_instruction()));
        }
        unsafe { LLVMSetTailCall(self.as_raw(), llvm_bool(tail)) };
        Ok(())
    }

    pub fn normal_dest(self) -> Option<BasicBlock<'ctx>> {
        if !self.is_invoke() {
            return None;
        }
        unsafe { BasicBlock::from_raw_opt(LLVMGetNormalDest(self.as_raw())) }
    }

    pub fn unwind_dest(self) -> Option<BasicBlock<'ctx>> {
        if !self.is_invoke() {
            return None;
        }
        unsafe { BasicBlock::from_raw_opt(LLVMGetUnwindDest(self.as_raw())) }
    }

    pub fn set_normal_dest(self, block: BasicBlock<'ctx>) -> LlvmResult<()> {
        if !self.is_invoke() {
            return Err(flag_error("set_normal_dest", self.as_instruction()));
        }
        unsafe { LLVMSetNormalDest(self.as_raw(), block.as_raw()) };
        Ok(())
    }

    pub fn set_unwind_dest(self, block: BasicBlock<'ctx>) -> LlvmResult<()> {
        if !self.is_invoke() {
            return Err(flag_error("set_unwind_dest", self.as_instruction()));
        }
        unsafe { LLVMSetUnwindDest(self.as_raw(), block.as_raw()) };
        Ok(())
    }

    pub fn attribute_count(self, index: AttributeIndex) -> u32 {
        unsafe { LLVMGetCallSiteAttributeCount(self.as_raw(), index.as_raw()) }
    }

    pub fn attributes(self, index: AttributeIndex) -> Vec<Attribute<'ctx>> {
        let mut raw: Vec<LLVMAttributeRef> = vec![std::ptr::null_mut(); self.attribute_count(index) as usize];
        unsafe { LLVMGetCallSiteAttributes(self.as_raw(), index.as_raw(), raw.as_mut_ptr()) };
        raw.into_iter().map(|a| unsafe { Attribute::from_raw(a) }).collect()
    }

    pub fn enum_attribute(self, index: AttributeIndex, kind_id: u32) -> Option<Attribute<'ctx>> {
        unsafe { Attribute::from_raw_opt(LLVMGetCallSiteEnumAttribute(self.as_raw(), index.as_raw(), kind_id)) }
    }

    pub fn string_attribute(self, index: AttributeIndex, key: &str) -> Option<Attribute<'ctx>> {
        unsafe {
            Attribute::from_raw_opt(LLVMGetCallSiteStringAttribute(
                self.as_raw(),
                index.as_raw(),
                key.as_ptr() as *const c_char,
                key.len() as u32,
            ))
        }
    }

    pub fn add_attribute(self, index: AttributeIndex, attribute: Attribute<'ctx>) {
        unsafe { LLVMAddCallSiteAttribute(self.as_raw(), index.as_raw(), attribute.as_raw()) }
    }

    pub fn remove_enum_attribute(self, index: AttributeIndex, kind_id: u32) {
        unsafe { LLVMRemoveCallSiteEnumAttribute(self.as_raw(), index.as_raw(), kind_id) }
    }

    pub fn remove_string_attribute(self, index: AttributeIndex, key: &str) {
        unsafe {
            LLVMRemoveCallSiteStringAttribute(
                self.as_raw(),
                index.as_raw(),
                key.as_ptr() as *const c_char,
                key.len() as u32,
            )
        }
    }

    pub fn set_param_alignment(self, index: AttributeIndex, align: u32) {
        unsafe { LLVMSetInstrParamAlignment(self.as_raw(), index.as_raw(), align) }
    }

    pub fn operand_bundle_count(self) -> u32 {
        unsafe { LLVMGetNumOperandBundles(self.as_raw()) }
    }

    /// Copy of operand bundle `index`.
    pub fn operand_bundle(self, index: u32) -> LlvmResult<Option<OperandBundle>> {
        if index >= self.operand_bundle_count() {
            return Ok(None);
        }
        let raw = unsafe { LLVMGetOperandBundleAtIndex(self.as_raw(), index) };
        unsafe { OperandBundle::from_raw(raw) }.map(Some)
    }
}

impl<'ctx> CmpInst<'ctx> {
    pub fn int_predicate(self) -> Option<IntPredicate> {
        (opcode_of(self.as_raw()) == Some(Opcode::LLVMICmp))
            .then(|| IntPredicate::from(unsafe { LLVMGetICmpPredicate(self.as_raw()) }))
    }

    pub fn real_predicate(self) -> Option<RealPredicate> {
        (opcode_of(self.as_raw()) == Some(Opcode::LLVMFCmp))
            .then(|| RealPredicate::from(unsafe { LLVMGetFCmpPredicate(self.as_raw()) }))
    }
}

impl<'ctx> GepInst<'ctx> {
    pub fn is_in_bounds(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsInBounds(self.as_raw()) })
    }

    pub fn set_in_bounds(self, in_bounds: bool) {
        unsafe { LLVMSetIsInBounds(self.as_raw(), llvm_bool(in_bounds)) }
    }

    pub fn source_element_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGetGEPSourceElementType(self.as_raw())) }
    }

    pub fn index_count(self) -> u32 {
        unsafe { LLVMGetNumIndices(self.as_raw()) }
    }
}

impl<'ctx> PhiNode<'ctx> {
    pub fn add_incoming(self, incoming: &[(Value<'ctx>, BasicBlock<'ctx>)]) {
        let mut values: Vec<LLVMValueRef> = incoming.iter().map(|(v, _)| v.as_raw()).collect();
        let mut blocks: Vec<LLVMBasicBlockRef> = incoming.iter().map(|(_, b)| b.as_raw()).collect();
        unsafe {
            LLVMAddIncoming(
                self.as_raw(),
                values.as_mut_ptr(),
                blocks.as_mut_ptr(),
                incoming.len() as u32,
            )
        }
    }

    pub fn count_incoming(self) -> u32 {
        unsafe { LLVMCountIncoming(self.as_raw()) }
    }

    pub fn incoming(self, index: u32) -> Option<(Value<'ctx>, BasicBlock<'ctx>)> {
        if index >= self.count_incoming() {
            return None;
        }
        unsafe {
            Some((
                Value::from_raw(LLVMGetIncomingValue(self.as_raw(), index)),
                BasicBlock::from_raw(LLVMGetIncomingBlock(self.as_raw(), index)),
            ))
        }
    }
}

impl<'ctx> SwitchInst<'ctx> {
    pub fn default_dest(self) -> BasicBlock<'ctx> {
        unsafe { BasicBlock::from_raw(LLVMGetSwitchDefaultDest(self.as_raw())) }
    }

    pub fn add_case(self, on: ConstantInt<'ctx>, dest: BasicBlock<'ctx>) {
        unsafe { LLVMAddCase(self.as_raw(), on.as_raw(), dest.as_raw()) }
    }
}

impl<'ctx> BranchInst<'ctx> {
    pub fn is_conditional(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsConditional(self.as_raw()) })
    }

    pub fn condition(self) -> Option<Value<'ctx>> {
        if !self.is_conditional() {
            return None;
        }
        unsafe { Value::from_raw_opt(LLVMGetCondition(self.as_raw())) }
    }

    pub fn set_condition(self, condition: Value<'ctx>) -> LlvmResult<()> {
        if !self.is_conditional() {
            return Err(flag_error("set_condition", self.into()));
        }
        unsafe { LLVMSetCondition(self.as_raw(), condition.as_raw()) };
        Ok(())
    }
}

impl<'ctx> AllocaInst<'ctx> {
    pub fn allocated_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGetAllocatedType(self.as_raw())) }
    }

    pub fn alignment(self) -> u32 {
        unsafe { LLVMGetAlignment(self.as_raw()) }
    }

    pub fn set_alignment(self, bytes: u32) {
        unsafe { LLVMSetAlignment(self.as_raw(), bytes) }
    }
}

impl<'ctx> MemoryInst<'ctx> {
    pub fn is_load(self) -> bool {
        opcode_of(self.as_raw()) == Some(Opcode::LLVMLoad)
    }

    pub fn is_volatile(self) -> bool {
        from_llvm_bool(unsafe { LLVMGetVolatile(self.as_raw()) })
    }

    pub fn set_volatile(self, volatile: bool) {
        unsafe { LLVMSetVolatile(self.as_raw(), llvm_bool(volatile)) }
    }

    pub fn ordering(self) -> AtomicOrdering {
        AtomicOrdering::from(unsafe { LLVMGetOrdering(self.as_raw()) })
    }

    pub fn set_ordering(self, ordering: AtomicOrdering) {
        unsafe { LLVMSetOrdering(self.as_raw(), ordering.into()) }
    }

    pub fn alignment(self) -> u32 {
        unsafe { LLVMGetAlignment(self.as_raw()) }
    }

    pub fn set_alignment(self, bytes: u32) {
        unsafe { LLVMSetAlignment(self.as_raw(), bytes) }
    }
}

impl<'ctx> AtomicInst<'ctx> {
    fn opcode(self) -> Option<Opcode> {
        opcode_of(self.as_raw())
    }

    /// Ordering of an `atomicrmw` or `fence`.
    pub fn ordering(self) -> Option<AtomicOrdering> {
        matches!(self.opcode(), Some(Opcode::LLVMAtomicRMW | Opcode::LLVMFence))
            .then(|| AtomicOrdering::from(unsafe { LLVMGetOrdering(self.as_raw()) }))
    }

    pub fn set_ordering(self, ordering: AtomicOrdering) -> LlvmResult<()> {
        if !matches!(self.opcode(), Some(Opcode::LLVMAtomicRMW | Opcode::LLVMFence)) {
            return Err(flag_error("set_ordering", self.into()));
        }
        unsafe { LLVMSetOrdering(self.as_raw(), ordering.into()) };
        Ok(())
    }

    pub fn is_single_thread(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsAtomicSingleThread(self.as_raw()) })
    }

    pub fn set_single_thread(self, single_thread: bool) {
        unsafe { LLVMSetAtomicSingleThread(self.as_raw(), llvm_bool(single_thread)) }
    }

    pub fn rmw_bin_op(self) -> Option<AtomicRmwBinOp> {
        if self.opcode() != Some(Opcode::LLVMAtomicRMW) {
            return None;
        }
        AtomicRmwBinOp::from_llvm(unsafe { LLVMGetAtomicRMWBinOp(self.as_raw()) })
    }

    pub fn set_rmw_bin_op(self, op: AtomicRmwBinOp) -> LlvmResult<()> {
        if self.opcode() != Some(Opcode::LLVMAtomicRMW) {
            return Err(flag_error("set_rmw_bin_op", self.into()));
        }
        unsafe { LLVMSetAtomicRMWBinOp(self.as_raw(), op.into()) };
        Ok(())
    }

    fn is_cmpxchg(self) -> bool {
        self.opcode() == Some(Opcode::LLVMAtomicCmpXchg)
    }

    pub fn success_ordering(self) -> Option<AtomicOrdering> {
        self.is_cmpxchg()
            .then(|| AtomicOrdering::from(unsafe { LLVMGetCmpXchgSuccessOrdering(self.as_raw()) }))
    }

    pub fn set_success_ordering(self, ordering: AtomicOrdering) -> LlvmResult<()> {
        if !self.is_cmpxchg() {
            return Err(flag_error("set_success_ordering", self.into()));
        }
        unsafe { LLVMSetCmpXchgSuccessOrdering(self.as_raw(), ordering.into()) };
        Ok(())
    }

    pub fn failure_ordering(self) -> Option<AtomicOrdering> {
        self.is_cmpxchg()
            .then(|| AtomicOrdering::from(unsafe { LLVMGetCmpXchgFailureOrdering(self.as_raw()) }))
    }

    pub fn set_failure_ordering(self, ordering: AtomicOrdering) -> LlvmResult<()> {
        if !self.is_cmpxchg() {
            return Err(flag_error("set_failure_ordering", self.into()));
        }
        unsafe { LLVMSetCmpXchgFailureOrdering(self.as_raw(), ordering.into()) };
        Ok(())
    }

    pub fn is_weak(self) -> Option<bool> {
        self.is_cmpxchg()
            .then(|| from_llvm_bool(unsafe { LLVMGetWeak(self.as_raw()) }))
    }

    pub fn set_weak(self, weak: bool) -> LlvmResult<()> {
        if !self.is_cmpxchg() {
            return Err(flag_error("set_weak", self.into()));
        }
        unsafe { LLVMSetWeak(self.as_raw(), llvm_bool(weak)) };
        Ok(())
    }
}

impl AggregateInst<'_> {
    pub fn indices(self) -> Vec<u32> {
        let count = unsafe { LLVMGetNumIndices(self.as_raw()) } as usize;
        let ptr = unsafe { LLVMGetIndices(self.as_raw()) };
        if ptr.is_null() || count == 0 {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(ptr, count) }.to_vec()
    }
}

impl ShuffleVectorInst<'_> {
    /// Mask elements; `None` marks an undefined lane.
    pub fn mask(self) -> Vec<Option<i32>> {
        let count = unsafe { LLVMGetNumMaskElements(self.as_raw()) };
        let undef = unsafe { LLVMGetUndefMaskElem() };
        (0..count)
            .map(|i| {
                let lane = unsafe { LLVMGetMaskValue(self.as_raw(), i) };
                (lane != undef).then_some(lane)
            })
            .collect()
    }
}

impl<'ctx> LandingPadInst<'ctx> {
    pub fn clause_count(self) -> u32 {
        unsafe { LLVMGetNumClauses(self.as_raw()) }
    }

    pub fn clause(self, index: u32) -> Option<Value<'ctx>> {
        if index >= self.clause_count() {
            return None;
        }
        unsafe { Value::from_raw_opt(LLVMGetClause(self.as_raw(), index)) }
    }

    pub fn add_clause(self, clause: Value<'ctx>) {
        unsafe { LLVMAddClause(self.as_raw(), clause.as_raw()) }
    }

    pub fn is_cleanup(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsCleanup(self.as_raw()) })
    }

    pub fn set_cleanup(self, cleanup: bool) {
        unsafe { LLVMSetCleanup(self.as_raw(), llvm_bool(cleanup)) }
    }
}

impl<'ctx> FuncletInst<'ctx> {
    fn opcode(self) -> Option<Opcode> {
        opcode_of(self.as_raw())
    }

    /// Handlers of a `catchswitch`.
    pub fn handlers(self) -> Vec<BasicBlock<'ctx>> {
        if self.opcode() != Some(Opcode::LLVMCatchSwitch) {
            return Vec::new();
        }
        let count = unsafe { LLVMGetNumHandlers(self.as_raw()) } as usize;
        let mut raw: Vec<LLVMBasicBlockRef> = vec![std::ptr::null_mut(); count];
        unsafe { LLVMGetHandlers(self.as_raw(), raw.as_mut_ptr()) };
        raw.into_iter().map(|b| unsafe { BasicBlock::from_raw(b) }).collect()
    }

    pub fn add_handler(self, handler: BasicBlock<'ctx>) -> LlvmResult<()> {
        if self.opcode() != Some(Opcode::LLVMCatchSwitch) {
            return Err(flag_error("add_handler", self.into()));
        }
        unsafe { LLVMAddHandler(self.as_raw(), handler.as_raw()) };
        Ok(())
    }

    /// Unwind destination of a `catchswitch` or `cleanupret`.
    pub fn unwind_dest(self) -> Option<BasicBlock<'ctx>> {
        if !matches!(self.opcode(), Some(Opcode::LLVMCatchSwitch | Opcode::LLVMCleanupRet)) {
            return None;
        }
        unsafe { BasicBlock::from_raw_opt(LLVMGetUnwindDest(self.as_raw())) }
    }

    /// The `catchswitch` a `catchpad` belongs to.
    pub fn parent_catch_switch(self) -> Option<FuncletInst<'ctx>> {
        if self.opcode() != Some(Opcode::LLVMCatchPad) {
            return None;
        }
        let raw = unsafe { LLVMGetParentCatchSwitch(self.as_raw()) };
        (!raw.is_null()).then(|| unsafe { FuncletInst::from_raw_unchecked(raw) })
    }

    pub fn set_parent_catch_switch(self, catch_switch: FuncletInst<'ctx>) -> LlvmResult<()> {
        if self.opcode() != Some(Opcode::LLVMCatchPad)
            || catch_switch.opcode() != Some(Opcode::LLVMCatchSwitch)
        {
            return Err(flag_error("set_parent_catch_switch", self.into()));
        }
        unsafe { LLVMSetParentCatchSwitch(self.as_raw(), catch_switch.as_raw()) };
        Ok(())
    }

    /// Arguments of a `catchpad` or `cleanuppad`.
    pub fn arg_operands(self) -> Vec<Value<'ctx>> {
        if !matches!(self.opcode(), Some(Opcode::LLVMCatchPad | Opcode::LLVMCleanupPad)) {
            return Vec::new();
        }
        let count = unsafe { LLVMGetNumArgOperands(self.as_raw()) };
        (0..count)
            .filter_map(|i| unsafe { Value::from_raw_opt(LLVMGetArgOperand(self.as_raw(), i)) })
            .collect()
    }
}

/// An instruction dispatched on its opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyInstruction<'ctx> {
    Call(CallInst<'ctx>),
    Invoke(CallInst<'ctx>),
    FCmp(CmpInst<'ctx>),
    ICmp(CmpInst<'ctx>),
    GetElementPtr(GepInst<'ctx>),
    Phi(PhiNode<'ctx>),
    ShuffleVector(ShuffleVectorInst<'ctx>),
    Ret(Instruction<'ctx>),
    Switch(SwitchInst<'ctx>),
    CatchSwitch(FuncletInst<'ctx>),
    CleanupRet(FuncletInst<'ctx>),
    CatchPad(FuncletInst<'ctx>),
    Alloca(AllocaInst<'ctx>),
    InsertValue(AggregateInst<'ctx>),
    ExtractValue(AggregateInst<'ctx>),
    Br(BranchInst<'ctx>),
    IndirectBr(Instruction<'ctx>),
    LandingPad(LandingPadInst<'ctx>),
    Load(MemoryInst<'ctx>),
    Store(MemoryInst<'ctx>),
    AtomicRmw(AtomicInst<'ctx>),
    AtomicCmpXchg(AtomicInst<'ctx>),
    Fence(AtomicInst<'ctx>),
    Other(Instruction<'ctx>),
}

impl<'ctx> From<Instruction<'ctx>> for AnyInstruction<'ctx> {
    fn from(inst: Instruction<'ctx>) -> Self {
        let raw = inst.as_raw();
        unsafe {
            match inst.opcode() {
                Opcode::LLVMCall => AnyInstruction::Call(CallInst::from_raw_unchecked(raw)),
                Opcode::LLVMInvoke => AnyInstruction::Invoke(CallInst::from_raw_unchecked(raw)),
                Opcode::LLVMFCmp => AnyInstruction::FCmp(CmpInst::from_raw_unchecked(raw)),
                Opcode::LLVMICmp => AnyInstruction::ICmp(CmpInst::from_raw_unchecked(raw)),
                Opcode::LLVMGetElementPtr => AnyInstruction::GetElementPtr(GepInst::from_raw_unchecked(raw)),
                Opcode::LLVMPHI => AnyInstruction::Phi(PhiNode::from_raw_unchecked(raw)),
                Opcode::LLVMShuffleVector => {
                    AnyInstruction::ShuffleVector(ShuffleVectorInst::from_raw_unchecked(raw))
                }
                Opcode::LLVMRet => AnyInstruction::Ret(inst),
                Opcode::LLVMSwitch => AnyInstruction::Switch(SwitchInst::from_raw_unchecked(raw)),
                Opcode::LLVMCatchSwitch => AnyInstruction::CatchSwitch(FuncletInst::from_raw_unchecked(raw)),
                Opcode::LLVMCleanupRet => AnyInstruction::CleanupRet(FuncletInst::from_raw_unchecked(raw)),
                Opcode::LLVMCatchPad => AnyInstruction::CatchPad(FuncletInst::from_raw_unchecked(raw)),
                Opcode::LLVMAlloca => AnyInstruction::Alloca(AllocaInst::from_raw_unchecked(raw)),
                Opcode::LLVMInsertValue => AnyInstruction::InsertValue(AggregateInst::from_raw_unchecked(raw)),
                Opcode::LLVMExtractValue => {
                    AnyInstruction::ExtractValue(AggregateInst::from_raw_unchecked(raw))
                }
                Opcode::LLVMBr => AnyInstruction::Br(BranchInst::from_raw_unchecked(raw)),
                Opcode::LLVMIndirectBr => AnyInstruction::IndirectBr(inst),
                Opcode::LLVMLandingPad => AnyInstruction::LandingPad(LandingPadInst::from_raw_unchecked(raw)),
                Opcode::LLVMLoad => AnyInstruction::Load(MemoryInst::from_raw_unchecked(raw)),
                Opcode::LLVMStore => AnyInstruction::Store(MemoryInst::from_raw_unchecked(raw)),
                Opcode::LLVMAtomicRMW => AnyInstruction::AtomicRmw(AtomicInst::from_raw_unchecked(raw)),
                Opcode::LLVMAtomicCmpXchg => AnyInstruction::AtomicCmpXchg(AtomicInst::from_raw_unchecked(raw)),
                Opcode::LLVMFence => AnyInstruction::Fence(AtomicInst::from_raw_unchecked(raw)),
                _ => AnyInstruction::Other(inst),
            }
        }
    }
}

impl<'ctx> AnyInstruction<'ctx> {
    pub fn as_instruction(self) -> Instruction<'ctx> {
        match self {
            AnyInstruction::Call(i) | AnyInstruction::Invoke(i) => i.into(),
            AnyInstruction::FCmp(i) | AnyInstruction::ICmp(i) => i.into(),
            AnyInstruction::GetElementPtr(i) => i.into(),
            AnyInstruction::Phi(i) => i.into(),
            AnyInstruction::ShuffleVector(i) => i.into(),
            AnyInstruction::Ret(i) | AnyInstruction::IndirectBr(i) | AnyInstruction::Other(i) => i,
            AnyInstruction::Switch(i) => i.into(),
            AnyInstruction::CatchSwitch(i) | AnyInstruction::CleanupRet(i) | AnyInstruction::CatchPad(i) => {
                i.into()
            }
            AnyInstruction::Alloca(i) => i.into(),
            AnyInstruction::InsertValue(i) | AnyInstruction::ExtractValue(i) => i.into(),
            AnyInstruction::Br(i) => i.into(),
            AnyInstruction::LandingPad(i) => i.into(),
            AnyInstruction::Load(i) | AnyInstruction::Store(i) => i.into(),
            AnyInstruction::AtomicRmw(i) | AnyInstruction::AtomicCmpXchg(i) | AnyInstruction::Fence(i) => {
                i.into()
            }
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            AnyInstruction::Call(_) => "CallInst",
            AnyInstruction::Invoke(_) => "InvokeInst",
            AnyInstruction::FCmp(_) => "FCmpInst",
            AnyInstruction::ICmp(_) => "ICmpInst",
            AnyInstruction::GetElementPtr(_) => "GetElementPtrInst",
            AnyInstruction::Phi(_) => "PHINode",
            AnyInstruction::ShuffleVector(_) => "ShuffleVectorInst",
            AnyInstruction::Ret(_) => "ReturnInst",
            AnyInstruction::Switch(_) => "SwitchInst",
            AnyInstruction::CatchSwitch(_) => "CatchSwitchInst",
            AnyInstruction::CleanupRet(_) => "CleanupReturnInst",
            AnyInstruction::CatchPad(_) => "CatchPadInst",
            AnyInstruction::Alloca(_) => "AllocaInst",
            AnyInstruction::InsertValue(_) => "InsertValueInst",
            AnyInstruction::ExtractValue(_) => "ExtractValueInst",
            AnyInstruction::Br(_) => "BranchInst",
            AnyInstruction::IndirectBr(_) => "IndirectBrInst",
            AnyInstruction::LandingPad(_) => "LandingPadInst",
            AnyInstruction::Load(_) => "LoadInst",
            AnyInstruction::Store(_) => "StoreInst",
            AnyInstruction::AtomicRmw(_) => "AtomicRMWInst",
            AnyInstruction::AtomicCmpXchg(_) => "AtomicCmpXchgInst",
            AnyInstruction::Fence(_) => "FenceInst",
            AnyInstruction::Other(_) => "Instruction",
        }
    }

    pub fn is_terminator(&self) -> bool {
        self.as_instruction().is_terminator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::enums::IntPredicate;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_flags_are_checked_by_opcode() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("flags").unwrap();
        let i32_ty = ctx.i32_type();
        let fn_ty = i32_ty.fn_type(&[i32_ty.as_type(), i32_ty.as_type()], false);
        let function = module.add_function("f", fn_ty).unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);

        let a = function.param(0).unwrap().as_value();
        let b = function.param(1).unwrap().as_value();
        let sum = builder.build_nsw_add(a, b, "sum").unwrap();
        let cmp = builder.build_icmp(IntPredicate::Slt, sum, b, "lt").unwrap();
        builder.build_ret(Some(sum)).unwrap();

        let sum = Instruction::try_from(sum).unwrap();
        assert_eq!(sum.opcode(), Opcode::LLVMAdd);
        assert_eq!(sum.no_signed_wrap(), Some(true));
        assert_eq!(sum.no_unsigned_wrap(), Some(false));
        sum.set_no_unsigned_wrap(true).unwrap();
        assert_eq!(sum.no_unsigned_wrap(), Some(true));
        assert_eq!(sum.is_exact(), None);
        assert!(sum.set_exact(true).is_err());
        assert!(sum.fast_math_flags().is_none());

        let cmp = CmpInst::try_from(cmp).unwrap();
        assert_eq!(cmp.int_predicate(), Some(IntPredicate::Slt));
        assert_eq!(cmp.real_predicate(), None);
        assert_eq!(Instruction::from(cmp).classify().class_name(), "ICmpInst");
    }

    #[test]
    fn test_cast_flags() {
        init();
        let ctx = Context::create().unwrap();
        let module = crate::ir_reader::parse_assembly(
            &ctx,
            r#"
define float @casts(i32 %x) {
  %narrow = trunc nuw i32 %x to i8
  %wide = zext nneg i8 %narrow to i64
  %real = uitofp nneg i32 %x to float
  %signed = sitofp i32 %x to float
  %sum = fadd float %real, %signed
  ret float %sum
}
"#,
        )
        .unwrap();
        let entry = module.get_function("casts").unwrap().unwrap().entry_block().unwrap();
        let insts: Vec<Instruction<'_>> = entry.instructions().collect();

        let trunc = insts[0];
        assert_eq!(trunc.opcode(), Opcode::LLVMTrunc);
        assert_eq!(trunc.no_unsigned_wrap(), Some(true));
        assert_eq!(trunc.no_signed_wrap(), Some(false));
        trunc.set_no_signed_wrap(true).unwrap();
        assert_eq!(trunc.no_signed_wrap(), Some(true));

        assert_eq!(insts[1].is_non_negative(), Some(true));
        let uitofp = insts[2];
        assert_eq!(uitofp.opcode(), Opcode::LLVMUIToFP);
        assert_eq!(uitofp.is_non_negative(), Some(true));
        uitofp.set_non_negative(false).unwrap();
        assert_eq!(uitofp.is_non_negative(), Some(false));

        let sitofp = insts[3];
        assert_eq!(sitofp.is_non_negative(), None);
        assert!(sitofp.set_non_negative(true).is_err());
        assert_eq!(sitofp.no_unsigned_wrap(), None);
    }

    #[test]
    fn test_terminator_successors() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("branches").unwrap();
        let fn_ty = ctx.void_type().fn_type(&[ctx.bool_type().as_type()], false);
        let function = module.add_function("g", fn_ty).unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let yes = ctx.append_basic_block(function, "yes").unwrap();
        let no = ctx.append_basic_block(function, "no").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        let cond = function.param(0).unwrap().as_value();
        let br = builder.build_cond_br(cond, yes, no).unwrap();
        builder.position_at_end(yes);
        let ret = builder.build_ret_void().unwrap();
        builder.position_at_end(no);
        builder.build_unreachable().unwrap();

        let br_inst = Instruction::try_from(br).unwrap();
        assert!(br_inst.is_terminator());
        assert_eq!(br_inst.successors(), vec![yes, no]);
        br_inst.set_successor(1, yes).unwrap();
        assert_eq!(br_inst.successor(1), Some(yes));
        assert!(br_inst.set_successor(2, yes).is_err());

        let branch = BranchInst::try_from(br).unwrap();
        assert!(branch.is_conditional());
        assert_eq!(branch.condition(), Some(cond));

        let ret = Instruction::try_from(ret).unwrap();
        assert_eq!(ret.successor_count(), 0);
        assert_eq!(ret.classify().class_name(), "ReturnInst");
        assert_eq!(ret.parent(), Some(yes));
    }

    #[test]
    fn test_clone_and_remove() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("clone").unwrap();
        let i8_ty = ctx.i8_type();
        let fn_ty = i8_ty.fn_type(&[i8_ty.as_type()], false);
        let function = module.add_function("h", fn_ty).unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        let x = function.param(0).unwrap().as_value();
        let doubled = builder.build_add(x, x, "doubled").unwrap();
        builder.build_ret(Some(doubled)).unwrap();

        let inst = Instruction::try_from(doubled).unwrap();
        let copy = inst.clone_instruction();
        assert!(copy.parent().is_none());
        assert_eq!(copy.opcode(), Opcode::LLVMAdd);
        unsafe { copy.delete() };

        let phi_free = entry.instructions().count();
        assert_eq!(phi_free, 2);
    }
}
