// BasicBlock wraps LLVMBasicBlockRef. Blocks are borrowed views like values: they belong to
// a function (or to nobody, right after LLVMCreateBasicBlockInContext) and are freed with it.
// The view converts to and from its value form, walks its neighbours and instructions, and
// exposes the block-level edits of llvm-c/Core.h (move, unlink, delete).

//! Basic blocks.

use crate::error::{LlvmError, LlvmResult};
use crate::iter::Chain;
use crate::support::string_from_ptr;
use crate::values::{FunctionValue, Instruction, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::LLVMBasicBlockRef;
use std::fmt;
use std::marker::PhantomData;

/// A basic block inside (or detached from) a function.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlock<'ctx> {
    raw: LLVMBasicBlockRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> BasicBlock<'ctx> {
    /// # Safety
    /// `raw` must be a live, non-null basic block.
    pub unsafe fn from_raw(raw: LLVMBasicBlockRef) -> Self {
        debug_assert!(!raw.is_null());
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `raw` must be null or a live basic block.
    pub unsafe fn from_raw_opt(raw: LLVMBasicBlockRef) -> Option<Self> {
        (!raw.is_null()).then(|| Self::from_raw(raw))
    }

    pub fn as_raw(self) -> LLVMBasicBlockRef {
        self.raw
    }

    pub fn as_value(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMBasicBlockAsValue(self.raw)) }
    }

    pub fn name(self) -> String {
        unsafe { string_from_ptr(LLVMGetBasicBlockName(self.raw)) }
    }

    /// The function holding the block, `None` while detached.
    pub fn parent(self) -> Option<FunctionValue<'ctx>> {
        let raw = unsafe { LLVMGetBasicBlockParent(self.raw) };
        (!raw.is_null()).then(|| unsafe { FunctionValue::from_raw_unchecked(raw) })
    }

    pub fn terminator(self) -> Option<Instruction<'ctx>> {
        let raw = unsafe { LLVMGetBasicBlockTerminator(self.raw) };
        (!raw.is_null()).then(|| unsafe { Instruction::from_raw_unchecked(raw) })
    }

    pub fn next(self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetNextBasicBlock(self.raw)) }
    }

    pub fn previous(self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetPreviousBasicBlock(self.raw)) }
    }

    pub fn first_instruction(self) -> Option<Instruction<'ctx>> {
        let raw = unsafe { LLVMGetFirstInstruction(self.raw) };
        (!raw.is_null()).then(|| unsafe { Instruction::from_raw_unchecked(raw) })
    }

    pub fn last_instruction(self) -> Option<Instruction<'ctx>> {
        let raw = unsafe { LLVMGetLastInstruction(self.raw) };
        (!raw.is_null()).then(|| unsafe { Instruction::from_raw_unchecked(raw) })
    }

    pub fn instructions(self) -> Chain<Instruction<'ctx>> {
        Chain::new(self.first_instruction(), Instruction::next_instruction)
    }

    fn check_movable(self, operation: &'static str, other: BasicBlock<'ctx>) -> LlvmResult<()> {
        if self.parent().is_none() || other.parent().is_none() {
            return Err(LlvmError::Message {
                operation,
                message: String::from("both blocks must belong to a function"),
            });
        }
        Ok(())
    }

    /// Move this block right before `position` in the function layout.
    pub fn move_before(self, position: BasicBlock<'ctx>) -> LlvmResult<()> {
        self.check_movable("move_before", position)?;
        unsafe { LLVMMoveBasicBlockBefore(self.raw, position.raw) };
        Ok(())
    }

    /// Move this block right after `position` in the function layout.
    pub fn move_after(self, position: BasicBlock<'ctx>) -> LlvmResult<()> {
        self.check_movable("move_after", position)?;
        unsafe { LLVMMoveBasicBlockAfter(self.raw, position.raw) };
        Ok(())
    }

    /// Unlink the block from its function without freeing it.
    pub fn remove_from_parent(self) {
        if self.parent().is_some() {
            unsafe { LLVMRemoveBasicBlockFromParent(self.raw) }
        }
    }

    /// Unlink and free the block.
    ///
    /// # Safety
    /// No copy of this view, and no branch to the block, may remain.
    pub unsafe fn delete(self) {
        LLVMDeleteBasicBlock(self.raw)
    }
}

impl fmt::Debug for BasicBlock<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BasicBlock(%{})", self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_block_layout() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("blocks").unwrap();
        let function = module
            .add_function("f", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let a = ctx.append_basic_block(function, "a").unwrap();
        let b = ctx.append_basic_block(function, "b").unwrap();
        let c = ctx.append_basic_block(function, "c").unwrap();
        assert_eq!(a.parent(), Some(function));
        assert_eq!(a.next(), Some(b));
        assert_eq!(c.previous(), Some(b));
        assert_eq!(a.as_value().as_basic_block(), Some(a));

        c.move_before(a).unwrap();
        let names: Vec<String> = function.basic_blocks().map(|bb| bb.name()).collect();
        assert_eq!(names, ["c", "a", "b"]);

        b.remove_from_parent();
        assert!(b.parent().is_none());
        assert_eq!(function.count_basic_blocks(), 2);
        assert!(b.move_after(a).is_err());
        function.append_existing_basic_block(b).unwrap();
        assert_eq!(function.last_basic_block(), Some(b));
    }

    #[test]
    fn test_terminator_and_instructions() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("insts").unwrap();
        let function = module
            .add_function("g", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        assert!(entry.terminator().is_none());
        assert!(entry.first_instruction().is_none());

        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        builder.build_alloca(ctx.i32_type().as_type(), "slot").unwrap();
        builder.build_ret_void().unwrap();

        assert_eq!(entry.instructions().count(), 2);
        let term = entry.terminator().unwrap();
        assert_eq!(entry.last_instruction(), Some(term));
        assert_eq!(term.classify().class_name(), "ReturnInst");
    }
}
