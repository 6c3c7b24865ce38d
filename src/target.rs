// Bindings for llvm-c/Target.h. TargetData wraps LLVMTargetDataRef as an owning handle in the
// ownership cache, created from a layout string and freed once with LLVMDisposeTargetData.
// LLVMGetModuleDataLayout returns a pointer owned by the module; rather than carry a borrowed
// handle with a lifetime, Module::target_data builds an owned copy from the module's layout
// string, which answers every query identically. The size and alignment queries take any
// sized type; offset queries require a struct type and check the element index first, since
// LLVM asserts on out-of-range elements. Target initialisation covers the native target and
// every target compiled into the linked LLVM.

//! Target data layouts and target initialisation.

use crate::context::Context;
use crate::enums::ByteOrdering;
use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::module::Module;
use crate::support::{from_llvm_bool, to_cstring, LlvmString};
use crate::types::{IntType, StructType, Type};
use crate::values::GlobalVariable;
use llvm_sys::target::*;
use std::fmt;

owned_kind!(
    pub(crate) TargetDataKind,
    LLVMOpaqueTargetData,
    LLVMDisposeTargetData,
    "target data"
);

/// A parsed data layout.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TargetData {
    handle: Shared<TargetDataKind>,
}

impl TargetData {
    /// Parse a data layout string such as `e-m:e-i64:64-n8:16:32:64-S128`.
    pub fn create(layout: &str) -> LlvmResult<Self> {
        let c_layout = to_cstring(layout)?;
        let raw = unsafe { LLVMCreateTargetData(c_layout.as_ptr()) };
        let handle = unsafe { Shared::wrap(raw) }.ok_or(LlvmError::NullHandle { what: "target data" })?;
        Ok(Self { handle })
    }

    /// # Safety
    /// `raw` must be a live layout owned by the caller.
    pub(crate) unsafe fn from_raw(raw: LLVMTargetDataRef) -> LlvmResult<Self> {
        Shared::wrap(raw)
            .map(|handle| Self { handle })
            .ok_or(LlvmError::NullHandle { what: "target data" })
    }

    pub fn as_raw(&self) -> LLVMTargetDataRef {
        self.handle.as_raw()
    }

    /// The layout string this data was built from, normalised by LLVM.
    pub fn string_rep(&self) -> String {
        unsafe { LlvmString::from_raw(LLVMCopyStringRepOfTargetData(self.as_raw())) }
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn byte_order(&self) -> ByteOrdering {
        unsafe { LLVMByteOrder(self.as_raw()) }.into()
    }

    /// Pointer size in bytes for address space 0.
    pub fn pointer_size(&self) -> u32 {
        unsafe { LLVMPointerSize(self.as_raw()) }
    }

    pub fn pointer_size_for_address_space(&self, address_space: u32) -> u32 {
        unsafe { LLVMPointerSizeForAS(self.as_raw(), address_space) }
    }

    /// The integer type as wide as a pointer in address space 0.
    pub fn int_ptr_type<'ctx>(&self, context: &'ctx Context) -> IntType<'ctx> {
        unsafe { IntType::from_raw_unchecked(LLVMIntPtrTypeInContext(context.as_raw(), self.as_raw())) }
    }

    pub fn int_ptr_type_for_address_space<'ctx>(&self, context: &'ctx Context, address_space: u32) -> IntType<'ctx> {
        unsafe {
            IntType::from_raw_unchecked(LLVMIntPtrTypeForASInContext(
                context.as_raw(),
                self.as_raw(),
                address_space,
            ))
        }
    }

    fn sized(operation: &'static str, ty: Type<'_>) -> LlvmResult<()> {
        if !ty.is_sized() {
            return Err(LlvmError::Message {
                operation,
                message: format!("{ty} has no size"),
            });
        }
        Ok(())
    }

    pub fn size_in_bits(&self, ty: Type<'_>) -> LlvmResult<u64> {
        Self::sized("size_in_bits", ty)?;
        Ok(unsafe { LLVMSizeOfTypeInBits(self.as_raw(), ty.as_raw()) })
    }

    /// Bytes written by a store of `ty`.
    pub fn store_size(&self, ty: Type<'_>) -> LlvmResult<u64> {
        Self::sized("store_size", ty)?;
        Ok(unsafe { LLVMStoreSizeOfType(self.as_raw(), ty.as_raw()) })
    }

    /// Allocation size of `ty`, including tail padding.
    pub fn abi_size(&self, ty: Type<'_>) -> LlvmResult<u64> {
        Self::sized("abi_size", ty)?;
        Ok(unsafe { LLVMABISizeOfType(self.as_raw(), ty.as_raw()) })
    }

    pub fn abi_alignment(&self, ty: Type<'_>) -> LlvmResult<u32> {
        Self::sized("abi_alignment", ty)?;
        Ok(unsafe { LLVMABIAlignmentOfType(self.as_raw(), ty.as_raw()) })
    }

    pub fn call_frame_alignment(&self, ty: Type<'_>) -> LlvmResult<u32> {
        Self::sized("call_frame_alignment", ty)?;
        Ok(unsafe { LLVMCallFrameAlignmentOfType(self.as_raw(), ty.as_raw()) })
    }

    pub fn preferred_alignment(&self, ty: Type<'_>) -> LlvmResult<u32> {
        Self::sized("preferred_alignment", ty)?;
        Ok(unsafe { LLVMPreferredAlignmentOfType(self.as_raw(), ty.as_raw()) })
    }

    pub fn preferred_alignment_of_global(&self, global: GlobalVariable<'_>) -> u32 {
        unsafe { LLVMPreferredAlignmentOfGlobal(self.as_raw(), global.as_raw()) }
    }

    /// Index of the field containing byte `offset`.
    pub fn element_at_offset(&self, ty: StructType<'_>, offset: u64) -> LlvmResult<u32> {
        if ty.is_opaque() {
            return Err(LlvmError::Message {
                operation: "element_at_offset",
                message: format!("{ty} is opaque"),
            });
        }
        let size = self.abi_size(ty.as_type())?;
        if offset >= size {
            return Err(LlvmError::Message {
                operation: "element_at_offset",
                message: format!("offset {offset} is past the end of {ty} ({size} bytes)"),
            });
        }
        Ok(unsafe { LLVMElementAtOffset(self.as_raw(), ty.as_raw(), offset) })
    }

    /// Byte offset of field `element`.
    pub fn offset_of_element(&self, ty: StructType<'_>, element: u32) -> LlvmResult<u64> {
        if ty.is_opaque() || element >= ty.count_fields() {
            return Err(LlvmError::Message {
                operation: "offset_of_element",
                message: format!("no field {element} in {ty}"),
            });
        }
        Ok(unsafe { LLVMOffsetOfElement(self.as_raw(), ty.as_raw(), element) })
    }
}

impl fmt::Debug for TargetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetData").field(&self.string_rep()).finish()
    }
}

impl fmt::Display for TargetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_rep())
    }
}

impl Module {
    /// An owned copy of the module's data layout.
    pub fn target_data(&self) -> LlvmResult<TargetData> {
        TargetData::create(&self.data_layout())
    }

    pub fn set_target_data(&self, data: &TargetData) {
        unsafe { LLVMSetModuleDataLayout(self.as_raw(), data.as_raw()) }
    }
}

fn init_step(what: &str, failed: llvm_sys::prelude::LLVMBool) -> LlvmResult<()> {
    if from_llvm_bool(failed) {
        return Err(LlvmError::Target {
            message: format!("no native {what} in this LLVM build"),
        });
    }
    Ok(())
}

/// Register the host target with its asm printer, asm parser and disassembler.
pub fn initialize_native_target() -> LlvmResult<()> {
    unsafe {
        init_step("target", LLVM_InitializeNativeTarget())?;
        init_step("asm printer", LLVM_InitializeNativeAsmPrinter())?;
        init_step("asm parser", LLVM_InitializeNativeAsmParser())?;
        init_step("disassembler", LLVM_InitializeNativeDisassembler())?;
    }
    log::debug!("initialized native target");
    Ok(())
}

/// Register every target compiled into LLVM.
pub fn initialize_all_targets() {
    unsafe {
        LLVM_InitializeAllTargetInfos();
        LLVM_InitializeAllTargets();
        LLVM_InitializeAllTargetMCs();
        LLVM_InitializeAllAsmPrinters();
        LLVM_InitializeAllAsmParsers();
        LLVM_InitializeAllDisassemblers();
    }
    log::debug!("initialized all targets");
}
