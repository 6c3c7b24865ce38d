//! Pointer types. Since LLVM 17 every pointer is opaque.

use crate::support::from_llvm_bool;
use crate::values::Constant;
use llvm_sys::core::{LLVMConstPointerNull, LLVMGetPointerAddressSpace, LLVMPointerTypeIsOpaque};

type_view!(
    /// A pointer into some address space.
    PointerType, "PointerType", LLVMPointerTypeKind
);

impl<'ctx> PointerType<'ctx> {
    pub fn const_pointer_null(self) -> Constant<'ctx> {
        unsafe { Constant::from_raw_unchecked(LLVMConstPointerNull(self.as_raw())) }
    }

    pub fn address_space(self) -> u32 {
        unsafe { LLVMGetPointerAddressSpace(self.as_raw()) }
    }

    pub fn is_opaque(self) -> bool {
        from_llvm_bool(unsafe { LLVMPointerTypeIsOpaque(self.as_raw()) })
    }
}
