//! Function types.

use crate::support::from_llvm_bool;
use crate::types::Type;
use llvm_sys::core::{LLVMCountParamTypes, LLVMGetParamTypes, LLVMGetReturnType, LLVMIsFunctionVarArg};
use llvm_sys::prelude::LLVMTypeRef;

type_view!(
    /// The signature of a function.
    FunctionType, "FunctionType", LLVMFunctionTypeKind
);

impl<'ctx> FunctionType<'ctx> {
    pub fn return_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGetReturnType(self.as_raw())) }
    }

    pub fn param_count(self) -> u32 {
        unsafe { LLVMCountParamTypes(self.as_raw()) }
    }

    pub fn param_types(self) -> Vec<Type<'ctx>> {
        let mut raw: Vec<LLVMTypeRef> = vec![std::ptr::null_mut(); self.param_count() as usize];
        unsafe { LLVMGetParamTypes(self.as_raw(), raw.as_mut_ptr()) };
        raw.into_iter().map(|t| unsafe { Type::from_raw(t) }).collect()
    }

    pub fn is_var_arg(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsFunctionVarArg(self.as_raw()) })
    }
}
