//! Intrinsic lookup and declaration.
//!
//! An [`Intrinsic`] can only be obtained from a name LLVM knows, or from a function that
//! already is an intrinsic, so the id passed to the `LLVMIntrinsic*` calls is always valid.

use crate::context::Context;
use crate::error::{LlvmError, LlvmResult};
use crate::module::Module;
use crate::support::{from_llvm_bool, string_from_parts, LlvmString};
use crate::types::{FunctionType, Type};
use crate::values::FunctionValue;
use llvm_sys::core::{
    LLVMGetIntrinsicDeclaration, LLVMIntrinsicCopyOverloadedName2, LLVMIntrinsicGetName,
    LLVMIntrinsicGetType, LLVMIntrinsicIsOverloaded, LLVMLookupIntrinsicID,
};
use llvm_sys::prelude::LLVMTypeRef;
use std::ffi::c_char;
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Intrinsic {
    id: u32,
}

fn raw_types(types: &[Type<'_>]) -> Vec<LLVMTypeRef> {
    types.iter().map(|t| t.as_raw()).collect()
}

impl Intrinsic {
    /// Look up an intrinsic by its full name (`llvm.memcpy`).
    pub fn find(name: &str) -> Option<Self> {
        let id = unsafe { LLVMLookupIntrinsicID(name.as_ptr() as *const c_char, name.len()) };
        (id != 0).then_some(Self { id })
    }

    /// The intrinsic a function declares, if any.
    pub fn of_function(function: FunctionValue<'_>) -> Option<Self> {
        let id = function.intrinsic_id();
        (id != 0).then_some(Self { id })
    }

    pub fn id(self) -> u32 {
        self.id
    }

    /// Base name, without overload suffixes.
    pub fn name(self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMIntrinsicGetName(self.id, &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn is_overloaded(self) -> bool {
        from_llvm_bool(unsafe { LLVMIntrinsicIsOverloaded(self.id) })
    }

    fn check_overloads(self, operation: &'static str, param_types: &[Type<'_>]) -> LlvmResult<()> {
        if !self.is_overloaded() && !param_types.is_empty() {
            return Err(LlvmError::Message {
                operation,
                message: format!("{} is not overloaded", self.name()),
            });
        }
        if self.is_overloaded() && param_types.is_empty() {
            return Err(LlvmError::Message {
                operation,
                message: format!("{} needs overload types", self.name()),
            });
        }
        Ok(())
    }

    /// Insert (or find) the declaration in `module`.
    pub fn declaration<'m>(self, module: &'m Module, param_types: &[Type<'m>]) -> LlvmResult<FunctionValue<'m>> {
        self.check_overloads("intrinsic_declaration", param_types)?;
        let mut raw = raw_types(param_types);
        let decl = unsafe {
            LLVMGetIntrinsicDeclaration(module.as_raw(), self.id, raw.as_mut_ptr(), raw.len())
        };
        if decl.is_null() {
            return Err(LlvmError::NullHandle { what: "intrinsic declaration" });
        }
        Ok(unsafe { FunctionValue::from_raw_unchecked(decl) })
    }

    pub fn function_type<'c>(self, context: &'c Context, param_types: &[Type<'c>]) -> LlvmResult<FunctionType<'c>> {
        self.check_overloads("intrinsic_function_type", param_types)?;
        let mut raw = raw_types(param_types);
        let ty = unsafe { LLVMIntrinsicGetType(context.as_raw(), self.id, raw.as_mut_ptr(), raw.len()) };
        if ty.is_null() {
            return Err(LlvmError::NullHandle { what: "intrinsic type" });
        }
        Ok(unsafe { FunctionType::from_raw_unchecked(ty) })
    }

    /// Mangled name for the given overload types (`llvm.memcpy.p0.p0.i64`).
    pub fn overloaded_name(self, module: &Module, param_types: &[Type<'_>]) -> LlvmResult<String> {
        self.check_overloads("intrinsic_overloaded_name", param_types)?;
        let mut raw = raw_types(param_types);
        let mut len = 0;
        let name = unsafe {
            LlvmString::from_raw(LLVMIntrinsicCopyOverloadedName2(
                module.as_raw(),
                self.id,
                raw.as_mut_ptr(),
                raw.len(),
                &mut len,
            ) as *mut c_char)
        }
        .ok_or(LlvmError::NullHandle { what: "intrinsic name" })?;
        Ok(name.to_string_lossy().into_owned())
    }
}

impl fmt::Debug for Intrinsic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Intrinsic({}, {})", self.id, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_lookup() {
        init();
        let trap = Intrinsic::find("llvm.trap").unwrap();
        assert_eq!(trap.name(), "llvm.trap");
        assert!(!trap.is_overloaded());
        assert!(Intrinsic::find("llvm.not.a.real.intrinsic").is_none());
    }

    #[test]
    fn test_overloaded_declaration() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("intrinsics").unwrap();
        let ptr = ctx.ptr_type(0).as_type();
        let i64_ty = ctx.i64_type().as_type();
        let memcpy = Intrinsic::find("llvm.memcpy").unwrap();
        assert!(memcpy.is_overloaded());
        assert!(memcpy.declaration(&module, &[]).is_err());

        let overloads = [ptr, ptr, i64_ty];
        assert_eq!(
            memcpy.overloaded_name(&module, &overloads).unwrap(),
            "llvm.memcpy.p0.p0.i64"
        );
        let decl = module.intrinsic_declaration(memcpy, &overloads).unwrap();
        assert_eq!(decl.name(), "llvm.memcpy.p0.p0.i64");
        assert_eq!(Intrinsic::of_function(decl), Some(memcpy));
        assert_eq!(memcpy.function_type(&ctx, &overloads).unwrap().param_count(), 4);
    }
}
