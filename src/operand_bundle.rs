// OperandBundle wraps LLVMOperandBundleRef, the `[ "tag"(args...) ]` annotation on calls and
// invokes. Bundles created here and bundles copied out of a call site are both owned by the
// caller, so they go through the ownership cache and are freed once with
// LLVMDisposeOperandBundle. The argument values live in the context, not in the bundle.

//! Operand bundles.

use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::support::string_from_parts;
use crate::values::{raw_values, Value};
use llvm_sys::core::{
    LLVMCreateOperandBundle, LLVMDisposeOperandBundle, LLVMGetNumOperandBundleArgs,
    LLVMGetOperandBundleArgAtIndex, LLVMGetOperandBundleTag,
};
use llvm_sys::prelude::LLVMOperandBundleRef;
use llvm_sys::LLVMOpaqueOperandBundle;
use std::ffi::c_char;
use std::fmt;

owned_kind!(
    pub(crate) OperandBundleKind,
    LLVMOpaqueOperandBundle,
    LLVMDisposeOperandBundle,
    "operand bundle"
);

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OperandBundle {
    handle: Shared<OperandBundleKind>,
}

impl OperandBundle {
    /// # Safety
    /// `raw` must be a live bundle owned by the caller.
    pub(crate) unsafe fn from_raw(raw: LLVMOperandBundleRef) -> LlvmResult<Self> {
        Shared::wrap(raw)
            .map(|handle| Self { handle })
            .ok_or(LlvmError::NullHandle { what: "operand bundle" })
    }

    pub fn create(tag: &str, args: &[Value<'_>]) -> LlvmResult<Self> {
        let mut raw_args = raw_values(args);
        let raw = unsafe {
            LLVMCreateOperandBundle(
                tag.as_ptr() as *const c_char,
                tag.len(),
                raw_args.as_mut_ptr(),
                raw_args.len() as u32,
            )
        };
        unsafe { Self::from_raw(raw) }
    }

    pub fn as_raw(&self) -> LLVMOperandBundleRef {
        self.handle.as_raw()
    }

    pub fn tag(&self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetOperandBundleTag(self.as_raw(), &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn arg_count(&self) -> u32 {
        unsafe { LLVMGetNumOperandBundleArgs(self.as_raw()) }
    }

    /// Bundle arguments. The caller picks the lifetime of the context they live in.
    pub fn args<'ctx>(&self) -> Vec<Value<'ctx>> {
        (0..self.arg_count())
            .filter_map(|i| unsafe { Value::from_raw_opt(LLVMGetOperandBundleArgAtIndex(self.as_raw(), i)) })
            .collect()
    }
}

impl fmt::Debug for OperandBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperandBundle")
            .field("tag", &self.tag())
            .field("args", &self.arg_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handle::OwnedKind;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_create_and_read_back() {
        init();
        let ctx = Context::create().unwrap();
        let one = ctx.i32_type().const_int(1, false).as_value();
        let bundle = OperandBundle::create("deopt", &[one]).unwrap();
        assert_eq!(bundle.tag(), "deopt");
        assert_eq!(bundle.arg_count(), 1);
        assert_eq!(bundle.args(), vec![one]);

        let raw = bundle.as_raw();
        let copy = bundle.clone();
        drop(bundle);
        assert!(OperandBundleKind::registry().contains(raw));
        drop(copy);
        assert!(!OperandBundleKind::registry().contains(raw));
    }

    #[test]
    fn test_bundle_on_call_site() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("bundles").unwrap();
        let callee = module
            .add_function("callee", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let caller = module
            .add_function("caller", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let entry = ctx.append_basic_block(caller, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);

        let flag = ctx.i64_type().const_int(42, false).as_value();
        let bundle = OperandBundle::create("deopt", &[flag]).unwrap();
        let call = builder
            .build_call_with_bundles(callee.function_type(), callee.into(), &[], &[bundle], "")
            .unwrap();
        builder.build_ret_void().unwrap();

        let call = crate::values::instruction::CallInst::try_from(call).unwrap();
        assert_eq!(call.operand_bundle_count(), 1);
        let copied = call.operand_bundle(0).unwrap().unwrap();
        assert_eq!(copied.tag(), "deopt");
        assert_eq!(copied.args(), vec![flag]);
        assert!(call.operand_bundle(1).unwrap().is_none());
    }
}
