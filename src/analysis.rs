//! Bindings for `llvm-c/Analysis.h`: the IR verifier and CFG viewers.

use crate::enums::VerifierFailureAction;
use crate::error::{LlvmError, LlvmResult};
use crate::module::Module;
use crate::support::{from_llvm_bool, take_message};
use crate::values::FunctionValue;
use llvm_sys::analysis::{
    LLVMVerifyFunction, LLVMVerifyModule, LLVMViewFunctionCFG, LLVMViewFunctionCFGOnly,
};

/// Verify `module` without printing or aborting.
///
/// The error message lists every problem the verifier found.
pub fn verify_module(module: &Module) -> LlvmResult<()> {
    let mut message = std::ptr::null_mut();
    let broken = unsafe {
        LLVMVerifyModule(
            module.as_raw(),
            VerifierFailureAction::ReturnStatus.into(),
            &mut message,
        )
    };
    let message = unsafe { take_message(message) };
    if from_llvm_bool(broken) {
        log::debug!("module `{}` failed verification", module.identifier());
        return Err(LlvmError::Verify { message });
    }
    Ok(())
}

/// Verify one function. Returns `true` when the function is well formed.
///
/// With [`VerifierFailureAction::AbortProcess`] a broken function terminates the process.
pub fn verify_function(function: FunctionValue<'_>, action: VerifierFailureAction) -> bool {
    !from_llvm_bool(unsafe { LLVMVerifyFunction(function.as_raw(), action.into()) })
}

pub fn view_function_cfg(function: FunctionValue<'_>) {
    unsafe { LLVMViewFunctionCFG(function.as_raw()) }
}

pub fn view_function_cfg_only(function: FunctionValue<'_>) {
    unsafe { LLVMViewFunctionCFGOnly(function.as_raw()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_missing_terminator_is_reported() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("broken").unwrap();
        let function = module
            .add_function("f", ctx.void_type().fn_type(&[], false))
            .unwrap();
        ctx.append_basic_block(function, "entry").unwrap();

        let err = verify_module(&module).unwrap_err();
        match err {
            LlvmError::Verify { message } => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!verify_function(function, VerifierFailureAction::ReturnStatus));
    }

    #[test]
    fn test_well_formed_function() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("ok").unwrap();
        let function = module
            .add_function("f", ctx.void_type().fn_type(&[], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        builder.build_ret_void().unwrap();

        assert!(verify_module(&module).is_ok());
        assert!(function.verify(VerifierFailureAction::ReturnStatus));
    }
}
