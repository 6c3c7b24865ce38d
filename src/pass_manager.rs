// Pass managers. The legacy PassManager and FunctionPassManager (llvm-c/Core.h) are owning
// handles in one ownership-cache kind, since LLVM gives both the same opaque type. A function
// pass manager is created directly for a module and keeps a clone of it, dropped after the
// manager. The new pass manager is driven through LLVMRunPasses (llvm-c/Transforms/
// PassBuilder.h) with a textual pipeline such as "default<O2>" or "mem2reg,instcombine"; its
// failures come back as an LLVMErrorRef, whose message is copied out and freed with
// LLVMDisposeErrorMessage. PassBuilderOptions is a unique RAII handle.

//! Legacy pass managers and the new pass manager's pipeline runner.

use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::module::Module;
use crate::support::{from_llvm_bool, llvm_bool, string_from_ptr, to_cstring};
use crate::target_machine::TargetMachine;
use crate::values::FunctionValue;
use llvm_sys::core::{
    LLVMCreateFunctionPassManagerForModule, LLVMCreatePassManager, LLVMDisposePassManager,
    LLVMFinalizeFunctionPassManager, LLVMInitializeFunctionPassManager, LLVMRunFunctionPassManager,
    LLVMRunPassManager,
};
use llvm_sys::error::{LLVMDisposeErrorMessage, LLVMErrorRef, LLVMGetErrorMessage};
use llvm_sys::prelude::LLVMPassManagerRef;
use llvm_sys::target_machine::LLVMAddAnalysisPasses;
use llvm_sys::transforms::pass_builder::*;
use llvm_sys::LLVMPassManager;
use std::fmt;

owned_kind!(
    pub(crate) PassManagerKind,
    LLVMPassManager,
    LLVMDisposePassManager,
    "pass manager"
);

unsafe fn wrap_pass_manager(raw: LLVMPassManagerRef) -> LlvmResult<Shared<PassManagerKind>> {
    Shared::wrap(raw).ok_or(LlvmError::NullHandle { what: "pass manager" })
}

/// Legacy whole-module pass manager.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PassManager {
    handle: Shared<PassManagerKind>,
}

impl PassManager {
    pub fn create() -> LlvmResult<Self> {
        let handle = unsafe { wrap_pass_manager(LLVMCreatePassManager())? };
        Ok(Self { handle })
    }

    pub fn as_raw(&self) -> LLVMPassManagerRef {
        self.handle.as_raw()
    }

    /// Register `machine`'s target analyses (TTI and friends).
    pub fn add_analysis_passes(&self, machine: &TargetMachine) {
        unsafe { LLVMAddAnalysisPasses(machine.as_raw(), self.as_raw()) }
    }

    /// Run every pass on `module`. Returns whether the module changed.
    pub fn run(&self, module: &Module) -> bool {
        from_llvm_bool(unsafe { LLVMRunPassManager(self.as_raw(), module.as_raw()) })
    }
}

impl fmt::Debug for PassManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PassManager({:p})", self.as_raw())
    }
}

/// Legacy per-function pass manager bound to one module.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FunctionPassManager {
    handle: Shared<PassManagerKind>,
    module: Module,
}

impl FunctionPassManager {
    /// Fails with `NotOwned` for a module borrowed from another owner, which could be
    /// disposed while the manager still refers to it.
    pub fn create(module: &Module) -> LlvmResult<Self> {
        if !module.is_owned() {
            return Err(LlvmError::NotOwned { what: "module" });
        }
        let handle = unsafe { wrap_pass_manager(LLVMCreateFunctionPassManagerForModule(module.as_raw()))? };
        Ok(Self {
            handle,
            module: module.clone(),
        })
    }

    pub fn as_raw(&self) -> LLVMPassManagerRef {
        self.handle.as_raw()
    }

    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn add_analysis_passes(&self, machine: &TargetMachine) {
        unsafe { LLVMAddAnalysisPasses(machine.as_raw(), self.as_raw()) }
    }

    /// Run the initializers. Returns whether the module changed.
    pub fn initialize(&self) -> bool {
        from_llvm_bool(unsafe { LLVMInitializeFunctionPassManager(self.as_raw()) })
    }

    /// Run the passes on `function`, which must belong to this manager's module.
    pub fn run(&self, function: FunctionValue<'_>) -> LlvmResult<bool> {
        if function.as_global_value().parent() != self.module {
            return Err(LlvmError::Message {
                operation: "run_function_pass_manager",
                message: format!("`{}` belongs to another module", function.name()),
            });
        }
        Ok(from_llvm_bool(unsafe { LLVMRunFunctionPassManager(self.as_raw(), function.as_raw()) }))
    }

    /// Run the finalizers. Returns whether the module changed.
    pub fn finalize(&self) -> bool {
        from_llvm_bool(unsafe { LLVMFinalizeFunctionPassManager(self.as_raw()) })
    }
}

impl fmt::Debug for FunctionPassManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionPassManager")
            .field("raw", &self.as_raw())
            .field("module", &self.module.identifier())
            .finish()
    }
}

/// Tuning knobs for [`run_passes`].
pub struct PassBuilderOptions {
    raw: LLVMPassBuilderOptionsRef,
}

macro_rules! bool_options {
    ($($name:ident => $f:ident),+ $(,)?) => {
        $(
            pub fn $name(&mut self, enable: bool) -> &mut Self {
                unsafe { $f(self.raw, llvm_bool(enable)) };
                self
            }
        )+
    };
}

impl PassBuilderOptions {
    pub fn new() -> Self {
        Self {
            raw: unsafe { LLVMCreatePassBuilderOptions() },
        }
    }

    pub fn as_raw(&self) -> LLVMPassBuilderOptionsRef {
        self.raw
    }

    bool_options! {
        set_verify_each => LLVMPassBuilderOptionsSetVerifyEach,
        set_debug_logging => LLVMPassBuilderOptionsSetDebugLogging,
        set_loop_interleaving => LLVMPassBuilderOptionsSetLoopInterleaving,
        set_loop_vectorization => LLVMPassBuilderOptionsSetLoopVectorization,
        set_slp_vectorization => LLVMPassBuilderOptionsSetSLPVectorization,
        set_loop_unrolling => LLVMPassBuilderOptionsSetLoopUnrolling,
        set_forget_all_scev_in_loop_unroll => LLVMPassBuilderOptionsSetForgetAllSCEVInLoopUnroll,
        set_call_graph_profile => LLVMPassBuilderOptionsSetCallGraphProfile,
        set_merge_functions => LLVMPassBuilderOptionsSetMergeFunctions,
    }

    pub fn set_licm_mssa_opt_cap(&mut self, cap: u32) -> &mut Self {
        unsafe { LLVMPassBuilderOptionsSetLicmMssaOptCap(self.raw, cap) };
        self
    }

    pub fn set_licm_mssa_no_acc_for_promotion_cap(&mut self, cap: u32) -> &mut Self {
        unsafe { LLVMPassBuilderOptionsSetLicmMssaNoAccForPromotionCap(self.raw, cap) };
        self
    }

    pub fn set_inliner_threshold(&mut self, threshold: i32) -> &mut Self {
        unsafe { LLVMPassBuilderOptionsSetInlinerThreshold(self.raw, threshold) };
        self
    }
}

impl Default for PassBuilderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PassBuilderOptions {
    fn drop(&mut self) {
        unsafe { LLVMDisposePassBuilderOptions(self.raw) }
    }
}

/// Consume an `LLVMErrorRef`, returning its message. `None` means success.
///
/// # Safety
/// `error` must be null or an unconsumed error.
pub(crate) unsafe fn take_error(error: LLVMErrorRef) -> Option<String> {
    if error.is_null() {
        return None;
    }
    let ptr = LLVMGetErrorMessage(error);
    let message = string_from_ptr(ptr);
    LLVMDisposeErrorMessage(ptr);
    Some(message)
}

/// Run a new-pass-manager `pipeline` over `module`.
///
/// Without a target machine, target-specific cost models fall back to LLVM's defaults.
pub fn run_passes(
    module: &Module,
    pipeline: &str,
    machine: Option<&TargetMachine>,
    options: &PassBuilderOptions,
) -> LlvmResult<()> {
    let c_pipeline = to_cstring(pipeline)?;
    let tm = machine.map_or(std::ptr::null_mut(), |m| m.as_raw());
    let error = unsafe { LLVMRunPasses(module.as_raw(), c_pipeline.as_ptr(), tm, options.as_raw()) };
    if let Some(message) = unsafe { take_error(error) } {
        log::debug!("pipeline `{pipeline}` failed on `{}`: {message}", module.identifier());
        return Err(LlvmError::PassPipeline {
            pipeline: pipeline.to_string(),
            message,
        });
    }
    log::debug!("ran `{pipeline}` on `{}`", module.identifier());
    Ok(())
}

impl Module {
    /// Run a new-pass-manager pipeline with default options and no target machine.
    pub fn run_passes(&self, pipeline: &str) -> LlvmResult<()> {
        run_passes(self, pipeline, None, &PassBuilderOptions::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::enums::Opcode;
    use crate::ir_reader::parse_assembly;

    const SLOT: &str = r#"
define i32 @slot(i32 %x) {
entry:
  %p = alloca i32
  store i32 %x, ptr %p
  %v = load i32, ptr %p
  ret i32 %v
}
"#;

    fn opcodes(module: &Module) -> Vec<Opcode> {
        let function = module.get_function("slot").unwrap().unwrap();
        function
            .basic_blocks()
            .flat_map(|b| b.instructions())
            .map(|i| i.opcode())
            .collect()
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_mem2reg_pipeline() {
        init();
        let ctx = Context::create().unwrap();
        let module = parse_assembly(&ctx, SLOT).unwrap();
        let mut options = PassBuilderOptions::new();
        options.set_verify_each(true).set_debug_logging(false);
        run_passes(&module, "mem2reg", None, &options).unwrap();
        assert_eq!(opcodes(&module), vec![Opcode::LLVMRet]);
    }

    #[test]
    fn test_unknown_pass_is_reported() {
        init();
        let ctx = Context::create().unwrap();
        let module = parse_assembly(&ctx, SLOT).unwrap();
        match module.run_passes("definitely-not-a-pass").unwrap_err() {
            LlvmError::PassPipeline { pipeline, message } => {
                assert_eq!(pipeline, "definitely-not-a-pass");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_legacy_managers_without_passes() {
        init();
        let ctx = Context::create().unwrap();
        let module = parse_assembly(&ctx, SLOT).unwrap();
        let pm = PassManager::create().unwrap();
        assert!(!pm.run(&module));

        let fpm = FunctionPassManager::create(&module).unwrap();
        let function = module.get_function("slot").unwrap().unwrap();
        fpm.initialize();
        assert!(!fpm.run(function).unwrap());
        fpm.finalize();

        let other = parse_assembly(&ctx, "define void @g() {\n  ret void\n}\n").unwrap();
        let g = other.get_function("g").unwrap().unwrap();
        assert!(fpm.run(g).is_err());
        assert_eq!(opcodes(&module).len(), 4);
    }
}
