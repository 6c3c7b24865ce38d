// Bindings for llvm-c/TargetMachine.h. Target is a Copy view of a registered target; targets
// are static objects that live as long as the process, so the view has no lifetime. Options
// are a unique RAII handle; TargetMachine is an owning handle in the ownership cache. Code
// emission follows the (LLVMBool, char **) convention: the message is always taken (and
// freed) and becomes LlvmError::Emit on failure. Triple and host helpers return owned strings
// copied out of LLVM messages.

//! Targets, target machines and code emission.

use crate::enums::{CodeGenFileType, CodeGenOptLevel, CodeModel, RelocMode};
use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::memory_buffer::MemoryBuffer;
use crate::module::Module;
use crate::support::{from_llvm_bool, llvm_bool, string_from_ptr, take_message, to_cstring};
use crate::target::TargetData;
use llvm_sys::target_machine::*;
use std::ffi::c_char;
use std::fmt;
use std::path::Path;

/// A target registered with LLVM.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    raw: LLVMTargetRef,
}

impl Target {
    /// # Safety
    /// `raw` must be null or a registered target.
    pub unsafe fn from_raw_opt(raw: LLVMTargetRef) -> Option<Self> {
        (!raw.is_null()).then_some(Self { raw })
    }

    pub fn as_raw(self) -> LLVMTargetRef {
        self.raw
    }

    pub fn first() -> Option<Self> {
        unsafe { Self::from_raw_opt(LLVMGetFirstTarget()) }
    }

    pub fn next(self) -> Option<Self> {
        unsafe { Self::from_raw_opt(LLVMGetNextTarget(self.raw)) }
    }

    /// Every registered target, in registration order.
    pub fn all() -> impl Iterator<Item = Target> {
        std::iter::successors(Self::first(), |t| t.next())
    }

    /// Look a target up by its short name (`x86-64`, `aarch64`).
    pub fn from_name(name: &str) -> LlvmResult<Option<Self>> {
        let name = to_cstring(name)?;
        Ok(unsafe { Self::from_raw_opt(LLVMGetTargetFromName(name.as_ptr())) })
    }

    pub fn from_triple(triple: &str) -> LlvmResult<Self> {
        let c_triple = to_cstring(triple)?;
        let mut raw = std::ptr::null_mut();
        let mut message = std::ptr::null_mut();
        let failed = unsafe { LLVMGetTargetFromTriple(c_triple.as_ptr(), &mut raw, &mut message) };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Target { message });
        }
        unsafe { Self::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "target" })
    }

    pub fn name(self) -> String {
        unsafe { string_from_ptr(LLVMGetTargetName(self.raw)) }
    }

    pub fn description(self) -> String {
        unsafe { string_from_ptr(LLVMGetTargetDescription(self.raw)) }
    }

    pub fn has_jit(self) -> bool {
        from_llvm_bool(unsafe { LLVMTargetHasJIT(self.raw) })
    }

    pub fn has_target_machine(self) -> bool {
        from_llvm_bool(unsafe { LLVMTargetHasTargetMachine(self.raw) })
    }

    pub fn has_asm_backend(self) -> bool {
        from_llvm_bool(unsafe { LLVMTargetHasAsmBackend(self.raw) })
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self.name())
    }
}

/// Settings for [`TargetMachine::create_with_options`].
pub struct TargetMachineOptions {
    raw: LLVMTargetMachineOptionsRef,
}

impl TargetMachineOptions {
    pub fn new() -> Self {
        Self {
            raw: unsafe { LLVMCreateTargetMachineOptions() },
        }
    }

    pub fn as_raw(&self) -> LLVMTargetMachineOptionsRef {
        self.raw
    }

    pub fn set_cpu(&mut self, cpu: &str) -> LlvmResult<&mut Self> {
        let cpu = to_cstring(cpu)?;
        unsafe { LLVMTargetMachineOptionsSetCPU(self.raw, cpu.as_ptr()) };
        Ok(self)
    }

    /// Comma separated feature list, e.g. `+avx2,-sse4a`.
    pub fn set_features(&mut self, features: &str) -> LlvmResult<&mut Self> {
        let features = to_cstring(features)?;
        unsafe { LLVMTargetMachineOptionsSetFeatures(self.raw, features.as_ptr()) };
        Ok(self)
    }

    pub fn set_abi(&mut self, abi: &str) -> LlvmResult<&mut Self> {
        let abi = to_cstring(abi)?;
        unsafe { LLVMTargetMachineOptionsSetABI(self.raw, abi.as_ptr()) };
        Ok(self)
    }

    pub fn set_opt_level(&mut self, level: CodeGenOptLevel) -> &mut Self {
        unsafe { LLVMTargetMachineOptionsSetCodeGenOptLevel(self.raw, level.into()) };
        self
    }

    pub fn set_reloc_mode(&mut self, reloc: RelocMode) -> &mut Self {
        unsafe { LLVMTargetMachineOptionsSetRelocMode(self.raw, reloc.into()) };
        self
    }

    pub fn set_code_model(&mut self, model: CodeModel) -> &mut Self {
        unsafe { LLVMTargetMachineOptionsSetCodeModel(self.raw, model.into()) };
        self
    }
}

impl Default for TargetMachineOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TargetMachineOptions {
    fn drop(&mut self) {
        unsafe { LLVMDisposeTargetMachineOptions(self.raw) }
    }
}

owned_kind!(
    pub(crate) TargetMachineKind,
    LLVMOpaqueTargetMachine,
    LLVMDisposeTargetMachine,
    "target machine"
);

/// A configured code generator for one triple.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TargetMachine {
    handle: Shared<TargetMachineKind>,
}

impl TargetMachine {
    pub fn create(
        target: Target,
        triple: &str,
        cpu: &str,
        features: &str,
        level: CodeGenOptLevel,
        reloc: RelocMode,
        model: CodeModel,
    ) -> LlvmResult<Self> {
        let c_triple = to_cstring(triple)?;
        let c_cpu = to_cstring(cpu)?;
        let c_features = to_cstring(features)?;
        let raw = unsafe {
            LLVMCreateTargetMachine(
                target.as_raw(),
                c_triple.as_ptr(),
                c_cpu.as_ptr(),
                c_features.as_ptr(),
                level.into(),
                reloc.into(),
                model.into(),
            )
        };
        log::debug!("created target machine for {triple} (cpu `{cpu}`)");
        unsafe { Self::from_raw(raw) }
    }

    pub fn create_with_options(target: Target, triple: &str, options: &TargetMachineOptions) -> LlvmResult<Self> {
        let c_triple = to_cstring(triple)?;
        let raw = unsafe { LLVMCreateTargetMachineWithOptions(target.as_raw(), c_triple.as_ptr(), options.as_raw()) };
        log::debug!("created target machine for {triple}");
        unsafe { Self::from_raw(raw) }
    }

    /// A machine for the host: default triple, host cpu and host features.
    pub fn host(level: CodeGenOptLevel, reloc: RelocMode, model: CodeModel) -> LlvmResult<Self> {
        let triple = default_triple();
        let target = Target::from_triple(&triple)?;
        Self::create(target, &triple, &host_cpu_name(), &host_cpu_features(), level, reloc, model)
    }

    unsafe fn from_raw(raw: LLVMTargetMachineRef) -> LlvmResult<Self> {
        Shared::wrap(raw)
            .map(|handle| Self { handle })
            .ok_or(LlvmError::Target {
                message: String::from("LLVM could not create a target machine"),
            })
    }

    pub fn as_raw(&self) -> LLVMTargetMachineRef {
        self.handle.as_raw()
    }

    pub fn target(&self) -> Target {
        Target {
            raw: unsafe { LLVMGetTargetMachineTarget(self.as_raw()) },
        }
    }

    pub fn triple(&self) -> String {
        unsafe { take_message(LLVMGetTargetMachineTriple(self.as_raw())) }
    }

    pub fn cpu(&self) -> String {
        unsafe { take_message(LLVMGetTargetMachineCPU(self.as_raw())) }
    }

    pub fn features(&self) -> String {
        unsafe { take_message(LLVMGetTargetMachineFeatureString(self.as_raw())) }
    }

    /// The layout modules compiled by this machine should carry.
    pub fn data_layout(&self) -> LlvmResult<TargetData> {
        unsafe { TargetData::from_raw(LLVMCreateTargetDataLayout(self.as_raw())) }
    }

    pub fn set_asm_verbosity(&self, verbose: bool) {
        unsafe { LLVMSetTargetMachineAsmVerbosity(self.as_raw(), llvm_bool(verbose)) }
    }

    pub fn set_fast_isel(&self, enable: bool) {
        unsafe { LLVMSetTargetMachineFastISel(self.as_raw(), llvm_bool(enable)) }
    }

    pub fn set_global_isel(&self, enable: bool) {
        unsafe { LLVMSetTargetMachineGlobalISel(self.as_raw(), llvm_bool(enable)) }
    }

    pub fn set_machine_outliner(&self, enable: bool) {
        unsafe { LLVMSetTargetMachineMachineOutliner(self.as_raw(), llvm_bool(enable)) }
    }

    /// Stamp this machine's triple and data layout onto `module`.
    pub fn configure_module(&self, module: &Module) -> LlvmResult<()> {
        module.set_target_triple(&self.triple())?;
        module.set_target_data(&self.data_layout()?);
        Ok(())
    }

    pub fn emit_to_file(&self, module: &Module, kind: CodeGenFileType, path: impl AsRef<Path>) -> LlvmResult<()> {
        let display = path.as_ref().display().to_string();
        let c_path = to_cstring(&display)?;
        let mut message = std::ptr::null_mut();
        let failed = unsafe {
            LLVMTargetMachineEmitToFile(
                self.as_raw(),
                module.as_raw(),
                c_path.as_ptr() as *mut c_char,
                kind.into(),
                &mut message,
            )
        };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Emit { message });
        }
        log::debug!("emitted {kind:?} for `{}` to {display}", module.identifier());
        Ok(())
    }

    pub fn emit_to_memory_buffer(&self, module: &Module, kind: CodeGenFileType) -> LlvmResult<MemoryBuffer> {
        let mut message = std::ptr::null_mut();
        let mut buffer = std::ptr::null_mut();
        let failed = unsafe {
            LLVMTargetMachineEmitToMemoryBuffer(
                self.as_raw(),
                module.as_raw(),
                kind.into(),
                &mut message,
                &mut buffer,
            )
        };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Emit { message });
        }
        log::debug!("emitted {kind:?} for `{}` to memory", module.identifier());
        unsafe { MemoryBuffer::from_raw(buffer) }
    }
}

impl fmt::Debug for TargetMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetMachine")
            .field("triple", &self.triple())
            .field("cpu", &self.cpu())
            .finish()
    }
}

/// The triple LLVM was configured to target by default.
pub fn default_triple() -> String {
    unsafe { take_message(LLVMGetDefaultTargetTriple()) }
}

/// Canonical form of `triple` (`x86_64-linux-gnu` becomes `x86_64-unknown-linux-gnu`).
pub fn normalize_triple(triple: &str) -> LlvmResult<String> {
    let triple = to_cstring(triple)?;
    Ok(unsafe { take_message(LLVMNormalizeTargetTriple(triple.as_ptr())) })
}

pub fn host_cpu_name() -> String {
    unsafe { take_message(LLVMGetHostCPUName()) }
}

pub fn host_cpu_features() -> String {
    unsafe { take_message(LLVMGetHostCPUFeatures()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::ir_reader::parse_assembly;
    use crate::target::initialize_native_target;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_normalize_triple() {
        init();
        assert_eq!(normalize_triple("x86_64-linux-gnu").unwrap(), "x86_64-unknown-linux-gnu");
        assert!(!default_triple().is_empty());
    }

    #[test]
    fn test_unknown_triple_is_target_error() {
        init();
        initialize_native_target().unwrap();
        assert!(matches!(
            Target::from_triple("nonsense-unknown-nowhere"),
            Err(LlvmError::Target { .. })
        ));
        assert_eq!(Target::from_name("no-such-target").unwrap(), None);
    }

    #[test]
    fn test_host_machine_emits_object() {
        init();
        initialize_native_target().unwrap();
        let machine = TargetMachine::host(CodeGenOptLevel::Default, RelocMode::Pic, CodeModel::Default).unwrap();
        assert!(machine.target().has_target_machine());
        assert!(Target::all().any(|t| t == machine.target()));

        let ctx = Context::create().unwrap();
        let module = parse_assembly(&ctx, "define i32 @seven() {\n  ret i32 7\n}\n").unwrap();
        machine.configure_module(&module).unwrap();
        assert_eq!(module.target_triple(), machine.triple());

        let object = machine.emit_to_memory_buffer(&module, CodeGenFileType::Object).unwrap();
        assert!(!object.is_empty());

        machine.set_asm_verbosity(true);
        let asm = machine.emit_to_memory_buffer(&module, CodeGenFileType::Assembly).unwrap();
        let text = String::from_utf8_lossy(asm.as_bytes()).into_owned();
        assert!(text.contains("seven"), "{text}");
    }

    #[test]
    fn test_options_builder() {
        init();
        initialize_native_target().unwrap();
        let triple = default_triple();
        let target = Target::from_triple(&triple).unwrap();
        let mut options = TargetMachineOptions::new();
        options
            .set_cpu("generic")
            .unwrap()
            .set_opt_level(CodeGenOptLevel::None)
            .set_reloc_mode(RelocMode::Static)
            .set_code_model(CodeModel::Small);
        let machine = TargetMachine::create_with_options(target, &triple, &options).unwrap();
        assert_eq!(machine.cpu(), "generic");
        assert!(machine.data_layout().unwrap().pointer_size() > 0);
    }
}
