// Bitcode reading and writing (llvm-c/BitReader.h and llvm-c/BitWriter.h). The readers report
// failure only through the context's diagnostic handler, so a failed read drains the context's
// sink into the error message. LLVMParseBitcodeInContext2 copies what it needs and leaves the
// buffer with the caller. LLVMGetBitcodeModuleInContext2 makes the returned module own the
// buffer, but only when it succeeds: the buffer leaves the ownership cache before the call and
// is taken back (and freed) if the read fails. Contexts borrowed from another owner have no
// handler, so both readers refuse them.

//! Bitcode reader and writer.

use crate::context::Context;
use crate::error::{LlvmError, LlvmResult};
use crate::memory_buffer::MemoryBuffer;
use crate::module::Module;
use crate::support::{from_llvm_bool, to_cstring};
use llvm_sys::bit_reader::{LLVMGetBitcodeModuleInContext2, LLVMParseBitcodeInContext2};
use llvm_sys::bit_writer::{LLVMWriteBitcodeToFile, LLVMWriteBitcodeToMemoryBuffer};
use std::path::Path;

/// Read a complete module from `buffer`. The buffer stays with the caller.
pub fn parse_bitcode(context: &Context, buffer: &MemoryBuffer) -> LlvmResult<Module> {
    context.check_can_own()?;
    let mut module = std::ptr::null_mut();
    let failed = unsafe { LLVMParseBitcodeInContext2(context.as_raw(), buffer.as_raw(), &mut module) };
    if from_llvm_bool(failed) {
        let message = context.diagnostic_message();
        log::debug!("bitcode parse failed: {message}");
        return Err(LlvmError::Bitcode { message });
    }
    log::debug!("parsed {} bytes of bitcode", buffer.len());
    unsafe { Module::from_raw(module, context.clone()) }
}

/// Read a module whose function bodies are materialized on demand.
///
/// The module takes `buffer` on success; on failure the buffer is freed here.
pub fn lazy_bitcode_module(context: &Context, buffer: MemoryBuffer) -> LlvmResult<Module> {
    context.check_can_own()?;
    let raw_buffer = buffer.into_raw()?;
    let mut module = std::ptr::null_mut();
    let failed = unsafe { LLVMGetBitcodeModuleInContext2(context.as_raw(), raw_buffer, &mut module) };
    if from_llvm_bool(failed) {
        drop(unsafe { MemoryBuffer::from_raw(raw_buffer) });
        let message = context.diagnostic_message();
        log::debug!("lazy bitcode read failed: {message}");
        return Err(LlvmError::Bitcode { message });
    }
    unsafe { Module::from_raw(module, context.clone()) }
}

pub fn write_bitcode_to_file(module: &Module, path: &Path) -> LlvmResult<()> {
    let display = path.display().to_string();
    let c_path = to_cstring(&display)?;
    let status = unsafe { LLVMWriteBitcodeToFile(module.as_raw(), c_path.as_ptr()) };
    if status != 0 {
        return Err(LlvmError::Io {
            path: display,
            message: format!("bitcode writer returned {status}"),
        });
    }
    log::debug!("wrote bitcode for `{}` to {display}", module.identifier());
    Ok(())
}

pub fn write_bitcode_to_memory_buffer(module: &Module) -> LlvmResult<MemoryBuffer> {
    unsafe { MemoryBuffer::from_raw(LLVMWriteBitcodeToMemoryBuffer(module.as_raw())) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnedKind;
    use crate::memory_buffer::MemoryBufferKind;

    fn sample(ctx: &Context) -> Module {
        let module = ctx.create_module("sample").unwrap();
        let function = module
            .add_function("answer", ctx.i32_type().fn_type(&[], false))
            .unwrap();
        let entry = ctx.append_basic_block(function, "entry").unwrap();
        let builder = ctx.create_builder();
        builder.position_at_end(entry);
        builder
            .build_ret(Some(ctx.i32_type().const_int(42, false).as_value()))
            .unwrap();
        module
    }

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_memory_round_trip() {
        init();
        let ctx = Context::create().unwrap();
        let module = sample(&ctx);
        let buffer = module.write_bitcode_to_memory_buffer().unwrap();
        assert_eq!(&buffer.as_bytes()[..4], b"BC\xC0\xDE");

        let parsed = parse_bitcode(&ctx, &buffer).unwrap();
        assert!(parsed.get_function("answer").unwrap().is_some());
        assert_eq!(buffer.len(), buffer.as_bytes().len());
    }

    #[test]
    fn test_malformed_bitcode_reports_diagnostic() {
        init();
        let ctx = Context::create().unwrap();
        let buffer = MemoryBuffer::create_from_bytes(b"BC\xC0\xDEnot really bitcode", "junk.bc").unwrap();
        let err = parse_bitcode(&ctx, &buffer).unwrap_err();
        match err {
            LlvmError::Bitcode { message } => assert!(!message.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(ctx.take_diagnostics().is_empty());
    }

    #[test]
    fn test_lazy_module_takes_buffer_on_success_only() {
        init();
        let ctx = Context::create().unwrap();
        let buffer = sample(&ctx).write_bitcode_to_memory_buffer().unwrap();
        let raw = buffer.as_raw();
        let lazy = lazy_bitcode_module(&ctx, buffer).unwrap();
        assert!(!MemoryBufferKind::registry().contains(raw));
        assert!(lazy.get_function("answer").unwrap().is_some());

        let junk = MemoryBuffer::create_from_bytes(b"\x00\x01\x02\x03", "junk.bc").unwrap();
        assert!(matches!(
            lazy_bitcode_module(&ctx, junk),
            Err(LlvmError::Bitcode { .. })
        ));
    }

    #[test]
    fn test_write_to_unwritable_path() {
        init();
        let ctx = Context::create().unwrap();
        let module = sample(&ctx);
        let err = write_bitcode_to_file(&module, Path::new("/nonexistent/dir/out.bc")).unwrap_err();
        assert!(matches!(err, LlvmError::Io { .. }));
    }
}
