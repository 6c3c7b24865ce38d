// Textual IR parsing (llvm-c/IRReader.h). LLVMParseIRInContext takes the memory buffer whether
// or not parsing succeeds, so the buffer leaves the ownership cache before the call and a buffer
// with live clones is refused. The parser reports through an out-parameter message rather than
// the diagnostic handler. Parsing into a context borrowed from another owner is refused, since
// the resulting module would outlive nothing this crate controls.

//! Textual IR parsing.

use crate::context::Context;
use crate::error::{LlvmError, LlvmResult};
use crate::memory_buffer::MemoryBuffer;
use crate::module::Module;
use crate::support::{from_llvm_bool, take_message};
use llvm_sys::ir_reader::LLVMParseIRInContext;

/// Parse textual IR (or bitcode, which LLVM sniffs) from `buffer`, consuming it.
pub fn parse_ir(context: &Context, buffer: MemoryBuffer) -> LlvmResult<Module> {
    context.check_can_own()?;
    let raw_buffer = buffer.into_raw()?;
    let mut module = std::ptr::null_mut();
    let mut message = std::ptr::null_mut();
    let failed = unsafe { LLVMParseIRInContext(context.as_raw(), raw_buffer, &mut module, &mut message) };
    let message = unsafe { take_message(message) };
    if from_llvm_bool(failed) {
        log::debug!("IR parse failed: {message}");
        return Err(LlvmError::ParseIr { message });
    }
    unsafe { Module::from_raw(module, context.clone()) }
}

/// Parse `text` as a module called `name`.
pub fn parse_ir_str(context: &Context, text: &str, name: &str) -> LlvmResult<Module> {
    parse_ir(context, MemoryBuffer::create_from_str(text, name)?)
}

/// Parse a snippet of assembly into an anonymous module.
pub fn parse_assembly(context: &Context, text: &str) -> LlvmResult<Module> {
    parse_ir_str(context, text, "<assembly>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnedKind;
    use crate::memory_buffer::MemoryBufferKind;

    const ADD: &str = r#"
define i32 @add(i32 %a, i32 %b) {
entry:
  %sum = add nsw i32 %a, %b
  ret i32 %sum
}
"#;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_parse_consumes_buffer() {
        init();
        let ctx = Context::create().unwrap();
        let buffer = MemoryBuffer::create_from_str(ADD, "add.ll").unwrap();
        let raw = buffer.as_raw();
        let module = parse_ir(&ctx, buffer).unwrap();
        assert!(!MemoryBufferKind::registry().contains(raw));
        let add = module.get_function("add").unwrap().unwrap();
        assert_eq!(add.count_params(), 2);
        assert_eq!(add.count_basic_blocks(), 1);
    }

    #[test]
    fn test_syntax_error_carries_message() {
        init();
        let ctx = Context::create().unwrap();
        let err = parse_assembly(&ctx, "define i32 @f( {").unwrap_err();
        match err {
            LlvmError::ParseIr { message } => assert!(message.contains("error"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shared_buffer_is_refused() {
        init();
        let ctx = Context::create().unwrap();
        let buffer = MemoryBuffer::create_from_str(ADD, "add.ll").unwrap();
        let keep = buffer.clone();
        assert!(matches!(
            parse_ir(&ctx, buffer),
            Err(LlvmError::StillShared { count: 1, .. })
        ));
        assert_eq!(keep.as_bytes(), ADD.as_bytes());
    }
}
