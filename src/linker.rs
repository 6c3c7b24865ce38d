// Module linking (llvm-c/Linker.h). LLVMLinkModules2 destroys the source module whatever the
// outcome and reports failure through the destination context's diagnostic handler. The source
// therefore leaves the ownership cache first, which fails while clones are alive or when the
// module belongs to another owner, and the shared context must carry this crate's sink.

//! Module linking.

use crate::error::{LlvmError, LlvmResult};
use crate::module::Module;
use crate::support::from_llvm_bool;
use llvm_sys::linker::LLVMLinkModules2;

pub use crate::enums::LinkerMode;

/// Link `src` into `dest`, consuming `src`.
///
/// Both modules must live in the same context, which must be owned here (or global) so that
/// failures reach a diagnostic sink. Fails with `StillShared` before touching either module if
/// another handle to `src` is alive, and with `NotOwned` if `src` belongs to another owner.
pub fn link(dest: &Module, src: Module) -> LlvmResult<()> {
    if src.context() != dest.context() {
        return Err(LlvmError::Link {
            message: String::from("source and destination modules live in different contexts"),
        });
    }
    dest.context().check_can_own()?;
    let src_name = src.identifier();
    let raw_src = src.into_raw()?;
    let failed = unsafe { LLVMLinkModules2(dest.as_raw(), raw_src) };
    if from_llvm_bool(failed) {
        let message = dest.context().diagnostic_message();
        log::debug!("linking `{src_name}` into `{}` failed: {message}", dest.identifier());
        return Err(LlvmError::Link { message });
    }
    log::debug!("linked `{src_name}` into `{}`", dest.identifier());
    Ok(())
}

impl Module {
    /// Link `src` into this module. See [`link`].
    pub fn link_in_module(&self, src: Module) -> LlvmResult<()> {
        link(self, src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handle::OwnedKind;
    use crate::ir_reader::parse_assembly;
    use crate::module::ModuleKind;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_link_resolves_declaration() {
        init();
        let ctx = Context::create().unwrap();
        let dest = parse_assembly(
            &ctx,
            "declare i32 @helper()\ndefine i32 @main() {\n  %r = call i32 @helper()\n  ret i32 %r\n}\n",
        )
        .unwrap();
        let src = parse_assembly(&ctx, "define i32 @helper() {\n  ret i32 7\n}\n").unwrap();
        let raw_src = src.as_raw();

        link(&dest, src).unwrap();
        assert!(!ModuleKind::registry().contains(raw_src));
        let helper = dest.get_function("helper").unwrap().unwrap();
        assert!(!helper.as_global_value().is_declaration());
        dest.verify().unwrap();
    }

    #[test]
    fn test_duplicate_definition_fails_with_diagnostic() {
        init();
        let ctx = Context::create().unwrap();
        let dest = parse_assembly(&ctx, "define void @f() {\n  ret void\n}\n").unwrap();
        let src = parse_assembly(&ctx, "define void @f() {\n  ret void\n}\n").unwrap();
        match dest.link_in_module(src).unwrap_err() {
            LlvmError::Link { message } => assert!(message.contains("f"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_shared_source_is_refused() {
        init();
        let ctx = Context::create().unwrap();
        let dest = ctx.create_module("dest").unwrap();
        let src = ctx.create_module("src").unwrap();
        let keep = src.clone();
        assert!(matches!(link(&dest, src), Err(LlvmError::StillShared { count: 1, .. })));
        assert_eq!(keep.identifier(), "src");
    }

    #[test]
    fn test_cross_context_is_refused() {
        init();
        let a = Context::create().unwrap();
        let b = Context::create().unwrap();
        let dest = a.create_module("dest").unwrap();
        let src = b.create_module("src").unwrap();
        assert!(matches!(link(&dest, src), Err(LlvmError::Link { .. })));
    }
}
