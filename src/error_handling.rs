// Fatal error hooks (llvm-c/ErrorHandling.h). LLVM accepts a bare C function pointer, so the
// installed closure lives in a process-wide slot and a single extern "C" trampoline forwards
// to it. LLVM still calls exit(1) after the handler returns.

//! Fatal error hooks.

use crate::support::string_from_ptr;
use llvm_sys::error_handling::{
    LLVMEnablePrettyStackTrace, LLVMInstallFatalErrorHandler, LLVMResetFatalErrorHandler,
};
use std::ffi::c_char;
use std::sync::{Mutex, PoisonError};

type Handler = Box<dyn Fn(&str) + Send + Sync>;

static FATAL_HANDLER: Mutex<Option<Handler>> = Mutex::new(None);

extern "C" fn fatal_error_trampoline(reason: *const c_char) {
    let reason = unsafe { string_from_ptr(reason) };
    log::error!("LLVM fatal error: {reason}");
    let slot = FATAL_HANDLER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handler) = slot.as_ref() {
        handler(&reason);
    }
}

/// Run `handler` with the reason text before LLVM exits on a fatal error.
///
/// Replaces any handler installed earlier.
pub fn install_fatal_error_handler<F>(handler: F)
where
    F: Fn(&str) + Send + Sync + 'static,
{
    *FATAL_HANDLER.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(handler));
    unsafe { LLVMInstallFatalErrorHandler(Some(fatal_error_trampoline)) };
}

/// Restore LLVM's default fatal error behaviour and drop the installed closure.
pub fn reset_fatal_error_handler() {
    unsafe { LLVMResetFatalErrorHandler() };
    FATAL_HANDLER.lock().unwrap_or_else(PoisonError::into_inner).take();
}

/// Print which LLVM component was running when the process crashes.
pub fn enable_pretty_stack_trace() {
    unsafe { LLVMEnablePrettyStackTrace() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::sync::Arc;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_trampoline_forwards_reason() {
        init();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        install_fatal_error_handler(move |reason| sink.lock().unwrap().push(reason.to_string()));

        let reason = CString::new("out of registers").unwrap();
        fatal_error_trampoline(reason.as_ptr());
        assert_eq!(*seen.lock().unwrap(), vec![String::from("out of registers")]);

        reset_fatal_error_handler();
        fatal_error_trampoline(reason.as_ptr());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
