// This module collects the small pieces every other binding module leans on: LlvmString, the
// owned form of a heap message returned by LLVM (disposed exactly once through
// LLVMDisposeMessage when dropped), helpers that marshal Rust strings into NUL-terminated C
// strings and read (pointer, length) pairs back, LLVMBool conversions, and the bindings of
// llvm-c/Support.h plus the process-wide functions from llvm-c/Core.h (version query,
// multithreading query, shutdown). Command-line option parsing marshals its argv array in a
// bumpalo arena so all of the C strings share one allocation lifetime.

//! Owned LLVM messages, string marshalling and `llvm-c/Support.h`.

use crate::error::{LlvmError, LlvmResult};
use bumpalo::Bump;
use llvm_sys::core::{
    LLVMCreateMessage, LLVMDisposeMessage, LLVMGetVersion, LLVMIsMultithreaded, LLVMShutdown,
};
use llvm_sys::prelude::LLVMBool;
use llvm_sys::support::{
    LLVMAddSymbol, LLVMLoadLibraryPermanently, LLVMParseCommandLineOptions,
    LLVMSearchForAddressOfSymbol,
};
use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};
use std::fmt;
use std::ptr::NonNull;

#[cfg(test)]
thread_local! {
    static DISPOSED_MESSAGES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Number of messages disposed on the current thread.
#[cfg(test)]
pub(crate) fn disposed_message_count() -> usize {
    DISPOSED_MESSAGES.with(|c| c.get())
}

/// A message allocated by LLVM and owned by the caller.
///
/// Dropping the string frees it with `LLVMDisposeMessage`.
pub struct LlvmString {
    ptr: NonNull<c_char>,
}

impl LlvmString {
    /// Take ownership of a message returned by LLVM. Returns `None` for null.
    ///
    /// # Safety
    /// `ptr` must be null or a message allocated by LLVM that nobody else frees.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| LlvmString { ptr })
    }

    /// Copy `s` into a message allocated by LLVM (`LLVMCreateMessage`).
    pub fn create(s: &str) -> LlvmResult<Self> {
        let c = to_cstring(s)?;
        unsafe { LlvmString::from_raw(LLVMCreateMessage(c.as_ptr())) }
            .ok_or(LlvmError::NullHandle { what: "message" })
    }

    pub fn as_c_str(&self) -> &CStr {
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_str(&self) -> Result<&str, std::str::Utf8Error> {
        self.as_c_str().to_str()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        self.as_c_str().to_string_lossy()
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.ptr.as_ptr()
    }
}

impl Drop for LlvmString {
    fn drop(&mut self) {
        unsafe { LLVMDisposeMessage(self.ptr.as_ptr()) };
        #[cfg(test)]
        DISPOSED_MESSAGES.with(|c| c.set(c.get() + 1));
    }
}

impl fmt::Display for LlvmString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for LlvmString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LlvmString({:?})", self.to_string_lossy())
    }
}

/// Consume an out-parameter message, returning its text (empty when LLVM left it null).
///
/// # Safety
/// Same contract as [`LlvmString::from_raw`].
pub(crate) unsafe fn take_message(ptr: *mut c_char) -> String {
    LlvmString::from_raw(ptr)
        .map(|m| m.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Marshal a Rust string for a `const char *` parameter.
pub(crate) fn to_cstring(s: &str) -> LlvmResult<CString> {
    Ok(CString::new(s)?)
}

/// Read a `(pointer, length)` pair owned by LLVM into a `String`.
///
/// # Safety
/// `ptr` must be null or point to `len` readable bytes.
pub(crate) unsafe fn string_from_parts(ptr: *const c_char, len: usize) -> String {
    if ptr.is_null() || len == 0 {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Read a NUL-terminated string owned by LLVM into a `String`.
///
/// # Safety
/// `ptr` must be null or a valid NUL-terminated string.
pub(crate) unsafe fn string_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    CStr::from_ptr(ptr).to_string_lossy().into_owned()
}

#[inline]
pub(crate) fn llvm_bool(b: bool) -> LLVMBool {
    b as LLVMBool
}

#[inline]
pub(crate) fn from_llvm_bool(b: LLVMBool) -> bool {
    b != 0
}

/// LLVM version as `(major, minor, patch)`.
pub fn version() -> (u32, u32, u32) {
    let (mut major, mut minor, mut patch) = (0, 0, 0);
    unsafe { LLVMGetVersion(&mut major, &mut minor, &mut patch) };
    (major, minor, patch)
}

/// Whether LLVM was built with multithreading support.
pub fn is_multithreaded() -> bool {
    from_llvm_bool(unsafe { LLVMIsMultithreaded() })
}

/// Deallocate all of LLVM's managed static state.
///
/// # Safety
/// No LLVM object may be used after this call.
pub unsafe fn shutdown() {
    LLVMShutdown();
}

/// Permanently load the dynamic library at `path`.
///
/// Safe to call several times for the same library.
pub fn load_library_permanently(path: &str) -> LlvmResult<()> {
    let c = to_cstring(path)?;
    if from_llvm_bool(unsafe { LLVMLoadLibraryPermanently(c.as_ptr()) }) {
        return Err(LlvmError::Message {
            operation: "load_library_permanently",
            message: format!("could not load `{path}`"),
        });
    }
    Ok(())
}

/// Address of `symbol` in the process or any permanently loaded library.
pub fn search_for_address_of_symbol(symbol: &str) -> LlvmResult<Option<NonNull<c_void>>> {
    let c = to_cstring(symbol)?;
    Ok(NonNull::new(unsafe { LLVMSearchForAddressOfSymbol(c.as_ptr()) }))
}

/// Register `symbol` at `address` for later symbol searches.
///
/// # Safety
/// `address` must stay valid for as long as LLVM may resolve the symbol.
pub unsafe fn add_symbol(symbol: &str, address: *mut c_void) -> LlvmResult<()> {
    let c = to_cstring(symbol)?;
    LLVMAddSymbol(c.as_ptr(), address);
    Ok(())
}

/// Forward `args` to LLVM's global `cl::opt` parser.
///
/// `args[0]` is the program name, as for a real `argv`.
pub fn parse_command_line_options(args: &[&str], overview: &str) -> LlvmResult<()> {
    let arena = Bump::new();
    let mut argv = bumpalo::collections::Vec::with_capacity_in(args.len(), &arena);
    for arg in args {
        if let Some(position) = arg.bytes().position(|b| b == 0) {
            return Err(LlvmError::InteriorNul { position });
        }
        let bytes = arena.alloc_slice_fill_copy(arg.len() + 1, 0u8);
        bytes[..arg.len()].copy_from_slice(arg.as_bytes());
        argv.push(bytes.as_ptr() as *const c_char);
    }
    let overview = to_cstring(overview)?;
    log::debug!("parsing {} LLVM command-line option(s)", args.len());
    unsafe { LLVMParseCommandLineOptions(argv.len() as i32, argv.as_ptr(), overview.as_ptr()) };
    Ok(())
}
