// MemoryBuffer wraps LLVMMemoryBufferRef, the input of IR parsing, bitcode reading and object
// file loading, and the output of bitcode writing and target-machine emission. Buffers are
// owning handles routed through the ownership cache. Some consumers take the buffer for good
// (LLVMParseIRInContext always, LLVMGetBitcodeModuleInContext2 only on success); those go
// through into_raw, which releases the cache entry and fails with StillShared while another
// clone of the handle is alive.

//! `LLVMMemoryBufferRef` handles.

use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::support::{from_llvm_bool, take_message, to_cstring};
use llvm_sys::core::{
    LLVMCreateMemoryBufferWithContentsOfFile, LLVMCreateMemoryBufferWithMemoryRangeCopy,
    LLVMCreateMemoryBufferWithSTDIN, LLVMDisposeMemoryBuffer, LLVMGetBufferSize,
    LLVMGetBufferStart,
};
use llvm_sys::prelude::LLVMMemoryBufferRef;
use llvm_sys::LLVMMemoryBuffer;
use std::ffi::c_char;
use std::fmt;
use std::path::Path;

owned_kind!(
    pub(crate) MemoryBufferKind,
    LLVMMemoryBuffer,
    LLVMDisposeMemoryBuffer,
    "memory buffer"
);

/// A read-only byte buffer owned by LLVM.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MemoryBuffer {
    handle: Shared<MemoryBufferKind>,
}

impl MemoryBuffer {
    /// Take ownership of a buffer LLVM handed back.
    ///
    /// # Safety
    /// `raw` must be a live buffer nobody else disposes.
    pub unsafe fn from_raw(raw: LLVMMemoryBufferRef) -> LlvmResult<Self> {
        Shared::wrap(raw)
            .map(|handle| Self { handle })
            .ok_or(LlvmError::NullHandle { what: "memory buffer" })
    }

    /// Read the whole file at `path`.
    pub fn create_from_file(path: impl AsRef<Path>) -> LlvmResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let c_path = to_cstring(&display)?;
        let mut raw = std::ptr::null_mut();
        let mut message = std::ptr::null_mut();
        let failed = unsafe {
            LLVMCreateMemoryBufferWithContentsOfFile(c_path.as_ptr(), &mut raw, &mut message)
        };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Io {
                path: display,
                message,
            });
        }
        log::debug!("read {display} into a memory buffer");
        unsafe { Self::from_raw(raw) }
    }

    /// Read standard input to the end.
    pub fn create_from_stdin() -> LlvmResult<Self> {
        let mut raw = std::ptr::null_mut();
        let mut message = std::ptr::null_mut();
        let failed = unsafe { LLVMCreateMemoryBufferWithSTDIN(&mut raw, &mut message) };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Io {
                path: String::from("<stdin>"),
                message,
            });
        }
        unsafe { Self::from_raw(raw) }
    }

    /// Copy `bytes` into a new buffer called `name`.
    pub fn create_from_bytes(bytes: &[u8], name: &str) -> LlvmResult<Self> {
        let name = to_cstring(name)?;
        let raw = unsafe {
            LLVMCreateMemoryBufferWithMemoryRangeCopy(
                bytes.as_ptr() as *const c_char,
                bytes.len(),
                name.as_ptr(),
            )
        };
        unsafe { Self::from_raw(raw) }
    }

    pub fn create_from_str(text: &str, name: &str) -> LlvmResult<Self> {
        Self::create_from_bytes(text.as_bytes(), name)
    }

    pub fn as_raw(&self) -> LLVMMemoryBufferRef {
        self.handle.as_raw()
    }

    pub fn len(&self) -> usize {
        unsafe { LLVMGetBufferSize(self.as_raw()) }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        let len = self.len();
        if len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(LLVMGetBufferStart(self.as_raw()) as *const u8, len) }
    }

    /// Hand the buffer to LLVM for good.
    pub(crate) fn into_raw(self) -> LlvmResult<LLVMMemoryBufferRef> {
        if !self.handle.is_owned() {
            return Err(LlvmError::NotOwned { what: "memory buffer" });
        }
        self.handle.release().map_err(|handle| LlvmError::StillShared {
            what: "memory buffer",
            count: handle.handle_count() - 1,
        })
    }
}

impl fmt::Debug for MemoryBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBuffer")
            .field("raw", &self.as_raw())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::OwnedKind;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_bytes_round_trip() {
        init();
        let buffer = MemoryBuffer::create_from_bytes(b"\x01\x02\x03", "bytes").unwrap();
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.as_bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_empty_buffer() {
        init();
        let buffer = MemoryBuffer::create_from_str("", "empty").unwrap();
        assert!(buffer.is_empty());
        assert!(buffer.as_bytes().is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        init();
        let err = MemoryBuffer::create_from_file("/nonexistent/llvm-capi/input.ll").unwrap_err();
        assert!(matches!(err, LlvmError::Io { .. }));
    }

    #[test]
    fn test_into_raw_refuses_shared_buffer() {
        init();
        let buffer = MemoryBuffer::create_from_str("abc", "shared").unwrap();
        let other = buffer.clone();
        let err = buffer.into_raw().unwrap_err();
        assert_eq!(
            err,
            LlvmError::StillShared {
                what: "memory buffer",
                count: 1
            }
        );
        let raw = other.into_raw().unwrap();
        assert!(!MemoryBufferKind::registry().contains(raw));
        unsafe { LLVMDisposeMemoryBuffer(raw) };
    }
}
