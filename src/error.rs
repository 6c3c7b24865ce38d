// This module defines the error type for llvm-capi using the thiserror crate. LLVM reports
// failure in three shapes: an LLVMBool paired with a heap-allocated message the caller must
// free, a diagnostic handler callback on the owning context, and an LLVMErrorRef carrying its
// own message. Each of those is folded into an LlvmError variant that names the failing
// surface (IR parsing, bitcode reading, verification, linking, target lookup, code emission,
// pass pipelines, object files) and carries LLVM's message text. The remaining variants cover
// failures the wrapper itself detects: strings with interior NUL bytes, LLVM returning a null
// handle, ownership transfers attempted while other handles are alive or on objects this crate
// does not own (including creating owning handles inside a borrowed context), and typed-view
// conversions applied to a value of the wrong kind. LlvmResult<T> is the crate-wide alias.

//! Error types for llvm-capi.

use std::ffi::NulError;
use thiserror::Error;

/// Main error type for LLVM C API calls.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlvmError {
    #[error("{operation} failed: {message}")]
    Message {
        operation: &'static str,
        message: String,
    },

    #[error("failed to parse IR: {message}")]
    ParseIr { message: String },

    #[error("failed to read bitcode: {message}")]
    Bitcode { message: String },

    #[error("verification failed: {message}")]
    Verify { message: String },

    #[error("linking failed: {message}")]
    Link { message: String },

    #[error("target error: {message}")]
    Target { message: String },

    #[error("code emission failed: {message}")]
    Emit { message: String },

    #[error("pass pipeline `{pipeline}` failed: {message}")]
    PassPipeline { pipeline: String, message: String },

    #[error("object file error: {message}")]
    Object { message: String },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("string contains an interior NUL byte at {position}")]
    InteriorNul { position: usize },

    #[error("LLVM returned a null {what}")]
    NullHandle { what: &'static str },

    #[error("{what} is still referenced by {count} other handle(s)")]
    StillShared { what: &'static str, count: usize },

    #[error("{what} is not owned by llvm-capi")]
    NotOwned { what: &'static str },

    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl From<NulError> for LlvmError {
    fn from(err: NulError) -> Self {
        LlvmError::InteriorNul {
            position: err.nul_position(),
        }
    }
}

/// Result type alias for LLVM operations.
pub type LlvmResult<T> = Result<T, LlvmError>;
