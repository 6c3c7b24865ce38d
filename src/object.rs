// Bindings for llvm-c/Object.h. A Binary is an owning handle in the ownership cache; it reads
// its bytes straight out of the memory buffer it was created from, so it keeps a clone of that
// buffer (and of the context, for IR binaries) and drops its own handle first. Section and
// symbol iterators are LLVM cursors: unique RAII values disposed in Drop, exposed as Rust
// iterators that yield a snapshot of each entry. LLVM casts the binary to an object file
// without checking, so iteration is refused up front for archives, IR and other non-object
// binaries.

//! Object files, their sections and symbols.

use crate::context::Context;
use crate::enums::BinaryType;
use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::memory_buffer::MemoryBuffer;
use crate::support::{from_llvm_bool, string_from_ptr, take_message};
use llvm_sys::object::*;
use std::fmt;

owned_kind!(pub(crate) BinaryKind, LLVMOpaqueBinary, LLVMDisposeBinary, "binary");

/// A parsed binary file.
#[derive(Clone)]
pub struct Binary {
    handle: Shared<BinaryKind>,
    _buffer: MemoryBuffer,
    _context: Option<Context>,
}

impl Binary {
    /// Parse `buffer`. A context is only needed for LLVM IR (bitcode) inputs.
    pub fn create(buffer: &MemoryBuffer, context: Option<&Context>) -> LlvmResult<Self> {
        if let Some(context) = context {
            context.check_can_own()?;
        }
        let raw_context = context.map_or(std::ptr::null_mut(), |c| c.as_raw());
        let mut message = std::ptr::null_mut();
        let raw = unsafe { LLVMCreateBinary(buffer.as_raw(), raw_context, &mut message) };
        let message = unsafe { take_message(message) };
        let handle = unsafe { Shared::wrap(raw) }.ok_or(LlvmError::Object { message })?;
        let binary = Self {
            handle,
            _buffer: buffer.clone(),
            _context: context.cloned(),
        };
        log::debug!("opened {:?} binary of {} bytes", binary.binary_type(), buffer.len());
        Ok(binary)
    }

    pub fn as_raw(&self) -> LLVMBinaryRef {
        self.handle.as_raw()
    }

    /// The file format, or `None` for formats newer than this crate.
    pub fn binary_type(&self) -> Option<BinaryType> {
        BinaryType::from_llvm(unsafe { LLVMBinaryGetType(self.as_raw()) })
    }

    /// Whether sections and symbols can be iterated.
    pub fn is_object_file(&self) -> bool {
        matches!(
            self.binary_type(),
            Some(
                BinaryType::Coff
                    | BinaryType::Elf32L
                    | BinaryType::Elf32B
                    | BinaryType::Elf64L
                    | BinaryType::Elf64B
                    | BinaryType::MachO32L
                    | BinaryType::MachO32B
                    | BinaryType::MachO64L
                    | BinaryType::MachO64B
                    | BinaryType::Wasm
            )
        )
    }

    /// A fresh buffer holding a copy of the binary's bytes.
    pub fn copy_memory_buffer(&self) -> LlvmResult<MemoryBuffer> {
        unsafe { MemoryBuffer::from_raw(LLVMBinaryCopyMemoryBuffer(self.as_raw())) }
    }

    fn require_object(&self) -> LlvmResult<()> {
        if !self.is_object_file() {
            return Err(LlvmError::Object {
                message: format!("{:?} is not an object file", self.binary_type()),
            });
        }
        Ok(())
    }

    pub fn sections(&self) -> LlvmResult<Sections<'_>> {
        self.require_object()?;
        Ok(Sections {
            raw: unsafe { LLVMObjectFileCopySectionIterator(self.as_raw()) },
            binary: self,
        })
    }

    pub fn symbols(&self) -> LlvmResult<Symbols<'_>> {
        self.require_object()?;
        Ok(Symbols {
            raw: unsafe { LLVMObjectFileCopySymbolIterator(self.as_raw()) },
            binary: self,
        })
    }
}

impl fmt::Debug for Binary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binary")
            .field("type", &self.binary_type())
            .field("raw", &self.as_raw())
            .finish()
    }
}

/// One section of an object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'b> {
    pub name: String,
    pub address: u64,
    pub size: u64,
    /// Empty for sections without file contents (`.bss`).
    pub contents: &'b [u8],
}

pub struct Sections<'b> {
    raw: LLVMSectionIteratorRef,
    binary: &'b Binary,
}

impl<'b> Iterator for Sections<'b> {
    type Item = Section<'b>;

    fn next(&mut self) -> Option<Section<'b>> {
        if from_llvm_bool(unsafe { LLVMObjectFileIsSectionIteratorAtEnd(self.binary.as_raw(), self.raw) }) {
            return None;
        }
        let section = unsafe {
            let size = LLVMGetSectionSize(self.raw);
            let start = LLVMGetSectionContents(self.raw);
            let contents: &'b [u8] = if start.is_null() || size == 0 {
                &[]
            } else {
                std::slice::from_raw_parts(start as *const u8, size as usize)
            };
            Section {
                name: string_from_ptr(LLVMGetSectionName(self.raw)),
                address: LLVMGetSectionAddress(self.raw),
                size,
                contents,
            }
        };
        unsafe { LLVMMoveToNextSection(self.raw) };
        Some(section)
    }
}

impl Drop for Sections<'_> {
    fn drop(&mut self) {
        unsafe { LLVMDisposeSectionIterator(self.raw) }
    }
}

/// One symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub size: u64,
}

pub struct Symbols<'b> {
    raw: LLVMSymbolIteratorRef,
    binary: &'b Binary,
}

impl Iterator for Symbols<'_> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        if from_llvm_bool(unsafe { LLVMObjectFileIsSymbolIteratorAtEnd(self.binary.as_raw(), self.raw) }) {
            return None;
        }
        let symbol = unsafe {
            Symbol {
                name: string_from_ptr(LLVMGetSymbolName(self.raw)),
                address: LLVMGetSymbolAddress(self.raw),
                size: LLVMGetSymbolSize(self.raw),
            }
        };
        unsafe { LLVMMoveToNextSymbol(self.raw) };
        Some(symbol)
    }
}

impl Drop for Symbols<'_> {
    fn drop(&mut self) {
        unsafe { LLVMDisposeSymbolIterator(self.raw) }
    }
}
