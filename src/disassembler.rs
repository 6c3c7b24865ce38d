// Disassembly (llvm-c/Disassembler.h). DisasmContext owns an LLVMDisasmContextRef through the
// ownership cache. LLVMDisasmInstruction decodes one instruction into a caller buffer and
// returns its size, zero meaning the bytes did not decode; the iterator steps one byte past
// such bytes so a stream with data in it still yields the following instructions.

//! Machine-code disassembly.
//!
//! Creating a context needs the target's disassembler registered first, e.g. through
//! [`crate::target::initialize_native_target`] or [`crate::target::initialize_all_targets`].

use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::support::to_cstring;
use llvm_sys::disassembler::*;
use std::ffi::{c_char, CStr};
use std::fmt;

owned_kind!(
    pub(crate) DisasmContextKind,
    LLVMOpaqueDisasmContext,
    LLVMDisasmDispose,
    "disassembler context"
);

/// Printer options for [`DisasmContext::set_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DisasmOptions {
    pub use_markup: bool,
    pub print_imm_hex: bool,
    /// Use the other assembly dialect (Intel syntax on x86).
    pub asm_printer_variant: bool,
    pub instruction_comments: bool,
    pub print_latency: bool,
}

impl DisasmOptions {
    pub fn bits(self) -> u64 {
        let mut bits = 0;
        if self.use_markup {
            bits |= LLVMDisassembler_Option_UseMarkup;
        }
        if self.print_imm_hex {
            bits |= LLVMDisassembler_Option_PrintImmHex;
        }
        if self.asm_printer_variant {
            bits |= LLVMDisassembler_Option_AsmPrinterVariant;
        }
        if self.instruction_comments {
            bits |= LLVMDisassembler_Option_SetInstrComments;
        }
        if self.print_latency {
            bits |= LLVMDisassembler_Option_PrintLatency;
        }
        bits
    }
}

/// One decoded instruction, or an undecodable byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembled {
    pub address: u64,
    pub size: usize,
    /// `None` when the bytes at `address` do not decode.
    pub text: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DisasmContext {
    handle: Shared<DisasmContextKind>,
}

const OUT_LEN: usize = 256;

impl DisasmContext {
    pub fn create(triple: &str) -> LlvmResult<Self> {
        Self::create_with_cpu_features(triple, "", "")
    }

    pub fn create_with_cpu(triple: &str, cpu: &str) -> LlvmResult<Self> {
        Self::create_with_cpu_features(triple, cpu, "")
    }

    pub fn create_with_cpu_features(triple: &str, cpu: &str, features: &str) -> LlvmResult<Self> {
        let c_triple = to_cstring(triple)?;
        let c_cpu = to_cstring(cpu)?;
        let c_features = to_cstring(features)?;
        let raw = unsafe {
            LLVMCreateDisasmCPUFeatures(
                c_triple.as_ptr(),
                c_cpu.as_ptr(),
                c_features.as_ptr(),
                std::ptr::null_mut(),
                0,
                None,
                None,
            )
        };
        let handle = unsafe { Shared::wrap(raw) }.ok_or_else(|| LlvmError::Target {
            message: format!("no disassembler registered for `{triple}`"),
        })?;
        log::debug!("created disassembler for {triple}");
        Ok(Self { handle })
    }

    pub fn as_raw(&self) -> LLVMDisasmContextRef {
        self.handle.as_raw()
    }

    /// Apply printer options; fails if the target rejects any of them.
    pub fn set_options(&self, options: DisasmOptions) -> LlvmResult<()> {
        let accepted = unsafe { LLVMSetDisasmOptions(self.as_raw(), options.bits()) };
        if accepted == 0 {
            return Err(LlvmError::Message {
                operation: "set_disasm_options",
                message: format!("options {options:?} not supported"),
            });
        }
        Ok(())
    }

    /// Decode the instruction at the start of `bytes`, assumed to live at address `pc`.
    ///
    /// Returns the instruction size and its text, or `None` if the bytes do not decode.
    pub fn disassemble_one(&self, bytes: &[u8], pc: u64) -> Option<(usize, String)> {
        if bytes.is_empty() {
            return None;
        }
        let mut out = [0 as c_char; OUT_LEN];
        let size = unsafe {
            LLVMDisasmInstruction(
                self.as_raw(),
                bytes.as_ptr() as *mut u8,
                bytes.len() as u64,
                pc,
                out.as_mut_ptr(),
                OUT_LEN,
            )
        };
        if size == 0 {
            return None;
        }
        let text = unsafe { CStr::from_ptr(out.as_ptr()) }.to_string_lossy();
        Some((size, text.trim().to_string()))
    }

    /// Decode `bytes` front to back, stepping over undecodable bytes one at a time.
    pub fn disassemble<'a>(&'a self, bytes: &'a [u8], pc: u64) -> impl Iterator<Item = Disassembled> + 'a {
        let mut offset = 0usize;
        std::iter::from_fn(move || {
            if offset >= bytes.len() {
                return None;
            }
            let address = pc + offset as u64;
            let item = match self.disassemble_one(&bytes[offset..], address) {
                Some((size, text)) => Disassembled {
                    address,
                    size,
                    text: Some(text),
                },
                None => Disassembled {
                    address,
                    size: 1,
                    text: None,
                },
            };
            offset += item.size;
            Some(item)
        })
    }
}

impl fmt::Debug for DisasmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisasmContext({:p})", self.as_raw())
    }
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;
    use crate::target::initialize_native_target;

    const PROLOGUE: &[u8] = &[0x55, 0x48, 0x89, 0xe5, 0xc3];

    #[test]
    fn test_decode_prologue() {
        initialize_native_target().unwrap();
        let dc = DisasmContext::create("x86_64-unknown-linux-gnu").unwrap();
        let decoded: Vec<Disassembled> = dc.disassemble(PROLOGUE, 0x1000).collect();
        let sizes: Vec<usize> = decoded.iter().map(|d| d.size).collect();
        assert_eq!(sizes, vec![1, 3, 1]);
        assert_eq!(decoded[1].address, 0x1001);
        assert!(decoded[0].text.as_deref().unwrap().starts_with("push"));
        assert!(decoded[2].text.as_deref().unwrap().starts_with("ret"));
    }

    #[test]
    fn test_intel_variant() {
        initialize_native_target().unwrap();
        let dc = DisasmContext::create("x86_64-unknown-linux-gnu").unwrap();
        dc.set_options(DisasmOptions {
            asm_printer_variant: true,
            ..DisasmOptions::default()
        })
        .unwrap();
        let (size, text) = dc.disassemble_one(&PROLOGUE[1..], 0).unwrap();
        assert_eq!(size, 3);
        assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["mov", "rbp,", "rsp"]);
    }

    #[test]
    fn test_unknown_triple() {
        initialize_native_target().unwrap();
        assert!(DisasmContext::create("nonsense-unknown-nowhere").is_err());
        let dc = DisasmContext::create("x86_64-unknown-linux-gnu").unwrap();
        assert!(dc.disassemble_one(&[], 0).is_none());
    }
}
