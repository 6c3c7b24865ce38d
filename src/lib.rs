//! llvm-capi - safe handles over LLVM's C API.
//!
//! Every operation forwards to an `llvm-c` entry point through `llvm-sys`. On top of the raw
//! calls the crate adds three things:
//!
//! - an ownership cache, so an LLVM object reached through any number of handles is disposed
//!   exactly once, and only if this crate created it;
//! - kind dispatch, turning opaque `LLVMValueRef`/`LLVMTypeRef`/`LLVMAttributeRef` pointers
//!   into closed enums of typed views;
//! - error translation, turning LLVM's out-parameter messages and status codes into
//!   [`LlvmError`].
//!
//! # Primary Usage
//!
//! ```ignore
//! use llvm_capi::{Context, values::AnyValue};
//!
//! let ctx = Context::create()?;
//! let module = ctx.parse_ir(MemoryBuffer::create_from_bytes(ir, "input.ll")?)?;
//! module.verify()?;
//! for function in module.functions() {
//!     for inst in function.basic_blocks().flat_map(|b| b.instructions()) {
//!         println!("{:?}", inst.classify());
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`handle`] - ownership cache shared by every owning handle
//! - [`context`], [`module`], [`types`], [`values`], [`basic_block`], [`builder`] - core IR
//! - [`ir_reader`], [`bitcode`], [`linker`], [`analysis`], [`pass_manager`] - whole-module work
//! - [`target`], [`target_machine`], [`object`], [`disassembler`] - code generation
//! - [`interop`] - views over IR built with inkwell

pub mod handle;
pub mod support;
pub mod error;
pub mod enums;
pub mod iter;

pub mod context;
pub mod memory_buffer;
pub mod module;
pub mod module_flags;
pub mod types;
pub mod values;
pub mod basic_block;
pub mod attributes;
pub mod builder;
pub mod intrinsics;
pub mod operand_bundle;

pub mod analysis;
pub mod bitcode;
pub mod ir_reader;
pub mod linker;
pub mod pass_manager;
pub mod error_handling;

pub mod target;
pub mod target_machine;
pub mod object;
pub mod disassembler;

pub mod interop;

pub use attributes::{AnyAttribute, Attribute, AttributeIndex};
pub use basic_block::BasicBlock;
pub use builder::Builder;
pub use context::{Context, Diagnostic};
pub use error::{LlvmError, LlvmResult};
pub use handle::Borrowed;
pub use intrinsics::Intrinsic;
pub use memory_buffer::MemoryBuffer;
pub use module::Module;
pub use operand_bundle::OperandBundle;
pub use types::{AnyType, Type};
pub use values::{AnyInstruction, AnyValue, FunctionValue, Instruction, Value};
