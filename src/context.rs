// This module wraps LLVMContextRef. An owned Context is created with LLVMContextCreate and
// routed through the ownership cache, so every clone (and every Module created in it) shares
// one cell and LLVMContextDispose runs once, after the last module is gone. Creating a context
// installs a diagnostic handler whose user pointer is the DiagnosticSink stored in the cache
// cell; bitcode parsing and linking report failure through that handler rather than through
// an out-parameter, so those operations drain the sink to build their error message. The
// process-wide global context is wrapped unowned, never disposed, and reports into a static
// sink. A context borrowed from another owner (inkwell) has neither a sink nor a lifetime this
// crate controls, so operations that create owning handles in it (modules, binaries) or that
// report through the diagnostic handler refuse it with NotOwned. The remaining methods are the
// context-scoped constructors of llvm-c/Core.h: types, attributes, metadata, constant strings
// and structs, basic blocks, builders and modules.

//! LLVM contexts and their diagnostic sinks.

use crate::attributes::Attribute;
use crate::basic_block::BasicBlock;
use crate::builder::Builder;
use crate::enums::DiagnosticSeverity;
use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::memory_buffer::MemoryBuffer;
use crate::module::Module;
use crate::support::{from_llvm_bool, llvm_bool, take_message, to_cstring};
use crate::types::{
    FloatType, FunctionType, IntType, PointerType, StructType, Type,
};
use crate::values::{Constant, ConstantData, FunctionValue, Metadata, MetadataValue, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMContextRef, LLVMDiagnosticInfoRef, LLVMMetadataRef, LLVMTypeRef, LLVMValueRef};
use llvm_sys::LLVMContext;
use std::ffi::{c_char, c_void};
use std::fmt;
use std::sync::{LazyLock, Mutex, PoisonError};

/// A diagnostic reported by LLVM through the context's handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            DiagnosticSeverity::Error => "error",
            DiagnosticSeverity::Warning => "warning",
            DiagnosticSeverity::Remark => "remark",
            DiagnosticSeverity::Note => "note",
        };
        write!(f, "{level}: {}", self.message)
    }
}

/// Diagnostics collected since the last drain.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    fn push(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic);
    }

    fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

static GLOBAL_DIAGNOSTICS: LazyLock<DiagnosticSink> = LazyLock::new(DiagnosticSink::default);

owned_kind!(
    pub(crate) ContextKind,
    LLVMContext,
    LLVMContextDispose,
    "context",
    state = DiagnosticSink
);

extern "C" fn diagnostic_handler(info: LLVMDiagnosticInfoRef, sink: *mut c_void) {
    if sink.is_null() {
        return;
    }
    let sink = unsafe { &*(sink as *const DiagnosticSink) };
    let severity = DiagnosticSeverity::from(unsafe { LLVMGetDiagInfoSeverity(info) });
    let message = unsafe { take_message(LLVMGetDiagInfoDescription(info)) };
    log::debug!("llvm diagnostic ({severity:?}): {message}");
    sink.push(Diagnostic { severity, message });
}

/// An LLVM context: owner of types, constants and metadata.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Context {
    handle: Shared<ContextKind>,
}

impl Context {
    /// Create a fresh context.
    pub fn create() -> LlvmResult<Self> {
        let raw = unsafe { LLVMContextCreate() };
        let handle = unsafe { Shared::<ContextKind>::wrap(raw) }
            .ok_or(LlvmError::NullHandle { what: "context" })?;
        let sink = handle.state() as *const DiagnosticSink as *mut c_void;
        unsafe { LLVMContextSetDiagnosticHandler(raw, Some(diagnostic_handler), sink) };
        Ok(Self { handle })
    }

    /// The process-wide global context. Never disposed.
    pub fn global() -> Self {
        let raw = unsafe { LLVMGetGlobalContext() };
        unsafe {
            let installed = LLVMContextGetDiagnosticHandler(raw).map(|f| f as usize);
            if installed != Some(diagnostic_handler as usize) {
                let sink = &*GLOBAL_DIAGNOSTICS as *const DiagnosticSink as *mut c_void;
                LLVMContextSetDiagnosticHandler(raw, Some(diagnostic_handler), sink);
            }
            Self {
                handle: Shared::unowned(raw),
            }
        }
    }

    /// Context for a raw pointer met while navigating IR.
    ///
    /// Joins the owner when the context was created here; otherwise the handle is unowned.
    ///
    /// # Safety
    /// `raw` must be a live context that outlives the returned handle.
    pub unsafe fn from_raw_borrowed(raw: LLVMContextRef) -> Self {
        if raw == LLVMGetGlobalContext() {
            return Self::global();
        }
        match Shared::<ContextKind>::lookup(raw) {
            Some(handle) => Self { handle },
            None => Self {
                handle: Shared::unowned(raw),
            },
        }
    }

    pub fn as_raw(&self) -> LLVMContextRef {
        self.handle.as_raw()
    }

    /// Whether this handle disposes the context once the last clone is gone.
    pub fn is_owned(&self) -> bool {
        self.handle.is_owned()
    }

    pub fn is_global(&self) -> bool {
        self.as_raw() == unsafe { LLVMGetGlobalContext() }
    }

    pub fn should_discard_value_names(&self) -> bool {
        from_llvm_bool(unsafe { LLVMContextShouldDiscardValueNames(self.as_raw()) })
    }

    pub fn set_discard_value_names(&self, discard: bool) {
        unsafe { LLVMContextSetDiscardValueNames(self.as_raw(), llvm_bool(discard)) }
    }

    /// Whether modules and other owning handles can be created in this context.
    ///
    /// True for owned contexts and the global one. A borrowed context may be disposed by its
    /// owner first and has no diagnostic handler installed.
    pub fn can_own(&self) -> bool {
        self.is_owned() || self.is_global()
    }

    pub(crate) fn check_can_own(&self) -> LlvmResult<()> {
        if self.can_own() {
            Ok(())
        } else {
            log::debug!("refusing owning operation in borrowed context {:#x}", self.as_raw() as usize);
            Err(LlvmError::NotOwned { what: "context" })
        }
    }

    fn sink(&self) -> &DiagnosticSink {
        if self.is_owned() {
            self.handle.state()
        } else {
            &GLOBAL_DIAGNOSTICS
        }
    }

    /// Drain the diagnostics reported since the last call.
    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        self.sink().take()
    }

    /// Drain the diagnostics and join the error-level ones into one message.
    pub(crate) fn diagnostic_message(&self) -> String {
        let diagnostics = self.take_diagnostics();
        let errors: Vec<String> = diagnostics
            .iter()
            .filter(|d| d.severity == DiagnosticSeverity::Error)
            .map(|d| d.message.clone())
            .collect();
        if !errors.is_empty() {
            errors.join("\n")
        } else if let Some(last) = diagnostics.last() {
            last.message.clone()
        } else {
            String::from("unknown error")
        }
    }

    /// Metadata kind id for `name`, registering it if needed.
    pub fn md_kind_id(&self, name: &str) -> u32 {
        unsafe {
            LLVMGetMDKindIDInContext(self.as_raw(), name.as_ptr() as *const c_char, name.len() as u32)
        }
    }

    // Types

    pub fn int_type(&self, bits: u32) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMIntTypeInContext(self.as_raw(), bits)) }
    }

    pub fn bool_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt1TypeInContext(self.as_raw())) }
    }

    pub fn i8_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt8TypeInContext(self.as_raw())) }
    }

    pub fn i16_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt16TypeInContext(self.as_raw())) }
    }

    pub fn i32_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt32TypeInContext(self.as_raw())) }
    }

    pub fn i64_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt64TypeInContext(self.as_raw())) }
    }

    pub fn i128_type(&self) -> IntType<'_> {
        unsafe { IntType::from_raw_unchecked(LLVMInt128TypeInContext(self.as_raw())) }
    }

    pub fn half_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMHalfTypeInContext(self.as_raw())) }
    }

    pub fn bfloat_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMBFloatTypeInContext(self.as_raw())) }
    }

    pub fn f32_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMFloatTypeInContext(self.as_raw())) }
    }

    pub fn f64_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMDoubleTypeInContext(self.as_raw())) }
    }

    pub fn x86_fp80_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMX86FP80TypeInContext(self.as_raw())) }
    }

    pub fn fp128_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMFP128TypeInContext(self.as_raw())) }
    }

    pub fn ppc_fp128_type(&self) -> FloatType<'_> {
        unsafe { FloatType::from_raw_unchecked(LLVMPPCFP128TypeInContext(self.as_raw())) }
    }

    pub fn void_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMVoidTypeInContext(self.as_raw())) }
    }

    pub fn label_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMLabelTypeInContext(self.as_raw())) }
    }

    pub fn token_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMTokenTypeInContext(self.as_raw())) }
    }

    pub fn metadata_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMMetadataTypeInContext(self.as_raw())) }
    }

    pub fn x86_mmx_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMX86MMXTypeInContext(self.as_raw())) }
    }

    pub fn x86_amx_type(&self) -> Type<'_> {
        unsafe { Type::from_raw(LLVMX86AMXTypeInContext(self.as_raw())) }
    }

    /// The opaque pointer type in `address_space`.
    pub fn ptr_type(&self, address_space: u32) -> PointerType<'_> {
        unsafe {
            PointerType::from_raw_unchecked(LLVMPointerTypeInContext(self.as_raw(), address_space))
        }
    }

    /// A literal (unnamed) struct type.
    pub fn struct_type(&self, elements: &[Type<'_>], packed: bool) -> StructType<'_> {
        let mut raw: Vec<LLVMTypeRef> = elements.iter().map(|t| t.as_raw()).collect();
        unsafe {
            StructType::from_raw_unchecked(LLVMStructTypeInContext(
                self.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
                llvm_bool(packed),
            ))
        }
    }

    /// A named struct type without a body.
    pub fn opaque_struct_type(&self, name: &str) -> LlvmResult<StructType<'_>> {
        let name = to_cstring(name)?;
        Ok(unsafe {
            StructType::from_raw_unchecked(LLVMStructCreateNamed(self.as_raw(), name.as_ptr()))
        })
    }

    /// A target extension type such as `target("spirv.Image")`.
    pub fn target_ext_type(
        &self,
        name: &str,
        type_params: &[Type<'_>],
        int_params: &[u32],
    ) -> LlvmResult<Type<'_>> {
        let name = to_cstring(name)?;
        let mut types: Vec<LLVMTypeRef> = type_params.iter().map(|t| t.as_raw()).collect();
        let mut ints = int_params.to_vec();
        let raw = unsafe {
            LLVMTargetExtTypeInContext(
                self.as_raw(),
                name.as_ptr(),
                types.as_mut_ptr(),
                types.len() as u32,
                ints.as_mut_ptr(),
                ints.len() as u32,
            )
        };
        unsafe { Type::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "target extension type" })
    }

    /// Function type from a return type and parameters.
    pub fn fn_type<'a>(&'a self, ret: Type<'a>, params: &[Type<'a>], var_args: bool) -> FunctionType<'a> {
        ret.fn_type(params, var_args)
    }

    /// Look up a named struct type.
    pub fn get_type_by_name(&self, name: &str) -> LlvmResult<Option<Type<'_>>> {
        let name = to_cstring(name)?;
        Ok(unsafe { Type::from_raw_opt(LLVMGetTypeByName2(self.as_raw(), name.as_ptr())) })
    }

    // Attributes

    pub fn create_enum_attribute(&self, kind_id: u32, value: u64) -> Attribute<'_> {
        unsafe { Attribute::from_raw(LLVMCreateEnumAttribute(self.as_raw(), kind_id, value)) }
    }

    pub fn create_type_attribute(&self, kind_id: u32, ty: Type<'_>) -> Attribute<'_> {
        unsafe { Attribute::from_raw(LLVMCreateTypeAttribute(self.as_raw(), kind_id, ty.as_raw())) }
    }

    pub fn create_string_attribute(&self, key: &str, value: &str) -> Attribute<'_> {
        unsafe {
            Attribute::from_raw(LLVMCreateStringAttribute(
                self.as_raw(),
                key.as_ptr() as *const c_char,
                key.len() as u32,
                value.as_ptr() as *const c_char,
                value.len() as u32,
            ))
        }
    }

    // Metadata

    pub fn md_string(&self, text: &str) -> Metadata<'_> {
        unsafe {
            Metadata::from_raw(LLVMMDStringInContext2(
                self.as_raw(),
                text.as_ptr() as *const c_char,
                text.len(),
            ))
        }
    }

    pub fn md_node(&self, operands: &[Metadata<'_>]) -> Metadata<'_> {
        let mut raw: Vec<LLVMMetadataRef> = operands.iter().map(|m| m.as_raw()).collect();
        unsafe { Metadata::from_raw(LLVMMDNodeInContext2(self.as_raw(), raw.as_mut_ptr(), raw.len())) }
    }

    pub fn metadata_as_value<'a>(&'a self, md: Metadata<'a>) -> MetadataValue<'a> {
        unsafe {
            MetadataValue::from_raw_unchecked(LLVMMetadataAsValue(self.as_raw(), md.as_raw()))
        }
    }

    // Constants

    /// A constant `[N x i8]` holding `bytes`, NUL-terminated when `null_terminate` is set.
    pub fn const_string(&self, bytes: &[u8], null_terminate: bool) -> ConstantData<'_> {
        unsafe {
            ConstantData::from_raw_unchecked(LLVMConstStringInContext(
                self.as_raw(),
                bytes.as_ptr() as *const c_char,
                bytes.len() as u32,
                llvm_bool(!null_terminate),
            ))
        }
    }

    /// A constant literal struct.
    pub fn const_struct<'a>(&'a self, fields: &[Value<'a>], packed: bool) -> Constant<'a> {
        let mut raw: Vec<LLVMValueRef> = fields.iter().map(|v| v.as_raw()).collect();
        unsafe {
            Constant::from_raw_unchecked(LLVMConstStructInContext(
                self.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
                llvm_bool(packed),
            ))
        }
    }

    // Blocks, builders and modules

    /// Append a new block to the end of `function`.
    pub fn append_basic_block<'a>(
        &'a self,
        function: FunctionValue<'a>,
        name: &str,
    ) -> LlvmResult<BasicBlock<'a>> {
        let name = to_cstring(name)?;
        let raw = unsafe { LLVMAppendBasicBlockInContext(self.as_raw(), function.as_raw(), name.as_ptr()) };
        unsafe { BasicBlock::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "basic block" })
    }

    /// Insert a new block before `before`.
    pub fn insert_basic_block<'a>(
        &'a self,
        before: BasicBlock<'a>,
        name: &str,
    ) -> LlvmResult<BasicBlock<'a>> {
        let name = to_cstring(name)?;
        let raw = unsafe { LLVMInsertBasicBlockInContext(self.as_raw(), before.as_raw(), name.as_ptr()) };
        unsafe { BasicBlock::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "basic block" })
    }

    /// A block not yet attached to any function.
    pub fn create_basic_block(&self, name: &str) -> LlvmResult<BasicBlock<'_>> {
        let name = to_cstring(name)?;
        let raw = unsafe { LLVMCreateBasicBlockInContext(self.as_raw(), name.as_ptr()) };
        unsafe { BasicBlock::from_raw_opt(raw) }.ok_or(LlvmError::NullHandle { what: "basic block" })
    }

    pub fn create_builder(&self) -> Builder<'_> {
        Builder::new(self)
    }

    pub fn create_module(&self, name: &str) -> LlvmResult<Module> {
        Module::create(name, self)
    }

    /// Parse textual IR; the buffer is consumed.
    pub fn parse_ir(&self, buffer: MemoryBuffer) -> LlvmResult<Module> {
        crate::ir_reader::parse_ir(self, buffer)
    }

    /// Parse a complete bitcode module.
    pub fn parse_bitcode(&self, buffer: &MemoryBuffer) -> LlvmResult<Module> {
        crate::bitcode::parse_bitcode(self, buffer)
    }

    /// Lazily read a bitcode module; the buffer is consumed on success.
    pub fn lazy_bitcode_module(&self, buffer: MemoryBuffer) -> LlvmResult<Module> {
        crate::bitcode::lazy_bitcode_module(self, buffer)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("raw", &self.as_raw())
            .field("owned", &self.is_owned())
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
    fn test_clones_share_one_cell() {
        init();
        let ctx = Context::create().unwrap();
        let raw = ctx.as_raw();
        let other = ctx.clone();
        assert_eq!(ctx, other);
        assert!(ContextKind::registry().contains(raw));
        drop(ctx);
        assert!(ContextKind::registry().contains(raw));
        drop(other);
        assert!(!ContextKind::registry().contains(raw));
    }

    #[test]
    fn test_global_context_is_unowned() {
        init();
        let global = Context::global();
        assert!(global.is_global());
        assert!(!global.is_owned());
        assert_eq!(global, Context::global());
    }

    #[test]
    fn test_discard_value_names() {
        init();
        let ctx = Context::create().unwrap();
        ctx.set_discard_value_names(true);
        assert!(ctx.should_discard_value_names());
        ctx.set_discard_value_names(false);
        assert!(!ctx.should_discard_value_names());
    }

    #[test]
    fn test_md_kind_id_is_stable() {
        init();
        let ctx = Context::create().unwrap();
        let dbg = ctx.md_kind_id("dbg");
        assert_eq!(dbg, ctx.md_kind_id("dbg"));
        assert_ne!(ctx.md_kind_id("my.custom.kind"), dbg);
    }

    #[test]
    fn test_diagnostic_message_without_diagnostics() {
        init();
        let ctx = Context::create().unwrap();
        assert!(ctx.take_diagnostics().is_empty());
        assert_eq!(ctx.diagnostic_message(), "unknown error");
    }
}
