// Module wraps LLVMModuleRef as an owning handle routed through the ownership cache. A module
// always keeps a clone of its Context, and the handle field is dropped first, so a context is
// disposed only after every module created in it. Navigating back from IR (a global's parent)
// joins the existing owner through Module::from_raw_borrowed instead of creating a second
// owner; a module this crate never created is wrapped unowned and only handed out borrowed.
// Owning modules are only created in owned contexts or the global one. Modules consumed by LLVM
// (the source of a link) leave the cache through into_raw, which refuses while clones are
// alive and refuses unowned modules outright.
// The rest of the file binds the module-level functions of llvm-c/Core.h: identification,
// layout and triple, inline asm, the global lists (functions, variables, aliases, ifuncs),
// named metadata, module flags, printing and cloning.

//! LLVM modules.

use crate::context::Context;
use crate::enums::ModuleFlagBehavior;
use crate::error::{LlvmError, LlvmResult};
use crate::handle::{owned_kind, Shared};
use crate::intrinsics::Intrinsic;
use crate::iter::Chain;
use crate::memory_buffer::MemoryBuffer;
use crate::module_flags::ModuleFlagEntries;
use crate::support::{from_llvm_bool, string_from_parts, string_from_ptr, take_message, to_cstring, LlvmString};
use crate::types::{FunctionType, Type};
use crate::values::{
    Constant, FunctionValue, GlobalAlias, GlobalIFunc, GlobalVariable, Metadata, NamedMdNode, Value,
};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMModuleRef, LLVMValueRef};
use llvm_sys::LLVMModule;
use std::ffi::c_char;
use std::fmt;
use std::path::Path;

owned_kind!(pub(crate) ModuleKind, LLVMModule, LLVMDisposeModule, "module");

/// An LLVM module.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Module {
    handle: Shared<ModuleKind>,
    context: Context,
}

fn global_view<T>(raw: LLVMValueRef, make: unsafe fn(LLVMValueRef) -> T) -> Option<T> {
    (!raw.is_null()).then(|| unsafe { make(raw) })
}

impl Module {
    /// Create an empty module called `name` in `context`.
    pub fn create(name: &str, context: &Context) -> LlvmResult<Self> {
        context.check_can_own()?;
        let c_name = to_cstring(name)?;
        let raw = unsafe { LLVMModuleCreateWithNameInContext(c_name.as_ptr(), context.as_raw()) };
        log::trace!("created module `{name}`");
        unsafe { Self::from_raw(raw, context.clone()) }
    }

    /// Take ownership of a module LLVM handed back.
    ///
    /// # Safety
    /// `raw` must be a live module of `context` that nobody else disposes.
    pub(crate) unsafe fn from_raw(raw: LLVMModuleRef, context: Context) -> LlvmResult<Self> {
        let handle = Shared::wrap(raw).ok_or(LlvmError::NullHandle { what: "module" })?;
        Ok(Self { handle, context })
    }

    /// Module for a raw pointer met while navigating IR.
    ///
    /// Joins the existing owner when there is one; otherwise the handle is unowned.
    ///
    /// # Safety
    /// `raw` must be a live module that outlives the returned handle.
    pub unsafe fn from_raw_borrowed(raw: LLVMModuleRef) -> Self {
        let handle = Shared::lookup(raw).unwrap_or_else(|| Shared::unowned(raw));
        let context = Context::from_raw_borrowed(LLVMGetModuleContext(raw));
        Self { handle, context }
    }

    /// The owning handle for `raw`, if this crate owns that module.
    pub fn lookup(raw: LLVMModuleRef) -> Option<Self> {
        let handle = Shared::lookup(raw)?;
        let context = unsafe { Context::from_raw_borrowed(LLVMGetModuleContext(raw)) };
        Some(Self { handle, context })
    }

    pub fn as_raw(&self) -> LLVMModuleRef {
        self.handle.as_raw()
    }

    pub fn is_owned(&self) -> bool {
        self.handle.is_owned()
    }

    /// Hand the module to LLVM for good.
    pub(crate) fn into_raw(self) -> LlvmResult<LLVMModuleRef> {
        if !self.is_owned() {
            return Err(LlvmError::NotOwned { what: "module" });
        }
        let Module { handle, context } = self;
        let raw = handle.release().map_err(|handle| LlvmError::StillShared {
            what: "module",
            count: handle.handle_count() - 1,
        })?;
        drop(context);
        Ok(raw)
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    // Identification

    pub fn identifier(&self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetModuleIdentifier(self.as_raw(), &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn set_identifier(&self, identifier: &str) {
        unsafe {
            LLVMSetModuleIdentifier(self.as_raw(), identifier.as_ptr() as *const c_char, identifier.len())
        }
    }

    pub fn source_file_name(&self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetSourceFileName(self.as_raw(), &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn set_source_file_name(&self, name: &str) {
        unsafe { LLVMSetSourceFileName(self.as_raw(), name.as_ptr() as *const c_char, name.len()) }
    }

    pub fn data_layout(&self) -> String {
        unsafe { string_from_ptr(LLVMGetDataLayoutStr(self.as_raw())) }
    }

    pub fn set_data_layout(&self, layout: &str) -> LlvmResult<()> {
        let layout = to_cstring(layout)?;
        unsafe { LLVMSetDataLayout(self.as_raw(), layout.as_ptr()) };
        Ok(())
    }

    pub fn target_triple(&self) -> String {
        unsafe { string_from_ptr(LLVMGetTarget(self.as_raw())) }
    }

    pub fn set_target_triple(&self, triple: &str) -> LlvmResult<()> {
        let triple = to_cstring(triple)?;
        unsafe { LLVMSetTarget(self.as_raw(), triple.as_ptr()) };
        Ok(())
    }

    pub fn inline_asm(&self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetModuleInlineAsm(self.as_raw(), &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn set_inline_asm(&self, asm: &str) {
        unsafe { LLVMSetModuleInlineAsm2(self.as_raw(), asm.as_ptr() as *const c_char, asm.len()) }
    }

    pub fn append_inline_asm(&self, asm: &str) {
        unsafe { LLVMAppendModuleInlineAsm(self.as_raw(), asm.as_ptr() as *const c_char, asm.len()) }
    }

    // Functions

    pub fn add_function(&self, name: &str, ty: FunctionType<'_>) -> LlvmResult<FunctionValue<'_>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe { LLVMAddFunction(self.as_raw(), c_name.as_ptr(), ty.as_raw()) };
        global_view(raw, FunctionValue::from_raw_unchecked).ok_or(LlvmError::NullHandle { what: "function" })
    }

    pub fn get_function(&self, name: &str) -> LlvmResult<Option<FunctionValue<'_>>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe { LLVMGetNamedFunction(self.as_raw(), c_name.as_ptr()) };
        Ok(global_view(raw, FunctionValue::from_raw_unchecked))
    }

    pub fn first_function(&self) -> Option<FunctionValue<'_>> {
        global_view(unsafe { LLVMGetFirstFunction(self.as_raw()) }, FunctionValue::from_raw_unchecked)
    }

    pub fn last_function(&self) -> Option<FunctionValue<'_>> {
        global_view(unsafe { LLVMGetLastFunction(self.as_raw()) }, FunctionValue::from_raw_unchecked)
    }

    pub fn functions(&self) -> Chain<FunctionValue<'_>> {
        Chain::new(self.first_function(), FunctionValue::next_function)
    }

    // Global variables

    pub fn add_global(&self, ty: Type<'_>, name: &str) -> LlvmResult<GlobalVariable<'_>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe { LLVMAddGlobal(self.as_raw(), ty.as_raw(), c_name.as_ptr()) };
        global_view(raw, GlobalVariable::from_raw_unchecked).ok_or(LlvmError::NullHandle { what: "global" })
    }

    pub fn add_global_in_address_space(
        &self,
        ty: Type<'_>,
        name: &str,
        address_space: u32,
    ) -> LlvmResult<GlobalVariable<'_>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe {
            LLVMAddGlobalInAddressSpace(self.as_raw(), ty.as_raw(), c_name.as_ptr(), address_space)
        };
        global_view(raw, GlobalVariable::from_raw_unchecked).ok_or(LlvmError::NullHandle { what: "global" })
    }

    pub fn get_global(&self, name: &str) -> LlvmResult<Option<GlobalVariable<'_>>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe { LLVMGetNamedGlobal(self.as_raw(), c_name.as_ptr()) };
        Ok(global_view(raw, GlobalVariable::from_raw_unchecked))
    }

    pub fn first_global(&self) -> Option<GlobalVariable<'_>> {
        global_view(unsafe { LLVMGetFirstGlobal(self.as_raw()) }, GlobalVariable::from_raw_unchecked)
    }

    pub fn last_global(&self) -> Option<GlobalVariable<'_>> {
        global_view(unsafe { LLVMGetLastGlobal(self.as_raw()) }, GlobalVariable::from_raw_unchecked)
    }

    pub fn globals(&self) -> Chain<GlobalVariable<'_>> {
        Chain::new(self.first_global(), GlobalVariable::next_global)
    }

    // Aliases and ifuncs

    pub fn add_alias<'m>(
        &'m self,
        value_type: Type<'m>,
        address_space: u32,
        aliasee: Constant<'m>,
        name: &str,
    ) -> LlvmResult<GlobalAlias<'m>> {
        let c_name = to_cstring(name)?;
        let raw = unsafe {
            LLVMAddAlias2(
                self.as_raw(),
                value_type.as_raw(),
                address_space,
                aliasee.as_raw(),
                c_name.as_ptr(),
            )
        };
        global_view(raw, GlobalAlias::from_raw_unchecked).ok_or(LlvmError::NullHandle { what: "alias" })
    }

    pub fn get_alias(&self, name: &str) -> Option<GlobalAlias<'_>> {
        let raw = unsafe {
            LLVMGetNamedGlobalAlias(self.as_raw(), name.as_ptr() as *const c_char, name.len())
        };
        global_view(raw, GlobalAlias::from_raw_unchecked)
    }

    pub fn first_alias(&self) -> Option<GlobalAlias<'_>> {
        global_view(unsafe { LLVMGetFirstGlobalAlias(self.as_raw()) }, GlobalAlias::from_raw_unchecked)
    }

    pub fn last_alias(&self) -> Option<GlobalAlias<'_>> {
        global_view(unsafe { LLVMGetLastGlobalAlias(self.as_raw()) }, GlobalAlias::from_raw_unchecked)
    }

    pub fn aliases(&self) -> Chain<GlobalAlias<'_>> {
        Chain::new(self.first_alias(), GlobalAlias::next_alias)
    }

    pub fn add_ifunc<'m>(
        &'m self,
        name: &str,
        ty: FunctionType<'m>,
        address_space: u32,
        resolver: FunctionValue<'m>,
    ) -> LlvmResult<GlobalIFunc<'m>> {
        let raw = unsafe {
            LLVMAddGlobalIFunc(
                self.as_raw(),
                name.as_ptr() as *const c_char,
                name.len(),
                ty.as_raw(),
                address_space,
                resolver.as_raw(),
            )
        };
        global_view(raw, GlobalIFunc::from_raw_unchecked).ok_or(LlvmError::NullHandle { what: "ifunc" })
    }

    pub fn get_ifunc(&self, name: &str) -> Option<GlobalIFunc<'_>> {
        let raw = unsafe {
            LLVMGetNamedGlobalIFunc(self.as_raw(), name.as_ptr() as *const c_char, name.len())
        };
        global_view(raw, GlobalIFunc::from_raw_unchecked)
    }

    pub fn first_ifunc(&self) -> Option<GlobalIFunc<'_>> {
        global_view(unsafe { LLVMGetFirstGlobalIFunc(self.as_raw()) }, GlobalIFunc::from_raw_unchecked)
    }

    pub fn last_ifunc(&self) -> Option<GlobalIFunc<'_>> {
        global_view(unsafe { LLVMGetLastGlobalIFunc(self.as_raw()) }, GlobalIFunc::from_raw_unchecked)
    }

    pub fn ifuncs(&self) -> Chain<GlobalIFunc<'_>> {
        Chain::new(self.first_ifunc(), GlobalIFunc::next_ifunc)
    }

    // Named metadata

    pub fn named_metadata(&self, name: &str) -> Option<NamedMdNode<'_>> {
        unsafe {
            NamedMdNode::from_raw_opt(LLVMGetNamedMetadata(
                self.as_raw(),
                name.as_ptr() as *const c_char,
                name.len(),
            ))
        }
    }

    pub fn get_or_insert_named_metadata(&self, name: &str) -> LlvmResult<NamedMdNode<'_>> {
        unsafe {
            NamedMdNode::from_raw_opt(LLVMGetOrInsertNamedMetadata(
                self.as_raw(),
                name.as_ptr() as *const c_char,
                name.len(),
            ))
        }
        .ok_or(LlvmError::NullHandle { what: "named metadata" })
    }

    pub fn first_named_metadata(&self) -> Option<NamedMdNode<'_>> {
        unsafe { NamedMdNode::from_raw_opt(LLVMGetFirstNamedMetadata(self.as_raw())) }
    }

    pub fn last_named_metadata(&self) -> Option<NamedMdNode<'_>> {
        unsafe { NamedMdNode::from_raw_opt(LLVMGetLastNamedMetadata(self.as_raw())) }
    }

    pub fn named_metadata_nodes(&self) -> Chain<NamedMdNode<'_>> {
        Chain::new(self.first_named_metadata(), NamedMdNode::next)
    }

    /// Operands of `!name`, as metadata values. Empty when the node does not exist.
    pub fn named_metadata_operands(&self, name: &str) -> LlvmResult<Vec<Value<'_>>> {
        let c_name = to_cstring(name)?;
        let count = unsafe { LLVMGetNamedMetadataNumOperands(self.as_raw(), c_name.as_ptr()) };
        let mut raw: Vec<LLVMValueRef> = vec![std::ptr::null_mut(); count as usize];
        if count > 0 {
            unsafe { LLVMGetNamedMetadataOperands(self.as_raw(), c_name.as_ptr(), raw.as_mut_ptr()) };
        }
        Ok(raw.into_iter().filter_map(|v| unsafe { Value::from_raw_opt(v) }).collect())
    }

    /// Append a metadata node to `!name`, creating the list if needed.
    /// Fails only when `name` contains a NUL byte; the C API takes a C string here.
    pub fn add_named_metadata_operand(&self, name: &str, node: Value<'_>) -> LlvmResult<()> {
        let c_name = to_cstring(name)?;
        unsafe { LLVMAddNamedMetadataOperand(self.as_raw(), c_name.as_ptr(), node.as_raw()) };
        Ok(())
    }

    // Module flags

    pub fn module_flags(&self) -> ModuleFlagEntries {
        let mut len = 0;
        let raw = unsafe { LLVMCopyModuleFlagsMetadata(self.as_raw(), &mut len) };
        unsafe { ModuleFlagEntries::from_raw(raw, len) }
    }

    pub fn module_flag(&self, key: &str) -> Option<Metadata<'_>> {
        let raw = unsafe { LLVMGetModuleFlag(self.as_raw(), key.as_ptr() as *const c_char, key.len()) };
        unsafe { Metadata::from_raw_opt(raw) }
    }

    pub fn add_module_flag(&self, behavior: ModuleFlagBehavior, key: &str, value: Metadata<'_>) {
        unsafe {
            LLVMAddModuleFlag(
                self.as_raw(),
                behavior.into(),
                key.as_ptr() as *const c_char,
                key.len(),
                value.as_raw(),
            )
        }
    }

    // Types

    pub fn get_type_by_name(&self, name: &str) -> LlvmResult<Option<Type<'_>>> {
        let c_name = to_cstring(name)?;
        Ok(unsafe { Type::from_raw_opt(LLVMGetTypeByName(self.as_raw(), c_name.as_ptr())) })
    }

    // Printing, cloning, verification and serialization

    pub fn print_to_string(&self) -> String {
        unsafe { LlvmString::from_raw(LLVMPrintModuleToString(self.as_raw())) }
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn print_to_file(&self, path: impl AsRef<Path>) -> LlvmResult<()> {
        let display = path.as_ref().display().to_string();
        let c_path = to_cstring(&display)?;
        let mut message = std::ptr::null_mut();
        let failed = unsafe { LLVMPrintModuleToFile(self.as_raw(), c_path.as_ptr(), &mut message) };
        let message = unsafe { take_message(message) };
        if from_llvm_bool(failed) {
            return Err(LlvmError::Io {
                path: display,
                message,
            });
        }
        Ok(())
    }

    /// Print the module to stderr.
    pub fn dump(&self) {
        unsafe { LLVMDumpModule(self.as_raw()) }
    }

    /// Deep copy in the same context.
    pub fn clone_module(&self) -> LlvmResult<Module> {
        self.context.check_can_own()?;
        let raw = unsafe { LLVMCloneModule(self.as_raw()) };
        unsafe { Module::from_raw(raw, self.context.clone()) }
    }

    /// Run the IR verifier; the message lists every problem found.
    pub fn verify(&self) -> LlvmResult<()> {
        crate::analysis::verify_module(self)
    }

    pub fn write_bitcode_to_file(&self, path: impl AsRef<Path>) -> LlvmResult<()> {
        crate::bitcode::write_bitcode_to_file(self, path.as_ref())
    }

    pub fn write_bitcode_to_memory_buffer(&self) -> LlvmResult<MemoryBuffer> {
        crate::bitcode::write_bitcode_to_memory_buffer(self)
    }

    /// Declaration of `intrinsic`, overloaded on `param_types`.
    pub fn intrinsic_declaration<'m>(
        &'m self,
        intrinsic: Intrinsic,
        param_types: &[Type<'m>],
    ) -> LlvmResult<FunctionValue<'m>> {
        intrinsic.declaration(self, param_types)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_to_string())
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("identifier", &self.identifier())
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
    fn test_identification() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("ident").unwrap();
        assert_eq!(module.identifier(), "ident");
        module.set_identifier("renamed");
        assert_eq!(module.identifier(), "renamed");
        module.set_source_file_name("input.c");
        assert_eq!(module.source_file_name(), "input.c");
        module.set_target_triple("x86_64-unknown-linux-gnu").unwrap();
        assert_eq!(module.target_triple(), "x86_64-unknown-linux-gnu");
        module.set_data_layout("e-m:e-i64:64-n8:16:32:64-S128").unwrap();
        assert_eq!(module.data_layout(), "e-m:e-i64:64-n8:16:32:64-S128");
        module.set_inline_asm(".globl marker");
        module.append_inline_asm("marker:");
        assert_eq!(module.inline_asm(), ".globl marker\nmarker:\n");
        assert_eq!(module.context(), &ctx);
    }

    #[test]
    fn test_global_lists() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("lists").unwrap();
        let fn_ty = ctx.void_type().fn_type(&[], false);
        let first = module.add_function("first", fn_ty).unwrap();
        let second = module.add_function("second", fn_ty).unwrap();
        assert_eq!(module.first_function(), Some(first));
        assert_eq!(module.last_function(), Some(second));
        assert_eq!(module.functions().count(), 2);
        assert_eq!(module.get_function("second").unwrap(), Some(second));
        assert_eq!(module.get_function("third").unwrap(), None);

        let global = module.add_global(ctx.i32_type().as_type(), "g").unwrap();
        let tls = module
            .add_global_in_address_space(ctx.i32_type().as_type(), "g3", 3)
            .unwrap();
        assert_eq!(module.globals().collect::<Vec<_>>(), vec![global, tls]);
        assert_eq!(module.get_global("g3").unwrap(), Some(tls));

        let alias = module
            .add_alias(ctx.i32_type().as_type(), 0, global.into(), "g.alias")
            .unwrap();
        assert_eq!(module.get_alias("g.alias"), Some(alias));
        assert_eq!(alias.aliasee(), Constant::from(global));
        assert_eq!(module.aliases().count(), 1);

        let resolver_ty = ctx.ptr_type(0).as_type().fn_type(&[], false);
        let resolver = module.add_function("resolve", resolver_ty).unwrap();
        let ifunc = module.add_ifunc("picked", fn_ty, 0, resolver).unwrap();
        assert_eq!(module.get_ifunc("picked"), Some(ifunc));
        assert_eq!(module.first_ifunc(), module.last_ifunc());
    }

    #[test]
    fn test_named_metadata() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("named").unwrap();
        assert!(module.named_metadata("llvm.ident").is_none());
        assert!(module.named_metadata_operands("llvm.ident").unwrap().is_empty());

        let node = ctx.md_node(&[ctx.md_string("llvm-capi")]);
        module
            .add_named_metadata_operand("llvm.ident", node.as_value(&ctx).into())
            .unwrap();
        let named = module.named_metadata("llvm.ident").unwrap();
        assert_eq!(named.name(), "llvm.ident");
        assert_eq!(module.named_metadata_operands("llvm.ident").unwrap().len(), 1);
        assert_eq!(module.get_or_insert_named_metadata("llvm.ident").unwrap(), named);
        assert_eq!(module.named_metadata_nodes().count(), 1);
        assert_eq!(
            module.add_named_metadata_operand("bad\0name", node.as_value(&ctx).into()),
            Err(LlvmError::InteriorNul { position: 3 })
        );
    }

    #[test]
    fn test_clone_and_lookup() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("orig").unwrap();
        module.add_function("f", ctx.void_type().fn_type(&[], false)).unwrap();
        let copy = module.clone_module().unwrap();
        assert_ne!(copy, module);
        assert_eq!(copy.to_string(), module.to_string());

        let raw = module.as_raw();
        assert_eq!(Module::lookup(raw), Some(module.clone()));
        assert!(ModuleKind::registry().contains(raw));
        drop(module);
        assert!(!ModuleKind::registry().contains(raw));
    }

    #[test]
    fn test_module_keeps_context_alive() {
        init();
        let module = {
            let ctx = Context::create().unwrap();
            ctx.create_module("orphan").unwrap()
        };
        let ty = module.context().i32_type();
        assert_eq!(ty.width(), 32);
        assert_eq!(module.get_type_by_name("missing").unwrap(), None);
    }
}
