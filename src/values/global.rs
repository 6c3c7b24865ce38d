// Global value views. GlobalValue holds what every global shares (parent module, linkage,
// section, visibility, DLL storage, unnamed_addr, value type, alignment, attached metadata).
// GlobalVariable, GlobalAlias, GlobalIFunc and FunctionValue add their own state and convert to
// GlobalValue and Constant with From. Deleting a global invalidates every copy of its view,
// so the deleting methods are unsafe.

//! Global variables, aliases, ifuncs and functions.

use crate::attributes::{Attribute, AttributeIndex};
use crate::basic_block::BasicBlock;
use crate::enums::{CallConv, DllStorageClass, Linkage, ThreadLocalMode, UnnamedAddr, Visibility};
use crate::error::{LlvmError, LlvmResult};
use crate::handle::Borrowed;
use crate::iter::Chain;
use crate::module::Module;
use crate::support::{from_llvm_bool, llvm_bool, string_from_ptr, to_cstring};
use crate::types::{FunctionType, Type};
use crate::values::{Argument, Constant, Metadata, MetadataEntries};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMAttributeRef, LLVMValueRef};
use std::ffi::c_char;

value_view!(
    /// A function, variable, alias or ifunc.
    GlobalValue, "GlobalValue", |raw| !LLVMIsAGlobalValue(raw).is_null()
);

value_view!(GlobalVariable, "GlobalVariable", |raw| !LLVMIsAGlobalVariable(raw).is_null());

value_view!(GlobalAlias, "GlobalAlias", |raw| !LLVMIsAGlobalAlias(raw).is_null());

value_view!(GlobalIFunc, "GlobalIFunc", |raw| !LLVMIsAGlobalIFunc(raw).is_null());

value_view!(
    /// A function declaration or definition.
    FunctionValue, "Function", |raw| !LLVMIsAFunction(raw).is_null()
);

upcast!(GlobalValue => Constant);
upcast!(GlobalVariable => GlobalValue, Constant);
upcast!(GlobalAlias => GlobalValue, Constant);
upcast!(GlobalIFunc => GlobalValue, Constant);
upcast!(FunctionValue => GlobalValue, Constant);

fn next_view<T>(raw: LLVMValueRef, make: unsafe fn(LLVMValueRef) -> T) -> Option<T> {
    (!raw.is_null()).then(|| unsafe { make(raw) })
}

impl<'ctx> GlobalValue<'ctx> {
    /// Module containing the global, valid for as long as the global's view.
    pub fn parent(self) -> Borrowed<'ctx, Module> {
        Borrowed::new(unsafe { Module::from_raw_borrowed(LLVMGetGlobalParent(self.as_raw())) })
    }

    pub fn is_declaration(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsDeclaration(self.as_raw()) })
    }

    pub fn linkage(self) -> Linkage {
        Linkage::from(unsafe { LLVMGetLinkage(self.as_raw()) })
    }

    pub fn set_linkage(self, linkage: Linkage) {
        unsafe { LLVMSetLinkage(self.as_raw(), linkage.into()) }
    }

    pub fn section(self) -> Option<String> {
        let ptr = unsafe { LLVMGetSection(self.as_raw()) };
        (!ptr.is_null()).then(|| unsafe { string_from_ptr(ptr) })
    }

    pub fn set_section(self, section: &str) -> LlvmResult<()> {
        let section = to_cstring(section)?;
        unsafe { LLVMSetSection(self.as_raw(), section.as_ptr()) };
        Ok(())
    }

    pub fn visibility(self) -> Visibility {
        Visibility::from(unsafe { LLVMGetVisibility(self.as_raw()) })
    }

    pub fn set_visibility(self, visibility: Visibility) {
        unsafe { LLVMSetVisibility(self.as_raw(), visibility.into()) }
    }

    pub fn dll_storage_class(self) -> DllStorageClass {
        DllStorageClass::from(unsafe { LLVMGetDLLStorageClass(self.as_raw()) })
    }

    pub fn set_dll_storage_class(self, class: DllStorageClass) {
        unsafe { LLVMSetDLLStorageClass(self.as_raw(), class.into()) }
    }

    pub fn unnamed_addr(self) -> UnnamedAddr {
        UnnamedAddr::from(unsafe { LLVMGetUnnamedAddress(self.as_raw()) })
    }

    pub fn set_unnamed_addr(self, unnamed: UnnamedAddr) {
        unsafe { LLVMSetUnnamedAddress(self.as_raw(), unnamed.into()) }
    }

    /// Type of the global's contents (the function type for functions).
    pub fn value_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGlobalGetValueType(self.as_raw())) }
    }

    pub fn alignment(self) -> u32 {
        unsafe { LLVMGetAlignment(self.as_raw()) }
    }

    pub fn set_alignment(self, bytes: u32) {
        unsafe { LLVMSetAlignment(self.as_raw(), bytes) }
    }

    /// Copy of every metadata attachment.
    pub fn copy_all_metadata(self) -> LlvmResult<MetadataEntries> {
        let mut count = 0;
        let raw = unsafe { LLVMGlobalCopyAllMetadata(self.as_raw(), &mut count) };
        unsafe { MetadataEntries::from_raw(raw, count) }
    }

    pub fn set_metadata(self, kind_id: u32, md: Metadata<'ctx>) {
        unsafe { LLVMGlobalSetMetadata(self.as_raw(), kind_id, md.as_raw()) }
    }

    pub fn erase_metadata(self, kind_id: u32) {
        unsafe { LLVMGlobalEraseMetadata(self.as_raw(), kind_id) }
    }

    pub fn clear_metadata(self) {
        unsafe { LLVMGlobalClearMetadata(self.as_raw()) }
    }
}

impl<'ctx> GlobalVariable<'ctx> {
    pub fn as_global_value(self) -> GlobalValue<'ctx> {
        self.into()
    }

    pub fn initializer(self) -> Option<Constant<'ctx>> {
        next_view(unsafe { LLVMGetInitializer(self.as_raw()) }, Constant::from_raw_unchecked)
    }

    pub fn set_initializer(self, value: Constant<'ctx>) {
        unsafe { LLVMSetInitializer(self.as_raw(), value.as_raw()) }
    }

    pub fn is_thread_local(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsThreadLocal(self.as_raw()) })
    }

    pub fn set_thread_local(self, thread_local: bool) {
        unsafe { LLVMSetThreadLocal(self.as_raw(), llvm_bool(thread_local)) }
    }

    pub fn thread_local_mode(self) -> ThreadLocalMode {
        ThreadLocalMode::from(unsafe { LLVMGetThreadLocalMode(self.as_raw()) })
    }

    pub fn set_thread_local_mode(self, mode: ThreadLocalMode) {
        unsafe { LLVMSetThreadLocalMode(self.as_raw(), mode.into()) }
    }

    pub fn is_constant(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsGlobalConstant(self.as_raw()) })
    }

    pub fn set_constant(self, constant: bool) {
        unsafe { LLVMSetGlobalConstant(self.as_raw(), llvm_bool(constant)) }
    }

    pub fn is_externally_initialized(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsExternallyInitialized(self.as_raw()) })
    }

    pub fn set_externally_initialized(self, externally: bool) {
        unsafe { LLVMSetExternallyInitialized(self.as_raw(), llvm_bool(externally)) }
    }

    pub fn next_global(self) -> Option<GlobalVariable<'ctx>> {
        next_view(unsafe { LLVMGetNextGlobal(self.as_raw()) }, GlobalVariable::from_raw_unchecked)
    }

    pub fn previous_global(self) -> Option<GlobalVariable<'ctx>> {
        next_view(unsafe { LLVMGetPreviousGlobal(self.as_raw()) }, GlobalVariable::from_raw_unchecked)
    }

    /// Remove the variable from its module and free it.
    ///
    /// # Safety
    /// No copy of this view, and no use of the variable, may remain.
    pub unsafe fn delete(self) {
        LLVMDeleteGlobal(self.as_raw())
    }
}

impl<'ctx> GlobalAlias<'ctx> {
    pub fn as_global_value(self) -> GlobalValue<'ctx> {
        self.into()
    }

    pub fn aliasee(self) -> Constant<'ctx> {
        unsafe { Constant::from_raw_unchecked(LLVMAliasGetAliasee(self.as_raw())) }
    }

    pub fn set_aliasee(self, aliasee: Constant<'ctx>) {
        unsafe { LLVMAliasSetAliasee(self.as_raw(), aliasee.as_raw()) }
    }

    pub fn next_alias(self) -> Option<GlobalAlias<'ctx>> {
        next_view(unsafe { LLVMGetNextGlobalAlias(self.as_raw()) }, GlobalAlias::from_raw_unchecked)
    }

    pub fn previous_alias(self) -> Option<GlobalAlias<'ctx>> {
        next_view(unsafe { LLVMGetPreviousGlobalAlias(self.as_raw()) }, GlobalAlias::from_raw_unchecked)
    }
}

impl<'ctx> GlobalIFunc<'ctx> {
    pub fn as_global_value(self) -> GlobalValue<'ctx> {
        self.into()
    }

    pub fn resolver(self) -> Option<Constant<'ctx>> {
        next_view(unsafe { LLVMGetGlobalIFuncResolver(self.as_raw()) }, Constant::from_raw_unchecked)
    }

    pub fn set_resolver(self, resolver: Constant<'ctx>) {
        unsafe { LLVMSetGlobalIFuncResolver(self.as_raw(), resolver.as_raw()) }
    }

    pub fn next_ifunc(self) -> Option<GlobalIFunc<'ctx>> {
        next_view(unsafe { LLVMGetNextGlobalIFunc(self.as_raw()) }, GlobalIFunc::from_raw_unchecked)
    }

    pub fn previous_ifunc(self) -> Option<GlobalIFunc<'ctx>> {
        next_view(unsafe { LLVMGetPreviousGlobalIFunc(self.as_raw()) }, GlobalIFunc::from_raw_unchecked)
    }

    /// Unlink the ifunc from its module without freeing it.
    pub fn remove_from_parent(self) {
        unsafe { LLVMRemoveGlobalIFunc(self.as_raw()) }
    }

    /// Unlink the ifunc and free it.
    ///
    /// # Safety
    /// No copy of this view may be used afterwards.
    pub unsafe fn erase(self) {
        LLVMEraseGlobalIFunc(self.as_raw())
    }
}

impl<'ctx> FunctionValue<'ctx> {
    pub fn as_global_value(self) -> GlobalValue<'ctx> {
        self.into()
    }

    pub fn function_type(self) -> FunctionType<'ctx> {
        unsafe { FunctionType::from_raw_unchecked(LLVMGlobalGetValueType(self.as_raw())) }
    }

    pub fn count_params(self) -> u32 {
        unsafe { LLVMCountParams(self.as_raw()) }
    }

    pub fn param(self, index: u32) -> Option<Argument<'ctx>> {
        if index >= self.count_params() {
            return None;
        }
        Some(unsafe { Argument::from_raw_unchecked(LLVMGetParam(self.as_raw(), index)) })
    }

    pub fn params(self) -> Chain<Argument<'ctx>> {
        let first = next_view(unsafe { LLVMGetFirstParam(self.as_raw()) }, Argument::from_raw_unchecked);
        Chain::new(first, Argument::next_param)
    }

    pub fn last_param(self) -> Option<Argument<'ctx>> {
        next_view(unsafe { LLVMGetLastParam(self.as_raw()) }, Argument::from_raw_unchecked)
    }

    pub fn count_basic_blocks(self) -> u32 {
        unsafe { LLVMCountBasicBlocks(self.as_raw()) }
    }

    pub fn basic_blocks(self) -> Chain<BasicBlock<'ctx>> {
        Chain::new(self.first_basic_block(), BasicBlock::next)
    }

    pub fn entry_block(self) -> Option<BasicBlock<'ctx>> {
        if self.count_basic_blocks() == 0 {
            return None;
        }
        unsafe { BasicBlock::from_raw_opt(LLVMGetEntryBasicBlock(self.as_raw())) }
    }

    pub fn first_basic_block(self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetFirstBasicBlock(self.as_raw())) }
    }

    pub fn last_basic_block(self) -> Option<BasicBlock<'ctx>> {
        unsafe { BasicBlock::from_raw_opt(LLVMGetLastBasicBlock(self.as_raw())) }
    }

    /// Append a block that is not yet in any function.
    pub fn append_existing_basic_block(self, block: BasicBlock<'ctx>) -> LlvmResult<()> {
        if block.parent().is_some() {
            return Err(LlvmError::Message {
                operation: "append_existing_basic_block",
                message: format!("block `{}` already has a parent", block.name()),
            });
        }
        unsafe { LLVMAppendExistingBasicBlock(self.as_raw(), block.as_raw()) };
        Ok(())
    }

    /// Raw calling convention number.
    pub fn call_conv_raw(self) -> u32 {
        unsafe { LLVMGetFunctionCallConv(self.as_raw()) }
    }

    /// Calling convention, `None` when LLVM reports one this crate does not name.
    pub fn call_conv(self) -> Option<CallConv> {
        CallConv::from_u32(self.call_conv_raw())
    }

    pub fn set_call_conv(self, cc: CallConv) {
        unsafe { LLVMSetFunctionCallConv(self.as_raw(), cc as u32) }
    }

    pub fn gc(self) -> Option<String> {
        let ptr = unsafe { LLVMGetGC(self.as_raw()) };
        (!ptr.is_null()).then(|| unsafe { string_from_ptr(ptr) })
    }

    /// Set (or with `None` clear) the garbage collector name.
    pub fn set_gc(self, gc: Option<&str>) -> LlvmResult<()> {
        match gc {
            Some(name) => {
                let name = to_cstring(name)?;
                unsafe { LLVMSetGC(self.as_raw(), name.as_ptr()) };
            }
            None => unsafe { LLVMSetGC(self.as_raw(), std::ptr::null()) },
        }
        Ok(())
    }

    pub fn personality_function(self) -> Option<FunctionValue<'ctx>> {
        if !from_llvm_bool(unsafe { LLVMHasPersonalityFn(self.as_raw()) }) {
            return None;
        }
        next_view(unsafe { LLVMGetPersonalityFn(self.as_raw()) }, FunctionValue::from_raw_unchecked)
    }

    pub fn set_personality_function(self, personality: FunctionValue<'ctx>) {
        unsafe { LLVMSetPersonalityFn(self.as_raw(), personality.as_raw()) }
    }

    /// Intrinsic id, 0 for ordinary functions.
    pub fn intrinsic_id(self) -> u32 {
        unsafe { LLVMGetIntrinsicID(self.as_raw()) }
    }

    pub fn attribute_count(self, index: AttributeIndex) -> u32 {
        unsafe { LLVMGetAttributeCountAtIndex(self.as_raw(), index.as_raw()) }
    }

    pub fn attributes(self, index: AttributeIndex) -> Vec<Attribute<'ctx>> {
        let count = self.attribute_count(index) as usize;
        let mut raw: Vec<LLVMAttributeRef> = vec![std::ptr::null_mut(); count];
        unsafe { LLVMGetAttributesAtIndex(self.as_raw(), index.as_raw(), raw.as_mut_ptr()) };
        raw.into_iter().map(|a| unsafe { Attribute::from_raw(a) }).collect()
    }

    pub fn enum_attribute(self, index: AttributeIndex, kind_id: u32) -> Option<Attribute<'ctx>> {
        unsafe { Attribute::from_raw_opt(LLVMGetEnumAttributeAtIndex(self.as_raw(), index.as_raw(), kind_id)) }
    }

    pub fn string_attribute(self, index: AttributeIndex, key: &str) -> Option<Attribute<'ctx>> {
        unsafe {
            Attribute::from_raw_opt(LLVMGetStringAttributeAtIndex(
                self.as_raw(),
                index.as_raw(),
                key.as_ptr() as *const c_char,
                key.len() as u32,
            ))
        }
    }

    pub fn add_attribute(self, index: AttributeIndex, attribute: Attribute<'ctx>) {
        unsafe { LLVMAddAttributeAtIndex(self.as_raw(), index.as_raw(), attribute.as_raw()) }
    }

    pub fn remove_enum_attribute(self, index: AttributeIndex, kind_id: u32) {
        unsafe { LLVMRemoveEnumAttributeAtIndex(self.as_raw(), index.as_raw(), kind_id) }
    }

    pub fn remove_string_attribute(self, index: AttributeIndex, key: &str) {
        unsafe {
            LLVMRemoveStringAttributeAtIndex(
                self.as_raw(),
                index.as_raw(),
                key.as_ptr() as *const c_char,
                key.len() as u32,
            )
        }
    }

    /// Add a `key="value"` function attribute.
    pub fn add_target_dependent_attribute(self, key: &str, value: &str) -> LlvmResult<()> {
        let key = to_cstring(key)?;
        let value = to_cstring(value)?;
        unsafe { LLVMAddTargetDependentFunctionAttr(self.as_raw(), key.as_ptr(), value.as_ptr()) };
        Ok(())
    }

    pub fn next_function(self) -> Option<FunctionValue<'ctx>> {
        next_view(unsafe { LLVMGetNextFunction(self.as_raw()) }, FunctionValue::from_raw_unchecked)
    }

    pub fn previous_function(self) -> Option<FunctionValue<'ctx>> {
        next_view(unsafe { LLVMGetPreviousFunction(self.as_raw()) }, FunctionValue::from_raw_unchecked)
    }

    /// Check the function body, returning whether it is well formed.
    pub fn verify(self, action: crate::enums::VerifierFailureAction) -> bool {
        crate::analysis::verify_function(self, action)
    }

    /// Open the control flow graph in a viewer (debug builds of LLVM only).
    pub fn view_cfg(self) {
        crate::analysis::view_function_cfg(self)
    }

    pub fn view_cfg_only(self) {
        crate::analysis::view_function_cfg_only(self)
    }

    /// Remove the function from its module and free it.
    ///
    /// # Safety
    /// No copy of this view, and no use of the function, may remain.
    pub unsafe fn delete(self) {
        LLVMDeleteFunction(self.as_raw())
    }
}
