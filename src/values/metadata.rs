// Metadata in the C API comes in three shapes. Metadata is the raw LLVMMetadataRef view
// (strings, nodes, wrapped values), MetadataValue is metadata wrapped as a value so it can be an
// instruction operand or a named-metadata operand, and NamedMdNode is a module-level
// `!name = !{...}` list. MetadataClass dispatches a MetadataValue into MDNode, MDString or the
// generic wrapper. MetadataEntries is the owned array returned by the copy-all-metadata
// functions of globals and instructions; it goes through the ownership cache and is freed once
// with LLVMDisposeValueMetadataEntries.

//! Metadata views and metadata entry arrays.

use crate::context::Context;
use crate::error::LlvmResult;
use crate::handle::{owned_kind, Shared};
use crate::support::string_from_parts;
use crate::values::Value;
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMMetadataRef, LLVMNamedMDNodeRef, LLVMValueRef};
use llvm_sys::prelude::LLVMValueMetadataEntry;
use std::fmt;
use std::marker::PhantomData;

/// A metadata node, string or wrapped value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Metadata<'ctx> {
    raw: LLVMMetadataRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> Metadata<'ctx> {
    /// # Safety
    /// `raw` must be live, non-null metadata.
    pub unsafe fn from_raw(raw: LLVMMetadataRef) -> Self {
        debug_assert!(!raw.is_null());
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `raw` must be null or live metadata.
    pub unsafe fn from_raw_opt(raw: LLVMMetadataRef) -> Option<Self> {
        (!raw.is_null()).then(|| Self::from_raw(raw))
    }

    pub fn as_raw(self) -> LLVMMetadataRef {
        self.raw
    }

    /// Wrap as a value in `context`.
    pub fn as_value(self, context: &'ctx Context) -> MetadataValue<'ctx> {
        context.metadata_as_value(self)
    }
}

impl fmt::Debug for Metadata<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metadata({:p})", self.raw)
    }
}

value_view!(
    /// Metadata wrapped as a value.
    MetadataValue,
    "MetadataAsValue",
    |raw| LLVMGetValueKind(raw) == crate::enums::ValueKind::LLVMMetadataAsValueValueKind
);

/// What a [`MetadataValue`] wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataClass {
    MdNode,
    MdString,
    Generic,
}

impl MetadataClass {
    pub fn class_name(self) -> &'static str {
        match self {
            MetadataClass::MdNode => "MDNodeValue",
            MetadataClass::MdString => "MDStringValue",
            MetadataClass::Generic => "MetadataAsValue",
        }
    }
}

impl<'ctx> MetadataValue<'ctx> {
    pub fn class(self) -> MetadataClass {
        if !unsafe { LLVMIsAMDNode(self.as_raw()) }.is_null() {
            MetadataClass::MdNode
        } else if !unsafe { LLVMIsAMDString(self.as_raw()) }.is_null() {
            MetadataClass::MdString
        } else {
            MetadataClass::Generic
        }
    }

    /// The wrapped metadata.
    pub fn metadata(self) -> Metadata<'ctx> {
        self.as_value().as_metadata()
    }

    /// Text of a wrapped `MDString`.
    pub fn string(self) -> Option<String> {
        if self.class() != MetadataClass::MdString {
            return None;
        }
        let mut len = 0;
        let ptr = unsafe { LLVMGetMDString(self.as_raw(), &mut len) };
        Some(unsafe { string_from_parts(ptr, len as usize) })
    }

    /// Operands of a wrapped `MDNode`; null operands are `None`.
    pub fn node_operands(self) -> Option<Vec<Option<Value<'ctx>>>> {
        if self.class() != MetadataClass::MdNode {
            return None;
        }
        let count = unsafe { LLVMGetMDNodeNumOperands(self.as_raw()) } as usize;
        let mut raw: Vec<LLVMValueRef> = vec![std::ptr::null_mut(); count];
        unsafe { LLVMGetMDNodeOperands(self.as_raw(), raw.as_mut_ptr()) };
        Some(raw.into_iter().map(|v| unsafe { Value::from_raw_opt(v) }).collect())
    }
}

/// A module-level named metadata list.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamedMdNode<'ctx> {
    raw: LLVMNamedMDNodeRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> NamedMdNode<'ctx> {
    /// # Safety
    /// `raw` must be null or a live named metadata node.
    pub unsafe fn from_raw_opt(raw: LLVMNamedMDNodeRef) -> Option<Self> {
        (!raw.is_null()).then_some(Self {
            raw,
            _marker: PhantomData,
        })
    }

    pub fn as_raw(self) -> LLVMNamedMDNodeRef {
        self.raw
    }

    pub fn name(self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetNamedMetadataName(self.raw, &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn next(self) -> Option<NamedMdNode<'ctx>> {
        unsafe { NamedMdNode::from_raw_opt(LLVMGetNextNamedMetadata(self.raw)) }
    }

    pub fn previous(self) -> Option<NamedMdNode<'ctx>> {
        unsafe { NamedMdNode::from_raw_opt(LLVMGetPreviousNamedMetadata(self.raw)) }
    }
}

impl fmt::Debug for NamedMdNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NamedMdNode(!{})", self.name())
    }
}

owned_kind!(
    pub(crate) MetadataEntriesKind,
    LLVMValueMetadataEntry,
    LLVMDisposeValueMetadataEntries,
    "metadata entries"
);

/// Owned copy of the metadata attached to a global or instruction.
#[derive(Clone)]
pub struct MetadataEntries {
    handle: Option<Shared<MetadataEntriesKind>>,
    len: usize,
}

impl MetadataEntries {
    /// # Safety
    /// `raw` must be null or an entry array of `len` entries owned by the caller.
    pub(crate) unsafe fn from_raw(raw: *mut LLVMValueMetadataEntry, len: usize) -> LlvmResult<Self> {
        Ok(Self {
            handle: Shared::wrap(raw),
            len,
        })
    }

    pub fn len(&self) -> usize {
        if self.handle.is_some() {
            self.len
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn raw_at(&self, index: usize) -> Option<*mut LLVMValueMetadataEntry> {
        if index >= self.len() {
            return None;
        }
        self.handle.as_ref().map(|h| h.as_raw())
    }

    /// Metadata kind id of entry `index`.
    pub fn kind(&self, index: usize) -> Option<u32> {
        self.raw_at(index)
            .map(|raw| unsafe { LLVMValueMetadataEntriesGetKind(raw, index as u32) })
    }

    pub fn metadata(&self, index: usize) -> Option<Metadata<'_>> {
        self.raw_at(index).map(|raw| unsafe {
            Metadata::from_raw(LLVMValueMetadataEntriesGetMetadata(raw, index as u32))
        })
    }

    /// All `(kind, metadata)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Metadata<'_>)> + '_ {
        (0..self.len()).filter_map(move |i| Some((self.kind(i)?, self.metadata(i)?)))
    }
}

impl fmt::Debug for MetadataEntries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(kind, _)| kind)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_metadata_value_classes() {
        init();
        let ctx = Context::create().unwrap();
        let text = ctx.md_string("payload");
        let node = ctx.md_node(&[text]);

        let text_value = text.as_value(&ctx);
        assert_eq!(text_value.class(), MetadataClass::MdString);
        assert_eq!(text_value.string().as_deref(), Some("payload"));
        assert!(text_value.node_operands().is_none());

        let node_value = node.as_value(&ctx);
        assert_eq!(node_value.class(), MetadataClass::MdNode);
        let operands = node_value.node_operands().unwrap();
        assert_eq!(operands.len(), 1);
        assert_eq!(node_value.metadata(), node);
    }

    #[test]
    fn test_wrapped_constant_round_trips() {
        init();
        let ctx = Context::create().unwrap();
        let md = ctx.i32_type().const_int(1, false).as_metadata();
        let value = md.as_value(&ctx);
        assert_ne!(value.class(), MetadataClass::MdString);
        assert_eq!(value.metadata(), md);
        assert!(value.classify().is_metadata());
    }

    #[test]
    fn test_empty_entries() {
        init();
        let entries = unsafe { MetadataEntries::from_raw(std::ptr::null_mut(), 3) }.unwrap();
        assert!(entries.is_empty());
        assert_eq!(entries.kind(0), None);
        assert_eq!(entries.iter().count(), 0);
    }
}
