// Attribute wraps LLVMAttributeRef. LLVM attributes come in three flavours that share one
// opaque ref: enum attributes (kind id plus an integer payload, `align 8`), string attributes
// (`"frame-pointer"="all"`) and type attributes (`sret(%T)`). AnyAttribute dispatches on the
// flavour in that order. AttributeIndex names the slot an attribute is attached to on a
// function or call site, matching LLVMAttributeIndex's encoding (0 for the return value, ~0
// for the function, n + 1 for parameter n).

//! Function and call-site attributes.

use crate::support::string_from_parts;
use crate::types::Type;
use llvm_sys::core::*;
use llvm_sys::prelude::LLVMAttributeRef;
use llvm_sys::{LLVMAttributeFunctionIndex, LLVMAttributeReturnIndex};
use std::ffi::c_char;
use std::fmt;
use std::marker::PhantomData;

/// Where an attribute is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeIndex {
    Return,
    Function,
    /// Zero-based parameter number.
    Param(u32),
}

impl AttributeIndex {
    pub fn as_raw(self) -> u32 {
        match self {
            AttributeIndex::Return => LLVMAttributeReturnIndex,
            AttributeIndex::Function => LLVMAttributeFunctionIndex,
            AttributeIndex::Param(n) => n + 1,
        }
    }

    pub fn from_raw(raw: u32) -> Self {
        match raw {
            LLVMAttributeReturnIndex => AttributeIndex::Return,
            LLVMAttributeFunctionIndex => AttributeIndex::Function,
            n => AttributeIndex::Param(n - 1),
        }
    }
}

/// Kind id of the enum attribute called `name`; 0 when LLVM has no such attribute.
pub fn enum_attribute_kind(name: &str) -> u32 {
    unsafe { LLVMGetEnumAttributeKindForName(name.as_ptr() as *const c_char, name.len()) }
}

/// Largest enum attribute kind id known to this LLVM.
pub fn last_enum_attribute_kind() -> u32 {
    unsafe { LLVMGetLastEnumAttributeKind() }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attribute<'ctx> {
    raw: LLVMAttributeRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> Attribute<'ctx> {
    /// # Safety
    /// `raw` must be a live, non-null attribute.
    pub unsafe fn from_raw(raw: LLVMAttributeRef) -> Self {
        debug_assert!(!raw.is_null());
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `raw` must be null or a live attribute.
    pub unsafe fn from_raw_opt(raw: LLVMAttributeRef) -> Option<Self> {
        (!raw.is_null()).then(|| Self::from_raw(raw))
    }

    pub fn as_raw(self) -> LLVMAttributeRef {
        self.raw
    }

    pub fn classify(self) -> AnyAttribute<'ctx> {
        AnyAttribute::from(self)
    }

    pub fn is_enum(self) -> bool {
        unsafe { LLVMIsEnumAttribute(self.raw) != 0 }
    }

    pub fn is_string(self) -> bool {
        unsafe { LLVMIsStringAttribute(self.raw) != 0 }
    }

    pub fn is_type(self) -> bool {
        unsafe { LLVMIsTypeAttribute(self.raw) != 0 }
    }

    /// Kind id of an enum or type attribute.
    pub fn kind_id(self) -> Option<u32> {
        (self.is_enum() || self.is_type()).then(|| unsafe { LLVMGetEnumAttributeKind(self.raw) })
    }

    /// Integer payload of an enum attribute.
    pub fn value(self) -> Option<u64> {
        self.is_enum().then(|| unsafe { LLVMGetEnumAttributeValue(self.raw) })
    }

    pub fn string_kind(self) -> Option<String> {
        if !self.is_string() {
            return None;
        }
        let mut len = 0;
        let ptr = unsafe { LLVMGetStringAttributeKind(self.raw, &mut len) };
        Some(unsafe { string_from_parts(ptr, len as usize) })
    }

    pub fn string_value(self) -> Option<String> {
        if !self.is_string() {
            return None;
        }
        let mut len = 0;
        let ptr = unsafe { LLVMGetStringAttributeValue(self.raw, &mut len) };
        Some(unsafe { string_from_parts(ptr, len as usize) })
    }

    pub fn type_value(self) -> Option<Type<'ctx>> {
        if !self.is_type() {
            return None;
        }
        unsafe { Type::from_raw_opt(LLVMGetTypeAttributeValue(self.raw)) }
    }
}

impl fmt::Debug for Attribute<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.classify() {
            AnyAttribute::Enum(_) => write!(f, "Attribute(#{}={})", self.kind_id().unwrap_or(0), self.value().unwrap_or(0)),
            AnyAttribute::String(_) => write!(
                f,
                "Attribute({:?}={:?})",
                self.string_kind().unwrap_or_default(),
                self.string_value().unwrap_or_default()
            ),
            AnyAttribute::Type(_) => write!(f, "Attribute(#{}: {:?})", self.kind_id().unwrap_or(0), self.type_value()),
            AnyAttribute::Other(_) => write!(f, "Attribute({:p})", self.raw),
        }
    }
}

/// An attribute dispatched on its flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyAttribute<'ctx> {
    Enum(Attribute<'ctx>),
    String(Attribute<'ctx>),
    Type(Attribute<'ctx>),
    Other(Attribute<'ctx>),
}

impl<'ctx> From<Attribute<'ctx>> for AnyAttribute<'ctx> {
    fn from(attribute: Attribute<'ctx>) -> Self {
        if attribute.is_enum() {
            AnyAttribute::Enum(attribute)
        } else if attribute.is_string() {
            AnyAttribute::String(attribute)
        } else if attribute.is_type() {
            AnyAttribute::Type(attribute)
        } else {
            log::warn!("attribute {:p} is neither enum, string nor type", attribute.raw);
            AnyAttribute::Other(attribute)
        }
    }
}

impl<'ctx> AnyAttribute<'ctx> {
    pub fn as_attribute(self) -> Attribute<'ctx> {
        match self {
            AnyAttribute::Enum(a) | AnyAttribute::String(a) | AnyAttribute::Type(a) | AnyAttribute::Other(a) => a,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            AnyAttribute::Enum(_) => "EnumAttribute",
            AnyAttribute::String(_) => "StringAttribute",
            AnyAttribute::Type(_) => "TypeAttribute",
            AnyAttribute::Other(_) => "Attribute",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_index_encoding() {
        init();
        assert_eq!(AttributeIndex::Return.as_raw(), 0);
        assert_eq!(AttributeIndex::Function.as_raw(), u32::MAX);
        assert_eq!(AttributeIndex::Param(0).as_raw(), 1);
        assert_eq!(AttributeIndex::from_raw(3), AttributeIndex::Param(2));
        assert_eq!(AttributeIndex::from_raw(u32::MAX), AttributeIndex::Function);
    }

    #[test]
    fn test_kind_lookup() {
        init();
        let noinline = enum_attribute_kind("noinline");
        assert_ne!(noinline, 0);
        assert!(noinline <= last_enum_attribute_kind());
        assert_eq!(enum_attribute_kind("definitely-not-an-attribute"), 0);
    }

    #[test]
    fn test_attribute_dispatch() {
        init();
        let ctx = Context::create().unwrap();
        let align = ctx.create_enum_attribute(enum_attribute_kind("align"), 16);
        let string = ctx.create_string_attribute("target-cpu", "x86-64");
        let sret = ctx.create_type_attribute(enum_attribute_kind("sret"), ctx.i64_type().as_type());

        assert_eq!(align.classify().class_name(), "EnumAttribute");
        assert_eq!(align.value(), Some(16));
        assert_eq!(align.string_kind(), None);

        assert_eq!(string.classify().class_name(), "StringAttribute");
        assert_eq!(string.string_kind().as_deref(), Some("target-cpu"));
        assert_eq!(string.string_value().as_deref(), Some("x86-64"));
        assert_eq!(string.kind_id(), None);

        assert_eq!(sret.classify().class_name(), "TypeAttribute");
        assert_eq!(sret.type_value(), Some(ctx.i64_type().as_type()));
        assert_eq!(sret.classify().as_attribute(), sret);
    }
}
