// This module wraps LLVMTypeRef. Type is a Copy view tied to the lifetime of the context (or
// module) borrow it came from; types are owned by their context and never disposed. AnyType
// is the kind-dispatch factory: LLVMGetTypeKind selects the typed view (IntType, FloatType,
// FunctionType, StructType, ArrayType, PointerType, VectorType) or one of the payload-free
// kinds, and kinds this crate does not name degrade to AnyType::Other. Each typed view derefs
// to Type for the shared queries and converts back with TryFrom, failing with KindMismatch.

//! LLVM types and type-kind dispatch.

use crate::context::Context;
use crate::enums::TypeKind;
use crate::error::{LlvmError, LlvmResult};
use crate::handle::Borrowed;
use crate::support::{from_llvm_bool, llvm_bool, LlvmString};
use crate::values::{Constant, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMTypeRef, LLVMValueRef};
use std::fmt;
use std::marker::PhantomData;

macro_rules! type_view {
    ($(#[$meta:meta])* $name:ident, $class:literal, $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name<'ctx>($crate::types::Type<'ctx>);

        impl<'ctx> $name<'ctx> {
            /// # Safety
            /// `raw` must be a live, non-null type of this kind.
            pub unsafe fn from_raw_unchecked(raw: llvm_sys::prelude::LLVMTypeRef) -> Self {
                Self($crate::types::Type::from_raw(raw))
            }

            pub fn as_type(self) -> $crate::types::Type<'ctx> {
                self.0
            }
        }

        impl<'ctx> TryFrom<$crate::types::Type<'ctx>> for $name<'ctx> {
            type Error = $crate::error::LlvmError;

            fn try_from(ty: $crate::types::Type<'ctx>) -> Result<Self, Self::Error> {
                match ty.kind() {
                    $($crate::enums::TypeKind::$kind)|+ => Ok(Self(ty)),
                    _ => Err($crate::error::LlvmError::KindMismatch {
                        expected: $class,
                        found: $crate::types::AnyType::from(ty).class_name(),
                    }),
                }
            }
        }

        impl<'ctx> std::ops::Deref for $name<'ctx> {
            type Target = $crate::types::Type<'ctx>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<'ctx> From<$name<'ctx>> for $crate::types::Type<'ctx> {
            fn from(view: $name<'ctx>) -> Self {
                view.0
            }
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $class, self.0)
            }
        }

        impl std::fmt::Display for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

mod aggregate;
mod function;
mod pointer;
mod scalar;

pub use aggregate::{ArrayType, StructType, VectorType};
pub use function::FunctionType;
pub use pointer::PointerType;
pub use scalar::{FloatType, IntType};

/// A type owned by a context.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Type<'ctx> {
    raw: LLVMTypeRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> Type<'ctx> {
    /// # Safety
    /// `raw` must be a live, non-null type.
    pub unsafe fn from_raw(raw: LLVMTypeRef) -> Self {
        debug_assert!(!raw.is_null());
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `raw` must be null or a live type.
    pub unsafe fn from_raw_opt(raw: LLVMTypeRef) -> Option<Self> {
        (!raw.is_null()).then(|| Self::from_raw(raw))
    }

    pub fn as_raw(self) -> LLVMTypeRef {
        self.raw
    }

    pub fn kind(self) -> TypeKind {
        unsafe { LLVMGetTypeKind(self.raw) }
    }

    /// Dispatch to the typed view for this type's kind.
    pub fn classify(self) -> AnyType<'ctx> {
        AnyType::from(self)
    }

    pub fn context(self) -> Borrowed<'ctx, Context> {
        Borrowed::new(unsafe { Context::from_raw_borrowed(LLVMGetTypeContext(self.raw)) })
    }

    pub fn is_sized(self) -> bool {
        from_llvm_bool(unsafe { LLVMTypeIsSized(self.raw) })
    }

    pub fn print_to_string(self) -> String {
        unsafe { LlvmString::from_raw(LLVMPrintTypeToString(self.raw)) }
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Print the type to stderr.
    pub fn dump(self) {
        unsafe { LLVMDumpType(self.raw) }
    }

    pub fn const_null(self) -> Constant<'ctx> {
        unsafe { Constant::from_raw_unchecked(LLVMConstNull(self.raw)) }
    }

    /// All-ones value; only meaningful for integer and vector-of-integer types.
    pub fn const_all_ones(self) -> LlvmResult<Constant<'ctx>> {
        if !self.is_int_or_int_vector() {
            return Err(LlvmError::KindMismatch {
                expected: "IntType",
                found: self.classify().class_name(),
            });
        }
        Ok(unsafe { Constant::from_raw_unchecked(LLVMConstAllOnes(self.raw)) })
    }

    pub fn undef(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMGetUndef(self.raw)) }
    }

    pub fn poison(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMGetPoison(self.raw)) }
    }

    /// Null pointer constant; only for pointer types. [`PointerType`] has an infallible form.
    pub fn const_pointer_null(self) -> LlvmResult<Constant<'ctx>> {
        if self.kind() != TypeKind::LLVMPointerTypeKind {
            return Err(LlvmError::KindMismatch {
                expected: "PointerType",
                found: self.classify().class_name(),
            });
        }
        Ok(unsafe { Constant::from_raw_unchecked(LLVMConstPointerNull(self.raw)) })
    }

    /// `sizeof` as a constant expression; `None` for unsized types.
    pub fn size_of(self) -> Option<Constant<'ctx>> {
        self.is_sized()
            .then(|| unsafe { Constant::from_raw_unchecked(LLVMSizeOf(self.raw)) })
    }

    /// `alignof` as a constant expression; `None` for unsized types.
    pub fn align_of(self) -> Option<Constant<'ctx>> {
        self.is_sized()
            .then(|| unsafe { Constant::from_raw_unchecked(LLVMAlignOf(self.raw)) })
    }

    /// Contained types (element, parameter, field ...).
    pub fn subtypes(self) -> Vec<Type<'ctx>> {
        let count = unsafe { LLVMGetNumContainedTypes(self.raw) } as usize;
        let mut raw: Vec<LLVMTypeRef> = vec![std::ptr::null_mut(); count];
        unsafe { LLVMGetSubtypes(self.raw, raw.as_mut_ptr()) };
        raw.into_iter().map(|t| unsafe { Type::from_raw(t) }).collect()
    }

    /// Function type returning `self`.
    pub fn fn_type(self, params: &[Type<'ctx>], var_args: bool) -> FunctionType<'ctx> {
        let mut raw: Vec<LLVMTypeRef> = params.iter().map(|t| t.raw).collect();
        unsafe {
            FunctionType::from_raw_unchecked(LLVMFunctionType(
                self.raw,
                raw.as_mut_ptr(),
                raw.len() as u32,
                llvm_bool(var_args),
            ))
        }
    }

    pub fn array_type(self, len: u64) -> ArrayType<'ctx> {
        unsafe { ArrayType::from_raw_unchecked(LLVMArrayType2(self.raw, len)) }
    }

    pub fn vector_type(self, count: u32) -> VectorType<'ctx> {
        unsafe { VectorType::from_raw_unchecked(LLVMVectorType(self.raw, count)) }
    }

    pub fn scalable_vector_type(self, min_count: u32) -> VectorType<'ctx> {
        unsafe { VectorType::from_raw_unchecked(LLVMScalableVectorType(self.raw, min_count)) }
    }

    /// Constant array whose element type is `self`.
    pub fn const_array(self, values: &[Value<'ctx>]) -> Constant<'ctx> {
        let mut raw: Vec<LLVMValueRef> = values.iter().map(|v| v.as_raw()).collect();
        unsafe {
            Constant::from_raw_unchecked(LLVMConstArray2(self.raw, raw.as_mut_ptr(), raw.len() as u64))
        }
    }

    fn is_int_or_int_vector(self) -> bool {
        match self.kind() {
            TypeKind::LLVMIntegerTypeKind => true,
            TypeKind::LLVMVectorTypeKind | TypeKind::LLVMScalableVectorTypeKind => {
                unsafe { Type::from_raw(LLVMGetElementType(self.raw)) }.kind()
                    == TypeKind::LLVMIntegerTypeKind
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_to_string())
    }
}

impl fmt::Debug for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({})", self.print_to_string())
    }
}

/// A type dispatched on its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyType<'ctx> {
    Void(Type<'ctx>),
    Real(FloatType<'ctx>),
    Int(IntType<'ctx>),
    Function(FunctionType<'ctx>),
    Struct(StructType<'ctx>),
    Array(ArrayType<'ctx>),
    Pointer(PointerType<'ctx>),
    Vector(VectorType<'ctx>),
    Label(Type<'ctx>),
    Metadata(Type<'ctx>),
    X86Mmx(Type<'ctx>),
    X86Amx(Type<'ctx>),
    Token(Type<'ctx>),
    TargetExt(Type<'ctx>),
    Other(Type<'ctx>),
}

impl<'ctx> From<Type<'ctx>> for AnyType<'ctx> {
    #[allow(unreachable_patterns)]
    fn from(ty: Type<'ctx>) -> Self {
        let raw = ty.as_raw();
        unsafe {
            match ty.kind() {
                TypeKind::LLVMVoidTypeKind => AnyType::Void(ty),
                TypeKind::LLVMHalfTypeKind
                | TypeKind::LLVMBFloatTypeKind
                | TypeKind::LLVMFloatTypeKind
                | TypeKind::LLVMDoubleTypeKind
                | TypeKind::LLVMX86_FP80TypeKind
                | TypeKind::LLVMFP128TypeKind
                | TypeKind::LLVMPPC_FP128TypeKind => AnyType::Real(FloatType::from_raw_unchecked(raw)),
                TypeKind::LLVMLabelTypeKind => AnyType::Label(ty),
                TypeKind::LLVMIntegerTypeKind => AnyType::Int(IntType::from_raw_unchecked(raw)),
                TypeKind::LLVMFunctionTypeKind => {
                    AnyType::Function(FunctionType::from_raw_unchecked(raw))
                }
                TypeKind::LLVMStructTypeKind => AnyType::Struct(StructType::from_raw_unchecked(raw)),
                TypeKind::LLVMArrayTypeKind => AnyType::Array(ArrayType::from_raw_unchecked(raw)),
                TypeKind::LLVMPointerTypeKind => {
                    AnyType::Pointer(PointerType::from_raw_unchecked(raw))
                }
                TypeKind::LLVMVectorTypeKind | TypeKind::LLVMScalableVectorTypeKind => {
                    AnyType::Vector(VectorType::from_raw_unchecked(raw))
                }
                TypeKind::LLVMMetadataTypeKind => AnyType::Metadata(ty),
                TypeKind::LLVMX86_MMXTypeKind => AnyType::X86Mmx(ty),
                TypeKind::LLVMX86_AMXTypeKind => AnyType::X86Amx(ty),
                TypeKind::LLVMTokenTypeKind => AnyType::Token(ty),
                TypeKind::LLVMTargetExtTypeKind => AnyType::TargetExt(ty),
                other => {
                    log::warn!("unmapped type kind {other:?}, using generic Type");
                    AnyType::Other(ty)
                }
            }
        }
    }
}

impl<'ctx> AnyType<'ctx> {
    pub fn as_type(self) -> Type<'ctx> {
        match self {
            AnyType::Void(t)
            | AnyType::Label(t)
            | AnyType::Metadata(t)
            | AnyType::X86Mmx(t)
            | AnyType::X86Amx(t)
            | AnyType::Token(t)
            | AnyType::TargetExt(t)
            | AnyType::Other(t) => t,
            AnyType::Real(t) => t.as_type(),
            AnyType::Int(t) => t.as_type(),
            AnyType::Function(t) => t.as_type(),
            AnyType::Struct(t) => t.as_type(),
            AnyType::Array(t) => t.as_type(),
            AnyType::Pointer(t) => t.as_type(),
            AnyType::Vector(t) => t.as_type(),
        }
    }

    /// Name of the wrapper class this kind maps to.
    pub fn class_name(&self) -> &'static str {
        match self {
            AnyType::Void(_) => "VoidType",
            AnyType::Real(_) => "RealType",
            AnyType::Int(_) => "IntType",
            AnyType::Function(_) => "FunctionType",
            AnyType::Struct(_) => "StructType",
            AnyType::Array(_) => "ArrayType",
            AnyType::Pointer(_) => "PointerType",
            AnyType::Vector(_) => "VectorType",
            AnyType::Label(_) => "LabelType",
            AnyType::Metadata(_) => "MetadataType",
            AnyType::X86Mmx(_) => "X86MMXType",
            AnyType::X86Amx(_) => "X86AMXType",
            AnyType::Token(_) => "TokenType",
            AnyType::TargetExt(_) => "TargetExtType",
            AnyType::Other(_) => "Type",
        }
    }

    /// Whether values of this type are first class (can be operands).
    pub fn is_first_class(&self) -> bool {
        !matches!(
            self,
            AnyType::Void(_) | AnyType::Function(_) | AnyType::Label(_) | AnyType::Metadata(_)
        )
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, AnyType::Struct(_) | AnyType::Array(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_dispatch_covers_named_kinds() {
        init();
        let ctx = Context::create().unwrap();
        let cases: Vec<(Type<'_>, &str)> = vec![
            (ctx.void_type(), "VoidType"),
            (ctx.half_type().as_type(), "RealType"),
            (ctx.bfloat_type().as_type(), "RealType"),
            (ctx.f32_type().as_type(), "RealType"),
            (ctx.f64_type().as_type(), "RealType"),
            (ctx.x86_fp80_type().as_type(), "RealType"),
            (ctx.fp128_type().as_type(), "RealType"),
            (ctx.ppc_fp128_type().as_type(), "RealType"),
            (ctx.label_type(), "LabelType"),
            (ctx.i32_type().as_type(), "IntType"),
            (ctx.int_type(17).as_type(), "IntType"),
            (ctx.void_type().fn_type(&[], false).as_type(), "FunctionType"),
            (ctx.struct_type(&[], false).as_type(), "StructType"),
            (ctx.i8_type().array_type(4).as_type(), "ArrayType"),
            (ctx.ptr_type(0).as_type(), "PointerType"),
            (ctx.f32_type().vector_type(4).as_type(), "VectorType"),
            (ctx.i32_type().scalable_vector_type(2).as_type(), "VectorType"),
            (ctx.metadata_type(), "MetadataType"),
            (ctx.x86_mmx_type(), "X86MMXType"),
            (ctx.x86_amx_type(), "X86AMXType"),
            (ctx.token_type(), "TokenType"),
            (ctx.target_ext_type("llvm.capi.ext", &[], &[]).unwrap(), "TargetExtType"),
        ];
        for (ty, expected) in cases {
            assert_eq!(ty.classify().class_name(), expected, "{ty}");
            assert_eq!(ty.classify().as_type(), ty);
        }
    }

    #[test]
    fn test_typed_view_conversion() {
        init();
        let ctx = Context::create().unwrap();
        let i32_ty = ctx.i32_type().as_type();
        assert!(IntType::try_from(i32_ty).is_ok());
        let err = FloatType::try_from(i32_ty).unwrap_err();
        assert_eq!(
            err,
            LlvmError::KindMismatch {
                expected: "RealType",
                found: "IntType"
            }
        );
    }

    #[test]
    fn test_print_and_sizedness() {
        init();
        let ctx = Context::create().unwrap();
        assert_eq!(ctx.i64_type().to_string(), "i64");
        assert_eq!(ctx.ptr_type(1).to_string(), "ptr addrspace(1)");
        assert!(ctx.i64_type().is_sized());
        assert!(!ctx.void_type().is_sized());
        assert!(ctx.void_type().size_of().is_none());
        assert!(ctx.i64_type().size_of().is_some());
    }

    #[test]
    fn test_all_ones_requires_integer() {
        init();
        let ctx = Context::create().unwrap();
        assert!(ctx.i8_type().const_all_ones().is_ok());
        assert!(ctx.i8_type().vector_type(4).const_all_ones().is_ok());
        assert!(ctx.f64_type().const_all_ones().is_err());
    }

    #[test]
    fn test_pointer_null_requires_pointer() {
        init();
        let ctx = Context::create().unwrap();
        let null = ctx.ptr_type(0).as_type().const_pointer_null().unwrap();
        assert!(null.as_value().is_null());
        assert_eq!(ctx.ptr_type(0).const_pointer_null(), null);
        assert_eq!(
            ctx.i64_type().as_type().const_pointer_null().unwrap_err(),
            LlvmError::KindMismatch {
                expected: "PointerType",
                found: "IntType"
            }
        );
        assert!(matches!(
            ctx.struct_type(&[], false).as_type().const_pointer_null(),
            Err(LlvmError::KindMismatch { found: "StructType", .. })
        ));
    }

    #[test]
    fn test_subtypes_of_function() {
        init();
        let ctx = Context::create().unwrap();
        let fn_ty = ctx
            .i32_type()
            .fn_type(&[ctx.i8_type().as_type(), ctx.f64_type().as_type()], false);
        let subtypes = fn_ty.subtypes();
        assert_eq!(subtypes.len(), 3);
        assert_eq!(subtypes[0], ctx.i32_type().as_type());
        assert_eq!(subtypes[2], ctx.f64_type().as_type());
    }
}
