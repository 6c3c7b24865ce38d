//! Struct, array and vector types.

use crate::error::{LlvmError, LlvmResult};
use crate::support::{from_llvm_bool, llvm_bool, string_from_ptr};
use crate::types::Type;
use crate::values::{Constant, Value};
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMTypeRef, LLVMValueRef};

type_view!(
    /// A literal or named struct type.
    StructType, "StructType", LLVMStructTypeKind
);

type_view!(ArrayType, "ArrayType", LLVMArrayTypeKind);

type_view!(
    /// A fixed or scalable vector type.
    VectorType, "VectorType", LLVMVectorTypeKind | LLVMScalableVectorTypeKind
);

impl<'ctx> StructType<'ctx> {
    /// Name of a named struct; `None` for literal structs.
    pub fn name(self) -> Option<String> {
        let ptr = unsafe { LLVMGetStructName(self.as_raw()) };
        (!ptr.is_null()).then(|| unsafe { string_from_ptr(ptr) })
    }

    pub fn is_packed(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsPackedStruct(self.as_raw()) })
    }

    pub fn is_opaque(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsOpaqueStruct(self.as_raw()) })
    }

    pub fn is_literal(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsLiteralStruct(self.as_raw()) })
    }

    pub fn count_fields(self) -> u32 {
        unsafe { LLVMCountStructElementTypes(self.as_raw()) }
    }

    pub fn field_types(self) -> Vec<Type<'ctx>> {
        let mut raw: Vec<LLVMTypeRef> = vec![std::ptr::null_mut(); self.count_fields() as usize];
        unsafe { LLVMGetStructElementTypes(self.as_raw(), raw.as_mut_ptr()) };
        raw.into_iter().map(|t| unsafe { Type::from_raw(t) }).collect()
    }

    pub fn type_at_index(self, index: u32) -> Option<Type<'ctx>> {
        if index >= self.count_fields() {
            return None;
        }
        unsafe { Type::from_raw_opt(LLVMStructGetTypeAtIndex(self.as_raw(), index)) }
    }

    /// Give an opaque named struct its body.
    pub fn set_body(self, fields: &[Type<'ctx>], packed: bool) -> LlvmResult<()> {
        if !self.is_opaque() {
            return Err(LlvmError::Message {
                operation: "set_body",
                message: format!("{} already has a body", self.as_type()),
            });
        }
        let mut raw: Vec<LLVMTypeRef> = fields.iter().map(|t| t.as_raw()).collect();
        unsafe { LLVMStructSetBody(self.as_raw(), raw.as_mut_ptr(), raw.len() as u32, llvm_bool(packed)) };
        Ok(())
    }

    /// Constant of this named struct type.
    pub fn const_named_struct(self, fields: &[Value<'ctx>]) -> LlvmResult<Constant<'ctx>> {
        if fields.len() != self.count_fields() as usize {
            return Err(LlvmError::Message {
                operation: "const_named_struct",
                message: format!(
                    "{} has {} field(s), got {}",
                    self.as_type(),
                    self.count_fields(),
                    fields.len()
                ),
            });
        }
        let mut raw: Vec<LLVMValueRef> = fields.iter().map(|v| v.as_raw()).collect();
        Ok(unsafe {
            Constant::from_raw_unchecked(LLVMConstNamedStruct(
                self.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
            ))
        })
    }
}

impl<'ctx> ArrayType<'ctx> {
    pub fn len(self) -> u64 {
        unsafe { LLVMGetArrayLength2(self.as_raw()) }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn element_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGetElementType(self.as_raw())) }
    }

    /// Constant of this array type.
    pub fn const_array(self, values: &[Value<'ctx>]) -> LlvmResult<Constant<'ctx>> {
        if values.len() as u64 != self.len() {
            return Err(LlvmError::Message {
                operation: "const_array",
                message: format!("{} needs {} element(s), got {}", self.as_type(), self.len(), values.len()),
            });
        }
        Ok(self.element_type().const_array(values))
    }
}

impl<'ctx> VectorType<'ctx> {
    /// Element count (the minimum count for scalable vectors).
    pub fn size(self) -> u32 {
        unsafe { LLVMGetVectorSize(self.as_raw()) }
    }

    pub fn element_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMGetElementType(self.as_raw())) }
    }

    pub fn is_scalable(self) -> bool {
        self.kind() == crate::enums::TypeKind::LLVMScalableVectorTypeKind
    }

    /// Constant vector built from `values`.
    pub fn const_vector(values: &[Value<'ctx>]) -> Constant<'ctx> {
        let mut raw: Vec<LLVMValueRef> = values.iter().map(|v| v.as_raw()).collect();
        unsafe { Constant::from_raw_unchecked(LLVMConstVector(raw.as_mut_ptr(), raw.len() as u32)) }
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_named_struct_body() {
        init();
        let ctx = Context::create().unwrap();
        let node = ctx.opaque_struct_type("node").unwrap();
        assert!(node.is_opaque());
        assert_eq!(node.name().as_deref(), Some("node"));
        node.set_body(&[ctx.i32_type().as_type(), ctx.ptr_type(0).as_type()], false)
            .unwrap();
        assert!(!node.is_opaque());
        assert!(!node.is_literal());
        assert_eq!(node.count_fields(), 2);
        assert_eq!(node.type_at_index(1), Some(ctx.ptr_type(0).as_type()));
        assert_eq!(node.type_at_index(2), None);
        assert!(node.set_body(&[], false).is_err());
        assert_eq!(ctx.get_type_by_name("node").unwrap(), Some(node.as_type()));
    }

    #[test]
    fn test_literal_struct() {
        init();
        let ctx = Context::create().unwrap();
        let pair = ctx.struct_type(&[ctx.i8_type().as_type(), ctx.i64_type().as_type()], true);
        assert!(pair.is_literal());
        assert!(pair.is_packed());
        assert_eq!(pair.name(), None);
        assert_eq!(pair.to_string(), "<{ i8, i64 }>");
    }

    #[test]
    fn test_array_and_vector() {
        init();
        let ctx = Context::create().unwrap();
        let i16_ty = ctx.i16_type();
        let array = i16_ty.array_type(3);
        assert_eq!(array.len(), 3);
        assert_eq!(array.element_type(), i16_ty.as_type());
        let elems: Vec<_> = (0..3).map(|i| i16_ty.const_int(i, false).as_value()).collect();
        assert!(array.const_array(&elems).is_ok());
        assert!(array.const_array(&elems[..2]).is_err());

        let vector = ctx.f32_type().scalable_vector_type(4);
        assert!(vector.is_scalable());
        assert_eq!(vector.size(), 4);
    }
}
