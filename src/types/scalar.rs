//! Integer and floating point types.

use crate::error::{LlvmError, LlvmResult};
use crate::support::llvm_bool;
use crate::values::{ConstantFp, ConstantInt};
use llvm_sys::core::{
    LLVMConstInt, LLVMConstIntOfArbitraryPrecision, LLVMConstIntOfStringAndSize, LLVMConstReal,
    LLVMConstRealOfStringAndSize, LLVMGetIntTypeWidth,
};
use std::ffi::c_char;

type_view!(
    /// An integer type of any bit width.
    IntType, "IntType", LLVMIntegerTypeKind
);

type_view!(
    /// One of the IEEE or target floating point types.
    FloatType,
    "RealType",
    LLVMHalfTypeKind
        | LLVMBFloatTypeKind
        | LLVMFloatTypeKind
        | LLVMDoubleTypeKind
        | LLVMX86_FP80TypeKind
        | LLVMFP128TypeKind
        | LLVMPPC_FP128TypeKind
);

impl<'ctx> IntType<'ctx> {
    pub fn width(self) -> u32 {
        unsafe { LLVMGetIntTypeWidth(self.as_raw()) }
    }

    /// Constant of this type; `sign_extend` widens `value` as signed past 64 bits.
    pub fn const_int(self, value: u64, sign_extend: bool) -> ConstantInt<'ctx> {
        unsafe {
            ConstantInt::from_raw_unchecked(LLVMConstInt(self.as_raw(), value, llvm_bool(sign_extend)))
        }
    }

    /// Constant from little-endian 64-bit words.
    pub fn const_int_arbitrary_precision(self, words: &[u64]) -> ConstantInt<'ctx> {
        unsafe {
            ConstantInt::from_raw_unchecked(LLVMConstIntOfArbitraryPrecision(
                self.as_raw(),
                words.len() as u32,
                words.as_ptr(),
            ))
        }
    }

    /// Parse `text` in `radix` (2, 8, 10, 16 or 36).
    pub fn const_int_from_string(self, text: &str, radix: u8) -> LlvmResult<ConstantInt<'ctx>> {
        let digits = text.strip_prefix('-').unwrap_or(text);
        let valid = matches!(radix, 2 | 8 | 10 | 16 | 36)
            && !digits.is_empty()
            && digits.chars().all(|c| c.is_digit(radix as u32));
        if !valid {
            return Err(LlvmError::Message {
                operation: "const_int_from_string",
                message: format!("`{text}` is not a radix-{radix} integer"),
            });
        }
        Ok(unsafe {
            ConstantInt::from_raw_unchecked(LLVMConstIntOfStringAndSize(
                self.as_raw(),
                text.as_ptr() as *const c_char,
                text.len() as u32,
                radix,
            ))
        })
    }

    pub fn is_bool(self) -> bool {
        self.width() == 1
    }
}

impl<'ctx> FloatType<'ctx> {
    pub fn const_real(self, value: f64) -> ConstantFp<'ctx> {
        unsafe { ConstantFp::from_raw_unchecked(LLVMConstReal(self.as_raw(), value)) }
    }

    /// Parse a decimal or hexadecimal floating point literal.
    pub fn const_real_from_string(self, text: &str) -> LlvmResult<ConstantFp<'ctx>> {
        if text.trim().is_empty() {
            return Err(LlvmError::Message {
                operation: "const_real_from_string",
                message: String::from("empty literal"),
            });
        }
        Ok(unsafe {
            ConstantFp::from_raw_unchecked(LLVMConstRealOfStringAndSize(
                self.as_raw(),
                text.as_ptr() as *const c_char,
                text.len() as u32,
            ))
        })
    }

    /// Whether this is one of the 16-bit formats.
    pub fn is_half_precision(self) -> bool {
        matches!(
            self.kind(),
            crate::enums::TypeKind::LLVMHalfTypeKind | crate::enums::TypeKind::LLVMBFloatTypeKind
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_int_constants() {
        init();
        let ctx = Context::create().unwrap();
        let i32_ty = ctx.i32_type();
        assert_eq!(i32_ty.width(), 32);
        assert_eq!(i32_ty.const_int(42, false).zext_value(), 42);
        assert_eq!(i32_ty.const_int(-1i64 as u64, true).sext_value(), -1);
        assert_eq!(i32_ty.const_int_from_string("-17", 10).unwrap().sext_value(), -17);
        assert_eq!(i32_ty.const_int_from_string("ff", 16).unwrap().zext_value(), 255);
        assert!(i32_ty.const_int_from_string("12z", 10).is_err());
        let wide = ctx.i128_type().const_int_arbitrary_precision(&[5, 0]);
        assert_eq!(wide.zext_value(), 5);
    }

    #[test]
    fn test_real_constants() {
        init();
        let ctx = Context::create().unwrap();
        let (value, loses_info) = ctx.f64_type().const_real(2.5).double_value();
        assert_eq!(value, 2.5);
        assert!(!loses_info);
        let parsed = ctx.f32_type().const_real_from_string("0.5").unwrap();
        assert_eq!(parsed.double_value().0, 0.5);
        assert!(ctx.bfloat_type().is_half_precision());
        assert!(!ctx.f64_type().is_half_precision());
    }
}
