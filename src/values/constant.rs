// Constant views. Constant carries the constant-expression folders that LLVM 19 still offers
// through the C API (negation, not, add/sub with their wrap flags, xor, the cast family,
// GEPs, vector element access and shuffles, block addresses), plus aggregate element access
// and the opcode of a constant expression. ConstantInt, ConstantFp and ConstantData read back
// the payload of integer, floating point and data-sequential (string/array/vector) constants.

//! Constants and constant expressions.

use crate::basic_block::BasicBlock;
use crate::enums::Opcode;
use crate::error::{LlvmError, LlvmResult};
use crate::support::{from_llvm_bool, string_from_parts};
use crate::types::Type;
use crate::values::{raw_values, FunctionValue, Value};
use llvm_sys::core::*;

value_view!(
    /// Any constant: literal, aggregate, global or constant expression.
    Constant, "Constant", |raw| !LLVMIsAConstant(raw).is_null()
);

value_view!(ConstantInt, "ConstantInt", |raw| !LLVMIsAConstantInt(raw).is_null());

value_view!(ConstantFp, "ConstantFP", |raw| !LLVMIsAConstantFP(raw).is_null());

value_view!(
    /// A constant data array or vector (including C strings).
    ConstantData, "ConstantDataSequential", |raw| !LLVMIsAConstantDataSequential(raw).is_null()
);

upcast!(ConstantInt => Constant);
upcast!(ConstantFp => Constant);
upcast!(ConstantData => Constant);

macro_rules! unary_const {
    ($($(#[$meta:meta])* $name:ident => $f:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $name(self) -> Constant<'ctx> {
                unsafe { Constant::from_raw_unchecked($f(self.as_raw())) }
            }
        )+
    };
}

macro_rules! binary_const {
    ($($name:ident => $f:ident),+ $(,)?) => {
        $(
            pub fn $name(self, rhs: Constant<'ctx>) -> Constant<'ctx> {
                unsafe { Constant::from_raw_unchecked($f(self.as_raw(), rhs.as_raw())) }
            }
        )+
    };
}

macro_rules! cast_const {
    ($($name:ident => $f:ident),+ $(,)?) => {
        $(
            pub fn $name(self, to: Type<'ctx>) -> Constant<'ctx> {
                unsafe { Constant::from_raw_unchecked($f(self.as_raw(), to.as_raw())) }
            }
        )+
    };
}

impl<'ctx> Constant<'ctx> {
    unary_const! {
        const_neg => LLVMConstNeg,
        const_nsw_neg => LLVMConstNSWNeg,
        const_not => LLVMConstNot,
    }

    binary_const! {
        const_add => LLVMConstAdd,
        const_nsw_add => LLVMConstNSWAdd,
        const_nuw_add => LLVMConstNUWAdd,
        const_sub => LLVMConstSub,
        const_nsw_sub => LLVMConstNSWSub,
        const_nuw_sub => LLVMConstNUWSub,
        const_xor => LLVMConstXor,
    }

    cast_const! {
        const_trunc => LLVMConstTrunc,
        const_ptr_to_int => LLVMConstPtrToInt,
        const_int_to_ptr => LLVMConstIntToPtr,
        const_bit_cast => LLVMConstBitCast,
        const_addr_space_cast => LLVMConstAddrSpaceCast,
        const_trunc_or_bit_cast => LLVMConstTruncOrBitCast,
        const_pointer_cast => LLVMConstPointerCast,
    }

    /// `getelementptr` over `self` with `source_type` as the pointee.
    pub fn const_gep(self, source_type: Type<'ctx>, indices: &[Constant<'ctx>]) -> Constant<'ctx> {
        let mut raw: Vec<_> = indices.iter().map(|c| c.as_raw()).collect();
        unsafe {
            Constant::from_raw_unchecked(LLVMConstGEP2(
                source_type.as_raw(),
                self.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
            ))
        }
    }

    pub fn const_in_bounds_gep(
        self,
        source_type: Type<'ctx>,
        indices: &[Constant<'ctx>],
    ) -> Constant<'ctx> {
        let mut raw: Vec<_> = indices.iter().map(|c| c.as_raw()).collect();
        unsafe {
            Constant::from_raw_unchecked(LLVMConstInBoundsGEP2(
                source_type.as_raw(),
                self.as_raw(),
                raw.as_mut_ptr(),
                raw.len() as u32,
            ))
        }
    }

    pub fn const_extract_element(self, index: Constant<'ctx>) -> Constant<'ctx> {
        unsafe { Constant::from_raw_unchecked(LLVMConstExtractElement(self.as_raw(), index.as_raw())) }
    }

    pub fn const_insert_element(self, element: Constant<'ctx>, index: Constant<'ctx>) -> Constant<'ctx> {
        unsafe {
            Constant::from_raw_unchecked(LLVMConstInsertElement(
                self.as_raw(),
                element.as_raw(),
                index.as_raw(),
            ))
        }
    }

    pub fn const_shuffle_vector(self, other: Constant<'ctx>, mask: Constant<'ctx>) -> Constant<'ctx> {
        unsafe {
            Constant::from_raw_unchecked(LLVMConstShuffleVector(
                self.as_raw(),
                other.as_raw(),
                mask.as_raw(),
            ))
        }
    }

    /// Address of `block` inside `function`.
    pub fn block_address(function: FunctionValue<'ctx>, block: BasicBlock<'ctx>) -> Constant<'ctx> {
        unsafe { Constant::from_raw_unchecked(LLVMBlockAddress(function.as_raw(), block.as_raw())) }
    }

    /// Element `index` of a constant aggregate, if it has one.
    pub fn aggregate_element(self, index: u32) -> Option<Constant<'ctx>> {
        let raw = unsafe { LLVMGetAggregateElement(self.as_raw(), index) };
        (!raw.is_null()).then(|| unsafe { Constant::from_raw_unchecked(raw) })
    }

    /// Opcode of a constant expression.
    pub fn const_opcode(self) -> LlvmResult<Opcode> {
        if unsafe { LLVMIsAConstantExpr(self.as_raw()) }.is_null() {
            return Err(LlvmError::KindMismatch {
                expected: "ConstantExpr",
                found: self.classify().class_name(),
            });
        }
        Ok(unsafe { LLVMGetConstOpcode(self.as_raw()) })
    }

    /// Constant vector from `values`, all of one element type.
    pub fn const_vector(values: &[Value<'ctx>]) -> Constant<'ctx> {
        let mut raw = raw_values(values);
        unsafe { Constant::from_raw_unchecked(LLVMConstVector(raw.as_mut_ptr(), raw.len() as u32)) }
    }
}

impl<'ctx> ConstantInt<'ctx> {
    pub fn zext_value(self) -> u64 {
        unsafe { LLVMConstIntGetZExtValue(self.as_raw()) }
    }

    pub fn sext_value(self) -> i64 {
        unsafe { LLVMConstIntGetSExtValue(self.as_raw()) }
    }

    pub fn as_constant(self) -> Constant<'ctx> {
        self.into()
    }
}

impl<'ctx> ConstantFp<'ctx> {
    /// The value as `f64`, and whether the conversion lost information.
    pub fn double_value(self) -> (f64, bool) {
        let mut loses_info = 0;
        let value = unsafe { LLVMConstRealGetDouble(self.as_raw(), &mut loses_info) };
        (value, from_llvm_bool(loses_info))
    }

    pub fn as_constant(self) -> Constant<'ctx> {
        self.into()
    }
}

impl<'ctx> ConstantData<'ctx> {
    /// Whether this is an `[N x i8]` array.
    pub fn is_string(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsConstantString(self.as_raw()) })
    }

    /// Raw bytes of an `[N x i8]` constant, including any terminator.
    pub fn as_string(self) -> Option<String> {
        if !self.is_string() {
            return None;
        }
        let mut len = 0;
        let ptr = unsafe { LLVMGetAsString(self.as_raw(), &mut len) };
        Some(unsafe { string_from_parts(ptr, len) })
    }

    pub fn element(self, index: u32) -> Option<Constant<'ctx>> {
        self.as_constant().aggregate_element(index)
    }

    pub fn as_constant(self) -> Constant<'ctx> {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use crate::context::Context;
    use crate::enums::Opcode;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_folding_and_expressions() {
        init();
        let ctx = Context::create().unwrap();
        let i32_ty = ctx.i32_type();
        let two = i32_ty.const_int(2, false).as_constant();
        let three = i32_ty.const_int(3, false).as_constant();
        let sum = two.const_add(three);
        assert_eq!(sum.to_string(), "i32 5");
        assert_eq!(two.const_xor(three).to_string(), "i32 1");
        assert_eq!(two.const_neg().to_string(), "i32 -2");

        let ptr_ty = ctx.ptr_type(0).as_type();
        let as_ptr = two.const_int_to_ptr(ptr_ty);
        assert_eq!(as_ptr.const_opcode().unwrap(), Opcode::LLVMIntToPtr);
        assert!(two.const_opcode().is_err());
    }

    #[test]
    fn test_string_data() {
        init();
        let ctx = Context::create().unwrap();
        let data = ctx.const_string(b"abc", false);
        assert!(data.is_string());
        assert_eq!(data.as_string().as_deref(), Some("abc"));
        let b = data.element(1).unwrap();
        assert_eq!(b.to_string(), "i8 98");
        assert!(data.element(3).is_none());
    }
}
