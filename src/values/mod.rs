// This module wraps LLVMValueRef. Value is the Copy base view; its lifetime is the borrow of
// the context or module it came from and it is never disposed. AnyValue is the value-kind
// dispatch factory: LLVMGetValueKind picks the typed view (arguments, blocks, functions and the
// other globals, each constant flavour, metadata wrapped as a value, inline asm, instructions,
// poison). Kinds newer than this crate fall back to the generic constant view when LLVM says
// the value is a constant, otherwise to AnyValue::Other. Typed views are flat newtypes that
// deref to Value; the "is-a" relations of LLVM's class tree (a function is a global value is a
// constant) are explicit From conversions instead of inheritance. Use is the def-use edge
// returned by use iteration and operand queries.

//! LLVM values, uses and value-kind dispatch.

use crate::basic_block::BasicBlock;
use crate::context::Context;
use crate::enums::ValueKind;
use crate::error::LlvmResult;
use crate::handle::Borrowed;
use crate::iter::Chain;
use crate::support::{from_llvm_bool, string_from_parts, LlvmString};
use crate::types::Type;
use llvm_sys::core::*;
use llvm_sys::prelude::{LLVMUseRef, LLVMValueRef};
use std::ffi::c_char;
use std::fmt;
use std::marker::PhantomData;

macro_rules! value_view {
    ($(#[$meta:meta])* $name:ident, $class:literal, |$raw:ident| $check:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name<'ctx>($crate::values::Value<'ctx>);

        impl<'ctx> $name<'ctx> {
            pub const CLASS: &'static str = $class;

            /// # Safety
            /// `raw` must be a live, non-null value of this kind.
            pub unsafe fn from_raw_unchecked(raw: llvm_sys::prelude::LLVMValueRef) -> Self {
                Self($crate::values::Value::from_raw(raw))
            }

            pub fn as_value(self) -> $crate::values::Value<'ctx> {
                self.0
            }

            #[allow(unused_unsafe)]
            fn matches($raw: llvm_sys::prelude::LLVMValueRef) -> bool {
                unsafe { $check }
            }
        }

        impl<'ctx> TryFrom<$crate::values::Value<'ctx>> for $name<'ctx> {
            type Error = $crate::error::LlvmError;

            fn try_from(value: $crate::values::Value<'ctx>) -> Result<Self, Self::Error> {
                if Self::matches(value.as_raw()) {
                    Ok(Self(value))
                } else {
                    Err($crate::error::LlvmError::KindMismatch {
                        expected: $class,
                        found: value.classify().class_name(),
                    })
                }
            }
        }

        impl<'ctx> std::ops::Deref for $name<'ctx> {
            type Target = $crate::values::Value<'ctx>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<'ctx> From<$name<'ctx>> for $crate::values::Value<'ctx> {
            fn from(view: $name<'ctx>) -> Self {
                view.0
            }
        }

        impl std::fmt::Debug for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", $class, self.0.print_to_string())
            }
        }

        impl std::fmt::Display for $name<'_> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

/// Widen a view to a more general view it is known to satisfy.
macro_rules! upcast {
    ($from:ident => $($to:ident),+) => {
        $(
            impl<'ctx> From<$from<'ctx>> for $to<'ctx> {
                fn from(view: $from<'ctx>) -> Self {
                    unsafe { $to::from_raw_unchecked(view.as_raw()) }
                }
            }
        )+
    };
}

mod constant;
mod global;
pub mod instruction;
mod metadata;

pub use constant::{Constant, ConstantData, ConstantFp, ConstantInt};
pub use global::{FunctionValue, GlobalAlias, GlobalIFunc, GlobalValue, GlobalVariable};
pub use instruction::{AnyInstruction, Instruction};
pub use metadata::{
    Metadata, MetadataClass, MetadataEntries, MetadataValue, NamedMdNode,
};

/// Any LLVM value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value<'ctx> {
    raw: LLVMValueRef,
    _marker: PhantomData<&'ctx ()>,
}

pub(crate) fn raw_values(values: &[Value<'_>]) -> Vec<LLVMValueRef> {
    values.iter().map(|v| v.raw).collect()
}

impl<'ctx> Value<'ctx> {
    /// # Safety
    /// `raw` must be a live, non-null value.
    pub unsafe fn from_raw(raw: LLVMValueRef) -> Self {
        debug_assert!(!raw.is_null());
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    /// # Safety
    /// `raw` must be null or a live value.
    pub unsafe fn from_raw_opt(raw: LLVMValueRef) -> Option<Self> {
        (!raw.is_null()).then(|| Self::from_raw(raw))
    }

    pub fn as_raw(self) -> LLVMValueRef {
        self.raw
    }

    pub fn get_type(self) -> Type<'ctx> {
        unsafe { Type::from_raw(LLVMTypeOf(self.raw)) }
    }

    pub fn context(self) -> Borrowed<'ctx, Context> {
        self.get_type().context()
    }

    pub fn kind(self) -> ValueKind {
        unsafe { LLVMGetValueKind(self.raw) }
    }

    /// Dispatch to the typed view for this value's kind.
    pub fn classify(self) -> AnyValue<'ctx> {
        AnyValue::from(self)
    }

    pub fn name(self) -> String {
        let mut len = 0;
        let ptr = unsafe { LLVMGetValueName2(self.raw, &mut len) };
        unsafe { string_from_parts(ptr, len) }
    }

    pub fn set_name(self, name: &str) {
        unsafe { LLVMSetValueName2(self.raw, name.as_ptr() as *const c_char, name.len()) }
    }

    pub fn print_to_string(self) -> String {
        unsafe { LlvmString::from_raw(LLVMPrintValueToString(self.raw)) }
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Print the value to stderr.
    pub fn dump(self) {
        unsafe { LLVMDumpValue(self.raw) }
    }

    pub fn is_constant(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsConstant(self.raw) })
    }

    pub fn is_undef(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsUndef(self.raw) })
    }

    pub fn is_poison(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsPoison(self.raw) })
    }

    /// Whether this is a constant null value. Non-constants are never null.
    pub fn is_null(self) -> bool {
        from_llvm_bool(unsafe { LLVMIsNull(self.raw) })
    }

    pub fn is_instruction(self) -> bool {
        !unsafe { LLVMIsAInstruction(self.raw) }.is_null()
    }

    /// Whether the value has operands (instructions, constant expressions, globals ...).
    pub fn is_user(self) -> bool {
        !unsafe { LLVMIsAUser(self.raw) }.is_null()
    }

    pub fn replace_all_uses_with(self, replacement: Value<'ctx>) {
        unsafe { LLVMReplaceAllUsesWith(self.raw, replacement.raw) }
    }

    pub fn uses(self) -> Chain<Use<'ctx>> {
        let first = unsafe { Use::from_raw_opt(LLVMGetFirstUse(self.raw)) };
        Chain::new(first, |u| unsafe { Use::from_raw_opt(LLVMGetNextUse(u.raw)) })
    }

    pub fn operand_count(self) -> u32 {
        if !self.is_user() {
            return 0;
        }
        unsafe { LLVMGetNumOperands(self.raw) as u32 }
    }

    pub fn operand(self, index: u32) -> Option<Value<'ctx>> {
        if index >= self.operand_count() {
            return None;
        }
        unsafe { Value::from_raw_opt(LLVMGetOperand(self.raw, index)) }
    }

    pub fn operands(self) -> Vec<Option<Value<'ctx>>> {
        (0..self.operand_count())
            .map(|i| unsafe { Value::from_raw_opt(LLVMGetOperand(self.raw, i)) })
            .collect()
    }

    pub fn operand_use(self, index: u32) -> Option<Use<'ctx>> {
        if index >= self.operand_count() {
            return None;
        }
        unsafe { Use::from_raw_opt(LLVMGetOperandUse(self.raw, index)) }
    }

    pub fn set_operand(self, index: u32, value: Value<'ctx>) -> LlvmResult<()> {
        if index >= self.operand_count() {
            return Err(crate::error::LlvmError::Message {
                operation: "set_operand",
                message: format!("operand {index} out of range ({})", self.operand_count()),
            });
        }
        unsafe { LLVMSetOperand(self.raw, index, value.raw) };
        Ok(())
    }

    /// Wrap the value as metadata (`ValueAsMetadata`).
    pub fn as_metadata(self) -> Metadata<'ctx> {
        unsafe { Metadata::from_raw(LLVMValueAsMetadata(self.raw)) }
    }

    pub fn is_basic_block(self) -> bool {
        from_llvm_bool(unsafe { LLVMValueIsBasicBlock(self.raw) })
    }

    pub fn as_basic_block(self) -> Option<BasicBlock<'ctx>> {
        self.is_basic_block()
            .then(|| unsafe { BasicBlock::from_raw(LLVMValueAsBasicBlock(self.raw)) })
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.print_to_string())
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.print_to_string())
    }
}

/// An edge from a user to one of its operands.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Use<'ctx> {
    raw: LLVMUseRef,
    _marker: PhantomData<&'ctx ()>,
}

impl<'ctx> Use<'ctx> {
    /// # Safety
    /// `raw` must be null or a live use.
    pub unsafe fn from_raw_opt(raw: LLVMUseRef) -> Option<Self> {
        (!raw.is_null()).then_some(Self {
            raw,
            _marker: PhantomData,
        })
    }

    pub fn as_raw(self) -> LLVMUseRef {
        self.raw
    }

    /// The value holding the operand.
    pub fn user(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMGetUser(self.raw)) }
    }

    /// The operand itself.
    pub fn used_value(self) -> Value<'ctx> {
        unsafe { Value::from_raw(LLVMGetUsedValue(self.raw)) }
    }
}

impl fmt::Debug for Use<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Use")
            .field("user", &self.user())
            .field("used", &self.used_value())
            .finish()
    }
}

value_view!(
    /// A formal parameter of a function.
    Argument, "Argument", |raw| !LLVMIsAArgument(raw).is_null()
);

value_view!(InlineAsm, "InlineAsm", |raw| !LLVMIsAInlineAsm(raw).is_null());

impl<'ctx> Argument<'ctx> {
    pub fn parent(self) -> FunctionValue<'ctx> {
        unsafe { FunctionValue::from_raw_unchecked(LLVMGetParamParent(self.as_raw())) }
    }

    pub fn next_param(self) -> Option<Argument<'ctx>> {
        let raw = unsafe { LLVMGetNextParam(self.as_raw()) };
        (!raw.is_null()).then(|| unsafe { Argument::from_raw_unchecked(raw) })
    }

    pub fn previous_param(self) -> Option<Argument<'ctx>> {
        let raw = unsafe { LLVMGetPreviousParam(self.as_raw()) };
        (!raw.is_null()).then(|| unsafe { Argument::from_raw_unchecked(raw) })
    }

    pub fn set_alignment(self, align: u32) {
        unsafe { LLVMSetParamAlignment(self.as_raw(), align) }
    }
}

/// A value dispatched on its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnyValue<'ctx> {
    Argument(Argument<'ctx>),
    BasicBlock(BasicBlock<'ctx>),
    Function(FunctionValue<'ctx>),
    GlobalAlias(GlobalAlias<'ctx>),
    GlobalIFunc(GlobalIFunc<'ctx>),
    GlobalVariable(GlobalVariable<'ctx>),
    ConstantExpr(Constant<'ctx>),
    ConstantArray(Constant<'ctx>),
    ConstantStruct(Constant<'ctx>),
    ConstantVector(Constant<'ctx>),
    Undef(Constant<'ctx>),
    ConstantDataArray(ConstantData<'ctx>),
    ConstantDataVector(ConstantData<'ctx>),
    ConstantInt(ConstantInt<'ctx>),
    ConstantFp(ConstantFp<'ctx>),
    /// Token none, aggregate zero, null pointer and other plain constants.
    Constant(Constant<'ctx>),
    MdNode(MetadataValue<'ctx>),
    MdString(MetadataValue<'ctx>),
    Metadata(MetadataValue<'ctx>),
    InlineAsm(InlineAsm<'ctx>),
    Instruction(AnyInstruction<'ctx>),
    Poison(Constant<'ctx>),
    Other(Value<'ctx>),
}

impl<'ctx> From<Value<'ctx>> for AnyValue<'ctx> {
    #[allow(unreachable_patterns)]
    fn from(value: Value<'ctx>) -> Self {
        let raw = value.as_raw();
        unsafe {
            match value.kind() {
                ValueKind::LLVMArgumentValueKind => AnyValue::Argument(Argument::from_raw_unchecked(raw)),
                ValueKind::LLVMBasicBlockValueKind => {
                    AnyValue::BasicBlock(BasicBlock::from_raw(LLVMValueAsBasicBlock(raw)))
                }
                ValueKind::LLVMFunctionValueKind => {
                    AnyValue::Function(FunctionValue::from_raw_unchecked(raw))
                }
                ValueKind::LLVMGlobalAliasValueKind => {
                    AnyValue::GlobalAlias(GlobalAlias::from_raw_unchecked(raw))
                }
                ValueKind::LLVMGlobalIFuncValueKind => {
                    AnyValue::GlobalIFunc(GlobalIFunc::from_raw_unchecked(raw))
                }
                ValueKind::LLVMGlobalVariableValueKind => {
                    AnyValue::GlobalVariable(GlobalVariable::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantExprValueKind => {
                    AnyValue::ConstantExpr(Constant::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantArrayValueKind => {
                    AnyValue::ConstantArray(Constant::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantStructValueKind => {
                    AnyValue::ConstantStruct(Constant::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantVectorValueKind => {
                    AnyValue::ConstantVector(Constant::from_raw_unchecked(raw))
                }
                ValueKind::LLVMUndefValueValueKind => AnyValue::Undef(Constant::from_raw_unchecked(raw)),
                ValueKind::LLVMConstantDataArrayValueKind => {
                    AnyValue::ConstantDataArray(ConstantData::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantDataVectorValueKind => {
                    AnyValue::ConstantDataVector(ConstantData::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantIntValueKind => {
                    AnyValue::ConstantInt(ConstantInt::from_raw_unchecked(raw))
                }
                ValueKind::LLVMConstantFPValueKind => AnyValue::ConstantFp(ConstantFp::from_raw_unchecked(raw)),
                ValueKind::LLVMConstantTokenNoneValueKind
                | ValueKind::LLVMConstantAggregateZeroValueKind
                | ValueKind::LLVMConstantPointerNullValueKind => {
                    AnyValue::Constant(Constant::from_raw_unchecked(raw))
                }
                ValueKind::LLVMMetadataAsValueValueKind => {
                    let md = MetadataValue::from_raw_unchecked(raw);
                    match md.class() {
                        MetadataClass::MdNode => AnyValue::MdNode(md),
                        MetadataClass::MdString => AnyValue::MdString(md),
                        MetadataClass::Generic => AnyValue::Metadata(md),
                    }
                }
                ValueKind::LLVMInlineAsmValueKind => AnyValue::InlineAsm(InlineAsm::from_raw_unchecked(raw)),
                ValueKind::LLVMInstructionValueKind => {
                    AnyValue::Instruction(AnyInstruction::from(Instruction::from_raw_unchecked(raw)))
                }
                ValueKind::LLVMPoisonValueKind => AnyValue::Poison(Constant::from_raw_unchecked(raw)),
                other if value.is_constant() => {
                    log::warn!("unmapped constant kind {other:?}, using generic Constant");
                    AnyValue::Constant(Constant::from_raw_unchecked(raw))
                }
                other => {
                    log::warn!("unmapped value kind {other:?}, using generic Value");
                    AnyValue::Other(value)
                }
            }
        }
    }
}

impl<'ctx> AnyValue<'ctx> {
    pub fn as_value(self) -> Value<'ctx> {
        match self {
            AnyValue::Argument(v) => v.as_value(),
            AnyValue::BasicBlock(b) => b.as_value(),
            AnyValue::Function(v) => v.as_value(),
            AnyValue::GlobalAlias(v) => v.as_value(),
            AnyValue::GlobalIFunc(v) => v.as_value(),
            AnyValue::GlobalVariable(v) => v.as_value(),
            AnyValue::ConstantExpr(v)
            | AnyValue::ConstantArray(v)
            | AnyValue::ConstantStruct(v)
            | AnyValue::ConstantVector(v)
            | AnyValue::Undef(v)
            | AnyValue::Constant(v)
            | AnyValue::Poison(v) => v.as_value(),
            AnyValue::ConstantDataArray(v) | AnyValue::ConstantDataVector(v) => v.as_value(),
            AnyValue::ConstantInt(v) => v.as_value(),
            AnyValue::ConstantFp(v) => v.as_value(),
            AnyValue::MdNode(v) | AnyValue::MdString(v) | AnyValue::Metadata(v) => v.as_value(),
            AnyValue::InlineAsm(v) => v.as_value(),
            AnyValue::Instruction(i) => i.as_instruction().as_value(),
            AnyValue::Other(v) => v,
        }
    }

    /// Name of the wrapper class this kind maps to.
    pub fn class_name(&self) -> &'static str {
        match self {
            AnyValue::Argument(_) => "Argument",
            AnyValue::BasicBlock(_) => "BasicBlockValue",
            AnyValue::Function(_) => "Function",
            AnyValue::GlobalAlias(_) => "GlobalAlias",
            AnyValue::GlobalIFunc(_) => "GlobalIFunc",
            AnyValue::GlobalVariable(_) => "GlobalVariable",
            AnyValue::ConstantExpr(_) => "ConstantExpr",
            AnyValue::ConstantArray(_) => "ConstantArray",
            AnyValue::ConstantStruct(_) => "ConstantStruct",
            AnyValue::ConstantVector(_) => "ConstantVector",
            AnyValue::Undef(_) => "UndefValue",
            AnyValue::ConstantDataArray(_) => "ConstantDataArray",
            AnyValue::ConstantDataVector(_) => "ConstantDataVector",
            AnyValue::ConstantInt(_) => "ConstantInt",
            AnyValue::ConstantFp(_) => "ConstantFP",
            AnyValue::Constant(_) => "Constant",
            AnyValue::MdNode(_) => "MDNodeValue",
            AnyValue::MdString(_) => "MDStringValue",
            AnyValue::Metadata(_) => "MetadataAsValue",
            AnyValue::InlineAsm(_) => "InlineAsm",
            AnyValue::Instruction(i) => i.class_name(),
            AnyValue::Poison(_) => "PoisonValue",
            AnyValue::Other(_) => "Value",
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(
            self,
            AnyValue::Function(_)
                | AnyValue::GlobalAlias(_)
                | AnyValue::GlobalIFunc(_)
                | AnyValue::GlobalVariable(_)
                | AnyValue::ConstantExpr(_)
                | AnyValue::ConstantArray(_)
                | AnyValue::ConstantStruct(_)
                | AnyValue::ConstantVector(_)
                | AnyValue::Undef(_)
                | AnyValue::ConstantDataArray(_)
                | AnyValue::ConstantDataVector(_)
                | AnyValue::ConstantInt(_)
                | AnyValue::ConstantFp(_)
                | AnyValue::Constant(_)
                | AnyValue::Poison(_)
        )
    }

    pub fn is_global_value(&self) -> bool {
        matches!(
            self,
            AnyValue::Function(_)
                | AnyValue::GlobalAlias(_)
                | AnyValue::GlobalIFunc(_)
                | AnyValue::GlobalVariable(_)
        )
    }

    pub fn is_instruction(&self) -> bool {
        matches!(self, AnyValue::Instruction(_))
    }

    pub fn is_metadata(&self) -> bool {
        matches!(self, AnyValue::MdNode(_) | AnyValue::MdString(_) | AnyValue::Metadata(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_constant_dispatch() {
        init();
        let ctx = Context::create().unwrap();
        let i32_ty = ctx.i32_type();
        let cases: Vec<(Value<'_>, &str)> = vec![
            (i32_ty.const_int(7, false).as_value(), "ConstantInt"),
            (ctx.f64_type().const_real(1.0).as_value(), "ConstantFP"),
            (i32_ty.undef(), "UndefValue"),
            (i32_ty.poison(), "PoisonValue"),
            (ctx.ptr_type(0).const_pointer_null().as_value(), "Constant"),
            (ctx.struct_type(&[i32_ty.as_type()], false).const_null().as_value(), "Constant"),
            (ctx.const_string(b"hi", true).as_value(), "ConstantDataArray"),
            (
                ctx.const_struct(&[i32_ty.const_int(1, false).as_value(), ctx.ptr_type(0).const_pointer_null().as_value()], false)
                    .as_value(),
                "ConstantStruct",
            ),
            (ctx.metadata_as_value(ctx.md_string("x")).as_value(), "MDStringValue"),
            (ctx.metadata_as_value(ctx.md_node(&[])).as_value(), "MDNodeValue"),
        ];
        for (value, expected) in cases {
            assert_eq!(value.classify().class_name(), expected, "{value}");
            assert_eq!(value.classify().as_value(), value);
        }
    }

    #[test]
    fn test_names_and_view_conversion() {
        init();
        let ctx = Context::create().unwrap();
        let module = ctx.create_module("names").unwrap();
        let fn_ty = ctx.void_type().fn_type(&[ctx.i32_type().as_type()], false);
        let function = module.add_function("f", fn_ty).unwrap();
        let param = function.param(0).unwrap();
        assert_eq!(param.name(), "");
        param.set_name("count");
        assert_eq!(param.name(), "count");
        assert_eq!(param.parent(), function);
        assert!(param.next_param().is_none());

        let value = param.as_value();
        assert!(Argument::try_from(value).is_ok());
        let err = ConstantInt::try_from(value).unwrap_err();
        assert_eq!(
            err,
            crate::error::LlvmError::KindMismatch {
                expected: "ConstantInt",
                found: "Argument"
            }
        );
    }

    #[test]
    fn test_null_and_operands() {
        init();
        let ctx = Context::create().unwrap();
        let zero = ctx.i64_type().const_int(0, false);
        assert!(zero.is_null());
        assert!(zero.is_constant());
        assert!(!ctx.i64_type().const_int(3, false).is_null());
        assert_eq!(zero.operand_count(), 0);
        assert!(zero.operand(0).is_none());
    }
}
