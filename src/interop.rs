// Interop with inkwell. Both crates sit on the same LLVM, so an inkwell value, type or block
// is viewed here without copying and the view keeps the inkwell lifetime. Contexts and modules
// owned by inkwell come back inside Borrowed guards: they are wrapped unowned, never disposed,
// never handed to LLVM (linking them, or building a function pass manager over them, fails with
// NotOwned), and no owning handle is created inside an inkwell context.

//! Borrowing IR built with inkwell as llvm-capi views.

use crate::basic_block::BasicBlock;
use crate::context::Context;
use crate::module::Module;
use crate::types::Type;
use crate::values::Value;
use inkwell::types::AsTypeRef;
use inkwell::values::AsValueRef;

pub use crate::handle::Borrowed;

/// View any inkwell value (`IntValue`, `FunctionValue`, `InstructionValue`, ...).
pub fn value<'ctx, V>(value: V) -> Value<'ctx>
where
    V: inkwell::values::AnyValue<'ctx>,
{
    unsafe { Value::from_raw(value.as_value_ref()) }
}

/// View any inkwell type.
pub fn ty<'ctx, T>(ty: T) -> Type<'ctx>
where
    T: inkwell::types::AnyType<'ctx>,
{
    unsafe { Type::from_raw(ty.as_type_ref()) }
}

pub fn basic_block<'ctx>(block: inkwell::basic_block::BasicBlock<'ctx>) -> BasicBlock<'ctx> {
    unsafe { BasicBlock::from_raw(block.as_mut_ptr()) }
}

/// Borrow an inkwell context. Modules cannot be created or parsed in it from this side.
pub fn context(context: &inkwell::context::Context) -> Borrowed<'_, Context> {
    Borrowed::new(unsafe { Context::from_raw_borrowed(context.raw()) })
}

/// Borrow an inkwell module. It can be inspected and verified but never consumed.
pub fn module<'m>(module: &'m inkwell::module::Module<'_>) -> Borrowed<'m, Module> {
    Borrowed::new(unsafe { Module::from_raw_borrowed(module.as_mut_ptr()) })
}
