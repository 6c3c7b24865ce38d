//! Kind dispatch over parsed IR: every opaque ref comes back as its most specific view.

use llvm_capi::ir_reader::parse_assembly;
use llvm_capi::types::AnyType;
use llvm_capi::values::{AnyInstruction, AnyValue, Instruction, Value};
use llvm_capi::{Context, LlvmError, Module};

const KINDS: &str = r#"
%pair = type { i32, double }

@counter = global i32 0
@table = constant [3 x i32] [i32 1, i32 2, i32 3]
@greeting = private constant [6 x i8] c"hello\00"
@alias = alias i32, ptr @counter

declare void @sink(ptr)

define double @walk(ptr %p, i32 %n, i1 %c) {
entry:
  %slot = alloca %pair
  %f = getelementptr inbounds %pair, ptr %slot, i32 0, i32 1
  store double 1.5, ptr %f
  %v = load double, ptr %f
  %old = atomicrmw add ptr @counter, i32 %n seq_cst
  %agg = insertvalue %pair undef, i32 %old, 0
  %x = extractvalue %pair %agg, 0
  %cmp = icmp slt i32 %x, 10
  %fc = fcmp olt double %v, 2.0
  br i1 %c, label %left, label %right

left:
  call void @sink(ptr @greeting)
  br label %join

right:
  switch i32 %n, label %join [ i32 0, label %left ]

join:
  %r = phi double [ %v, %left ], [ 0.0, %right ]
  fence acquire
  ret double %r
}
"#;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn instructions(module: &Module, name: &str) -> Vec<String> {
    let function = module.get_function(name).unwrap().unwrap();
    function
        .basic_blocks()
        .flat_map(|b| b.instructions())
        .map(|i| i.classify().class_name().to_string())
        .collect()
}

#[test]
fn test_instruction_classes() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, KINDS).unwrap();
    assert_eq!(
        instructions(&module, "walk"),
        vec![
            "AllocaInst",
            "GetElementPtrInst",
            "StoreInst",
            "LoadInst",
            "AtomicRMWInst",
            "InsertValueInst",
            "ExtractValueInst",
            "ICmpInst",
            "FCmpInst",
            "BranchInst",
            "CallInst",
            "BranchInst",
            "SwitchInst",
            "PHINode",
            "FenceInst",
            "ReturnInst",
        ]
    );
}

#[test]
fn test_global_and_constant_classes() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, KINDS).unwrap();

    let classes: Vec<&str> = module
        .globals()
        .map(|g| g.as_value().classify().class_name())
        .collect();
    assert_eq!(classes, vec!["GlobalVariable"; 3]);

    let table = module.get_global("table").unwrap().unwrap();
    let init = table.initializer().unwrap();
    assert_eq!(init.as_value().classify().class_name(), "ConstantDataArray");
    let counter = module.get_global("counter").unwrap().unwrap();
    assert!(matches!(
        counter.initializer().unwrap().as_value().classify(),
        AnyValue::ConstantInt(_) | AnyValue::Constant(_)
    ));

    let alias = module.get_alias("alias").unwrap();
    assert_eq!(alias.as_value().classify().class_name(), "GlobalAlias");
    assert_eq!(alias.aliasee().as_value(), counter.as_value());

    let sink = module.get_function("sink").unwrap().unwrap();
    assert!(sink.as_value().classify().is_global_value());
    assert!(sink.as_global_value().is_declaration());
}

#[test]
fn test_operands_dispatch_to_their_kinds() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, KINDS).unwrap();
    let walk = module.get_function("walk").unwrap().unwrap();

    let store = walk
        .basic_blocks()
        .flat_map(|b| b.instructions())
        .find(|i| matches!(i.classify(), AnyInstruction::Store(_)))
        .unwrap();
    let operands: Vec<&str> = store
        .operands()
        .into_iter()
        .flatten()
        .map(|v| v.classify().class_name())
        .collect();
    assert_eq!(operands, vec!["ConstantFP", "GetElementPtrInst"]);

    let arguments: Vec<&str> = walk.params().map(|a| a.as_value().classify().class_name()).collect();
    assert_eq!(arguments, vec!["Argument"; 3]);

    let call = walk
        .basic_blocks()
        .flat_map(|b| b.instructions())
        .find_map(|i| match i.classify() {
            AnyInstruction::Call(call) => Some(call),
            _ => None,
        })
        .unwrap();
    assert_eq!(call.arg_count(), 1);
    assert_eq!(call.arg(0).unwrap().classify().class_name(), "GlobalVariable");
}

#[test]
fn test_types_dispatch() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, KINDS).unwrap();
    let pair = module.get_type_by_name("pair").unwrap().unwrap();
    match pair.classify() {
        AnyType::Struct(st) => {
            assert_eq!(st.count_fields(), 2);
            let fields: Vec<&str> = st.field_types().into_iter().map(|t| t.classify().class_name()).collect();
            assert_eq!(fields, vec!["IntType", "RealType"]);
        }
        other => panic!("expected a struct, got {other:?}"),
    }
    let walk = module.get_function("walk").unwrap().unwrap();
    assert!(matches!(walk.function_type().as_type().classify(), AnyType::Function(_)));
}

#[test]
fn test_wrong_view_is_a_kind_mismatch() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, KINDS).unwrap();
    let counter: Value<'_> = module.get_global("counter").unwrap().unwrap().as_value();
    match Instruction::try_from(counter) {
        Err(LlvmError::KindMismatch { expected, .. }) => assert_eq!(expected, "Instruction"),
        other => panic!("expected KindMismatch, got {other:?}"),
    }
}

const EXOTIC: &str = r#"
@a = global i32 1
@b = global i32 2
@ptrs = global [2 x ptr] [ptr @a, ptr @b]
@vptrs = global <2 x ptr> <ptr @a, ptr @b>
@lanes = global <4 x i32> <i32 1, i32 2, i32 3, i32 4>
@offset = global ptr getelementptr (i8, ptr @a, i64 1)
@target = global ptr blockaddress(@jump, %second)

declare i32 @__gxx_personality_v0(...)
declare i32 @__CxxFrameHandler3(...)
declare void @may_throw()
declare void @use_ext(target("llvm.capi.ext"))

define void @unwinds() personality ptr @__gxx_personality_v0 {
entry:
  invoke void @may_throw() to label %ok unwind label %lpad

ok:
  ret void

lpad:
  %lp = landingpad { ptr, i32 } cleanup
  resume { ptr, i32 } %lp
}

define void @funclets() personality ptr @__CxxFrameHandler3 {
entry:
  invoke void @may_throw() to label %done unwind label %dispatch

dispatch:
  %cs = catchswitch within none [label %handler] unwind label %cleanup

handler:
  %cp = catchpad within %cs [ptr null, i32 64, ptr null]
  catchret from %cp to label %done

cleanup:
  %cl = cleanuppad within none []
  cleanupret from %cl unwind to caller

done:
  ret void
}

define <4 x i32> @vectors(<4 x i32> %v, ptr %p, i32 %old, i32 %new) {
entry:
  %reversed = shufflevector <4 x i32> %v, <4 x i32> poison, <4 x i32> <i32 3, i32 2, i32 1, i32 0>
  %swapped = cmpxchg ptr %p, i32 %old, i32 %new seq_cst seq_cst
  call void asm sideeffect "nop", ""()
  ret <4 x i32> %reversed
}

define i32 @jump(ptr %dest) {
entry:
  indirectbr ptr %dest, [label %first, label %second]

first:
  ret i32 1

second:
  ret i32 2
}
"#;

#[test]
fn test_exception_and_vector_instruction_classes() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, EXOTIC).unwrap();

    assert_eq!(
        instructions(&module, "unwinds"),
        vec!["InvokeInst", "ReturnInst", "LandingPadInst", "Instruction"]
    );
    assert_eq!(
        instructions(&module, "funclets"),
        vec![
            "InvokeInst",
            "CatchSwitchInst",
            "CatchPadInst",
            "Instruction",
            "Instruction",
            "CleanupReturnInst",
            "ReturnInst",
        ]
    );
    assert_eq!(
        instructions(&module, "vectors"),
        vec!["ShuffleVectorInst", "AtomicCmpXchgInst", "CallInst", "ReturnInst"]
    );
    assert_eq!(
        instructions(&module, "jump"),
        vec!["IndirectBrInst", "ReturnInst", "ReturnInst"]
    );

    let invoke = module
        .get_function("unwinds")
        .unwrap()
        .unwrap()
        .entry_block()
        .unwrap()
        .instructions()
        .next()
        .unwrap();
    assert!(matches!(invoke.classify(), AnyInstruction::Invoke(_)));
    assert!(invoke.classify().is_terminator());
}

#[test]
fn test_aggregate_and_expression_constants() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, EXOTIC).unwrap();
    let initializer = |name: &str| {
        module
            .get_global(name)
            .unwrap()
            .unwrap()
            .initializer()
            .unwrap()
            .as_value()
            .classify()
    };

    assert!(matches!(initializer("ptrs"), AnyValue::ConstantArray(_)));
    assert!(matches!(initializer("vptrs"), AnyValue::ConstantVector(_)));
    assert!(matches!(initializer("lanes"), AnyValue::ConstantDataVector(_)));
    assert!(matches!(initializer("offset"), AnyValue::ConstantExpr(_)));
    // Block addresses have no dedicated view and fall back to the generic constant.
    let target = initializer("target");
    assert!(matches!(target, AnyValue::Constant(_)));
    assert!(target.is_constant());

    let classes: Vec<&str> = ["ptrs", "vptrs", "lanes", "offset"]
        .into_iter()
        .map(|name| initializer(name).class_name())
        .collect();
    assert_eq!(
        classes,
        vec!["ConstantArray", "ConstantVector", "ConstantDataVector", "ConstantExpr"]
    );
}

#[test]
fn test_block_inline_asm_and_target_ext_operands() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, EXOTIC).unwrap();

    let jump = module.get_function("jump").unwrap().unwrap();
    let indirect = jump.entry_block().unwrap().instructions().next().unwrap();
    let labels: Vec<&str> = indirect
        .operands()
        .into_iter()
        .flatten()
        .skip(1)
        .map(|v| v.classify().class_name())
        .collect();
    assert_eq!(labels, vec!["BasicBlockValue"; 2]);
    let first = indirect.operands().into_iter().flatten().nth(1).unwrap();
    assert!(matches!(first.classify(), AnyValue::BasicBlock(_)));

    let vectors = module.get_function("vectors").unwrap().unwrap();
    let call = vectors
        .basic_blocks()
        .flat_map(|b| b.instructions())
        .find_map(|i| match i.classify() {
            AnyInstruction::Call(call) => Some(call),
            _ => None,
        })
        .unwrap();
    match call.called_value().classify() {
        AnyValue::InlineAsm(_) => {}
        other => panic!("expected inline asm, got {}", other.class_name()),
    }

    let use_ext = module.get_function("use_ext").unwrap().unwrap();
    let params = use_ext.function_type().param_types();
    assert_eq!(params.len(), 1);
    assert!(matches!(params[0].classify(), AnyType::TargetExt(_)));
    assert_eq!(params[0].classify().class_name(), "TargetExtType");
}
