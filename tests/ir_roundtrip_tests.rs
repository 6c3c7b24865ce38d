//! Reading and writing modules: textual IR, bitcode in memory and on disk, and bad input.

use llvm_capi::bitcode::write_bitcode_to_file;
use llvm_capi::ir_reader::{parse_assembly, parse_ir_str};
use llvm_capi::{Context, LlvmError, MemoryBuffer};
use std::path::PathBuf;

const FACTORIAL: &str = r#"
define i64 @factorial(i64 %n) {
entry:
  %is_zero = icmp eq i64 %n, 0
  br i1 %is_zero, label %done, label %recurse

recurse:
  %m = sub i64 %n, 1
  %sub = call i64 @factorial(i64 %m)
  %r = mul i64 %n, %sub
  ret i64 %r

done:
  ret i64 1
}
"#;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("llvm-capi-{}-{name}", std::process::id()))
}

#[test]
fn test_text_round_trip_is_stable() {
    init();
    let ctx = Context::create().unwrap();
    let first = parse_ir_str(&ctx, FACTORIAL, "factorial.ll").unwrap();
    first.verify().unwrap();
    let printed = first.print_to_string();
    assert!(printed.contains("define i64 @factorial(i64 %n)"));

    let second = parse_ir_str(&ctx, &printed, "factorial.ll").unwrap();
    assert_eq!(second.print_to_string(), printed);
}

#[test]
fn test_bitcode_round_trip_in_memory() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, FACTORIAL).unwrap();
    let bitcode = module.write_bitcode_to_memory_buffer().unwrap();
    assert!(bitcode.as_bytes().starts_with(b"BC"));

    let eager = ctx.parse_bitcode(&bitcode).unwrap();
    assert_eq!(
        eager.get_function("factorial").unwrap().unwrap().count_basic_blocks(),
        3
    );

    // A fresh context and a lazily materialized module see the same function.
    let other = Context::create().unwrap();
    let lazy = other.lazy_bitcode_module(bitcode.clone()).unwrap_err();
    assert!(matches!(lazy, LlvmError::StillShared { .. }));
    let copy = MemoryBuffer::create_from_bytes(bitcode.as_bytes(), "copy.bc").unwrap();
    let lazy = other.lazy_bitcode_module(copy).unwrap();
    assert!(lazy.get_function("factorial").unwrap().is_some());
}

#[test]
fn test_files_on_disk() {
    init();
    let ctx = Context::create().unwrap();
    let module = parse_assembly(&ctx, FACTORIAL).unwrap();

    let ll = scratch("factorial.ll");
    module.print_to_file(&ll).unwrap();
    let reread = ctx.parse_ir(MemoryBuffer::create_from_file(&ll).unwrap()).unwrap();
    assert!(reread.get_function("factorial").unwrap().is_some());

    let bc = scratch("factorial.bc");
    write_bitcode_to_file(&module, &bc).unwrap();
    let buffer = MemoryBuffer::create_from_file(&bc).unwrap();
    let reread = ctx.parse_bitcode(&buffer).unwrap();
    reread.verify().unwrap();

    let _ = std::fs::remove_file(ll);
    let _ = std::fs::remove_file(bc);
}

#[test]
fn test_malformed_ir_reports_the_parser_message() {
    init();
    let ctx = Context::create().unwrap();
    match parse_ir_str(&ctx, "define i32 @broken( {\n", "broken.ll") {
        Err(LlvmError::ParseIr { message }) => assert!(!message.is_empty()),
        other => panic!("expected ParseIr, got {other:?}"),
    }
}

#[test]
fn test_malformed_bitcode_reports_diagnostics() {
    init();
    let ctx = Context::create().unwrap();
    let junk = MemoryBuffer::create_from_bytes(b"BC\xc0\xde garbage that is not bitcode", "junk.bc").unwrap();
    match ctx.parse_bitcode(&junk) {
        Err(LlvmError::Bitcode { message }) => assert!(!message.is_empty()),
        other => panic!("expected Bitcode, got {other:?}"),
    }
    // The failed read drained the sink.
    assert!(ctx.take_diagnostics().is_empty());

    let junk = MemoryBuffer::create_from_bytes(b"not bitcode at all", "junk.bc").unwrap();
    assert!(matches!(ctx.lazy_bitcode_module(junk), Err(LlvmError::Bitcode { .. })));
}

#[test]
fn test_missing_file_is_io_error() {
    init();
    let missing = scratch("does-not-exist.ll");
    match MemoryBuffer::create_from_file(&missing) {
        Err(LlvmError::Io { path, message }) => {
            assert_eq!(path, missing.display().to_string());
            assert!(!message.is_empty());
        }
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn test_verifier_rejects_bad_module() {
    init();
    let ctx = Context::create().unwrap();
    // An empty block has no terminator.
    let module = ctx.create_module("bad").unwrap();
    let fn_ty = ctx.fn_type(ctx.void_type(), &[], false);
    let function = module.add_function("no_terminator", fn_ty).unwrap();
    ctx.append_basic_block(function, "entry").unwrap();
    match module.verify() {
        Err(LlvmError::Verify { message }) => assert!(message.contains("no_terminator")),
        other => panic!("expected Verify, got {other:?}"),
    }
}
