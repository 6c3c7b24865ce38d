//! Command-line front end over the llvm-capi handle layer.
//!
//! Reads textual IR or bitcode, prints what the kind dispatch sees, and drives the linker,
//! verifier, code generator and disassembler.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use llvm_capi::disassembler::{DisasmContext, DisasmOptions};
use llvm_capi::enums::{CodeGenFileType, CodeGenOptLevel, CodeModel, RelocMode};
use llvm_capi::pass_manager::{run_passes, PassBuilderOptions};
use llvm_capi::target::initialize_all_targets;
use llvm_capi::target_machine::{default_triple, normalize_triple, Target, TargetMachine};
use llvm_capi::{linker, Context, LlvmError, LlvmResult, MemoryBuffer, Module};
use log::LevelFilter;
use std::io::Write;
use std::path::{Path, PathBuf};

const BITCODE_MAGIC: [u8; 4] = [b'B', b'C', 0xc0, 0xde];
const BITCODE_WRAPPER_MAGIC: [u8; 4] = [0xde, 0xc0, 0x17, 0x0b];

#[derive(Parser, Debug)]
#[clap(version, about = "Inspect, link and compile LLVM IR through the LLVM C API")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List functions, globals and instructions with their dispatched kinds.
    Inspect(InputArgs),
    /// Run the module verifier.
    Verify(InputArgs),
    /// Parse a module and print it back as textual IR or bitcode.
    Print(PrintArgs),
    /// Link several modules into one.
    Link(LinkArgs),
    /// Compile a module to an object file or assembly.
    Emit(EmitArgs),
    /// Disassemble hex-encoded machine code.
    Disasm(DisasmArgs),
    /// List the registered targets.
    Targets,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Textual IR or bitcode file, `-` for stdin.
    input: PathBuf,
}

#[derive(Args, Debug)]
struct PrintArgs {
    input: PathBuf,
    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write bitcode instead of text (needs --output).
    #[arg(long, requires = "output")]
    bitcode: bool,
}

#[derive(Args, Debug)]
struct LinkArgs {
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,
    #[arg(short, long)]
    output: PathBuf,
    #[arg(long)]
    bitcode: bool,
}

#[derive(Args, Debug)]
struct EmitArgs {
    input: PathBuf,
    #[arg(short, long)]
    output: PathBuf,
    /// Target triple; the module's own or the host's when omitted.
    #[arg(long)]
    triple: Option<String>,
    #[arg(long, default_value = "")]
    cpu: String,
    #[arg(long, default_value = "")]
    features: String,
    #[arg(short = 'O', long = "opt-level", value_enum, default_value_t = OptLevel::O2)]
    opt_level: OptLevel,
    #[arg(long, value_enum, default_value_t = Reloc::Default)]
    reloc: Reloc,
    #[arg(long = "code-model", value_enum, default_value_t = Model::Default)]
    code_model: Model,
    #[arg(long = "filetype", value_enum, default_value_t = FileKind::Obj)]
    file_type: FileKind,
    /// New pass manager pipeline to run before emission, e.g. `default<O2>`.
    #[arg(long)]
    passes: Option<String>,
}

#[derive(Args, Debug)]
struct DisasmArgs {
    #[arg(long)]
    triple: Option<String>,
    #[arg(long, default_value = "")]
    cpu: String,
    /// Address of the first byte.
    #[arg(long, default_value_t = 0, value_parser = parse_address)]
    pc: u64,
    /// Use the alternate assembly dialect (Intel syntax on x86).
    #[arg(long)]
    intel: bool,
    /// Bytes in hex, e.g. `55 4889e5 c3`.
    #[arg(required = true, num_args = 1..)]
    bytes: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OptLevel {
    #[value(name = "0")]
    O0,
    #[value(name = "1")]
    O1,
    #[value(name = "2")]
    O2,
    #[value(name = "3")]
    O3,
}

impl From<OptLevel> for CodeGenOptLevel {
    fn from(level: OptLevel) -> Self {
        match level {
            OptLevel::O0 => CodeGenOptLevel::None,
            OptLevel::O1 => CodeGenOptLevel::Less,
            OptLevel::O2 => CodeGenOptLevel::Default,
            OptLevel::O3 => CodeGenOptLevel::Aggressive,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Reloc {
    Default,
    Static,
    Pic,
    DynamicNoPic,
}

impl From<Reloc> for RelocMode {
    fn from(reloc: Reloc) -> Self {
        match reloc {
            Reloc::Default => RelocMode::Default,
            Reloc::Static => RelocMode::Static,
            Reloc::Pic => RelocMode::Pic,
            Reloc::DynamicNoPic => RelocMode::DynamicNoPic,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Model {
    Default,
    Tiny,
    Small,
    Kernel,
    Medium,
    Large,
}

impl From<Model> for CodeModel {
    fn from(model: Model) -> Self {
        match model {
            Model::Default => CodeModel::Default,
            Model::Tiny => CodeModel::Tiny,
            Model::Small => CodeModel::Small,
            Model::Kernel => CodeModel::Kernel,
            Model::Medium => CodeModel::Medium,
            Model::Large => CodeModel::Large,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FileKind {
    Obj,
    Asm,
}

impl From<FileKind> for CodeGenFileType {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Obj => CodeGenFileType::Object,
            FileKind::Asm => CodeGenFileType::Assembly,
        }
    }
}

fn parse_address(text: &str) -> Result<u64, String> {
    let parsed = match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => text.parse(),
    };
    parsed.map_err(|e| format!("bad address `{text}`: {e}"))
}

fn parse_hex(words: &[String]) -> LlvmResult<Vec<u8>> {
    let digits: String = words
        .iter()
        .flat_map(|w| w.split_whitespace())
        .map(|w| w.trim_start_matches("0x"))
        .collect();
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(LlvmError::Message {
            operation: "parse_hex",
            message: format!("expected pairs of hex digits, got `{digits}`"),
        });
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|e| LlvmError::Message {
                operation: "parse_hex",
                message: format!("`{}`: {e}", &digits[i..i + 2]),
            })
        })
        .collect()
}

fn load_module(context: &Context, path: &Path) -> LlvmResult<Module> {
    let buffer = if path == Path::new("-") {
        MemoryBuffer::create_from_stdin()?
    } else {
        MemoryBuffer::create_from_file(path)?
    };
    let bytes = buffer.as_bytes();
    let module = if bytes.starts_with(&BITCODE_MAGIC) || bytes.starts_with(&BITCODE_WRAPPER_MAGIC) {
        context.parse_bitcode(&buffer)?
    } else {
        context.parse_ir(buffer)?
    };
    log::info!("loaded {}", path.display());
    Ok(module)
}

fn write_stdout(bytes: &[u8]) -> LlvmResult<()> {
    std::io::stdout().write_all(bytes).map_err(|e| LlvmError::Io {
        path: String::from("<stdout>"),
        message: e.to_string(),
    })
}

fn write_module(module: &Module, output: Option<&Path>, bitcode: bool) -> LlvmResult<()> {
    match output {
        Some(path) if bitcode => module.write_bitcode_to_file(path),
        Some(path) => module.print_to_file(path),
        None => write_stdout(module.print_to_string().as_bytes()),
    }
}

fn run_inspect(args: &InputArgs) -> LlvmResult<()> {
    let context = Context::create()?;
    let module = load_module(&context, &args.input)?;
    println!("module `{}` ({})", module.identifier(), module.target_triple());
    for global in module.globals() {
        println!(
            "{} @{}: {:?}",
            global.as_value().classify().class_name(),
            global.name(),
            global.as_global_value().linkage()
        );
    }
    for function in module.functions() {
        let global = function.as_global_value();
        let what = if global.is_declaration() { "declare" } else { "define" };
        println!("{what} @{} ({} blocks)", function.name(), function.count_basic_blocks());
        for block in function.basic_blocks() {
            println!("  {}:", block.name());
            for inst in block.instructions() {
                println!("    {:<20} {}", inst.classify().class_name(), inst.print_to_string().trim());
            }
        }
    }
    Ok(())
}

fn run_verify(args: &InputArgs) -> LlvmResult<()> {
    let context = Context::create()?;
    let module = load_module(&context, &args.input)?;
    module.verify()?;
    println!("{}: ok", args.input.display());
    Ok(())
}

fn run_print(args: &PrintArgs) -> LlvmResult<()> {
    let context = Context::create()?;
    let module = load_module(&context, &args.input)?;
    write_module(&module, args.output.as_deref(), args.bitcode)
}

fn run_link(args: &LinkArgs) -> LlvmResult<()> {
    let context = Context::create()?;
    let (first, rest) = args.inputs.split_first().ok_or(LlvmError::Link {
        message: String::from("no input modules"),
    })?;
    let dest = load_module(&context, first)?;
    for path in rest {
        let src = load_module(&context, path)?;
        linker::link(&dest, src)?;
    }
    dest.verify()?;
    write_module(&dest, Some(&args.output), args.bitcode)
}

fn run_emit(args: &EmitArgs) -> LlvmResult<()> {
    initialize_all_targets();
    let context = Context::create()?;
    let module = load_module(&context, &args.input)?;
    let triple = match &args.triple {
        Some(triple) => normalize_triple(triple)?,
        None if !module.target_triple().is_empty() => module.target_triple(),
        None => default_triple(),
    };
    let target = Target::from_triple(&triple)?;
    let machine = TargetMachine::create(
        target,
        &triple,
        &args.cpu,
        &args.features,
        args.opt_level.into(),
        args.reloc.into(),
        args.code_model.into(),
    )?;
    machine.configure_module(&module)?;
    if let Some(pipeline) = &args.passes {
        run_passes(&module, pipeline, Some(&machine), &PassBuilderOptions::new())?;
    }
    module.verify()?;
    machine.emit_to_file(&module, args.file_type.into(), &args.output)?;
    log::info!("wrote {} for {triple}", args.output.display());
    Ok(())
}

fn run_disasm(args: &DisasmArgs) -> LlvmResult<()> {
    initialize_all_targets();
    let bytes = parse_hex(&args.bytes)?;
    let triple = args.triple.clone().unwrap_or_else(default_triple);
    let disasm = DisasmContext::create_with_cpu(&triple, &args.cpu)?;
    if args.intel {
        disasm.set_options(DisasmOptions {
            asm_printer_variant: true,
            ..DisasmOptions::default()
        })?;
    }
    for item in disasm.disassemble(&bytes, args.pc) {
        let offset = (item.address - args.pc) as usize;
        let encoded: Vec<String> = bytes[offset..offset + item.size]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        match item.text {
            Some(text) => println!("{:#010x}: {:<24} {text}", item.address, encoded.join(" ")),
            None => println!("{:#010x}: {:<24} <invalid>", item.address, encoded.join(" ")),
        }
    }
    Ok(())
}

fn run_targets() -> LlvmResult<()> {
    initialize_all_targets();
    println!("default triple: {}", default_triple());
    for target in Target::all() {
        let mut caps = Vec::new();
        if target.has_jit() {
            caps.push("jit");
        }
        if target.has_target_machine() {
            caps.push("codegen");
        }
        if target.has_asm_backend() {
            caps.push("asm");
        }
        println!("{:<16} {:<40} [{}]", target.name(), target.description(), caps.join(", "));
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    let result = match &cli.command {
        Command::Inspect(args) => run_inspect(args),
        Command::Verify(args) => run_verify(args),
        Command::Print(args) => run_print(args),
        Command::Link(args) => run_link(args),
        Command::Emit(args) => run_emit(args),
        Command::Disasm(args) => run_disasm(args),
        Command::Targets => run_targets(),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
