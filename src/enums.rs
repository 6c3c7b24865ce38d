// This module mirrors the small llvm-c enums as Rust enums with conversions in both
// directions. The llvm_enum! macro generates the enum, an ALL table and the conversions: a
// total mapping implements From in both directions, a partial mapping (for enums that grow
// between LLVM releases, such as atomic RMW operations and binary file types) converts back
// through from_llvm returning None for values this crate does not name. Calling conventions are
// plain integers in the C API, so CallConv carries explicit discriminants instead. The three
// large, version-dependent enums (opcode, type kind, value kind) are re-exported from llvm-sys
// unchanged; the kind-dispatch factories match on them with a generic fallback.

//! Rust mirrors of `llvm-c` enums.

use llvm_sys::analysis::LLVMVerifierFailureAction;
use llvm_sys::linker::LLVMLinkerMode;
use llvm_sys::object::LLVMBinaryType;
use llvm_sys::target::LLVMByteOrdering;
use llvm_sys::target_machine::{LLVMCodeGenFileType, LLVMCodeGenOptLevel, LLVMCodeModel, LLVMRelocMode};
use llvm_sys::{
    LLVMAtomicOrdering, LLVMAtomicRMWBinOp, LLVMDLLStorageClass, LLVMDiagnosticSeverity,
    LLVMInlineAsmDialect, LLVMIntPredicate, LLVMLandingPadClauseTy, LLVMLinkage,
    LLVMModuleFlagBehavior, LLVMRealPredicate, LLVMTailCallKind, LLVMThreadLocalMode,
    LLVMUnnamedAddr, LLVMVisibility,
};

pub use llvm_sys::{LLVMOpcode as Opcode, LLVMTypeKind as TypeKind, LLVMValueKind as ValueKind};

macro_rules! llvm_enum {
    (@decl $(#[$meta:meta])* $name:ident : $llvm:ident { $($(#[$vmeta:meta])* $variant:ident = $lv:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl From<$name> for $llvm {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $llvm::$lv),+
                }
            }
        }
    };
    (total $(#[$meta:meta])* $name:ident : $llvm:ident { $($body:tt)* }) => {
        llvm_enum!(@decl $(#[$meta])* $name : $llvm { $($body)* });
        llvm_enum!(@from_total $name : $llvm { $($body)* });
    };
    (partial $(#[$meta:meta])* $name:ident : $llvm:ident { $($body:tt)* }) => {
        llvm_enum!(@decl $(#[$meta])* $name : $llvm { $($body)* });
        llvm_enum!(@from_partial $name : $llvm { $($body)* });
    };
    (@from_total $name:ident : $llvm:ident { $($(#[$vmeta:meta])* $variant:ident = $lv:ident),+ $(,)? }) => {
        impl From<$llvm> for $name {
            fn from(value: $llvm) -> Self {
                match value {
                    $($llvm::$lv => $name::$variant),+
                }
            }
        }
    };
    (@from_partial $name:ident : $llvm:ident { $($(#[$vmeta:meta])* $variant:ident = $lv:ident),+ $(,)? }) => {
        impl $name {
            /// Convert from the raw LLVM value; `None` for values newer than this crate.
            #[allow(unreachable_patterns)]
            pub fn from_llvm(value: $llvm) -> Option<Self> {
                match value {
                    $($llvm::$lv => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

llvm_enum!(total
    /// Linkage of a global value.
    Linkage: LLVMLinkage {
        External = LLVMExternalLinkage,
        AvailableExternally = LLVMAvailableExternallyLinkage,
        LinkOnceAny = LLVMLinkOnceAnyLinkage,
        LinkOnceOdr = LLVMLinkOnceODRLinkage,
        LinkOnceOdrAutoHide = LLVMLinkOnceODRAutoHideLinkage,
        WeakAny = LLVMWeakAnyLinkage,
        WeakOdr = LLVMWeakODRLinkage,
        Appending = LLVMAppendingLinkage,
        Internal = LLVMInternalLinkage,
        Private = LLVMPrivateLinkage,
        DllImport = LLVMDLLImportLinkage,
        DllExport = LLVMDLLExportLinkage,
        ExternalWeak = LLVMExternalWeakLinkage,
        Ghost = LLVMGhostLinkage,
        Common = LLVMCommonLinkage,
        LinkerPrivate = LLVMLinkerPrivateLinkage,
        LinkerPrivateWeak = LLVMLinkerPrivateWeakLinkage,
    }
);

llvm_enum!(total
    Visibility: LLVMVisibility {
        Default = LLVMDefaultVisibility,
        Hidden = LLVMHiddenVisibility,
        Protected = LLVMProtectedVisibility,
    }
);

llvm_enum!(total
    UnnamedAddr: LLVMUnnamedAddr {
        /// Address of the global is significant.
        None = LLVMNoUnnamedAddr,
        /// Address of the global is locally insignificant.
        Local = LLVMLocalUnnamedAddr,
        /// Address of the global is globally insignificant.
        Global = LLVMGlobalUnnamedAddr,
    }
);

llvm_enum!(total
    DllStorageClass: LLVMDLLStorageClass {
        Default = LLVMDefaultStorageClass,
        Import = LLVMDLLImportStorageClass,
        Export = LLVMDLLExportStorageClass,
    }
);

llvm_enum!(total
    /// Integer comparison predicate.
    IntPredicate: LLVMIntPredicate {
        Eq = LLVMIntEQ,
        Ne = LLVMIntNE,
        Ugt = LLVMIntUGT,
        Uge = LLVMIntUGE,
        Ult = LLVMIntULT,
        Ule = LLVMIntULE,
        Sgt = LLVMIntSGT,
        Sge = LLVMIntSGE,
        Slt = LLVMIntSLT,
        Sle = LLVMIntSLE,
    }
);

llvm_enum!(total
    /// Floating point comparison predicate.
    RealPredicate: LLVMRealPredicate {
        False = LLVMRealPredicateFalse,
        Oeq = LLVMRealOEQ,
        Ogt = LLVMRealOGT,
        Oge = LLVMRealOGE,
        Olt = LLVMRealOLT,
        Ole = LLVMRealOLE,
        One = LLVMRealONE,
        Ord = LLVMRealORD,
        Uno = LLVMRealUNO,
        Ueq = LLVMRealUEQ,
        Ugt = LLVMRealUGT,
        Uge = LLVMRealUGE,
        Ult = LLVMRealULT,
        Ule = LLVMRealULE,
        Une = LLVMRealUNE,
        True = LLVMRealPredicateTrue,
    }
);

llvm_enum!(total
    LandingPadClause: LLVMLandingPadClauseTy {
        Catch = LLVMLandingPadCatch,
        Filter = LLVMLandingPadFilter,
    }
);

llvm_enum!(total
    ThreadLocalMode: LLVMThreadLocalMode {
        NotThreadLocal = LLVMNotThreadLocal,
        GeneralDynamic = LLVMGeneralDynamicTLSModel,
        LocalDynamic = LLVMLocalDynamicTLSModel,
        InitialExec = LLVMInitialExecTLSModel,
        LocalExec = LLVMLocalExecTLSModel,
    }
);

llvm_enum!(total
    AtomicOrdering: LLVMAtomicOrdering {
        NotAtomic = LLVMAtomicOrderingNotAtomic,
        Unordered = LLVMAtomicOrderingUnordered,
        Monotonic = LLVMAtomicOrderingMonotonic,
        Acquire = LLVMAtomicOrderingAcquire,
        Release = LLVMAtomicOrderingRelease,
        AcquireRelease = LLVMAtomicOrderingAcquireRelease,
        SequentiallyConsistent = LLVMAtomicOrderingSequentiallyConsistent,
    }
);

llvm_enum!(partial
    /// Operation performed by an `atomicrmw` instruction.
    AtomicRmwBinOp: LLVMAtomicRMWBinOp {
        Xchg = LLVMAtomicRMWBinOpXchg,
        Add = LLVMAtomicRMWBinOpAdd,
        Sub = LLVMAtomicRMWBinOpSub,
        And = LLVMAtomicRMWBinOpAnd,
        Nand = LLVMAtomicRMWBinOpNand,
        Or = LLVMAtomicRMWBinOpOr,
        Xor = LLVMAtomicRMWBinOpXor,
        Max = LLVMAtomicRMWBinOpMax,
        Min = LLVMAtomicRMWBinOpMin,
        UMax = LLVMAtomicRMWBinOpUMax,
        UMin = LLVMAtomicRMWBinOpUMin,
        FAdd = LLVMAtomicRMWBinOpFAdd,
        FSub = LLVMAtomicRMWBinOpFSub,
        FMax = LLVMAtomicRMWBinOpFMax,
        FMin = LLVMAtomicRMWBinOpFMin,
    }
);

llvm_enum!(total
    DiagnosticSeverity: LLVMDiagnosticSeverity {
        Error = LLVMDSError,
        Warning = LLVMDSWarning,
        Remark = LLVMDSRemark,
        Note = LLVMDSNote,
    }
);

llvm_enum!(total
    InlineAsmDialect: LLVMInlineAsmDialect {
        Att = LLVMInlineAsmDialectATT,
        Intel = LLVMInlineAsmDialectIntel,
    }
);

llvm_enum!(total
    /// How module flags are merged when linking.
    ModuleFlagBehavior: LLVMModuleFlagBehavior {
        Error = LLVMModuleFlagBehaviorError,
        Warning = LLVMModuleFlagBehaviorWarning,
        Require = LLVMModuleFlagBehaviorRequire,
        Override = LLVMModuleFlagBehaviorOverride,
        Append = LLVMModuleFlagBehaviorAppend,
        AppendUnique = LLVMModuleFlagBehaviorAppendUnique,
    }
);

llvm_enum!(total
    TailCallKind: LLVMTailCallKind {
        None = LLVMTailCallKindNone,
        Tail = LLVMTailCallKindTail,
        MustTail = LLVMTailCallKindMustTail,
        NoTail = LLVMTailCallKindNoTail,
    }
);

llvm_enum!(total
    VerifierFailureAction: LLVMVerifierFailureAction {
        /// Print to stderr and abort.
        AbortProcess = LLVMAbortProcessAction,
        /// Print to stderr and return an error.
        PrintMessage = LLVMPrintMessageAction,
        /// Only return an error.
        ReturnStatus = LLVMReturnStatusAction,
    }
);

llvm_enum!(total
    LinkerMode: LLVMLinkerMode {
        DestroySource = LLVMLinkerDestroySource,
    }
);

llvm_enum!(total
    CodeGenOptLevel: LLVMCodeGenOptLevel {
        None = LLVMCodeGenLevelNone,
        Less = LLVMCodeGenLevelLess,
        Default = LLVMCodeGenLevelDefault,
        Aggressive = LLVMCodeGenLevelAggressive,
    }
);

llvm_enum!(total
    RelocMode: LLVMRelocMode {
        Default = LLVMRelocDefault,
        Static = LLVMRelocStatic,
        Pic = LLVMRelocPIC,
        DynamicNoPic = LLVMRelocDynamicNoPic,
        Ropi = LLVMRelocROPI,
        Rwpi = LLVMRelocRWPI,
        RopiRwpi = LLVMRelocROPI_RWPI,
    }
);

llvm_enum!(total
    CodeModel: LLVMCodeModel {
        Default = LLVMCodeModelDefault,
        JitDefault = LLVMCodeModelJITDefault,
        Tiny = LLVMCodeModelTiny,
        Small = LLVMCodeModelSmall,
        Kernel = LLVMCodeModelKernel,
        Medium = LLVMCodeModelMedium,
        Large = LLVMCodeModelLarge,
    }
);

llvm_enum!(total
    CodeGenFileType: LLVMCodeGenFileType {
        Assembly = LLVMAssemblyFile,
        Object = LLVMObjectFile,
    }
);

llvm_enum!(total
    ByteOrdering: LLVMByteOrdering {
        BigEndian = LLVMBigEndian,
        LittleEndian = LLVMLittleEndian,
    }
);

llvm_enum!(partial
    BinaryType: LLVMBinaryType {
        Archive = LLVMBinaryTypeArchive,
        MachOUniversalBinary = LLVMBinaryTypeMachOUniversalBinary,
        CoffImportFile = LLVMBinaryTypeCOFFImportFile,
        Ir = LLVMBinaryTypeIR,
        WinRes = LLVMBinaryTypeWinRes,
        Coff = LLVMBinaryTypeCOFF,
        Elf32L = LLVMBinaryTypeELF32L,
        Elf32B = LLVMBinaryTypeELF32B,
        Elf64L = LLVMBinaryTypeELF64L,
        Elf64B = LLVMBinaryTypeELF64B,
        MachO32L = LLVMBinaryTypeMachO32L,
        MachO32B = LLVMBinaryTypeMachO32B,
        MachO64L = LLVMBinaryTypeMachO64L,
        MachO64B = LLVMBinaryTypeMachO64B,
        Wasm = LLVMBinaryTypeWasm,
    }
);

/// Calling conventions known to the C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CallConv {
    C = 0,
    Fast = 8,
    Cold = 9,
    Ghc = 10,
    HiPE = 11,
    AnyReg = 13,
    PreserveMost = 14,
    PreserveAll = 15,
    Swift = 16,
    CxxFastTls = 17,
    X86Stdcall = 64,
    X86Fastcall = 65,
    ArmApcs = 66,
    ArmAapcs = 67,
    ArmAapcsVfp = 68,
    Msp430Intr = 69,
    X86ThisCall = 70,
    PtxKernel = 71,
    PtxDevice = 72,
    SpirFunc = 75,
    SpirKernel = 76,
    IntelOclBi = 77,
    X86_64SysV = 78,
    Win64 = 79,
    X86VectorCall = 80,
    Hhvm = 81,
    HhvmC = 82,
    X86Intr = 83,
    AvrIntr = 84,
    AvrSignal = 85,
    AvrBuiltin = 86,
    AmdgpuVs = 87,
    AmdgpuGs = 88,
    AmdgpuPs = 89,
    AmdgpuCs = 90,
    AmdgpuKernel = 91,
    X86RegCall = 92,
    AmdgpuHs = 93,
    Msp430Builtin = 94,
    AmdgpuLs = 95,
    AmdgpuEs = 96,
}

impl CallConv {
    pub const ALL: &'static [CallConv] = &[
        CallConv::C,
        CallConv::Fast,
        CallConv::Cold,
        CallConv::Ghc,
        CallConv::HiPE,
        CallConv::AnyReg,
        CallConv::PreserveMost,
        CallConv::PreserveAll,
        CallConv::Swift,
        CallConv::CxxFastTls,
        CallConv::X86Stdcall,
        CallConv::X86Fastcall,
        CallConv::ArmApcs,
        CallConv::ArmAapcs,
        CallConv::ArmAapcsVfp,
        CallConv::Msp430Intr,
        CallConv::X86ThisCall,
        CallConv::PtxKernel,
        CallConv::PtxDevice,
        CallConv::SpirFunc,
        CallConv::SpirKernel,
        CallConv::IntelOclBi,
        CallConv::X86_64SysV,
        CallConv::Win64,
        CallConv::X86VectorCall,
        CallConv::Hhvm,
        CallConv::HhvmC,
        CallConv::X86Intr,
        CallConv::AvrIntr,
        CallConv::AvrSignal,
        CallConv::AvrBuiltin,
        CallConv::AmdgpuVs,
        CallConv::AmdgpuGs,
        CallConv::AmdgpuPs,
        CallConv::AmdgpuCs,
        CallConv::AmdgpuKernel,
        CallConv::X86RegCall,
        CallConv::AmdgpuHs,
        CallConv::Msp430Builtin,
        CallConv::AmdgpuLs,
        CallConv::AmdgpuEs,
    ];

    pub fn from_u32(raw: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|cc| *cc as u32 == raw)
    }
}

/// Fast-math flags of a floating point instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FastMathFlags(u32);

impl FastMathFlags {
    pub const NONE: Self = Self(0);
    pub const ALLOW_REASSOC: Self = Self(1 << 0);
    pub const NO_NANS: Self = Self(1 << 1);
    pub const NO_INFS: Self = Self(1 << 2);
    pub const NO_SIGNED_ZEROS: Self = Self(1 << 3);
    pub const ALLOW_RECIPROCAL: Self = Self(1 << 4);
    pub const ALLOW_CONTRACT: Self = Self(1 << 5);
    pub const APPROX_FUNC: Self = Self(1 << 6);
    pub const ALL: Self = Self(0x7f);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for FastMathFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FastMathFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_enum_member_counts() {
        init();
        assert_eq!(Linkage::ALL.len(), 17);
        assert_eq!(Visibility::ALL.len(), 3);
        assert_eq!(UnnamedAddr::ALL.len(), 3);
        assert_eq!(DllStorageClass::ALL.len(), 3);
        assert_eq!(CallConv::ALL.len(), 41);
        assert_eq!(IntPredicate::ALL.len(), 10);
        assert_eq!(RealPredicate::ALL.len(), 16);
        assert_eq!(LandingPadClause::ALL.len(), 2);
        assert_eq!(ThreadLocalMode::ALL.len(), 5);
        assert_eq!(AtomicOrdering::ALL.len(), 7);
        assert_eq!(AtomicRmwBinOp::ALL.len(), 15);
        assert_eq!(DiagnosticSeverity::ALL.len(), 4);
        assert_eq!(InlineAsmDialect::ALL.len(), 2);
        assert_eq!(ModuleFlagBehavior::ALL.len(), 6);
        assert_eq!(TailCallKind::ALL.len(), 4);
    }

    #[test]
    fn test_int_predicate_matches_llvm_values() {
        init();
        assert_eq!(LLVMIntPredicate::from(IntPredicate::Eq) as u32, 32);
        assert_eq!(LLVMIntPredicate::from(IntPredicate::Sle) as u32, 41);
        for &p in IntPredicate::ALL {
            assert_eq!(IntPredicate::from(LLVMIntPredicate::from(p)), p);
        }
    }

    #[test]
    fn test_partial_enum_from_llvm() {
        init();
        assert_eq!(
            AtomicRmwBinOp::from_llvm(LLVMAtomicRMWBinOp::LLVMAtomicRMWBinOpFMin),
            Some(AtomicRmwBinOp::FMin)
        );
        assert_eq!(
            BinaryType::from_llvm(LLVMBinaryType::LLVMBinaryTypeELF64L),
            Some(BinaryType::Elf64L)
        );
    }

    #[test]
    fn test_call_conv_round_trip() {
        init();
        assert_eq!(CallConv::from_u32(0), Some(CallConv::C));
        assert_eq!(CallConv::from_u32(79), Some(CallConv::Win64));
        assert_eq!(CallConv::from_u32(12), None);
    }

    #[test]
    fn test_fast_math_flags() {
        init();
        let flags = FastMathFlags::NO_NANS | FastMathFlags::NO_INFS;
        assert!(flags.contains(FastMathFlags::NO_NANS));
        assert!(!flags.contains(FastMathFlags::APPROX_FUNC));
        assert_eq!(FastMathFlags::from_bits(0xffff_ffff), FastMathFlags::ALL);
        assert!(FastMathFlags::NONE.is_empty());
    }
}
