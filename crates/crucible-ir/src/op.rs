//! Instruction opcodes and opcode-attached side data.
//!
//! The decoder maps bytecode opcode tokens onto [`Opcode`]; the backend
//! dispatches on it. Only the opcodes the translation pipeline understands
//! are listed; anything else must be rejected by the decoder up front.

use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Opcode {
    Nop,
    Mov,
    Movc,
    Swapc,

    // Float arithmetic.
    Add,
    Div,
    Dp2,
    Dp2Add,
    Dp3,
    Dp4,
    Exp,
    Frc,
    Log,
    Lrp,
    Mad,
    Max,
    Min,
    Mul,
    Pow,
    Rcp,
    RoundNe,
    RoundNi,
    RoundPi,
    RoundZ,
    Rsq,
    Sincos,
    Sqrt,

    // Float comparisons (all-bits-set / clear integer result).
    Eq,
    Ge,
    Lt,
    Ne,

    // Signed integer.
    IAdd,
    IEq,
    IGe,
    ILt,
    IMad,
    IMax,
    IMin,
    IMul,
    INe,
    INeg,
    IShl,
    IShr,
    Itof,
    Ftoi,

    // Unsigned integer.
    UAddc,
    UDiv,
    UGe,
    ULt,
    UMad,
    UMax,
    UMin,
    UMul,
    USubb,
    UShr,
    Utof,
    Ftou,

    // Bit manipulation.
    And,
    Bfi,
    Bfrev,
    CountBits,
    FirstBitHi,
    FirstBitLo,
    FirstBitShi,
    Ibfe,
    Not,
    Or,
    Ubfe,
    Xor,

    // Half-float packing.
    F16ToF32,
    F32ToF16,

    // Control flow.
    Break,
    BreakC,
    Case,
    Continue,
    ContinueC,
    Default,
    Discard,
    Else,
    EndIf,
    EndLoop,
    EndRep,
    EndSwitch,
    If,
    InterfaceCall,
    Label,
    Loop,
    Rep,
    Ret,
    RetC,
    Switch,

    // Partial derivatives.
    DerivRtx,
    DerivRtxCoarse,
    DerivRtxFine,
    DerivRty,
    DerivRtyCoarse,
    DerivRtyFine,

    // Texture sampling and queries.
    Gather4,
    Gather4C,
    Gather4Po,
    Gather4PoC,
    Ld,
    LdMs,
    Lod,
    ResInfo,
    Sample,
    SampleB,
    SampleC,
    SampleCLz,
    SampleD,
    SampleInfo,
    SampleL,
    SamplePos,

    // Raw / structured / typed memory.
    BufInfo,
    LdRaw,
    LdStructured,
    LdUavTyped,
    StoreRaw,
    StoreStructured,
    StoreUavTyped,

    // Atomic read-modify-write family. `ImmAtomic*` variants additionally
    // return the previous value.
    AtomicAnd,
    AtomicCmpStore,
    AtomicIAdd,
    AtomicIMax,
    AtomicIMin,
    AtomicOr,
    AtomicUMax,
    AtomicUMin,
    AtomicXor,
    ImmAtomicAlloc,
    ImmAtomicAnd,
    ImmAtomicCmpExch,
    ImmAtomicConsume,
    ImmAtomicExch,
    ImmAtomicIAdd,
    ImmAtomicIMax,
    ImmAtomicIMin,
    ImmAtomicOr,
    ImmAtomicUMax,
    ImmAtomicUMin,
    ImmAtomicXor,

    Sync,

    // Geometry-stream family. Never valid for the stages this backend
    // supports.
    Cut,
    CutStream,
    Emit,
    EmitStream,
    EmitThenCut,
    EmitThenCutStream,

    // Pull-model evaluation intrinsics. No target equivalent.
    EvalCentroid,
    EvalSampleIndex,
    EvalSnapped,

    // Double-precision family. No target equivalent.
    DAdd,
    DEq,
    DGe,
    DLt,
    DMax,
    DMin,
    DMov,
    DMovc,
    DMul,
    DNe,
    DtoF,
    FtoD,
}

impl Opcode {
    /// Atomic read-modify-write opcodes, both the plain and the
    /// previous-value-returning variants.
    pub fn is_atomic(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            AtomicAnd
                | AtomicCmpStore
                | AtomicIAdd
                | AtomicIMax
                | AtomicIMin
                | AtomicOr
                | AtomicUMax
                | AtomicUMin
                | AtomicXor
                | ImmAtomicAnd
                | ImmAtomicCmpExch
                | ImmAtomicExch
                | ImmAtomicIAdd
                | ImmAtomicIMax
                | ImmAtomicIMin
                | ImmAtomicOr
                | ImmAtomicUMax
                | ImmAtomicUMin
                | ImmAtomicXor
        )
    }

    /// Atomic variants that additionally write the previous value of the
    /// memory location into a leading destination operand.
    pub fn returns_previous_value(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            ImmAtomicAnd
                | ImmAtomicCmpExch
                | ImmAtomicExch
                | ImmAtomicIAdd
                | ImmAtomicIMax
                | ImmAtomicIMin
                | ImmAtomicOr
                | ImmAtomicUMax
                | ImmAtomicUMin
                | ImmAtomicXor
        )
    }

    /// Opcodes whose literal operands carry integer bit patterns, so the
    /// operand engine must print them as integer literals.
    pub fn has_integer_immediates(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            IAdd | If
                | IEq
                | IGe
                | ILt
                | IMad
                | IMax
                | IMin
                | IMul
                | INe
                | INeg
                | IShl
                | IShr
                | Itof
                | UShr
                | And
                | Or
                | Xor
                | BreakC
                | ContinueC
                | RetC
                | Discard
                // MOV is typeless; treat its immediates as integers and let
                // the operand engine bitcast to float when the destination
                // needs it.
                | Mov
                | Movc
        )
    }

    /// Binary operations where `a op b == b op a`, eligible for the
    /// compound-assignment rewrite when the destination aliases the right
    /// source.
    pub fn is_commutative(self) -> bool {
        use Opcode::*;
        matches!(self, DAdd | IAdd | Add | Mul | IMul | Or | And)
    }
}

/// Zero / not-zero polarity of the conditional instructions
/// (`if`, `breakc`, `continuec`, `retc`, `discard`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestBool {
    #[default]
    Zero,
    NonZero,
}

/// What `resinfo` writes per element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResInfoReturn {
    #[default]
    Float,
    RcpFloat,
    UInt,
}

bitflags! {
    /// Barrier scope flags on `sync`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyncFlags: u32 {
        const THREADS_IN_GROUP = 1 << 0;
        const THREAD_GROUP_SHARED_MEMORY = 1 << 1;
        const UAV_MEMORY_GROUP = 1 << 2;
        const UAV_MEMORY_GLOBAL = 1 << 3;
    }
}
