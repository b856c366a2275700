//! Declarations: the tagged union the decoder produces ahead of the
//! instruction stream.

use bitflags::bitflags;

use crate::operand::Operand;

/// Resource dimensionality as declared in the bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDimension {
    Buffer,
    Texture1D,
    Texture2D,
    Texture2DMs,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    Texture2DMsArray,
    TextureCubeArray,
}

/// Element return type of a typed resource or UAV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceReturnType {
    #[default]
    UNorm,
    SNorm,
    SInt,
    UInt,
    Float,
    Mixed,
}

/// How the shader addresses a constant buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CbAccessPattern {
    #[default]
    Immediate,
    DynamicIndexed,
}

/// Interpolation qualifier on pixel-stage inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Undefined,
    Constant,
    Linear,
    LinearCentroid,
    LinearNoPerspective,
    LinearNoPerspectiveCentroid,
    LinearSample,
    LinearNoPerspectiveSample,
}

bitflags! {
    /// `dcl_globalFlags` payload.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GlobalFlags: u32 {
        const REFACTORING_ALLOWED = 1 << 0;
        const ENABLE_DOUBLE_PRECISION = 1 << 1;
        const FORCE_EARLY_DEPTH_STENCIL = 1 << 2;
        const ENABLE_RAW_AND_STRUCTURED_BUFFERS = 1 << 3;
    }
}

/// Stage-model metadata declarations with no counterpart in the target
/// stage model. They are structurally no-ops here; the stages that emit
/// them are rejected at the driver level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageMetadata {
    GsInputPrimitive,
    GsOutputPrimitiveTopology,
    GsMaxOutputVertexCount,
    GsInstanceCount,
    Stream,
    HsDecls,
    HsForkPhase,
    HsJoinPhase,
    HsForkPhaseInstanceCount,
    HsMaxTessFactor,
    TessDomain,
    TessPartitioning,
    TessOutputPrimitive,
    InputControlPointCount,
    OutputControlPointCount,
    FunctionBody,
    FunctionTable,
    InterfaceTable,
}

/// One decoded declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    GlobalFlags(GlobalFlags),
    /// Plain input register (vertex attribute, or a compute builtin keyed
    /// by the operand kind).
    Input {
        operand: Operand,
    },
    /// Input with a system-generated value (position, vertex id, ...).
    InputSgv {
        operand: Operand,
    },
    /// Pixel-stage input with an interpolation mode.
    InputPs {
        operand: Operand,
        interpolation: Interpolation,
    },
    /// Pixel-stage system-generated input.
    InputPsSgv {
        operand: Operand,
    },
    /// Pixel-stage system-interpreted input.
    InputPsSiv {
        operand: Operand,
    },
    /// Input covered by a system-interpreted value; carries no extra
    /// emission work of its own.
    InputSiv {
        operand: Operand,
    },
    Output {
        operand: Operand,
    },
    /// Output with a system-interpreted value (position, clip distance).
    OutputSiv {
        operand: Operand,
    },
    Temps {
        count: u32,
    },
    IndexableTemp {
        register: u32,
        count: u32,
        component_count: u32,
    },
    ConstantBuffer {
        operand: Operand,
        access: CbAccessPattern,
    },
    Sampler {
        operand: Operand,
        comparison: bool,
    },
    Resource {
        operand: Operand,
        dimension: ResourceDimension,
    },
    ResourceStructured {
        operand: Operand,
        stride: u32,
    },
    ResourceRaw {
        operand: Operand,
    },
    UavTyped {
        operand: Operand,
        dimension: ResourceDimension,
        return_type: ResourceReturnType,
    },
    UavStructured {
        operand: Operand,
        stride: u32,
        has_counter: bool,
    },
    UavRaw {
        operand: Operand,
        has_counter: bool,
    },
    TgsmStructured {
        operand: Operand,
        stride: u32,
        count: u32,
    },
    TgsmRaw {
        operand: Operand,
        byte_count: u32,
    },
    ThreadGroup {
        size: [u32; 3],
    },
    /// Immediate constant table from a custom-data block, one vec4 of raw
    /// 32-bit payloads per entry.
    ImmediateConstantBuffer {
        values: Vec<[u32; 4]>,
    },
    /// Legacy DX9-era immediate constant definition.
    Dx9ImmConst {
        dest: Operand,
        src: Operand,
    },
    /// `dcl_indexrange`: registers `[start, start + count)` are addressed
    /// dynamically through the first one.
    IndexRange {
        operand: Operand,
        count: u32,
    },
    StageMetadata(StageMetadata),
}
