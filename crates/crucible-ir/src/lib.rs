//! Decoded shader IR and reflection data model.
//!
//! This crate defines the structured representation of a compiled
//! HLSL-bytecode shader — declarations, instructions, operands and the
//! reflection tables — consumed by the translation backends. The bytecode
//! decoder that produces it lives elsewhere; here the IR is plain data plus
//! pure queries (binding lookup, member-by-byte-offset resolution).

pub mod decl;
pub mod inst;
pub mod op;
pub mod operand;
pub mod reflect;
pub mod types;

pub use decl::{
    CbAccessPattern, Decl, GlobalFlags, Interpolation, ResourceDimension, ResourceReturnType,
    StageMetadata,
};
pub use inst::{mark_input_usage, Instruction, ShaderData, MAX_OPERANDS};
pub use op::{Opcode, ResInfoReturn, SyncFlags, TestBool};
pub use operand::{
    ComponentSelect, IndexRep, Operand, OperandKind, OperandModifier, SpecialName, Swizzle,
    WriteMask, MAX_SUB_OPERANDS,
};
pub use reflect::{
    BindArea, ComponentType, ConstantBuffer, InOutSignature, ResourceBinding, ResourceGroup,
    ResourceType, ShaderInfo, ShaderVar, ShaderVarType, VarClass, VarLookup,
};
pub use types::{DataType, MinPrecision, ShaderStage};
