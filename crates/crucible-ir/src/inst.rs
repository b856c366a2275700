//! Instructions and the per-stage shader container handed to a backend.

use crate::decl::Decl;
use crate::op::{Opcode, ResInfoReturn, SyncFlags, TestBool};
use crate::operand::{Operand, OperandKind};
use crate::reflect::ShaderInfo;
use crate::types::ShaderStage;

pub const MAX_OPERANDS: usize = 6;

/// One decoded instruction: destination operands first, sources from
/// `first_src` on.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    /// Index of the first source operand; everything before it is a
    /// destination.
    pub first_src: usize,
    pub saturate: bool,
    /// Polarity for the conditional (`..c`) opcodes and `discard`.
    pub test: TestBool,
    /// Compile-time texel offsets (`sample` aoffimmi modifier).
    pub address_offsets: Option<[i8; 3]>,
    pub sync_flags: SyncFlags,
    pub resinfo_return: ResInfoReturn,
}

impl Instruction {
    pub fn new(opcode: Opcode, operands: Vec<Operand>, first_src: usize) -> Self {
        debug_assert!(operands.len() <= MAX_OPERANDS);
        Self {
            opcode,
            operands,
            first_src,
            saturate: false,
            test: TestBool::Zero,
            address_offsets: None,
            sync_flags: SyncFlags::empty(),
            resinfo_return: ResInfoReturn::Float,
        }
    }

    pub fn with_saturate(mut self) -> Self {
        self.saturate = true;
        self
    }

    pub fn with_test(mut self, test: TestBool) -> Self {
        self.test = test;
        self
    }

    /// Whether any operand references the same register with overlapping
    /// components.
    pub fn uses_register(&self, reference: &Operand) -> bool {
        self.operands.iter().any(|op| {
            op.kind == reference.kind
                && op.register == reference.register
                && op.selection_overlaps(reference)
        })
    }
}

/// A decoded shader stage: declarations, instruction stream and reflection
/// tables. Owned by the caller; a backend borrows it for the duration of
/// one compile and only annotates derived metadata in place.
#[derive(Debug, Clone)]
pub struct ShaderData {
    pub stage: ShaderStage,
    pub major_version: u8,
    pub minor_version: u8,
    pub decls: Vec<Decl>,
    pub instructions: Vec<Instruction>,
    pub info: ShaderInfo,
    /// Per input register: referenced by at least one instruction. Filled
    /// by [`mark_input_usage`]; declarations for unreferenced inputs skip
    /// the unpack-to-local prologue.
    pub input_referenced: Vec<bool>,
}

impl ShaderData {
    pub fn new(stage: ShaderStage) -> Self {
        Self {
            stage,
            major_version: 5,
            minor_version: 0,
            decls: Vec::new(),
            instructions: Vec::new(),
            info: ShaderInfo::default(),
            input_referenced: Vec::new(),
        }
    }
}

/// Recompute the per-register input usage table from the instruction
/// stream (destination operands excluded, sub-operands included).
pub fn mark_input_usage(shader: &mut ShaderData) {
    let mut referenced = vec![false; 64];

    fn visit(op: &Operand, referenced: &mut [bool]) {
        if matches!(op.kind, OperandKind::Input | OperandKind::InputCoverageMask)
            || op.special_name != crate::operand::SpecialName::Undefined
        {
            let reg = op.register as usize;
            if reg < referenced.len() {
                referenced[reg] = true;
            }
        }
        for sub in op.sub_operand.iter().flatten() {
            visit(sub, referenced);
        }
    }

    for inst in &shader.instructions {
        for op in &inst.operands {
            visit(op, &mut referenced);
        }
    }
    // Declarations can also force an unpack (e.g. builtin inputs consumed
    // only through specials); keep those driven purely by the instruction
    // scan.
    shader.input_referenced = referenced;
}
