//! Type-inference pass: assigns a numeric flavor to every component of
//! every general-purpose register, then writes the result back onto every
//! operand.
//!
//! Two phases over the instruction stream. The forward classification walk
//! applies a fixed opcode table and merges with the asymmetric policy from
//! [`DataType::merge`]: floating classifications are sticky, integer
//! classifications upgrade to unsigned but never overwrite float. The
//! backpatch walk defaults anything still unclassified to signed int and
//! copies the final classification onto the operands, respecting each
//! operand's own selection mode.

use tracing::trace;

use crucible_ir::reflect::{ResourceGroup, ShaderInfo, VarClass};
use crucible_ir::{
    ComponentSelect, DataType, Opcode, Operand, OperandKind, ResInfoReturn, ShaderData, WriteMask,
};

/// Merge `ty` into the table entries of `mask`'s components at
/// `reg_base_index`. If any touched component already has a
/// classification, the mask expands to every already-classified component
/// of the register and the merged type applies to all of them.
fn set_vector_type(table: &mut [DataType], reg_base_index: usize, mask: u8, ty: DataType) {
    let mut mask = mask;
    let mut ty = ty;

    let existing = (0..4).any(|i| (mask & (1 << i)) != 0 && table[reg_base_index + i] != DataType::Void);
    if existing {
        for i in 0..4 {
            if table[reg_base_index + i] != DataType::Void {
                mask |= 1 << i;
                ty = ty.merge(table[reg_base_index + i]);
            }
        }
    }

    for i in 0..4 {
        if (mask & (1 << i)) != 0 {
            table[reg_base_index + i] = ty;
        }
    }
}

fn mark_operand_as(op: &Operand, ty: DataType, table: &mut [DataType]) {
    if !matches!(op.kind, OperandKind::Temp | OperandKind::IndexableTemp) {
        return;
    }
    let base = op.register as usize * 4;
    if base + 4 > table.len() {
        return;
    }
    match op.sel {
        ComponentSelect::Select1(c) => set_vector_type(table, base, 1 << c, ty),
        // All components; the swizzle order does not matter for marking.
        ComponentSelect::Swizzle(_) => set_vector_type(table, base, 0xF, ty),
        ComponentSelect::Mask(mask) => {
            let mask = if mask.0 == 0 { WriteMask::XYZW } else { mask };
            set_vector_type(table, base, mask.0, ty);
        }
    }
}

fn mark_all_operands_as(inst: &crucible_ir::Instruction, ty: DataType, table: &mut [DataType]) {
    for op in &inst.operands {
        mark_operand_as(op, ty, table);
    }
}

fn write_operand_types(op: &mut Operand, table: &[DataType]) {
    if op.kind != OperandKind::Temp {
        return;
    }
    let base = op.register as usize * 4;
    if base + 4 > table.len() {
        return;
    }
    match op.sel {
        ComponentSelect::Select1(c) => {
            op.data_type[c as usize] = table[base + c as usize];
        }
        ComponentSelect::Swizzle(s) => {
            if s.is_identity() {
                for c in 0..4 {
                    op.data_type[c] = table[base + c];
                }
            } else {
                for lane in s.0 {
                    op.data_type[lane as usize] = table[base + lane as usize];
                }
            }
        }
        ComponentSelect::Mask(mask) => {
            let mask = if mask.0 == 0 { WriteMask::XYZW } else { mask };
            for c in 0..4u8 {
                if mask.contains(c) {
                    op.data_type[c as usize] = table[base + c as usize];
                }
            }
        }
    }
}

/// Cache whether a constant-buffer operand references a scalar member, so
/// the operand engine can skip selector emission.
fn set_cb_operand_components(info: &ShaderInfo, op: &mut Operand) {
    if op.kind != OperandKind::ConstantBuffer {
        return;
    }
    let first = match op.sel {
        ComponentSelect::Swizzle(s) => s.0[0],
        ComponentSelect::Select1(c) => c,
        ComponentSelect::Mask(_) => 0,
    };
    let Some(cb) = info.constant_buffer(ResourceGroup::ConstantBuffer, op.indices[0]) else {
        return;
    };
    if cb.blob {
        return;
    }
    if let Some(found) = cb.var_from_offset(op.indices[1], first) {
        if found.ty.class == VarClass::Scalar {
            op.num_components = 1;
        }
    }
}

fn table_len(shader: &ShaderData) -> usize {
    let mut max_reg = 0u32;
    for inst in &shader.instructions {
        for op in &inst.operands {
            if matches!(op.kind, OperandKind::Temp | OperandKind::IndexableTemp) {
                max_reg = max_reg.max(op.register + 1);
            }
            for sub in op.sub_operand.iter().flatten() {
                if matches!(sub.kind, OperandKind::Temp | OperandKind::IndexableTemp) {
                    max_reg = max_reg.max(sub.register + 1);
                }
            }
        }
    }
    max_reg as usize * 4
}

/// Run both inference phases over the full instruction stream.
pub fn set_data_types(shader: &mut ShaderData) {
    let mut table = vec![DataType::Void; table_len(shader)];

    // Forward classification: deduce per-component flavors from the opcode
    // table. Only ever promote (int -> uint, int -> float); never demote.
    for inst in &shader.instructions {
        if inst.operands.is_empty() {
            continue;
        }
        use Opcode::*;
        match inst.opcode {
            // Float-only opcodes.
            Add | DerivRtx | DerivRty | DerivRtxCoarse | DerivRtxFine | DerivRtyCoarse
            | DerivRtyFine | Div | Dp2 | Dp3 | Dp4 | Eq | Exp | Frc | Log | Mad | Min | Max
            | Mul | Ne | RoundNe | RoundNi | RoundPi | RoundZ | Rsq | Rcp | Sample | SampleC
            | SampleCLz | SampleL | SampleD | SampleB | Sqrt | Sincos | Lod | Gather4
            | Gather4C | Gather4Po | Gather4PoC => {
                mark_all_operands_as(inst, DataType::Float, &mut table);
            }

            // Signed-integer opcodes. MOV and MOVC are typeless in the
            // source language; int is the neutral choice and floats stay
            // sticky regardless.
            And | BreakC | ContinueC | IAdd | IEq | IGe | ILt | IMad | IMax | IMin | IMul
            | INe | INeg | IShl | IShr | If | Not | Or | RetC | Xor | BufInfo | CountBits
            | FirstBitHi | FirstBitLo | FirstBitShi | Ubfe | Ibfe | Bfi | Bfrev | AtomicAnd
            | AtomicOr | AtomicXor | AtomicCmpStore | AtomicIAdd | AtomicIMax | AtomicIMin
            | AtomicUMax | AtomicUMin | ImmAtomicAlloc | ImmAtomicConsume | ImmAtomicIAdd
            | ImmAtomicAnd | ImmAtomicOr | ImmAtomicXor | ImmAtomicExch | ImmAtomicCmpExch
            | ImmAtomicIMax | ImmAtomicIMin | ImmAtomicUMax | ImmAtomicUMin | Mov | Movc
            | Swapc => {
                mark_all_operands_as(inst, DataType::Int, &mut table);
            }

            // Unsigned opcodes.
            UDiv | ULt | UGe | UMul | UMad | UMax | UMin | UShr | UAddc | USubb => {
                mark_all_operands_as(inst, DataType::UInt, &mut table);
            }

            // Mixed opcodes get per-operand rules.
            Ftoi | Ftou => {
                let dest_ty = if inst.opcode == Ftoi {
                    DataType::Int
                } else {
                    DataType::UInt
                };
                mark_operand_as(&inst.operands[0], dest_ty, &mut table);
                mark_operand_as(&inst.operands[1], DataType::Float, &mut table);
            }
            Ge | Lt => {
                mark_operand_as(&inst.operands[0], DataType::UInt, &mut table);
                mark_operand_as(&inst.operands[1], DataType::Float, &mut table);
                mark_operand_as(&inst.operands[2], DataType::Float, &mut table);
            }
            Itof | Utof => {
                let src_ty = if inst.opcode == Itof {
                    DataType::Int
                } else {
                    DataType::UInt
                };
                mark_operand_as(&inst.operands[0], DataType::Float, &mut table);
                mark_operand_as(&inst.operands[1], src_ty, &mut table);
            }
            Ld | LdMs => {
                mark_operand_as(&inst.operands[0], DataType::Float, &mut table);
            }
            ResInfo => {
                if inst.resinfo_return != ResInfoReturn::UInt {
                    mark_all_operands_as(inst, DataType::Float, &mut table);
                }
            }
            SampleInfo | SamplePos => {
                mark_operand_as(&inst.operands[0], DataType::Float, &mut table);
            }
            LdUavTyped | StoreUavTyped | LdRaw | StoreRaw | LdStructured | StoreStructured => {
                mark_operand_as(&inst.operands[0], DataType::Int, &mut table);
            }
            F32ToF16 | F16ToF32 => {}

            _ => {}
        }
    }

    // Anything still unclassified defaults to signed int.
    for slot in table.iter_mut() {
        if *slot == DataType::Void {
            *slot = DataType::Int;
        }
    }
    trace!(components = table.len(), "type inference table complete");

    // Backpatch: copy the final classification onto every operand.
    let info = &shader.info;
    for inst in &mut shader.instructions {
        if inst.operands.is_empty() {
            continue;
        }
        let integer_immediates = inst.opcode.has_integer_immediates();
        let first_src = inst.first_src;

        // Preserve the current flavor of a dynamic index on an indexable
        // destination.
        if inst.operands[0].kind == OperandKind::IndexableTemp {
            if let Some(sub) = inst.operands[0].sub_operand[1].as_deref_mut() {
                write_operand_types(sub, &table);
            }
        }
        if inst.operands[0].kind == OperandKind::ConstantBuffer {
            set_cb_operand_components(info, &mut inst.operands[0]);
        }

        // Sources first.
        for op in inst.operands.iter_mut().skip(first_src).rev() {
            write_operand_types(op, &table);
            set_cb_operand_components(info, op);
            for sub in op.sub_operand.iter_mut().flatten() {
                write_operand_types(sub, &table);
                set_cb_operand_components(info, sub);
            }
            if integer_immediates && op.kind == OperandKind::Immediate32 {
                op.integer_immediate = true;
            }
        }

        // Destinations last, so an instruction reading and writing the same
        // register keeps the source view.
        for op in inst.operands.iter_mut().take(first_src) {
            write_operand_types(op, &table);
        }
    }
}

/// Flow-insensitive follow-up: a `mov immediate -> temp` whose first later
/// reader is an integer-immediate opcode carries an integer bit pattern.
pub fn mark_integer_immediates(shader: &mut ShaderData) {
    let insts = &shader.instructions;
    let mut marks = Vec::new();

    for (i, inst) in insts.iter().enumerate() {
        if inst.opcode != Opcode::Mov
            || inst.operands.len() < 2
            || inst.operands[1].kind != OperandKind::Immediate32
            || inst.operands[0].kind != OperandKind::Temp
        {
            continue;
        }
        for later in &insts[i + 1..] {
            if later.uses_register(&inst.operands[0]) {
                if later.opcode.has_integer_immediates() {
                    marks.push(i);
                }
                break;
            }
        }
    }

    for i in marks {
        shader.instructions[i].operands[1].integer_immediate = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_ir::{Instruction, ShaderStage, Swizzle};

    fn shader(instructions: Vec<Instruction>) -> ShaderData {
        let mut s = ShaderData::new(ShaderStage::Pixel);
        s.instructions = instructions;
        s
    }

    #[test]
    fn float_classification_survives_later_integer_use() {
        // MOV writes a float-tagged temp (via ADD), then AND reads it; the
        // component must stay float so the AND renders with a bit cast.
        let mut s = shader(vec![
            Instruction::new(
                Opcode::Add,
                vec![
                    Operand::temp(0).with_mask(WriteMask::X),
                    Operand::temp(1).with_select(0),
                    Operand::temp(1).with_select(0),
                ],
                1,
            ),
            Instruction::new(
                Opcode::And,
                vec![
                    Operand::temp(2).with_mask(WriteMask::X),
                    Operand::temp(0).with_select(0),
                    Operand::imm32_scalar(0x7fffffff),
                ],
                1,
            ),
        ]);
        set_data_types(&mut s);
        assert_eq!(s.instructions[1].operands[1].data_type[0], DataType::Float);
    }

    #[test]
    fn unclassified_components_default_to_int() {
        let mut s = shader(vec![Instruction::new(
            Opcode::Mov,
            vec![
                Operand::temp(0).with_mask(WriteMask::X),
                Operand::temp(3).with_select(2),
            ],
            1,
        )]);
        set_data_types(&mut s);
        assert_eq!(s.instructions[0].operands[1].data_type[2], DataType::Int);
    }

    #[test]
    fn conflicting_integer_uses_resolve_unsigned() {
        let mut s = shader(vec![
            Instruction::new(
                Opcode::IAdd,
                vec![
                    Operand::temp(0).with_mask(WriteMask::X),
                    Operand::temp(1).with_select(0),
                    Operand::temp(1).with_select(0),
                ],
                1,
            ),
            Instruction::new(
                Opcode::UMax,
                vec![
                    Operand::temp(0).with_mask(WriteMask::X),
                    Operand::temp(1).with_select(0),
                    Operand::temp(1).with_select(0),
                ],
                1,
            ),
        ]);
        set_data_types(&mut s);
        assert_eq!(s.instructions[1].operands[0].data_type[0], DataType::UInt);
    }

    #[test]
    fn swizzle_marking_is_component_aware() {
        // Writing .x as float then .y through an integer op must keep the
        // two components distinct unless the merge expansion unifies them.
        let mut s = shader(vec![Instruction::new(
            Opcode::Add,
            vec![
                Operand::temp(0).with_mask(WriteMask::X),
                Operand::temp(1).with_swizzle(Swizzle::XXXX),
                Operand::temp(1).with_swizzle(Swizzle::XXXX),
            ],
            1,
        )]);
        set_data_types(&mut s);
        assert_eq!(s.instructions[0].operands[0].data_type[0], DataType::Float);
    }

    #[test]
    fn mov_immediate_feeding_integer_op_is_marked_integer() {
        let mut s = shader(vec![
            Instruction::new(
                Opcode::Mov,
                vec![
                    Operand::temp(0).with_mask(WriteMask::X),
                    Operand::imm32_scalar(4),
                ],
                1,
            ),
            Instruction::new(
                Opcode::IAdd,
                vec![
                    Operand::temp(1).with_mask(WriteMask::X),
                    Operand::temp(0).with_select(0),
                    Operand::imm32_scalar(1),
                ],
                1,
            ),
        ]);
        set_data_types(&mut s);
        mark_integer_immediates(&mut s);
        assert!(s.instructions[0].operands[1].integer_immediate);
    }
}
