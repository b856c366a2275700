//! Arithmetic lowering details: dual-destination divides, emulated
//! bitfield and half-conversion intrinsics.

mod common;

use common::*;
use crucible_ir::{Decl, Instruction, Opcode, Operand, ShaderData, ShaderStage, WriteMask};

fn ps_with_body(instructions: Vec<Instruction>) -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.decls = vec![
        Decl::Temps { count: 6 },
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = instructions;
    shader.instructions.push(ret());
    shader
}

#[test]
fn udiv_writes_quotient_and_remainder() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::UDiv,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_mask(WriteMask::X),
            Operand::temp(2).with_select(0),
            Operand::temp(3).with_select(0),
        ],
        2,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains(" / "), "{msl}");
    assert!(msl.contains(" % "), "{msl}");
    assert!(msl.contains("Temp_uint[0].x"), "{msl}");
    assert!(msl.contains("Temp_uint[1].x"), "{msl}");
}

#[test]
fn udiv_with_null_remainder_skips_the_second_statement() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::UDiv,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::null(),
            Operand::temp(2).with_select(0),
            Operand::temp(3).with_select(0),
        ],
        2,
    )]);
    let out = translate(&mut shader);
    assert!(!out.msl.contains(" % "), "{}", out.msl);
}

#[test]
fn bitfield_extract_expands_to_shift_and_mask() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Ubfe,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::imm32_scalar(5),
            Operand::imm32_scalar(3),
            Operand::temp(1).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    // The expansion runs in a nested scope with an explicit mask local.
    assert!(msl.contains("uint4 mask = ~(uint4(0xffffffff) << 5u);"), "{msl}");
    assert!(msl.contains(" >> ("), "{msl}");
    assert!(msl.contains("& mask)"), "{msl}");
}

#[test]
fn bitfield_insert_builds_and_inverts_the_mask() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Bfi,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::imm32_scalar(5),
            Operand::imm32_scalar(3),
            Operand::temp(1).with_select(0),
            Operand::temp(2).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("mask = ~mask;"), "{msl}");
    assert!(msl.contains(" << 3u"), "{msl}");
}

#[test]
fn f32_to_f16_expands_per_component() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::F32ToF16,
        vec![
            Operand::temp(0).with_mask(WriteMask::XY),
            Operand::temp(1),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    // Two destination components produce two narrow-and-widen statements.
    assert_eq!(msl.matches("as_type<ushort>( (half)").count(), 2, "{msl}");
}

#[test]
fn f16_to_f32_widens_through_half() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::F16ToF32,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("= as_type<half>((ushort)"),
        "{}",
        out.msl
    );
}

#[test]
fn ineg_negates_through_the_int_bank() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::INeg,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("Temp_int[0].x = -(Temp_int[1].x);"),
        "{}",
        out.msl
    );
}
