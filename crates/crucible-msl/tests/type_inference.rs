//! End-to-end checks of the register type inference: once a component is
//! classified floating-point, later integer uses read it through a bit
//! cast instead of reclassifying the register.

mod common;

use common::*;
use crucible_ir::{Decl, Instruction, Opcode, Operand, ShaderData, ShaderStage, WriteMask};

fn ps_with_body(instructions: Vec<Instruction>) -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.decls = vec![
        Decl::Temps { count: 4 },
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = instructions;
    shader.instructions.push(ret());
    shader
}

#[test]
fn float_register_stays_float_for_later_integer_ops() {
    // ADD classifies r0.x as float; the AND that reads it afterwards must
    // bitcast, not demote the register to integer.
    let mut shader = ps_with_body(vec![
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
    let out = translate(&mut shader);
    let msl = &out.msl;

    // The ADD wrote the float bank...
    assert!(msl.contains("Temp[0].x = Temp[1].x + Temp[1].x;"), "{msl}");
    // ...and the AND reads it back through a reinterpret.
    assert!(msl.contains("as_type<uint>(Temp[0].x)"), "{msl}");
}

#[test]
fn unclassified_registers_default_to_the_int_bank() {
    let mut shader = ps_with_body(vec![mov(
        Operand::temp(0).with_mask(WriteMask::X),
        Operand::temp(1).with_select(0),
    )]);
    let out = translate(&mut shader);
    assert!(out.msl.contains("Temp_int[0].x = Temp_int[1].x;"), "{}", out.msl);
}

#[test]
fn integer_conversions_pick_the_right_banks() {
    // itof: float destination fed from the int bank through a value cast.
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Itof,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("Temp[0].x = float("), "{msl}");
    assert!(msl.contains("Temp_int[1].x"), "{msl}");
}

#[test]
fn comparison_lowers_to_select_between_all_bits_and_zero() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Lt,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_select(0),
            Operand::temp(2).with_select(0),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("select(0, (int)0xFFFFFFFF, ("),
        "{msl}"
    );
    assert!(msl.contains(" < ("), "{msl}");
}

#[test]
fn vector_comparison_uses_vector_select() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Lt,
        vec![
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::temp(1),
            Operand::temp(2),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("select(int4(0), int4(0xFFFFFFFF), ("),
        "{}",
        out.msl
    );
}

#[test]
fn mov_immediate_into_integer_consumer_prints_integer_literals() {
    let mut shader = ps_with_body(vec![
        mov(
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::imm32_scalar(4),
        ),
        Instruction::new(
            Opcode::IAdd,
            vec![
                Operand::temp(1).with_mask(WriteMask::X),
                Operand::temp(0).with_select(0),
                Operand::imm32_scalar(3),
            ],
            1,
        ),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("Temp_int[0].x = 0x4;"), "{msl}");
    assert!(msl.contains("+ 0x3;"), "{msl}");
}

#[test]
fn in_place_update_collapses_to_compound_assignment() {
    let dst = Operand::temp(0).with_mask(WriteMask::X);
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::IAdd,
        vec![
            dst.clone(),
            dst.clone(),
            Operand::imm32_scalar(1),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert!(out.msl.contains("Temp_int[0].x += 0x1;"), "{}", out.msl);
}
