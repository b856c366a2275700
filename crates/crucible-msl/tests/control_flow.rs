//! Structured control flow and the conditional-move paths.

mod common;

use common::*;
use crucible_ir::{
    Decl, Instruction, Opcode, Operand, ShaderData, ShaderStage, Swizzle, TestBool, WriteMask,
};

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
fn scalar_predicate_movc_is_a_single_if_else() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Movc,
        vec![
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::temp(1).with_select(0),
            Operand::temp(2),
            Operand::temp(3),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert_eq!(msl.matches("if (").count(), 1, "{msl}");
    assert_eq!(msl.matches("else").count(), 1, "{msl}");
}

#[test]
fn replicated_swizzle_predicate_takes_the_scalar_path() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Movc,
        vec![
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::temp(1).with_swizzle(Swizzle::WWWW),
            Operand::temp(2),
            Operand::temp(3),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert_eq!(out.msl.matches("if (").count(), 1, "{}", out.msl);
}

#[test]
fn vector_predicate_movc_selects_per_component() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Movc,
        vec![
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::temp(1).with_swizzle(Swizzle::XYZW),
            Operand::temp(2),
            Operand::temp(3),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    assert_eq!(out.msl.matches("if (").count(), 4, "{}", out.msl);
}

#[test]
fn if_else_endif_respects_test_polarity() {
    let mut shader = ps_with_body(vec![
        Instruction::new(Opcode::If, vec![Operand::temp(0).with_select(0)], 0)
            .with_test(TestBool::NonZero),
        mov(
            Operand::temp(1).with_mask(WriteMask::X),
            Operand::imm32_scalar(1),
        ),
        Instruction::new(Opcode::Else, Vec::new(), 0),
        mov(
            Operand::temp(1).with_mask(WriteMask::X),
            Operand::imm32_scalar(2),
        ),
        Instruction::new(Opcode::EndIf, Vec::new(), 0),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains(")!=0u){"), "{msl}");
    assert!(msl.contains("} else {"), "{msl}");
    // The branch bodies sit one level deeper than the branch heads.
    assert!(msl.contains("        Temp_int[1].x = 0x1;"), "{msl}");
}

#[test]
fn breakc_with_zero_test_emits_inverted_break() {
    let mut shader = ps_with_body(vec![
        Instruction::new(Opcode::Loop, Vec::new(), 0),
        Instruction::new(Opcode::BreakC, vec![Operand::temp(0).with_select(0)], 0)
            .with_test(TestBool::Zero),
        Instruction::new(Opcode::EndLoop, Vec::new(), 0),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("while(true){"), "{msl}");
    assert!(msl.contains(")==0u){break;}"), "{msl}");
}

#[test]
fn rep_lowers_to_decrementing_while_loop() {
    let mut shader = ps_with_body(vec![
        Instruction::new(Opcode::Rep, vec![Operand::imm32_scalar(8)], 0),
        Instruction::new(Opcode::EndRep, Vec::new(), 0),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("    int RepCounter;\n"), "{msl}");
    assert!(msl.contains("RepCounter = 0x8;"), "{msl}");
    assert!(msl.contains("while(RepCounter!=0){"), "{msl}");
    assert!(msl.contains("RepCounter--;"), "{msl}");
}

#[test]
fn switch_cases_translate_to_native_switch() {
    let mut shader = ps_with_body(vec![
        Instruction::new(Opcode::Switch, vec![Operand::temp(0).with_select(0)], 0),
        Instruction::new(Opcode::Case, vec![Operand::imm32_scalar(0)], 0),
        Instruction::new(Opcode::Break, Vec::new(), 0),
        Instruction::new(Opcode::Default, Vec::new(), 0),
        Instruction::new(Opcode::Break, Vec::new(), 0),
        Instruction::new(Opcode::EndSwitch, Vec::new(), 0),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("switch(int("), "{msl}");
    assert!(msl.contains("case 0x0:"), "{msl}");
    assert!(msl.contains("default:"), "{msl}");
}

#[test]
fn discard_wraps_the_whole_vector_test() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Discard,
        vec![Operand::temp(0).with_select(0)],
        0,
    )
    .with_test(TestBool::NonZero)]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("if(any("),
        "{}",
        out.msl
    );
    assert!(out.msl.contains("!=0)){discard_fragment();}"), "{}", out.msl);
}

#[test]
fn saturate_clamps_the_destination_after_the_op() {
    let mut shader = ps_with_body(vec![Instruction::new(
        Opcode::Add,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::temp(1).with_select(0),
            Operand::temp(2).with_select(0),
        ],
        1,
    )
    .with_saturate()]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("clamp("), "{msl}");
    assert!(msl.contains(", 0.0, 1.0);"), "{msl}");
}
