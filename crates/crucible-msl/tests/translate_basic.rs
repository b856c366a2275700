//! End-to-end shape of the emitted shaders: wrapper structs, entry-point
//! signatures, deterministic output.

mod common;

use common::*;
use crucible_ir::{Decl, Instruction, Opcode, Operand, ShaderData, ShaderStage};
use crucible_msl::{translate_shader, CompileFlags, EntryKind, TranslateError};
use pretty_assertions::assert_eq;

#[test]
fn pixel_passthrough_emits_stage_in_and_output_structs() {
    let mut shader = ps_passthrough();
    let out = translate(&mut shader);

    assert_eq!(out.entry_kind, EntryKind::Fragment);
    let msl = &out.msl;
    assert!(msl.contains("struct FragmentInput {"), "{msl}");
    assert!(msl.contains("\tfloat4 position [[ position ]];"), "{msl}");
    assert!(msl.contains("struct FragmentOutput {"), "{msl}");
    assert!(msl.contains("\tfloat4 PixOutColor0 [[ color(0) ]];"), "{msl}");
    assert!(msl.contains("#define Output0 output.PixOutColor0"), "{msl}");
    assert!(
        msl.contains("fragment FragmentOutput shader_main("),
        "{msl}"
    );
    assert!(msl.contains("\tFragmentInput stageIn [[ stage_in ]])"), "{msl}");
    // The position input unpacks into a flat local the body addresses.
    assert!(msl.contains("float4 Input0 = stageIn.position;"), "{msl}");
    assert!(msl.contains("    Output0 = Input0;\n"), "{msl}");
    assert!(msl.contains("    return output;\n"), "{msl}");
}

#[test]
fn vertex_shader_declares_attributes_and_varyings() {
    let mut shader = ShaderData::new(ShaderStage::Vertex);
    shader.info.inputs = vec![io_sig("POSITION", 0, 0, 0xF), io_sig("COLOR", 0, 1, 0xF)];
    shader.info.outputs = vec![
        io_sig("SV_Position", 0, 0, 0xF),
        io_sig("COLOR", 0, 1, 0xF),
    ];
    shader.decls = vec![
        Decl::Input {
            operand: Operand::input(0),
        },
        Decl::Input {
            operand: Operand::input(1),
        },
        position_output(0),
        Decl::Output {
            operand: Operand::output(1),
        },
    ];
    shader.instructions = vec![
        mov(Operand::output(0), Operand::input(0)),
        mov(Operand::output(1), Operand::input(1)),
        ret(),
    ];

    let out = translate(&mut shader);
    let msl = &out.msl;

    assert!(msl.contains("vertex VertexOutput shader_main("), "{msl}");
    assert!(msl.contains("\tfloat4 dcl_Input0 [[ attribute(0) ]];"), "{msl}");
    assert!(msl.contains("\tfloat4 dcl_Input1 [[ attribute(1) ]];"), "{msl}");
    assert!(msl.contains("\tfloat4 position [[ position ]];"), "{msl}");
    assert!(msl.contains("#define Output0 output.position"), "{msl}");
    assert!(
        msl.contains("\tfloat4 VtxOutput1 [[ user(varying1) ]];"),
        "{msl}"
    );
    assert!(msl.contains("#define Output1 output.VtxOutput1"), "{msl}");
    assert!(msl.contains("float4 Input0 = stageIn.dcl_Input0;"), "{msl}");
}

#[test]
fn semantic_name_flags_extend_identifiers() {
    let mut shader = ShaderData::new(ShaderStage::Vertex);
    shader.info.inputs = vec![io_sig("POSITION", 0, 0, 0xF)];
    shader.info.outputs = vec![io_sig("SV_Position", 0, 0, 0xF)];
    shader.decls = vec![
        Decl::Input {
            operand: Operand::input(0),
        },
        position_output(0),
    ];
    shader.instructions = vec![mov(Operand::output(0), Operand::input(0)), ret()];

    let out = translate_shader(
        &mut shader,
        CompileFlags::UNIFORM_BUFFER_OBJECT | CompileFlags::INOUT_SEMANTIC_NAMES,
    )
    .unwrap();
    assert!(
        out.msl.contains("dcl_Input0_POSITION0"),
        "{}",
        out.msl
    );
}

#[test]
fn full_write_masks_emit_no_selector_suffix() {
    let mut shader = ps_passthrough();
    let out = translate(&mut shader);
    assert!(!out.msl.contains(".xyzw"), "{}", out.msl);
}

#[test]
fn same_input_translates_to_identical_text() {
    let mut a = ps_passthrough();
    let mut b = ps_passthrough();
    let out_a = translate(&mut a);
    let out_b = translate(&mut b);
    assert_eq!(out_a.msl, out_b.msl);
}

#[test]
fn geometry_stage_is_rejected() {
    let mut shader = ShaderData::new(ShaderStage::Geometry);
    let err = translate_shader(&mut shader, CompileFlags::empty()).unwrap_err();
    assert!(matches!(err, TranslateError::UnsupportedStage(ShaderStage::Geometry)));
}

#[test]
fn stream_emit_instruction_is_an_internal_contract_violation() {
    let mut shader = ps_passthrough();
    shader
        .instructions
        .insert(0, Instruction::new(Opcode::Emit, vec![Operand::temp(0)], 0));
    let err = translate_shader(&mut shader, CompileFlags::UNIFORM_BUFFER_OBJECT).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::UnsupportedInstruction {
            index: 0,
            opcode: Opcode::Emit
        }
    ));
}
