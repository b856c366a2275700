//! Constant-buffer struct synthesis: layout padding, member unpacking and
//! the raw-blob fallbacks.

mod common;

use common::*;
use crucible_ir::reflect::{ResourceGroup, VarClass};
use crucible_ir::{
    CbAccessPattern, DataType, Decl, Operand, ShaderData, ShaderStage, WriteMask,
};
use crucible_msl::{translate_shader, CompileFlags};

fn ps_with_cbuffer(cb_vars: Vec<crucible_ir::ShaderVarType>) -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.info.constant_buffers =
        vec![cbuffer("Material", ResourceGroup::ConstantBuffer, 0, cb_vars)];
    shader.decls = vec![
        Decl::ConstantBuffer {
            operand: Operand::cbuffer(0, 4),
            access: CbAccessPattern::Immediate,
        },
        Decl::Temps { count: 2 },
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = vec![ret()];
    shader
}

#[test]
fn scalar_followed_by_vector_gets_alignment_dummies() {
    let mut shader = ps_with_cbuffer(vec![
        svt_scalar("intensity", DataType::Float, 0),
        svt_vector("direction", 3, DataType::Float, 16),
    ]);
    let out = translate(&mut shader);
    let msl = &out.msl;

    assert!(msl.contains("struct MaterialPS_Type {"), "{msl}");
    // The scalar member is padded out to its full 16-byte register so the
    // following vector lands at the declared offset.
    assert!(msl.contains("\tfloat intensity;"), "{msl}");
    assert!(msl.contains("\tfloat  offsetDummy_4Bytes_intensity;"), "{msl}");
    assert!(msl.contains("\tfloat2 offsetDummy_8Bytes_intensity;"), "{msl}");
    assert!(msl.contains("\tfloat3 direction;"), "{msl}");

    assert!(
        msl.contains("\tconstant MaterialPS_Type & MaterialPS_In [[ buffer(0) ]]"),
        "{msl}"
    );
    // Members are unpacked into local aliases for the body.
    assert!(
        msl.contains("constant float const &intensity = MaterialPS_In.intensity;"),
        "{msl}"
    );
    assert!(
        msl.contains("constant float3 const &direction = MaterialPS_In.direction;"),
        "{msl}"
    );
}

#[test]
fn register_gaps_are_padded_with_dummy_arrays() {
    let mut shader = ps_with_cbuffer(vec![
        svt_vector("tint", 4, DataType::Float, 0),
        // Two registers of declared-but-unreflected space before this one.
        svt_vector("offset", 4, DataType::Float, 48),
    ]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("\tfloat4 offsetDummy_0[2];"),
        "{}",
        out.msl
    );
}

#[test]
fn scalar_member_reference_skips_the_selector() {
    let mut shader = ps_with_cbuffer(vec![svt_scalar("intensity", DataType::Float, 0)]);
    shader.instructions = vec![
        mov(
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::cbuffer(0, 0),
        ),
        // A float consumer so the register classifies into the float bank.
        crucible_ir::Instruction::new(
            crucible_ir::Opcode::Add,
            vec![
                Operand::temp(1).with_mask(WriteMask::X),
                Operand::temp(0).with_select(0),
                Operand::temp(0).with_select(0),
            ],
            1,
        ),
        ret(),
    ];
    let out = translate(&mut shader);
    // The scalar broadcasts through a constructor instead of carrying a
    // bogus swizzle.
    assert!(
        out.msl.contains("Temp[0] = float4(intensity);"),
        "{}",
        out.msl
    );
}

#[test]
fn bool_members_normalize_to_int_in_code_and_reflection() {
    let mut shader = ps_with_cbuffer(vec![svt_scalar("enabled", DataType::Bool, 0)]);
    let out = translate(&mut shader);
    assert!(out.msl.contains("\tint enabled;"), "{}", out.msl);

    let cb = out
        .reflection
        .constant_buffer(ResourceGroup::ConstantBuffer, 0)
        .unwrap();
    assert_eq!(cb.vars[0].ty.ty, DataType::Int);
}

#[test]
fn dynamically_indexed_buffer_falls_back_to_a_blob() {
    let mut shader = ps_with_cbuffer(vec![svt_vector("rows", 4, DataType::Float, 0)]);
    shader.decls[0] = Decl::ConstantBuffer {
        operand: Operand::cbuffer(0, 4),
        access: CbAccessPattern::DynamicIndexed,
    };
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("struct ConstantBuffer0 {\n\tfloat4 rows[4];\n};"),
        "{msl}"
    );
    assert!(
        msl.contains("\tconstant ConstantBuffer0& MaterialPS_data [[ buffer(0) ]]"),
        "{msl}"
    );
    let cb = out
        .reflection
        .constant_buffer(ResourceGroup::ConstantBuffer, 0)
        .unwrap();
    assert!(cb.blob);
}

#[test]
fn missing_reflection_synthesizes_a_raw_buffer() {
    let mut shader = ps_with_cbuffer(Vec::new());
    shader.info.constant_buffers.clear();
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("struct ConstantBuffer0 {\n\tfloat4 data[4];\n};"),
        "{msl}"
    );
    assert!(
        msl.contains("\tconstant ConstantBuffer0& cb0 [[ buffer(0) ]]"),
        "{msl}"
    );
}

#[test]
fn matrix_array_indexing_splits_into_matrix_and_row() {
    let matrices = crucible_ir::ShaderVarType {
        name: "bones".to_owned(),
        full_name: "bones".to_owned(),
        class: VarClass::MatrixRows,
        ty: DataType::Float,
        rows: 4,
        columns: 4,
        elements: 8,
        offset: 0,
        members: Vec::new(),
    };
    let mut shader = ps_with_cbuffer(vec![matrices]);
    // Read vec4 row 6 of the flattened array: matrix 1, row 2.
    shader.instructions = vec![
        mov(
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::cbuffer(0, 6),
        ),
        ret(),
    ];
    let out = translate(&mut shader);
    assert!(out.msl.contains("bones[1][2]"), "{}", out.msl);
}

#[test]
fn explicit_bindings_can_be_disabled() {
    let mut shader = ps_with_cbuffer(vec![svt_scalar("intensity", DataType::Float, 0)]);
    let out = translate_shader(
        &mut shader,
        CompileFlags::UNIFORM_BUFFER_OBJECT | CompileFlags::DISABLE_EXPLICIT_BINDINGS,
    )
    .unwrap();
    assert!(!out.msl.contains("[[ buffer(0) ]]"), "{}", out.msl);
}
