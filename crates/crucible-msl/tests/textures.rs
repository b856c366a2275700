//! Texture declarations, sampling, gathering and resource queries.

mod common;

use common::*;
use crucible_ir::reflect::{ResourceGroup, ResourceType};
use crucible_ir::{
    Decl, Instruction, Opcode, Operand, ResInfoReturn, ResourceDimension, ShaderData, ShaderStage,
    WriteMask,
};

fn ps_with_texture(
    dimension: ResourceDimension,
    comparison_sampler: bool,
    instructions: Vec<Instruction>,
) -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.info.resource_bindings = vec![
        binding("diffuseMap", ResourceGroup::Texture, ResourceType::Texture, 0),
        binding("samLinear", ResourceGroup::Sampler, ResourceType::Sampler, 0),
    ];
    shader.decls = vec![
        Decl::Sampler {
            operand: Operand::sampler(0),
            comparison: comparison_sampler,
        },
        Decl::Resource {
            operand: Operand::resource(0),
            dimension,
        },
        Decl::Temps { count: 2 },
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = instructions;
    shader.instructions.push(ret());
    shader
}

#[test]
fn sample_binds_texture_and_sampler_parameters() {
    let mut shader = ps_with_texture(
        ResourceDimension::Texture2D,
        false,
        vec![Instruction::new(
            Opcode::Sample,
            vec![
                Operand::temp(0).with_mask(WriteMask::XYZW),
                Operand::temp(1),
                Operand::resource(0),
                Operand::sampler(0),
            ],
            1,
        )],
    );
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("\ttexture2d<float> diffuseMap [[ texture(0) ]]"),
        "{msl}"
    );
    assert!(msl.contains("\tsampler samLinear_s [[ sampler(0) ]],"), "{msl}");
    assert!(msl.contains("diffuseMap.sample(samLinear_s, "), "{msl}");
    // 2D coordinates narrow to two components.
    assert!(msl.contains("Temp[1].xy"), "{msl}");

    assert_eq!(out.texture_samplers.len(), 1);
    assert_eq!(out.texture_samplers[0].sampler_name, "samLinear_s");
}

#[test]
fn sample_level_appends_the_lod_argument() {
    let mut shader = ps_with_texture(
        ResourceDimension::Texture2D,
        false,
        vec![Instruction::new(
            Opcode::SampleL,
            vec![
                Operand::temp(0).with_mask(WriteMask::XYZW),
                Operand::temp(1),
                Operand::resource(0),
                Operand::sampler(0),
                Operand::imm32_f32([2.0; 4]),
            ],
            1,
        )],
    );
    let out = translate(&mut shader);
    assert!(out.msl.contains(", level("), "{}", out.msl);
}

#[test]
fn depth_compare_sampling_uses_the_constexpr_comparison_sampler() {
    let mut shader = ps_with_texture(
        ResourceDimension::Texture2D,
        true,
        vec![Instruction::new(
            Opcode::SampleC,
            vec![
                Operand::temp(0).with_mask(WriteMask::X),
                Operand::temp(1),
                Operand::resource(0),
                Operand::sampler(0),
                Operand::temp(1).with_select(2),
            ],
            1,
        )],
    );
    let out = translate(&mut shader);
    let msl = &out.msl;
    // Both samplers exist: the compile-time comparison sampler and the
    // dummy bindable slot the engine still fills.
    assert!(
        msl.contains("constexpr sampler samLinear_cmp(compare_func::less);"),
        "{msl}"
    );
    assert!(msl.contains("\tsampler samLinear_s [[ sampler(0) ]],"), "{msl}");
    // The texture declares as a depth texture and samples through the
    // comparison entry point.
    assert!(msl.contains("\tdepth2d<float> diffuseMap [[ texture(0) ]]"), "{msl}");
    assert!(
        msl.contains("diffuseMap.sample_compare(samLinear_cmp, float2("),
        "{msl}"
    );
}

#[test]
fn sample_with_texel_offsets_appends_an_offset_vector() {
    let mut sample = Instruction::new(
        Opcode::Sample,
        vec![
            Operand::temp(0).with_mask(WriteMask::XYZW),
            Operand::temp(1),
            Operand::resource(0),
            Operand::sampler(0),
        ],
        1,
    );
    sample.address_offsets = Some([1, -2, 0]);
    let mut shader = ps_with_texture(ResourceDimension::Texture2D, false, vec![sample]);
    let out = translate(&mut shader);
    assert!(out.msl.contains(", int2(1, -2))"), "{}", out.msl);
}

#[test]
fn gather_reads_four_texels() {
    let mut shader = ps_with_texture(
        ResourceDimension::Texture2D,
        false,
        vec![Instruction::new(
            Opcode::Gather4,
            vec![
                Operand::temp(0).with_mask(WriteMask::XYZW),
                Operand::temp(1),
                Operand::resource(0),
                Operand::sampler(0),
            ],
            1,
        )],
    );
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("diffuseMap.gather(samLinear_s, "),
        "{}",
        out.msl
    );
}

#[test]
fn texel_fetch_reads_with_integer_coordinates() {
    let mut shader = ps_with_texture(
        ResourceDimension::Texture2D,
        false,
        vec![Instruction::new(
            Opcode::Ld,
            vec![
                Operand::temp(0).with_mask(WriteMask::XYZW),
                Operand::temp(1),
                Operand::resource(0),
            ],
            1,
        )],
    );
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("diffuseMap.read("), "{msl}");
    assert!(msl.contains(".xy, ("), "{msl}");
}

#[test]
fn resinfo_queries_dimensions_per_element() {
    let mut resinfo = Instruction::new(
        Opcode::ResInfo,
        vec![
            Operand::temp(0).with_mask(WriteMask::XY),
            Operand::imm32_scalar(0),
            Operand::resource(0),
        ],
        1,
    );
    resinfo.resinfo_return = ResInfoReturn::UInt;
    let mut shader = ps_with_texture(ResourceDimension::Texture2D, false, vec![resinfo]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(msl.contains("diffuseMap.get_width("), "{msl}");
    assert!(msl.contains("diffuseMap.get_height("), "{msl}");
}

#[test]
fn framebuffer_fetch_slots_bypass_texture_declarations() {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.decls = vec![
        Decl::Resource {
            operand: Operand::resource(124),
            dimension: ResourceDimension::Texture2D,
        },
        Decl::Temps { count: 2 },
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = vec![
        Instruction::new(
            Opcode::Ld,
            vec![
                Operand::temp(0).with_mask(WriteMask::XYZW),
                Operand::temp(1),
                Operand::resource(124),
            ],
            1,
        ),
        ret(),
    ];
    let out = translate(&mut shader);
    let msl = &out.msl;
    // Slot 124 is the first float4 framebuffer-fetch slot.
    assert!(
        msl.contains("\tfloat4 GMEM_Input0 [[ color(0) ]]"),
        "{msl}"
    );
    assert!(msl.contains("(GMEM_Input0"), "{msl}");
    assert_eq!(out.dialect, crucible_msl::MslDialect::Msl2_1);
}
