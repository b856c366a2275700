//! Atomic-usage detection and the atomic memory-op lowering.

mod common;

use common::*;
use crucible_ir::reflect::{ResourceGroup, ResourceType};
use crucible_ir::{
    DataType, Decl, Instruction, Opcode, Operand, ResourceDimension, ResourceReturnType,
    ShaderData, ShaderStage, WriteMask,
};
use crucible_msl::{translate_shader, CompileFlags, TranslateError};

/// Compute shader with a structured UAV whose element is a single scalar
/// counter.
fn cs_with_counter_uav(instructions: Vec<Instruction>) -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Compute);
    shader.info.resource_bindings = vec![binding(
        "counts",
        ResourceGroup::Uav,
        ResourceType::UavRwStructured,
        0,
    )];
    shader.info.constant_buffers = vec![cbuffer(
        "counts",
        ResourceGroup::Uav,
        0,
        vec![svt_scalar("$Element", DataType::UInt, 0)],
    )];
    shader.decls = vec![
        Decl::Temps { count: 1 },
        Decl::UavStructured {
            operand: Operand::uav(0),
            stride: 4,
            has_counter: false,
        },
    ];
    shader.instructions = instructions;
    shader.instructions.push(ret());
    shader
}

fn imm_atomic_iadd() -> Instruction {
    Instruction::new(
        Opcode::ImmAtomicIAdd,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::uav(0),
            Operand::imm32_scalar(0),
            Operand::imm32_scalar(1),
        ],
        2,
    )
}

#[test]
fn atomic_target_member_is_declared_atomic_qualified() {
    let mut shader = cs_with_counter_uav(vec![imm_atomic_iadd()]);
    let out = translate(&mut shader);
    assert!(
        out.msl.contains("device volatile atomic_uint *counts"),
        "{}",
        out.msl
    );
}

#[test]
fn imm_atomic_iadd_lowers_to_fetch_add_with_previous_value() {
    let mut shader = cs_with_counter_uav(vec![imm_atomic_iadd()]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("atomic_fetch_add_explicit( &counts[0], 1u, memory_order_relaxed)"),
        "{msl}"
    );
    // The previous value lands in the destination register.
    assert!(msl.contains("Temp_int[0].x = as_type<int>(atomic_fetch_add_explicit"), "{msl}");
}

#[test]
fn plain_atomic_discards_the_previous_value() {
    let mut shader = cs_with_counter_uav(vec![Instruction::new(
        Opcode::AtomicIAdd,
        vec![
            Operand::uav(0),
            Operand::imm32_scalar(0),
            Operand::imm32_scalar(1),
        ],
        1,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("    atomic_fetch_add_explicit( &counts[0], 1u, memory_order_relaxed);"),
        "{msl}"
    );
}

#[test]
fn compare_exchange_passes_the_comparand_by_reference() {
    let mut shader = cs_with_counter_uav(vec![Instruction::new(
        Opcode::ImmAtomicCmpExch,
        vec![
            Operand::temp(0).with_mask(WriteMask::X),
            Operand::uav(0),
            Operand::imm32_scalar(0),
            Operand::imm32_scalar(7),
            Operand::imm32_scalar(9),
        ],
        2,
    )]);
    let out = translate(&mut shader);
    let msl = &out.msl;
    assert!(
        msl.contains("atomic_compare_exchange_weak_explicit( &counts[0], &7u, 9u, memory_order_relaxed, memory_order_relaxed)"),
        "{msl}"
    );
}

#[test]
fn tgsm_atomics_index_the_shared_array_directly() {
    let mut shader = ShaderData::new(ShaderStage::Compute);
    shader.decls = vec![
        Decl::Temps { count: 1 },
        Decl::TgsmRaw {
            operand: Operand::tgsm(0),
            byte_count: 16,
        },
    ];
    shader.instructions = vec![
        Instruction::new(
            Opcode::AtomicIAdd,
            vec![
                Operand::tgsm(0),
                Operand::imm32_scalar(2),
                Operand::imm32_scalar(1),
            ],
            1,
        ),
        ret(),
    ];
    let out = translate(&mut shader);
    assert!(
        out.msl
            .contains("atomic_fetch_add_explicit( &TGSM0[2u], 1u, memory_order_relaxed);"),
        "{}",
        out.msl
    );
}

#[test]
fn atomic_on_texture_backed_uav_is_fatal() {
    let mut shader = ShaderData::new(ShaderStage::Compute);
    let mut img = binding("img", ResourceGroup::Uav, ResourceType::UavRwTyped, 0);
    img.return_type = ResourceReturnType::UInt;
    img.dimension = Some(ResourceDimension::Texture2D);
    shader.info.resource_bindings = vec![img];
    shader.decls = vec![
        Decl::Temps { count: 1 },
        Decl::UavTyped {
            operand: Operand::uav(0),
            dimension: ResourceDimension::Texture2D,
            return_type: ResourceReturnType::UInt,
        },
    ];
    shader.instructions = vec![
        Instruction::new(
            Opcode::AtomicIAdd,
            vec![
                Operand::uav(0),
                Operand::imm32_scalar(0),
                Operand::imm32_scalar(1),
            ],
            1,
        ),
        ret(),
    ];
    let err = translate_shader(&mut shader, CompileFlags::UNIFORM_BUFFER_OBJECT).unwrap_err();
    assert!(matches!(err, TranslateError::AtomicOnTextureUav { slot: 0 }));
}

#[test]
fn sync_barrier_maps_flags_to_mem_flags_literal() {
    use crucible_ir::SyncFlags;
    let mut shader = ShaderData::new(ShaderStage::Compute);
    shader.decls = vec![Decl::ThreadGroup { size: [8, 8, 1] }];
    let mut sync = Instruction::new(Opcode::Sync, Vec::new(), 0);
    sync.sync_flags = SyncFlags::THREADS_IN_GROUP | SyncFlags::THREAD_GROUP_SHARED_MEMORY;
    shader.instructions = vec![sync, ret()];
    let out = translate(&mut shader);
    assert!(
        out.msl
            .contains("threadgroup_barrier(mem_flags::mem_threadgroup);"),
        "{}",
        out.msl
    );
    assert_eq!(out.reflection.thread_group_size, [8, 8, 1]);
}
