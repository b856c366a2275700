//! Shared IR builders for the translation tests. The decoder normally
//! produces these structures; tests assemble them by hand.

#![allow(dead_code)]

use crucible_ir::reflect::{
    ConstantBuffer, InOutSignature, ResourceBinding, ResourceGroup, ResourceType, ShaderVar,
    ShaderVarType, VarClass,
};
use crucible_ir::{
    ComponentType, DataType, Decl, Instruction, Opcode, Operand, ResourceReturnType, ShaderData,
    ShaderStage, SpecialName,
};
use crucible_msl::{translate_shader, CompileFlags, Translation};

pub fn io_sig(name: &str, index: u32, register: u32, mask: u8) -> InOutSignature {
    InOutSignature {
        semantic_name: name.to_owned(),
        semantic_index: index,
        register,
        mask,
        read_write_mask: mask,
        component_type: ComponentType::Float32,
        system_value_type: 0,
        stream: 0,
    }
}

pub fn svt_scalar(name: &str, ty: DataType, offset: u32) -> ShaderVarType {
    ShaderVarType {
        name: name.to_owned(),
        full_name: name.to_owned(),
        class: VarClass::Scalar,
        ty,
        rows: 1,
        columns: 1,
        elements: 0,
        offset,
        members: Vec::new(),
    }
}

pub fn svt_vector(name: &str, columns: u16, ty: DataType, offset: u32) -> ShaderVarType {
    ShaderVarType {
        class: VarClass::Vector,
        columns,
        ..svt_scalar(name, ty, offset)
    }
}

pub fn svt_struct(name: &str, members: Vec<ShaderVarType>) -> ShaderVarType {
    ShaderVarType {
        class: VarClass::Struct,
        members,
        ..svt_scalar(name, DataType::Void, 0)
    }
}

pub fn shader_var(ty: ShaderVarType) -> ShaderVar {
    ShaderVar {
        name: ty.name.clone(),
        start_offset: ty.offset,
        size: ty.size_bytes(),
        ty,
    }
}

pub fn cbuffer(name: &str, group: ResourceGroup, slot: u32, vars: Vec<ShaderVarType>) -> ConstantBuffer {
    ConstantBuffer {
        name: name.to_owned(),
        group,
        slot,
        size: 0,
        vars: vars.into_iter().map(shader_var).collect(),
        blob: false,
    }
}

pub fn binding(
    name: &str,
    group: ResourceGroup,
    ty: ResourceType,
    bind_point: u32,
) -> ResourceBinding {
    ResourceBinding {
        name: name.to_owned(),
        group,
        ty,
        bind_point,
        bind_count: 1,
        return_type: ResourceReturnType::UNorm,
        dimension: None,
        bind_area: Default::default(),
    }
}

pub fn position_output(register: u32) -> Decl {
    let mut operand = Operand::output(register);
    operand.special_name = SpecialName::Position;
    Decl::OutputSiv { operand }
}

pub fn position_input_ps(register: u32) -> Decl {
    let mut operand = Operand::input(register);
    operand.special_name = SpecialName::Position;
    Decl::InputPsSgv { operand }
}

pub fn mov(dst: Operand, src: Operand) -> Instruction {
    Instruction::new(Opcode::Mov, vec![dst, src], 1)
}

pub fn ret() -> Instruction {
    Instruction::new(Opcode::Ret, Vec::new(), 0)
}

/// A pixel shader carrying one special-named position input and one render
/// target output, with a passthrough body.
pub fn ps_passthrough() -> ShaderData {
    let mut shader = ShaderData::new(ShaderStage::Pixel);
    shader.info.inputs = vec![io_sig("SV_Position", 0, 0, 0xF)];
    shader.info.outputs = vec![io_sig("SV_Target", 0, 0, 0xF)];
    shader.decls = vec![
        position_input_ps(0),
        Decl::Output {
            operand: Operand::output(0),
        },
    ];
    shader.instructions = vec![mov(Operand::output(0), Operand::input(0)), ret()];
    shader
}

pub fn translate(shader: &mut ShaderData) -> Translation {
    translate_shader(shader, CompileFlags::UNIFORM_BUFFER_OBJECT)
        .expect("translation should succeed")
}
